use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;

use super::{selector, FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::http::parse_url;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// Blog posts through the Tumblr v2 API, paged by offset.
pub struct TumblrAdapter;

#[derive(Deserialize)]
struct Envelope {
    response: PostsResponse,
}

#[derive(Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Deserialize, Default)]
struct Post {
    #[serde(default)]
    photos: Vec<Photo>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    original_size: PhotoSize,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    url: String,
}

/// `img` and `video source` URLs inside a post body.
pub(crate) fn html_media(html: &str) -> Vec<String> {
    let doc = Html::parse_fragment(html);
    let mut out: Vec<String> = doc.select(&selector("img")).filter_map(|e| e.value().attr("src")).map(str::to_string).collect();
    out.extend(doc.select(&selector("video source, video")).filter_map(|e| e.value().attr("src")).map(str::to_string));
    out
}

fn post_media(post: Post) -> Vec<String> {
    let mut out: Vec<String> = post.photos.into_iter().map(|p| p.original_size.url).collect();
    out.extend(post.video_url);
    for html in post.body.iter().chain(post.caption.iter()) {
        out.extend(html_media(html));
    }
    out
}

/// Blog identifier from `name.tumblr.com` or `tumblr.com/name`.
pub(crate) fn blog_identifier(source_url: &str) -> Result<String> {
    let url = parse_url(source_url)?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let name = match host.strip_suffix(".tumblr.com") {
        Some("www") | None => url.path_segments().and_then(|mut s| s.find(|p| !p.is_empty())).map(str::to_string),
        Some(blog) => Some(blog.to_string()),
    };
    name.map(|n| format!("{n}.tumblr.com"))
        .ok_or_else(|| ScrapeError::Unsupported(format!("{source_url} does not name a tumblr blog")))
}

#[async_trait]
impl SiteAdapter for TumblrAdapter {
    fn site(&self) -> SiteType { SiteType::Tumblr }

    fn politeness(&self) -> Option<Duration> { Some(Duration::from_secs(3)) }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let Some(key) = present(&cx.remote().tumblr_key) else {
            return Err(ScrapeError::Unconfigured { site: SiteType::Tumblr, needs: "an API key" });
        };
        let blog = blog_identifier(&source.url)?;
        let offset = token.next.page_or(0);
        let limit = cx.options().tumblr_limit;
        let url = format!(
            "{}/blog/{blog}/posts?api_key={key}&offset={offset}&limit={limit}&reblog_info=false",
            cx.endpoints().tumblr_api.trim_end_matches('/')
        );
        let env: Envelope = match cx.http.get_json(&url).await {
            Err(ScrapeError::Status { status: 429, .. }) => return Err(ScrapeError::RateLimited { site: SiteType::Tumblr }),
            other => other?,
        };

        let count = env.response.posts.len() as u32;
        let candidates: Vec<String> = env.response.posts.into_iter().flat_map(post_media).collect();
        let resolved = cx.resolver().resolve_all(&candidates).await;

        token.next = if count == 0 { Cursor::Exhausted } else { Cursor::page(offset + count) };
        Ok(Page { urls: resolved.urls, warnings: resolved.warnings, ..Default::default() })
    }
}
