//! Danbooru, Gelbooru v2 (DAPI) and Gelbooru v1 (HTML) boards.
//!
//! All three take their tag query from the source URL's `tags` parameter.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use scraper::Html;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{absolutize, query_param, selector, FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::http::{origin, parse_url};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// Gelbooru v1 list pages always hold this many thumbnails.
const V1_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct BooruPost {
    #[serde(default)]
    file_url: Option<String>,
    #[serde(default)]
    large_file_url: Option<String>,
}

impl BooruPost {
    // Protocol-relative and root-relative paths show up on smaller boards.
    fn media(self, base: &Url) -> Option<String> {
        let raw = self.file_url.or(self.large_file_url).filter(|u| !u.is_empty())?;
        absolutize(base, &raw)
    }
}

fn tags_of(url: &Url) -> String { query_param(url, "tags").unwrap_or_default() }

/// `danbooru.donmai.us` speaks `posts.json`; moebooru forks speak `post.json`.
pub struct DanbooruAdapter;

#[async_trait]
impl SiteAdapter for DanbooruAdapter {
    fn site(&self) -> SiteType { SiteType::Danbooru }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let url = parse_url(&source.url)?;
        let endpoint = if url.host_str().is_some_and(|h| h.contains("donmai")) { "posts.json" } else { "post.json" };
        let page = token.next.page_or(1);
        let limit = cx.options().booru_limit;
        let api = format!(
            "{}/{endpoint}?tags={}&page={page}&limit={limit}",
            origin(&url),
            urlencoding::encode(&tags_of(&url))
        );
        let posts: Vec<BooruPost> = cx.http.get_json(&api).await?;
        let fetched = posts.len() as u32;
        let urls: Vec<String> = posts.into_iter().filter_map(|p| p.media(&url)).collect();

        token.next = if fetched == 0 || fetched < limit { Cursor::Exhausted } else { Cursor::page(page + 1) };
        Ok(Page::of(urls))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DapiPayload {
    Bare(Vec<BooruPost>),
    Wrapped {
        #[serde(default)]
        post: Vec<BooruPost>,
    },
}

fn dapi_posts(url: &str, body: &str) -> Result<Vec<BooruPost>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let payload: DapiPayload = serde_json::from_str(body).map_err(|e| ScrapeError::parse(url, e.to_string()))?;
    Ok(match payload {
        DapiPayload::Bare(p) => p,
        DapiPayload::Wrapped { post } => post,
    })
}

/// Gelbooru 0.2 DAPI boards (gelbooru.com, rule34.xxx and friends).
pub struct Gelbooru2Adapter;

#[async_trait]
impl SiteAdapter for Gelbooru2Adapter {
    fn site(&self) -> SiteType { SiteType::Gelbooru2 }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let url = parse_url(&source.url)?;
        let pid = token.next.page_or(0);
        let limit = cx.options().booru_limit;
        let mut api = format!(
            "{}/index.php?page=dapi&s=post&q=index&json=1&tags={}&pid={pid}&limit={limit}",
            origin(&url),
            urlencoding::encode(&tags_of(&url))
        );
        let remote = cx.remote();
        if let (Some(user), Some(key)) = (present(&remote.gelbooru_user_id), present(&remote.gelbooru_api_key)) {
            api.push_str(&format!("&user_id={user}&api_key={key}"));
        }
        let body = cx.http.get_text(&api).await?;
        let posts = dapi_posts(&api, &body)?;
        let fetched = posts.len() as u32;
        let urls: Vec<String> = posts.into_iter().filter_map(|p| p.media(&url)).collect();

        token.next = if fetched == 0 || fetched < limit { Cursor::Exhausted } else { Cursor::page(pid + 1) };
        Ok(Page::of(urls))
    }
}

/// Older Gelbooru installs with no API: list pages, then each post page.
pub struct Gelbooru1Adapter;

fn thumb_links(base: &Url, html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&selector(".thumb a"))
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|h| absolutize(base, h))
        .collect()
}

fn full_image(base: &Url, html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let src = doc.select(&selector("img#image")).next()?.value().attr("src")?;
    absolutize(base, src)
}

#[async_trait]
impl SiteAdapter for Gelbooru1Adapter {
    fn site(&self) -> SiteType { SiteType::Gelbooru1 }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let url = parse_url(&source.url)?;
        let page = token.next.page_or(0);
        let list = format!(
            "{}/index.php?page=post&s=list&tags={}&pid={}",
            origin(&url),
            urlencoding::encode(&tags_of(&url)),
            page * V1_PAGE_SIZE
        );
        let html = cx.http.get_text(&list).await?;
        let posts = thumb_links(&url, &html);
        debug!(list = %list, posts = posts.len(), "gelbooru v1 list page");

        let (http, base) = (cx.http, &url);
        let found: Vec<Result<Option<String>>> = stream::iter(posts.iter())
            .map(|post| async move {
                let html = http.get_text(post).await?;
                Ok::<_, ScrapeError>(full_image(base, &html))
            })
            .boxed()
            .buffered(cx.fan_out())
            .collect()
            .await;

        let mut out = Page::default();
        for (post, r) in posts.iter().zip(found) {
            match r {
                Ok(Some(img)) => out.urls.push(img),
                Ok(None) => out.warnings.push(format!("no image on {post}")),
                Err(e) => out.warnings.push(format!("{post}: {e}")),
            }
        }
        token.next = if posts.is_empty() { Cursor::Exhausted } else { Cursor::page(page + 1) };
        Ok(out)
    }
}
