use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::debug;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::http::parse_url;
use crate::session::SessionKey;
use crate::types::{ContinuationToken, Cursor, LibrarySource, RedditFunc};

/// Subreddit listings and user submissions through the OAuth API.
pub struct RedditAdapter;

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: Submission,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct Submission {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    is_gallery: bool,
    #[serde(default)]
    gallery_data: Option<GalleryData>,
    #[serde(default)]
    media_metadata: Option<HashMap<String, MediaMeta>>,
    #[serde(default)]
    secure_media: Option<SecureMedia>,
}

#[derive(Debug, Deserialize)]
struct GalleryData {
    items: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize)]
struct GalleryItem {
    media_id: String,
}

#[derive(Debug, Deserialize)]
struct MediaMeta {
    #[serde(default)]
    m: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SecureMedia {
    #[serde(default)]
    reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Deserialize)]
struct RedditVideo {
    fallback_url: String,
}

/// Media candidates straight from a submission, before link resolution.
pub(crate) fn submission_media(post: &Submission) -> Vec<String> {
    if post.is_gallery {
        let (Some(gallery), Some(meta)) = (&post.gallery_data, &post.media_metadata) else { return Vec::new() };
        return gallery
            .items
            .iter()
            .filter_map(|item| {
                let mime = meta.get(&item.media_id)?.m.as_deref()?;
                let ext = mime.rsplit('/').next()?;
                let ext = if ext == "jpeg" { "jpg" } else { ext };
                Some(format!("https://i.redd.it/{}.{}", item.media_id, ext))
            })
            .collect();
    }
    if let Some(video) = post.secure_media.as_ref().and_then(|m| m.reddit_video.as_ref()) {
        // fallback_url carries a ?source=fallback suffix
        let clean = video.fallback_url.split('?').next().unwrap_or(&video.fallback_url);
        return vec![clean.to_string()];
    }
    if post.is_self { return Vec::new(); }
    post.url.iter().cloned().collect()
}

/// Listing endpoint for `/r/<sub>` and `/user/<name>` style sources.
pub(crate) fn listing_path(source_url: &str, func: RedditFunc) -> Result<String> {
    let url = parse_url(source_url)?;
    let parts: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();
    match parts.as_slice() {
        ["r", sub, ..] => Ok(format!("/r/{sub}/{}", func.as_str())),
        ["u" | "user", name, ..] => Ok(format!("/user/{name}/submitted?sort={}", func.as_str())),
        _ => Err(ScrapeError::Unsupported(format!("{source_url} is not a subreddit or user"))),
    }
}

async fn access_token(cx: &FetchContext<'_>, client_id: &str, refresh_token: &str) -> Result<String> {
    if let Some(t) = cx.sessions.get(&SessionKey::RedditToken) {
        return Ok(t);
    }
    let secret = present(&cx.remote().reddit_client_secret).unwrap_or("");
    let req = cx
        .http
        .post(&cx.endpoints().reddit_auth)
        .basic_auth(client_id, Some(secret))
        .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)]);
    let token: AccessToken = cx.http.json(req).await?;
    cx.sessions.put(SessionKey::RedditToken, token.access_token.clone());
    Ok(token.access_token)
}

#[async_trait]
impl SiteAdapter for RedditAdapter {
    fn site(&self) -> SiteType { SiteType::Reddit }

    fn politeness(&self) -> Option<Duration> { Some(Duration::from_secs(3)) }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let remote = cx.remote();
        let (Some(client_id), Some(refresh)) = (present(&remote.reddit_client_id), present(&remote.reddit_refresh_token)) else {
            return Err(ScrapeError::Unconfigured { site: SiteType::Reddit, needs: "a client id and refresh token" });
        };
        let bearer = access_token(cx, client_id, refresh).await?;

        let path = listing_path(&source.url, source.reddit_func)?;
        let mut url = format!("{}{}", cx.endpoints().reddit_api.trim_end_matches('/'), path);
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&format!("limit={}&raw_json=1", cx.options().reddit_limit));
        if matches!(source.reddit_func, RedditFunc::Top | RedditFunc::Controversial) {
            url.push_str("&t=all");
        }
        if let Some(after) = token.next.token_str() {
            url.push_str(&format!("&after={after}"));
        }

        let listing: Listing = match cx.http.json(cx.http.get(&url).bearer_auth(&bearer)).await {
            Err(e @ ScrapeError::Status { status: 401, .. }) => {
                cx.sessions.invalidate(&SessionKey::RedditToken);
                return Err(e);
            }
            other => other?,
        };

        let resolver = cx.resolver();
        let posts: Vec<Submission> = listing.data.children.into_iter().map(|c| c.data).collect();
        let resolved = stream::iter(posts.iter())
            .map(|post| async move {
                let found = resolver.resolve_all(&submission_media(post)).await;
                (post.permalink.as_str(), found)
            })
            .boxed()
            .buffer_unordered(cx.fan_out())
            .collect::<Vec<_>>()
            .await;

        let mut page = Page::default();
        for (permalink, found) in resolved {
            for media in found.urls {
                page.posts.insert(media.clone(), format!("https://www.reddit.com{permalink}"));
                page.urls.push(media);
            }
            page.warnings.extend(found.warnings);
        }
        debug!(source = %source.url, posts = posts.len(), media = page.urls.len(), "reddit page");

        token.next = match listing.data.after {
            Some(after) if !after.is_empty() => Cursor::token(after),
            _ => Cursor::Exhausted,
        };
        Ok(page)
    }
}
