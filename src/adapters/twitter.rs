use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::http::parse_url;
use crate::session::SessionKey;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// User timelines through the v1.1 API with an app-only bearer token.
pub struct TwitterAdapter;

#[derive(Deserialize)]
struct Bearer {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id_str: String,
    #[serde(default)]
    extended_entities: Option<Entities>,
}

#[derive(Debug, Deserialize)]
struct Entities {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    #[serde(rename = "type")]
    kind: String,
    media_url_https: String,
    #[serde(default)]
    video_info: Option<VideoInfo>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
struct Variant {
    #[serde(default)]
    bitrate: Option<u64>,
    content_type: String,
    url: String,
}

fn media_url(m: &Media) -> Option<String> {
    match m.kind.as_str() {
        "photo" => Some(m.media_url_https.clone()),
        _ => m
            .video_info
            .as_ref()?
            .variants
            .iter()
            .filter(|v| v.content_type == "video/mp4")
            .max_by_key(|v| v.bitrate.unwrap_or(0))
            // variant URLs end with ?tag=N
            .map(|v| v.url.split('?').next().unwrap_or(&v.url).to_string()),
    }
}

fn screen_name(source_url: &str) -> Result<String> {
    let url = parse_url(source_url)?;
    url.path_segments()
        .and_then(|mut s| s.find(|p| !p.is_empty()))
        .map(|s| s.trim_start_matches('@').to_string())
        .ok_or_else(|| ScrapeError::Unsupported(format!("{source_url} does not name an account")))
}

async fn bearer(cx: &FetchContext<'_>, key: &str, secret: &str) -> Result<String> {
    if let Some(t) = cx.sessions.get(&SessionKey::TwitterBearer) {
        return Ok(t);
    }
    let req = cx
        .http
        .post(&format!("{}/oauth2/token", cx.endpoints().twitter_api.trim_end_matches('/')))
        .basic_auth(key, Some(secret))
        .form(&[("grant_type", "client_credentials")]);
    let b: Bearer = cx.http.json(req).await?;
    cx.sessions.put(SessionKey::TwitterBearer, b.access_token.clone());
    Ok(b.access_token)
}

#[async_trait]
impl SiteAdapter for TwitterAdapter {
    fn site(&self) -> SiteType { SiteType::Twitter }

    fn politeness(&self) -> Option<Duration> { Some(Duration::from_secs(3)) }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let remote = cx.remote();
        let (Some(key), Some(secret)) = (present(&remote.twitter_consumer_key), present(&remote.twitter_consumer_secret)) else {
            return Err(ScrapeError::Unconfigured { site: SiteType::Twitter, needs: "a consumer key and secret" });
        };
        let auth = bearer(cx, key, secret).await?;
        let name = screen_name(&source.url)?;
        let mut url = format!(
            "{}/1.1/statuses/user_timeline.json?screen_name={name}&count={}&tweet_mode=extended&include_rts={}&exclude_replies={}",
            cx.endpoints().twitter_api.trim_end_matches('/'),
            cx.options().twitter_count,
            source.include_retweets,
            !source.include_replies,
        );
        if let Some(max_id) = token.next.token_str() {
            url.push_str(&format!("&max_id={max_id}"));
        }
        let tweets: Vec<Tweet> = match cx.http.json(cx.http.get(&url).bearer_auth(&auth)).await {
            Err(e @ ScrapeError::Status { status: 401, .. }) => {
                cx.sessions.invalidate(&SessionKey::TwitterBearer);
                return Err(e);
            }
            Err(ScrapeError::Status { status: 429, .. }) => return Err(ScrapeError::RateLimited { site: SiteType::Twitter }),
            other => other?,
        };

        let oldest = tweets.iter().filter_map(|t| t.id_str.parse::<u64>().ok()).min();
        let urls: Vec<String> = tweets
            .iter()
            .filter_map(|t| t.extended_entities.as_ref())
            .flat_map(|e| e.media.iter().filter_map(media_url))
            .collect();

        // max_id is inclusive, so step just below the oldest tweet seen.
        token.next = match oldest {
            Some(id) if id > 0 => Cursor::token((id - 1).to_string()),
            _ => Cursor::Exhausted,
        };
        Ok(Page::of(urls))
    }
}
