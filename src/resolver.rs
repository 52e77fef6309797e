use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{present, Endpoints, Settings};
use crate::error::{Result, ScrapeError};
use crate::http::HttpClient;
use crate::session::{SessionCache, SessionKey};

static IMGUR_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.|m\.|i\.)?imgur\.com/(\w{5,8})/?$").expect("imgur single pattern"));
static IMGUR_ALBUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.|m\.)?imgur\.com/(?:a|gallery)/(?:[\w-]+-)?(\w+)/?$").expect("imgur album pattern"));
static GFYCAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.)?gfycat\.com/(?:gifs/detail/|ifr/)?([A-Za-z]+)").expect("gfycat pattern"));
static REDGIFS_WATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.|v3\.)?redgifs\.com/(?:watch|ifr)/([A-Za-z]+)").expect("redgifs pattern"));

/// Directly fetchable URLs for one candidate, plus any diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    pub urls: Vec<String>,
    pub warnings: Vec<String>,
}

impl Resolved {
    fn one(url: impl Into<String>) -> Self { Self { urls: vec![url.into()], warnings: Vec::new() } }

    // Resolution misses forward the original URL rather than dropping it.
    fn miss(url: &str, why: String) -> Self {
        warn!(url, %why, "could not resolve media link");
        Self { urls: vec![url.to_string()], warnings: vec![why] }
    }
}

/// Expands intermediary links (gifv, imgur, gfycat, redgifs) into media URLs.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    http: &'a HttpClient,
    endpoints: &'a Endpoints,
    sessions: &'a SessionCache,
    imgur_client_id: Option<&'a str>,
    fan_out: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(http: &'a HttpClient, settings: &'a Settings, sessions: &'a SessionCache) -> Self {
        Self {
            http,
            endpoints: &settings.endpoints,
            sessions,
            imgur_client_id: present(&settings.remote.imgur_client_id),
            fan_out: settings.scrape.fan_out.max(1),
        }
    }

    pub async fn resolve(&self, url: &str) -> Resolved {
        let url = url.trim();
        if let Some(stem) = url.strip_suffix(".gifv") {
            return Resolved::one(format!("{stem}.mp4"));
        }
        if let Some(c) = IMGUR_SINGLE.captures(url) {
            return Resolved::one(format!("https://i.imgur.com/{}.jpg", &c[1]));
        }
        if let Some(c) = IMGUR_ALBUM.captures(url) {
            let Some(client_id) = self.imgur_client_id else {
                return Resolved::miss(url, format!("imgur album {url} needs an imgur client id"));
            };
            return match imgur_album(self.http, &self.endpoints.imgur_api, client_id, &c[1]).await {
                Ok(urls) if !urls.is_empty() => Resolved { urls, warnings: Vec::new() },
                Ok(_) => Resolved::miss(url, format!("imgur album {url} is empty")),
                Err(e) => Resolved::miss(url, format!("imgur album {url}: {e}")),
            };
        }
        if let Some(c) = GFYCAT.captures(url) {
            return self.gfycat(url, &c[1]).await;
        }
        if let Some(c) = REDGIFS_WATCH.captures(url) {
            return match redgifs_gif(self.http, self.endpoints, self.sessions, &c[1]).await {
                Ok(Some(media)) => Resolved::one(media),
                Ok(None) => Resolved::miss(url, format!("no video source found for {url}")),
                Err(e) => Resolved::miss(url, format!("redgifs lookup for {url} failed: {e}")),
            };
        }
        Resolved::one(url)
    }

    /// Resolve a batch concurrently and wait for every item, failed or not.
    pub async fn resolve_all(&self, urls: &[String]) -> Resolved {
        let parts: Vec<Resolved> = stream::iter(urls.iter())
            .map(|u| self.resolve(u))
            .boxed()
            .buffered(self.fan_out)
            .collect()
            .await;
        let mut out = Resolved::default();
        for p in parts {
            out.urls.extend(p.urls);
            out.warnings.extend(p.warnings);
        }
        out
    }

    async fn gfycat(&self, url: &str, id: &str) -> Resolved {
        // Ids already in CamelCase map straight onto the CDN.
        if id.chars().any(|c| c.is_ascii_uppercase()) {
            return Resolved::one(format!("https://giant.gfycat.com/{id}.mp4"));
        }
        match self.http.get_text(&format!("https://gfycat.com/{id}")).await {
            Ok(html) => match best_gfycat_source(&html) {
                Some(src) => Resolved::one(src),
                None => Resolved::miss(url, format!("no video source found for {url}")),
            },
            Err(e) => Resolved::miss(url, format!("gfycat page for {url} failed: {e}")),
        }
    }
}

/// Pick the best `<source>` from a gfycat page: WebM, then MP4, then mobile MP4.
pub fn best_gfycat_source(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("video source").ok()?;
    let sources: Vec<(String, String)> = doc
        .select(&sel)
        .filter_map(|e| {
            let src = e.value().attr("src")?.to_string();
            Some((e.value().attr("type").unwrap_or_default().to_string(), src))
        })
        .collect();
    let pick = |pred: &dyn Fn(&(String, String)) -> bool| sources.iter().find(|s| pred(s)).map(|s| s.1.clone());
    pick(&|(t, s)| t == "video/webm" || s.ends_with(".webm"))
        .or_else(|| pick(&|(_, s)| s.ends_with(".mp4") && !s.contains("-mobile")))
        .or_else(|| pick(&|(_, s)| s.ends_with(".mp4")))
}

#[derive(Deserialize)]
struct ImgurAlbum {
    data: Vec<ImgurImage>,
}

#[derive(Deserialize)]
struct ImgurImage {
    link: String,
    #[serde(default)]
    mp4: Option<String>,
}

pub(crate) async fn imgur_album(http: &HttpClient, api: &str, client_id: &str, id: &str) -> Result<Vec<String>> {
    let req = http
        .get(&format!("{}/album/{id}/images", api.trim_end_matches('/')))
        .header("Authorization", format!("Client-ID {client_id}"));
    let album: ImgurAlbum = http.json(req).await?;
    Ok(album.data.into_iter().map(|i| i.mp4.unwrap_or(i.link)).collect())
}

#[derive(Deserialize)]
struct RedGifsAuth {
    token: String,
}

/// Temporary bearer token, fetched once and shared for the process lifetime.
pub(crate) async fn redgifs_bearer(http: &HttpClient, endpoints: &Endpoints, sessions: &SessionCache) -> Result<String> {
    if let Some(t) = sessions.get(&SessionKey::RedGifsToken) {
        return Ok(t);
    }
    let auth: RedGifsAuth = http.get_json(&format!("{}/auth/temporary", endpoints.redgifs_api)).await?;
    sessions.put(SessionKey::RedGifsToken, auth.token.clone());
    Ok(auth.token)
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct RedGifsUrls {
    #[serde(default)]
    pub hd: Option<String>,
    #[serde(default)]
    pub sd: Option<String>,
}

impl RedGifsUrls {
    pub(crate) fn best(self) -> Option<String> { self.hd.or(self.sd) }
}

#[derive(Deserialize)]
struct RedGifsLookup {
    gif: RedGifsGif,
}

#[derive(Deserialize)]
pub(crate) struct RedGifsGif {
    #[serde(default)]
    pub urls: RedGifsUrls,
}

/// GET against the RedGifs API, re-authenticating once if the cached token went stale.
pub(crate) async fn redgifs_get<T: serde::de::DeserializeOwned>(
    http: &HttpClient,
    endpoints: &Endpoints,
    sessions: &SessionCache,
    url: &str,
) -> Result<T> {
    for attempt in 0..2 {
        let token = redgifs_bearer(http, endpoints, sessions).await?;
        match http.json(http.get(url).bearer_auth(&token)).await {
            Err(ScrapeError::Status { status: 401, .. }) if attempt == 0 => {
                sessions.invalidate(&SessionKey::RedGifsToken);
            }
            other => return other,
        }
    }
    Err(ScrapeError::parse(url, "redgifs rejected a fresh token"))
}

async fn redgifs_gif(http: &HttpClient, endpoints: &Endpoints, sessions: &SessionCache, id: &str) -> Result<Option<String>> {
    let url = format!("{}/gifs/{}", endpoints.redgifs_api, id.to_ascii_lowercase());
    let found: RedGifsLookup = redgifs_get(http, endpoints, sessions, &url).await?;
    Ok(found.gif.urls.best())
}
