use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::http::parse_url;
use crate::session::SessionKey;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

// The private API only answers clients that look like the app.
const APP_ID: &str = "936619743392459";

/// Profile feeds through the private API, logged in via the shared cookie jar.
pub struct InstagramAdapter;

#[derive(Debug, Deserialize, Default)]
struct LoginReply {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    checkpoint_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct Profile {
    data: ProfileData,
}

#[derive(Deserialize)]
struct ProfileData {
    user: ProfileUser,
}

#[derive(Deserialize)]
struct ProfileUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    more_available: bool,
    #[serde(default)]
    next_max_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Item {
    #[serde(default)]
    image_versions2: Option<Candidates>,
    #[serde(default)]
    video_versions: Vec<Version>,
    #[serde(default)]
    carousel_media: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Candidates {
    #[serde(default)]
    candidates: Vec<Version>,
}

#[derive(Debug, Deserialize)]
struct Version {
    url: String,
}

// Videos win over their cover image; carousels contribute every slide.
fn item_media(item: &Item) -> Vec<String> {
    if !item.carousel_media.is_empty() {
        return item.carousel_media.iter().flat_map(item_media).collect();
    }
    if let Some(v) = item.video_versions.first() {
        return vec![v.url.clone()];
    }
    item.image_versions2
        .as_ref()
        .and_then(|c| c.candidates.first())
        .map(|c| vec![c.url.clone()])
        .unwrap_or_default()
}

fn username(source_url: &str) -> Result<String> {
    let url = parse_url(source_url)?;
    url.path_segments()
        .and_then(|mut s| s.find(|p| !p.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| ScrapeError::Unsupported(format!("{source_url} does not name a profile")))
}

async fn login(cx: &FetchContext<'_>, user: &str, password: &str) -> Result<()> {
    if cx.sessions.contains(&SessionKey::InstagramLogin) {
        return Ok(());
    }
    let url = format!("{}/accounts/login/", cx.endpoints().instagram_api.trim_end_matches('/'));
    let req = cx.http.post(&url).header("X-IG-App-ID", APP_ID).form(&[("username", user), ("password", password)]);
    // Challenges come back as 400 with a JSON body, so read it without the status check.
    let resp = req.send().await?;
    let reply: LoginReply = resp.json().await.unwrap_or_default();
    if let Some(checkpoint) = reply.checkpoint_url {
        return Err(ScrapeError::Captcha { site: SiteType::Instagram, url: checkpoint });
    }
    if reply.message.as_deref().is_some_and(|m| m.contains("challenge") || m.contains("checkpoint")) {
        return Err(ScrapeError::Captcha { site: SiteType::Instagram, url: "https://www.instagram.com/challenge/".into() });
    }
    if !reply.authenticated && reply.status != "ok" {
        return Err(ScrapeError::parse(url, reply.message.unwrap_or_else(|| "login rejected".into())));
    }
    info!(user, "instagram login");
    cx.sessions.put(SessionKey::InstagramLogin, "1");
    Ok(())
}

#[async_trait]
impl SiteAdapter for InstagramAdapter {
    fn site(&self) -> SiteType { SiteType::Instagram }

    fn politeness(&self) -> Option<Duration> { Some(Duration::from_secs(5)) }

    fn loose_match(&self) -> bool { true }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let remote = cx.remote();
        let (Some(user), Some(password)) = (present(&remote.instagram_username), present(&remote.instagram_password)) else {
            return Err(ScrapeError::Unconfigured { site: SiteType::Instagram, needs: "a username and password" });
        };
        login(cx, user, password).await?;

        let api = cx.endpoints().instagram_api.trim_end_matches('/');
        let name = username(&source.url)?;
        let profile: Profile = cx
            .http
            .json(cx.http.get(&format!("{api}/users/web_profile_info/?username={name}")).header("X-IG-App-ID", APP_ID))
            .await?;

        let mut url = format!("{api}/feed/user/{}/", profile.data.user.id);
        if let Some(max_id) = token.next.token_str() {
            url.push_str(&format!("?max_id={max_id}"));
        }
        let feed: Feed = match cx.http.json(cx.http.get(&url).header("X-IG-App-ID", APP_ID)).await {
            Err(e @ ScrapeError::Status { status: 401 | 403, .. }) => {
                cx.sessions.invalidate(&SessionKey::InstagramLogin);
                return Err(e);
            }
            other => other?,
        };

        let urls: Vec<String> = feed.items.iter().flat_map(item_media).collect();
        token.next = match feed.next_max_id {
            Some(id) if feed.more_available && !id.is_empty() => Cursor::token(id),
            _ => Cursor::Exhausted,
        };
        Ok(Page::of(urls))
    }
}
