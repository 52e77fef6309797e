use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use url::Url;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::http::parse_url;
use crate::session::SessionKey;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

static CATEGORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"/category/(\d+)").expect("piwigo category pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"/tags/(\d+)").expect("piwigo tag pattern"));

/// Piwigo galleries through `ws.php`, optionally logged in.
pub struct PiwigoAdapter;

#[derive(Debug, PartialEq)]
enum Listing {
    Category(String),
    Tag(String),
}

#[derive(Deserialize)]
struct Reply {
    stat: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<ImagesResult>,
}

#[derive(Deserialize)]
struct ImagesResult {
    #[serde(default)]
    paging: Option<Paging>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct Paging {
    // Served as a string by most versions, a number by some.
    #[serde(default)]
    total_count: Value,
}

#[derive(Deserialize)]
struct Image {
    element_url: String,
}

fn total_of(paging: &Option<Paging>) -> Option<usize> {
    match &paging.as_ref()?.total_count {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        _ => None,
    }
}

/// Web service root (directory holding `ws.php`) and the listing to page through.
fn locate(source_url: &str) -> Result<(Url, Listing)> {
    let url = parse_url(source_url)?;
    let query = url.query().unwrap_or_default();
    let listing = if let Some(c) = CATEGORY.captures(query) {
        Listing::Category(c[1].to_string())
    } else if let Some(c) = TAG.captures(query) {
        Listing::Tag(c[1].to_string())
    } else {
        return Err(ScrapeError::Unsupported(format!("{source_url} is not a piwigo category or tag")));
    };
    let root = url.join("ws.php").map_err(|e| ScrapeError::parse(source_url, e.to_string()))?;
    Ok((root, listing))
}

async fn login(cx: &FetchContext<'_>, ws: &Url) -> Result<()> {
    let remote = cx.remote();
    let (Some(user), Some(password)) = (present(&remote.piwigo_username), present(&remote.piwigo_password)) else {
        return Ok(());
    };
    let key = SessionKey::PiwigoLogin(ws.host_str().unwrap_or_default().to_string());
    if cx.sessions.contains(&key) {
        return Ok(());
    }
    let url = format!("{ws}?format=json&method=pwg.session.login");
    let req = cx.http.post(&url).form(&[("username", user), ("password", password)]);
    let reply: Value = cx.http.json(req).await?;
    if reply.get("stat").and_then(Value::as_str) != Some("ok") {
        return Err(ScrapeError::parse(url, "piwigo login rejected"));
    }
    info!(host = ws.host_str().unwrap_or_default(), "piwigo login");
    cx.sessions.put(key, "1");
    Ok(())
}

#[async_trait]
impl SiteAdapter for PiwigoAdapter {
    fn site(&self) -> SiteType { SiteType::Piwigo }

    fn retry_cap(&self) -> Option<u32> { Some(3) }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let (ws, listing) = locate(&source.url)?;
        login(cx, &ws).await?;

        let page = token.next.page_or(0);
        let per_page = cx.options().piwigo_per_page.max(1);
        let method = match &listing {
            Listing::Category(id) => format!("pwg.categories.getImages&cat_id={id}"),
            Listing::Tag(id) => format!("pwg.tags.getImages&tag_id={id}"),
        };
        let url = format!("{ws}?format=json&method={method}&page={page}&per_page={per_page}");
        let reply: Reply = cx.http.get_json(&url).await?;
        if reply.stat != "ok" {
            return Err(ScrapeError::parse(url, reply.message.unwrap_or_else(|| "request failed".into())));
        }
        let result = reply.result.ok_or_else(|| ScrapeError::parse(&url, "missing result"))?;
        let total = total_of(&result.paging);
        let seen = (page as usize + 1) * per_page as usize;

        let done = result.images.is_empty() || total.is_some_and(|t| seen >= t);
        token.next = if done { Cursor::Exhausted } else { Cursor::page(page + 1) };
        Ok(Page::of(result.images.into_iter().map(|i| i.element_url).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_ws_root() {
        let (ws, listing) = locate("https://photos.example.org/piwigo/index.php?/category/12").unwrap();
        assert_eq!(ws.as_str(), "https://photos.example.org/piwigo/ws.php");
        assert_eq!(listing, Listing::Category("12".into()));
        let (_, listing) = locate("https://h/picture.php?/tags/3-cats").unwrap();
        assert_eq!(listing, Listing::Tag("3".into()));
        assert!(locate("https://h/index.php").is_err());
    }

    #[test]
    fn total_as_string_or_number() {
        let p = Some(Paging { total_count: Value::String("250".into()) });
        assert_eq!(total_of(&p), Some(250));
        let p = Some(Paging { total_count: serde_json::json!(10) });
        assert_eq!(total_of(&p), Some(10));
        assert_eq!(total_of(&None), None);
    }
}
