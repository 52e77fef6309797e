use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::debug;
use url::Url;

use super::{absolutize, query_param, selector, FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::{Result, ScrapeError};
use crate::http::{looks_blocked, origin, parse_url, Fetched};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

const BLOCK_SIGNATURES: &[&str] = &["human-verification", "captcha"];

static GALLERY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:pictures|gallery)/(\d+)").expect("imagefap gallery pattern"));
static ORGANIZER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/organizer/(\d+)").expect("imagefap organizer pattern"));

/// Galleries and organizers (folders of galleries).
pub struct ImageFapAdapter;

#[derive(Debug, PartialEq)]
enum Query {
    Gallery(String),
    Organizer(String),
}

fn query_of(url: &Url) -> Option<Query> {
    let s = url.as_str();
    if let Some(c) = ORGANIZER_ID.captures(s) {
        return Some(Query::Organizer(c[1].to_string()));
    }
    if let Some(c) = GALLERY_ID.captures(s) {
        return Some(Query::Gallery(c[1].to_string()));
    }
    query_param(url, "gid").map(Query::Gallery)
}

fn links(base: &Url, html: &str, css: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut out: Vec<String> = Vec::new();
    for href in doc.select(&selector(css)).filter_map(|a| a.value().attr("href")) {
        if let Some(abs) = absolutize(base, href) {
            if !out.contains(&abs) { out.push(abs); }
        }
    }
    out
}

fn main_photo(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&selector("img#mainPhoto")).next()?.value().attr("src").map(str::to_string)
}

async fn fetch_unblocked(cx: &FetchContext<'_>, url: &str) -> Result<Fetched> {
    let page = cx.http.page(url).await?;
    if looks_blocked(&page, BLOCK_SIGNATURES) {
        return Err(ScrapeError::Captcha { site: SiteType::ImageFap, url: page.final_url.to_string() });
    }
    Ok(page)
}

// One gallery page: photo page links, each fetched for its full-size image.
async fn gallery_page(cx: &FetchContext<'_>, base: &Url, gid: &str, page: u32) -> Result<(Page, usize)> {
    let list = format!("{}/gallery.php?gid={gid}&page={page}&view=0", origin(base));
    let fetched = fetch_unblocked(cx, &list).await?;
    let photos = links(&fetched.final_url, &fetched.body, r#"a[href*="/photo/"]"#);

    let results: Vec<Result<Option<String>>> = stream::iter(photos.iter())
        .map(|p| async move { Ok::<_, ScrapeError>(main_photo(&fetch_unblocked(cx, p).await?.body)) })
        .boxed()
        .buffered(cx.fan_out())
        .collect()
        .await;

    let mut out = Page::default();
    for (photo, r) in photos.iter().zip(results) {
        match r {
            Ok(Some(src)) => out.urls.push(src),
            Ok(None) => out.warnings.push(format!("no image on {photo}")),
            // Keep whatever was found; the caller can resume once the block is solved.
            Err(ScrapeError::Captcha { url, .. }) => out.captcha = Some(url),
            Err(e) => out.warnings.push(format!("{photo}: {e}")),
        }
    }
    Ok((out, photos.len()))
}

async fn organizer(cx: &FetchContext<'_>, base: &Url, id: &str, token: &mut ContinuationToken) -> Result<Page> {
    let (outer, inner, sub) = token.next.levels_or(0);
    let listing = format!("{}/organizer/{id}/?page={outer}", origin(base));
    let fetched = fetch_unblocked(cx, &listing).await?;
    let galleries: Vec<String> = links(&fetched.final_url, &fetched.body, r#"a[href*="/gallery/"], a[href*="/pictures/"]"#)
        .iter()
        .filter_map(|l| GALLERY_ID.captures(l).map(|c| c[1].to_string()))
        .fold(Vec::new(), |mut acc, g| {
            if !acc.contains(&g) { acc.push(g); }
            acc
        });
    if galleries.is_empty() {
        token.next = Cursor::Exhausted;
        return Ok(Page::default());
    }
    let here = Cursor::nested(outer, inner, sub);
    let Some(gid) = galleries.get(inner as usize) else {
        token.next = here.next_outer();
        return Ok(Page::default());
    };
    let (page, photos) = gallery_page(cx, base, gid, sub).await?;
    debug!(organizer = id, gallery = %gid, outer, inner, sub, photos, "imagefap organizer page");
    if page.captcha.is_some() {
        return Ok(page);
    }
    token.next = if photos > 0 {
        here.next_sub()
    } else if (inner as usize) + 1 < galleries.len() {
        here.next_inner()
    } else {
        here.next_outer()
    };
    Ok(page)
}

#[async_trait]
impl SiteAdapter for ImageFapAdapter {
    fn site(&self) -> SiteType { SiteType::ImageFap }

    fn politeness(&self) -> Option<Duration> { Some(Duration::from_secs(5)) }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let url = parse_url(&source.url)?;
        match query_of(&url) {
            Some(Query::Organizer(id)) => organizer(cx, &url, &id, token).await,
            Some(Query::Gallery(gid)) => {
                let page = token.next.page_or(0);
                let (out, photos) = gallery_page(cx, &url, &gid, page).await?;
                // A captcha freezes the cursor so the same page is retried.
                if out.captcha.is_none() {
                    token.next = if photos == 0 { Cursor::Exhausted } else { Cursor::page(page + 1) };
                }
                Ok(out)
            }
            None => Err(ScrapeError::Unsupported(format!("{} is not an imagefap gallery or organizer", source.url))),
        }
    }
}
