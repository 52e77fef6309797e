use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use scraper::Html;
use tracing::debug;
use url::Url;

use super::{absolutize, selector, FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::{Result, ScrapeError};
use crate::http::{looks_blocked, parse_url, Fetched};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

const BLOCK_SIGNATURES: &[&str] = &["Just a moment...", "cf-challenge", "challenge-platform"];

/// e-hentai galleries, one thumbnail page at a time.
pub struct EHentaiAdapter;

fn gallery_root(url: &Url) -> String {
    let mut root = url.clone();
    root.set_query(None);
    root.set_fragment(None);
    root.to_string()
}

fn image_pages(base: &Url, html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&selector("#gdt a")).filter_map(|a| a.value().attr("href")).filter_map(|h| absolutize(base, h)).collect()
}

/// Zero-based index of the last gallery page, from the pager's highest number.
fn last_page(html: &str) -> u32 {
    let doc = Html::parse_document(html);
    doc.select(&selector(".ptt td a"))
        .filter_map(|a| a.text().collect::<String>().trim().parse::<u32>().ok())
        .max()
        .map_or(0, |n| n.saturating_sub(1))
}

fn full_image(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&selector("img#img")).next()?.value().attr("src").map(str::to_string)
}

async fn fetch_unblocked(cx: &FetchContext<'_>, url: &str) -> Result<Fetched> {
    let page = cx.http.page(url).await?;
    if looks_blocked(&page, BLOCK_SIGNATURES) {
        return Err(ScrapeError::Captcha { site: SiteType::EHentai, url: page.final_url.to_string() });
    }
    Ok(page)
}

#[async_trait]
impl SiteAdapter for EHentaiAdapter {
    fn site(&self) -> SiteType { SiteType::EHentai }

    fn politeness(&self) -> Option<Duration> { Some(Duration::from_secs(3)) }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let url = parse_url(&source.url)?;
        let page = token.next.page_or(0);
        let listing = format!("{}?p={page}&nw=always", gallery_root(&url));
        let fetched = fetch_unblocked(cx, &listing).await?;
        let pages = image_pages(&fetched.final_url, &fetched.body);
        let last = last_page(&fetched.body);
        debug!(gallery = %url, page, last, images = pages.len(), "e-hentai page");

        let results: Vec<Result<Option<String>>> = stream::iter(pages.iter())
            .map(|p| async move { Ok::<_, ScrapeError>(full_image(&fetch_unblocked(cx, p).await?.body)) })
            .boxed()
            .buffered(cx.fan_out())
            .collect()
            .await;

        let mut out = Page::default();
        for (p, r) in pages.iter().zip(results) {
            match r {
                Ok(Some(src)) => out.urls.push(src),
                Ok(None) => out.warnings.push(format!("no image on {p}")),
                Err(ScrapeError::Captcha { url, .. }) => out.captcha = Some(url),
                Err(e) => out.warnings.push(format!("{p}: {e}")),
            }
        }
        if out.captcha.is_none() {
            token.next = if pages.is_empty() || page >= last { Cursor::Exhausted } else { Cursor::page(page + 1) };
        }
        Ok(out)
    }
}
