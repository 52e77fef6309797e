use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::tumblr::html_media;
use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::{Result, ScrapeError};
use crate::http::{origin, parse_url};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// Blog RSS pages. The feed is flaky, so transient failures get a few retries.
pub struct BdsmlrAdapter;

/// Description bodies of every `<item>` in an RSS document.
fn item_descriptions(url: &str, xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();
    let (mut in_item, mut in_desc) = (false, false);
    let mut buf = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" => in_item = true,
                b"description" if in_item => {
                    in_desc = true;
                    buf.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_desc => {
                buf.push_str(&t.unescape().map_err(|e| ScrapeError::parse(url, e.to_string()))?);
            }
            Ok(Event::CData(c)) if in_desc => buf.push_str(&String::from_utf8_lossy(&c)),
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"description" if in_desc => {
                    in_desc = false;
                    out.push(std::mem::take(&mut buf));
                }
                b"item" => in_item = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ScrapeError::parse(url, e.to_string())),
            _ => {}
        }
    }
    Ok(out)
}

#[async_trait]
impl SiteAdapter for BdsmlrAdapter {
    fn site(&self) -> SiteType { SiteType::Bdsmlr }

    fn politeness(&self) -> Option<Duration> { Some(Duration::from_secs(2)) }

    fn retry_cap(&self) -> Option<u32> { Some(3) }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let page = token.next.page_or(1);
        let feed = format!("{}/rss?page={page}", origin(&parse_url(&source.url)?));
        let xml = cx.http.get_text(&feed).await?;
        let items = item_descriptions(&feed, &xml)?;

        let urls: Vec<String> = items.iter().flat_map(|d| html_media(d)).collect();
        token.next = if items.is_empty() { Cursor::Exhausted } else { Cursor::page(page + 1) };
        Ok(Page::of(urls))
    }
}
