use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::resolver::imgur_album;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

static ALBUM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"imgur\.com/(?:a|gallery)/(?:[\w-]+-)?(\w+)").expect("imgur album id pattern"));

/// Imgur albums and galleries, fetched whole in one page.
pub struct ImgurAdapter;

#[async_trait]
impl SiteAdapter for ImgurAdapter {
    fn site(&self) -> SiteType { SiteType::Imgur }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let Some(id) = ALBUM_ID.captures(&source.url).map(|c| c[1].to_string()) else {
            // A lone image link is just a resolvable URL.
            let resolved = cx.resolver().resolve(&source.url).await;
            token.next = Cursor::Exhausted;
            return Ok(Page { urls: resolved.urls, warnings: resolved.warnings, ..Default::default() });
        };
        let Some(client_id) = present(&cx.remote().imgur_client_id) else {
            return Err(ScrapeError::Unconfigured { site: SiteType::Imgur, needs: "a client id" });
        };
        let urls = imgur_album(cx.http, &cx.endpoints().imgur_api, client_id, &id).await?;
        token.next = Cursor::Exhausted;
        Ok(Page::of(urls))
    }
}
