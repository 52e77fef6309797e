use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::{Result, ScrapeError};
use crate::http::{origin, parse_url};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

const KEY_HEADER: &str = "Hydrus-Client-API-Access-Key";

/// A local Hydrus client's search, served through its client API.
pub struct HydrusAdapter;

#[derive(Deserialize)]
struct Search {
    #[serde(default)]
    file_ids: Vec<u64>,
}

#[derive(Deserialize)]
struct Metadata {
    #[serde(default)]
    metadata: Vec<FileMeta>,
}

#[derive(Deserialize)]
struct FileMeta {
    file_id: u64,
    #[serde(default)]
    ext: Option<String>,
}

fn file_url(base: &str, key: &str, meta: &FileMeta) -> String {
    // The extension goes last so playable filtering sees it.
    let ext = meta.ext.as_deref().unwrap_or_default();
    format!("{base}/get_files/file?file_id={}&{KEY_HEADER}={key}&ext={ext}", meta.file_id)
}

#[async_trait]
impl SiteAdapter for HydrusAdapter {
    fn site(&self) -> SiteType { SiteType::Hydrus }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let Some(key) = present(&cx.remote().hydrus_api_key) else {
            return Err(ScrapeError::Unconfigured { site: SiteType::Hydrus, needs: "an API access key" });
        };
        let base = origin(&parse_url(&source.url)?);
        let search: Search = cx.http.json(cx.http.get(source.url.trim()).header(KEY_HEADER, key)).await?;

        let size = cx.options().hydrus_page_size.max(1);
        let page = token.next.page_or(0) as usize;
        let start = page * size;
        let chunk: Vec<u64> = search.file_ids.iter().skip(start).take(size).copied().collect();
        debug!(total = search.file_ids.len(), start, chunk = chunk.len(), "hydrus page");
        if chunk.is_empty() {
            token.next = Cursor::Exhausted;
            return Ok(Page::default());
        }

        let ids = serde_json::to_string(&chunk)?;
        let meta_url = format!("{base}/get_files/file_metadata?file_ids={}", urlencoding::encode(&ids));
        let meta: Metadata = cx.http.json(cx.http.get(&meta_url).header(KEY_HEADER, key)).await?;
        let urls = meta.metadata.iter().map(|m| file_url(&base, key, m)).collect();

        token.next = if start + chunk.len() >= search.file_ids.len() { Cursor::Exhausted } else { Cursor::page(page as u32 + 1) };
        Ok(Page::of(urls))
    }
}
