use async_trait::async_trait;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::Result;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// Newline-delimited file of direct links, remote or local.
pub struct ListAdapter;

pub(crate) fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub(crate) async fn read_text(cx: &FetchContext<'_>, location: &str) -> Result<String> {
    if location.starts_with("http://") || location.starts_with("https://") {
        cx.http.get_text(location).await
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

#[async_trait]
impl SiteAdapter for ListAdapter {
    fn site(&self) -> SiteType { SiteType::List }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let text = read_text(cx, &source.url).await?;
        let resolved = cx.resolver().resolve_all(&parse_lines(&text)).await;
        token.next = Cursor::Exhausted;
        Ok(Page { urls: resolved.urls, warnings: resolved.warnings, ..Default::default() })
    }
}
