use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::{Result, ScrapeError};
use crate::filter::media_kind;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// Media files in a local directory.
pub struct LocalAdapter;

fn walk(root: PathBuf, recursive: bool) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(ScrapeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }
    let walker = WalkDir::new(&root).follow_links(true).max_depth(if recursive { usize::MAX } else { 1 });
    let mut files = Vec::new();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() { continue; }
        let path = entry.path().to_string_lossy().into_owned();
        if media_kind(&path, true).is_some() { files.push(path); }
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl SiteAdapter for LocalAdapter {
    fn site(&self) -> SiteType { SiteType::Local }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let root = PathBuf::from(source.url.trim());
        let recursive = cx.options().local_recursive;
        let files = tokio::task::spawn_blocking(move || walk(root, recursive))
            .await
            .map_err(|e| ScrapeError::Io(std::io::Error::other(e)))??;
        debug!(dir = %source.url, files = files.len(), "scanned directory");
        token.next = Cursor::Exhausted;
        Ok(Page::of(files))
    }
}
