use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::{Result, ScrapeError};
use crate::http::parse_url;
use crate::resolver::{redgifs_get, RedGifsGif};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// User uploads and tag searches. Single watch links resolve to one URL.
pub struct RedGifsAdapter;

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    gifs: Vec<RedGifsGif>,
    #[serde(default)]
    pages: u32,
}

#[derive(Debug, PartialEq)]
enum Query {
    User(String),
    Tags(String),
    Watch,
}

fn query_of(source_url: &str) -> Result<Query> {
    let url = parse_url(source_url)?;
    let parts: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();
    match parts.as_slice() {
        ["users", name, ..] => Ok(Query::User(name.to_string())),
        ["gifs", tags, ..] | ["browse", tags, ..] => Ok(Query::Tags(tags.replace('-', " "))),
        ["watch" | "ifr", ..] => Ok(Query::Watch),
        _ => Err(ScrapeError::Unsupported(format!("{source_url} is not a redgifs user, tag or watch link"))),
    }
}

#[async_trait]
impl SiteAdapter for RedGifsAdapter {
    fn site(&self) -> SiteType { SiteType::RedGifs }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let api = cx.endpoints().redgifs_api.trim_end_matches('/');
        let page = token.next.page_or(1);
        let count = cx.options().redgifs_count;
        let url = match query_of(&source.url)? {
            Query::Watch => {
                let resolved = cx.resolver().resolve(&source.url).await;
                token.next = Cursor::Exhausted;
                return Ok(Page { urls: resolved.urls, warnings: resolved.warnings, ..Default::default() });
            }
            Query::User(name) => format!("{api}/users/{name}/search?order=new&count={count}&page={page}"),
            Query::Tags(tags) => {
                format!("{api}/gifs/search?search_text={}&order=trending&count={count}&page={page}", urlencoding::encode(&tags))
            }
        };
        let found: SearchPage = redgifs_get(cx.http, cx.endpoints(), cx.sessions, &url).await?;

        let urls: Vec<String> = found.gifs.into_iter().filter_map(|g| g.urls.best()).collect();
        token.next = if urls.is_empty() || page >= found.pages { Cursor::Exhausted } else { Cursor::page(page + 1) };
        Ok(Page::of(urls))
    }
}
