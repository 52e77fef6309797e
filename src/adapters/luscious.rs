//! Luscious albums and album listings through the public GraphQL endpoint.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{query_param, FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::error::{Result, ScrapeError};
use crate::http::parse_url;
use crate::types::{ContinuationToken, Cursor, LibrarySource};

// Album URLs end in `<slug>_<id>/`.
static ALBUM_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/albums/(?:[^/]*_)?(\d+)/?").expect("luscious album pattern"));

const PICTURES_QUERY: &str = "query PictureListInsideAlbum($input: PictureListInput!) { \
    picture { list(input: $input) { info { has_next_page } items { url_to_original url_to_video } } } }";

const ALBUMS_QUERY: &str = "query AlbumList($input: AlbumListInput!) { \
    album { list(input: $input) { info { has_next_page } items { id } } } }";

pub struct LusciousAdapter;

#[derive(Deserialize)]
struct Reply<D> {
    data: D,
}

#[derive(Deserialize)]
struct PictureData {
    picture: ListField<Picture>,
}

#[derive(Deserialize)]
struct AlbumData {
    album: ListField<AlbumRef>,
}

#[derive(Deserialize)]
struct ListField<T> {
    list: ListPage<T>,
}

#[derive(Deserialize)]
struct ListPage<T> {
    info: ListInfo,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ListInfo {
    has_next_page: bool,
}

#[derive(Deserialize)]
struct Picture {
    #[serde(default)]
    url_to_original: Option<String>,
    #[serde(default)]
    url_to_video: Option<String>,
}

impl Picture {
    fn media(self) -> Option<String> {
        self.url_to_video.filter(|u| !u.is_empty()).or(self.url_to_original).map(|u| {
            if u.starts_with("//") { format!("https:{u}") } else { u }
        })
    }
}

// Ids come back as strings on some deployments and numbers on others.
#[derive(Deserialize)]
struct AlbumRef {
    id: Value,
}

impl AlbumRef {
    fn id(&self) -> Option<String> {
        match &self.id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Query {
    Album(String),
    /// Album listing with its GraphQL filters and sort order.
    Listing { filters: Vec<(String, String)>, display: String },
}

fn query_of(source_url: &str) -> Result<Query> {
    if let Some(c) = ALBUM_ID.captures(source_url) {
        return Ok(Query::Album(c[1].to_string()));
    }
    let url = parse_url(source_url)?;
    let parts: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();
    let display = query_param(&url, "display").unwrap_or_else(|| "date_newest".into());
    let mut filters: Vec<(String, String)> = match parts.as_slice() {
        ["tags", tag, ..] => vec![("tagged".into(), tag.to_string())],
        ["users", id, "albums", ..] => vec![("created_by_id".into(), id.to_string())],
        ["albums", ..] => Vec::new(),
        _ => return Err(ScrapeError::Unsupported(format!("{source_url} is not a luscious album or album listing"))),
    };
    filters.extend(url.query_pairs().filter(|(k, _)| k != "display").map(|(k, v)| (k.into_owned(), v.into_owned())));
    Ok(Query::Listing { filters, display })
}

async fn graphql<D: DeserializeOwned>(cx: &FetchContext<'_>, operation: &str, query: &str, filters: Value, display: &str, page: u32) -> Result<D> {
    let body = json!({
        "operationName": operation,
        "query": query,
        "variables": {"input": {"filters": filters, "display": display, "page": page}},
    });
    let reply: Reply<D> = cx.http.json(cx.http.post(&cx.endpoints().luscious_api).json(&body)).await?;
    Ok(reply.data)
}

/// One page of an album's pictures; the bool is true when more pages follow.
async fn pictures_page(cx: &FetchContext<'_>, album: &str, page: u32) -> Result<(Vec<String>, bool)> {
    let filters = json!([{"name": "album_id", "value": album}]);
    let data: PictureData = graphql(cx, "PictureListInsideAlbum", PICTURES_QUERY, filters, "position", page).await?;
    let list = data.picture.list;
    let more = list.info.has_next_page && !list.items.is_empty();
    Ok((list.items.into_iter().filter_map(Picture::media).collect(), more))
}

// Cursor levels: listing page (from 1), album index on that page, picture page within the album (from 0).
async fn listing(cx: &FetchContext<'_>, filters: &[(String, String)], display: &str, token: &mut ContinuationToken) -> Result<Page> {
    let (outer, inner, sub) = token.next.levels_or(1);
    let filters: Value = filters.iter().map(|(name, value)| json!({"name": name, "value": value})).collect();
    let data: AlbumData = graphql(cx, "AlbumList", ALBUMS_QUERY, filters, display, outer).await?;
    let albums = data.album.list;
    let ids: Vec<String> = albums.items.iter().filter_map(AlbumRef::id).collect();

    let here = Cursor::nested(outer, inner, sub);
    let after_listing = if albums.info.has_next_page { here.next_outer() } else { Cursor::Exhausted };
    let Some(album) = ids.get(inner as usize) else {
        token.next = after_listing;
        return Ok(Page::default());
    };
    let (urls, more) = pictures_page(cx, album, sub + 1).await?;
    debug!(album = %album, outer, inner, sub, media = urls.len(), "luscious listing page");

    token.next = if more {
        here.next_sub()
    } else if (inner as usize) + 1 < ids.len() {
        here.next_inner()
    } else {
        after_listing
    };
    Ok(Page::of(urls))
}

#[async_trait]
impl SiteAdapter for LusciousAdapter {
    fn site(&self) -> SiteType { SiteType::Luscious }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        match query_of(&source.url)? {
            Query::Album(album) => {
                let page = token.next.page_or(1);
                let (urls, more) = pictures_page(cx, &album, page).await?;
                token.next = if more { Cursor::page(page + 1) } else { Cursor::Exhausted };
                Ok(Page::of(urls))
            }
            Query::Listing { filters, display } => listing(cx, &filters, &display, token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn album_ids_and_media() {
        assert_eq!(&ALBUM_ID.captures("https://www.luscious.net/albums/some-title_123456/").unwrap()[1], "123456");
        assert_eq!(&ALBUM_ID.captures("https://luscious.net/albums/777").unwrap()[1], "777");
        let p = Picture { url_to_original: Some("//cdn/a.jpg".into()), url_to_video: Some(String::new()) };
        assert_eq!(p.media().as_deref(), Some("https://cdn/a.jpg"));
        let p = Picture { url_to_original: Some("https://cdn/a.gif".into()), url_to_video: Some("https://cdn/a.mp4".into()) };
        assert_eq!(p.media().as_deref(), Some("https://cdn/a.mp4"));
    }

    #[test]
    fn listing_sources() {
        assert_eq!(query_of("https://www.luscious.net/albums/x_42/").unwrap(), Query::Album("42".into()));
        assert_eq!(
            query_of("https://www.luscious.net/albums/list/?tagged=cats&display=rating_all_time").unwrap(),
            Query::Listing { filters: vec![("tagged".into(), "cats".into())], display: "rating_all_time".into() }
        );
        assert_eq!(
            query_of("https://www.luscious.net/tags/big_cats/").unwrap(),
            Query::Listing { filters: vec![("tagged".into(), "big_cats".into())], display: "date_newest".into() }
        );
        assert_eq!(
            query_of("https://www.luscious.net/users/9/albums/").unwrap(),
            Query::Listing { filters: vec![("created_by_id".into(), "9".into())], display: "date_newest".into() }
        );
        assert!(query_of("https://www.luscious.net/pictures/").is_err());
    }
}
