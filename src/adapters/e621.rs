use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{query_param, FetchContext, Page, SiteAdapter};
use crate::classify::SiteType;
use crate::config::present;
use crate::error::Result;
use crate::http::{origin, parse_url};
use crate::types::{ContinuationToken, Cursor, LibrarySource};

/// e621 tag searches, single pools, and pool-name searches.
pub struct E621Adapter;

#[derive(Deserialize)]
struct Posts {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Deserialize)]
struct Post {
    file: PostFile,
}

#[derive(Deserialize)]
struct PostFile {
    // null for posts hidden from anonymous users
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct Pool {
    id: u64,
}

#[derive(Debug, PartialEq)]
enum Query {
    Tags(String),
    Pool(u64),
    PoolSearch(String),
}

fn query_of(url: &Url) -> Query {
    let parts: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();
    match parts.as_slice() {
        ["pools", id, ..] if id.parse::<u64>().is_ok() => Query::Pool(id.parse().unwrap_or_default()),
        ["pools", ..] => Query::PoolSearch(query_param(url, "search[name_matches]").unwrap_or_default()),
        _ => Query::Tags(query_param(url, "tags").unwrap_or_default()),
    }
}

fn authed(cx: &FetchContext<'_>, url: &str) -> RequestBuilder {
    let remote = cx.remote();
    let req = cx.http.get(url);
    match (present(&remote.e621_username), present(&remote.e621_api_key)) {
        (Some(user), Some(key)) => req.basic_auth(user, Some(key)),
        _ => req,
    }
}

/// One page of posts for `tags`; the bool is true when the page came back full.
async fn posts_page(cx: &FetchContext<'_>, base: &str, tags: &str, page: u32) -> Result<(Vec<String>, bool)> {
    let limit = cx.options().e621_limit;
    let url = format!("{base}/posts.json?tags={}&page={page}&limit={limit}", urlencoding::encode(tags));
    let found: Posts = cx.http.json(authed(cx, &url)).await?;
    let full = found.posts.len() as u32 >= limit;
    Ok((found.posts.into_iter().filter_map(|p| p.file.url).collect(), full))
}

#[async_trait]
impl SiteAdapter for E621Adapter {
    fn site(&self) -> SiteType { SiteType::E621 }

    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page> {
        let url = parse_url(&source.url)?;
        let base = origin(&url);
        let tags = match query_of(&url) {
            Query::Tags(t) => t,
            Query::Pool(id) => format!("pool:{id}"),
            Query::PoolSearch(name) => return pool_search(cx, &base, &name, token).await,
        };
        let page = token.next.page_or(1);
        let (urls, full) = posts_page(cx, &base, &tags, page).await?;
        token.next = if full { Cursor::page(page + 1) } else { Cursor::Exhausted };
        Ok(Page::of(urls))
    }
}

// Cursor levels: pools listing page (from 1), pool index on that page, posts page within the pool.
async fn pool_search(cx: &FetchContext<'_>, base: &str, name: &str, token: &mut ContinuationToken) -> Result<Page> {
    let (outer, inner, sub) = token.next.levels_or(1);
    let listing = format!("{base}/pools.json?search[name_matches]={}&page={outer}", urlencoding::encode(name));
    let pools: Vec<Pool> = cx.http.json(authed(cx, &listing)).await?;
    if pools.is_empty() {
        token.next = Cursor::Exhausted;
        return Ok(Page::default());
    }
    let Some(pool) = pools.get(inner as usize) else {
        token.next = Cursor::nested(outer, inner, sub).next_outer();
        return Ok(Page::default());
    };
    let (urls, full) = posts_page(cx, base, &format!("pool:{}", pool.id), sub + 1).await?;
    debug!(pool = pool.id, outer, inner, sub, media = urls.len(), "e621 pool page");

    let here = Cursor::nested(outer, inner, sub);
    token.next = if full {
        here.next_sub()
    } else if (inner as usize) + 1 < pools.len() {
        here.next_inner()
    } else {
        here.next_outer()
    };
    Ok(Page::of(urls))
}
