//! Per-site page fetchers.
//!
//! Each adapter performs one page of site-specific I/O for a source and advances
//! the continuation token it is handed. Filtering, blacklisting, merging and
//! message mapping happen once, in [`crate::Scraper::fetch_page`].

use std::time::Duration;

use async_trait::async_trait;

use crate::classify::SiteType;
use crate::config::{RemoteSettings, ScrapeOptions, Settings, Endpoints};
use crate::error::Result;
use crate::http::HttpClient;
use crate::resolver::Resolver;
use crate::session::SessionCache;
use crate::types::{ContinuationToken, LibrarySource, PostMap};

pub mod bdsmlr;
pub mod booru;
pub mod direct;
pub mod e621;
pub mod ehentai;
pub mod hydrus;
pub mod imagefap;
pub mod imgur;
pub mod instagram;
pub mod list;
pub mod local;
pub mod luscious;
pub mod piwigo;
pub mod reddit;
pub mod redgifs;
pub mod tumblr;
pub mod twitter;

/// What one page produced, before filtering and merging.
#[derive(Debug, Default)]
pub struct Page {
    pub urls: Vec<String>,
    pub posts: PostMap,
    /// Overrides the adapter's default politeness delay.
    pub timeout: Option<Duration>,
    pub warnings: Vec<String>,
    /// Block page the user must solve; set alongside any partial `urls`.
    pub captcha: Option<String>,
}

impl Page {
    pub fn of(urls: Vec<String>) -> Self { Self { urls, ..Default::default() } }
}

/// Shared collaborators for one page request.
#[derive(Clone, Copy)]
pub struct FetchContext<'a> {
    pub http: &'a HttpClient,
    pub settings: &'a Settings,
    pub sessions: &'a SessionCache,
}

impl<'a> FetchContext<'a> {
    pub fn resolver(&self) -> Resolver<'a> { Resolver::new(self.http, self.settings, self.sessions) }
    pub fn remote(&self) -> &'a RemoteSettings { &self.settings.remote }
    pub fn options(&self) -> &'a ScrapeOptions { &self.settings.scrape }
    pub fn endpoints(&self) -> &'a Endpoints { &self.settings.endpoints }
    pub fn fan_out(&self) -> usize { self.settings.scrape.fan_out.max(1) }
}

#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site(&self) -> SiteType;

    /// Advisory minimum delay before the next page of the same source.
    fn politeness(&self) -> Option<Duration> { None }

    /// Consecutive transient failures tolerated before the error is surfaced.
    fn retry_cap(&self) -> Option<u32> { None }

    /// CDN URLs carrying query strings need substring extension matching.
    fn loose_match(&self) -> bool { false }

    /// Whether results go through the playable filter at all.
    fn filtered(&self) -> bool { true }

    /// Fetch one page and advance `token.next`. Leave `next` untouched on errors.
    async fn fetch_page(&self, cx: &FetchContext<'_>, source: &LibrarySource, token: &mut ContinuationToken) -> Result<Page>;
}

/// Adapter for a site family.
pub fn adapter_for(site: SiteType) -> &'static dyn SiteAdapter {
    match site {
        SiteType::List => &list::ListAdapter,
        SiteType::Local => &local::LocalAdapter,
        SiteType::Video => &direct::DirectAdapter::VIDEO,
        SiteType::Audio => &direct::DirectAdapter::AUDIO,
        SiteType::Playlist => &direct::PlaylistAdapter,
        SiteType::Tumblr => &tumblr::TumblrAdapter,
        SiteType::Reddit => &reddit::RedditAdapter,
        SiteType::ImageFap => &imagefap::ImageFapAdapter,
        SiteType::Imgur => &imgur::ImgurAdapter,
        SiteType::Twitter => &twitter::TwitterAdapter,
        SiteType::Instagram => &instagram::InstagramAdapter,
        SiteType::Danbooru => &booru::DanbooruAdapter,
        SiteType::Gelbooru2 => &booru::Gelbooru2Adapter,
        SiteType::E621 => &e621::E621Adapter,
        SiteType::Gelbooru1 => &booru::Gelbooru1Adapter,
        SiteType::EHentai => &ehentai::EHentaiAdapter,
        SiteType::Bdsmlr => &bdsmlr::BdsmlrAdapter,
        SiteType::Hydrus => &hydrus::HydrusAdapter,
        SiteType::Luscious => &luscious::LusciousAdapter,
        SiteType::Piwigo => &piwigo::PiwigoAdapter,
        SiteType::RedGifs => &redgifs::RedGifsAdapter,
    }
}

/// Value of a query parameter on the source URL.
pub(crate) fn query_param(url: &url::Url, name: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}

/// Absolute URL for a possibly relative link found on `base`.
pub(crate) fn absolutize(base: &url::Url, link: &str) -> Option<String> {
    base.join(link).ok().map(|u| u.to_string())
}

pub(crate) fn selector(css: &str) -> scraper::Selector {
    scraper::Selector::parse(css).unwrap_or_else(|e| panic!("bad selector {css}: {e:?}"))
}
