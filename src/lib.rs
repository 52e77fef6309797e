pub mod adapters;
pub mod alerts;
pub mod classify;
pub mod config;
pub mod error;
pub mod filter;
pub mod host;
pub mod http;
pub mod merge;
pub mod resolver;
pub mod session;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::alerts::{AlertKind, AlertState};
    pub use crate::classify::{classify, SiteType};
    pub use crate::config::Settings;
    pub use crate::filter::{filter, Category};
    pub use crate::host::{Host, HostHandle, Operation, Reply, Response};
    pub use crate::merge::merge;
    pub use crate::resolver::Resolved;
    pub use crate::types::{ContinuationToken, Cursor, LibrarySource, PostMap, ScrapeResult, UrlMap, WeightMode};
    pub use crate::{PageRequest, Scraper};
}

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::{adapter_for, FetchContext, SiteAdapter};
use crate::alerts::{AlertKind, AlertState};
use crate::classify::{classify, SiteType};
use crate::config::Settings;
use crate::error::ScrapeError;
use crate::filter::Category;
use crate::http::HttpClient;
use crate::merge::merge_counted;
use crate::resolver::{Resolved, Resolver};
use crate::session::SessionCache;
use crate::types::{ContinuationToken, LibrarySource, PostMap, ScrapeResult, UrlMap, WeightMode};

/// One page request for one source. Unset options fall back to `[scrape]` settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub source: LibrarySource,
    #[serde(default)]
    pub token: ContinuationToken,
    #[serde(default)]
    pub all_urls: UrlMap,
    #[serde(default)]
    pub all_posts: PostMap,
    #[serde(default)]
    pub filter: Option<Category>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub weight: Option<WeightMode>,
}

impl PageRequest {
    pub fn new(source: LibrarySource) -> Self { Self { source, ..Default::default() } }

    /// Carry a previous result's state forward into the next page request.
    pub fn next_from(result: &ScrapeResult) -> Self {
        Self {
            source: result.source.clone(),
            token: result.helpers.clone(),
            all_urls: result.all_urls.clone(),
            all_posts: result.all_posts.clone(),
            weight: Some(result.weight),
            ..Default::default()
        }
    }
}

/// Async library entry point. Owns the HTTP client, auth caches and alert state.
pub struct Scraper {
    http: HttpClient,
    settings: Settings,
    sessions: SessionCache,
    alerts: Arc<AlertState>,
}

impl Scraper {
    pub fn new(settings: Settings) -> anyhow::Result<Self> { Self::with_alerts(settings, Arc::new(AlertState::new())) }

    /// Share alert state with another owner (tests reset it between cases).
    pub fn with_alerts(settings: Settings, alerts: Arc<AlertState>) -> anyhow::Result<Self> {
        let http = HttpClient::new(&settings.http)?;
        Ok(Self { http, settings, sessions: SessionCache::new(), alerts })
    }

    pub fn settings(&self) -> &Settings { &self.settings }
    pub fn alerts(&self) -> &AlertState { &self.alerts }

    pub fn classify(&self, url: &str) -> SiteType { classify(url) }

    pub async fn resolve(&self, url: &str) -> Resolved {
        Resolver::new(&self.http, &self.settings, &self.sessions).resolve(url).await
    }

    /// Fetch the next page for a source. Never fails: problems land in the message fields.
    pub async fn fetch_page(&self, req: PageRequest) -> ScrapeResult {
        let PageRequest { source, mut token, all_urls, all_posts, filter: wanted, strict, weight } = req;
        let opts = &self.settings.scrape;
        let category = wanted.unwrap_or(opts.filter);
        let strict = strict.unwrap_or(opts.strict);
        let weight = weight.unwrap_or(opts.weight);
        let mut result = ScrapeResult { all_urls, all_posts, weight, source: source.clone(), ..Default::default() };

        if token.is_exhausted() {
            debug!(source = %source.url, "source exhausted; reset it to scrape again");
            result.helpers = token;
            return result;
        }
        let site = classify(&source.url);
        if self.alerts.is_rate_limited(site) {
            debug!(%site, source = %source.url, "site is rate limited for this session");
            result.helpers = token;
            return result;
        }
        let adapter = adapter_for(site);
        let cx = FetchContext { http: &self.http, settings: &self.settings, sessions: &self.sessions };

        match adapter.fetch_page(&cx, &source, &mut token).await {
            Ok(page) => {
                token.retries = 0;
                let mut urls: Vec<String> = page.urls.into_iter().filter(|u| !source.is_blacklisted(u)).collect();
                if adapter.filtered() {
                    urls = filter::filter(category, &urls, strict && !adapter.loose_match());
                }
                let (merged, added) = merge_counted(&result.all_urls, &urls, &source.url, weight);
                for url in &added {
                    if let Some(post) = page.posts.get(url) {
                        result.all_posts.insert(url.clone(), post.clone());
                    }
                }
                token.count += added.len();
                result.all_urls = merged;
                result.timeout_ms = page.timeout.or(adapter.politeness()).map(|d| d.as_millis() as u64);
                if !page.warnings.is_empty() {
                    result.warning = Some(page.warnings.join("\n"));
                }
                if let Some(url) = page.captcha {
                    warn!(%site, %url, "captcha block");
                    let note = format!("{site} is asking for a captcha; solve it at {url} and try again");
                    result.warning = Some(match result.warning.take() {
                        Some(w) => format!("{note}\n{w}"),
                        None => note,
                    });
                    result.captcha = Some(url);
                }
                info!(%site, source = %source.url, new = added.len(), total = token.count, next = ?token.next, "page");
                result.data = added;
            }
            Err(e) => self.report(site, adapter, e, &mut token, &mut result),
        }
        result.helpers = token;
        result
    }

    fn report(&self, site: SiteType, adapter: &dyn SiteAdapter, e: ScrapeError, token: &mut ContinuationToken, result: &mut ScrapeResult) {
        match &e {
            ScrapeError::Unconfigured { .. } => {
                if self.alerts.raise(site, AlertKind::MissingCredentials) {
                    warn!(%site, "{e}");
                    result.system_message = Some(e.to_string());
                }
            }
            ScrapeError::Captcha { url, .. } => {
                warn!(%site, %url, "captcha block");
                result.captcha = Some(url.clone());
                result.warning = Some(e.to_string());
            }
            ScrapeError::RateLimited { .. } => {
                if self.alerts.raise(site, AlertKind::RateLimited) {
                    warn!(%site, "rate limited; pausing site");
                    result.system_message = Some(e.to_string());
                }
            }
            _ if e.is_transient() => match self.retry_cap(adapter) {
                Some(cap) if token.retries + 1 < cap => {
                    token.retries += 1;
                    warn!(%site, retries = token.retries, cap, "{e}; will retry");
                    result.warning = Some(format!("{e} (attempt {} of {cap})", token.retries));
                    result.timeout_ms = Some(backoff(token.retries).as_millis() as u64);
                }
                cap => {
                    if cap.is_some() { token.retries += 1; }
                    warn!(%site, "{e}");
                    result.error = Some(e.to_string());
                }
            },
            _ => {
                warn!(%site, "{e}");
                result.error = Some(e.to_string());
            }
        }
    }

    // The adapter's own cap, bounded by the configured maximum.
    fn retry_cap(&self, adapter: &dyn SiteAdapter) -> Option<u32> {
        adapter.retry_cap().map(|c| c.min(self.settings.scrape.max_retries.max(1)))
    }
}

fn backoff(retries: u32) -> Duration { Duration::from_secs(2u64.saturating_mul(retries as u64)) }
