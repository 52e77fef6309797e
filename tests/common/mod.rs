#![allow(dead_code)]

use sourcewalk::adapters::{adapter_for, FetchContext, Page};
use sourcewalk::classify::SiteType;
use sourcewalk::config::{Endpoints, Settings};
use sourcewalk::error::Result;
use sourcewalk::http::HttpClient;
use sourcewalk::session::SessionCache;
use sourcewalk::types::{ContinuationToken, LibrarySource};
use wiremock::MockServer;

/// Default settings with every fixed API root pointed at the mock server.
pub fn settings_for(server: &MockServer) -> Settings {
    Settings { endpoints: Endpoints::all_at(&server.uri()), ..Settings::default() }
}

/// Drives one adapter directly, for sites whose URLs only classify on their real hosts.
pub struct Harness {
    pub http: HttpClient,
    pub settings: Settings,
    pub sessions: SessionCache,
}

impl Harness {
    pub fn new(settings: Settings) -> Self {
        let http = HttpClient::new(&settings.http).expect("http client");
        Self { http, settings, sessions: SessionCache::new() }
    }

    pub fn cx(&self) -> FetchContext<'_> {
        FetchContext { http: &self.http, settings: &self.settings, sessions: &self.sessions }
    }

    pub async fn page(&self, site: SiteType, source: &str, token: &mut ContinuationToken) -> Result<Page> {
        adapter_for(site).fetch_page(&self.cx(), &LibrarySource::new(source), token).await
    }
}
