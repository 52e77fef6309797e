use std::collections::HashSet;
use std::sync::Mutex;

use crate::classify::SiteType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    MissingCredentials,
    /// Doubles as a latch: once raised, the site is skipped for the session.
    RateLimited,
}

/// One-time alerts, owned by whoever owns the [`crate::Scraper`].
#[derive(Debug, Default)]
pub struct AlertState {
    raised: Mutex<HashSet<(SiteType, AlertKind)>>,
}

impl AlertState {
    pub fn new() -> Self { Self::default() }

    /// Record the alert; true only the first time it is raised.
    pub fn raise(&self, site: SiteType, kind: AlertKind) -> bool {
        self.raised.lock().map(|mut set| set.insert((site, kind))).unwrap_or(false)
    }

    pub fn is_raised(&self, site: SiteType, kind: AlertKind) -> bool {
        self.raised.lock().map(|set| set.contains(&(site, kind))).unwrap_or(false)
    }

    pub fn is_rate_limited(&self, site: SiteType) -> bool { self.is_raised(site, AlertKind::RateLimited) }

    pub fn reset(&self) {
        if let Ok(mut set) = self.raised.lock() { set.clear(); }
    }
}
