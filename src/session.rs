use std::collections::HashMap;
use std::sync::Mutex;

/// What a cached session value belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    RedditToken,
    RedGifsToken,
    TwitterBearer,
    /// Set once the shared cookie jar holds an Instagram session.
    InstagramLogin,
    /// Per Piwigo host; the session itself lives in the cookie jar.
    PiwigoLogin(String),
}

/// Process-lifetime auth cache shared by concurrent page requests.
///
/// Refresh is idempotent: two requests racing on a missing token both fetch one
/// and the later write wins, which is harmless.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<SessionKey, String>>,
}

impl SessionCache {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: &SessionKey) -> Option<String> {
        self.entries.lock().ok().and_then(|m| m.get(key).cloned())
    }

    pub fn put(&self, key: SessionKey, value: impl Into<String>) {
        if let Ok(mut m) = self.entries.lock() { m.insert(key, value.into()); }
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.entries.lock().map(|m| m.contains_key(key)).unwrap_or(false)
    }

    /// Drop a stale value so the next request re-authenticates.
    pub fn invalidate(&self, key: &SessionKey) {
        if let Ok(mut m) = self.entries.lock() { m.remove(key); }
    }
}
