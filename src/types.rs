use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Bucket key -> ordered list of URLs. Keys are source URLs (by-source weighting)
/// or media URLs (by-item weighting).
pub type UrlMap = HashMap<String, Vec<String>>;

/// Media URL -> permalink of the post it was discovered in.
pub type PostMap = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    #[default]
    Source,
    Item,
}

/// Listing order used for reddit sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditFunc {
    #[default]
    Hot,
    New,
    Top,
    Controversial,
    Rising,
}

impl RedditFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedditFunc::Hot => "hot",
            RedditFunc::New => "new",
            RedditFunc::Top => "top",
            RedditFunc::Controversial => "controversial",
            RedditFunc::Rising => "rising",
        }
    }
}

/// A configured content origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySource {
    pub url: String,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub include_retweets: bool,
    #[serde(default)]
    pub include_replies: bool,
    #[serde(default)]
    pub reddit_func: RedditFunc,
    /// Written back by the caller once a scrape finishes.
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub offline: bool,
}

impl LibrarySource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.blacklist.iter().any(|b| b == url)
    }
}

/// Adapter-defined pagination position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Cursor {
    /// Nothing fetched yet.
    #[default]
    Start,
    Page { page: u32 },
    Token { token: String },
    /// Up to three nesting levels, outermost first. Two-level adapters leave `sub` at 0.
    Nested { outer: u32, inner: u32, sub: u32 },
    /// Terminal. The source must be reset before it is fetched again.
    Exhausted,
}

impl Cursor {
    pub fn page(page: u32) -> Self { Cursor::Page { page } }

    pub fn token(token: impl Into<String>) -> Self { Cursor::Token { token: token.into() } }

    pub fn nested(outer: u32, inner: u32, sub: u32) -> Self { Cursor::Nested { outer, inner, sub } }

    pub fn is_exhausted(&self) -> bool { matches!(self, Cursor::Exhausted) }

    /// Page number, with `Start` mapped to `first`.
    pub fn page_or(&self, first: u32) -> u32 {
        match self {
            Cursor::Page { page } => *page,
            _ => first,
        }
    }

    pub fn token_str(&self) -> Option<&str> {
        match self {
            Cursor::Token { token } => Some(token.as_str()),
            _ => None,
        }
    }

    /// Nested levels, with anything else mapped to `(first_outer, 0, 0)`.
    pub fn levels_or(&self, first_outer: u32) -> (u32, u32, u32) {
        match self {
            Cursor::Nested { outer, inner, sub } => (*outer, *inner, *sub),
            _ => (first_outer, 0, 0),
        }
    }

    /// Depth-first step at the innermost level.
    pub fn next_sub(&self) -> Self {
        let (outer, inner, sub) = self.levels_or(0);
        Cursor::nested(outer, inner, sub + 1)
    }

    /// Roll over `sub` into the next `inner` slot.
    pub fn next_inner(&self) -> Self {
        let (outer, inner, _) = self.levels_or(0);
        Cursor::nested(outer, inner + 1, 0)
    }

    /// Roll over both lower levels into the next `outer` slot.
    pub fn next_outer(&self) -> Self {
        let (outer, _, _) = self.levels_or(0);
        Cursor::nested(outer + 1, 0, 0)
    }
}

/// Per-source continuation state, owned by the caller between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub next: Cursor,
    pub count: usize,
    pub retries: u32,
    pub uuid: String,
}

impl Default for ContinuationToken {
    fn default() -> Self { Self::new() }
}

impl ContinuationToken {
    pub fn new() -> Self {
        Self { next: Cursor::Start, count: 0, retries: 0, uuid: uuid::Uuid::new_v4().to_string() }
    }

    pub fn is_exhausted(&self) -> bool { self.next.is_exhausted() }

    pub fn reset(&mut self) {
        self.next = Cursor::Start;
        self.count = 0;
        self.retries = 0;
    }
}

/// Outcome of one page request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Newly discovered playable URLs from this page.
    pub data: Vec<String>,
    pub all_urls: UrlMap,
    pub all_posts: PostMap,
    pub weight: WeightMode,
    pub helpers: ContinuationToken,
    pub source: LibrarySource,
    /// Suggested minimum delay before the next request for this source.
    pub timeout_ms: Option<u64>,
    pub system_message: Option<String>,
    pub captcha: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn has_message(&self) -> bool {
        self.system_message.is_some() || self.captcha.is_some() || self.warning.is_some() || self.error.is_some()
    }
}
