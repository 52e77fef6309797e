use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::filter::Category;
use crate::types::WeightMode;

/// Everything the scraping core reads from the configuration collaborator.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub remote: RemoteSettings,
    pub scrape: ScrapeOptions,
    pub http: HttpSettings,
    pub endpoints: Endpoints,
}

/// Credentials for authenticated sites. Never persisted by the engine.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RemoteSettings {
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_refresh_token: Option<String>,
    pub tumblr_key: Option<String>,
    pub twitter_consumer_key: Option<String>,
    pub twitter_consumer_secret: Option<String>,
    pub instagram_username: Option<String>,
    pub instagram_password: Option<String>,
    pub imgur_client_id: Option<String>,
    pub hydrus_api_key: Option<String>,
    pub piwigo_username: Option<String>,
    pub piwigo_password: Option<String>,
    pub e621_username: Option<String>,
    pub e621_api_key: Option<String>,
    pub gelbooru_user_id: Option<String>,
    pub gelbooru_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScrapeOptions {
    pub filter: Category,
    /// Require extensions at the end of URLs instead of anywhere in them.
    pub strict: bool,
    pub weight: WeightMode,
    pub booru_limit: u32,
    pub e621_limit: u32,
    pub reddit_limit: u32,
    pub tumblr_limit: u32,
    pub twitter_count: u32,
    pub redgifs_count: u32,
    pub hydrus_page_size: usize,
    pub piwigo_per_page: u32,
    /// Concurrent item resolutions per page.
    pub fan_out: usize,
    pub local_recursive: bool,
    pub max_retries: u32,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            filter: Category::Any,
            strict: true,
            weight: WeightMode::Source,
            booru_limit: 100,
            e621_limit: 320,
            reddit_limit: 100,
            tumblr_limit: 20,
            twitter_count: 200,
            redgifs_count: 40,
            hydrus_page_size: 100,
            piwigo_per_page: 100,
            fan_out: 8,
            local_recursive: true,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_ms: u64,
    pub slow_warn_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("sourcewalk/{} (slideshow source scraper)", env!("CARGO_PKG_VERSION")),
            timeout_ms: 15_000,
            slow_warn_ms: 5_000,
        }
    }
}

/// Roots of fixed third-party APIs. Overridable so adapters can run against mock servers.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Endpoints {
    pub reddit_auth: String,
    pub reddit_api: String,
    pub tumblr_api: String,
    pub twitter_api: String,
    pub instagram_api: String,
    pub imgur_api: String,
    pub redgifs_api: String,
    pub luscious_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            reddit_auth: "https://www.reddit.com/api/v1/access_token".into(),
            reddit_api: "https://oauth.reddit.com".into(),
            tumblr_api: "https://api.tumblr.com/v2".into(),
            twitter_api: "https://api.twitter.com".into(),
            instagram_api: "https://i.instagram.com/api/v1".into(),
            imgur_api: "https://api.imgur.com/3".into(),
            redgifs_api: "https://api.redgifs.com/v2".into(),
            luscious_api: "https://api.luscious.net/graphql/nobatch/".into(),
        }
    }
}

impl Endpoints {
    /// Point every fixed API root at `base` (mock servers in tests).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            reddit_auth: format!("{base}/api/v1/access_token"),
            reddit_api: base.to_string(),
            tumblr_api: format!("{base}/v2"),
            twitter_api: base.to_string(),
            instagram_api: format!("{base}/api/v1"),
            imgur_api: format!("{base}/3"),
            redgifs_api: format!("{base}/v2"),
            luscious_api: format!("{base}/graphql/nobatch/"),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "sourcewalk", "sourcewalk").map(|d| d.config_dir().join("settings.toml"))
}

impl Settings {
    /// Load settings from `path` (or the default location). A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };
        let mut settings = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(&p).with_context(|| format!("reading {}", p.display()))?;
                Self::from_toml(&text).with_context(|| format!("parsing {}", p.display()))?
            }
            _ => Self::default(),
        };
        settings.apply_env(|k| std::env::var(k).ok());
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Override credentials from `SOURCEWALK_*` variables.
    pub fn apply_env<F>(&mut self, get: F)
    where F: Fn(&str) -> Option<String> {
        let r = &mut self.remote;
        let slots: [(&str, &mut Option<String>); 16] = [
            ("SOURCEWALK_REDDIT_CLIENT_ID", &mut r.reddit_client_id),
            ("SOURCEWALK_REDDIT_CLIENT_SECRET", &mut r.reddit_client_secret),
            ("SOURCEWALK_REDDIT_REFRESH_TOKEN", &mut r.reddit_refresh_token),
            ("SOURCEWALK_TUMBLR_KEY", &mut r.tumblr_key),
            ("SOURCEWALK_TWITTER_CONSUMER_KEY", &mut r.twitter_consumer_key),
            ("SOURCEWALK_TWITTER_CONSUMER_SECRET", &mut r.twitter_consumer_secret),
            ("SOURCEWALK_INSTAGRAM_USERNAME", &mut r.instagram_username),
            ("SOURCEWALK_INSTAGRAM_PASSWORD", &mut r.instagram_password),
            ("SOURCEWALK_IMGUR_CLIENT_ID", &mut r.imgur_client_id),
            ("SOURCEWALK_HYDRUS_API_KEY", &mut r.hydrus_api_key),
            ("SOURCEWALK_PIWIGO_USERNAME", &mut r.piwigo_username),
            ("SOURCEWALK_PIWIGO_PASSWORD", &mut r.piwigo_password),
            ("SOURCEWALK_E621_USERNAME", &mut r.e621_username),
            ("SOURCEWALK_E621_API_KEY", &mut r.e621_api_key),
            ("SOURCEWALK_GELBOORU_USER_ID", &mut r.gelbooru_user_id),
            ("SOURCEWALK_GELBOORU_API_KEY", &mut r.gelbooru_api_key),
        ];
        for (key, slot) in slots {
            if let Some(v) = get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                *slot = Some(v);
            }
        }
    }
}

/// Treat blank strings in the settings file the same as missing values.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
