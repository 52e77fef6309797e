use thiserror::Error;

use crate::classify::SiteType;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Per-source failure taxonomy. None of these is fatal to the process.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Required credentials are missing from the remote settings.
    #[error("{site} sources need {needs}; add them under [remote] in settings.toml")]
    Unconfigured { site: SiteType, needs: &'static str },

    /// The site answered with an anti-bot page that must be solved by hand.
    #[error("{site} is asking for a captcha; solve it at {url} and try again")]
    Captcha { site: SiteType, url: String },

    #[error("{site} is rate limiting requests; pausing this site for the rest of the session")]
    RateLimited { site: SiteType },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported source: {0}")]
    Unsupported(String),
}

impl ScrapeError {
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Parse { url: url.into(), message: message.into() }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ScrapeError::Status { status, .. } => Some(*status),
            ScrapeError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Timeouts, 4xx/5xx and payload surprises; eligible for bounded retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScrapeError::Status { .. } | ScrapeError::Network(_) | ScrapeError::Parse { .. } | ScrapeError::Json(_)
        )
    }
}
