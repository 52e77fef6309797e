use std::time::{Duration, Instant};

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::HttpSettings;
use crate::error::{Result, ScrapeError};

/// Shared HTTP client. One cookie jar per process so site logins stick.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    slow_warn: Duration,
}

/// Body of an HTML page together with the URL it ended up at after redirects.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub final_url: Url,
    pub body: String,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_millis(settings.timeout_ms))
            .cookie_store(true)
            .build()?;
        Ok(Self { client, slow_warn: Duration::from_millis(settings.slow_warn_ms) })
    }

    pub fn get(&self, url: &str) -> RequestBuilder { self.client.get(url) }
    pub fn post(&self, url: &str) -> RequestBuilder { self.client.post(url) }

    /// Send and fail on any non-success status.
    pub async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let request = req.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %redact(&url), "request");
        let start = Instant::now();
        let resp = self.client.execute(request).await?;
        self.warn_if_slow(start, &url);
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status { url: redact(&url), status: status.as_u16() });
        }
        Ok(resp)
    }

    pub async fn text(&self, req: RequestBuilder) -> Result<String> {
        Ok(self.send(req).await?.text().await?)
    }

    pub async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = self.send(req).await?;
        let url = redact(resp.url());
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| ScrapeError::parse(url, e.to_string()))
    }

    pub async fn get_text(&self, url: &str) -> Result<String> { self.text(self.get(url)).await }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> { self.json(self.get(url)).await }

    /// GET an HTML page, keeping the post-redirect URL for block-page detection.
    pub async fn page(&self, url: &str) -> Result<Fetched> {
        let resp = self.send(self.get(url)).await?;
        let final_url = resp.url().clone();
        let body = resp.text().await?;
        Ok(Fetched { final_url, body })
    }

    fn warn_if_slow(&self, start: Instant, url: &Url) {
        let elapsed = start.elapsed();
        if elapsed > self.slow_warn {
            warn!(url = %redact(url), ?elapsed, "slow response");
        }
    }
}

// Keep API keys out of logs and error messages.
fn redact(url: &Url) -> String {
    let secret = |k: &str| {
        let k = k.to_ascii_lowercase();
        k.contains("key") || k.contains("token") || k.contains("password")
    };
    if !url.query_pairs().any(|(k, _)| secret(&k)) {
        return url.to_string();
    }
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if secret(&k) { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean.to_string()
}

/// `scheme://host[:port]` of a URL.
pub fn origin(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(h), Some(p)) => format!("{}://{}:{}", url.scheme(), h, p),
        (Some(h), None) => format!("{}://{}", url.scheme(), h),
        _ => url.scheme().to_string(),
    }
}

pub fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| ScrapeError::parse(raw, format!("not a URL: {e}")))
}

/// True when a body or landing URL carries one of the block-page signatures.
pub fn looks_blocked(page: &Fetched, signatures: &[&str]) -> bool {
    let path = page.final_url.path().to_ascii_lowercase();
    signatures.iter().any(|s| path.contains(&s.to_ascii_lowercase()) || page.body.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_keeps_port() {
        let u = Url::parse("http://127.0.0.1:45869/get_files/search_files?tags=[]").unwrap();
        assert_eq!(origin(&u), "http://127.0.0.1:45869");
        let u = Url::parse("https://e621.net/posts?tags=x").unwrap();
        assert_eq!(origin(&u), "https://e621.net");
    }

    #[test]
    fn redact_hides_keys() {
        let u = Url::parse("https://api.tumblr.com/v2/blog/x/posts?api_key=secret&offset=20").unwrap();
        let r = redact(&u);
        assert!(!r.contains("secret"));
        assert!(r.contains("offset=20"));
    }

    #[test]
    fn blocked_by_path_or_body() {
        let page = Fetched { final_url: Url::parse("https://h/human-verification").unwrap(), body: String::new() };
        assert!(looks_blocked(&page, &["human-verification"]));
        let page = Fetched { final_url: Url::parse("https://h/g/1").unwrap(), body: "<title>Just a moment...</title>".into() };
        assert!(looks_blocked(&page, &["Just a moment..."]));
        assert!(!looks_blocked(&page, &["captcha"]));
    }
}
