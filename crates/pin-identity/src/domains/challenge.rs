//! Live ownership challenge for a claimed domain.
//!
//! The target domain proves control by serving the assigned token on its
//! own line at `/.well-known/pin-verify`. HTTPS is tried first, then HTTP.
//! Any transport error or non-2xx status on one scheme falls through to the
//! next; the reason is logged at debug level and never returned, so the
//! caller only learns whether the token was found.

use std::time::Duration;

use async_trait::async_trait;

use super::normalize::normalize_domain;

/// Path fetched on the target domain.
pub const WELL_KNOWN_PATH: &str = "/.well-known/pin-verify";

/// Schemes tried, in order.
pub const SCHEMES: [&str; 2] = ["https", "http"];

/// Why a single fetch did not yield a body. Only ever logged.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),
}

/// Outbound HTTP seam used by the challenge.
#[async_trait]
pub trait ChallengeFetcher: Send + Sync {
    /// GET `url` and return the body of a 2xx response as text.
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// `reqwest`-backed fetcher.
///
/// No timeout is configured on the client; bound a check with the deadline
/// argument of [`check_domain`] instead.
#[derive(Debug, Clone)]
pub struct HttpChallenger {
    client: reqwest::Client,
}

impl HttpChallenger {
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pin-identity/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChallengeFetcher for HttpChallenger {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Challenge URLs for a normalized domain, in the order they are tried.
pub fn challenge_urls(domain: &str) -> Vec<String> {
    SCHEMES
        .iter()
        .map(|scheme| format!("{scheme}://{domain}{WELL_KNOWN_PATH}"))
        .collect()
}

/// True when any line of `body`, trimmed, equals `token` exactly.
pub fn body_contains_token(body: &str, token: &str) -> bool {
    body.split('\n').any(|line| line.trim() == token)
}

/// Run the challenge for `domain` against `token`.
///
/// Returns `false` for an empty domain or token, when neither scheme serves
/// the token, and when `deadline` elapses first.
pub async fn check_domain(
    fetcher: &dyn ChallengeFetcher,
    domain: &str,
    token: &str,
    deadline: Option<Duration>,
) -> bool {
    let attempt = attempt_schemes(fetcher, domain, token);
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(found) => found,
            Err(_) => {
                log::debug!("challenge for {domain} exceeded deadline of {limit:?}");
                false
            }
        },
        None => attempt.await,
    }
}

async fn attempt_schemes(fetcher: &dyn ChallengeFetcher, domain: &str, token: &str) -> bool {
    let Some(domain) = normalize_domain(domain) else {
        return false;
    };
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    for url in challenge_urls(&domain) {
        match fetcher.fetch(&url).await {
            Ok(body) if body_contains_token(&body, token) => {
                log::debug!("challenge token found at {url}");
                return true;
            }
            Ok(_) => log::debug!("challenge token absent at {url}"),
            Err(e) => log::debug!("challenge fetch {url} failed: {e}"),
        }
    }
    false
}
