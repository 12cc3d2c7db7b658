//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for page markup, including:
//! - Building the shared HTTP client (user agent, timeout, cookie store)
//! - Logging in once through the configured form
//! - Classifying responses into a `FetchResult`

use crate::config::{AuthConfig, FetchConfig};
use crate::{HarvestError, Result};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// Final URL and markup of a successful fetch
    pub fn into_body(self) -> Option<(Url, String)> {
        match self {
            FetchResult::Success {
                final_url, body, ..
            } => Some((final_url, body)),
            _ => None,
        }
    }

    /// Short description used in log lines
    pub fn describe(&self) -> String {
        match self {
            FetchResult::Success { status_code, .. } => format!("HTTP {}", status_code),
            FetchResult::ContentMismatch { content_type } => {
                format!("not HTML ({})", content_type)
            }
            FetchResult::HttpError { status_code } => format!("HTTP {}", status_code),
            FetchResult::NetworkError { error } => error.clone(),
        }
    }
}

/// Source of page markup
///
/// The traversal engine only needs "URL in, markup or failure out"; tests
/// substitute an in-memory implementation.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, url: &Url) -> FetchResult;
}

/// Builds the HTTP client shared by page and image fetches
///
/// The cookie store keeps the session established by [`HttpFetcher::authenticate`].
pub fn build_http_client(config: &FetchConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Logs in using the password from the configured environment variable
    pub async fn authenticate(&self, auth: &AuthConfig) -> Result<()> {
        let password = std::env::var(&auth.password_env).map_err(|_| {
            HarvestError::Authentication(format!(
                "environment variable {} is not set",
                auth.password_env
            ))
        })?;
        self.authenticate_with_password(auth, &password).await
    }

    /// Posts the login form; the session cookie stays in the client's store
    ///
    /// A non-success status, or the failure marker appearing in the response
    /// body, is reported as [`HarvestError::Authentication`].
    pub async fn authenticate_with_password(&self, auth: &AuthConfig, password: &str) -> Result<()> {
        tracing::info!("Logging in to {} as {}", auth.login_url, auth.username);

        let form = [
            (auth.username_field.as_str(), auth.username.as_str()),
            (auth.password_field.as_str(), password),
        ];

        let response = self
            .client
            .post(&auth.login_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| HarvestError::Http {
                url: auth.login_url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Authentication(format!(
                "login form returned HTTP {}",
                status.as_u16()
            )));
        }

        if let Some(marker) = auth.failure_marker.as_deref() {
            let body = response.text().await.map_err(|e| HarvestError::Http {
                url: auth.login_url.clone(),
                source: e,
            })?;
            if body.contains(marker) {
                return Err(HarvestError::Authentication(format!(
                    "login response contains failure marker '{}'",
                    marker
                )));
            }
        }

        tracing::info!("Login succeeded");
        Ok(())
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        fetch_url(&self.client, url).await
    }
}

/// Fetches a URL and classifies the response
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML content type | Success |
/// | 2xx with any other content type | ContentMismatch |
/// | Non-2xx status | HttpError |
/// | Timeout, connection or body error | NetworkError |
///
/// Page fetches are not retried.
pub async fn fetch_url(client: &Client, url: &Url) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            return FetchResult::NetworkError { error };
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html(&content_type) {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: e.to_string(),
        },
    }
}

fn is_html(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}
