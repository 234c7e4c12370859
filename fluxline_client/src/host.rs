use std::time::Duration;
use url::Url;

use crate::backoff::Backoff;
use crate::error::{ClientError, ClientResult};

/// Per-host transport settings, applied to the host's own HTTP client.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Overrides the default user agent.
    pub user_agent: Option<String>,
    /// Accepts invalid TLS certificates on this host. Intended for
    /// self-signed development servers.
    pub danger_accept_invalid_certs: bool,
}

/// One database endpoint with its current backoff state.
///
/// A host is owned by the pool and lives in exactly one of its two sets at
/// any time. The backoff value is replaced only by the penalize and success
/// paths.
#[derive(Debug, Clone)]
pub struct Host {
    url: Url,
    options: TransportOptions,
    backoff: Backoff,
    http: reqwest::Client,
}

impl Host {
    /// Creates a host from a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] for schemes other than `http` and
    /// `https`, and [`ClientError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(url: Url, backoff: Backoff, options: TransportOptions) -> ClientResult<Self> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::InvalidUrl(url.to_string()));
        }
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if options.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            url,
            options,
            backoff,
            http: builder.build()?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The delay the current strategy would apply before re-admission.
    pub fn current_delay(&self) -> Duration {
        self.backoff.delay()
    }

    /// Resets the backoff after a successful request.
    pub fn success(&mut self) {
        self.backoff = self.backoff.reset();
    }

    /// Computes the re-enable delay for this failure and advances the
    /// strategy.
    pub fn fail(&mut self) -> Duration {
        let delay = self.backoff.delay();
        self.backoff = self.backoff.next();
        delay
    }

    /// Joins the host URL with a request path, preserving any path prefix.
    pub fn full_path(&self, path: &str) -> String {
        format!("{}{}", self.url.as_str().trim_end_matches('/'), path)
    }
}
