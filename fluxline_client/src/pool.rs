//! Multi-host request dispatch with health tracking and bounded retries.
//!
//! Hosts live in an ordered available list or a disabled set. Requests pick
//! hosts round-robin; a failed request moves its host to the disabled set
//! and schedules re-admission after the host's current backoff delay. The
//! shared trio of available list, disabled set, and cursor sits behind one
//! mutex that is never held across an I/O suspension.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::backoff::Backoff;
use crate::error::{ClientError, ClientResult, NO_HOST_AVAILABLE};
use crate::host::{Host, TransportOptions};

/// Pool-wide settings.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    /// Retries after the first attempt of one logical request.
    pub max_retries: usize,
    /// Backoff template given to each new host.
    pub backoff: Backoff,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

/// HTTP method of a pool request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// One logical request to dispatch across the pool.
#[derive(Debug, Clone, Default)]
pub struct PoolRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub content_type: Option<&'static str>,
}

impl PoolRequest {
    pub fn get<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn post<S: Into<String>>(path: S) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// Health probe outcome for one host.
///
/// Probe results carry no ordering guarantee; correlate by `url`.
#[derive(Debug, Clone)]
pub struct PingResult {
    pub url: Url,
    pub online: bool,
    pub rtt: Duration,
    pub version: Option<String>,
}

#[derive(Debug)]
struct State {
    available: Vec<Host>,
    disabled: Vec<Host>,
    cursor: usize,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
}

enum Outcome {
    Success(String),
    Request(ClientError),
    Resubmit(ClientError),
    Fatal(ClientError),
}

/// A multi-host dispatcher with per-host backoff and round-robin selection.
#[derive(Debug, Clone)]
pub struct Pool {
    shared: Arc<Shared>,
    options: PoolOptions,
    auth: Option<(String, String)>,
}

impl Pool {
    /// Creates an empty pool; hosts are added with [`Pool::add_host`].
    pub fn new(options: PoolOptions, auth: Option<(String, String)>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    available: Vec::new(),
                    disabled: Vec::new(),
                    cursor: 0,
                }),
            }),
            options,
            auth,
        }
    }

    /// Adds a host with the pool's backoff template.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported scheme or an unbuildable HTTP
    /// client.
    pub fn add_host(&self, url: Url, transport: TransportOptions) -> ClientResult<()> {
        let host = Host::new(url, self.options.backoff.reset(), transport)?;
        self.shared.state.lock().available.push(host);
        Ok(())
    }

    pub fn hosts_available(&self) -> usize {
        self.shared.state.lock().available.len()
    }

    pub fn hosts_disabled(&self) -> usize {
        self.shared.state.lock().disabled.len()
    }

    /// Dispatches and returns the body as a string.
    ///
    /// # Errors
    ///
    /// Propagates classified request failures.
    pub async fn text(&self, request: &PoolRequest) -> ClientResult<String> {
        self.dispatch(request).await
    }

    /// Dispatches and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Propagates classified request failures and JSON decode errors.
    pub async fn json<T: DeserializeOwned>(&self, request: &PoolRequest) -> ClientResult<T> {
        let body = self.dispatch(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Dispatches and ignores the body.
    ///
    /// # Errors
    ///
    /// Propagates classified request failures.
    pub async fn discard(&self, request: &PoolRequest) -> ClientResult<()> {
        self.dispatch(request).await.map(drop)
    }

    /// Probes every host, available and disabled, concurrently.
    ///
    /// Never mutates pool state. Resolves once all probes complete; failures
    /// report offline with an infinite round-trip time.
    pub async fn ping(&self, timeout: Duration, path: &str) -> Vec<PingResult> {
        let hosts: Vec<Host> = {
            let state = self.shared.state.lock();
            state
                .available
                .iter()
                .chain(state.disabled.iter())
                .cloned()
                .collect()
        };
        let probes = hosts.into_iter().map(|host| {
            let auth = self.auth.clone();
            let path = path.to_string();
            async move {
                let started = Instant::now();
                let mut builder = host.http().get(host.full_path(&path)).timeout(timeout);
                if let Some((username, password)) = &auth {
                    builder = builder.basic_auth(username, Some(password));
                }
                match builder.send().await {
                    Ok(response) => PingResult {
                        url: host.url().clone(),
                        online: response.status().as_u16() < 300,
                        rtt: started.elapsed(),
                        version: response
                            .headers()
                            .get("X-Influxdb-Version")
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string),
                    },
                    Err(_) => PingResult {
                        url: host.url().clone(),
                        online: false,
                        rtt: Duration::MAX,
                        version: None,
                    },
                }
            }
        });
        futures::future::join_all(probes).await
    }

    /// Runs one logical request: select, attempt, classify, retry.
    async fn dispatch(&self, request: &PoolRequest) -> ClientResult<String> {
        let mut retries = 0;
        loop {
            let host = self.select_host()?;
            debug!(host = %host.url(), path = %request.path, "dispatching request");
            match self.attempt(&host, request).await {
                Outcome::Success(body) => {
                    self.mark_success(host.url());
                    return Ok(body);
                }
                Outcome::Request(error) | Outcome::Fatal(error) => return Err(error),
                Outcome::Resubmit(error) => {
                    self.penalize(host.url());
                    if retries < self.options.max_retries && self.hosts_available() > 0 {
                        retries += 1;
                        debug!(retries, "retrying on next host");
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Returns the host at the cursor and advances the cursor.
    fn select_host(&self) -> ClientResult<Host> {
        let mut state = self.shared.state.lock();
        if state.available.is_empty() {
            return Err(ClientError::ServiceUnavailable(NO_HOST_AVAILABLE.into()));
        }
        let index = state.cursor % state.available.len();
        let host = state.available[index].clone();
        state.cursor = (index + 1) % state.available.len();
        Ok(host)
    }

    async fn attempt(&self, host: &Host, request: &PoolRequest) -> Outcome {
        let url = host.full_path(&request.path);
        let mut builder = match request.method {
            Method::Get => host.http().get(&url),
            Method::Post => host.http().post(&url),
        };
        builder = builder.timeout(self.options.request_timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some((username, password)) = &self.auth {
            builder = builder.basic_auth(username, Some(password));
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        builder = builder.body(request.body.clone().unwrap_or_default());
        match builder.send().await {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) => classify_status(status, body),
                    Err(error) => classify_transport(error),
                }
            }
            Err(error) => classify_transport(error),
        }
    }

    /// Resets the host's backoff after a successful response.
    fn mark_success(&self, url: &Url) {
        let mut state = self.shared.state.lock();
        if let Some(host) = state.available.iter_mut().find(|host| host.url() == url) {
            host.success();
        }
    }

    /// Moves the host to the disabled set and schedules re-admission after
    /// its current backoff delay. The cursor is decremented modulo the new
    /// available-list size to preserve round-robin fairness.
    fn penalize(&self, url: &Url) {
        let delay = {
            let mut state = self.shared.state.lock();
            let Some(position) = state.available.iter().position(|host| host.url() == url)
            else {
                return;
            };
            let mut host = state.available.remove(position);
            let delay = host.fail();
            state.disabled.push(host);
            let remaining = state.available.len();
            state.cursor = if remaining == 0 {
                0
            } else {
                (state.cursor + remaining - 1) % remaining
            };
            delay
        };
        warn!(host = %url, delay_ms = delay.as_millis() as u64, "disabling host after failed request");

        // The timer holds only a weak reference; dropping the pool drops the
        // state and the fire becomes a no-op.
        let weak = Arc::downgrade(&self.shared);
        let url = url.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut state = shared.state.lock();
            if let Some(position) = state.disabled.iter().position(|host| host.url() == &url) {
                let host = state.disabled.remove(position);
                state.available.push(host);
                debug!(host = %url, "re-enabling host");
            }
        });
    }
}

fn classify_status(status: reqwest::StatusCode, body: String) -> Outcome {
    if status.is_success() {
        Outcome::Success(body)
    } else if status.as_u16() >= 500 {
        Outcome::Resubmit(ClientError::ServiceUnavailable(format!(
            "host responded with status {status}"
        )))
    } else {
        Outcome::Request(ClientError::Request {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string(),
            body,
        })
    }
}

fn classify_transport(error: reqwest::Error) -> Outcome {
    if error.is_timeout() || error.is_connect() || has_resubmit_io_source(&error) {
        Outcome::Resubmit(ClientError::ServiceUnavailable(error.to_string()))
    } else {
        Outcome::Fatal(ClientError::Transport(error))
    }
}

/// Walks the source chain for the I/O failures that warrant resubmission:
/// resets, refusals, unreachable hosts, and timeouts.
fn has_resubmit_io_source(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = error.source();
    while let Some(current) = source {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::HostUnreachable
                    | ErrorKind::NotConnected
                    | ErrorKind::BrokenPipe
                    | ErrorKind::TimedOut
            );
        }
        source = current.source();
    }
    false
}
