//! Synchronous client for a **PxStat JSON-RPC** endpoint (e.g. the CSO's public API).
//!
//! The caller supplies a complete JSON-RPC request body; the client POSTs it verbatim,
//! checks the HTTP status and the envelope, and flattens the JSON-stat payload in
//! `data` into a [`ResultTable`].
//!
//! ### Notes
//! - Only status `200` counts as success. Any other status fails with
//!   [`Error::Transport`] without reading the body.
//! - An `error` member in the envelope fails with [`Error::Api`], even on `200`.
//! - No retries and no caching: one call, one request.
//! - Timeouts default to 30s total / 10s connect and can be changed via [`ClientBuilder`].
//!
//! Typical usage:
//! ```no_run
//! # use pxstat_rs::Client;
//! let client = Client::default();
//! let query = r#"{"jsonrpc":"2.0","method":"PxStat.Data.Cube_API.ReadDataset","params":{}}"#;
//! let table = client.fetch(query)?;
//! println!("{} rows", table.len());
//! # Ok::<(), pxstat_rs::Error>(())
//! ```
use crate::error::{Error, Result};
use crate::jsonstat;
use crate::models::{Envelope, ResultTable};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::Duration;

/// Public CSO PxStat endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://ws.cso.ie/public/api.jsonrpc";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Client {
    pub endpoint: String,
    dataset_index: usize,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Client::builder().build().expect("reqwest client build")
    }
}

/// Construction-time settings for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    endpoint: String,
    timeout: Option<Duration>,
    connect_timeout: Duration,
    user_agent: String,
    dataset_index: usize,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: concat!("pxstat_rs/", env!("CARGO_PKG_VERSION")).into(),
            dataset_index: 0,
        }
    }
}

impl ClientBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Total request timeout. `None` waits indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Which dataset [`Client::fetch`] returns when `data` is a JSON-stat collection.
    pub fn dataset_index(mut self, index: usize) -> Self {
        self.dataset_index = index;
        self
    }

    pub fn build(self) -> Result<Client> {
        let http = HttpClient::builder()
            .timeout(self.timeout) // total request timeout
            .connect_timeout(self.connect_timeout)
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(self.user_agent)
            .build()?;
        Ok(Client {
            endpoint: self.endpoint,
            dataset_index: self.dataset_index,
            http,
        })
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client for `endpoint` with default timeouts.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Client::builder().endpoint(endpoint).build()
    }

    /// Submit `query` and flatten the returned dataset.
    ///
    /// ### Errors
    /// - [`Error::EmptyQuery`] for a blank query (nothing is sent)
    /// - [`Error::Transport`] for any status other than `200`
    /// - [`Error::Http`] when no response arrives (connect failure, timeout)
    /// - [`Error::Api`] when the envelope carries `error`
    /// - [`Error::MalformedResponse`] for a body that is not an envelope or not JSON-stat
    pub fn fetch(&self, query: &str) -> Result<ResultTable> {
        let data = self.fetch_raw(query)?;
        jsonstat::parse_nth(&data, self.dataset_index)
    }

    /// Like [`Client::fetch`], for a query that is already a JSON document.
    pub fn fetch_value(&self, query: &Value) -> Result<ResultTable> {
        let body = serde_json::to_string(query)
            .map_err(|e| Error::malformed(format!("cannot serialize query: {e}")))?;
        self.fetch(&body)
    }

    /// One table per dataset when `data` is a collection or bundle.
    pub fn fetch_all(&self, query: &str) -> Result<Vec<ResultTable>> {
        let data = self.fetch_raw(query)?;
        jsonstat::parse_all(&data)
    }

    /// Run the request/envelope checks and return the detached `data` document.
    pub fn fetch_raw(&self, query: &str) -> Result<Value> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        log::debug!("POST {} ({} bytes)", self.endpoint, query.len());
        let resp = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(query.to_owned())
            .send()
            .inspect_err(|e| log::warn!("POST {} failed: {}", self.endpoint, e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            log::warn!("POST {} returned HTTP {}", self.endpoint, status);
            return Err(Error::Transport {
                code: status.as_u16(),
            });
        }

        let body = resp.bytes()?;
        log::debug!("received {} bytes", body.len());

        Envelope::from_slice(&body)?.into_data().inspect_err(|e| {
            if let Error::Api { code, message } = e {
                log::warn!("api error {}: {}", code, message);
            }
        })
    }
}
