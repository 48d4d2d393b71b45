//! Tile fetch utilities.
//!
//! [`TileFetcher`] is the seam between the render pipeline and wherever tile
//! bytes come from. [`HttpFetcher`] is the default implementation and handles
//! `http(s)://`, `file://`, bare filesystem paths and `data:` URLs.
//!
//! A tile that does not exist (HTTP 404, missing file) is not an error: it is
//! reported as `Ok(None)` so the caller can count it without drawing it.

use base64::Engine;
use reqwest::StatusCode;
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// User-Agent header sent with all requests.
pub const USER_AGENT: &str = concat!("tileprint/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a tile could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a status other than 200 or 404.
    #[error("HTTP error: {0}")]
    Status(u16),
    /// A local tile file exists but could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A `data:` URL was malformed or used an unsupported encoding.
    #[error("invalid data URL: {0}")]
    DataUrl(String),
}

/// A source of raw tile bytes.
///
/// Implementations must be `Send + Sync`: fetches run on worker threads.
pub trait TileFetcher: Send + Sync {
    /// Fetch the tile at `url`.
    ///
    /// Returns `Ok(None)` when the tile does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for any failure other than "not found".
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError>;
}

impl<T: TileFetcher + ?Sized> TileFetcher for Arc<T> {
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        (**self).fetch(url)
    }
}

/// A parsed `data:` URL that can be decoded into raw bytes.
pub struct DataURL {
    /// The full raw `data:` URL string (e.g. `data:image/png;base64,...`).
    pub raw_data: String,
}

impl DataURL {
    /// Create a new `DataURL` from a raw data URL string.
    #[must_use]
    pub const fn new(raw_data: String) -> Self {
        Self { raw_data }
    }

    /// Decode the data URL payload into raw bytes.
    ///
    /// Only base64-encoded payloads are supported; tiles are binary.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DataUrl`] if the URL has no payload separator,
    /// is not base64-encoded, or the base64 is invalid.
    pub fn decode(&self) -> Result<Vec<u8>, FetchError> {
        let data_url = self.raw_data.trim_start_matches("data:");
        let Some((metadata, data)) = data_url.split_once(',') else {
            return Err(FetchError::DataUrl("missing comma".to_string()));
        };

        if !metadata.ends_with(";base64") {
            return Err(FetchError::DataUrl(format!(
                "unsupported encoding '{metadata}'"
            )));
        }
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| FetchError::DataUrl(format!("base64 decode error: {e}")))
    }
}

/// Default tile fetcher backed by a shared blocking `reqwest` client.
///
/// Only HTTP 200 counts as success and only HTTP 404 counts as "not found";
/// every other status is an error.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher with [`DEFAULT_TIMEOUT`] and [`USER_AGENT`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(DEFAULT_TIMEOUT, USER_AGENT)
    }

    /// Create a fetcher with an explicit timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot be initialised.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    fn fetch_http(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let response = self.client.get(url).send()?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.bytes()?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(FetchError::Status(status.as_u16())),
        }
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url)
        } else if url.starts_with("data:") {
            DataURL::new(url.to_string()).decode().map(Some)
        } else {
            read_tile_file(url.strip_prefix("file://").unwrap_or(url))
        }
    }
}

/// Read a tile from the local filesystem; a missing file is "not found".
///
/// # Errors
///
/// Returns [`FetchError::Io`] for any I/O failure other than `NotFound`.
pub fn read_tile_file(path: &str) -> Result<Option<Vec<u8>>, FetchError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FetchError::Io {
            path: path.to_string(),
            source,
        }),
    }
}
