use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::MapperError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = "Crypta Electrica - Spyglass Map Gen";

/// Body bytes are only guaranteed to be present for a 200 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<RawResponse, MapperError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, MapperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|err| MapperError::HttpClient(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| MapperError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<RawResponse, MapperError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| MapperError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        let status = response.status().as_u16();
        if response.status() != StatusCode::OK {
            return Ok(RawResponse {
                status,
                body: Vec::new(),
            });
        }
        let body = response.bytes().map_err(|err| MapperError::Decode {
            url: url.to_string(),
            message: format!("failed to read body: {err}"),
        })?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// GET-and-decode with a bounded number of attempts.
///
/// Only non-200 statuses are retried, immediately and without backoff.
/// Transport and decode failures end the call on the spot.
#[derive(Clone)]
pub struct FetchClient<T: Transport> {
    transport: T,
    max_attempts: u32,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T, max_attempts: u32) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn get_json<D: DeserializeOwned>(&self, url: &str) -> Result<D, MapperError> {
        for attempt in 1..=self.max_attempts {
            let response = self.transport.get(url)?;
            if !response.is_ok() {
                debug!(url, attempt, status = response.status, "transient fetch failure");
                continue;
            }
            return serde_json::from_slice(&response.body).map_err(|err| MapperError::Decode {
                url: url.to_string(),
                message: format!("{err}; body: {}", body_preview(&response.body)),
            });
        }
        Err(MapperError::RetriesExceeded {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}

fn body_preview(body: &[u8]) -> String {
    const LIMIT: usize = 256;
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
