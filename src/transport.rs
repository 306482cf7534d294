//! HTTP transport abstraction.
//!
//! Registries talk to the API only through [`Transport`], so the real
//! reqwest-backed client and the in-memory [`MockTransport`] are
//! interchangeable. A response is checked against the status code its
//! endpoint promises and then handed out as a [`Body`], which callers either
//! decode into typed models or pass through verbatim.

use crate::config::Config;
use crate::error::ApiError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no response configured for {method} {path}")]
    Unrouted { method: Method, path: String },
}

/// The three verbs the API surface needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully-read response: status code, status text and the body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    /// Full status line text, e.g. `401 Unauthorized`.
    pub status_text: String,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, "200 OK", body)
    }

    /// Yield the body if the status matches what the endpoint promises.
    pub fn expect_status(self, status: u16, operation: &'static str) -> Result<Body, ApiError> {
        if self.status != status {
            return Err(ApiError::Http {
                operation,
                status: self.status_text,
            });
        }
        Ok(Body {
            bytes: self.body,
            operation,
        })
    }
}

/// A successful response body, decoded lazily.
#[derive(Debug, Clone)]
pub struct Body {
    bytes: Vec<u8>,
    operation: &'static str,
}

impl Body {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.bytes).map_err(|source| ApiError::Decode {
            operation: self.operation,
            source,
        })
    }

    /// The body as uninterpreted text, for raw output.
    pub fn into_text(self) -> String {
        match String::from_utf8(self.bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

/// Authenticated access to the API base URL.
pub trait Transport: Send + Sync {
    fn get(&self, path: &str) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;

    fn post(
        &self,
        path: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;

    fn delete(&self, path: &str)
    -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// Transport backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    /// A `timeout` of 0 disables the client timeout.
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(format!("snykctl/{}", env!("CARGO_PKG_VERSION")));
        if config.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout));
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "request");

        let mut request = self
            .client
            .request(method.into(), &url)
            .header(AUTHORIZATION, format!("token {}", self.token));
        if let Some(body) = body {
            trace!(body = %String::from_utf8_lossy(&body), "request body");
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(%method, %url, status = status.as_u16(), "response");

        Ok(ApiResponse::new(
            status.as_u16(),
            status.to_string(),
            bytes.to_vec(),
        ))
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<ApiResponse, TransportError> {
        self.send(Method::Get, path, None).await
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<ApiResponse, TransportError> {
        self.send(Method::Post, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, TransportError> {
        self.send(Method::Delete, path, None).await
    }
}

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

/// In-memory transport answering from a route table.
///
/// Unrouted requests get the fallback response if one is set, otherwise
/// they fail with [`TransportError::Unrouted`].
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: HashMap<(Method, String), ApiResponse>,
    fallback: Option<ApiResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request with the same response.
    pub fn always(response: ApiResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    pub fn on(mut self, method: Method, path: &str, response: ApiResponse) -> Self {
        self.routes.insert((method, path.to_string()), response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Paths requested with the given method, in call order.
    pub fn paths(&self, method: Method) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .map(|r| r.path)
            .collect()
    }

    fn respond(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                method,
                path: path.to_string(),
                body: body.map(|b| String::from_utf8_lossy(&b).into_owned()),
            });

        self.routes
            .get(&(method, path.to_string()))
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| TransportError::Unrouted {
                method,
                path: path.to_string(),
            })
    }
}

impl Transport for MockTransport {
    async fn get(&self, path: &str) -> Result<ApiResponse, TransportError> {
        self.respond(Method::Get, path, None)
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<ApiResponse, TransportError> {
        self.respond(Method::Post, path, Some(body))
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, TransportError> {
        self.respond(Method::Delete, path, None)
    }
}
