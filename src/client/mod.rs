//! Authenticated client for the VisioFex (KonaCash) REST API

mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpTransport;

use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;

use crate::types::{Result, VxfError};

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP method subset used against the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Fully prepared outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Raw response as seen by the transport
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Moves a request over the wire.
///
/// An `Err` is a transport failure (DNS, timeout, connection refused);
/// any HTTP status, including errors, comes back as `Ok`.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String> {
        (**self).send(request)
    }
}

/// API client with an injected key and transport
pub struct ApiClient {
    transport: Box<dyn Transport>,
    api_base: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(
        transport: Box<dyn Transport>,
        api_base: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        tracing::info!(api_key_set = api_key.is_some(), "API client initialized");
        Self {
            transport,
            api_base: api_base.into(),
            api_key,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Join the base URL and a relative path with exactly one slash
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Issue an authenticated request and return the decoded JSON body.
    ///
    /// A 2xx body that is not valid JSON comes back as `Value::String`
    /// holding the raw text.
    pub fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.execute(method, self.url_for(path), body)
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::Get, path, None)
    }

    /// GET `path` with form-encoded query parameters appended
    pub fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        if self.api_key.is_none() {
            return Err(VxfError::MissingCredential);
        }
        let mut url = Url::parse(&self.url_for(path))
            .map_err(|e| VxfError::Config(format!("invalid API URL: {}", e)))?;
        url.query_pairs_mut().extend_pairs(query);
        self.execute(Method::Get, url.to_string(), None)
    }

    fn execute(&self, method: Method, url: String, body: Option<&Value>) -> Result<Value> {
        let api_key = self.api_key.as_deref().ok_or(VxfError::MissingCredential)?;

        let request = HttpRequest {
            method,
            url: url.clone(),
            headers: vec![
                (API_KEY_HEADER.to_string(), api_key.to_string()),
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: body.map(|b| b.to_string()),
        };

        tracing::debug!(method = method.as_str(), %url, "API request");
        let response = self.transport.send(&request).map_err(VxfError::Transport)?;

        if !(200..300).contains(&response.status) {
            return Err(VxfError::Http {
                status: response.status,
                body: response.body,
                url,
            });
        }

        Ok(serde_json::from_str(&response.body).unwrap_or(Value::String(response.body)))
    }
}
