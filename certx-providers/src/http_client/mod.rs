//! Transport seam for talking to the registry over HTTP.
//!
//! Everything above this module deals in [`RequestBuilder`] and [`Response`]; the
//! concrete client is swappable, see [`imp::reqwest_client::ReqwestClient`].

use std::{collections::HashMap, fmt::Display, sync::Arc};

use serde::Serialize;
use thiserror::Error;

pub mod imp;


#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    fn request(&self, method: Method, url: &str) -> RequestBuilder;

    async fn send(&self, request: Request) -> Result<Response, Error>;
}

pub type Headers = HashMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A fully built request, handed to [`HttpClient::send`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    /// Blank or whitespace-only body.
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Human readable error text: the `message` or `error` field of a JSON body, or the
    /// raw body.
    pub fn error_message(&self) -> String {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            message: Option<String>,
            error: Option<String>,
        }

        let parsed = serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .and_then(|body| body.message.or(body.error));
        if let Some(message) = parsed {
            return message;
        }

        match String::from_utf8_lossy(&self.body).trim() {
            "" => format!("HTTP status {}", self.status),
            text => text.to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Url encoding error: {0}")]
    UrlEncode(#[from] serde_urlencoded::ser::Error),
    #[error("Other HTTP client error: {0}")]
    Other(String),
}

pub struct RequestBuilder {
    client: Arc<dyn HttpClient>,
    request: Request,
}

impl RequestBuilder {
    pub fn new(client: Arc<dyn HttpClient>, method: Method, url: &str) -> Self {
        Self {
            client,
            request: Request {
                method,
                url: url.to_owned(),
                headers: Headers::default(),
                body: None,
            },
        }
    }

    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.request
            .headers
            .insert("Authorization".to_owned(), format!("Bearer {token}"));
        self
    }

    /// Appends `value` to the url as a query string.
    pub fn query<T: Serialize>(mut self, value: T) -> Result<Self, Error> {
        let query = serde_urlencoded::to_string(value)?;
        if !query.is_empty() {
            let separator = if self.request.url.contains('?') { '&' } else { '?' };
            self.request.url.push(separator);
            self.request.url.push_str(&query);
        }
        Ok(self)
    }

    pub fn json<T: Serialize>(mut self, value: T) -> Result<Self, Error> {
        self.request.body = Some(serde_json::to_vec(&value)?);
        self.request
            .headers
            .insert("Content-Type".to_owned(), "application/json".to_owned());
        Ok(self)
    }

    pub async fn send(self) -> Result<Response, Error> {
        tracing::debug!(
            url = %self.request.url,
            method = ?self.request.method,
            "sending registry request"
        );

        self.client.send(self.request).await
    }
}
