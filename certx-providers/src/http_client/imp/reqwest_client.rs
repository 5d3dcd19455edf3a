use std::{sync::Arc, time::Duration};

use crate::http_client::{Error, HttpClient, Method, Request, RequestBuilder, Response, StatusCode};

#[derive(Clone, Default)]
pub struct ReqwestClient {
    pub client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// A client whose every request gives up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::new(client))
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(Arc::new(self.clone()), method, url)
    }

    async fn send(&self, request: Request) -> Result<Response, Error> {
        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        // timeouts and connection failures surface as `HttpError`, which callers treat
        // as transient
        let response = builder.send().await.map_err(transport_error)?;

        let status = StatusCode(response.status().as_u16());
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?.to_vec();

        Ok(Response {
            body,
            headers,
            status,
        })
    }
}

fn transport_error(error: reqwest::Error) -> Error {
    if error.is_builder() {
        return Error::Other(error.to_string());
    }

    Error::HttpError(error.to_string())
}
