//! Blocking HTTP transport.
//!
//! The token cache and the fetcher only need two calls: a form POST with basic
//! auth and a GET with bearer auth. Keeping them behind [`HttpTransport`] lets the
//! retry logic be exercised without a network.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::{IngestError, Res};

/// Fixed per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection, timeout or body-read failure. Always retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

pub trait HttpTransport: Send + Sync {
    fn post_form(
        &self,
        url: &str,
        basic_auth: (&str, &str),
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;

    fn get(
        &self,
        url: &str,
        bearer: &str,
        query: &[(String, String)],
    ) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Res<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IngestError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn read(response: reqwest::Result<reqwest::blocking::Response>) -> Result<HttpResponse, TransportError> {
        let response = response.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_form(
        &self,
        url: &str,
        basic_auth: (&str, &str),
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        Self::read(
            self.client
                .post(url)
                .basic_auth(basic_auth.0, Some(basic_auth.1))
                .form(form)
                .send(),
        )
    }

    fn get(
        &self,
        url: &str,
        bearer: &str,
        query: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        Self::read(self.client.get(url).bearer_auth(bearer).query(query).send())
    }
}
