//! Executes `HttpRequest` descriptors against the network.
//!
//! # Design
//! `Transport` is the only seam where I/O happens. The default
//! `UreqTransport` is blocking and returns non-2xx responses as data, leaving
//! status interpretation to the caller. Tests substitute their own
//! implementation to replay canned responses or simulate failures.

use std::fmt;

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Builds an agent with ureq's defaults, except that 4xx/5xx responses are
    /// returned as data rather than `Err`.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Uses a caller-configured agent. It should be built with
    /// `http_status_as_error(false)` or error statuses surface as
    /// `ApiError::Transport`.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let headers = &request.headers;
        let result = if request.method.sends_body() {
            let builder = match request.method {
                HttpMethod::Post => self.agent.post(url),
                HttpMethod::Put => self.agent.put(url),
                _ => self.agent.patch(url),
            };
            with_headers(builder, headers).send(request.body.as_bytes())
        } else {
            let builder = match request.method {
                HttpMethod::Delete => self.agent.delete(url),
                _ => self.agent.get(url),
            };
            with_headers(builder, headers).call()
        };

        let mut response = result.map_err(|e| {
            warn!(method = %request.method, url, error = %e, "request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // Whole sheets can exceed ureq's default 10 MiB read limit.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(method = %request.method, url, status, "response received");

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
