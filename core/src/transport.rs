//! Transport seam and the outcome classifier shared by every verb.
//!
//! # Design
//! `Transport` is the only place the core suspends: it takes a finished
//! `HttpRequest` and returns the status/body pair. `execute` turns whatever
//! the transport produced into either the raw body bytes or one
//! `NetworkError`, identically for every operation; decoding happens
//! downstream. Timeouts belong to the transport. Dropping the future returned
//! by `execute` drops the transport future with it, which cancels the call.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{NetworkError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and reports the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::NoConnectivity(err.to_string())
    } else {
        TransportError::Failed(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Run `request` and classify the outcome.
///
/// - no connectivity → `InternetConnection`
/// - any other transport failure → `InvalidRequest`
/// - a status that is not a valid HTTP status code → `InvalidResponse`
/// - a status outside `200..300` → `DataLoading` with the untouched body
pub async fn execute(
    transport: &dyn Transport,
    request: HttpRequest,
) -> Result<Vec<u8>, NetworkError> {
    let method = request.method;
    let url = request.url.clone();

    let response = match transport.execute(request).await {
        Ok(response) => response,
        Err(TransportError::NoConnectivity(reason)) => {
            warn!(%method, %url, %reason, "no connectivity");
            return Err(NetworkError::InternetConnection);
        }
        Err(TransportError::Failed(reason)) => {
            debug!(%method, %url, %reason, "transport failed");
            return Err(NetworkError::InvalidRequest);
        }
    };

    if !(100..=599).contains(&response.status) {
        warn!(%method, %url, status = response.status, "malformed http status");
        return Err(NetworkError::InvalidResponse);
    }

    if !(200..300).contains(&response.status) {
        warn!(%method, %url, status = response.status, "request rejected by server");
        return Err(NetworkError::DataLoading {
            status_code: response.status,
            body: response.body,
        });
    }

    Ok(response.body)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

    /// Scripted in-memory transport that records every request it sees.
    pub(crate) struct ScriptedTransport {
        responder: Box<Responder>,
        delay: Option<Duration>,
        pub(crate) seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(
            responder: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn replying(status: u16, body: &str) -> Self {
            let body = body.as_bytes().to_vec();
            Self::new(move |_| Ok(HttpResponse::new(status, body.clone())))
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.responder)(&request)
        }
    }
}
