//! Error types for the BaaS client core.
//!
//! # Design
//! `NetworkError` is the closed set of failures every service verb can
//! return. Builders never produce it directly: a resource that cannot
//! synthesize a request yields `None`, and the service turns that into
//! `InvalidRequest`. `DataLoading` keeps the raw response body so callers can
//! inspect the server's own error payload via `server_error()`.

use serde::Deserialize;
use thiserror::Error;

/// Failures surfaced by `NetworkService` verbs.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The resource could not synthesize a request (missing field, bad URL,
    /// unencodable payload) or the transport rejected it.
    #[error("invalid request")]
    InvalidRequest,

    /// The transport reported that no network path is available.
    #[error("no internet connection")]
    InternetConnection,

    /// The transport answered with something that is not a usable HTTP
    /// response, or decoding produced no value.
    #[error("invalid response")]
    InvalidResponse,

    /// The server answered with a status outside `200..300`.
    #[error("data loading failed with HTTP {status_code}")]
    DataLoading { status_code: u16, body: Vec<u8> },

    /// The response body could not be decoded into the expected type.
    #[error("json decoding failed: {0}")]
    JsonDecoding(#[from] serde_json::Error),
}

impl NetworkError {
    /// Parse the BaaS error envelope carried by a `DataLoading` body.
    pub fn server_error(&self) -> Option<ServerError> {
        match self {
            NetworkError::DataLoading { body, .. } => serde_json::from_slice(body).ok(),
            _ => None,
        }
    }

    /// HTTP status code for `DataLoading`, `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NetworkError::DataLoading { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Error envelope returned by the server, e.g. `{"code":101,"error":"not found"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    pub code: i64,
    pub error: String,
}

/// Failures reported by a `Transport` implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No route to the server (DNS, refused connection, offline).
    #[error("no connectivity: {0}")]
    NoConnectivity(String),

    /// Any other transport-level failure.
    #[error("transport failed: {0}")]
    Failed(String),
}

/// Errors raised while turning `ServiceSettings` into a configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("base url cannot carry path segments: {0}")]
    InvalidBaseUrl(String),
}
