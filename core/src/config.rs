//! Shared network configuration and the settings it is built from.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SettingsError;
use crate::transport::{ReqwestTransport, Transport};

/// Header names used on the wire.
pub mod headers {
    pub const APPLICATION_ID: &str = "X-Parse-Application-Id";
    pub const CLIENT_KEY: &str = "X-Parse-Client-Key";
    pub const REST_API_KEY: &str = "X-Parse-REST-API-Key";
    pub const MASTER_KEY: &str = "X-Parse-Master-Key";
    pub const SESSION_TOKEN: &str = "X-Parse-Session-Token";
    pub const INSTALLATION_ID: &str = "X-Parse-Installation-Id";
    pub const REVOCABLE_SESSION: &str = "X-Parse-Revocable-Session";
    pub const CONTENT_TYPE: &str = "Content-Type";

    pub const JSON: &str = "application/json";
    pub const JPEG: &str = "image/jpeg";
}

/// Base URL, default headers and the transport ("session") every request
/// goes through.
#[derive(Clone)]
pub struct NetworkConfiguration {
    pub base_url: Url,
    pub headers: BTreeMap<String, String>,
    pub session: Arc<dyn Transport>,
}

impl NetworkConfiguration {
    /// Configuration using a default `ReqwestTransport`.
    pub fn new(base_url: Url) -> Self {
        Self::with_session(base_url, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_session(base_url: Url, session: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            headers: BTreeMap::new(),
            session,
        }
    }

    /// Add or overwrite a default header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.headers.insert(name.into(), value.to_string());
        self
    }
}

impl fmt::Debug for NetworkConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkConfiguration")
            .field("base_url", &self.base_url.as_str())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Credentials and endpoint for one server deployment.
///
/// ```json
/// {
///   "base_url": "https://parse.example.org/parse",
///   "application_id": "APP_ID",
///   "client_key": "CLIENT_KEY",
///   "master_key": "MASTER_KEY"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub base_url: Url,
    pub application_id: String,
    pub client_key: String,
    #[serde(default)]
    pub rest_api_key: Option<String>,
    #[serde(default)]
    pub master_key: Option<String>,
}

impl ServiceSettings {
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let settings: ServiceSettings = serde_json::from_str(raw)?;
        if settings.base_url.cannot_be_a_base() {
            return Err(SettingsError::InvalidBaseUrl(settings.base_url.to_string()));
        }
        Ok(settings)
    }

    /// Build the configuration whose default headers carry these credentials.
    pub fn into_configuration(self, session: Arc<dyn Transport>) -> NetworkConfiguration {
        let mut config = NetworkConfiguration::with_session(self.base_url, session)
            .with_header(headers::APPLICATION_ID, self.application_id)
            .with_header(headers::CLIENT_KEY, self.client_key);
        if let Some(key) = self.rest_api_key {
            config = config.with_header(headers::REST_API_KEY, key);
        }
        if let Some(key) = self.master_key {
            config = config.with_header(headers::MASTER_KEY, key);
        }
        config
    }
}
