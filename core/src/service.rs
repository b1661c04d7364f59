//! The network service facade.
//!
//! # Design
//! Every verb runs the same pipeline: ask the resource for its request
//! (`None` fails fast with `InvalidRequest`), run it through
//! [`transport::execute`], then hand the body to the resource's decoder. The
//! verbs differ only in the capability they accept, so a resource can only be
//! passed to the verbs it supports.
//!
//! The configuration is the only shared state. It sits behind a `RwLock`
//! that is held just long enough to copy the transport handle and default
//! headers; the lock is never held across an await, so a header attached
//! while a request is in flight only affects requests issued afterwards.
//! Concurrent header writes are plain overwrites: the last one wins.
//!
//! Default headers from the configuration are merged into every request that
//! targets the configured base URL, underneath the resource's own headers.
//! Requests to other hosts (CDN image URLs, for example) never see them.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::{headers, NetworkConfiguration};
use crate::error::NetworkError;
use crate::http::HttpRequest;
use crate::resource::{
    BundleResource, Delete, Download, Fetch, Login, Put, Resource, Update, Upload,
    UrlDataResource,
};
use crate::transport::{self, Transport};

pub struct NetworkService {
    config: RwLock<NetworkConfiguration>,
}

impl NetworkService {
    pub fn new(config: NetworkConfiguration) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> NetworkConfiguration {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn base_url(&self) -> Url {
        self.config().base_url
    }

    /// Current default headers, for building resources by hand.
    pub fn headers(&self) -> BTreeMap<String, String> {
        self.config().headers
    }

    /// Attach `X-Parse-Session-Token` to every request issued from now on.
    pub fn add_session_token_header(&self, session_token: impl Into<String>) {
        let session_token = session_token.into();
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config
            .headers
            .insert(headers::SESSION_TOKEN.to_string(), session_token);
    }

    pub async fn fetch<R: Fetch>(&self, resource: &R) -> Result<R::Output, NetworkError> {
        self.execute("fetch", resource).await
    }

    /// Like `fetch`, reshaped for bulk download (a class query yields only
    /// its results).
    pub async fn download<R: Download>(
        &self,
        resource: &R,
    ) -> Result<R::Downloaded, NetworkError> {
        self.execute("download", resource).await.map(R::downloaded)
    }

    pub async fn put<R: Put>(&self, resource: &R) -> Result<R::Output, NetworkError> {
        self.execute("put", resource).await
    }

    pub async fn update<R: Update>(&self, resource: &R) -> Result<R::Output, NetworkError> {
        self.execute("update", resource).await
    }

    pub async fn upload<R: Upload>(&self, resource: &R) -> Result<R::Output, NetworkError> {
        self.execute("upload", resource).await
    }

    pub async fn delete<R: Delete>(&self, resource: &R) -> Result<R::Output, NetworkError> {
        self.execute("delete", resource).await
    }

    pub async fn login<R: Login>(&self, resource: &R) -> Result<R::Output, NetworkError> {
        self.execute("login", resource).await
    }

    /// Raw body of a `GET` to any URL.
    pub async fn fetch_url(&self, url: Url) -> Result<Vec<u8>, NetworkError> {
        let data = self.fetch(&UrlDataResource::new(Some(url))).await?;
        Ok(data.data)
    }

    /// Results of a local JSON fixture. No request is sent.
    pub async fn fetch_bundle<T: DeserializeOwned>(
        &self,
        resource: &BundleResource<T>,
    ) -> Result<Vec<T>, NetworkError> {
        debug!(verb = "fetch_bundle", path = ?resource.path(), "loading fixture");
        resource.load()
    }

    async fn execute<R: Resource>(
        &self,
        verb: &'static str,
        resource: &R,
    ) -> Result<R::Output, NetworkError> {
        let Some(mut request) = resource.request() else {
            debug!(verb, "resource produced no request");
            return Err(NetworkError::InvalidRequest);
        };
        let session = self.prepare(&mut request);

        debug!(verb, method = %request.method, url = %request.url, "dispatching request");
        let body = transport::execute(session.as_ref(), request).await?;
        resource.decode(body)
    }

    /// Merge default headers into `request` and return the transport to use.
    fn prepare(&self, request: &mut HttpRequest) -> Arc<dyn Transport> {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        if targets(&config.base_url, &request.url) {
            for (name, value) in &config.headers {
                if !request.headers.contains(name) {
                    request.headers.insert(name, value);
                }
            }
        }
        Arc::clone(&config.session)
    }
}

/// Whether `url` lives under `base` (same origin, path prefix).
fn targets(base: &Url, url: &Url) -> bool {
    if base.origin() != url.origin() {
        return false;
    }
    let prefix = base.path().trim_end_matches('/');
    let path = url.path();
    path == prefix || path.starts_with(&format!("{prefix}/"))
}
