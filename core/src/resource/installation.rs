//! Installation registration, lookup and update.
//!
//! # Design
//! The same `Installation` payload drives three requests:
//!
//! | payload                | `InstallationResource`      | `InstallationUpdate`        |
//! |------------------------|-----------------------------|-----------------------------|
//! | no `objectId`          | `POST /installations`       | `POST /installations`       |
//! | `objectId` present     | `GET /installations/{id}`   | `PUT /installations/{id}`   |
//!
//! Creating requires `installationId` and `deviceType`. Reading and updating
//! an existing record require `installationId`, which is sent as
//! `X-Parse-Installation-Id`.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use url::Url;

use super::{base_request, endpoint, json_body, Fetch, Put, Resource, Update};
use crate::config::headers;
use crate::decode;
use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::types::Installation;

#[derive(Debug, Clone)]
struct Target {
    base_url: Url,
    installation: Installation,
    headers: Headers,
}

impl Target {
    fn create(&self) -> Option<HttpRequest> {
        self.installation.installation_id.as_ref()?;
        self.installation.device_type?;
        let body = json_body(&self.installation)?;
        let url = endpoint(&self.base_url, &["installations"])?;
        let mut request = base_request(HttpMethod::Post, url, &self.headers);
        request.headers.insert(headers::CONTENT_TYPE, headers::JSON);
        request.body = Some(body);
        Some(request)
    }

    fn existing(&self, method: HttpMethod, object_id: &str) -> Option<HttpRequest> {
        let installation_id = self.installation.installation_id.as_deref()?;
        let url = endpoint(&self.base_url, &["installations", object_id])?;
        let mut request = base_request(method, url, &self.headers);
        request
            .headers
            .insert(headers::INSTALLATION_ID, installation_id);
        Some(request)
    }
}

/// Look up an installation by `objectId`, or register it when it has none.
#[derive(Debug, Clone)]
pub struct InstallationResource<T = Installation> {
    target: Target,
    _response: PhantomData<fn() -> T>,
}

impl<T> InstallationResource<T> {
    pub fn new(base_url: Url, installation: Installation) -> Self {
        Self {
            target: Target {
                base_url,
                installation,
                headers: Headers::new(),
            },
            _response: PhantomData,
        }
    }

    pub fn headers<K: AsRef<str>, V: fmt::Display>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.target.headers.extend(headers);
        self
    }

    pub fn installation(&self) -> &Installation {
        &self.target.installation
    }
}

impl<T: DeserializeOwned> Resource for InstallationResource<T> {
    type Output = T;

    fn request(&self) -> Option<HttpRequest> {
        match self.target.installation.object_id.as_deref() {
            Some(object_id) => self.target.existing(HttpMethod::Get, object_id),
            None => self.target.create(),
        }
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<T: DeserializeOwned> Fetch for InstallationResource<T> {}

/// Overwrite an installation by `objectId`, or register it when it has none.
#[derive(Debug, Clone)]
pub struct InstallationUpdate<T = Installation> {
    target: Target,
    _response: PhantomData<fn() -> T>,
}

impl<T> InstallationUpdate<T> {
    pub fn new(base_url: Url, installation: Installation) -> Self {
        Self {
            target: Target {
                base_url,
                installation,
                headers: Headers::new(),
            },
            _response: PhantomData,
        }
    }

    pub fn headers<K: AsRef<str>, V: fmt::Display>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.target.headers.extend(headers);
        self
    }

    pub fn installation(&self) -> &Installation {
        &self.target.installation
    }
}

impl<T: DeserializeOwned> Resource for InstallationUpdate<T> {
    type Output = T;

    fn request(&self) -> Option<HttpRequest> {
        let Some(object_id) = self.target.installation.object_id.as_deref() else {
            return self.target.create();
        };
        self.target.installation.device_type?;
        let body = json_body(&self.target.installation)?;
        let mut request = self.target.existing(HttpMethod::Put, object_id)?;
        request.headers.insert(headers::CONTENT_TYPE, headers::JSON);
        request.body = Some(body);
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<T: DeserializeOwned> Put for InstallationUpdate<T> {}
impl<T: DeserializeOwned> Update for InstallationUpdate<T> {}
