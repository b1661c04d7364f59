//! File upload, raw byte downloads and local JSON fixtures.

use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::{base_request, endpoint, Fetch, Resource, Upload};
use crate::config::headers;
use crate::decode;
use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::types::{ImageData, UploadFileResponse, UrlData};

/// `POST /files/{name}.jpeg` with the raw image bytes as body.
///
/// The file name embeds a random UUID drawn on every call to `request()`, so
/// two syntheses from the same resource never target the same URL. Tests
/// must not compare the generated path against a fixed string.
#[derive(Debug, Clone)]
pub struct UploadFileResource {
    base_url: Url,
    data: Option<Vec<u8>>,
    prefix: Option<String>,
    headers: Headers,
}

impl UploadFileResource {
    pub fn new(base_url: Url, data: Option<Vec<u8>>) -> Self {
        Self {
            base_url,
            data,
            prefix: None,
            headers: Headers::new(),
        }
    }

    /// Prepend `{prefix}-` to the generated file name.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn headers<K: AsRef<str>, V: fmt::Display>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.headers.extend(headers);
        self
    }

    fn file_name(&self) -> String {
        let id = Uuid::new_v4();
        match &self.prefix {
            Some(prefix) => format!("{prefix}-{id}.jpeg"),
            None => format!("{id}.jpeg"),
        }
    }
}

impl Resource for UploadFileResource {
    type Output = UploadFileResponse;

    fn request(&self) -> Option<HttpRequest> {
        let data = self.data.as_ref()?;
        let url = endpoint(&self.base_url, &["files", &self.file_name()])?;
        let mut request = base_request(HttpMethod::Post, url, &self.headers);
        request.headers.insert(headers::CONTENT_TYPE, headers::JPEG);
        request.body = Some(data.clone());
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl Upload for UploadFileResource {}

/// `GET` of an arbitrary URL, returning the body untouched.
#[derive(Debug, Clone)]
pub struct UrlDataResource {
    url: Option<Url>,
}

impl UrlDataResource {
    pub fn new(url: Option<Url>) -> Self {
        Self { url }
    }
}

impl Resource for UrlDataResource {
    type Output = UrlData;

    fn request(&self) -> Option<HttpRequest> {
        let url = self.url.clone()?;
        Some(HttpRequest::new(HttpMethod::Get, url))
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        // `request()` already fails without a URL; direct calls get the same error.
        let url = self.url.clone().ok_or(NetworkError::InvalidRequest)?;
        Ok(UrlData { url, data: body })
    }
}

impl Fetch for UrlDataResource {}

/// `GET {base}/{file_name}{mime_type}`, returning the image bytes keyed by
/// the object they belong to.
///
/// Image references are stored percent-encoded by some clients; the assembled
/// URL is percent-decoded once before it is parsed so that the server sees a
/// single level of encoding. When the decoded form is not valid UTF-8 or not
/// a URL, the assembled URL is used as is.
#[derive(Debug, Clone)]
pub struct ImageDataResource {
    object_id: String,
    base_url: Url,
    file_name: String,
    mime_type: String,
}

impl ImageDataResource {
    pub fn new(
        object_id: impl Into<String>,
        base_url: Url,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            base_url,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    fn url(&self) -> Option<Url> {
        if self.object_id.is_empty() || self.file_name.is_empty() || self.mime_type.is_empty() {
            return None;
        }
        if self.base_url.cannot_be_a_base() {
            return None;
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!("{base}/{}{}", self.file_name, self.mime_type);
        percent_decode_str(&raw)
            .decode_utf8()
            .ok()
            .and_then(|decoded| Url::parse(&decoded).ok())
            .or_else(|| Url::parse(&raw).ok())
    }
}

impl Resource for ImageDataResource {
    type Output = ImageData;

    fn request(&self) -> Option<HttpRequest> {
        Some(HttpRequest::new(HttpMethod::Get, self.url()?))
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        Ok(ImageData {
            object_id: self.object_id.clone(),
            data: body,
        })
    }
}

impl Fetch for ImageDataResource {}

/// A `{"results":[…]}` JSON fixture read from a local directory instead of
/// the network.
#[derive(Debug, Clone)]
pub struct BundleResource<T> {
    directory: PathBuf,
    file_name: String,
    _response: PhantomData<fn() -> T>,
}

impl<T> BundleResource<T> {
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            _response: PhantomData,
        }
    }

    /// Location of the fixture. The file name must have exactly the form
    /// `stem.ext` with both parts non-empty.
    pub fn path(&self) -> Option<PathBuf> {
        let mut parts = self.file_name.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(stem), Some(ext), None) if !stem.is_empty() && !ext.is_empty() => {
                Some(self.directory.join(&self.file_name))
            }
            _ => None,
        }
    }
}

impl<T: DeserializeOwned> BundleResource<T> {
    /// Read and decode the fixture, yielding its results.
    pub fn load(&self) -> Result<Vec<T>, NetworkError> {
        let path = self.path().ok_or(NetworkError::InvalidRequest)?;
        let body = fs::read(&path).map_err(|err| {
            debug!(path = %path.display(), %err, "fixture could not be read");
            NetworkError::InvalidRequest
        })?;
        Ok(decode::query::<T>(&body)?.results)
    }
}
