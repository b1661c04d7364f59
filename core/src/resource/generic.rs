//! Caller-parameterized requests against any path under the base URL.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{
    base_request, endpoint, json_body, with_query, Download, Fetch, Parameters, Resource,
};
use crate::config::headers;
use crate::decode;
use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};

/// `{method} {base}/{path}` with optional query parameters and JSON body.
///
/// `path` is split on `/`; leading and trailing slashes are ignored but an
/// empty segment in between makes the request unbuildable.
#[derive(Debug, Clone)]
pub struct HttpResource<T, B = Value> {
    base_url: Url,
    path: String,
    method: HttpMethod,
    body: Option<B>,
    parameters: Parameters,
    headers: Headers,
    _response: PhantomData<fn() -> T>,
}

impl<T, B> HttpResource<T, B> {
    pub fn new(base_url: Url, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            base_url,
            path: path.into(),
            method,
            body: None,
            parameters: Parameters::new(),
            headers: Headers::new(),
            _response: PhantomData,
        }
    }

    pub fn get(base_url: Url, path: impl Into<String>) -> Self {
        Self::new(base_url, path, HttpMethod::Get)
    }

    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.parameters.insert(name.into(), value.to_string());
        self
    }

    pub fn headers<K: AsRef<str>, V: fmt::Display>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.headers.extend(headers);
        self
    }
}

impl<T: DeserializeOwned, B: Serialize> Resource for HttpResource<T, B> {
    type Output = T;

    fn request(&self) -> Option<HttpRequest> {
        let trimmed = self.path.trim_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        let segments: Vec<&str> = trimmed.split('/').collect();
        let url = with_query(endpoint(&self.base_url, &segments)?, &self.parameters);
        let mut request = base_request(self.method, url, &self.headers);
        if let Some(body) = &self.body {
            request.body = Some(json_body(body)?);
            request.headers.insert(headers::CONTENT_TYPE, headers::JSON);
        }
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<T: DeserializeOwned, B: Serialize> Fetch for HttpResource<T, B> {}

impl<T: DeserializeOwned, B: Serialize> Download for HttpResource<T, B> {
    type Downloaded = T;

    fn downloaded(output: T) -> T {
        output
    }
}
