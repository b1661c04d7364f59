//! Cloud function calls.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::{base_request, endpoint, json_body, Fetch, Resource};
use crate::config::headers;
use crate::decode;
use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::types::ElasticSearchQuery;

/// Name of the server-side search function.
pub const ELASTIC_SEARCH: &str = "elastic-search";

/// `POST /functions/{name}` with the encoded parameter as body. The answer is
/// `{"result": T}` and only `T` is returned.
#[derive(Debug, Clone)]
pub struct FunctionResource<P, T> {
    base_url: Url,
    name: String,
    parameter: Option<P>,
    headers: Headers,
    _response: PhantomData<fn() -> T>,
}

impl<P, T> FunctionResource<P, T> {
    pub fn new(base_url: Url, name: impl Into<String>, parameter: Option<P>) -> Self {
        Self {
            base_url,
            name: name.into(),
            parameter,
            headers: Headers::new(),
            _response: PhantomData,
        }
    }

    pub fn headers<K: AsRef<str>, V: fmt::Display>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> FunctionResource<ElasticSearchQuery, T> {
    /// Full-text search through the `elastic-search` function.
    pub fn elastic_search(base_url: Url, query: ElasticSearchQuery) -> Self {
        Self::new(base_url, ELASTIC_SEARCH, Some(query))
    }
}

impl<P: Serialize, T: DeserializeOwned> Resource for FunctionResource<P, T> {
    type Output = T;

    fn request(&self) -> Option<HttpRequest> {
        let body = json_body(self.parameter.as_ref()?)?;
        let url = endpoint(&self.base_url, &["functions", &self.name])?;
        let mut request = base_request(HttpMethod::Post, url, &self.headers);
        request.headers.insert(headers::CONTENT_TYPE, headers::JSON);
        request.body = Some(body);
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::function(&body)
    }
}

impl<P: Serialize, T: DeserializeOwned> Fetch for FunctionResource<P, T> {}
