//! Schema and application config reads.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use url::Url;

use super::{base_request, endpoint, with_query, Download, Fetch, Parameters, Resource};
use crate::decode;
use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::types::{BaasConfig, ClassSchema, QueryResponse};

/// `GET /schemas` or `GET /schemas/{class}`.
///
/// The server answers the first with `{"results":[…]}` and the second with a
/// bare schema object; both decode into a `QueryResponse<ClassSchema>`.
#[derive(Debug, Clone)]
pub struct ClassSchemaQuery {
    base_url: Url,
    class_name: Option<String>,
    parameters: Parameters,
    headers: Headers,
}

impl ClassSchemaQuery {
    /// All class schemas.
    pub fn all(base_url: Url) -> Self {
        Self {
            base_url,
            class_name: None,
            parameters: Parameters::new(),
            headers: Headers::new(),
        }
    }

    /// The schema of one class.
    pub fn class(base_url: Url, class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            ..Self::all(base_url)
        }
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

impl Resource for ClassSchemaQuery {
    type Output = QueryResponse<ClassSchema>;

    fn request(&self) -> Option<HttpRequest> {
        let url = match &self.class_name {
            Some(class_name) => endpoint(&self.base_url, &["schemas", class_name])?,
            None => endpoint(&self.base_url, &["schemas"])?,
        };
        let url = with_query(url, &self.parameters);
        Some(base_request(HttpMethod::Get, url, &self.headers))
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single_or_query(&body)
    }
}

impl Fetch for ClassSchemaQuery {}

/// `GET /config`. The output defaults to `BaasConfig` but any type matching
/// the deployment's config document can be used.
#[derive(Debug, Clone)]
pub struct ConfigResource<T = BaasConfig> {
    base_url: Url,
    headers: Headers,
    _response: PhantomData<fn() -> T>,
}

impl<T> ConfigResource<T> {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
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
}

impl<T: DeserializeOwned> Resource for ConfigResource<T> {
    type Output = T;

    fn request(&self) -> Option<HttpRequest> {
        let url = endpoint(&self.base_url, &["config"])?;
        Some(base_request(HttpMethod::Get, url, &self.headers))
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<T: DeserializeOwned> Fetch for ConfigResource<T> {}

impl<T: DeserializeOwned> Download for ConfigResource<T> {
    type Downloaded = T;

    fn downloaded(output: T) -> T {
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::test_support::{base, config_headers};

    #[test]
    fn all_schemas_path() {
        let request = ClassSchemaQuery::all(base()).request().unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url.as_str(), "https://parse.example.org/parse/schemas");
    }

    #[test]
    fn class_schema_path_with_parameters() {
        let request = ClassSchemaQuery::class(base(), "Event")
            .parameter("limit", 10)
            .headers(config_headers())
            .request()
            .unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://parse.example.org/parse/schemas/Event?limit=10"
        );
        assert_eq!(request.headers.get("x-parse-client-key"), Some("client"));
    }

    #[test]
    fn empty_class_name_fails() {
        assert!(ClassSchemaQuery::class(base(), "").request().is_none());
    }

    #[test]
    fn bare_schema_becomes_single_result() {
        let response = ClassSchemaQuery::class(base(), "Event")
            .decode(br#"{"className":"Event","fields":{}}"#.to_vec())
            .unwrap();
        assert_eq!(response.count, Some(1));
        assert_eq!(response.results[0].class_name, "Event");
    }

    #[test]
    fn config_path_and_decode() {
        let resource = ConfigResource::<BaasConfig>::new(base()).headers(config_headers());
        let request = resource.request().unwrap();
        assert_eq!(request.url.as_str(), "https://parse.example.org/parse/config");
        assert!(request.body.is_none());

        let config = resource
            .decode(br#"{"params":{"welcome":"hello"}}"#.to_vec())
            .unwrap();
        assert_eq!(config.params["welcome"], "hello");
    }

    #[test]
    fn config_null_is_invalid_response() {
        let err = ConfigResource::<BaasConfig>::new(base())
            .decode(b"null".to_vec())
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidResponse));
    }
}
