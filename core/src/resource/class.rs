//! Class object resources: query, create, update and delete.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{
    base_request, endpoint, json_body, with_query, Delete, Download, Fetch, Parameters, Put,
    Resource, Update, Upload,
};
use crate::config::headers;
use crate::decode;
use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::types::{QueryResponse, UpdateResponse, UploadResponse};

/// `GET /classes/{class}` with query parameters.
///
/// ```console
/// curl -X GET -H "X-Parse-Application-Id: …" \
///   'https://parse.example.org/parse/classes/Event?limit=1'
/// ```
#[derive(Debug, Clone)]
pub struct ClassQuery<T> {
    base_url: Url,
    class_name: String,
    parameters: Parameters,
    headers: Headers,
    _response: PhantomData<fn() -> T>,
}

impl<T> ClassQuery<T> {
    pub fn new(base_url: Url, class_name: impl Into<String>) -> Self {
        Self {
            base_url,
            class_name: class_name.into(),
            parameters: Parameters::new(),
            headers: Headers::new(),
            _response: PhantomData,
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

    pub fn limit(self, limit: u64) -> Self {
        self.parameter("limit", limit)
    }

    pub fn skip(self, skip: u64) -> Self {
        self.parameter("skip", skip)
    }

    pub fn order(self, order: impl fmt::Display) -> Self {
        self.parameter("order", order)
    }

    /// Ask the server for the total `count` alongside the results.
    pub fn with_count(self) -> Self {
        self.parameter("count", 1)
    }

    /// Constraint object, sent as the JSON text of the `where` parameter.
    pub fn filter(self, constraints: &Value) -> Self {
        self.parameter("where", constraints)
    }
}

impl<T: DeserializeOwned> Resource for ClassQuery<T> {
    type Output = QueryResponse<T>;

    fn request(&self) -> Option<HttpRequest> {
        let url = endpoint(&self.base_url, &["classes", &self.class_name])?;
        let url = with_query(url, &self.parameters);
        Some(base_request(HttpMethod::Get, url, &self.headers))
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::query(&body)
    }
}

impl<T: DeserializeOwned> Fetch for ClassQuery<T> {}

impl<T: DeserializeOwned> Download for ClassQuery<T> {
    type Downloaded = Vec<T>;

    fn downloaded(output: QueryResponse<T>) -> Vec<T> {
        output.results
    }
}

/// `POST /classes/{class}` with the encoded object as body.
#[derive(Debug, Clone)]
pub struct UploadClass<U> {
    base_url: Url,
    class_name: String,
    object: Option<U>,
    headers: Headers,
}

impl<U> UploadClass<U> {
    pub fn new(base_url: Url, class_name: impl Into<String>, object: Option<U>) -> Self {
        Self {
            base_url,
            class_name: class_name.into(),
            object,
            headers: Headers::new(),
        }
    }

    pub fn headers<K: AsRef<str>, V: fmt::Display>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn object(&self) -> Option<&U> {
        self.object.as_ref()
    }
}

impl<U: Serialize> Resource for UploadClass<U> {
    type Output = UploadResponse;

    fn request(&self) -> Option<HttpRequest> {
        let body = json_body(self.object.as_ref()?)?;
        let url = endpoint(&self.base_url, &["classes", &self.class_name])?;
        let mut request = base_request(HttpMethod::Post, url, &self.headers);
        request.headers.insert(headers::CONTENT_TYPE, headers::JSON);
        request.body = Some(body);
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<U: Serialize> Put for UploadClass<U> {}
impl<U: Serialize> Upload for UploadClass<U> {}

/// `PUT /classes/{class}/{objectId}` with the encoded object as body.
#[derive(Debug, Clone)]
pub struct UpdateClass<U> {
    base_url: Url,
    class_name: String,
    object_id: String,
    object: Option<U>,
    headers: Headers,
}

impl<U> UpdateClass<U> {
    pub fn new(
        base_url: Url,
        class_name: impl Into<String>,
        object_id: impl Into<String>,
        object: Option<U>,
    ) -> Self {
        Self {
            base_url,
            class_name: class_name.into(),
            object_id: object_id.into(),
            object,
            headers: Headers::new(),
        }
    }

    pub fn headers<K: AsRef<str>, V: fmt::Display>(
        mut self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn object(&self) -> Option<&U> {
        self.object.as_ref()
    }
}

impl<U: Serialize> Resource for UpdateClass<U> {
    type Output = UpdateResponse;

    fn request(&self) -> Option<HttpRequest> {
        let body = json_body(self.object.as_ref()?)?;
        let url = endpoint(
            &self.base_url,
            &["classes", &self.class_name, &self.object_id],
        )?;
        let mut request = base_request(HttpMethod::Put, url, &self.headers);
        request.headers.insert(headers::CONTENT_TYPE, headers::JSON);
        request.body = Some(body);
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<U: Serialize> Put for UpdateClass<U> {}
impl<U: Serialize> Update for UpdateClass<U> {}

/// `DELETE /classes/{class}/{objectId}`. The raw response body is returned.
#[derive(Debug, Clone)]
pub struct DeleteClass {
    base_url: Url,
    class_name: String,
    object_id: Option<String>,
    headers: Headers,
}

impl DeleteClass {
    pub fn new(base_url: Url, class_name: impl Into<String>, object_id: Option<String>) -> Self {
        Self {
            base_url,
            class_name: class_name.into(),
            object_id,
            headers: Headers::new(),
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

impl Resource for DeleteClass {
    type Output = Vec<u8>;

    fn request(&self) -> Option<HttpRequest> {
        let object_id = self.object_id.as_deref()?;
        let url = endpoint(&self.base_url, &["classes", &self.class_name, object_id])?;
        Some(base_request(HttpMethod::Delete, url, &self.headers))
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        Ok(body)
    }
}

impl Delete for DeleteClass {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::test_support::{base, config_headers, Unencodable};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Event {
        title: String,
    }

    #[test]
    fn query_builds_get_with_parameters_and_headers() {
        let request = ClassQuery::<Event>::new(base(), "Event")
            .limit(1)
            .order("-createdAt")
            .headers(config_headers())
            .request()
            .unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.url.as_str(),
            "https://parse.example.org/parse/classes/Event?limit=1&order=-createdAt"
        );
        assert_eq!(request.headers.get("X-Parse-Application-Id"), Some("app"));
        assert!(request.body.is_none());
    }

    #[test]
    fn query_filter_is_json_text() {
        let request = ClassQuery::<Event>::new(base(), "Event")
            .filter(&json!({"title": "Concert"}))
            .request()
            .unwrap();
        let (name, value) = request.url.query_pairs().next().unwrap();
        assert_eq!(name, "where");
        assert_eq!(value, r#"{"title":"Concert"}"#);
    }

    #[test]
    fn query_with_empty_class_name_fails() {
        assert!(ClassQuery::<Event>::new(base(), "").request().is_none());
    }

    #[test]
    fn query_download_keeps_results_only() {
        let query = ClassQuery::<Event>::new(base(), "Event");
        let output = query
            .decode(br#"{"results":[{"title":"a"}],"count":5}"#.to_vec())
            .unwrap();
        assert_eq!(ClassQuery::<Event>::downloaded(output), vec![Event { title: "a".into() }]);
    }

    #[test]
    fn upload_posts_json_body() {
        let event = Event {
            title: "Concert".into(),
        };
        let request = UploadClass::new(base(), "Event", Some(event))
            .headers(config_headers())
            .request()
            .unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url.as_str(), "https://parse.example.org/parse/classes/Event");
        assert_eq!(request.headers.get("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Concert"}));
    }

    #[test]
    fn upload_without_object_fails() {
        assert!(UploadClass::<Event>::new(base(), "Event", None).request().is_none());
    }

    #[test]
    fn upload_with_unencodable_object_fails() {
        assert!(UploadClass::new(base(), "Event", Some(Unencodable)).request().is_none());
    }

    #[test]
    fn content_type_wins_over_caller_headers() {
        let request = UploadClass::new(base(), "Event", Some(json!({})))
            .headers([("Content-Type", "text/plain")])
            .request()
            .unwrap();
        assert_eq!(request.headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn upload_decodes_upload_response() {
        let resource = UploadClass::new(base(), "Event", Some(json!({})));
        let response = resource
            .decode(br#"{"objectId":"gr6j9DYEZY","createdAt":"2022-01-19T15:33:58.177Z"}"#.to_vec())
            .unwrap();
        assert_eq!(response.object_id.as_deref(), Some("gr6j9DYEZY"));
    }

    #[test]
    fn update_puts_to_object_path() {
        let request = UpdateClass::new(base(), "Event", "abc123", Some(json!({"title": "x"})))
            .request()
            .unwrap();
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(
            request.url.as_str(),
            "https://parse.example.org/parse/classes/Event/abc123"
        );
        assert!(request.body.is_some());
    }

    #[test]
    fn update_without_object_fails() {
        assert!(UpdateClass::<Event>::new(base(), "Event", "abc123", None)
            .request()
            .is_none());
    }

    #[test]
    fn update_with_empty_object_id_fails() {
        assert!(UpdateClass::new(base(), "Event", "", Some(json!({})))
            .request()
            .is_none());
    }

    #[test]
    fn delete_targets_object_path() {
        let request = DeleteClass::new(base(), "Event", Some("abc123".into()))
            .headers(config_headers())
            .request()
            .unwrap();
        assert_eq!(request.method, HttpMethod::Delete);
        assert_eq!(
            request.url.as_str(),
            "https://parse.example.org/parse/classes/Event/abc123"
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn delete_without_object_id_fails() {
        assert!(DeleteClass::new(base(), "Event", None).request().is_none());
    }

    #[test]
    fn delete_returns_raw_body() {
        let resource = DeleteClass::new(base(), "Event", Some("abc123".into()));
        assert_eq!(resource.decode(b"{}".to_vec()).unwrap(), b"{}");
    }
}
