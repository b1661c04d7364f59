//! Typed descriptions of API calls.
//!
//! # Design
//! Every resource is an immutable value that can synthesize its request on
//! demand and decode the matching response body. Synthesis is a pure
//! function of the resource's fields and returns `None` when a mandatory
//! field is missing, the URL cannot be formed, or the payload cannot be
//! encoded. The service turns `None` into `NetworkError::InvalidRequest`.
//!
//! Which service verbs accept a resource is decided statically by the
//! capability marker traits (`Fetch`, `Download`, `Put`, `Update`, `Upload`,
//! `Delete`, `Login`).
//!
//! Header precedence: the resource's own headers (usually the configuration
//! defaults) are applied first; operation-specific headers such as the
//! session token or content type are written afterwards and win.

mod auth;
mod class;
mod file;
mod function;
mod generic;
mod installation;
mod schema;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::codec;
use crate::error::NetworkError;
use crate::http::{HttpMethod, HttpRequest, Headers};

pub use auth::{LoginResource, SessionResource, UserResource};
pub use class::{ClassQuery, DeleteClass, UpdateClass, UploadClass};
pub use file::{BundleResource, ImageDataResource, UploadFileResource, UrlDataResource};
pub use function::FunctionResource;
pub use generic::HttpResource;
pub use installation::{InstallationResource, InstallationUpdate};
pub use schema::{ClassSchemaQuery, ConfigResource};

/// A typed API call: how to build the request and how to read the answer.
pub trait Resource {
    type Output;

    /// The synthesized request, or `None` when it cannot be formed.
    fn request(&self) -> Option<HttpRequest>;

    /// Turn a successful response body into the typed result.
    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError>;
}

/// Read operations.
pub trait Fetch: Resource {}

/// Read operations whose result is reshaped for bulk download.
pub trait Download: Resource {
    type Downloaded;

    fn downloaded(output: Self::Output) -> Self::Downloaded;
}

/// Create or overwrite operations.
pub trait Put: Resource {}

/// Update operations.
pub trait Update: Resource {}

/// Upload operations.
pub trait Upload: Resource {}

/// Delete operations.
pub trait Delete: Resource {}

/// Login operations.
pub trait Login: Resource {}

/// Query parameters; each value is sent as its string form.
pub type Parameters = BTreeMap<String, String>;

/// `base` extended with `segments`. Fails when the base cannot carry a path
/// or a segment is empty.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Option<Url> {
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().ok()?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Some(url)
}

pub(crate) fn with_query(mut url: Url, parameters: &Parameters) -> Url {
    if !parameters.is_empty() {
        url.query_pairs_mut().extend_pairs(parameters.iter());
    }
    url
}

pub(crate) fn base_request(method: HttpMethod, url: Url, headers: &Headers) -> HttpRequest {
    HttpRequest {
        method,
        url,
        headers: headers.clone(),
        body: None,
    }
}

pub(crate) fn json_body<T: Serialize + ?Sized>(value: &T) -> Option<Vec<u8>> {
    match codec::encode(value) {
        Ok(body) => Some(body),
        Err(err) => {
            debug!(%err, "request payload could not be encoded");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::base;
    use super::*;

    #[test]
    fn endpoint_appends_segments() {
        let url = endpoint(&base(), &["classes", "Event"]).unwrap();
        assert_eq!(url.as_str(), "https://parse.example.org/parse/classes/Event");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let base = Url::parse("https://parse.example.org/parse/").unwrap();
        let url = endpoint(&base, &["config"]).unwrap();
        assert_eq!(url.as_str(), "https://parse.example.org/parse/config");
    }

    #[test]
    fn endpoint_encodes_segment_content() {
        let url = endpoint(&base(), &["classes", "My Class"]).unwrap();
        assert_eq!(url.as_str(), "https://parse.example.org/parse/classes/My%20Class");
    }

    #[test]
    fn endpoint_rejects_empty_segment() {
        assert!(endpoint(&base(), &["classes", ""]).is_none());
    }

    #[test]
    fn endpoint_rejects_cannot_be_a_base() {
        let base = Url::parse("mailto:ops@example.org").unwrap();
        assert!(endpoint(&base, &["config"]).is_none());
    }

    #[test]
    fn query_items_use_string_form() {
        let mut parameters = Parameters::new();
        parameters.insert("limit".into(), 1.to_string());
        parameters.insert("order".into(), "-createdAt".into());
        let url = with_query(endpoint(&base(), &["classes", "Event"]).unwrap(), &parameters);
        assert_eq!(url.query(), Some("limit=1&order=-createdAt"));
    }

    #[test]
    fn empty_parameters_leave_no_query() {
        let url = with_query(base(), &Parameters::new());
        assert_eq!(url.query(), None);
    }
}
