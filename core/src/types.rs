//! Response envelopes and the built-in BaaS classes.
//!
//! # Design
//! Server-assigned fields (`objectId`, `createdAt`, ...) are optional because
//! callers build objects locally before the first round trip. Optional fields
//! are skipped when absent so that a create request never sends `null` for
//! something the server fills in itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::codec;

/// Wrapper returned by class and schema queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl<T> QueryResponse<T> {
    /// A one-element response, used when an endpoint answers with a bare object.
    pub fn single(value: T) -> Self {
        Self {
            results: vec![value],
            count: Some(1),
        }
    }
}

/// Wrapper returned by cloud functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse<T> {
    pub result: T,
}

/// Answer to creating a class object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Answer to updating a class object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Answer to a file upload, e.g. `{"url":"https://…/files/app/abc.jpeg","name":"abc.jpeg"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFileResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A user record, as returned by login and `/users/me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A session record, as returned by `/sessions/me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_with: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Ios,
    Android,
    Osx,
    Tvos,
    Watchos,
    Web,
    Windows,
    Linux,
}

/// One device/app instance registered with the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "codec::date::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Installation {
    /// A not-yet-registered installation.
    pub fn new(installation_id: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            installation_id: Some(installation_id.into()),
            device_type: Some(device_type),
            ..Self::default()
        }
    }
}

/// Schema of one class, as returned by `/schemas[/{class}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    pub class_name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_level_permissions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Value>,
}

/// Application config served from `/config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaasConfig {
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Login payload: `{"authData":{"anonymous":{"id":"…"}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub auth_data: AuthProviders,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProviders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<AnonymousAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousAuth {
    pub id: String,
}

impl AuthData {
    /// Anonymous auth keyed by the installation id.
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            auth_data: AuthProviders {
                anonymous: Some(AnonymousAuth { id: id.into() }),
            },
        }
    }
}

/// Parameter of the `elastic-search` cloud function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElasticSearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub raw: bool,
}

impl ElasticSearchQuery {
    pub fn new(index: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            query: Some(query.into()),
            raw: true,
        }
    }
}

/// Raw image bytes keyed by the object they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub object_id: String,
    pub data: Vec<u8>,
}

/// Raw bytes keyed by the URL they were fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlData {
    pub url: Url,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn upload_response_reads_plain_created_at() {
        let response: UploadResponse =
            serde_json::from_str(r#"{"objectId":"gr6j9DYEZY","createdAt":"2022-01-19T15:33:58.177Z"}"#)
                .unwrap();
        assert_eq!(response.object_id.as_deref(), Some("gr6j9DYEZY"));
        assert!(response.created_at.is_some());
    }

    #[test]
    fn update_response_tolerates_missing_field() {
        let response: UpdateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.updated_at.is_none());
    }

    #[test]
    fn anonymous_auth_data_shape() {
        let json = serde_json::to_value(AuthData::anonymous("device-1")).unwrap();
        assert_eq!(json, serde_json::json!({"authData": {"anonymous": {"id": "device-1"}}}));
    }

    #[test]
    fn new_installation_skips_server_fields() {
        let json = serde_json::to_value(Installation::new("device-1", DeviceType::Ios)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"installationId": "device-1", "deviceType": "ios"})
        );
    }

    #[test]
    fn installation_dates_encode_tagged() {
        let mut installation = Installation::new("device-1", DeviceType::Android);
        installation.updated_at = Some(Utc.with_ymd_and_hms(2023, 6, 19, 8, 0, 0).unwrap());
        let json = serde_json::to_value(&installation).unwrap();
        assert_eq!(json["updatedAt"]["__type"], "Date");
        assert_eq!(json["updatedAt"]["iso"], "2023-06-19T08:00:00.000Z");
    }

    #[test]
    fn class_schema_requires_class_name() {
        assert!(serde_json::from_str::<ClassSchema>(r#"{"results":[]}"#).is_err());
    }

    #[test]
    fn elastic_search_query_defaults_to_raw() {
        let query = ElasticSearchQuery::new("events", "concert");
        assert!(query.raw);
    }
}
