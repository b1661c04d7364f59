//! End-to-end run of every service verb against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the facade over real
//! HTTP with `ReqwestTransport`. Validates that request synthesis, outcome
//! classification and decoding agree with an actual server.

use std::sync::Arc;

use baas_core::{
    BaasConfig, ClassQuery, ClassSchemaQuery, ConfigResource, DeleteClass, DeviceType,
    ElasticSearchQuery, FunctionResource, HttpMethod, HttpRequest, ImageDataResource,
    Installation, InstallationResource, InstallationUpdate, LoginResource, NetworkConfiguration,
    NetworkError, NetworkService, ReqwestTransport, ServiceSettings, Session, SessionResource,
    Transport, UpdateClass, UploadClass, UploadFileResource, User, UserResource,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_id: Option<String>,
    title: String,
    seats: u32,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "baas_core::codec::date::option"
    )]
    starts_at: Option<DateTime<Utc>>,
}

/// Start the mock server on a random port and return its `/parse` base URL.
async fn start_server() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await });
    Url::parse(&format!("http://{addr}/parse")).unwrap()
}

fn service(base_url: &Url) -> NetworkService {
    let raw = json!({
        "base_url": base_url.as_str(),
        "application_id": "test-app",
        "client_key": "test-client"
    })
    .to_string();
    let settings = ServiceSettings::from_json(&raw).unwrap();
    NetworkService::new(settings.into_configuration(Arc::new(ReqwestTransport::new())))
}

#[tokio::test]
async fn class_lifecycle() {
    let base = start_server().await;
    let service = service(&base);
    let headers = service.headers();

    // Step 1: empty class.
    let events = service
        .download(&ClassQuery::<Event>::new(base.clone(), "Event").headers(&headers))
        .await
        .unwrap();
    assert!(events.is_empty());

    // Step 2: create two events.
    let starts_at = Utc.with_ymd_and_hms(2024, 6, 1, 19, 30, 0).unwrap();
    let concert = Event {
        object_id: None,
        title: "Summer Concert".into(),
        seats: 100,
        starts_at: Some(starts_at),
    };
    let created = service
        .upload(&UploadClass::new(base.clone(), "Event", Some(concert.clone())))
        .await
        .unwrap();
    let id = created.object_id.clone().unwrap();
    assert!(created.created_at.is_some());

    let opera = Event {
        title: "Opera".into(),
        seats: 20,
        ..concert.clone()
    };
    service
        .put(&UploadClass::new(base.clone(), "Event", Some(opera)))
        .await
        .unwrap();

    // Step 3: query with a filter and count; the tagged date survives.
    let response = service
        .fetch(
            &ClassQuery::<Event>::new(base.clone(), "Event")
                .filter(&json!({"title": "Summer Concert"}))
                .with_count(),
        )
        .await
        .unwrap();
    assert_eq!(response.count, Some(1));
    assert_eq!(response.results[0].object_id.as_deref(), Some(id.as_str()));
    assert_eq!(response.results[0].starts_at, Some(starts_at));

    // Step 4: update.
    let changes = json!({"seats": 120});
    let updated = service
        .update(&UpdateClass::new(base.clone(), "Event", &id, Some(changes)))
        .await
        .unwrap();
    assert!(updated.updated_at.is_some());

    let events = service
        .download(&ClassQuery::<Event>::new(base.clone(), "Event").order("title"))
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().any(|event| event.seats == 120));

    // Step 5: schemas, bare and wrapped.
    let one = service
        .fetch(&ClassSchemaQuery::class(base.clone(), "Event"))
        .await
        .unwrap();
    assert_eq!(one.count, Some(1));
    assert_eq!(one.results[0].class_name, "Event");
    let all = service
        .fetch(&ClassSchemaQuery::all(base.clone()))
        .await
        .unwrap();
    assert_eq!(all.results.len(), 1);

    // Step 6: delete, then delete again.
    let body = service
        .delete(&DeleteClass::new(base.clone(), "Event", Some(id.clone())))
        .await
        .unwrap();
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({}));

    let err = service
        .delete(&DeleteClass::new(base.clone(), "Event", Some(id)))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.server_error().unwrap().code, 101);
}

#[tokio::test]
async fn config_and_functions() {
    let base = start_server().await;
    let service = service(&base);

    let config = service
        .fetch(&ConfigResource::<BaasConfig>::new(base.clone()))
        .await
        .unwrap();
    assert_eq!(config.params["welcomeMessage"], "Hello from the mock server");
    let downloaded = service
        .download(&ConfigResource::<Value>::new(base.clone()))
        .await
        .unwrap();
    assert!(downloaded["params"].is_object());

    let greeting = service
        .fetch(&FunctionResource::<_, String>::new(
            base.clone(),
            "hello",
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(greeting, "Hello world!");

    service
        .upload(&UploadClass::new(
            base.clone(),
            "Event",
            Some(json!({"title": "Jazz Night", "seats": 40})),
        ))
        .await
        .unwrap();
    let hits = service
        .fetch(&FunctionResource::<_, Vec<Event>>::elastic_search(
            base.clone(),
            ElasticSearchQuery::new("Event", "jazz"),
        ))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Jazz Night");

    let err = service
        .fetch(&FunctionResource::<_, Value>::new(
            base.clone(),
            "missing",
            Some(json!({})),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.server_error().unwrap().code, 141);

    let err = service
        .fetch(&FunctionResource::<_, Vec<Event>>::new(
            base.clone(),
            "hello",
            Some(json!({})),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::JsonDecoding(_)));
}

#[tokio::test]
async fn installation_login_and_session() {
    let base = start_server().await;
    let service = service(&base);

    // Register, then read back by object id.
    let installation = Installation::new("device-1", DeviceType::Ios);
    let registered = service
        .fetch(&InstallationResource::<Installation>::new(base.clone(), installation.clone()))
        .await
        .unwrap();
    let object_id = registered.object_id.clone().unwrap();

    let known = Installation {
        object_id: Some(object_id.clone()),
        badge: Some(3),
        ..installation
    };
    let fetched = service
        .fetch(&InstallationResource::<Installation>::new(base.clone(), known.clone()))
        .await
        .unwrap();
    assert_eq!(fetched.installation_id.as_deref(), Some("device-1"));
    assert_eq!(fetched.device_type, Some(DeviceType::Ios));

    let updated = service
        .update(&InstallationUpdate::<Installation>::new(base.clone(), known))
        .await
        .unwrap();
    assert!(updated.updated_at.is_some());

    // Anonymous login, then validate the token.
    let user: User = service
        .login(&LoginResource::anonymous(base.clone(), Some("device-1".into())))
        .await
        .unwrap();
    let token = user.session_token.clone().unwrap();
    service.add_session_token_header(&token);

    let me = service
        .fetch(&UserResource::<User>::new(base.clone(), Some(token.clone())))
        .await
        .unwrap();
    assert_eq!(me.object_id, user.object_id);

    let session = service
        .fetch(&SessionResource::<Session>::new(base.clone(), &token))
        .await
        .unwrap();
    assert_eq!(session.session_token.as_deref(), Some(token.as_str()));
    assert_eq!(session.installation_id.as_deref(), Some("device-1"));
    assert!(session.expires_at.unwrap() > Utc::now());

    let err = service
        .fetch(&UserResource::<User>::new(base.clone(), Some("r:bogus".into())))
        .await
        .unwrap_err();
    assert_eq!(err.server_error().unwrap().code, 209);
}

#[tokio::test]
async fn file_upload_and_download() {
    let base = start_server().await;
    let service = service(&base);
    let jpeg = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

    let uploaded = service
        .upload(&UploadFileResource::new(base.clone(), Some(jpeg.clone())).prefix("Defect"))
        .await
        .unwrap();
    let name = uploaded.name.unwrap();
    assert!(name.starts_with("Defect-") && name.ends_with(".jpeg"), "{name}");

    let url = Url::parse(&uploaded.url.unwrap()).unwrap();
    assert_eq!(service.fetch_url(url.clone()).await.unwrap(), jpeg);

    let folder = url.join(".").unwrap();
    let stem = name.trim_end_matches(".jpeg");
    let image = service
        .fetch(&ImageDataResource::new("obj1", folder, stem, ".jpeg"))
        .await
        .unwrap();
    assert_eq!(image.object_id, "obj1");
    assert_eq!(image.data, jpeg);

    let err = service
        .upload(&UploadFileResource::new(base.clone(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::InvalidRequest));
}

#[tokio::test]
async fn reqwest_transport_reports_response_headers() {
    let base = start_server().await;
    let url = Url::parse(&format!("{base}/config")).unwrap();
    let mut request = HttpRequest::new(HttpMethod::Get, url);
    request.headers.insert("X-Parse-Application-Id", "test-app");

    let response = ReqwestTransport::new().execute(request).await.unwrap();
    assert_eq!(response.status, 200);
    let content_type = response
        .headers
        .iter()
        .find(|(name, _)| name.as_str() == "content-type")
        .map(|(_, value)| value.as_str());
    assert_eq!(content_type, Some("application/json"));
}

#[tokio::test]
async fn missing_application_id_is_rejected() {
    let base = start_server().await;
    let service = NetworkService::new(NetworkConfiguration::new(base.clone()));

    let err = service
        .fetch(&ConfigResource::<Value>::new(base))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(403));
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}/parse")).unwrap();
    let service = service(&base);
    let err = service
        .fetch(&ConfigResource::<Value>::new(base))
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::InternetConnection), "{err:?}");
}
