//! In-memory Parse-style BaaS server for integration tests.
//!
//! # Design
//! Routes live under `/parse` and mirror the subset of the REST surface the
//! core speaks: classes, schemas, config, cloud functions, installations,
//! anonymous login, sessions and files. Every route except file downloads
//! requires `X-Parse-Application-Id`. Errors use the server's envelope
//! `{"code": <int>, "error": <message>}`.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const APPLICATION_ID: &str = "x-parse-application-id";
pub const INSTALLATION_ID: &str = "x-parse-installation-id";
pub const SESSION_TOKEN: &str = "x-parse-session-token";

const OBJECT_NOT_FOUND: i64 = 101;
const INVALID_JSON: i64 = 107;
const INVALID_CLASS_NAME: i64 = 103;
const MISSING_REQUIRED_FIELD: i64 = 135;
const SCRIPT_FAILED: i64 = 141;
const INVALID_SESSION_TOKEN: i64 = 209;
const UNSUPPORTED_SERVICE: i64 = 252;

/// Error response in the server's envelope.
#[derive(Debug)]
pub struct ParseError {
    status: StatusCode,
    code: i64,
    message: String,
}

impl ParseError {
    fn new(status: StatusCode, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, OBJECT_NOT_FOUND, "Object not found.")
    }
}

impl IntoResponse for ParseError {
    fn into_response(self) -> Response {
        let body = json!({"code": self.code, "error": self.message});
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone)]
struct SessionRecord {
    object_id: String,
    user_id: String,
    installation_id: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Everything the server remembers.
#[derive(Debug)]
pub struct Store {
    classes: HashMap<String, Vec<Map<String, Value>>>,
    installations: Vec<Map<String, Value>>,
    users: Vec<Map<String, Value>>,
    sessions: HashMap<String, SessionRecord>,
    files: HashMap<String, Bytes>,
    params: Map<String, Value>,
}

impl Default for Store {
    fn default() -> Self {
        let mut params = Map::new();
        params.insert("welcomeMessage".into(), json!("Hello from the mock server"));
        params.insert("maxUploadMb".into(), json!(5));
        Self {
            classes: HashMap::new(),
            installations: Vec::new(),
            users: Vec::new(),
            sessions: HashMap::new(),
            files: HashMap::new(),
            params,
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/classes/{class}", get(query_class).post(create_object))
        .route(
            "/classes/{class}/{id}",
            get(get_object).put(update_object).delete(delete_object),
        )
        .route("/schemas", get(list_schemas))
        .route("/schemas/{class}", get(get_schema))
        .route("/config", get(get_config))
        .route("/functions/{name}", post(run_function))
        .route("/installations", post(create_installation))
        .route(
            "/installations/{id}",
            get(get_installation).put(update_installation),
        )
        .route("/users", post(login))
        .route("/users/me", get(current_user))
        .route("/sessions/me", get(current_session))
        .route("/files/{name}", post(upload_file))
        .route_layer(middleware::from_fn(require_application_id));
    let public = Router::new().route("/files/{app}/{name}", get(download_file));

    Router::new()
        .nest("/parse", api.merge(public))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

async fn require_application_id(request: Request, next: Next) -> Response {
    if request.headers().contains_key(APPLICATION_ID) {
        next.run(request).await
    } else {
        debug!(uri = %request.uri(), "rejected request without application id");
        (StatusCode::FORBIDDEN, Json(json!({"error": "unauthorized"}))).into_response()
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn new_object_id() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn json_object(body: &Bytes) -> Result<Map<String, Value>, ParseError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(ParseError::new(
            StatusCode::BAD_REQUEST,
            INVALID_JSON,
            "invalid JSON",
        )),
    }
}

fn satisfies(object: &Map<String, Value>, constraints: &Map<String, Value>) -> bool {
    constraints
        .iter()
        .all(|(key, expected)| object.get(key) == Some(expected))
}

// --- classes ---

/// Query string accepted by `GET /classes/{class}`.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(rename = "where")]
    constraints: Option<String>,
    skip: Option<usize>,
    limit: Option<usize>,
    count: Option<String>,
    order: Option<String>,
}

/// Compare two objects by one `order` key; a leading `-` sorts descending.
fn compare_by(key: &str, a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
    let (key, descending) = match key.strip_prefix('-') {
        Some(key) => (key, true),
        None => (key, false),
    };
    let ordering = match (a.get(key), b.get(key)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (x, y) => x.is_some().cmp(&y.is_some()),
    };
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

async fn query_class(
    State(db): State<Db>,
    Path(class): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ParseError> {
    let constraints = match params.constraints.as_deref() {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(constraints)) => constraints,
            _ => {
                return Err(ParseError::new(
                    StatusCode::BAD_REQUEST,
                    INVALID_JSON,
                    "invalid where clause",
                ))
            }
        },
        None => Map::new(),
    };

    let store = db.read().await;
    let mut matching: Vec<&Map<String, Value>> = store
        .classes
        .get(&class)
        .map(|objects| objects.iter().filter(|o| satisfies(o, &constraints)).collect())
        .unwrap_or_default();
    if let Some(order) = params.order.as_deref() {
        let keys: Vec<&str> = order.split(',').filter(|key| !key.is_empty()).collect();
        matching.sort_by(|a, b| {
            keys.iter()
                .map(|key| compare_by(key, a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    let total = matching.len();
    let results: Vec<Value> = matching
        .into_iter()
        .skip(params.skip.unwrap_or(0))
        .take(params.limit.unwrap_or(100))
        .cloned()
        .map(Value::Object)
        .collect();

    let mut body = json!({ "results": results });
    if params.count.as_deref() == Some("1") {
        body["count"] = json!(total);
    }
    Ok(Json(body))
}

async fn create_object(
    State(db): State<Db>,
    Path(class): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ParseError> {
    let mut object = json_object(&body)?;
    let object_id = new_object_id();
    let created_at = timestamp(Utc::now());
    object.insert("objectId".into(), json!(object_id));
    object.insert("createdAt".into(), json!(created_at));
    object.insert("updatedAt".into(), json!(created_at));

    db.write()
        .await
        .classes
        .entry(class.clone())
        .or_default()
        .push(object);
    debug!(%class, %object_id, "object created");
    Ok((
        StatusCode::CREATED,
        Json(json!({"objectId": object_id, "createdAt": created_at})),
    ))
}

async fn get_object(
    State(db): State<Db>,
    Path((class, id)): Path<(String, String)>,
) -> Result<Json<Value>, ParseError> {
    let store = db.read().await;
    store
        .classes
        .get(&class)
        .and_then(|objects| objects.iter().find(|o| o["objectId"] == id.as_str()))
        .map(|object| Json(Value::Object(object.clone())))
        .ok_or_else(ParseError::not_found)
}

async fn update_object(
    State(db): State<Db>,
    Path((class, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>, ParseError> {
    let changes = json_object(&body)?;
    let mut store = db.write().await;
    let object = store
        .classes
        .get_mut(&class)
        .and_then(|objects| objects.iter_mut().find(|o| o["objectId"] == id.as_str()))
        .ok_or_else(ParseError::not_found)?;
    let updated_at = timestamp(Utc::now());
    for (key, value) in changes {
        if !matches!(key.as_str(), "objectId" | "createdAt") {
            object.insert(key, value);
        }
    }
    object.insert("updatedAt".into(), json!(updated_at));
    Ok(Json(json!({ "updatedAt": updated_at })))
}

async fn delete_object(
    State(db): State<Db>,
    Path((class, id)): Path<(String, String)>,
) -> Result<Json<Value>, ParseError> {
    let mut store = db.write().await;
    let objects = store.classes.get_mut(&class).ok_or_else(ParseError::not_found)?;
    let index = objects
        .iter()
        .position(|o| o["objectId"] == id.as_str())
        .ok_or_else(ParseError::not_found)?;
    objects.remove(index);
    Ok(Json(json!({})))
}

// --- schemas ---

fn field_type(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "String",
        Value::Number(_) => "Number",
        Value::Bool(_) => "Boolean",
        Value::Array(_) => "Array",
        Value::Object(object) if object.get("__type") == Some(&json!("Date")) => "Date",
        Value::Object(_) | Value::Null => "Object",
    }
}

fn schema_of(class: &str, objects: &[Map<String, Value>]) -> Value {
    let mut fields = Map::new();
    fields.insert("objectId".into(), json!({"type": "String"}));
    fields.insert("createdAt".into(), json!({"type": "Date"}));
    fields.insert("updatedAt".into(), json!({"type": "Date"}));
    for object in objects {
        for (key, value) in object {
            fields
                .entry(key.clone())
                .or_insert_with(|| json!({ "type": field_type(value) }));
        }
    }
    json!({
        "className": class,
        "fields": fields,
        "classLevelPermissions": {
            "find": {"*": true},
            "get": {"*": true},
            "create": {"*": true},
            "update": {"*": true},
            "delete": {"*": true}
        }
    })
}

async fn list_schemas(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let mut names: Vec<&String> = store.classes.keys().collect();
    names.sort();
    let results: Vec<Value> = names
        .into_iter()
        .map(|name| schema_of(name, &store.classes[name]))
        .collect();
    Json(json!({ "results": results }))
}

async fn get_schema(
    State(db): State<Db>,
    Path(class): Path<String>,
) -> Result<Json<Value>, ParseError> {
    let store = db.read().await;
    store
        .classes
        .get(&class)
        .map(|objects| Json(schema_of(&class, objects)))
        .ok_or_else(|| {
            ParseError::new(
                StatusCode::BAD_REQUEST,
                INVALID_CLASS_NAME,
                format!("Class {class} does not exist."),
            )
        })
}

// --- config ---

async fn get_config(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    Json(json!({ "params": store.params }))
}

// --- functions ---

fn elastic_search(store: &Store, parameter: &Map<String, Value>) -> Vec<Value> {
    let index = parameter.get("index").and_then(Value::as_str).unwrap_or_default();
    let needle = parameter
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    store
        .classes
        .get(index)
        .map(|objects| {
            objects
                .iter()
                .filter(|object| {
                    object.values().any(|value| {
                        value
                            .as_str()
                            .is_some_and(|text| text.to_lowercase().contains(&needle))
                    })
                })
                .cloned()
                .map(Value::Object)
                .collect()
        })
        .unwrap_or_default()
}

async fn run_function(
    State(db): State<Db>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ParseError> {
    let parameter = json_object(&body)?;
    let result = match name.as_str() {
        "hello" => json!("Hello world!"),
        "echo" => Value::Object(parameter),
        "elastic-search" => json!(elastic_search(&*db.read().await, &parameter)),
        _ => {
            return Err(ParseError::new(
                StatusCode::BAD_REQUEST,
                SCRIPT_FAILED,
                format!("Invalid function: \"{name}\""),
            ))
        }
    };
    Ok(Json(json!({ "result": result })))
}

// --- installations ---

async fn create_installation(
    State(db): State<Db>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ParseError> {
    let mut installation = json_object(&body)?;
    for field in ["installationId", "deviceType"] {
        if !installation.contains_key(field) {
            return Err(ParseError::new(
                StatusCode::BAD_REQUEST,
                MISSING_REQUIRED_FIELD,
                format!("{field} is required"),
            ));
        }
    }
    let object_id = new_object_id();
    let created_at = timestamp(Utc::now());
    installation.insert("objectId".into(), json!(object_id));
    installation.insert("createdAt".into(), json!(created_at));
    installation.insert("updatedAt".into(), json!(created_at));
    db.write().await.installations.push(installation);
    Ok((
        StatusCode::CREATED,
        Json(json!({"objectId": object_id, "createdAt": created_at})),
    ))
}

fn find_installation<'a>(
    installations: &'a mut [Map<String, Value>],
    id: &str,
    headers: &HeaderMap,
) -> Result<&'a mut Map<String, Value>, ParseError> {
    let installation_id = header_value(headers, INSTALLATION_ID);
    installations
        .iter_mut()
        .find(|i| i["objectId"] == id && i.get("installationId").and_then(Value::as_str) == installation_id)
        .ok_or_else(ParseError::not_found)
}

async fn get_installation(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ParseError> {
    let mut store = db.write().await;
    let installation = find_installation(&mut store.installations, &id, &headers)?;
    Ok(Json(Value::Object(installation.clone())))
}

async fn update_installation(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ParseError> {
    let changes = json_object(&body)?;
    let mut store = db.write().await;
    let installation = find_installation(&mut store.installations, &id, &headers)?;
    let updated_at = timestamp(Utc::now());
    for (key, value) in changes {
        if !matches!(key.as_str(), "objectId" | "createdAt" | "updatedAt") {
            installation.insert(key, value);
        }
    }
    installation.insert("updatedAt".into(), json!(updated_at));
    Ok(Json(json!({ "updatedAt": updated_at })))
}

// --- users and sessions ---

async fn login(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ParseError> {
    let payload = json_object(&body)?;
    let Some(anonymous_id) = payload
        .get("authData")
        .and_then(|auth| auth.get("anonymous"))
        .and_then(|anonymous| anonymous.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return Err(ParseError::new(
            StatusCode::BAD_REQUEST,
            UNSUPPORTED_SERVICE,
            "This authentication method is unsupported.",
        ));
    };

    let mut store = db.write().await;
    let now = Utc::now();
    let existing = store.users.iter().position(|user| {
        user["authData"]["anonymous"]["id"] == anonymous_id.as_str()
    });
    let (status, index) = match existing {
        Some(index) => (StatusCode::OK, index),
        None => {
            let mut user = Map::new();
            user.insert("objectId".into(), json!(new_object_id()));
            user.insert("username".into(), json!(Uuid::new_v4().simple().to_string()));
            user.insert("authData".into(), json!({"anonymous": {"id": anonymous_id}}));
            user.insert("createdAt".into(), json!(timestamp(now)));
            user.insert("updatedAt".into(), json!(timestamp(now)));
            store.users.push(user);
            (StatusCode::CREATED, store.users.len() - 1)
        }
    };

    let session_token = format!("r:{}", Uuid::new_v4().simple());
    let user_id = store.users[index]["objectId"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    store.sessions.insert(
        session_token.clone(),
        SessionRecord {
            object_id: new_object_id(),
            user_id,
            installation_id: header_value(&headers, INSTALLATION_ID).map(str::to_string),
            created_at: now,
            expires_at: now + Duration::days(365),
        },
    );

    let mut user = store.users[index].clone();
    user.insert("sessionToken".into(), json!(session_token));
    debug!(%status, "anonymous login");
    Ok((status, Json(Value::Object(user))).into_response())
}

fn session<'a>(store: &'a Store, headers: &HeaderMap) -> Result<(&'a str, &'a SessionRecord), ParseError> {
    header_value(headers, SESSION_TOKEN)
        .and_then(|token| store.sessions.get_key_value(token))
        .map(|(token, record)| (token.as_str(), record))
        .ok_or_else(|| {
            ParseError::new(
                StatusCode::BAD_REQUEST,
                INVALID_SESSION_TOKEN,
                "Invalid session token",
            )
        })
}

async fn current_user(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, ParseError> {
    let store = db.read().await;
    let (token, record) = session(&store, &headers)?;
    let mut user = store
        .users
        .iter()
        .find(|user| user["objectId"] == record.user_id.as_str())
        .cloned()
        .ok_or_else(ParseError::not_found)?;
    user.insert("sessionToken".into(), json!(token));
    Ok(Json(Value::Object(user)))
}

async fn current_session(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, ParseError> {
    let store = db.read().await;
    let (token, record) = session(&store, &headers)?;
    Ok(Json(json!({
        "objectId": record.object_id,
        "sessionToken": token,
        "user": {"__type": "Pointer", "className": "_User", "objectId": record.user_id},
        "installationId": record.installation_id,
        "restricted": false,
        "createdWith": {"action": "login", "authProvider": "anonymous"},
        "expiresAt": {"__type": "Date", "iso": timestamp(record.expires_at)},
        "createdAt": timestamp(record.created_at),
        "updatedAt": timestamp(record.created_at)
    })))
}

// --- files ---

async fn upload_file(
    State(db): State<Db>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ParseError> {
    if body.is_empty() {
        return Err(ParseError::new(
            StatusCode::BAD_REQUEST,
            MISSING_REQUIRED_FIELD,
            "Invalid file upload.",
        ));
    }
    let app = header_value(&headers, APPLICATION_ID).unwrap_or_default();
    let host = header_value(&headers, header::HOST.as_str()).unwrap_or("localhost");
    let url = format!("http://{host}/parse/files/{app}/{name}");
    debug!(%name, bytes = body.len(), "file stored");
    db.write().await.files.insert(name.clone(), body);
    Ok((StatusCode::CREATED, Json(json!({"url": url, "name": name}))))
}

async fn download_file(
    State(db): State<Db>,
    Path((_app, name)): Path<(String, String)>,
) -> Result<Bytes, ParseError> {
    db.read()
        .await
        .files
        .get(&name)
        .cloned()
        .ok_or_else(ParseError::not_found)
}
