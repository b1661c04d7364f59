//! Login, session and current-user resources.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::{base_request, endpoint, json_body, Fetch, Login, Resource};
use crate::config::headers;
use crate::decode;
use crate::error::NetworkError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::types::{AuthData, Session, User};

/// `POST /users` with an auth-data payload, answered with the logged-in user.
///
/// ```console
/// curl -X POST \
///   -H "X-Parse-Application-Id: …" \
///   -H "X-Parse-Installation-Id: …" \
///   -H "X-Parse-Revocable-Session: 1" \
///   -H "Content-Type: application/json" \
///   -d '{"authData":{"anonymous":{"id":"…"}}}' \
///   https://parse.example.org/parse/users
/// ```
#[derive(Debug, Clone)]
pub struct LoginResource<A = AuthData> {
    base_url: Url,
    installation_id: Option<String>,
    auth_data: Option<A>,
    headers: Headers,
}

impl LoginResource<AuthData> {
    /// Login with `auth_data`, falling back to an anonymous payload keyed by
    /// the installation id when none is given.
    pub fn new(
        base_url: Url,
        installation_id: Option<String>,
        auth_data: Option<AuthData>,
    ) -> Self {
        let auth_data = auth_data.or_else(|| installation_id.clone().map(AuthData::anonymous));
        Self::with_auth_data(base_url, installation_id, auth_data)
    }

    /// Anonymous login keyed by the installation id.
    pub fn anonymous(base_url: Url, installation_id: Option<String>) -> Self {
        Self::new(base_url, installation_id, None)
    }
}

impl<A> LoginResource<A> {
    /// Login with a custom auth payload. Without one there is no request.
    pub fn with_auth_data(
        base_url: Url,
        installation_id: Option<String>,
        auth_data: Option<A>,
    ) -> Self {
        Self {
            base_url,
            installation_id,
            auth_data,
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

impl<A: Serialize> Resource for LoginResource<A> {
    type Output = User;

    fn request(&self) -> Option<HttpRequest> {
        let installation_id = self.installation_id.as_deref()?;
        let body = json_body(self.auth_data.as_ref()?)?;
        let url = endpoint(&self.base_url, &["users"])?;
        let mut request = base_request(HttpMethod::Post, url, &self.headers);
        request.headers.insert(headers::REVOCABLE_SESSION, 1);
        request
            .headers
            .insert(headers::INSTALLATION_ID, installation_id);
        request.headers.insert(headers::CONTENT_TYPE, headers::JSON);
        request.body = Some(body);
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<A: Serialize> Login for LoginResource<A> {}

/// `GET /sessions/me` for the given session token.
#[derive(Debug, Clone)]
pub struct SessionResource<T = Session> {
    base_url: Url,
    session_token: String,
    headers: Headers,
    _response: PhantomData<fn() -> T>,
}

impl<T> SessionResource<T> {
    pub fn new(base_url: Url, session_token: impl Into<String>) -> Self {
        Self {
            base_url,
            session_token: session_token.into(),
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

impl<T: DeserializeOwned> Resource for SessionResource<T> {
    type Output = T;

    fn request(&self) -> Option<HttpRequest> {
        let url = endpoint(&self.base_url, &["sessions", "me"])?;
        let mut request = base_request(HttpMethod::Get, url, &self.headers);
        request
            .headers
            .insert(headers::SESSION_TOKEN, &self.session_token);
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<T: DeserializeOwned> Fetch for SessionResource<T> {}

/// `GET /users/me`: validates a session token and returns its user.
#[derive(Debug, Clone)]
pub struct UserResource<T = User> {
    base_url: Url,
    session_token: Option<String>,
    headers: Headers,
    _response: PhantomData<fn() -> T>,
}

impl<T> UserResource<T> {
    pub fn new(base_url: Url, session_token: Option<String>) -> Self {
        Self {
            base_url,
            session_token,
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

impl<T: DeserializeOwned> Resource for UserResource<T> {
    type Output = T;

    fn request(&self) -> Option<HttpRequest> {
        let session_token = self.session_token.as_deref()?;
        let url = endpoint(&self.base_url, &["users", "me"])?;
        let mut request = base_request(HttpMethod::Get, url, &self.headers);
        request.headers.insert(headers::SESSION_TOKEN, session_token);
        Some(request)
    }

    fn decode(&self, body: Vec<u8>) -> Result<Self::Output, NetworkError> {
        decode::single(&body)
    }
}

impl<T: DeserializeOwned> Fetch for UserResource<T> {}
