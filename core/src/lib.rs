//! Typed client core for a Parse-style BaaS REST API.
//!
//! # Overview
//! A resource describes one API call: it synthesizes an `HttpRequest` from
//! its fields and decodes the matching response body. `NetworkService` runs
//! resources through an injected `Transport`, classifies the outcome into a
//! closed `NetworkError` taxonomy, and hands the body to the resource's
//! decoder.
//!
//! # Design
//! - Request synthesis is pure and never fails loudly: a missing field, an
//!   unencodable payload, or an unbuildable URL yields `None`, which the
//!   service reports as `NetworkError::InvalidRequest`.
//! - The transport call is the only suspension point. Timeouts and
//!   connection reuse belong to the transport (`ReqwestTransport` by
//!   default).
//! - Dates travel as `{"__type":"Date","iso":…}` on the way out and are
//!   accepted in three shapes on the way in (see `codec`).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod resource;
pub mod service;
pub mod transport;
pub mod types;

pub use config::{NetworkConfiguration, ServiceSettings};
pub use error::{NetworkError, ServerError, SettingsError, TransportError};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use resource::{
    BundleResource, ClassQuery, ClassSchemaQuery, ConfigResource, DeleteClass, FunctionResource,
    HttpResource, ImageDataResource, InstallationResource, InstallationUpdate, LoginResource,
    Resource, SessionResource, UpdateClass, UploadClass, UploadFileResource, UrlDataResource,
    UserResource,
};
pub use service::NetworkService;
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AuthData, BaasConfig, ClassSchema, DeviceType, ElasticSearchQuery, ImageData, Installation,
    QueryResponse, Session, UpdateResponse, UploadFileResponse, UploadResponse, UrlData, User,
};
