//! Response decoders, one per response shape.
//!
//! Every function here yields exactly one terminal outcome: the typed value
//! or a classified `NetworkError`. Decode failures are logged at debug level
//! with their serde category and then propagated as `JsonDecoding`.

use serde::de::DeserializeOwned;
use serde_json::error::Category;
use tracing::debug;

use crate::codec;
use crate::error::NetworkError;
use crate::types::{FunctionResponse, QueryResponse};

fn diagnose(shape: &'static str, err: serde_json::Error) -> NetworkError {
    let category = match err.classify() {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "data",
        Category::Eof => "eof",
    };
    debug!(
        shape,
        category,
        line = err.line(),
        column = err.column(),
        %err,
        "response body could not be decoded"
    );
    NetworkError::JsonDecoding(err)
}

/// Single object shape. A JSON `null` decodes but carries no value and is
/// reported as `InvalidResponse`.
pub fn single<T: DeserializeOwned>(body: &[u8]) -> Result<T, NetworkError> {
    match codec::decode::<Option<T>>(body) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            debug!(shape = "single", "response decoded to no value");
            Err(NetworkError::InvalidResponse)
        }
        Err(err) => Err(diagnose("single", err)),
    }
}

/// Wrapped list shape: `{"results":[…],"count":n}`.
pub fn query<T: DeserializeOwned>(body: &[u8]) -> Result<QueryResponse<T>, NetworkError> {
    codec::decode(body).map_err(|err| diagnose("query", err))
}

/// Endpoints that answer with either a bare object or the wrapped list.
/// The bare object is tried first and becomes a one-element response.
pub fn single_or_query<T: DeserializeOwned>(
    body: &[u8],
) -> Result<QueryResponse<T>, NetworkError> {
    if let Ok(value) = codec::decode::<T>(body) {
        return Ok(QueryResponse::single(value));
    }
    query(body)
}

/// Cloud function shape: `{"result": …}`, unwrapped.
pub fn function<T: DeserializeOwned>(body: &[u8]) -> Result<T, NetworkError> {
    codec::decode::<FunctionResponse<T>>(body)
        .map(|response| response.result)
        .map_err(|err| diagnose("function", err))
}
