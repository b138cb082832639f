//! Authenticated caller attached to the request by upstream auth middleware.

use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named properties of the caller (`uid`, `email`, ...). Insert it as a request extension;
/// user-scoped handlers read the property named by `req_user_property`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestUser(Map<String, Value>);

impl RequestUser {
    pub fn new() -> Self {
        RequestUser(Map::new())
    }

    pub fn with(mut self, property: impl Into<String>, value: Value) -> Self {
        self.0.insert(property.into(), value);
        self
    }

    /// Property value; JSON null counts as absent.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.0.get(property).filter(|v| !v.is_null())
    }

    /// Caller stored in the request extensions, if auth middleware put one there.
    pub fn from_parts(parts: &Parts) -> Option<&RequestUser> {
        parts.extensions.get::<RequestUser>()
    }
}

impl From<Map<String, Value>> for RequestUser {
    fn from(map: Map<String, Value>) -> Self {
        RequestUser(map)
    }
}
