use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::uri::Scope;

/// HTTP methods the device's REST dialect accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    pub fn idempotency(self) -> Idempotency {
        match self {
            Self::Get => Idempotency::Read,
            Self::Post | Self::Patch | Self::Put | Self::Delete => Idempotency::Write,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Patch => Self::PATCH,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
        }
    }
}

/// Whether a request may be repeated without changing device state.
///
/// Only reads are ever retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Idempotency {
    Read,
    Write,
}

/// One request against the device, fully described before it is sent.
///
/// Built fresh per call and never mutated afterwards; the builder-style
/// `with_*` methods consume and return a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    resource: String,
    scope: Scope,
    body: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: Method, resource: impl Into<String>, scope: Scope) -> Self {
        Self {
            method,
            resource: resource.into(),
            scope,
            body: None,
            timeout: None,
        }
    }

    pub fn get(resource: impl Into<String>, scope: Scope) -> Self {
        Self::new(Method::Get, resource, scope)
    }

    pub fn patch(resource: impl Into<String>, scope: Scope, body: serde_json::Value) -> Self {
        Self::new(Method::Patch, resource, scope).with_body(body)
    }

    pub fn post(resource: impl Into<String>, scope: Scope, body: serde_json::Value) -> Self {
        Self::new(Method::Post, resource, scope).with_body(body)
    }

    pub fn put(resource: impl Into<String>, scope: Scope, body: serde_json::Value) -> Self {
        Self::new(Method::Put, resource, scope).with_body(body)
    }

    pub fn delete(resource: impl Into<String>, scope: Scope) -> Self {
        Self::new(Method::Delete, resource, scope)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Bound each network attempt of this request by `timeout` instead of
    /// the transport default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn idempotency(&self) -> Idempotency {
        self.method.idempotency()
    }

    pub fn is_read(&self) -> bool {
        self.idempotency() == Idempotency::Read
    }

    /// Body as it goes on the wire. Empty objects and arrays are not sent.
    pub fn wire_body(&self) -> Option<String> {
        match &self.body {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(map)) if map.is_empty() => None,
            Some(serde_json::Value::Array(items)) if items.is_empty() => None,
            Some(value) => Some(value.to_string()),
        }
    }

    /// Key under `Response` holding the records: the leaf segment of the
    /// resource id (`brocade-interface/fibrechannel/name/0%2F1` ->
    /// `fibrechannel`), or the module itself for module-level requests.
    pub fn collection_key(&self) -> &str {
        let mut segments = self.resource.split('/');
        let module = segments.next().unwrap_or_default();
        segments.next().unwrap_or(module)
    }
}
