//! Capability contracts for backend entry modules.
//!
//! A backend entry must implement [`RouteProvider`]: a named set of
//! path+handler bindings the mounter can attach under the extension's
//! prefix. This replaces ad hoc "does this module look like a router"
//! checks with an explicit interface resolved through the entry loader.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use megamon_core::{AppError, AppResult};

/// HTTP methods an extension route can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl FromStr for RouteMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(AppError::validation(format!("Unsupported method: {other}"))),
        }
    }
}

/// Request passed to an extension route handler.
#[derive(Debug, Clone)]
pub struct ExtensionRequest {
    /// HTTP method.
    pub method: RouteMethod,
    /// Path below the extension's mount prefix (leading slash).
    pub path: String,
    /// Captured `:param` path segments.
    pub params: HashMap<String, String>,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
    /// Raw request body.
    pub body: Bytes,
}

impl ExtensionRequest {
    /// Creates a bodiless request, mainly for tests.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: RouteMethod::Get,
            path: path.into(),
            params: HashMap::new(),
            query: HashMap::new(),
            body: Bytes::new(),
        }
    }
}

/// Response returned by an extension route handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON response body.
    pub body: serde_json::Value,
}

impl ExtensionResponse {
    /// 200 response with a JSON body.
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }
}

/// One route handler.
#[async_trait]
pub trait ExtensionHandler: Send + Sync {
    /// Handles a dispatched request.
    async fn handle(&self, request: ExtensionRequest) -> AppResult<ExtensionResponse>;
}

/// One path+handler binding contributed by a route provider.
#[derive(Clone)]
pub struct RouteBinding {
    /// HTTP method.
    pub method: RouteMethod,
    /// Path pattern below the mount prefix; `:name` segments capture.
    pub path: String,
    /// The handler.
    pub handler: Arc<dyn ExtensionHandler>,
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

/// Trait a backend entry module must expose.
pub trait RouteProvider: Send + Sync {
    /// The path+handler bindings to mount under the extension prefix.
    fn routes(&self) -> Vec<RouteBinding>;
}

impl fmt::Debug for dyn RouteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteProvider").finish_non_exhaustive()
    }
}
