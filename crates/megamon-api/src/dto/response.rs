//! Response DTOs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Names of extensions with mounted backend routes.
    pub mounted_extensions: Vec<String>,
}

/// Locale pack response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalePackResponse {
    /// Language the caller asked for.
    pub language: String,
    /// Resolved key-value strings (after fallback).
    pub strings: HashMap<String, String>,
}
