//! Dynamic dispatch for mounted extension routes.
//!
//! Every `/extensions/{name}/...` request consults the live route table
//! at request time, so a disabled extension 404s on the next request
//! without a restart.

use std::collections::HashMap;
use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::debug;

use megamon_core::AppError;
use megamon_extension::provider::{ExtensionRequest, RouteMethod};

use crate::error::ApiError;
use crate::state::AppState;

/// Any-method handler for `/extensions/{name}/{*rest}`.
pub async fn dispatch(
    State(state): State<AppState>,
    Path((name, rest)): Path<(String, String)>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    dispatch_inner(state, name, format!("/{rest}"), method, query, body).await
}

/// Any-method handler for the bare `/extensions/{name}` path.
pub async fn dispatch_root(
    State(state): State<AppState>,
    Path(name): Path<String>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    dispatch_inner(state, name, "/".to_string(), method, query, body).await
}

async fn dispatch_inner(
    state: AppState,
    name: String,
    path: String,
    method: Method,
    query: HashMap<String, String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let route_method = RouteMethod::from_str(method.as_str())?;

    let (handler, params, extension_id) = state
        .mounter
        .dispatch(&name, route_method, &path)
        .await
        .ok_or_else(|| {
            AppError::not_found(format!("No route {route_method} {path} under '{name}'"))
        })?;

    debug!(
        extension = %name,
        extension_id,
        method = %route_method,
        path = %path,
        "Dispatching extension route"
    );

    let response = handler
        .handle(ExtensionRequest {
            method: route_method,
            path,
            params,
            query,
            body,
        })
        .await?;

    let status = StatusCode::from_u16(response.status).map_err(|_| {
        AppError::internal(format!(
            "Extension '{name}' returned invalid status {}",
            response.status
        ))
    })?;

    Ok((status, Json(response.body)).into_response())
}
