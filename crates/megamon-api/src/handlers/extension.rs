//! Extension admin handlers.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use bytes::Bytes;

use megamon_core::AppError;
use megamon_entity::ExtensionRecord;
use megamon_extension::components::ComponentHandle;
use megamon_extension::lifecycle::{UninstallOptions, UninstallReport};
use megamon_extension::locales;
use megamon_extension::relationships::CapabilityProvider;

use crate::dto::request::{ComponentQuery, UninstallQuery, UpdateExtensionRequest};
use crate::dto::response::{ApiResponse, LocalePackResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/extensions/upload — multipart field `archive`
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ExtensionRecord>>), ApiError> {
    let mut archive: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "archive" {
            archive = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
            );
        }
    }

    let archive = archive.ok_or_else(|| AppError::validation("archive field is required"))?;
    let record = state.lifecycle.install(archive).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

/// GET /api/extensions
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ExtensionRecord>>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.registry.list().await?)))
}

/// GET /api/extensions/widgets — enabled extensions declaring a widget
pub async fn widgets(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ExtensionRecord>>>, ApiError> {
    let widgets = state
        .registry
        .list_enabled()
        .await?
        .into_iter()
        .filter(ExtensionRecord::has_widget)
        .collect();
    Ok(Json(ApiResponse::ok(widgets)))
}

/// GET /api/extensions/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ExtensionRecord>>, ApiError> {
    let record = find_extension(&state, id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// PATCH /api/extensions/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateExtensionRequest>,
) -> Result<Json<ApiResponse<ExtensionRecord>>, ApiError> {
    let record = state.lifecycle.set_enabled(id, req.is_enabled).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// DELETE /api/extensions/{id}?deleteData&deleteFiles
///
/// Always 200 with the per-step report; partial failures are data, not
/// an error status.
pub async fn uninstall(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<UninstallQuery>,
) -> Result<Json<ApiResponse<UninstallReport>>, ApiError> {
    let report = state
        .lifecycle
        .uninstall(
            id,
            UninstallOptions {
                delete_data: query.delete_data,
                delete_files: query.delete_files,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/extensions/{id}/component?entry=widget|editor
pub async fn component(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ComponentQuery>,
) -> Result<Json<ApiResponse<ComponentHandle>>, ApiError> {
    let record = find_extension(&state, id).await?;

    if query.entry.entry_path(&record).is_none() {
        return Err(AppError::not_found(format!(
            "Extension '{}' declares no {:?} entry",
            record.name, query.entry
        ))
        .into());
    }

    // Load failures degrade to a placeholder handle; the admin UI shows
    // an "unavailable" card instead of breaking the view.
    let handle = state.components.load_or_placeholder(&record, query.entry).await;
    Ok(Json(ApiResponse::ok(handle)))
}

/// GET /api/extensions/{id}/locales/{lang}
pub async fn locale_pack(
    State(state): State<AppState>,
    Path((id, language)): Path<(i32, String)>,
) -> Result<Json<ApiResponse<LocalePackResponse>>, ApiError> {
    // Existence check so an unknown id is a 404, not an empty pack.
    find_extension(&state, id).await?;

    let strings = locales::pack_from_store(state.locale_store.as_ref(), id, &language).await?;
    Ok(Json(ApiResponse::ok(LocalePackResponse { language, strings })))
}

/// GET /api/extensions/providers/{capability}
pub async fn providers(
    State(state): State<AppState>,
    Path(capability): Path<String>,
) -> Result<Json<ApiResponse<Vec<CapabilityProvider>>>, ApiError> {
    Ok(Json(ApiResponse::ok(
        state.resolver.providers_of(&capability).await?,
    )))
}

async fn find_extension(state: &AppState, id: i32) -> Result<ExtensionRecord, ApiError> {
    state
        .registry
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")).into())
}
