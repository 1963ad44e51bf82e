// src/handlers/share.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminOrClient, RequireRole},
        request_meta::ClientMeta,
    },
    models::{installation::InstallationView, share::ShareLinkResponse},
};

// POST /api/installations/{id}/share
#[utoipa::path(
    post,
    path = "/api/installations/{id}/share",
    tag = "Share",
    params(("id" = Uuid, Path, description = "ID do registro")),
    responses(
        (status = 201, description = "Link público válido por 24 horas", body = ShareLinkResponse),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_share_link(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    meta: ClientMeta,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let link = app_state
        .share_service
        .create(id, &meta.audit(guard.actor().clone()))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(link)))
}

// GET /api/share/{token} (público)
#[utoipa::path(
    get,
    path = "/api/share/{token}",
    tag = "Share",
    params(("token" = String, Path, description = "Token do link")),
    responses(
        (status = 200, description = "Visão de cliente do registro", body = InstallationView),
        (status = 404, description = "Link desconhecido, expirado ou registro excluído")
    )
)]
pub async fn read_shared(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .share_service
        .resolve(&token)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}
