// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminOrClient, RequireRole},
    },
    models::dashboard::{DashboardSummary, RegionBreakdownEntry},
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Contagens por status e prioridade, vencidos e taxa de conclusão", body = DashboardSummary),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminOrClient>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .dashboard_service
        .get_summary()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

// GET /api/dashboard/regions
#[utoipa::path(
    get,
    path = "/api/dashboard/regions",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Totais por região", body = Vec<RegionBreakdownEntry>),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_region_breakdown(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminOrClient>,
) -> Result<impl IntoResponse, ApiError> {
    let regions = app_state
        .dashboard_service
        .get_region_breakdown()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(regions)))
}
