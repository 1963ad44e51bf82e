// src/handlers/audit.rs

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
    },
    models::{
        audit::AuditLog,
        installation::{Page, Pagination},
    },
};

// GET /api/audit-logs
#[utoipa::path(
    get,
    path = "/api/audit-logs",
    tag = "Audit",
    params(
        ("page" = Option<i64>, Query),
        ("perPage" = Option<i64>, Query, description = "Padrão 20, máximo 100")
    ),
    responses(
        (status = 200, description = "Trilha de auditoria, mais recentes primeiro", body = Page<AuditLog>),
        (status = 403, description = "Somente Admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminOnly>,
    pagination: Result<Query<Pagination>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Query(pagination) = pagination.map_err(|e| to_api(e.into()))?;
    let repo = &app_state.audit_repo;

    let items = repo.list(repo.pool(), pagination).await.map_err(to_api)?;
    let total = repo.count(repo.pool()).await.map_err(to_api)?;

    Ok(Json(Page {
        items,
        total,
        page: pagination.page(),
        per_page: pagination.limit(),
    }))
}
