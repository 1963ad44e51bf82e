// src/handlers/installations.rs

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, AdminOrClient, RequireRole},
        request_meta::ClientMeta,
    },
    models::{
        attachment::BundleRequest,
        installation::{InstallationFilter, InstallationResponse, Page, Pagination},
        installation_form::{InstallationPayload, StatusUpdatePayload},
    },
    services::{attachment_service::BundleDownload, export_service},
};

/// Resposta de download de ZIP, com o guard do arquivo temporário dentro do corpo.
pub(crate) fn zip_response(bundle: BundleDownload) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", bundle.file_name);
    let length = bundle.archive.size();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(bundle.archive.into_stream()),
    )
        .into_response()
}

// POST /api/installations
#[utoipa::path(
    post,
    path = "/api/installations",
    tag = "Installations",
    request_body = InstallationPayload,
    responses(
        (status = 201, description = "Registro criado", body = InstallationResponse),
        (status = 400, description = "Erro de validação"),
        (status = 401, description = "Não autorizado"),
        (status = 409, description = "Número de série já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_installation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    meta: ClientMeta,
    payload: Result<Json<InstallationPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(payload) = payload.map_err(|e| to_api(e.into()))?;
    let role = actor.role;

    let record = app_state
        .installation_service
        .create(payload, &meta.audit(actor))
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(InstallationResponse::for_role(record, role))))
}

// GET /api/installations
#[utoipa::path(
    get,
    path = "/api/installations",
    tag = "Installations",
    params(
        ("status" = Option<String>, Query, description = "overdue, delivered, in_transit, pending_delivery, installed, in_progress, pending_installation"),
        ("deliveryStatus" = Option<String>, Query, description = "Delivered, Pending, In Transit"),
        ("installationStatus" = Option<String>, Query, description = "Installed, Pending, In Progress"),
        ("priority" = Option<String>, Query, description = "High, Medium, Low"),
        ("region" = Option<String>, Query),
        ("district" = Option<String>, Query),
        ("search" = Option<String>, Query, description = "Busca em sr_no, recebedor, endereço e distrito"),
        ("page" = Option<i64>, Query),
        ("perPage" = Option<i64>, Query, description = "Padrão 20, máximo 100")
    ),
    responses(
        (status = 200, description = "Página de registros, mais recentes primeiro", body = Page<InstallationResponse>),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_installations(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    filter: Result<Query<InstallationFilter>, QueryRejection>,
    pagination: Result<Query<Pagination>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Query(filter) = filter.map_err(|e| to_api(e.into()))?;
    let Query(pagination) = pagination.map_err(|e| to_api(e.into()))?;
    let role = guard.actor().role;

    let page = app_state
        .installation_service
        .list(&filter, pagination)
        .await
        .map_err(to_api)?;

    Ok(Json(Page {
        items: page
            .items
            .into_iter()
            .map(|record| InstallationResponse::for_role(record, role))
            .collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
    }))
}

// GET /api/installations/export.csv
#[utoipa::path(
    get,
    path = "/api/installations/export.csv",
    tag = "Installations",
    responses(
        (status = 200, description = "CSV com as colunas do perfil do usuário", content_type = "text/csv"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_installations(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    filter: Result<Query<InstallationFilter>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Query(filter) = filter.map_err(|e| to_api(e.into()))?;

    let csv = app_state
        .installation_service
        .export_csv(&filter, guard.actor().role)
        .await
        .map_err(to_api)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_service::file_name(Utc::now().date_naive())
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

// POST /api/installations/bundle
#[utoipa::path(
    post,
    path = "/api/installations/bundle",
    tag = "Attachments",
    request_body = BundleRequest,
    responses(
        (status = 200, description = "ZIP com os anexos dos registros e SUMMARY.txt", content_type = "application/zip"),
        (status = 404, description = "Nenhum arquivo encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn bundle_installations(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminOrClient>,
    payload: Result<Json<BundleRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(request) = payload.map_err(|e| to_api(e.into()))?;

    let bundle = app_state
        .attachment_service
        .bundle_many(&request.ids)
        .await
        .map_err(to_api)?;

    Ok(zip_response(bundle))
}

// GET /api/installations/{id}
#[utoipa::path(
    get,
    path = "/api/installations/{id}",
    tag = "Installations",
    params(("id" = Uuid, Path, description = "ID do registro")),
    responses(
        (status = 200, description = "Registro com percentual de conclusão", body = InstallationResponse),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_installation(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = app_state
        .installation_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(InstallationResponse::for_role(record, guard.actor().role)))
}

// PUT /api/installations/{id}
#[utoipa::path(
    put,
    path = "/api/installations/{id}",
    tag = "Installations",
    params(("id" = Uuid, Path, description = "ID do registro")),
    request_body = InstallationPayload,
    responses(
        (status = 200, description = "Registro atualizado", body = InstallationResponse),
        (status = 400, description = "Erro de validação (sr_no é imutável)"),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_installation(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    meta: ClientMeta,
    Path(id): Path<Uuid>,
    payload: Result<Json<InstallationPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(payload) = payload.map_err(|e| to_api(e.into()))?;
    let actor = guard.actor().clone();
    let role = actor.role;

    let record = app_state
        .installation_service
        .update(id, payload, &meta.audit(actor))
        .await
        .map_err(to_api)?;

    Ok(Json(InstallationResponse::for_role(record, role)))
}

// PATCH /api/installations/{id}/status
#[utoipa::path(
    patch,
    path = "/api/installations/{id}/status",
    tag = "Installations",
    params(("id" = Uuid, Path, description = "ID do registro")),
    request_body = StatusUpdatePayload,
    responses(
        (status = 200, description = "Status atualizado", body = InstallationResponse),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_installation_status(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    meta: ClientMeta,
    Path(id): Path<Uuid>,
    payload: Result<Json<StatusUpdatePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(change) = payload.map_err(|e| to_api(e.into()))?;
    let actor = guard.actor().clone();
    let role = actor.role;

    let record = app_state
        .installation_service
        .update_status(id, change, &meta.audit(actor))
        .await
        .map_err(to_api)?;

    Ok(Json(InstallationResponse::for_role(record, role)))
}

// DELETE /api/installations/{id}
#[utoipa::path(
    delete,
    path = "/api/installations/{id}",
    tag = "Installations",
    params(("id" = Uuid, Path, description = "ID do registro")),
    responses(
        (status = 204, description = "Arquivos removidos e registro marcado como excluído"),
        (status = 403, description = "Somente Admin"),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_installation(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOnly>,
    meta: ClientMeta,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .installation_service
        .soft_delete(id, &meta.audit(guard.actor().clone()))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
