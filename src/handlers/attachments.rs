// src/handlers/attachments.rs

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::installations::zip_response,
    middleware::{
        i18n::Locale,
        rbac::{AdminOrClient, RequireRole},
        request_meta::ClientMeta,
    },
    models::{
        attachment::{AttachReport, UploadedFile},
        installation::{AttachmentSlot, InstallationResponse},
    },
};

/// Lê todas as partes com arquivo. Campos sem arquivo selecionado chegam vazios e são ignorados.
async fn read_files(mut multipart: Multipart) -> Result<Vec<(String, UploadedFile)>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = match field.file_name() {
            Some(file_name) if !file_name.is_empty() => file_name.to_string(),
            _ => continue,
        };
        let bytes = field.bytes().await?;
        files.push((name, UploadedFile { file_name, bytes }));
    }

    Ok(files)
}

/// O upload por slot aceita exatamente um arquivo.
fn single_file(files: Vec<(String, UploadedFile)>) -> Result<UploadedFile, AppError> {
    let mut files = files.into_iter();
    match (files.next(), files.next()) {
        (Some((_, file)), None) => Ok(file),
        (None, _) => Err(AppError::field("file", "required", "No file was uploaded.")),
        (Some(_), Some(_)) => Err(AppError::field("file", "count", "Send exactly one file.")),
    }
}

fn parse_slot(raw: &str) -> Result<AttachmentSlot, AppError> {
    raw.parse::<AttachmentSlot>().map_err(|e| AppError::UnknownSlot(e.0))
}

// POST /api/installations/{id}/attachments
#[utoipa::path(
    post,
    path = "/api/installations/{id}/attachments",
    tag = "Attachments",
    params(("id" = Uuid, Path, description = "ID do registro")),
    request_body(content_type = "multipart/form-data", description = "Um campo de arquivo por slot (ex.: mouse_photo)"),
    responses(
        (status = 200, description = "Slots anexados e falhas por campo", body = AttachReport),
        (status = 400, description = "Nenhum arquivo enviado"),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_attachments(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    meta: ClientMeta,
    Path(id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let multipart = multipart.map_err(|e| to_api(e.into()))?;
    let files = read_files(multipart).await.map_err(to_api)?;

    let report = app_state
        .attachment_service
        .attach_many(id, files, &meta.audit(guard.actor().clone()))
        .await
        .map_err(to_api)?;

    Ok(Json(report))
}

// POST /api/installations/{id}/attachments/{slot}
#[utoipa::path(
    post,
    path = "/api/installations/{id}/attachments/{slot}",
    tag = "Attachments",
    params(
        ("id" = Uuid, Path, description = "ID do registro"),
        ("slot" = AttachmentSlot, Path, description = "Slot de anexo")
    ),
    request_body(content_type = "multipart/form-data", description = "Um único arquivo"),
    responses(
        (status = 200, description = "Registro atualizado", body = InstallationResponse),
        (status = 400, description = "Nenhum ou mais de um arquivo, vazio, grande demais ou de tipo não permitido"),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_attachment(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequireRole<AdminOrClient>,
    meta: ClientMeta,
    Path((id, slot)): Path<(Uuid, String)>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let slot = parse_slot(&slot).map_err(to_api)?;
    let multipart = multipart.map_err(|e| to_api(e.into()))?;

    let files = read_files(multipart).await.map_err(to_api)?;
    let file = single_file(files).map_err(to_api)?;

    let actor = guard.actor().clone();
    let role = actor.role;
    let record = app_state
        .attachment_service
        .attach(id, slot, file, &meta.audit(actor))
        .await
        .map_err(to_api)?;

    Ok(Json(InstallationResponse::for_role(record, role)))
}

// GET /api/installations/{id}/attachments/{slot}
#[utoipa::path(
    get,
    path = "/api/installations/{id}/attachments/{slot}",
    tag = "Attachments",
    params(
        ("id" = Uuid, Path, description = "ID do registro"),
        ("slot" = AttachmentSlot, Path, description = "Slot de anexo")
    ),
    responses(
        (status = 200, description = "Conteúdo do arquivo", content_type = "application/octet-stream"),
        (status = 404, description = "Registro ou anexo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_attachment(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminOrClient>,
    Path((id, slot)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let slot = parse_slot(&slot).map_err(to_api)?;
    let file = app_state
        .attachment_service
        .download(id, slot)
        .await
        .map_err(to_api)?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

// GET /api/installations/{id}/bundle
#[utoipa::path(
    get,
    path = "/api/installations/{id}/bundle",
    tag = "Attachments",
    params(("id" = Uuid, Path, description = "ID do registro")),
    responses(
        (status = 200, description = "ZIP com os anexos e SUMMARY.txt", content_type = "application/zip"),
        (status = 404, description = "Nenhum arquivo encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn bundle_installation(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminOrClient>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let bundle = app_state
        .attachment_service
        .bundle(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(zip_response(bundle))
}
