use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    middleware::i18n::Locale,
    models::installation::AttachmentSlot,
    storage::StorageError,
};

// Erro de domínio: o que services e repositórios devolvem.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    #[error("Registro não encontrado: {0}")]
    NotFound(String),

    #[error("Slot de anexo desconhecido: {0}")]
    UnknownSlot(String),

    // Slot vazio OU arquivo ausente no storage (referência pendente)
    #[error("Arquivo não encontrado no slot {0}")]
    AttachmentNotFound(AttachmentSlot),

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Nenhum arquivo encontrado")]
    NoFilesFound,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Erro de armazenamento: {0}")]
    Storage(#[from] StorageError),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Atalho para um erro de validação num único campo.
    pub fn field(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let message: String = message.into();
        let mut err = ValidationError::new(code);
        err.message = Some(message.into());
        let mut errors = ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    fn message_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::UnknownSlot(_) => (StatusCode::NOT_FOUND, "unknown_slot"),
            AppError::AttachmentNotFound(_) => (StatusCode::NOT_FOUND, "attachment_not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::NoFilesFound => (StatusCode::NOT_FOUND, "no_files"),
            AppError::InvalidToken | AppError::JwtError(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Storage(_) | AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }

    /// Converte para o envelope HTTP, traduzindo a mensagem de topo.
    /// Causas internas são logadas aqui e nunca vão para o cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let (status, key) = self.message_key();
        let error = i18n.translate(&locale.0, key);

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors)),
            AppError::UnknownSlot(slot) => Some(json!({ "field": slot })),
            AppError::AttachmentNotFound(slot) => Some(json!({ "field": slot.column() })),
            AppError::BadRequest(reason) => Some(json!({ "reason": reason })),
            AppError::Conflict(_) | AppError::NotFound(_) => None,
            _ => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Erro Interno do Servidor: {}", self);
                }
                None
            }
        };

        ApiError { status, error, details }
    }
}

fn validation_details(errors: &ValidationErrors) -> Value {
    let mut details = HashMap::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        details.insert(field.to_string(), messages);
    }
    json!(details)
}

// Envelope de resposta: { "error": "...", "details": {...} }
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error(&Locale(DEFAULT_LANG.to_string()), &I18nStore::new())
    }
}

// Usado quando não há Locale disponível (ex.: rejeição de extratores)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

// Rejeições dos extratores do axum viram 400 no mesmo envelope
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
