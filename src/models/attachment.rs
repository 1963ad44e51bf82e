// src/models/attachment.rs

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::installation::AttachmentSlot;

/// Arquivo recebido do multipart, ainda não validado.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Arquivo pronto para download.
#[derive(Debug)]
pub struct StoredFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachFailure {
    #[schema(example = "mouse_photo")]
    pub field: String,
    pub error: String,
}

// Resultado do upload em lote: um campo com erro não derruba os outros
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachReport {
    pub attached: Vec<AttachmentSlot>,
    pub failed: Vec<AttachFailure>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleRequest {
    pub ids: Vec<Uuid>,
}
