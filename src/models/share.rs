// src/models/share.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    #[schema(example = "3f2a9c1e0b7d4e6a8c5b2d1f0e9a7c6b")]
    pub token: String,
    pub installation_id: Uuid,
    pub created_by: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// Resposta do POST /installations/{id}/share
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkResponse {
    pub token: String,
    #[schema(example = "/api/share/3f2a9c1e0b7d4e6a8c5b2d1f0e9a7c6b")]
    pub url: String,
    pub expires_at: DateTime<Utc>,
}
