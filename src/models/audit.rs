// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "audit_severity", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    StatusChange,
    Delete,
    Attach,
    Share,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::StatusChange => "STATUS_CHANGE",
            Self::Delete => "DELETE",
            Self::Attach => "ATTACH",
            Self::Share => "SHARE",
        }
    }

    pub fn severity(&self) -> AuditSeverity {
        match self {
            Self::Delete => AuditSeverity::Critical,
            Self::Update | Self::StatusChange => AuditSeverity::Warning,
            _ => AuditSeverity::Info,
        }
    }
}

// O que sai do banco (Tabela audit_logs)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_name: String,
    pub actor_role: String,
    #[schema(example = "UPDATE")]
    pub action: String,
    #[schema(example = "installation")]
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub severity: AuditSeverity,
    pub created_at: DateTime<Utc>,
}

// O que entra (montado pelos services a cada mutação)
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: Option<Uuid>,
    pub actor_name: String,
    pub actor_role: String,
    pub action: AuditAction,
    pub resource_type: &'static str,
    pub resource_id: Option<Uuid>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Quem fez a mutação e de onde. Montado pelo handler, repassado aos services.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub actor: Actor,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn entry(
        &self,
        action: AuditAction,
        resource_type: &'static str,
        resource_id: Option<Uuid>,
        old_values: Option<Value>,
        new_values: Option<Value>,
    ) -> NewAuditEntry {
        NewAuditEntry {
            actor_id: Some(self.actor.id),
            actor_name: self.actor.name.clone(),
            actor_role: self.actor.role.as_str().to_string(),
            action,
            resource_type,
            resource_id,
            old_values,
            new_values,
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}
