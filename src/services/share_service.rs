// src/services/share_service.rs

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, InstallationRepository, ShareRepository},
    models::{
        audit::{AuditAction, AuditContext},
        installation::InstallationView,
        share::ShareLinkResponse,
    },
};

pub fn share_url(token: &str) -> String {
    format!("/api/share/{}", token)
}

#[derive(Clone)]
pub struct ShareService {
    share_repo: ShareRepository,
    installation_repo: InstallationRepository,
    audit_repo: AuditRepository,
    ttl: Duration,
}

impl ShareService {
    pub fn new(
        share_repo: ShareRepository,
        installation_repo: InstallationRepository,
        audit_repo: AuditRepository,
        ttl_hours: i64,
    ) -> Self {
        Self { share_repo, installation_repo, audit_repo, ttl: Duration::hours(ttl_hours) }
    }

    pub async fn create(&self, id: Uuid, ctx: &AuditContext) -> Result<ShareLinkResponse, AppError> {
        let mut tx = self.share_repo.pool().begin().await?;

        let record = self
            .installation_repo
            .find_live(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        // Token opaco: 122 bits aleatórios em hexadecimal
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.ttl;

        let link = self
            .share_repo
            .insert(&mut *tx, &token, record.id, &ctx.actor.name, expires_at)
            .await?;

        let entry = ctx.entry(
            AuditAction::Share,
            "installation",
            Some(record.id),
            None,
            Some(json!({ "expiresAt": link.expires_at })),
        );
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        Ok(ShareLinkResponse { url: share_url(&link.token), token: link.token, expires_at: link.expires_at })
    }

    /// Leitura pública. Token desconhecido, expirado ou registro excluído: `NotFound`.
    pub async fn resolve(&self, token: &str) -> Result<InstallationView, AppError> {
        let not_found = || AppError::NotFound("share link".to_string());

        let link = self.share_repo.find(self.share_repo.pool(), token).await?.ok_or_else(not_found)?;
        if link.is_expired(Utc::now()) {
            return Err(not_found());
        }

        let record = self
            .installation_repo
            .find_live(self.installation_repo.pool(), link.installation_id)
            .await?
            .ok_or_else(not_found)?;

        Ok(InstallationView::from(&record))
    }
}

// Testes contra Postgres real: `DATABASE_URL=... cargo test -- --ignored`
#[cfg(test)]
mod db_tests {
    use super::*;
    use sqlx::PgPool;
    use crate::{
        models::auth::{Actor, Role},
        test_support::sample_fields,
    };

    fn ctx() -> AuditContext {
        AuditContext {
            actor: Actor { id: Uuid::new_v4(), name: "Client One".into(), role: Role::Client },
            ip_address: None,
            user_agent: None,
        }
    }

    fn service(pool: &PgPool, ttl_hours: i64) -> ShareService {
        ShareService::new(
            ShareRepository::new(pool.clone()),
            InstallationRepository::new(pool.clone()),
            AuditRepository::new(pool.clone()),
            ttl_hours,
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn shared_record_is_readable_until_expiry(pool: PgPool) {
        let repo = InstallationRepository::new(pool.clone());
        let record = repo.insert(&pool, "DC-2025-0001", &sample_fields(), "tester").await.unwrap();

        let live = service(&pool, 24).create(record.id, &ctx()).await.unwrap();
        assert_eq!(live.url, format!("/api/share/{}", live.token));
        let view = service(&pool, 24).resolve(&live.token).await.unwrap();
        assert_eq!(view.sr_no, "DC-2025-0001");

        let expired = service(&pool, -1).create(record.id, &ctx()).await.unwrap();
        assert!(matches!(service(&pool, 24).resolve(&expired.token).await, Err(AppError::NotFound(_))));
        assert!(matches!(service(&pool, 24).resolve("nope").await, Err(AppError::NotFound(_))));
    }
}
