// src/services/installation_service.rs

use chrono::{Datelike, Utc};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, InstallationRepository},
    models::{
        audit::{AuditAction, AuditContext},
        auth::Role,
        installation::{Installation, InstallationFilter, Page, Pagination},
        installation_form::{InstallationPayload, StatusUpdatePayload},
    },
    services::{
        attachment_service::AttachmentService,
        export_service::{self, ExportProfile},
        serial_allocator,
    },
};

const RESOURCE: &str = "installation";

fn snapshot(record: &Installation) -> Option<serde_json::Value> {
    serde_json::to_value(record).ok()
}

fn status_snapshot(record: &Installation) -> serde_json::Value {
    json!({
        "deliveryStatus": record.delivery_status,
        "installationStatus": record.installation_status,
        "priority": record.priority,
        "deliveryDate": record.delivery_date,
        "installationDate": record.installation_date,
        "remarks": record.remarks,
    })
}

#[derive(Clone)]
pub struct InstallationService {
    installation_repo: InstallationRepository,
    audit_repo: AuditRepository,
    attachment_service: AttachmentService,
}

impl InstallationService {
    pub fn new(
        installation_repo: InstallationRepository,
        audit_repo: AuditRepository,
        attachment_service: AttachmentService,
    ) -> Self {
        Self { installation_repo, audit_repo, attachment_service }
    }

    fn pool(&self) -> &PgPool {
        self.installation_repo.pool()
    }

    // --- CREATE ---
    pub async fn create(&self, payload: InstallationPayload, ctx: &AuditContext) -> Result<Installation, AppError> {
        let payload = payload.normalized();
        payload.validate_for_create()?;

        let supplied_sr_no = payload.sr_no.clone();
        let fields = payload.into_fields();

        let mut tx = self.pool().begin().await?;

        let sr_no = match supplied_sr_no {
            Some(sr_no) => sr_no,
            None => self.allocate_serial(&mut *tx, Utc::now().year()).await?,
        };

        // Se falhar aqui, o tx sofre rollback automático ao sair do escopo (drop)
        let record = self
            .installation_repo
            .insert(&mut *tx, &sr_no, &fields, &ctx.actor.name)
            .await?;

        let entry = ctx.entry(AuditAction::Create, RESOURCE, Some(record.id), None, snapshot(&record));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::info!("🆕 Instalação {} criada por {}", record.sr_no, ctx.actor.name);
        Ok(record)
    }

    /// Próximo sr_no do ano. O advisory lock segura outras criações do mesmo
    /// ano até o commit; o índice único continua como última barreira.
    async fn allocate_serial(&self, conn: &mut PgConnection, year: i32) -> Result<String, AppError> {
        let prefix = serial_allocator::year_prefix(year);
        self.installation_repo.lock_serial_prefix(&mut *conn, &prefix).await?;
        let last = self
            .installation_repo
            .last_serial_with_prefix(&mut *conn, &prefix)
            .await?;
        serial_allocator::next_serial(year, last.as_deref())
            .ok_or_else(|| AppError::Conflict(format!("{prefix}: sequência do ano esgotada")))
    }

    // --- UPDATE ---
    pub async fn update(
        &self,
        id: Uuid,
        payload: InstallationPayload,
        ctx: &AuditContext,
    ) -> Result<Installation, AppError> {
        let payload = payload.normalized();
        payload.validate_for_update()?;
        let fields = payload.into_fields();

        let mut tx = self.pool().begin().await?;

        let before = self
            .installation_repo
            .find_live(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let updated = self
            .installation_repo
            .update_fields(&mut *tx, id, &fields, &ctx.actor.name)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let entry = ctx.entry(AuditAction::Update, RESOURCE, Some(id), snapshot(&before), snapshot(&updated));
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        change: StatusUpdatePayload,
        ctx: &AuditContext,
    ) -> Result<Installation, AppError> {
        change.validate_consistency()?;

        let mut tx = self.pool().begin().await?;

        let before = self
            .installation_repo
            .find_live(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let updated = self
            .installation_repo
            .update_status(&mut *tx, id, &change, &ctx.actor.name)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let entry = ctx.entry(
            AuditAction::StatusChange,
            RESOURCE,
            Some(id),
            Some(status_snapshot(&before)),
            Some(status_snapshot(&updated)),
        );
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(updated)
    }

    // --- DELETE ---
    /// Remove os arquivos primeiro (best-effort), depois marca como excluído.
    pub async fn soft_delete(&self, id: Uuid, ctx: &AuditContext) -> Result<(), AppError> {
        let record = self
            .installation_repo
            .find_live(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        self.attachment_service.remove_all(&record).await;

        let mut tx = self.pool().begin().await?;

        if !self.installation_repo.mark_deleted(&mut *tx, id, &ctx.actor.name).await? {
            return Err(AppError::NotFound(id.to_string()));
        }

        let entry = ctx.entry(AuditAction::Delete, RESOURCE, Some(id), snapshot(&record), None);
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;

        tracing::warn!("🗑️ Instalação {} excluída por {}", record.sr_no, ctx.actor.name);
        Ok(())
    }

    // --- READ ---
    pub async fn get(&self, id: Uuid) -> Result<Installation, AppError> {
        self.installation_repo
            .find_live(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    pub async fn list(&self, filter: &InstallationFilter, pagination: Pagination) -> Result<Page<Installation>, AppError> {
        let today = Utc::now().date_naive();

        let total = self.installation_repo.count(self.pool(), filter, today).await?;
        let items = self.installation_repo.list(self.pool(), filter, pagination, today).await?;

        Ok(Page {
            items,
            total,
            page: pagination.page(),
            per_page: pagination.limit(),
        })
    }

    pub async fn export_csv(&self, filter: &InstallationFilter, role: Role) -> Result<Vec<u8>, AppError> {
        let today = Utc::now().date_naive();
        let records = self.installation_repo.list_all(self.pool(), filter, today).await?;
        export_service::to_csv(&records, ExportProfile::for_role(role))
    }
}

// Testes contra Postgres real: `DATABASE_URL=... cargo test -- --ignored`
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::{
        models::{
            attachment::UploadedFile,
            auth::Actor,
            installation::AttachmentSlot,
        },
        storage::{BlobStore, LocalStorage},
    };
    use bytes::Bytes;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn services(pool: &PgPool, dir: &TempDir) -> (InstallationService, AttachmentService) {
        let installation_repo = InstallationRepository::new(pool.clone());
        let audit_repo = AuditRepository::new(pool.clone());
        let storage: Arc<dyn BlobStore> = Arc::new(LocalStorage::new(dir.path()));
        let attachments = AttachmentService::new(
            installation_repo.clone(),
            audit_repo.clone(),
            storage,
            10 * 1024 * 1024,
        );
        let installations =
            InstallationService::new(installation_repo, audit_repo, attachments.clone());
        (installations, attachments)
    }

    fn ctx(role: Role) -> AuditContext {
        AuditContext {
            actor: Actor { id: Uuid::new_v4(), name: "Priya Sharma".into(), role },
            ip_address: Some("127.0.0.1".into()),
            user_agent: None,
        }
    }

    fn payload() -> InstallationPayload {
        InstallationPayload {
            region: Some("North".into()),
            district: Some("Pune".into()),
            tahsil: Some("Haveli".into()),
            pin_code: Some("411001".into()),
            address: Some("Gram Panchayat Office".into()),
            receiver_name: Some("Sunita Patil".into()),
            contact_number: Some("9876543210".into()),
            ..Default::default()
        }
    }

    async fn count_rows(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM installations")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn sequential_creates_number_from_one(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);
        let year = Utc::now().year();

        for n in 1..=3 {
            let record = service.create(payload(), &ctx(Role::User)).await.unwrap();
            assert_eq!(record.sr_no, format!("DC-{year}-{n:04}"));
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn oversized_serial_in_the_table_does_not_block_creation(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);
        let year = Utc::now().year();
        let repo = InstallationRepository::new(pool.clone());
        let huge = format!("DC-{year}-{}", "9".repeat(24));
        repo.insert(&pool, &huge, &crate::test_support::sample_fields(), "seed").await.unwrap();

        let record = service.create(payload(), &ctx(Role::User)).await.unwrap();
        assert_eq!(record.sr_no, format!("DC-{year}-0001"));

        let supplied = InstallationPayload { sr_no: Some(format!("DC-{year}-{}", "9".repeat(10))), ..payload() };
        let err = service.create(supplied, &ctx(Role::User)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn exhausted_year_is_a_conflict(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);
        let year = Utc::now().year();
        let repo = InstallationRepository::new(pool.clone());
        let last = format!("DC-{year}-999999999");
        repo.insert(&pool, &last, &crate::test_support::sample_fields(), "seed").await.unwrap();

        let err = service.create(payload(), &ctx(Role::User)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(count_rows(&pool).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_creates_never_share_a_serial(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.create(payload(), &ctx(Role::User)).await })
            })
            .collect();

        let mut serials = Vec::new();
        for handle in handles {
            serials.push(handle.await.unwrap().unwrap().sr_no);
        }
        serials.sort();
        serials.dedup();
        assert_eq!(serials.len(), 8);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn invalid_payload_persists_nothing(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);

        let bad_pin = InstallationPayload { pin_code: Some("41100".into()), ..payload() };
        let err = service.create(bad_pin, &ctx(Role::User)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let bad_phone = InstallationPayload { contact_number: Some("987654321".into()), ..payload() };
        assert!(service.create(bad_phone, &ctx(Role::User)).await.is_err());

        assert_eq!(count_rows(&pool).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn deleted_serials_are_not_reused(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);
        let admin = ctx(Role::Admin);

        let first = service.create(payload(), &admin).await.unwrap();
        service.soft_delete(first.id, &admin).await.unwrap();
        let second = service.create(payload(), &admin).await.unwrap();

        assert_ne!(first.sr_no, second.sr_no);
        assert!(matches!(service.get(first.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.soft_delete(first.id, &admin).await, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn soft_delete_removes_blobs(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, attachments) = services(&pool, &dir);
        let admin = ctx(Role::Admin);

        let record = service.create(payload(), &admin).await.unwrap();
        let file = UploadedFile { file_name: "report.pdf".into(), bytes: Bytes::from_static(b"%PDF-1.4") };
        let updated = attachments
            .attach(record.id, AttachmentSlot::DeliveryReport, file, &admin)
            .await
            .unwrap();
        let key = updated.slot_key(AttachmentSlot::DeliveryReport).unwrap().to_string();
        assert!(dir.path().join(&key).exists());

        service.soft_delete(record.id, &admin).await.unwrap();

        assert!(!dir.path().join(&key).exists());
        let download = attachments.download(record.id, AttachmentSlot::DeliveryReport).await;
        assert!(matches!(download, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn serial_number_is_immutable(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);
        let admin = ctx(Role::Admin);

        let record = service.create(payload(), &admin).await.unwrap();
        let change = InstallationPayload { sr_no: Some("DC-1999-0001".into()), ..payload() };
        let err = service.update(record.id, change, &admin).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(service.get(record.id).await.unwrap().sr_no, record.sr_no);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn mutations_are_audited(pool: PgPool) {
        let dir = TempDir::new().unwrap();
        let (service, _) = services(&pool, &dir);
        let admin = ctx(Role::Admin);

        let record = service.create(payload(), &admin).await.unwrap();
        let change: StatusUpdatePayload =
            serde_json::from_str(r#"{"deliveryStatus":"Delivered"}"#).unwrap();
        service.update_status(record.id, change, &admin).await.unwrap();
        service.soft_delete(record.id, &admin).await.unwrap();

        let actions: Vec<String> =
            sqlx::query_scalar("SELECT action FROM audit_logs ORDER BY created_at, action")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(actions.len(), 3);
        assert!(actions.contains(&"CREATE".to_string()));
        assert!(actions.contains(&"STATUS_CHANGE".to_string()));
        assert!(actions.contains(&"DELETE".to_string()));
    }
}
