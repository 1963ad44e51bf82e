// src/services/attachment_service.rs

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, InstallationRepository},
    models::{
        attachment::{AttachFailure, AttachReport, StoredFile, UploadedFile},
        audit::{AuditAction, AuditContext},
        installation::{AttachmentSlot, Installation},
    },
    services::{
        archive::{self, ArchiveEntry, TempArchive},
        image_normalizer,
    },
    storage::{BlobStore, StorageError},
};

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "pdf", "doc", "docx"];
pub const MAX_BUNDLE_RECORDS: usize = 100;

/// Extensão em minúsculas, sem o ponto.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// ZIP pronto para ser enviado.
pub struct BundleDownload {
    pub file_name: String,
    pub archive: TempArchive,
}

#[derive(Clone)]
pub struct AttachmentService {
    installation_repo: InstallationRepository,
    audit_repo: AuditRepository,
    storage: Arc<dyn BlobStore>,
    max_upload_bytes: usize,
}

impl AttachmentService {
    pub fn new(
        installation_repo: InstallationRepository,
        audit_repo: AuditRepository,
        storage: Arc<dyn BlobStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self { installation_repo, audit_repo, storage, max_upload_bytes }
    }

    fn pool(&self) -> &PgPool {
        self.installation_repo.pool()
    }

    /// Tamanho e extensão. Devolve a extensão normalizada.
    fn check_upload(&self, slot: AttachmentSlot, file: &UploadedFile) -> Result<String, AppError> {
        if file.bytes.is_empty() {
            return Err(AppError::field(slot.column(), "empty", "The uploaded file is empty."));
        }
        if file.bytes.len() > self.max_upload_bytes {
            return Err(AppError::field(
                slot.column(),
                "file_size",
                format!("File exceeds the {} MB limit.", self.max_upload_bytes / (1024 * 1024)),
            ));
        }
        match file_extension(&file.file_name) {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
            _ => Err(AppError::field(
                slot.column(),
                "file_type",
                "Allowed file types: jpg, jpeg, png, pdf, doc, docx.",
            )),
        }
    }

    // =========================================================================
    //  UPLOAD
    // =========================================================================

    pub async fn attach(
        &self,
        id: Uuid,
        slot: AttachmentSlot,
        file: UploadedFile,
        ctx: &AuditContext,
    ) -> Result<Installation, AppError> {
        let record = self
            .installation_repo
            .find_live(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        self.attach_to(&record, slot, file, ctx).await
    }

    async fn attach_to(
        &self,
        record: &Installation,
        slot: AttachmentSlot,
        file: UploadedFile,
        ctx: &AuditContext,
    ) -> Result<Installation, AppError> {
        let extension = self.check_upload(slot, &file)?;

        // Redimensionar/re-codificar é CPU: fora do runtime
        let normalized = tokio::task::spawn_blocking(move || image_normalizer::normalize(file.bytes, &extension))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de compressão: {}", e))?
            .map_err(|e| {
                tracing::warn!("Imagem inválida em {}: {}", slot, e);
                AppError::field(slot.column(), "image", "The file is not a valid image.")
            })?;

        let key = format!(
            "{}/{}_{}.{}",
            record.sr_no,
            slot.column(),
            Utc::now().format("%Y%m%d%H%M%S%3f"),
            normalized.extension
        );
        self.storage.put(&key, normalized.bytes).await?;

        let updated = match self.persist_key(record, slot, &key, ctx).await {
            Ok(updated) => updated,
            Err(e) => {
                // O registro não aponta para o arquivo novo: não deixar órfão
                self.delete_best_effort(&key).await;
                return Err(e);
            }
        };

        if let Some(old_key) = record.slot_key(slot) {
            if old_key != key {
                self.delete_best_effort(old_key).await;
            }
        }

        tracing::info!("📎 {} anexado em {} ({})", slot, record.sr_no, key);
        Ok(updated)
    }

    async fn persist_key(
        &self,
        record: &Installation,
        slot: AttachmentSlot,
        key: &str,
        ctx: &AuditContext,
    ) -> Result<Installation, AppError> {
        let mut tx = self.pool().begin().await?;

        let updated = self
            .installation_repo
            .set_attachment(&mut *tx, record.id, slot, Some(key), &ctx.actor.name)
            .await?
            .ok_or_else(|| AppError::NotFound(record.id.to_string()))?;

        let entry = ctx.entry(
            AuditAction::Attach,
            "installation",
            Some(record.id),
            Some(json!({ slot.column(): record.slot_key(slot) })),
            Some(json!({ slot.column(): key })),
        );
        self.audit_repo.record(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Upload em lote (um campo multipart por slot). Cada campo é independente.
    pub async fn attach_many(
        &self,
        id: Uuid,
        files: Vec<(String, UploadedFile)>,
        ctx: &AuditContext,
    ) -> Result<AttachReport, AppError> {
        if files.is_empty() {
            return Err(AppError::field("files", "required", "No files were uploaded."));
        }

        let mut record = self
            .installation_repo
            .find_live(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let mut report = AttachReport::default();
        for (field, file) in files {
            let slot = match field.parse::<AttachmentSlot>() {
                Ok(slot) => slot,
                Err(_) => {
                    tracing::warn!("Campo de anexo desconhecido em {}: {}", record.sr_no, field);
                    report.failed.push(AttachFailure { field, error: "Unknown attachment field.".into() });
                    continue;
                }
            };

            match self.attach_to(&record, slot, file, ctx).await {
                Ok(updated) => {
                    // Próximo campo enxerga as chaves já gravadas
                    record = updated;
                    report.attached.push(slot);
                }
                Err(e) => {
                    tracing::warn!("Falha ao anexar {} em {}: {}", slot, record.sr_no, e);
                    report.failed.push(AttachFailure { field, error: failure_reason(&e) });
                }
            }
        }

        Ok(report)
    }

    // =========================================================================
    //  DOWNLOAD
    // =========================================================================

    pub async fn download(&self, id: Uuid, slot: AttachmentSlot) -> Result<StoredFile, AppError> {
        let record = self
            .installation_repo
            .find_live(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let key = record.slot_key(slot).ok_or(AppError::AttachmentNotFound(slot))?;
        let bytes = self.read_blob(&record, slot, key).await?.ok_or(AppError::AttachmentNotFound(slot))?;

        let extension = file_extension(key).unwrap_or_default();
        Ok(StoredFile {
            file_name: format!("{}_{}.{}", record.sr_no, slot.label(), extension),
            content_type: content_type_for(&extension),
            bytes,
        })
    }

    /// `None` quando a referência está pendente (arquivo sumiu do storage).
    async fn read_blob(&self, record: &Installation, slot: AttachmentSlot, key: &str) -> Result<Option<Bytes>, AppError> {
        match self.storage.get(key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(StorageError::NotFound(_)) => {
                tracing::warn!("Referência pendente: {} {} -> {}", record.sr_no, slot, key);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    //  PACOTES ZIP
    // =========================================================================

    pub async fn bundle(&self, id: Uuid) -> Result<BundleDownload, AppError> {
        let record = self
            .installation_repo
            .find_live(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let file_name = format!("{}_files.zip", record.sr_no);
        self.archive_records(&[record], file_name, false).await
    }

    pub async fn bundle_many(&self, ids: &[Uuid]) -> Result<BundleDownload, AppError> {
        if ids.is_empty() {
            return Err(AppError::field("ids", "required", "Select at least one record."));
        }
        if ids.len() > MAX_BUNDLE_RECORDS {
            return Err(AppError::field(
                "ids",
                "length",
                format!("At most {} records can be bundled at once.", MAX_BUNDLE_RECORDS),
            ));
        }

        let records = self.installation_repo.find_live_many(self.pool(), ids).await?;
        let file_name = format!("dc_bundle_{}.zip", Utc::now().format("%Y%m%d_%H%M%S"));
        self.archive_records(&records, file_name, true).await
    }

    /// Lê os anexos presentes e monta o ZIP. Sem nenhum arquivo: `NoFilesFound`.
    pub(crate) async fn archive_records(
        &self,
        records: &[Installation],
        file_name: String,
        multi: bool,
    ) -> Result<BundleDownload, AppError> {
        let mut entries = Vec::new();
        let mut file_counts = Vec::with_capacity(records.len());

        for record in records {
            let folder = if multi { format!("{}/", record.sr_no) } else { String::new() };
            let mut files = 0;

            for (slot, key) in record.attachments() {
                let Some(bytes) = self.read_blob(record, slot, key).await? else {
                    continue;
                };
                let extension = file_extension(key).unwrap_or_default();
                entries.push(ArchiveEntry { path: format!("{}{}.{}", folder, slot.label(), extension), contents: bytes });
                files += 1;
            }

            entries.push(ArchiveEntry {
                path: format!("{}summary.txt", folder),
                contents: Bytes::from(archive::record_summary(record)),
            });
            file_counts.push((record, files));
        }

        let total_files: usize = file_counts.iter().map(|(_, n)| n).sum();
        if total_files == 0 {
            return Err(AppError::NoFilesFound);
        }

        if multi {
            entries.push(ArchiveEntry {
                path: "SUMMARY.txt".to_string(),
                contents: Bytes::from(archive::bundle_summary(&file_counts, Utc::now())),
            });
        }

        let archive = tokio::task::spawn_blocking(move || archive::write_zip(entries))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task do ZIP: {}", e))??;

        tracing::info!("🗜️ {} gerado ({} arquivos, {} bytes)", file_name, total_files, archive.size());
        Ok(BundleDownload { file_name, archive })
    }

    // =========================================================================
    //  REMOÇÃO
    // =========================================================================

    /// Apaga todos os blobs do registro. Falhas são logadas e ignoradas.
    pub async fn remove_all(&self, record: &Installation) {
        for (_, key) in record.attachments() {
            self.delete_best_effort(key).await;
        }
    }

    async fn delete_best_effort(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!("Falha ao remover {}: {}", key, e);
        }
    }
}

fn failure_reason(err: &AppError) -> String {
    match err {
        AppError::ValidationError(errors) => errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid file.".to_string()),
        AppError::NotFound(_) => "Record not found.".to_string(),
        _ => "Upload failed.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::LocalStorage, test_support::sample_installation};
    use sqlx::postgres::PgPoolOptions;
    use tempfile::TempDir;

    // Pool preguiçoso: nenhum destes testes toca o banco
    fn service(dir: &TempDir, max_upload_bytes: usize) -> (AttachmentService, Arc<dyn BlobStore>) {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let storage: Arc<dyn BlobStore> = Arc::new(LocalStorage::new(dir.path()));
        let service = AttachmentService::new(
            InstallationRepository::new(pool.clone()),
            AuditRepository::new(pool),
            storage.clone(),
            max_upload_bytes,
        );
        (service, storage)
    }

    fn upload(name: &str, len: usize) -> UploadedFile {
        UploadedFile { file_name: name.to_string(), bytes: Bytes::from(vec![7u8; len]) }
    }

    #[test]
    fn extensions_are_lowercased() {
        assert_eq!(file_extension("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("photo.back.JpEg").as_deref(), Some("jpeg"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension(".hidden"), None);
    }

    #[tokio::test]
    async fn upload_checks_size_and_type() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir, 1024);
        let slot = AttachmentSlot::DeliveryReport;

        assert_eq!(service.check_upload(slot, &upload("report.pdf", 10)).unwrap(), "pdf");

        let too_big = service.check_upload(slot, &upload("report.pdf", 2048)).unwrap_err();
        let AppError::ValidationError(errors) = too_big else { panic!("expected validation error") };
        assert_eq!(errors.field_errors()["delivery_report"][0].code, "file_size");

        let wrong_type = service.check_upload(slot, &upload("virus.exe", 10)).unwrap_err();
        let AppError::ValidationError(errors) = wrong_type else { panic!("expected validation error") };
        assert_eq!(errors.field_errors()["delivery_report"][0].code, "file_type");
    }

    #[tokio::test]
    async fn remove_all_deletes_every_referenced_blob() {
        let dir = TempDir::new().unwrap();
        let (service, storage) = service(&dir, 1024);

        let mut record = sample_installation("DC-2025-0001");
        record.mouse_photo = Some("DC-2025-0001/mouse_photo_1.jpg".into());
        record.delivery_report = Some("DC-2025-0001/delivery_report_1.pdf".into());
        // Referência pendente: não pode interromper a limpeza
        record.screenshot = Some("DC-2025-0001/screenshot_gone.png".into());
        storage.put("DC-2025-0001/mouse_photo_1.jpg", Bytes::from_static(b"m")).await.unwrap();
        storage.put("DC-2025-0001/delivery_report_1.pdf", Bytes::from_static(b"d")).await.unwrap();

        service.remove_all(&record).await;

        for (_, key) in record.attachments() {
            assert!(!storage.exists(key).await.unwrap(), "{key} still exists");
        }
    }

    #[tokio::test]
    async fn bundle_without_files_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir, 1024);

        let record = sample_installation("DC-2025-0001");
        let result = service.archive_records(&[record], "x.zip".into(), false).await;
        assert!(matches!(result, Err(AppError::NoFilesFound)));
    }

    #[tokio::test]
    async fn dangling_references_are_skipped_in_bundles() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir, 1024);

        let mut record = sample_installation("DC-2025-0001");
        record.keyboard_photo = Some("DC-2025-0001/keyboard_photo_missing.jpg".into());
        let result = service.archive_records(&[record], "x.zip".into(), false).await;
        assert!(matches!(result, Err(AppError::NoFilesFound)));
    }

    #[tokio::test]
    async fn multi_record_bundle_has_folders_and_summary() {
        let dir = TempDir::new().unwrap();
        let (service, storage) = service(&dir, 1024);

        let mut a = sample_installation("DC-2025-0001");
        a.mouse_photo = Some("DC-2025-0001/mouse_photo_1.jpg".into());
        storage.put("DC-2025-0001/mouse_photo_1.jpg", Bytes::from_static(b"m")).await.unwrap();
        let b = sample_installation("DC-2025-0002");

        let bundle = service.archive_records(&[a, b], "bundle.zip".into(), true).await.unwrap();
        let file = std::fs::File::open(bundle.archive.path()).unwrap();
        let zip = zip::ZipArchive::new(file).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            [
                "DC-2025-0001/Mouse Photo.jpg",
                "DC-2025-0001/summary.txt",
                "DC-2025-0002/summary.txt",
                "SUMMARY.txt",
            ]
        );
    }

    #[test]
    fn failure_reason_uses_the_field_message() {
        let err = AppError::field("mouse_photo", "file_type", "Allowed file types: jpg.");
        assert_eq!(failure_reason(&err), "Allowed file types: jpg.");
        let internal = AppError::InternalServerError(anyhow::anyhow!("boom"));
        assert_eq!(failure_reason(&internal), "Upload failed.");
    }
}
