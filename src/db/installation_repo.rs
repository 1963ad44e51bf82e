// src/db/installation_repo.rs

use chrono::NaiveDate;
use sqlx::{postgres::PgArguments, query::QueryAs, Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        installation::{AttachmentSlot, Installation, InstallationFilter, Pagination, StatusPreset, OVERDUE_AFTER_DAYS},
        installation_form::{InstallationFields, StatusUpdatePayload},
    },
};

type InstallationQuery<'q> = QueryAs<'q, Postgres, Installation, PgArguments>;

// Colunas editáveis pelo formulário, na ordem dos binds ($2..$35)
const FIELD_COLUMNS: [&str; 34] = [
    "region", "district", "tahsil", "pin_code", "address",
    "receiver_name", "contact_number", "alternate_contact_number",
    "delivery_status", "installation_status", "priority",
    "dispatch_date", "delivery_date", "installation_date",
    "cpu_serial", "monitor_serial", "ups_serial", "keyboard_serial", "mouse_serial",
    "vendor_name", "installer_name", "installer_contact", "assigned_technician",
    "installation_charges", "remarks", "notes",
    "delivery_report_received", "installation_report_received", "belarc_report_received",
    "back_side_photo_taken", "os_install_photo_taken", "keyboard_photo_taken",
    "mouse_photo_taken", "screenshot_taken",
];

fn bind_fields<'q>(query: InstallationQuery<'q>, f: &'q InstallationFields) -> InstallationQuery<'q> {
    query
        .bind(&f.region)
        .bind(&f.district)
        .bind(&f.tahsil)
        .bind(&f.pin_code)
        .bind(&f.address)
        .bind(&f.receiver_name)
        .bind(&f.contact_number)
        .bind(&f.alternate_contact_number)
        .bind(f.delivery_status)
        .bind(f.installation_status)
        .bind(f.priority)
        .bind(f.dispatch_date)
        .bind(f.delivery_date)
        .bind(f.installation_date)
        .bind(&f.cpu_serial)
        .bind(&f.monitor_serial)
        .bind(&f.ups_serial)
        .bind(&f.keyboard_serial)
        .bind(&f.mouse_serial)
        .bind(&f.vendor_name)
        .bind(&f.installer_name)
        .bind(&f.installer_contact)
        .bind(&f.assigned_technician)
        .bind(f.installation_charges)
        .bind(&f.remarks)
        .bind(&f.notes)
        .bind(f.delivery_report_received)
        .bind(f.installation_report_received)
        .bind(f.belarc_report_received)
        .bind(f.back_side_photo_taken)
        .bind(f.os_install_photo_taken)
        .bind(f.keyboard_photo_taken)
        .bind(f.mouse_photo_taken)
        .bind(f.screenshot_taken)
}

/// Escapa `%`, `_` e `\` para usar a busca do usuário dentro de um ILIKE.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn map_unique_violation(e: sqlx::Error, sr_no: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("O número de série '{}' já existe.", sr_no));
        }
    }
    e.into()
}

// O repositório de instalações, responsável por todas as interações com a tabela 'installations'
#[derive(Clone)]
pub struct InstallationRepository {
    pool: PgPool,
}

impl InstallationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        sr_no: &str,
        fields: &InstallationFields,
        created_by: &str,
    ) -> Result<Installation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let placeholders: Vec<String> = (2..=FIELD_COLUMNS.len() + 1).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO installations (sr_no, {}, created_by) VALUES ($1, {}, ${}) RETURNING *",
            FIELD_COLUMNS.join(", "),
            placeholders.join(", "),
            FIELD_COLUMNS.len() + 2,
        );

        let query = sqlx::query_as::<_, Installation>(&sql).bind(sr_no);
        bind_fields(query, fields)
            .bind(created_by)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, sr_no))
    }

    /// Atualiza os campos do formulário. `None` se o registro não existe ou foi excluído.
    pub async fn update_fields<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        fields: &InstallationFields,
        updated_by: &str,
    ) -> Result<Option<Installation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignments: Vec<String> = FIELD_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ${}", i + 2))
            .collect();
        let sql = format!(
            "UPDATE installations SET {}, updated_by = ${}, updated_at = NOW() \
             WHERE id = $1 AND record_state = 'ACTIVE' RETURNING *",
            assignments.join(", "),
            FIELD_COLUMNS.len() + 2,
        );

        let query = sqlx::query_as::<_, Installation>(&sql).bind(id);
        let updated = bind_fields(query, fields)
            .bind(updated_by)
            .fetch_optional(executor)
            .await?;

        Ok(updated)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        change: &StatusUpdatePayload,
        updated_by: &str,
    ) -> Result<Option<Installation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // COALESCE mantém o valor atual quando o campo não veio no PATCH
        let updated = sqlx::query_as::<_, Installation>(
            r#"
            UPDATE installations SET
                delivery_status = COALESCE($2, delivery_status),
                installation_status = COALESCE($3, installation_status),
                priority = COALESCE($4, priority),
                delivery_date = COALESCE($5, delivery_date),
                installation_date = COALESCE($6, installation_date),
                remarks = COALESCE($7, remarks),
                updated_by = $8,
                updated_at = NOW()
            WHERE id = $1 AND record_state = 'ACTIVE'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(change.delivery_status)
        .bind(change.installation_status)
        .bind(change.priority)
        .bind(change.delivery_date)
        .bind(change.installation_date)
        .bind(&change.remarks)
        .bind(updated_by)
        .fetch_optional(executor)
        .await?;

        Ok(updated)
    }

    /// Grava (ou limpa, com `None`) a chave de um slot de anexo.
    pub async fn set_attachment<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        slot: AttachmentSlot,
        key: Option<&str>,
        updated_by: &str,
    ) -> Result<Option<Installation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O nome da coluna vem do enum, nunca do usuário
        let sql = format!(
            "UPDATE installations SET {} = $2, updated_by = $3, updated_at = NOW() \
             WHERE id = $1 AND record_state = 'ACTIVE' RETURNING *",
            slot.column()
        );

        let updated = sqlx::query_as::<_, Installation>(&sql)
            .bind(id)
            .bind(key)
            .bind(updated_by)
            .fetch_optional(executor)
            .await?;

        Ok(updated)
    }

    /// Soft delete: muda o estado e limpa os slots. Retorna `false` se não havia registro ativo.
    pub async fn mark_deleted<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        deleted_by: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cleared: Vec<String> = AttachmentSlot::ALL
            .iter()
            .map(|slot| format!("{} = NULL", slot.column()))
            .collect();
        let sql = format!(
            "UPDATE installations SET record_state = 'DELETED', deleted_at = NOW(), \
             updated_by = $2, updated_at = NOW(), {} \
             WHERE id = $1 AND record_state = 'ACTIVE'",
            cleared.join(", ")
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(deleted_by)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  NÚMERO DE SÉRIE
    // =========================================================================

    /// Lock transacional por prefixo de ano; liberado no commit/rollback.
    pub async fn lock_serial_prefix<'e, E>(&self, executor: E, prefix: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(prefix)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Maior sr_no do prefixo, INCLUINDO registros excluídos, por ordem numérica.
    /// Só entram sufixos na forma gerada pelo alocador (até 9 dígitos), então o
    /// CAST nunca estoura.
    pub async fn last_serial_with_prefix<'e, E>(
        &self,
        executor: E,
        prefix: &str,
    ) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let last: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT sr_no FROM installations
            WHERE starts_with(sr_no, $1)
              AND substr(sr_no, length($1) + 1) ~ '^([0-9]{4}|[1-9][0-9]{4,8})$'
            ORDER BY CAST(substr(sr_no, length($1) + 1) AS BIGINT) DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .fetch_optional(executor)
        .await?;

        Ok(last.map(|(sr_no,)| sr_no))
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_live<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Installation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, Installation>(
            "SELECT * FROM installations WHERE id = $1 AND record_state = 'ACTIVE'",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }

    pub async fn find_live_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Installation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, Installation>(
            "SELECT * FROM installations WHERE id = ANY($1) AND record_state = 'ACTIVE' ORDER BY sr_no ASC",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(records)
    }

    /// Página de registros ativos, mais recentes primeiro.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &InstallationFilter,
        pagination: Pagination,
        today: NaiveDate,
    ) -> Result<Vec<Installation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM installations");
        push_filters(&mut qb, filter, today);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let records = qb.build_query_as::<Installation>().fetch_all(executor).await?;
        Ok(records)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        filter: &InstallationFilter,
        today: NaiveDate,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM installations");
        push_filters(&mut qb, filter, today);

        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    /// Todos os registros do filtro, para exportação (sem paginação).
    pub async fn list_all<'e, E>(
        &self,
        executor: E,
        filter: &InstallationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Installation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM installations");
        push_filters(&mut qb, filter, today);
        qb.push(" ORDER BY created_at DESC, id DESC");

        let records = qb.build_query_as::<Installation>().fetch_all(executor).await?;
        Ok(records)
    }
}

/// Conjunção dos filtros + busca disjuntiva. Sempre restrito a registros ativos.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &InstallationFilter, today: NaiveDate) {
    qb.push(" WHERE record_state = 'ACTIVE'");

    if let Some(status) = filter.delivery_status {
        qb.push(" AND delivery_status = ").push_bind(status);
    }
    if let Some(status) = filter.installation_status {
        qb.push(" AND installation_status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(region) = filter.region.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND region = ").push_bind(region.to_string());
    }
    if let Some(district) = filter.district.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND district = ").push_bind(district.to_string());
    }

    if let Some(preset) = filter.status {
        match preset {
            StatusPreset::Overdue => {
                let cutoff = today - chrono::Duration::days(OVERDUE_AFTER_DAYS);
                qb.push(" AND installation_status = 'PENDING' AND delivery_date <= ")
                    .push_bind(cutoff);
            }
            StatusPreset::Delivered => {
                qb.push(" AND delivery_status = 'DELIVERED'");
            }
            StatusPreset::InTransit => {
                qb.push(" AND delivery_status = 'IN_TRANSIT'");
            }
            StatusPreset::PendingDelivery => {
                qb.push(" AND delivery_status = 'PENDING'");
            }
            StatusPreset::Installed => {
                qb.push(" AND installation_status = 'INSTALLED'");
            }
            StatusPreset::InProgress => {
                qb.push(" AND installation_status = 'IN_PROGRESS'");
            }
            StatusPreset::PendingInstallation => {
                qb.push(" AND installation_status = 'PENDING'");
            }
        }
    }

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (sr_no ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR receiver_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR address ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR district ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}


// Testes contra Postgres real: `DATABASE_URL=... cargo test -- --ignored`
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::models::installation::InstallationStatus;
    use crate::test_support::sample_fields;
    use chrono::Utc;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn serial_lookup_includes_deleted_rows(pool: PgPool) {
        let repo = InstallationRepository::new(pool.clone());
        let fields = sample_fields();

        let first = repo.insert(&pool, "DC-2025-0009", &fields, "tester").await.unwrap();
        repo.insert(&pool, "DC-2025-0010", &fields, "tester").await.unwrap();
        assert!(repo.mark_deleted(&pool, first.id, "tester").await.unwrap());
        let last = repo.last_serial_with_prefix(&pool, "DC-2025-").await.unwrap();
        assert_eq!(last.as_deref(), Some("DC-2025-0010"));

        // Ordem numérica, não lexicográfica
        repo.insert(&pool, "DC-2025-10000", &fields, "tester").await.unwrap();
        let last = repo.last_serial_with_prefix(&pool, "DC-2025-").await.unwrap();
        assert_eq!(last.as_deref(), Some("DC-2025-10000"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn serial_lookup_skips_oversized_and_padded_suffixes(pool: PgPool) {
        let repo = InstallationRepository::new(pool.clone());
        let fields = sample_fields();

        repo.insert(&pool, "DC-2025-0003", &fields, "tester").await.unwrap();
        let huge = format!("DC-2025-{}", "9".repeat(24));
        repo.insert(&pool, &huge, &fields, "tester").await.unwrap();
        repo.insert(&pool, "DC-2025-000042", &fields, "tester").await.unwrap();

        let last = repo.last_serial_with_prefix(&pool, "DC-2025-").await.unwrap();
        assert_eq!(last.as_deref(), Some("DC-2025-0003"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_serial_is_a_conflict(pool: PgPool) {
        let repo = InstallationRepository::new(pool.clone());
        let fields = sample_fields();

        repo.insert(&pool, "DC-2025-0001", &fields, "tester").await.unwrap();
        let err = repo.insert(&pool, "DC-2025-0001", &fields, "tester").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn overdue_lists_only_pending_installations(pool: PgPool) {
        let repo = InstallationRepository::new(pool.clone());
        let today = Utc::now().date_naive();
        let ten_days_ago = today - chrono::Duration::days(10);

        let mut pending = sample_fields();
        pending.delivery_date = Some(ten_days_ago);
        let overdue = repo.insert(&pool, "DC-2025-0001", &pending, "tester").await.unwrap();

        let mut installed = pending.clone();
        installed.installation_status = InstallationStatus::Installed;
        repo.insert(&pool, "DC-2025-0002", &installed, "tester").await.unwrap();

        let mut recent = sample_fields();
        recent.delivery_date = Some(today - chrono::Duration::days(2));
        repo.insert(&pool, "DC-2025-0003", &recent, "tester").await.unwrap();

        let filter = InstallationFilter { status: Some(StatusPreset::Overdue), ..Default::default() };
        let page = repo.list(&pool, &filter, Pagination::default(), today).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, overdue.id);
        assert_eq!(repo.count(&pool, &filter, today).await.unwrap(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn list_is_newest_first_and_searchable(pool: PgPool) {
        let repo = InstallationRepository::new(pool.clone());
        let today = Utc::now().date_naive();

        let mut a = sample_fields();
        a.receiver_name = "Anil Deshmukh".into();
        repo.insert(&pool, "DC-2025-0001", &a, "tester").await.unwrap();
        let mut b = sample_fields();
        b.receiver_name = "Bhavna Joshi".into();
        repo.insert(&pool, "DC-2025-0002", &b, "tester").await.unwrap();

        let all = repo.list(&pool, &InstallationFilter::default(), Pagination::default(), today).await.unwrap();
        assert_eq!(all[0].sr_no, "DC-2025-0002");

        let filter = InstallationFilter { search: Some("joshi".into()), ..Default::default() };
        let found = repo.list(&pool, &filter, Pagination::default(), today).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].receiver_name, "Bhavna Joshi");
    }
}
