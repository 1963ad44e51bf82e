// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::{
        dashboard::{DashboardSummary, RegionBreakdownEntry},
        installation::OVERDUE_AFTER_DAYS,
    },
};

// Linha bruta das contagens; a taxa de conclusão é calculada fora do SQL
#[derive(Debug, FromRow)]
struct SummaryCounts {
    total: i64,
    delivered: i64,
    in_transit: i64,
    pending_delivery: i64,
    installed: i64,
    in_progress: i64,
    pending_installation: i64,
    high_priority: i64,
    overdue: i64,
    created_today: i64,
    installed_this_month: i64,
}

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // 1. Resumo Geral (uma única varredura com FILTER)
    pub async fn get_summary<'e, E>(&self, executor: E, today: NaiveDate) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let overdue_cutoff = today - chrono::Duration::days(OVERDUE_AFTER_DAYS);

        let counts = sqlx::query_as::<_, SummaryCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE delivery_status = 'DELIVERED') AS delivered,
                COUNT(*) FILTER (WHERE delivery_status = 'IN_TRANSIT') AS in_transit,
                COUNT(*) FILTER (WHERE delivery_status = 'PENDING') AS pending_delivery,
                COUNT(*) FILTER (WHERE installation_status = 'INSTALLED') AS installed,
                COUNT(*) FILTER (WHERE installation_status = 'IN_PROGRESS') AS in_progress,
                COUNT(*) FILTER (WHERE installation_status = 'PENDING') AS pending_installation,
                COUNT(*) FILTER (WHERE priority = 'HIGH') AS high_priority,
                COUNT(*) FILTER (
                    WHERE installation_status = 'PENDING' AND delivery_date <= $1
                ) AS overdue,
                COUNT(*) FILTER (WHERE (created_at AT TIME ZONE 'UTC')::date = $2) AS created_today,
                COUNT(*) FILTER (
                    WHERE installation_status = 'INSTALLED'
                      AND date_trunc('month', installation_date) = date_trunc('month', $2::date)
                ) AS installed_this_month
            FROM installations
            WHERE record_state = 'ACTIVE'
            "#,
        )
        .bind(overdue_cutoff)
        .bind(today)
        .fetch_one(executor)
        .await?;

        Ok(summary_from_counts(counts))
    }

    // 2. Quebra por Região
    pub async fn get_region_breakdown<'e, E>(&self, executor: E) -> Result<Vec<RegionBreakdownEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, RegionBreakdownEntry>(
            r#"
            SELECT
                region,
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE delivery_status = 'DELIVERED') AS delivered,
                COUNT(*) FILTER (WHERE installation_status = 'INSTALLED') AS installed,
                COUNT(*) FILTER (WHERE installation_status = 'PENDING') AS pending_installation
            FROM installations
            WHERE record_state = 'ACTIVE'
            GROUP BY region
            ORDER BY total DESC, region ASC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(data)
    }
}

fn summary_from_counts(c: SummaryCounts) -> DashboardSummary {
    let completion_rate = if c.total == 0 {
        0.0
    } else {
        // Uma casa decimal
        ((c.installed as f64 / c.total as f64) * 1000.0).round() / 10.0
    };

    DashboardSummary {
        total: c.total,
        delivered: c.delivered,
        in_transit: c.in_transit,
        pending_delivery: c.pending_delivery,
        installed: c.installed,
        in_progress: c.in_progress,
        pending_installation: c.pending_installation,
        high_priority: c.high_priority,
        overdue: c.overdue,
        created_today: c.created_today,
        installed_this_month: c.installed_this_month,
        completion_rate,
    }
}
