// src/db/share_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::share::ShareLink};

#[derive(Clone)]
pub struct ShareRepository {
    pool: PgPool,
}

impl ShareRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        token: &str,
        installation_id: Uuid,
        created_by: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ShareLink, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let link = sqlx::query_as::<_, ShareLink>(
            r#"
            INSERT INTO share_links (token, installation_id, created_by, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(installation_id)
        .bind(created_by)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;

        Ok(link)
    }

    pub async fn find<'e, E>(&self, executor: E, token: &str) -> Result<Option<ShareLink>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let link = sqlx::query_as::<_, ShareLink>("SELECT * FROM share_links WHERE token = $1")
            .bind(token)
            .fetch_optional(executor)
            .await?;

        Ok(link)
    }
}
