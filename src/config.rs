// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{AuditRepository, DashboardRepository, InstallationRepository, ShareRepository},
    services::{
        attachment_service::AttachmentService, auth::AuthService, dashboard_service::DashboardService,
        installation_service::InstallationService, share_service::ShareService,
    },
    storage::{BlobStore, LocalStorage},
};

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
    pub share_link_ttl_hours: i64,
}

fn optional_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let max_upload_mb: usize = optional_var("MAX_UPLOAD_MB", 10)?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: optional_var("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            upload_dir: optional_var("UPLOAD_DIR", PathBuf::from("./uploads"))?,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            db_max_connections: optional_var("DB_MAX_CONNECTIONS", 5)?,
            share_link_ttl_hours: optional_var("SHARE_LINK_TTL_HOURS", 24)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub installation_service: InstallationService,
    pub attachment_service: AttachmentService,
    pub dashboard_service: DashboardService,
    pub share_service: ShareService,
    pub audit_repo: AuditRepository,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .with_context(|| format!("Falha ao criar {}", config.upload_dir.display()))?;
        let storage: Arc<dyn BlobStore> = Arc::new(LocalStorage::new(config.upload_dir.clone()));

        Ok(Self::with_parts(db_pool, storage, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_parts(db_pool: PgPool, storage: Arc<dyn BlobStore>, config: AppConfig) -> Self {
        let installation_repo = InstallationRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());
        let share_repo = ShareRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let auth_service = AuthService::new(config.jwt_secret.clone());
        let attachment_service = AttachmentService::new(
            installation_repo.clone(),
            audit_repo.clone(),
            storage,
            config.max_upload_bytes,
        );
        let installation_service = InstallationService::new(
            installation_repo.clone(),
            audit_repo.clone(),
            attachment_service.clone(),
        );
        let share_service = ShareService::new(
            share_repo,
            installation_repo,
            audit_repo.clone(),
            config.share_link_ttl_hours,
        );
        let dashboard_service = DashboardService::new(dashboard_repo);

        Self {
            db_pool,
            config: Arc::new(config),
            i18n_store: Arc::new(I18nStore::new()),
            auth_service,
            installation_service,
            attachment_service,
            dashboard_service,
            share_service,
            audit_repo,
        }
    }
}
