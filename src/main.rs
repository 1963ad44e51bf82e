//src/main.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;
mod storage;

#[cfg(test)]
mod test_support;

use crate::{
    config::{AppConfig, AppState},
    models::installation::AttachmentSlot,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    // Upload em lote: um arquivo por slot, mais a folga do multipart
    let body_limit = config.max_upload_bytes * AttachmentSlot::ALL.len() + 1024 * 1024;

    let app_state = AppState::new(config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let installation_routes = Router::new()
        .route(
            "/",
            post(handlers::installations::create_installation)
                .get(handlers::installations::list_installations),
        )
        .route("/export.csv", get(handlers::installations::export_installations))
        .route("/bundle", post(handlers::installations::bundle_installations))
        .route(
            "/{id}",
            get(handlers::installations::get_installation)
                .put(handlers::installations::update_installation)
                .delete(handlers::installations::delete_installation),
        )
        .route("/{id}/status", patch(handlers::installations::update_installation_status))
        .route("/{id}/attachments", post(handlers::attachments::upload_attachments))
        .route(
            "/{id}/attachments/{slot}",
            post(handlers::attachments::upload_attachment)
                .get(handlers::attachments::download_attachment),
        )
        .route("/{id}/bundle", get(handlers::attachments::bundle_installation))
        .route("/{id}/share", post(handlers::share::create_share_link))
        .layer(DefaultBodyLimit::max(body_limit));

    let dashboard_routes = Router::new()
        .route("/summary", get(handlers::dashboard::get_summary))
        .route("/regions", get(handlers::dashboard::get_region_breakdown));

    let api = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/openapi.json", get(handlers::health::openapi_json))
        .route("/share/{token}", get(handlers::share::read_shared))
        .route("/audit-logs", get(handlers::audit::list_audit_logs))
        .nest("/installations", installation_routes)
        .nest("/dashboard", dashboard_routes);

    let app = Router::new().nest("/api", api).with_state(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    // ConnectInfo alimenta o IP gravado na auditoria
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}
