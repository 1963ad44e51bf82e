// src/models/dashboard.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// 1. Resumo Geral (Os Cards do Topo)
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total: i64,
    pub delivered: i64,
    pub in_transit: i64,
    pub pending_delivery: i64,
    pub installed: i64,
    pub in_progress: i64,
    pub pending_installation: i64,
    pub high_priority: i64,
    pub overdue: i64,       // Entregues há 7+ dias e ainda sem instalação
    pub created_today: i64,
    pub installed_this_month: i64,
    pub completion_rate: f64, // % de registros instalados
}

// 2. Quebra por Região
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegionBreakdownEntry {
    pub region: String,
    pub total: i64,
    pub delivered: i64,
    pub installed: i64,
    pub pending_installation: i64,
}
