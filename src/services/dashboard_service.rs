// src/services/dashboard_service.rs

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{DashboardSummary, RegionBreakdownEntry},
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_summary(&self) -> Result<DashboardSummary, AppError> {
        // "Hoje" em UTC, igual à listagem de vencidos
        self.repo.get_summary(self.repo.pool(), Utc::now().date_naive()).await
    }

    pub async fn get_region_breakdown(&self) -> Result<Vec<RegionBreakdownEntry>, AppError> {
        self.repo.get_region_breakdown(self.repo.pool()).await
    }
}
