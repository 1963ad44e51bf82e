pub mod installation_repo;
pub use installation_repo::InstallationRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod share_repo;
pub use share_repo::ShareRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
