pub mod archive;
pub mod attachment_service;
pub mod auth;
pub mod dashboard_service;
pub mod export_service;
pub mod image_normalizer;
pub mod installation_service;
pub mod serial_allocator;
pub mod share_service;
