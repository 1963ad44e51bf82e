// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Installations ---
        handlers::installations::create_installation,
        handlers::installations::list_installations,
        handlers::installations::export_installations,
        handlers::installations::get_installation,
        handlers::installations::update_installation,
        handlers::installations::update_installation_status,
        handlers::installations::delete_installation,

        // --- Attachments ---
        handlers::attachments::upload_attachments,
        handlers::attachments::upload_attachment,
        handlers::attachments::download_attachment,
        handlers::attachments::bundle_installation,
        handlers::installations::bundle_installations,

        // --- Share ---
        handlers::share::create_share_link,
        handlers::share::read_shared,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_region_breakdown,

        // --- Audit ---
        handlers::audit::list_audit_logs,
    ),
    components(
        schemas(
            // --- Installations ---
            models::installation::DeliveryStatus,
            models::installation::InstallationStatus,
            models::installation::Priority,
            models::installation::RecordState,
            models::installation::AttachmentSlot,
            models::installation::Installation,
            models::installation::InstallationView,
            models::installation::InstallationDetail,
            models::installation::InstallationResponse,
            models::installation::StatusPreset,

            // --- Payloads ---
            models::installation_form::InstallationPayload,
            models::installation_form::StatusUpdatePayload,
            models::attachment::BundleRequest,

            // --- Attachments ---
            models::attachment::AttachFailure,
            models::attachment::AttachReport,

            // --- Share ---
            models::share::ShareLink,
            models::share::ShareLinkResponse,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,
            models::dashboard::RegionBreakdownEntry,

            // --- Audit / Auth ---
            models::audit::AuditSeverity,
            models::audit::AuditLog,
            models::auth::Role,
            models::auth::Actor,
        )
    ),
    tags(
        (name = "Health", description = "Disponibilidade do serviço"),
        (name = "Installations", description = "Registros de entrega e instalação (DC)"),
        (name = "Attachments", description = "Upload, download e pacotes ZIP de anexos"),
        (name = "Share", description = "Links públicos temporários"),
        (name = "Dashboard", description = "Indicadores de entrega e instalação"),
        (name = "Audit", description = "Trilha de auditoria")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
