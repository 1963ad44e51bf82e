// src/handlers/health.rs

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::docs::ApiDoc;

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Serviço no ar", body = String))
)]
pub async fn health() -> &'static str {
    "OK"
}

// GET /api/openapi.json
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/health",
            "/api/installations",
            "/api/installations/export.csv",
            "/api/installations/bundle",
            "/api/installations/{id}",
            "/api/installations/{id}/status",
            "/api/installations/{id}/attachments",
            "/api/installations/{id}/attachments/{slot}",
            "/api/installations/{id}/bundle",
            "/api/installations/{id}/share",
            "/api/share/{token}",
            "/api/dashboard/summary",
            "/api/dashboard/regions",
            "/api/audit-logs",
        ] {
            assert!(paths.contains(&expected), "rota ausente no OpenAPI: {expected}");
        }
    }

    #[test]
    fn openapi_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("api_jwt"));
    }
}
