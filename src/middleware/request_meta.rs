// src/middleware/request_meta.rs

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts};
use std::net::SocketAddr;

use crate::models::{audit::AuditContext, auth::Actor};

const FORWARDED_FOR: &str = "x-forwarded-for";

// IP e user agent de quem chamou, para o log de auditoria
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    pub fn from_parts(parts: &Parts) -> Self {
        // Atrás de proxy, o primeiro endereço do X-Forwarded-For é o cliente
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self { ip_address, user_agent }
    }

    pub fn audit(self, actor: Actor) -> AuditContext {
        AuditContext { actor, ip_address: self.ip_address, user_agent: self.user_agent }
    }
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn prefers_the_first_forwarded_address() {
        let (mut parts, _) = Request::builder()
            .header(FORWARDED_FOR, "203.0.113.9, 10.0.0.1")
            .header(header::USER_AGENT, "curl/8.0")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 4000))));

        let meta = ClientMeta::from_parts(&parts);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn falls_back_to_the_socket_address() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 4000))));

        let meta = ClientMeta::from_parts(&parts);
        assert_eq!(meta.ip_address.as_deref(), Some("192.168.1.5"));
        assert!(meta.user_agent.is_none());
    }
}
