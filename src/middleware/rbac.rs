// src/middleware/rbac.rs

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{Actor, Role},
};

/// 1. O Trait que define quais papéis passam
pub trait RoleRule: Send + Sync + 'static {
    fn allows(role: Role) -> bool;
}

/// 2. O Extractor (Guardião): autentica e verifica o papel
pub struct RequireRole<T>(pub Actor, PhantomData<T>);

impl<T> RequireRole<T> {
    pub fn actor(&self) -> &Actor {
        &self.0
    }
}

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRule,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(actor) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !T::allows(actor.role) {
            let app_state = AppState::from_ref(state);
            tracing::warn!("Acesso negado para {} ({})", actor.name, actor.role.as_str());
            return Err(AppError::Forbidden.to_api_error(&Locale::from_parts(parts), &app_state.i18n_store));
        }

        Ok(RequireRole(actor, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS REGRAS (TIPOS)
// ---

pub struct AdminOnly;
impl RoleRule for AdminOnly {
    fn allows(role: Role) -> bool {
        role == Role::Admin
    }
}

pub struct AdminOrClient;
impl RoleRule for AdminOrClient {
    fn allows(role: Role) -> bool {
        matches!(role, Role::Admin | Role::Client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_match_the_role_table() {
        assert!(AdminOnly::allows(Role::Admin));
        assert!(!AdminOnly::allows(Role::Client));
        assert!(AdminOrClient::allows(Role::Client));
        assert!(!AdminOrClient::allows(Role::User));
    }
}
