use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::auth::jwt::{JwtKeys, TokenError};
use crate::auth::repo_types::Identity;
use crate::auth::roles::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// Subject id of the synthetic break-glass administrator. Never present in
/// the store, so the guard must not try to re-fetch it.
pub const SUPERUSER_ID: i64 = 0;

/// The guard-refreshed identity attached to every protected request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<&Identity> for CurrentUser {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            full_name: identity.full_name.clone(),
            role: identity.role,
        }
    }
}

/// Role gate. Composes with the guard: assumes extraction already ran.
pub fn require_role(user: &CurrentUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(allowed))
    }
}

/// Authorization guard. Verifies the bearer token, then re-reads the account
/// row so role changes and deletions take effect on the next request; the
/// embedded role claim is never treated as authoritative.
#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthenticated)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| match e {
            TokenError::Expired => ApiError::SessionExpired,
            TokenError::Invalid => ApiError::InvalidToken,
        })?;

        if claims.sub == SUPERUSER_ID && claims.role == Role::Administrator {
            let email = state
                .config
                .superuser
                .as_ref()
                .map(|s| s.email.clone())
                .unwrap_or_default();
            return Ok(CurrentUser {
                id: SUPERUSER_ID,
                email,
                full_name: "Superuser".into(),
                role: Role::Administrator,
            });
        }

        let identity = Identity::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(ApiError::AccountNotFound)?;

        Ok(CurrentUser::from(&identity))
    }
}

/// Administrator-gated extractor.
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&user, &[Role::Administrator])?;
        Ok(AdminUser(user))
    }
}
