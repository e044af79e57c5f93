//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::error::ApiError;
use enrollo_core::enrollment::{Actor, Role};
use enrollo_shared::{AppError, Claims};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::from(AppError::Unauthorized(
            "Authorization header with Bearer token is required".to_string(),
        ))
        .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => ApiError::from(AppError::from(e)).into_response(),
    }
}

/// The authenticated caller, resolved from token claims.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let actor = auth.actor();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    claims: Claims,
    role: Role,
}

impl AuthUser {
    /// Resolves claims into an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the token carries an unknown role.
    pub fn from_claims(claims: Claims) -> Result<Self, AppError> {
        let role = Role::parse(&claims.role)
            .ok_or_else(|| AppError::Forbidden(format!("unknown role: {}", claims.role)))?;
        Ok(Self { claims, role })
    }

    /// The caller as seen by the enrollment state machine.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(self.claims.user_id(), self.role)
    }

    /// Returns the user's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
        Ok(Self::from_claims(claims)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_auth_user_resolves_role() {
        let user_id = Uuid::now_v7();
        let claims = Claims::new(user_id, "Cashier", Utc::now() + Duration::minutes(5));
        let auth = AuthUser::from_claims(claims).unwrap();
        assert_eq!(auth.role(), Role::Cashier);
        assert_eq!(auth.actor().user_id.into_inner(), user_id);
    }

    #[test]
    fn test_auth_user_rejects_unknown_role() {
        let claims = Claims::new(Uuid::now_v7(), "janitor", Utc::now() + Duration::minutes(5));
        assert!(matches!(
            AuthUser::from_claims(claims),
            Err(AppError::Forbidden(_))
        ));
    }
}
