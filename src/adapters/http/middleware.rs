use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::jwt,
    domain::entities::user::UserRole,
};

/// Caller identity taken from a verified `Authorization: Bearer` token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        app_state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::InvalidCredentials)?;

        let claims = jwt::verify(token, &app_state.config.jwt_secret)?;
        let user = AuthUser {
            user_id: claims.user_id()?,
            role: claims.role,
        };
        parts.extensions.insert(user);
        Ok(user)
    }
}

/// Rejects with 403 unless the caller holds a currently valid subscription.
pub async fn require_active_subscription(
    State(app_state): State<AppState>,
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let has_access = app_state
        .subscription_use_cases
        .check_user_access(user.user_id)
        .await?;

    if !has_access {
        tracing::debug!(user_id = %user.user_id, "Active subscription required");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
