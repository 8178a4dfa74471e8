use crate::auth::jwt::TokenValidator;
use crate::auth::models::Principal;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tubely_core::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    match header.strip_prefix(BEARER_PREFIX).map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        )),
    }
}

/// Validate the bearer token and attach the caller's [`Principal`] to the request.
pub async fn auth_middleware(
    State(validator): State<Arc<dyn TokenValidator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match bearer_token(request.headers()).and_then(|t| validator.validate(t)) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(
                path = %request.uri().path(),
                error = %e,
                "Authentication failed"
            );
            return HttpAppError(e).into_response();
        }
    };

    tracing::debug!(user_id = %user_id, "Authenticated request");
    request.extensions_mut().insert(Principal { user_id });
    next.run(request).await
}
