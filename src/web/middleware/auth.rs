use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::AppState;
use crate::web::models::{AuthenticatedUser, MaybeUser};

/// Bearer token from the `Authorization` header, falling back to the `token`
/// cookie set at login.
pub fn extract_token(req: &Request<AxumBody>, jar: &CookieJar) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .or_else(|| jar.get("token").map(|c| c.value().to_string()))
}

/// Resolves the caller from the token, if any, and stores it as a
/// [`MaybeUser`] extension. Never rejects: endpoints decide what an
/// anonymous caller may do.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Response {
    let user = extract_token(&req, &jar)
        .and_then(|token| auth_service::decode_jwt(&token, &state.config.jwt_secret).ok())
        .map(|claims| AuthenticatedUser {
            id: claims.user_id,
            phone: claims.sub.clone(),
            claims,
        });
    req.extensions_mut().insert(MaybeUser(user));
    next.run(req).await
}
