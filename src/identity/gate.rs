//! Auth gate middleware.
//!
//! Wraps protected routes: extracts a token from the request, validates it,
//! resolves the claimed identity against the store, and either forwards the
//! request unchanged or short-circuits with a uniform rejection. Every failure
//! path — missing token, bad signature, expired token, unknown subject —
//! produces the identical 401 response; the distinct cause goes to the log
//! only.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::error::AppError;
use crate::identity::validate_token;
use crate::server::AppState;

/// Pull the token out of a request: the `Authorization` header verbatim if
/// present, else the `token` query parameter, else empty (which will fail
/// validation downstream).
pub fn extract_token(request: &Request) -> String {
    if let Some(v) = request.headers().get("authorization").and_then(|v| v.to_str().ok()) {
        if !v.is_empty() {
            return v.to_string();
        }
    }
    if let Some(query) = request.uri().query() {
        for part in query.split('&') {
            if let Some((k, v)) = part.split_once('=') {
                if k == "token" && !v.is_empty() {
                    return v.to_string();
                }
            }
        }
    }
    String::new()
}

/// Gate an inner handler behind token validation and identity resolution.
/// Apply with `middleware::from_fn_with_state`.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request);

    let claims = match validate_token(&token, state.config.secret_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(target: "taskboard::auth", "rejecting request: {e:#}");
            return Err(AppError::permission_denied());
        }
    };

    if let Err(e) = state.store.get_user_by_id(&claims.user_id) {
        warn!(target: "taskboard::auth", "rejecting request: failed to resolve user {}: {e}", claims.user_id);
        return Err(AppError::permission_denied());
    }

    // The resolved identity is intentionally not threaded into the request;
    // handlers that need the caller re-derive it themselves.
    Ok(next.run(request).await)
}
