use crate::context::AppContext;
use crate::error::AppError;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::IntoResponse;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const ADMIN_COOKIE: &str = "admin_token";

/// Gate for the /admin subtree. Compares the session cookie against the
/// per-process token in constant time.
pub async fn admin_auth(
    State(context): State<Arc<AppContext>>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let token =
        cookie_value(request.headers(), ADMIN_COOKIE).ok_or(AppError::Unauthorized)?;
    if !bool::from(token.as_bytes().ct_eq(context.admin_token.as_bytes())) {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').map(str::trim).find_map(|pair| {
        pair.strip_prefix(name)?
            .strip_prefix('=')
            .map(str::to_string)
    })
}
