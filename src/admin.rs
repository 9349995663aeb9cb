use crate::auth::ADMIN_COOKIE;
use crate::context::AppContext;
use crate::error::AppError;
use crate::model::{AdminStats, LinkEntry, LoginForm, VisitorRecord};
use crate::stats::compute_stats;
use crate::store::LinkStore;
use crate::utils::{with_timeout, DEFAULT_DB_TIMEOUT_MILLIS};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;

const SESSION_MAX_AGE_SECONDS: u64 = 3600 * 24;
const VISITOR_LISTING_LIMIT: i64 = 200;

pub async fn login(
    State(context): State<Arc<AppContext>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username_ok = form
        .username
        .as_bytes()
        .ct_eq(context.config.admin_username.as_bytes());
    let password_ok = form
        .password
        .as_bytes()
        .ct_eq(context.config.admin_password.as_bytes());
    if !bool::from(username_ok & password_ok) {
        tracing::warn!("failed admin login attempt");
        return Err(AppError::Unauthorized);
    }

    let cookie = format!(
        "{ADMIN_COOKIE}={}; Path=/admin; Max-Age={SESSION_MAX_AGE_SECONDS}; HttpOnly; SameSite=Lax",
        context.admin_token
    );
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "logged in" })),
    )
        .into_response())
}

pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{ADMIN_COOKIE}=; Path=/admin; Max-Age=0; HttpOnly; SameSite=Lax");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "logged out" })),
    )
}

pub async fn stats(
    State(context): State<Arc<AppContext>>,
) -> Result<Json<AdminStats>, AppError> {
    let stats = with_timeout(
        DEFAULT_DB_TIMEOUT_MILLIS,
        compute_stats(context.links.as_ref(), &context.ledger),
    )
    .await??;
    Ok(Json(stats))
}

pub async fn list_urls(
    State(context): State<Arc<AppContext>>,
) -> Result<Json<Vec<LinkEntry>>, AppError> {
    let links = with_timeout(DEFAULT_DB_TIMEOUT_MILLIS, context.links.list_all()).await??;
    Ok(Json(links))
}

pub async fn list_visitors(
    State(context): State<Arc<AppContext>>,
) -> Result<Json<Vec<VisitorRecord>>, AppError> {
    let visitors = with_timeout(
        DEFAULT_DB_TIMEOUT_MILLIS,
        context.ledger.recent(VISITOR_LISTING_LIMIT),
    )
    .await??;
    Ok(Json(visitors))
}

pub async fn delete_url(
    State(context): State<Arc<AppContext>>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = with_timeout(DEFAULT_DB_TIMEOUT_MILLIS, context.links.delete(&code)).await??;
    if removed == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(code = %code, "short link deleted by admin");
    Ok(Json(json!({ "message": "URL deleted successfully" })))
}
