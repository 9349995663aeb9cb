use crate::codes;
use crate::context::AppContext;
use crate::error::AppError;
use crate::model::{ContactForm, ShortenRequest, ShortenResponse};
use crate::store::LinkStore;
use crate::utils::{parse_url, with_timeout, DEFAULT_DB_TIMEOUT_MILLIS};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;
use std::sync::Arc;

const SAVE_ATTEMPTS: usize = 5;

pub async fn shorten(
    State(context): State<Arc<AppContext>>,
    Form(request): Form<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    let url = parse_url(&request.original_url)?;
    for _ in 1..=SAVE_ATTEMPTS {
        let code = codes::generate()?;
        let saved = with_timeout(DEFAULT_DB_TIMEOUT_MILLIS, context.links.save(&code, &url)).await?;
        match saved {
            Ok(link) => {
                return Ok(Json(ShortenResponse {
                    short_url: format!(
                        "{}/s/{}",
                        context.config.public_base_url.trim_end_matches('/'),
                        link.short_code
                    ),
                    original_url: link.original_url,
                }));
            }
            Err(AppError::DuplicateCode) => {}
            Err(err) => return Err(err),
        }
    }
    tracing::error!("could not persist new link, exhausted all short code attempts");
    Err(AppError::ShortCodeExhausted)
}

pub async fn redirect(
    State(context): State<Arc<AppContext>>,
    Path(code): Path<String>,
) -> Result<Response, AppError> {
    let link = with_timeout(DEFAULT_DB_TIMEOUT_MILLIS, context.links.lookup(&code))
        .await??
        .ok_or(AppError::NotFound)?;

    let links = context.links.clone();
    let clicked = code.clone();
    context
        .tasks
        .dispatch("click-increment", async move {
            links.increment_clicks(&clicked).await
        });

    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, link.original_url)
        .body(Body::empty())
        .expect("Response build failed"))
}

pub async fn contact(
    State(context): State<Arc<AppContext>>,
    Form(form): Form<ContactForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let name = form.full_name.trim();
    let email = form.email.trim();
    let message = form.message.trim();
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(AppError::Validation(
            "please fill in your name, email and message".into(),
        ));
    }

    context.mailer.send_contact(name, email, message).await?;
    tracing::info!(name = %name, "contact message forwarded");
    Ok(Json(
        json!({ "message": "Thank you for your message! I'll get back to you soon." }),
    ))
}

pub async fn resume(State(context): State<Arc<AppContext>>) -> Result<Response, AppError> {
    let path = &context.config.resume_path;
    let bytes = tokio::fs::read(path).await.map_err(|_| AppError::NotFound)?;
    let filename = std::path::Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("resume.pdf");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .expect("Response build failed"))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
