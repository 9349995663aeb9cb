use crate::error::AppError;
use axum::http::HeaderMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

pub const DEFAULT_DB_TIMEOUT_MILLIS: u64 = 300;

const INVALID_URL_MESSAGE: &str = "please enter a valid URL starting with http:// or https://";

pub async fn with_timeout<F: Future>(
    duration_in_millis: u64,
    task: F,
) -> Result<F::Output, AppError> {
    Ok(timeout(Duration::from_millis(duration_in_millis), task).await?)
}

pub fn get_header(name: &str, headers: &HeaderMap) -> Option<String> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default().to_string())
}

/// Validates a submitted URL. Only absolute http/https URLs pass.
pub fn parse_url(text: &str) -> Result<String, AppError> {
    let url =
        Url::parse(text.trim()).map_err(|_| AppError::Validation(INVALID_URL_MESSAGE.into()))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        _ => Err(AppError::Validation(INVALID_URL_MESSAGE.into())),
    }
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
