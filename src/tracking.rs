use crate::context::AppContext;
use crate::utils::get_header;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

/// Paths that are never recorded: assets, the admin subtree, favicons.
const EXCLUDED_PREFIXES: &[&str] = &["/static/", "/images/", "/admin/", "/favicon"];

/// Records one anonymized visit per tracked request. The write happens on
/// the task queue; the response never waits for it.
pub async fn track_visitor(
    State(context): State<Arc<AppContext>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_tracked(&path) && !do_not_track(request.headers()) {
        let hashed = context.hasher.hash(&client_address(&request));
        let user_agent = get_header("User-Agent", request.headers()).unwrap_or_default();
        let ledger = context.ledger.clone();
        context.tasks.dispatch("visitor-log", async move {
            ledger.insert(&hashed, &user_agent, &path).await
        });
    }
    next.run(request).await
}

fn is_tracked(path: &str) -> bool {
    !EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

fn do_not_track(headers: &HeaderMap) -> bool {
    get_header("DNT", headers).as_deref() == Some("1")
}

/// Client address for hashing: first X-Forwarded-For hop, then X-Real-Ip,
/// then the socket peer. The resolved address only ever feeds the hasher.
fn client_address(request: &Request) -> String {
    if let Some(forwarded) = get_header("X-Forwarded-For", request.headers()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = get_header("X-Real-Ip", request.headers()) {
        if !real_ip.is_empty() {
            return real_ip;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
