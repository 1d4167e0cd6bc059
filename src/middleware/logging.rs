//! Access logging.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Record remote address, protocol, method and URL of every request.
pub async fn log_request(req: Request, next: Next) -> Response {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_owned(), |ConnectInfo(addr)| addr.to_string());
    tracing::info!(
        %remote_addr,
        proto = ?req.version(),
        method = %req.method(),
        uri = %req.uri(),
        "request"
    );
    next.run(req).await
}
