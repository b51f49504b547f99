//! HTTP server
//!
//! One handler serves everything: `/` is the listing, any other path is a
//! post. Pages are always HTML, failures included.

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::generator::{Generator, RenderedPage};
use crate::helpers::request_path;
use crate::Blog;

const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// Build the application router
pub fn router(generator: Arc<Generator>) -> Router {
    Router::new()
        .fallback(page_handler)
        .with_state(generator)
        .layer(TraceLayer::new_for_http())
}

/// Start the server and run until Ctrl+C
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let generator = Arc::new(blog.generator()?);
    tracing::info!(
        "Serving posts from {:?} (prefix {:?})",
        blog.storage_dir,
        generator.config().content.prefix
    );
    let app = router(generator);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Serve the listing or a post for any GET path
async fn page_handler(
    State(generator): State<Arc<Generator>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        let mut response = html_response(generator.error_page(
            StatusCode::METHOD_NOT_ALLOWED,
            "Only GET requests are supported.",
        ));
        response
            .headers_mut()
            .insert(header::ALLOW, header::HeaderValue::from_static("GET, HEAD"));
        return response;
    }

    let path = request_path(uri.path());
    tracing::debug!("Rendering {:?}", path);
    html_response(generator.render_path(&path).await)
}

fn html_response(page: RenderedPage) -> Response {
    (
        page.status,
        [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)],
        page.html,
    )
        .into_response()
}
