//! Router assembly

use crate::handlers::{download, generate, status, AppState};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Landing page compiled into the binary
pub const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Build the application router
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(index))
        .route("/api/brat", get(generate::brat_image))
        .route("/api/bratvid", get(generate::brat_video))
        .route("/download/file/:filename", get(download::download_file))
        .route("/health", get(status::health_handler))
        .route("/status", get(status::status_handler))
        .nest_service("/static", static_files)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
