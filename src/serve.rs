//! Development server for a site directory.
//!
//! Serves component resources as static files so an [`HttpFetcher`] (or a
//! browser) can load them, plus a couple of JSON endpoints.
//!
//! [`HttpFetcher`]: crate::fetch::HttpFetcher

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::models::RouteTable;

#[derive(Debug, Serialize)]
struct RouteEntry {
    route: String,
    path: String,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_routes(State(routes): State<Arc<RouteTable>>) -> impl IntoResponse {
    let entries: Vec<RouteEntry> = routes
        .iter()
        .map(|(route, path)| RouteEntry {
            route: route.to_string(),
            path: path.to_string(),
        })
        .collect();
    Json(serde_json::json!({
        "routes": entries,
        "not_found": routes.not_found().as_str(),
    }))
}

/// Router serving `site_dir` with the site's route table under `/_site`.
pub fn create_router(site_dir: impl Into<PathBuf>, routes: RouteTable) -> Router {
    let site_dir = site_dir.into();
    tracing::debug!("Serving site files from {}", site_dir.display());

    let api = Router::new()
        .route("/health", get(health))
        .route("/routes", get(list_routes));

    Router::new()
        .nest("/_site", api)
        .fallback_service(ServeDir::new(site_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(routes))
}
