//! Router builder for the catalog routes

use crate::server::handlers::{AppState, hello, list_products, product_stats};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Build the application router
///
/// - GET / - liveness placeholder
/// - GET /api/products - product listing
/// - GET /api/products/stats - reports
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/products", get(list_products))
        .route("/products/stats", get(product_stats));

    Router::new()
        .route("/", get(hello))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
