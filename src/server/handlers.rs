//! HTTP handlers for the catalog endpoints

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::core::error::CatalogError;
use crate::core::query::{self, ListingQuery, ProductPage, StatsQuery, StatsReport};
use crate::core::reports::{self, fail_closed};
use crate::core::store::StoreConnector;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn StoreConnector>,
}

impl AppState {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }
}

/// GET / - liveness placeholder
pub async fn hello() -> &'static str {
    "Hello World!"
}

/// GET /api/products - filtered, sorted, paginated product listing
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> Result<Json<ProductPage>, CatalogError> {
    let collection = state.connector.connect().await?;
    let page = query::fetch_page(collection.as_ref(), &params).await?;
    Ok(Json(page))
}

/// GET /api/products/stats - one of the three reports
///
/// Reports fail closed: when the store cannot be reached or the report's
/// pipeline fails, the answer is an empty array.
pub async fn product_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
) -> Response {
    let selection = params.selection();
    let report = selection.name();

    tracing::debug!(?selection, "computing product stats");

    let collection = match state.connector.connect().await {
        Ok(collection) => collection,
        Err(e) => return Json(fail_closed::<Value>(report, Err(e.into()))).into_response(),
    };
    let collection = collection.as_ref();

    match selection {
        StatsReport::BrandDecomposition => {
            Json(fail_closed(report, reports::brand_decomposition(collection).await))
                .into_response()
        }
        StatsReport::TopProducts => {
            Json(fail_closed(report, reports::top_products(collection).await)).into_response()
        }
        StatsReport::CategoryStatistics => {
            Json(fail_closed(report, reports::category_statistics(collection).await))
                .into_response()
        }
    }
}
