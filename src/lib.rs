//! # Catalog API
//!
//! A read-only HTTP API over a product catalog stored in MongoDB.
//!
//! ## Features
//!
//! - **Product listing**: category filter, case-insensitive search on title or
//!   description, sorting (`sort=price`, `sort=-price`) and pagination
//! - **Reports**: per-category price statistics, top rated products above a
//!   price threshold, per-brand stock value
//! - **Typed pipelines**: queries are built from store-agnostic stage
//!   descriptors and translated to MongoDB aggregation stages at the boundary
//! - **In-memory backend**: the same pipelines evaluated over JSON documents,
//!   for tests and local development
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use catalog_api::prelude::*;
//! use std::sync::Arc;
//!
//! let config = AppConfig::from_env()?;
//! let connector = Arc::new(MongoConnector::from_config(&config.mongo));
//! catalog_api::server::serve(&config.server, connector).await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::store::{ProductCollection, StoreConnector};

    // === Pipelines ===
    pub use crate::core::pipeline::{
        Accumulator, Condition, Expr, Group, Pipeline, ProjectField, SortKey, SortOrder, Stage,
    };
    pub use crate::core::query::{ListingQuery, ProductPage, StatsQuery, StatsReport};
    pub use crate::core::reports;

    // === Documents ===
    pub use crate::core::product::{BrandStats, CategoryStats, Product, TopProduct};

    // === Errors ===
    pub use crate::core::error::{CatalogError, ConfigError, ErrorResponse, StorageError};

    // === Storage ===
    pub use crate::storage::{InMemoryProductStore, MongoConnector, MongoProductCollection};

    // === Config ===
    pub use crate::config::{AppConfig, MongoConfig, ServerConfig};

    // === Server ===
    pub use crate::server::{AppState, build_router};
}
