//! Core module containing the catalog's types, traits and pipelines

pub mod error;
pub mod pipeline;
pub mod product;
pub mod query;
pub mod reports;
pub mod store;

pub use error::{CatalogError, ConfigError, ErrorResponse, StorageError};
pub use pipeline::{Pipeline, SortKey, SortOrder, Stage};
pub use product::{BrandStats, CategoryStats, Product, TopProduct};
pub use query::{ListingQuery, ProductPage, StatsQuery, StatsReport};
pub use store::{ProductCollection, StoreConnector};
