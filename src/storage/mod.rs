//! Storage implementations for different backends

pub mod in_memory;
pub mod mongodb;

pub use in_memory::InMemoryProductStore;
pub use mongodb::{MongoConnector, MongoProductCollection, PRODUCTS_COLLECTION};
