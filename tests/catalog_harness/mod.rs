//! Shared test harness for catalog backends
//!
//! Provides a fixed product dataset, failing store doubles and the
//! `catalog_api_tests!` macro that runs the HTTP suite against any backend.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod catalog_harness;
//! use catalog_harness::*;
//!
//! async fn seeded(docs: Vec<serde_json::Value>) -> Arc<dyn StoreConnector> { ... }
//! catalog_api_tests!(seeded);
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod api_tests;

use async_trait::async_trait;
use axum_test::TestServer;
use catalog_api::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

fn product(
    title: &str,
    description: &str,
    category: &str,
    brand: Option<&str>,
    price: f64,
    stock: u64,
    rating: f64,
) -> Value {
    let mut doc = json!({
        "title": title,
        "description": description,
        "category": category,
        "price": price,
        "stock": stock,
        "rating": rating,
        "tags": [category],
    });
    if let Some(brand) = brand {
        doc["brand"] = json!(brand);
    }
    doc
}

/// Twelve products over four categories, three without a brand
///
/// Six products cost more than 500; by rating they are Zenbook, iPhone 9,
/// MacBook Pro, iPhone X, Galaxy Book, Universe 9. Three products mention
/// "phone" (two in the title, one only in the description).
pub fn sample_products() -> Vec<Value> {
    vec![
        product(
            "iPhone 9",
            "An apple mobile which is nothing like apple",
            "smartphones",
            Some("Apple"),
            549.0,
            94,
            4.69,
        ),
        product(
            "iPhone X",
            "SIM-Free, Model A19211 6.5-inch Super Retina HD display",
            "smartphones",
            Some("Apple"),
            899.0,
            34,
            4.44,
        ),
        product(
            "Samsung Universe 9",
            "Samsung's new variant which goes beyond Galaxy to the Universe",
            "smartphones",
            Some("Samsung"),
            1249.0,
            36,
            4.09,
        ),
        product(
            "MacBook Pro",
            "MacBook Pro 2021 with mini-LED display",
            "laptops",
            Some("Apple"),
            1749.0,
            83,
            4.57,
        ),
        product(
            "Samsung Galaxy Book",
            "Samsung Galaxy Book S (2020) Laptop With Intel Lakefield Chip",
            "laptops",
            Some("Samsung"),
            1499.0,
            50,
            4.25,
        ),
        product(
            "Asus Zenbook",
            "Thin ultrabook that pairs with your Phone",
            "laptops",
            Some("Asus"),
            1099.0,
            20,
            4.8,
        ),
        product(
            "Essence Mascara",
            "Lash Princess False Lash Effect Mascara",
            "beauty",
            Some("Essence"),
            9.99,
            5,
            4.94,
        ),
        product(
            "Eyeshadow Palette",
            "Versatile eyeshadow palette with mirror",
            "beauty",
            Some("Glamour Beauty"),
            19.99,
            44,
            3.28,
        ),
        product(
            "Red Lipstick",
            "Classic red lipstick for a bold look",
            "beauty",
            Some("Chic Cosmetics"),
            12.99,
            68,
            4.36,
        ),
        product(
            "Apple",
            "Fresh and crisp apples",
            "groceries",
            None,
            1.99,
            9,
            4.19,
        ),
        product(
            "Rice",
            "High-quality rice, 5kg bag",
            "groceries",
            None,
            5.99,
            59,
            3.18,
        ),
        product(
            "Honey Jar",
            "Pure natural honey",
            "groceries",
            None,
            6.99,
            25,
            4.6,
        ),
    ]
}

/// Three products: two in category A (10, 30), one in B (20)
pub fn tie_scenario_products() -> Vec<Value> {
    vec![
        product("a1", "", "A", Some("x"), 10.0, 1, 1.0),
        product("a2", "", "A", Some("x"), 30.0, 1, 1.0),
        product("b1", "", "B", Some("y"), 20.0, 1, 1.0),
    ]
}

// ---------------------------------------------------------------------------
// Expectations computed from a dataset
// ---------------------------------------------------------------------------

pub fn field_f64(doc: &Value, field: &str) -> f64 {
    doc[field].as_f64().unwrap_or(0.0)
}

/// Products of `docs` in `category`
pub fn in_category<'a>(docs: &'a [Value], category: &str) -> Vec<&'a Value> {
    docs.iter().filter(|d| d["category"] == category).collect()
}

/// Sum of `price * stock` over the products of `brand` (`None`: no brand)
pub fn brand_value(docs: &[Value], brand: Option<&str>) -> f64 {
    docs.iter()
        .filter(|d| d.get("brand").and_then(Value::as_str) == brand)
        .map(|d| field_f64(d, "price") * field_f64(d, "stock"))
        .sum()
}

/// Drop the store-assigned `_id` so documents compare with what was seeded
pub fn without_id(mut doc: Value) -> Value {
    if let Some(fields) = doc.as_object_mut() {
        fields.remove("_id");
    }
    doc
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

pub fn is_non_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] >= w[1])
}

pub fn is_non_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

// ---------------------------------------------------------------------------
// Servers and failing doubles
// ---------------------------------------------------------------------------

pub fn test_server(connector: Arc<dyn StoreConnector>) -> TestServer {
    TestServer::new(build_router(AppState::new(connector)))
}

/// A connector whose store is never reachable
pub struct UnreachableConnector;

#[async_trait]
impl StoreConnector for UnreachableConnector {
    async fn connect(&self) -> Result<Arc<dyn ProductCollection>, StorageError> {
        Err(StorageError::Connection {
            backend: "test".to_string(),
            message: "connection refused".to_string(),
        })
    }

    async fn close(&self) {}
}

/// A connector handing out a collection on which every query fails
pub struct BrokenCollectionConnector;

struct BrokenCollection;

#[async_trait]
impl ProductCollection for BrokenCollection {
    async fn aggregate(&self, _pipeline: &Pipeline) -> Result<Vec<Value>, StorageError> {
        Err(StorageError::Query {
            collection: "products".to_string(),
            message: "aggregation failed".to_string(),
        })
    }
}

#[async_trait]
impl StoreConnector for BrokenCollectionConnector {
    async fn connect(&self) -> Result<Arc<dyn ProductCollection>, StorageError> {
        Ok(Arc::new(BrokenCollection))
    }

    async fn close(&self) {}
}
