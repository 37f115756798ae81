//! Product documents and report rows

use crate::core::error::CatalogError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// A product document as stored in the `products` collection
///
/// Products are created in bulk by an external seeding process and are
/// read-only here. The document is served exactly as stored; the accessors
/// read the common fields without imposing a shape on the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product(Map<String, Value>);

impl Product {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Store-assigned identifier, as a hex string
    pub fn id(&self) -> Option<&str> {
        self.str_field("_id")
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn category(&self) -> Option<&str> {
        self.str_field("category")
    }

    /// Some seeded products carry no brand
    pub fn brand(&self) -> Option<&str> {
        self.str_field("brand")
    }

    pub fn price(&self) -> Option<f64> {
        self.get("price").and_then(Value::as_f64)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }
}

/// Keep an explicit `null` distinct from an absent field
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Per-category price statistics
///
/// `averagePrice` is null for a category without numeric prices. The
/// extremes keep whatever type the stored prices have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    /// Null groups the products without a category
    #[serde(default)]
    pub category_name: Value,
    pub total_products: u64,
    pub average_price: Option<Number>,
    #[serde(default)]
    pub max_price: Value,
    #[serde(default)]
    pub min_price: Value,
}

/// A highly rated product above the price threshold
///
/// Fields missing from the stored product stay missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
}

/// Stock and stock value totals for one brand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandStats {
    /// Null groups the products without a brand
    #[serde(default)]
    pub brand_name: Value,
    pub total_stock: Number,
    pub total_value: Number,
}

/// Deserialize every document, failing on the first malformed one
pub(crate) fn decode_all<T: DeserializeOwned>(
    what: &'static str,
    docs: Vec<Value>,
) -> Result<Vec<T>, CatalogError> {
    docs.into_iter()
        .map(|doc| {
            serde_json::from_value(doc).map_err(|e| CatalogError::Decode {
                what,
                message: e.to_string(),
            })
        })
        .collect()
}
