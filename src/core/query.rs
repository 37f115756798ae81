//! Query parameters, listing pipeline construction and pagination

use crate::core::error::CatalogError;
use crate::core::pipeline::{Condition, Pipeline, SortKey};
use crate::core::product::{Product, decode_all};
use crate::core::store::ProductCollection;
use serde::{Deserialize, Serialize};

/// Page used when `page` is absent or not a positive integer
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when `limit` is absent or not a positive integer
pub const DEFAULT_LIMIT: u64 = 10;

/// Parse the leading integer of a query string value
///
/// Leading whitespace and an optional sign are accepted, then as many
/// digits as follow; anything after them is ignored (`"12abc"` is 12).
/// Returns `None` when there is no digit to read or the value overflows.
pub fn lenient_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Positive integer parameter with a fallback
///
/// Zero, negative and unparsable values use `default`.
fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(lenient_int)
        .filter(|n| *n > 0)
        .map_or(default, |n| n as u64)
}

/// Treat empty strings as absent
fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.is_empty())
}

/// Parse a `sort` parameter into a sort key
///
/// A leading `-` selects descending order on the remaining field name;
/// anything else sorts ascending on the value as given. `"-"` alone names no
/// field and yields `None`.
pub fn parse_sort(raw: &str) -> Option<SortKey> {
    match raw.strip_prefix('-') {
        Some("") => None,
        Some(bare) => Some(SortKey::descending(bare)),
        None if raw.is_empty() => None,
        None => Some(SortKey::ascending(raw)),
    }
}

/// Query parameters of the product listing endpoint
///
/// Values are kept as raw strings so that malformed numbers fall back to
/// their defaults instead of rejecting the request.
///
/// # Example
/// ```text
/// GET /api/products?page=2&limit=5
/// GET /api/products?category=laptops&sort=-price
/// GET /api/products?search=phone&sort=rating
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Exact category match
    pub category: Option<String>,
    /// Case-insensitive substring of the title or the description
    pub search: Option<String>,
    /// Field name, prefixed with `-` for descending order
    pub sort: Option<String>,
}

impl ListingQuery {
    /// Page number, starting at 1
    pub fn page(&self) -> u64 {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    /// Page size
    pub fn limit(&self) -> u64 {
        positive_or(self.limit.as_deref(), DEFAULT_LIMIT)
    }

    /// Combined filter condition, if any filter parameter is present
    pub fn condition(&self) -> Option<Condition> {
        let mut conditions = Vec::new();

        if let Some(category) = non_empty(&self.category) {
            conditions.push(Condition::eq("category", category));
        }

        if let Some(search) = non_empty(&self.search) {
            conditions.push(Condition::Any(vec![
                Condition::contains_ignore_case("title", search),
                Condition::contains_ignore_case("description", search),
            ]));
        }

        match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Condition::All(conditions)),
        }
    }

    /// Filter and sort stages, without pagination
    pub fn pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new();

        if let Some(condition) = self.condition() {
            pipeline = pipeline.filter(condition);
        }

        if let Some(key) = non_empty(&self.sort).and_then(parse_sort) {
            pipeline = pipeline.sort(key);
        }

        pipeline
    }
}

/// One page of the product listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    /// Number of products matching the filters, across all pages
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub products: Vec<Product>,
}

/// Answer a listing query
///
/// The total is counted on the filtered pipeline before the skip and limit
/// stages are appended.
pub async fn fetch_page(
    collection: &dyn ProductCollection,
    query: &ListingQuery,
) -> Result<ProductPage, CatalogError> {
    let page = query.page();
    let limit = query.limit();
    let filtered = query.pipeline();

    tracing::debug!(?filtered, page, limit, "listing products");

    let total = collection.count(&filtered).await?;
    let docs = collection.aggregate(&filtered.paginated(page, limit)).await?;
    let products = decode_all("products", docs)?;

    Ok(ProductPage {
        total,
        page,
        limit,
        products,
    })
}

/// Which report the stats endpoint returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsReport {
    CategoryStatistics,
    TopProducts,
    BrandDecomposition,
}

impl StatsReport {
    /// Name used in logs
    pub fn name(self) -> &'static str {
        match self {
            StatsReport::CategoryStatistics => "category statistics",
            StatsReport::TopProducts => "top products",
            StatsReport::BrandDecomposition => "brand decomposition",
        }
    }
}

/// Query flags of the stats endpoint
///
/// Flags are numeric; any non-zero integer switches them on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsQuery {
    #[serde(rename = "meilleursP")]
    pub top_products: Option<String>,

    #[serde(rename = "brandStats")]
    pub brand_stats: Option<String>,
}

fn flag(raw: Option<&str>) -> bool {
    raw.and_then(lenient_int).is_some_and(|n| n != 0)
}

impl StatsQuery {
    /// Select the report; `brandStats` takes priority over `meilleursP`
    pub fn selection(&self) -> StatsReport {
        if flag(self.brand_stats.as_deref()) {
            StatsReport::BrandDecomposition
        } else if flag(self.top_products.as_deref()) {
            StatsReport::TopProducts
        } else {
            StatsReport::CategoryStatistics
        }
    }
}
