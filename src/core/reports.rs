//! Analytical reports over the product collection
//!
//! Each report is a fixed pipeline plus a typed row. Reports propagate store
//! errors; [`fail_closed`] turns a failed report into an empty one for
//! callers that must always answer.

use crate::core::error::CatalogError;
use crate::core::pipeline::{
    Accumulator, Condition, Expr, GROUP_KEY, Group, Pipeline, ProjectField, SortOrder,
};
use crate::core::product::{BrandStats, CategoryStats, TopProduct, decode_all};
use crate::core::store::ProductCollection;

/// Products strictly above this price qualify as top products
pub const TOP_PRODUCTS_MIN_PRICE: f64 = 500.0;

/// Number of top products returned
pub const TOP_PRODUCTS_COUNT: u64 = 5;

/// Group by category; count and price average/min/max, highest average first
pub fn category_statistics_pipeline() -> Pipeline {
    Pipeline::new()
        .group(
            Group::by(Expr::field("category"))
                .accumulate("totalProducts", Accumulator::Count)
                .accumulate("avgPrice", Accumulator::Avg(Expr::field("price")))
                .accumulate("maxPrice", Accumulator::Max(Expr::field("price")))
                .accumulate("minPrice", Accumulator::Min(Expr::field("price"))),
        )
        .sort_by("avgPrice", SortOrder::Descending)
        .project([
            ProjectField::rename("categoryName", Expr::field(GROUP_KEY)),
            ProjectField::keep("totalProducts"),
            ProjectField::rename("averagePrice", Expr::field("avgPrice")),
            ProjectField::keep("maxPrice"),
            ProjectField::keep("minPrice"),
        ])
}

/// Best rated products above [`TOP_PRODUCTS_MIN_PRICE`]
pub fn top_products_pipeline() -> Pipeline {
    Pipeline::new()
        .filter(Condition::gt("price", TOP_PRODUCTS_MIN_PRICE))
        .sort_by("rating", SortOrder::Descending)
        .limit(TOP_PRODUCTS_COUNT)
        .project([
            ProjectField::keep("title"),
            ProjectField::keep("price"),
            ProjectField::keep("rating"),
        ])
}

/// Group by brand; total stock and total stock value, highest value first
pub fn brand_decomposition_pipeline() -> Pipeline {
    Pipeline::new()
        .group(
            Group::by(Expr::field("brand"))
                .accumulate("totalStock", Accumulator::Sum(Expr::field("stock")))
                .accumulate(
                    "totalValue",
                    Accumulator::Sum(Expr::multiply([
                        Expr::field("price"),
                        Expr::field("stock"),
                    ])),
                ),
        )
        .project([
            ProjectField::rename("brandName", Expr::field(GROUP_KEY)),
            ProjectField::keep("totalStock"),
            ProjectField::keep("totalValue"),
        ])
        .sort_by("totalValue", SortOrder::Descending)
}

pub async fn category_statistics(
    collection: &dyn ProductCollection,
) -> Result<Vec<CategoryStats>, CatalogError> {
    let docs = collection.aggregate(&category_statistics_pipeline()).await?;
    decode_all("category statistics", docs)
}

pub async fn top_products(
    collection: &dyn ProductCollection,
) -> Result<Vec<TopProduct>, CatalogError> {
    let docs = collection.aggregate(&top_products_pipeline()).await?;
    decode_all("top products", docs)
}

pub async fn brand_decomposition(
    collection: &dyn ProductCollection,
) -> Result<Vec<BrandStats>, CatalogError> {
    let docs = collection.aggregate(&brand_decomposition_pipeline()).await?;
    decode_all("brand decomposition", docs)
}

/// Log a failed report and substitute an empty one
pub fn fail_closed<T>(report: &str, result: Result<Vec<T>, CatalogError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::error!(report, error = %e, "report failed, returning no rows");
        Vec::new()
    })
}
