//! HTTP test macro for catalog backends.
//!
//! The `catalog_api_tests!` macro generates tests that drive a backend
//! through full HTTP round-trips:
//! query string → handler → pipeline → store → JSON response.

/// Generate the HTTP test suite for a storage backend.
///
/// `$seed` must name an `async fn(Vec<serde_json::Value>) -> Arc<dyn StoreConnector>`
/// returning a connector whose `products` collection holds exactly the given
/// documents.
///
/// # Generated Tests
///
/// ## Listing
/// - defaults, pagination, page coverage, out-of-range and huge pages
/// - category filter, search on title or description, combined filters
/// - ascending and descending sort, lenient numeric parameters
/// - documents served as stored
///
/// ## Stats
/// - category statistics, top products, brand decomposition
/// - flag priority, zero flags, tie scenario
/// - null prices, fractional stock, missing fields
#[macro_export]
macro_rules! catalog_api_tests {
    ($seed:path) => {
        mod catalog_api_tests {
            use super::*;
            use axum_test::TestServer;
            use catalog_api::prelude::*;
            use serde_json::{Value, json};
            use std::collections::HashSet;

            async fn make_server() -> TestServer {
                let connector = $seed(sample_products()).await;
                test_server(connector)
            }

            async fn list(server: &TestServer, params: &[(&str, &str)]) -> ProductPage {
                let mut request = server.get("/api/products");
                for (key, value) in params {
                    request = request.add_query_param(key, value);
                }
                let response = request.await;
                response.assert_status_ok();
                response.json::<ProductPage>()
            }

            async fn stats(server: &TestServer, params: &[(&str, &str)]) -> Vec<Value> {
                let mut request = server.get("/api/products/stats");
                for (key, value) in params {
                    request = request.add_query_param(key, value);
                }
                let response = request.await;
                response.assert_status_ok();
                response.json::<Vec<Value>>()
            }

            fn prices(page: &ProductPage) -> Vec<f64> {
                page.products.iter().map(|p| p.price().unwrap_or(0.0)).collect()
            }

            // ==============================================================
            // Root
            // ==============================================================

            #[tokio::test]
            async fn test_hello_world() {
                let server = make_server().await;
                let response = server.get("/").await;
                response.assert_status_ok();
                assert_eq!(response.text(), "Hello World!");
            }

            // ==============================================================
            // Listing: pagination
            // ==============================================================

            #[tokio::test]
            async fn test_list_defaults() {
                let server = make_server().await;
                let page = list(&server, &[]).await;

                assert_eq!(page.total, 12);
                assert_eq!(page.page, 1);
                assert_eq!(page.limit, 10);
                assert_eq!(page.products.len(), 10);
            }

            #[tokio::test]
            async fn test_list_pagination() {
                let server = make_server().await;

                let second = list(&server, &[("page", "2"), ("limit", "5")]).await;
                assert_eq!(second.total, 12);
                assert_eq!(second.page, 2);
                assert_eq!(second.limit, 5);
                assert_eq!(second.products.len(), 5);

                let last = list(&server, &[("page", "3"), ("limit", "5")]).await;
                assert_eq!(last.total, 12);
                assert_eq!(last.products.len(), 2);
            }

            #[tokio::test]
            async fn test_list_pages_cover_every_product_once() {
                let server = make_server().await;
                let mut titles = HashSet::new();

                for page in ["1", "2", "3"] {
                    let result =
                        list(&server, &[("page", page), ("limit", "5"), ("sort", "title")]).await;
                    assert!(result.products.len() <= 5);
                    for product in result.products {
                        let title = product.title().map(String::from);
                        assert!(titles.insert(title), "product listed twice");
                    }
                }

                assert_eq!(titles.len(), 12);
            }

            #[tokio::test]
            async fn test_list_page_past_the_end() {
                let server = make_server().await;
                let page = list(&server, &[("page", "99")]).await;

                assert_eq!(page.total, 12);
                assert!(page.products.is_empty());
            }

            #[tokio::test]
            async fn test_list_lenient_numbers() {
                let server = make_server().await;

                let page = list(&server, &[("page", "abc"), ("limit", "0")]).await;
                assert_eq!(page.page, 1);
                assert_eq!(page.limit, 10);

                let page = list(&server, &[("limit", "4items")]).await;
                assert_eq!(page.limit, 4);
                assert_eq!(page.products.len(), 4);
            }

            // ==============================================================
            // Listing: filters
            // ==============================================================

            #[tokio::test]
            async fn test_list_category_filter() {
                let server = make_server().await;
                let page = list(&server, &[("category", "laptops")]).await;

                assert_eq!(page.total, 3);
                assert!(page.products.iter().all(|p| p.category() == Some("laptops")));

                let none = list(&server, &[("category", "Laptops")]).await;
                assert_eq!(none.total, 0, "category match is exact");
            }

            #[tokio::test]
            async fn test_list_search_title_or_description() {
                let server = make_server().await;
                let page = list(&server, &[("search", "PHONE")]).await;

                let titles: HashSet<_> = page.products.iter().filter_map(|p| p.title()).collect();
                assert_eq!(page.total, 3);
                assert_eq!(
                    titles,
                    HashSet::from(["iPhone 9", "iPhone X", "Asus Zenbook"])
                );
            }

            #[tokio::test]
            async fn test_list_search_and_category_combined() {
                let server = make_server().await;
                let page = list(&server, &[("search", "samsung"), ("category", "laptops")]).await;

                assert_eq!(page.total, 1);
                assert_eq!(page.products[0].title(), Some("Samsung Galaxy Book"));
            }

            #[tokio::test]
            async fn test_list_total_ignores_pagination() {
                let server = make_server().await;
                let page = list(&server, &[("category", "beauty"), ("limit", "1")]).await;

                assert_eq!(page.total, 3);
                assert_eq!(page.products.len(), 1);
            }

            #[tokio::test]
            async fn test_list_huge_page_is_empty() {
                let server = make_server().await;
                let params = [("page", "9223372036854775807"), ("limit", "100")];
                let page = list(&server, &params).await;

                assert_eq!(page.total, 12);
                assert!(page.products.is_empty());
            }

            #[tokio::test]
            async fn test_list_serves_documents_as_stored() {
                let docs = vec![
                    json!({ "title": "bare" }),
                    json!({ "title": "fractional", "category": "misc", "price": 12, "stock": 2.5 }),
                    json!({ "title": "nameless", "category": null, "price": null }),
                ];
                let server = test_server($seed(docs.clone()).await);
                let response = server.get("/api/products").add_query_param("sort", "title").await;

                response.assert_status_ok();
                let body = response.json::<Value>();
                let products: Vec<Value> = body["products"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .cloned()
                    .map(without_id)
                    .collect();

                assert_eq!(body["total"], 3);
                assert_eq!(products, docs);
                assert!(products[1]["price"].is_u64());
            }

            // ==============================================================
            // Listing: sort
            // ==============================================================

            #[tokio::test]
            async fn test_list_sort_descending() {
                let server = make_server().await;
                let page = list(&server, &[("sort", "-price"), ("limit", "12")]).await;

                assert_eq!(page.products.len(), 12);
                assert!(is_non_increasing(&prices(&page)));
                assert_eq!(page.products[0].title(), Some("MacBook Pro"));
            }

            #[tokio::test]
            async fn test_list_sort_ascending() {
                let server = make_server().await;
                let page = list(&server, &[("sort", "price"), ("limit", "12")]).await;

                assert!(is_non_decreasing(&prices(&page)));
                assert_eq!(page.products[0].title(), Some("Apple"));
            }

            #[tokio::test]
            async fn test_list_sort_applies_before_pagination() {
                let server = make_server().await;
                let params = [("sort", "-price"), ("page", "2"), ("limit", "3")];
                let page = list(&server, &params).await;

                let titles: Vec<_> = page.products.iter().filter_map(|p| p.title()).collect();
                assert_eq!(titles, ["Asus Zenbook", "iPhone X", "iPhone 9"]);
            }

            // ==============================================================
            // Stats
            // ==============================================================

            #[tokio::test]
            async fn test_stats_category_statistics_by_default() {
                let server = make_server().await;
                let rows = stats(&server, &[]).await;
                let docs = sample_products();

                assert_eq!(rows.len(), 4);
                let averages: Vec<f64> =
                    rows.iter().map(|r| field_f64(r, "averagePrice")).collect();
                assert!(is_non_increasing(&averages));

                for row in &rows {
                    let name = row["categoryName"].as_str().unwrap();
                    let members = in_category(&docs, name);
                    let member_prices: Vec<f64> =
                        members.iter().map(|d| field_f64(d, "price")).collect();
                    let mean = member_prices.iter().sum::<f64>() / member_prices.len() as f64;
                    let max = member_prices.iter().cloned().fold(f64::MIN, f64::max);
                    let min = member_prices.iter().cloned().fold(f64::MAX, f64::min);

                    assert_eq!(row["totalProducts"].as_u64(), Some(members.len() as u64));
                    assert!(approx_eq(field_f64(row, "averagePrice"), mean), "{name}");
                    assert!(approx_eq(field_f64(row, "maxPrice"), max), "{name}");
                    assert!(approx_eq(field_f64(row, "minPrice"), min), "{name}");
                    assert!(row.get("_id").is_none());
                }

                assert_eq!(rows[0]["categoryName"], "laptops");
            }

            #[tokio::test]
            async fn test_stats_top_products() {
                let server = make_server().await;
                let rows = stats(&server, &[("meilleursP", "1")]).await;

                assert_eq!(rows.len(), 5);
                assert!(rows.iter().all(|r| field_f64(r, "price") > 500.0));
                let ratings: Vec<f64> = rows.iter().map(|r| field_f64(r, "rating")).collect();
                assert!(is_non_increasing(&ratings));
                assert_eq!(rows[0]["title"], "Asus Zenbook");

                for row in &rows {
                    let keys: HashSet<_> =
                        row.as_object().unwrap().keys().map(String::as_str).collect();
                    assert_eq!(keys, HashSet::from(["title", "price", "rating"]));
                }
            }

            #[tokio::test]
            async fn test_stats_brand_decomposition() {
                let server = make_server().await;
                let rows = stats(&server, &[("brandStats", "1")]).await;
                let docs = sample_products();

                assert_eq!(rows.len(), 7);
                let values: Vec<f64> = rows.iter().map(|r| field_f64(r, "totalValue")).collect();
                assert!(is_non_increasing(&values));

                for row in &rows {
                    let brand = row["brandName"].as_str();
                    assert!(approx_eq(field_f64(row, "totalValue"), brand_value(&docs, brand)));
                }

                assert_eq!(rows[0]["brandName"], "Apple");
                assert_eq!(rows[0]["totalStock"].as_i64(), Some(94 + 34 + 83));
                assert!(rows.iter().any(|r| r["brandName"].is_null()));
            }

            #[tokio::test]
            async fn test_stats_brand_flag_has_priority() {
                let server = make_server().await;
                let rows = stats(&server, &[("meilleursP", "1"), ("brandStats", "1")]).await;

                assert!(!rows.is_empty());
                assert!(rows.iter().all(|r| r.get("brandName").is_some()));
                assert!(rows.iter().all(|r| r.get("title").is_none()));
            }

            #[tokio::test]
            async fn test_stats_zero_flags_select_category_statistics() {
                let server = make_server().await;
                let rows = stats(&server, &[("meilleursP", "0"), ("brandStats", "0")]).await;

                assert!(rows.iter().all(|r| r.get("categoryName").is_some()));
            }

            #[tokio::test]
            async fn test_stats_category_without_prices() {
                let docs = vec![
                    json!({ "category": "A", "price": 10 }),
                    json!({ "category": "B" }),
                ];
                let server = test_server($seed(docs).await);
                let rows = stats(&server, &[]).await;

                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0]["categoryName"], "A");
                assert!(approx_eq(field_f64(&rows[0], "averagePrice"), 10.0));
                assert_eq!(rows[1]["categoryName"], "B");
                assert_eq!(rows[1]["totalProducts"], 1);
                assert!(rows[1]["averagePrice"].is_null());
                assert!(rows[1]["maxPrice"].is_null());
            }

            #[tokio::test]
            async fn test_stats_brand_with_unpriced_and_fractional_stock() {
                let docs = vec![
                    json!({ "brand": "x", "price": null, "stock": 3 }),
                    json!({ "brand": "x", "price": 10, "stock": 2.5 }),
                ];
                let server = test_server($seed(docs).await);
                let rows = stats(&server, &[("brandStats", "1")]).await;

                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0]["brandName"], "x");
                assert!(approx_eq(field_f64(&rows[0], "totalStock"), 5.5));
                assert!(approx_eq(field_f64(&rows[0], "totalValue"), 25.0));
            }

            #[tokio::test]
            async fn test_stats_top_products_keep_missing_fields_missing() {
                let docs = vec![
                    json!({ "title": "unrated", "price": 900 }),
                    json!({ "title": "rated", "price": 600, "rating": 4 }),
                    json!({ "title": "cheap", "price": 20, "rating": 5 }),
                ];
                let server = test_server($seed(docs).await);
                let rows = stats(&server, &[("meilleursP", "1")]).await;

                assert_eq!(
                    rows,
                    vec![
                        json!({ "title": "rated", "price": 600, "rating": 4 }),
                        json!({ "title": "unrated", "price": 900 }),
                    ]
                );
            }

            #[tokio::test]
            async fn test_stats_category_tie() {
                let server = test_server($seed(tie_scenario_products()).await);
                let rows = stats(&server, &[]).await;

                assert_eq!(rows.len(), 2);
                let a = rows.iter().find(|r| r["categoryName"] == "A").unwrap();
                let b = rows.iter().find(|r| r["categoryName"] == "B").unwrap();
                assert!(approx_eq(field_f64(a, "averagePrice"), 20.0));
                assert_eq!(a["totalProducts"].as_u64(), Some(2));
                assert!(approx_eq(field_f64(b, "averagePrice"), 20.0));
                assert_eq!(b["totalProducts"].as_u64(), Some(1));
            }
        }
    };
}
