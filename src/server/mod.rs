//! HTTP server exposing the catalog
//!
//! - `handlers`: the request handlers and their shared state
//! - `router`: route table and middleware
//! - `serve`: binding, graceful shutdown and connector teardown

pub mod handlers;
pub mod router;
pub mod serve;

pub use handlers::AppState;
pub use router::build_router;
pub use serve::serve;
