//! Store traits for connecting to and querying the product collection

use crate::core::error::StorageError;
use crate::core::pipeline::Pipeline;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Name of the output field used by [`ProductCollection::count`]
const COUNT_FIELD: &str = "total";

/// Process-wide access to the document store
///
/// `connect` hands out a handle to the product collection, opening the
/// underlying connection on first use and reusing it afterwards.
/// Implementations must make that first initialization idempotent under
/// concurrent callers.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Get a handle to the product collection, connecting if needed
    async fn connect(&self) -> Result<Arc<dyn ProductCollection>, StorageError>;

    /// Release the underlying connection
    ///
    /// Handles obtained earlier must not be used afterwards. A later call to
    /// `connect` opens a new connection.
    async fn close(&self);
}

/// Read-only access to the product documents
#[async_trait]
pub trait ProductCollection: Send + Sync {
    /// Run a pipeline and return the resulting documents as JSON
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Value>, StorageError>;

    /// Number of documents the pipeline produces
    ///
    /// Implemented by appending a count stage, so only one document travels
    /// back from the store.
    async fn count(&self, pipeline: &Pipeline) -> Result<u64, StorageError> {
        let counted = pipeline.clone().count(COUNT_FIELD);
        let docs = self.aggregate(&counted).await?;

        Ok(docs
            .first()
            .and_then(|doc| doc.get(COUNT_FIELD))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }
}
