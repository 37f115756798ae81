//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides [`MongoConnector`], the process-wide connection to the store,
//! and [`MongoProductCollection`], the handle it hands out.
//!
//! # Connection model
//!
//! The connector opens one `mongodb::Client` lazily, on the first call to
//! `connect`, and memoizes it. The client slot sits behind an async mutex so
//! concurrent first requests open exactly one connection. `close` shuts the
//! client down and empties the slot.
//!
//! # Translation
//!
//! Pipelines are built from store-agnostic [`Stage`] descriptors and turned
//! into BSON aggregation stages by [`stage_to_document`]. Result documents
//! are converted to relaxed extended JSON, with ObjectId identifiers rendered
//! as hex strings.

use crate::config::MongoConfig;
use crate::core::error::StorageError;
use crate::core::pipeline::{
    Accumulator, Condition, Expr, GROUP_KEY, Group, Pipeline, ProjectField, SortKey, Stage,
};
use crate::core::store::{ProductCollection, StoreConnector};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Client, Database};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Collection holding the product documents
pub const PRODUCTS_COLLECTION: &str = "products";

const BACKEND: &str = "MongoDB";

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a result document into JSON, rendering an ObjectId `_id` as hex.
fn document_to_json(mut doc: Document) -> Value {
    if let Ok(oid) = doc.get_object_id("_id") {
        doc.insert("_id", oid.to_hex());
    }

    Bson::Document(doc).into_relaxed_extjson()
}

fn json_to_bson(value: &Value) -> Result<Bson, StorageError> {
    mongodb::bson::to_bson(value).map_err(|e| StorageError::Translation {
        message: format!("failed to convert JSON to BSON: {}", e),
    })
}

fn field_ref(field: &str) -> Bson {
    Bson::String(format!("${}", field))
}

fn expr_to_bson(expr: &Expr) -> Bson {
    match expr {
        Expr::Field(field) => field_ref(field),
        Expr::Multiply(operands) => {
            let operands: Vec<Bson> = operands.iter().map(expr_to_bson).collect();
            Bson::Document(doc! { "$multiply": operands })
        }
    }
}

fn accumulator_to_bson(accumulator: &Accumulator) -> Bson {
    let document = match accumulator {
        Accumulator::Count => doc! { "$sum": 1 },
        Accumulator::Sum(expr) => doc! { "$sum": expr_to_bson(expr) },
        Accumulator::Avg(expr) => doc! { "$avg": expr_to_bson(expr) },
        Accumulator::Min(expr) => doc! { "$min": expr_to_bson(expr) },
        Accumulator::Max(expr) => doc! { "$max": expr_to_bson(expr) },
    };
    Bson::Document(document)
}

/// Translate a filter condition into a query document.
///
/// Conjunctions are flattened into a single document when their keys do not
/// collide, and fall back to `$and` otherwise.
fn condition_to_document(condition: &Condition) -> Result<Document, StorageError> {
    let mut document = Document::new();

    match condition {
        Condition::Eq { field, value } => {
            document.insert(field.as_str(), json_to_bson(value)?);
        }
        Condition::Gt { field, value } => {
            document.insert(field.as_str(), doc! { "$gt": json_to_bson(value)? });
        }
        Condition::Regex {
            field,
            pattern,
            case_insensitive,
        } => {
            let options = if *case_insensitive { "i" } else { "" };
            document.insert(
                field.as_str(),
                doc! { "$regex": pattern.as_str(), "$options": options },
            );
        }
        Condition::Any(conditions) => {
            document.insert("$or", conditions_to_array(conditions)?);
        }
        Condition::All(conditions) => {
            for part in conditions {
                for (key, value) in condition_to_document(part)? {
                    if document.contains_key(&key) {
                        return Ok(doc! { "$and": conditions_to_array(conditions)? });
                    }
                    document.insert(key, value);
                }
            }
        }
    }

    Ok(document)
}

fn conditions_to_array(conditions: &[Condition]) -> Result<Vec<Bson>, StorageError> {
    conditions
        .iter()
        .map(|c| condition_to_document(c).map(Bson::Document))
        .collect()
}

fn sort_to_document(keys: &[SortKey]) -> Document {
    let mut document = Document::new();
    for key in keys {
        document.insert(key.field.as_str(), key.order.as_i32());
    }
    document
}

fn group_to_document(group: &Group) -> Document {
    let mut document = doc! { GROUP_KEY: expr_to_bson(&group.key) };
    for (name, accumulator) in &group.fields {
        document.insert(name.as_str(), accumulator_to_bson(accumulator));
    }
    document
}

fn project_to_document(fields: &[ProjectField]) -> Document {
    let mut document = Document::new();
    if !fields.iter().any(|f| f.name() == "_id") {
        document.insert("_id", 0);
    }
    for field in fields {
        match field {
            ProjectField::Keep(name) => document.insert(name.as_str(), 1),
            ProjectField::Rename { name, from } => {
                document.insert(name.as_str(), expr_to_bson(from))
            }
        };
    }
    document
}

fn to_i64(n: u64) -> Result<i64, StorageError> {
    i64::try_from(n).map_err(|_| StorageError::Translation {
        message: format!("{} does not fit in a BSON integer", n),
    })
}

/// Translate one stage into a MongoDB aggregation stage.
pub fn stage_to_document(stage: &Stage) -> Result<Document, StorageError> {
    Ok(match stage {
        Stage::Match(condition) => doc! { "$match": condition_to_document(condition)? },
        Stage::Sort(keys) => doc! { "$sort": sort_to_document(keys) },
        Stage::Group(group) => doc! { "$group": group_to_document(group) },
        Stage::Project(fields) => doc! { "$project": project_to_document(fields) },
        Stage::Skip(n) => doc! { "$skip": to_i64(*n)? },
        Stage::Limit(n) => doc! { "$limit": to_i64(*n)? },
        Stage::Count(name) => doc! { "$count": name.as_str() },
    })
}

/// Translate a whole pipeline, preserving stage order.
pub fn pipeline_to_documents(pipeline: &Pipeline) -> Result<Vec<Document>, StorageError> {
    pipeline.stages().iter().map(stage_to_document).collect()
}

// ---------------------------------------------------------------------------
// MongoProductCollection
// ---------------------------------------------------------------------------

/// Handle on the `products` collection of one database.
#[derive(Clone, Debug)]
pub struct MongoProductCollection {
    database: Database,
}

impl MongoProductCollection {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(PRODUCTS_COLLECTION)
    }

    fn query_error(e: mongodb::error::Error) -> StorageError {
        StorageError::Query {
            collection: PRODUCTS_COLLECTION.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl ProductCollection for MongoProductCollection {
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Value>, StorageError> {
        let stages = pipeline_to_documents(pipeline)?;
        tracing::debug!(?stages, "running aggregation");

        let cursor = self
            .collection()
            .aggregate(stages)
            .await
            .map_err(Self::query_error)?;

        let docs: Vec<Document> = cursor.try_collect().await.map_err(Self::query_error)?;

        Ok(docs.into_iter().map(document_to_json).collect())
    }
}

// ---------------------------------------------------------------------------
// MongoConnector
// ---------------------------------------------------------------------------

/// Lazily connected, memoized MongoDB client.
///
/// # Example
///
/// ```rust,ignore
/// use catalog_api::storage::MongoConnector;
///
/// let connector = MongoConnector::new("mongodb://localhost:27017", "shop");
/// let products = connector.connect().await?;
/// let total = products.count(&Pipeline::new()).await?;
/// connector.close().await;
/// ```
pub struct MongoConnector {
    uri: String,
    database_name: String,
    client: Mutex<Option<Client>>,
}

impl MongoConnector {
    pub fn new(uri: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database_name: database_name.into(),
            client: Mutex::new(None),
        }
    }

    pub fn from_config(config: &MongoConfig) -> Self {
        Self::new(&config.connection_string, &config.database_name)
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Whether a client is currently cached.
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// Build a client and check the server answers.
    ///
    /// The driver connects lazily, so a `ping` is what surfaces an
    /// unreachable server here instead of on the first query.
    async fn open(&self) -> Result<Client, StorageError> {
        let connection_error = |e: mongodb::error::Error| StorageError::Connection {
            backend: BACKEND.to_string(),
            message: e.to_string(),
        };

        let client = Client::with_uri_str(&self.uri)
            .await
            .map_err(connection_error)?;

        client
            .database(&self.database_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        Ok(client)
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(&self) -> Result<Arc<dyn ProductCollection>, StorageError> {
        let mut slot = self.client.lock().await;

        let client = match slot.as_ref() {
            Some(client) => client.clone(),
            None => match self.open().await {
                Ok(client) => {
                    tracing::info!(database = %self.database_name, "connected to MongoDB");
                    *slot = Some(client.clone());
                    client
                }
                Err(e) => {
                    tracing::error!(error = %e, "error connecting database");
                    return Err(e);
                }
            },
        };

        Ok(Arc::new(MongoProductCollection::new(
            client.database(&self.database_name),
        )))
    }

    async fn close(&self) {
        let client = self.client.lock().await.take();
        if let Some(client) = client {
            client.shutdown().await;
            tracing::info!("MongoDB connection closed");
        }
    }
}
