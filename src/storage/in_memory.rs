//! In-memory product store for testing and development
//!
//! Holds JSON documents and evaluates pipelines over them with the same
//! semantics the MongoDB backend gets from the server: missing fields sort
//! first, `$sum` ignores non-numeric values, `$avg`/`$min`/`$max` ignore
//! nulls, and a project stage drops fields whose source is missing.

use crate::core::error::StorageError;
use crate::core::pipeline::{
    Accumulator, Condition, Expr, GROUP_KEY, Group, Pipeline, ProjectField, SortKey, SortOrder,
    Stage,
};
use crate::core::store::{ProductCollection, StoreConnector};
use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

const COLLECTION: &str = "products";

/// In-memory store implementation
///
/// Uses RwLock for thread-safe access. Acts as its own connector: `connect`
/// returns a handle sharing the same documents.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    documents: Arc<RwLock<Vec<Value>>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<Value>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Append documents to the collection
    pub fn insert_many(
        &self,
        documents: impl IntoIterator<Item = Value>,
    ) -> Result<(), StorageError> {
        let mut guard = self.documents.write().map_err(|e| lock_error(&e))?;
        guard.extend(documents);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error(e: &impl std::fmt::Display) -> StorageError {
    StorageError::Query {
        collection: COLLECTION.to_string(),
        message: format!("failed to acquire lock: {}", e),
    }
}

#[async_trait]
impl StoreConnector for InMemoryProductStore {
    async fn connect(&self) -> Result<Arc<dyn ProductCollection>, StorageError> {
        Ok(Arc::new(self.clone()))
    }

    async fn close(&self) {}
}

#[async_trait]
impl ProductCollection for InMemoryProductStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Value>, StorageError> {
        let documents = self
            .documents
            .read()
            .map_err(|e| lock_error(&e))?
            .clone();

        evaluate(pipeline, documents)
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Run every stage of `pipeline` over `documents`, in order
pub fn evaluate(pipeline: &Pipeline, documents: Vec<Value>) -> Result<Vec<Value>, StorageError> {
    pipeline
        .stages()
        .iter()
        .try_fold(documents, |docs, stage| apply_stage(stage, docs))
}

fn apply_stage(stage: &Stage, docs: Vec<Value>) -> Result<Vec<Value>, StorageError> {
    Ok(match stage {
        Stage::Match(condition) => {
            let matcher = Matcher::compile(condition)?;
            docs.into_iter().filter(|doc| matcher.matches(doc)).collect()
        }
        Stage::Sort(keys) => sort(docs, keys),
        Stage::Group(group) => group_documents(group, &docs),
        Stage::Project(fields) => docs.iter().map(|doc| project(doc, fields)).collect(),
        Stage::Skip(n) => docs.into_iter().skip(saturating_usize(*n)).collect(),
        Stage::Limit(n) => docs.into_iter().take(saturating_usize(*n)).collect(),
        Stage::Count(name) => {
            if docs.is_empty() {
                Vec::new()
            } else {
                let mut out = Map::new();
                out.insert(name.clone(), Value::from(docs.len() as u64));
                vec![Value::Object(out)]
            }
        }
    })
}

fn saturating_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Resolve a dotted field path
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, segment| value.get(segment))
}

/// Canonical type order used when comparing values of different types
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A condition with its regular expressions compiled once per stage
enum Matcher<'a> {
    Eq(&'a str, &'a Value),
    Gt(&'a str, &'a Value),
    Regex(&'a str, regex::Regex),
    Any(Vec<Matcher<'a>>),
    All(Vec<Matcher<'a>>),
}

impl<'a> Matcher<'a> {
    fn compile(condition: &'a Condition) -> Result<Self, StorageError> {
        Ok(match condition {
            Condition::Eq { field, value } => Matcher::Eq(field, value),
            Condition::Gt { field, value } => Matcher::Gt(field, value),
            Condition::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()
                    .map_err(|e| StorageError::Query {
                        collection: COLLECTION.to_string(),
                        message: format!("invalid regular expression: {}", e),
                    })?;
                Matcher::Regex(field, regex)
            }
            Condition::Any(conditions) => Matcher::Any(Self::compile_all(conditions)?),
            Condition::All(conditions) => Matcher::All(Self::compile_all(conditions)?),
        })
    }

    fn compile_all(conditions: &'a [Condition]) -> Result<Vec<Self>, StorageError> {
        conditions.iter().map(Self::compile).collect()
    }

    fn matches(&self, doc: &Value) -> bool {
        match self {
            Matcher::Eq(field, expected) => {
                lookup(doc, field).is_some_and(|actual| values_equal(actual, expected))
            }
            Matcher::Gt(field, bound) => lookup(doc, field).is_some_and(|actual| {
                // Only values of the same type are comparable
                type_rank(Some(actual)) == type_rank(Some(*bound))
                    && compare_values(Some(actual), Some(*bound)) == Ordering::Greater
            }),
            Matcher::Regex(field, regex) => lookup(doc, field)
                .and_then(Value::as_str)
                .is_some_and(|text| regex.is_match(text)),
            Matcher::Any(matchers) => matchers.iter().any(|m| m.matches(doc)),
            Matcher::All(matchers) => matchers.iter().all(|m| m.matches(doc)),
        }
    }
}

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

fn sort(mut docs: Vec<Value>, keys: &[SortKey]) -> Vec<Value> {
    docs.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ordering = compare_values(lookup(a, &key.field), lookup(b, &key.field));
                match key.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    docs
}

// ---------------------------------------------------------------------------
// Expressions and accumulators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(value: &Value) -> Option<Self> {
        let n = value.as_number()?;
        n.as_i64()
            .map(Number::Int)
            .or_else(|| n.as_f64().map(Number::Float))
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn add(self, other: Self) -> Self {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map_or(Number::Float(a as f64 + b as f64), Number::Int),
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        }
    }

    fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map_or(Number::Float(a as f64 * b as f64), Number::Int),
            (a, b) => Number::Float(a.as_f64() * b.as_f64()),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(i) => Value::from(i),
            Number::Float(f) => Value::from(f),
        }
    }
}

/// Evaluate an expression; `None` when a referenced field is missing
fn eval(expr: &Expr, doc: &Value) -> Option<Value> {
    match expr {
        Expr::Field(path) => lookup(doc, path).cloned(),
        Expr::Multiply(operands) => {
            let mut product = Number::Int(1);
            for operand in operands {
                let value = eval(operand, doc)?;
                if value.is_null() {
                    return Some(Value::Null);
                }
                product = product.mul(Number::from_value(&value)?);
            }
            Some(product.into_value())
        }
    }
}

fn accumulate(accumulator: &Accumulator, members: &[&Value]) -> Value {
    let values = |expr: &Expr| -> Vec<Value> {
        members
            .iter()
            .filter_map(|doc| eval(expr, doc))
            .filter(|v| !v.is_null())
            .collect()
    };

    match accumulator {
        Accumulator::Count => Value::from(members.len() as u64),
        Accumulator::Sum(expr) => values(expr)
            .iter()
            .filter_map(Number::from_value)
            .fold(Number::Int(0), Number::add)
            .into_value(),
        Accumulator::Avg(expr) => {
            let numbers: Vec<f64> = values(expr)
                .iter()
                .filter_map(Number::from_value)
                .map(Number::as_f64)
                .collect();
            if numbers.is_empty() {
                Value::Null
            } else {
                Value::from(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
        Accumulator::Min(expr) => values(expr)
            .into_iter()
            .min_by(|a, b| compare_values(Some(a), Some(b)))
            .unwrap_or(Value::Null),
        Accumulator::Max(expr) => values(expr)
            .into_iter()
            .max_by(|a, b| compare_values(Some(a), Some(b)))
            .unwrap_or(Value::Null),
    }
}

// ---------------------------------------------------------------------------
// Group and project
// ---------------------------------------------------------------------------

/// Partition by key, in order of first appearance
fn group_documents(group: &Group, docs: &[Value]) -> Vec<Value> {
    let mut partitions: Vec<(Value, Vec<&Value>)> = Vec::new();

    for doc in docs {
        let key = eval(&group.key, doc).unwrap_or(Value::Null);
        match partitions.iter_mut().find(|(k, _)| values_equal(k, &key)) {
            Some((_, members)) => members.push(doc),
            None => partitions.push((key, vec![doc])),
        }
    }

    partitions
        .into_iter()
        .map(|(key, members)| {
            let mut out = Map::new();
            out.insert(GROUP_KEY.to_string(), key);
            for (name, accumulator) in &group.fields {
                out.insert(name.clone(), accumulate(accumulator, &members));
            }
            Value::Object(out)
        })
        .collect()
}

fn project(doc: &Value, fields: &[ProjectField]) -> Value {
    let mut out = Map::new();

    for field in fields {
        let value = match field {
            ProjectField::Keep(name) => lookup(doc, name).cloned(),
            ProjectField::Rename { from, .. } => eval(from, doc),
        };
        if let Some(value) = value {
            out.insert(field.name().to_string(), value);
        }
    }

    Value::Object(out)
}
