//! Storage abstraction consumed by the controller: a model exposing find/create/save/destroy.

use crate::case::{pluralize, to_lower_camel};
use crate::error::StorageError;
use crate::query::QueryDescriptor;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// SQL dialect of the backing store; decides the pattern-match operator for `search[...]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    Other,
}

impl Dialect {
    /// Whether the dialect has a native case-insensitive match (`ILIKE`).
    pub fn has_case_insensitive_like(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

/// One stored row as a JSON object. `set` records which fields changed so `save` can persist only those.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: Map<String, Value>,
    #[serde(skip)]
    changed: Vec<String>,
}

impl Record {
    pub fn new(values: Map<String, Value>) -> Self {
        Record {
            values,
            changed: Vec::new(),
        }
    }

    /// Build from a JSON value; non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(m) => Some(Record::new(m)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        if !self.changed.contains(&field) {
            self.changed.push(field.clone());
        }
        self.values.insert(field, value);
    }

    /// Fields touched by `set` since the record was loaded, in first-set order.
    pub fn changed(&self) -> &[String] {
        &self.changed
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

/// An ORM-managed record type. Implementations own query execution and connections.
#[async_trait]
pub trait Model: Send + Sync {
    /// Model name as declared, e.g. "Post".
    fn name(&self) -> &str;

    fn primary_key(&self) -> &str;

    /// Relation names that can be eager-loaded.
    fn relationships(&self) -> Vec<String> {
        Vec::new()
    }

    fn dialect(&self) -> Dialect {
        Dialect::Other
    }

    /// Envelope and request-body key for a single record.
    fn singular_name(&self) -> String {
        to_lower_camel(self.name())
    }

    /// Envelope key for a collection.
    fn plural_name(&self) -> String {
        pluralize(&self.singular_name())
    }

    async fn find_one(&self, query: &QueryDescriptor) -> Result<Option<Record>, StorageError>;

    async fn find_all(&self, query: &QueryDescriptor) -> Result<Vec<Record>, StorageError>;

    async fn create(&self, input: Record, query: &QueryDescriptor) -> Result<Record, StorageError>;

    /// Persist the changed fields of `record`, addressing the row by its primary key as loaded.
    async fn save(&self, key: &Value, record: &Record) -> Result<Record, StorageError>;

    /// Delete matching rows; returns the affected row count.
    async fn destroy(&self, query: &QueryDescriptor) -> Result<u64, StorageError>;
}
