//! Query descriptor handed to the storage model, and the request -> descriptor translation.

mod builder;
pub use builder::*;

use serde::Serialize;
use std::collections::BTreeMap;

/// A single filter constraint on one field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Eq(String),
    /// SQL-style pattern (`%` wildcards).
    Like { pattern: String, case_insensitive: bool },
}

/// Filter, pagination, eager-load and projection intent for one storage call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueryDescriptor {
    pub filter: BTreeMap<String, Condition>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub include: Vec<String>,
    /// `None` selects every attribute.
    pub attributes: Option<Vec<String>>,
    /// Ask the store to return the full written row.
    pub returning: bool,
}

impl QueryDescriptor {
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(field.into(), Condition::Eq(value.into()));
        self
    }
}
