//! Table metadata the PostgreSQL adapter builds SQL from. Identifiers come from here only.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type used to cast bound text values (e.g. "int8", "timestamptz").
    pub pg_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, pg_type: impl Into<String>) -> Self {
        ColumnInfo {
            name: name.into(),
            pg_type: pg_type.into(),
        }
    }
}

/// Direction of an eager-loadable relation: to_one (we hold the FK) or to_many (they hold it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ToOne,
    ToMany,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RelationInfo {
    /// Include name, also the response key.
    pub name: String,
    pub kind: RelationKind,
    pub schema: String,
    pub table: String,
    /// Columns selected from the related table.
    pub columns: Vec<ColumnInfo>,
    /// Our column in the join (our FK for to_one; usually our PK for to_many).
    pub our_key: String,
    /// Their column in the join (their PK for to_one; their FK for to_many).
    pub their_key: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TableInfo {
    /// Model name, e.g. "Post".
    pub name: String,
    pub schema: String,
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub relations: Vec<RelationInfo>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationInfo> {
        self.relations.iter().find(|r| r.name == name)
    }
}
