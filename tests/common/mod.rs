//! In-memory `Model` used to drive the router in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use crud_controller::{Condition, Dialect, FieldError, Model, QueryDescriptor, Record, StorageError};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tower::ServiceExt;

pub struct MemoryModel {
    name: String,
    primary_key: String,
    dialect: Dialect,
    relationships: Vec<String>,
    required: Vec<String>,
    unique: Vec<String>,
    rows: Mutex<Vec<Map<String, Value>>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
    queries: Mutex<Vec<QueryDescriptor>>,
    fail_next: Mutex<Option<StorageError>>,
}

impl MemoryModel {
    pub fn new(name: &str) -> Self {
        MemoryModel {
            name: name.to_string(),
            primary_key: "id".to_string(),
            dialect: Dialect::Other,
            relationships: Vec::new(),
            required: Vec::new(),
            unique: Vec::new(),
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    pub fn with_primary_key(mut self, pk: &str) -> Self {
        self.primary_key = pk.to_string();
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_relationships(mut self, names: &[&str]) -> Self {
        self.relationships = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_required(mut self, field: &str) -> Self {
        self.required.push(field.to_string());
        self
    }

    pub fn with_unique(mut self, field: &str) -> Self {
        self.unique.push(field.to_string());
        self
    }

    /// Insert a row directly, assigning the next id when missing.
    pub fn seed(&self, row: Value) {
        let Value::Object(mut row) = row else { panic!("seed rows must be objects") };
        if !row.contains_key(&self.primary_key) {
            row.insert(self.primary_key.clone(), Value::from(self.next_id.fetch_add(1, Ordering::SeqCst)));
        } else if let Some(n) = row.get(&self.primary_key).and_then(Value::as_i64) {
            self.next_id.fetch_max(n + 1, Ordering::SeqCst);
        }
        self.rows.lock().unwrap().push(row);
    }

    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.rows.lock().unwrap().clone()
    }

    /// Number of storage calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<QueryDescriptor> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn fail_next(&self, err: StorageError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    fn enter(&self, query: Option<&QueryDescriptor>) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(q) = query {
            self.queries.lock().unwrap().push(q.clone());
        }
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check(&self, row: &Map<String, Value>, skip_key: Option<&Value>) -> Result<(), StorageError> {
        let missing: Vec<FieldError> = self
            .required
            .iter()
            .filter(|f| row.get(*f).map_or(true, Value::is_null))
            .map(|f| FieldError::on_field(f.clone(), format!("{} cannot be null", f)))
            .collect();
        if !missing.is_empty() {
            return Err(StorageError::Validation(missing));
        }
        let rows = self.rows.lock().unwrap();
        for field in &self.unique {
            let Some(value) = row.get(field) else { continue };
            let clash = rows.iter().any(|r| {
                r.get(field) == Some(value) && skip_key.map_or(true, |k| !same(r.get(&self.primary_key), k))
            });
            if clash {
                return Err(StorageError::UniqueConstraint(vec![FieldError::on_field(
                    field.clone(),
                    format!("{} must be unique", field),
                )]));
            }
        }
        Ok(())
    }
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn same(a: Option<&Value>, b: &Value) -> bool {
    a.map_or(false, |a| text(a) == text(b))
}

fn matches(row: &Map<String, Value>, query: &QueryDescriptor) -> bool {
    query.filter.iter().all(|(field, cond)| {
        let Some(v) = row.get(field) else { return false };
        let v = text(v);
        match cond {
            Condition::Eq(expected) => v == *expected,
            Condition::Like {
                pattern,
                case_insensitive,
            } => {
                let needle = pattern.trim_matches('%');
                if *case_insensitive {
                    v.to_lowercase().contains(&needle.to_lowercase())
                } else {
                    v.contains(needle)
                }
            }
        }
    })
}

fn project(row: &Map<String, Value>, query: &QueryDescriptor) -> Record {
    let values = match &query.attributes {
        Some(attrs) => row
            .iter()
            .filter(|(k, _)| attrs.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        None => row.clone(),
    };
    Record::new(values)
}

#[async_trait]
impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn relationships(&self) -> Vec<String> {
        self.relationships.clone()
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn find_one(&self, query: &QueryDescriptor) -> Result<Option<Record>, StorageError> {
        self.enter(Some(query))?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| matches(r, query)).map(|r| project(r, query)))
    }

    async fn find_all(&self, query: &QueryDescriptor) -> Result<Vec<Record>, StorageError> {
        self.enter(Some(query))?;
        let rows = self.rows.lock().unwrap();
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |n| n as usize);
        Ok(rows
            .iter()
            .filter(|r| matches(r, query))
            .skip(offset)
            .take(limit)
            .map(|r| project(r, query))
            .collect())
    }

    async fn create(&self, input: Record, query: &QueryDescriptor) -> Result<Record, StorageError> {
        self.enter(Some(query))?;
        let mut row = input.into_values();
        self.check(&row, None)?;
        if !row.contains_key(&self.primary_key) {
            row.insert(self.primary_key.clone(), Value::from(self.next_id.fetch_add(1, Ordering::SeqCst)));
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(Record::new(row))
    }

    async fn save(&self, key: &Value, record: &Record) -> Result<Record, StorageError> {
        self.enter(None)?;
        self.check(record.values(), Some(key))?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| same(r.get(&self.primary_key), key))
            .ok_or_else(|| StorageError::Other("row vanished".into()))?;
        *row = record.values().clone();
        Ok(Record::new(row.clone()))
    }

    async fn destroy(&self, query: &QueryDescriptor) -> Result<u64, StorageError> {
        self.enter(Some(query))?;
        let mut rows = self.rows.lock().unwrap();
        let limit = query.limit.map_or(usize::MAX, |n| n as usize);
        let mut removed = 0;
        rows.retain(|r| {
            if removed < limit && matches(r, query) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed as u64)
    }
}

/// Send one request through the router and decode the JSON body (`Value::Null` when not JSON).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    send_request(app, req.body(body).unwrap()).await
}

pub async fn send_request(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
