//! PostgreSQL model over sqlx: runs the SQL built from query descriptors and maps SQLSTATE codes
//! onto storage errors.

use crate::error::{FieldError, StorageError};
use crate::model::{Dialect, Model, Record};
use crate::query::QueryDescriptor;
use crate::sql::{self, QueryBuf};
use crate::store::TableInfo;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgDatabaseError, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

pub struct PgModel {
    pool: PgPool,
    table: TableInfo,
}

impl PgModel {
    pub fn new(pool: PgPool, table: TableInfo) -> Self {
        PgModel { pool, table }
    }

    pub fn table(&self) -> &TableInfo {
        &self.table
    }
}

fn bound(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.as_deref());
    }
    query
}

#[async_trait]
impl Model for PgModel {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn primary_key(&self) -> &str {
        &self.table.primary_key
    }

    fn relationships(&self) -> Vec<String> {
        self.table.relations.iter().map(|r| r.name.clone()).collect()
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn find_one(&self, query: &QueryDescriptor) -> Result<Option<Record>, StorageError> {
        let query = QueryDescriptor {
            limit: Some(1),
            ..query.clone()
        };
        let q = sql::select(&self.table, &query)?;
        let row = bound(&q).fetch_optional(&self.pool).await.map_err(map_db_error)?;
        Ok(row.map(|r| row_to_record(&r)))
    }

    async fn find_all(&self, query: &QueryDescriptor) -> Result<Vec<Record>, StorageError> {
        let q = sql::select(&self.table, query)?;
        let rows = bound(&q).fetch_all(&self.pool).await.map_err(map_db_error)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn create(&self, input: Record, _query: &QueryDescriptor) -> Result<Record, StorageError> {
        let q = sql::insert(&self.table, &input);
        let row = bound(&q).fetch_one(&self.pool).await.map_err(map_db_error)?;
        Ok(row_to_record(&row))
    }

    async fn save(&self, key: &Value, record: &Record) -> Result<Record, StorageError> {
        let q = sql::update(&self.table, key, record)?;
        let row = bound(&q)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| StorageError::Other(format!("{} row vanished during update", self.table.name)))?;
        Ok(row_to_record(&row))
    }

    async fn destroy(&self, query: &QueryDescriptor) -> Result<u64, StorageError> {
        let q = sql::delete(&self.table, query)?;
        let done = bound(&q).execute(&self.pool).await.map_err(map_db_error)?;
        Ok(done.rows_affected())
    }
}

/// Column name from a unique-violation detail such as `Key (email)=(a@b.c) already exists.`
fn key_column(detail: &str) -> Option<String> {
    let rest = detail.strip_prefix("Key (")?;
    let end = rest.find(")=")?;
    Some(rest[..end].to_string())
}

pub fn map_db_error(err: sqlx::Error) -> StorageError {
    let sqlx::Error::Database(db) = &err else {
        return StorageError::Other(err.to_string());
    };
    let pg = db.try_downcast_ref::<PgDatabaseError>();
    let column = pg.and_then(|e| e.column()).map(String::from);
    let message = db.message().to_string();
    match db.code().as_deref() {
        Some("23505") => {
            let field = pg.and_then(|e| e.detail()).and_then(key_column).or(column);
            let msg = match &field {
                Some(f) => format!("{} must be unique", f),
                None => message,
            };
            StorageError::UniqueConstraint(vec![FieldError { message: msg, field }])
        }
        Some("23503") => StorageError::ForeignKey(db.constraint().unwrap_or_default().to_string()),
        Some("23502") | Some("23514") | Some("22P02") => {
            StorageError::Validation(vec![FieldError { message, field: column }])
        }
        _ => StorageError::Database(message),
    }
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Record::new(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
