//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from table metadata and a query descriptor.

use crate::error::{FieldError, StorageError};
use crate::model::Record;
use crate::query::{Condition, QueryDescriptor};
use crate::sql::bind_text;
use crate::store::{ColumnInfo, RelationKind, TableInfo};
use serde_json::Value;

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL (safe: only from table metadata).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    /// Text-encoded parameters; each placeholder carries a cast to its column type.
    pub params: Vec<Option<String>>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Option<String>) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// `$n::type` placeholder for a value bound to `column`.
    fn typed(&mut self, v: &Value, column: &ColumnInfo) -> String {
        let n = self.push_param(bind_text(v));
        format!("${}::{}", n, column.pg_type)
    }
}

fn unknown_attribute(field: &str) -> StorageError {
    StorageError::Validation(vec![FieldError::on_field(field, format!("unknown attribute '{}'", field))])
}

/// Column expression: custom enum (schema.typename) and numeric as text so rows decode as String.
fn column_expr(alias: Option<&str>, c: &ColumnInfo) -> String {
    let q = match alias {
        Some(a) => format!("{}.{}", a, quoted(&c.name)),
        None => quoted(&c.name),
    };
    if c.pg_type.contains('.') || c.pg_type == "numeric" {
        format!("{}::text", q)
    } else {
        q
    }
}

fn column_list(columns: &[ColumnInfo]) -> String {
    columns
        .iter()
        .map(|c| column_expr(None, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Selected columns of the main table: the projection if given (unknown names dropped), else all.
fn projected<'a>(table: &'a TableInfo, attributes: Option<&[String]>) -> Vec<&'a ColumnInfo> {
    let cols: Vec<&ColumnInfo> = match attributes {
        Some(names) => table
            .columns
            .iter()
            .filter(|c| names.iter().any(|n| *n == c.name))
            .collect(),
        None => Vec::new(),
    };
    if cols.is_empty() {
        table.columns.iter().collect()
    } else {
        cols
    }
}

fn where_clause(q: &mut QueryBuf, table: &TableInfo, query: &QueryDescriptor) -> Result<String, StorageError> {
    let mut parts = Vec::new();
    for (field, cond) in &query.filter {
        let column = table.column(field).ok_or_else(|| unknown_attribute(field))?;
        let lhs = format!("{}.{}", MAIN_ALIAS, quoted(&column.name));
        match cond {
            Condition::Eq(v) => {
                let ph = q.typed(&Value::String(v.clone()), column);
                parts.push(format!("{} = {}", lhs, ph));
            }
            Condition::Like {
                pattern,
                case_insensitive,
            } => {
                let n = q.push_param(Some(pattern.clone()));
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                parts.push(format!("{}::text {} ${}", lhs, op, n));
            }
        }
    }
    Ok(if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    })
}

/// SELECT with filter, projection, eager-loads (scalar JSON subqueries), ORDER BY pk, LIMIT/OFFSET.
pub fn select(table: &TableInfo, query: &QueryDescriptor) -> Result<QueryBuf, StorageError> {
    let mut q = QueryBuf::new();
    let from = qualified_table(&table.schema, &table.table);

    let mut select_parts: Vec<String> = projected(table, query.attributes.as_deref())
        .into_iter()
        .map(|c| format!("{} AS {}", column_expr(Some(MAIN_ALIAS), c), quoted(&c.name)))
        .collect();
    for name in &query.include {
        let rel = table.relation(name).ok_or_else(|| unknown_attribute(name))?;
        let rel_table = qualified_table(&rel.schema, &rel.table);
        let sub_from = format!(
            "{} WHERE {} = {}.{}",
            rel_table,
            quoted(&rel.their_key),
            MAIN_ALIAS,
            quoted(&rel.our_key)
        );
        let rel_cols = column_list(&rel.columns);
        let subquery = match rel.kind {
            RelationKind::ToOne => format!(
                "(SELECT row_to_json(sub) FROM (SELECT {} FROM {} LIMIT 1) sub)",
                rel_cols, sub_from
            ),
            RelationKind::ToMany => format!(
                "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT {} FROM {}) sub)",
                rel_cols, sub_from
            ),
        };
        select_parts.push(format!("{} AS {}", subquery, quoted(&rel.name)));
    }

    let where_sql = where_clause(&mut q, table, query)?;
    let order = format!(" ORDER BY {}.{}", MAIN_ALIAS, quoted(&table.primary_key));
    let limit = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset = query.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}{}",
        select_parts.join(", "),
        from,
        MAIN_ALIAS,
        where_sql,
        order,
        limit,
        offset
    );
    Ok(q)
}

/// INSERT the record's known columns; unknown fields are ignored. Always RETURNING the full row.
pub fn insert(table: &TableInfo, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let from = qualified_table(&table.schema, &table.table);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        let Some(v) = record.get(&c.name) else { continue };
        placeholders.push(q.typed(v, c));
        cols.push(quoted(&c.name));
    }
    let returning = column_list(&table.columns);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", from, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            from,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE the record's changed known columns, addressed by `key`. With nothing to change this
/// is a plain SELECT of the row.
pub fn update(table: &TableInfo, key: &Value, record: &Record) -> Result<QueryBuf, StorageError> {
    let mut q = QueryBuf::new();
    let from = qualified_table(&table.schema, &table.table);
    let pk = table
        .column(&table.primary_key)
        .ok_or_else(|| unknown_attribute(&table.primary_key))?;
    let mut sets = Vec::new();
    for field in record.changed() {
        let Some(c) = table.column(field) else { continue };
        let v = record.get(field).cloned().unwrap_or(Value::Null);
        let rhs = q.typed(&v, c);
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    let returning = column_list(&table.columns);
    let key_ph = q.typed(key, pk);
    q.sql = if sets.is_empty() {
        format!("SELECT {} FROM {} WHERE {} = {}", returning, from, quoted(&pk.name), key_ph)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
            from,
            sets.join(", "),
            quoted(&pk.name),
            key_ph,
            returning
        )
    };
    Ok(q)
}

/// DELETE rows matching the filter, at most `limit` of them (via ctid subselect).
pub fn delete(table: &TableInfo, query: &QueryDescriptor) -> Result<QueryBuf, StorageError> {
    let mut q = QueryBuf::new();
    let from = qualified_table(&table.schema, &table.table);
    let where_sql = where_clause(&mut q, table, query)?;
    let limit = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    q.sql = format!(
        "DELETE FROM {} WHERE ctid IN (SELECT {}.ctid FROM {} {}{}{})",
        from, MAIN_ALIAS, from, MAIN_ALIAS, where_sql, limit
    );
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RelationInfo;
    use serde_json::json;

    fn posts() -> TableInfo {
        TableInfo {
            name: "Post".into(),
            schema: "public".into(),
            table: "posts".into(),
            primary_key: "id".into(),
            columns: vec![
                ColumnInfo::new("id", "int8"),
                ColumnInfo::new("authorId", "int8"),
                ColumnInfo::new("title", "text"),
                ColumnInfo::new("price", "numeric"),
            ],
            relations: vec![RelationInfo {
                name: "author".into(),
                kind: RelationKind::ToOne,
                schema: "public".into(),
                table: "authors".into(),
                columns: vec![ColumnInfo::new("id", "int8"), ColumnInfo::new("name", "text")],
                our_key: "authorId".into(),
                their_key: "id".into(),
            }],
        }
    }

    #[test]
    fn select_with_filter_search_and_paging() {
        let mut query = QueryDescriptor {
            limit: Some(10),
            offset: Some(5),
            ..QueryDescriptor::default()
        }
        .eq("authorId", "1");
        query.filter.insert(
            "title".into(),
            Condition::Like {
                pattern: "%rust%".into(),
                case_insensitive: true,
            },
        );
        let q = select(&posts(), &query).unwrap();
        assert_eq!(
            q.sql,
            "SELECT main.\"id\" AS \"id\", main.\"authorId\" AS \"authorId\", main.\"title\" AS \"title\", \
             main.\"price\"::text AS \"price\" FROM \"public\".\"posts\" main \
             WHERE main.\"authorId\" = $1::int8 AND main.\"title\"::text ILIKE $2 \
             ORDER BY main.\"id\" LIMIT 10 OFFSET 5"
        );
        assert_eq!(q.params, vec![Some("1".to_string()), Some("%rust%".to_string())]);
    }

    #[test]
    fn select_projection_and_include() {
        let query = QueryDescriptor {
            attributes: Some(vec!["id".into(), "nope".into()]),
            include: vec!["author".into()],
            ..QueryDescriptor::default()
        };
        let q = select(&posts(), &query).unwrap();
        assert!(q.sql.starts_with("SELECT main.\"id\" AS \"id\", (SELECT row_to_json(sub) FROM"));
        assert!(q.sql.contains("\"public\".\"authors\" WHERE \"id\" = main.\"authorId\""));
        assert!(q.sql.contains("AS \"author\""));
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        let query = QueryDescriptor::default().eq("password", "x");
        assert!(matches!(select(&posts(), &query), Err(StorageError::Validation(_))));
    }

    #[test]
    fn insert_known_columns_only() {
        let record = Record::from_value(json!({ "title": "X", "authorId": 1, "extra": true })).unwrap();
        let q = insert(&posts(), &record);
        assert_eq!(
            q.sql,
            "INSERT INTO \"public\".\"posts\" (\"authorId\", \"title\") VALUES ($1::int8, $2::text) \
             RETURNING \"id\", \"authorId\", \"title\", \"price\"::text"
        );
        assert_eq!(q.params, vec![Some("1".to_string()), Some("X".to_string())]);
    }

    #[test]
    fn insert_empty_uses_defaults() {
        let q = insert(&posts(), &Record::default());
        assert!(q.sql.starts_with("INSERT INTO \"public\".\"posts\" DEFAULT VALUES RETURNING"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn update_sets_changed_fields() {
        let mut record = Record::from_value(json!({ "id": 1, "title": "a", "authorId": 2 })).unwrap();
        record.set("title", json!("b"));
        record.set("ghost", json!(1));
        let q = update(&posts(), &json!(1), &record).unwrap();
        assert_eq!(
            q.sql,
            "UPDATE \"public\".\"posts\" SET \"title\" = $1::text WHERE \"id\" = $2::int8 \
             RETURNING \"id\", \"authorId\", \"title\", \"price\"::text"
        );
        assert_eq!(q.params, vec![Some("b".to_string()), Some("1".to_string())]);
    }

    #[test]
    fn update_without_changes_selects() {
        let record = Record::from_value(json!({ "id": 1 })).unwrap();
        let q = update(&posts(), &json!(1), &record).unwrap();
        assert!(q.sql.starts_with("SELECT "));
        assert_eq!(q.params, vec![Some("1".to_string())]);
    }

    #[test]
    fn delete_is_bounded() {
        let query = QueryDescriptor {
            limit: Some(1),
            ..QueryDescriptor::default()
        }
        .eq("id", "3");
        let q = delete(&posts(), &query).unwrap();
        assert_eq!(
            q.sql,
            "DELETE FROM \"public\".\"posts\" WHERE ctid IN (SELECT main.ctid FROM \"public\".\"posts\" main \
             WHERE main.\"id\" = $1::int8 LIMIT 1)"
        );
    }
}
