//! Builds a query descriptor from HTTP method, path id and query string.

use crate::case::is_identifier;
use crate::config::ControllerConfig;
use crate::query::{Condition, QueryDescriptor};
use axum::http::Method;

/// The parts of a request the query builder looks at.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub method: Method,
    /// Identifier from the path (`/:id`), if the route has one.
    pub id: Option<String>,
    /// Raw query-string pairs in request order.
    pub params: Vec<(String, String)>,
    /// Extra equality constraint applied before the path id (parent key for child routes).
    pub scope: Option<(String, String)>,
}

impl RequestInfo {
    pub fn new(method: Method) -> Self {
        RequestInfo {
            method,
            id: None,
            params: Vec::new(),
            scope: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn with_scope(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope = Some((field.into(), value.into()));
        self
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// `filter[title]` -> `Some("title")` for prefix `filter`.
fn bracketed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .filter(|field| !field.is_empty())
}

/// Page bounds are capped at the largest value a SQL `bigint` holds.
const MAX_PAGE_BOUND: u64 = i64::MAX as u64;

fn page_bound(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().map(|n| n.min(MAX_PAGE_BOUND))
}

/// Comma-separated projection. Anything unexpected falls back to no projection.
fn parse_attributes(raw: &str) -> Option<Vec<String>> {
    let fields: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if fields.is_empty() || !fields.iter().all(|f| is_identifier(f)) {
        tracing::debug!(attributes = %raw, "ignoring malformed attributes list");
        return None;
    }
    Some(fields)
}

/// Translate a request into a storage query for a model keyed by `primary_key`.
pub fn build_query(info: &RequestInfo, primary_key: &str, config: &ControllerConfig) -> QueryDescriptor {
    let mut q = QueryDescriptor::default();
    let include = config.relationships.clone().unwrap_or_default();

    match info.method {
        Method::GET => {
            q.limit = info
                .param("limit")
                .and_then(page_bound)
                .or(config.limit.map(|n| n.min(MAX_PAGE_BOUND)));
            q.offset = info.param("offset").and_then(page_bound);
            for (key, value) in &info.params {
                if let Some(field) = bracketed(key, "filter") {
                    q.filter.insert(field.to_string(), Condition::Eq(value.clone()));
                } else if let Some(field) = bracketed(key, "search") {
                    q.filter.insert(
                        field.to_string(),
                        Condition::Like {
                            pattern: format!("%{}%", value),
                            case_insensitive: !config.use_like,
                        },
                    );
                }
            }
            q.attributes = info.param("attributes").and_then(parse_attributes);
            if info.id.is_some() || config.include_relations_in_get_all {
                q.include = include;
            }
        }
        Method::POST => {
            q.returning = true;
            q.include = include;
        }
        Method::DELETE => {
            q.limit = Some(1);
        }
        _ => {
            q.include = include;
        }
    }

    if let Some((field, value)) = &info.scope {
        q.filter.insert(field.clone(), Condition::Eq(value.clone()));
    }
    if let Some(id) = &info.id {
        q.filter.insert(primary_key.to_string(), Condition::Eq(id.clone()));
    }

    if let Some(hook) = &config.hooks.pre_query {
        hook(&mut q, info);
    }
    tracing::debug!(method = %info.method, query = ?q, "built query");
    q
}
