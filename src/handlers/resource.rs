//! Resource handlers: list, read, create, update, delete.
//! Each one builds a query, calls the model, then shapes the envelope or maps the error.

use crate::config::ControllerConfig;
use crate::error::{CrudError, FieldError, HookError};
use crate::middleware::ParsedBody;
use crate::model::{Model, Record};
use crate::query::{build_query, RequestInfo};
use crate::response::{deleted, format_many, format_one};
use crate::state::ControllerState;
use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{Map, Value};

/// Payload under the model's singular key, e.g. `{ "post": { ... } }`.
pub(crate) fn payload(
    body: Option<Extension<ParsedBody>>,
    model: &dyn Model,
) -> Result<Map<String, Value>, CrudError> {
    let key = model.singular_name();
    let missing = || CrudError::BadRequest(format!("request body must contain a '{}' object", key));
    match body {
        Some(Extension(ParsedBody(Value::Object(mut root)))) => match root.remove(&key) {
            Some(Value::Object(fields)) => Ok(fields),
            _ => Err(missing()),
        },
        _ => Err(missing()),
    }
}

/// Whether a body key value names the same row as `expected`. Numbers compare numerically, so
/// `1`, `1.0` and `"01"` all match a path id of `1`.
fn same_key(v: &Value, expected: &str) -> bool {
    let text = match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text == expected {
        return true;
    }
    if let (Ok(a), Ok(b)) = (text.parse::<i64>(), expected.parse::<i64>()) {
        return a == b;
    }
    match (text.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.is_finite() && a == b,
        _ => false,
    }
}

/// Reject a body that would move the row to a different key.
fn ensure_key_unchanged(
    fields: &Map<String, Value>,
    field: &str,
    expected: &str,
    config: &ControllerConfig,
) -> Result<(), CrudError> {
    if config.allow_changing_primary_key {
        return Ok(());
    }
    match fields.get(field) {
        Some(v) if !same_key(v, expected) => Err(CrudError::ValidationFailed(vec![FieldError::on_field(
            field,
            format!("{} cannot be changed", field),
        )])),
        _ => Ok(()),
    }
}

fn hook_failed(stage: &'static str, err: HookError) -> CrudError {
    tracing::warn!(hook = stage, error = %err, "hook failed");
    CrudError::Unknown(err.to_string())
}

pub(crate) async fn list_records(
    model: &dyn Model,
    config: &ControllerConfig,
    info: RequestInfo,
) -> Result<Response, CrudError> {
    let q = build_query(&info, model.primary_key(), config);
    let rows = model
        .find_all(&q)
        .await
        .map_err(|e| CrudError::from(e).generic())?;
    Ok((StatusCode::OK, Json(format_many(rows, model, config))).into_response())
}

pub(crate) async fn read_record(
    model: &dyn Model,
    config: &ControllerConfig,
    info: RequestInfo,
) -> Result<Response, CrudError> {
    let id = info.id.clone().unwrap_or_default();
    let q = build_query(&info, model.primary_key(), config);
    let row = model
        .find_one(&q)
        .await?
        .ok_or_else(|| CrudError::NotFound(format!("{} {} not found", model.singular_name(), id)))?;
    Ok((StatusCode::OK, Json(format_one(row, model, config))).into_response())
}

pub(crate) async fn create_record(
    model: &dyn Model,
    config: &ControllerConfig,
    info: RequestInfo,
    body: Option<Extension<ParsedBody>>,
) -> Result<Response, CrudError> {
    let mut fields = payload(body, model)?;
    if let Some((fk, parent_id)) = &info.scope {
        fields.insert(fk.clone(), Value::String(parent_id.clone()));
    }
    let q = build_query(&info, model.primary_key(), config);
    let created = model.create(Record::new(fields), &q).await?;
    if let Some(hook) = &config.hooks.after_create {
        hook(model, &created).map_err(|e| hook_failed("after_create", e))?;
    }
    Ok((StatusCode::CREATED, Json(format_one(created, model, config))).into_response())
}

/// Payload checks that need no storage access: the body shape, then the primary key and (for child
/// routes) the parent key.
pub(crate) fn update_fields(
    model: &dyn Model,
    config: &ControllerConfig,
    info: &RequestInfo,
    body: Option<Extension<ParsedBody>>,
) -> Result<Map<String, Value>, CrudError> {
    let id = info.id.as_deref().unwrap_or_default();
    let fields = payload(body, model)?;
    ensure_key_unchanged(&fields, model.primary_key(), id, config)?;
    if let Some((fk, parent_id)) = &info.scope {
        ensure_key_unchanged(&fields, fk, parent_id, config)?;
    }
    Ok(fields)
}

/// Load, apply `fields`, run the update hooks around `save`. Expects fields checked by `update_fields`.
pub(crate) async fn apply_update(
    model: &dyn Model,
    config: &ControllerConfig,
    info: RequestInfo,
    fields: Map<String, Value>,
) -> Result<Response, CrudError> {
    let id = info.id.clone().unwrap_or_default();
    let pk = model.primary_key();
    let q = build_query(&info, pk, config);
    let mut record = model
        .find_one(&q)
        .await
        .map_err(|e| CrudError::from(e).on_update())?
        .ok_or_else(|| CrudError::NotFound(format!("{} {} not found", model.singular_name(), id)))?;
    let key = record.get(pk).cloned().unwrap_or(Value::String(id));
    for (field, value) in fields {
        record.set(field, value);
    }
    if let Some(hook) = &config.hooks.before_update {
        hook(model, &mut record).map_err(|e| hook_failed("before_update", e))?;
    }
    let saved = model
        .save(&key, &record)
        .await
        .map_err(|e| CrudError::from(e).on_update())?;
    if let Some(hook) = &config.hooks.after_update {
        hook(model, &saved).map_err(|e| hook_failed("after_update", e))?;
    }
    Ok((StatusCode::OK, Json(format_one(saved, model, config))).into_response())
}

/// Always 200: a delete matching no row is not reported as missing.
pub(crate) async fn delete_record(
    model: &dyn Model,
    config: &ControllerConfig,
    info: RequestInfo,
) -> Result<Response, CrudError> {
    let q = build_query(&info, model.primary_key(), config);
    let affected = model.destroy(&q).await?;
    if affected == 0 {
        tracing::debug!(model = model.name(), id = ?info.id, "delete matched no rows");
    }
    Ok((StatusCode::OK, Json(deleted())).into_response())
}

pub async fn list(
    State(state): State<ControllerState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CrudError> {
    let info = RequestInfo::new(Method::GET).with_params(params);
    list_records(state.model.as_ref(), &state.config, info).await
}

pub async fn read(
    State(state): State<ControllerState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CrudError> {
    let info = RequestInfo::new(Method::GET).with_id(id).with_params(params);
    read_record(state.model.as_ref(), &state.config, info).await
}

pub async fn create(
    State(state): State<ControllerState>,
    Query(params): Query<Vec<(String, String)>>,
    body: Option<Extension<ParsedBody>>,
) -> Result<impl IntoResponse, CrudError> {
    let info = RequestInfo::new(Method::POST).with_params(params);
    create_record(state.model.as_ref(), &state.config, info, body).await
}

pub async fn update(
    State(state): State<ControllerState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    body: Option<Extension<ParsedBody>>,
) -> Result<impl IntoResponse, CrudError> {
    let info = RequestInfo::new(Method::PUT).with_id(id).with_params(params);
    let fields = update_fields(state.model.as_ref(), &state.config, &info, body)?;
    apply_update(state.model.as_ref(), &state.config, info, fields).await
}

pub async fn delete(
    State(state): State<ControllerState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CrudError> {
    let info = RequestInfo::new(Method::DELETE).with_id(id).with_params(params);
    delete_record(state.model.as_ref(), &state.config, info).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn key_comparison_is_textual() {
        let config = ControllerConfig::default();
        assert!(ensure_key_unchanged(&fields(json!({ "id": 1 })), "id", "1", &config).is_ok());
        assert!(ensure_key_unchanged(&fields(json!({ "id": "1" })), "id", "1", &config).is_ok());
        assert!(ensure_key_unchanged(&fields(json!({ "title": "x" })), "id", "1", &config).is_ok());
        let err = ensure_key_unchanged(&fields(json!({ "id": 2 })), "id", "1", &config).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.errors()[0].field.as_deref(), Some("id"));
    }

    #[test]
    fn numeric_keys_compare_by_value() {
        let config = ControllerConfig::default();
        assert!(ensure_key_unchanged(&fields(json!({ "id": 1.0 })), "id", "1", &config).is_ok());
        assert!(ensure_key_unchanged(&fields(json!({ "id": 1 })), "id", "01", &config).is_ok());
        assert!(ensure_key_unchanged(&fields(json!({ "id": "7" })), "id", "7.0", &config).is_ok());
        assert!(ensure_key_unchanged(&fields(json!({ "id": 1.5 })), "id", "1", &config).is_err());
        assert!(ensure_key_unchanged(&fields(json!({ "id": "abc" })), "id", "ABC", &config).is_err());
    }

    #[test]
    fn key_change_allowed_by_config() {
        let config = ControllerConfig {
            allow_changing_primary_key: true,
            ..ControllerConfig::default()
        };
        assert!(ensure_key_unchanged(&fields(json!({ "id": 2 })), "id", "1", &config).is_ok());
    }
}
