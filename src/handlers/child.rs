//! Nested child-resource handlers under `/:id/:child`. The parent row must exist; child queries
//! are scoped to `foreign_key = :id`.

use crate::error::CrudError;
use crate::handlers::resource::{
    apply_update, create_record, delete_record, list_records, read_record, update_fields,
};
use crate::middleware::ParsedBody;
use crate::query::{QueryDescriptor, RequestInfo};
use crate::state::{ChildState, ControllerState};
use axum::{
    extract::{Path, Query, State},
    http::Method,
    response::IntoResponse,
    Extension,
};

/// Resolve the child segment and check the parent row exists.
async fn scoped<'a>(state: &'a ControllerState, parent_id: &str, segment: &str) -> Result<&'a ChildState, CrudError> {
    let child = state
        .child(segment)
        .ok_or_else(|| CrudError::NotFound(format!("unknown resource '{}'", segment)))?;
    let pk = state.model.primary_key();
    let q = QueryDescriptor {
        attributes: Some(vec![pk.to_string()]),
        ..QueryDescriptor::default()
    }
    .eq(pk, parent_id);
    if state.model.find_one(&q).await?.is_none() {
        return Err(CrudError::NotFound(format!(
            "{} {} not found",
            state.model.singular_name(),
            parent_id
        )));
    }
    Ok(child)
}

pub async fn list_children(
    State(state): State<ControllerState>,
    Path((parent_id, segment)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CrudError> {
    let child = scoped(&state, &parent_id, &segment).await?;
    let info = RequestInfo::new(Method::GET)
        .with_params(params)
        .with_scope(&child.foreign_key, parent_id);
    list_records(child.model.as_ref(), &child.config, info).await
}

pub async fn read_child(
    State(state): State<ControllerState>,
    Path((parent_id, segment, id)): Path<(String, String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CrudError> {
    let child = scoped(&state, &parent_id, &segment).await?;
    let info = RequestInfo::new(Method::GET)
        .with_id(id)
        .with_params(params)
        .with_scope(&child.foreign_key, parent_id);
    read_record(child.model.as_ref(), &child.config, info).await
}

pub async fn create_child(
    State(state): State<ControllerState>,
    Path((parent_id, segment)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
    body: Option<Extension<ParsedBody>>,
) -> Result<impl IntoResponse, CrudError> {
    let child = scoped(&state, &parent_id, &segment).await?;
    let info = RequestInfo::new(Method::POST)
        .with_params(params)
        .with_scope(&child.foreign_key, parent_id);
    create_record(child.model.as_ref(), &child.config, info, body).await
}

pub async fn update_child(
    State(state): State<ControllerState>,
    Path((parent_id, segment, id)): Path<(String, String, String)>,
    Query(params): Query<Vec<(String, String)>>,
    body: Option<Extension<ParsedBody>>,
) -> Result<impl IntoResponse, CrudError> {
    let child = state
        .child(&segment)
        .ok_or_else(|| CrudError::NotFound(format!("unknown resource '{}'", segment)))?;
    let info = RequestInfo::new(Method::PUT)
        .with_id(id)
        .with_params(params)
        .with_scope(&child.foreign_key, parent_id.as_str());
    let fields = update_fields(child.model.as_ref(), &child.config, &info, body)?;
    let child = scoped(&state, &parent_id, &segment).await?;
    apply_update(child.model.as_ref(), &child.config, info, fields).await
}

pub async fn delete_child(
    State(state): State<ControllerState>,
    Path((parent_id, segment, id)): Path<(String, String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CrudError> {
    let child = scoped(&state, &parent_id, &segment).await?;
    let info = RequestInfo::new(Method::DELETE)
        .with_id(id)
        .with_params(params)
        .with_scope(&child.foreign_key, parent_id);
    delete_record(child.model.as_ref(), &child.config, info).await
}
