//! Controller factory: validates the model, resolves config, and builds a mountable Router with
//! `GET|POST /` and `GET|PUT|DELETE /:id`, plus `/:id/:child[/:child_id]` when children are configured.

use crate::case::is_identifier;
use crate::config::ControllerConfig;
use crate::error::CrudError;
use crate::handlers::{
    create, create_child, delete, delete_child, list, list_children, read, read_child, update, update_child,
};
use crate::middleware::{parse_json_body, BodyLimit};
use crate::model::Model;
use crate::state::{ChildState, ControllerState};
use axum::{
    extract::Request,
    middleware::{from_fn, from_fn_with_state, map_response, Next},
    response::Response,
    routing::MethodRouter,
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;

fn validate_model(model: &dyn Model) -> Result<(), CrudError> {
    if !is_identifier(model.name()) {
        return Err(CrudError::InvalidModel(format!("model name '{}' is not an identifier", model.name())));
    }
    if !is_identifier(model.primary_key()) {
        return Err(CrudError::InvalidModel(format!(
            "model '{}' has invalid primary key '{}'",
            model.name(),
            model.primary_key()
        )));
    }
    Ok(())
}

/// Fill defaults that depend on the model.
fn resolve_config(model: &dyn Model, mut config: ControllerConfig) -> ControllerConfig {
    if config.relationships.is_none() {
        config.relationships = Some(model.relationships());
    }
    if model.dialect().has_case_insensitive_like() {
        config.use_like = false;
    }
    config
}

fn resolve_children(parent: &ControllerConfig) -> Result<HashMap<String, ChildState>, CrudError> {
    let mut out = HashMap::new();
    for child in &parent.children {
        validate_model(child.model.as_ref())?;
        if child.segment.is_empty() || child.segment.contains('/') {
            return Err(CrudError::InvalidModel(format!("invalid child segment '{}'", child.segment)));
        }
        if !is_identifier(&child.foreign_key) {
            return Err(CrudError::InvalidModel(format!(
                "child '{}' has invalid foreign key '{}'",
                child.segment, child.foreign_key
            )));
        }
        let config = ControllerConfig {
            override_output_name: None,
            relationships: None,
            children: Vec::new(),
            ..parent.clone()
        };
        let state = ChildState {
            model: child.model.clone(),
            foreign_key: child.foreign_key.clone(),
            config: Arc::new(resolve_config(child.model.as_ref(), config)),
        };
        if out.insert(child.segment.clone(), state).is_some() {
            return Err(CrudError::InvalidModel(format!("duplicate child segment '{}'", child.segment)));
        }
    }
    Ok(out)
}

fn add_route(
    router: Router<ControllerState>,
    path: &str,
    methods: MethodRouter<ControllerState>,
    enabled: bool,
) -> Router<ControllerState> {
    if enabled {
        router.route(path, methods)
    } else {
        router
    }
}

/// Build the CRUD router for `model`. Fails with `InvalidModel` at construction, never per request.
pub fn crud_routes(model: Arc<dyn Model>, config: ControllerConfig) -> Result<Router, CrudError> {
    validate_model(model.as_ref())?;
    let children = resolve_children(&config)?;
    let config = resolve_config(model.as_ref(), config);
    let h = config.handlers;

    let mut collection = MethodRouter::new();
    let mut item = MethodRouter::new();
    if h.get {
        collection = collection.get(list);
        item = item.get(read);
    }
    if h.post {
        collection = collection.post(create);
    }
    if h.put {
        item = item.put(update);
    }
    if h.delete {
        item = item.delete(delete);
    }
    let mut router = Router::new();
    router = add_route(router, "/", collection, h.get || h.post);
    router = add_route(router, "/:id", item, h.get || h.put || h.delete);

    if !children.is_empty() {
        let mut nested = MethodRouter::new();
        let mut nested_item = MethodRouter::new();
        if h.get {
            nested = nested.get(list_children);
            nested_item = nested_item.get(read_child);
        }
        if h.post {
            nested = nested.post(create_child);
        }
        if h.put {
            nested_item = nested_item.put(update_child);
        }
        if h.delete {
            nested_item = nested_item.delete(delete_child);
        }
        router = add_route(router, "/:id/:child", nested, h.get || h.post);
        router = add_route(router, "/:id/:child/:child_id", nested_item, h.get || h.put || h.delete);
    }

    for mw in config.middleware.post.iter().cloned() {
        router = router.layer(map_response(move |res: Response| mw(res)));
    }
    for mw in config.middleware.pre.iter().rev().cloned() {
        router = router.layer(from_fn(move |req: Request, next: Next| mw(req, next)));
    }
    if !config.disable_body_parser {
        router = router.layer(from_fn_with_state(BodyLimit(config.body_limit), parse_json_body));
    }

    tracing::info!(
        model = model.name(),
        children = ?children.keys().collect::<Vec<_>>(),
        handlers = ?h,
        "crud routes registered"
    );
    let state = ControllerState {
        model,
        config: Arc::new(config),
        children: Arc::new(children),
    };
    Ok(router.with_state(state))
}
