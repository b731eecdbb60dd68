//! Controller options. Plain-data options deserialize from JSON (camelCase keys); hooks, middleware
//! and child resources are attached in code.

use crate::config::{Hooks, Middleware};
use crate::error::ConfigError;
use crate::model::Model;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Default body-parser cap, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

/// Which route handlers get registered. `get` covers both list and get-one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandlerToggles {
    pub get: bool,
    pub put: bool,
    pub post: bool,
    pub delete: bool,
}

impl Default for HandlerToggles {
    fn default() -> Self {
        HandlerToggles {
            get: true,
            put: true,
            post: true,
            delete: true,
        }
    }
}

/// A nested resource served under `/:id/<segment>`, linked to the parent by `foreign_key`.
#[derive(Clone)]
pub struct ChildResource {
    pub segment: String,
    pub model: Arc<dyn Model>,
    pub foreign_key: String,
}

impl ChildResource {
    pub fn new(segment: impl Into<String>, model: Arc<dyn Model>, foreign_key: impl Into<String>) -> Self {
        ChildResource {
            segment: segment.into(),
            model,
            foreign_key: foreign_key.into(),
        }
    }
}

impl fmt::Debug for ChildResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildResource")
            .field("segment", &self.segment)
            .field("model", &self.model.name())
            .field("foreign_key", &self.foreign_key)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Allow an update body to change the primary key.
    pub allow_changing_primary_key: bool,
    /// Eager-load relationships on the list endpoint too.
    pub include_relations_in_get_all: bool,
    /// Skip the built-in JSON body parser; callers then provide a `ParsedBody` extension.
    pub disable_body_parser: bool,
    /// Envelope key override (pluralized for collections).
    pub override_output_name: Option<String>,
    /// Default page size when the request has no `limit`.
    pub limit: Option<u64>,
    /// Accepted for compatibility; not applied to responses.
    pub restricted_fields: BTreeSet<String>,
    /// Relations to eager-load. `None` means every relationship the model declares.
    pub relationships: Option<Vec<String>>,
    pub handlers: HandlerToggles,
    /// Case-sensitive `LIKE` for `search[...]`; turned off when the dialect has `ILIKE`.
    pub use_like: bool,
    pub body_limit: usize,
    #[serde(skip)]
    pub hooks: Hooks,
    #[serde(skip)]
    pub middleware: Middleware,
    #[serde(skip)]
    pub children: Vec<ChildResource>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            allow_changing_primary_key: false,
            include_relations_in_get_all: false,
            disable_body_parser: false,
            override_output_name: None,
            limit: None,
            restricted_fields: BTreeSet::new(),
            relationships: None,
            handlers: HandlerToggles::default(),
            use_like: true,
            body_limit: DEFAULT_BODY_LIMIT,
            hooks: Hooks::default(),
            middleware: Middleware::default(),
            children: Vec::new(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn with_child(mut self, child: ChildResource) -> Self {
        self.children.push(child);
        self
    }

    /// Envelope key: override name, else the model's own name.
    pub fn output_name(&self, model: &dyn Model, many: bool) -> String {
        match (&self.override_output_name, many) {
            (Some(name), true) => crate::case::pluralize(name),
            (Some(name), false) => name.clone(),
            (None, true) => model.plural_name(),
            (None, false) => model.singular_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ControllerConfig::default();
        assert!(!c.allow_changing_primary_key);
        assert!(!c.include_relations_in_get_all);
        assert!(!c.disable_body_parser);
        assert!(c.use_like);
        assert_eq!(c.handlers, HandlerToggles::default());
        assert_eq!(c.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let c = ControllerConfig::from_json_str(
            r#"{
                "allowChangingPrimaryKey": true,
                "overrideOutputName": "article",
                "limit": 50,
                "restrictedFields": ["password"],
                "handlers": { "delete": false }
            }"#,
        )
        .unwrap();
        assert!(c.allow_changing_primary_key);
        assert_eq!(c.override_output_name.as_deref(), Some("article"));
        assert_eq!(c.limit, Some(50));
        assert!(c.restricted_fields.contains("password"));
        assert!(c.handlers.get && c.handlers.put && c.handlers.post);
        assert!(!c.handlers.delete);
        assert!(c.use_like);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = ControllerConfig::from_json_str(r#"{ "limit": "ten" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
