//! Shared handler state. Built once by the controller factory and never mutated.

use crate::config::ControllerConfig;
use crate::model::Model;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct ControllerState {
    pub model: Arc<dyn Model>,
    pub config: Arc<ControllerConfig>,
    /// Child resources by path segment.
    pub children: Arc<HashMap<String, ChildState>>,
}

#[derive(Clone)]
pub struct ChildState {
    pub model: Arc<dyn Model>,
    /// Child column holding the parent's primary key.
    pub foreign_key: String,
    /// Parent config resolved against the child model (its relationships, no output override).
    pub config: Arc<ControllerConfig>,
}

impl ControllerState {
    pub fn child(&self, segment: &str) -> Option<&ChildState> {
        self.children.get(segment)
    }
}
