//! HTTP handlers for the resource and its child resources.

pub mod child;
pub mod resource;
pub use child::*;
pub use resource::{create, delete, list, read, update};
