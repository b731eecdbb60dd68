//! CRUD controller: generic list/read/create/update/delete routes over a storage model,
//! returned as a mountable axum `Router`.

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod query;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{ChildResource, ControllerConfig, HandlerToggles, Hooks, Middleware};
pub use error::{ConfigError, CrudError, FieldError, HookError, StorageError};
pub use middleware::ParsedBody;
pub use model::{Dialect, Model, Record};
pub use query::{build_query, Condition, QueryDescriptor, RequestInfo};
pub use response::{format_many, format_one};
pub use routes::crud_routes;
pub use state::ControllerState;
pub use store::{ColumnInfo, PgModel, RelationInfo, RelationKind, TableInfo};
