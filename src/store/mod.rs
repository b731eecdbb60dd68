//! PostgreSQL implementation of `Model`.

mod postgres;
mod table;
pub use postgres::{map_db_error, PgModel};
pub use table::*;
