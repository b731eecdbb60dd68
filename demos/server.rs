//! Demo server: mounts CRUD routes for one PostgreSQL table under /api/v1/<plural>.
//!
//! Env: DATABASE_URL, PORT, TABLE_CONFIG (TableInfo JSON; defaults to a `posts` table),
//! CONTROLLER_CONFIG (ControllerConfig JSON, optional).

use axum::Router;
use crud_controller::{crud_routes, ColumnInfo, ControllerConfig, Model, PgModel, TableInfo};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crud_controller=info".parse()?))
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/crud".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let table = match std::env::var("TABLE_CONFIG") {
        Ok(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        Err(_) => posts_table(),
    };
    let config = match std::env::var("CONTROLLER_CONFIG") {
        Ok(path) => ControllerConfig::from_json_file(path)?,
        Err(_) => ControllerConfig::default(),
    };

    let model = Arc::new(PgModel::new(pool, table));
    let mount = format!("/api/v1/{}", model.plural_name());
    let table = model.table();
    tracing::info!(
        table = %format!("{}.{}", table.schema, table.table),
        columns = table.columns.len(),
        relations = table.relations.len(),
        "serving table"
    );
    let app = Router::new().nest(&mount, crud_routes(model, config)?);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(mount = %mount, "listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn posts_table() -> TableInfo {
    TableInfo {
        name: "Post".into(),
        schema: "public".into(),
        table: "posts".into(),
        primary_key: "id".into(),
        columns: vec![
            ColumnInfo::new("id", "int8"),
            ColumnInfo::new("authorId", "int8"),
            ColumnInfo::new("title", "text"),
            ColumnInfo::new("description", "text"),
            ColumnInfo::new("createdAt", "timestamptz"),
        ],
        relations: Vec::new(),
    }
}
