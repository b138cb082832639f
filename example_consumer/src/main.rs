//! Example consumer: serves CRUD routes for one PostgreSQL table.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Env: DATABASE_URL, CRUD_TABLE_CONFIG (JSON table definition), LISTEN_ADDR.
//! Callers identify themselves with `X-User-Id`; rows are scoped to `owner_id`.

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use crud_handlers::{common_routes, crud_routes, CrudOptions, MemoryCache, PgModel, RequestUser, TableDef};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

/// Stand-in for real auth: trusts the `X-User-Id` header.
async fn attach_user(mut req: Request, next: Next) -> Response {
    let uid = req
        .headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok());
    if let Some(uid) = uid {
        req.extensions_mut()
            .insert(RequestUser::new().with("uid", serde_json::json!(uid)));
    }
    next.run(req).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crud_handlers=info,example_consumer=info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/crud".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let table_path = std::env::var("CRUD_TABLE_CONFIG").unwrap_or_else(|_| "table.json".into());
    let table: TableDef = serde_json::from_str(&tokio::fs::read_to_string(&table_path).await?)?;
    let segment = format!("/api/v1/{}", table.table);
    let model = Arc::new(PgModel::new(pool, table)?);

    let options = CrudOptions::default()
        .scoped_to_user("owner_id", "uid")
        .with_cache(Arc::new(MemoryCache::new(1024).with_ttl(Duration::from_secs(30))))
        .verbose(true);

    let app = Router::new()
        .merge(common_routes())
        .nest(&segment, crud_routes(model, options)?)
        .layer(middleware::from_fn(attach_user))
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("serving {} on http://{}", segment, listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
