//! The service seam the launcher drives
//!
//! The terminology web application plugs in through [`TerminologyService`]:
//! it hands the launcher its routes and gets a single `cleanup` call after
//! the server has stopped, where it flushes whatever state it holds.

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};

/// A web service the launcher can run
#[async_trait]
pub trait TerminologyService: Send + Sync + 'static {
    /// Routes served until shutdown.
    fn router(&self) -> Router;

    /// Flush state after the server stopped. Called once.
    async fn cleanup(&self) -> anyhow::Result<()>;
}

/// Service exposing database health; cleanup closes the pool.
#[derive(Clone)]
pub struct DatabaseService {
    db: MySqlPool,
}

impl DatabaseService {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TerminologyService for DatabaseService {
    fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .with_state(self.db.clone())
    }

    async fn cleanup(&self) -> anyhow::Result<()> {
        self.db.close().await;
        info!("Database pool closed");
        Ok(())
    }
}

/// Health check handler
async fn health_check(State(db): State<MySqlPool>) -> Result<Response, StatusCode> {
    match sqlx::query("SELECT 1").fetch_one(&db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
