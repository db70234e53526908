use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use armbot_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

/// Readiness report: the only dependency worth probing here is the state
/// store, so the payload is a single database verdict plus a timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// Binds the health listener on its own port and serves it in the
/// background for the life of the process.
pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool)).await {
            tracing::error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let probe = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.db_pool).await;

    let payload = match probe {
        Ok(_) => HealthResponse {
            status: "ready",
            database: "ready",
            detail: None,
            checked_at: Utc::now().to_rfc3339(),
        },
        Err(error) => HealthResponse {
            status: "degraded",
            database: "degraded",
            detail: Some(format!("database query failed: {error}")),
            checked_at: Utc::now().to_rfc3339(),
        },
    };

    let status_code =
        if payload.status == "ready" { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
