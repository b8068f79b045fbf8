use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Greeting {
    #[serde(rename = "Hello")]
    pub hello: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Greeting kept for clients that probe the root path.
#[utoipa::path(
    get,
    path = "/",
    tag = "meta",
    responses((status = 200, description = "Service is up", body = Greeting))
)]
pub async fn root() -> impl IntoResponse {
    Json(Greeting {
        hello: "World".to_string(),
    })
}

/// Liveness probe - process is running.
#[utoipa::path(
    get,
    path = "/health",
    tag = "meta",
    responses((status = 200, description = "Process is alive", body = HealthResponse))
)]
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "alive".to_string(),
            service: "deckforge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
