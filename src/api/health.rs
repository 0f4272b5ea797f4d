use crate::database::MongoDB;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// "up", "down", or absent when no database is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(db: Option<web::Data<MongoDB>>) -> impl Responder {
    let database_up = match db {
        Some(db) => Some(db.health_check().await),
        None => None,
    };

    let healthy = database_up.unwrap_or(true);
    let body = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database_up.map(|up| if up { "up" } else { "down" }.to_string()),
        timestamp: chrono::Utc::now().timestamp(),
    };

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        log::warn!("⚠️  Health check: database unreachable");
        HttpResponse::ServiceUnavailable().json(body)
    }
}
