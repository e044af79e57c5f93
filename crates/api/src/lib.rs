//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the enrollment lifecycle
//! - Authentication middleware
//! - Error to response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use enrollo_db::EnrollmentRepository;
use enrollo_shared::{EnrollmentConfig, JwtService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Enrollment repository.
    pub enrollments: Arc<EnrollmentRepository>,
}

impl AppState {
    /// Builds the state from a connection and settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, jwt_service: JwtService, config: &EnrollmentConfig) -> Self {
        let enrollments = EnrollmentRepository::new(db.clone(), config);
        Self {
            db: Arc::new(db),
            jwt_service: Arc::new(jwt_service),
            enrollments: Arc::new(enrollments),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
