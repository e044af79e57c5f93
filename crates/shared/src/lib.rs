//! Shared types, errors, and configuration for Enrollo.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - JWT claims issued by the identity provider

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, EnrollmentConfig};
pub use error::AppError;
pub use jwt::{JwtConfig, JwtError, JwtService};
