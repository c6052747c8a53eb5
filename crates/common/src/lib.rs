//! TalentForge Common Library
//!
//! Shared code behind the TalentForge gateway:
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Database entities and tenant-scoped repository helpers
//! - Validation rules and pagination
//! - One service per resource, including session plan allocation
//! - Metrics

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod pagination;
pub mod services;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::DbPool;
pub use errors::{AppError, Result};
pub use pagination::{Page, PageParams, Paged};
pub use validation::Check;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
