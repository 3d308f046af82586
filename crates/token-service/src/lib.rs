//! Token Issuer Service Library
//!
//! Mints signed, time-bounded room tokens for the Relay Chat room service.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `errors` - Error types and their HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP middleware (request metrics)
//! - `models` - Request/response bodies
//! - `observability` - Metrics and log-safe hashing
//! - `routes` - Router and application state
//! - `services` - Token issuance

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
