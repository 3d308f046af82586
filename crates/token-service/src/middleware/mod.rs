//! HTTP middleware for the Token Issuer.

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
