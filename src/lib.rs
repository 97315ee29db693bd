// Library exports for the server binary and tests
pub mod api;
pub mod auth;
pub mod background;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod query;
pub mod rate_limit;
pub mod sanitize;
pub mod store;
pub mod utils;
pub mod validation;
