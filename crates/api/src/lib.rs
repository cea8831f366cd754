//! # `tic-api` - HTTP API gateway
//!
//! HTTP/REST entry point of the TIC GLOBAL platform.
//! Routes are built with `axum`; `utoipa` generates the OpenAPI 3.0
//! document served through Swagger UI.
//!
//! ## Responsibilities
//! - Accept requests from the web front-end and the back-office
//! - Authenticate JWTs and dispatch to the public / user / admin route groups
//! - Call the ports of `tic-core` (stores, notifier, cache) to do the work
//! - Convert domain models into DTOs for the front-end

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;
