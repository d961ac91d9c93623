//! Library crate for roulette-back, exposing modules for binaries and integration tests.

pub mod config;
/// Persistence: documents, the store trait and its backends.
pub mod dao;
/// Request and response bodies of the REST API.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Axum routers and handlers.
pub mod routes;
/// Operations behind the routes.
pub mod services;
/// Shared application state and game rules.
pub mod state;
