#![deny(missing_docs)]

//! Core library for Vector Proxy, a shared-secret HTTP front for a hosted document-search API.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Shared-secret gate for protected endpoints.
pub mod gate;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingest and query flows.
pub mod proxy;
/// Startup resolution of the vector store id.
pub mod resolver;
/// Upstream API client abstraction and HTTP implementation.
pub mod upstream;
