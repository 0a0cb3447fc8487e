//! HTTP endpoint layer.
//!
//! - [`routes`]: request/response types, route handlers, CORS wiring

pub mod routes;
