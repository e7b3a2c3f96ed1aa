//! HTTP
//!
//! Routes and handlers.

pub mod handlers;
pub mod routes;
