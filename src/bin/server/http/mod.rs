//! Thin JSON REST surface over [`content_core::Service`].
//!
//! Routing, JSON encoding, and CORS are kept here as the external collaborator the
//! core is embedded into, wiring an axum `AppState` around the domain service.

pub mod error_response;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use content_core::Service;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
}

pub fn app(state: AppState) -> axum::Router {
    routes::router(state)
}
