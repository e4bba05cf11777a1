//! Grading Server
//!
//! JSON over HTTP for the scenario store.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `POST` | `/scenario` | 201 new draft |
//! | `POST` | `/scenario/legacy` | 201 imported current scenario |
//! | `GET` | `/scenario?status=` | scenarios in creation order |
//! | `GET` | `/scenario/current` | current scenario, 404 when none |
//! | `GET` | `/scenario/compare?ids=a,b` | comparison table |
//! | `GET` | `/scenario/:id` | one scenario |
//! | `PUT` | `/scenario/:id` | re-derived draft |
//! | `PATCH` | `/scenario/:id` | renamed draft |
//! | `POST` | `/scenario/:id/apply` | new current scenario |
//! | `POST` | `/scenario/:id/archive` | archived draft |
//! | `POST` | `/scenario/:id/impact` | budget impact |
//! | `GET` | `/healthz` | liveness |

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod routes;

pub use config::{ListenerConfig, LogFormat, ServerConfig};
pub use error::{ApiError, ErrorBody};

use axum::routing::{get, post};
use axum::Router;
use grading_scenario::ScenarioStore;
use std::sync::Arc;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Scenario store
    pub store: Arc<ScenarioStore>,
}

impl AppState {
    /// Create state over a store
    #[inline]
    #[must_use]
    pub fn new(store: ScenarioStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/scenario", get(routes::list).post(routes::create))
        .route("/scenario/legacy", post(routes::import_legacy))
        .route("/scenario/current", get(routes::current))
        .route("/scenario/compare", get(routes::compare))
        .route(
            "/scenario/:id",
            get(routes::get_one).put(routes::update).patch(routes::rename),
        )
        .route("/scenario/:id/apply", post(routes::apply))
        .route("/scenario/:id/archive", post(routes::archive))
        .route("/scenario/:id/impact", post(routes::impact))
        .with_state(state)
}
