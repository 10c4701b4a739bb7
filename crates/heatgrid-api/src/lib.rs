//! heatgrid-api — REST API for heatgrid.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/ping` | Liveness |
//! | GET | `/api/v1/classify/{hit}` | Classify a hit value (no memory) |
//! | GET | `/api/v1/servers` | List known servers |
//! | GET | `/api/v1/servers/{id}` | Get one server |
//! | POST | `/api/v1/servers/{id}/evaluate` | Evaluate a pushed reading |
//! | GET | `/api/v1/servers/{id}/live-status` | Read the sensor and evaluate |
//! | POST | `/api/v1/servers/{id}/reset` | Clear latches (needs `x-admin-token`) |
//! | GET | `/api/v1/route` | Current routing target |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use heatgrid_engine::ServerRegistry;
use heatgrid_sensor::SensorReader;

/// Header carrying the administrator token for privileged calls.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ServerRegistry>,
    pub reader: Arc<SensorReader>,
    /// Reset is refused when this is `None`.
    pub admin_token: Option<String>,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/ping", get(handlers::ping))
        .route("/classify/{hit}", get(handlers::classify_hit))
        .route("/servers", get(handlers::list_servers))
        .route("/servers/{id}", get(handlers::get_server))
        .route("/servers/{id}/evaluate", post(handlers::evaluate_server))
        .route("/servers/{id}/live-status", get(handlers::live_status))
        .route("/servers/{id}/reset", post(handlers::reset_server))
        .route("/route", get(handlers::route_target))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
