//! # fisco-api: HTTP Surface for the Fiscal Engine
//!
//! Thin Axum layer over `fisco-engine` and `fisco-nfe`. Handlers coerce
//! the JSON body, call one calculator and return its result; the engine
//! holds no mutable state, so requests never contend.
//!
//! ## API Surface
//!
//! | Prefix          | Module               | Domain                    |
//! |-----------------|----------------------|---------------------------|
//! | `/v1/calc/*`    | [`routes::calc`]     | DIFAL, ST, withholding, transition |
//! | `/v1/nfe/*`     | [`routes::nfe`]      | NFe extraction and reports |
//! | `/health/*`     | here                 | probes                    |
//! | `/openapi.json` | [`openapi`]          | generated document         |

pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::calc::router())
        .merge(routes::nfe::router())
        .merge(openapi::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. The engine is ready once state is built.
async fn readiness() -> &'static str {
    "ready"
}
