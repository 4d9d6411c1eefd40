//! HTTP server assembly: shared state, router, health probes.

mod health;
mod routes;
mod state;

pub use health::{health_check, readiness_check};
pub use routes::build_router;
pub use state::AppState;
