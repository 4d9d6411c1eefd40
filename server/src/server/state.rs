//! Shared application state handed to every handler.

use crate::orchestrator::Orchestrator;
use skybook_core::stores::FlightStore;
use skybook_core::SeatCache;
use skybook_engine::InventoryEngine;
use std::sync::Arc;

/// Everything the HTTP handlers dispatch onto.
///
/// Built once in the composition root; cloning is cheap (all `Arc`s).
#[derive(Clone)]
pub struct AppState {
    /// The booking orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// The inventory engine (inventory HTTP surface).
    pub engine: Arc<InventoryEngine>,
    /// Flight reads for availability read-through.
    pub flights: Arc<dyn FlightStore>,
    /// The seat cache for availability queries.
    pub cache: Arc<dyn SeatCache>,
}

impl AppState {
    /// Bundles the shared components.
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        engine: Arc<InventoryEngine>,
        flights: Arc<dyn FlightStore>,
        cache: Arc<dyn SeatCache>,
    ) -> Self {
        Self {
            orchestrator,
            engine,
            flights,
            cache,
        }
    }
}
