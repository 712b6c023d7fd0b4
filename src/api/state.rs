//! Application state for the API server

use crate::{AcquisitionService, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The acquisition pipeline
    pub service: Arc<AcquisitionService>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<AcquisitionService>) -> Self {
        let config = service.config().clone();
        Self { service, config }
    }
}
