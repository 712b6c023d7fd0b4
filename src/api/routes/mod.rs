//! Route handlers for the REST API
//!
//! - [`tracks`] - search and download
//! - [`system`] - health and OpenAPI

mod system;
mod tracks;

pub use system::*;
pub use tracks::*;
