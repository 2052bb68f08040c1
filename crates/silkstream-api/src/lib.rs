//! Silkstream API Library
//!
//! HTTP handlers, the catalog services behind them, and application setup.

mod api_doc;
mod handlers;
pub mod services;
pub mod setup;
mod telemetry;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
