//! Data models for the application
//!
//! Persisted records, query parameters and the request/response shapes of the
//! HTTP surface.

mod batch;
mod favorite;
mod query;
mod tag;
mod video;

pub use batch::*;
pub use favorite::*;
pub use query::*;
pub use tag::*;
pub use video::*;
