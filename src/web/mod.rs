//! HTTP surface over the catalog.

pub mod error;
pub mod functions;
pub mod middleware;
pub mod routes;
pub mod status;
pub mod strings;
pub mod wiki;

pub use routes::*;
