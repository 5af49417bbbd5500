//! HTTP surface: router, handlers and error mapping.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{build_router, start_server, AppState};
