//! shiyun: classical Chinese poetry knowledge-graph service.
//!
//! An axum server in front of a Neo4j poetry graph, with a content-addressed
//! cache of AI-generated ink-wash backgrounds, poet biographies read from a
//! spreadsheet, and word clouds of each poet's works.

pub mod api;
pub mod bio;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod ink;
pub mod providers;
pub mod utils;
pub mod wordcloud;

pub use error::{Result, ServiceError};
