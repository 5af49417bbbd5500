//! Graph database access.
//!
//! Handlers never build query text. They call [`PoetRepository`], which picks
//! a fixed statement from [`queries`] and binds every user-supplied value as a
//! parameter before handing it to a [`GraphStore`].

pub mod neo4j;
pub mod queries;
pub mod repository;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

pub use neo4j::Neo4jStore;
pub use repository::PoetRepository;

/// One result row: column name -> value.
pub type Row = Map<String, Value>;

/// A parameterized read-only statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub statement: &'static str,
    pub parameters: Map<String, Value>,
}

impl Query {
    pub fn new(statement: &'static str) -> Self {
        Self {
            statement,
            parameters: Map::new(),
        }
    }

    /// Bind `$key` to `value`.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

/// A store that executes parameterized statements.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn run(&self, query: &Query) -> Result<Vec<Row>>;
}
