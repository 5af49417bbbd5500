//! Neo4j client over the HTTP transactional endpoint.
//!
//! Each [`Query`] is sent as a single auto-commit transaction to
//! `{uri}/db/{database}/tx/commit`. Rows come back as positional arrays and
//! are zipped with the column list into JSON objects.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::GraphConfig;
use crate::error::{Result, ServiceError};

use super::{GraphStore, Query, Row};

/// Neo4j HTTP API store.
pub struct Neo4jStore {
    endpoint: String,
    user: String,
    password: String,
    client: Client,
}

impl std::fmt::Debug for Neo4jStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jStore")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

impl Neo4jStore {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServiceError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.uri.trim_end_matches('/'),
                config.database
            ),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Convert a commit response body into rows of the first statement.
fn rows_from_response(resp: CommitResponse) -> Result<Vec<Row>> {
    if let Some(err) = resp.errors.first() {
        return Err(ServiceError::Graph(format!("{}: {}", err.code, err.message)));
    }
    let Some(result) = resp.results.into_iter().next() else {
        return Ok(Vec::new());
    };
    let columns = result.columns;
    Ok(result
        .data
        .into_iter()
        .map(|d| columns.iter().cloned().zip(d.row).collect::<Row>())
        .collect())
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn run(&self, query: &Query) -> Result<Vec<Row>> {
        let body = json!({ "statements": [query] });
        let resp = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json;charset=UTF-8")
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Graph(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Graph(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: CommitResponse = resp
            .json()
            .await
            .map_err(|e| ServiceError::Graph(format!("malformed response: {e}")))?;
        let rows = rows_from_response(parsed)?;
        debug!(rows = rows.len(), "Graph query finished");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: Value) -> Result<Vec<Row>> {
        rows_from_response(serde_json::from_value(raw).unwrap())
    }

    #[test]
    fn test_rows_zip_columns() {
        let rows = parse(json!({
            "results": [{
                "columns": ["name", "count"],
                "data": [
                    {"row": ["李白", 1000], "meta": [null, null]},
                    {"row": ["杜甫", 1400], "meta": [null, null]}
                ]
            }],
            "errors": []
        }))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("李白"));
        assert_eq!(rows[1]["count"], json!(1400));
    }

    #[test]
    fn test_errors_become_graph_error() {
        let err = parse(json!({
            "results": [],
            "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad"}]
        }))
        .unwrap_err();
        assert!(matches!(err, ServiceError::Graph(_)));
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[test]
    fn test_empty_results() {
        assert!(parse(json!({"results": [], "errors": []})).unwrap().is_empty());
    }

    #[test]
    fn test_endpoint_from_config() {
        let cfg = GraphConfig {
            uri: "http://graph:7474/".into(),
            database: "poems".into(),
            password: "s3cret".into(),
            ..GraphConfig::default()
        };
        let store = Neo4jStore::new(&cfg).unwrap();
        assert_eq!(store.endpoint(), "http://graph:7474/db/poems/tx/commit");
        assert!(!format!("{store:?}").contains("s3cret"));
    }
}
