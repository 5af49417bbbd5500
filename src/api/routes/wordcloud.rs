//! Word cloud of a poet's works, as base64 PNG text.

use axum::extract::{Path, State};
use std::sync::Arc;
use tracing::warn;

use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::utils::sanitize::clean_author_name;

/// GET /wordcloud/{name}
///
/// Any failure (unknown poet, graph error, missing font) yields the
/// placeholder image rather than an error status.
pub async fn get_wordcloud(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<String> {
    let name = clean_author_name(&raw);
    let contents = match state.poets.poem_contents(&name).await {
        Ok(c) if !c.is_empty() => c,
        Ok(_) => {
            warn!(poet = %name, "No poems found for word cloud");
            return Ok(state.wordcloud.placeholder()?);
        }
        Err(e) => {
            warn!(poet = %name, "Word cloud query failed: {e}");
            return Ok(state.wordcloud.placeholder()?);
        }
    };
    Ok(Arc::clone(&state.wordcloud)
        .render_base64(&name, contents)
        .await?)
}
