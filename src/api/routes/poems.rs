//! Poem search routes.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::utils::sanitize::clean_author_name;

/// `?title=&author=`; both optional.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

impl SearchParams {
    fn normalized(&self) -> (String, String) {
        (clean_author_name(&self.author), self.title.trim().to_string())
    }
}

/// GET /api/search_poem: full poems by `author` whose title contains `title`.
pub async fn search_poem(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let (author, title) = params.normalized();
    let poems = state.poets.search_poems(&author, &title).await?;
    Ok(Json(json!(poems)))
}

/// GET /api/search_poem_titles: titles only.
pub async fn search_poem_titles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<String>>> {
    let (author, title) = params.normalized();
    Ok(Json(state.poets.search_poem_titles(&author, &title).await?))
}
