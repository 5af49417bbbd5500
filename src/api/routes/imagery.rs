//! Imagery (意象) frequency routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::poet_name;
use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::graph::queries::PeriodCondition;
use crate::utils::sanitize::clean_author_name;

/// Poet used by `/api/poem_imagery` when none is given.
pub const DEFAULT_IMAGERY_POET: &str = "白居易";

/// `poet` value meaning the whole corpus.
pub const ALL_POETS: &str = "all";

#[derive(Debug, Default, Deserialize)]
pub struct PoetParam {
    pub poet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CondParam {
    #[serde(default)]
    pub cond: String,
}

pub async fn poem_imagery(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PoetParam>,
) -> ApiResult<Json<Value>> {
    let poet = params
        .poet
        .as_deref()
        .map(clean_author_name)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGERY_POET.to_string());
    Ok(Json(json!(state.poets.poem_imagery(&poet).await?)))
}

/// GET /api/imagery_cloud: one poet's imagery, or the corpus with `poet=all`.
pub async fn imagery_cloud(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PoetParam>,
) -> ApiResult<Json<Vec<Value>>> {
    let poet = params
        .poet
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != ALL_POETS)
        .map(clean_author_name);
    Ok(Json(state.poets.imagery_cloud(poet.as_deref()).await?))
}

/// GET /api/period_imagery/{name}?cond=: imagery before or after 755.
pub async fn period_imagery(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    Query(params): Query<CondParam>,
) -> ApiResult<Json<Vec<Value>>> {
    let name = poet_name(&raw)?;
    let cond = PeriodCondition::parse(&params.cond);
    Ok(Json(state.poets.period_imagery(&name, cond).await?))
}
