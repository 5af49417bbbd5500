//! Output statistics per poet: heatmap, yearly counts, period breakdowns.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use super::poet_name;
use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::graph::repository::OfficePeriod;

pub async fn heatmap(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Value>> {
    let name = poet_name(&raw)?;
    Ok(Json(json!(state.poets.heatmap(&name).await?)))
}

pub async fn annual_counts(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Value>> {
    let name = poet_name(&raw)?;
    Ok(Json(json!(state.poets.annual_counts(&name).await?)))
}

/// GET /api/poet_anshi_periods/{name}: works before, during and after the
/// An Lushan rebellion.
pub async fn anshi_periods(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Value>> {
    let name = poet_name(&raw)?;
    Ok(Json(state.poets.anshi_periods(&name).await?))
}

pub async fn office_periods(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Vec<OfficePeriod>>> {
    let name = poet_name(&raw)?;
    Ok(Json(state.poets.office_periods(&name).await?))
}
