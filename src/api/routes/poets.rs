//! Poet lookup routes.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use super::poet_name;
use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::error::ServiceError;
use crate::graph::repository::Network;

/// Shown when no biography is on file.
pub const NO_BIO_PLACEHOLDER: &str = "暂无简介";

pub async fn list_poets(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let poets = state.poets.list_poets().await?;
    Ok(Json(json!(poets)))
}

/// GET /api/poet/{name}: record, biography, places, friends, first poem.
pub async fn get_poet(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Value>> {
    let name = poet_name(&raw)?;
    let Some(mut info) = state.poets.poet_info(&name).await? else {
        return Err(ServiceError::NotFound("poet not found".into()).into());
    };

    let (locations, relations, poems) = tokio::try_join!(
        state.poets.locations(&name),
        state.poets.friends(&name),
        state.poets.poems(&name, 1),
    )?;

    let bio = state.bios.get(&name).unwrap_or(NO_BIO_PLACEHOLDER);
    info.insert("bio".into(), json!(bio));

    Ok(Json(json!({
        "info": info,
        "locations": locations,
        "relations": relations,
        "poems": poems,
    })))
}

pub async fn get_poet_bio(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Value>> {
    let name = poet_name(&raw)?;
    let bio = state
        .bios
        .get(&name)
        .ok_or_else(|| ServiceError::NotFound("biography not found".into()))?;
    Ok(Json(json!({ "bio": bio })))
}

pub async fn get_poet_network(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Network>> {
    let name = poet_name(&raw)?;
    Ok(Json(state.poets.network(&name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::testing::*;
    use crate::bio::BioStore;
    use crate::graph::queries::*;
    use crate::graph::testing::MemoryGraph;
    use axum::http::StatusCode;

    const LI_BAI: &str = "%E6%9D%8E%E7%99%BD";

    fn li_bai_graph() -> MemoryGraph {
        MemoryGraph::new()
            .answer(
                POET_INFO,
                vec![json!({"name": "李白", "courtesy": "太白", "dynasty": "唐"})],
            )
            .answer(
                POET_LOCATIONS,
                vec![json!({"name": "长安", "lat": 34.26, "lon": 108.94})],
            )
            .answer(POET_FRIENDS, vec![json!({"name": "杜甫"}), json!({"name": "孟浩然"})])
            .answer(
                POET_POEMS,
                vec![json!({"title": "静夜思", "content": "床前明月光"})],
            )
    }

    #[tokio::test]
    async fn test_get_poet_assembles_profile() {
        let bios = BioStore::from_entries([("李白", "字太白。")]);
        let fx = fixture_with(li_bai_graph(), None, bios);
        let (status, body) = get_json(&fx.router, &format!("/api/poet/{LI_BAI}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["name"], "李白");
        assert_eq!(body["info"]["bio"], "字太白。");
        assert_eq!(body["relations"], json!(["杜甫", "孟浩然"]));
        assert_eq!(body["locations"][0]["name"], "长安");
        assert_eq!(body["poems"].as_array().unwrap().len(), 1);

        let limit = fx
            .graph
            .executed()
            .into_iter()
            .find(|q| q.statement == POET_POEMS)
            .unwrap()
            .parameters["limit"]
            .clone();
        assert_eq!(limit, json!(1));
    }

    #[tokio::test]
    async fn test_get_poet_without_bio_uses_placeholder() {
        let fx = fixture(li_bai_graph());
        let (_, body) = get_json(&fx.router, &format!("/api/poet/{LI_BAI}")).await;
        assert_eq!(body["info"]["bio"], NO_BIO_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_get_poet_normalizes_name() {
        let fx = fixture(li_bai_graph());
        // "[唐]李白"
        let (status, _) =
            get_json(&fx.router, "/api/poet/%5B%E5%94%90%5D%E6%9D%8E%E7%99%BD").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fx.graph.executed()[0].parameters["name"], json!("李白"));
    }

    #[tokio::test]
    async fn test_get_poet_unknown_is_404() {
        let fx = fixture(MemoryGraph::new());
        let (status, body) = get_json(&fx.router, "/api/poet/%E6%9D%9C%E7%94%AB").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "poet not found");
    }

    #[tokio::test]
    async fn test_get_poet_blank_name_is_400() {
        let fx = fixture(MemoryGraph::new());
        let (status, _) = get_json(&fx.router, "/api/poet/%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(fx.graph.executed().is_empty());
    }

    #[tokio::test]
    async fn test_graph_failure_is_500_without_details() {
        let fx = fixture(MemoryGraph::failing());
        let (status, body) = get_json(&fx.router, "/api/poets").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "graph query failed"}));
    }

    #[tokio::test]
    async fn test_list_poets() {
        let graph = MemoryGraph::new().answer(
            LIST_POETS,
            vec![json!({"name": "李白", "count": 3}), json!({"name": "杜甫", "count": 2})],
        );
        let fx = fixture(graph);
        let (status, body) = get_json(&fx.router, "/api/poets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[1]["name"], "杜甫");
    }

    #[tokio::test]
    async fn test_poet_bio() {
        let bios = BioStore::from_entries([("李白", "字太白。")]);
        let fx = fixture_with(MemoryGraph::new(), None, bios);
        let (status, body) = get_json(&fx.router, &format!("/api/poet_bio/{LI_BAI}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"bio": "字太白。"}));

        let (status, body) = get_json(&fx.router, "/api/poet_bio/%E6%9D%9C%E7%94%AB").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "biography not found"}));
    }

    #[tokio::test]
    async fn test_poet_network() {
        let graph = MemoryGraph::new().answer(
            POET_NETWORK,
            vec![
                json!({"source": "李白", "target": "杜甫", "relationship": "FRIEND_OF"}),
                json!({"source": "李白", "target": "汪伦", "relationship": "FRIEND_OF"}),
            ],
        );
        let fx = fixture(graph);
        let (status, body) = get_json(&fx.router, &format!("/api/poet_network/{LI_BAI}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(body["links"][1]["target"], "汪伦");
        assert_eq!(body["links"][0]["type"], "FRIEND_OF");
    }
}
