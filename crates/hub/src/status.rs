/// HTTP 路由处理器

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStatus {
    pub edge_id: u64,
    pub state: String,
    pub bridged_node_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub node_id: String,
    pub edges: Vec<EdgeStatus>,
    pub subscriptions: Vec<String>,
}

pub async fn root_handler() -> &'static str {
    "DirectMQ Hub"
}

pub async fn health_handler() -> &'static str {
    "OK"
}

/// 节点与连接状态
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let node = state.node();

    let edges = node
        .edges()
        .into_iter()
        .map(|edge| EdgeStatus {
            edge_id: edge.id.0,
            state: edge.state,
            bridged_node_id: edge.bridged_node_id,
        })
        .collect();

    Json(StatusResponse {
        node_id: node.host_id().to_string(),
        edges,
        subscriptions: node.subscribed_topics(),
    })
}
