//! HTTP 接入层：把 JSON 请求转交给会话编排器
//!
//! - `POST /api/turn`：处理一轮对话
//! - `POST /api/sessions/:id/context`：合并行程上下文
//! - `GET /api/sessions/:id/preferences`：读取偏好
//! - `POST /api/sessions/:id/feedback`：记录商家反馈
//! - `GET /api/health`：健康检查（内存回退时仍返回 200，状态写在 body 的 `status` 中）
//!
//! 客户端断开时 axum 丢弃处理 future，进行中的检索随之放弃。

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::conversation::TurnResponse;
use crate::core::{HealthReport, SessionOrchestrator, TurnRequest};
use crate::session::{JourneyContext, Preferences};

pub type SharedOrchestrator = Arc<SessionOrchestrator>;

/// POST /api/sessions/:id/feedback 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub business_id: String,
    pub rating: i32,
    #[serde(rename = "type", default = "default_feedback_type")]
    pub feedback_type: String,
}

fn default_feedback_type() -> String {
    "rating".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
}

pub fn create_router(orchestrator: SharedOrchestrator) -> Router {
    Router::new()
        .route("/api/turn", post(api_turn))
        .route("/api/sessions/:id/context", post(api_update_context))
        .route("/api/sessions/:id/preferences", get(api_preferences))
        .route("/api/sessions/:id/feedback", post(api_feedback))
        .route("/api/health", get(api_health))
        .with_state(orchestrator)
}

async fn api_turn(
    State(orchestrator): State<SharedOrchestrator>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, (StatusCode, String)> {
    if request.session_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "session_id is required".to_string()));
    }
    Ok(Json(orchestrator.process_turn(request).await))
}

async fn api_update_context(
    State(orchestrator): State<SharedOrchestrator>,
    Path(session_id): Path<String>,
    Json(partial): Json<JourneyContext>,
) -> Json<Ack> {
    let ok = orchestrator.update_context(&session_id, partial).await;
    Json(Ack {
        ok,
        message: if ok {
            "Context updated successfully".to_string()
        } else {
            "Context update failed".to_string()
        },
    })
}

async fn api_preferences(
    State(orchestrator): State<SharedOrchestrator>,
    Path(session_id): Path<String>,
) -> Json<Preferences> {
    Json(orchestrator.store().get_preferences(&session_id).await)
}

async fn api_feedback(
    State(orchestrator): State<SharedOrchestrator>,
    Path(session_id): Path<String>,
    Json(req): Json<FeedbackRequest>,
) -> Json<Ack> {
    let ok = orchestrator
        .store()
        .record_feedback(&session_id, &req.business_id, req.rating, &req.feedback_type)
        .await;
    Json(Ack {
        ok,
        message: if ok {
            "Feedback recorded".to_string()
        } else {
            "Feedback not recorded".to_string()
        },
    })
}

async fn api_health(State(orchestrator): State<SharedOrchestrator>) -> Json<HealthReport> {
    Json(orchestrator.health().await)
}
