//! 会话编排器：单轮控制循环
//!
//! 每轮：取得/创建会话 → 叠加行程上下文 → 补齐情绪 → 意图识别 → 回复分发 → 指令规划
//! → 写回交互历史 → 记录意图模式（舒适度调温时同步偏好）。
//! 任何内部失败都不向传输层抛出，而是给出低置信度的通用回复。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{AppConfig, StoreBackendKind};
use crate::conversation::{
    detect_emotion, trouble_reply, Action, ActionPlanner, ActionType, EmotionState, Intent,
    IntentClassifier, ResponseDispatcher, TurnContext, TurnResponse,
};
use crate::geo::GeoPoint;
use crate::places::PlaceService;
use crate::session::{Interaction, JourneyContext, PreferencesPatch, SessionId};
use crate::store::{BackendKind, ContextStore};

/// 单轮回复生成的总时限
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(10);

/// 传输层送来的一轮输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub text: String,
    /// 缺失时用关键词回退识别
    #[serde(default)]
    pub emotion: Option<EmotionState>,
    pub session_id: SessionId,
    #[serde(default)]
    pub context: TurnContext,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<SessionId>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotion: None,
            session_id: session_id.into(),
            context: TurnContext::default(),
        }
    }

    pub fn with_emotion(mut self, emotion: EmotionState) -> Self {
        self.emotion = Some(emotion);
        self
    }

    pub fn with_context(mut self, context: TurnContext) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub store_backend: BackendKind,
    pub store_ok: bool,
    pub timestamp: DateTime<Utc>,
}

pub struct SessionOrchestrator {
    store: Arc<ContextStore>,
    classifier: IntentClassifier,
    dispatcher: ResponseDispatcher,
    planner: ActionPlanner,
    /// 期望的后端；实际后端与之不符即为降级
    expected_backend: BackendKind,
    turn_timeout: Duration,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<ContextStore>,
        places: Arc<PlaceService>,
        default_location: GeoPoint,
    ) -> Self {
        let expected_backend = store.backend_kind();
        Self {
            store,
            classifier: IntentClassifier::new(),
            dispatcher: ResponseDispatcher::new(places, default_location),
            planner: ActionPlanner::new(),
            expected_backend,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }

    /// 按配置装配：连接上下文存储、构建带缓存的地点服务
    pub async fn from_config(cfg: &AppConfig) -> Self {
        let store = Arc::new(ContextStore::connect(&cfg.store).await);
        let places = Arc::new(PlaceService::from_config(&cfg.places).with_cache(store.clone()));

        let mut orchestrator = Self::new(store, places, cfg.vehicle.default_location());
        orchestrator.dispatcher = orchestrator.dispatcher.with_limit(cfg.places.default_limit);
        orchestrator.expected_backend = match cfg.store.backend {
            StoreBackendKind::Redis => BackendKind::Redis,
            StoreBackendKind::Memory => BackendKind::Memory,
        };
        orchestrator
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// 处理一轮对话；永不失败
    pub async fn process_turn(&self, request: TurnRequest) -> TurnResponse {
        let span = tracing::info_span!(
            "turn",
            request_id = %Uuid::new_v4(),
            session_id = %request.session_id,
        );
        self.run_turn(request).instrument(span).await
    }

    async fn run_turn(&self, request: TurnRequest) -> TurnResponse {
        let TurnRequest {
            text,
            emotion,
            session_id,
            context,
        } = request;

        let session = self.store.create_if_absent(&session_id).await;
        let context = TurnContext::layered(&session.journey_context, &context);
        let emotion = emotion.unwrap_or_else(|| detect_emotion(&text));

        let intent = self.classifier.classify(&text);
        tracing::debug!(intent = %intent, emotion = ?emotion.state, "Turn classified");

        let reply = match tokio::time::timeout(
            self.turn_timeout,
            self.dispatcher.respond(&text, intent, &emotion, &context),
        )
        .await
        {
            Ok(reply) => reply,
            Err(_) => {
                tracing::warn!(
                    intent = %intent,
                    "Reply generation timed out after {:?}",
                    self.turn_timeout
                );
                trouble_reply()
            }
        };

        let actions = self.planner.plan(&text, intent, &reply, &context);

        let response = TurnResponse {
            message: reply.message,
            intent,
            emotion_detected: emotion.clone(),
            actions,
            suggestions: reply.suggestions,
            confidence: reply.confidence,
        };

        let interaction = Interaction::new(text.clone(), emotion.clone(), response.clone());
        if !self.store.append_interaction(&session_id, interaction).await {
            tracing::warn!("Interaction not persisted");
        }

        self.learn(&session_id, &text, intent, &emotion, &response.actions).await;

        tracing::info!(
            intent = %intent,
            actions = response.actions.len(),
            confidence = response.confidence,
            "Turn processed"
        );
        response
    }

    /// 记录意图模式；调温指令同步写入偏好
    async fn learn(
        &self,
        session_id: &str,
        text: &str,
        intent: Intent,
        emotion: &EmotionState,
        actions: &[Action],
    ) {
        let pattern_type = format!("intent:{}", intent);
        let data = json!({ "text": text, "emotion": emotion.state });
        self.store.observe_pattern(session_id, &pattern_type, data).await;

        if intent != Intent::ComfortAdjustment {
            return;
        }
        let target = actions
            .iter()
            .filter(|a| a.kind == ActionType::AdjustTemperature)
            .find_map(|a| a.details.target_temp);
        if let Some(temp) = target {
            let patch = PreferencesPatch {
                preferred_temperature: Some(temp),
                ..Default::default()
            };
            self.store.merge_preferences(session_id, patch).await;
        }
    }

    /// 传输层的 update_context 消息：浅合并行程上下文
    pub async fn update_context(&self, session_id: &str, partial: JourneyContext) -> bool {
        self.store.create_if_absent(session_id).await;
        let merged = self.store.merge_journey_context(session_id, partial).await;
        tracing::info!(session_id = %session_id, merged, "Journey context updated");
        merged
    }

    pub async fn health(&self) -> HealthReport {
        let store_ok = self.store.ping().await;
        let store_backend = self.store.backend_kind();
        let status = if store_ok && store_backend == self.expected_backend {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        HealthReport {
            status,
            store_backend,
            store_ok,
            timestamp: Utc::now(),
        }
    }
}
