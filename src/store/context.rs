//! 上下文缓存：会话、偏好、推荐缓存、反馈、偏好模式
//!
//! 五个命名空间各有 TTL，每次写入都从写入时刻重新计时。会话相关的读-改-写在同一会话键的锁内完成，
//! 并发的两轮请求不会互相覆盖。后端 I/O 错误在这里被吸收：读降级为不存在，写降级为 `false`。

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::backend::{BackendKind, KvBackend};
use super::locks::KeyLocks;
use super::memory::MemoryBackend;
use super::redis::RedisBackend;
use crate::config::{StoreBackendKind, StoreSection, TtlSection};
use crate::core::StoreError;
use crate::places::Place;
use crate::session::{
    FeedbackRecord, Interaction, JourneyContext, PatternRecord, Preferences, PreferencesPatch,
    Session,
};

/// 各命名空间的 TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub session: Duration,
    pub preferences: Duration,
    pub recommendations: Duration,
    pub feedback: Duration,
    pub pattern: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from(&TtlSection::default())
    }
}

impl From<&TtlSection> for TtlPolicy {
    fn from(ttl: &TtlSection) -> Self {
        Self {
            session: Duration::from_secs(ttl.session_secs),
            preferences: Duration::from_secs(ttl.preferences_secs),
            recommendations: Duration::from_secs(ttl.recommendations_secs),
            feedback: Duration::from_secs(ttl.feedback_secs),
            pattern: Duration::from_secs(ttl.pattern_secs),
        }
    }
}

/// 缓存命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Session,
    Preferences,
    Recommendations,
    Feedback,
    Pattern,
}

impl Namespace {
    fn prefix(&self) -> &'static str {
        match self {
            Namespace::Session => "session",
            Namespace::Preferences => "preferences",
            Namespace::Recommendations => "recommendations",
            Namespace::Feedback => "feedback",
            Namespace::Pattern => "pattern",
        }
    }

    /// 各段以 ':' 连接；段内的 '%' 与 ':' 做百分号编码，保证不同段组合不会落到同一键
    fn key(&self, parts: &[&str]) -> String {
        let mut key = self.prefix().to_string();
        for part in parts {
            key.push(':');
            encode_part(part, &mut key);
        }
        key
    }

    fn ttl(&self, policy: &TtlPolicy) -> Duration {
        match self {
            Namespace::Session => policy.session,
            Namespace::Preferences => policy.preferences,
            Namespace::Recommendations => policy.recommendations,
            Namespace::Feedback => policy.feedback,
            Namespace::Pattern => policy.pattern,
        }
    }
}

fn encode_part(part: &str, out: &mut String) {
    for c in part.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
}

/// 会话上下文缓存
pub struct ContextStore {
    backend: Arc<dyn KvBackend>,
    ttl: TtlPolicy,
    history_limit: usize,
    locks: KeyLocks,
}

impl ContextStore {
    pub fn new(backend: Arc<dyn KvBackend>, ttl: TtlPolicy, history_limit: usize) -> Self {
        Self {
            backend,
            ttl,
            history_limit,
            locks: KeyLocks::new(),
        }
    }

    /// 纯内存缓存，默认 TTL 与历史上限
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBackend::new()),
            TtlPolicy::default(),
            StoreSection::default().history_limit,
        )
    }

    /// 按配置选择后端
    ///
    /// backend = redis 时连接并 PING 一次；失败则在进程剩余生命周期内使用内存后端，不再重试。
    pub async fn connect(cfg: &StoreSection) -> Self {
        let ttl = TtlPolicy::from(&cfg.ttl);

        let backend: Arc<dyn KvBackend> = match cfg.backend {
            StoreBackendKind::Memory => {
                tracing::info!("Using in-memory context store");
                Arc::new(MemoryBackend::new())
            }
            StoreBackendKind::Redis => match Self::probe_redis(&cfg.redis_url).await {
                Ok(redis) => {
                    tracing::info!("Redis context store connected");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!(
                        "Redis connection failed: {} - falling back to in-memory store for process lifetime",
                        e
                    );
                    Arc::new(MemoryBackend::new())
                }
            },
        };

        Self::new(backend, ttl, cfg.history_limit)
    }

    async fn probe_redis(url: &str) -> Result<RedisBackend, StoreError> {
        let redis = RedisBackend::connect(url).await?;
        redis.ping().await?;
        Ok(redis)
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// 后端是否可用（内存后端恒为 true）
    pub async fn ping(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Context store ping failed: {}", e);
                false
            }
        }
    }

    // ---- 底层读写 ----

    /// 读取并反序列化；无法解码的数据按不存在处理
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %key, "Discarding undecodable cache entry: {}", e);
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(
        &self,
        ns: Namespace,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.backend.set_ex(key, &raw, ns.ttl(&self.ttl)).await
    }

    /// 读取失败一律记日志并视为不存在
    async fn read_or_none<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_json(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, "Context store read failed: {}", e);
                None
            }
        }
    }

    fn report(op: &str, key: &str, result: Result<(), StoreError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, "Context store {} failed: {}", op, e);
                false
            }
        }
    }

    /// 读-改-写会话（调用方需持有会话键锁）
    async fn update_session_locked<F>(
        &self,
        key: &str,
        session_id: &str,
        f: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Session),
    {
        let mut session = self
            .read_json::<Session>(key)
            .await?
            .unwrap_or_else(|| Session::new(session_id));
        f(&mut session);
        self.write_json(Namespace::Session, key, &session).await
    }

    // ---- 会话 ----

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.read_or_none(&Namespace::Session.key(&[session_id])).await
    }

    /// 幂等：已存在则原样返回，否则创建默认会话并写入
    pub async fn create_if_absent(&self, session_id: &str) -> Session {
        let key = Namespace::Session.key(&[session_id]);
        let _guard = self.locks.lock(&key).await;

        if let Some(existing) = self.read_or_none::<Session>(&key).await {
            return existing;
        }

        let session = Session::new(session_id);
        let written = self.write_json(Namespace::Session, &key, &session).await;
        if Self::report("create", &key, written) {
            tracing::debug!(session_id = %session_id, "Created session");
        }
        session
    }

    /// 追加交互并截断到最近 history_limit 条，随后整体写回（刷新 TTL）
    pub async fn append_interaction(&self, session_id: &str, interaction: Interaction) -> bool {
        let key = Namespace::Session.key(&[session_id]);
        let _guard = self.locks.lock(&key).await;

        let limit = self.history_limit;
        let result = self
            .update_session_locked(&key, session_id, |s| s.push_interaction(interaction, limit))
            .await;
        Self::report("append_interaction", &key, result)
    }

    /// 行程上下文浅合并
    pub async fn merge_journey_context(&self, session_id: &str, partial: JourneyContext) -> bool {
        let key = Namespace::Session.key(&[session_id]);
        let _guard = self.locks.lock(&key).await;

        let result = self
            .update_session_locked(&key, session_id, |s| s.merge_journey_context(partial))
            .await;
        Self::report("merge_journey_context", &key, result)
    }

    /// 合并偏好，同时把完整偏好写入 preferences 命名空间（独立 TTL）
    pub async fn merge_preferences(&self, session_id: &str, patch: PreferencesPatch) -> bool {
        let key = Namespace::Session.key(&[session_id]);
        let _guard = self.locks.lock(&key).await;

        let mut resolved = None;
        let result = self
            .update_session_locked(&key, session_id, |s| {
                s.preferences.apply(patch);
                resolved = Some(s.preferences.clone());
            })
            .await;
        if !Self::report("merge_preferences", &key, result) {
            return false;
        }

        let prefs_key = Namespace::Preferences.key(&[session_id]);
        let prefs = resolved.unwrap_or_default();
        let written = self.write_json(Namespace::Preferences, &prefs_key, &prefs).await;
        Self::report("write_preferences", &prefs_key, written)
    }

    /// 偏好命名空间 → 会话内嵌偏好 → 默认值，永不失败
    pub async fn get_preferences(&self, session_id: &str) -> Preferences {
        let prefs_key = Namespace::Preferences.key(&[session_id]);
        if let Some(prefs) = self.read_or_none::<Preferences>(&prefs_key).await {
            return prefs;
        }
        self.get(session_id)
            .await
            .map(|s| s.preferences)
            .unwrap_or_default()
    }

    // ---- 推荐缓存 ----

    pub async fn cache_recommendations(
        &self,
        location_key: &str,
        category: &str,
        results: &[Place],
    ) -> bool {
        let key = Namespace::Recommendations.key(&[location_key, category]);
        let written = self.write_json(Namespace::Recommendations, &key, &results).await;
        Self::report("cache_recommendations", &key, written)
    }

    pub async fn get_cached_recommendations(
        &self,
        location_key: &str,
        category: &str,
    ) -> Option<Vec<Place>> {
        self.read_or_none(&Namespace::Recommendations.key(&[location_key, category]))
            .await
    }

    // ---- 反馈 ----

    /// 同一 (会话, 商家) 后写覆盖先写
    pub async fn record_feedback(
        &self,
        session_id: &str,
        business_id: &str,
        rating: i32,
        feedback_type: &str,
    ) -> bool {
        let key = Namespace::Feedback.key(&[session_id, business_id]);
        let record = FeedbackRecord {
            business_id: business_id.to_string(),
            rating,
            feedback_type: feedback_type.to_string(),
            timestamp: chrono::Utc::now(),
        };
        let written = self.write_json(Namespace::Feedback, &key, &record).await;
        Self::report("record_feedback", &key, written)
    }

    /// 会话下全部反馈，顺序不保证
    pub async fn list_feedback(&self, session_id: &str) -> Vec<FeedbackRecord> {
        let prefix = Namespace::Feedback.key(&[session_id, ""]);
        let pairs = match self.backend.scan_prefix(&prefix).await {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::warn!(prefix = %prefix, "Feedback scan failed: {}", e);
                return Vec::new();
            }
        };

        pairs
            .into_iter()
            .filter_map(|(key, raw)| match serde_json::from_str(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(key = %key, "Skipping undecodable feedback: {}", e);
                    None
                }
            })
            .collect()
    }

    // ---- 偏好模式 ----

    /// 首次观测 occurrences = 1；再次观测时递增并以最新 data 覆盖，first_seen 保持不变
    pub async fn observe_pattern(&self, session_id: &str, pattern_type: &str, data: Value) -> bool {
        let key = Namespace::Pattern.key(&[session_id, pattern_type]);
        let _guard = self.locks.lock(&key).await;

        let result = async {
            let record = match self.read_json::<PatternRecord>(&key).await? {
                Some(mut existing) => {
                    existing.observe_again(data);
                    existing
                }
                None => PatternRecord::first(pattern_type, data),
            };
            self.write_json(Namespace::Pattern, &key, &record).await
        }
        .await;
        Self::report("observe_pattern", &key, result)
    }

    pub async fn get_pattern(&self, session_id: &str, pattern_type: &str) -> Option<PatternRecord> {
        self.read_or_none(&Namespace::Pattern.key(&[session_id, pattern_type]))
            .await
    }
}
