//! 会话状态：偏好、有界交互历史、行程上下文，以及反馈与偏好模式记录
//!
//! 会话以传输层给出的不透明 ID 标识，首次引用时创建，随每轮交互更新，靠 TTL 过期。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::conversation::{EmotionState, TurnResponse};

/// 会话 ID（由传输层提供，内部从不生成）
pub type SessionId = String;

/// 行程上下文：开放键值表，合并时按键覆盖
pub type JourneyContext = Map<String, Value>;

/// 乘客偏好：任意字段缺失时都能回落到默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub preferred_temperature: f64,
    pub music_genre: Option<String>,
    pub driving_style: String,
    pub language: String,
    pub notification_level: String,
    pub favorite_stops: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            preferred_temperature: 72.0,
            music_genre: Some("relaxing".to_string()),
            driving_style: "normal".to_string(),
            language: "en".to_string(),
            notification_level: "normal".to_string(),
            favorite_stops: Vec::new(),
        }
    }
}

/// 偏好的局部更新：仅覆盖 Some 字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesPatch {
    pub preferred_temperature: Option<f64>,
    pub music_genre: Option<String>,
    pub driving_style: Option<String>,
    pub language: Option<String>,
    pub notification_level: Option<String>,
    pub favorite_stops: Option<Vec<String>>,
}

impl Preferences {
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(v) = patch.preferred_temperature {
            self.preferred_temperature = v;
        }
        if let Some(v) = patch.music_genre {
            self.music_genre = Some(v);
        }
        if let Some(v) = patch.driving_style {
            self.driving_style = v;
        }
        if let Some(v) = patch.language {
            self.language = v;
        }
        if let Some(v) = patch.notification_level {
            self.notification_level = v;
        }
        if let Some(v) = patch.favorite_stops {
            self.favorite_stops = v;
        }
    }
}

/// 单轮交互记录，追加后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub emotion: EmotionState,
    pub agent_response: TurnResponse,
}

impl Interaction {
    pub fn new(
        user_input: impl Into<String>,
        emotion: EmotionState,
        agent_response: TurnResponse,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user_input: user_input.into(),
            emotion,
            agent_response,
        }
    }
}

/// 乘客会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub preferences: Preferences,
    /// 最近的在后
    #[serde(default)]
    pub conversation_history: Vec<Interaction>,
    #[serde(default)]
    pub journey_context: JourneyContext,
}

impl Session {
    /// 默认偏好、空历史、空行程上下文
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: Utc::now(),
            preferences: Preferences::default(),
            conversation_history: Vec::new(),
            journey_context: JourneyContext::new(),
        }
    }

    /// 追加交互，超出 limit 时丢弃最旧的记录
    pub fn push_interaction(&mut self, interaction: Interaction, limit: usize) {
        self.conversation_history.push(interaction);
        if self.conversation_history.len() > limit {
            let excess = self.conversation_history.len() - limit;
            self.conversation_history.drain(..excess);
        }
    }

    /// 浅合并：新键加入，已有键被覆盖
    pub fn merge_journey_context(&mut self, partial: JourneyContext) {
        for (key, value) in partial {
            self.journey_context.insert(key, value);
        }
    }
}

/// 对某商家的反馈，同一 (会话, 商家) 只保留最后一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub business_id: String,
    pub rating: i32,
    #[serde(rename = "type")]
    pub feedback_type: String,
    pub timestamp: DateTime<Utc>,
}

/// 偏好模式：重复观测时计数递增，data 取最新一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub occurrences: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub data: Value,
}

impl PatternRecord {
    pub fn first(pattern_type: impl Into<String>, data: Value) -> Self {
        let now = Utc::now();
        Self {
            pattern_type: pattern_type.into(),
            occurrences: 1,
            first_seen: now,
            last_seen: now,
            data,
        }
    }

    pub fn observe_again(&mut self, data: Value) {
        self.occurrences += 1;
        self.last_seen = Utc::now();
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Intent;

    fn interaction(n: usize) -> Interaction {
        Interaction::new(
            format!("turn {}", n),
            EmotionState::neutral(),
            TurnResponse {
                message: "ok".to_string(),
                intent: Intent::SmallTalk,
                emotion_detected: EmotionState::neutral(),
                actions: Vec::new(),
                suggestions: Vec::new(),
                confidence: 0.8,
            },
        )
    }

    #[test]
    fn test_history_keeps_most_recent() {
        let mut session = Session::new("s1");
        for n in 0..55 {
            session.push_interaction(interaction(n), 50);
        }
        assert_eq!(session.conversation_history.len(), 50);
        assert_eq!(session.conversation_history[0].user_input, "turn 5");
        assert_eq!(session.conversation_history[49].user_input, "turn 54");
    }

    #[test]
    fn test_preferences_fill_missing_fields() {
        let prefs: Preferences = serde_json::from_str(r#"{"language": "fr"}"#).unwrap();
        assert_eq!(prefs.language, "fr");
        assert_eq!(prefs.preferred_temperature, 72.0);
        assert_eq!(prefs.music_genre.as_deref(), Some("relaxing"));
    }

    #[test]
    fn test_patch_overwrites_only_given_fields() {
        let mut prefs = Preferences::default();
        prefs.apply(PreferencesPatch {
            preferred_temperature: Some(68.0),
            ..Default::default()
        });
        assert_eq!(prefs.preferred_temperature, 68.0);
        assert_eq!(prefs.driving_style, "normal");
    }

    #[test]
    fn test_journey_context_last_write_wins() {
        let mut session = Session::new("s1");
        let mut first = JourneyContext::new();
        first.insert("eta_minutes".into(), Value::from(20));
        first.insert("route".into(), Value::from("101"));
        session.merge_journey_context(first);

        let mut second = JourneyContext::new();
        second.insert("eta_minutes".into(), Value::from(15));
        session.merge_journey_context(second);

        assert_eq!(session.journey_context["eta_minutes"], 15);
        assert_eq!(session.journey_context["route"], "101");
    }
}
