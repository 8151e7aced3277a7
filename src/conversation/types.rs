//! 对话层公共类型：意图、情绪、车辆指令、单轮回复

use serde::{Deserialize, Serialize};

/// 识别出的意图（封闭集合，每轮恰好一个）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    RouteChange,
    ComfortAdjustment,
    InformationRequest,
    StopRequest,
    TimeInquiry,
    Emergency,
    SmallTalk,
    Feedback,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::RouteChange => "route_change",
            Intent::ComfortAdjustment => "comfort_adjustment",
            Intent::InformationRequest => "information_request",
            Intent::StopRequest => "stop_request",
            Intent::TimeInquiry => "time_inquiry",
            Intent::Emergency => "emergency",
            Intent::SmallTalk => "small_talk",
            Intent::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 情绪类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Anxious,
    Relaxed,
    Frustrated,
    Happy,
    #[default]
    Neutral,
    Confused,
    Impatient,
}

/// 情绪判定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionSource {
    /// 关键词命中
    KeywordMatch,
    /// 无命中时的默认值
    Default,
    /// 外部情绪分析服务
    External,
}

/// 情绪附加信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EmotionSource>,
}

/// 情绪状态：创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    pub state: Emotion,
    pub confidence: f64,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default)]
    pub details: EmotionDetails,
}

fn default_intensity() -> f64 {
    0.5
}

impl EmotionState {
    /// confidence / intensity 会被截断到 [0, 1]
    pub fn new(state: Emotion, confidence: f64, intensity: f64) -> Self {
        Self {
            state,
            confidence: confidence.clamp(0.0, 1.0),
            intensity: intensity.clamp(0.0, 1.0),
            details: EmotionDetails::default(),
        }
    }

    pub fn with_source(mut self, source: EmotionSource) -> Self {
        self.details.source = Some(source);
        self
    }

    /// 文本消息未附带情绪时的中性默认值
    pub fn neutral() -> Self {
        Self::new(Emotion::Neutral, 0.5, 0.5)
    }

    pub fn is(&self, emotion: Emotion) -> bool {
        self.state == emotion
    }
}

/// 回复 / 指令优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Immediate,
    High,
    Normal,
}

/// 车辆指令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    UpdateRoute,
    AdjustTemperature,
    ChangeMusic,
    ProvideInfo,
    ConfirmStop,
    AlertDriver,
    None,
}

/// 指令参数：不同指令使用不同字段，未用字段不序列化
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub confirmation_required: bool,
}

/// 车辆指令：由传输层消费，驱动车辆子系统
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub details: ActionDetails,
}

impl Action {
    pub fn new(kind: ActionType, details: ActionDetails) -> Self {
        Self {
            kind,
            priority: None,
            details,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// 分发器产出的回复（尚未附加意图与指令）
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub message: String,
    pub suggestions: Vec<String>,
    pub confidence: f64,
    pub priority: Option<Priority>,
}

impl Reply {
    pub fn new(message: impl Into<String>, confidence: f64) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
            confidence,
            priority: None,
        }
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// 单轮输出（传输层下发给客户端，同时写入会话历史）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub message: String,
    pub intent: Intent,
    pub emotion_detected: EmotionState,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub confidence: f64,
}
