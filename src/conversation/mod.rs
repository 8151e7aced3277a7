//! 对话层：意图识别、情绪回退、回复分发、指令规划

mod context;
mod dispatcher;
mod emotion;
mod intent;
mod planner;
mod types;

pub use context::TurnContext;
pub use dispatcher::{extract_cuisine, extract_interest, trouble_reply, ResponseDispatcher};
pub use emotion::detect_emotion;
pub use intent::{IntentClassifier, INTENT_TABLE};
pub use planner::{ActionPlanner, DEFAULT_TARGET_TEMP, RELAXING_GENRE};
pub use types::{
    Action, ActionDetails, ActionType, Emotion, EmotionDetails, EmotionSource, EmotionState, Intent,
    Priority, Reply, TurnResponse,
};
