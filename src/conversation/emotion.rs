//! 情绪关键词回退
//!
//! 外部情绪分析不可用时使用：按表顺序匹配第一个命中的情绪。

use super::types::{Emotion, EmotionSource, EmotionState};

const EMOTION_KEYWORDS: &[(Emotion, &[&str])] = &[
    (Emotion::Anxious, &["anxious", "nervous", "worried", "scared", "fear", "unsafe"]),
    (Emotion::Frustrated, &["frustrated", "annoyed", "angry", "stupid", "hate", "terrible"]),
    (Emotion::Happy, &["happy", "great", "wonderful", "love", "perfect", "amazing"]),
    (Emotion::Relaxed, &["relaxed", "calm", "comfortable", "peaceful", "nice"]),
    (Emotion::Confused, &["confused", "don't understand", "what", "why", "how"]),
    (Emotion::Impatient, &["hurry", "late", "faster", "quick", "rush", "slow"]),
];

/// 命中：置信度 0.8 / 强度 0.7；未命中：中性，0.6 / 0.5
pub fn detect_emotion(text: &str) -> EmotionState {
    let lower = text.to_lowercase();

    EMOTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(emotion, _)| {
            EmotionState::new(*emotion, 0.8, 0.7).with_source(EmotionSource::KeywordMatch)
        })
        .unwrap_or_else(|| {
            EmotionState::new(Emotion::Neutral, 0.6, 0.5).with_source(EmotionSource::Default)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_hit() {
        let state = detect_emotion("I'm a bit nervous about this ride");
        assert_eq!(state.state, Emotion::Anxious);
        assert_eq!(state.confidence, 0.8);
        assert_eq!(state.details.source, Some(EmotionSource::KeywordMatch));
    }

    #[test]
    fn test_table_order() {
        // "love" (happy) 与 "hurry" (impatient) 同时出现
        assert_eq!(detect_emotion("love it but hurry").state, Emotion::Happy);
    }

    #[test]
    fn test_default_neutral() {
        let state = detect_emotion("take me to the airport");
        assert_eq!(state.state, Emotion::Neutral);
        assert_eq!(state.confidence, 0.6);
        assert_eq!(state.details.source, Some(EmotionSource::Default));
    }
}
