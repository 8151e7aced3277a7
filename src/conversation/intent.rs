//! 意图识别
//!
//! 小写后做子串匹配，按表顺序取第一个命中的意图；表顺序本身就是冲突时的优先级。
//! 均未命中时，含 `?` 为信息请求，否则为闲聊。

use super::types::Intent;

/// (意图, 触发短语)，顺序即优先级
pub const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::RouteChange,
        &["different route", "avoid", "detour", "go through", "take the"],
    ),
    (
        Intent::StopRequest,
        &["stop at", "can we stop", "need to stop", "pull over", "grab some", "pick up"],
    ),
    (
        Intent::ComfortAdjustment,
        &["too cold", "too hot", "temperature", "music", "window", "speed"],
    ),
    (
        Intent::TimeInquiry,
        &["how long", "when will", "arrival time", "eta", "how much longer"],
    ),
    (
        Intent::InformationRequest,
        &["tell me about", "what is", "recommend", "suggestions", "nearby", "around here"],
    ),
    (
        Intent::Emergency,
        &["emergency", "urgent", "help", "accident", "sick", "pull over now"],
    ),
    (
        Intent::Feedback,
        &["thank you", "great job", "terrible", "bad service", "love this"],
    ),
];

/// 确定性意图分类器
#[derive(Debug, Clone, Copy)]
pub struct IntentClassifier {
    table: &'static [(Intent, &'static [&'static str])],
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self { table: INTENT_TABLE }
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 对任意输入都恰好返回一个意图
    pub fn classify(&self, text: &str) -> Intent {
        let lower = text.to_lowercase();

        for (intent, phrases) in self.table {
            if phrases.iter().any(|p| lower.contains(p)) {
                return *intent;
            }
        }

        if text.contains('?') {
            Intent::InformationRequest
        } else {
            Intent::SmallTalk
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new().classify(text)
    }

    #[test]
    fn test_table_order_breaks_ties() {
        assert_eq!(classify("take a different route, I'm hungry"), Intent::RouteChange);
        // 停靠短语在前，路线短语在后，仍按表顺序
        assert_eq!(classify("can we stop and then take the bridge"), Intent::RouteChange);
        // "pull over now" 同时命中 stop_request 的 "pull over"
        assert_eq!(classify("PULL OVER NOW"), Intent::StopRequest);
    }

    #[test]
    fn test_each_intent_reachable() {
        assert_eq!(classify("Can we stop at a coffee shop nearby?"), Intent::StopRequest);
        assert_eq!(classify("It's too cold in here"), Intent::ComfortAdjustment);
        assert_eq!(classify("How much longer until we arrive?"), Intent::TimeInquiry);
        assert_eq!(classify("Tell me about this neighborhood"), Intent::InformationRequest);
        assert_eq!(classify("Help, this is an emergency!"), Intent::Emergency);
        assert_eq!(classify("Thank you so much"), Intent::Feedback);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(classify(""), Intent::SmallTalk);
        assert_eq!(classify("nice day"), Intent::SmallTalk);
        assert_eq!(classify("is that the bay?"), Intent::InformationRequest);
    }

    #[test]
    fn test_deterministic() {
        let inputs = ["", "what?", "music please", "Help!", "random words"];
        for input in inputs {
            assert_eq!(classify(input), classify(input));
        }
    }
}
