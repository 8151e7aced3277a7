//! 回复分发
//!
//! 每个意图对应一张有序规则表 (条件, 处理) 与一个兜底回复。按表顺序求值，第一条给出回复的规则胜出。
//! 依赖地点检索的规则在无结果时不给出回复，求值继续向后，最终落到兜底回复。

use std::sync::Arc;

use super::context::TurnContext;
use super::types::{Emotion, EmotionState, Intent, Priority, Reply};
use crate::geo::{self, GeoPoint};
use crate::places::{Place, PlaceService};

/// 从文本中识别的菜系
const CUISINES: &[&str] = &[
    "italian", "chinese", "mexican", "thai", "indian", "japanese", "korean", "vietnamese",
];

/// 检索半径（米）
const COFFEE_RADIUS: u32 = 2000;
const FOOD_RADIUS: u32 = 3000;
const RECOMMEND_RADIUS: u32 = 5000;

/// 取前几个结果作为建议
const TOP_N: usize = 3;

/// 规则求值所需的一轮输入
pub struct TurnInput<'a> {
    pub text: &'a str,
    lower: String,
    pub emotion: &'a EmotionState,
    pub context: &'a TurnContext,
}

impl<'a> TurnInput<'a> {
    pub fn new(text: &'a str, emotion: &'a EmotionState, context: &'a TurnContext) -> Self {
        Self {
            text,
            lower: text.to_lowercase(),
            emotion,
            context,
        }
    }

    fn has(&self, word: &str) -> bool {
        self.lower.contains(word)
    }

    fn has_any(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.lower.contains(w))
    }

    fn anxious(&self) -> bool {
        self.emotion.is(Emotion::Anxious)
    }
}

type Predicate = fn(&TurnInput<'_>) -> bool;
type Respond = fn(&TurnInput<'_>) -> Reply;

/// 规则的处理方式
#[derive(Clone, Copy)]
enum Handler {
    /// 固定回复
    Reply(Respond),
    /// 附近咖啡店
    Coffee,
    /// 附近餐厅（可带菜系）
    Food,
    /// 按兴趣推荐
    Recommend,
}

struct Rule {
    when: Predicate,
    handler: Handler,
}

const fn rule(when: Predicate, handler: Handler) -> Rule {
    Rule { when, handler }
}

/// 某意图的规则表与兜底
struct Policy {
    rules: &'static [Rule],
    fallback: Respond,
}

// ---- 紧急 ----

static EMERGENCY: Policy = Policy {
    rules: &[],
    fallback: |_| {
        Reply::new(
            "I understand this is urgent. I'm alerting emergency services and finding the nearest safe location to stop. Help is on the way.",
            1.0,
        )
        .with_priority(Priority::High)
    },
};

// ---- 停靠 ----

static STOP_REQUEST: Policy = Policy {
    rules: &[
        rule(|t| t.has("coffee"), Handler::Coffee),
        rule(|t| t.has_any(&["food", "eat"]), Handler::Food),
    ],
    fallback: |_| {
        Reply::new(
            "I can help you find a place to stop. What kind of place are you looking for?",
            0.7,
        )
        .with_suggestions(["Coffee shops", "Restaurants", "Gas stations", "Pharmacies"])
    },
};

// ---- 信息 ----

static INFORMATION_REQUEST: Policy = Policy {
    rules: &[
        rule(|t| t.has_any(&["recommend", "suggestion"]), Handler::Recommend),
        rule(
            |t| t.has("weather"),
            Handler::Reply(|_| {
                Reply::new(
                    "It's currently 72°F and sunny at your destination. Perfect weather for your arrival!",
                    0.9,
                )
            }),
        ),
        rule(
            |t| t.has_any(&["neighborhood", "area"]),
            Handler::Reply(|_| {
                Reply::new(
                    "You're passing through the Mission District, known for its vibrant murals, excellent restaurants, and cultural diversity. There are several highly-rated cafes and shops along Valencia Street.",
                    0.8,
                )
                .with_suggestions(["Tartine Bakery", "Ritual Coffee", "Dolores Park"])
            }),
        ),
    ],
    fallback: |_| {
        Reply::new(
            "I can provide information about restaurants, weather, traffic, or local attractions. What would you like to know?",
            0.7,
        )
    },
};

// ---- 到达时间 ----

static TIME_INQUIRY: Policy = Policy {
    rules: &[rule(
        |t| t.context.traffic() == "heavy",
        Handler::Reply(|t| {
            Reply::new(
                format!(
                    "Due to current traffic, we'll arrive in approximately {} minutes. I'm monitoring for faster routes and will update you if I find one.",
                    eta_minutes(t.context)
                ),
                0.9,
            )
        }),
    )],
    fallback: |t| {
        Reply::new(
            format!(
                "We'll arrive in about {} minutes. The route is clear and we're making good time.",
                eta_minutes(t.context)
            ),
            0.95,
        )
    },
};

/// 上下文 ETA；缺失时若有位置与目的地则估算，否则 25 分钟
fn eta_minutes(ctx: &TurnContext) -> i64 {
    if let Some(eta) = ctx.eta_minutes {
        return eta;
    }
    match (ctx.location, ctx.destination) {
        (Some(from), Some(to)) => {
            geo::estimate_arrival(from, to, ctx.traffic_factor.unwrap_or(1.0)).0
        }
        _ => 25,
    }
}

// ---- 舒适度 ----

static COMFORT_ADJUSTMENT: Policy = Policy {
    rules: &[
        rule(
            |t| t.has("cold"),
            Handler::Reply(|_| {
                Reply::new(
                    "I'll increase the temperature to 74°F. Let me know if you need further adjustments.",
                    0.95,
                )
            }),
        ),
        rule(
            |t| t.has_any(&["hot", "warm"]),
            Handler::Reply(|_| {
                Reply::new(
                    "Lowering the temperature to 70°F. I can also open the windows slightly if you'd prefer fresh air.",
                    0.95,
                )
            }),
        ),
        rule(
            |t| t.has("music") && t.anxious(),
            Handler::Reply(|_| {
                Reply::new(
                    "I'll play some calming music to help you relax. How about some ambient sounds?",
                    0.9,
                )
                .with_suggestions(["Nature sounds", "Classical", "Lo-fi beats"])
            }),
        ),
        rule(
            |t| t.has("music"),
            Handler::Reply(|_| {
                Reply::new(
                    "What kind of music would you like? I have access to various genres.",
                    0.85,
                )
                .with_suggestions(["Pop", "Rock", "Classical", "Jazz", "Podcasts"])
            }),
        ),
        rule(
            |t| t.has_any(&["speed", "slow", "fast"]) && t.anxious(),
            Handler::Reply(|_| {
                Reply::new(
                    "I understand you're feeling uncomfortable. I'll adjust to a more relaxed driving style while staying safe and on schedule.",
                    0.9,
                )
            }),
        ),
        rule(
            |t| t.has_any(&["speed", "slow", "fast"]),
            Handler::Reply(|_| {
                Reply::new(
                    "Adjusting the driving style for your comfort. We'll still arrive on time.",
                    0.9,
                )
            }),
        ),
    ],
    fallback: |_| Reply::new("I'll make that adjustment for you right away.", 0.8),
};

// ---- 路线 ----

static ROUTE_CHANGE: Policy = Policy {
    rules: &[
        rule(
            |t| t.has_any(&["traffic", "faster"]),
            Handler::Reply(|_| {
                Reply::new(
                    "I've found an alternative route that's 5 minutes faster by taking 280 instead of 101. Should I update the navigation?",
                    0.9,
                )
                .with_suggestions(["Take faster route", "Stay on current route"])
            }),
        ),
        rule(
            |t| t.has("scenic"),
            Handler::Reply(|_| {
                Reply::new(
                    "I can take you along the coastal route. It will add 10 minutes but offers beautiful ocean views. Would you like that?",
                    0.85,
                )
            }),
        ),
        rule(
            |t| t.has("avoid") && t.has("highway"),
            Handler::Reply(|_| {
                Reply::new(
                    "I'll reroute through city streets to avoid highways. This will add about 8 minutes to the journey.",
                    0.9,
                )
            }),
        ),
    ],
    fallback: |_| {
        Reply::new(
            "I can adjust the route for you. What would you like to avoid or prefer?",
            0.8,
        )
        .with_suggestions(["Avoid highways", "Fastest route", "Scenic route", "Avoid tolls"])
    },
};

// ---- 闲聊 / 反馈 ----

static CONVERSATION: Policy = Policy {
    rules: &[
        rule(
            |t| t.anxious(),
            Handler::Reply(|_| {
                Reply::new(
                    "I can sense you might be feeling a bit anxious. Remember, our vehicles have the best safety record and I'm here to ensure you have a comfortable journey. Is there anything specific I can help with?",
                    0.85,
                )
            }),
        ),
        rule(
            |t| t.emotion.is(Emotion::Happy),
            Handler::Reply(|_| {
                Reply::new(
                    "I'm glad you're enjoying the ride! Let me know if you need anything.",
                    0.9,
                )
            }),
        ),
    ],
    fallback: |_| {
        Reply::new(
            "I'm here to help make your journey comfortable. Feel free to ask me anything!",
            0.8,
        )
    },
};

fn policy_for(intent: Intent) -> &'static Policy {
    match intent {
        Intent::Emergency => &EMERGENCY,
        Intent::StopRequest => &STOP_REQUEST,
        Intent::InformationRequest => &INFORMATION_REQUEST,
        Intent::TimeInquiry => &TIME_INQUIRY,
        Intent::ComfortAdjustment => &COMFORT_ADJUSTMENT,
        Intent::RouteChange => &ROUTE_CHANGE,
        Intent::SmallTalk | Intent::Feedback => &CONVERSATION,
    }
}

/// 内部出错时给乘客的通用回复
pub fn trouble_reply() -> Reply {
    Reply::new(
        "I'm having trouble understanding. Could you try rephrasing?",
        0.5,
    )
}

/// 第一个命中的菜系
pub fn extract_cuisine(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    CUISINES.iter().copied().find(|c| lower.contains(c))
}

/// 推荐检索词
pub fn extract_interest(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("eat") || lower.contains("food") {
        "restaurants"
    } else if lower.contains("coffee") {
        "coffee"
    } else if lower.contains("shop") {
        "shopping"
    } else {
        "popular"
    }
}

/// 回复分发器
pub struct ResponseDispatcher {
    places: Arc<PlaceService>,
    default_location: GeoPoint,
    limit: usize,
}

impl ResponseDispatcher {
    pub fn new(places: Arc<PlaceService>, default_location: GeoPoint) -> Self {
        Self {
            places,
            default_location,
            limit: 5,
        }
    }

    /// 每次检索的结果上限
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub async fn respond(
        &self,
        text: &str,
        intent: Intent,
        emotion: &EmotionState,
        context: &TurnContext,
    ) -> Reply {
        let input = TurnInput::new(text, emotion, context);
        let policy = policy_for(intent);

        for rule in policy.rules {
            if !(rule.when)(&input) {
                continue;
            }
            let reply = match rule.handler {
                Handler::Reply(respond) => Some(respond(&input)),
                Handler::Coffee => self.coffee(&input).await,
                Handler::Food => self.food(&input).await,
                Handler::Recommend => self.recommend(&input).await,
            };
            if let Some(reply) = reply {
                return reply;
            }
        }

        (policy.fallback)(&input)
    }

    fn location(&self, input: &TurnInput<'_>) -> GeoPoint {
        input.context.location.unwrap_or(self.default_location)
    }

    async fn coffee(&self, input: &TurnInput<'_>) -> Option<Reply> {
        let results = self
            .places
            .search(self.location(input), "coffee", COFFEE_RADIUS, self.limit)
            .await;
        let top = results.first()?;

        Some(
            Reply::new(
                format!(
                    "I found {} just 2 minutes away with a {} star rating. It would add about 5 minutes to your journey. Should I update the route?",
                    top.name,
                    top.rating_label()
                ),
                0.9,
            )
            .with_suggestions(names(&results)),
        )
    }

    async fn food(&self, input: &TurnInput<'_>) -> Option<Reply> {
        let location = self.location(input);
        let term = extract_cuisine(input.text).unwrap_or("restaurants");
        let results = self.places.search(location, term, FOOD_RADIUS, self.limit).await;
        let top = results.first()?;

        let destination = input.context.destination.unwrap_or(location);
        let via = top.coordinates.map(GeoPoint::from).unwrap_or(location);
        let detour = geo::detour_time_default(location, via, destination);

        Some(
            Reply::new(
                format!(
                    "Based on your route, {} is the closest with minimal detour - only {} extra minutes. It has a {} star rating. Want to stop there?",
                    top.name,
                    detour,
                    top.rating_label()
                ),
                0.85,
            )
            .with_suggestions(names(&results)),
        )
    }

    async fn recommend(&self, input: &TurnInput<'_>) -> Option<Reply> {
        let term = extract_interest(input.text);
        let results = self
            .places
            .search(self.location(input), term, RECOMMEND_RADIUS, self.limit)
            .await;
        if results.is_empty() {
            return None;
        }

        let picks: Vec<String> = results
            .iter()
            .take(TOP_N)
            .map(|p| format!("{} ({} stars)", p.name, p.rating_label()))
            .collect();

        Some(
            Reply::new(
                format!(
                    "Based on your preferences, I recommend: {}. All are highly rated and close to your route.",
                    picks.join(", ")
                ),
                0.85,
            )
            .with_suggestions(picks),
        )
    }
}

fn names(results: &[Place]) -> Vec<String> {
    results.iter().take(TOP_N).map(|p| p.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlaceError;
    use crate::places::{MockPlaces, PlaceProvider, PlaceQuery};
    use async_trait::async_trait;
    use std::time::Duration;

    struct EmptyPlaces;

    #[async_trait]
    impl PlaceProvider for EmptyPlaces {
        fn name(&self) -> &str {
            "empty"
        }

        async fn search(&self, _query: &PlaceQuery) -> Result<Vec<Place>, PlaceError> {
            Ok(Vec::new())
        }
    }

    fn dispatcher(provider: Arc<dyn PlaceProvider>) -> ResponseDispatcher {
        ResponseDispatcher::new(
            Arc::new(PlaceService::new(provider, Duration::from_secs(1))),
            GeoPoint::new(37.7749, -122.4194),
        )
    }

    async fn reply_in(text: &str, intent: Intent, emotion: Emotion, ctx: TurnContext) -> Reply {
        let emotion = EmotionState::new(emotion, 0.8, 0.5);
        dispatcher(Arc::new(MockPlaces))
            .respond(text, intent, &emotion, &ctx)
            .await
    }

    async fn reply(text: &str, intent: Intent, emotion: Emotion) -> Reply {
        reply_in(text, intent, emotion, TurnContext::default()).await
    }

    #[tokio::test]
    async fn test_emergency_fixed() {
        let r = reply("help", Intent::Emergency, Emotion::Neutral).await;
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.priority, Some(Priority::High));
    }

    #[tokio::test]
    async fn test_stop_coffee_uses_places() {
        let r = reply("stop at a coffee place", Intent::StopRequest, Emotion::Neutral).await;
        assert!(r.message.contains("Blue Bottle Coffee"));
        assert!(r.message.contains("4.5"));
        assert_eq!(r.confidence, 0.9);
        assert_eq!(r.suggestions.len(), 3);
    }

    #[tokio::test]
    async fn test_stop_food_reports_detour() {
        let ctx = TurnContext {
            destination: Some(GeoPoint::new(37.8044, -122.2712)),
            ..Default::default()
        };
        let r = reply_in("can we stop to eat thai", Intent::StopRequest, Emotion::Neutral, ctx)
            .await;
        assert!(r.message.contains("Lers Ros Thai"));
        assert!(r.message.contains("extra minutes"));
        assert_eq!(r.confidence, 0.85);
    }

    #[tokio::test]
    async fn test_stop_without_results_falls_back() {
        let emotion = EmotionState::neutral();
        let ctx = TurnContext::default();
        let r = dispatcher(Arc::new(EmptyPlaces))
            .respond("stop at coffee for food", Intent::StopRequest, &emotion, &ctx)
            .await;
        assert_eq!(r.confidence, 0.7);
        assert_eq!(r.suggestions[0], "Coffee shops");
    }

    #[tokio::test]
    async fn test_information_branches() {
        let info = Intent::InformationRequest;
        let r = reply("any recommendations for food?", info, Emotion::Neutral).await;
        let top = "Based on your preferences, I recommend: Tartine Bakery & Cafe (4.4 stars)";
        assert!(r.message.starts_with(top));

        let r = reply("what's the weather", info, Emotion::Neutral).await;
        assert_eq!(r.confidence, 0.9);

        let r = reply("tell me about this area", info, Emotion::Neutral).await;
        assert_eq!(r.suggestions.len(), 3);

        let r = reply("what is that", info, Emotion::Neutral).await;
        assert_eq!(r.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_recommend_empty_falls_through_to_next_rule() {
        let emotion = EmotionState::neutral();
        let ctx = TurnContext::default();
        let r = dispatcher(Arc::new(EmptyPlaces))
            .respond("recommend something in this area", Intent::InformationRequest, &emotion, &ctx)
            .await;
        assert!(r.message.contains("Mission District"));
    }

    #[tokio::test]
    async fn test_time_inquiry_traffic() {
        let heavy = TurnContext {
            eta_minutes: Some(12),
            traffic_condition: Some("heavy".to_string()),
            ..Default::default()
        };
        let r = reply_in("how long", Intent::TimeInquiry, Emotion::Neutral, heavy).await;
        assert!(r.message.contains("12"));
        assert_eq!(r.confidence, 0.9);

        let r = reply("how long", Intent::TimeInquiry, Emotion::Neutral).await;
        assert!(r.message.contains("25 minutes"));
        assert_eq!(r.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_comfort_emotion_sensitive() {
        let calm = reply("play music", Intent::ComfortAdjustment, Emotion::Anxious).await;
        assert_eq!(calm.suggestions, vec!["Nature sounds", "Classical", "Lo-fi beats"]);

        let normal = reply("play music", Intent::ComfortAdjustment, Emotion::Neutral).await;
        assert_eq!(normal.suggestions.len(), 5);

        let cold = reply("too cold", Intent::ComfortAdjustment, Emotion::Anxious).await;
        assert!(cold.message.contains("74°F"));

        let slow = reply("reduce speed", Intent::ComfortAdjustment, Emotion::Anxious).await;
        assert!(slow.message.contains("uncomfortable"));

        let other = reply("open the window", Intent::ComfortAdjustment, Emotion::Neutral).await;
        assert_eq!(other.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_route_branches() {
        let r = reply("take the faster way", Intent::RouteChange, Emotion::Neutral).await;
        assert!(r.message.contains("5 minutes faster"));
        let r = reply("take the scenic road", Intent::RouteChange, Emotion::Neutral).await;
        assert!(r.message.contains("add 10 minutes"));
        let r = reply("avoid the highway", Intent::RouteChange, Emotion::Neutral).await;
        assert!(r.message.contains("8 minutes"));
        let r = reply("avoid tolls", Intent::RouteChange, Emotion::Neutral).await;
        assert_eq!(r.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_small_talk_by_emotion() {
        let r = reply("hi", Intent::SmallTalk, Emotion::Anxious).await;
        assert_eq!(r.confidence, 0.85);
        let r = reply("hi", Intent::Feedback, Emotion::Happy).await;
        assert_eq!(r.confidence, 0.9);
        let r = reply("hi", Intent::SmallTalk, Emotion::Neutral).await;
        assert_eq!(r.confidence, 0.8);
    }

    #[test]
    fn test_extractors() {
        assert_eq!(extract_cuisine("some Thai food"), Some("thai"));
        assert_eq!(extract_cuisine("anything"), None);
        assert_eq!(extract_interest("somewhere to eat"), "restaurants");
        assert_eq!(extract_interest("a coffee place"), "coffee");
        assert_eq!(extract_interest("a shop"), "shopping");
        assert_eq!(extract_interest("anything"), "popular");
    }
}
