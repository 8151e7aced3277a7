//! 单轮上下文：车辆位置、目的地、ETA、路况，以及传输层附带的其他任意字段

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geo::{traffic_label, GeoPoint};
use crate::session::JourneyContext;

const KNOWN_FIELDS: [&str; 5] = [
    "location",
    "destination",
    "eta_minutes",
    "traffic_condition",
    "traffic_factor",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_condition: Option<String>,
    /// 拥堵系数；未给出 traffic_condition 时据此生成路况标签
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_factor: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TurnContext {
    /// 以会话行程上下文为底、本轮上下文覆盖其上
    ///
    /// 已存字段逐个解析，类型不符的单个字段被忽略，其余照常沿用。
    pub fn layered(journey: &JourneyContext, turn: &TurnContext) -> TurnContext {
        let mut ctx = turn.clone();
        fill_from(journey, "location", &mut ctx.location);
        fill_from(journey, "destination", &mut ctx.destination);
        fill_from(journey, "eta_minutes", &mut ctx.eta_minutes);
        fill_from(journey, "traffic_condition", &mut ctx.traffic_condition);
        fill_from(journey, "traffic_factor", &mut ctx.traffic_factor);

        for (key, value) in journey {
            if KNOWN_FIELDS.contains(&key.as_str()) || ctx.extra.contains_key(key) {
                continue;
            }
            ctx.extra.insert(key.clone(), value.clone());
        }
        ctx
    }

    pub fn traffic(&self) -> String {
        match (&self.traffic_condition, self.traffic_factor) {
            (Some(condition), _) => condition.clone(),
            (None, Some(factor)) => traffic_label(factor).to_string(),
            (None, None) => "normal".to_string(),
        }
    }
}

/// 本轮未给出的字段从行程上下文补齐
fn fill_from<T: DeserializeOwned>(journey: &JourneyContext, key: &str, slot: &mut Option<T>) {
    if slot.is_some() {
        return;
    }
    match journey.get(key) {
        None | Some(Value::Null) => {}
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => *slot = Some(parsed),
            Err(e) => tracing::warn!(key = %key, "Ignoring stored journey field: {}", e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_and_extra_fields() {
        let ctx: TurnContext = serde_json::from_value(serde_json::json!({
            "location": {"lat": 37.77, "lng": -122.41},
            "eta_minutes": 12,
            "traffic_condition": "heavy",
            "route_name": "US-101"
        }))
        .unwrap();
        assert_eq!(ctx.eta_minutes, Some(12));
        assert_eq!(ctx.traffic(), "heavy");
        assert_eq!(ctx.extra["route_name"], "US-101");
    }

    #[test]
    fn test_layered_turn_overrides_journey() {
        let mut journey = JourneyContext::new();
        journey.insert("eta_minutes".into(), Value::from(30));
        journey.insert("traffic_condition".into(), Value::from("heavy"));
        let turn = TurnContext {
            eta_minutes: Some(10),
            ..Default::default()
        };

        let ctx = TurnContext::layered(&journey, &turn);
        assert_eq!(ctx.eta_minutes, Some(10));
        assert_eq!(ctx.traffic_condition.as_deref(), Some("heavy"));
    }

    #[test]
    fn test_layered_ignores_bad_stored_values() {
        let mut journey = JourneyContext::new();
        journey.insert("location".into(), Value::from("downtown"));
        let turn = TurnContext {
            eta_minutes: Some(10),
            ..Default::default()
        };
        assert_eq!(TurnContext::layered(&journey, &turn), turn);
    }

    #[test]
    fn test_layered_skips_only_the_bad_field() {
        let mut journey = JourneyContext::new();
        journey.insert("eta_minutes".into(), Value::from(12));
        journey.insert("traffic_condition".into(), Value::from("heavy"));
        journey.insert("destination".into(), Value::from("SFO"));
        journey.insert("route_name".into(), Value::from("US-101"));

        let ctx = TurnContext::layered(&journey, &TurnContext::default());
        assert_eq!(ctx.eta_minutes, Some(12));
        assert_eq!(ctx.traffic(), "heavy");
        assert!(ctx.destination.is_none());
        assert_eq!(ctx.extra["route_name"], "US-101");
        assert!(!ctx.extra.contains_key("destination"));
    }

    #[test]
    fn test_layered_turn_extras_win() {
        let mut journey = JourneyContext::new();
        journey.insert("route_name".into(), Value::from("US-101"));
        let mut turn = TurnContext::default();
        turn.extra.insert("route_name".into(), Value::from("I-280"));

        let ctx = TurnContext::layered(&journey, &turn);
        assert_eq!(ctx.extra["route_name"], "I-280");
    }

    #[test]
    fn test_traffic_from_factor() {
        let ctx = TurnContext {
            traffic_factor: Some(1.7),
            ..Default::default()
        };
        assert_eq!(ctx.traffic(), "heavy");
        assert_eq!(TurnContext::default().traffic(), "normal");
    }
}
