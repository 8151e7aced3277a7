//! 地理工具：大圆距离、绕行时间、到达时间、路况标签、路线选择
//!
//! 全部为纯函数。内部统一使用英里（地球半径 3959 mi），需要米时经 `distance_meters` 在边界换算。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 地球半径（英里）
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// 1 英里对应的米数
pub const METERS_PER_MILE: f64 = 1609.344;

/// 绕行固定开销（分钟）：进出停靠点
const DETOUR_OVERHEAD_MINUTES: i64 = 5;

/// 绕行时间下限（分钟）
const DETOUR_FLOOR_MINUTES: i64 = 2;

/// 到达时间估算的基准车速（mph）
const BASE_SPEED_MPH: f64 = 35.0;

/// 绕行估算的默认平均车速
const DEFAULT_DETOUR_SPEED_MPH: f64 = 30.0;

/// 经纬度坐标（JSON 中为 `{"lat": .., "lng": ..}`）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// 保留 3 位小数的缓存键（约 100m 精度），如 `37.775,-122.419`
    pub fn rounded_key(&self) -> String {
        format!("{:.3},{:.3}", self.lat, self.lng)
    }
}

/// Haversine 距离（英里）
pub fn distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (p2.lng - p1.lng).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_MILES * c
}

/// Haversine 距离（米）
pub fn distance_meters(p1: GeoPoint, p2: GeoPoint) -> f64 {
    distance(p1, p2) * METERS_PER_MILE
}

/// 经停 via 再前往 destination 相比直达多出的分钟数
///
/// 额外里程按平均车速换算并四舍五入，加 5 分钟固定开销，最少 2 分钟。
/// 车速非正或非有限值时按 30 mph 计算。
pub fn detour_time(
    current: GeoPoint,
    via: GeoPoint,
    destination: GeoPoint,
    avg_speed_mph: f64,
) -> i64 {
    let speed = if avg_speed_mph.is_finite() && avg_speed_mph > 0.0 {
        avg_speed_mph
    } else {
        DEFAULT_DETOUR_SPEED_MPH
    };
    let direct = distance(current, destination);
    let detour = distance(current, via) + distance(via, destination);
    let extra = (detour - direct).max(0.0);

    let travel = (extra / speed * 60.0).round() as i64;
    travel
        .saturating_add(DETOUR_OVERHEAD_MINUTES)
        .max(DETOUR_FLOOR_MINUTES)
}

/// 默认 30 mph 的绕行时间
pub fn detour_time_default(current: GeoPoint, via: GeoPoint, destination: GeoPoint) -> i64 {
    detour_time(current, via, destination, DEFAULT_DETOUR_SPEED_MPH)
}

/// 到达时间估算：返回（行驶分钟数，当地时钟 `hh:mm AM/PM`）
pub fn estimate_arrival(
    current: GeoPoint,
    destination: GeoPoint,
    traffic_factor: f64,
) -> (i64, String) {
    estimate_arrival_at(current, destination, traffic_factor, Local::now())
}

/// 以给定时刻为起点的到达时间估算
pub fn estimate_arrival_at(
    current: GeoPoint,
    destination: GeoPoint,
    traffic_factor: f64,
    now: DateTime<Local>,
) -> (i64, String) {
    let factor = if traffic_factor > 0.0 { traffic_factor } else { 1.0 };
    let adjusted_speed = BASE_SPEED_MPH / factor;
    let minutes = (distance(current, destination) / adjusted_speed * 60.0) as i64;

    let arrival = now + chrono::Duration::minutes(minutes);
    (minutes, arrival.format("%I:%M %p").to_string())
}

/// 路况等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLevel {
    Light,
    Moderate,
    Heavy,
    Severe,
}

impl TrafficLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficLevel::Light => "light",
            TrafficLevel::Moderate => "moderate",
            TrafficLevel::Heavy => "heavy",
            TrafficLevel::Severe => "severe",
        }
    }
}

impl std::fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 拥堵系数转路况标签
pub fn traffic_label(factor: f64) -> TrafficLevel {
    if factor < 1.2 {
        TrafficLevel::Light
    } else if factor < 1.5 {
        TrafficLevel::Moderate
    } else if factor < 2.0 {
        TrafficLevel::Heavy
    } else {
        TrafficLevel::Severe
    }
}

/// 路线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Highway,
    Scenic,
    Local,
    Standard,
}

/// 候选路线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOption {
    pub name: String,
    pub distance_miles: f64,
    pub estimated_minutes: u32,
    #[serde(rename = "type")]
    pub kind: RouteKind,
    pub description: String,
}

/// 从固定的三条候选（高速 / 海景 / 市区）中选出最佳路线
///
/// 先按 avoid_highways 过滤；prefer_scenic 时海景优先，否则按预计用时升序（稳定排序）。
/// 过滤后为空则返回直达路线。
pub fn select_route(
    current: GeoPoint,
    destination: GeoPoint,
    avoid_highways: bool,
    prefer_scenic: bool,
) -> RouteOption {
    let direct = distance(current, destination);

    let mut routes = vec![
        RouteOption {
            name: "Fastest Route via US-101".to_string(),
            distance_miles: direct,
            estimated_minutes: 25,
            kind: RouteKind::Highway,
            description: "Take US-101 North for fastest arrival".to_string(),
        },
        RouteOption {
            name: "Scenic Coastal Route".to_string(),
            distance_miles: direct * 1.3,
            estimated_minutes: 35,
            kind: RouteKind::Scenic,
            description: "Take Highway 1 for beautiful ocean views".to_string(),
        },
        RouteOption {
            name: "City Streets".to_string(),
            distance_miles: direct * 1.1,
            estimated_minutes: 30,
            kind: RouteKind::Local,
            description: "Take local streets through neighborhoods".to_string(),
        },
    ];

    if avoid_highways {
        routes.retain(|r| r.kind != RouteKind::Highway);
    }

    if prefer_scenic {
        routes.sort_by_key(|r| if r.kind == RouteKind::Scenic { 0 } else { 1 });
    } else {
        routes.sort_by_key(|r| r.estimated_minutes);
    }

    routes.into_iter().next().unwrap_or_else(|| RouteOption {
        name: "Direct Route".to_string(),
        distance_miles: direct,
        estimated_minutes: 25,
        kind: RouteKind::Standard,
        description: "Standard route to destination".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sf() -> GeoPoint {
        GeoPoint::new(37.7749, -122.4194)
    }

    #[test]
    fn test_distance_symmetric_and_zero() {
        let a = sf();
        let b = GeoPoint::new(37.8044, -122.2712);
        assert_eq!(distance(a, b), distance(b, a));
        assert_eq!(distance(a, a), 0.0);
        // SF -> Oakland 约 8.3 英里
        let d = distance(a, b);
        assert!(d > 8.0 && d < 9.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_distance_meters_converts_at_boundary() {
        let a = sf();
        let b = GeoPoint::new(37.8044, -122.2712);
        let ratio = distance_meters(a, b) / distance(a, b);
        assert!((ratio - METERS_PER_MILE).abs() < 1e-9);
    }

    #[test]
    fn test_detour_time_example() {
        let minutes = detour_time(
            GeoPoint::new(37.7749, -122.4194),
            GeoPoint::new(37.7755, -122.4180),
            GeoPoint::new(37.7800, -122.4100),
            30.0,
        );
        assert!(minutes >= 2);
    }

    #[test]
    fn test_detour_time_monotonic_and_floored() {
        let current = sf();
        let destination = GeoPoint::new(37.8044, -122.2712);
        let mut last = 0;
        for step in 0..10 {
            // 经停点沿垂直于直达路径的方向逐步远离
            let via = GeoPoint::new(37.79 + step as f64 * 0.01, -122.345 - step as f64 * 0.01);
            let minutes = detour_time(current, via, destination, 30.0);
            assert!(minutes >= DETOUR_FLOOR_MINUTES);
            assert!(minutes >= last, "detour shrank at step {}", step);
            last = minutes;
        }
    }

    #[test]
    fn test_detour_time_zero_speed_uses_default() {
        let current = sf();
        let via = GeoPoint::new(37.79, -122.40);
        let destination = GeoPoint::new(37.8044, -122.2712);
        let expected = detour_time_default(current, via, destination);
        assert_eq!(detour_time(current, via, destination, 0.0), expected);
        assert_eq!(detour_time(current, via, destination, -10.0), expected);
        assert_eq!(detour_time(current, via, destination, f64::NAN), expected);
        assert!(expected >= DETOUR_FLOOR_MINUTES);
    }

    #[test]
    fn test_traffic_label_thresholds() {
        assert_eq!(traffic_label(1.0), TrafficLevel::Light);
        assert_eq!(traffic_label(1.2), TrafficLevel::Moderate);
        assert_eq!(traffic_label(1.49), TrafficLevel::Moderate);
        assert_eq!(traffic_label(1.5), TrafficLevel::Heavy);
        assert_eq!(traffic_label(2.0), TrafficLevel::Severe);
    }

    #[test]
    fn test_estimate_arrival_slower_in_traffic() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 23, 50, 0).unwrap();
        let destination = GeoPoint::new(37.8044, -122.2712);
        let (free, _) = estimate_arrival_at(sf(), destination, 1.0, now);
        let (jammed, clock) = estimate_arrival_at(sf(), destination, 2.0, now);
        assert!(jammed > free);
        assert!(clock.ends_with("AM"), "rolled past midnight: {}", clock);
    }

    #[test]
    fn test_arrival_clock_is_twelve_hour() {
        let destination = sf();
        let after_midnight = Local.with_ymd_and_hms(2024, 5, 1, 0, 5, 0).unwrap();
        assert_eq!(estimate_arrival_at(sf(), destination, 1.0, after_midnight).1, "12:05 AM");
        let noon = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(estimate_arrival_at(sf(), destination, 1.0, noon).1, "12:00 PM");
        let afternoon = Local.with_ymd_and_hms(2024, 5, 1, 15, 30, 0).unwrap();
        assert_eq!(estimate_arrival_at(sf(), destination, 1.0, afternoon).1, "03:30 PM");
    }

    #[test]
    fn test_select_route_preferences() {
        let destination = GeoPoint::new(37.8044, -122.2712);
        assert_eq!(select_route(sf(), destination, false, false).kind, RouteKind::Highway);
        assert_eq!(select_route(sf(), destination, true, false).kind, RouteKind::Local);
        assert_eq!(select_route(sf(), destination, true, true).kind, RouteKind::Scenic);
        assert_eq!(select_route(sf(), destination, false, true).kind, RouteKind::Scenic);
    }
}
