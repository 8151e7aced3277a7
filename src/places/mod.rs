//! 地点推荐：提供方抽象（Yelp / Mock）与面向核心的 PlaceService
//!
//! 核心只依赖 PlaceService：带超时、带推荐缓存、出错时返回空列表，永不向上抛错。

mod mock;
mod service;
mod yelp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::PlaceError;
use crate::geo::GeoPoint;

pub use mock::MockPlaces;
pub use service::PlaceService;
pub use yelp::YelpPlaces;

/// 商家坐标（与提供方字段名一致）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinates> for GeoPoint {
    fn from(c: Coordinates) -> Self {
        GeoPoint::new(c.latitude, c.longitude)
    }
}

/// 检索结果中的一个地点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub price: Option<String>,
    /// 距查询点（米）
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub address: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub is_closed: bool,
}

impl Place {
    /// 仅有名称与评分的地点（测试与脚本化提供方使用）
    pub fn named(name: impl Into<String>, rating: f64) -> Self {
        let name = name.into();
        Self {
            id: name.to_lowercase().replace(' ', "-"),
            name,
            rating: Some(rating),
            review_count: None,
            price: None,
            distance: None,
            categories: Vec::new(),
            address: Vec::new(),
            phone: None,
            coordinates: None,
            is_closed: false,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude: lat,
            longitude: lng,
        });
        self
    }

    /// 评分文本，缺失时为 N/A
    pub fn rating_label(&self) -> String {
        match self.rating {
            Some(r) => format!("{}", r),
            None => "N/A".to_string(),
        }
    }
}

/// 检索请求
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub location: GeoPoint,
    pub term: String,
    pub radius_meters: u32,
    pub limit: usize,
}

impl PlaceQuery {
    pub fn new(location: GeoPoint, term: impl Into<String>, radius_meters: u32) -> Self {
        Self {
            location,
            term: term.into(),
            radius_meters,
            limit: 5,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// 地点提供方
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<Place>, PlaceError>;
}

/// 停靠类型到提供方分类的映射，未知类型归为餐厅
pub fn category_for(kind: &str) -> &'static str {
    match kind.to_lowercase().as_str() {
        "coffee" => "coffee,coffeeroasteries",
        "food" => "restaurants",
        "gas" => "servicestations",
        "pharmacy" => "pharmacy",
        "grocery" => "grocery",
        "bank" | "atm" => "banks",
        "hotel" => "hotels",
        "parking" => "parking",
        _ => "restaurants",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_for() {
        assert_eq!(category_for("Coffee"), "coffee,coffeeroasteries");
        assert_eq!(category_for("atm"), "banks");
        assert_eq!(category_for("spaceport"), "restaurants");
    }

    #[test]
    fn test_rating_label() {
        assert_eq!(Place::named("A", 4.5).rating_label(), "4.5");
        assert_eq!(Place::named("B", 4.0).rating_label(), "4");
        let mut c = Place::named("C", 1.0);
        c.rating = None;
        assert_eq!(c.rating_label(), "N/A");
    }
}
