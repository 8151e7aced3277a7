//! Mock 地点提供方（用于演示与测试，无需 API Key）
//!
//! 固定目录：coffee / restaurants / thai；坐标相对查询点做小偏移。
//! 检索词包含目录名时返回该目录；含 food/eat 或为空时返回 restaurants；其余返回 coffee。

use async_trait::async_trait;

use super::{Place, PlaceProvider, PlaceQuery};
use crate::core::PlaceError;
use crate::geo::GeoPoint;

/// (id, 名称, 评分, 评论数, 价格, 距离米, 分类, 地址, 电话, 纬度偏移, 经度偏移)
type Row = (
    &'static str,
    &'static str,
    f64,
    u32,
    &'static str,
    f64,
    &'static str,
    [&'static str; 2],
    &'static str,
    f64,
    f64,
);

const COFFEE: &[Row] = &[
    ("blue-bottle-coffee-sf", "Blue Bottle Coffee", 4.5, 1523, "$$", 523.5, "Coffee & Tea",
        ["300 Webster St", "San Francisco, CA 94117"], "+14156531394", 0.005, 0.003),
    ("ritual-coffee-sf", "Ritual Coffee Roasters", 4.3, 892, "$$", 812.3, "Coffee & Tea",
        ["432 Octavia St", "San Francisco, CA 94102"], "+14158651405", 0.008, -0.002),
    ("starbucks-mission-sf", "Starbucks", 3.8, 432, "$", 234.1, "Coffee & Tea",
        ["2727 Mission St", "San Francisco, CA 94110"], "+14156481420", 0.002, 0.001),
];

const RESTAURANTS: &[Row] = &[
    ("tartine-bakery-sf", "Tartine Bakery & Cafe", 4.4, 3421, "$$", 645.2, "Bakeries",
        ["600 Guerrero St", "San Francisco, CA 94110"], "+14154872600", 0.006, 0.004),
    ("la-taqueria-sf", "La Taqueria", 4.6, 2156, "$", 892.7, "Mexican",
        ["2889 Mission St", "San Francisco, CA 94110"], "+14152857117", 0.009, -0.003),
];

const THAI: &[Row] = &[
    ("lers-ros-thai-sf", "Lers Ros Thai", 4.2, 1832, "$$", 723.4, "Thai",
        ["730 Larkin St", "San Francisco, CA 94109"], "+14159316917", 0.007, 0.002),
];

const CATALOGUE: &[(&str, &[Row])] = &[
    ("coffee", COFFEE),
    ("restaurants", RESTAURANTS),
    ("thai", THAI),
];

fn to_place(row: &Row, origin: GeoPoint) -> Place {
    let (id, name, rating, reviews, price, distance, category, address, phone, dlat, dlng) = *row;
    Place {
        id: id.to_string(),
        name: name.to_string(),
        rating: Some(rating),
        review_count: Some(reviews),
        price: Some(price.to_string()),
        distance: Some(distance),
        categories: vec![category.to_string()],
        address: address.iter().map(|s| s.to_string()).collect(),
        phone: Some(phone.to_string()),
        coordinates: None,
        is_closed: false,
    }
    .with_coordinates(origin.lat + dlat, origin.lng + dlng)
}

#[derive(Debug, Default, Clone)]
pub struct MockPlaces;

impl MockPlaces {
    fn rows_for(term: &str) -> &'static [Row] {
        let term = term.to_lowercase();
        if let Some((_, rows)) = CATALOGUE.iter().find(|(key, _)| term.contains(key)) {
            return rows;
        }
        if term.is_empty() || term.contains("food") || term.contains("eat") {
            return RESTAURANTS;
        }
        COFFEE
    }
}

#[async_trait]
impl PlaceProvider for MockPlaces {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<Place>, PlaceError> {
        Ok(Self::rows_for(&query.term)
            .iter()
            .take(query.limit)
            .map(|row| to_place(row, query.location))
            .collect())
    }
}
