//! Yelp Fusion 商家检索
//!
//! GET {base_url}/businesses/search，Bearer 认证，半径上限 40000 米，按距离排序；客户端自带超时。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Coordinates, Place, PlaceProvider, PlaceQuery};
use crate::core::PlaceError;

/// Yelp 允许的最大检索半径（米）
const MAX_RADIUS_METERS: u32 = 40_000;

pub struct YelpPlaces {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<Business>,
}

#[derive(Debug, Deserialize)]
struct Business {
    #[serde(default)]
    id: String,
    name: String,
    rating: Option<f64>,
    review_count: Option<u32>,
    price: Option<String>,
    distance: Option<f64>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    location: Option<Location>,
    phone: Option<String>,
    coordinates: Option<Coordinates>,
    #[serde(default)]
    is_closed: bool,
}

#[derive(Debug, Deserialize)]
struct Category {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default)]
    display_address: Vec<String>,
}

impl From<Business> for Place {
    fn from(b: Business) -> Self {
        Place {
            id: b.id,
            name: b.name,
            rating: b.rating,
            review_count: b.review_count,
            price: b.price,
            distance: b.distance,
            categories: b.categories.into_iter().map(|c| c.title).collect(),
            address: b.location.map(|l| l.display_address).unwrap_or_default(),
            phone: b.phone,
            coordinates: b.coordinates,
            is_closed: b.is_closed,
        }
    }
}

impl YelpPlaces {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn parse(body: &str) -> Result<Vec<Place>, PlaceError> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| PlaceError::Decode(e.to_string()))?;
        Ok(response.businesses.into_iter().map(Place::from).collect())
    }
}

#[async_trait]
impl PlaceProvider for YelpPlaces {
    fn name(&self) -> &str {
        "yelp"
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<Place>, PlaceError> {
        let url = format!("{}/businesses/search", self.base_url);
        let radius = query.radius_meters.min(MAX_RADIUS_METERS);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("latitude", query.location.lat.to_string()),
                ("longitude", query.location.lng.to_string()),
                ("term", query.term.clone()),
                ("radius", radius.to_string()),
                ("limit", query.limit.to_string()),
                ("sort_by", "distance".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(PlaceError::Status(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        Self::parse(&body)
    }
}

/// 构建失败时退回无超时的默认客户端（外层 PlaceService 仍有超时）
fn build_client(timeout: Duration) -> Client {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(
                "Failed to build Yelp HTTP client ({}), using default client without timeout",
                e
            );
            Client::default()
        }
    }
}
