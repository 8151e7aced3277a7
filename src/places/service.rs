//! 面向核心的地点检索服务
//!
//! 先查推荐缓存（位置保留 3 位小数 + 检索词），未命中再调用提供方；提供方调用受超时约束，
//! 超时、HTTP 错误、解析错误一律记日志并返回空列表。非空结果写回缓存。

use std::sync::Arc;
use std::time::Duration;

use super::{MockPlaces, Place, PlaceProvider, PlaceQuery, YelpPlaces};
use crate::config::{PlacesProviderKind, PlacesSection};
use crate::core::PlaceError;
use crate::geo::GeoPoint;
use crate::store::ContextStore;

pub struct PlaceService {
    provider: Arc<dyn PlaceProvider>,
    timeout: Duration,
    cache: Option<Arc<ContextStore>>,
}

impl PlaceService {
    pub fn new(provider: Arc<dyn PlaceProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            cache: None,
        }
    }

    /// 结果写入 / 读取推荐缓存
    pub fn with_cache(mut self, store: Arc<ContextStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// 按配置构建：yelp 需要 API Key（配置或环境变量 YELP_API_KEY），缺失时回退 mock
    pub fn from_config(cfg: &PlacesSection) -> Self {
        let provider: Arc<dyn PlaceProvider> = match cfg.provider {
            PlacesProviderKind::Mock => Arc::new(MockPlaces),
            PlacesProviderKind::Yelp => {
                let api_key = cfg
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("YELP_API_KEY").ok())
                    .filter(|k| !k.trim().is_empty());
                match api_key {
                    Some(key) => {
                        Arc::new(YelpPlaces::new(key, cfg.base_url.clone(), cfg.timeout()))
                    }
                    None => {
                        let missing = PlaceError::MissingApiKey("yelp");
                        tracing::warn!("{} - using mock place data", missing);
                        Arc::new(MockPlaces)
                    }
                }
            }
        };
        tracing::info!(provider = provider.name(), "Place provider ready");
        Self::new(provider, cfg.timeout())
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// 检索附近地点；任何失败都返回空列表
    pub async fn search(
        &self,
        location: GeoPoint,
        term: &str,
        radius_meters: u32,
        limit: usize,
    ) -> Vec<Place> {
        let location_key = location.rounded_key();

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get_cached_recommendations(&location_key, term).await {
                tracing::debug!(location = %location_key, term = %term, "Recommendation cache hit");
                return cached.into_iter().take(limit).collect();
            }
        }

        let query = PlaceQuery::new(location, term, radius_meters).with_limit(limit);
        let results = match self.search_with_timeout(&query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    term = %term,
                    "Place search failed: {}",
                    e
                );
                return Vec::new();
            }
        };

        if let Some(cache) = &self.cache {
            if !results.is_empty() {
                cache.cache_recommendations(&location_key, term, &results).await;
            }
        }
        results
    }

    async fn search_with_timeout(&self, query: &PlaceQuery) -> Result<Vec<Place>, PlaceError> {
        tokio::time::timeout(self.timeout, self.provider.search(query))
            .await
            .map_err(|_| PlaceError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlaceProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn search(&self, _query: &PlaceQuery) -> Result<Vec<Place>, PlaceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Place::named("Blue Bottle", 4.5)])
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl PlaceProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn search(&self, _query: &PlaceQuery) -> Result<Vec<Place>, PlaceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![Place::named("Too Late", 5.0)])
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl PlaceProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn search(&self, _query: &PlaceQuery) -> Result<Vec<Place>, PlaceError> {
            Err(PlaceError::Status(503))
        }
    }

    fn here() -> GeoPoint {
        GeoPoint::new(37.7749, -122.4194)
    }

    #[tokio::test]
    async fn test_cache_avoids_second_lookup() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let service = PlaceService::new(provider.clone(), Duration::from_secs(1))
            .with_cache(Arc::new(ContextStore::in_memory()));

        assert_eq!(service.search(here(), "coffee", 2000, 5).await.len(), 1);
        // 同一 ~100m 网格内
        let nearby = GeoPoint::new(37.77491, -122.41941);
        assert_eq!(service.search(nearby, "coffee", 2000, 5).await.len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        service.search(here(), "thai", 2000, 5).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_yields_empty() {
        let service = PlaceService::new(Arc::new(SlowProvider), Duration::from_millis(50));
        assert!(service.search(here(), "coffee", 2000, 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_yields_empty() {
        let service = PlaceService::new(Arc::new(FailingProvider), Duration::from_secs(1));
        assert!(service.search(here(), "coffee", 2000, 5).await.is_empty());
    }

    #[test]
    fn test_from_config_without_key_falls_back_to_mock() {
        let cfg = PlacesSection {
            provider: PlacesProviderKind::Yelp,
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        // 配置中的空白 key 优先于环境变量，被过滤后回退 mock
        let service = PlaceService::from_config(&cfg);
        assert_eq!(service.provider_name(), "mock");
    }
}
