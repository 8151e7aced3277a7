//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RIDER__*` 覆盖（双下划线表示嵌套，如 `RIDER__STORE__BACKEND=memory`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::geo::GeoPoint;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub places: PlacesSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub vehicle: VehicleSection,
}

/// 上下文缓存后端：由配置显式指定，不做隐式探测
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// Redis；启动时 PING 一次，失败则永久降级为内存
    #[default]
    Redis,
    /// 仅进程内存
    Memory,
}

/// [store] 段：后端选择、Redis 地址、历史上限、各命名空间 TTL
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackendKind,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// 会话历史最多保留的交互条数
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub ttl: TtlSection,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            redis_url: default_redis_url(),
            history_limit: default_history_limit(),
            ttl: TtlSection::default(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_history_limit() -> usize {
    50
}

/// [store.ttl] 段：单位秒
#[derive(Debug, Clone, Deserialize)]
pub struct TtlSection {
    #[serde(default = "default_session_secs")]
    pub session_secs: u64,
    #[serde(default = "default_preferences_secs")]
    pub preferences_secs: u64,
    #[serde(default = "default_recommendations_secs")]
    pub recommendations_secs: u64,
    #[serde(default = "default_long_lived_secs")]
    pub feedback_secs: u64,
    #[serde(default = "default_long_lived_secs")]
    pub pattern_secs: u64,
}

impl Default for TtlSection {
    fn default() -> Self {
        Self {
            session_secs: default_session_secs(),
            preferences_secs: default_preferences_secs(),
            recommendations_secs: default_recommendations_secs(),
            feedback_secs: default_long_lived_secs(),
            pattern_secs: default_long_lived_secs(),
        }
    }
}

fn default_session_secs() -> u64 {
    24 * 60 * 60
}

fn default_preferences_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_recommendations_secs() -> u64 {
    30 * 60
}

fn default_long_lived_secs() -> u64 {
    90 * 24 * 60 * 60
}

/// 地点推荐提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlacesProviderKind {
    /// 内置演示数据，无需 API Key
    #[default]
    Mock,
    Yelp,
}

/// [places] 段：提供方、API Key、超时
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSection {
    #[serde(default)]
    pub provider: PlacesProviderKind,
    /// 未设置时回退到环境变量 YELP_API_KEY
    pub api_key: Option<String>,
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    /// 单次检索超时（秒），超时按无结果处理
    #[serde(default = "default_places_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_places_limit")]
    pub default_limit: usize,
}

impl Default for PlacesSection {
    fn default() -> Self {
        Self {
            provider: PlacesProviderKind::default(),
            api_key: None,
            base_url: default_places_base_url(),
            timeout_secs: default_places_timeout_secs(),
            default_limit: default_places_limit(),
        }
    }
}

impl PlacesSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_places_base_url() -> String {
    "https://api.yelp.com/v3".to_string()
}

fn default_places_timeout_secs() -> u64 {
    5
}

fn default_places_limit() -> usize {
    5
}

/// [server] 段：HTTP 网关监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

/// [vehicle] 段：上下文未携带位置时使用的默认坐标
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleSection {
    #[serde(default = "default_lat")]
    pub default_lat: f64,
    #[serde(default = "default_lng")]
    pub default_lng: f64,
}

impl Default for VehicleSection {
    fn default() -> Self {
        Self {
            default_lat: default_lat(),
            default_lng: default_lng(),
        }
    }
}

impl VehicleSection {
    pub fn default_location(&self) -> GeoPoint {
        GeoPoint::new(self.default_lat, self.default_lng)
    }
}

fn default_lat() -> f64 {
    37.7749
}

fn default_lng() -> f64 {
    -122.4194
}

/// 从 config 目录加载配置，环境变量 RIDER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 RIDER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RIDER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_namespace_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.store.backend, StoreBackendKind::Redis);
        assert_eq!(cfg.store.history_limit, 50);
        assert_eq!(cfg.store.ttl.session_secs, 86_400);
        assert_eq!(cfg.store.ttl.preferences_secs, 30 * 86_400);
        assert_eq!(cfg.store.ttl.recommendations_secs, 1_800);
        assert_eq!(cfg.store.ttl.feedback_secs, 90 * 86_400);
        assert_eq!(cfg.places.provider, PlacesProviderKind::Mock);
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[store]\nbackend = \"memory\"\nhistory_limit = 10\n\n[places]\ntimeout_secs = 2"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.store.backend, StoreBackendKind::Memory);
        assert_eq!(cfg.store.history_limit, 10);
        assert_eq!(cfg.store.ttl.session_secs, 86_400);
        assert_eq!(cfg.places.timeout(), Duration::from_secs(2));
    }
}
