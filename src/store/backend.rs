//! 键值后端抽象：get / 带 TTL 的 set / 前缀扫描 / ping

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::StoreError;

/// 当前使用的后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Redis,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Redis => write!(f, "redis"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// 键值后端接口
#[async_trait]
pub trait KvBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// 连通性检查
    async fn ping(&self) -> Result<(), StoreError>;

    /// 读取；不存在或已过期返回 None
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 写入并从本次写入起重新计算 TTL
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// 列出以 prefix 开头的全部 (key, value)，顺序不保证
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError>;
}
