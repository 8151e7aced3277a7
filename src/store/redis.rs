//! Redis 后端
//!
//! 使用 ConnectionManager（自动重连）；TTL 以毫秒写入（PX），前缀扫描走 SCAN MATCH，避免 KEYS 阻塞。

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};

use super::backend::{BackendKind, KvBackend};
use crate::core::StoreError;

/// 建立连接的最长等待
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// 单次 SCAN 的建议批量
const SCAN_BATCH: usize = 100;

#[derive(Clone)]
pub struct RedisBackend {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        tracing::info!(url = %url, "Connecting to Redis");
        let client = Client::open(url)?;

        let manager = tokio::time::timeout(CONNECT_TIMEOUT, client.get_connection_manager())
            .await
            .map_err(|_| StoreError::Timeout(CONNECT_TIMEOUT))??;

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

/// 转义 glob 元字符，使会话 ID 中的 `*` `?` `[` 按字面匹配
fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl KvBackend for RedisBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let millis = ttl.as_millis().max(1) as u64;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}*", escape_glob(prefix));

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();

        let mut pairs = Vec::with_capacity(keys.len());
        for key in keys {
            // 扫描与读取之间可能已过期
            let value: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
            if let Some(value) = value {
                pairs.push((key, value));
            }
        }
        Ok(pairs)
    }
}
