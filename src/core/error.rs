//! 错误类型：上下文缓存与地点检索
//!
//! 这些错误只在组件内部以 `?` 传播；对外接口（ContextStore / PlaceService）在边界处记录日志并降级，
//! 不会把错误抛给编排层或传输层。

use std::time::Duration;

use thiserror::Error;

/// 上下文缓存后端错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Backend timeout after {0:?}")]
    Timeout(Duration),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// 地点检索错误（超时、HTTP 状态、传输、解析）
#[derive(Error, Debug)]
pub enum PlaceError {
    #[error("Place search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Place provider returned HTTP {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed provider payload: {0}")]
    Decode(String),

    #[error("Missing API key for provider {0}")]
    MissingApiKey(&'static str),
}
