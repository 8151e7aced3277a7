//! 上下文缓存：会话、偏好、推荐、反馈、偏好模式
//!
//! 两种后端（Redis / 进程内存）实现同一个 `KvBackend`，在构造时按配置选定一次；
//! 每个命名空间有独立 TTL。会话的读-改-写按会话键串行化。

mod backend;
mod context;
mod locks;
mod memory;
mod redis;

pub use backend::{BackendKind, KvBackend};
pub use context::{ContextStore, TtlPolicy};
pub use locks::KeyLocks;
pub use memory::MemoryBackend;
pub use self::redis::RedisBackend;
