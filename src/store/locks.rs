//! 按键加锁：同一会话键上的读-改-写串行执行，不同键互不阻塞

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// 超过该数量时清理无人持有的锁
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Default)]
pub struct KeyLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取 key 的独占锁，guard 释放前同 key 的其他调用者等待
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        self.get_lock(key).await.lock_owned().await
    }

    async fn get_lock(&self, key: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(key) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        if locks.len() >= PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let guard = locks.lock("session:a").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock("session:a").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.lock("session:a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("session:b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len().await, 2);
    }
}
