//! 内存存储后端
//!
//! 基于 DashMap 的进程内实现：insert 借助 entry API 做原子
//! check-and-set，点击计数与事件追加按 key 原子，不同别名互不阻塞。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{ClickEvent, LinkRecord, LinkStore};
use crate::analytics::ClickSink;
use crate::errors::{LinksnipError, Result};

#[derive(Default)]
struct MemoryInner {
    links: DashMap<String, LinkRecord>,
    /// 别名 -> (写入序号, 事件)，序号保证同一时间戳内的稳定顺序
    clicks: DashMap<String, Vec<(u64, ClickEvent)>>,
    click_seq: AtomicU64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LinkStore for MemoryStore {
    async fn insert(&self, record: LinkRecord) -> Result<()> {
        // entry 持有分片写锁，检查与写入之间没有竞态窗口
        match self.inner.links.entry(record.alias.clone()) {
            Entry::Occupied(_) => Err(LinksnipError::alias_already_exists(format!(
                "Alias '{}' already exists",
                record.alias
            ))),
            Entry::Vacant(vacant) => {
                vacant.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, alias: &str) -> Result<Option<LinkRecord>> {
        Ok(self.inner.links.get(alias).map(|r| r.clone()))
    }

    async fn increment_clicks(&self, alias: &str) -> Result<()> {
        match self.inner.links.get_mut(alias) {
            Some(mut record) => {
                record.click_count += 1;
                Ok(())
            }
            None => Err(LinksnipError::alias_not_found(format!(
                "Alias '{}' not found",
                alias
            ))),
        }
    }

    async fn load_clicks(&self, alias: &str) -> Result<Vec<ClickEvent>> {
        let mut entries = self
            .inner
            .clicks
            .get(alias)
            .map(|v| v.clone())
            .unwrap_or_default();

        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            a.occurred_at.cmp(&b.occurred_at).then(seq_a.cmp(seq_b))
        });
        Ok(entries.into_iter().map(|(_, event)| event).collect())
    }

    async fn load_all(&self) -> Result<HashMap<String, LinkRecord>> {
        Ok(self
            .inner
            .links
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn as_click_sink(&self) -> Option<Arc<dyn ClickSink>> {
        Some(Arc::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl ClickSink for MemoryStore {
    async fn flush_clicks(&self, events: Vec<ClickEvent>) -> anyhow::Result<()> {
        for event in events {
            let seq = self.inner.click_seq.fetch_add(1, Ordering::Relaxed);
            self.inner
                .clicks
                .entry(event.alias.clone())
                .or_default()
                .push((seq, event));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(alias: &str) -> LinkRecord {
        LinkRecord::new(alias.into(), "https://example.com".into(), 30, Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        store.insert(record("abc123")).await.unwrap();

        let fetched = store.get("abc123").await.unwrap().unwrap();
        assert_eq!(fetched.target_url, "https://example.com");
        assert_eq!(fetched.click_count, 0);

        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_conflict_is_never_silent_overwrite() {
        let store = MemoryStore::new();
        store.insert(record("promo")).await.unwrap();

        let mut second = record("promo");
        second.target_url = "https://other.example.com".to_string();
        let err = store.insert(second).await.unwrap_err();
        assert!(matches!(err, LinksnipError::AliasAlreadyExists(_)));

        // 原记录保持不变
        let kept = store.get("promo").await.unwrap().unwrap();
        assert_eq!(kept.target_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_expired_record_still_reserves_alias() {
        let store = MemoryStore::new();
        let mut rec = record("oldone");
        rec.expires_at = Utc::now() - Duration::minutes(10);
        store.insert(rec).await.unwrap();

        // 过期是逻辑状态，别名仍被占用
        let err = store.insert(record("oldone")).await.unwrap_err();
        assert!(matches!(err, LinksnipError::AliasAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_concurrent_insert_exactly_one_winner() {
        let store = Arc::new(MemoryStore::new());

        const NUM_TASKS: usize = 32;
        let mut handles = vec![];
        for _ in 0..NUM_TASKS {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(
                async move { store.insert(record("promo")).await },
            ));
        }

        let mut winners = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(LinksnipError::AliasAlreadyExists(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(conflicts, NUM_TASKS - 1);
    }

    #[tokio::test]
    async fn test_concurrent_increment_no_lost_updates() {
        let store = Arc::new(MemoryStore::new());
        store.insert(record("hotlink")).await.unwrap();

        const NUM_TASKS: usize = 10;
        const INCREMENTS_PER_TASK: usize = 500;

        let mut handles = vec![];
        for _ in 0..NUM_TASKS {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..INCREMENTS_PER_TASK {
                    store.increment_clicks("hotlink").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let rec = store.get("hotlink").await.unwrap().unwrap();
        assert_eq!(rec.click_count, (NUM_TASKS * INCREMENTS_PER_TASK) as u64);
    }

    #[tokio::test]
    async fn test_increment_missing_alias() {
        let store = MemoryStore::new();
        let err = store.increment_clicks("missing").await.unwrap_err();
        assert!(matches!(err, LinksnipError::AliasNotFound(_)));
    }

    #[tokio::test]
    async fn test_click_log_ordering_within_same_timestamp() {
        let store = MemoryStore::new();
        store.insert(record("abc123")).await.unwrap();

        let ts = Utc::now();
        let events: Vec<ClickEvent> = (0..5)
            .map(|i| {
                ClickEvent::new("abc123".into(), ts).with_context(
                    super::super::ClickSource::Direct,
                    Some(format!("C{}", i)),
                )
            })
            .collect();
        store.flush_clicks(events).await.unwrap();

        let loaded = store.load_clicks("abc123").await.unwrap();
        assert_eq!(loaded.len(), 5);
        // 相同时间戳按写入序号保持稳定顺序
        for (i, event) in loaded.iter().enumerate() {
            assert_eq!(event.location, format!("C{}", i));
        }
    }
}
