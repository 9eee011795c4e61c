use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use crate::analytics::ClickSink;
use crate::errors::{LinksnipError, Result};

pub mod memory;
pub mod models;

pub use models::{ClickEvent, ClickSource, LinkRecord};

/// 别名存储：别名唯一性的唯一仲裁点，同时持有点击事件日志
#[async_trait::async_trait]
pub trait LinkStore: Send + Sync {
    /// 原子 check-and-set 插入；别名已存在时返回 `AliasAlreadyExists`，
    /// 并发插入同一别名时只允许一个成功，绝不静默覆盖
    async fn insert(&self, record: LinkRecord) -> Result<()>;

    /// 纯读取，不做过期过滤（过期判定属于 Resolver）
    async fn get(&self, alias: &str) -> Result<Option<LinkRecord>>;

    /// 原子递增点击计数；并发递增不丢更新
    async fn increment_clicks(&self, alias: &str) -> Result<()>;

    /// 读取某别名的全部点击事件，按 (occurred_at, 写入序号) 排序
    async fn load_clicks(&self, alias: &str) -> Result<Vec<ClickEvent>>;

    async fn load_all(&self) -> Result<HashMap<String, LinkRecord>>;

    fn backend_name(&self) -> &'static str;

    /// 点击事件的写入端（由 ClickRecorder 批量刷入）
    fn as_click_sink(&self) -> Option<Arc<dyn ClickSink>> {
        None
    }
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create() -> Result<Arc<dyn LinkStore>> {
        let config = crate::config::get_config_or_default();
        let backend = &config.storage.backend;

        match backend.as_str() {
            "memory" => Ok(Arc::new(memory::MemoryStore::new()) as Arc<dyn LinkStore>),
            _ => {
                error!("Unknown storage backend: {}", backend);
                Err(LinksnipError::storage_backend_not_found(format!(
                    "Unknown storage backend: {}. Supported: memory",
                    backend
                )))
            }
        }
    }
}
