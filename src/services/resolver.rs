//! Redirect resolution
//!
//! Looks up an alias, applies the expiry policy and records the click.
//! Expired and missing aliases are normal outcomes, not system failures;
//! expired hits never produce analytics data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::analytics::ClickRecorder;
use crate::errors::{LinksnipError, Result};
use crate::storage::{ClickEvent, ClickSource, LinkStore};

/// 一次访问携带的上下文，由传输层提取
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    pub source: ClickSource,
    pub location: Option<String>,
}

/// 成功解析的跳转目标
#[derive(Debug, Clone)]
pub struct RedirectTarget {
    pub target_url: String,
    pub expires_at: DateTime<Utc>,
}

pub struct Resolver {
    store: Arc<dyn LinkStore>,
    recorder: Arc<ClickRecorder>,
}

impl Resolver {
    pub fn new(store: Arc<dyn LinkStore>, recorder: Arc<ClickRecorder>) -> Self {
        Self { store, recorder }
    }

    /// Resolve an alias against the current clock
    pub async fn resolve(&self, alias: &str, ctx: VisitContext) -> Result<RedirectTarget> {
        self.resolve_at(alias, ctx, Utc::now()).await
    }

    /// Resolve an alias at a caller-supplied instant
    pub async fn resolve_at(
        &self,
        alias: &str,
        ctx: VisitContext,
        now: DateTime<Utc>,
    ) -> Result<RedirectTarget> {
        let record = self.store.get(alias).await?.ok_or_else(|| {
            LinksnipError::alias_not_found(format!("Alias '{}' not found", alias))
        })?;

        if record.is_expired_at(now) {
            // 过期命中不产生分析数据
            debug!("Resolver: expired hit on '{}'", alias);
            return Err(LinksnipError::alias_expired(format!(
                "Alias '{}' expired at {}",
                alias, record.expires_at
            )));
        }

        // 点击记录与跳转决定对调用方是同一个操作：
        // 事件进缓冲区（最终落盘），计数同步递增
        self.recorder.record(
            ClickEvent::new(alias.to_string(), now).with_context(ctx.source, ctx.location),
        );
        self.store.increment_clicks(alias).await?;

        Ok(RedirectTarget {
            target_url: record.target_url,
            expires_at: record.expires_at,
        })
    }
}
