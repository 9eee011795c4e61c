//! Link allocation service
//!
//! Validates submissions and allocates aliases against the store. The
//! store's insert is the authoritative uniqueness check; generated codes
//! are only advisory candidates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::errors::{LinksnipError, Result};
use crate::services::validator;
use crate::storage::{LinkRecord, LinkStore};
use crate::utils::generate_random_code;

/// Request to create a new short link
#[derive(Debug, Clone)]
pub struct CreateLinkRequest {
    /// Target URL
    pub target_url: String,
    /// Custom alias (optional, will be generated if not provided)
    pub alias: Option<String>,
    /// Time-to-live in minutes (optional, defaults from config)
    pub ttl_minutes: Option<i64>,
}

/// Single failed item of a batch submission
#[derive(Debug, Clone)]
pub struct BatchFailedItem {
    pub index: usize,
    pub target_url: String,
    /// 稳定错误类型，见 `LinksnipError::kind`
    pub kind: &'static str,
    pub reason: String,
}

/// Result of a batch submission
#[derive(Debug, Clone, Default)]
pub struct BatchCreateResult {
    pub success: Vec<LinkRecord>,
    pub failed: Vec<BatchFailedItem>,
}

/// Service for alias allocation
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    random_code_length: usize,
    default_ttl_minutes: i64,
    max_generate_attempts: usize,
    max_batch_size: usize,
}

impl LinkService {
    /// Create a new LinkService from global configuration
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        let config = crate::config::get_config_or_default();
        Self::with_settings(
            store,
            config.features.random_code_length,
            config.features.default_ttl_minutes,
            config.features.max_generate_attempts,
            config.features.max_batch_size,
        )
    }

    /// Create a LinkService with explicit settings (used by tests)
    pub fn with_settings(
        store: Arc<dyn LinkStore>,
        random_code_length: usize,
        default_ttl_minutes: i64,
        max_generate_attempts: usize,
        max_batch_size: usize,
    ) -> Self {
        Self {
            store,
            random_code_length,
            default_ttl_minutes,
            max_generate_attempts,
            max_batch_size,
        }
    }

    /// Create a new short link, allocating an alias if none was supplied
    pub async fn create_link(&self, req: CreateLinkRequest) -> Result<LinkRecord> {
        self.create_link_at(req, Utc::now()).await
    }

    /// Same as `create_link` with a caller-supplied creation time
    pub async fn create_link_at(
        &self,
        req: CreateLinkRequest,
        now: DateTime<Utc>,
    ) -> Result<LinkRecord> {
        let validated = validator::validate(&req, self.default_ttl_minutes)?;

        match validated.alias {
            Some(alias) => {
                // 调用方明确要求这个别名：冲突直接上报，绝不退回自动生成
                let record = LinkRecord::new(
                    alias.clone(),
                    validated.target_url,
                    validated.ttl_minutes,
                    now,
                );
                match self.store.insert(record.clone()).await {
                    Ok(()) => {
                        info!(
                            "LinkService: created '{}' -> '{}' (custom alias)",
                            record.alias, record.target_url
                        );
                        Ok(record)
                    }
                    Err(LinksnipError::AliasAlreadyExists(_)) => Err(LinksnipError::alias_taken(
                        format!("Alias '{}' is already taken", alias),
                    )),
                    Err(e) => Err(e),
                }
            }
            None => {
                self.insert_with_generated_alias(validated.target_url, validated.ttl_minutes, now)
                    .await
            }
        }
    }

    /// 生成候选别名并插入，冲突时重试，超出上限返回 `AliasSpaceExhausted`
    async fn insert_with_generated_alias(
        &self,
        target_url: String,
        ttl_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<LinkRecord> {
        for attempt in 1..=self.max_generate_attempts {
            let candidate = generate_random_code(self.random_code_length);
            let record =
                LinkRecord::new(candidate.clone(), target_url.clone(), ttl_minutes, now);

            match self.store.insert(record.clone()).await {
                Ok(()) => {
                    info!(
                        "LinkService: created '{}' -> '{}' (generated, attempt {})",
                        record.alias, record.target_url, attempt
                    );
                    return Ok(record);
                }
                Err(LinksnipError::AliasAlreadyExists(_)) => {
                    debug!(
                        "LinkService: generated alias '{}' collided, attempt {}/{}",
                        candidate, attempt, self.max_generate_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        // 容量信号：连续随机碰撞说明别名空间接近耗尽
        error!(
            "LinkService: alias space exhausted after {} attempts at length {}",
            self.max_generate_attempts, self.random_code_length
        );
        Err(LinksnipError::alias_space_exhausted(format!(
            "Could not allocate a unique alias after {} attempts",
            self.max_generate_attempts
        )))
    }

    /// Batch submission: each item is processed independently, failures do
    /// not affect other items
    pub async fn batch_create(&self, requests: Vec<CreateLinkRequest>) -> Result<BatchCreateResult> {
        if requests.len() > self.max_batch_size {
            return Err(LinksnipError::validation(format!(
                "Batch size {} exceeds maximum of {}",
                requests.len(),
                self.max_batch_size
            )));
        }

        let mut result = BatchCreateResult::default();
        for (index, req) in requests.into_iter().enumerate() {
            let target_url = req.target_url.clone();
            match self.create_link(req).await {
                Ok(record) => result.success.push(record),
                Err(e) => result.failed.push(BatchFailedItem {
                    index,
                    target_url,
                    kind: e.kind(),
                    reason: e.message().to_string(),
                }),
            }
        }

        info!(
            "LinkService: batch created {} links, {} failed",
            result.success.len(),
            result.failed.len()
        );
        Ok(result)
    }
}
