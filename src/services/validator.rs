//! Submission validation
//!
//! Pure checks, no side effects. Fields are validated in a fixed order
//! (url, alias, ttl) and the first violated rule is returned, so error
//! reporting stays deterministic.

use crate::errors::{LinksnipError, Result};
use crate::services::link_service::CreateLinkRequest;
use crate::utils::url_validator::validate_target_url;
use crate::utils::{ALIAS_MAX_LEN, ALIAS_MIN_LEN, is_valid_alias};

/// 通过校验的提交，TTL 已填入默认值
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub target_url: String,
    pub alias: Option<String>,
    pub ttl_minutes: i64,
}

/// 校验一次提交
///
/// - `target_url` 必须是 http/https 绝对 URL
/// - `alias` 若给出，必须匹配 `^[a-zA-Z0-9_-]{3,20}$`
/// - `ttl_minutes` 若给出，必须为正整数；缺省使用 `default_ttl_minutes`
pub fn validate(req: &CreateLinkRequest, default_ttl_minutes: i64) -> Result<ValidatedSubmission> {
    let target_url = req.target_url.trim();
    validate_target_url(target_url).map_err(|e| LinksnipError::invalid_url(e.to_string()))?;

    let alias = match req.alias.as_deref().filter(|a| !a.is_empty()) {
        Some(alias) => {
            if !is_valid_alias(alias) {
                return Err(LinksnipError::invalid_alias(format!(
                    "Invalid alias '{}'. Expected {}-{} characters from [a-zA-Z0-9_-]",
                    alias, ALIAS_MIN_LEN, ALIAS_MAX_LEN
                )));
            }
            Some(alias.to_string())
        }
        None => None,
    };

    let ttl_minutes = match req.ttl_minutes {
        Some(ttl) if ttl > 0 => ttl,
        Some(ttl) => {
            return Err(LinksnipError::invalid_ttl(format!(
                "TTL must be a positive number of minutes, got {}",
                ttl
            )));
        }
        None => default_ttl_minutes,
    };

    Ok(ValidatedSubmission {
        target_url: target_url.to_string(),
        alias,
        ttl_minutes,
    })
}
