use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::LinksnipError;
use crate::services::link_service::BatchCreateResult;
use crate::storage::LinkRecord;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { code: 0, data }
    }
}

/// 单条提交
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostNewLink {
    pub target_url: String,
    pub alias: Option<String>,
    pub ttl_minutes: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LinkResponse {
    pub alias: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub click_count: u64,
}

impl From<LinkRecord> for LinkResponse {
    fn from(record: LinkRecord) -> Self {
        Self {
            alias: record.alias,
            target_url: record.target_url,
            created_at: record.created_at,
            expires_at: record.expires_at,
            click_count: record.click_count,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct BatchFailedResponse {
    pub index: usize,
    pub target_url: String,
    pub error: &'static str,
    pub message: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct BatchCreateResponse {
    pub success: Vec<LinkResponse>,
    pub failed: Vec<BatchFailedResponse>,
}

impl From<BatchCreateResult> for BatchCreateResponse {
    fn from(result: BatchCreateResult) -> Self {
        Self {
            success: result.success.into_iter().map(LinkResponse::from).collect(),
            failed: result
                .failed
                .into_iter()
                .map(|item| BatchFailedResponse {
                    index: item.index,
                    target_url: item.target_url,
                    error: item.kind,
                    message: item.reason,
                })
                .collect(),
        }
    }
}

/// 统计查询参数
#[derive(Deserialize, Clone, Debug, Default)]
pub struct StatsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub bucket: Option<String>,
}

/// 错误响应体：稳定的 `error` 类型 + 人读消息
#[derive(Serialize, Clone, Debug)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: &'static str,
    pub message: String,
}

/// 每种错误映射到固定的状态码与类型，展示层无需匹配字符串
pub fn error_response(err: &LinksnipError) -> HttpResponse {
    let status = match err {
        LinksnipError::InvalidUrl(_)
        | LinksnipError::InvalidAlias(_)
        | LinksnipError::InvalidTtl(_)
        | LinksnipError::Validation(_)
        | LinksnipError::DateParse(_) => StatusCode::BAD_REQUEST,
        LinksnipError::AliasTaken(_) | LinksnipError::AliasAlreadyExists(_) => {
            StatusCode::CONFLICT
        }
        LinksnipError::AliasSpaceExhausted(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LinksnipError::AliasNotFound(_) => StatusCode::NOT_FOUND,
        LinksnipError::AliasExpired(_) => StatusCode::GONE,
        LinksnipError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LinksnipError::StorageUnavailable(_) | LinksnipError::StorageBackendNotFound(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    HttpResponse::build(status).json(ErrorBody {
        code: err.code(),
        error: err.kind(),
        message: err.message().to_string(),
    })
}
