use std::borrow::Cow;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use once_cell::sync::Lazy;
use tracing::trace;
use url::Url;

use crate::api::types::error_response;
use crate::errors::LinksnipError;
use crate::services::{Resolver, VisitContext};
use crate::storage::ClickSource;
use crate::utils::is_valid_alias;

static DEFAULT_REDIRECT_URL: Lazy<String> = Lazy::new(|| {
    std::env::var("DEFAULT_URL")
        .unwrap_or_else(|_| "https://github.com/AptS-1547/linksnip".to_string())
});

pub struct RedirectApi {}

impl RedirectApi {
    /// `GET /` — 根路径跳转到配置的默认地址
    pub async fn handle_root() -> impl Responder {
        HttpResponse::Found()
            .insert_header((header::LOCATION, DEFAULT_REDIRECT_URL.as_str()))
            .finish()
    }

    /// `GET /{alias}` — 解析并 302 跳转
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        resolver: web::Data<Arc<Resolver>>,
    ) -> impl Responder {
        let alias = path.into_inner();

        if !is_valid_alias(&alias) {
            // 非法别名直接 404，不进存储
            trace!("Invalid alias rejected: {}", &alias);
            return Self::not_found_response();
        }

        let ctx = VisitContext {
            source: Self::derive_source(&req),
            location: Self::extract_location(&req),
        };

        match resolver.resolve(&alias, ctx).await {
            Ok(target) => HttpResponse::Found()
                .insert_header((header::LOCATION, target.target_url))
                .finish(),
            Err(LinksnipError::AliasNotFound(_)) => {
                trace!("Redirect alias not found: {}", &alias);
                Self::not_found_response()
            }
            Err(e) => error_response(&e),
        }
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60")) // 缓存404
            .body("Not Found")
    }

    /// 从请求推导流量来源
    ///
    /// 优先级：utm_source 参数 > Referer 域名分类 > Direct
    fn derive_source(req: &HttpRequest) -> ClickSource {
        if let Some(query) = req.uri().query()
            && let Some(utm_source) = Self::extract_query_param(query, "utm_source")
        {
            return Self::classify_utm_source(&utm_source);
        }

        match req
            .headers()
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
        {
            Some(referer) => Self::classify_referer(referer),
            None => ClickSource::Direct,
        }
    }

    /// 从 query string 提取指定参数值
    #[inline]
    fn extract_query_param<'a>(query: &'a str, key: &str) -> Option<Cow<'a, str>> {
        for part in query.split('&') {
            if let Some(value) = part.strip_prefix(key).and_then(|s| s.strip_prefix('=')) {
                // urlencoding::decode 返回 Cow，未编码时零分配
                return urlencoding::decode(value).ok();
            }
        }
        None
    }

    fn classify_utm_source(value: &str) -> ClickSource {
        let value = value.to_lowercase();
        match value.as_str() {
            "email" | "newsletter" | "mail" => ClickSource::Email,
            "facebook" | "twitter" | "x" | "instagram" | "linkedin" | "reddit" | "weibo"
            | "social" => ClickSource::Social,
            "google" | "bing" | "duckduckgo" | "baidu" | "yandex" | "search" => {
                ClickSource::Search
            }
            _ => ClickSource::Other,
        }
    }

    fn classify_referer(referer: &str) -> ClickSource {
        let Some(domain) = Self::extract_domain(referer) else {
            return ClickSource::Other;
        };

        const SEARCH_DOMAINS: &[&str] = &["google.", "bing.", "duckduckgo.", "baidu.", "yandex."];
        const SOCIAL_DOMAINS: &[&str] = &[
            "facebook.", "twitter.", "x.com", "t.co", "instagram.", "linkedin.", "reddit.",
            "weibo.",
        ];
        const EMAIL_DOMAINS: &[&str] = &["mail.google.", "outlook.", "mail.yahoo.", "mail.qq."];

        // mail.google.com 等邮箱域优先于所属搜索域判定
        if EMAIL_DOMAINS.iter().any(|d| domain.contains(d)) {
            return ClickSource::Email;
        }
        if SEARCH_DOMAINS.iter().any(|d| domain.contains(d)) {
            return ClickSource::Search;
        }
        if SOCIAL_DOMAINS.iter().any(|d| domain.contains(d)) {
            return ClickSource::Social;
        }
        ClickSource::Other
    }

    /// 从 URL 提取域名
    #[inline]
    fn extract_domain(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }

    /// 地理位置：反向代理注入的国家头，缺省 unknown
    fn extract_location(req: &HttpRequest) -> Option<String> {
        for name in ["cf-ipcountry", "x-country"] {
            if let Some(value) = req.headers().get(name).and_then(|v| v.to_str().ok())
                && !value.is_empty()
            {
                return Some(value.to_uppercase());
            }
        }
        None
    }
}
