use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use tracing::debug;

use crate::analytics::{Aggregator, Bucket};
use crate::api::types::{
    ApiResponse, BatchCreateResponse, LinkResponse, PostNewLink, StatsQuery, error_response,
};
use crate::errors::LinksnipError;
use crate::services::{CreateLinkRequest, LinkService};

pub struct LinkApi {}

impl LinkApi {
    /// `POST /api/links` — 单条提交
    pub async fn create(
        payload: web::Json<PostNewLink>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let req = to_request(payload.into_inner());

        match service.create_link(req).await {
            Ok(record) => {
                HttpResponse::Created().json(ApiResponse::ok(LinkResponse::from(record)))
            }
            Err(e) => {
                debug!("LinkApi: create rejected: {}", e);
                error_response(&e)
            }
        }
    }

    /// `POST /api/links/batch` — 批量提交，单次最多 5 条
    pub async fn create_batch(
        payload: web::Json<Vec<PostNewLink>>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let requests: Vec<CreateLinkRequest> =
            payload.into_inner().into_iter().map(to_request).collect();

        match service.batch_create(requests).await {
            Ok(result) => {
                HttpResponse::Ok().json(ApiResponse::ok(BatchCreateResponse::from(result)))
            }
            Err(e) => {
                debug!("LinkApi: batch rejected: {}", e);
                error_response(&e)
            }
        }
    }

    /// `GET /api/links/{alias}/stats?from&to&bucket`
    pub async fn stats(
        path: web::Path<String>,
        query: web::Query<StatsQuery>,
        aggregator: web::Data<Arc<Aggregator>>,
    ) -> impl Responder {
        let alias = path.into_inner();
        let query = query.into_inner();

        let window =
            match Aggregator::parse_window_strict(query.from.as_deref(), query.to.as_deref()) {
                Ok(window) => window,
                Err(e) => return error_response(&e),
            };

        let bucket = match query.bucket.as_deref() {
            Some(s) => match s.parse::<Bucket>() {
                Ok(bucket) => bucket,
                Err(msg) => return error_response(&LinksnipError::validation(msg)),
            },
            None => Bucket::default(),
        };

        match aggregator.summarize(&alias, window, bucket).await {
            Ok(summary) => HttpResponse::Ok().json(ApiResponse::ok(summary)),
            Err(e) => error_response(&e),
        }
    }
}

fn to_request(payload: PostNewLink) -> CreateLinkRequest {
    CreateLinkRequest {
        target_url: payload.target_url,
        alias: payload.alias,
        ttl_minutes: payload.ttl_minutes,
    }
}
