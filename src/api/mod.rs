//! HTTP services
//!
//! Thin transport layer over the core services. Handlers extract request
//! context, call into the services and map every `LinksnipError` to a
//! distinct status code plus a stable error kind.

pub mod links;
pub mod redirect;
pub mod types;

use actix_web::web;

use links::LinkApi;
use redirect::RedirectApi;

/// `/api` 作用域下的全部管理与统计路由
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .route("/links", web::post().to(LinkApi::create))
        .route("/links/batch", web::post().to(LinkApi::create_batch))
        .route("/links/{alias}/stats", web::get().to(LinkApi::stats))
}

/// 根路径跳转路由（注册在最后，避免遮蔽 /api）
pub fn redirect_routes() -> actix_web::Resource {
    web::resource("/{alias}")
        .route(web::get().to(RedirectApi::handle_redirect))
        .route(web::head().to(RedirectApi::handle_redirect))
}

/// `GET /` 跳转到配置的默认地址
pub fn root_routes() -> actix_web::Resource {
    web::resource("/").route(web::get().to(RedirectApi::handle_root))
}
