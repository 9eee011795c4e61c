use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::info;

use linksnip::analytics::{Aggregator, ClickRecorder};
use linksnip::api::{api_routes, redirect_routes, root_routes};
use linksnip::config::init_config;
use linksnip::services::{LinkService, Resolver};
use linksnip::storage::StorageFactory;
use linksnip::system::init_logging;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = init_config();
    let _log_guard = init_logging(&config.logging);

    // 存储后端
    let store = match StorageFactory::create().await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            return Err(std::io::Error::other(e.to_string()));
        }
    };
    info!("Using storage backend: {}", store.backend_name());

    // 点击事件管道
    let sink = store
        .as_click_sink()
        .expect("storage backend does not accept click events");
    let recorder = Arc::new(ClickRecorder::new(
        sink,
        std::time::Duration::from_secs(config.analytics.flush_interval_secs),
        config.analytics.flush_threshold,
    ));
    let background_recorder = Arc::clone(&recorder);
    tokio::spawn(async move {
        background_recorder.start_background_task().await;
    });

    // 核心服务
    let link_service = Arc::new(LinkService::new(Arc::clone(&store)));
    let resolver = Arc::new(Resolver::new(Arc::clone(&store), Arc::clone(&recorder)));
    let aggregator = Arc::new(Aggregator::new(Arc::clone(&store), Arc::clone(&recorder)));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server at http://{}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&link_service)))
            .app_data(web::Data::new(Arc::clone(&resolver)))
            .app_data(web::Data::new(Arc::clone(&aggregator)))
            .service(api_routes())
            .service(root_routes())
            .service(redirect_routes())
    })
    .workers(config.server.workers())
    .bind(bind_address)?
    .run()
    .await?;

    // 退出前把缓冲中的点击事件刷入存储
    recorder.flush().await;

    Ok(())
}
