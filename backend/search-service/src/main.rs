/// Search Service - HTTP Server
///
/// Answers unified post/user searches and enriches matching posts with
/// their comments and media metadata.
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use search_service::handlers::{self, AppState};
use search_service::{Aggregator, BulkFetcher, Config, ElasticsearchClient};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "search_service=info,db_pool=info,actix_web=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;

    let search = ElasticsearchClient::new(&config.search)
        .context("Failed to initialize Elasticsearch client")?;
    tracing::info!(
        post_index = %config.search.post_index,
        user_index = %config.search.user_index,
        "Elasticsearch client ready"
    );

    config.comment_store.log_config();
    let comment_pool = db_pool::create_pool(config.comment_store.clone())
        .await
        .context("Failed to connect to comment store")?;

    config.media_store.log_config();
    let media_pool = db_pool::create_pool(config.media_store.clone())
        .await
        .context("Failed to connect to media store")?;

    let aggregator = Arc::new(Aggregator::new(
        Arc::new(search),
        Arc::new(BulkFetcher::comments(comment_pool)),
        Arc::new(BulkFetcher::media(media_pool)),
    ));
    let state = web::Data::new(AppState::new(
        aggregator,
        Duration::from_secs(config.app.request_timeout_secs),
    ));

    let bind_address = (config.app.host.clone(), config.app.http_port);
    tracing::info!("search-service listening on {}:{}", bind_address.0, bind_address.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(handlers::cors())
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(bind_address)
    .context("Failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("search-service shutting down");
    Ok(())
}
