extern crate purchase_reco;

use actix_web::{http::ContentEncoding, middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use actix_web_prom::PrometheusMetrics;

use actix_web::http::header;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn, Level};

use purchase_reco::cf::cache::MatrixCache;
use purchase_reco::config::{AppConfig, LogConfig, LogFormat};
use purchase_reco::endpoints::health_resource::health;
use purchase_reco::endpoints::index_resource::internal;
use purchase_reco::endpoints::recommend_resource::recommendations;
use purchase_reco::handles::SharedHandlesAndConfig;
use purchase_reco::service::RecommendationService;
use purchase_reco::store::{CsvPurchaseStore, PurchaseHistoryStore};

fn init_logging(config: &LogConfig) {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_default();
    let config = AppConfig::new(&config_path).context("invalid configuration")?;
    init_logging(&config.log);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let qty_workers = config.server.num_workers;
    let num_recommendations = config.model.num_recommendations;
    let max_num_recommendations = config.model.max_num_recommendations;
    let max_similar_customers = config.model.max_similar_customers;

    info!(
        purchases_path = %config.data.purchases_path,
        products_path = %config.data.products_path,
        "using csv purchase history"
    );
    let store: Arc<dyn PurchaseHistoryStore> = Arc::new(CsvPurchaseStore::new(
        &config.data.purchases_path,
        &config.data.products_path,
    ));
    let cache = Arc::new(MatrixCache::new(store.clone(), config.model.refresh_interval));
    let service = Arc::new(RecommendationService::new(
        cache,
        store,
        max_similar_customers,
        max_num_recommendations,
    ));

    if config.model.warm_cache_on_startup {
        // A failure here is not fatal, the first request retries the refresh.
        if let Err(err) = service.cache().ensure_fresh() {
            warn!(error = %err, "could not build matrices on startup");
        }
    }

    let prometheus = PrometheusMetrics::new("api", Some("/internal/prometheus"), None);

    info!(bind_address = %bind_address, qty_workers, "starting http server");
    HttpServer::new(move || {
        let handles_and_config = SharedHandlesAndConfig {
            service: service.clone(),
            num_recommendations,
            max_num_recommendations,
            max_similar_customers,
            qty_workers,
        };

        App::new()
            .wrap(middleware::Compress::new(ContentEncoding::Identity))
            .wrap(prometheus.clone())
            .wrap(middleware::Logger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .header("Cache-Control", "no-cache, no-store, must-revalidate")
                    .header("Pragma", "no-cache")
                    .header("Expires", "0"),
            )
            .data(handles_and_config)
            .service(recommendations)
            .service(health)
            .service(internal)
            .service(web::resource("/").route(web::get().to(|_req: HttpRequest| {
                HttpResponse::Found()
                    .header(header::LOCATION, "/internal")
                    .finish()
            })))
    })
    .workers(qty_workers)
    .bind(&bind_address)
    .with_context(|| format!("could not bind server to address {}", &bind_address))?
    .run()
    .await?;

    Ok(())
}
