// =============================================================================
// GUDANG LEDGER - Main Entry Point
// =============================================================================
// Warehouse stock ledger service.
//
// WHAT THIS SERVICE DOES:
// - Keeps one quantity per (item, floor) and never lets it go negative
// - Processes inbound (purchase) and outbound order lines grouped in logs
// - Records sales, which debit stock line by line
// - Reverses stock effects when logs, sales or sale items are deleted
// - Caches per-item stock views in Redis and exposes Prometheus metrics
// =============================================================================

mod cache;
mod catalog;
mod config;
mod db;
mod error;
mod handlers;
mod ledger;
mod metrics;
mod models;
mod movements;
mod sales;
mod sequence;
mod warehouses;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::StockCache;
use crate::config::Config;
use crate::db::Database;
use crate::handlers::{catalog as cat, health, movements as mv, sales as sl, warehouses as wh};
use crate::metrics::setup_metrics;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by every handler through State<Arc<AppState>>. The pool and the
// Redis ConnectionManager are both cheap to clone and safe to share.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: StockCache,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // RUST_LOG controls levels, e.g. RUST_LOG=info,gudang_ledger=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gudang_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Gudang Ledger...");

    let config = Config::from_env()?;
    info!(
        port = config.port,
        max_connections = config.database_max_connections,
        cache_ttl_secs = config.stock_cache_ttl_secs,
        "Configuration loaded"
    );

    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    let db = Database::connect(&config.database_url, config.database_max_connections).await?;
    info!("Connected to PostgreSQL");

    db.run_migrations().await?;
    info!("Database migrations completed");

    let cache = StockCache::connect(&config.redis_url, config.stock_cache_ttl_secs).await?;
    info!("Connected to Redis");

    let state = Arc::new(AppState {
        db,
        cache,
        metrics_handle,
    });

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .nest("/api/v1", api_routes())
        // route_layer: only matched routes carry a MatchedPath label
        .route_layer(middleware::from_fn(handlers::track_metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Gudang Ledger is listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// -----------------------------------------------------------------------------
// API ROUTES
// -----------------------------------------------------------------------------
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // ----- Catalog -----
        .route("/brands", get(cat::list_brands).post(cat::create_brand))
        .route(
            "/brands/:id",
            get(cat::get_brand).put(cat::update_brand).delete(cat::delete_brand),
        )
        .route("/customers", get(cat::list_customers).post(cat::create_customer))
        .route(
            "/customers/:id",
            get(cat::get_customer)
                .put(cat::update_customer)
                .delete(cat::delete_customer),
        )
        .route("/items", get(cat::list_items).post(cat::create_item))
        .route(
            "/items/:id",
            get(cat::get_item).put(cat::update_item).delete(cat::delete_item),
        )
        .route(
            "/items/:id/stock",
            get(cat::get_item_stock).put(cat::set_item_stock),
        )
        .route(
            "/items/:id/discount",
            put(cat::set_discount).delete(cat::clear_discount),
        )
        .route("/discounts", get(cat::list_discounts))
        .route("/discounts/brands", get(cat::list_discount_brands))
        .route("/discounts/brands/:brand_name/items", get(cat::items_by_brand))
        .route("/stock/:item_id/:floor_id", get(cat::stock_lookup))
        .route(
            "/items/:id/warehouses/:warehouse_id/stock",
            get(cat::warehouse_stock_lookup),
        )
        // ----- Warehouses -----
        .route("/warehouses", get(wh::list_warehouses).post(wh::create_warehouse))
        .route(
            "/warehouses/:id",
            get(wh::get_warehouse)
                .put(wh::update_warehouse)
                .delete(wh::delete_warehouse),
        )
        .route("/warehouses/:id/floors", get(wh::list_warehouse_floors))
        .route("/floors", get(wh::list_floors))
        .route("/floors/:id", get(wh::get_floor))
        // ----- Movement logs -----
        .route("/logs", get(mv::list_logs).post(mv::create_log))
        .route(
            "/logs/:id",
            get(mv::get_log).put(mv::update_log).delete(mv::delete_log),
        )
        .route("/orders/in", get(mv::list_inbound))
        .route("/orders/in/batch", post(mv::create_inbound_batch))
        .route("/orders/in/:id", get(mv::get_inbound).put(mv::update_inbound))
        .route("/orders/in/:id/status", put(mv::set_inbound_status))
        .route("/orders/out", get(mv::list_outbound))
        .route("/orders/out/batch", post(mv::create_outbound_batch))
        .route("/orders/out/:id", get(mv::get_outbound))
        .route("/orders/out/:id/status", put(mv::set_outbound_status))
        // ----- Sales -----
        .route("/sales", get(sl::list_sales).post(sl::create_sale))
        .route("/sales/batch", post(sl::create_sale_batch))
        .route(
            "/sales/:id",
            get(sl::get_sale).put(sl::update_sale).delete(sl::delete_sale),
        )
        .route("/sale-items", get(sl::list_sale_lines).post(sl::create_sale_line))
        .route(
            "/sale-items/:id",
            get(sl::get_sale_line)
                .put(sl::update_sale_line)
                .delete(sl::delete_sale_line),
        )
}
