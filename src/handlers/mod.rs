// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP controller layer. Handlers extract typed input, call one Database
// operation and turn its result into JSON.
//
// AXUM EXTRACTORS USED:
// - State<Arc<AppState>>: shared pool, cache and metrics handle
// - Path<T>: `/items/:id` → id
// - Query<T>: `?status=1&date=2024-05-01`
// - Json<T>: request body; a malformed body is rejected by axum with 4xx
//
// After every committed ledger change, `finish` publishes the new levels to
// the stock gauge and drops the cached stock views of the touched items.
// =============================================================================

pub mod catalog;
pub mod health;
pub mod movements;
pub mod sales;
pub mod warehouses;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::time::Instant;

use crate::error::AppResult;
use crate::ledger::{Committed, StockChange};
use crate::metrics;
use crate::AppState;

// -----------------------------------------------------------------------------
// REQUEST METRICS MIDDLEWARE
// -----------------------------------------------------------------------------
/// Counts every request and records its latency, labelled by matched route.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(req).await;

    metrics::record_http_request(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

// -----------------------------------------------------------------------------
// SHARED HELPERS
// -----------------------------------------------------------------------------

/// Await a database operation and record its latency under `operation`.
pub(crate) async fn timed<T>(
    operation: &str,
    fut: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    let start = Instant::now();
    let result = fut.await;
    metrics::record_db_query(operation, start.elapsed().as_secs_f64());
    result
}

pub(crate) async fn publish(state: &AppState, changes: &[StockChange]) {
    for change in changes {
        metrics::set_stock_level(&change.item_id, &change.floor_id, change.after);
    }
    state.cache.invalidate(touched_items(changes)).await;
}

pub(crate) async fn finish<T>(state: &AppState, committed: Committed<T>) -> T {
    publish(state, &committed.changes).await;
    committed.body
}

fn touched_items(changes: &[StockChange]) -> Vec<&str> {
    let mut items: Vec<&str> = changes.iter().map(|c| c.item_id.as_str()).collect();
    items.sort_unstable();
    items.dedup();
    items
}
