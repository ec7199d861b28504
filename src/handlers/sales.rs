// =============================================================================
// SALES HANDLERS
// =============================================================================
//   /api/v1/sales            GET, POST (header only)
//   /api/v1/sales/batch      POST (header + lines)
//   /api/v1/sales/:id        GET, PUT, DELETE
//   /api/v1/sale-items       GET (?sales_id=), POST
//   /api/v1/sale-items/:id   GET, PUT, DELETE
// =============================================================================

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{finish, timed};
use crate::error::AppResult;
use crate::models::{
    DeleteSaleLineResponse, DeleteSaleResponse, SaleBatchRequest, SaleDetail, SaleLine,
    SaleLineFilter, SaleLineInput, SaleLineRequest, SaleRequest,
};
use crate::AppState;

// =============================================================================
// SALES
// =============================================================================

pub async fn list_sales(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<SaleDetail>>> {
    let sales = timed("list_sales", state.db.list_sales()).await?;
    Ok(Json(sales))
}

pub async fn get_sale(
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<String>,
) -> AppResult<Json<SaleDetail>> {
    let sale = timed("get_sale", state.db.get_sale(&sale_id)).await?;
    Ok(Json(sale))
}

pub async fn create_sale(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaleRequest>,
) -> AppResult<(StatusCode, Json<SaleDetail>)> {
    let sale = timed("create_sale", state.db.create_sale(req)).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// POST /api/v1/sales/batch
///
/// # Request Body
/// ```json
/// {
///   "customer_id": "CU_0000001",
///   "sales_payment": "1",
///   "sales_status": 1,
///   "sale_items": [
///     { "barang_id": "BA_00001", "gudang_id": "GU_0001",
///       "sale_items_amount": 2, "sale_value": 15000 }
///   ]
/// }
/// ```
pub async fn create_sale_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaleBatchRequest>,
) -> AppResult<(StatusCode, Json<SaleDetail>)> {
    let committed = timed("create_sale_batch", state.db.create_sale_batch(req)).await?;
    Ok((StatusCode::CREATED, Json(finish(&state, committed).await)))
}

pub async fn update_sale(
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<String>,
    Json(req): Json<SaleRequest>,
) -> AppResult<Json<SaleDetail>> {
    let sale = timed("update_sale", state.db.update_sale(&sale_id, req)).await?;
    Ok(Json(sale))
}

pub async fn delete_sale(
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<String>,
) -> AppResult<Json<DeleteSaleResponse>> {
    let committed = timed("delete_sale", state.db.delete_sale(&sale_id)).await?;
    Ok(Json(finish(&state, committed).await))
}

// =============================================================================
// SALE ITEMS
// =============================================================================

pub async fn list_sale_lines(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SaleLineFilter>,
) -> AppResult<Json<Vec<SaleLine>>> {
    let lines = timed("list_sale_lines", state.db.list_sale_lines(filter)).await?;
    Ok(Json(lines))
}

pub async fn get_sale_line(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
) -> AppResult<Json<SaleLine>> {
    let line = timed("get_sale_line", state.db.get_sale_line(&line_id)).await?;
    Ok(Json(line))
}

/// Adds a line to an existing sale and returns the whole sale.
pub async fn create_sale_line(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaleLineRequest>,
) -> AppResult<(StatusCode, Json<SaleDetail>)> {
    let committed = timed("create_sale_line", state.db.create_sale_line(req)).await?;
    Ok((StatusCode::CREATED, Json(finish(&state, committed).await)))
}

pub async fn update_sale_line(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
    Json(input): Json<SaleLineInput>,
) -> AppResult<Json<SaleDetail>> {
    let committed = timed(
        "update_sale_line",
        state.db.update_sale_line(&line_id, input),
    )
    .await?;
    Ok(Json(finish(&state, committed).await))
}

pub async fn delete_sale_line(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
) -> AppResult<Json<DeleteSaleLineResponse>> {
    let committed = timed("delete_sale_line", state.db.delete_sale_line(&line_id)).await?;
    Ok(Json(finish(&state, committed).await))
}
