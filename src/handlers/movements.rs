// =============================================================================
// MOVEMENT HANDLERS
// =============================================================================
// Movement logs and their inbound/outbound order lines.
//
//   /api/v1/logs                 GET (?status=&date=), POST
//   /api/v1/logs/:id             GET, PUT, DELETE
//   /api/v1/orders/in            GET
//   /api/v1/orders/in/batch      POST
//   /api/v1/orders/in/:id        GET, PUT
//   /api/v1/orders/in/:id/status PUT
//   /api/v1/orders/out           GET
//   /api/v1/orders/out/batch     POST
//   /api/v1/orders/out/:id       GET
//   /api/v1/orders/out/:id/status PUT
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
    DeleteLogResponse, InboundBatchRequest, InboundBatchResponse, InboundLineView,
    InboundUpdateRequest, LineChangeResponse, LineStatusRequest, LogDetail, LogFilter,
    LogRequest, LogUpdateRequest, MovementLog, OutboundBatchRequest, OutboundBatchResponse,
    OutboundLineView,
};
use crate::AppState;

// =============================================================================
// LOGS
// =============================================================================

/// GET /api/v1/logs?status=1&date=2024-05-01
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<LogFilter>,
) -> AppResult<Json<Vec<LogDetail>>> {
    let logs = timed("list_logs", state.db.list_logs(filter)).await?;
    Ok(Json(logs))
}

pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(log_id): Path<String>,
) -> AppResult<Json<LogDetail>> {
    let log = timed("get_log", state.db.get_log(&log_id)).await?;
    Ok(Json(log))
}

/// Creates an empty log header.
pub async fn create_log(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogRequest>,
) -> AppResult<(StatusCode, Json<MovementLog>)> {
    let log = timed("create_log", state.db.create_log(req)).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update_log(
    State(state): State<Arc<AppState>>,
    Path(log_id): Path<String>,
    Json(req): Json<LogUpdateRequest>,
) -> AppResult<Json<MovementLog>> {
    let log = timed("update_log", state.db.update_log(&log_id, req)).await?;
    Ok(Json(log))
}

/// Deletes the log and its lines, then reverses their stock effect.
/// Reversal problems come back as `warnings` on a 200.
pub async fn delete_log(
    State(state): State<Arc<AppState>>,
    Path(log_id): Path<String>,
) -> AppResult<Json<DeleteLogResponse>> {
    let committed = timed("delete_log", state.db.delete_log(&log_id)).await?;
    Ok(Json(finish(&state, committed).await))
}

// =============================================================================
// INBOUND (orders in)
// =============================================================================

pub async fn list_inbound(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<InboundLineView>>> {
    let lines = timed("list_inbound_lines", state.db.list_inbound_lines()).await?;
    Ok(Json(lines))
}

pub async fn get_inbound(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
) -> AppResult<Json<InboundLineView>> {
    let line = timed("get_inbound_line", state.db.get_inbound_line(&line_id)).await?;
    Ok(Json(line))
}

/// POST /api/v1/orders/in/batch
///
/// # Request Body
/// ```json
/// {
///   "logs_date": "2024-05-01",
///   "logs_desc": "Kiriman pemasok",
///   "orders_pay_type": 1,
///   "orders": [
///     { "lantai_id": "GL_0001", "barang_id": "BA_00001",
///       "orders_amount": 10, "orders_value": 150000 }
///   ]
/// }
/// ```
pub async fn create_inbound_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InboundBatchRequest>,
) -> AppResult<(StatusCode, Json<InboundBatchResponse>)> {
    let committed = timed("create_inbound_batch", state.db.create_inbound_batch(req)).await?;
    Ok((StatusCode::CREATED, Json(finish(&state, committed).await)))
}

pub async fn set_inbound_status(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
    Json(req): Json<LineStatusRequest>,
) -> AppResult<Json<LineChangeResponse>> {
    let committed = timed(
        "set_inbound_status",
        state.db.set_inbound_status(&line_id, req),
    )
    .await?;
    Ok(Json(finish(&state, committed).await))
}

pub async fn update_inbound(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
    Json(req): Json<InboundUpdateRequest>,
) -> AppResult<Json<LineChangeResponse>> {
    let committed = timed(
        "update_inbound_line",
        state.db.update_inbound_line(&line_id, req),
    )
    .await?;
    Ok(Json(finish(&state, committed).await))
}

// =============================================================================
// OUTBOUND (orders out)
// =============================================================================

pub async fn list_outbound(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<OutboundLineView>>> {
    let lines = timed("list_outbound_lines", state.db.list_outbound_lines()).await?;
    Ok(Json(lines))
}

pub async fn get_outbound(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
) -> AppResult<Json<OutboundLineView>> {
    let line = timed("get_outbound_line", state.db.get_outbound_line(&line_id)).await?;
    Ok(Json(line))
}

/// All-or-nothing: one short line rejects the whole batch.
pub async fn create_outbound_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OutboundBatchRequest>,
) -> AppResult<(StatusCode, Json<OutboundBatchResponse>)> {
    let committed = timed(
        "create_outbound_batch",
        state.db.create_outbound_batch(req),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(finish(&state, committed).await)))
}

pub async fn set_outbound_status(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
    Json(req): Json<LineStatusRequest>,
) -> AppResult<Json<LineChangeResponse>> {
    let committed = timed(
        "set_outbound_status",
        state.db.set_outbound_status(&line_id, req),
    )
    .await?;
    Ok(Json(finish(&state, committed).await))
}
