// =============================================================================
// INBOUND ORDERS (orders masuk)
// =============================================================================
// Each inbound line is either paid (settled at creation, +amount on the
// ledger) or on credit (pending until settled, no ledger effect):
//
//   PENDING --settle--> SETTLED --revert--> PENDING
//
// Every transition re-derives the delta with `inbound_delta` and applies it
// with DebitPolicy::Reject in the same transaction as the row update.
// =============================================================================

use chrono::NaiveDate;
use sqlx::PgConnection;

use super::{for_order, insert_log, today, LineStatus, LogDirection};
use crate::catalog;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::{self, Committed, DebitPolicy};
use crate::models::{
    CreatedInboundLine, InboundBatchRequest, InboundBatchResponse, InboundLineInput,
    InboundLineView, InboundUpdateRequest, LineChangeResponse, LineStatusRequest,
};
use crate::sequence::{self, IdKind};
use crate::warehouses;

// =============================================================================
// PAY TYPE
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayType {
    Paid,
    Credit,
}

impl PayType {
    pub const fn code(self) -> i32 {
        match self {
            PayType::Paid => 1,
            PayType::Credit => 3,
        }
    }

    /// Status a freshly created line starts in.
    pub const fn initial_status(self) -> LineStatus {
        match self {
            PayType::Paid => LineStatus::Settled,
            PayType::Credit => LineStatus::Pending,
        }
    }
}

impl TryFrom<i32> for PayType {
    type Error = AppError;

    fn try_from(code: i32) -> AppResult<Self> {
        match code {
            1 => Ok(PayType::Paid),
            3 => Ok(PayType::Credit),
            other => Err(AppError::Validation(format!(
                "orders_pay_type must be 1 (paid) or 3 (credit), got {}",
                other
            ))),
        }
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================
/// Ledger delta for moving a line from (old status, old amount) to
/// (new status, new amount).
pub fn inbound_delta(old: LineStatus, new: LineStatus, old_amount: i32, new_amount: i32) -> i32 {
    match (old, new) {
        (LineStatus::Pending, LineStatus::Pending) => 0,
        (LineStatus::Pending, LineStatus::Settled) => new_amount,
        (LineStatus::Settled, LineStatus::Pending) => -old_amount,
        (LineStatus::Settled, LineStatus::Settled) => new_amount - old_amount,
    }
}

fn validate_line(line: &InboundLineInput) -> AppResult<()> {
    if line.item_id.trim().is_empty() {
        return Err(AppError::Validation("barang_id is required".into()));
    }
    if line.amount <= 0 {
        return Err(AppError::Validation(
            "orders_amount must be greater than 0".into(),
        ));
    }
    if line.value <= 0 {
        return Err(AppError::Validation(
            "orders_value must be greater than 0".into(),
        ));
    }
    if line.floor_id.is_none() && line.warehouse_id.is_none() {
        return Err(AppError::Validation(
            "lantai_id or gudang_id is required".into(),
        ));
    }
    Ok(())
}

/// Shape checks for a whole batch; runs before any transaction is opened.
pub fn validate_batch(req: &InboundBatchRequest) -> AppResult<PayType> {
    let pay_type = PayType::try_from(req.pay_type)?;
    if pay_type == PayType::Credit && req.deadline.is_none() {
        return Err(AppError::Validation(
            "orders_deadline is required for credit payment (orders_pay_type 3)".into(),
        ));
    }
    if req.orders.is_empty() {
        return Err(AppError::Validation(
            "orders must contain at least one line".into(),
        ));
    }
    for (i, line) in req.orders.iter().enumerate() {
        validate_line(line).map_err(|e| for_order(e, i + 1))?;
    }
    Ok(pay_type)
}

// =============================================================================
// QUERIES
// =============================================================================

const VIEW_SQL: &str = r#"
    SELECT l.id, l.log_id, g.log_date, g.description AS log_desc,
           l.item_id, i.name AS item_name, b.name AS brand_name,
           l.warehouse_id, w.name AS warehouse_name,
           l.floor_id, f.floor_no, f.name AS floor_name,
           l.amount, l.value, l.pay_type, l.status, l.deadline
    FROM inbound_lines l
    JOIN movement_logs g ON g.id = l.log_id
    JOIN items i ON i.id = l.item_id
    LEFT JOIN brands b ON b.id = i.brand_id
    JOIN warehouses w ON w.id = l.warehouse_id
    JOIN floors f ON f.id = l.floor_id
"#;

/// Inbound lines with display names; all of them when `log_ids` is None.
pub async fn fetch_views<'e, E>(
    executor: E,
    log_ids: Option<&[String]>,
) -> AppResult<Vec<InboundLineView>>
where
    E: sqlx::PgExecutor<'e>,
{
    let views = sqlx::query_as::<_, InboundLineView>(&format!(
        "{} WHERE ($1::VARCHAR[] IS NULL OR l.log_id = ANY($1)) ORDER BY g.log_date DESC, l.id",
        VIEW_SQL
    ))
    .bind(log_ids)
    .fetch_all(executor)
    .await?;
    Ok(views)
}

async fn fetch_view(conn: &mut PgConnection, line_id: &str) -> AppResult<InboundLineView> {
    sqlx::query_as::<_, InboundLineView>(&format!("{} WHERE l.id = $1", VIEW_SQL))
        .bind(line_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", line_id)))
}

#[derive(Debug, sqlx::FromRow)]
struct StoredLine {
    item_id: String,
    floor_id: String,
    amount: i32,
    status: i32,
}

async fn lock_line(conn: &mut PgConnection, line_id: &str) -> AppResult<StoredLine> {
    sqlx::query_as::<_, StoredLine>(
        "SELECT item_id, floor_id, amount, status FROM inbound_lines WHERE id = $1 FOR UPDATE",
    )
    .bind(line_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", line_id)))
}

// =============================================================================
// DATABASE OPERATIONS
// =============================================================================
impl Database {
    /// Create a log and its inbound lines in one transaction. Paid lines
    /// add their amount to stock immediately.
    pub async fn create_inbound_batch(
        &self,
        req: InboundBatchRequest,
    ) -> AppResult<Committed<InboundBatchResponse>> {
        let pay_type = validate_batch(&req)?;
        let log_date = req.log_date.unwrap_or_else(today);
        let description = req.description.clone().unwrap_or_else(|| "-".to_string());
        let status = pay_type.initial_status();
        let deadline: Option<NaiveDate> = match pay_type {
            PayType::Paid => Some(log_date),
            PayType::Credit => req.deadline,
        };

        let mut tx = self.begin().await?;

        // Existence checks for every line before the first write
        let mut floors = Vec::with_capacity(req.orders.len());
        for (i, line) in req.orders.iter().enumerate() {
            if !catalog::item_exists(&mut tx, &line.item_id).await? {
                return Err(for_order(
                    AppError::NotFound(format!("Barang {} not found", line.item_id)),
                    i + 1,
                ));
            }
            let floor = warehouses::resolve_floor(
                &mut tx,
                line.floor_id.as_deref(),
                line.warehouse_id.as_deref(),
            )
            .await
            .map_err(|e| for_order(e, i + 1))?;
            floors.push(floor);
        }

        let log = insert_log(&mut tx, LogDirection::Inbound, log_date, &description).await?;

        let mut created = Vec::with_capacity(req.orders.len());
        let mut changes = Vec::new();
        for (line, floor) in req.orders.iter().zip(&floors) {
            let line_id = sequence::next_id(&mut tx, IdKind::InboundLine).await?;
            sqlx::query(
                r#"
                INSERT INTO inbound_lines
                    (id, log_id, item_id, warehouse_id, floor_id, amount, value,
                     pay_type, status, deadline)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&line_id)
            .bind(&log.id)
            .bind(&line.item_id)
            .bind(&floor.warehouse_id)
            .bind(&floor.id)
            .bind(line.amount)
            .bind(line.value)
            .bind(pay_type.code())
            .bind(status.code())
            .bind(deadline)
            .execute(&mut *tx)
            .await?;

            if status == LineStatus::Settled {
                let change = ledger::apply_delta(
                    &mut tx,
                    &line.item_id,
                    &floor.id,
                    line.amount,
                    DebitPolicy::Reject,
                )
                .await?;
                changes.push(change);
            }

            created.push(CreatedInboundLine {
                id: line_id,
                item_id: line.item_id.clone(),
                warehouse_id: floor.warehouse_id.clone(),
                floor_id: floor.id.clone(),
                amount: line.amount,
                value: line.value,
            });
        }

        tx.commit().await?;
        tracing::info!(
            log_id = %log.id,
            lines = created.len(),
            pay_type = pay_type.code(),
            "Inbound batch created"
        );

        let message = format!("Inbound batch created with {} order lines", created.len());
        Ok(Committed::new(
            InboundBatchResponse {
                logs_id: log.id,
                logs_status: log.direction,
                logs_date: log.log_date,
                logs_desc: log.description,
                orders_pay_type: pay_type.code(),
                orders_deadline: deadline,
                orders_status: status.code(),
                orders: created,
                status: "Created".to_string(),
                message,
            },
            changes,
        ))
    }

    pub async fn list_inbound_lines(&self) -> AppResult<Vec<InboundLineView>> {
        fetch_views(self.pool(), None).await
    }

    pub async fn get_inbound_line(&self, line_id: &str) -> AppResult<InboundLineView> {
        let mut conn = self.pool().acquire().await?;
        fetch_view(&mut conn, line_id).await
    }

    /// Settle (0 → 1) or revert (1 → 0) a line.
    pub async fn set_inbound_status(
        &self,
        line_id: &str,
        req: LineStatusRequest,
    ) -> AppResult<Committed<LineChangeResponse>> {
        let new_status = LineStatus::try_from(req.status)?;

        let mut tx = self.begin().await?;
        let line = lock_line(&mut tx, line_id).await?;
        let old_status = LineStatus::try_from(line.status)?;
        let delta = inbound_delta(old_status, new_status, line.amount, line.amount);

        let mut changes = Vec::new();
        if delta != 0 {
            changes.push(
                ledger::apply_delta(&mut tx, &line.item_id, &line.floor_id, delta, DebitPolicy::Reject)
                    .await?,
            );
        }

        sqlx::query("UPDATE inbound_lines SET status = $2 WHERE id = $1")
            .bind(line_id)
            .bind(new_status.code())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(line_id, delta, status = new_status.code(), "Inbound status updated");

        Ok(Committed::new(
            LineChangeResponse {
                message: "Order status updated successfully".to_string(),
                orders_id: line_id.to_string(),
                orders_status: new_status.code(),
                stock_change: delta,
            },
            changes,
        ))
    }

    /// Edit amount, value, payment and status together.
    pub async fn update_inbound_line(
        &self,
        line_id: &str,
        req: InboundUpdateRequest,
    ) -> AppResult<Committed<LineChangeResponse>> {
        if req.amount <= 0 {
            return Err(AppError::Validation(
                "orders_amount must be greater than 0".into(),
            ));
        }
        if req.value <= 0 {
            return Err(AppError::Validation(
                "orders_value must be greater than 0".into(),
            ));
        }
        let pay_type = PayType::try_from(req.pay_type)?;
        let new_status = LineStatus::try_from(req.status)?;
        if pay_type == PayType::Credit && new_status == LineStatus::Pending && req.deadline.is_none()
        {
            return Err(AppError::Validation(
                "orders_deadline is required for credit payment (orders_pay_type 3)".into(),
            ));
        }

        let mut tx = self.begin().await?;
        let line = lock_line(&mut tx, line_id).await?;
        let old_status = LineStatus::try_from(line.status)?;
        let delta = inbound_delta(old_status, new_status, line.amount, req.amount);

        let mut changes = Vec::new();
        if delta != 0 {
            changes.push(
                ledger::apply_delta(&mut tx, &line.item_id, &line.floor_id, delta, DebitPolicy::Reject)
                    .await?,
            );
        }

        sqlx::query(
            r#"
            UPDATE inbound_lines
            SET amount = $2, value = $3, pay_type = $4, status = $5,
                deadline = COALESCE($6, deadline)
            WHERE id = $1
            "#,
        )
        .bind(line_id)
        .bind(req.amount)
        .bind(req.value)
        .bind(pay_type.code())
        .bind(new_status.code())
        .bind(req.deadline)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(line_id, delta, "Inbound line updated");

        Ok(Committed::new(
            LineChangeResponse {
                message: "Order updated successfully".to_string(),
                orders_id: line_id.to_string(),
                orders_status: new_status.code(),
                stock_change: delta,
            },
            changes,
        ))
    }
}
