// =============================================================================
// OUTBOUND ORDERS (orders keluar)
// =============================================================================
// Outbound lines take stock off a floor. A batch created with
// `orders_status = 1` applies every line immediately; any line the floor
// cannot cover aborts the whole batch.
// =============================================================================

use sqlx::PgConnection;

use super::{for_order, insert_log, today, LineStatus, LogDirection};
use crate::catalog;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::{self, Committed, DebitPolicy};
use crate::models::{
    CreatedOutboundLine, LineChangeResponse, LineStatusRequest, OutboundBatchRequest,
    OutboundBatchResponse, OutboundLineInput, OutboundLineView,
};
use crate::sequence::{self, IdKind};
use crate::warehouses;

/// Ledger delta for an outbound status flip.
pub fn outbound_delta(old: LineStatus, new: LineStatus, amount: i32) -> i32 {
    match (old, new) {
        (LineStatus::Pending, LineStatus::Settled) => -amount,
        (LineStatus::Settled, LineStatus::Pending) => amount,
        _ => 0,
    }
}

fn validate_line(line: &OutboundLineInput) -> AppResult<()> {
    if line.item_id.trim().is_empty() {
        return Err(AppError::Validation("barang_id is required".into()));
    }
    if line.amount <= 0 {
        return Err(AppError::Validation(
            "orders_amount must be greater than 0".into(),
        ));
    }
    if line.floor_id.is_none() && line.warehouse_id.is_none() {
        return Err(AppError::Validation(
            "lantai_id or gudang_id is required".into(),
        ));
    }
    Ok(())
}

pub fn validate_batch(req: &OutboundBatchRequest) -> AppResult<LineStatus> {
    let status = LineStatus::try_from(req.status)?;
    if req.orders.is_empty() {
        return Err(AppError::Validation(
            "orders must contain at least one line".into(),
        ));
    }
    for (i, line) in req.orders.iter().enumerate() {
        validate_line(line).map_err(|e| for_order(e, i + 1))?;
    }
    Ok(status)
}

const VIEW_SQL: &str = r#"
    SELECT l.id, l.log_id, g.log_date, g.description AS log_desc,
           l.item_id, i.name AS item_name, b.name AS brand_name,
           l.warehouse_id, w.name AS warehouse_name,
           l.floor_id, f.floor_no, f.name AS floor_name,
           l.amount, l.status
    FROM outbound_lines l
    JOIN movement_logs g ON g.id = l.log_id
    JOIN items i ON i.id = l.item_id
    LEFT JOIN brands b ON b.id = i.brand_id
    JOIN warehouses w ON w.id = l.warehouse_id
    JOIN floors f ON f.id = l.floor_id
"#;

pub async fn fetch_views<'e, E>(
    executor: E,
    log_ids: Option<&[String]>,
) -> AppResult<Vec<OutboundLineView>>
where
    E: sqlx::PgExecutor<'e>,
{
    let views = sqlx::query_as::<_, OutboundLineView>(&format!(
        "{} WHERE ($1::VARCHAR[] IS NULL OR l.log_id = ANY($1)) ORDER BY g.log_date DESC, l.id",
        VIEW_SQL
    ))
    .bind(log_ids)
    .fetch_all(executor)
    .await?;
    Ok(views)
}

async fn fetch_view(conn: &mut PgConnection, line_id: &str) -> AppResult<OutboundLineView> {
    sqlx::query_as::<_, OutboundLineView>(&format!("{} WHERE l.id = $1", VIEW_SQL))
        .bind(line_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", line_id)))
}

impl Database {
    pub async fn create_outbound_batch(
        &self,
        req: OutboundBatchRequest,
    ) -> AppResult<Committed<OutboundBatchResponse>> {
        let status = validate_batch(&req)?;
        let log_date = req.log_date.unwrap_or_else(today);
        let description = req.description.clone().unwrap_or_else(|| "-".to_string());

        let mut tx = self.begin().await?;

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

        let log = insert_log(&mut tx, LogDirection::Outbound, log_date, &description).await?;

        let mut created = Vec::with_capacity(req.orders.len());
        let mut changes = Vec::new();
        for (line, floor) in req.orders.iter().zip(&floors) {
            if status == LineStatus::Settled {
                let change = ledger::apply_delta(
                    &mut tx,
                    &line.item_id,
                    &floor.id,
                    -line.amount,
                    DebitPolicy::Reject,
                )
                .await?;
                changes.push(change);
            }

            let line_id = sequence::next_id(&mut tx, IdKind::OutboundLine).await?;
            sqlx::query(
                r#"
                INSERT INTO outbound_lines
                    (id, log_id, item_id, warehouse_id, floor_id, amount, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&line_id)
            .bind(&log.id)
            .bind(&line.item_id)
            .bind(&floor.warehouse_id)
            .bind(&floor.id)
            .bind(line.amount)
            .bind(status.code())
            .execute(&mut *tx)
            .await?;

            created.push(CreatedOutboundLine {
                id: line_id,
                item_id: line.item_id.clone(),
                warehouse_id: floor.warehouse_id.clone(),
                floor_id: floor.id.clone(),
                amount: line.amount,
            });
        }

        tx.commit().await?;
        tracing::info!(
            log_id = %log.id,
            lines = created.len(),
            applied = status == LineStatus::Settled,
            "Outbound batch created"
        );

        let message = format!("Outbound batch created with {} order lines", created.len());
        Ok(Committed::new(
            OutboundBatchResponse {
                logs_id: log.id,
                logs_status: log.direction,
                logs_date: log.log_date,
                logs_desc: log.description,
                orders_status: status.code(),
                orders: created,
                status: "Created".to_string(),
                message,
            },
            changes,
        ))
    }

    pub async fn list_outbound_lines(&self) -> AppResult<Vec<OutboundLineView>> {
        fetch_views(self.pool(), None).await
    }

    pub async fn get_outbound_line(&self, line_id: &str) -> AppResult<OutboundLineView> {
        let mut conn = self.pool().acquire().await?;
        fetch_view(&mut conn, line_id).await
    }

    pub async fn set_outbound_status(
        &self,
        line_id: &str,
        req: LineStatusRequest,
    ) -> AppResult<Committed<LineChangeResponse>> {
        let new_status = LineStatus::try_from(req.status)?;

        let mut tx = self.begin().await?;
        let (item_id, floor_id, amount, status): (String, String, i32, i32) = sqlx::query_as(
            "SELECT item_id, floor_id, amount, status FROM outbound_lines WHERE id = $1 FOR UPDATE",
        )
        .bind(line_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", line_id)))?;

        let delta = outbound_delta(LineStatus::try_from(status)?, new_status, amount);
        let mut changes = Vec::new();
        if delta != 0 {
            changes.push(
                ledger::apply_delta(&mut tx, &item_id, &floor_id, delta, DebitPolicy::Reject).await?,
            );
        }

        sqlx::query("UPDATE outbound_lines SET status = $2 WHERE id = $1")
            .bind(line_id)
            .bind(new_status.code())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(line_id, delta, status = new_status.code(), "Outbound status updated");

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
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FloorStockInput, StockLevelRequest};

    fn input(item_id: &str, floor_id: &str, amount: i32) -> OutboundLineInput {
        OutboundLineInput {
            warehouse_id: None,
            floor_id: Some(floor_id.into()),
            item_id: item_id.into(),
            amount,
        }
    }

    fn batch(status: i32, orders: Vec<OutboundLineInput>) -> OutboundBatchRequest {
        OutboundBatchRequest {
            log_date: None,
            description: Some("Kirim ke toko".into()),
            status,
            orders,
        }
    }

    #[test]
    fn test_outbound_transitions() {
        use LineStatus::*;
        assert_eq!(outbound_delta(Pending, Settled, 4), -4);
        assert_eq!(outbound_delta(Settled, Pending, 4), 4);
        assert_eq!(outbound_delta(Settled, Settled, 4), 0);
        assert_eq!(outbound_delta(Pending, Pending, 4), 0);
    }

    #[test]
    fn test_validation() {
        assert!(validate_batch(&batch(2, vec![input("BA", "GL", 1)])).is_err());
        assert!(validate_batch(&batch(1, vec![])).is_err());
        let err = validate_batch(&batch(1, vec![input("BA", "GL", -3)])).unwrap_err();
        assert!(err.to_string().ends_with("for order 1"));
        assert_eq!(
            validate_batch(&batch(0, vec![input("BA", "GL", 3)])).unwrap(),
            LineStatus::Pending
        );
    }

    #[test]
    fn test_blank_item_is_a_validation_error() {
        let err = validate_batch(&batch(1, vec![input("", "GL_0001", 2)])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation failed: barang_id is required for order 1"
        );
    }

    async fn seed(db: &Database, fx: &crate::db::test_support::Fixture, quantity: i32) {
        db.set_stock_levels(
            &fx.item_id,
            StockLevelRequest {
                floors: vec![FloorStockInput {
                    floor_id: fx.floor_id.clone(),
                    quantity,
                }],
                warehouses: vec![],
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_overdraw_in_later_line_rolls_back_batch() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;
        seed(&db, &fx, 10).await;

        let err = db
            .create_outbound_batch(batch(
                1,
                vec![
                    input(&fx.item_id, &fx.floor_id, 6),
                    input(&fx.item_id, &fx.floor_id, 6),
                ],
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                available: 4,
                requested: 6,
                ..
            }
        ));
        assert_eq!(
            ledger::get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn test_unstocked_floor_is_insufficient() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;

        let err = db
            .create_outbound_batch(batch(1, vec![input(&fx.item_id, &fx.second_floor_id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 0, .. }));
    }

    #[tokio::test]
    async fn test_pending_then_apply_then_delete_log() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;
        seed(&db, &fx, 10).await;

        let created = db
            .create_outbound_batch(batch(0, vec![input(&fx.item_id, &fx.floor_id, 3)]))
            .await
            .unwrap();
        assert!(created.changes.is_empty());

        let applied = db
            .set_outbound_status(&created.body.orders[0].id, LineStatusRequest { status: 1 })
            .await
            .unwrap();
        assert_eq!(applied.body.stock_change, -3);
        assert_eq!(
            ledger::get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(),
            7
        );

        db.delete_log(&created.body.logs_id).await.unwrap();
        assert_eq!(
            ledger::get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(),
            10
        );
    }
}
