// =============================================================================
// MOVEMENT LOGS
// =============================================================================
// A movement log (barang_logs) groups the order lines of one inbound or
// outbound batch under a single date and description.
//
// Deleting a log reverses the stock effect of its lines in two phases:
//
//   1. one transaction reads the lines, deletes them and the log, commits
//   2. each settled line's inverse delta is applied in its own short
//      transaction with DebitPolicy::Clamp
//
// A failure in phase 2 never resurrects the log. It is logged, counted and
// returned to the caller as a warning.
//
// Phase 1 locks the log row, then its lines in id order (FOR UPDATE). A
// concurrent status change on one of those lines either commits first and its
// new status is what gets reversed, or it waits and then finds the line gone.
// Phase 2 locks one stock record at a time and commits straight away; a long
// log never holds many stock rows.
//
// Only settled lines moved stock, so only they are reversed:
//   inbound  settled -> -amount     outbound settled -> +amount
// Pending lines are dropped with nothing to undo. If the floor has since been
// drained below the amount, the restore floors at 0 and says so in a warning
// ("... clamped to 0 (had 2, needed 5)"). A vanished record is reported the
// same way and left absent.
// =============================================================================

pub mod inbound;
pub mod outbound;

use chrono::NaiveDate;
use sqlx::PgConnection;
use std::collections::HashMap;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::{self, Committed, DebitPolicy, StockChange};
use crate::metrics;
use crate::models::{
    DeleteLogResponse, LogDetail, LogFilter, LogLines, LogRequest, LogUpdateRequest, MovementLog,
};
use crate::sequence::{self, IdKind};

// =============================================================================
// CODES
// =============================================================================

/// `logs_status` of a movement log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDirection {
    Inbound,
    Outbound,
}

impl LogDirection {
    pub const fn code(self) -> i32 {
        match self {
            LogDirection::Inbound => 1,
            LogDirection::Outbound => 2,
        }
    }
}

impl TryFrom<i32> for LogDirection {
    type Error = AppError;

    fn try_from(code: i32) -> AppResult<Self> {
        match code {
            1 => Ok(LogDirection::Inbound),
            2 => Ok(LogDirection::Outbound),
            other => Err(AppError::Validation(format!(
                "logs_status must be 1 (inbound) or 2 (outbound), got {}",
                other
            ))),
        }
    }
}

/// `orders_status` of an order line. Settled means the line's stock effect
/// is in the ledger (paid inbound, applied outbound).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Pending,
    Settled,
}

impl LineStatus {
    pub const fn code(self) -> i32 {
        match self {
            LineStatus::Pending => 0,
            LineStatus::Settled => 1,
        }
    }
}

impl TryFrom<i32> for LineStatus {
    type Error = AppError;

    fn try_from(code: i32) -> AppResult<Self> {
        match code {
            0 => Ok(LineStatus::Pending),
            1 => Ok(LineStatus::Settled),
            other => Err(AppError::Validation(format!(
                "orders_status must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

/// Delta that undoes a line's contribution when its log is deleted.
pub fn reversal_delta(direction: LogDirection, status: LineStatus, amount: i32) -> Option<i32> {
    match (status, direction) {
        (LineStatus::Pending, _) => None,
        (LineStatus::Settled, LogDirection::Inbound) => Some(-amount),
        (LineStatus::Settled, LogDirection::Outbound) => Some(amount),
    }
}

/// Tag a per-line validation or lookup error with its 1-based order number.
pub fn for_order(err: AppError, order_no: usize) -> AppError {
    match err {
        AppError::Validation(msg) => AppError::Validation(format!("{} for order {}", msg, order_no)),
        AppError::NotFound(msg) => AppError::NotFound(format!("{} for order {}", msg, order_no)),
        other => other,
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn group_by_log<T>(lines: Vec<T>, log_id: impl Fn(&T) -> &str) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for line in lines {
        grouped.entry(log_id(&line).to_string()).or_default().push(line);
    }
    grouped
}

// =============================================================================
// SHARED QUERIES
// =============================================================================

const LOG_COLUMNS: &str = "id, direction, log_date, description";

pub(crate) async fn insert_log(
    conn: &mut PgConnection,
    direction: LogDirection,
    log_date: NaiveDate,
    description: &str,
) -> AppResult<MovementLog> {
    let log_id = sequence::next_id(conn, IdKind::Log).await?;
    let log = sqlx::query_as::<_, MovementLog>(&format!(
        r#"
        INSERT INTO movement_logs (id, direction, log_date, description)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        LOG_COLUMNS
    ))
    .bind(&log_id)
    .bind(direction.code())
    .bind(log_date)
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;
    Ok(log)
}

async fn lock_log(conn: &mut PgConnection, log_id: &str) -> AppResult<MovementLog> {
    sqlx::query_as::<_, MovementLog>(&format!(
        "SELECT {} FROM movement_logs WHERE id = $1 FOR UPDATE",
        LOG_COLUMNS
    ))
    .bind(log_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Log {} not found", log_id)))
}

/// Stock-relevant columns of a line about to be deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
struct LineEffect {
    id: String,
    item_id: String,
    floor_id: String,
    amount: i32,
    status: i32,
}

fn lines_table(direction: LogDirection) -> &'static str {
    match direction {
        LogDirection::Inbound => "inbound_lines",
        LogDirection::Outbound => "outbound_lines",
    }
}

// =============================================================================
// DATABASE OPERATIONS
// =============================================================================
impl Database {
    /// Create an empty log header.
    pub async fn create_log(&self, req: LogRequest) -> AppResult<MovementLog> {
        let direction = LogDirection::try_from(req.direction)?;
        let description = req.description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("logs_desc is required".into()));
        }

        let mut tx = self.begin().await?;
        let log = insert_log(
            &mut tx,
            direction,
            req.log_date.unwrap_or_else(today),
            description,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(log_id = %log.id, direction = direction.code(), "Movement log created");
        Ok(log)
    }

    /// Logs with their lines, newest first, optionally filtered by
    /// direction and date.
    pub async fn list_logs(&self, filter: LogFilter) -> AppResult<Vec<LogDetail>> {
        if let Some(status) = filter.status {
            LogDirection::try_from(status)?;
        }

        let logs = sqlx::query_as::<_, MovementLog>(&format!(
            r#"
            SELECT {} FROM movement_logs
            WHERE ($1::INTEGER IS NULL OR direction = $1)
              AND ($2::DATE IS NULL OR log_date = $2)
            ORDER BY log_date DESC, id DESC
            "#,
            LOG_COLUMNS
        ))
        .bind(filter.status)
        .bind(filter.date)
        .fetch_all(self.pool())
        .await?;

        let (inbound_ids, outbound_ids): (Vec<&MovementLog>, Vec<&MovementLog>) = logs
            .iter()
            .partition(|log| log.direction == LogDirection::Inbound.code());
        let inbound_ids: Vec<String> = inbound_ids.into_iter().map(|l| l.id.clone()).collect();
        let outbound_ids: Vec<String> = outbound_ids.into_iter().map(|l| l.id.clone()).collect();

        let mut inbound = group_by_log(
            inbound::fetch_views(self.pool(), Some(inbound_ids.as_slice())).await?,
            |l| l.log_id.as_str(),
        );
        let mut outbound = group_by_log(
            outbound::fetch_views(self.pool(), Some(outbound_ids.as_slice())).await?,
            |l| l.log_id.as_str(),
        );

        Ok(logs
            .into_iter()
            .map(|log| {
                let orders = if log.direction == LogDirection::Inbound.code() {
                    LogLines::Inbound(inbound.remove(&log.id).unwrap_or_default())
                } else {
                    LogLines::Outbound(outbound.remove(&log.id).unwrap_or_default())
                };
                LogDetail { log, orders }
            })
            .collect())
    }

    pub async fn get_log(&self, log_id: &str) -> AppResult<LogDetail> {
        let log = sqlx::query_as::<_, MovementLog>(&format!(
            "SELECT {} FROM movement_logs WHERE id = $1",
            LOG_COLUMNS
        ))
        .bind(log_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Log {} not found", log_id)))?;

        let ids = vec![log.id.clone()];
        let orders = match LogDirection::try_from(log.direction)? {
            LogDirection::Inbound => {
                LogLines::Inbound(inbound::fetch_views(self.pool(), Some(ids.as_slice())).await?)
            }
            LogDirection::Outbound => {
                LogLines::Outbound(outbound::fetch_views(self.pool(), Some(ids.as_slice())).await?)
            }
        };
        Ok(LogDetail { log, orders })
    }

    /// Update date and description. The direction may only change while the
    /// log has no lines.
    pub async fn update_log(&self, log_id: &str, req: LogUpdateRequest) -> AppResult<MovementLog> {
        let mut tx = self.begin().await?;
        let current = lock_log(&mut tx, log_id).await?;

        let direction = match req.direction {
            Some(code) => LogDirection::try_from(code)?.code(),
            None => current.direction,
        };

        if direction != current.direction {
            let current_direction = LogDirection::try_from(current.direction)?;
            let line_count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {} WHERE log_id = $1",
                lines_table(current_direction)
            ))
            .bind(log_id)
            .fetch_one(&mut *tx)
            .await?;
            if line_count > 0 {
                return Err(AppError::BadRequest(format!(
                    "Log {} has {} order lines; its direction cannot change",
                    log_id, line_count
                )));
            }
        }

        let log = sqlx::query_as::<_, MovementLog>(&format!(
            r#"
            UPDATE movement_logs
            SET direction = $2,
                log_date = COALESCE($3, log_date),
                description = COALESCE($4, description)
            WHERE id = $1
            RETURNING {}
            "#,
            LOG_COLUMNS
        ))
        .bind(log_id)
        .bind(direction)
        .bind(req.log_date)
        .bind(&req.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(log)
    }

    /// Delete a log and its lines, then restore stock for settled lines.
    pub async fn delete_log(&self, log_id: &str) -> AppResult<Committed<DeleteLogResponse>> {
        // ---------------------------------------------------------------------
        // PHASE 1: delete atomically
        // ---------------------------------------------------------------------
        let mut tx = self.begin().await?;
        let log = lock_log(&mut tx, log_id).await?;
        let direction = LogDirection::try_from(log.direction)?;
        let table = lines_table(direction);

        let effects = sqlx::query_as::<_, LineEffect>(&format!(
            "SELECT id, item_id, floor_id, amount, status FROM {} \
             WHERE log_id = $1 ORDER BY id FOR UPDATE",
            table
        ))
        .bind(log_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(&format!("DELETE FROM {} WHERE log_id = $1", table))
            .bind(log_id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM movement_logs WHERE id = $1")
            .bind(log_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Log {} not found", log_id)));
        }

        tx.commit().await?;
        tracing::info!(log_id, lines = effects.len(), "Movement log deleted");

        // ---------------------------------------------------------------------
        // PHASE 2: best-effort stock restoration
        // ---------------------------------------------------------------------
        let mut warnings = Vec::new();
        let mut changes = Vec::new();

        for effect in &effects {
            let status = match LineStatus::try_from(effect.status) {
                Ok(status) => status,
                Err(err) => {
                    warnings.push(format!("Line {}: {}", effect.id, err));
                    continue;
                }
            };
            let Some(delta) = reversal_delta(direction, status, effect.amount) else {
                continue;
            };

            match self.restore_line(&effect.item_id, &effect.floor_id, delta).await {
                Ok(change) => {
                    if change.before + delta < 0 {
                        metrics::record_restore_warning("log_delete");
                        warnings.push(format!(
                            "Line {}: stock for {} on {} clamped to 0 (had {}, needed {})",
                            effect.id, effect.item_id, effect.floor_id, change.before, -delta
                        ));
                    }
                    changes.push(change);
                }
                Err(err) => {
                    tracing::warn!(
                        log_id,
                        line_id = %effect.id,
                        item_id = %effect.item_id,
                        floor_id = %effect.floor_id,
                        delta,
                        error = %err,
                        "Stock restoration failed after log deletion"
                    );
                    metrics::record_restore_warning("log_delete");
                    warnings.push(format!("Line {}: {}", effect.id, err));
                }
            }
        }

        let message = if warnings.is_empty() {
            "Log deleted with stock restored".to_string()
        } else {
            "Log deleted (with some stock restoration warnings - check logs)".to_string()
        };

        Ok(Committed::new(
            DeleteLogResponse {
                logs_id: log_id.to_string(),
                status: "Deleted".to_string(),
                message,
                warnings,
            },
            changes,
        ))
    }

    async fn restore_line(&self, item_id: &str, floor_id: &str, delta: i32) -> AppResult<StockChange> {
        let mut tx = self.begin().await?;
        let change =
            ledger::apply_delta(&mut tx, item_id, floor_id, delta, DebitPolicy::Clamp).await?;
        tx.commit().await?;
        Ok(change)
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InboundBatchRequest, InboundLineInput};

    #[test]
    fn test_codes_round_trip_and_reject_unknown() {
        assert_eq!(LogDirection::try_from(1).unwrap(), LogDirection::Inbound);
        assert_eq!(LogDirection::try_from(2).unwrap(), LogDirection::Outbound);
        assert!(LogDirection::try_from(3).is_err());
        assert_eq!(LineStatus::try_from(0).unwrap(), LineStatus::Pending);
        assert!(LineStatus::try_from(2).is_err());
    }

    #[test]
    fn test_reversal_delta() {
        assert_eq!(
            reversal_delta(LogDirection::Inbound, LineStatus::Settled, 10),
            Some(-10)
        );
        assert_eq!(
            reversal_delta(LogDirection::Outbound, LineStatus::Settled, 4),
            Some(4)
        );
        assert_eq!(
            reversal_delta(LogDirection::Inbound, LineStatus::Pending, 10),
            None
        );
    }

    #[test]
    fn test_for_order_tags_message() {
        let err = for_order(AppError::NotFound("Barang BA_00009 not found".into()), 2);
        assert_eq!(err.to_string(), "Not found: Barang BA_00009 not found for order 2");
    }

    #[test]
    fn test_group_by_log() {
        let grouped = group_by_log(
            vec![("LO_1", 1), ("LO_2", 2), ("LO_1", 3)],
            |(log, _)| *log,
        );
        assert_eq!(grouped["LO_1"].len(), 2);
        assert_eq!(grouped["LO_2"].len(), 1);
    }

    // -------------------------------------------------------------------------
    // Database-backed (runs when TEST_DATABASE_URL is set)
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_settled_inbound_log_restores_stock() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;

        let created = db
            .create_inbound_batch(InboundBatchRequest {
                log_date: None,
                description: Some("Kiriman pabrik".into()),
                pay_type: 1,
                deadline: None,
                orders: vec![InboundLineInput {
                    warehouse_id: None,
                    floor_id: Some(fx.floor_id.clone()),
                    item_id: fx.item_id.clone(),
                    amount: 10,
                    value: 5_000,
                }],
            })
            .await
            .unwrap();
        assert_eq!(
            ledger::get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(),
            10
        );

        let deleted = db.delete_log(&created.body.logs_id).await.unwrap();
        assert!(deleted.body.warnings.is_empty());
        assert_eq!(deleted.changes.len(), 1);
        assert_eq!(
            ledger::get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(),
            0
        );

        let err = db.get_log(&created.body.logs_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    async fn paid_inbound(
        db: &Database,
        fx: &crate::db::test_support::Fixture,
        amount: i32,
    ) -> String {
        db.create_inbound_batch(InboundBatchRequest {
            log_date: None,
            description: Some("Kiriman lunas".into()),
            pay_type: 1,
            deadline: None,
            orders: vec![InboundLineInput {
                warehouse_id: None,
                floor_id: Some(fx.floor_id.clone()),
                item_id: fx.item_id.clone(),
                amount,
                value: 5_000,
            }],
        })
        .await
        .unwrap()
        .body
        .logs_id
    }

    #[tokio::test]
    async fn test_delete_log_clamps_drained_stock_and_warns() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;
        let log_id = paid_inbound(&db, &fx, 5).await;

        // Three of the five already left the floor through a stocktake
        db.set_stock_levels(
            &fx.item_id,
            crate::models::StockLevelRequest {
                floors: vec![crate::models::FloorStockInput {
                    floor_id: fx.floor_id.clone(),
                    quantity: 2,
                }],
                warehouses: vec![],
            },
        )
        .await
        .unwrap();

        let deleted = db.delete_log(&log_id).await.unwrap();

        assert_eq!(deleted.body.status, "Deleted");
        assert_eq!(deleted.body.warnings.len(), 1);
        let warning = &deleted.body.warnings[0];
        assert!(warning.contains("clamped to 0"), "{warning}");
        assert!(warning.contains("(had 2, needed 5)"), "{warning}");
        assert!(deleted.body.message.contains("warnings"));
        assert_eq!(deleted.changes.len(), 1);
        assert_eq!(deleted.changes[0].after, 0);
        assert_eq!(
            ledger::get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(),
            0
        );
        assert!(matches!(
            db.get_log(&log_id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_log_skips_pending_lines() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;
        let created = db
            .create_inbound_batch(InboundBatchRequest {
                log_date: None,
                description: Some("Kiriman tempo".into()),
                pay_type: 3,
                deadline: NaiveDate::from_ymd_opt(2030, 1, 31),
                orders: vec![InboundLineInput {
                    warehouse_id: None,
                    floor_id: Some(fx.floor_id.clone()),
                    item_id: fx.item_id.clone(),
                    amount: 8,
                    value: 5_000,
                }],
            })
            .await
            .unwrap();

        let deleted = db.delete_log(&created.body.logs_id).await.unwrap();

        assert!(deleted.body.warnings.is_empty());
        assert!(deleted.changes.is_empty());
        assert_eq!(deleted.body.message, "Log deleted with stock restored");
    }

    #[tokio::test]
    async fn test_delete_log_with_missing_stock_record_warns() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;
        let log_id = paid_inbound(&db, &fx, 5).await;

        sqlx::query("DELETE FROM stock WHERE item_id = $1 AND floor_id = $2")
            .bind(&fx.item_id)
            .bind(&fx.floor_id)
            .execute(db.pool())
            .await
            .unwrap();

        let deleted = db.delete_log(&log_id).await.unwrap();

        assert_eq!(deleted.body.warnings.len(), 1);
        let warning = &deleted.body.warnings[0];
        assert!(
            warning.contains(&format!(
                "No stock record for item {} on floor {}",
                fx.item_id, fx.floor_id
            )),
            "{warning}"
        );
        assert!(deleted.changes.is_empty());
        assert_eq!(
            ledger::get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(),
            0
        );
        assert!(matches!(
            db.get_log(&log_id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_direction_change_requires_empty_log() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let log = db
            .create_log(LogRequest {
                direction: 1,
                log_date: None,
                description: "Log kosong".into(),
            })
            .await
            .unwrap();

        let updated = db
            .update_log(
                &log.id,
                LogUpdateRequest {
                    direction: Some(2),
                    log_date: None,
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.direction, 2);
        assert_eq!(updated.description, "Log kosong");

        let deleted = db.delete_log(&log.id).await.unwrap();
        assert!(deleted.changes.is_empty());
    }

    #[tokio::test]
    async fn test_create_log_requires_description() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let err = db
            .create_log(LogRequest {
                direction: 1,
                log_date: None,
                description: "  ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
