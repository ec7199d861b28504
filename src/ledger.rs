// =============================================================================
// STOCK LEDGER
// =============================================================================
// One counter per (item, floor). Every quantity change in the service goes
// through `apply_delta`, which locks the row, decides the new value with the
// pure `settle` function and writes it back.
//
// LOCKING:
//   apply_delta reads the record with SELECT ... FOR UPDATE. The row lock is
//   held until the caller's transaction ends, so two requests moving the same
//   (item, floor) run one after the other and neither sees a stale quantity.
//   Records for different floors never block each other.
//
//   A credit against a missing record first inserts a zero row
//   (ON CONFLICT DO NOTHING) and then locks it. Two first-time credits race
//   on the unique key, not on a lost update.
//
// DEBIT RULES:
//
//   | policy | record   | delta  | result                            |
//   |--------|----------|--------|-----------------------------------|
//   | Reject | present  | any    | q + delta, InsufficientStock if <0 |
//   | Reject | missing  | >= 0   | record created, then q = delta     |
//   | Reject | missing  | < 0    | InsufficientStock (available 0)    |
//   | Clamp  | present  | any    | max(q + delta, 0), warn if floored |
//   | Clamp  | missing  | any    | MissingStockRecord                 |
//
//   Reject is for forward movements: receiving, shipping, selling. Clamp is
//   only for undoing an earlier movement after its row is already gone, where
//   refusing would leave nothing to retry against.
//
// LEARNING NOTES:
// - `settle` has no I/O, so the arithmetic rules are unit and property tested
// - The async functions take `&mut PgConnection` so they run inside whatever
//   transaction the caller opened; a later failure rolls them back too
// =============================================================================

use serde::Serialize;
use sqlx::PgConnection;

use crate::error::{AppError, AppResult};
use crate::sequence::{self, IdKind};

// -----------------------------------------------------------------------------
// POLICY
// -----------------------------------------------------------------------------
/// What to do with a debit the record cannot cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitPolicy {
    /// Fail with `InsufficientStock`; missing records are created for credits.
    Reject,
    /// Floor the result at zero; a missing record is `MissingStockRecord`.
    /// Used only when restoring stock after deletions.
    Clamp,
}

/// Outcome of the pure arithmetic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub quantity: i32,
    pub clamped: bool,
}

/// Before/after of one committed adjustment, used after commit to refresh
/// gauges and drop cached stock views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockChange {
    pub item_id: String,
    pub floor_id: String,
    pub before: i32,
    pub after: i32,
}

/// A mutation result together with the stock rows it touched.
#[derive(Debug)]
pub struct Committed<T> {
    pub body: T,
    pub changes: Vec<StockChange>,
}

impl<T> Committed<T> {
    pub fn new(body: T, changes: Vec<StockChange>) -> Self {
        Self { body, changes }
    }
}

// =============================================================================
// PURE ARITHMETIC
// =============================================================================
/// New quantity for a record currently holding `current` (None = no record).
pub fn settle(
    item_id: &str,
    floor_id: &str,
    current: Option<i32>,
    delta: i32,
    policy: DebitPolicy,
) -> AppResult<Settlement> {
    let insufficient = |available: i32| AppError::InsufficientStock {
        item_id: item_id.to_string(),
        floor_id: floor_id.to_string(),
        available,
        requested: delta.saturating_neg(),
    };

    let base = match (current, policy) {
        (Some(q), _) => q,
        (None, DebitPolicy::Reject) if delta < 0 => return Err(insufficient(0)),
        (None, DebitPolicy::Reject) => 0,
        (None, DebitPolicy::Clamp) => {
            return Err(AppError::MissingStockRecord {
                item_id: item_id.to_string(),
                floor_id: floor_id.to_string(),
            })
        }
    };

    let raw = base.checked_add(delta).ok_or_else(|| {
        AppError::Validation(format!(
            "Stock quantity overflow for item {} on floor {}",
            item_id, floor_id
        ))
    })?;

    match policy {
        DebitPolicy::Reject if raw < 0 => Err(insufficient(base)),
        DebitPolicy::Clamp if raw < 0 => Ok(Settlement {
            quantity: 0,
            clamped: true,
        }),
        _ => Ok(Settlement {
            quantity: raw,
            clamped: false,
        }),
    }
}

// =============================================================================
// DATABASE OPERATIONS
// =============================================================================

/// Current quantity; 0 when the record does not exist.
pub async fn get_quantity<'e, E>(executor: E, item_id: &str, floor_id: &str) -> AppResult<i32>
where
    E: sqlx::PgExecutor<'e>,
{
    let quantity: Option<i32> =
        sqlx::query_scalar("SELECT quantity FROM stock WHERE item_id = $1 AND floor_id = $2")
            .bind(item_id)
            .bind(floor_id)
            .fetch_optional(executor)
            .await?;

    Ok(quantity.unwrap_or(0))
}

/// Lock the record for the rest of the transaction.
async fn lock_quantity(
    conn: &mut PgConnection,
    item_id: &str,
    floor_id: &str,
) -> AppResult<Option<i32>> {
    let quantity = sqlx::query_scalar(
        "SELECT quantity FROM stock WHERE item_id = $1 AND floor_id = $2 FOR UPDATE",
    )
    .bind(item_id)
    .bind(floor_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity)
}

/// Create a zero-quantity record if none exists. Safe to call repeatedly.
pub async fn ensure_record(conn: &mut PgConnection, item_id: &str, floor_id: &str) -> AppResult<()> {
    let exists: Option<String> =
        sqlx::query_scalar("SELECT id FROM stock WHERE item_id = $1 AND floor_id = $2")
            .bind(item_id)
            .bind(floor_id)
            .fetch_optional(&mut *conn)
            .await?;
    if exists.is_some() {
        return Ok(());
    }

    let stock_id = sequence::next_id(conn, IdKind::Stock).await?;
    sqlx::query(
        r#"
        INSERT INTO stock (id, item_id, floor_id, quantity)
        VALUES ($1, $2, $3, 0)
        ON CONFLICT (item_id, floor_id) DO NOTHING
        "#,
    )
    .bind(&stock_id)
    .bind(item_id)
    .bind(floor_id)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(%stock_id, item_id, floor_id, "Stock record created");
    Ok(())
}

async fn write_quantity(
    conn: &mut PgConnection,
    item_id: &str,
    floor_id: &str,
    quantity: i32,
) -> AppResult<()> {
    sqlx::query("UPDATE stock SET quantity = $1 WHERE item_id = $2 AND floor_id = $3")
        .bind(quantity)
        .bind(item_id)
        .bind(floor_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Apply a signed delta to the (item, floor) record.
pub async fn apply_delta(
    conn: &mut PgConnection,
    item_id: &str,
    floor_id: &str,
    delta: i32,
    policy: DebitPolicy,
) -> AppResult<StockChange> {
    let mut current = lock_quantity(conn, item_id, floor_id).await?;

    if delta == 0 {
        let q = current.unwrap_or(0);
        return Ok(StockChange {
            item_id: item_id.to_string(),
            floor_id: floor_id.to_string(),
            before: q,
            after: q,
        });
    }

    // Credits under Reject create the record lazily
    if current.is_none() && delta > 0 && policy == DebitPolicy::Reject {
        ensure_record(conn, item_id, floor_id).await?;
        current = lock_quantity(conn, item_id, floor_id).await?;
    }

    let settlement = settle(item_id, floor_id, current, delta, policy)?;
    let before = current.unwrap_or(0);
    write_quantity(conn, item_id, floor_id, settlement.quantity).await?;

    if settlement.clamped {
        tracing::warn!(
            item_id,
            floor_id,
            before,
            delta,
            "Stock restore clamped at zero"
        );
    }

    crate::metrics::record_ledger_adjustment(if delta > 0 { "credit" } else { "debit" });

    Ok(StockChange {
        item_id: item_id.to_string(),
        floor_id: floor_id.to_string(),
        before,
        after: settlement.quantity,
    })
}

/// Overwrite the record with an absolute quantity (initial stock seeding).
pub async fn set_quantity(
    conn: &mut PgConnection,
    item_id: &str,
    floor_id: &str,
    quantity: i32,
) -> AppResult<StockChange> {
    if quantity < 0 {
        return Err(AppError::Validation(format!(
            "stock_barang must not be negative for floor {}",
            floor_id
        )));
    }

    ensure_record(conn, item_id, floor_id).await?;
    let before = lock_quantity(conn, item_id, floor_id).await?.unwrap_or(0);
    write_quantity(conn, item_id, floor_id, quantity).await?;
    crate::metrics::record_ledger_adjustment("set");

    Ok(StockChange {
        item_id: item_id.to_string(),
        floor_id: floor_id.to_string(),
        before,
        after: quantity,
    })
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reject_credit_on_missing_record_starts_at_zero() {
        let s = settle("BA_00001", "GL_0001", None, 10, DebitPolicy::Reject).unwrap();
        assert_eq!(s.quantity, 10);
        assert!(!s.clamped);
    }

    #[test]
    fn test_reject_debit_on_missing_record() {
        let err = settle("BA_00001", "GL_0001", None, -1, DebitPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                available: 0,
                requested: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_reject_overdraw_reports_available() {
        let err = settle("BA_00001", "GL_0001", Some(8), -10, DebitPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                available: 8,
                requested: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_exact_debit_reaches_zero() {
        let s = settle("BA_00001", "GL_0001", Some(10), -10, DebitPolicy::Reject).unwrap();
        assert_eq!(s.quantity, 0);
    }

    #[test]
    fn test_clamp_floors_at_zero() {
        let s = settle("BA_00001", "GL_0001", Some(3), -5, DebitPolicy::Clamp).unwrap();
        assert_eq!(s, Settlement { quantity: 0, clamped: true });
    }

    #[test]
    fn test_clamp_credit_is_plain_addition() {
        let s = settle("BA_00001", "GL_0001", Some(3), 4, DebitPolicy::Clamp).unwrap();
        assert_eq!(s, Settlement { quantity: 7, clamped: false });
    }

    #[test]
    fn test_clamp_missing_record() {
        let err = settle("BA_00001", "GL_0001", None, 5, DebitPolicy::Clamp).unwrap_err();
        assert!(matches!(err, AppError::MissingStockRecord { .. }));
    }

    #[test]
    fn test_overflow_is_validation_error() {
        let err = settle("BA_00001", "GL_0001", Some(i32::MAX), 1, DebitPolicy::Reject).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Under Reject the quantity never goes negative, and a rejected
        /// delta leaves the quantity untouched.
        #[test]
        fn prop_reject_never_negative(
            start in 0i32..1_000,
            deltas in prop::collection::vec(-500i32..500, 1..50),
        ) {
            let mut q = start;
            for d in deltas {
                match settle("BA_00001", "GL_0001", Some(q), d, DebitPolicy::Reject) {
                    Ok(s) => {
                        prop_assert!(s.quantity >= 0);
                        prop_assert_eq!(s.quantity, q + d);
                        q = s.quantity;
                    }
                    Err(AppError::InsufficientStock { available, .. }) => {
                        prop_assert_eq!(available, q);
                        prop_assert!(q + d < 0);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other}"),
                }
            }
        }

        #[test]
        fn prop_clamp_is_max_zero(start in 0i32..1_000, delta in -2_000i32..2_000) {
            let s = settle("BA_00001", "GL_0001", Some(start), delta, DebitPolicy::Clamp).unwrap();
            prop_assert_eq!(s.quantity, (start + delta).max(0));
            prop_assert_eq!(s.clamped, start + delta < 0);
        }
    }

    // -------------------------------------------------------------------------
    // Database-backed (runs when TEST_DATABASE_URL is set)
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ensure_record_is_idempotent() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;
        let mut conn = db.pool().acquire().await.unwrap();

        ensure_record(&mut conn, &fx.item_id, &fx.floor_id).await.unwrap();
        ensure_record(&mut conn, &fx.item_id, &fx.floor_id).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock WHERE item_id = $1 AND floor_id = $2")
                .bind(&fx.item_id)
                .bind(&fx.floor_id)
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_debit_rolls_back() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;

        let mut tx = db.pool().begin().await.unwrap();
        apply_delta(&mut tx, &fx.item_id, &fx.floor_id, 5, DebitPolicy::Reject)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = apply_delta(&mut tx, &fx.item_id, &fx.floor_id, -6, DebitPolicy::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 5, .. }));
        drop(tx);

        assert_eq!(get_quantity(db.pool(), &fx.item_id, &fx.floor_id).await.unwrap(), 5);
    }
}
