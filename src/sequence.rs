// =============================================================================
// ID SEQUENCER
// =============================================================================
// Every row id is a textual prefix plus a zero-padded counter:
//
//   LO_0000001   movement log          OM_0000001   inbound line
//   OK_0000001   outbound line         ST_000001    stock record
//   SL_0000001   sale                  SI_0000001   sale line
//   BA_00001     item                  BR_0001      brand
//   GU_0001      warehouse             GL_0001      floor
//   CU_0000001   customer
//
// The next number is the larger of (suffix of the last stored id + 1) and
// (counter row + 1). The counter row in `id_sequences` is upserted inside the
// caller's transaction, so concurrent writers of one prefix queue on its row
// lock and a number is never handed out twice, even after deletions.
// =============================================================================

use sqlx::PgConnection;

use crate::error::{AppError, AppResult};

/// Entity types that receive generated ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Log,
    InboundLine,
    OutboundLine,
    Stock,
    Sale,
    SaleLine,
    Item,
    Brand,
    Warehouse,
    Floor,
    Customer,
}

impl IdKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            IdKind::Log => "LO",
            IdKind::InboundLine => "OM",
            IdKind::OutboundLine => "OK",
            IdKind::Stock => "ST",
            IdKind::Sale => "SL",
            IdKind::SaleLine => "SI",
            IdKind::Item => "BA",
            IdKind::Brand => "BR",
            IdKind::Warehouse => "GU",
            IdKind::Floor => "GL",
            IdKind::Customer => "CU",
        }
    }

    /// Number of digits after the underscore.
    pub const fn width(self) -> usize {
        match self {
            IdKind::Log
            | IdKind::InboundLine
            | IdKind::OutboundLine
            | IdKind::Sale
            | IdKind::SaleLine
            | IdKind::Customer => 7,
            IdKind::Stock => 6,
            IdKind::Item => 5,
            IdKind::Brand | IdKind::Warehouse | IdKind::Floor => 4,
        }
    }

    const fn table(self) -> &'static str {
        match self {
            IdKind::Log => "movement_logs",
            IdKind::InboundLine => "inbound_lines",
            IdKind::OutboundLine => "outbound_lines",
            IdKind::Stock => "stock",
            IdKind::Sale => "sales",
            IdKind::SaleLine => "sale_lines",
            IdKind::Item => "items",
            IdKind::Brand => "brands",
            IdKind::Warehouse => "warehouses",
            IdKind::Floor => "floors",
            IdKind::Customer => "customers",
        }
    }
}

/// Render `n` as an id of the given kind, e.g. `format_id(IdKind::Log, 7)`
/// is `"LO_0000007"`.
pub fn format_id(kind: IdKind, n: i64) -> String {
    format!("{}_{:0width$}", kind.prefix(), n, width = kind.width())
}

/// Numeric suffix of a stored id. Anything other than `PREFIX_digits` is a
/// corrupt sequence and fails rather than restarting the count at zero.
pub fn parse_suffix(kind: IdKind, id: &str) -> AppResult<i64> {
    let malformed = || AppError::MalformedId {
        prefix: kind.prefix(),
        value: id.to_string(),
    };

    let digits = id
        .strip_prefix(kind.prefix())
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or_else(malformed)?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    digits.parse::<i64>().map_err(|_| malformed())
}

/// Candidate number derived from the lexicographically last stored id.
pub fn candidate_after(kind: IdKind, last_id: Option<&str>) -> AppResult<i64> {
    match last_id {
        None => Ok(1),
        Some(id) => Ok(parse_suffix(kind, id)? + 1),
    }
}

/// Allocate the next id for `kind` inside the caller's transaction.
pub async fn next_id(conn: &mut PgConnection, kind: IdKind) -> AppResult<String> {
    let last_id: Option<String> = sqlx::query_scalar(&format!(
        "SELECT id FROM {} ORDER BY id DESC LIMIT 1",
        kind.table()
    ))
    .fetch_optional(&mut *conn)
    .await?;

    let candidate = candidate_after(kind, last_id.as_deref())?;

    let allocated: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO id_sequences (prefix, last_value)
        VALUES ($1, $2)
        ON CONFLICT (prefix) DO UPDATE
            SET last_value = GREATEST(id_sequences.last_value + 1, EXCLUDED.last_value)
        RETURNING last_value
        "#,
    )
    .bind(kind.prefix())
    .bind(candidate)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format_id(kind, allocated))
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_widths() {
        assert_eq!(format_id(IdKind::Log, 1), "LO_0000001");
        assert_eq!(format_id(IdKind::InboundLine, 42), "OM_0000042");
        assert_eq!(format_id(IdKind::OutboundLine, 3), "OK_0000003");
        assert_eq!(format_id(IdKind::Stock, 12), "ST_000012");
        assert_eq!(format_id(IdKind::Sale, 9), "SL_0000009");
        assert_eq!(format_id(IdKind::SaleLine, 10), "SI_0000010");
        assert_eq!(format_id(IdKind::Item, 5), "BA_00005");
        assert_eq!(format_id(IdKind::Brand, 1), "BR_0001");
        assert_eq!(format_id(IdKind::Warehouse, 2), "GU_0002");
        assert_eq!(format_id(IdKind::Floor, 15), "GL_0015");
        assert_eq!(format_id(IdKind::Customer, 1), "CU_0000001");
    }

    #[test]
    fn test_width_overflow_keeps_all_digits() {
        assert_eq!(format_id(IdKind::Brand, 12345), "BR_12345");
    }

    #[test]
    fn test_candidate_after_empty_table_is_one() {
        assert_eq!(candidate_after(IdKind::Log, None).unwrap(), 1);
    }

    #[test]
    fn test_candidate_after_last_id() {
        assert_eq!(
            candidate_after(IdKind::Log, Some("LO_0000041")).unwrap(),
            42
        );
        assert_eq!(candidate_after(IdKind::Stock, Some("ST_000099")).unwrap(), 100);
    }

    #[test]
    fn test_malformed_ids_fail_fast() {
        for bad in ["LO_", "LO_12a", "OM_0000001", "LO0000001", "LO_-1", ""] {
            let err = parse_suffix(IdKind::Log, bad).unwrap_err();
            assert!(
                matches!(err, AppError::MalformedId { prefix: "LO", .. }),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_format_then_parse_is_identity() {
        for kind in [IdKind::Log, IdKind::Stock, IdKind::Item, IdKind::Floor] {
            for n in [1, 9, 10, 999] {
                assert_eq!(parse_suffix(kind, &format_id(kind, n)).unwrap(), n);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Database-backed (runs when TEST_DATABASE_URL is set)
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_next_id_strictly_increases_per_prefix() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let mut conn = db.pool().acquire().await.unwrap();

        let mut last_log = 0;
        let mut last_brand = 0;
        for _ in 0..5 {
            let log = next_id(&mut conn, IdKind::Log).await.unwrap();
            let brand = next_id(&mut conn, IdKind::Brand).await.unwrap();
            let log_n = parse_suffix(IdKind::Log, &log).unwrap();
            let brand_n = parse_suffix(IdKind::Brand, &brand).unwrap();
            assert!(log_n > last_log);
            assert!(brand_n > last_brand);
            last_log = log_n;
            last_brand = brand_n;
        }
    }

    // The tests below work inside a transaction that is dropped without
    // commit, so the rows they plant never reach other tests.

    async fn plant_log(conn: &mut PgConnection, id: &str) {
        sqlx::query(
            "INSERT INTO movement_logs (id, direction, log_date, description) \
             VALUES ($1, 1, CURRENT_DATE, 'Ditanam oleh test')",
        )
        .bind(id)
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    async fn set_counter(conn: &mut PgConnection, kind: IdKind, value: i64) {
        sqlx::query(
            r#"
            INSERT INTO id_sequences (prefix, last_value) VALUES ($1, $2)
            ON CONFLICT (prefix) DO UPDATE SET last_value = EXCLUDED.last_value
            "#,
        )
        .bind(kind.prefix())
        .bind(value)
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    async fn highest_log(conn: &mut PgConnection) -> i64 {
        let last: Option<String> =
            sqlx::query_scalar("SELECT id FROM movement_logs ORDER BY id DESC LIMIT 1")
                .fetch_optional(&mut *conn)
                .await
                .unwrap();
        candidate_after(IdKind::Log, last.as_deref()).unwrap() - 1
    }

    #[tokio::test]
    async fn test_next_id_catches_up_with_table_when_counter_lags() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let mut tx = db.begin().await.unwrap();

        // Take the counter row lock first so no other writer slips in
        set_counter(&mut tx, IdKind::Log, 1).await;
        let n = highest_log(&mut tx).await + 10;
        plant_log(&mut tx, &format_id(IdKind::Log, n)).await;

        let id = next_id(&mut tx, IdKind::Log).await.unwrap();
        assert_eq!(id, format_id(IdKind::Log, n + 1));
    }

    #[tokio::test]
    async fn test_next_id_keeps_counter_when_table_lags() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let mut tx = db.begin().await.unwrap();

        set_counter(&mut tx, IdKind::Log, 1).await;
        let ahead = highest_log(&mut tx).await + 50;
        set_counter(&mut tx, IdKind::Log, ahead).await;

        let id = next_id(&mut tx, IdKind::Log).await.unwrap();
        assert_eq!(id, format_id(IdKind::Log, ahead + 1));
    }

    #[tokio::test]
    async fn test_next_id_refuses_malformed_last_id() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let mut tx = db.begin().await.unwrap();

        // Letters sort after digits, so this becomes the last stored id
        plant_log(&mut tx, "LO_zzzzzzz").await;

        let err = next_id(&mut tx, IdKind::Log).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::MalformedId { prefix: "LO", ref value } if value == "LO_zzzzzzz"
        ));
    }
}
