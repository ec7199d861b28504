// =============================================================================
// SALES
// =============================================================================
// A sale debits stock for each of its lines at creation time. The header
// total is always recomputed from the lines (Σ amount × unit value) after
// any line changes.
//
// Deleting a sale restores every line's amount with DebitPolicy::Clamp in
// the same transaction as the deletion; lines whose stock record has
// disappeared are reported as warnings.
// =============================================================================

use chrono::NaiveDate;
use sqlx::PgConnection;
use std::collections::HashMap;

use crate::catalog;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::{self, Committed, DebitPolicy, StockChange};
use crate::metrics;
use crate::models::{
    DeleteSaleLineResponse, DeleteSaleResponse, Sale, SaleBatchRequest, SaleDetail, SaleLine,
    SaleLineFilter, SaleLineInput, SaleLineRequest, SaleRequest,
};
use crate::movements::today;
use crate::sequence::{self, IdKind};
use crate::warehouses;

// =============================================================================
// CODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalePayment {
    Cash,
    Transfer,
    Credit,
}

impl SalePayment {
    pub const fn code(self) -> &'static str {
        match self {
            SalePayment::Cash => "1",
            SalePayment::Transfer => "2",
            SalePayment::Credit => "3",
        }
    }

    pub fn parse(code: &str) -> AppResult<Self> {
        match code.trim() {
            "1" => Ok(SalePayment::Cash),
            "2" => Ok(SalePayment::Transfer),
            "3" => Ok(SalePayment::Credit),
            other => Err(AppError::Validation(format!(
                "sales_payment must be \"1\" (cash), \"2\" (transfer) or \"3\" (credit), got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStatus {
    Done,
    Processing,
}

impl SaleStatus {
    pub const fn code(self) -> i32 {
        match self {
            SaleStatus::Done => 1,
            SaleStatus::Processing => 2,
        }
    }
}

impl TryFrom<i32> for SaleStatus {
    type Error = AppError;

    fn try_from(code: i32) -> AppResult<Self> {
        match code {
            1 => Ok(SaleStatus::Done),
            2 => Ok(SaleStatus::Processing),
            other => Err(AppError::Validation(format!(
                "sales_status must be 1 (done) or 2 (processing), got {}",
                other
            ))),
        }
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Σ amount × unit value, failing on overflow.
pub fn sale_total(lines: impl IntoIterator<Item = (i32, i64)>) -> AppResult<i64> {
    lines.into_iter().try_fold(0i64, |acc, (amount, unit_value)| {
        i64::from(amount)
            .checked_mul(unit_value)
            .and_then(|line_total| acc.checked_add(line_total))
            .ok_or_else(|| AppError::Validation("sales_total overflows".into()))
    })
}

fn for_item(err: AppError, item_no: usize) -> AppError {
    match err {
        AppError::Validation(msg) => {
            AppError::Validation(format!("{} for sale item {}", msg, item_no))
        }
        AppError::NotFound(msg) => AppError::NotFound(format!("{} for sale item {}", msg, item_no)),
        other => other,
    }
}

struct Header {
    payment: SalePayment,
    status: SaleStatus,
    sale_date: NaiveDate,
}

fn validate_header(req: &SaleRequest) -> AppResult<Header> {
    if req.customer_id.trim().is_empty() {
        return Err(AppError::Validation("customer_id is required".into()));
    }
    Ok(Header {
        payment: SalePayment::parse(&req.payment)?,
        status: SaleStatus::try_from(req.status)?,
        sale_date: req.sale_date.unwrap_or_else(today),
    })
}

pub fn validate_line(line: &SaleLineInput) -> AppResult<()> {
    if line.item_id.trim().is_empty() {
        return Err(AppError::Validation("barang_id is required".into()));
    }
    if line.warehouse_id.trim().is_empty() {
        return Err(AppError::Validation("gudang_id is required".into()));
    }
    if line.amount <= 0 {
        return Err(AppError::Validation(
            "sale_items_amount must be greater than 0".into(),
        ));
    }
    if line.unit_value <= 0 {
        return Err(AppError::Validation(
            "sale_value must be greater than 0".into(),
        ));
    }
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

const SALE_SQL: &str = r#"
    SELECT s.id, s.customer_id, c.name AS customer_name, s.total, s.payment,
           s.sale_date, s.status
    FROM sales s
    LEFT JOIN customers c ON c.id = s.customer_id
"#;

const LINE_SQL: &str = r#"
    SELECT l.id, l.sale_id, l.item_id, i.name AS item_name,
           l.warehouse_id, l.floor_id, l.amount, l.unit_value
    FROM sale_lines l
    LEFT JOIN items i ON i.id = l.item_id
"#;

async fn customer_exists(conn: &mut PgConnection, customer_id: &str) -> AppResult<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn lock_sale(conn: &mut PgConnection, sale_id: &str) -> AppResult<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM sales WHERE id = $1 FOR UPDATE")
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Sale {} not found", sale_id)))
}

async fn lines_of(conn: &mut PgConnection, sale_id: &str) -> AppResult<Vec<SaleLine>> {
    let lines = sqlx::query_as::<_, SaleLine>(&format!(
        "{} WHERE l.sale_id = $1 ORDER BY l.id",
        LINE_SQL
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

async fn load_sale(conn: &mut PgConnection, sale_id: &str) -> AppResult<SaleDetail> {
    let sale = sqlx::query_as::<_, Sale>(&format!("{} WHERE s.id = $1", SALE_SQL))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sale {} not found", sale_id)))?;
    let sale_items = lines_of(conn, sale_id).await?;
    Ok(SaleDetail { sale, sale_items })
}

async fn recompute_total(conn: &mut PgConnection, sale_id: &str) -> AppResult<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        UPDATE sales
        SET total = (
            SELECT COALESCE(SUM(amount::BIGINT * unit_value), 0)::BIGINT
            FROM sale_lines
            WHERE sale_id = $1
        )
        WHERE id = $1
        RETURNING total
        "#,
    )
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(total)
}

/// Resolve references, debit stock and insert one sale line.
async fn insert_line(
    conn: &mut PgConnection,
    sale_id: &str,
    line: &SaleLineInput,
) -> AppResult<StockChange> {
    validate_line(line)?;
    if !catalog::item_exists(conn, &line.item_id).await? {
        return Err(AppError::NotFound(format!("Barang {} not found", line.item_id)));
    }
    let floor = warehouses::resolve_floor(
        conn,
        line.floor_id.as_deref(),
        Some(line.warehouse_id.as_str()),
    )
    .await?;

    let change = ledger::apply_delta(
        conn,
        &line.item_id,
        &floor.id,
        -line.amount,
        DebitPolicy::Reject,
    )
    .await?;

    let line_id = sequence::next_id(conn, IdKind::SaleLine).await?;
    sqlx::query(
        r#"
        INSERT INTO sale_lines (id, sale_id, item_id, warehouse_id, floor_id, amount, unit_value)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&line_id)
    .bind(sale_id)
    .bind(&line.item_id)
    .bind(&floor.warehouse_id)
    .bind(&floor.id)
    .bind(line.amount)
    .bind(line.unit_value)
    .execute(&mut *conn)
    .await?;

    Ok(change)
}

/// Put a deleted line's amount back. A vanished stock record is a warning.
async fn restore_line(
    conn: &mut PgConnection,
    line: &SaleLine,
    warnings: &mut Vec<String>,
) -> AppResult<Option<StockChange>> {
    match ledger::apply_delta(conn, &line.item_id, &line.floor_id, line.amount, DebitPolicy::Clamp)
        .await
    {
        Ok(change) => Ok(Some(change)),
        Err(err @ AppError::MissingStockRecord { .. }) => {
            tracing::warn!(
                sale_id = %line.sale_id,
                line_id = %line.id,
                error = %err,
                "Stock not restored for deleted sale line"
            );
            metrics::record_restore_warning("sale_delete");
            warnings.push(format!("Sale item {}: {}", line.id, err));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

// =============================================================================
// DATABASE OPERATIONS
// =============================================================================
impl Database {
    // -------------------------------------------------------------------------
    // SALE HEADERS
    // -------------------------------------------------------------------------
    pub async fn list_sales(&self) -> AppResult<Vec<SaleDetail>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{} ORDER BY s.sale_date DESC, s.id DESC",
            SALE_SQL
        ))
        .fetch_all(self.pool())
        .await?;

        let ids: Vec<String> = sales.iter().map(|s| s.id.clone()).collect();
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "{} WHERE l.sale_id = ANY($1) ORDER BY l.id",
            LINE_SQL
        ))
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
        for line in lines {
            by_sale.entry(line.sale_id.clone()).or_default().push(line);
        }

        Ok(sales
            .into_iter()
            .map(|sale| {
                let sale_items = by_sale.remove(&sale.id).unwrap_or_default();
                SaleDetail { sale, sale_items }
            })
            .collect())
    }

    pub async fn get_sale(&self, sale_id: &str) -> AppResult<SaleDetail> {
        let mut conn = self.pool().acquire().await?;
        load_sale(&mut conn, sale_id).await
    }

    /// Header only; lines are added through the sale item endpoints.
    pub async fn create_sale(&self, req: SaleRequest) -> AppResult<SaleDetail> {
        let header = validate_header(&req)?;

        let mut tx = self.begin().await?;
        if !customer_exists(&mut tx, &req.customer_id).await? {
            return Err(AppError::NotFound(format!(
                "Customer {} not found",
                req.customer_id
            )));
        }
        let sale_id = sequence::next_id(&mut tx, IdKind::Sale).await?;
        insert_header(&mut tx, &sale_id, &req.customer_id, &header, 0).await?;
        let detail = load_sale(&mut tx, &sale_id).await?;
        tx.commit().await?;

        tracing::info!(%sale_id, "Sale created");
        Ok(detail)
    }

    /// Header and lines in one transaction; every line debits stock.
    pub async fn create_sale_batch(&self, req: SaleBatchRequest) -> AppResult<Committed<SaleDetail>> {
        let header = validate_header(&req.header)?;
        if req.sale_items.is_empty() {
            return Err(AppError::Validation(
                "sale_items must contain at least one item".into(),
            ));
        }
        for (i, line) in req.sale_items.iter().enumerate() {
            validate_line(line).map_err(|e| for_item(e, i + 1))?;
        }
        let total = sale_total(req.sale_items.iter().map(|l| (l.amount, l.unit_value)))?;

        let mut tx = self.begin().await?;
        if !customer_exists(&mut tx, &req.header.customer_id).await? {
            return Err(AppError::NotFound(format!(
                "Customer {} not found",
                req.header.customer_id
            )));
        }

        let sale_id = sequence::next_id(&mut tx, IdKind::Sale).await?;
        insert_header(&mut tx, &sale_id, &req.header.customer_id, &header, total).await?;

        let mut changes = Vec::with_capacity(req.sale_items.len());
        for (i, line) in req.sale_items.iter().enumerate() {
            let change = insert_line(&mut tx, &sale_id, line)
                .await
                .map_err(|e| for_item(e, i + 1))?;
            changes.push(change);
        }

        let detail = load_sale(&mut tx, &sale_id).await?;
        tx.commit().await?;

        tracing::info!(%sale_id, lines = changes.len(), total, "Sale batch created");
        Ok(Committed::new(detail, changes))
    }

    /// Header fields only. The total is recomputed from the lines.
    pub async fn update_sale(&self, sale_id: &str, req: SaleRequest) -> AppResult<SaleDetail> {
        let header = validate_header(&req)?;

        let mut tx = self.begin().await?;
        lock_sale(&mut tx, sale_id).await?;
        if !customer_exists(&mut tx, &req.customer_id).await? {
            return Err(AppError::NotFound(format!(
                "Customer {} not found",
                req.customer_id
            )));
        }

        sqlx::query(
            r#"
            UPDATE sales
            SET customer_id = $2, payment = $3, sale_date = $4, status = $5
            WHERE id = $1
            "#,
        )
        .bind(sale_id)
        .bind(&req.customer_id)
        .bind(header.payment.code())
        .bind(header.sale_date)
        .bind(header.status.code())
        .execute(&mut *tx)
        .await?;

        recompute_total(&mut tx, sale_id).await?;
        let detail = load_sale(&mut tx, sale_id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// Restore every line's stock, then delete lines and header.
    pub async fn delete_sale(&self, sale_id: &str) -> AppResult<Committed<DeleteSaleResponse>> {
        let mut tx = self.begin().await?;
        lock_sale(&mut tx, sale_id).await?;
        let lines = lines_of(&mut tx, sale_id).await?;

        let mut warnings = Vec::new();
        let mut changes = Vec::new();
        for line in &lines {
            if let Some(change) = restore_line(&mut tx, line, &mut warnings).await? {
                changes.push(change);
            }
        }

        sqlx::query("DELETE FROM sale_lines WHERE sale_id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(sale_id, lines = lines.len(), warnings = warnings.len(), "Sale deleted");

        let message = if warnings.is_empty() {
            "Sale deleted with stock restored".to_string()
        } else {
            "Sale deleted (with some stock restoration warnings - check logs)".to_string()
        };
        Ok(Committed::new(
            DeleteSaleResponse {
                sales_id: sale_id.to_string(),
                status: "Deleted".to_string(),
                message,
                warnings,
            },
            changes,
        ))
    }

    // -------------------------------------------------------------------------
    // SALE LINES
    // -------------------------------------------------------------------------
    pub async fn list_sale_lines(&self, filter: SaleLineFilter) -> AppResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "{} WHERE ($1::VARCHAR IS NULL OR l.sale_id = $1) ORDER BY l.id",
            LINE_SQL
        ))
        .bind(filter.sales_id)
        .fetch_all(self.pool())
        .await?;
        Ok(lines)
    }

    pub async fn get_sale_line(&self, line_id: &str) -> AppResult<SaleLine> {
        sqlx::query_as::<_, SaleLine>(&format!("{} WHERE l.id = $1", LINE_SQL))
            .bind(line_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sale item {} not found", line_id)))
    }

    pub async fn create_sale_line(&self, req: SaleLineRequest) -> AppResult<Committed<SaleDetail>> {
        validate_line(&req.line)?;

        let mut tx = self.begin().await?;
        lock_sale(&mut tx, &req.sale_id).await?;
        let change = insert_line(&mut tx, &req.sale_id, &req.line).await?;
        recompute_total(&mut tx, &req.sale_id).await?;
        let detail = load_sale(&mut tx, &req.sale_id).await?;
        tx.commit().await?;

        Ok(Committed::new(detail, vec![change]))
    }

    /// Give the old amount back, then debit the new one, in one transaction.
    pub async fn update_sale_line(
        &self,
        line_id: &str,
        input: SaleLineInput,
    ) -> AppResult<Committed<SaleDetail>> {
        validate_line(&input)?;

        let mut tx = self.begin().await?;
        let old = sqlx::query_as::<_, SaleLine>(&format!("{} WHERE l.id = $1 FOR UPDATE OF l", LINE_SQL))
            .bind(line_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sale item {} not found", line_id)))?;
        lock_sale(&mut tx, &old.sale_id).await?;

        let restored = ledger::apply_delta(
            &mut tx,
            &old.item_id,
            &old.floor_id,
            old.amount,
            DebitPolicy::Reject,
        )
        .await?;

        if !catalog::item_exists(&mut tx, &input.item_id).await? {
            return Err(AppError::NotFound(format!("Barang {} not found", input.item_id)));
        }
        let floor = warehouses::resolve_floor(
            &mut tx,
            input.floor_id.as_deref(),
            Some(input.warehouse_id.as_str()),
        )
        .await?;
        let debited = ledger::apply_delta(
            &mut tx,
            &input.item_id,
            &floor.id,
            -input.amount,
            DebitPolicy::Reject,
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE sale_lines
            SET item_id = $2, warehouse_id = $3, floor_id = $4, amount = $5, unit_value = $6
            WHERE id = $1
            "#,
        )
        .bind(line_id)
        .bind(&input.item_id)
        .bind(&floor.warehouse_id)
        .bind(&floor.id)
        .bind(input.amount)
        .bind(input.unit_value)
        .execute(&mut *tx)
        .await?;

        recompute_total(&mut tx, &old.sale_id).await?;
        let detail = load_sale(&mut tx, &old.sale_id).await?;
        tx.commit().await?;

        tracing::info!(line_id, old_amount = old.amount, new_amount = input.amount, "Sale item updated");
        Ok(Committed::new(detail, vec![restored, debited]))
    }

    pub async fn delete_sale_line(&self, line_id: &str) -> AppResult<Committed<DeleteSaleLineResponse>> {
        let mut tx = self.begin().await?;
        let line = sqlx::query_as::<_, SaleLine>(&format!("{} WHERE l.id = $1 FOR UPDATE OF l", LINE_SQL))
            .bind(line_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sale item {} not found", line_id)))?;
        lock_sale(&mut tx, &line.sale_id).await?;

        let mut warnings = Vec::new();
        let changes: Vec<StockChange> = restore_line(&mut tx, &line, &mut warnings)
            .await?
            .into_iter()
            .collect();

        sqlx::query("DELETE FROM sale_lines WHERE id = $1")
            .bind(line_id)
            .execute(&mut *tx)
            .await?;
        let total = recompute_total(&mut tx, &line.sale_id).await?;
        tx.commit().await?;

        Ok(Committed::new(
            DeleteSaleLineResponse {
                sale_items_id: line_id.to_string(),
                sales_id: line.sale_id,
                sales_total: total,
                status: "Deleted".to_string(),
                warnings,
            },
            changes,
        ))
    }
}

async fn insert_header(
    conn: &mut PgConnection,
    sale_id: &str,
    customer_id: &str,
    header: &Header,
    total: i64,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (id, customer_id, total, payment, sale_date, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(sale_id)
    .bind(customer_id)
    .bind(total)
    .bind(header.payment.code())
    .bind(header.sale_date)
    .bind(header.status.code())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
