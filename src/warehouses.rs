// =============================================================================
// WAREHOUSES & FLOORS
// =============================================================================
// A warehouse (gudang) owns floors (lantai) numbered 1..n. Floors are created
// and renamed together with their warehouse: "{warehouse name} Lt.{n}".
//
// Stock always lives on a floor. Older clients address a warehouse only;
// `resolve_floor` maps that to the warehouse's lowest-numbered floor.
// =============================================================================

use sqlx::PgConnection;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Floor, Warehouse, WarehouseDetail, WarehouseRequest};
use crate::sequence::{self, IdKind};

// -----------------------------------------------------------------------------
// PURE HELPERS
// -----------------------------------------------------------------------------

pub fn floor_name(warehouse_name: &str, floor_no: i32) -> String {
    format!("{} Lt.{}", warehouse_name, floor_no)
}

/// The floor legacy warehouse-level requests land on.
pub fn first_floor(floors: &[Floor]) -> Option<&Floor> {
    floors.iter().min_by_key(|f| f.floor_no)
}

fn validate_request(req: &WarehouseRequest) -> AppResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("gudang_nama is required".into()));
    }
    if req.floor_count < 1 {
        return Err(AppError::Validation(
            "jumlah_lantai must be at least 1".into(),
        ));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// LOOKUPS USED INSIDE TRANSACTIONS
// -----------------------------------------------------------------------------

pub async fn find_floor(conn: &mut PgConnection, floor_id: &str) -> AppResult<Option<Floor>> {
    let floor = sqlx::query_as::<_, Floor>(
        "SELECT id, warehouse_id, floor_no, name FROM floors WHERE id = $1",
    )
    .bind(floor_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(floor)
}

async fn floors_of(conn: &mut PgConnection, warehouse_id: &str) -> AppResult<Vec<Floor>> {
    let floors = sqlx::query_as::<_, Floor>(
        r#"
        SELECT id, warehouse_id, floor_no, name
        FROM floors
        WHERE warehouse_id = $1
        ORDER BY floor_no
        "#,
    )
    .bind(warehouse_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(floors)
}

pub async fn warehouse_exists(conn: &mut PgConnection, warehouse_id: &str) -> AppResult<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM warehouses WHERE id = $1")
        .bind(warehouse_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// First floor of a warehouse addressed by id.
pub async fn first_floor_of(conn: &mut PgConnection, warehouse_id: &str) -> AppResult<Floor> {
    if !warehouse_exists(conn, warehouse_id).await? {
        return Err(AppError::NotFound(format!("Gudang {} not found", warehouse_id)));
    }
    let floors = floors_of(conn, warehouse_id).await?;
    first_floor(&floors)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Gudang {} has no floors", warehouse_id)))
}

/// Resolve the floor a line addresses.
///
/// - `lantai_id` given: the floor must exist, and belong to `gudang_id`
///   when that is given too
/// - only `gudang_id`: the warehouse's first floor
pub async fn resolve_floor(
    conn: &mut PgConnection,
    floor_id: Option<&str>,
    warehouse_id: Option<&str>,
) -> AppResult<Floor> {
    match (floor_id, warehouse_id) {
        (Some(floor_id), warehouse_id) => {
            let floor = find_floor(conn, floor_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Lantai {} not found", floor_id)))?;
            if let Some(warehouse_id) = warehouse_id {
                if floor.warehouse_id != warehouse_id {
                    return Err(AppError::Validation(format!(
                        "Lantai {} does not belong to gudang {}",
                        floor_id, warehouse_id
                    )));
                }
            }
            Ok(floor)
        }
        (None, Some(warehouse_id)) => first_floor_of(conn, warehouse_id).await,
        (None, None) => Err(AppError::Validation(
            "lantai_id or gudang_id is required".into(),
        )),
    }
}

// =============================================================================
// DATABASE OPERATIONS
// =============================================================================
impl Database {
    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT w.id, w.name, w.address, COUNT(f.id) AS floor_count
            FROM warehouses w
            LEFT JOIN floors f ON f.warehouse_id = w.id
            GROUP BY w.id, w.name, w.address
            ORDER BY w.id
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        Ok(warehouses)
    }

    pub async fn get_warehouse(&self, warehouse_id: &str) -> AppResult<WarehouseDetail> {
        let mut conn = self.pool().acquire().await?;
        load_detail(&mut conn, warehouse_id).await
    }

    pub async fn create_warehouse(&self, req: WarehouseRequest) -> AppResult<WarehouseDetail> {
        validate_request(&req)?;
        let name = req.name.trim().to_string();

        let mut tx = self.begin().await?;
        let warehouse_id = sequence::next_id(&mut tx, IdKind::Warehouse).await?;

        sqlx::query("INSERT INTO warehouses (id, name, address) VALUES ($1, $2, $3)")
            .bind(&warehouse_id)
            .bind(&name)
            .bind(&req.address)
            .execute(&mut *tx)
            .await?;

        for floor_no in 1..=req.floor_count {
            insert_floor(&mut tx, &warehouse_id, &name, floor_no).await?;
        }

        let detail = load_detail(&mut tx, &warehouse_id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// Rename, re-address and resize. Floors above the new count are removed
    /// only when they hold no stock.
    pub async fn update_warehouse(
        &self,
        warehouse_id: &str,
        req: WarehouseRequest,
    ) -> AppResult<WarehouseDetail> {
        validate_request(&req)?;
        let name = req.name.trim().to_string();

        let mut tx = self.begin().await?;

        let updated = sqlx::query("UPDATE warehouses SET name = $2, address = $3 WHERE id = $1")
            .bind(warehouse_id)
            .bind(&name)
            .bind(&req.address)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Gudang {} not found", warehouse_id)));
        }

        let existing = floors_of(&mut tx, warehouse_id).await?;

        for floor_no in 1..=req.floor_count {
            if !existing.iter().any(|f| f.floor_no == floor_no) {
                insert_floor(&mut tx, warehouse_id, &name, floor_no).await?;
            }
        }

        let removed: Vec<String> = existing
            .iter()
            .filter(|f| f.floor_no > req.floor_count)
            .map(|f| f.id.clone())
            .collect();
        if !removed.is_empty() {
            drop_empty_floors(&mut tx, &removed).await?;
        }

        sqlx::query(
            "UPDATE floors SET name = $2 || ' Lt.' || floor_no::text WHERE warehouse_id = $1",
        )
        .bind(warehouse_id)
        .bind(&name)
        .execute(&mut *tx)
        .await?;

        let detail = load_detail(&mut tx, warehouse_id).await?;
        tx.commit().await?;

        tracing::info!(
            warehouse_id,
            floors = req.floor_count,
            removed = removed.len(),
            "Warehouse updated"
        );
        Ok(detail)
    }

    pub async fn delete_warehouse(&self, warehouse_id: &str) -> AppResult<()> {
        let mut tx = self.begin().await?;

        if !warehouse_exists(&mut tx, warehouse_id).await? {
            return Err(AppError::NotFound(format!("Gudang {} not found", warehouse_id)));
        }

        let floor_ids: Vec<String> = floors_of(&mut tx, warehouse_id)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();
        drop_empty_floors(&mut tx, &floor_ids).await?;

        sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(warehouse_id, "Warehouse deleted");
        Ok(())
    }

    /// Floors of one warehouse, or of all warehouses.
    pub async fn list_floors(&self, warehouse_id: Option<&str>) -> AppResult<Vec<Floor>> {
        let mut conn = self.pool().acquire().await?;
        match warehouse_id {
            Some(warehouse_id) => {
                if !warehouse_exists(&mut conn, warehouse_id).await? {
                    return Err(AppError::NotFound(format!(
                        "Gudang {} not found",
                        warehouse_id
                    )));
                }
                floors_of(&mut conn, warehouse_id).await
            }
            None => {
                let floors = sqlx::query_as::<_, Floor>(
                    r#"
                    SELECT id, warehouse_id, floor_no, name
                    FROM floors
                    ORDER BY warehouse_id, floor_no
                    "#,
                )
                .fetch_all(&mut *conn)
                .await?;
                Ok(floors)
            }
        }
    }

    pub async fn get_floor(&self, floor_id: &str) -> AppResult<Floor> {
        let mut conn = self.pool().acquire().await?;
        find_floor(&mut conn, floor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lantai {} not found", floor_id)))
    }
}

async fn insert_floor(
    conn: &mut PgConnection,
    warehouse_id: &str,
    warehouse_name: &str,
    floor_no: i32,
) -> AppResult<String> {
    let floor_id = sequence::next_id(conn, IdKind::Floor).await?;
    sqlx::query("INSERT INTO floors (id, warehouse_id, floor_no, name) VALUES ($1, $2, $3, $4)")
        .bind(&floor_id)
        .bind(warehouse_id)
        .bind(floor_no)
        .bind(floor_name(warehouse_name, floor_no))
        .execute(&mut *conn)
        .await?;
    Ok(floor_id)
}

/// Delete floors (and their zero-quantity stock rows). Fails with Conflict
/// when any of them still holds stock or is referenced by an order line.
async fn drop_empty_floors(conn: &mut PgConnection, floor_ids: &[String]) -> AppResult<()> {
    let stocked: Option<String> = sqlx::query_scalar(
        "SELECT floor_id FROM stock WHERE floor_id = ANY($1) AND quantity > 0 LIMIT 1",
    )
    .bind(floor_ids)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(floor_id) = stocked {
        return Err(AppError::Conflict(format!(
            "Lantai {} still holds stock",
            floor_id
        )));
    }

    sqlx::query("DELETE FROM stock WHERE floor_id = ANY($1)")
        .bind(floor_ids)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM floors WHERE id = ANY($1)")
        .bind(floor_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn load_detail(conn: &mut PgConnection, warehouse_id: &str) -> AppResult<WarehouseDetail> {
    let warehouse = sqlx::query_as::<_, Warehouse>(
        r#"
        SELECT w.id, w.name, w.address,
               (SELECT COUNT(*) FROM floors f WHERE f.warehouse_id = w.id) AS floor_count
        FROM warehouses w
        WHERE w.id = $1
        "#,
    )
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Gudang {} not found", warehouse_id)))?;

    let floors = floors_of(conn, warehouse_id).await?;
    Ok(WarehouseDetail { warehouse, floors })
}
