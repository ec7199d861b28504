// =============================================================================
// CATALOG
// =============================================================================
// Brands, customers, items (barang), item discounts and absolute stock levels.
// The discount screen also gets a brand picker and a per-brand item list.
//
// Everything here is plain CRUD except `set_stock_levels`, which seeds or
// corrects per-floor quantities through the ledger and therefore reports the
// stock rows it touched.
// =============================================================================

use sqlx::PgConnection;
use std::collections::HashMap;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::ledger::{self, Committed, StockChange};
use crate::models::{
    Brand, BrandOption, BrandOptions, BrandRequest, Customer, CustomerRequest, DiscountRequest,
    FloorStock, Item, ItemDetail, ItemRequest, StockLevelRequest, StockLookup, WarehouseStock,
    WarehouseStockLookup,
};
use crate::sequence::{self, IdKind};
use crate::warehouses;

const ITEM_COLUMNS: &str = r#"
    i.id, i.name, i.brand_id, b.name AS brand_name,
    i.original_price, i.sale_price, i.discount, i.discount_deadline, i.status
"#;

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_item(req: &ItemRequest) -> AppResult<()> {
    require("nama", &req.name)?;
    if req.original_price < 0 || req.sale_price < 0 {
        return Err(AppError::Validation("Prices must not be negative".into()));
    }
    Ok(())
}

/// Existence check used by every line processor before writing.
pub async fn item_exists(conn: &mut PgConnection, item_id: &str) -> AppResult<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn brand_id_by_name(conn: &mut PgConnection, name: &str) -> AppResult<String> {
    let id: Option<String> = sqlx::query_scalar("SELECT id FROM brands WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    id.ok_or_else(|| {
        AppError::Validation(format!(
            "invalid brand_nama: brand '{}' does not exist",
            name
        ))
    })
}

async fn fetch_item(conn: &mut PgConnection, item_id: &str) -> AppResult<Item> {
    sqlx::query_as::<_, Item>(&format!(
        "SELECT {} FROM items i LEFT JOIN brands b ON b.id = i.brand_id WHERE i.id = $1",
        ITEM_COLUMNS
    ))
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Barang {} not found", item_id)))
}

/// Join per-warehouse stock rows onto their items.
pub fn attach_stock(items: Vec<Item>, rows: Vec<(String, WarehouseStock)>) -> Vec<ItemDetail> {
    let mut by_item: HashMap<String, Vec<WarehouseStock>> = HashMap::new();
    for (item_id, stock) in rows {
        by_item.entry(item_id).or_default().push(stock);
    }

    items
        .into_iter()
        .map(|item| {
            let stock_gudang = by_item.remove(&item.id).unwrap_or_default();
            let stock_total = stock_gudang.iter().map(|s| s.quantity).sum();
            ItemDetail {
                item,
                stock_total,
                stock_gudang,
            }
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct WarehouseStockRow {
    item_id: String,
    warehouse_id: String,
    warehouse_name: String,
    quantity: i64,
}

// =============================================================================
// DATABASE OPERATIONS
// =============================================================================
impl Database {
    // -------------------------------------------------------------------------
    // BRANDS
    // -------------------------------------------------------------------------
    pub async fn list_brands(&self) -> AppResult<Vec<Brand>> {
        let brands = sqlx::query_as::<_, Brand>(
            "SELECT id, name, contact, phone FROM brands ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(brands)
    }

    pub async fn get_brand(&self, brand_id: &str) -> AppResult<Brand> {
        sqlx::query_as::<_, Brand>("SELECT id, name, contact, phone FROM brands WHERE id = $1")
            .bind(brand_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brand {} not found", brand_id)))
    }

    pub async fn create_brand(&self, req: BrandRequest) -> AppResult<Brand> {
        require("brand_nama", &req.name)?;
        let mut tx = self.begin().await?;
        let id = sequence::next_id(&mut tx, IdKind::Brand).await?;

        let brand = sqlx::query_as::<_, Brand>(
            r#"
            INSERT INTO brands (id, name, contact, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, contact, phone
            "#,
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&req.contact)
        .bind(&req.phone)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(brand)
    }

    pub async fn update_brand(&self, brand_id: &str, req: BrandRequest) -> AppResult<Brand> {
        require("brand_nama", &req.name)?;
        sqlx::query_as::<_, Brand>(
            r#"
            UPDATE brands SET name = $2, contact = $3, phone = $4
            WHERE id = $1
            RETURNING id, name, contact, phone
            "#,
        )
        .bind(brand_id)
        .bind(req.name.trim())
        .bind(&req.contact)
        .bind(&req.phone)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Brand {} not found", brand_id)))
    }

    pub async fn delete_brand(&self, brand_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(brand_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Brand {} not found", brand_id)));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // CUSTOMERS
    // -------------------------------------------------------------------------
    pub async fn list_customers(&self) -> AppResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, contact, address FROM customers ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(customers)
    }

    pub async fn get_customer(&self, customer_id: &str) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(
            "SELECT id, name, contact, address FROM customers WHERE id = $1",
        )
        .bind(customer_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", customer_id)))
    }

    pub async fn create_customer(&self, req: CustomerRequest) -> AppResult<Customer> {
        require("customer_nama", &req.name)?;
        require("customer_kontak", &req.contact)?;

        let mut tx = self.begin().await?;
        let id = sequence::next_id(&mut tx, IdKind::Customer).await?;
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, name, contact, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, contact, address
            "#,
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(req.contact.trim())
        .bind(&req.address)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        customer_id: &str,
        req: CustomerRequest,
    ) -> AppResult<Customer> {
        require("customer_nama", &req.name)?;
        require("customer_kontak", &req.contact)?;
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET name = $2, contact = $3, address = $4
            WHERE id = $1
            RETURNING id, name, contact, address
            "#,
        )
        .bind(customer_id)
        .bind(req.name.trim())
        .bind(req.contact.trim())
        .bind(&req.address)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", customer_id)))
    }

    pub async fn delete_customer(&self, customer_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Customer {} not found", customer_id)));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // ITEMS
    // -------------------------------------------------------------------------
    /// All items with their stock summed per warehouse.
    pub async fn list_items(&self) -> AppResult<Vec<ItemDetail>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items i LEFT JOIN brands b ON b.id = i.brand_id ORDER BY i.id",
            ITEM_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        let rows = self.warehouse_stock_rows(None).await?;
        Ok(attach_stock(items, rows))
    }

    pub async fn get_item(&self, item_id: &str) -> AppResult<ItemDetail> {
        let mut conn = self.pool().acquire().await?;
        let item = fetch_item(&mut conn, item_id).await?;
        drop(conn);

        let rows = self.warehouse_stock_rows(Some(item_id)).await?;
        attach_stock(vec![item], rows)
            .pop()
            .ok_or_else(|| AppError::Internal("item detail missing".into()))
    }

    async fn warehouse_stock_rows(
        &self,
        item_id: Option<&str>,
    ) -> AppResult<Vec<(String, WarehouseStock)>> {
        let rows = sqlx::query_as::<_, WarehouseStockRow>(
            r#"
            SELECT s.item_id, w.id AS warehouse_id, w.name AS warehouse_name,
                   SUM(s.quantity)::BIGINT AS quantity
            FROM stock s
            JOIN floors f ON f.id = s.floor_id
            JOIN warehouses w ON w.id = f.warehouse_id
            WHERE ($1::VARCHAR IS NULL OR s.item_id = $1)
            GROUP BY s.item_id, w.id, w.name
            ORDER BY s.item_id, w.id
            "#,
        )
        .bind(item_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.item_id,
                    WarehouseStock {
                        warehouse_id: r.warehouse_id,
                        warehouse_name: r.warehouse_name,
                        quantity: r.quantity,
                    },
                )
            })
            .collect())
    }

    pub async fn create_item(&self, req: ItemRequest) -> AppResult<Item> {
        validate_item(&req)?;
        let mut tx = self.begin().await?;

        let brand_id = match req.brand_name.as_deref() {
            Some(name) => Some(brand_id_by_name(&mut tx, name).await?),
            None => None,
        };
        let id = sequence::next_id(&mut tx, IdKind::Item).await?;

        sqlx::query(
            r#"
            INSERT INTO items (id, name, brand_id, original_price, sale_price,
                               discount, discount_deadline, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&brand_id)
        .bind(req.original_price)
        .bind(req.sale_price)
        .bind(&req.discount)
        .bind(req.discount_deadline)
        .bind(req.status)
        .execute(&mut *tx)
        .await?;

        let item = fetch_item(&mut tx, &id).await?;
        tx.commit().await?;

        Ok(item)
    }

    pub async fn update_item(&self, item_id: &str, req: ItemRequest) -> AppResult<Item> {
        validate_item(&req)?;
        let mut tx = self.begin().await?;

        let brand_id = match req.brand_name.as_deref() {
            Some(name) => Some(brand_id_by_name(&mut tx, name).await?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE items
            SET name = $2, brand_id = $3, original_price = $4, sale_price = $5,
                discount = $6, discount_deadline = $7, status = $8
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(req.name.trim())
        .bind(&brand_id)
        .bind(req.original_price)
        .bind(req.sale_price)
        .bind(&req.discount)
        .bind(req.discount_deadline)
        .bind(req.status)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Barang {} not found", item_id)));
        }

        let item = fetch_item(&mut tx, item_id).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Delete an item together with its stock records. Items referenced by
    /// order or sale lines are kept (409).
    pub async fn delete_item(&self, item_id: &str) -> AppResult<Committed<()>> {
        let mut tx = self.begin().await?;

        let removed: Vec<(String, i32)> = sqlx::query_as(
            "DELETE FROM stock WHERE item_id = $1 RETURNING floor_id, quantity",
        )
        .bind(item_id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Barang {} not found", item_id)));
        }

        tx.commit().await?;
        tracing::info!(item_id, stock_records = removed.len(), "Item deleted");

        let changes = removed
            .into_iter()
            .map(|(floor_id, quantity)| StockChange {
                item_id: item_id.to_string(),
                floor_id,
                before: quantity,
                after: 0,
            })
            .collect();
        Ok(Committed::new((), changes))
    }

    // -------------------------------------------------------------------------
    // DISCOUNTS
    // -------------------------------------------------------------------------
    pub async fn set_discount(&self, item_id: &str, req: DiscountRequest) -> AppResult<Item> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            "UPDATE items SET discount = $2, discount_deadline = $3 WHERE id = $1",
        )
        .bind(item_id)
        .bind(&req.discount)
        .bind(req.discount_deadline)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Barang {} not found", item_id)));
        }
        let item = fetch_item(&mut tx, item_id).await?;
        tx.commit().await?;
        Ok(item)
    }

    pub async fn clear_discount(&self, item_id: &str) -> AppResult<Item> {
        self.set_discount(
            item_id,
            DiscountRequest {
                discount: None,
                discount_deadline: None,
            },
        )
        .await
    }

    /// Items that currently carry a discount.
    pub async fn list_discounts(&self) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            r#"
            SELECT {} FROM items i LEFT JOIN brands b ON b.id = i.brand_id
            WHERE i.discount IS NOT NULL
            ORDER BY i.id
            "#,
            ITEM_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }

    /// Brand picker for the discount screen, alphabetical.
    pub async fn list_discount_brands(&self) -> AppResult<BrandOptions> {
        let brands = sqlx::query_as::<_, BrandOption>(
            "SELECT id, name FROM brands ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(BrandOptions { brands })
    }

    /// Items of one brand, looked up by brand name, with their discount fields.
    pub async fn items_by_brand(&self, brand_name: &str) -> AppResult<Vec<Item>> {
        require("brand_nama", brand_name)?;
        let items = sqlx::query_as::<_, Item>(&format!(
            r#"
            SELECT {} FROM items i LEFT JOIN brands b ON b.id = i.brand_id
            WHERE b.name = $1
            ORDER BY i.name
            "#,
            ITEM_COLUMNS
        ))
        .bind(brand_name.trim())
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }

    // -------------------------------------------------------------------------
    // STOCK LEVELS
    // -------------------------------------------------------------------------
    /// Quantity of the item on every floor, 0 where there is no record.
    pub async fn item_floor_stock(&self, item_id: &str) -> AppResult<Vec<FloorStock>> {
        let mut conn = self.pool().acquire().await?;
        if !item_exists(&mut conn, item_id).await? {
            return Err(AppError::NotFound(format!("Barang {} not found", item_id)));
        }

        let rows = sqlx::query_as::<_, FloorStock>(
            r#"
            SELECT f.id AS floor_id, f.floor_no, f.name AS floor_name,
                   w.id AS warehouse_id, w.name AS warehouse_name,
                   COALESCE(s.quantity, 0) AS quantity
            FROM floors f
            JOIN warehouses w ON w.id = f.warehouse_id
            LEFT JOIN stock s ON s.floor_id = f.id AND s.item_id = $1
            ORDER BY w.id, f.floor_no
            "#,
        )
        .bind(item_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Overwrite per-floor quantities. Warehouse-level entries go to the
    /// warehouse's first floor.
    pub async fn set_stock_levels(
        &self,
        item_id: &str,
        req: StockLevelRequest,
    ) -> AppResult<Committed<Vec<FloorStock>>> {
        if req.floors.is_empty() && req.warehouses.is_empty() {
            return Err(AppError::Validation(
                "stock_lantai or stock_gudang is required".into(),
            ));
        }

        let mut tx = self.begin().await?;
        if !item_exists(&mut tx, item_id).await? {
            return Err(AppError::NotFound(format!("Barang {} not found", item_id)));
        }

        let mut changes = Vec::new();
        for entry in &req.floors {
            if warehouses::find_floor(&mut tx, &entry.floor_id).await?.is_none() {
                return Err(AppError::NotFound(format!(
                    "Lantai {} not found",
                    entry.floor_id
                )));
            }
            let change =
                ledger::set_quantity(&mut tx, item_id, &entry.floor_id, entry.quantity).await?;
            changes.push(change);
        }

        for entry in &req.warehouses {
            let warehouse_id: Option<String> =
                sqlx::query_scalar("SELECT id FROM warehouses WHERE name = $1 ORDER BY id LIMIT 1")
                    .bind(&entry.warehouse_name)
                    .fetch_optional(&mut *tx)
                    .await?;
            let warehouse_id = warehouse_id.ok_or_else(|| {
                AppError::NotFound(format!("Gudang '{}' not found", entry.warehouse_name))
            })?;
            let floor = warehouses::first_floor_of(&mut tx, &warehouse_id).await?;
            let change = ledger::set_quantity(&mut tx, item_id, &floor.id, entry.quantity).await?;
            changes.push(change);
        }

        tx.commit().await?;
        tracing::info!(item_id, records = changes.len(), "Stock levels set");

        let levels = self.item_floor_stock(item_id).await?;
        Ok(Committed::new(levels, changes))
    }

    /// Warehouse-level total for one item. A warehouse with no stock record
    /// for the item answers 0 with `found: false`.
    pub async fn warehouse_stock_lookup(
        &self,
        item_id: &str,
        warehouse_id: &str,
    ) -> AppResult<WarehouseStockLookup> {
        let mut conn = self.pool().acquire().await?;
        if !warehouses::warehouse_exists(&mut conn, warehouse_id).await? {
            return Err(AppError::NotFound(format!("Gudang {} not found", warehouse_id)));
        }
        drop(conn);

        let stock = self
            .warehouse_stock_rows(Some(item_id))
            .await?
            .into_iter()
            .map(|(_, stock)| stock)
            .find(|stock| stock.warehouse_id == warehouse_id);

        Ok(WarehouseStockLookup {
            item_id: item_id.to_string(),
            warehouse_id: warehouse_id.to_string(),
            quantity: stock.as_ref().map_or(0, |s| s.quantity),
            found: stock.is_some(),
        })
    }

    /// Single (item, floor) record lookup.
    pub async fn stock_lookup(&self, item_id: &str, floor_id: &str) -> AppResult<StockLookup> {
        let mut conn = self.pool().acquire().await?;
        let floor = warehouses::find_floor(&mut conn, floor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lantai {} not found", floor_id)))?;

        let stock_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM stock WHERE item_id = $1 AND floor_id = $2")
                .bind(item_id)
                .bind(floor_id)
                .fetch_optional(&mut *conn)
                .await?;
        let quantity = ledger::get_quantity(&mut *conn, item_id, floor_id).await?;
        let found = stock_id.is_some();

        Ok(StockLookup {
            stock_id,
            item_id: item_id.to_string(),
            warehouse_id: floor.warehouse_id,
            floor_id: floor.id,
            quantity,
            found,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FloorStockInput;

    fn item(id: &str) -> Item {
        Item {
            id: id.into(),
            name: format!("Barang {id}"),
            brand_id: None,
            brand_name: None,
            original_price: 1000,
            sale_price: 1200,
            discount: None,
            discount_deadline: None,
            status: 1,
        }
    }

    fn stock(warehouse: &str, quantity: i64) -> WarehouseStock {
        WarehouseStock {
            warehouse_id: warehouse.into(),
            warehouse_name: format!("Gudang {warehouse}"),
            quantity,
        }
    }

    #[test]
    fn test_attach_stock_sums_per_item() {
        let details = attach_stock(
            vec![item("BA_00001"), item("BA_00002")],
            vec![
                ("BA_00001".into(), stock("GU_0001", 10)),
                ("BA_00001".into(), stock("GU_0002", 5)),
            ],
        );
        assert_eq!(details[0].stock_total, 15);
        assert_eq!(details[0].stock_gudang.len(), 2);
        assert_eq!(details[1].stock_total, 0);
        assert!(details[1].stock_gudang.is_empty());
    }

    #[test]
    fn test_item_validation() {
        let mut req = ItemRequest {
            name: " ".into(),
            brand_name: None,
            original_price: 0,
            sale_price: 0,
            discount: None,
            discount_deadline: None,
            status: 1,
        };
        assert!(validate_item(&req).is_err());
        req.name = "Paku 5cm".into();
        req.sale_price = -1;
        assert!(validate_item(&req).is_err());
        req.sale_price = 100;
        assert!(validate_item(&req).is_ok());
    }

    #[tokio::test]
    async fn test_set_stock_levels_then_lookup() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;

        let committed = db
            .set_stock_levels(
                &fx.item_id,
                StockLevelRequest {
                    floors: vec![FloorStockInput {
                        floor_id: fx.second_floor_id.clone(),
                        quantity: 7,
                    }],
                    warehouses: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(committed.changes.len(), 1);
        assert_eq!(committed.changes[0].after, 7);

        let lookup = db.stock_lookup(&fx.item_id, &fx.second_floor_id).await.unwrap();
        assert!(lookup.found);
        assert_eq!(lookup.quantity, 7);
        assert_eq!(lookup.warehouse_id, fx.warehouse_id);

        let missing = db.stock_lookup(&fx.item_id, &fx.floor_id).await.unwrap();
        assert!(!missing.found);
        assert_eq!(missing.quantity, 0);
    }

    #[tokio::test]
    async fn test_negative_stock_level_rejected() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;
        let err = db
            .set_stock_levels(
                &fx.item_id,
                StockLevelRequest {
                    floors: vec![FloorStockInput {
                        floor_id: fx.floor_id.clone(),
                        quantity: -1,
                    }],
                    warehouses: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    fn unique(prefix: &str) -> String {
        format!(
            "{} {}",
            prefix,
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        )
    }

    fn item_request(name: &str, brand_name: Option<String>) -> ItemRequest {
        ItemRequest {
            name: name.into(),
            brand_name,
            original_price: 10_000,
            sale_price: 12_000,
            discount: None,
            discount_deadline: None,
            status: 1,
        }
    }

    #[tokio::test]
    async fn test_create_item_leaves_logging_to_handler() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let (logs, _guard) = crate::db::test_support::LogCapture::install();

        db.create_item(item_request("Cat Tembok 5kg", None))
            .await
            .unwrap();

        assert_eq!(logs.count("Item created"), 0);
    }

    #[tokio::test]
    async fn test_items_by_brand_requires_name() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let err = db.items_by_brand("  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "brand_nama is required"));
    }

    #[tokio::test]
    async fn test_items_by_brand_and_brand_picker() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let brand_name = unique("Brand Diskon");
        db.create_brand(BrandRequest {
            name: brand_name.clone(),
            contact: "Bu Sari".into(),
            phone: "0812".into(),
        })
        .await
        .unwrap();

        let second = db
            .create_item(item_request("Paku Beton", Some(brand_name.clone())))
            .await
            .unwrap();
        let first = db
            .create_item(item_request("Baut Roofing", Some(brand_name.clone())))
            .await
            .unwrap();
        db.create_item(item_request("Barang Tanpa Brand", None))
            .await
            .unwrap();

        let items = db.items_by_brand(&brand_name).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
        assert!(items
            .iter()
            .all(|i| i.brand_name.as_deref() == Some(brand_name.as_str())));

        let picker = db.list_discount_brands().await.unwrap();
        assert!(picker.brands.iter().any(|b| b.name == brand_name));
    }

    #[tokio::test]
    async fn test_warehouse_stock_lookup_sums_floors() {
        let Some(db) = crate::db::test_support::database().await else {
            return;
        };
        let fx = crate::db::test_support::Fixture::create(&db).await;

        let empty = db
            .warehouse_stock_lookup(&fx.item_id, &fx.warehouse_id)
            .await
            .unwrap();
        assert!(!empty.found);
        assert_eq!(empty.quantity, 0);

        db.set_stock_levels(
            &fx.item_id,
            StockLevelRequest {
                floors: vec![
                    FloorStockInput {
                        floor_id: fx.floor_id.clone(),
                        quantity: 4,
                    },
                    FloorStockInput {
                        floor_id: fx.second_floor_id.clone(),
                        quantity: 6,
                    },
                ],
                warehouses: vec![],
            },
        )
        .await
        .unwrap();

        let total = db
            .warehouse_stock_lookup(&fx.item_id, &fx.warehouse_id)
            .await
            .unwrap();
        assert!(total.found);
        assert_eq!(total.quantity, 10);

        let err = db
            .warehouse_stock_lookup(&fx.item_id, "GU_9999")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
