// =============================================================================
// CATALOG HANDLERS
// =============================================================================
// Brands, customers, items, discounts and absolute stock levels.
//
//   /api/v1/brands              GET, POST
//   /api/v1/brands/:id          GET, PUT, DELETE
//   /api/v1/customers           GET, POST
//   /api/v1/customers/:id       GET, PUT, DELETE
//   /api/v1/items               GET, POST
//   /api/v1/items/:id           GET, PUT, DELETE
//   /api/v1/items/:id/stock     GET (cached), PUT
//   /api/v1/items/:id/discount  PUT, DELETE
//   /api/v1/discounts           GET
//   /api/v1/discounts/brands    GET
//   /api/v1/discounts/brands/:name/items  GET
//   /api/v1/stock/:item/:floor  GET
//   /api/v1/items/:id/warehouses/:warehouse_id/stock  GET
// =============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{finish, timed};
use crate::error::AppResult;
use crate::models::{
    Brand, BrandOptions, BrandRequest, Customer, CustomerRequest, DiscountRequest, FloorStock,
    Item, ItemDetail, ItemRequest, StockLevelRequest, StockLookup, WarehouseStockLookup,
};
use crate::AppState;

// =============================================================================
// BRANDS
// =============================================================================

pub async fn list_brands(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Brand>>> {
    let brands = timed("list_brands", state.db.list_brands()).await?;
    Ok(Json(brands))
}

pub async fn get_brand(
    State(state): State<Arc<AppState>>,
    Path(brand_id): Path<String>,
) -> AppResult<Json<Brand>> {
    let brand = timed("get_brand", state.db.get_brand(&brand_id)).await?;
    Ok(Json(brand))
}

pub async fn create_brand(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BrandRequest>,
) -> AppResult<(StatusCode, Json<Brand>)> {
    let brand = timed("create_brand", state.db.create_brand(req)).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

pub async fn update_brand(
    State(state): State<Arc<AppState>>,
    Path(brand_id): Path<String>,
    Json(req): Json<BrandRequest>,
) -> AppResult<Json<Brand>> {
    let brand = timed("update_brand", state.db.update_brand(&brand_id, req)).await?;
    Ok(Json(brand))
}

pub async fn delete_brand(
    State(state): State<Arc<AppState>>,
    Path(brand_id): Path<String>,
) -> AppResult<StatusCode> {
    timed("delete_brand", state.db.delete_brand(&brand_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// CUSTOMERS
// =============================================================================

pub async fn list_customers(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Customer>>> {
    let customers = timed("list_customers", state.db.list_customers()).await?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> AppResult<Json<Customer>> {
    let customer = timed("get_customer", state.db.get_customer(&customer_id)).await?;
    Ok(Json(customer))
}

pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CustomerRequest>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let customer = timed("create_customer", state.db.create_customer(req)).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
    Json(req): Json<CustomerRequest>,
) -> AppResult<Json<Customer>> {
    let customer = timed(
        "update_customer",
        state.db.update_customer(&customer_id, req),
    )
    .await?;
    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> AppResult<StatusCode> {
    timed("delete_customer", state.db.delete_customer(&customer_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// ITEMS
// =============================================================================

pub async fn list_items(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ItemDetail>>> {
    let items = timed("list_items", state.db.list_items()).await?;
    Ok(Json(items))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> AppResult<Json<ItemDetail>> {
    let item = timed("get_item", state.db.get_item(&item_id)).await?;
    Ok(Json(item))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ItemRequest>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let item = timed("create_item", state.db.create_item(req)).await?;
    tracing::info!(item_id = %item.id, "Item created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    Json(req): Json<ItemRequest>,
) -> AppResult<Json<Item>> {
    let item = timed("update_item", state.db.update_item(&item_id, req)).await?;
    Ok(Json(item))
}

/// Removes the item together with its stock rows.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> AppResult<StatusCode> {
    let committed = timed("delete_item", state.db.delete_item(&item_id)).await?;
    finish(&state, committed).await;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------------
// DISCOUNTS
// -----------------------------------------------------------------------------

pub async fn list_discounts(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Item>>> {
    let items = timed("list_discounts", state.db.list_discounts()).await?;
    Ok(Json(items))
}

/// Brand picker: `{"brands": [{"brand_id", "brand_nama"}]}` sorted by name.
pub async fn list_discount_brands(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<BrandOptions>> {
    let brands = timed("list_discount_brands", state.db.list_discount_brands()).await?;
    Ok(Json(brands))
}

pub async fn items_by_brand(
    State(state): State<Arc<AppState>>,
    Path(brand_name): Path<String>,
) -> AppResult<Json<Vec<Item>>> {
    let items = timed("items_by_brand", state.db.items_by_brand(&brand_name)).await?;
    Ok(Json(items))
}

pub async fn set_discount(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    Json(req): Json<DiscountRequest>,
) -> AppResult<Json<Item>> {
    let item = timed("set_discount", state.db.set_discount(&item_id, req)).await?;
    Ok(Json(item))
}

pub async fn clear_discount(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Item>> {
    let item = timed("clear_discount", state.db.clear_discount(&item_id)).await?;
    Ok(Json(item))
}

// =============================================================================
// STOCK LEVELS
// =============================================================================

/// Per-floor stock of one item, served from Redis when possible.
///
/// GET /api/v1/items/:id/stock
pub async fn get_item_stock(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Vec<FloorStock>>> {
    if let Some(cached) = state.cache.get::<Vec<FloorStock>>(&item_id).await {
        tracing::debug!(%item_id, "Stock view served from cache");
        return Ok(Json(cached));
    }

    let stock = timed("item_floor_stock", state.db.item_floor_stock(&item_id)).await?;
    state.cache.put(&item_id, &stock).await;
    Ok(Json(stock))
}

/// Overwrite absolute quantities per floor (initial stock, stocktake).
///
/// PUT /api/v1/items/:id/stock
pub async fn set_item_stock(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    Json(req): Json<StockLevelRequest>,
) -> AppResult<Json<Vec<FloorStock>>> {
    let committed = timed(
        "set_stock_levels",
        state.db.set_stock_levels(&item_id, req),
    )
    .await?;
    Ok(Json(finish(&state, committed).await))
}

pub async fn stock_lookup(
    State(state): State<Arc<AppState>>,
    Path((item_id, floor_id)): Path<(String, String)>,
) -> AppResult<Json<StockLookup>> {
    let stock = timed("stock_lookup", state.db.stock_lookup(&item_id, &floor_id)).await?;
    Ok(Json(stock))
}

pub async fn warehouse_stock_lookup(
    State(state): State<Arc<AppState>>,
    Path((item_id, warehouse_id)): Path<(String, String)>,
) -> AppResult<Json<WarehouseStockLookup>> {
    let stock = timed(
        "warehouse_stock_lookup",
        state.db.warehouse_stock_lookup(&item_id, &warehouse_id),
    )
    .await?;
    Ok(Json(stock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{state, Fixture, LogCapture};
    use crate::error::AppError;

    #[tokio::test]
    async fn test_create_item_logs_once() {
        let Some(state) = state().await else {
            return;
        };
        let (logs, _guard) = LogCapture::install();

        let (status, Json(item)) = create_item(
            State(state.clone()),
            Json(ItemRequest {
                name: "Kawat Bendrat 1kg".into(),
                brand_name: None,
                original_price: 20_000,
                sale_price: 23_000,
                discount: None,
                discount_deadline: None,
                status: 1,
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(item.id.starts_with("BA_"));
        assert_eq!(logs.count("Item created"), 1);
    }

    #[tokio::test]
    async fn test_set_item_stock_refreshes_cached_view() {
        let Some(state) = state().await else {
            return;
        };
        let fx = Fixture::create(&state.db).await;

        get_item_stock(State(state.clone()), Path(fx.item_id.clone()))
            .await
            .unwrap();

        set_item_stock(
            State(state.clone()),
            Path(fx.item_id.clone()),
            Json(StockLevelRequest {
                floors: vec![crate::models::FloorStockInput {
                    floor_id: fx.floor_id.clone(),
                    quantity: 9,
                }],
                warehouses: vec![],
            }),
        )
        .await
        .unwrap();

        let Json(view) = get_item_stock(State(state.clone()), Path(fx.item_id.clone()))
            .await
            .unwrap();
        let floor = view.iter().find(|f| f.floor_id == fx.floor_id).unwrap();
        assert_eq!(floor.quantity, 9);
    }

    #[tokio::test]
    async fn test_warehouse_stock_lookup_unknown_warehouse() {
        let Some(state) = state().await else {
            return;
        };
        let fx = Fixture::create(&state.db).await;

        let err = warehouse_stock_lookup(
            State(state.clone()),
            Path((fx.item_id.clone(), "GU_9999".to_string())),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
