// =============================================================================
// WAREHOUSE HANDLERS
// =============================================================================
//   /api/v1/warehouses            GET, POST
//   /api/v1/warehouses/:id        GET, PUT, DELETE
//   /api/v1/warehouses/:id/floors GET
//   /api/v1/floors                GET
//   /api/v1/floors/:id            GET
//
// Every item's cached stock view lists all floors of all warehouses, so any
// warehouse write flushes the whole stock cache after it commits.
// =============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::timed;
use crate::error::AppResult;
use crate::models::{Floor, Warehouse, WarehouseDetail, WarehouseRequest};
use crate::AppState;

pub async fn list_warehouses(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let warehouses = timed("list_warehouses", state.db.list_warehouses()).await?;
    Ok(Json(warehouses))
}

pub async fn get_warehouse(
    State(state): State<Arc<AppState>>,
    Path(warehouse_id): Path<String>,
) -> AppResult<Json<WarehouseDetail>> {
    let warehouse = timed("get_warehouse", state.db.get_warehouse(&warehouse_id)).await?;
    Ok(Json(warehouse))
}

/// Creates the warehouse and floors 1..=jumlah_lantai named "<name> Lt.<n>".
pub async fn create_warehouse(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WarehouseRequest>,
) -> AppResult<(StatusCode, Json<WarehouseDetail>)> {
    let warehouse = timed("create_warehouse", state.db.create_warehouse(req)).await?;
    state.cache.invalidate_all().await;
    tracing::info!(
        warehouse_id = %warehouse.warehouse.id,
        floors = warehouse.floors.len(),
        "Warehouse created"
    );
    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn update_warehouse(
    State(state): State<Arc<AppState>>,
    Path(warehouse_id): Path<String>,
    Json(req): Json<WarehouseRequest>,
) -> AppResult<Json<WarehouseDetail>> {
    let warehouse = timed(
        "update_warehouse",
        state.db.update_warehouse(&warehouse_id, req),
    )
    .await?;
    state.cache.invalidate_all().await;
    Ok(Json(warehouse))
}

pub async fn delete_warehouse(
    State(state): State<Arc<AppState>>,
    Path(warehouse_id): Path<String>,
) -> AppResult<StatusCode> {
    timed("delete_warehouse", state.db.delete_warehouse(&warehouse_id)).await?;
    state.cache.invalidate_all().await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_warehouse_floors(
    State(state): State<Arc<AppState>>,
    Path(warehouse_id): Path<String>,
) -> AppResult<Json<Vec<Floor>>> {
    let floors = timed("list_floors", state.db.list_floors(Some(&warehouse_id))).await?;
    Ok(Json(floors))
}

pub async fn list_floors(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Floor>>> {
    let floors = timed("list_floors", state.db.list_floors(None)).await?;
    Ok(Json(floors))
}

pub async fn get_floor(
    State(state): State<Arc<AppState>>,
    Path(floor_id): Path<String>,
) -> AppResult<Json<Floor>> {
    let floor = timed("get_floor", state.db.get_floor(&floor_id)).await?;
    Ok(Json(floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{state, Fixture, LogCapture};
    use crate::handlers::catalog::get_item_stock;
    use crate::models::FloorStock;

    fn request(name: &str, floor_count: i32) -> WarehouseRequest {
        WarehouseRequest {
            name: name.into(),
            address: "Jl. Gudang 2".into(),
            floor_count,
        }
    }

    #[tokio::test]
    async fn test_delete_warehouse_drops_cached_stock_view() {
        let Some(state) = state().await else {
            return;
        };
        let fx = Fixture::create(&state.db).await;

        let Json(view) = get_item_stock(State(state.clone()), Path(fx.item_id.clone()))
            .await
            .unwrap();
        assert!(view.iter().any(|f| f.floor_id == fx.floor_id));

        let status = delete_warehouse(State(state.clone()), Path(fx.warehouse_id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        assert!(state.cache.get::<Vec<FloorStock>>(&fx.item_id).await.is_none());
        let Json(view) = get_item_stock(State(state.clone()), Path(fx.item_id.clone()))
            .await
            .unwrap();
        assert!(view.iter().all(|f| f.warehouse_id != fx.warehouse_id));
    }

    #[tokio::test]
    async fn test_rename_warehouse_drops_cached_stock_view() {
        let Some(state) = state().await else {
            return;
        };
        let fx = Fixture::create(&state.db).await;

        get_item_stock(State(state.clone()), Path(fx.item_id.clone()))
            .await
            .unwrap();

        update_warehouse(
            State(state.clone()),
            Path(fx.warehouse_id.clone()),
            Json(request("Gudang Uji Baru", 2)),
        )
        .await
        .unwrap();

        assert!(state.cache.get::<Vec<FloorStock>>(&fx.item_id).await.is_none());
        let Json(view) = get_item_stock(State(state.clone()), Path(fx.item_id.clone()))
            .await
            .unwrap();
        let renamed = view.iter().find(|f| f.floor_id == fx.floor_id).unwrap();
        assert_eq!(renamed.warehouse_name, "Gudang Uji Baru");
    }

    #[tokio::test]
    async fn test_create_warehouse_logs_once() {
        let Some(state) = state().await else {
            return;
        };
        let (logs, _guard) = LogCapture::install();

        let (status, Json(detail)) =
            create_warehouse(State(state.clone()), Json(request("Gudang Log", 1)))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(detail.floors.len(), 1);
        assert_eq!(logs.count("Warehouse created"), 1);
    }
}
