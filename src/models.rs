// =============================================================================
// MODELS MODULE
// =============================================================================
// Rows, requests and responses.
//
// Field names on the Rust side are English; the JSON names stay the ones the
// existing Gudang clients already send (`barang_id`, `lantai_id`,
// `orders_amount`, `stock_barang`, ...), mapped with #[serde(rename)].
//
// LEARNING NOTES:
// - FromRow maps by column name, so queries alias columns to field names
// - #[serde(flatten)] inlines a nested struct into the parent JSON object
// - `deserialize_with` lets blank strings like "" or "-" mean "absent"
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

// =============================================================================
// LENIENT FIELD DECODERS
// =============================================================================
// Clients send "" or "-" for empty optional dates and texts.

pub fn blank_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("-") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid date {s:?}: {e}"))),
    }
}

pub fn blank_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "-"))
}

// =============================================================================
// CATALOG
// =============================================================================

// -----------------------------------------------------------------------------
// BRAND
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Brand {
    #[serde(rename = "brand_id")]
    pub id: String,
    #[serde(rename = "brand_nama")]
    pub name: String,
    #[serde(rename = "brand_kontak")]
    pub contact: String,
    #[serde(rename = "brand_tlp")]
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandRequest {
    #[serde(rename = "brand_nama")]
    pub name: String,
    #[serde(rename = "brand_kontak", default)]
    pub contact: String,
    #[serde(rename = "brand_tlp", default)]
    pub phone: String,
}

// -----------------------------------------------------------------------------
// CUSTOMER
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    #[serde(rename = "customer_id")]
    pub id: String,
    #[serde(rename = "customer_nama")]
    pub name: String,
    #[serde(rename = "customer_kontak")]
    pub contact: String,
    #[serde(rename = "customer_alamat")]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRequest {
    #[serde(rename = "customer_nama")]
    pub name: String,
    #[serde(rename = "customer_kontak")]
    pub contact: String,
    #[serde(rename = "customer_alamat", default)]
    pub address: String,
}

// -----------------------------------------------------------------------------
// ITEM (barang)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    #[serde(rename = "barang_id")]
    pub id: String,
    #[serde(rename = "barang_nama")]
    pub name: String,
    pub brand_id: Option<String>,
    #[serde(rename = "brand_nama")]
    pub brand_name: Option<String>,
    #[serde(rename = "barang_harga_asli")]
    pub original_price: i64,
    #[serde(rename = "barang_harga_jual")]
    pub sale_price: i64,
    #[serde(rename = "barang_diskon")]
    pub discount: Option<String>,
    #[serde(rename = "barang_deadline_diskon")]
    pub discount_deadline: Option<NaiveDate>,
    #[serde(rename = "barang_status")]
    pub status: i32,
}

/// Stock of one item summed over a warehouse's floors.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WarehouseStock {
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "gudang_nama")]
    pub warehouse_name: String,
    #[serde(rename = "stock_barang")]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub stock_total: i64,
    pub stock_gudang: Vec<WarehouseStock>,
}

/// Create/update body. `nama` and `barang_nama` are both accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRequest {
    #[serde(rename = "nama", alias = "barang_nama")]
    pub name: String,
    #[serde(rename = "brand_nama", default, deserialize_with = "blank_text")]
    pub brand_name: Option<String>,
    #[serde(rename = "barang_harga_asli", default)]
    pub original_price: i64,
    #[serde(rename = "barang_harga_jual", default)]
    pub sale_price: i64,
    #[serde(rename = "barang_diskon", default, deserialize_with = "blank_text")]
    pub discount: Option<String>,
    #[serde(
        rename = "barang_deadline_diskon",
        default,
        deserialize_with = "blank_date"
    )]
    pub discount_deadline: Option<NaiveDate>,
    #[serde(rename = "barang_status", default = "default_item_status")]
    pub status: i32,
}

fn default_item_status() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRequest {
    #[serde(rename = "barang_diskon", default, deserialize_with = "blank_text")]
    pub discount: Option<String>,
    #[serde(
        rename = "barang_deadline_diskon",
        default,
        deserialize_with = "blank_date"
    )]
    pub discount_deadline: Option<NaiveDate>,
}

/// Brand picker entry for the discount screen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BrandOption {
    #[serde(rename = "brand_id")]
    pub id: String,
    #[serde(rename = "brand_nama")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandOptions {
    pub brands: Vec<BrandOption>,
}

// -----------------------------------------------------------------------------
// STOCK LEVELS
// -----------------------------------------------------------------------------
/// Quantity of one item on one floor; 0 where no record exists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FloorStock {
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "lantai_no")]
    pub floor_no: i32,
    #[serde(rename = "lantai_nama")]
    pub floor_name: String,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "gudang_nama")]
    pub warehouse_name: String,
    #[serde(rename = "stock_barang")]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorStockInput {
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "stock_barang")]
    pub quantity: i32,
}

/// Warehouse-level input: applied to the warehouse's first floor.
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseStockInput {
    #[serde(rename = "gudang_nama")]
    pub warehouse_name: String,
    #[serde(rename = "stock_barang")]
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockLevelRequest {
    #[serde(rename = "stock_lantai", default)]
    pub floors: Vec<FloorStockInput>,
    #[serde(rename = "stock_gudang", default)]
    pub warehouses: Vec<WarehouseStockInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLookup {
    pub stock_id: Option<String>,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "stock_barang")]
    pub quantity: i32,
    pub found: bool,
}

/// Total of one item across every floor of one warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseStockLookup {
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "stock_barang")]
    pub quantity: i64,
    pub found: bool,
}

// =============================================================================
// WAREHOUSES
// =============================================================================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Warehouse {
    #[serde(rename = "gudang_id")]
    pub id: String,
    #[serde(rename = "gudang_nama")]
    pub name: String,
    #[serde(rename = "gudang_alamat")]
    pub address: String,
    #[serde(rename = "jumlah_lantai")]
    pub floor_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Floor {
    #[serde(rename = "lantai_id")]
    pub id: String,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "lantai_no")]
    pub floor_no: i32,
    #[serde(rename = "lantai_nama")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseDetail {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    #[serde(rename = "lantai")]
    pub floors: Vec<Floor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseRequest {
    #[serde(rename = "gudang_nama")]
    pub name: String,
    #[serde(rename = "gudang_alamat", default)]
    pub address: String,
    #[serde(rename = "jumlah_lantai", default = "default_floor_count")]
    pub floor_count: i32,
}

fn default_floor_count() -> i32 {
    1
}

// =============================================================================
// MOVEMENT LOGS
// =============================================================================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MovementLog {
    #[serde(rename = "logs_id")]
    pub id: String,
    #[serde(rename = "logs_status")]
    pub direction: i32,
    #[serde(rename = "logs_date")]
    pub log_date: NaiveDate,
    #[serde(rename = "logs_desc")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogLines {
    Inbound(Vec<InboundLineView>),
    Outbound(Vec<OutboundLineView>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDetail {
    #[serde(flatten)]
    pub log: MovementLog,
    pub orders: LogLines,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogRequest {
    #[serde(rename = "logs_status")]
    pub direction: i32,
    #[serde(rename = "logs_date", default, deserialize_with = "blank_date")]
    pub log_date: Option<NaiveDate>,
    #[serde(rename = "logs_desc", default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogUpdateRequest {
    #[serde(rename = "logs_status", default)]
    pub direction: Option<i32>,
    #[serde(rename = "logs_date", default, deserialize_with = "blank_date")]
    pub log_date: Option<NaiveDate>,
    #[serde(rename = "logs_desc", default, deserialize_with = "blank_text")]
    pub description: Option<String>,
}

/// `GET /logs?status=1&date=2024-05-01`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    pub status: Option<i32>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteLogResponse {
    pub logs_id: String,
    pub status: String,
    pub message: String,
    pub warnings: Vec<String>,
}

// -----------------------------------------------------------------------------
// INBOUND LINES (orders masuk)
// -----------------------------------------------------------------------------
/// Inbound line joined with display names and its log header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InboundLineView {
    #[serde(rename = "orders_id")]
    pub id: String,
    #[serde(rename = "logs_id")]
    pub log_id: String,
    #[serde(rename = "logs_date")]
    pub log_date: NaiveDate,
    #[serde(rename = "logs_desc")]
    pub log_desc: String,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "barang_nama")]
    pub item_name: String,
    #[serde(rename = "brand_nama")]
    pub brand_name: Option<String>,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "gudang_nama")]
    pub warehouse_name: String,
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "lantai_no")]
    pub floor_no: i32,
    #[serde(rename = "lantai_nama")]
    pub floor_name: String,
    #[serde(rename = "orders_amount")]
    pub amount: i32,
    #[serde(rename = "orders_value")]
    pub value: i64,
    #[serde(rename = "orders_pay_type")]
    pub pay_type: i32,
    #[serde(rename = "orders_status")]
    pub status: i32,
    #[serde(rename = "orders_deadline")]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundLineInput {
    #[serde(rename = "gudang_id", default, deserialize_with = "blank_text")]
    pub warehouse_id: Option<String>,
    #[serde(rename = "lantai_id", default, deserialize_with = "blank_text")]
    pub floor_id: Option<String>,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "orders_amount")]
    pub amount: i32,
    #[serde(rename = "orders_value")]
    pub value: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundBatchRequest {
    #[serde(rename = "logs_date", default, deserialize_with = "blank_date")]
    pub log_date: Option<NaiveDate>,
    #[serde(rename = "logs_desc", default, deserialize_with = "blank_text")]
    pub description: Option<String>,
    #[serde(rename = "orders_pay_type")]
    pub pay_type: i32,
    #[serde(rename = "orders_deadline", default, deserialize_with = "blank_date")]
    pub deadline: Option<NaiveDate>,
    pub orders: Vec<InboundLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedInboundLine {
    #[serde(rename = "orders_id")]
    pub id: String,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "orders_amount")]
    pub amount: i32,
    #[serde(rename = "orders_value")]
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundBatchResponse {
    pub logs_id: String,
    pub logs_status: i32,
    pub logs_date: NaiveDate,
    pub logs_desc: String,
    pub orders_pay_type: i32,
    pub orders_deadline: Option<NaiveDate>,
    pub orders_status: i32,
    pub orders: Vec<CreatedInboundLine>,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundUpdateRequest {
    #[serde(rename = "orders_amount")]
    pub amount: i32,
    #[serde(rename = "orders_value")]
    pub value: i64,
    #[serde(rename = "orders_deadline", default, deserialize_with = "blank_date")]
    pub deadline: Option<NaiveDate>,
    #[serde(rename = "orders_pay_type")]
    pub pay_type: i32,
    #[serde(rename = "orders_status")]
    pub status: i32,
}

/// Status flip body shared by inbound and outbound lines.
#[derive(Debug, Clone, Deserialize)]
pub struct LineStatusRequest {
    #[serde(rename = "orders_status")]
    pub status: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineChangeResponse {
    pub message: String,
    pub orders_id: String,
    pub orders_status: i32,
    pub stock_change: i32,
}

// -----------------------------------------------------------------------------
// OUTBOUND LINES (orders keluar)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboundLineView {
    #[serde(rename = "orders_id")]
    pub id: String,
    #[serde(rename = "logs_id")]
    pub log_id: String,
    #[serde(rename = "logs_date")]
    pub log_date: NaiveDate,
    #[serde(rename = "logs_desc")]
    pub log_desc: String,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "barang_nama")]
    pub item_name: String,
    #[serde(rename = "brand_nama")]
    pub brand_name: Option<String>,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "gudang_nama")]
    pub warehouse_name: String,
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "lantai_no")]
    pub floor_no: i32,
    #[serde(rename = "lantai_nama")]
    pub floor_name: String,
    #[serde(rename = "orders_amount")]
    pub amount: i32,
    #[serde(rename = "orders_status")]
    pub status: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboundLineInput {
    #[serde(rename = "gudang_id", default, deserialize_with = "blank_text")]
    pub warehouse_id: Option<String>,
    #[serde(rename = "lantai_id", default, deserialize_with = "blank_text")]
    pub floor_id: Option<String>,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "orders_amount")]
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboundBatchRequest {
    #[serde(rename = "logs_date", default, deserialize_with = "blank_date")]
    pub log_date: Option<NaiveDate>,
    #[serde(rename = "logs_desc", default, deserialize_with = "blank_text")]
    pub description: Option<String>,
    #[serde(rename = "orders_status", default)]
    pub status: i32,
    pub orders: Vec<OutboundLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOutboundLine {
    #[serde(rename = "orders_id")]
    pub id: String,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "orders_amount")]
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundBatchResponse {
    pub logs_id: String,
    pub logs_status: i32,
    pub logs_date: NaiveDate,
    pub logs_desc: String,
    pub orders_status: i32,
    pub orders: Vec<CreatedOutboundLine>,
    pub status: String,
    pub message: String,
}

// =============================================================================
// SALES
// =============================================================================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sale {
    #[serde(rename = "sales_id")]
    pub id: String,
    pub customer_id: String,
    #[serde(rename = "customer_nama")]
    pub customer_name: Option<String>,
    #[serde(rename = "sales_total")]
    pub total: i64,
    #[serde(rename = "sales_payment")]
    pub payment: String,
    #[serde(rename = "sales_date")]
    pub sale_date: NaiveDate,
    #[serde(rename = "sales_status")]
    pub status: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SaleLine {
    #[serde(rename = "sale_items_id")]
    pub id: String,
    #[serde(rename = "sales_id")]
    pub sale_id: String,
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "barang_nama")]
    pub item_name: Option<String>,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "lantai_id")]
    pub floor_id: String,
    #[serde(rename = "sale_items_amount")]
    pub amount: i32,
    #[serde(rename = "sale_value")]
    pub unit_value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub sale_items: Vec<SaleLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaleRequest {
    pub customer_id: String,
    #[serde(rename = "sales_payment")]
    pub payment: String,
    #[serde(rename = "sales_date", default, deserialize_with = "blank_date")]
    pub sale_date: Option<NaiveDate>,
    #[serde(rename = "sales_status", default = "default_sale_status")]
    pub status: i32,
}

fn default_sale_status() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaleLineInput {
    #[serde(rename = "barang_id")]
    pub item_id: String,
    #[serde(rename = "gudang_id")]
    pub warehouse_id: String,
    #[serde(rename = "lantai_id", default, deserialize_with = "blank_text")]
    pub floor_id: Option<String>,
    #[serde(rename = "sale_items_amount")]
    pub amount: i32,
    #[serde(rename = "sale_value")]
    pub unit_value: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaleBatchRequest {
    #[serde(flatten)]
    pub header: SaleRequest,
    pub sale_items: Vec<SaleLineInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaleLineRequest {
    #[serde(rename = "sales_id")]
    pub sale_id: String,
    #[serde(flatten)]
    pub line: SaleLineInput,
}

/// `GET /sale-items?sales_id=SL_0000001`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleLineFilter {
    pub sales_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSaleResponse {
    pub sales_id: String,
    pub status: String,
    pub message: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSaleLineResponse {
    pub sale_items_id: String,
    pub sales_id: String,
    pub sales_total: i64,
    pub status: String,
    pub warnings: Vec<String>,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: bool,
    pub redis: bool,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code, e.g. `INSUFFICIENT_STOCK`
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_batch_accepts_blank_dates_and_legacy_warehouse() {
        let req: InboundBatchRequest = serde_json::from_value(json!({
            "logs_date": "",
            "logs_desc": "-",
            "orders_pay_type": 1,
            "orders_deadline": "-",
            "orders": [
                { "gudang_id": "GU_0001", "barang_id": "BA_00001",
                  "orders_amount": 10, "orders_value": 5000 }
            ]
        }))
        .unwrap();

        assert!(req.log_date.is_none());
        assert!(req.description.is_none());
        assert!(req.deadline.is_none());
        assert_eq!(req.orders[0].warehouse_id.as_deref(), Some("GU_0001"));
        assert!(req.orders[0].floor_id.is_none());
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let result: Result<LogRequest, _> = serde_json::from_value(json!({
            "logs_status": 1,
            "logs_date": "01/05/2024",
            "logs_desc": "Stok opname"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_item_request_accepts_either_name_field() {
        let a: ItemRequest = serde_json::from_value(json!({ "nama": "Cat Avian" })).unwrap();
        let b: ItemRequest =
            serde_json::from_value(json!({ "barang_nama": "Cat Avian" })).unwrap();
        assert_eq!(a.name, b.name);
        assert_eq!(a.status, 1);
    }

    #[test]
    fn test_sale_batch_flattens_header() {
        let req: SaleBatchRequest = serde_json::from_value(json!({
            "customer_id": "CU_0000001",
            "sales_payment": "1",
            "sales_date": "2024-05-01",
            "sales_status": 1,
            "sale_items": [
                { "barang_id": "BA_00001", "gudang_id": "GU_0001",
                  "sale_items_amount": 2, "sale_value": 15000 }
            ]
        }))
        .unwrap();
        assert_eq!(req.header.customer_id, "CU_0000001");
        assert_eq!(
            req.header.sale_date,
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert!(req.sale_items[0].floor_id.is_none());
    }

    #[test]
    fn test_wire_names_on_serialize() {
        let line = CreatedInboundLine {
            id: "OM_0000001".into(),
            item_id: "BA_00001".into(),
            warehouse_id: "GU_0001".into(),
            floor_id: "GL_0001".into(),
            amount: 10,
            value: 5000,
        };
        let v = serde_json::to_value(&line).unwrap();
        assert_eq!(v["orders_id"], "OM_0000001");
        assert_eq!(v["lantai_id"], "GL_0001");
        assert_eq!(v["orders_amount"], 10);
    }
}
