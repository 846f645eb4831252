// ==========================================
// Packing Station - request boundary
// ==========================================
// A named command with a JSON payload maps to one API operation.
// Success: the operation's JSON result.
// Failure: {"error": <message>, "code": <CODE>}.
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::app::state::AppState;
use crate::domain::order::NewDetail;
use crate::domain::types::OrderState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

// ==========================================
// Payloads
// ==========================================

#[derive(Deserialize)]
struct DetailIdPayload {
    detail_id: i64,
}

#[derive(Deserialize)]
struct OrderIdPayload {
    order_id: i64,
}

#[derive(Deserialize)]
struct PackByCodePayload {
    order_id: i64,
    detail_code: String,
}

#[derive(Deserialize)]
struct MarkDefectivePayload {
    detail_id: i64,
    count: i64,
}

#[derive(Deserialize)]
struct SetOperatorPayload {
    order_id: i64,
    operator_id: i64,
}

#[derive(Deserialize, Default)]
struct ListOrdersPayload {
    #[serde(default)]
    states: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct AddDetailPayload {
    reference: String,
    external_code: String,
    name: String,
    required_quantity: i64,
    #[serde(default)]
    size_info: Option<String>,
}

#[derive(Deserialize, Default)]
struct ListAnalyticsPayload {
    #[serde(default)]
    operator_id: Option<i64>,
}

#[derive(Deserialize)]
struct AnalyticsScopePayload {
    operator_id: i64,
    date: String,
}

#[derive(Deserialize)]
struct ImportFilePayload {
    path: String,
}

#[derive(Deserialize)]
struct BatchImportPayload {
    paths: Vec<String>,
}

// ==========================================
// Helpers
// ==========================================

/// Error payload returned to the caller.
pub fn error_payload(err: &ApiError) -> Value {
    json!({
        "error": err.to_string(),
        "code": err.code(),
    })
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> ApiResult<T> {
    let payload = if payload.is_null() { json!({}) } else { payload };
    serde_json::from_value(payload)
        .map_err(|e| ApiError::InvalidArgument(format!("invalid payload: {}", e)))
}

fn to_json<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(format!("serialization failed: {}", e)))
}

fn parse_date(date_str: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
        ApiError::InvalidArgument(format!("invalid date '{}' (expected YYYY-MM-DD): {}", date_str, e))
    })
}

fn parse_states(raw: &[String]) -> ApiResult<Vec<OrderState>> {
    raw.iter()
        .map(|s| s.parse::<OrderState>().map_err(ApiError::InvalidArgument))
        .collect()
}

// ==========================================
// Dispatch
// ==========================================

/// Run one command. Never fails: errors become an error payload.
pub async fn dispatch(state: Arc<AppState>, request: CommandRequest) -> Value {
    let command = request.command.clone();
    debug!(command = %command, "command received");

    let result = match command.as_str() {
        "import_file" | "upload_csv" => import_file(&state, request.payload).await,
        "batch_import" => batch_import(&state, request.payload).await,
        _ => {
            let state = Arc::clone(&state);
            tokio::task::spawn_blocking(move || {
                dispatch_blocking(&state, &request.command, request.payload)
            })
            .await
            .unwrap_or_else(|e| Err(ApiError::Internal(format!("command task failed: {}", e))))
        }
    };

    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(command = %command, code = err.code(), error = %err, "command failed");
            error_payload(&err)
        }
    }
}

/// Synchronous commands; run on the blocking pool.
fn dispatch_blocking(state: &AppState, command: &str, payload: Value) -> ApiResult<Value> {
    match command {
        // ===== packing =====
        "pack_detail" => {
            let p: DetailIdPayload = parse_payload(payload)?;
            to_json(state.packing_api.pack_unit(p.detail_id)?)
        }
        "quick_pack_detail" => {
            let p: PackByCodePayload = parse_payload(payload)?;
            to_json(state.packing_api.pack_unit_by_code(p.order_id, &p.detail_code)?)
        }
        "mark_defective" => {
            let p: MarkDefectivePayload = parse_payload(payload)?;
            to_json(state.packing_api.mark_defective(p.detail_id, p.count)?)
        }
        "mark_replaced" => {
            let p: DetailIdPayload = parse_payload(payload)?;
            to_json(state.packing_api.clear_defect(p.detail_id)?)
        }
        "reset_order" => {
            let p: OrderIdPayload = parse_payload(payload)?;
            to_json(state.packing_api.reset_order(p.order_id)?)
        }
        "set_operator" => {
            let p: SetOperatorPayload = parse_payload(payload)?;
            to_json(state.packing_api.assign_operator(p.order_id, p.operator_id)?)
        }

        // ===== orders =====
        "get_order" => {
            let p: OrderIdPayload = parse_payload(payload)?;
            to_json(state.order_api.get_order(p.order_id)?)
        }
        "list_orders" => {
            let p: ListOrdersPayload = parse_payload(payload)?;
            let states = p.states.as_deref().map(parse_states).transpose()?;
            to_json(state.order_api.list_orders(states.as_deref())?)
        }
        "list_defective_orders" => to_json(state.order_api.list_defective_orders()?),
        "get_shipping_label" => {
            let p: OrderIdPayload = parse_payload(payload)?;
            to_json(json!({
                "order_id": p.order_id,
                "label": state.order_api.get_shipping_label(p.order_id)?,
            }))
        }
        "list_defect_records" => {
            let p: DetailIdPayload = parse_payload(payload)?;
            to_json(state.order_api.list_defect_records(p.detail_id)?)
        }
        "add_detail" => {
            let p: AddDetailPayload = parse_payload(payload)?;
            let detail = NewDetail {
                external_code: p.external_code,
                name: p.name,
                required_quantity: p.required_quantity,
                size_info: p.size_info,
            };
            to_json(state.order_api.add_detail(&p.reference, detail)?)
        }
        "delete_order" => {
            let p: OrderIdPayload = parse_payload(payload)?;
            to_json(state.order_api.delete_order(p.order_id)?)
        }

        // ===== analytics =====
        "list_analytics" => {
            let p: ListAnalyticsPayload = parse_payload(payload)?;
            to_json(state.analytics_api.list_analytics(p.operator_id)?)
        }
        "get_analytics" => {
            let p: AnalyticsScopePayload = parse_payload(payload)?;
            let date = parse_date(&p.date)?;
            to_json(state.analytics_api.get_analytics(p.operator_id, date)?)
        }
        "recompute_analytics" => {
            let p: AnalyticsScopePayload = parse_payload(payload)?;
            let date = parse_date(&p.date)?;
            to_json(state.analytics_api.recompute_analytics(p.operator_id, date)?)
        }

        // ===== config =====
        "get_config" => to_json(state.packing_api.config()),

        other => Err(ApiError::InvalidArgument(format!("unknown command: {}", other))),
    }
}

async fn import_file(state: &AppState, payload: Value) -> ApiResult<Value> {
    let p: ImportFilePayload = parse_payload(payload)?;
    let path = PathBuf::from(p.path.trim());
    to_json(state.import_api.import_file(&path).await?)
}

async fn batch_import(state: &AppState, payload: Value) -> ApiResult<Value> {
    let p: BatchImportPayload = parse_payload(payload)?;
    if p.paths.is_empty() {
        return Err(ApiError::InvalidArgument("paths must not be empty".to_string()));
    }
    to_json(state.import_api.batch_import(p.paths).await)
}
