// ==========================================
// Packing Station - order API
// ==========================================
// Queries, manual detail creation and order deletion.
// State transitions live in PackingApi only.
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::analytics::AnalyticsRecord;
use crate::domain::defect::DefectRecord;
use crate::domain::order::{NewDetail, OrderWithDetails, PackingDetail, PackingOrder};
use crate::domain::types::OrderState;
use crate::engine::{AnalyticsAggregator, OrderStateEngine};
use crate::repository::{DefectRecordRepository, PackingDetailRepository, PackingOrderRepository};

/// States shown in the working list when no filter is given.
pub const DEFAULT_LIST_STATES: [OrderState; 2] = [OrderState::Draft, OrderState::Done];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDetailResponse {
    pub order: PackingOrder,
    pub detail: PackingDetail,
    pub order_created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOrderResponse {
    pub order_id: i64,
    pub operator_id: Option<i64>,
    /// Former operator's record after recompute.
    pub analytics: Option<AnalyticsRecord>,
}

pub struct OrderApi {
    conn: Arc<Mutex<Connection>>,
    order_repo: PackingOrderRepository,
    detail_repo: PackingDetailRepository,
    defect_repo: DefectRecordRepository,
    state_engine: OrderStateEngine,
}

impl OrderApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            order_repo: PackingOrderRepository::from_connection(conn.clone()),
            detail_repo: PackingDetailRepository::from_connection(conn.clone()),
            defect_repo: DefectRecordRepository::from_connection(conn.clone()),
            state_engine: OrderStateEngine::new(),
            conn,
        }
    }

    // ==========================================
    // Queries
    // ==========================================

    /// Order with its details; the label bytes are included.
    pub fn get_order(&self, order_id: i64) -> ApiResult<OrderWithDetails> {
        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("PackingOrder (id={})", order_id)))?;
        let details = self.detail_repo.find_by_order(order_id)?;
        Ok(OrderWithDetails { order, details })
    }

    /// Orders in any of `states` (Draft and Done when `None`), oldest first.
    /// Label bytes are stripped; fetch them with `get_shipping_label`.
    pub fn list_orders(&self, states: Option<&[OrderState]>) -> ApiResult<Vec<OrderWithDetails>> {
        let states = states.unwrap_or(&DEFAULT_LIST_STATES);
        self.load_with_details(self.order_repo.list_by_states(states)?)
    }

    pub fn list_defective_orders(&self) -> ApiResult<Vec<OrderWithDetails>> {
        self.load_with_details(self.order_repo.list_by_states(&[OrderState::Defective])?)
    }

    fn load_with_details(&self, orders: Vec<PackingOrder>) -> ApiResult<Vec<OrderWithDetails>> {
        orders
            .into_iter()
            .map(|mut order| {
                order.shipping_label = None;
                let details = self.detail_repo.find_by_order(order.id)?;
                Ok(OrderWithDetails { order, details })
            })
            .collect()
    }

    /// Label document as text; `None` while the order has no label.
    pub fn get_shipping_label(&self, order_id: i64) -> ApiResult<Option<String>> {
        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("PackingOrder (id={})", order_id)))?;
        Ok(order
            .shipping_label
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Defect ledger of one detail, oldest first.
    pub fn list_defect_records(&self, detail_id: i64) -> ApiResult<Vec<DefectRecord>> {
        if self.detail_repo.find_by_id(detail_id)?.is_none() {
            return Err(ApiError::NotFound(format!("PackingDetail (id={})", detail_id)));
        }
        Ok(self.defect_repo.find_by_detail(detail_id)?)
    }

    // ==========================================
    // Mutations
    // ==========================================

    /// Find-or-create the order by reference (today's date) and append a detail.
    pub fn add_detail(&self, reference: &str, detail: NewDetail) -> ApiResult<AddDetailResponse> {
        self.add_detail_on(reference, detail, Local::now().date_naive())
    }

    /// `add_detail` with an explicit creation date for new orders.
    ///
    /// A Done order goes back to Draft and loses its label, since the new
    /// detail is unpacked. The operator's scope is recomputed when one is
    /// assigned.
    pub fn add_detail_on(
        &self,
        reference: &str,
        detail: NewDetail,
        created_date: NaiveDate,
    ) -> ApiResult<AddDetailResponse> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ApiError::InvalidArgument("reference must not be empty".to_string()));
        }
        detail.validate().map_err(ApiError::InvalidArgument)?;

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::StorageFailure(format!("lock poisoned: {}", e)))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (mut order, order_created) = match PackingOrderRepository::find_by_reference_tx(&tx, reference)? {
            Some(order) => (order, false),
            None => (PackingOrderRepository::insert_tx(&tx, reference, created_date)?, true),
        };
        let detail = PackingDetailRepository::insert_tx(&tx, order.id, &detail)?;

        let details = PackingDetailRepository::find_by_order_tx(&tx, order.id)?;
        let transition = self.state_engine.after_detail_added(order.state, &details);
        if transition.changed() {
            PackingOrderRepository::update_state_tx(&tx, order.id, transition.to)?;
            PackingOrderRepository::set_shipping_label_tx(&tx, order.id, None)?;
            order.state = transition.to;
        }

        AnalyticsAggregator::maybe_recompute_tx(&tx, &order)?;
        tx.commit()?;

        info!(
            order_id = order.id,
            reference,
            detail_id = detail.id,
            order_created,
            order_state = %order.state,
            "detail added"
        );

        Ok(AddDetailResponse {
            order: PackingOrder {
                shipping_label: None,
                ..order
            },
            detail,
            order_created,
        })
    }

    /// Delete an order with its details and defect records, then recompute
    /// the former operator's scope.
    pub fn delete_order(&self, order_id: i64) -> ApiResult<DeleteOrderResponse> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::StorageFailure(format!("lock poisoned: {}", e)))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let order = PackingOrderRepository::get_tx(&tx, order_id)?;
        PackingOrderRepository::delete_tx(&tx, order_id)?;
        let analytics = match order.operator_id {
            Some(operator_id) => Some(AnalyticsAggregator::recompute_tx(
                &tx,
                operator_id,
                order.created_date,
            )?),
            None => None,
        };
        tx.commit()?;

        info!(order_id, operator_id = ?order.operator_id, "order deleted");

        Ok(DeleteOrderResponse {
            order_id,
            operator_id: order.operator_id,
            analytics,
        })
    }
}
