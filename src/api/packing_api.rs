// ==========================================
// Packing Station - packing service
// ==========================================
// Every operation is one IMMEDIATE transaction:
// counter mutation + state transition + analytics recompute
// commit together or not at all. Label generation is best-effort.
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::Local;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, PackingConfig};
use crate::domain::analytics::AnalyticsRecord;
use crate::domain::order::{PackingDetail, PackingOrder};
use crate::domain::types::OrderState;
use crate::engine::{AnalyticsAggregator, LabelGenerator, OrderStateEngine, TextLabelGenerator};
use crate::repository::{DefectRecordRepository, PackingDetailRepository, PackingOrderRepository};

// ==========================================
// Responses
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackUnitResponse {
    pub detail_id: i64,
    pub order_id: i64,
    pub packed_quantity: i64,
    /// This detail reached its required quantity.
    pub is_packed: bool,
    /// Every detail of the order reached its required quantity.
    pub order_completed: bool,
    pub order_state: OrderState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackByCodeResponse {
    pub detail_id: i64,
    pub order_id: i64,
    pub packed_quantity: i64,
    /// Required quantity of the resolved detail.
    pub quantity: i64,
    pub is_packed: bool,
    pub order_completed: bool,
    pub order_state: OrderState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDefectiveResponse {
    pub detail_id: i64,
    pub order_id: i64,
    pub defective_quantity: i64,
    pub is_defective: bool,
    pub order_state: OrderState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearDefectResponse {
    pub detail_id: i64,
    pub order_id: i64,
    pub defective_quantity: i64,
    /// No detail of the order carries defects any more.
    pub order_fixed: bool,
    pub order_state: OrderState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOrderResponse {
    pub order_id: i64,
    pub details_reset: usize,
    pub order_state: OrderState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignOperatorResponse {
    pub order_id: i64,
    pub operator_id: i64,
    pub previous_operator_id: Option<i64>,
    /// The new operator's record after recompute.
    pub analytics: AnalyticsRecord,
    /// The previous operator's record, when it was recomputed.
    pub previous_analytics: Option<AnalyticsRecord>,
}

// ==========================================
// PackingApi
// ==========================================
pub struct PackingApi {
    conn: Arc<Mutex<Connection>>,
    state_engine: OrderStateEngine,
    label_generator: Arc<dyn LabelGenerator>,
    config: PackingConfig,
}

impl PackingApi {
    /// # Arguments
    /// - conn: shared connection (schema already ensured)
    /// - label_generator: invoked on transitions into Done
    /// - config: settings snapshot
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        label_generator: Arc<dyn LabelGenerator>,
        config: PackingConfig,
    ) -> Self {
        Self {
            conn,
            state_engine: OrderStateEngine::new(),
            label_generator,
            config,
        }
    }

    /// Build with settings read from config_kv and the text label generator.
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .and_then(|manager| manager.load_packing_config())
            .map_err(|e| ApiError::StorageFailure(format!("config load failed: {}", e)))?;
        let label_generator = Arc::new(TextLabelGenerator::from_config(&config));
        Ok(Self::new(conn, label_generator, config))
    }

    pub fn config(&self) -> &PackingConfig {
        &self.config
    }

    /// Run `f` inside one IMMEDIATE transaction; any error rolls back.
    fn in_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::StorageFailure(format!("lock poisoned: {}", e)))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ==========================================
    // Packing
    // ==========================================

    /// Pack one unit of a detail. No upper bound against the required quantity.
    pub fn pack_unit(&self, detail_id: i64) -> ApiResult<PackUnitResponse> {
        let response = self.in_transaction(|tx| {
            let detail = PackingDetailRepository::get_tx(tx, detail_id)?;
            self.pack_detail_tx(tx, &detail)
        })?;

        info!(
            detail_id,
            order_id = response.order_id,
            packed_quantity = response.packed_quantity,
            order_state = %response.order_state,
            "unit packed"
        );
        Ok(response)
    }

    /// Pack one unit of the first detail (lowest id) carrying `detail_code`
    /// in the order. Refuses details that are already complete.
    pub fn pack_unit_by_code(&self, order_id: i64, detail_code: &str) -> ApiResult<PackByCodeResponse> {
        let code = detail_code.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidArgument("detail_code must not be empty".to_string()));
        }

        let (response, quantity) = self.in_transaction(|tx| {
            PackingOrderRepository::get_tx(tx, order_id)?;
            let detail = PackingDetailRepository::find_first_by_code_tx(tx, order_id, code)?
                .ok_or_else(|| {
                    ApiError::NotFound(format!(
                        "detail with code '{}' in order {}",
                        code, order_id
                    ))
                })?;

            if detail.is_fully_packed() {
                return Err(ApiError::AlreadyComplete {
                    detail_id: detail.id,
                    packed: detail.packed_quantity,
                    required: detail.required_quantity,
                });
            }

            let response = self.pack_detail_tx(tx, &detail)?;
            Ok((response, detail.required_quantity))
        })?;

        info!(
            order_id,
            detail_code = code,
            detail_id = response.detail_id,
            packed_quantity = response.packed_quantity,
            "unit packed by code"
        );

        Ok(PackByCodeResponse {
            detail_id: response.detail_id,
            order_id: response.order_id,
            packed_quantity: response.packed_quantity,
            quantity,
            is_packed: response.is_packed,
            order_completed: response.order_completed,
            order_state: response.order_state,
        })
    }

    fn pack_detail_tx(&self, tx: &Connection, detail: &PackingDetail) -> ApiResult<PackUnitResponse> {
        let packed_quantity = PackingDetailRepository::increment_packed_tx(tx, detail.id)?;

        let mut order = PackingOrderRepository::get_tx(tx, detail.order_id)?;
        let details = PackingDetailRepository::find_by_order_tx(tx, order.id)?;
        let transition = self.state_engine.after_pack(order.state, &details);

        if transition.changed() {
            PackingOrderRepository::update_state_tx(tx, order.id, transition.to)?;
            order.state = transition.to;
        }
        if transition.entered_done() {
            self.attach_label_tx(tx, &order, &details)?;
        }

        AnalyticsAggregator::maybe_recompute_tx(tx, &order)?;

        Ok(PackUnitResponse {
            detail_id: detail.id,
            order_id: order.id,
            packed_quantity,
            is_packed: packed_quantity >= detail.required_quantity,
            order_completed: transition.all_packed,
            order_state: order.state,
        })
    }

    /// Generate and store the shipping label. Generation failures are
    /// logged and leave the order without a label.
    fn attach_label_tx(
        &self,
        tx: &Connection,
        order: &PackingOrder,
        details: &[PackingDetail],
    ) -> ApiResult<()> {
        match self.label_generator.generate(order, details) {
            Ok(label) => {
                PackingOrderRepository::set_shipping_label_tx(tx, order.id, Some(label.as_slice()))?;
                debug!(order_id = order.id, bytes = label.len(), "shipping label stored");
            }
            Err(e) => {
                let err = ApiError::from(e);
                warn!(order_id = order.id, error = %err, "order completed without shipping label");
            }
        }
        Ok(())
    }

    // ==========================================
    // Defects
    // ==========================================

    /// Flag `count` units of a detail as defective; the order becomes Defective.
    pub fn mark_defective(&self, detail_id: i64, count: i64) -> ApiResult<MarkDefectiveResponse> {
        if count <= 0 {
            return Err(ApiError::InvalidArgument(format!(
                "count must be > 0, got {}",
                count
            )));
        }

        let response = self.in_transaction(|tx| {
            let detail = PackingDetailRepository::get_tx(tx, detail_id)?;
            let defective_quantity = PackingDetailRepository::add_defective_tx(tx, detail_id, count)?;
            DefectRecordRepository::insert_tx(
                tx,
                detail_id,
                detail.order_id,
                count,
                Local::now().naive_local(),
            )?;

            let mut order = PackingOrderRepository::get_tx(tx, detail.order_id)?;
            let details = PackingDetailRepository::find_by_order_tx(tx, order.id)?;
            let transition = self.state_engine.after_defect(order.state, &details);
            if transition.changed() {
                PackingOrderRepository::update_state_tx(tx, order.id, transition.to)?;
                order.state = transition.to;
            }

            AnalyticsAggregator::maybe_recompute_tx(tx, &order)?;

            Ok(MarkDefectiveResponse {
                detail_id,
                order_id: order.id,
                defective_quantity,
                is_defective: defective_quantity > 0,
                order_state: order.state,
            })
        })?;

        info!(
            detail_id,
            count,
            defective_quantity = response.defective_quantity,
            order_id = response.order_id,
            "units marked defective"
        );
        Ok(response)
    }

    /// Clear a detail's defects (defective units replaced). The order drops
    /// back to Draft once no detail carries defects.
    pub fn clear_defect(&self, detail_id: i64) -> ApiResult<ClearDefectResponse> {
        let response = self.in_transaction(|tx| {
            let detail = PackingDetailRepository::get_tx(tx, detail_id)?;
            PackingDetailRepository::clear_defective_tx(tx, detail_id)?;
            let replaced = DefectRecordRepository::mark_replaced_by_detail_tx(
                tx,
                detail_id,
                Local::now().naive_local(),
            )?;
            debug!(detail_id, replaced, "defect records marked replaced");

            let mut order = PackingOrderRepository::get_tx(tx, detail.order_id)?;
            let details = PackingDetailRepository::find_by_order_tx(tx, order.id)?;
            let transition = self.state_engine.after_clear(order.state, &details);
            if transition.changed() {
                PackingOrderRepository::update_state_tx(tx, order.id, transition.to)?;
                order.state = transition.to;
            }

            AnalyticsAggregator::maybe_recompute_tx(tx, &order)?;

            Ok(ClearDefectResponse {
                detail_id,
                order_id: order.id,
                defective_quantity: 0,
                order_fixed: order.state != OrderState::Defective,
                order_state: order.state,
            })
        })?;

        info!(
            detail_id,
            order_id = response.order_id,
            order_fixed = response.order_fixed,
            "defect cleared"
        );
        Ok(response)
    }

    // ==========================================
    // Order-level
    // ==========================================

    /// Zero every counter, back to Draft, drop the label. Idempotent.
    pub fn reset_order(&self, order_id: i64) -> ApiResult<ResetOrderResponse> {
        let response = self.in_transaction(|tx| {
            let mut order = PackingOrderRepository::get_tx(tx, order_id)?;
            let details_reset = PackingDetailRepository::reset_counters_by_order_tx(tx, order_id)?;

            let transition = self.state_engine.after_reset(order.state);
            PackingOrderRepository::update_state_tx(tx, order_id, transition.to)?;
            PackingOrderRepository::set_shipping_label_tx(tx, order_id, None)?;
            order.state = transition.to;
            order.shipping_label = None;

            AnalyticsAggregator::maybe_recompute_tx(tx, &order)?;

            Ok(ResetOrderResponse {
                order_id,
                details_reset,
                order_state: order.state,
            })
        })?;

        info!(order_id, details_reset = response.details_reset, "order reset");
        Ok(response)
    }

    /// Assign (or reassign) the order's operator.
    ///
    /// The new operator's scope is always recomputed; the previous operator's
    /// scope too when it differs and `recompute_previous_operator` is on.
    pub fn assign_operator(&self, order_id: i64, operator_id: i64) -> ApiResult<AssignOperatorResponse> {
        if operator_id <= 0 {
            return Err(ApiError::InvalidArgument(format!(
                "operator_id must be > 0, got {}",
                operator_id
            )));
        }

        let recompute_previous = self.config.recompute_previous_operator;
        let response = self.in_transaction(|tx| {
            let order = PackingOrderRepository::get_tx(tx, order_id)?;
            let previous_operator_id = order.operator_id;

            PackingOrderRepository::set_operator_tx(tx, order_id, operator_id)?;
            let analytics = AnalyticsAggregator::recompute_tx(tx, operator_id, order.created_date)?;

            let previous_analytics = match previous_operator_id {
                Some(previous) if previous != operator_id && recompute_previous => Some(
                    AnalyticsAggregator::recompute_tx(tx, previous, order.created_date)?,
                ),
                _ => None,
            };

            Ok(AssignOperatorResponse {
                order_id,
                operator_id,
                previous_operator_id,
                analytics,
                previous_analytics,
            })
        })?;

        info!(
            order_id,
            operator_id,
            previous_operator_id = ?response.previous_operator_id,
            "operator assigned"
        );
        Ok(response)
    }
}
