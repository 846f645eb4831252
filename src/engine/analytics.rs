// ==========================================
// Packing Station - analytics aggregator
// ==========================================
// Recompute(operator, date) rebuilds the four counters from the
// current orders of that scope and overwrites the record.
// Runs inside the caller's transaction; storage through repositories.
// ==========================================

use crate::domain::analytics::{AnalyticsRecord, AnalyticsTotals};
use crate::domain::order::{OrderWithDetails, PackingOrder};
use crate::domain::types::OrderState;
use crate::repository::{AnalyticsRepository, PackingDetailRepository, PackingOrderRepository, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::Connection;

pub struct AnalyticsAggregator;

impl AnalyticsAggregator {
    /// Totals over one scope's orders. Pure.
    pub fn compute_totals(orders: &[OrderWithDetails]) -> AnalyticsTotals {
        orders.iter().fold(AnalyticsTotals::default(), |mut acc, o| {
            acc.total_orders += 1;
            acc.total_packed_units += o.packed_units();
            acc.total_defective_units += o.defective_units();
            if o.order.state == OrderState::Defective {
                acc.total_defective_orders += 1;
            }
            acc
        })
    }

    /// Rebuild the (operator, date) record from storage.
    ///
    /// # Arguments
    /// - conn: the open transaction of the calling operation
    /// - operator_id: analytics scope operator
    /// - date: analytics scope date (order created_date)
    ///
    /// # Returns
    /// - the overwritten record
    pub fn recompute_tx(
        conn: &Connection,
        operator_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<AnalyticsRecord> {
        let mut record = AnalyticsRepository::ensure_tx(conn, operator_id, date)?;

        let orders = PackingOrderRepository::find_by_operator_and_date_tx(conn, operator_id, date)?
            .into_iter()
            .map(|order| {
                let details = PackingDetailRepository::find_by_order_tx(conn, order.id)?;
                Ok(OrderWithDetails { order, details })
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        let totals = Self::compute_totals(&orders);
        AnalyticsRepository::overwrite_totals_tx(conn, record.id, &totals)?;
        record.totals = totals;

        tracing::debug!(
            operator_id,
            %date,
            total_orders = totals.total_orders,
            total_packed_units = totals.total_packed_units,
            total_defective_units = totals.total_defective_units,
            total_defective_orders = totals.total_defective_orders,
            "analytics recomputed"
        );

        Ok(record)
    }

    /// Recompute the order's scope when it has an operator; no-op otherwise.
    pub fn maybe_recompute_tx(
        conn: &Connection,
        order: &PackingOrder,
    ) -> RepositoryResult<Option<AnalyticsRecord>> {
        match order.operator_id {
            Some(operator_id) => {
                Self::recompute_tx(conn, operator_id, order.created_date).map(Some)
            }
            None => Ok(None),
        }
    }
}
