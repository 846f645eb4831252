// ==========================================
// Analytics aggregation tests
// ==========================================
// Per-operator daily rollups kept consistent with order state.
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod analytics_test {
    use std::sync::Arc;

    use packing_station::api::ApiError;
    use packing_station::config::PackingConfig;
    use packing_station::domain::{AnalyticsTotals, OrderState};
    use packing_station::engine::{AnalyticsAggregator, TextLabelGenerator};
    use packing_station::repository::{PackingDetailRepository, PackingOrderRepository};
    use packing_station::domain::OrderWithDetails;

    use crate::test_helpers::{day, TestEnv};

    /// Totals computed from a fresh read of every order in the scope.
    fn fresh_totals(env: &TestEnv, operator_id: i64, date: chrono::NaiveDate) -> AnalyticsTotals {
        let conn = env.conn.lock().unwrap();
        let orders: Vec<OrderWithDetails> =
            PackingOrderRepository::find_by_operator_and_date_tx(&conn, operator_id, date)
                .unwrap()
                .into_iter()
                .map(|order| {
                    let details = PackingDetailRepository::find_by_order_tx(&conn, order.id).unwrap();
                    OrderWithDetails { order, details }
                })
                .collect();
        AnalyticsAggregator::compute_totals(&orders)
    }

    #[test]
    fn test_operator_seven_example() {
        let env = TestEnv::new();
        let date = day(2024, 1, 1);
        let first = env.seed_order("ORD-1", date, &[("A", "Box", 5)]);
        let second = env.seed_order("ORD-2", date, &[("B", "Tape", 3)]);

        env.packing_api.assign_operator(first.order.id, 7).unwrap();
        env.packing_api.assign_operator(second.order.id, 7).unwrap();

        for _ in 0..5 {
            env.packing_api.pack_unit(first.details[0].id).unwrap();
        }
        for _ in 0..3 {
            env.packing_api.pack_unit(second.details[0].id).unwrap();
        }
        env.packing_api.mark_defective(second.details[0].id, 1).unwrap();

        let record = env.analytics_api.get_analytics(7, date).unwrap();
        assert_eq!(record.totals.total_orders, 2);
        assert_eq!(record.totals.total_packed_units, 8);
        assert_eq!(record.totals.total_defective_orders, 1);
        assert_eq!(record.totals.total_defective_units, 1);
    }

    #[test]
    fn test_every_mutation_refreshes_the_rollup() {
        let env = TestEnv::new();
        let date = day(2024, 2, 1);
        let order = env.seed_order("ORD-1", date, &[("A", "Box", 2)]);
        let detail_id = order.details[0].id;

        let record = env.packing_api.assign_operator(order.order.id, 3).unwrap().analytics;
        assert_eq!(record.totals.total_orders, 1);
        assert_eq!(record.totals.total_packed_units, 0);

        env.packing_api.pack_unit(detail_id).unwrap();
        assert_eq!(env.analytics_api.get_analytics(3, date).unwrap().totals.total_packed_units, 1);

        env.packing_api.mark_defective(detail_id, 2).unwrap();
        let totals = env.analytics_api.get_analytics(3, date).unwrap().totals;
        assert_eq!(totals.total_defective_units, 2);
        assert_eq!(totals.total_defective_orders, 1);

        env.packing_api.clear_defect(detail_id).unwrap();
        let totals = env.analytics_api.get_analytics(3, date).unwrap().totals;
        assert_eq!(totals.total_defective_units, 0);
        assert_eq!(totals.total_defective_orders, 0);

        env.packing_api.reset_order(order.order.id).unwrap();
        let totals = env.analytics_api.get_analytics(3, date).unwrap().totals;
        assert_eq!(totals.total_packed_units, 0);
        assert_eq!(totals, fresh_totals(&env, 3, date));
    }

    #[test]
    fn test_recompute_is_a_function_of_current_state() {
        let env = TestEnv::new();
        let date = day(2024, 1, 1);
        let order = env.seed_order("ORD-1", date, &[("A", "Box", 5), ("B", "Tape", 5)]);
        env.packing_api.assign_operator(order.order.id, 7).unwrap();
        env.packing_api.pack_unit(order.details[0].id).unwrap();

        // mutate storage behind the services' back
        env.execute_sql(&format!(
            "UPDATE packing_detail SET packed_quantity = 4, defective_quantity = 2 WHERE id = {};
             UPDATE packing_order SET state = 'DEFECTIVE' WHERE id = {};",
            order.details[1].id, order.order.id
        ));

        let stale = env.analytics_api.get_analytics(7, date).unwrap();
        assert_eq!(stale.totals.total_packed_units, 1);

        let record = env.analytics_api.recompute_analytics(7, date).unwrap();
        assert_eq!(
            record.totals,
            AnalyticsTotals {
                total_orders: 1,
                total_packed_units: 5,
                total_defective_units: 2,
                total_defective_orders: 1,
            }
        );
        assert_eq!(record.totals, fresh_totals(&env, 7, date));
        assert_eq!(env.analytics_api.get_analytics(7, date).unwrap(), record);

        // a second recompute is a no-op
        let again = env.analytics_api.recompute_analytics(7, date).unwrap();
        assert_eq!(again, record);
    }

    #[test]
    fn test_reassignment_recomputes_previous_operator() {
        let env = TestEnv::new();
        let date = day(2024, 3, 1);
        let order = env.seed_order("ORD-1", date, &[("A", "Box", 2)]);
        env.packing_api.assign_operator(order.order.id, 7).unwrap();
        env.packing_api.pack_unit(order.details[0].id).unwrap();

        let response = env.packing_api.assign_operator(order.order.id, 8).unwrap();
        assert_eq!(response.previous_operator_id, Some(7));
        assert_eq!(response.analytics.operator_id, 8);
        assert_eq!(response.analytics.totals.total_orders, 1);
        assert_eq!(response.analytics.totals.total_packed_units, 1);

        let previous = response.previous_analytics.unwrap();
        assert_eq!(previous.operator_id, 7);
        assert_eq!(previous.totals, AnalyticsTotals::default());
        assert_eq!(
            env.analytics_api.get_analytics(7, date).unwrap().totals,
            AnalyticsTotals::default()
        );
    }

    #[test]
    fn test_reassignment_without_previous_recompute_leaves_old_scope() {
        let config = PackingConfig {
            recompute_previous_operator: false,
            ..PackingConfig::default()
        };
        let env = TestEnv::with(Arc::new(TextLabelGenerator::default()), config);
        let date = day(2024, 3, 1);
        let order = env.seed_order("ORD-1", date, &[("A", "Box", 2)]);
        env.packing_api.assign_operator(order.order.id, 7).unwrap();

        let response = env.packing_api.assign_operator(order.order.id, 8).unwrap();
        assert!(response.previous_analytics.is_none());
        assert_eq!(env.analytics_api.get_analytics(7, date).unwrap().totals.total_orders, 1);
        assert_eq!(env.analytics_api.get_analytics(8, date).unwrap().totals.total_orders, 1);
    }

    #[test]
    fn test_same_operator_reassignment_recomputes_once() {
        let env = TestEnv::new();
        let date = day(2024, 3, 2);
        let order = env.seed_order("ORD-1", date, &[("A", "Box", 2)]);
        env.packing_api.assign_operator(order.order.id, 5).unwrap();

        let response = env.packing_api.assign_operator(order.order.id, 5).unwrap();
        assert_eq!(response.previous_operator_id, Some(5));
        assert!(response.previous_analytics.is_none());
        assert_eq!(response.analytics.totals.total_orders, 1);
    }

    #[test]
    fn test_unassigned_orders_produce_no_records() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-1", day(2024, 1, 1), &[("A", "Box", 1)]);
        env.packing_api.pack_unit(order.details[0].id).unwrap();
        env.packing_api.mark_defective(order.details[0].id, 1).unwrap();

        assert!(env.analytics_api.list_analytics(None).unwrap().is_empty());
        assert!(matches!(
            env.analytics_api.get_analytics(1, day(2024, 1, 1)),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_scopes_are_split_by_date() {
        let env = TestEnv::new();
        let jan = env.seed_order("ORD-1", day(2024, 1, 1), &[("A", "Box", 1)]);
        let feb = env.seed_order("ORD-2", day(2024, 2, 1), &[("A", "Box", 1)]);
        env.packing_api.assign_operator(jan.order.id, 7).unwrap();
        env.packing_api.assign_operator(feb.order.id, 7).unwrap();
        env.packing_api.pack_unit(feb.details[0].id).unwrap();

        let records = env.analytics_api.list_analytics(Some(7)).unwrap();
        assert_eq!(records.len(), 2);
        // newest first
        assert_eq!(records[0].date, day(2024, 2, 1));
        assert_eq!(records[0].totals.total_packed_units, 1);
        assert_eq!(records[1].date, day(2024, 1, 1));
        assert_eq!(records[1].totals.total_packed_units, 0);

        assert!(env.analytics_api.list_analytics(Some(8)).unwrap().is_empty());
    }

    #[test]
    fn test_delete_order_recomputes_former_scope() {
        let env = TestEnv::new();
        let date = day(2024, 1, 1);
        let keep = env.seed_order("ORD-1", date, &[("A", "Box", 1)]);
        let gone = env.seed_order("ORD-2", date, &[("A", "Box", 3)]);
        env.packing_api.assign_operator(keep.order.id, 7).unwrap();
        env.packing_api.assign_operator(gone.order.id, 7).unwrap();
        env.packing_api.pack_unit(gone.details[0].id).unwrap();
        env.packing_api.mark_defective(gone.details[0].id, 1).unwrap();

        let response = env.order_api.delete_order(gone.order.id).unwrap();
        let totals = response.analytics.unwrap().totals;
        assert_eq!(totals.total_orders, 1);
        assert_eq!(totals.total_packed_units, 0);
        assert_eq!(totals.total_defective_orders, 0);

        assert!(matches!(
            env.order_api.get_order(gone.order.id),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            env.order_api.list_defect_records(gone.details[0].id),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_failed_recompute_rolls_back_the_mutation() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-1", day(2024, 1, 1), &[("A", "Box", 1)]);
        env.packing_api.assign_operator(order.order.id, 7).unwrap();

        env.execute_sql("DROP TABLE packing_analytics;");

        let result = env.packing_api.pack_unit(order.details[0].id);
        assert!(matches!(result, Err(ApiError::StorageFailure(_))));

        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.details[0].packed_quantity, 0);
        assert_eq!(loaded.order.state, OrderState::Draft);
        assert!(loaded.order.shipping_label.is_none());
    }
}
