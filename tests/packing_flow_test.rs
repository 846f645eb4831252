// ==========================================
// Packing flow tests
// ==========================================
// Pack / defect / clear / reset through PackingApi against a
// temporary database.
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod packing_flow_test {
    use std::sync::Arc;

    use packing_station::api::ApiError;
    use packing_station::config::PackingConfig;
    use packing_station::domain::OrderState;

    use crate::test_helpers::{day, FailingLabelGenerator, RecordingLabelGenerator, TestEnv};

    #[test]
    fn test_ord1_example() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-1", day(2024, 1, 1), &[("A", "Box", 2), ("B", "Tape", 3)]);
        let (a, b) = (order.details[0].id, order.details[1].id);

        env.packing_api.pack_unit(a).unwrap();
        let r = env.packing_api.pack_unit(a).unwrap();
        assert_eq!(r.packed_quantity, 2);
        assert!(r.is_packed);
        assert!(!r.order_completed);
        assert_eq!(r.order_state, OrderState::Draft);

        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.order.state, OrderState::Draft);
        assert!(loaded.order.shipping_label.is_none());

        env.packing_api.pack_unit(b).unwrap();
        env.packing_api.pack_unit(b).unwrap();
        let r = env.packing_api.pack_unit(b).unwrap();
        assert!(r.is_packed);
        assert!(r.order_completed);
        assert_eq!(r.order_state, OrderState::Done);

        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.order.state, OrderState::Done);
        assert!(loaded.order.shipping_label.is_some());

        let label = env.order_api.get_shipping_label(order.order.id).unwrap().unwrap();
        assert!(label.contains("Order: ORD-1"));
        assert!(label.contains("- Box (x2)"));
        assert!(label.contains("- Tape (x3)"));
    }

    #[test]
    fn test_n_packs_give_packed_quantity_n() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-N", day(2024, 1, 1), &[("A", "Box", 4)]);
        let detail_id = order.details[0].id;

        for n in 1..=6 {
            let r = env.packing_api.pack_unit(detail_id).unwrap();
            assert_eq!(r.packed_quantity, n);
            assert_eq!(r.is_packed, n >= 4);
        }
    }

    #[test]
    fn test_pack_unit_has_no_upper_bound_but_by_code_does() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-B", day(2024, 1, 1), &[("A", "Box", 1)]);
        let order_id = order.order.id;
        let detail_id = order.details[0].id;

        let r = env.packing_api.pack_unit_by_code(order_id, "A").unwrap();
        assert_eq!(r.packed_quantity, 1);
        assert_eq!(r.quantity, 1);
        assert!(r.is_packed);

        // by code: refused past the required quantity
        match env.packing_api.pack_unit_by_code(order_id, "A") {
            Err(ApiError::AlreadyComplete {
                detail_id: id,
                packed,
                required,
            }) => {
                assert_eq!(id, detail_id);
                assert_eq!(packed, 1);
                assert_eq!(required, 1);
            }
            other => panic!("Expected AlreadyComplete, got {:?}", other),
        }

        // generic: over-packing allowed
        let r = env.packing_api.pack_unit(detail_id).unwrap();
        assert_eq!(r.packed_quantity, 2);
        assert_eq!(r.order_state, OrderState::Done);
    }

    #[test]
    fn test_pack_by_code_resolves_first_match() {
        let env = TestEnv::new();
        let order = env.seed_order(
            "ORD-DUP",
            day(2024, 1, 1),
            &[("A", "First", 1), ("A", "Second", 1)],
        );

        let r = env.packing_api.pack_unit_by_code(order.order.id, "A").unwrap();
        assert_eq!(r.detail_id, order.details[0].id);
        assert!(!r.order_completed);

        // first match is complete now; the code still resolves to it
        assert!(matches!(
            env.packing_api.pack_unit_by_code(order.order.id, "A"),
            Err(ApiError::AlreadyComplete { .. })
        ));
    }

    #[test]
    fn test_pack_by_code_errors() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-E", day(2024, 1, 1), &[("A", "Box", 1)]);

        assert!(matches!(
            env.packing_api.pack_unit_by_code(order.order.id, "  "),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            env.packing_api.pack_unit_by_code(order.order.id, "Z"),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            env.packing_api.pack_unit_by_code(9999, "A"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_ids_and_bad_arguments() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-X", day(2024, 1, 1), &[("A", "Box", 1)]);
        let detail_id = order.details[0].id;

        assert!(matches!(env.packing_api.pack_unit(9999), Err(ApiError::NotFound(_))));
        assert!(matches!(env.packing_api.mark_defective(9999, 1), Err(ApiError::NotFound(_))));
        assert!(matches!(env.packing_api.clear_defect(9999), Err(ApiError::NotFound(_))));
        assert!(matches!(env.packing_api.reset_order(9999), Err(ApiError::NotFound(_))));
        assert!(matches!(
            env.packing_api.assign_operator(9999, 1),
            Err(ApiError::NotFound(_))
        ));

        assert!(matches!(
            env.packing_api.mark_defective(detail_id, 0),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            env.packing_api.mark_defective(detail_id, -2),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            env.packing_api.assign_operator(order.order.id, 0),
            Err(ApiError::InvalidArgument(_))
        ));

        // nothing changed
        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.details[0].defective_quantity, 0);
        assert_eq!(loaded.order.operator_id, None);
    }

    #[test]
    fn test_mark_defective_overrides_done() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-D", day(2024, 1, 1), &[("A", "Box", 1)]);
        let detail_id = order.details[0].id;

        env.packing_api.pack_unit(detail_id).unwrap();
        assert_eq!(
            env.order_api.get_order(order.order.id).unwrap().order.state,
            OrderState::Done
        );

        let r = env.packing_api.mark_defective(detail_id, 1).unwrap();
        assert_eq!(r.defective_quantity, 1);
        assert!(r.is_defective);
        assert_eq!(r.order_state, OrderState::Defective);

        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.order.state, OrderState::Defective);
        // counters are independent
        assert_eq!(loaded.details[0].packed_quantity, 1);
    }

    #[test]
    fn test_round_trip_never_returns_to_done_automatically() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-R", day(2024, 1, 1), &[("A", "Box", 1), ("B", "Tape", 1)]);
        let (a, b) = (order.details[0].id, order.details[1].id);

        env.packing_api.pack_unit(a).unwrap();
        assert_eq!(env.packing_api.pack_unit(b).unwrap().order_state, OrderState::Done);

        env.packing_api.mark_defective(a, 2).unwrap();
        env.packing_api.mark_defective(b, 1).unwrap();

        // one defective detail left
        let r = env.packing_api.clear_defect(a).unwrap();
        assert_eq!(r.defective_quantity, 0);
        assert!(!r.order_fixed);
        assert_eq!(r.order_state, OrderState::Defective);

        let r = env.packing_api.clear_defect(b).unwrap();
        assert!(r.order_fixed);
        assert_eq!(r.order_state, OrderState::Draft);

        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.order.state, OrderState::Draft);
        assert!(loaded.all_packed());
    }

    #[test]
    fn test_packing_while_defective_stays_defective() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-P", day(2024, 1, 1), &[("A", "Box", 1), ("B", "Tape", 1)]);
        let (a, b) = (order.details[0].id, order.details[1].id);

        env.packing_api.mark_defective(a, 1).unwrap();
        env.packing_api.pack_unit(a).unwrap();
        let r = env.packing_api.pack_unit(b).unwrap();
        assert!(r.order_completed);
        assert_eq!(r.order_state, OrderState::Defective);
        assert!(env.order_api.get_shipping_label(order.order.id).unwrap().is_none());

        // after the clear, the next pack completes the order
        env.packing_api.clear_defect(a).unwrap();
        let r = env.packing_api.pack_unit(b).unwrap();
        assert_eq!(r.order_state, OrderState::Done);
        assert!(env.order_api.get_shipping_label(order.order.id).unwrap().is_some());
    }

    #[test]
    fn test_defect_ledger_records_and_replacement() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-L", day(2024, 1, 1), &[("A", "Box", 3)]);
        let detail_id = order.details[0].id;

        env.packing_api.mark_defective(detail_id, 1).unwrap();
        env.packing_api.mark_defective(detail_id, 2).unwrap();

        let records = env.order_api.list_defect_records(detail_id).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.iter().map(|r| r.quantity).sum::<i64>(), 3);
        assert!(records.iter().all(|r| !r.replaced));

        env.packing_api.clear_defect(detail_id).unwrap();
        let records = env.order_api.list_defect_records(detail_id).unwrap();
        assert!(records.iter().all(|r| r.replaced && r.replaced_at.is_some()));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let env = TestEnv::new();
        let order = env.seed_order("ORD-Z", day(2024, 1, 1), &[("A", "Box", 1), ("B", "Tape", 2)]);
        let (a, b) = (order.details[0].id, order.details[1].id);

        env.packing_api.pack_unit(a).unwrap();
        env.packing_api.pack_unit(b).unwrap();
        env.packing_api.pack_unit(b).unwrap();
        env.packing_api.mark_defective(b, 1).unwrap();

        let first = env.packing_api.reset_order(order.order.id).unwrap();
        assert_eq!(first.details_reset, 2);
        assert_eq!(first.order_state, OrderState::Draft);
        let after_first = env.order_api.get_order(order.order.id).unwrap();

        env.packing_api.reset_order(order.order.id).unwrap();
        let after_second = env.order_api.get_order(order.order.id).unwrap();

        assert_eq!(after_first.order, after_second.order);
        assert_eq!(after_first.details, after_second.details);
        assert!(after_second
            .details
            .iter()
            .all(|d| d.packed_quantity == 0 && d.defective_quantity == 0));
        assert_eq!(after_second.order.state, OrderState::Draft);
        assert!(after_second.order.shipping_label.is_none());
    }

    #[test]
    fn test_label_failure_does_not_block_completion() {
        let env = TestEnv::with(Arc::new(FailingLabelGenerator), PackingConfig::default());
        let order = env.seed_order("ORD-F", day(2024, 1, 1), &[("A", "Box", 1)]);

        let r = env.packing_api.pack_unit(order.details[0].id).unwrap();
        assert_eq!(r.order_state, OrderState::Done);

        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.order.state, OrderState::Done);
        assert!(loaded.order.shipping_label.is_none());
    }

    #[test]
    fn test_label_rendered_from_done_snapshot() {
        let generator = Arc::new(RecordingLabelGenerator::default());
        let env = TestEnv::with(generator.clone(), PackingConfig::default());
        let order = env.seed_order("ORD-S", day(2024, 1, 1), &[("A", "Box", 1), ("B", "Tape", 2)]);
        let (a, b) = (order.details[0].id, order.details[1].id);

        env.packing_api.pack_unit(a).unwrap();
        env.packing_api.pack_unit(b).unwrap();
        assert!(generator.calls.lock().unwrap().is_empty());

        env.packing_api.pack_unit(b).unwrap();
        // over-packing a Done order renders nothing new
        env.packing_api.pack_unit(b).unwrap();

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (snapshot_order, snapshot_details) = &calls[0];
        assert_eq!(snapshot_order.state, OrderState::Done);
        assert_eq!(snapshot_details.len(), 2);
        assert!(snapshot_details.iter().all(|d| d.is_fully_packed()));

        let label = env.order_api.get_shipping_label(order.order.id).unwrap();
        assert_eq!(label.as_deref(), Some("label #1"));
    }

    #[test]
    fn test_adding_detail_to_done_order_reopens_it() {
        let env = TestEnv::new();
        let date = day(2024, 1, 1);
        let order = env.seed_order("ORD-1", date, &[("A", "Box", 1)]);
        env.packing_api.pack_unit(order.details[0].id).unwrap();
        assert!(env.order_api.get_shipping_label(order.order.id).unwrap().is_some());

        let added = env
            .order_api
            .add_detail_on(
                "ORD-1",
                packing_station::domain::NewDetail {
                    external_code: "B".to_string(),
                    name: "Tape".to_string(),
                    required_quantity: 3,
                    size_info: None,
                },
                date,
            )
            .unwrap();
        assert!(!added.order_created);
        assert_eq!(added.order.state, OrderState::Draft);

        let loaded = env.order_api.get_order(order.order.id).unwrap();
        assert_eq!(loaded.order.state, OrderState::Draft);
        assert!(!loaded.all_packed());
        assert!(loaded.order.shipping_label.is_none());

        let new_detail = added.detail.id;
        for _ in 0..2 {
            let r = env.packing_api.pack_unit(new_detail).unwrap();
            assert!(!r.order_completed);
            assert_eq!(r.order_state, OrderState::Draft);
        }
        let r = env.packing_api.pack_unit(new_detail).unwrap();
        assert!(r.order_completed);
        assert_eq!(r.order_state, OrderState::Done);

        let label = env.order_api.get_shipping_label(order.order.id).unwrap().unwrap();
        assert!(label.contains("- Box (x1)"));
        assert!(label.contains("- Tape (x3)"));
    }

    #[test]
    fn test_list_orders_default_hides_defective() {
        let env = TestEnv::new();
        let draft = env.seed_order("ORD-1", day(2024, 1, 1), &[("A", "Box", 2)]);
        let defective = env.seed_order("ORD-2", day(2024, 1, 1), &[("A", "Box", 2)]);
        env.packing_api.mark_defective(defective.details[0].id, 1).unwrap();

        let listed = env.order_api.list_orders(None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].order.id, draft.order.id);

        let defective_list = env.order_api.list_defective_orders().unwrap();
        assert_eq!(defective_list.len(), 1);
        assert_eq!(defective_list[0].order.id, defective.order.id);

        let all = env
            .order_api
            .list_orders(Some(&[OrderState::Draft, OrderState::Done, OrderState::Defective][..]))
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_add_detail_validation() {
        let env = TestEnv::new();
        let detail = packing_station::domain::NewDetail {
            external_code: "A".to_string(),
            name: "Box".to_string(),
            required_quantity: 0,
            size_info: None,
        };
        assert!(matches!(
            env.order_api.add_detail("ORD-1", detail.clone()),
            Err(ApiError::InvalidArgument(_))
        ));

        let detail = packing_station::domain::NewDetail {
            required_quantity: 1,
            ..detail
        };
        assert!(matches!(
            env.order_api.add_detail(" ", detail.clone()),
            Err(ApiError::InvalidArgument(_))
        ));

        let first = env.order_api.add_detail("ORD-1", detail.clone()).unwrap();
        let second = env.order_api.add_detail("ORD-1", detail).unwrap();
        assert!(first.order_created);
        assert!(!second.order_created);
        assert_eq!(first.order.id, second.order.id);
        assert_ne!(first.detail.id, second.detail.id);
    }
}
