//! Property-based tests for the pure rules behind orders, shipments and batches.

use agrichain_api::{
    auth::PasswordPolicy,
    entities::{
        order::OrderStatus, order_item, processing_batch::BatchStatus, sale,
        shipment::ShipmentStatus,
    },
    errors::ServiceError,
    services::{identifiers::sequence_code, orders::order_total, shipments::next_status},
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn shipment_status() -> impl Strategy<Value = ShipmentStatus> {
    prop_oneof![
        Just(ShipmentStatus::Scheduled),
        Just(ShipmentStatus::InTransit),
        Just(ShipmentStatus::Delivered),
    ]
}

fn order_status() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Processing),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Delivered),
    ]
}

fn line() -> impl Strategy<Value = order_item::Model> {
    (1i32..10_000, 1i64..1_000_000).prop_map(|(quantity, cents)| order_item::Model {
        id: 0,
        order_id: 0,
        product_id: 0,
        quantity,
        unit_price: Decimal::new(cents, 2),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn order_total_is_sum_of_line_totals(lines in prop::collection::vec(line(), 0..20)) {
        let expected: Decimal = lines
            .iter()
            .map(|l| Decimal::from(l.quantity) * l.unit_price)
            .sum();
        prop_assert_eq!(order_total(&lines), expected);
        prop_assert!(order_total(&lines) >= Decimal::ZERO);
    }

    #[test]
    fn removing_a_line_lowers_the_total_by_its_amount(
        lines in prop::collection::vec(line(), 1..20),
        pick in any::<prop::sample::Index>(),
    ) {
        let idx = pick.index(lines.len());
        let removed = lines[idx].line_total();
        let mut rest = lines.clone();
        rest.remove(idx);
        prop_assert_eq!(order_total(&rest), order_total(&lines) - removed);
    }

    #[test]
    fn shipment_transitions_never_go_backwards(
        current in shipment_status(),
        requested in shipment_status(),
    ) {
        match next_status(current, requested) {
            Ok(None) => prop_assert_eq!(current, requested),
            Ok(Some(next)) => {
                prop_assert_eq!(next, requested);
                prop_assert!(current.can_transition_to(requested));
                prop_assert_ne!(current, ShipmentStatus::Delivered);
            }
            Err(ServiceError::InvalidStatus(_)) => {
                prop_assert!(!current.can_transition_to(requested));
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn order_status_transitions_are_strictly_forward(
        a in order_status(),
        b in order_status(),
    ) {
        if a.can_transition_to(b) {
            prop_assert!(!b.can_transition_to(a));
        }
        prop_assert!(!a.can_transition_to(a));
    }

    #[test]
    fn sequence_codes_round_trip_the_id(id in 1i32..1_000_000) {
        let code = sequence_code("RM", id);
        let number: i32 = code.trim_start_matches("RM-").parse().unwrap();
        prop_assert_eq!(number - 1000, id);
    }

    #[test]
    fn password_policy_is_length_based(password in "[a-zA-Z0-9]{0,140}") {
        let policy = PasswordPolicy::default();
        let len = password.chars().count();
        let accepted = policy.check(&password).is_ok();
        prop_assert_eq!(accepted, (policy.min_length..=policy.max_length).contains(&len));
    }
}

#[test]
fn every_month_label_has_a_calendar_position() {
    for (i, month) in sale::MONTHS.iter().enumerate() {
        assert_eq!(sale::month_index(month), Some(i));
        assert_eq!(sale::month_index(&month.to_uppercase()), Some(i));
    }
    assert_eq!(sale::month_index("Smarch"), None);
}

#[test]
fn only_completed_and_canceled_batches_are_terminal() {
    assert!(!BatchStatus::InProgress.is_terminal());
    assert!(BatchStatus::Completed.is_terminal());
    assert!(BatchStatus::Canceled.is_terminal());
}
