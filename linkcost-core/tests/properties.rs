//! Property tests over randomly drawn link parameters

use linkcost_core::{
    derivative, preprocess, preprocess_table, time_only, value, values, FieldId, LinkTable,
    Status, Variant, VdfState, INFINITE_COST,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct LinkCase {
    t0: f64,
    capacity: f64,
    gc: f64,
    alpha1: f64,
    beta1: f64,
    preload: f64,
}

fn link_case() -> impl Strategy<Value = LinkCase> {
    (
        0.1f64..60.0,
        100.0f64..5000.0,
        prop_oneof![Just(0.0), 0.1f64..0.9],
        0.0f64..5.0,
        1.0f64..6.0,
        0.0f64..500.0,
    )
        .prop_map(|(t0, capacity, gc, alpha1, beta1, preload)| LinkCase {
            t0,
            capacity,
            gc,
            alpha1,
            beta1,
            preload,
        })
}

fn prepared(variant: Variant, case: &LinkCase) -> (VdfState, LinkTable) {
    let mut table = LinkTable::new(variant, 1);
    table.set(FieldId::Time, 0, Some(case.t0));
    table.set(FieldId::Capacity, 0, Some(case.capacity));
    table.set(FieldId::IntersectionCapacity, 0, Some(case.capacity * 0.5));
    table.set(FieldId::GreenRatio, 0, Some(case.gc));
    table.set(FieldId::Alpha1, 0, Some(case.alpha1));
    table.set(FieldId::Beta1, 0, Some(case.beta1));
    table.set(FieldId::Preload, 0, Some(case.preload));

    let mut state = VdfState::new();
    let defaults = variant.defaults();
    preprocess(&mut state, &mut table, &defaults).expect("valid link");
    (state, table)
}

proptest! {
    #[test]
    fn cost_never_below_free_flow(case in link_case(), flow in 0.0f64..10_000.0) {
        let (mut state, mut table) = prepared(Variant::Baseline, &case);
        values(&mut state, &mut table, &[], &[flow]).unwrap();

        prop_assert!(table.current_cost(0).unwrap() >= case.t0);
        prop_assert_eq!(state.status, Status::Okay);
    }

    #[test]
    fn cost_is_monotone_in_flow(case in link_case(), a in 0.0f64..8000.0, b in 0.0f64..8000.0) {
        let (state, table) = prepared(Variant::Baseline, &case);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let low = value(&state, &table, &[], 0, lo).unwrap();
        let high = value(&state, &table, &[], 0, hi).unwrap();
        prop_assert!(high >= low - 1e-9 * low.abs());
    }

    #[test]
    fn time_only_never_below_free_flow(case in link_case(), flow in 0.0f64..10_000.0) {
        let (mut state, mut table) = prepared(Variant::Extended, &case);
        time_only(&mut state, &mut table, &[], &[flow]).unwrap();
        prop_assert!(table.current_cost(0).unwrap() >= case.t0);
    }

    #[test]
    fn preprocessing_is_idempotent(case in link_case()) {
        let (_, mut table) = prepared(Variant::Extended, &case);
        let snapshot = table.clone();
        let defaults = Variant::Extended.defaults();

        preprocess_table(&mut table, &defaults).unwrap();
        prop_assert_eq!(table, snapshot);
    }

    #[test]
    fn disabled_links_cost_infinite(case in link_case(), flow in -100.0f64..1.0e7) {
        let (state, table) = prepared(Variant::Extended, &case);
        prop_assert_eq!(value(&state, &table, &[true], 0, flow), Some(INFINITE_COST));
    }

    #[test]
    fn derivative_is_non_negative(case in link_case(), flow in 1.0f64..8000.0) {
        let (_, table) = prepared(Variant::Baseline, &case);
        prop_assert!(derivative(&table, &[], 0, flow) >= 0.0);
    }
}
