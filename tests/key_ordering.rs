//! Key Ordering Property Tests
//!
//! Converted keys must sort like the values they come from:
//! - Floats keep their numeric order
//! - Date/times keep their chronological order
//! - Integer keys sort before text keys

use chrono::DateTime;
use keyquery::keys::{
    date_time_to_ticks, ordered_f64, ticks_to_date_time, KeyKind, KeyRole, KeyValue, Scalar,
};
use proptest::prelude::*;

// Year 0001 to year 9999, in Unix seconds
const MIN_SECONDS: i64 = -62_135_596_800;
const MAX_SECONDS: i64 = 253_402_300_799;

fn finite_f64() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO
}

// =============================================================================
// Float Ordering
// =============================================================================

proptest! {
    /// The float encoding preserves numeric order.
    #[test]
    fn prop_float_order_preserved(a in finite_f64(), b in finite_f64()) {
        prop_assert_eq!(a.partial_cmp(&b), Some(ordered_f64(a).cmp(&ordered_f64(b))));
    }

    /// Float keys compare like the floats they come from.
    #[test]
    fn prop_float_keys_ordered(a in finite_f64(), b in finite_f64()) {
        let key = |v: f64| KeyValue::new("Price", KeyRole::ScalarIndex, KeyKind::Float.convert(&Scalar::Float(v)).unwrap());
        prop_assert_eq!(a.partial_cmp(&b), Some(key(a).cmp(&key(b))));
    }
}

// =============================================================================
// Tick Ordering
// =============================================================================

proptest! {
    /// Tick counts grow with time.
    #[test]
    fn prop_ticks_monotonic(
        a in MIN_SECONDS..MAX_SECONDS,
        b in MIN_SECONDS..MAX_SECONDS,
        nanos in 0u32..10_000_000u32,
    ) {
        let (Some(x), Some(y)) = (DateTime::from_timestamp(a, nanos * 100), DateTime::from_timestamp(b, 0)) else {
            return Ok(());
        };
        prop_assert_eq!(x.cmp(&y), date_time_to_ticks(&x).cmp(&date_time_to_ticks(&y)));
    }

    /// Ticks convert back to the same instant at 100ns resolution.
    #[test]
    fn prop_ticks_roundtrip(seconds in MIN_SECONDS..MAX_SECONDS, hundreds in 0u32..10_000_000u32) {
        if let Some(instant) = DateTime::from_timestamp(seconds, hundreds * 100) {
            prop_assert_eq!(ticks_to_date_time(date_time_to_ticks(&instant)), Some(instant));
        }
    }
}

// =============================================================================
// Representation Ordering
// =============================================================================

proptest! {
    /// Integer keys sort before text keys whatever their values.
    #[test]
    fn prop_int_before_text(n in any::<i64>(), s in ".*") {
        let int = KeyValue::int("A", KeyRole::ScalarIndex, n);
        let text = KeyValue::text("A", KeyRole::ScalarIndex, s);
        prop_assert!(int < text);
    }
}
