// Slot-overlap predicate coverage.
//
// A doctor serves fixed 30-minute slots: an existing pending/confirmed
// appointment blocks any candidate start within [existing - 30min,
// existing + 30min), and nothing outside it.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use medicore::modules::appointments::models::{slot_bucket_for, SLOT_MINUTES};
use medicore::modules::appointments::services::availability::slots_conflict;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

#[test]
fn test_booking_inside_window_conflicts() {
    let candidate = base();
    for offset in [-30, -15, -1, 0, 1, 15, 29] {
        let existing = candidate + Duration::minutes(offset);
        assert!(
            slots_conflict(existing, candidate),
            "offset {} minutes should conflict",
            offset
        );
    }
}

#[test]
fn test_booking_outside_window_succeeds() {
    let candidate = base();
    for offset in [-60, -31, 30, 31, 60] {
        let existing = candidate + Duration::minutes(offset);
        assert!(
            !slots_conflict(existing, candidate),
            "offset {} minutes should not conflict",
            offset
        );
    }
}

#[test]
fn test_window_edges() {
    let candidate = base();
    // left edge inclusive, right edge exclusive
    assert!(slots_conflict(candidate - Duration::minutes(30), candidate));
    assert!(!slots_conflict(candidate + Duration::minutes(30), candidate));
}

#[test]
fn test_second_precision_near_right_edge() {
    let candidate = base();
    let just_inside = candidate + Duration::minutes(29) + Duration::seconds(59);
    assert!(slots_conflict(just_inside, candidate));
}

proptest! {
    // Conflict holds exactly when the start offset lies in [-30, +30) minutes.
    #[test]
    fn prop_conflict_matches_window(offset_secs in -7200i64..7200i64) {
        let candidate = base();
        let existing = candidate + Duration::seconds(offset_secs);
        let width_secs = SLOT_MINUTES * 60;
        let expected = offset_secs >= -width_secs && offset_secs < width_secs;
        prop_assert_eq!(slots_conflict(existing, candidate), expected);
    }

    // Strictly inside the window the block is mutual: if A's slot blocks
    // B then B's slot blocks A. Only the half-open edges break symmetry.
    #[test]
    fn prop_conflicts_are_mutual_strictly_inside(offset_secs in -1799i64..1800i64) {
        let a = base();
        let b = a + Duration::seconds(offset_secs);
        prop_assert_eq!(slots_conflict(a, b), slots_conflict(b, a));
    }

    // Starts in the same 30-minute bucket always conflict; the unique
    // (doctor_id, slot_bucket) key is therefore a sound backstop.
    #[test]
    fn prop_same_bucket_implies_conflict(a_secs in 0i64..86_400, b_secs in 0i64..86_400) {
        let day = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let a = day + Duration::seconds(a_secs);
        let b = day + Duration::seconds(b_secs);
        if slot_bucket_for(a) == slot_bucket_for(b) {
            prop_assert!(slots_conflict(a, b));
        }
    }
}
