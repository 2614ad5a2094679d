//! Half-open interval arithmetic.
//!
//! Every conflict check in the engine goes through [`overlaps`]. Intervals are
//! `[start, end)`: touching endpoints do not overlap. No timezone handling is
//! done here; callers pass instants that are already resolved to UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval. No ordering check is made.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns the whole minutes in this interval.
    pub fn duration_minutes(&self) -> i64 {
        duration_minutes(self)
    }
}

/// Returns true iff `a` and `b` share at least one instant.
///
/// # Examples
///
/// ```
/// use shift_ledger::calculation::{overlaps, Interval};
/// use chrono::{TimeZone, Utc};
///
/// let at = |h| Utc.with_ymd_and_hms(2026, 1, 15, h, 0, 0).unwrap();
/// assert!(overlaps(&Interval::new(at(10), at(16)), &Interval::new(at(12), at(14))));
/// assert!(!overlaps(&Interval::new(at(9), at(12)), &Interval::new(at(12), at(15))));
/// ```
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.start < b.end && b.start < a.end
}

/// Returns the shared region of `a` and `b`, if any.
pub fn intersection(a: &Interval, b: &Interval) -> Option<Interval> {
    if !overlaps(a, b) {
        return None;
    }
    Some(Interval {
        start: a.start.max(b.start),
        end: a.end.min(b.end),
    })
}

/// Floor of the millisecond difference divided by 60 000.
pub fn duration_minutes(interval: &Interval) -> i64 {
    (interval.end - interval.start)
        .num_milliseconds()
        .div_euclid(60_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, minute, 0).unwrap()
    }

    fn hours(start: u32, end: u32) -> Interval {
        Interval::new(at(15, start, 0), at(15, end, 0))
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        assert!(!overlaps(&hours(9, 12), &hours(12, 15)));
        assert!(!overlaps(&hours(12, 15), &hours(9, 12)));
        assert!(intersection(&hours(9, 12), &hours(12, 15)).is_none());
    }

    #[test]
    fn test_inner_overlap_is_120_minutes() {
        let outer = hours(10, 16);
        let inner = hours(12, 14);
        assert!(overlaps(&outer, &inner));

        let shared = intersection(&outer, &inner).unwrap();
        assert_eq!(shared, inner);
        assert_eq!(duration_minutes(&shared), 120);
    }

    #[test]
    fn test_partial_overlap_intersection() {
        let shared = intersection(&hours(8, 13), &hours(11, 18)).unwrap();
        assert_eq!(shared, hours(11, 13));
    }

    #[test]
    fn test_midnight_crossing_interval() {
        let night = Interval::new(at(15, 22, 0), at(16, 2, 0));
        assert_eq!(night.duration_minutes(), 240);
        assert!(overlaps(&night, &Interval::new(at(16, 1, 0), at(16, 5, 0))));
        assert!(!overlaps(&night, &Interval::new(at(16, 2, 0), at(16, 5, 0))));
    }

    #[test]
    fn test_duration_floors_partial_minutes() {
        let start = at(15, 9, 0);
        let end = start + chrono::Duration::milliseconds(90_999);
        assert_eq!(duration_minutes(&Interval::new(start, end)), 1);
    }

    #[test]
    fn test_duration_floors_negative_toward_minus_infinity() {
        let start = at(15, 9, 0);
        let end = start - chrono::Duration::seconds(30);
        assert_eq!(duration_minutes(&Interval::new(start, end)), -1);
    }

    fn instant() -> impl Strategy<Value = DateTime<Utc>> {
        (1_700_000_000i64..1_800_000_000i64).prop_map(|s| Utc.timestamp_opt(s, 0).unwrap())
    }

    fn interval() -> impl Strategy<Value = Interval> {
        (instant(), 1i64..200_000).prop_map(|(start, len)| {
            Interval::new(start, start + chrono::Duration::seconds(len))
        })
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(a in interval(), b in interval()) {
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }

        #[test]
        fn prop_non_empty_interval_overlaps_itself(a in interval()) {
            prop_assert!(overlaps(&a, &a));
        }

        #[test]
        fn prop_intersection_lies_within_both(a in interval(), b in interval()) {
            if let Some(shared) = intersection(&a, &b) {
                prop_assert!(shared.start >= a.start && shared.start >= b.start);
                prop_assert!(shared.end <= a.end && shared.end <= b.end);
                prop_assert!(shared.start < shared.end);
            } else {
                prop_assert!(!overlaps(&a, &b));
            }
        }
    }
}
