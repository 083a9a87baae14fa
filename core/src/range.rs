//! Date ranges and the overlap predicate.
//!
//! Two ranges `[s1, e1]` and `[s2, e2]` conflict iff `s1 <= e2 && e1 >= s2`.
//! Both ends are inclusive, so a booking ending on the instant another one
//! starts is a conflict. Adjacent days with distinct timestamps are not.

use crate::error::RentalError;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A closed interval of time with `start < end`.
///
/// Serialized as `{"startDate": ..., "endDate": ...}`; deserialization goes
/// through [`DateRange::new`] so an inverted range can never be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeFields")]
pub struct DateRange {
    /// First instant of the range.
    #[serde(rename = "startDate")]
    start: DateTime<Utc>,
    /// Last instant of the range.
    #[serde(rename = "endDate")]
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeFields {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

impl TryFrom<RangeFields> for DateRange {
    type Error = RentalError;

    fn try_from(fields: RangeFields) -> Result<Self, Self::Error> {
        Self::new(fields.start_date, fields.end_date)
    }
}

impl DateRange {
    /// Build a range, rejecting `end <= start`.
    ///
    /// # Errors
    ///
    /// Returns [`RentalError::BadRequest`] when `end` is not after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RentalError> {
        if end <= start {
            return Err(RentalError::BadRequest(
                "endDate must be after startDate".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Build a range from a pair of optional bounds where both or neither
    /// must be present.
    ///
    /// # Errors
    ///
    /// Returns [`RentalError::BadRequest`] when only one bound is given or
    /// the bounds are out of order.
    pub fn from_optional(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, RentalError> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::new(start, end).map(Some),
            _ => Err(RentalError::BadRequest(
                "Both startDate and endDate are required when either is provided".to_string(),
            )),
        }
    }

    /// Start of the range.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the range.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Inclusive overlap test.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Calendar days (UTC) touched by the range, first to last inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.end.date_naive();
        let mut next = Some(self.start.date_naive());
        std::iter::from_fn(move || {
            let day = next.filter(|d| *d <= last)?;
            next = day.checked_add_days(Days::new(1));
            Some(day)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[allow(clippy::unwrap_used)]
    fn june(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()
    }

    #[allow(clippy::unwrap_used)]
    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(june(start), june(end)).unwrap()
    }

    #[test]
    fn test_rejects_inverted_and_empty_ranges() {
        assert!(DateRange::new(june(3), june(1)).is_err());
        assert!(DateRange::new(june(3), june(3)).is_err());
    }

    #[test]
    fn test_overlap_is_inclusive() {
        assert!(range(1, 3).overlaps(&range(2, 4)));
        assert!(range(1, 3).overlaps(&range(3, 5)));
        assert!(!range(1, 3).overlaps(&range(4, 6)));
    }

    #[test]
    fn test_from_optional_requires_both_bounds() {
        assert!(matches!(DateRange::from_optional(None, None), Ok(None)));
        assert!(DateRange::from_optional(Some(june(1)), None).is_err());
        assert!(matches!(
            DateRange::from_optional(Some(june(1)), Some(june(2))),
            Ok(Some(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_inverted_range() {
        let json = r#"{"startDate":"2024-06-03T00:00:00Z","endDate":"2024-06-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<DateRange>(json).is_err());
    }

    #[test]
    fn test_days_are_inclusive() {
        let days: Vec<_> = range(1, 3).days().collect();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0], june(1).date_naive());
        assert_eq!(days[2], june(3).date_naive());
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in 0i64..1000, la in 1i64..100, b in 0i64..1000, lb in 1i64..100) {
            let base = june(1);
            let first = DateRange {
                start: base + chrono::Duration::hours(a),
                end: base + chrono::Duration::hours(a + la),
            };
            let second = DateRange {
                start: base + chrono::Duration::hours(b),
                end: base + chrono::Duration::hours(b + lb),
            };
            prop_assert_eq!(first.overlaps(&second), second.overlaps(&first));
            // Disjoint exactly when one ends strictly before the other starts.
            let disjoint = first.end() < second.start() || second.end() < first.start();
            prop_assert_eq!(first.overlaps(&second), !disjoint);
        }
    }
}
