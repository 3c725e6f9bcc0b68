//! Delivery-date resolution.
//!
//! Orders are entered against a target date chosen by the operator (or
//! "today" for the public form). Kitchen prep for a day closes at 21:00 local
//! time, so a same-day order placed at or after the cutoff is delivered the
//! next day. Back-dated and forward-dated entries are taken at face value.
//!
//! The business runs on India Standard Time, a fixed UTC+05:30 offset with no
//! daylight saving, so the offset is a constant rather than a time zone.

use chrono::{
    DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc,
};

/// UTC offset of the business, in seconds (+05:30).
pub const BUSINESS_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// Local hour at which same-day orders roll over to the next day.
///
/// The boundary is inclusive: 21:00:00 already rolls over.
pub const CUTOFF_HOUR: u32 = 21;

/// Local time used as the creation timestamp for orders entered against a
/// date other than today.
const NOMINAL_ENTRY_HOUR: u32 = 12;

/// The fixed business offset (UTC+05:30).
#[must_use]
pub fn business_offset() -> FixedOffset {
    // Always within the +/-24h range, the fallback is unreachable.
    FixedOffset::east_opt(BUSINESS_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Calendar date of `now` at the given offset.
#[must_use]
pub fn local_today(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// The two values stored on a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverySchedule {
    /// Date the order will be delivered.
    pub delivery_date: NaiveDate,
    /// Instant recorded as the order's creation time.
    pub created_at: DateTime<Utc>,
}

impl DeliverySchedule {
    /// Whether the cutoff moved the order to a later day than requested.
    #[must_use]
    pub fn rolled_over_from(&self, selected: NaiveDate) -> bool {
        self.delivery_date > selected
    }
}

/// Resolve the delivery date and creation timestamp for an order.
///
/// - `selected` equal to today (at `offset`): delivered today, or tomorrow
///   once the local clock has reached [`CUTOFF_HOUR`]. Created at `now`.
/// - Any other `selected` date: delivered on exactly that date, created at
///   12:00 local on that date.
///
/// This never fails.
#[must_use]
pub fn resolve_delivery(
    now: DateTime<Utc>,
    selected: NaiveDate,
    offset: FixedOffset,
) -> DeliverySchedule {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive();

    if selected == today {
        let delivery_date = if local_now.hour() >= CUTOFF_HOUR {
            today.checked_add_days(Days::new(1)).unwrap_or(today)
        } else {
            today
        };
        return DeliverySchedule {
            delivery_date,
            created_at: now,
        };
    }

    DeliverySchedule {
        delivery_date: selected,
        created_at: nominal_instant(selected, offset),
    }
}

/// Noon local on `date`, as an absolute instant.
///
/// A fixed offset has no gaps or folds, so the local-to-UTC mapping is a
/// plain subtraction.
fn nominal_instant(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_noon = date.and_time(
        NaiveTime::from_hms_opt(NOMINAL_ENTRY_HOUR, 0, 0).unwrap_or(NaiveTime::MIN),
    );
    let utc_naive = local_noon - chrono::Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc_naive)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Build a UTC instant from a local (IST) wall-clock time.
    fn ist(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        business_offset()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_business_offset_is_ist() {
        assert_eq!(business_offset().local_minus_utc(), 19_800);
    }

    #[test]
    fn test_same_day_before_cutoff() {
        let now = ist(2024, 3, 1, 20, 59, 0);
        let schedule = resolve_delivery(now, date(2024, 3, 1), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 1));
        assert_eq!(schedule.created_at, now);
    }

    #[test]
    fn test_same_day_one_second_before_cutoff() {
        let now = ist(2024, 3, 1, 20, 59, 59);
        let schedule = resolve_delivery(now, date(2024, 3, 1), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 1));
    }

    #[test]
    fn test_same_day_at_cutoff_rolls_over() {
        let now = ist(2024, 3, 1, 21, 0, 0);
        let schedule = resolve_delivery(now, date(2024, 3, 1), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 2));
        assert_eq!(schedule.created_at, now);
        assert!(schedule.rolled_over_from(date(2024, 3, 1)));
    }

    #[test]
    fn test_same_day_just_before_midnight_rolls_over() {
        let now = ist(2024, 3, 1, 23, 59, 59);
        let schedule = resolve_delivery(now, date(2024, 3, 1), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 2));
    }

    #[test]
    fn test_rollover_crosses_month_end() {
        let now = ist(2024, 2, 29, 22, 15, 0);
        let schedule = resolve_delivery(now, date(2024, 2, 29), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 1));
    }

    #[test]
    fn test_local_day_differs_from_utc_day() {
        // 19:00 UTC on Mar 1 is 00:30 IST on Mar 2.
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap();
        assert_eq!(local_today(now, business_offset()), date(2024, 3, 2));

        let schedule = resolve_delivery(now, date(2024, 3, 2), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 2));
        assert_eq!(schedule.created_at, now);
    }

    #[test]
    fn test_back_dated_ignores_cutoff() {
        let now = ist(2024, 3, 5, 22, 0, 0);
        let schedule = resolve_delivery(now, date(2024, 3, 1), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 1));
        assert!(!schedule.rolled_over_from(date(2024, 3, 1)));
    }

    #[test]
    fn test_forward_dated_ignores_cutoff() {
        let now = ist(2024, 3, 1, 21, 30, 0);
        let schedule = resolve_delivery(now, date(2024, 3, 4), business_offset());
        assert_eq!(schedule.delivery_date, date(2024, 3, 4));
    }

    #[test]
    fn test_other_day_created_at_is_local_noon() {
        let now = ist(2024, 3, 5, 9, 0, 0);
        let schedule = resolve_delivery(now, date(2024, 3, 1), business_offset());
        // 12:00 IST == 06:30 UTC
        assert_eq!(
            schedule.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_other_offset_is_respected() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();
        let schedule = resolve_delivery(now, date(2024, 3, 1), utc);
        assert_eq!(schedule.delivery_date, date(2024, 3, 2));

        let schedule = resolve_delivery(now, date(2024, 2, 1), utc);
        assert_eq!(
            schedule.created_at,
            Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
        );
    }
}
