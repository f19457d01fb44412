//! Delivery slot calculation.
//!
//! Every scheduling decision in the system is made in Indian Standard Time
//! (UTC+05:30, no DST) regardless of the host timezone; this module owns
//! the conversion and is the only place wall-clock time is interpreted.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::entities::order::DeliveryShift;

/// The fixed civil timezone all delivery cutoffs are evaluated in.
pub type Ist = FixedOffset;

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

static IST: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is in range"));

/// Number of days (starting tomorrow) that are open for ordering.
pub const ORDERABLE_DAYS: u64 = 7;

/// Latest time of day an order for tomorrow morning may still be placed.
static MORNING_ORDER_CUTOFF: Lazy<NaiveTime> =
    Lazy::new(|| NaiveTime::from_hms_opt(23, 59, 59).expect("cutoff time is valid"));

const EVENING_DISABLED_REASON: &str = "Evening delivery is currently unavailable";

pub fn ist() -> Ist {
    *IST
}

pub fn to_ist(now: DateTime<Utc>) -> DateTime<Ist> {
    now.with_timezone(&ist())
}

/// A civil (date, time) pair interpreted in IST. FixedOffset has no gaps or
/// folds, so the conversion is total.
pub fn ist_datetime(date: NaiveDate, time: NaiveTime) -> DateTime<Ist> {
    date.and_time(time)
        .and_local_timezone(ist())
        .single()
        .expect("fixed offsets map local time uniquely")
}

/// Availability of one shift on one day.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShiftAvailability {
    pub available: bool,
    pub cutoff_passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One orderable calendar day with both shifts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub morning: ShiftAvailability,
    pub evening: ShiftAvailability,
}

/// Why a requested (date, shift) slot was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRejection {
    EveningDisabled,
    SameDayUnavailable,
    DateInPast,
    BeyondWindow { last: NaiveDate },
    CutoffPassed,
}

impl fmt::Display for SlotRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EveningDisabled => f.write_str(EVENING_DISABLED_REASON),
            Self::SameDayUnavailable => f.write_str("Same-day delivery is not available"),
            Self::DateInPast => f.write_str("Delivery date has already passed"),
            Self::BeyondWindow { last } => write!(
                f,
                "Delivery can only be scheduled up to {} days ahead (until {})",
                ORDERABLE_DAYS, last
            ),
            Self::CutoffPassed => {
                f.write_str("The ordering cutoff for tomorrow morning has passed")
            }
        }
    }
}

/// The seven orderable days starting tomorrow, as seen at `now`.
///
/// Evening slots are listed but administratively disabled; the data shape is
/// kept so the storefront can render the shift without special-casing it.
pub fn available_slots(now: DateTime<Utc>) -> Vec<DaySlots> {
    let now_ist = to_ist(now);
    let today = now_ist.date_naive();

    (1..=ORDERABLE_DAYS)
        .map(|offset| {
            let date = today + Days::new(offset);
            let cutoff_passed = offset == 1 && now_ist.time() > *MORNING_ORDER_CUTOFF;
            DaySlots {
                date,
                morning: ShiftAvailability {
                    available: !cutoff_passed,
                    cutoff_passed,
                    reason: cutoff_passed.then(|| SlotRejection::CutoffPassed.to_string()),
                },
                evening: ShiftAvailability {
                    available: false,
                    cutoff_passed: false,
                    reason: Some(EVENING_DISABLED_REASON.to_string()),
                },
            }
        })
        .collect()
}

/// Validates a specific (date, shift) request against the calendar at `now`.
///
/// Checks run in a fixed order so the caller always gets the most specific
/// reason: shift first, then the date window, then the next-day cutoff.
pub fn validate_slot(
    date: NaiveDate,
    shift: DeliveryShift,
    now: DateTime<Utc>,
) -> Result<(), SlotRejection> {
    if shift == DeliveryShift::Evening {
        return Err(SlotRejection::EveningDisabled);
    }

    let now_ist = to_ist(now);
    let today = now_ist.date_naive();
    let tomorrow = today + Days::new(1);
    let last = today + Days::new(ORDERABLE_DAYS);

    if date == today {
        return Err(SlotRejection::SameDayUnavailable);
    }
    if date < today {
        return Err(SlotRejection::DateInPast);
    }
    if date > last {
        return Err(SlotRejection::BeyondWindow { last });
    }
    if date == tomorrow && now_ist.time() > *MORNING_ORDER_CUTOFF {
        return Err(SlotRejection::CutoffPassed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at_ist(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        ist()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .expect("valid IST instant")
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn lists_exactly_seven_days_starting_tomorrow() {
        let now = at_ist(2026, 8, 7, 10, 0, 0);
        let slots = available_slots(now);

        assert_eq!(slots.len(), 7);
        assert_eq!(slots[0].date, date(2026, 8, 8));
        assert_eq!(slots[6].date, date(2026, 8, 14));
        assert!(slots.iter().all(|day| day.morning.available));
        assert!(slots.iter().all(|day| !day.evening.available));
    }

    #[test]
    fn listing_is_based_on_the_ist_calendar_not_utc() {
        // 23:30 UTC on Aug 7 is already 05:00 IST on Aug 8, so "tomorrow"
        // must be Aug 9.
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 23, 30, 0).unwrap();
        let slots = available_slots(now);
        assert_eq!(slots[0].date, date(2026, 8, 9));
    }

    #[test]
    fn evening_slots_carry_the_disabled_reason() {
        let now = at_ist(2026, 8, 7, 10, 0, 0);
        let slots = available_slots(now);
        assert_eq!(
            slots[0].evening.reason.as_deref(),
            Some(EVENING_DISABLED_REASON)
        );
    }

    #[rstest]
    #[case::early_morning(0, 1)]
    #[case::mid_morning(10, 0)]
    #[case::last_minute(23, 59)]
    fn tomorrow_morning_is_orderable_all_day(#[case] hour: u32, #[case] minute: u32) {
        let now = at_ist(2026, 8, 7, hour, minute, 0);
        assert_eq!(
            validate_slot(date(2026, 8, 8), DeliveryShift::Morning, now),
            Ok(())
        );
    }

    #[test]
    fn evening_is_rejected_unconditionally() {
        let now = at_ist(2026, 8, 7, 10, 0, 0);
        for offset in 0..=8u64 {
            let d = date(2026, 8, 7) + Days::new(offset);
            assert_eq!(
                validate_slot(d, DeliveryShift::Evening, now),
                Err(SlotRejection::EveningDisabled)
            );
        }
    }

    #[test]
    fn same_day_is_rejected_for_any_shift_at_any_hour() {
        for hour in [0, 4, 10, 23] {
            let now = at_ist(2026, 8, 7, hour, 0, 0);
            assert_eq!(
                validate_slot(date(2026, 8, 7), DeliveryShift::Morning, now),
                Err(SlotRejection::SameDayUnavailable)
            );
        }
    }

    #[test]
    fn past_dates_are_rejected() {
        let now = at_ist(2026, 8, 7, 10, 0, 0);
        assert_eq!(
            validate_slot(date(2026, 8, 6), DeliveryShift::Morning, now),
            Err(SlotRejection::DateInPast)
        );
    }

    #[test]
    fn the_window_ends_seven_days_out() {
        let now = at_ist(2026, 8, 7, 10, 0, 0);
        // Day 7 is the last orderable date
        assert_eq!(
            validate_slot(date(2026, 8, 14), DeliveryShift::Morning, now),
            Ok(())
        );
        assert_eq!(
            validate_slot(date(2026, 8, 15), DeliveryShift::Morning, now),
            Err(SlotRejection::BeyondWindow {
                last: date(2026, 8, 14)
            })
        );
    }

    #[test]
    fn validator_and_listing_agree_on_every_listed_day() {
        // The two entry points share one boundary rule; every day the
        // listing reports available must validate, and vice versa.
        for hour in [0, 6, 12, 23] {
            let now = at_ist(2026, 8, 7, hour, 0, 0);
            for day in available_slots(now) {
                assert_eq!(
                    day.morning.available,
                    validate_slot(day.date, DeliveryShift::Morning, now).is_ok(),
                    "listing and validator disagree for {} at {}:00",
                    day.date,
                    hour
                );
            }
        }
    }

    #[test]
    fn ist_conversion_is_plus_five_thirty() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let local = to_ist(now);
        assert_eq!(local.time(), NaiveTime::from_hms_opt(5, 30, 0).unwrap());
    }
}
