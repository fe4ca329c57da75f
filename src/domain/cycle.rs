use crate::domain::models::CyclePhase;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// Days immediately before ovulation that count as the fertile window.
const FERTILE_WINDOW_DAYS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct CycleDay {
    pub date: NaiveDate,
    pub day_number: u32,
    pub phase: CyclePhase,
    pub is_past: bool,
    pub is_today: bool,
    pub new_month: bool,
    pub angle_degrees: f64,
}

/// Projects a cycle onto its classified, angularly positioned day sequence.
///
/// Produces one entry per day from `cycle_start` through
/// `cycle_start + cycle_length_days - 1`. Day one sits at 0 degrees and each
/// subsequent day advances by an even slice of the circle, so a radial
/// renderer can place days directly by angle. Pure function of its inputs.
///
/// A `cycle_length_days` of zero yields an empty sequence. A period length
/// at or beyond the cycle length classifies every day as menstrual.
pub fn project(
    cycle_start: NaiveDate,
    cycle_length_days: u32,
    period_length_days: u32,
    as_of: NaiveDate,
) -> Vec<CycleDay> {
    if cycle_length_days == 0 {
        return Vec::new();
    }

    let slice_degrees = 360.0 / f64::from(cycle_length_days);
    let mut previous_month = None;
    let mut days = Vec::with_capacity(cycle_length_days as usize);

    for offset in 0..cycle_length_days {
        let date = cycle_start + Duration::days(i64::from(offset));
        let day_number = offset + 1;
        let new_month = previous_month != Some(date.month());
        previous_month = Some(date.month());

        days.push(CycleDay {
            date,
            day_number,
            phase: classify(day_number, cycle_length_days, period_length_days),
            is_past: date < as_of,
            is_today: date == as_of,
            new_month,
            angle_degrees: slice_degrees * f64::from(offset),
        });
    }

    days
}

/// Rolls a recorded cycle anchor forward by whole cycles so the returned
/// start date opens the cycle containing `as_of` (or the anchor itself when
/// `as_of` precedes it).
pub fn current_cycle_start(anchor: NaiveDate, cycle_length_days: u32, as_of: NaiveDate) -> NaiveDate {
    if cycle_length_days == 0 {
        return anchor;
    }
    let days_since = (as_of - anchor).num_days();
    if days_since <= 0 {
        return anchor;
    }
    let elapsed_cycles = days_since / i64::from(cycle_length_days);
    anchor + Duration::days(elapsed_cycles * i64::from(cycle_length_days))
}

/// Today's calendar date in the named IANA timezone, or `None` when the
/// timezone string does not parse.
pub fn local_today(timezone: &str) -> Option<NaiveDate> {
    let tz: Tz = timezone.parse().ok()?;
    Some(Utc::now().with_timezone(&tz).date_naive())
}

fn classify(day_number: u32, cycle_length_days: u32, period_length_days: u32) -> CyclePhase {
    let ovulation_day = cycle_length_days / 2;

    if day_number <= period_length_days {
        CyclePhase::Menstrual
    } else if day_number == ovulation_day {
        CyclePhase::Ovulation
    } else if day_number < ovulation_day && day_number + FERTILE_WINDOW_DAYS >= ovulation_day {
        CyclePhase::Fertile
    } else if day_number < ovulation_day {
        CyclePhase::Follicular
    } else {
        CyclePhase::Luteal
    }
}
