//! Expands a recurrence rule into the dates it falls on within a month.
//!
//! The anchor is the first due date. Nothing occurs before it; it fixes the
//! day of month, the weekday for weekly work and the quarter/year alignment.

use chrono::{Datelike, NaiveDate, Weekday};
use db::models::recurring_task::RecurrenceType;

use super::period::Month;

pub fn occurrence_dates(
    recurrence: RecurrenceType,
    anchor: Option<NaiveDate>,
    month: Month,
) -> Vec<NaiveDate> {
    if anchor.is_some_and(|anchor| month < Month::from_date(anchor)) {
        return Vec::new();
    }
    let not_before_anchor = |day: &NaiveDate| anchor.is_none_or(|anchor| *day >= anchor);

    match recurrence {
        RecurrenceType::Daily => month
            .days()
            .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
            .filter(not_before_anchor)
            .collect(),
        RecurrenceType::Weekly => {
            let weekday = anchor.map_or(Weekday::Mon, |anchor| anchor.weekday());
            month
                .days()
                .filter(|day| day.weekday() == weekday)
                .filter(not_before_anchor)
                .collect()
        }
        RecurrenceType::Monthly => vec![due_date(anchor, month)],
        RecurrenceType::Quarterly => {
            // Default alignment: calendar quarters (Jan / Apr / Jul / Oct)
            let anchor_ordinal = anchor.map_or(i64::from(month.year()) * 12, |anchor| {
                Month::from_date(anchor).ordinal()
            });
            if (month.ordinal() - anchor_ordinal).rem_euclid(3) == 0 {
                vec![due_date(anchor, month)]
            } else {
                Vec::new()
            }
        }
        RecurrenceType::Annually => {
            let due_month = anchor.map_or(1, |anchor| anchor.month());
            if month.month() == due_month {
                vec![due_date(anchor, month)]
            } else {
                Vec::new()
            }
        }
        RecurrenceType::Once => match anchor {
            Some(anchor) if Month::from_date(anchor) == month => vec![anchor],
            _ => Vec::new(),
        },
    }
}

pub fn occurrences_in_month(
    recurrence: RecurrenceType,
    anchor: Option<NaiveDate>,
    month: Month,
) -> u32 {
    occurrence_dates(recurrence, anchor, month).len() as u32
}

/// Anchor day clamped to the month, or the last day of the month without an anchor
fn due_date(anchor: Option<NaiveDate>, month: Month) -> NaiveDate {
    match anchor {
        Some(anchor) => month.clamp_day(anchor.day()),
        None => month.last_day(),
    }
}
