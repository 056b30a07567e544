//! Leave-day calculation for rotating work patterns.
//!
//! A work pattern with N weeks repeats every N weeks from the date it was
//! assigned. This module finds which pattern week a calendar date falls in
//! and how much of a standard leave day that date is worth.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::WorkPattern;

/// Where week boundaries of the rotation fall.
///
/// In both modes the reference start date is day 0 of week 0.
///
/// # Example
///
/// ```
/// use leave_engine::calculation::RotationAnchor;
///
/// assert_eq!(RotationAnchor::default(), RotationAnchor::CalendarWeek);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationAnchor {
    /// Weeks turn over on Mondays. The (possibly partial) calendar week
    /// containing the reference start is week 0.
    #[default]
    CalendarWeek,
    /// Weeks turn over every 7 days counted from the reference start.
    ReferenceDate,
}

/// Returns the zero-based index of the pattern week `target` falls in.
///
/// # Arguments
///
/// * `number_of_weeks` - Weeks in the rotation; must be at least 1
/// * `target` - The date to place in the rotation
/// * `reference_start` - The date the pattern was assigned from
/// * `anchor` - Where week boundaries fall
///
/// # Example
///
/// ```
/// use leave_engine::calculation::{week_index_for_date, RotationAnchor};
/// use chrono::NaiveDate;
///
/// // 2016-07-31 is a Sunday, so the next day starts a new calendar week.
/// let start = NaiveDate::from_ymd_opt(2016, 7, 31).unwrap();
/// let monday = NaiveDate::from_ymd_opt(2016, 8, 1).unwrap();
///
/// assert_eq!(week_index_for_date(2, monday, start, RotationAnchor::CalendarWeek), 1);
/// assert_eq!(week_index_for_date(2, monday, start, RotationAnchor::ReferenceDate), 0);
/// ```
pub fn week_index_for_date(
    number_of_weeks: usize,
    target: NaiveDate,
    reference_start: NaiveDate,
    anchor: RotationAnchor,
) -> usize {
    if number_of_weeks == 0 {
        return 0;
    }

    let rotation_start = match anchor {
        RotationAnchor::CalendarWeek => {
            let offset = i64::from(reference_start.weekday().num_days_from_monday());
            reference_start
                .checked_sub_signed(chrono::Duration::days(offset))
                .unwrap_or(reference_start)
        }
        RotationAnchor::ReferenceDate => reference_start,
    };

    let weeks_elapsed = (target - rotation_start).num_days().div_euclid(7);
    weeks_elapsed.rem_euclid(number_of_weeks as i64) as usize
}

/// Returns how much of a leave day `target` represents under `pattern`.
///
/// # Arguments
///
/// * `pattern` - The work pattern assigned to the employee
/// * `target` - The date to evaluate
/// * `reference_start` - First day the pattern applies (inclusive)
/// * `reference_end` - Last day the pattern applies (inclusive)
/// * `anchor` - Where week boundaries of the rotation fall
///
/// # Returns
///
/// - Zero if `target` is outside `[reference_start, reference_end]`
/// - Zero if the pattern has no weeks
/// - The day's leave fraction if the matching day is a working day
/// - Zero for non-working and weekend days
///
/// # Example
///
/// ```
/// use leave_engine::calculation::{leave_days_for_date, RotationAnchor};
/// use leave_engine::models::{PatternId, WorkDay, WorkPattern, WorkWeek};
/// use chrono::{NaiveDate, NaiveTime};
/// use rust_decimal::Decimal;
///
/// let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
/// let six = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
/// let mut days: Vec<WorkDay> = (1..=5)
///     .map(|d| WorkDay::working(d, nine, six, Decimal::ONE, Decimal::ONE))
///     .collect();
/// days.extend([WorkDay::weekend(6), WorkDay::weekend(7)]);
///
/// let pattern = WorkPattern {
///     id: PatternId(1),
///     label: "Standard".to_string(),
///     description: String::new(),
///     is_active: true,
///     is_default: true,
///     weight: 1,
///     weeks: vec![WorkWeek { number: 1, days }],
/// };
///
/// let start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2016, 12, 31).unwrap();
/// let friday = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
/// let saturday = NaiveDate::from_ymd_opt(2016, 2, 13).unwrap();
///
/// assert_eq!(leave_days_for_date(&pattern, friday, start, end, RotationAnchor::CalendarWeek), Decimal::ONE);
/// assert_eq!(leave_days_for_date(&pattern, saturday, start, end, RotationAnchor::CalendarWeek), Decimal::ZERO);
/// ```
pub fn leave_days_for_date(
    pattern: &WorkPattern,
    target: NaiveDate,
    reference_start: NaiveDate,
    reference_end: NaiveDate,
    anchor: RotationAnchor,
) -> Decimal {
    if target < reference_start || target > reference_end || pattern.weeks.is_empty() {
        return Decimal::ZERO;
    }

    let index = week_index_for_date(pattern.weeks.len(), target, reference_start, anchor);
    pattern.weeks[index]
        .day(target.weekday().number_from_monday())
        .map(|day| day.leave_days())
        .unwrap_or(Decimal::ZERO)
}

/// Sums [`leave_days_for_date`] over `from..=to`.
///
/// This is what a leave request covering that range consumes. An empty or
/// inverted range yields zero.
pub fn leave_days_for_period(
    pattern: &WorkPattern,
    from: NaiveDate,
    to: NaiveDate,
    reference_start: NaiveDate,
    reference_end: NaiveDate,
    anchor: RotationAnchor,
) -> Decimal {
    from.iter_days()
        .take_while(|date| *date <= to)
        .map(|date| leave_days_for_date(pattern, date, reference_start, reference_end, anchor))
        .sum()
}
