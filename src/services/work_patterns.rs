//! Work pattern lifecycle and leave-day lookups.
//!
//! Two invariants hold across every write made here:
//! - once any pattern exists, exactly one of them is the default
//! - at least one pattern is active
//!
//! Both are enforced inside a single store transaction per operation.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calculation::{self, RotationAnchor};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    PatternId, WorkDay, WorkPattern, WorkPatternDraft, WorkPatternUpdate, WorkWeek,
};
use crate::store::LeaveStore;

/// Read model of a single pattern with its full schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    /// Identifier of the pattern.
    pub id: PatternId,
    /// Unique label.
    pub label: String,
    /// Free-text description.
    pub description: String,
    /// Whether the pattern may be assigned.
    pub is_active: bool,
    /// Whether this is the default pattern.
    pub is_default: bool,
    /// The weeks of the rotation, in order.
    pub weeks: Vec<WorkWeek>,
}

/// One row of the week-count and hours report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternWeeksAndHours {
    /// Identifier of the pattern.
    pub id: PatternId,
    /// Unique label.
    pub label: String,
    /// Weeks in the rotation.
    pub number_of_weeks: usize,
    /// Worked hours over one full rotation.
    pub number_of_hours: Decimal,
}

/// The work pattern calendar.
///
/// # Example
///
/// ```
/// use leave_engine::calculation::RotationAnchor;
/// use leave_engine::models::WorkPatternDraft;
/// use leave_engine::services::WorkPatternCalendar;
/// use leave_engine::store::InMemoryStore;
///
/// let mut store = InMemoryStore::new();
/// let mut calendar = WorkPatternCalendar::new(&mut store, RotationAnchor::CalendarWeek);
///
/// let first = calendar.create(WorkPatternDraft::new("Standard")).unwrap();
/// let second = calendar.create(WorkPatternDraft::new("Part time")).unwrap();
///
/// // The first pattern in an empty store becomes the default.
/// assert!(first.is_default);
/// assert!(!second.is_default);
/// assert_eq!(second.weight, first.weight + 1);
/// ```
pub struct WorkPatternCalendar<'a, S: LeaveStore> {
    store: &'a mut S,
    anchor: RotationAnchor,
}

impl<'a, S: LeaveStore> WorkPatternCalendar<'a, S> {
    /// Creates a calendar over `store`.
    pub fn new(store: &'a mut S, anchor: RotationAnchor) -> Self {
        Self { store, anchor }
    }

    /// Creates a work pattern.
    ///
    /// # Behavior
    ///
    /// - The label must be non-empty and unique
    /// - Weeks are validated and renumbered 1..N in the given order
    /// - The new pattern gets `max(existing weights) + 1`
    /// - A default draft takes the default flag from every other pattern
    /// - The first pattern created becomes the default even if not flagged
    pub fn create(&mut self, draft: WorkPatternDraft) -> EngineResult<WorkPattern> {
        self.store.transaction(|store| create_pattern(store, draft))
    }

    /// Applies a partial update to a work pattern.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the pattern does not exist
    /// - `Validation` on a bad or duplicate label, invalid weeks, an attempt
    ///   to deactivate the last active pattern, an inactive default, or an
    ///   attempt to clear the default flag directly
    pub fn update(&mut self, id: PatternId, changes: WorkPatternUpdate) -> EngineResult<WorkPattern> {
        self.store
            .transaction(|store| update_pattern(store, id, changes))
    }

    /// Returns the full schedule of a pattern, or `None` if it does not exist.
    pub fn pattern_summary(&self, id: PatternId) -> EngineResult<Option<PatternSummary>> {
        let Some(pattern) = self.store.load_work_pattern(id)? else {
            return Ok(None);
        };
        let weeks = self.store.load_weeks_and_days(id)?;

        Ok(Some(PatternSummary {
            id: pattern.id,
            label: pattern.label,
            description: pattern.description,
            is_active: pattern.is_active,
            is_default: pattern.is_default,
            weeks,
        }))
    }

    /// Lists, for every pattern, its number of weeks and worked hours.
    pub fn distinct_week_counts_and_hours(&self) -> EngineResult<Vec<PatternWeeksAndHours>> {
        Ok(self
            .store
            .load_work_patterns()?
            .into_iter()
            .map(|pattern| PatternWeeksAndHours {
                id: pattern.id,
                number_of_weeks: pattern.number_of_weeks(),
                number_of_hours: pattern.number_of_hours(),
                label: pattern.label,
            })
            .collect())
    }

    /// Returns the default pattern, if any pattern exists.
    pub fn default_pattern(&self) -> EngineResult<Option<WorkPattern>> {
        Ok(self
            .store
            .load_work_patterns()?
            .into_iter()
            .find(|p| p.is_default))
    }

    /// The leave-day fraction of `target` under the stored pattern `id`.
    ///
    /// See [`calculation::leave_days_for_date`] for the rules.
    pub fn leave_days_for_date(
        &self,
        id: PatternId,
        target: NaiveDate,
        reference_start: NaiveDate,
        reference_end: NaiveDate,
    ) -> EngineResult<Decimal> {
        let pattern = self.load_schedule(id)?;
        let days = calculation::leave_days_for_date(
            &pattern,
            target,
            reference_start,
            reference_end,
            self.anchor,
        );
        debug!(pattern_id = %id, date = %target, leave_days = %days, "Computed leave days for date");
        Ok(days)
    }

    /// Total leave days consumed by `from..=to` under the stored pattern `id`.
    pub fn leave_days_for_period(
        &self,
        id: PatternId,
        from: NaiveDate,
        to: NaiveDate,
        reference_start: NaiveDate,
        reference_end: NaiveDate,
    ) -> EngineResult<Decimal> {
        let pattern = self.load_schedule(id)?;
        let days = calculation::leave_days_for_period(
            &pattern,
            from,
            to,
            reference_start,
            reference_end,
            self.anchor,
        );
        debug!(pattern_id = %id, from = %from, to = %to, leave_days = %days, "Computed leave days for period");
        Ok(days)
    }

    fn load_schedule(&self, id: PatternId) -> EngineResult<WorkPattern> {
        let mut pattern = self
            .store
            .load_work_pattern(id)?
            .ok_or_else(|| EngineError::not_found("Work pattern", id))?;
        pattern.weeks = self.store.load_weeks_and_days(id)?;
        Ok(pattern)
    }
}

fn create_pattern<S: LeaveStore>(store: &mut S, draft: WorkPatternDraft) -> EngineResult<WorkPattern> {
    let label = validate_label(&draft.label)?;
    let weeks = validate_weeks(draft.weeks)?;
    let existing = store.load_work_patterns()?;

    if existing.iter().any(|p| p.label == label) {
        return Err(EngineError::validation(
            "label",
            format!("a work pattern labelled '{}' already exists", label),
        ));
    }
    if !draft.is_active && !existing.iter().any(|p| p.is_active) {
        return Err(EngineError::validation(
            "is_active",
            "at least one work pattern must be active",
        ));
    }

    let is_default = draft.is_default || existing.is_empty();
    if is_default && !draft.is_active {
        return Err(EngineError::validation(
            "is_default",
            "the default work pattern must be active",
        ));
    }

    let id = store.next_pattern_id()?;
    if is_default {
        clear_default(store, &existing, id)?;
    }

    let pattern = WorkPattern {
        id,
        label,
        description: draft.description,
        is_active: draft.is_active,
        is_default,
        weight: existing.iter().map(|p| p.weight).max().unwrap_or(0) + 1,
        weeks,
    };
    store.save_work_pattern(pattern.clone())?;

    info!(
        pattern_id = %pattern.id,
        label = %pattern.label,
        weeks = pattern.number_of_weeks(),
        is_default = pattern.is_default,
        "Created work pattern"
    );
    Ok(pattern)
}

fn update_pattern<S: LeaveStore>(
    store: &mut S,
    id: PatternId,
    changes: WorkPatternUpdate,
) -> EngineResult<WorkPattern> {
    let existing = store.load_work_patterns()?;
    let mut pattern = existing
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| EngineError::not_found("Work pattern", id))?;
    let others: Vec<&WorkPattern> = existing.iter().filter(|p| p.id != id).collect();

    if let Some(label) = changes.label {
        let label = validate_label(&label)?;
        if others.iter().any(|p| p.label == label) {
            return Err(EngineError::validation(
                "label",
                format!("a work pattern labelled '{}' already exists", label),
            ));
        }
        pattern.label = label;
    }
    if let Some(description) = changes.description {
        pattern.description = description;
    }
    if let Some(weeks) = changes.weeks {
        pattern.weeks = validate_weeks(weeks)?;
    }

    let was_default = pattern.is_default;
    if let Some(is_active) = changes.is_active {
        if !is_active && pattern.is_active && !others.iter().any(|p| p.is_active) {
            return Err(EngineError::validation(
                "is_active",
                "the last active work pattern cannot be deactivated",
            ));
        }
        pattern.is_active = is_active;
    }
    match changes.is_default {
        Some(true) => pattern.is_default = true,
        Some(false) if was_default => {
            return Err(EngineError::validation(
                "is_default",
                "make another work pattern the default instead",
            ));
        }
        _ => {}
    }

    if pattern.is_default && !pattern.is_active {
        if changes.is_default == Some(true) {
            return Err(EngineError::validation(
                "is_default",
                "the default work pattern must be active",
            ));
        }
        // Deactivating the default hands the flag to the next active pattern.
        let successor = others
            .iter()
            .find(|p| p.is_active)
            .map(|p| (*p).clone())
            .ok_or_else(|| {
                EngineError::validation("is_active", "at least one work pattern must be active")
            })?;
        let successor_id = successor.id;
        pattern.is_default = false;
        store.save_work_pattern(WorkPattern {
            is_default: true,
            ..successor
        })?;
        info!(from = %id, to = %successor_id, "Moved default work pattern");
    } else if pattern.is_default && !was_default {
        clear_default(store, &existing, id)?;
    }

    store.save_work_pattern(pattern.clone())?;
    info!(pattern_id = %id, label = %pattern.label, "Updated work pattern");
    Ok(pattern)
}

fn clear_default<S: LeaveStore>(
    store: &mut S,
    patterns: &[WorkPattern],
    keep: PatternId,
) -> EngineResult<()> {
    for pattern in patterns.iter().filter(|p| p.is_default && p.id != keep) {
        store.save_work_pattern(WorkPattern {
            is_default: false,
            ..pattern.clone()
        })?;
        info!(pattern_id = %pattern.id, new_default = %keep, "Cleared default flag");
    }
    Ok(())
}

fn validate_label(label: &str) -> EngineResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(EngineError::validation("label", "must not be empty"));
    }
    Ok(label.to_string())
}

/// Checks every week and renumbers them 1..N in the given order.
fn validate_weeks(weeks: Vec<WorkWeek>) -> EngineResult<Vec<WorkWeek>> {
    weeks
        .into_iter()
        .enumerate()
        .map(|(index, week)| {
            let field = format!("weeks[{}]", index);
            if week.days.len() != 7 {
                return Err(EngineError::validation(
                    format!("{}.days", field),
                    format!("a week needs exactly 7 days, got {}", week.days.len()),
                ));
            }

            let mut seen = HashSet::new();
            for (day_index, day) in week.days.iter().enumerate() {
                let day_field = format!("{}.days[{}]", field, day_index);
                if !(1..=7).contains(&day.day_of_week) {
                    return Err(EngineError::validation(
                        format!("{}.day_of_week", day_field),
                        "must be between 1 (Monday) and 7 (Sunday)",
                    ));
                }
                if !seen.insert(day.day_of_week) {
                    return Err(EngineError::validation(
                        format!("{}.day_of_week", day_field),
                        format!("day {} appears more than once", day.day_of_week),
                    ));
                }
                validate_day(day, &day_field)?;
            }

            let mut days = week.days;
            days.sort_by_key(|d| d.day_of_week);
            Ok(WorkWeek {
                number: index as u32 + 1,
                days,
            })
        })
        .collect()
}

fn validate_day(day: &WorkDay, field: &str) -> EngineResult<()> {
    if !day.is_working_day() {
        let has_hours = day.time_from.is_some()
            || day.time_to.is_some()
            || day.break_hours.is_some()
            || day.leave_days.is_some();
        if has_hours {
            return Err(EngineError::validation(
                format!("{}.type", field),
                format!("a {} day cannot have working hours", day.day_type),
            ));
        }
        return Ok(());
    }

    let (Some(from), Some(to)) = (day.time_from, day.time_to) else {
        return Err(EngineError::validation(
            format!("{}.time_from", field),
            "a working day needs both time_from and time_to",
        ));
    };
    if from >= to {
        return Err(EngineError::validation(
            format!("{}.time_to", field),
            "must be later than time_from",
        ));
    }

    let break_hours = day.break_hours.unwrap_or(Decimal::ZERO);
    let duration = Decimal::new((to - from).num_minutes(), 0) / Decimal::new(60, 0);
    if break_hours < Decimal::ZERO || break_hours >= duration {
        return Err(EngineError::validation(
            format!("{}.break_hours", field),
            "must be at least zero and shorter than the working hours",
        ));
    }

    match day.leave_days {
        Some(leave_days) if leave_days > Decimal::ZERO => Ok(()),
        _ => Err(EngineError::validation(
            format!("{}.leave_days", field),
            "a working day needs a positive leave-day fraction",
        )),
    }
}
