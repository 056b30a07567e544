//! Work pattern models.
//!
//! A [`WorkPattern`] is a named, rotating schedule made of one or more
//! [`WorkWeek`]s, each holding exactly seven [`WorkDay`]s (1 = Monday through
//! 7 = Sunday).

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

numeric_id!(
    /// Identifier of a stored work pattern.
    PatternId
);

/// The kind of a day within a work week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkDayType {
    /// A working day with hours and a leave-day fraction.
    Working,
    /// A day the employee does not work, outside the weekend.
    NonWorking,
    /// A weekend day.
    Weekend,
}

impl std::fmt::Display for WorkDayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkDayType::Working => write!(f, "Working"),
            WorkDayType::NonWorking => write!(f, "Non-working"),
            WorkDayType::Weekend => write!(f, "Weekend"),
        }
    }
}

/// One day of a [`WorkWeek`].
///
/// Time fields are only meaningful (and only allowed) on working days.
///
/// # Example
///
/// ```
/// use leave_engine::models::WorkDay;
/// use chrono::NaiveTime;
/// use rust_decimal::Decimal;
///
/// let monday = WorkDay::working(
///     1,
///     NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///     NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
///     Decimal::ONE,
///     Decimal::ONE,
/// );
/// assert_eq!(monday.working_hours(), Decimal::new(8, 0));
/// assert_eq!(monday.leave_days(), Decimal::ONE);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDay {
    /// ISO weekday number, 1 = Monday .. 7 = Sunday.
    pub day_of_week: u32,
    /// Whether the day is worked.
    #[serde(rename = "type")]
    pub day_type: WorkDayType,
    /// Start of the working hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_from: Option<NaiveTime>,
    /// End of the working hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to: Option<NaiveTime>,
    /// Unpaid break length in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_hours: Option<Decimal>,
    /// How much of a standard day this day consumes when taken as leave.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_days: Option<Decimal>,
}

impl WorkDay {
    /// Creates a working day.
    pub fn working(
        day_of_week: u32,
        time_from: NaiveTime,
        time_to: NaiveTime,
        break_hours: Decimal,
        leave_days: Decimal,
    ) -> Self {
        Self {
            day_of_week,
            day_type: WorkDayType::Working,
            time_from: Some(time_from),
            time_to: Some(time_to),
            break_hours: Some(break_hours),
            leave_days: Some(leave_days),
        }
    }

    /// Creates a non-working day.
    pub fn non_working(day_of_week: u32) -> Self {
        Self::without_hours(day_of_week, WorkDayType::NonWorking)
    }

    /// Creates a weekend day.
    pub fn weekend(day_of_week: u32) -> Self {
        Self::without_hours(day_of_week, WorkDayType::Weekend)
    }

    fn without_hours(day_of_week: u32, day_type: WorkDayType) -> Self {
        Self {
            day_of_week,
            day_type,
            time_from: None,
            time_to: None,
            break_hours: None,
            leave_days: None,
        }
    }

    /// Returns true if this is a working day.
    pub fn is_working_day(&self) -> bool {
        self.day_type == WorkDayType::Working
    }

    /// The leave-day fraction of this day; zero for anything but working days.
    pub fn leave_days(&self) -> Decimal {
        if self.is_working_day() {
            self.leave_days.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }

    /// Worked hours: `time_to - time_from - break_hours`, zero for days off.
    pub fn working_hours(&self) -> Decimal {
        match (self.day_type, self.time_from, self.time_to) {
            (WorkDayType::Working, Some(from), Some(to)) => {
                let minutes = (to - from).num_minutes();
                let hours = Decimal::new(minutes, 0) / Decimal::new(60, 0);
                hours - self.break_hours.unwrap_or(Decimal::ZERO)
            }
            _ => Decimal::ZERO,
        }
    }
}

/// One week of a work pattern's rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkWeek {
    /// Position of the week within the rotation, starting at 1.
    pub number: u32,
    /// The seven days of the week.
    pub days: Vec<WorkDay>,
}

impl WorkWeek {
    /// Returns the day for the given ISO weekday number.
    pub fn day(&self, day_of_week: u32) -> Option<&WorkDay> {
        self.days.iter().find(|d| d.day_of_week == day_of_week)
    }

    /// Total worked hours over the week.
    pub fn working_hours(&self) -> Decimal {
        self.days.iter().map(WorkDay::working_hours).sum()
    }
}

/// A stored work pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPattern {
    /// Store-assigned identifier.
    pub id: PatternId,
    /// Unique, human-readable label.
    pub label: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Whether the pattern may be assigned.
    pub is_active: bool,
    /// Whether this is the organisation's default pattern.
    pub is_default: bool,
    /// Display rank; new patterns get `max + 1`.
    pub weight: u32,
    /// The weeks of the rotation, in order.
    #[serde(default)]
    pub weeks: Vec<WorkWeek>,
}

impl WorkPattern {
    /// Number of weeks in the rotation.
    pub fn number_of_weeks(&self) -> usize {
        self.weeks.len()
    }

    /// Total worked hours over one full rotation.
    ///
    /// # Example
    ///
    /// ```
    /// use leave_engine::models::{PatternId, WorkDay, WorkPattern, WorkWeek};
    /// use chrono::NaiveTime;
    /// use rust_decimal::Decimal;
    ///
    /// let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    /// let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
    /// let mut days: Vec<WorkDay> = (1..=5)
    ///     .map(|d| WorkDay::working(d, nine, five, Decimal::ZERO, Decimal::ONE))
    ///     .collect();
    /// days.push(WorkDay::weekend(6));
    /// days.push(WorkDay::weekend(7));
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
    /// assert_eq!(pattern.number_of_hours(), Decimal::new(40, 0));
    /// ```
    pub fn number_of_hours(&self) -> Decimal {
        self.weeks.iter().map(WorkWeek::working_hours).sum()
    }
}

/// Input for creating a work pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPatternDraft {
    /// Unique, human-readable label.
    pub label: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Whether the pattern may be assigned.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether this becomes the default pattern.
    #[serde(default)]
    pub is_default: bool,
    /// The weeks of the rotation, in order.
    #[serde(default)]
    pub weeks: Vec<WorkWeek>,
}

fn default_true() -> bool {
    true
}

impl WorkPatternDraft {
    /// Creates an active, non-default draft with no weeks.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            is_active: true,
            is_default: false,
            weeks: Vec::new(),
        }
    }
}

/// A partial update of a work pattern. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkPatternUpdate {
    /// New label.
    #[serde(default)]
    pub label: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// New default flag.
    #[serde(default)]
    pub is_default: Option<bool>,
    /// Replacement weeks.
    #[serde(default)]
    pub weeks: Option<Vec<WorkWeek>>,
}
