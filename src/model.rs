use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

pub type ServiceId = Ulid;
pub type BookingId = Ulid;
pub type OverrideId = Ulid;
pub type UserId = Ulid;

/// Minutes in a calendar day; also the largest valid `TimeOfDay`.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("segment [{start}, {end}) is empty or inverted")]
    EmptySegment { start: TimeOfDay, end: TimeOfDay },
    #[error("segment {index} starts before the previous segment")]
    Unsorted { index: usize },
    #[error("segment {index} overlaps the previous segment")]
    Overlapping { index: usize },
    #[error("weekly schedule needs 7 days, got {0}")]
    WrongDayCount(usize),
    #[error("invalid time of day: {0}")]
    InvalidTime(String),
}

// ── Time of day ──────────────────────────────────────────────────

/// Minutes since midnight in `0..=1440`. `24:00` is only meaningful as a segment end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY as u16);

    /// `None` unless `minute < 60` and the time is at most 24:00.
    pub fn checked_hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        hour.checked_mul(60)
            .and_then(|h| h.checked_add(minute))
            .and_then(Self::from_minutes)
    }

    /// # Panics
    ///
    /// Panics if the time is not a valid time of day; see [`TimeOfDay::checked_hm`].
    pub fn hm(hour: u32, minute: u32) -> Self {
        match Self::checked_hm(hour, minute) {
            Some(t) => t,
            None => panic!("invalid time of day {hour}:{minute:02}"),
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(Self(minutes as u16))
    }

    /// Seconds and sub-seconds are truncated.
    pub fn from_naive_time(t: NaiveTime) -> Self {
        Self((t.hour() * 60 + t.minute()) as u16)
    }

    pub fn minutes(self) -> u32 {
        self.0 as u32
    }

    /// Anchor this time on `date`. `24:00` lands on the following midnight.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + chrono::Duration::minutes(self.0 as i64)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::checked_hm(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> String {
        t.to_string()
    }
}

// ── Spans ────────────────────────────────────────────────────────

/// Half-open interval `[start, end)` on the local timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn starting_at(start: NaiveDateTime, duration_minutes: u32) -> Self {
        Self::new(start, start + chrono::Duration::minutes(duration_minutes as i64))
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

// ── Segments & schedules ─────────────────────────────────────────

/// A bookable time-of-day window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSegment")]
pub struct Segment {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Deserialize)]
struct RawSegment {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TryFrom<RawSegment> for Segment {
    type Error = ScheduleError;

    fn try_from(raw: RawSegment) -> Result<Self, Self::Error> {
        Segment::new(raw.start, raw.end)
    }
}

impl Segment {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, ScheduleError> {
        if start >= end {
            return Err(ScheduleError::EmptySegment { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn length_minutes(&self) -> u32 {
        self.end.minutes() - self.start.minutes()
    }

    pub fn on(&self, date: NaiveDate) -> Span {
        Span::new(self.start.on(date), self.end.on(date))
    }
}

/// Reject segment lists that are unsorted or overlapping. Touching segments are fine.
pub fn validate_segments(segments: &[Segment]) -> Result<(), ScheduleError> {
    for (i, pair) in segments.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start < prev.start {
            return Err(ScheduleError::Unsorted { index: i + 1 });
        }
        if next.start < prev.end {
            return Err(ScheduleError::Overlapping { index: i + 1 });
        }
    }
    Ok(())
}

/// Recurring hours: one ordered segment list per weekday, Monday first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWeeklySchedule")]
pub struct WeeklySchedule {
    days: [Vec<Segment>; 7],
}

#[derive(Deserialize)]
struct RawWeeklySchedule {
    days: Vec<Vec<Segment>>,
}

impl TryFrom<RawWeeklySchedule> for WeeklySchedule {
    type Error = ScheduleError;

    fn try_from(raw: RawWeeklySchedule) -> Result<Self, Self::Error> {
        let count = raw.days.len();
        let days: [Vec<Segment>; 7] = raw
            .days
            .try_into()
            .map_err(|_| ScheduleError::WrongDayCount(count))?;
        WeeklySchedule::new(days)
    }
}

impl WeeklySchedule {
    pub fn new(days: [Vec<Segment>; 7]) -> Result<Self, ScheduleError> {
        for day in &days {
            validate_segments(day)?;
        }
        Ok(Self { days })
    }

    /// Every day closed.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Replace one day's segments, validating them.
    pub fn with_day(mut self, weekday: Weekday, segments: Vec<Segment>) -> Result<Self, ScheduleError> {
        validate_segments(&segments)?;
        self.days[weekday.num_days_from_monday() as usize] = segments;
        Ok(self)
    }

    pub fn day(&self, weekday: Weekday) -> &[Segment] {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn days(&self) -> &[Vec<Segment>; 7] {
        &self.days
    }
}

/// Date-specific replacement of the weekly hours (holiday or custom hours).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleOverride")]
pub struct ScheduleOverride {
    pub id: OverrideId,
    pub service_id: ServiceId,
    pub date: NaiveDate,
    pub is_day_off: bool,
    /// Ignored when `is_day_off` is set.
    segments: Vec<Segment>,
}

#[derive(Deserialize)]
struct RawScheduleOverride {
    id: OverrideId,
    service_id: ServiceId,
    date: NaiveDate,
    is_day_off: bool,
    #[serde(default)]
    segments: Vec<Segment>,
}

impl TryFrom<RawScheduleOverride> for ScheduleOverride {
    type Error = ScheduleError;

    fn try_from(raw: RawScheduleOverride) -> Result<Self, Self::Error> {
        validate_segments(&raw.segments)?;
        Ok(Self {
            id: raw.id,
            service_id: raw.service_id,
            date: raw.date,
            is_day_off: raw.is_day_off,
            segments: raw.segments,
        })
    }
}

impl ScheduleOverride {
    pub fn new(
        service_id: ServiceId,
        date: NaiveDate,
        is_day_off: bool,
        segments: Vec<Segment>,
    ) -> Result<Self, ScheduleError> {
        validate_segments(&segments)?;
        Ok(Self {
            id: Ulid::new(),
            service_id,
            date,
            is_day_off,
            segments,
        })
    }

    pub fn day_off(service_id: ServiceId, date: NaiveDate) -> Self {
        Self {
            id: Ulid::new(),
            service_id,
            date,
            is_day_off: true,
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Weekly hours plus overrides, loaded once per computation and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub weekly: WeeklySchedule,
    pub overrides: Vec<ScheduleOverride>,
}

impl ScheduleSnapshot {
    pub fn new(weekly: WeeklySchedule, overrides: Vec<ScheduleOverride>) -> Self {
        Self { weekly, overrides }
    }

    pub fn override_for(&self, date: NaiveDate) -> Option<&ScheduleOverride> {
        self.overrides.iter().find(|o| o.date == date)
    }
}

// ── Services & bookings ──────────────────────────────────────────

/// Read-only view of a service as exposed by the service lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub owner_id: UserId,
    pub duration_minutes: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Declined,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Declined => "declined",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Declined | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }

    /// Whether a booking in this status still holds its interval.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, BookingStatus::Declined | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub service_id: ServiceId,
    pub customer_id: UserId,
    pub start: NaiveDateTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn new(
        service_id: ServiceId,
        customer_id: UserId,
        start: NaiveDateTime,
        notes: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Ulid::new(),
            service_id,
            customer_id,
            start,
            status: BookingStatus::Pending,
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn weekday(&self) -> Weekday {
        self.start.weekday()
    }

    /// Occupied interval `[start, start + duration)`.
    pub fn span(&self, duration_minutes: u32) -> Span {
        Span::starting_at(self.start, duration_minutes)
    }
}

/// Who is invoking an operation. `System` is the scheduled completion sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(UserId),
    System,
}

/// Post-commit lifecycle events, as published by the broadcast notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    Created { booking: Booking },
    Confirmed { booking: Booking },
    Declined { booking: Booking },
    Cancelled { booking: Booking, by_provider: bool },
    Rescheduled { booking: Booking, old_start: NaiveDateTime },
}

impl BookingEvent {
    pub fn booking(&self) -> &Booking {
        match self {
            BookingEvent::Created { booking }
            | BookingEvent::Confirmed { booking }
            | BookingEvent::Declined { booking }
            | BookingEvent::Cancelled { booking, .. }
            | BookingEvent::Rescheduled { booking, .. } => booking,
        }
    }
}
