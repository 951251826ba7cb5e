use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use crate::model::*;

use super::conflict::overlaps_any;

// ── Day windows ──────────────────────────────────────────────────

/// Bookable windows for one date.
///
/// OVERRIDE: an override dated `date` fully replaces the weekly hours; a
/// day-off override, or one with no segments, closes the day.
/// Otherwise the weekly segments for `weekday` apply (possibly none).
pub fn resolve_day_windows<'a>(
    weekly: &'a WeeklySchedule,
    schedule_override: Option<&'a ScheduleOverride>,
    weekday: Weekday,
    date: NaiveDate,
) -> &'a [Segment] {
    match schedule_override.filter(|o| o.date == date) {
        Some(o) if o.is_day_off => &[],
        Some(o) => o.segments(),
        None => weekly.day(weekday),
    }
}

pub fn day_windows(snapshot: &ScheduleSnapshot, date: NaiveDate) -> &[Segment] {
    resolve_day_windows(
        &snapshot.weekly,
        snapshot.override_for(date),
        date.weekday(),
        date,
    )
}

// ── Slot enumeration ─────────────────────────────────────────────

/// Slot starts over a list of segments, stepping by a fixed duration.
/// Cloning restarts from the clone point; slots never straddle segments.
#[derive(Debug, Clone)]
pub struct SlotStarts<'a> {
    segments: &'a [Segment],
    duration: u32,
    index: usize,
    cursor: Option<u32>,
}

impl Iterator for SlotStarts<'_> {
    type Item = TimeOfDay;

    fn next(&mut self) -> Option<TimeOfDay> {
        if self.duration == 0 {
            return None;
        }
        while let Some(seg) = self.segments.get(self.index) {
            let cursor = self.cursor.unwrap_or_else(|| seg.start.minutes());
            if seg.end.minutes() - cursor >= self.duration {
                self.cursor = Some(cursor + self.duration);
                return TimeOfDay::from_minutes(cursor);
            }
            self.index += 1;
            self.cursor = None;
        }
        None
    }
}

pub fn enumerate_slot_starts(segments: &[Segment], duration_minutes: u32) -> SlotStarts<'_> {
    SlotStarts {
        segments,
        duration: duration_minutes,
        index: 0,
        cursor: None,
    }
}

// ── Queries ──────────────────────────────────────────────────────

/// Slot starts on `date` that are not in the past and do not overlap `occupied`.
///
/// `occupied` must be sorted and merged (see `conflict::occupied_spans`).
pub fn available_slots(
    snapshot: &ScheduleSnapshot,
    date: NaiveDate,
    duration_minutes: u32,
    occupied: &[Span],
    now: NaiveDateTime,
) -> Vec<TimeOfDay> {
    enumerate_slot_starts(day_windows(snapshot, date), duration_minutes)
        .filter(|start| {
            let candidate = Span::starting_at(start.on(date), duration_minutes);
            candidate.start >= now && !overlaps_any(occupied, &candidate)
        })
        .collect()
}

/// Point check for `[start, start + duration)`.
///
/// The start must sit on the duration grid of the segment containing it,
/// so this agrees with `available_slots` for every instant of the day.
pub fn slot_is_available(
    snapshot: &ScheduleSnapshot,
    start: NaiveDateTime,
    duration_minutes: u32,
    occupied: &[Span],
    now: NaiveDateTime,
) -> bool {
    if duration_minutes == 0 || start < now {
        return false;
    }
    let date = start.date();
    let candidate = Span::starting_at(start, duration_minutes);
    let step = i64::from(duration_minutes) * 60;
    let on_grid = day_windows(snapshot, date).iter().any(|seg| {
        let window = seg.on(date);
        window.contains_span(&candidate) && (start - window.start).num_seconds() % step == 0
    });
    on_grid && !overlaps_any(occupied, &candidate)
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}
