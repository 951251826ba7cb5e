use chrono::NaiveDateTime;

use crate::limits::*;
use crate::model::*;

use super::availability::merge_overlapping;
use super::EngineError;

/// Occupied intervals of the bookings that still hold their slot, sorted and merged.
/// `exclude` drops one booking, so a reschedule does not collide with itself.
pub(crate) fn occupied_spans(
    bookings: &[Booking],
    duration_minutes: u32,
    exclude: Option<BookingId>,
) -> Vec<Span> {
    if duration_minutes == 0 {
        return Vec::new();
    }
    let mut spans: Vec<Span> = bookings
        .iter()
        .filter(|b| b.status.occupies_slot() && Some(b.id) != exclude)
        .map(|b| b.span(duration_minutes))
        .collect();
    spans.sort_by_key(|s| s.start);
    merge_overlapping(&spans)
}

/// True if `candidate` overlaps any of the sorted, disjoint `occupied` spans.
pub(crate) fn overlaps_any(occupied: &[Span], candidate: &Span) -> bool {
    // Disjoint + sorted ⇒ ends are sorted too; skip everything ending at or before candidate.start.
    let first = occupied.partition_point(|s| s.end <= candidate.start);
    occupied
        .get(first)
        .is_some_and(|s| s.start < candidate.end)
}

pub(crate) fn validate_notes(notes: Option<&str>) -> Result<(), EngineError> {
    if notes.is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(EngineError::LimitExceeded("notes too long"));
    }
    Ok(())
}

pub(crate) fn validate_segment_count(segments: &[Segment]) -> Result<(), EngineError> {
    if segments.len() > MAX_SEGMENTS_PER_DAY {
        return Err(EngineError::LimitExceeded("too many segments in one day"));
    }
    Ok(())
}

/// Seconds are not part of a slot; normalise before comparing against the grid.
pub(crate) fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    TimeOfDay::from_naive_time(t.time()).on(t.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn booking(h: u32, m: u32, status: BookingStatus) -> Booking {
        let mut b = Booking::new(Ulid::new(), Ulid::new(), at(h, m), None, at(0, 0));
        b.status = status;
        b
    }

    #[test]
    fn occupied_spans_skip_released_statuses() {
        let bookings = vec![
            booking(9, 0, BookingStatus::Pending),
            booking(10, 0, BookingStatus::Cancelled),
            booking(11, 0, BookingStatus::Declined),
            booking(12, 0, BookingStatus::Completed),
            booking(13, 0, BookingStatus::Confirmed),
        ];
        let spans = occupied_spans(&bookings, 60, None);
        assert_eq!(
            spans,
            vec![Span::new(at(9, 0), at(10, 0)), Span::new(at(12, 0), at(14, 0))]
        );
    }

    #[test]
    fn occupied_spans_exclude_self() {
        let b = booking(9, 0, BookingStatus::Confirmed);
        let spans = occupied_spans(std::slice::from_ref(&b), 60, Some(b.id));
        assert!(spans.is_empty());
    }

    #[test]
    fn occupied_spans_sorted_regardless_of_input_order() {
        let bookings = vec![
            booking(15, 0, BookingStatus::Pending),
            booking(9, 0, BookingStatus::Pending),
        ];
        let spans = occupied_spans(&bookings, 30, None);
        assert_eq!(spans[0].start, at(9, 0));
        assert_eq!(spans[1].start, at(15, 0));
    }

    #[test]
    fn overlaps_any_half_open() {
        let occupied = vec![Span::new(at(10, 0), at(11, 0)), Span::new(at(14, 0), at(15, 0))];
        assert!(!overlaps_any(&occupied, &Span::new(at(9, 0), at(10, 0))));
        assert!(!overlaps_any(&occupied, &Span::new(at(11, 0), at(12, 0))));
        assert!(overlaps_any(&occupied, &Span::new(at(10, 59), at(11, 30))));
        assert!(overlaps_any(&occupied, &Span::new(at(13, 0), at(16, 0))));
        assert!(!overlaps_any(&occupied, &Span::new(at(12, 0), at(14, 0))));
        assert!(!overlaps_any(&[], &Span::new(at(12, 0), at(14, 0))));
    }

    #[test]
    fn overlaps_any_candidate_covering_everything() {
        let occupied = vec![Span::new(at(10, 0), at(11, 0))];
        assert!(overlaps_any(&occupied, &Span::new(at(0, 0), at(23, 0))));
    }

    #[test]
    fn notes_limit() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("bring towels")).is_ok());
        let long = "x".repeat(MAX_NOTES_LEN + 1);
        assert!(matches!(
            validate_notes(Some(&long)),
            Err(EngineError::LimitExceeded(_))
        ));
    }

    #[test]
    fn truncate_drops_seconds() {
        let t = at(9, 30) + chrono::Duration::seconds(42);
        assert_eq!(truncate_to_minute(t), at(9, 30));
    }
}
