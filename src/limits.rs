/// Segments allowed on a single weekday or override.
pub const MAX_SEGMENTS_PER_DAY: usize = 48;

/// Overrides stored per service.
pub const MAX_OVERRIDES_PER_SERVICE: usize = 1_000;

/// Free-text notes on a booking, in bytes.
pub const MAX_NOTES_LEN: usize = 2_000;

/// Widest date range accepted by range availability queries.
pub const MAX_QUERY_DAYS: i64 = 92;
