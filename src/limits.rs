//! Hard caps. Every limit is enforced at the engine boundary and
//! surfaces as `EngineError::LimitExceeded`.

/// Locations per tenant.
pub const MAX_LOCATIONS_PER_TENANT: usize = 10_000;

/// Rooms per tenant (across all locations).
pub const MAX_ROOMS_PER_TENANT: usize = 100_000;

/// Reservations held by a single room, any status.
pub const MAX_RESERVATIONS_PER_ROOM: usize = 100_000;

/// Feedback entries held by a single room.
pub const MAX_FEEDBACK_PER_ROOM: usize = 100_000;

/// Location and room names.
pub const MAX_NAME_LEN: usize = 256;

/// Location street addresses.
pub const MAX_ADDRESS_LEN: usize = 1024;

/// Reservation purpose text.
pub const MAX_PURPOSE_LEN: usize = 1024;

/// Feedback comment text.
pub const MAX_COMMENT_LEN: usize = 4096;

/// Attendee count on a single reservation.
pub const MAX_ATTENDEES: u32 = 100_000;

/// Database names arriving from the wire (they become WAL filenames).
pub const MAX_TENANT_NAME_LEN: usize = 256;

/// Concurrently loaded tenants per process.
pub const MAX_TENANTS: usize = 64;

/// Timestamps must be non-negative: the epoch is the floor.
pub const MIN_VALID_TIMESTAMP_MS: i64 = 0;

/// 2100-01-01T00:00:00Z. Anything later is a typo.
pub const MAX_VALID_TIMESTAMP_MS: i64 = 4_102_444_800_000;

/// One year. No reservation spans longer.
pub const MAX_SPAN_DURATION_MS: i64 = 31_536_000_000;

/// Availability queries wider than this are refused rather than scanned.
pub const MAX_QUERY_WINDOW_MS: i64 = 31_536_000_000;
