use ulid::Ulid;

use crate::model::*;

// ── Conflict / Availability Primitives ───────────────────────────

/// First APPROVED reservation whose span overlaps `span`, excluding
/// `exclude` (the reservation under decision). Pending and declined
/// rows never block. Returns the winner's id.
pub fn find_conflict(room: &RoomState, span: &Span, exclude: Ulid) -> Option<Ulid> {
    room.overlapping(span)
        .find(|r| r.status == ReservationStatus::Approved && r.id != exclude)
        .map(|r| r.id)
}

/// A room is available over `window` iff no APPROVED reservation
/// overlaps it. A reservation ending exactly at `window.start` (or
/// starting at `window.end`) does not count.
pub fn is_room_available(room: &RoomState, window: &Span) -> bool {
    !room
        .overlapping(window)
        .any(|r| r.status == ReservationStatus::Approved)
}
