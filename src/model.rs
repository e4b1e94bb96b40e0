use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type inside the engine.
/// ISO-8601 exists at the wire boundary only.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Symmetric. Touching spans (`[0,10)` / `[10,20)`) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[allow(dead_code)]
    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// Reservation lifecycle. New reservations are always Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Approved,
    Declined,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Approved => "APPROVED",
            ReservationStatus::Declined => "DECLINED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pending") {
            Ok(ReservationStatus::Pending)
        } else if s.eq_ignore_ascii_case("approved") {
            Ok(ReservationStatus::Approved)
        } else if s.eq_ignore_ascii_case("declined") {
            Ok(ReservationStatus::Declined)
        } else {
            Err(())
        }
    }
}

/// Who is calling. Supplied by the connection layer — the engine never
/// authenticates, it only scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    /// Privileged reviewer: may decide reservations and manage rooms.
    pub reviewer: bool,
}

impl Identity {
    pub fn new(user: impl Into<String>, reviewer: bool) -> Self {
        Self {
            user: user.into(),
            reviewer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: Ulid,
    pub name: String,
    pub address: String,
}

/// A single reservation on a room. `requester` is a weak reference:
/// detaching the user account nulls it without deleting the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: Ulid,
    pub requester: Option<String>,
    pub span: Span,
    pub purpose: String,
    pub attendees: u32,
    pub status: ReservationStatus,
    pub created_at: Ms,
    pub updated_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub id: Ulid,
    pub author: Option<String>,
    pub reservation_id: Ulid,
    pub rating: u8,
    pub comment: String,
    pub created_at: Ms,
}

/// Per-room state: the unit of locking. All of a room's reservations
/// and their feedback live here, so the approval check-then-commit and
/// the rating aggregation each run under one lock.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Ulid,
    pub location_id: Ulid,
    pub name: String,
    /// Seat count — descriptive, not a concurrency bound.
    pub capacity: u32,
    /// All reservations regardless of status, sorted by `span.start`.
    pub reservations: Vec<Reservation>,
    pub feedback: Vec<Feedback>,
}

impl RoomState {
    pub fn new(id: Ulid, location_id: Ulid, name: String, capacity: u32) -> Self {
        Self {
            id,
            location_id,
            name,
            capacity,
            reservations: Vec::new(),
            feedback: Vec::new(),
        }
    }

    /// Insert a reservation maintaining sort order by span.start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove_reservation(&mut self, id: Ulid) -> Option<Reservation> {
        if let Some(pos) = self.reservations.iter().position(|r| r.id == id) {
            Some(self.reservations.remove(pos))
        } else {
            None
        }
    }

    pub fn reservation(&self, id: Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    pub fn reservation_mut(&mut self, id: Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == id)
    }

    /// Reservations whose span overlaps the query window, any status.
    /// Binary search skips everything starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }

    pub fn insert_feedback(&mut self, feedback: Feedback) {
        self.feedback.push(feedback);
    }

    pub fn feedback_by_id(&self, id: Ulid) -> Option<&Feedback> {
        self.feedback.iter().find(|f| f.id == id)
    }

    pub fn remove_feedback(&mut self, id: Ulid) -> Option<Feedback> {
        if let Some(pos) = self.feedback.iter().position(|f| f.id == id) {
            Some(self.feedback.remove(pos))
        } else {
            None
        }
    }

    pub fn feedback_mut(&mut self, id: Ulid) -> Option<&mut Feedback> {
        self.feedback.iter_mut().find(|f| f.id == id)
    }
}

/// The event types — flat, no nesting. This is the WAL record format,
/// so every field replay needs is carried explicitly (replay never
/// consults the clock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    LocationCreated {
        id: Ulid,
        name: String,
        address: String,
    },
    LocationUpdated {
        id: Ulid,
        name: String,
        address: String,
    },
    LocationDeleted {
        id: Ulid,
    },
    RoomCreated {
        id: Ulid,
        location_id: Ulid,
        name: String,
        capacity: u32,
    },
    RoomUpdated {
        id: Ulid,
        name: String,
        capacity: u32,
    },
    RoomDeleted {
        id: Ulid,
    },
    ReservationRequested {
        id: Ulid,
        room_id: Ulid,
        requester: Option<String>,
        span: Span,
        purpose: String,
        attendees: u32,
        created_at: Ms,
    },
    ReservationDecided {
        id: Ulid,
        room_id: Ulid,
        status: ReservationStatus,
        decided_at: Ms,
    },
    ReservationCancelled {
        id: Ulid,
        room_id: Ulid,
    },
    FeedbackLeft {
        id: Ulid,
        room_id: Ulid,
        reservation_id: Ulid,
        author: Option<String>,
        rating: u8,
        comment: String,
        created_at: Ms,
    },
    FeedbackUpdated {
        id: Ulid,
        room_id: Ulid,
        rating: u8,
        comment: String,
    },
    FeedbackDeleted {
        id: Ulid,
        room_id: Ulid,
    },
    UserDetached {
        user_id: String,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    pub id: Ulid,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub id: Ulid,
    pub location_id: Ulid,
    pub name: String,
    pub capacity: u32,
    /// Computed from feedback at read time; 0.0 when there is none.
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationInfo {
    pub id: Ulid,
    pub room_id: Ulid,
    pub requester: Option<String>,
    pub start: Ms,
    pub end: Ms,
    pub purpose: String,
    pub attendees: u32,
    pub status: ReservationStatus,
    pub created_at: Ms,
    pub updated_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackInfo {
    pub id: Ulid,
    pub room_id: Ulid,
    pub reservation_id: Ulid,
    pub author: Option<String>,
    pub rating: u8,
    pub comment: String,
    pub created_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityInfo {
    pub room_id: Ulid,
    pub available: bool,
    pub start: Ms,
    pub end: Ms,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: Ulid, span: Span) -> Reservation {
        Reservation {
            id,
            requester: Some("alice".into()),
            span,
            purpose: "standup".into(),
            attendees: 4,
            status: ReservationStatus::Pending,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // half-open
    }

    #[test]
    fn span_overlap_symmetric() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn span_touching_does_not_overlap() {
        let a = Span::new(0, 10);
        let b = Span::new(10, 20);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn span_one_unit_overlap() {
        let a = Span::new(0, 10);
        let b = Span::new(9, 20);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn span_containment_overlaps() {
        let outer = Span::new(0, 100);
        let inner = Span::new(40, 60);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn status_roundtrip() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Approved,
            ReservationStatus::Declined,
        ] {
            let parsed: ReservationStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!(
            "approved".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Approved
        );
        assert!("CANCELLED".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn reservation_ordering() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        rs.insert_reservation(pending(Ulid::new(), Span::new(300, 400)));
        rs.insert_reservation(pending(Ulid::new(), Span::new(100, 200)));
        rs.insert_reservation(pending(Ulid::new(), Span::new(200, 300)));
        assert_eq!(rs.reservations[0].span.start, 100);
        assert_eq!(rs.reservations[1].span.start, 200);
        assert_eq!(rs.reservations[2].span.start, 300);
    }

    #[test]
    fn reservation_remove_middle_preserves_order() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        let ids: Vec<Ulid> = (0..3).map(|_| Ulid::new()).collect();
        for (i, &id) in ids.iter().enumerate() {
            rs.insert_reservation(pending(id, Span::new((i as Ms) * 100, (i as Ms) * 100 + 50)));
        }
        rs.remove_reservation(ids[1]);
        assert_eq!(rs.reservations.len(), 2);
        assert_eq!(rs.reservations[0].id, ids[0]);
        assert_eq!(rs.reservations[1].id, ids[2]);
    }

    #[test]
    fn remove_nonexistent_returns_none() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        rs.insert_reservation(pending(Ulid::new(), Span::new(100, 200)));
        assert!(rs.remove_reservation(Ulid::new()).is_none());
        assert_eq!(rs.reservations.len(), 1);
    }

    #[test]
    fn overlapping_window_scan() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        rs.insert_reservation(pending(Ulid::new(), Span::new(100, 200))); // past
        rs.insert_reservation(pending(Ulid::new(), Span::new(450, 600))); // hit
        rs.insert_reservation(pending(Ulid::new(), Span::new(1000, 1100))); // future
        let hits: Vec<_> = rs.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span, Span::new(450, 600));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        rs.insert_reservation(pending(Ulid::new(), Span::new(100, 200)));
        let hits: Vec<_> = rs.overlapping(&Span::new(200, 300)).collect();
        assert!(hits.is_empty());
    }

    #[test]
    fn overlapping_spanning_reservation() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        rs.insert_reservation(pending(Ulid::new(), Span::new(0, 10_000)));
        let hits: Vec<_> = rs.overlapping(&Span::new(500, 600)).collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn overlapping_empty_room() {
        let rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        assert!(rs.overlapping(&Span::new(0, 1000)).next().is_none());
    }

    #[test]
    fn feedback_insert_remove() {
        let mut rs = RoomState::new(Ulid::new(), Ulid::new(), "A-101".into(), 8);
        let fid = Ulid::new();
        rs.insert_feedback(Feedback {
            id: fid,
            author: Some("alice".into()),
            reservation_id: Ulid::new(),
            rating: 5,
            comment: "great projector".into(),
            created_at: 0,
        });
        assert_eq!(rs.feedback.len(), 1);
        assert!(rs.remove_feedback(fid).is_some());
        assert!(rs.feedback.is_empty());
        assert!(rs.remove_feedback(fid).is_none());
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationRequested {
            id: Ulid::new(),
            room_id: Ulid::new(),
            requester: Some("alice".into()),
            span: Span::new(1000, 2000),
            purpose: "workshop".into(),
            attendees: 12,
            created_at: 500,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn decided_event_roundtrip() {
        let event = Event::ReservationDecided {
            id: Ulid::new(),
            room_id: Ulid::new(),
            status: ReservationStatus::Approved,
            decided_at: 12345,
        };
        let bytes = bincode::serialize(&event).unwrap();
        assert_eq!(bincode::deserialize::<Event>(&bytes).unwrap(), event);
    }
}
