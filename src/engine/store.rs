use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::SharedRoomState;

pub struct InMemoryStore {
    locations: DashMap<Ulid, Location>,
    rooms: DashMap<Ulid, SharedRoomState>,
    /// Reservation/feedback id → owning room id.
    entity_to_room: DashMap<Ulid, Ulid>,
    location_rooms: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            locations: DashMap::new(),
            rooms: DashMap::new(),
            entity_to_room: DashMap::new(),
            location_rooms: DashMap::new(),
        }
    }

    // ── Location registry ────────────────────────────────────

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn contains_location(&self, id: &Ulid) -> bool {
        self.locations.contains_key(id)
    }

    pub fn get_location(&self, id: &Ulid) -> Option<Location> {
        self.locations.get(id).map(|e| e.value().clone())
    }

    pub fn insert_location(&self, location: Location) {
        self.locations.insert(location.id, location);
    }

    pub fn remove_location(&self, id: &Ulid) -> Option<(Ulid, Location)> {
        self.locations.remove(id)
    }

    pub fn locations(&self) -> Vec<Location> {
        self.locations.iter().map(|e| e.value().clone()).collect()
    }

    // ── Room registry ────────────────────────────────────────

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, id: &Ulid) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn insert_room(&self, id: Ulid, state: SharedRoomState) {
        self.rooms.insert(id, state);
    }

    pub fn remove_room(&self, id: &Ulid) -> Option<(Ulid, SharedRoomState)> {
        self.rooms.remove(id)
    }

    pub fn room_ids(&self) -> Vec<Ulid> {
        self.rooms.iter().map(|e| *e.key()).collect()
    }

    // ── Entity index ─────────────────────────────────────────

    pub fn get_room_for_entity(&self, entity_id: &Ulid) -> Option<Ulid> {
        self.entity_to_room.get(entity_id).map(|e| *e.value())
    }

    pub fn map_entity(&self, entity_id: Ulid, room_id: Ulid) {
        self.entity_to_room.insert(entity_id, room_id);
    }

    pub fn unmap_entity(&self, entity_id: &Ulid) {
        self.entity_to_room.remove(entity_id);
    }

    /// Drop every index entry belonging to a room. Called on room
    /// deletion (direct or via location cascade) before the state Arc
    /// is removed.
    pub fn unmap_room_entities(&self, room: &RoomState) {
        for reservation in &room.reservations {
            self.unmap_entity(&reservation.id);
        }
        for feedback in &room.feedback {
            self.unmap_entity(&feedback.id);
        }
    }

    // ── Location→rooms index ─────────────────────────────────

    pub fn add_room_to_location(&self, location_id: Ulid, room_id: Ulid) {
        self.location_rooms.entry(location_id).or_default().push(room_id);
    }

    pub fn remove_room_from_location(&self, location_id: &Ulid, room_id: &Ulid) {
        if let Some(mut rooms) = self.location_rooms.get_mut(location_id) {
            rooms.retain(|r| r != room_id);
        }
    }

    pub fn rooms_in_location(&self, location_id: &Ulid) -> Vec<Ulid> {
        self.location_rooms
            .get(location_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn drop_location_index(&self, location_id: &Ulid) {
        self.location_rooms.remove(location_id);
    }

    // ── Event application ────────────────────────────────────

    /// Apply a room-scoped event to a room's state. Registry events
    /// (locations, room create/delete) are handled by the engine — the
    /// same split the replay path uses, so live and replayed state agree.
    pub fn apply_event(&self, room: &mut RoomState, event: &Event) {
        match event {
            Event::ReservationRequested {
                id,
                room_id,
                requester,
                span,
                purpose,
                attendees,
                created_at,
            } => {
                room.insert_reservation(Reservation {
                    id: *id,
                    requester: requester.clone(),
                    span: *span,
                    purpose: purpose.clone(),
                    attendees: *attendees,
                    status: ReservationStatus::Pending,
                    created_at: *created_at,
                    updated_at: *created_at,
                });
                self.map_entity(*id, *room_id);
            }
            Event::ReservationDecided {
                id, status, decided_at, ..
            } => {
                if let Some(reservation) = room.reservation_mut(*id) {
                    reservation.status = *status;
                    reservation.updated_at = *decided_at;
                }
            }
            Event::ReservationCancelled { id, .. } => {
                room.remove_reservation(*id);
                self.unmap_entity(id);
                // Feedback hangs off the reservation; it goes with it.
                let orphaned: Vec<Ulid> = room
                    .feedback
                    .iter()
                    .filter(|f| f.reservation_id == *id)
                    .map(|f| f.id)
                    .collect();
                room.feedback.retain(|f| f.reservation_id != *id);
                for fid in &orphaned {
                    self.unmap_entity(fid);
                }
            }
            Event::FeedbackLeft {
                id,
                room_id,
                reservation_id,
                author,
                rating,
                comment,
                created_at,
            } => {
                room.insert_feedback(Feedback {
                    id: *id,
                    author: author.clone(),
                    reservation_id: *reservation_id,
                    rating: *rating,
                    comment: comment.clone(),
                    created_at: *created_at,
                });
                self.map_entity(*id, *room_id);
            }
            Event::FeedbackUpdated {
                id, rating, comment, ..
            } => {
                if let Some(feedback) = room.feedback_mut(*id) {
                    feedback.rating = *rating;
                    feedback.comment = comment.clone();
                }
            }
            Event::FeedbackDeleted { id, .. } => {
                room.remove_feedback(*id);
                self.unmap_entity(id);
            }
            Event::RoomUpdated { name, capacity, .. } => {
                room.name = name.clone();
                room.capacity = *capacity;
            }
            Event::UserDetached { user_id } => {
                for reservation in room.reservations.iter_mut() {
                    if reservation.requester.as_deref() == Some(user_id) {
                        reservation.requester = None;
                    }
                }
                for feedback in room.feedback.iter_mut() {
                    if feedback.author.as_deref() == Some(user_id) {
                        feedback.author = None;
                    }
                }
            }
            Event::LocationCreated { .. }
            | Event::LocationUpdated { .. }
            | Event::LocationDeleted { .. }
            | Event::RoomCreated { .. }
            | Event::RoomDeleted { .. } => {}
        }
    }
}
