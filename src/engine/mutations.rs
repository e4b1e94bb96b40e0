use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{oneshot, RwLock};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, now_ms, validate_window};
use super::scope::{can_mutate_feedback, can_mutate_reservation, require_reviewer};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    // ── Locations ────────────────────────────────────────────

    pub async fn create_location(
        &self,
        actor: &Identity,
        id: Ulid,
        name: String,
        address: String,
    ) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        if self.store.location_count() >= MAX_LOCATIONS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many locations"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("location name too long"));
        }
        if address.len() > MAX_ADDRESS_LEN {
            return Err(EngineError::LimitExceeded("location address too long"));
        }
        if self.store.contains_location(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let event = Event::LocationCreated {
            id,
            name: name.clone(),
            address: address.clone(),
        };
        self.wal_append(&event).await?;
        self.store.insert_location(Location { id, name, address });
        self.notify.send(id, &event);
        Ok(())
    }

    pub async fn update_location(
        &self,
        actor: &Identity,
        id: Ulid,
        name: String,
        address: String,
    ) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("location name too long"));
        }
        if address.len() > MAX_ADDRESS_LEN {
            return Err(EngineError::LimitExceeded("location address too long"));
        }
        if !self.store.contains_location(&id) {
            return Err(EngineError::NotFound(id));
        }

        let event = Event::LocationUpdated {
            id,
            name: name.clone(),
            address: address.clone(),
        };
        self.wal_append(&event).await?;
        self.store.insert_location(Location { id, name, address });
        self.notify.send(id, &event);
        Ok(())
    }

    /// Deleting a location takes its rooms with it, and each room takes
    /// its reservations and feedback. One cascade-root event in the WAL;
    /// replay re-runs the same cascade.
    pub async fn delete_location(&self, actor: &Identity, id: Ulid) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        if !self.store.contains_location(&id) {
            return Err(EngineError::NotFound(id));
        }

        let event = Event::LocationDeleted { id };
        self.wal_append(&event).await?;
        for room_id in self.store.rooms_in_location(&id) {
            if let Some(room) = self.store.get_room(&room_id) {
                // Hold the write lock while unlinking so in-flight ops
                // on this room finish before its state disappears.
                let guard = room.write().await;
                self.store.unmap_room_entities(&guard);
                self.store.remove_room(&room_id);
            }
        }
        self.store.drop_location_index(&id);
        self.store.remove_location(&id);
        self.notify.send(id, &event);
        Ok(())
    }

    // ── Rooms ────────────────────────────────────────────────

    pub async fn create_room(
        &self,
        actor: &Identity,
        id: Ulid,
        location_id: Ulid,
        name: String,
        capacity: u32,
    ) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        if self.store.room_count() >= MAX_ROOMS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room name too long"));
        }
        if self.store.contains_room(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if !self.store.contains_location(&location_id) {
            return Err(EngineError::NotFound(location_id));
        }

        let event = Event::RoomCreated {
            id,
            location_id,
            name: name.clone(),
            capacity,
        };
        self.wal_append(&event).await?;
        let room = RoomState::new(id, location_id, name, capacity);
        self.store.insert_room(id, Arc::new(RwLock::new(room)));
        self.store.add_room_to_location(location_id, id);
        self.notify.send(id, &event);
        Ok(())
    }

    pub async fn update_room(
        &self,
        actor: &Identity,
        id: Ulid,
        name: String,
        capacity: u32,
    ) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room name too long"));
        }
        let room = self.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = room.write().await;

        let event = Event::RoomUpdated { id, name, capacity };
        self.persist_and_apply(id, &mut guard, &event).await
    }

    pub async fn delete_room(&self, actor: &Identity, id: Ulid) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        let room = self.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = room.write().await;

        let event = Event::RoomDeleted { id };
        self.wal_append(&event).await?;
        self.store.unmap_room_entities(&guard);
        self.store.remove_room_from_location(&guard.location_id, &id);
        self.store.remove_room(&id);
        self.notify.send(id, &event);
        Ok(())
    }

    // ── Reservations ─────────────────────────────────────────

    /// Optimistic booking: no conflict check here. Any number of
    /// overlapping PENDING requests may pile up; the gate is approval.
    pub async fn request_reservation(
        &self,
        actor: &Identity,
        id: Ulid,
        room_id: Ulid,
        start: Ms,
        end: Ms,
        purpose: String,
        attendees: u32,
    ) -> Result<(), EngineError> {
        let span = validate_window(start, end)?;
        if purpose.len() > MAX_PURPOSE_LEN {
            return Err(EngineError::LimitExceeded("purpose too long"));
        }
        if attendees > MAX_ATTENDEES {
            return Err(EngineError::LimitExceeded("too many attendees"));
        }
        if self.store.get_room_for_entity(&id).is_some() {
            return Err(EngineError::AlreadyExists(id));
        }
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let mut guard = room.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many reservations on room"));
        }

        let event = Event::ReservationRequested {
            id,
            room_id,
            requester: Some(actor.user.clone()),
            span,
            purpose,
            attendees,
            created_at: now_ms(),
        };
        self.persist_and_apply(room_id, &mut guard, &event).await
    }

    /// Reviewer decision. APPROVED re-checks conflicts against the
    /// room's APPROVED reservations (excluding this one) under the
    /// room's write lock; DECLINED always goes through. Re-deciding a
    /// decided reservation is allowed — the conflict rule is the only
    /// gate.
    pub async fn decide_reservation(
        &self,
        actor: &Identity,
        id: Ulid,
        status: ReservationStatus,
    ) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        let span = guard
            .reservation(id)
            .ok_or(EngineError::NotFound(id))?
            .span;
        match status {
            ReservationStatus::Approved => check_no_conflict(&guard, &span, id)?,
            ReservationStatus::Declined => {}
            ReservationStatus::Pending => {
                return Err(EngineError::InvalidArgument(
                    "decision must be APPROVED or DECLINED",
                ));
            }
        }

        let event = Event::ReservationDecided {
            id,
            room_id,
            status,
            decided_at: now_ms(),
        };
        self.persist_and_apply(room_id, &mut guard, &event).await
    }

    pub async fn cancel_reservation(
        &self,
        actor: &Identity,
        id: Ulid,
    ) -> Result<Ulid, EngineError> {
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        let reservation = guard.reservation(id).ok_or(EngineError::NotFound(id))?;
        if !can_mutate_reservation(actor, reservation) {
            return Err(EngineError::Forbidden("not your reservation"));
        }
        let event = Event::ReservationCancelled { id, room_id };
        self.persist_and_apply(room_id, &mut guard, &event).await?;
        Ok(room_id)
    }

    // ── Feedback ─────────────────────────────────────────────

    /// Feedback requires the author's own APPROVED reservation. The
    /// rule binds reviewers too — reviewing grants decisions, not
    /// opinions on other people's meetings.
    pub async fn leave_feedback(
        &self,
        actor: &Identity,
        id: Ulid,
        reservation_id: Ulid,
        rating: u8,
        comment: String,
    ) -> Result<(), EngineError> {
        if !(1..=5).contains(&rating) {
            return Err(EngineError::InvalidArgument("rating must be between 1 and 5"));
        }
        if comment.len() > MAX_COMMENT_LEN {
            return Err(EngineError::LimitExceeded("comment too long"));
        }
        if self.store.get_room_for_entity(&id).is_some() {
            return Err(EngineError::AlreadyExists(id));
        }
        let (room_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        let reservation = guard
            .reservation(reservation_id)
            .ok_or(EngineError::NotFound(reservation_id))?;
        if reservation.requester.as_deref() != Some(actor.user.as_str()) {
            return Err(EngineError::InvalidArgument(
                "feedback requires your own reservation",
            ));
        }
        if reservation.status != ReservationStatus::Approved {
            return Err(EngineError::InvalidArgument(
                "feedback requires an approved reservation",
            ));
        }
        if guard.feedback.len() >= MAX_FEEDBACK_PER_ROOM {
            return Err(EngineError::LimitExceeded("too much feedback on room"));
        }

        let event = Event::FeedbackLeft {
            id,
            room_id,
            reservation_id,
            author: Some(actor.user.clone()),
            rating,
            comment,
            created_at: now_ms(),
        };
        self.persist_and_apply(room_id, &mut guard, &event).await
    }

    pub async fn update_feedback(
        &self,
        actor: &Identity,
        id: Ulid,
        rating: u8,
        comment: String,
    ) -> Result<Ulid, EngineError> {
        if !(1..=5).contains(&rating) {
            return Err(EngineError::InvalidArgument("rating must be between 1 and 5"));
        }
        if comment.len() > MAX_COMMENT_LEN {
            return Err(EngineError::LimitExceeded("comment too long"));
        }
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        let feedback = guard.feedback_by_id(id).ok_or(EngineError::NotFound(id))?;
        if !can_mutate_feedback(actor, feedback) {
            return Err(EngineError::Forbidden("not your feedback"));
        }
        let event = Event::FeedbackUpdated {
            id,
            room_id,
            rating,
            comment,
        };
        self.persist_and_apply(room_id, &mut guard, &event).await?;
        Ok(room_id)
    }

    pub async fn delete_feedback(&self, actor: &Identity, id: Ulid) -> Result<Ulid, EngineError> {
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        let feedback = guard.feedback_by_id(id).ok_or(EngineError::NotFound(id))?;
        if !can_mutate_feedback(actor, feedback) {
            return Err(EngineError::Forbidden("not your feedback"));
        }
        let event = Event::FeedbackDeleted { id, room_id };
        self.persist_and_apply(room_id, &mut guard, &event).await?;
        Ok(room_id)
    }

    // ── Users ────────────────────────────────────────────────

    /// Null out every requester/author reference to a user. The rows
    /// stay; this is the weak-ref half of account deletion, driven by
    /// the upstream account system.
    pub async fn detach_user(&self, actor: &Identity, user_id: &str) -> Result<(), EngineError> {
        require_reviewer(actor)?;
        let event = Event::UserDetached {
            user_id: user_id.to_string(),
        };
        self.wal_append(&event).await?;
        for room_id in self.store.room_ids() {
            if let Some(room) = self.store.get_room(&room_id) {
                let mut guard = room.write().await;
                self.store.apply_event(&mut guard, &event);
                self.notify.send(room_id, &event);
            }
        }
        Ok(())
    }

    // ── WAL maintenance ──────────────────────────────────────

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current state. Decided reservations come back as a
    /// request + decision pair so status and timestamps replay exactly.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();

        let mut locations = self.store.locations();
        locations.sort_by_key(|l| l.id);
        for location in locations {
            events.push(Event::LocationCreated {
                id: location.id,
                name: location.name,
                address: location.address,
            });
        }

        let room_ids: BTreeSet<Ulid> = self.store.room_ids().into_iter().collect();
        for room_id in room_ids {
            let Some(room) = self.store.get_room(&room_id) else {
                continue;
            };
            let guard = room.read().await;
            events.push(Event::RoomCreated {
                id: guard.id,
                location_id: guard.location_id,
                name: guard.name.clone(),
                capacity: guard.capacity,
            });
            for r in &guard.reservations {
                events.push(Event::ReservationRequested {
                    id: r.id,
                    room_id: guard.id,
                    requester: r.requester.clone(),
                    span: r.span,
                    purpose: r.purpose.clone(),
                    attendees: r.attendees,
                    created_at: r.created_at,
                });
                if r.status != ReservationStatus::Pending {
                    events.push(Event::ReservationDecided {
                        id: r.id,
                        room_id: guard.id,
                        status: r.status,
                        decided_at: r.updated_at,
                    });
                }
            }
            for f in &guard.feedback {
                events.push(Event::FeedbackLeft {
                    id: f.id,
                    room_id: guard.id,
                    reservation_id: f.reservation_id,
                    author: f.author.clone(),
                    rating: f.rating,
                    comment: f.comment.clone(),
                    created_at: f.created_at,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
