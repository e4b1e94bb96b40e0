use std::collections::BTreeSet;

use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::is_room_available;
use super::rating::average_rating;
use super::scope::{can_view_feedback, can_view_reservation};
use super::{Engine, EngineError};

impl Engine {
    pub fn list_locations(&self) -> Vec<LocationInfo> {
        let mut locations: Vec<LocationInfo> = self
            .store
            .locations()
            .into_iter()
            .map(|l| LocationInfo {
                id: l.id,
                name: l.name,
                address: l.address,
            })
            .collect();
        locations.sort_by_key(|l| l.id);
        locations
    }

    /// Room listing with the computed rating. The optional window keeps
    /// only rooms with no APPROVED reservation inside it. A
    /// half-specified window filters nothing — the wire layer forwards
    /// whatever bounds it could parse, and one bound alone means none.
    pub async fn list_rooms(
        &self,
        available_from: Option<Ms>,
        available_to: Option<Ms>,
    ) -> Result<Vec<RoomInfo>, EngineError> {
        let window = match (available_from, available_to) {
            (Some(start), Some(end)) => {
                if start >= end {
                    return Err(EngineError::InvalidArgument(
                        "window start must be before end",
                    ));
                }
                if end - start > MAX_QUERY_WINDOW_MS {
                    return Err(EngineError::LimitExceeded("query window too wide"));
                }
                Some(Span::new(start, end))
            }
            _ => None,
        };

        let room_ids: BTreeSet<Ulid> = self.store.room_ids().into_iter().collect();
        let mut rooms = Vec::new();
        for room_id in room_ids {
            let Some(room) = self.store.get_room(&room_id) else {
                continue;
            };
            let guard = room.read().await;
            if let Some(ref window) = window
                && !is_room_available(&guard, window)
            {
                continue;
            }
            rooms.push(RoomInfo {
                id: guard.id,
                location_id: guard.location_id,
                name: guard.name.clone(),
                capacity: guard.capacity,
                rating: average_rating(&guard.feedback),
            });
        }
        Ok(rooms)
    }

    /// Point query: is this room free over `[start, end)`? Unlike the
    /// listing filter, both bounds are mandatory here and the room must
    /// exist.
    pub async fn check_room_availability(
        &self,
        room_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<AvailabilityInfo, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidArgument(
                "window start must be before end",
            ));
        }
        if end - start > MAX_QUERY_WINDOW_MS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        let room = self
            .get_room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        let window = Span::new(start, end);
        Ok(AvailabilityInfo {
            room_id,
            available: is_room_available(&guard, &window),
            start,
            end,
        })
    }

    /// Reservations visible to `actor`, optionally narrowed to one
    /// room. Reviewers see every row, everyone else their own; rows
    /// with a detached requester surface for reviewers only.
    pub async fn list_reservations(
        &self,
        actor: &Identity,
        room_id: Option<Ulid>,
    ) -> Result<Vec<ReservationInfo>, EngineError> {
        let room_ids: Vec<Ulid> = match room_id {
            Some(id) => vec![id],
            None => self.store.room_ids(),
        };
        let mut rows = Vec::new();
        for rid in room_ids {
            let Some(room) = self.store.get_room(&rid) else {
                continue;
            };
            let guard = room.read().await;
            for r in &guard.reservations {
                if can_view_reservation(actor, r) {
                    rows.push(ReservationInfo {
                        id: r.id,
                        room_id: rid,
                        requester: r.requester.clone(),
                        start: r.span.start,
                        end: r.span.end,
                        purpose: r.purpose.clone(),
                        attendees: r.attendees,
                        status: r.status,
                        created_at: r.created_at,
                        updated_at: r.updated_at,
                    });
                }
            }
        }
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    pub async fn list_feedback(
        &self,
        actor: &Identity,
        room_id: Option<Ulid>,
    ) -> Result<Vec<FeedbackInfo>, EngineError> {
        let room_ids: Vec<Ulid> = match room_id {
            Some(id) => vec![id],
            None => self.store.room_ids(),
        };
        let mut rows = Vec::new();
        for rid in room_ids {
            let Some(room) = self.store.get_room(&rid) else {
                continue;
            };
            let guard = room.read().await;
            for f in &guard.feedback {
                if can_view_feedback(actor, f) {
                    rows.push(FeedbackInfo {
                        id: f.id,
                        room_id: rid,
                        reservation_id: f.reservation_id,
                        author: f.author.clone(),
                        rating: f.rating,
                        comment: f.comment.clone(),
                        created_at: f.created_at,
                    });
                }
            }
        }
        rows.sort_by_key(|f| f.id);
        Ok(rows)
    }
}
