mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod rating;
mod scope;
mod store;

pub use availability::{find_conflict, is_room_available};
pub use error::EngineError;
pub use rating::average_rating;
pub use scope::{
    can_mutate_feedback, can_mutate_reservation, can_view_feedback, can_view_reservation,
};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

use store::InMemoryStore;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                                .record(batch.len() as f64);
                            let flush_start = std::time::Instant::now();
                            let result = flush_batch(&mut wal, &mut batch);
                            metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                                .record(flush_start.elapsed().as_secs_f64());
                            respond_batch(&mut batch, &result);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                        .record(batch.len() as f64);
                    let flush_start = std::time::Instant::now();
                    let result = flush_batch(&mut wal, &mut batch);
                    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                        .record(flush_start.elapsed().as_secs_f64());
                    respond_batch(&mut batch, &result);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(
    batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>,
    result: &io::Result<()>,
) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

pub struct Engine {
    pub(super) store: InMemoryStore,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> std::io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            store: InMemoryStore::new(),
            wal_tx,
            notify,
        };

        // Replay events — we're the sole owner of these Arcs, so try_read/try_write
        // always succeed instantly (no contention). Never use blocking_read/blocking_write
        // here because this may run inside an async context (e.g. lazy tenant creation).
        for event in &events {
            match event {
                Event::LocationCreated { id, name, address }
                | Event::LocationUpdated { id, name, address } => {
                    engine.store.insert_location(Location {
                        id: *id,
                        name: name.clone(),
                        address: address.clone(),
                    });
                }
                Event::LocationDeleted { id } => {
                    for room_id in engine.store.rooms_in_location(id) {
                        if let Some(entry) = engine.store.get_room(&room_id) {
                            let room = entry.try_read().expect("replay: uncontended read");
                            engine.store.unmap_room_entities(&room);
                        }
                        engine.store.remove_room(&room_id);
                    }
                    engine.store.drop_location_index(id);
                    engine.store.remove_location(id);
                }
                Event::RoomCreated {
                    id,
                    location_id,
                    name,
                    capacity,
                } => {
                    let room = RoomState::new(*id, *location_id, name.clone(), *capacity);
                    engine.store.insert_room(*id, Arc::new(RwLock::new(room)));
                    engine.store.add_room_to_location(*location_id, *id);
                }
                Event::RoomDeleted { id } => {
                    if let Some(entry) = engine.store.get_room(id) {
                        let room = entry.try_read().expect("replay: uncontended read");
                        engine.store.unmap_room_entities(&room);
                        engine
                            .store
                            .remove_room_from_location(&room.location_id, id);
                    }
                    engine.store.remove_room(id);
                }
                Event::UserDetached { .. } => {
                    for room_id in engine.store.room_ids() {
                        if let Some(entry) = engine.store.get_room(&room_id) {
                            let mut guard =
                                entry.try_write().expect("replay: uncontended write");
                            engine.store.apply_event(&mut guard, event);
                        }
                    }
                }
                other => {
                    if let Some(room_id) = event_room_id(other)
                        && let Some(entry) = engine.store.get_room(&room_id)
                    {
                        let room_arc = entry.clone();
                        let mut guard =
                            room_arc.try_write().expect("replay: uncontended write");
                        engine.store.apply_event(&mut guard, other);
                    }
                }
            }
        }

        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.store.get_room(id)
    }

    pub fn get_room_for_entity(&self, entity_id: &Ulid) -> Option<Ulid> {
        self.store.get_room_for_entity(entity_id)
    }

    /// WAL-append + apply + notify in one call. Eliminates the repeated 3-line pattern.
    pub(super) async fn persist_and_apply(
        &self,
        room_id: Ulid,
        room: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.store.apply_event(room, event);
        self.notify.send(room_id, event);
        Ok(())
    }

    /// Lookup entity → room, get room, acquire write lock.
    pub(super) async fn resolve_entity_write(
        &self,
        entity_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<RoomState>), EngineError> {
        let room_id = self
            .get_room_for_entity(entity_id)
            .ok_or(EngineError::NotFound(*entity_id))?;
        let room = self
            .get_room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = room.write_owned().await;
        Ok((room_id, guard))
    }
}

/// Extract the owning room id from a room-scoped event.
fn event_room_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::ReservationRequested { room_id, .. }
        | Event::ReservationDecided { room_id, .. }
        | Event::ReservationCancelled { room_id, .. }
        | Event::FeedbackLeft { room_id, .. }
        | Event::FeedbackUpdated { room_id, .. }
        | Event::FeedbackDeleted { room_id, .. } => Some(*room_id),
        Event::RoomUpdated { id, .. } => Some(*id),
        Event::LocationCreated { .. }
        | Event::LocationUpdated { .. }
        | Event::LocationDeleted { .. }
        | Event::RoomCreated { .. }
        | Event::RoomDeleted { .. }
        | Event::UserDetached { .. } => None,
    }
}
