//! Room registry: creates, finds and disposes rooms.
//!
//! Rooms are addressed by short random codes (`K7Q2ZD`) that players can
//! read out to each other. The registry draws a code, retries on the rare
//! collision, spawns the room actor and keeps its handle. Disposing a room
//! removes the handle first, so no new request can reach a room that is
//! shutting down.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use gomoku_engine::GameEngine;
use gomoku_protocol::{RoomId, RoomListEntry};
use rand::Rng;

use crate::room::spawn_room;
use crate::{RegistryConfig, RoomBus, RoomError, RoomHandle, RoomSettings};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Owns every live room and the bus they publish on.
///
/// This is the entry point for higher layers (request dispatch, a game
/// server). Rooms don't know about each other; the registry only maps
/// codes to handles.
pub struct RoomRegistry<E: GameEngine> {
    rooms: HashMap<RoomId, RoomHandle>,
    bus: Arc<RoomBus>,
    config: RegistryConfig,
    _engine: PhantomData<fn() -> E>,
}

impl<E: GameEngine> Default for RoomRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: GameEngine> RoomRegistry<E> {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            bus: Arc::new(RoomBus::new()),
            config: config.validated(),
            _engine: PhantomData,
        }
    }

    /// The bus every room of this registry publishes on.
    pub fn bus(&self) -> &Arc<RoomBus> {
        &self.bus
    }

    /// Validates `settings`, starts a room and returns its code.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn create_room(&mut self, settings: RoomSettings) -> Result<RoomId, RoomError> {
        settings.validate()?;
        let room_id = self.fresh_code()?;
        let handle = spawn_room::<E>(
            room_id.clone(),
            settings,
            Arc::clone(&self.bus),
            self.config.mailbox_size,
        )?;
        self.rooms.insert(room_id.clone(), handle);
        tracing::info!(%room_id, rooms = self.rooms.len(), "room created");
        Ok(room_id)
    }

    /// Draws random codes until one is unused.
    fn fresh_code(&self) -> Result<RoomId, RoomError> {
        let mut rng = rand::rng();
        for _ in 0..self.config.max_code_attempts {
            let code: String = (0..self.config.room_code_length)
                .map(|_| {
                    let i = rng.random_range(0..ROOM_CODE_ALPHABET.len());
                    char::from(ROOM_CODE_ALPHABET[i])
                })
                .collect();
            let room_id = RoomId(code);
            if !self.rooms.contains_key(&room_id) {
                return Ok(room_id);
            }
            tracing::debug!(%room_id, "room code collision, drawing again");
        }
        Err(RoomError::NoRoomCode)
    }

    /// Handle to a live room.
    pub fn get(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Stops a room and forgets it. Its AI search is cancelled and its bus
    /// subscriptions are gone once this returns.
    pub async fn dispose_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        // An actor that already stopped has nothing left to release.
        if let Err(err) = handle.dispose().await {
            tracing::debug!(%room_id, error = %err, "room was already stopped");
        }
        tracing::info!(%room_id, rooms = self.rooms.len(), "room removed");
        Ok(())
    }

    /// Rooms that still have open seats.
    ///
    /// Rooms that fail to answer (shutting down) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomListEntry> {
        let mut entries = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(entry) = handle.info().await {
                if entry.phase.is_joinable() {
                    entries.push(entry);
                }
            }
        }
        entries.sort_by(|a, b| a.room_id.0.cmp(&b.room_id.0));
        entries
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    /// Disposes every room.
    pub async fn shutdown(&mut self) {
        let ids = self.room_ids();
        for room_id in &ids {
            let _ = self.dispose_room(room_id).await;
        }
        tracing::info!(disposed = ids.len(), "registry shut down");
    }
}
