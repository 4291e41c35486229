//! Request dispatch: decoded [`ClientRequest`]s in, [`ServerMessage`]s out.
//!
//! A transport (WebSocket, HTTP, a local UI loop) owns the connections and
//! knows who is calling; it hands each request to a [`Dispatcher`] together
//! with the caller's identity. The dispatcher finds the room and routes the
//! request to the matching [`RoomHandle`] operation:
//!
//! - local rooms act by the request's `seat`
//! - networked rooms act through the caller's bound seat, whatever `seat`
//!   the request names; undo, redo and disposal there also need a seated
//!   caller

use std::collections::HashSet;
use std::sync::Arc;

use gomoku_engine::GameEngine;
use gomoku_protocol::{
    ActionResponse, ClientRequest, Codec, Identity, JsonCodec, RoomId, RoomSnapshot, Seat,
    ServerMessage,
};
use gomoku_room::{
    ErrorKind, RegistryConfig, RoomBus, RoomError, RoomHandle, RoomRegistry, RoomSettings,
};
use gomoku_session::BindingError;
use tokio::sync::Mutex;

use crate::GomokuError;

/// Registry plus the set of rooms created as networked.
struct Rooms<E: GameEngine> {
    registry: RoomRegistry<E>,
    networked: HashSet<RoomId>,
}

/// Routes client requests to rooms.
///
/// Shared across connection tasks behind an `Arc`. The registry lock is
/// only held to look up, create or dispose rooms; room operations run on
/// a cloned handle with the lock released.
pub struct Dispatcher<E: GameEngine, C: Codec = JsonCodec> {
    rooms: Mutex<Rooms<E>>,
    codec: C,
}

impl<E: GameEngine> Dispatcher<E> {
    /// A dispatcher speaking JSON with the default registry settings.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec, RegistryConfig::default())
    }
}

impl<E: GameEngine> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: GameEngine, C: Codec> Dispatcher<E, C> {
    pub fn with_codec(codec: C, config: RegistryConfig) -> Self {
        Self {
            rooms: Mutex::new(Rooms {
                registry: RoomRegistry::with_config(config),
                networked: HashSet::new(),
            }),
            codec,
        }
    }

    /// The bus all rooms publish on, for transports that push events.
    pub async fn bus(&self) -> Arc<RoomBus> {
        Arc::clone(self.rooms.lock().await.registry.bus())
    }

    /// Handle to a live room.
    pub async fn room(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms.lock().await.registry.get(room_id)
    }

    async fn lookup(&self, room_id: &RoomId) -> Result<(RoomHandle, bool), GomokuError> {
        let rooms = self.rooms.lock().await;
        let handle = rooms.registry.get(room_id)?;
        Ok((handle, rooms.networked.contains(room_id)))
    }

    /// Decodes a request, dispatches it and encodes the reply.
    ///
    /// Undecodable input is answered with a 400 error message; only a
    /// reply that fails to encode is returned as `Err`.
    pub async fn handle_bytes(
        &self,
        caller: Option<&Identity>,
        data: &[u8],
    ) -> Result<Vec<u8>, GomokuError> {
        let reply = match self.codec.decode::<ClientRequest>(data) {
            Ok(request) => self.dispatch(caller, request).await,
            Err(err) => {
                tracing::debug!(error = %err, "failed to decode request");
                let err = GomokuError::from(err);
                ServerMessage::Error {
                    code: err.code(),
                    message: err.to_string(),
                }
            }
        };
        Ok(self.codec.encode(&reply)?)
    }

    /// Runs one request. Failures come back as [`ServerMessage::Error`], or
    /// as an unsuccessful [`ActionResponse`] for rejected actions.
    pub async fn dispatch(&self, caller: Option<&Identity>, request: ClientRequest) -> ServerMessage {
        tracing::debug!(?caller, ?request, "dispatching request");
        match self.route(caller, request).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(error = %err, "request failed");
                ServerMessage::Error {
                    code: err.code(),
                    message: err.to_string(),
                }
            }
        }
    }

    async fn route(
        &self,
        caller: Option<&Identity>,
        request: ClientRequest,
    ) -> Result<ServerMessage, GomokuError> {
        match request {
            ClientRequest::CreateRoom(create) => {
                let settings = RoomSettings::try_from(&create).map_err(RoomError::from)?;
                let networked = settings.networked;
                let mut rooms = self.rooms.lock().await;
                let room_id = rooms.registry.create_room(settings)?;
                if networked {
                    rooms.networked.insert(room_id.clone());
                }
                Ok(ServerMessage::RoomCreated { room_id })
            }

            ClientRequest::MakeMove {
                room_id,
                seat,
                row,
                col,
            } => {
                let (room, networked) = self.lookup(&room_id).await?;
                let result = if networked {
                    let identity = require_identity(caller, "MakeMove")?;
                    room.make_move_as(identity, row, col).await
                } else {
                    room.make_move(require_seat(seat, "MakeMove")?, row, col)
                        .await
                };
                action_result(&room, result).await
            }

            ClientRequest::Swap {
                room_id,
                seat,
                did_swap,
            } => {
                let (room, networked) = self.lookup(&room_id).await?;
                let result = if networked {
                    room.swap_as(require_identity(caller, "Swap")?, did_swap)
                        .await
                } else {
                    room.swap(require_seat(seat, "Swap")?, did_swap).await
                };
                action_result(&room, result).await
            }

            ClientRequest::ChooseOpening {
                room_id,
                seat,
                choice,
            } => {
                let (room, networked) = self.lookup(&room_id).await?;
                let result = if networked {
                    let identity = require_identity(caller, "ChooseOpening")?;
                    room.choose_opening_as(identity, choice).await
                } else {
                    room.choose_opening(require_seat(seat, "ChooseOpening")?, choice)
                        .await
                };
                action_result(&room, result).await
            }

            ClientRequest::Undo { room_id } => {
                let (room, networked) = self.lookup(&room_id).await?;
                let result = if networked {
                    room.undo_as(require_identity(caller, "Undo")?).await
                } else {
                    room.undo().await
                };
                action_result(&room, result).await
            }

            ClientRequest::Redo { room_id } => {
                let (room, networked) = self.lookup(&room_id).await?;
                let result = if networked {
                    room.redo_as(require_identity(caller, "Redo")?).await
                } else {
                    room.redo().await
                };
                action_result(&room, result).await
            }

            ClientRequest::GetState { room_id } => {
                let (room, _) = self.lookup(&room_id).await?;
                Ok(ServerMessage::State(room.get_state().await?))
            }

            ClientRequest::RequestSuggestion { room_id, seat } => {
                let (room, _) = self.lookup(&room_id).await?;
                let (row, col) = room.request_suggestion(seat).await?;
                Ok(ServerMessage::Suggestion { row, col })
            }

            ClientRequest::ResolvePending { room_id } => {
                let (room, _) = self.lookup(&room_id).await?;
                let started = room.resolve_pending().await?;
                Ok(ServerMessage::ResolutionStarted { started })
            }

            ClientRequest::Connect { room_id, seat } => {
                let identity = require_identity(caller, "Connect")?;
                let (room, _) = self.lookup(&room_id).await?;
                let seat = room.connect(identity.clone(), seat).await?;
                Ok(ServerMessage::Connected { seat })
            }

            ClientRequest::Disconnect { room_id } => {
                let identity = require_identity(caller, "Disconnect")?;
                let (room, _) = self.lookup(&room_id).await?;
                let seat = room.disconnect(identity).await?;
                Ok(ServerMessage::Disconnected { seat })
            }

            ClientRequest::AvailableSeats { room_id } => {
                let (room, _) = self.lookup(&room_id).await?;
                let available = room.available_seats().await?;
                Ok(ServerMessage::Seats { available })
            }

            ClientRequest::ListRooms => {
                let rooms = self.rooms.lock().await.registry.list_rooms().await;
                Ok(ServerMessage::RoomList { rooms })
            }

            ClientRequest::DisposeRoom { room_id } => {
                let mut rooms = self.rooms.lock().await;
                // Only a seated player may close a networked room.
                if rooms.networked.contains(&room_id) {
                    let identity = require_identity(caller, "DisposeRoom")?;
                    let room = rooms.registry.get(&room_id)?;
                    if room.seat_of(identity).await?.is_none() {
                        return Err(RoomError::from(BindingError::NotSeated(identity.clone())).into());
                    }
                }
                rooms.registry.dispose_room(&room_id).await?;
                rooms.networked.remove(&room_id);
                Ok(ServerMessage::RoomDisposed { room_id })
            }
        }
    }

    /// Disposes every room.
    pub async fn shutdown(&self) {
        let mut rooms = self.rooms.lock().await;
        rooms.registry.shutdown().await;
        rooms.networked.clear();
    }
}

fn require_identity<'a>(
    caller: Option<&'a Identity>,
    request: &'static str,
) -> Result<&'a Identity, GomokuError> {
    caller.ok_or(GomokuError::MissingIdentity(request))
}

fn require_seat(seat: Option<Seat>, request: &'static str) -> Result<Seat, GomokuError> {
    seat.ok_or(GomokuError::MissingSeat(request))
}

/// Wraps the outcome of an acting request.
///
/// A rejected action still answers with the room's current state; only a
/// room that is gone becomes an error message.
async fn action_result(
    room: &RoomHandle,
    result: Result<RoomSnapshot, RoomError>,
) -> Result<ServerMessage, GomokuError> {
    let response = match result {
        Ok(state) => ActionResponse {
            success: true,
            message: "ok".into(),
            state,
        },
        Err(err) if err.kind() == ErrorKind::Unavailable => return Err(err.into()),
        Err(err) => ActionResponse {
            success: false,
            message: err.to_string(),
            state: room.get_state().await?,
        },
    };
    Ok(ServerMessage::ActionResult(response))
}
