//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc mailbox. Every mutation (human actions, AI outcomes, undo,
//! redo, seat binding) is a [`RoomCommand`] processed one at a time, so no
//! lock guards the board and no two actions can interleave.

use std::sync::Arc;

use gomoku_bus::{HandlerError, SubscriptionToken};
use gomoku_clock::Clock;
use gomoku_engine::{GameEngine, SearchBudget};
use gomoku_protocol::{
    Identity, RoomId, RoomListEntry, RoomPhase, RoomSnapshot, Seat, SeatView, Swap2Choice,
    TimeView,
};
use gomoku_session::{BindingError, SeatBinding};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::resolver::{plan, pro_opening, search, spawn_search, PendingResolution, Plan};
use crate::{
    describe_log, pro_violation, Action, ActionKind, ActionLog, Expectation, RoomBus, RoomError,
    RoomEvent, RoomEventKind, RoomSettings, Topic, TurnState, DEFAULT_AI_DEPTH,
};

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;
type BoxedHandler = Box<dyn Fn(&RoomEvent) -> Result<(), HandlerError> + Send + Sync>;

/// Commands sent to a room actor through its mailbox.
///
/// Variants carrying a `reply` are request/response: the caller awaits the
/// `oneshot` receiver. `Resolved` is mailed by the room's own AI task.
pub(crate) enum RoomCommand {
    Act {
        seat: Seat,
        kind: ActionKind,
        reply: Reply<RoomSnapshot>,
    },
    ActAs {
        identity: Identity,
        kind: ActionKind,
        reply: Reply<RoomSnapshot>,
    },
    /// `by` is the caller in networked rooms, `None` for local play.
    Undo {
        by: Option<Identity>,
        reply: Reply<RoomSnapshot>,
    },
    Redo {
        by: Option<Identity>,
        reply: Reply<RoomSnapshot>,
    },
    GetState {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Suggest {
        seat: Seat,
        reply: Reply<(usize, usize)>,
    },
    ResolvePending {
        reply: oneshot::Sender<bool>,
    },
    HasPending {
        reply: oneshot::Sender<bool>,
    },
    Connect {
        identity: Identity,
        seat: Seat,
        reply: Reply<Seat>,
    },
    Disconnect {
        identity: Identity,
        reply: Reply<Option<Seat>>,
    },
    SeatOf {
        identity: Identity,
        reply: Reply<Option<Seat>>,
    },
    AvailableSeats {
        reply: Reply<Vec<Seat>>,
    },
    Subscribe {
        topic: Topic,
        handler: BoxedHandler,
        reply: oneshot::Sender<SubscriptionToken>,
    },
    Unsubscribe {
        token: SubscriptionToken,
        reply: oneshot::Sender<bool>,
    },
    Info {
        reply: oneshot::Sender<RoomListEntry>,
    },
    Resolved {
        id: u64,
        seat: Seat,
        outcome: Result<(usize, usize), RoomError>,
    },
    Dispose {
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone: it wraps an `mpsc::Sender`. Once the room is disposed
/// every call fails with [`RoomError::Unavailable`].
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }

    /// Sends a command built around a fresh reply channel and awaits the
    /// answer.
    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    async fn act(&self, seat: Seat, kind: ActionKind) -> Result<RoomSnapshot, RoomError> {
        self.call(|reply| RoomCommand::Act { seat, kind, reply })
            .await?
    }

    async fn act_as(&self, identity: &Identity, kind: ActionKind) -> Result<RoomSnapshot, RoomError> {
        let identity = identity.clone();
        self.call(|reply| RoomCommand::ActAs {
            identity,
            kind,
            reply,
        })
        .await?
    }

    /// Places a stone for `seat`.
    pub async fn make_move(&self, seat: Seat, row: usize, col: usize) -> Result<RoomSnapshot, RoomError> {
        self.act(seat, ActionKind::Move { row, col }).await
    }

    /// Answers a swap decision for `seat`.
    pub async fn swap(&self, seat: Seat, did_swap: bool) -> Result<RoomSnapshot, RoomError> {
        self.act(seat, ActionKind::SwapDecision { did_swap }).await
    }

    /// Picks a Swap2 option for `seat`.
    pub async fn choose_opening(&self, seat: Seat, choice: Swap2Choice) -> Result<RoomSnapshot, RoomError> {
        self.act(seat, ActionKind::OpeningChoice { choice }).await
    }

    /// [`make_move`](Self::make_move) for whichever seat `identity` holds.
    pub async fn make_move_as(&self, identity: &Identity, row: usize, col: usize) -> Result<RoomSnapshot, RoomError> {
        self.act_as(identity, ActionKind::Move { row, col }).await
    }

    pub async fn swap_as(&self, identity: &Identity, did_swap: bool) -> Result<RoomSnapshot, RoomError> {
        self.act_as(identity, ActionKind::SwapDecision { did_swap })
            .await
    }

    pub async fn choose_opening_as(&self, identity: &Identity, choice: Swap2Choice) -> Result<RoomSnapshot, RoomError> {
        self.act_as(identity, ActionKind::OpeningChoice { choice })
            .await
    }

    /// Takes back the last applied action.
    pub async fn undo(&self) -> Result<RoomSnapshot, RoomError> {
        self.call(|reply| RoomCommand::Undo { by: None, reply })
            .await?
    }

    /// Reapplies the next undone action.
    pub async fn redo(&self) -> Result<RoomSnapshot, RoomError> {
        self.call(|reply| RoomCommand::Redo { by: None, reply })
            .await?
    }

    /// [`undo`](Self::undo) on behalf of a seated player. Fails with a
    /// [`BindingError`] unless `identity` holds a seat and every human
    /// seat is bound.
    pub async fn undo_as(&self, identity: &Identity) -> Result<RoomSnapshot, RoomError> {
        let by = Some(identity.clone());
        self.call(|reply| RoomCommand::Undo { by, reply }).await?
    }

    pub async fn redo_as(&self, identity: &Identity) -> Result<RoomSnapshot, RoomError> {
        let by = Some(identity.clone());
        self.call(|reply| RoomCommand::Redo { by, reply }).await?
    }

    pub async fn get_state(&self) -> Result<RoomSnapshot, RoomError> {
        self.call(|reply| RoomCommand::GetState { reply }).await
    }

    /// Asks the engine what `seat` should play. Changes nothing.
    pub async fn request_suggestion(&self, seat: Seat) -> Result<(usize, usize), RoomError> {
        self.call(|reply| RoomCommand::Suggest { seat, reply })
            .await?
    }

    /// Lets AI seats play until a human is expected, the game ends or a
    /// search is started. Returns `true` if anything was committed or
    /// started.
    pub async fn resolve_pending(&self) -> Result<bool, RoomError> {
        self.call(|reply| RoomCommand::ResolvePending { reply })
            .await
    }

    /// `true` when an AI seat is expected and the game is not over.
    pub async fn has_pending_action(&self) -> Result<bool, RoomError> {
        self.call(|reply| RoomCommand::HasPending { reply }).await
    }

    /// Binds `identity` to `seat` (networked rooms only).
    pub async fn connect(&self, identity: Identity, seat: Seat) -> Result<Seat, RoomError> {
        self.call(|reply| RoomCommand::Connect {
            identity,
            seat,
            reply,
        })
        .await?
    }

    /// Releases the seat `identity` holds, if any.
    pub async fn disconnect(&self, identity: &Identity) -> Result<Option<Seat>, RoomError> {
        let identity = identity.clone();
        self.call(|reply| RoomCommand::Disconnect { identity, reply })
            .await?
    }

    /// The seat `identity` holds, if any (networked rooms only).
    pub async fn seat_of(&self, identity: &Identity) -> Result<Option<Seat>, RoomError> {
        let identity = identity.clone();
        self.call(|reply| RoomCommand::SeatOf { identity, reply })
            .await?
    }

    pub async fn available_seats(&self) -> Result<Vec<Seat>, RoomError> {
        self.call(|reply| RoomCommand::AvailableSeats { reply })
            .await?
    }

    /// Subscribes to this room's events on `topic`.
    ///
    /// The subscription belongs to the room and is removed when the room is
    /// disposed.
    pub async fn subscribe<F>(&self, topic: Topic, handler: F) -> Result<SubscriptionToken, RoomError>
    where
        F: Fn(&RoomEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let room_id = self.room_id.clone();
        let handler: BoxedHandler = Box::new(move |event: &RoomEvent| {
            if event.room_id == room_id {
                handler(event)
            } else {
                Ok(())
            }
        });
        self.call(|reply| RoomCommand::Subscribe {
            topic,
            handler,
            reply,
        })
        .await
    }

    /// Removes a subscription made through this room. Returns `false` for
    /// tokens the room doesn't own.
    pub async fn unsubscribe(&self, token: SubscriptionToken) -> Result<bool, RoomError> {
        self.call(|reply| RoomCommand::Unsubscribe { token, reply })
            .await
    }

    /// Summary used by room listings.
    pub async fn info(&self) -> Result<RoomListEntry, RoomError> {
        self.call(|reply| RoomCommand::Info { reply }).await
    }

    /// Cancels any AI search, removes the room's bus subscriptions and
    /// stops the actor. Returns once all of that is done.
    pub async fn dispose(&self) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Dispose { reply }).await
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room state. Lives inside the actor task only.
struct RoomActor<E: GameEngine> {
    room_id: RoomId,
    settings: RoomSettings,
    engine: E,
    log: ActionLog<E::Effect>,
    clock: Clock,
    /// `Some` in networked rooms.
    binding: Option<SeatBinding>,
    pending: Option<PendingResolution>,
    next_resolution_id: u64,
    bus: Arc<RoomBus>,
    /// Every bus subscription this room owns.
    subscriptions: Vec<SubscriptionToken>,
    started_at: Instant,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Our own mailbox, for AI tasks to report back.
    mailbox: mpsc::WeakSender<RoomCommand>,
}

impl<E: GameEngine> RoomActor<E> {
    async fn run(mut self) {
        tracing::info!(
            room_id = %self.room_id,
            rule_style = %self.settings.rule_style,
            width = self.settings.width,
            height = self.settings.height,
            networked = self.settings.networked,
            "room actor started"
        );
        self.announce_turns();
        self.follow_turn();

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Act { seat, kind, reply } => {
                    let result = self.handle_act(seat, kind);
                    let committed = result.is_ok();
                    let _ = reply.send(result);
                    if committed {
                        self.resolve_pending();
                    }
                }
                RoomCommand::ActAs {
                    identity,
                    kind,
                    reply,
                } => {
                    let result = self
                        .seat_for(&identity)
                        .and_then(|seat| self.handle_act(seat, kind));
                    let committed = result.is_ok();
                    let _ = reply.send(result);
                    if committed {
                        self.resolve_pending();
                    }
                }
                RoomCommand::Undo { by, reply } => {
                    let result = self
                        .authorize(by.as_ref())
                        .and_then(|()| self.handle_undo());
                    let _ = reply.send(result);
                }
                RoomCommand::Redo { by, reply } => {
                    let result = self
                        .authorize(by.as_ref())
                        .and_then(|()| self.handle_redo());
                    let _ = reply.send(result);
                }
                RoomCommand::GetState { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                RoomCommand::Suggest { seat, reply } => self.handle_suggest(seat, reply),
                RoomCommand::ResolvePending { reply } => {
                    let progressed = self.resolve_pending();
                    let _ = reply.send(progressed);
                }
                RoomCommand::HasPending { reply } => {
                    let _ = reply.send(self.has_pending_action());
                }
                RoomCommand::Connect {
                    identity,
                    seat,
                    reply,
                } => {
                    let result = self.handle_connect(identity, seat);
                    let ready = result.is_ok() && self.binding.as_ref().is_some_and(SeatBinding::is_complete);
                    let _ = reply.send(result);
                    if ready {
                        self.resolve_pending();
                    }
                }
                RoomCommand::Disconnect { identity, reply } => {
                    let _ = reply.send(self.handle_disconnect(identity));
                }
                RoomCommand::SeatOf { identity, reply } => {
                    let result: Result<Option<Seat>, RoomError> = self
                        .binding
                        .as_ref()
                        .map(|binding| binding.seat_of(&identity))
                        .ok_or_else(|| BindingError::NotNetworked.into());
                    let _ = reply.send(result);
                }
                RoomCommand::AvailableSeats { reply } => {
                    let result: Result<Vec<Seat>, RoomError> = self
                        .binding
                        .as_ref()
                        .map(SeatBinding::available_seats)
                        .ok_or_else(|| BindingError::NotNetworked.into());
                    let _ = reply.send(result);
                }
                RoomCommand::Subscribe {
                    topic,
                    handler,
                    reply,
                } => {
                    let token = self.bus.subscribe(topic, handler);
                    self.subscriptions.push(token);
                    let _ = reply.send(token);
                }
                RoomCommand::Unsubscribe { token, reply } => {
                    let owned = match self.subscriptions.iter().position(|t| *t == token) {
                        Some(index) => {
                            self.subscriptions.swap_remove(index);
                            self.bus.unsubscribe(token)
                        }
                        None => false,
                    };
                    let _ = reply.send(owned);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Resolved { id, seat, outcome } => {
                    self.handle_resolved(id, seat, outcome);
                }
                RoomCommand::Dispose { reply } => {
                    self.dispose();
                    let _ = reply.send(());
                    break;
                }
            }
        }

        // Every handle dropped without a dispose: still release what we own.
        self.release();
        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    // -- derived state ------------------------------------------------------

    fn turn(&self) -> TurnState {
        TurnState::replay(
            self.settings.rule_style,
            self.log.applied().iter().map(|action| &action.kind),
        )
    }

    /// `None` once the game is over.
    fn expectation(&self) -> Option<Expectation> {
        if self.engine.is_game_over() {
            None
        } else {
            Some(self.turn().expectation())
        }
    }

    fn has_pending_action(&self) -> bool {
        self.expectation()
            .is_some_and(|expected| self.settings.seat(expected.seat).is_ai())
    }

    fn phase(&self) -> RoomPhase {
        if self.engine.is_game_over() {
            RoomPhase::Finished
        } else if self.binding.as_ref().is_some_and(|b| !b.is_complete()) {
            RoomPhase::WaitingForPlayers
        } else {
            RoomPhase::InProgress
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        let turn = self.turn();
        let expected = self.expectation();
        RoomSnapshot {
            room_id: self.room_id.clone(),
            width: self.settings.width,
            height: self.settings.height,
            rule_style: self.settings.rule_style,
            phase: self.phase(),
            board: self.engine.board_snapshot(),
            is_game_over: self.engine.is_game_over(),
            winner: self.engine.winner().and_then(|stone| turn.seat_of(stone)),
            next_seat: expected.map(|e| e.seat),
            next_action: expected.map(|e| e.action),
            action_log: describe_log(
                self.settings.rule_style,
                self.log.iter().map(|action| (action.seat, &action.kind)),
            ),
            cursor: self.log.cursor(),
            seats: Seat::ALL.map(|seat| self.seat_view(&turn, seat)),
            has_pending_action: self.has_pending_action(),
            resolution_in_flight: self.pending.is_some(),
        }
    }

    fn seat_view(&self, turn: &TurnState, seat: Seat) -> SeatView {
        let color = turn.colour_of(seat);
        let is_ai = self.settings.seat(seat).is_ai();
        SeatView {
            seat,
            color,
            score: self.engine.score_of(color),
            time: TimeView {
                elapsed_ms: self.clock.elapsed(seat).as_millis() as u64,
                remaining_ms: self.clock.remaining(seat).as_millis(),
            },
            is_ai,
            connected: match &self.binding {
                None => true,
                Some(binding) => is_ai || binding.is_bound(seat),
            },
        }
    }

    fn info(&self) -> RoomListEntry {
        RoomListEntry {
            room_id: self.room_id.clone(),
            phase: self.phase(),
            rule_style: self.settings.rule_style,
            width: self.settings.width,
            height: self.settings.height,
            available_seats: self
                .binding
                .as_ref()
                .map(SeatBinding::available_seats)
                .unwrap_or_default(),
        }
    }

    // -- events -------------------------------------------------------------

    fn publish(&self, kind: RoomEventKind) {
        let event = RoomEvent {
            room_id: self.room_id.clone(),
            kind,
        };
        self.bus.publish(&event.topic(), &event);
    }

    fn publish_state(&self) {
        self.publish(RoomEventKind::StateChanged(Box::new(self.snapshot())));
    }

    fn publish_game_over(&self) {
        let winner = self
            .engine
            .winner()
            .and_then(|stone| self.turn().seat_of(stone));
        tracing::info!(room_id = %self.room_id, ?winner, moves = self.log.cursor(), "game over");
        self.publish(RoomEventKind::GameOver { winner });
    }

    /// Re-publishes our own `StateChanged` events as `TurnExpected`.
    fn announce_turns(&mut self) {
        let room_id = self.room_id.clone();
        let bus = Arc::downgrade(&self.bus);
        let token = self.bus.subscribe(Topic::StateChanged, move |event: &RoomEvent| {
            if event.room_id != room_id {
                return Ok(());
            }
            let RoomEventKind::StateChanged(snapshot) = &event.kind else {
                return Ok(());
            };
            let (Some(seat), Some(action)) = (snapshot.next_seat, snapshot.next_action) else {
                return Ok(());
            };
            if let Some(bus) = bus.upgrade() {
                let turn = RoomEvent {
                    room_id: room_id.clone(),
                    kind: RoomEventKind::TurnExpected { seat, action },
                };
                bus.publish(&Topic::TurnExpected, &turn);
            }
            Ok(())
        });
        self.subscriptions.push(token);
    }

    // -- clock --------------------------------------------------------------

    /// Points the clock at whoever is expected now.
    fn follow_turn(&mut self) {
        match self.expectation() {
            Some(expected) => self.clock.on_turn_start(expected.seat),
            None => self.clock.stop(),
        }
    }

    /// Recomputes charged time from the applied prefix of the log.
    fn rebuild_clock(&mut self) {
        let current = self.expectation().map(|e| e.seat);
        self.clock.rebuild(
            self.log
                .applied()
                .iter()
                .map(|action| (action.seat, action.think_time)),
            current,
        );
    }

    // -- actions ------------------------------------------------------------

    fn seat_for(&self, identity: &Identity) -> Result<Seat, RoomError> {
        let binding = self.binding.as_ref().ok_or(BindingError::NotNetworked)?;
        let seat = binding.require_seat(identity)?;
        if !binding.is_complete() {
            return Err(BindingError::RoomNotReady.into());
        }
        Ok(seat)
    }

    /// History edits from a caller must come from a seated player of a
    /// full room.
    fn authorize(&self, by: Option<&Identity>) -> Result<(), RoomError> {
        match by {
            Some(identity) => self.seat_for(identity).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Checks an action without touching anything. `by_ai` is set for
    /// actions coming from the resolver, which may act for AI seats.
    fn validate(&self, seat: Seat, kind: &ActionKind, by_ai: bool) -> Result<(), RoomError> {
        if self.engine.is_game_over() {
            return Err(RoomError::GameOver);
        }
        let turn = self.turn();
        let expected = turn.expectation();
        if !by_ai && self.settings.seat(expected.seat).is_ai() {
            return Err(RoomError::ActionNotExpected(format!(
                "seat {} is played by the computer",
                expected.seat
            )));
        }
        turn.check(seat, kind)?;
        if let ActionKind::Move { row, col } = *kind {
            if let Some(reason) =
                pro_violation(&turn, self.settings.width, self.settings.height, row, col)
            {
                return Err(RoomError::IllegalMove(reason.to_string()));
            }
        }
        Ok(())
    }

    /// Applies a validated action: engine first, then log, clock and bus.
    fn commit(&mut self, seat: Seat, kind: ActionKind) -> Result<(), RoomError> {
        let effect = match kind {
            ActionKind::Move { row, col } => Some(self.engine.apply_move(row, col)?),
            ActionKind::SwapDecision { .. } | ActionKind::OpeningChoice { .. } => None,
        };
        let think_time = self.clock.consume_elapsed_into_budget();
        let dropped = self.log.commit(Action {
            seat,
            kind,
            effect,
            timestamp: self.started_at.elapsed(),
            think_time,
        });
        if dropped > 0 {
            tracing::debug!(room_id = %self.room_id, dropped, "redo history discarded");
        }
        self.follow_turn();

        self.publish_state();
        if self.engine.is_game_over() {
            self.publish_game_over();
        }
        Ok(())
    }

    fn handle_act(&mut self, seat: Seat, kind: ActionKind) -> Result<RoomSnapshot, RoomError> {
        let result = self
            .validate(seat, &kind, false)
            .and_then(|()| self.commit(seat, kind));
        match result {
            Ok(()) => Ok(self.snapshot()),
            Err(err) => {
                tracing::debug!(room_id = %self.room_id, %seat, ?kind, error = %err, "action rejected");
                Err(err)
            }
        }
    }

    fn handle_undo(&mut self) -> Result<RoomSnapshot, RoomError> {
        if self.pending.is_some() {
            return Err(RoomError::ResolutionInFlight);
        }
        let action = self.log.peek_undo().ok_or(RoomError::NoMoreUndo)?;
        // A colour exchange is final once anything was logged after it.
        if action.kind.exchanges_colours() && self.log.len() > self.log.cursor() {
            return Err(RoomError::SwapLocked);
        }
        if let Some(effect) = &action.effect {
            self.engine.invert(effect)?;
        }
        self.log.undo()?;
        self.rebuild_clock();
        tracing::debug!(room_id = %self.room_id, cursor = self.log.cursor(), "undo");

        self.publish_state();
        Ok(self.snapshot())
    }

    fn handle_redo(&mut self) -> Result<RoomSnapshot, RoomError> {
        if self.pending.is_some() {
            return Err(RoomError::ResolutionInFlight);
        }
        let action = self.log.peek_redo().ok_or(RoomError::NoMoreRedo)?;
        if let Some(effect) = &action.effect {
            self.engine.reapply(effect)?;
        }
        self.log.redo()?;
        self.rebuild_clock();
        tracing::debug!(room_id = %self.room_id, cursor = self.log.cursor(), "redo");

        self.publish_state();
        if self.engine.is_game_over() {
            self.publish_game_over();
        }
        Ok(self.snapshot())
    }

    fn handle_suggest(&self, seat: Seat, reply: Reply<(usize, usize)>) {
        if self.engine.is_game_over() {
            let _ = reply.send(Err(RoomError::GameOver));
            return;
        }
        let turn = self.turn();
        if turn.expectation().seat == seat {
            if let Some(point) = pro_opening(&turn, self.settings.width, self.settings.height) {
                let _ = reply.send(Ok(point));
                return;
            }
        }
        let stone = turn.colour_of(seat);
        let depth = self
            .settings
            .seat(seat)
            .ai
            .as_ref()
            .map_or(DEFAULT_AI_DEPTH, |ai| ai.depth);
        let budget = SearchBudget {
            depth,
            timeout: self.settings.suggestion_timeout,
        };
        // Off the actor: a slow suggestion must not stall the mailbox.
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let _ = reply.send(search(engine, stone, budget, "suggestion").await);
        });
    }

    fn handle_connect(&mut self, identity: Identity, seat: Seat) -> Result<Seat, RoomError> {
        let binding = self.binding.as_mut().ok_or(BindingError::NotNetworked)?;
        let fresh = binding.connect(identity.clone(), seat)?;
        if fresh {
            self.publish(RoomEventKind::SeatConnected { seat, identity });
        }
        Ok(seat)
    }

    fn handle_disconnect(&mut self, identity: Identity) -> Result<Option<Seat>, RoomError> {
        let binding = self.binding.as_mut().ok_or(BindingError::NotNetworked)?;
        let seat = binding.disconnect(&identity);
        if let Some(seat) = seat {
            self.publish(RoomEventKind::SeatDisconnected { seat, identity });
        }
        Ok(seat)
    }

    // -- AI -----------------------------------------------------------------

    /// Plays AI seats until a human is expected, the game ends, a search
    /// is started or a decision fails.
    fn resolve_pending(&mut self) -> bool {
        let mut progressed = false;
        loop {
            if self.pending.is_some() {
                return progressed;
            }
            let Some(expected) = self.expectation() else {
                return progressed;
            };
            let Some(ai) = self.settings.seat(expected.seat).ai.clone() else {
                return progressed;
            };
            // Networked rooms wait for every human before the computer plays.
            if self.binding.as_ref().is_some_and(|b| !b.is_complete()) {
                return progressed;
            }

            match plan(&self.turn(), self.settings.width, self.settings.height) {
                Plan::Decide(kind) => {
                    let seat = expected.seat;
                    let result = self
                        .validate(seat, &kind, true)
                        .and_then(|()| self.commit(seat, kind));
                    if let Err(err) = result {
                        self.resolution_failed(seat, &err);
                        return progressed;
                    }
                    tracing::debug!(room_id = %self.room_id, %seat, ?kind, "AI decision committed");
                    progressed = true;
                }
                Plan::Search => {
                    let id = self.next_resolution_id;
                    self.next_resolution_id += 1;
                    let stone = self.turn().colour_to_move();
                    tracing::debug!(room_id = %self.room_id, seat = %expected.seat, id, "AI search started");
                    self.pending = Some(spawn_search(
                        id,
                        expected.seat,
                        self.engine.clone(),
                        stone,
                        ai.budget(),
                        self.mailbox.clone(),
                    ));
                    return true;
                }
            }
        }
    }

    fn handle_resolved(&mut self, id: u64, seat: Seat, outcome: Result<(usize, usize), RoomError>) {
        match &self.pending {
            Some(pending) if pending.id == id && pending.seat == seat => {}
            _ => {
                tracing::debug!(room_id = %self.room_id, id, %seat, "stale AI outcome dropped");
                return;
            }
        }
        self.pending = None;

        let result = outcome.and_then(|(row, col)| {
            let kind = ActionKind::Move { row, col };
            self.validate(seat, &kind, true)?;
            self.commit(seat, kind)
        });
        match result {
            Ok(()) => {
                self.resolve_pending();
            }
            Err(err) => self.resolution_failed(seat, &err),
        }
    }

    fn resolution_failed(&self, seat: Seat, err: &RoomError) {
        tracing::warn!(room_id = %self.room_id, %seat, error = %err, "AI resolution failed");
        self.publish(RoomEventKind::ResolutionFailed {
            seat,
            reason: err.to_string(),
        });
    }

    // -- teardown -----------------------------------------------------------

    fn dispose(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(room_id = %self.room_id, id = pending.id, "cancelling AI search");
            pending.cancel();
        }
        self.publish(RoomEventKind::RoomDisposed);
        self.release();
        tracing::info!(room_id = %self.room_id, "room disposed");
    }

    /// Cancels the AI task and drops every bus subscription. Idempotent.
    fn release(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        for token in self.subscriptions.drain(..) {
            self.bus.unsubscribe(token);
        }
    }
}

/// Validates `settings`, spawns a room actor task and returns its handle.
///
/// Must be called from inside a Tokio runtime. `mailbox_size` bounds the
/// command queue; senders wait when it is full.
pub fn spawn_room<E: GameEngine>(
    room_id: RoomId,
    settings: RoomSettings,
    bus: Arc<RoomBus>,
    mailbox_size: usize,
) -> Result<RoomHandle, RoomError> {
    settings.validate()?;
    let (tx, rx) = mpsc::channel(mailbox_size.max(1));

    let actor = RoomActor::<E> {
        room_id: room_id.clone(),
        engine: E::new_game(settings.width, settings.height),
        log: ActionLog::new(),
        clock: Clock::new(settings.clock_config()),
        binding: settings
            .networked
            .then(|| SeatBinding::new(settings.human_seats())),
        pending: None,
        next_resolution_id: 1,
        bus,
        subscriptions: Vec::new(),
        started_at: Instant::now(),
        receiver: rx,
        mailbox: tx.downgrade(),
        settings,
    };

    tokio::spawn(actor.run());

    Ok(RoomHandle {
        room_id,
        sender: tx,
    })
}
