//! Integration tests for rooms, driven through `RoomHandle` and
//! `RoomRegistry` with the freestyle engine and a few faulty wrappers.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use gomoku_engine::{EngineError, FreestyleEngine, GameEngine, MoveEffect, SearchBudget};
use gomoku_protocol::{
    ActionType, Identity, RoomId, RoomPhase, RuleStyle, Seat, Stone, Swap2Choice,
};
use gomoku_room::{
    spawn_room, AiConfig, RegistryConfig, RoomBus, RoomError, RoomEvent, RoomEventKind,
    RoomHandle, RoomRegistry, RoomSettings, SeatConfig, Topic, ValidationError,
};
use gomoku_session::BindingError;
use tokio::sync::mpsc;

// =========================================================================
// Faulty engines: freestyle rules, misbehaving search.
// =========================================================================

trait Fault: 'static {
    fn suggest(
        engine: &FreestyleEngine,
        stone: Stone,
        budget: &SearchBudget,
    ) -> Result<(usize, usize), EngineError>;
}

struct Faulty<F> {
    inner: FreestyleEngine,
    _fault: PhantomData<fn() -> F>,
}

impl<F> Clone for Faulty<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _fault: PhantomData,
        }
    }
}

impl<F: Fault> GameEngine for Faulty<F> {
    type Effect = MoveEffect;

    fn new_game(width: usize, height: usize) -> Self {
        Self {
            inner: FreestyleEngine::new_game(width, height),
            _fault: PhantomData,
        }
    }

    fn width(&self) -> usize {
        self.inner.width()
    }

    fn height(&self) -> usize {
        self.inner.height()
    }

    fn apply_move(&mut self, row: usize, col: usize) -> Result<MoveEffect, EngineError> {
        self.inner.apply_move(row, col)
    }

    fn invert(&mut self, effect: &MoveEffect) -> Result<(), EngineError> {
        self.inner.invert(effect)
    }

    fn reapply(&mut self, effect: &MoveEffect) -> Result<(), EngineError> {
        self.inner.reapply(effect)
    }

    fn board_snapshot(&self) -> Vec<Vec<Stone>> {
        self.inner.board_snapshot()
    }

    fn is_game_over(&self) -> bool {
        self.inner.is_game_over()
    }

    fn winner(&self) -> Option<Stone> {
        self.inner.winner()
    }

    fn score_of(&self, stone: Stone) -> u32 {
        self.inner.score_of(stone)
    }

    fn suggest_move(
        &self,
        stone: Stone,
        budget: &SearchBudget,
    ) -> Result<(usize, usize), EngineError> {
        F::suggest(&self.inner, stone, budget)
    }
}

/// Never finds a move.
struct Refuses;

impl Fault for Refuses {
    fn suggest(_: &FreestyleEngine, stone: Stone, _: &SearchBudget) -> Result<(usize, usize), EngineError> {
        Err(EngineError::NoLegalMove(stone))
    }
}

/// Thinks for 300ms, then answers normally.
struct Sleeps;

impl Fault for Sleeps {
    fn suggest(
        engine: &FreestyleEngine,
        stone: Stone,
        budget: &SearchBudget,
    ) -> Result<(usize, usize), EngineError> {
        std::thread::sleep(Duration::from_millis(300));
        engine.suggest_move(stone, budget)
    }
}

struct Panics;

impl Fault for Panics {
    fn suggest(_: &FreestyleEngine, _: Stone, _: &SearchBudget) -> Result<(usize, usize), EngineError> {
        panic!("search exploded");
    }
}

// =========================================================================
// Helpers
// =========================================================================

const WAIT: Duration = Duration::from_secs(30);

fn pvp(rule_style: RuleStyle) -> RoomSettings {
    RoomSettings::local_pvp(19, rule_style)
}

fn human_vs_ai() -> RoomSettings {
    RoomSettings {
        seats: [SeatConfig::human(), SeatConfig::ai(2)],
        ..RoomSettings::default()
    }
}

fn ai_with_timeout(timeout: Duration) -> SeatConfig {
    SeatConfig {
        ai: Some(AiConfig {
            depth: 2,
            search_timeout: timeout,
        }),
    }
}

fn open_room<E: GameEngine>(settings: RoomSettings) -> (RoomHandle, Arc<RoomBus>) {
    let bus = Arc::new(RoomBus::new());
    let handle = spawn_room::<E>(RoomId("TEST01".into()), settings, Arc::clone(&bus), 16)
        .expect("valid settings");
    (handle, bus)
}

async fn listen(handle: &RoomHandle, topic: Topic) -> mpsc::UnboundedReceiver<RoomEventKind> {
    let (tx, rx) = mpsc::unbounded_channel();
    handle
        .subscribe(topic, move |event: &RoomEvent| {
            let _ = tx.send(event.kind.clone());
            Ok(())
        })
        .await
        .unwrap();
    rx
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<RoomEventKind>) -> RoomEventKind {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Waits for a `StateChanged` whose cursor reached `cursor`.
async fn wait_for_cursor(rx: &mut mpsc::UnboundedReceiver<RoomEventKind>, cursor: usize) {
    loop {
        if let RoomEventKind::StateChanged(snapshot) = next_event(rx).await {
            if snapshot.cursor >= cursor {
                return;
            }
        }
    }
}

// =========================================================================
// Turn order and the action log
// =========================================================================

#[tokio::test]
async fn test_first_move_then_undo() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));

    let state = room.make_move(Seat::One, 9, 9).await.unwrap();
    assert_eq!(state.board[9][9], Stone::Black);
    assert_eq!(state.next_seat, Some(Seat::Two));
    assert_eq!(state.next_action, Some(ActionType::Move));
    assert_eq!(state.action_log, vec!["Player 1 played BLACK at 99".to_string()]);

    let state = room.undo().await.unwrap();
    assert_eq!(state.cursor, 0);
    assert_eq!(state.board[9][9], Stone::Empty);
    assert_eq!(state.next_seat, Some(Seat::One));
    // The undone move stays redoable and visible in the log.
    assert_eq!(state.action_log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_seat_is_rejected_without_changes() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    let before = room.get_state().await.unwrap();

    let err = room.make_move(Seat::Two, 9, 9).await.unwrap_err();
    assert_eq!(err, RoomError::ActionNotExpected("Not your turn".into()));

    let err = room.swap(Seat::One, true).await.unwrap_err();
    assert!(matches!(err, RoomError::ActionNotExpected(_)));

    assert_eq!(room.get_state().await.unwrap(), before);
}

#[tokio::test]
async fn test_occupied_cell_is_an_engine_error() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    room.make_move(Seat::One, 9, 9).await.unwrap();

    let err = room.make_move(Seat::Two, 9, 9).await.unwrap_err();
    assert_eq!(err, RoomError::Engine(EngineError::Occupied { row: 9, col: 9 }));
    assert_eq!(room.get_state().await.unwrap().cursor, 1);
}

#[tokio::test]
async fn test_undo_redo_restores_identical_state() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::Two, 3, 3).await.unwrap();
    let played = room.make_move(Seat::One, 9, 10).await.unwrap();

    for _ in 0..3 {
        room.undo().await.unwrap();
    }
    assert_eq!(room.undo().await.unwrap_err(), RoomError::NoMoreUndo);
    let empty = room.get_state().await.unwrap();
    assert!(empty.board.iter().flatten().all(|s| *s == Stone::Empty));

    for _ in 0..3 {
        room.redo().await.unwrap();
    }
    assert_eq!(room.redo().await.unwrap_err(), RoomError::NoMoreRedo);

    let replayed = room.get_state().await.unwrap();
    assert_eq!(replayed.board, played.board);
    assert_eq!(replayed.next_seat, played.next_seat);
    assert_eq!(replayed.action_log, played.action_log);
}

#[tokio::test]
async fn test_undo_restores_captured_stones_and_scores() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    room.make_move(Seat::One, 0, 0).await.unwrap();
    room.make_move(Seat::Two, 0, 1).await.unwrap();
    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::Two, 0, 2).await.unwrap();

    let state = room.make_move(Seat::One, 0, 3).await.unwrap();
    assert_eq!(state.board[0][1], Stone::Empty);
    assert_eq!(state.board[0][2], Stone::Empty);
    assert_eq!(state.seat(Seat::One).score, 2);
    assert_eq!(state.seat(Seat::Two).score, 0);

    let state = room.undo().await.unwrap();
    assert_eq!(state.board[0][1], Stone::White);
    assert_eq!(state.board[0][2], Stone::White);
    assert_eq!(state.seat(Seat::One).score, 0);

    for _ in 0..4 {
        room.undo().await.unwrap();
    }
    let state = room.get_state().await.unwrap();
    assert!(state.board.iter().flatten().all(|s| *s == Stone::Empty));
    assert_eq!(state.seat(Seat::One).score, 0);
    assert_eq!(state.seat(Seat::Two).score, 0);
    assert!(!state.is_game_over);

    for _ in 0..5 {
        room.redo().await.unwrap();
    }
    let state = room.get_state().await.unwrap();
    assert_eq!(state.board[0][1], Stone::Empty);
    assert_eq!(state.seat(Seat::One).score, 2);
}

#[tokio::test]
async fn test_new_action_discards_redo_history() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::Two, 3, 3).await.unwrap();
    room.undo().await.unwrap();

    let state = room.make_move(Seat::Two, 4, 4).await.unwrap();
    assert_eq!(state.cursor, 2);
    assert_eq!(state.action_log.len(), 2);
    assert_eq!(state.board[3][3], Stone::Empty);
    assert_eq!(room.redo().await.unwrap_err(), RoomError::NoMoreRedo);
}

#[tokio::test]
async fn test_game_over_blocks_moves_until_undone() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    let mut over = listen(&room, Topic::GameOver).await;

    for col in 0..4 {
        room.make_move(Seat::One, 0, col).await.unwrap();
        room.make_move(Seat::Two, 9, col).await.unwrap();
    }
    let state = room.make_move(Seat::One, 0, 4).await.unwrap();
    assert!(state.is_game_over);
    assert_eq!(state.winner, Some(Seat::One));
    assert_eq!(state.next_seat, None);
    assert_eq!(state.phase, RoomPhase::Finished);
    assert_eq!(next_event(&mut over).await, RoomEventKind::GameOver { winner: Some(Seat::One) });

    let err = room.make_move(Seat::Two, 9, 4).await.unwrap_err();
    assert_eq!(err, RoomError::GameOver);

    let state = room.undo().await.unwrap();
    assert!(!state.is_game_over);
    assert_eq!(state.winner, None);
    assert_eq!(state.next_seat, Some(Seat::One));
}

// =========================================================================
// Rule styles
// =========================================================================

#[tokio::test]
async fn test_pro_opening_constraints() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Pro));

    let err = room.make_move(Seat::One, 0, 0).await.unwrap_err();
    assert_eq!(err, RoomError::IllegalMove("Stone should be in the middle".into()));
    room.make_move(Seat::One, 9, 9).await.unwrap();

    let err = room.make_move(Seat::Two, 10, 11).await.unwrap_err();
    assert!(matches!(err, RoomError::IllegalMove(_)));
    room.make_move(Seat::Two, 9, 12).await.unwrap();

    // Only the first two stones are constrained.
    room.make_move(Seat::One, 10, 10).await.unwrap();
}

#[tokio::test]
async fn test_swap_exchanges_colours() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Swap));

    room.make_move(Seat::One, 9, 9).await.unwrap();
    let state = room.make_move(Seat::One, 9, 10).await.unwrap();
    assert_eq!(state.board[9][10], Stone::White);
    assert_eq!(state.next_seat, Some(Seat::Two));
    assert_eq!(state.next_action, Some(ActionType::SwapDecision));

    let err = room.make_move(Seat::Two, 5, 5).await.unwrap_err();
    assert!(matches!(err, RoomError::ActionNotExpected(_)));

    let state = room.swap(Seat::Two, true).await.unwrap();
    assert_eq!(state.seat(Seat::Two).color, Stone::Black);
    assert_eq!(state.seat(Seat::One).color, Stone::White);
    // Third stone is black: seat 2 now owns it.
    assert_eq!(state.next_seat, Some(Seat::Two));
    assert_eq!(state.action_log[2], "Player 2 swapped colors");
}

#[tokio::test]
async fn test_declined_swap_keeps_colours() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Swap));
    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::One, 9, 10).await.unwrap();

    let state = room.swap(Seat::Two, false).await.unwrap();
    assert_eq!(state.seat(Seat::One).color, Stone::Black);
    assert_eq!(state.next_seat, Some(Seat::One));
}

#[tokio::test]
async fn test_swap_is_locked_once_later_actions_exist() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Swap));
    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::One, 9, 10).await.unwrap();
    room.swap(Seat::Two, true).await.unwrap();

    // The swap is the newest entry: it can be taken back.
    let state = room.undo().await.unwrap();
    assert_eq!(state.next_action, Some(ActionType::SwapDecision));
    room.redo().await.unwrap();

    room.make_move(Seat::Two, 3, 3).await.unwrap();
    room.undo().await.unwrap();
    assert_eq!(room.undo().await.unwrap_err(), RoomError::SwapLocked);

    let state = room.get_state().await.unwrap();
    assert_eq!(state.cursor, 3);
    assert_eq!(state.seat(Seat::Two).color, Stone::Black);
}

#[tokio::test]
async fn test_swap2_place_two_flow() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Swap2));
    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::One, 9, 10).await.unwrap();
    let state = room.make_move(Seat::One, 10, 9).await.unwrap();
    assert_eq!(state.next_seat, Some(Seat::Two));
    assert_eq!(state.next_action, Some(ActionType::OpeningChoice));

    let state = room.choose_opening(Seat::Two, Swap2Choice::PlaceTwo).await.unwrap();
    assert_eq!(state.next_seat, Some(Seat::Two));
    assert_eq!(state.next_action, Some(ActionType::Move));

    room.make_move(Seat::Two, 5, 5).await.unwrap();
    let state = room.make_move(Seat::Two, 5, 6).await.unwrap();
    assert_eq!(state.next_seat, Some(Seat::One));
    assert_eq!(state.next_action, Some(ActionType::SwapDecision));

    let state = room.swap(Seat::One, true).await.unwrap();
    assert_eq!(state.seat(Seat::One).color, Stone::White);
    assert_eq!(state.seat(Seat::Two).color, Stone::Black);
    // Sixth stone is white.
    assert_eq!(state.next_seat, Some(Seat::One));
    assert_eq!(state.next_action, Some(ActionType::Move));
}

#[tokio::test]
async fn test_swap2_take_black() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Swap2));
    for (row, col) in [(9, 9), (9, 10), (10, 9)] {
        room.make_move(Seat::One, row, col).await.unwrap();
    }

    let state = room.choose_opening(Seat::Two, Swap2Choice::TakeBlack).await.unwrap();
    assert_eq!(state.seat(Seat::Two).color, Stone::Black);
    assert_eq!(state.next_seat, Some(Seat::One));
    assert_eq!(state.action_log[3], "Player 2 took black");
}

// =========================================================================
// AI seats
// =========================================================================

#[tokio::test]
async fn test_ai_answers_a_human_move() {
    let (room, _bus) = open_room::<FreestyleEngine>(human_vs_ai());
    let mut changes = listen(&room, Topic::StateChanged).await;

    let state = room.make_move(Seat::One, 9, 9).await.unwrap();
    assert_eq!(state.next_seat, Some(Seat::Two));
    assert!(state.has_pending_action);

    wait_for_cursor(&mut changes, 2).await;
    let state = room.get_state().await.unwrap();
    assert_eq!(state.next_seat, Some(Seat::One));
    assert!(!state.has_pending_action);
    assert!(!state.resolution_in_flight);
    assert_eq!(state.board.iter().flatten().filter(|s| **s == Stone::White).count(), 1);
}

#[tokio::test]
async fn test_humans_cannot_act_for_the_ai() {
    let (room, _bus) = open_room::<Faulty<Sleeps>>(human_vs_ai());
    room.make_move(Seat::One, 9, 9).await.unwrap();

    let err = room.make_move(Seat::Two, 3, 3).await.unwrap_err();
    assert!(matches!(err, RoomError::ActionNotExpected(_)));
    let err = room.swap(Seat::Two, true).await.unwrap_err();
    assert!(matches!(err, RoomError::ActionNotExpected(_)));
    let err = room
        .choose_opening(Seat::Two, Swap2Choice::TakeBlack)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::ActionNotExpected(_)));
    assert_eq!(room.undo().await.unwrap_err(), RoomError::ResolutionInFlight);
    assert_eq!(room.redo().await.unwrap_err(), RoomError::ResolutionInFlight);

    let state = room.get_state().await.unwrap();
    assert!(state.resolution_in_flight);
    assert_eq!(state.cursor, 1);

    // A second trigger while searching starts nothing.
    assert!(!room.resolve_pending().await.unwrap());
}

#[tokio::test]
async fn test_ai_is_not_started_at_creation() {
    let settings = RoomSettings {
        seats: [SeatConfig::ai(2), SeatConfig::human()],
        ..RoomSettings::default()
    };
    let (room, _bus) = open_room::<FreestyleEngine>(settings);
    let mut changes = listen(&room, Topic::StateChanged).await;

    assert!(room.has_pending_action().await.unwrap());
    let state = room.get_state().await.unwrap();
    assert_eq!(state.cursor, 0);
    assert!(!state.resolution_in_flight);

    assert!(room.resolve_pending().await.unwrap());
    wait_for_cursor(&mut changes, 1).await;
    let state = room.get_state().await.unwrap();
    assert_eq!(state.board[9][9], Stone::Black);
    assert_eq!(state.next_seat, Some(Seat::Two));
}

#[tokio::test]
async fn test_ai_vs_ai_plays_to_the_end() {
    let settings = RoomSettings {
        width: 10,
        height: 10,
        seats: [SeatConfig::ai(2), SeatConfig::ai(2)],
        ..RoomSettings::default()
    };
    let (room, _bus) = open_room::<FreestyleEngine>(settings);
    let mut over = listen(&room, Topic::GameOver).await;

    assert!(room.resolve_pending().await.unwrap());
    assert!(matches!(next_event(&mut over).await, RoomEventKind::GameOver { .. }));

    let state = room.get_state().await.unwrap();
    assert!(state.is_game_over);
    assert_eq!(state.next_seat, None);
    assert!(!state.has_pending_action);
    assert!(!room.resolve_pending().await.unwrap());
}

#[tokio::test]
async fn test_ai_takes_black_at_swap_decision() {
    let settings = RoomSettings {
        rule_style: RuleStyle::Swap,
        ..human_vs_ai()
    };
    let (room, _bus) = open_room::<FreestyleEngine>(settings);
    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::One, 9, 10).await.unwrap();

    // The decision is instant, so it is in place before the next read.
    let state = room.get_state().await.unwrap();
    assert_eq!(state.cursor, 3);
    assert_eq!(state.seat(Seat::Two).color, Stone::Black);
    assert_eq!(state.next_seat, Some(Seat::Two));
    assert!(state.has_pending_action);
}

#[tokio::test]
async fn test_ai_takes_black_at_swap2_choice() {
    let settings = RoomSettings {
        rule_style: RuleStyle::Swap2,
        ..human_vs_ai()
    };
    let (room, _bus) = open_room::<FreestyleEngine>(settings);
    for (row, col) in [(9, 9), (9, 10), (10, 9)] {
        room.make_move(Seat::One, row, col).await.unwrap();
    }

    let state = room.get_state().await.unwrap();
    assert_eq!(state.cursor, 4);
    assert_eq!(state.seat(Seat::Two).color, Stone::Black);
    assert_eq!(state.next_seat, Some(Seat::One));
    assert!(!state.has_pending_action);
}

#[tokio::test]
async fn test_ai_plays_legal_pro_opening() {
    let settings = RoomSettings {
        rule_style: RuleStyle::Pro,
        ..human_vs_ai()
    };
    let (room, _bus) = open_room::<FreestyleEngine>(settings);
    room.make_move(Seat::One, 9, 9).await.unwrap();

    let state = room.get_state().await.unwrap();
    assert_eq!(state.cursor, 2);
    assert_eq!(state.board[9][12], Stone::White);
    assert_eq!(state.next_seat, Some(Seat::One));
}

#[tokio::test]
async fn test_engine_failure_is_published_and_recoverable() {
    let (room, _bus) = open_room::<Faulty<Refuses>>(human_vs_ai());
    let mut failures = listen(&room, Topic::ResolutionFailed).await;

    room.make_move(Seat::One, 9, 9).await.unwrap();
    let RoomEventKind::ResolutionFailed { seat, reason } = next_event(&mut failures).await else {
        panic!("expected ResolutionFailed");
    };
    assert_eq!(seat, Seat::Two);
    assert!(reason.contains("no legal move"), "{reason}");

    let state = room.get_state().await.unwrap();
    assert_eq!(state.cursor, 1);
    assert!(state.has_pending_action);
    assert!(!state.resolution_in_flight);

    // The room stays usable: undo works and the AI can be retried.
    assert!(room.resolve_pending().await.unwrap());
    next_event(&mut failures).await;
    room.undo().await.unwrap();
}

#[tokio::test]
async fn test_search_timeout_is_a_resolution_failure() {
    let settings = RoomSettings {
        seats: [SeatConfig::human(), ai_with_timeout(Duration::from_millis(50))],
        ..RoomSettings::default()
    };
    let (room, _bus) = open_room::<Faulty<Sleeps>>(settings);
    let mut failures = listen(&room, Topic::ResolutionFailed).await;

    room.make_move(Seat::One, 9, 9).await.unwrap();
    let RoomEventKind::ResolutionFailed { reason, .. } = next_event(&mut failures).await else {
        panic!("expected ResolutionFailed");
    };
    assert_eq!(reason, "search timed out");
    assert_eq!(room.get_state().await.unwrap().cursor, 1);
}

#[tokio::test]
async fn test_panicking_search_is_contained() {
    let (room, _bus) = open_room::<Faulty<Panics>>(human_vs_ai());
    let mut failures = listen(&room, Topic::ResolutionFailed).await;

    room.make_move(Seat::One, 9, 9).await.unwrap();
    let RoomEventKind::ResolutionFailed { reason, .. } = next_event(&mut failures).await else {
        panic!("expected ResolutionFailed");
    };
    assert!(reason.starts_with("engine failure"), "{reason}");

    // The actor survived.
    assert_eq!(room.get_state().await.unwrap().cursor, 1);
}

// =========================================================================
// Suggestions
// =========================================================================

#[tokio::test]
async fn test_suggestion_does_not_change_state() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));

    assert_eq!(room.request_suggestion(Seat::One).await.unwrap(), (9, 9));
    let state = room.get_state().await.unwrap();
    assert_eq!(state.cursor, 0);
    assert_eq!(state.board[9][9], Stone::Empty);
}

#[tokio::test]
async fn test_pro_suggestions_are_playable() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Pro));

    let (row, col) = room.request_suggestion(Seat::One).await.unwrap();
    assert_eq!((row, col), (9, 9));
    room.make_move(Seat::One, row, col).await.unwrap();

    let (row, col) = room.request_suggestion(Seat::Two).await.unwrap();
    assert!(row.abs_diff(9).max(col.abs_diff(9)) >= 3, "({row}, {col})");
    let state = room.make_move(Seat::Two, row, col).await.unwrap();
    assert_eq!(state.board[row][col], Stone::White);

    // Past the constrained stones the engine searches near the stones.
    let (row, col) = room.request_suggestion(Seat::One).await.unwrap();
    room.make_move(Seat::One, row, col).await.unwrap();
}

#[tokio::test]
async fn test_suggestion_timeout() {
    let settings = RoomSettings {
        suggestion_timeout: Duration::from_millis(50),
        ..pvp(RuleStyle::Standard)
    };
    let (room, _bus) = open_room::<Faulty<Sleeps>>(settings);

    let err = room.request_suggestion(Seat::One).await.unwrap_err();
    assert_eq!(err, RoomError::Timeout("suggestion"));
}

// =========================================================================
// Clock
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_clock_charges_and_rolls_back() {
    let settings = RoomSettings {
        total_time: Some(Duration::from_secs(60)),
        ..pvp(RuleStyle::Standard)
    };
    let (room, _bus) = open_room::<FreestyleEngine>(settings);
    room.get_state().await.unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    room.make_move(Seat::One, 9, 9).await.unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;
    let state = room.make_move(Seat::Two, 3, 3).await.unwrap();

    assert_eq!(state.seat(Seat::One).time.elapsed_ms, 5_000);
    assert_eq!(state.seat(Seat::Two).time.elapsed_ms, 3_000);
    assert_eq!(state.seat(Seat::One).time.remaining_ms, Some(55_000));

    let state = room.undo().await.unwrap();
    assert_eq!(state.seat(Seat::One).time.elapsed_ms, 5_000);
    assert_eq!(state.seat(Seat::Two).time.elapsed_ms, 0);
    assert_eq!(state.seat(Seat::Two).time.remaining_ms, Some(60_000));

    let state = room.redo().await.unwrap();
    assert_eq!(state.seat(Seat::Two).time.elapsed_ms, 3_000);
}

#[tokio::test]
async fn test_unlimited_clock_reports_no_remaining_time() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    let state = room.get_state().await.unwrap();
    assert_eq!(state.seat(Seat::One).time.remaining_ms, None);
}

// =========================================================================
// Events and disposal
// =========================================================================

#[tokio::test]
async fn test_turn_expected_follows_state_changes() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Swap));
    let mut turns = listen(&room, Topic::TurnExpected).await;

    room.make_move(Seat::One, 9, 9).await.unwrap();
    room.make_move(Seat::One, 9, 10).await.unwrap();

    assert_eq!(
        next_event(&mut turns).await,
        RoomEventKind::TurnExpected { seat: Seat::One, action: ActionType::Move }
    );
    assert_eq!(
        next_event(&mut turns).await,
        RoomEventKind::TurnExpected { seat: Seat::Two, action: ActionType::SwapDecision }
    );
}

#[tokio::test]
async fn test_subscriptions_only_see_their_room() {
    let mut registry = RoomRegistry::<FreestyleEngine>::new();
    let a_id = registry.create_room(pvp(RuleStyle::Standard)).unwrap();
    let b_id = registry.create_room(pvp(RuleStyle::Standard)).unwrap();
    let (a, b) = (registry.get(&a_id).unwrap(), registry.get(&b_id).unwrap());
    let mut changes = listen(&a, Topic::StateChanged).await;

    b.make_move(Seat::One, 0, 0).await.unwrap();
    a.make_move(Seat::One, 9, 9).await.unwrap();

    let RoomEventKind::StateChanged(snapshot) = next_event(&mut changes).await else {
        panic!("expected StateChanged");
    };
    assert_eq!(&snapshot.room_id, a.room_id());
    assert_eq!(snapshot.board[9][9], Stone::Black);
}

#[tokio::test]
async fn test_failing_subscriber_does_not_affect_the_room() {
    let (room, bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    room.subscribe(Topic::StateChanged, |_: &RoomEvent| Err("listener broke".into()))
        .await
        .unwrap();
    room.subscribe(Topic::StateChanged, |_: &RoomEvent| panic!("listener panicked"))
        .await
        .unwrap();

    let state = room.make_move(Seat::One, 9, 9).await.unwrap();
    assert_eq!(state.cursor, 1);
    assert_eq!(bus.subscriber_count(&Topic::StateChanged), 3);
}

#[tokio::test]
async fn test_unsubscribe_only_removes_own_tokens() {
    let (room, bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    let token = room.subscribe(Topic::GameOver, |_: &RoomEvent| Ok(())).await.unwrap();
    let foreign = bus.subscribe(Topic::GameOver, |_: &RoomEvent| Ok(()));

    assert!(room.unsubscribe(token).await.unwrap());
    assert!(!room.unsubscribe(token).await.unwrap());
    assert!(!room.unsubscribe(foreign).await.unwrap());
    assert_eq!(bus.subscriber_count(&Topic::GameOver), 1);
}

#[tokio::test]
async fn test_dispose_releases_everything() {
    let mut registry = RoomRegistry::<Faulty<Sleeps>>::new();
    let room_id = registry.create_room(human_vs_ai()).unwrap();
    let room = registry.get(&room_id).unwrap();
    let mut disposed = listen(&room, Topic::RoomDisposed).await;
    assert!(!registry.bus().is_empty());

    // Leave a search in flight.
    room.make_move(Seat::One, 9, 9).await.unwrap();
    registry.dispose_room(&room_id).await.unwrap();

    assert_eq!(next_event(&mut disposed).await, RoomEventKind::RoomDisposed);
    assert!(registry.bus().is_empty());
    assert!(room.is_closed());
    assert_eq!(
        room.get_state().await.unwrap_err(),
        RoomError::Unavailable(room_id.clone())
    );
    assert_eq!(registry.get(&room_id).unwrap_err(), RoomError::NotFound(room_id.clone()));
    assert_eq!(
        registry.dispose_room(&room_id).await.unwrap_err(),
        RoomError::NotFound(room_id)
    );
}

// =========================================================================
// Networked rooms
// =========================================================================

fn networked_pvp() -> RoomSettings {
    RoomSettings {
        networked: true,
        ..pvp(RuleStyle::Standard)
    }
}

#[tokio::test]
async fn test_networked_room_waits_for_both_players() {
    let (room, _bus) = open_room::<FreestyleEngine>(networked_pvp());
    let alice = Identity::new("alice");
    let bob = Identity::new("bob");

    assert_eq!(room.connect(alice.clone(), Seat::One).await.unwrap(), Seat::One);
    assert_eq!(room.available_seats().await.unwrap(), vec![Seat::Two]);

    let state = room.get_state().await.unwrap();
    assert_eq!(state.phase, RoomPhase::WaitingForPlayers);
    assert!(state.seat(Seat::One).connected);
    assert!(!state.seat(Seat::Two).connected);

    let err = room.make_move_as(&alice, 9, 9).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::RoomNotReady));

    let err = room.connect(bob.clone(), Seat::One).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::SeatTaken(Seat::One)));
    room.connect(bob.clone(), Seat::Two).await.unwrap();
    assert_eq!(room.get_state().await.unwrap().phase, RoomPhase::InProgress);

    let err = room.make_move_as(&bob, 9, 9).await.unwrap_err();
    assert_eq!(err, RoomError::ActionNotExpected("Not your turn".into()));
    let state = room.make_move_as(&alice, 9, 9).await.unwrap();
    assert_eq!(state.next_seat, Some(Seat::Two));

    let err = room.make_move_as(&Identity::new("carol"), 3, 3).await.unwrap_err();
    assert!(matches!(err, RoomError::Binding(BindingError::NotSeated(_))));
}

#[tokio::test]
async fn test_history_edits_need_a_seated_player() {
    let (room, _bus) = open_room::<FreestyleEngine>(networked_pvp());
    let alice = Identity::new("alice");
    let bob = Identity::new("bob");
    let mallory = Identity::new("mallory");
    room.connect(alice.clone(), Seat::One).await.unwrap();
    room.connect(bob.clone(), Seat::Two).await.unwrap();
    room.make_move_as(&alice, 7, 7).await.unwrap();

    let err = room.undo_as(&mallory).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::NotSeated(mallory.clone())));
    assert_eq!(room.get_state().await.unwrap().cursor, 1);

    let state = room.undo_as(&bob).await.unwrap();
    assert_eq!(state.cursor, 0);
    let err = room.redo_as(&mallory).await.unwrap_err();
    assert!(matches!(err, RoomError::Binding(BindingError::NotSeated(_))));
    assert_eq!(room.redo_as(&alice).await.unwrap().cursor, 1);

    assert_eq!(room.seat_of(&bob).await.unwrap(), Some(Seat::Two));
    assert_eq!(room.seat_of(&mallory).await.unwrap(), None);

    // A half-empty room freezes its history.
    room.disconnect(&bob).await.unwrap();
    let err = room.undo_as(&alice).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::RoomNotReady));
}

#[tokio::test]
async fn test_disconnect_frees_the_seat() {
    let (room, _bus) = open_room::<FreestyleEngine>(networked_pvp());
    let mut left = listen(&room, Topic::SeatDisconnected).await;
    let alice = Identity::new("alice");
    room.connect(alice.clone(), Seat::One).await.unwrap();
    room.connect(Identity::new("bob"), Seat::Two).await.unwrap();

    assert_eq!(room.disconnect(&alice).await.unwrap(), Some(Seat::One));
    assert_eq!(room.disconnect(&alice).await.unwrap(), None);
    assert_eq!(
        next_event(&mut left).await,
        RoomEventKind::SeatDisconnected { seat: Seat::One, identity: alice }
    );

    let state = room.get_state().await.unwrap();
    assert_eq!(state.phase, RoomPhase::WaitingForPlayers);
    assert_eq!(room.available_seats().await.unwrap(), vec![Seat::One]);
}

#[tokio::test]
async fn test_local_rooms_reject_seat_binding() {
    let (room, _bus) = open_room::<FreestyleEngine>(pvp(RuleStyle::Standard));
    let err = room.connect(Identity::new("alice"), Seat::One).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::NotNetworked));
    let err = room.make_move_as(&Identity::new("alice"), 9, 9).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::NotNetworked));
    let err = room.undo_as(&Identity::new("alice")).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::NotNetworked));
    let err = room.seat_of(&Identity::new("alice")).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::NotNetworked));
}

#[tokio::test]
async fn test_networked_ai_starts_once_humans_are_seated() {
    let settings = RoomSettings {
        networked: true,
        seats: [SeatConfig::ai(2), SeatConfig::human()],
        ..RoomSettings::default()
    };
    let (room, _bus) = open_room::<FreestyleEngine>(settings);
    let mut changes = listen(&room, Topic::StateChanged).await;

    assert!(!room.resolve_pending().await.unwrap());
    let err = room.connect(Identity::new("bob"), Seat::One).await.unwrap_err();
    assert_eq!(err, RoomError::Binding(BindingError::SeatUnavailable(Seat::One)));

    room.connect(Identity::new("bob"), Seat::Two).await.unwrap();
    wait_for_cursor(&mut changes, 1).await;
    let state = room.get_state().await.unwrap();
    assert!(state.seat(Seat::One).connected);
    assert_eq!(state.next_seat, Some(Seat::Two));
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_registry_codes_and_listing() {
    let mut registry = RoomRegistry::<FreestyleEngine>::with_config(RegistryConfig {
        room_code_length: 6,
        ..RegistryConfig::default()
    });
    let local = registry.create_room(pvp(RuleStyle::Standard)).unwrap();
    let open = registry.create_room(networked_pvp()).unwrap();

    assert_eq!(open.0.len(), 6);
    assert!(open.0.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_ne!(local, open);
    assert_eq!(registry.room_count(), 2);

    let rooms = registry.list_rooms().await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_id, open);
    assert_eq!(rooms[0].available_seats, vec![Seat::One, Seat::Two]);

    registry.shutdown().await;
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn test_registry_rejects_invalid_settings() {
    let mut registry = RoomRegistry::<FreestyleEngine>::new();
    let err = registry.create_room(RoomSettings::local_pvp(9, RuleStyle::Standard)).unwrap_err();
    assert_eq!(
        err,
        RoomError::Validation(ValidationError::BoardSize { width: 9, height: 9 })
    );
    assert_eq!(registry.room_count(), 0);
}
