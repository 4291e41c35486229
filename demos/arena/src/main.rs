//! Computer-vs-computer arena on the freestyle engine.
//!
//! ```text
//! arena [rule-style 0-3] [board-size] [matches]
//! RUST_LOG=gomoku_room=debug arena 2 15 3
//! ```

use std::time::Duration;

use gomoku::prelude::*;
use tokio::sync::mpsc;

/// Longest a single match may run.
const MATCH_LIMIT: Duration = Duration::from_secs(120);

const AI_DEPTH: u32 = 2;

enum Outcome {
    Finished(Option<Seat>),
    Failed(String),
}

fn render(board: &[Vec<Stone>]) -> String {
    board
        .iter()
        .map(|row| {
            row.iter()
                .map(|stone| match stone {
                    Stone::Black => 'X',
                    Stone::White => 'O',
                    Stone::Empty => '.',
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn play(
    registry: &mut RoomRegistry<FreestyleEngine>,
    settings: RoomSettings,
) -> Result<Option<Outcome>, Box<dyn std::error::Error>> {
    let room_id = registry.create_room(settings)?;
    let room = registry.get(&room_id)?;

    let (tx, mut outcomes) = mpsc::unbounded_channel();
    let over = tx.clone();
    room.subscribe(Topic::GameOver, move |event: &RoomEvent| {
        if let RoomEventKind::GameOver { winner } = &event.kind {
            let _ = over.send(Outcome::Finished(*winner));
        }
        Ok(())
    })
    .await?;
    room.subscribe(Topic::ResolutionFailed, move |event: &RoomEvent| {
        if let RoomEventKind::ResolutionFailed { reason, .. } = &event.kind {
            let _ = tx.send(Outcome::Failed(reason.clone()));
        }
        Ok(())
    })
    .await?;

    room.resolve_pending().await?;
    let outcome = tokio::time::timeout(MATCH_LIMIT, outcomes.recv())
        .await
        .ok()
        .flatten();

    let state = room.get_state().await?;
    for line in &state.action_log {
        tracing::debug!(%room_id, "{line}");
    }
    println!("{}\n", render(&state.board));

    registry.dispose_room(&room_id).await?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gomoku::telemetry::init();

    let mut args = std::env::args().skip(1);
    let rule_style = match args.next() {
        Some(arg) => RuleStyle::try_from(arg.parse::<u8>()?)?,
        None => RuleStyle::Standard,
    };
    let size: usize = args.next().map(|arg| arg.parse()).transpose()?.unwrap_or(15);
    let matches: u32 = args.next().map(|arg| arg.parse()).transpose()?.unwrap_or(1);

    tracing::info!(%rule_style, size, matches, "arena starting");

    let mut registry = RoomRegistry::<FreestyleEngine>::new();
    let mut tally = [0u32; 2];
    let mut draws = 0;

    for round in 1..=matches {
        let settings = RoomSettings {
            width: size,
            height: size,
            rule_style,
            seats: [SeatConfig::ai(AI_DEPTH), SeatConfig::ai(AI_DEPTH)],
            ..RoomSettings::default()
        };
        match play(&mut registry, settings).await? {
            Some(Outcome::Finished(Some(seat))) => {
                tally[seat.index()] += 1;
                tracing::info!(round, %seat, "match won");
            }
            Some(Outcome::Finished(None)) => {
                draws += 1;
                tracing::info!(round, "match drawn");
            }
            Some(Outcome::Failed(reason)) => {
                tracing::warn!(round, %reason, "match abandoned");
            }
            None => tracing::warn!(round, "match did not finish in time"),
        }
    }

    tracing::info!(
        seat_1 = tally[0],
        seat_2 = tally[1],
        draws,
        "arena finished"
    );
    Ok(())
}
