use std::{
    io::{BufRead, Write},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use sokoban_core::{Direction, Vector};
use sokoban_storage::{KeyValueBackend, Storage};
use sokoban_world::{query, RunState, World};
use tracing::warn;

use crate::session::{Completion, GameSession};

const HELP: &str = "w/a/s/d or arrows move, p pause, r restart, n/b next/previous level, q save and quit";

/// Single input token of the terminal loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Move(Direction),
    Pause,
    Restart,
    Next,
    Previous,
    Quit,
}

fn parse_line(line: &str) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        let action = match c.to_ascii_lowercase() {
            'w' => Action::Move(Direction::Up),
            'a' => Action::Move(Direction::Left),
            's' => Action::Move(Direction::Down),
            'd' => Action::Move(Direction::Right),
            'p' => Action::Pause,
            'r' => Action::Restart,
            'n' => Action::Next,
            'b' => Action::Previous,
            'q' => Action::Quit,
            '\u{1b}' if chars.peek() == Some(&'[') => {
                let _ = chars.next();
                match chars.next() {
                    Some('A') => Action::Move(Direction::Up),
                    Some('B') => Action::Move(Direction::Down),
                    Some('C') => Action::Move(Direction::Right),
                    Some('D') => Action::Move(Direction::Left),
                    _ => continue,
                }
            }
            _ => continue,
        };
        actions.push(action);
    }
    actions
}

/// Draws the live layout with the usual Sokoban glyphs.
pub(crate) fn render_board(world: &World) -> String {
    let (Some(level), Some(layout)) = (query::level(world), query::layout(world)) else {
        return String::new();
    };

    let mut board = String::new();
    for y in 0..level.height() as i32 {
        for x in 0..level.width() as i32 {
            let cell = Vector::new(x, y);
            let target = layout.targets.contains(&cell);
            let glyph = if layout.start == cell {
                if target {
                    '+'
                } else {
                    '@'
                }
            } else if layout.boxes.contains(&cell) {
                if target {
                    '*'
                } else {
                    '$'
                }
            } else if target {
                '.'
            } else if layout.walls.contains(&cell) {
                '#'
            } else {
                ' '
            };
            board.push(glyph);
        }
        board.push('\n');
    }
    board
}

/// Plays `session` line by line until it is quit, finished or input ends.
///
/// Every move after the first on a line waits out one `step` so the
/// previous animation has settled.
pub(crate) fn run<B, R, W>(
    session: &mut GameSession,
    storage: &mut Storage<B>,
    step: Duration,
    input: R,
    output: &mut W,
) -> Result<()>
where
    B: KeyValueBackend,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{HELP}")?;
    show(session, output)?;

    let mut last_input = Instant::now();
    for line in input.lines() {
        let line = line.context("failed to read input")?;
        let now = Instant::now();
        session.tick(now.duration_since(last_input));
        last_input = now;

        let mut moved = false;
        for action in parse_line(&line) {
            match action {
                Action::Move(direction) => {
                    if moved {
                        session.tick(step);
                    }
                    moved = true;
                    if let Some(completion) = session.step(direction) {
                        report(session, storage, completion, output)?;
                        if !session.next() {
                            writeln!(
                                output,
                                "All levels finished with {} points.",
                                session.points()
                            )?;
                            return Ok(());
                        }
                        moved = false;
                    }
                }
                Action::Pause => session.toggle_pause(),
                Action::Restart => session.restart(),
                Action::Next => {
                    let _ = session.next();
                }
                Action::Previous => {
                    let _ = session.previous();
                }
                Action::Quit => {
                    let id = session.save(storage).context("failed to save game")?;
                    writeln!(output, "Saved as {id}. Resume with `sokoban resume {id}`.")?;
                    return Ok(());
                }
            }
        }
        show(session, output)?;
    }
    Ok(())
}

fn report<B: KeyValueBackend, W: Write>(
    session: &GameSession,
    storage: &mut Storage<B>,
    completion: Completion,
    output: &mut W,
) -> Result<()> {
    let Completion {
        points,
        total,
        stats,
    } = completion;
    writeln!(
        output,
        "Level complete in {:.1}s with {} moves and {} pushes: +{points} points ({total} total).",
        stats.time_ms as f64 / 1000.0,
        stats.moves.player,
        stats.moves.boxes
    )?;
    if let Err(error) = storage.record_score(session.player(), total) {
        warn!(%error, "failed to update ranking");
    }
    Ok(())
}

fn show<W: Write>(session: &GameSession, output: &mut W) -> Result<()> {
    let world = session.world();
    let stats = query::stats(world);
    let state = match query::state(world) {
        RunState::Paused => " (paused)",
        _ => "",
    };
    write!(output, "\n{}{state}\n{}", session.title(), render_board(world))?;
    writeln!(
        output,
        "moves {} | pushes {} | points {}",
        stats.moves.player,
        stats.moves.boxes,
        session.points()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        session::{tests::corridor, LevelSource},
    };
    use sokoban_core::Level;
    use sokoban_storage::MemoryBackend;

    fn session(levels: Vec<Level>) -> GameSession {
        GameSession::new(
            LevelSource::Builtin {
                set: "Novice".into(),
            },
            levels,
            "ada",
            &AppConfig::default(),
        )
        .expect("session")
    }

    fn play(session: &mut GameSession, storage: &mut Storage<MemoryBackend>, script: &str) -> String {
        let mut output = Vec::new();
        run(
            session,
            storage,
            Duration::from_millis(150),
            script.as_bytes(),
            &mut output,
        )
        .expect("terminal loop");
        String::from_utf8(output).expect("utf-8 output")
    }

    #[test]
    fn parses_letters_and_arrow_sequences() {
        assert_eq!(
            parse_line("dW\u{1b}[D?q"),
            vec![
                Action::Move(Direction::Right),
                Action::Move(Direction::Up),
                Action::Move(Direction::Left),
                Action::Quit,
            ]
        );
    }

    #[test]
    fn board_uses_sokoban_glyphs() {
        let session = session(vec![corridor(4)]);
        assert_eq!(render_board(session.world()), "@$ .\n");
    }

    #[test]
    fn finishing_every_level_records_ranking() {
        let mut storage = Storage::in_memory();
        let mut session = session(vec![corridor(3), corridor(4)]);
        let output = play(&mut session, &mut storage, "d\ndd\n");

        assert!(output.contains("All levels finished"), "{output}");
        assert_eq!(output.matches("Level complete").count(), 2);
        let ranking = storage.ranking().expect("ranking");
        assert_eq!(ranking.points_of("ada"), Some(session.points()));
    }

    #[test]
    fn quitting_saves_the_game() {
        let mut storage = Storage::in_memory();
        let mut session = session(vec![corridor(5)]);
        let output = play(&mut session, &mut storage, "d\nq\n");

        assert!(output.contains("Saved as"), "{output}");
        let games = storage.saved_games().all().expect("all");
        assert_eq!(games.len(), 1);
        let saved = games[0].saved.as_ref().expect("unfinished level");
        assert_eq!(saved.layout.boxes, vec![Vector::new(2, 0)]);
    }

    #[test]
    fn paused_sessions_ignore_moves() {
        let mut storage = Storage::in_memory();
        let mut session = session(vec![corridor(5)]);
        let output = play(&mut session, &mut storage, "p\nd\n");

        assert!(output.contains("(paused)"), "{output}");
        assert_eq!(query::player_position(session.world()), Vector::new(0, 0));
    }
}
