#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for the Sokoban engine: terminal and windowed play,
//! the level editor, level transfer codes and the ranking.

mod config;
mod gui;
mod session;
mod terminal;
mod transfer;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sokoban_core::{Dimensions, Level};
use sokoban_storage::{FileBackend, Storage};
use sokoban_world::levels;
use tracing_subscriber::EnvFilter;

use crate::{
    config::AppConfig,
    gui::EditTarget,
    session::{GameSession, LevelSource},
};

/// Sokoban puzzles in the terminal or in a window.
#[derive(Debug, Parser)]
#[command(name = "sokoban", version)]
struct Cli {
    /// TOML configuration file; `sokoban.toml` is used when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Lists built-in level sets and stored custom levels.
    Levels,
    /// Plays in the terminal.
    Play(PlayArgs),
    /// Plays in a window.
    Gui(PlayArgs),
    /// Continues a saved game.
    Resume {
        /// Identifier printed when the game was saved.
        id: String,
        /// Continue in a window instead of the terminal.
        #[arg(long)]
        gui: bool,
    },
    /// Lists saved games.
    Saves,
    /// Opens the level editor.
    Edit(EditArgs),
    /// Prints the transfer code of a level file.
    Encode {
        /// Level JSON file.
        file: PathBuf,
    },
    /// Decodes a transfer code into level JSON.
    Decode {
        /// Code produced by `encode`.
        code: String,
        /// Write the level here instead of printing it.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Prints the best score of every player.
    Ranking,
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Built-in level set.
    #[arg(long, default_value = "Novice")]
    set: String,
    /// Level JSON file to play instead of a built-in set.
    #[arg(long, conflicts_with = "custom")]
    file: Option<PathBuf>,
    /// Stored custom level to play instead of a built-in set.
    #[arg(long)]
    custom: Option<String>,
    /// Shuffle the levels of the set.
    #[arg(long)]
    shuffle: bool,
    /// Seed for `--shuffle`; random when omitted.
    #[arg(long, requires = "shuffle")]
    seed: Option<u64>,
    /// Player name; defaults to the configured one.
    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Args)]
struct EditArgs {
    /// Level JSON file to start from.
    #[arg(long, conflicts_with = "custom")]
    file: Option<PathBuf>,
    /// Stored custom level to edit.
    #[arg(long)]
    custom: Option<String>,
    /// Name stored with the level.
    #[arg(long)]
    name: Option<String>,
    /// Also write the level JSON here on every save.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Grid width in cells.
    #[arg(long, requires = "height")]
    width: Option<u32>,
    /// Grid height in cells.
    #[arg(long, requires = "width")]
    height: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log_filter);

    let mut storage = Storage::open(&config.storage_dir);
    match cli.command {
        Commands::Levels => list_levels(&mut storage),
        Commands::Play(args) => {
            let session = start_session(&args, &mut storage, &config)?;
            play_in_terminal(session, storage, &config)
        }
        Commands::Gui(args) => {
            let session = start_session(&args, &mut storage, &config)?;
            gui::play(session, storage, &config)
        }
        Commands::Resume { id, gui } => {
            let session = resume_session(&id, &mut storage, &config)?;
            if gui {
                gui::play(session, storage, &config)
            } else {
                play_in_terminal(session, storage, &config)
            }
        }
        Commands::Saves => list_saves(&mut storage),
        Commands::Edit(args) => {
            let target = edit_target(args, &mut storage)?;
            gui::edit(target, storage, &config)
        }
        Commands::Encode { file } => {
            let level = read_level(&file)?;
            println!("{}", transfer::encode(&level)?);
            Ok(())
        }
        Commands::Decode { code, output } => {
            let level = transfer::decode(&code)?;
            let json = serde_json::to_string_pretty(&level)?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display())),
                None => {
                    println!("{json}");
                    Ok(())
                }
            }
        }
        Commands::Ranking => {
            for (place, entry) in storage.ranking()?.standings().iter().enumerate() {
                println!("{:>3}. {:<20} {}", place + 1, entry.name, entry.points);
            }
            Ok(())
        }
    }
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_level(path: &Path) -> Result<Level> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read level file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid level file {}", path.display()))
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "custom".to_owned(), |stem| stem.to_string_lossy().into_owned())
}

fn start_session(
    args: &PlayArgs,
    storage: &mut Storage<FileBackend>,
    config: &AppConfig,
) -> Result<GameSession> {
    let player = args.name.clone().unwrap_or_else(|| config.player.clone());
    if let Some(path) = &args.file {
        let source = LevelSource::Custom {
            name: file_label(path),
        };
        return GameSession::new(source, vec![read_level(path)?], player, config);
    }
    if let Some(id) = &args.custom {
        let custom = storage
            .custom_levels()
            .get(id)?
            .ok_or_else(|| anyhow!("no custom level with id {id}"))?;
        let source = LevelSource::Custom { name: custom.name };
        return GameSession::new(source, vec![custom.level], player, config);
    }

    let seed = args
        .shuffle
        .then(|| args.seed.unwrap_or_else(rand::random));
    GameSession::builtin(&args.set, seed, player, config)
}

fn resume_session(
    id: &str,
    storage: &mut Storage<FileBackend>,
    config: &AppConfig,
) -> Result<GameSession> {
    if let Some(game) = storage.saved_games().get(id)? {
        return GameSession::resume_builtin(game, config);
    }
    if let Some(game) = storage.saved_custom_games().get(id)? {
        return GameSession::resume_custom(game, config);
    }
    bail!("no saved game with id {id}")
}

fn play_in_terminal(
    mut session: GameSession,
    mut storage: Storage<FileBackend>,
    config: &AppConfig,
) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    terminal::run(
        &mut session,
        &mut storage,
        config.animation(),
        stdin.lock(),
        &mut stdout,
    )
}

fn edit_target(args: EditArgs, storage: &mut Storage<FileBackend>) -> Result<EditTarget> {
    let size = args
        .width
        .zip(args.height)
        .map(|(width, height)| Dimensions::new(width, height));

    if let Some(id) = args.custom {
        let custom = storage
            .custom_levels()
            .get(&id)?
            .ok_or_else(|| anyhow!("no custom level with id {id}"))?;
        return Ok(EditTarget {
            name: args.name.unwrap_or(custom.name),
            id: Some(id),
            level: Some(custom.level),
            size,
            output: args.output,
        });
    }

    let (name, level) = match &args.file {
        Some(path) => (file_label(path), Some(read_level(path)?)),
        None => ("untitled".to_owned(), None),
    };
    Ok(EditTarget {
        name: args.name.unwrap_or(name),
        id: None,
        level,
        size,
        output: args.output,
    })
}

fn list_levels(storage: &mut Storage<FileBackend>) -> Result<()> {
    println!("Built-in sets:");
    for set in levels::builtin_sets() {
        println!("  {:<10} {} levels", set.name, set.levels.len());
    }

    let custom = storage.custom_levels().all()?;
    if !custom.is_empty() {
        println!("Custom levels:");
        for record in custom {
            println!(
                "  {}  {} ({}x{})",
                record.id.as_deref().unwrap_or("-"),
                record.name,
                record.level.width(),
                record.level.height()
            );
        }
    }
    Ok(())
}

fn list_saves(storage: &mut Storage<FileBackend>) -> Result<()> {
    for game in storage.saved_games().all()? {
        println!(
            "{}  {} | {} level {} | {} points",
            game.id.as_deref().unwrap_or("-"),
            game.name,
            game.set,
            game.level + 1,
            game.points
        );
    }
    for game in storage.saved_custom_games().all()? {
        println!(
            "{}  {} | custom {}x{}",
            game.id.as_deref().unwrap_or("-"),
            game.name,
            game.level.width(),
            game.level.height()
        );
    }
    Ok(())
}
