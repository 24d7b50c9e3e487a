use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use glam::Vec2;
use sokoban_core::{AssetKey, Dimensions, Direction, Level, PlayerPose, Stance};
use sokoban_rendering::{
    Color, DrawHook, EditorScene, FrameInput, Presentation, RenderingBackend, RunnerScene, Scene,
    SceneSprite,
};
use sokoban_rendering_macroquad::MacroquadBackend;
use sokoban_storage::{CustomLevel, KeyValueBackend, Storage};
use sokoban_system_editor::{Editor, Tool};
use sokoban_world::{query, RunState};
use tracing::{info, warn};

use crate::{config::AppConfig, session::GameSession};

const BACKGROUND: Color = Color::from_rgb_u8(18, 18, 24);
/// Time a completed level stays on screen before the next one loads.
const ADVANCE_DELAY: Duration = Duration::from_millis(1500);
const RESTING_POSE: PlayerPose = PlayerPose {
    facing: Direction::Down,
    stance: Stance::Idle,
};

fn backend(config: &AppConfig) -> MacroquadBackend {
    let backend = MacroquadBackend::new()
        .with_vsync(config.window.vsync)
        .with_show_fps(config.window.show_fps);
    match &config.window.manifest {
        Some(path) => backend.with_manifest_path(path.clone()),
        None => backend,
    }
}

/// Snapshot of the session for drawing.
pub(crate) fn runner_scene(session: &GameSession) -> RunnerScene {
    let world = session.world();
    RunnerScene {
        title: session.title(),
        dimensions: query::level(world).map(Level::dimensions),
        grid: query::grid_fit(world),
        sprites: query::actors(world)
            .into_iter()
            .map(|actor| SceneSprite {
                asset: actor.asset,
                position: actor.draw_position,
                pose: actor.pose,
            })
            .collect(),
        stats: query::stats(world),
        paused: query::state(world) == RunState::Paused,
        finished: query::is_finished(world),
    }
}

/// Snapshot of the editor for drawing.
pub(crate) fn editor_scene(editor: &Editor) -> EditorScene {
    let layout = editor.layout();
    let mut sprites: Vec<SceneSprite> = layout
        .walls
        .iter()
        .map(|cell| SceneSprite::at_cell(AssetKey::Wall, *cell))
        .chain(
            layout
                .targets
                .iter()
                .map(|cell| SceneSprite::at_cell(AssetKey::Target, *cell)),
        )
        .chain(
            layout
                .boxes
                .iter()
                .map(|cell| SceneSprite::at_cell(AssetKey::Box, *cell)),
        )
        .collect();
    sprites.push(SceneSprite {
        pose: Some(RESTING_POSE),
        ..SceneSprite::at_cell(AssetKey::Player, layout.start)
    });

    EditorScene {
        dimensions: editor.size(),
        grid: editor.grid_fit(),
        sprites,
        selection: editor.selection().cells().to_vec(),
        rubber_band: editor.selection_rect().map(|span| (span.min, span.max)),
        tool: editor.current_tool().map(|tool| tool.name()),
        revision: editor.revision(),
    }
}

fn completion_logger() -> DrawHook {
    let mut reported = false;
    Box::new(move |scene: &RunnerScene| {
        if scene.finished && !reported {
            info!(
                title = %scene.title,
                time_ms = scene.stats.time_ms,
                moves = scene.stats.moves.player,
                pushes = scene.stats.moves.boxes,
                "level finished"
            );
        }
        reported = scene.finished;
    })
}

/// Runner state that lives inside the frame loop.
struct RunnerLoop<B> {
    session: GameSession,
    storage: Storage<B>,
    canvas: Vec2,
    advance_in: Option<Duration>,
}

impl<B: KeyValueBackend> RunnerLoop<B> {
    fn frame(&mut self, dt: Duration, input: FrameInput) {
        if input.window != self.canvas {
            self.canvas = input.window;
            self.session.resize(self.canvas.x, self.canvas.y);
        }
        if input.pause_toggle {
            self.session.toggle_pause();
        }
        if input.reset {
            self.session.restart();
            self.advance_in = None;
        }
        if input.save {
            if let Err(error) = self.session.save(&mut self.storage) {
                warn!(%error, "failed to save game");
            }
        }

        for direction in input.directions {
            if let Some(completion) = self.session.step(direction) {
                if let Err(error) = self
                    .storage
                    .record_score(self.session.player(), completion.total)
                {
                    warn!(%error, "failed to update ranking");
                }
                self.advance_in = Some(ADVANCE_DELAY);
            }
        }
        self.session.tick(dt);

        if let Some(remaining) = self.advance_in {
            let remaining = remaining.saturating_sub(dt);
            self.advance_in = (!remaining.is_zero()).then_some(remaining);
            if self.advance_in.is_none() && !self.session.next() {
                info!(points = self.session.points(), "all levels finished");
            }
        }
    }
}

/// Plays `session` in a window.
pub(crate) fn play<B>(session: GameSession, storage: Storage<B>, config: &AppConfig) -> Result<()>
where
    B: KeyValueBackend + 'static,
{
    let presentation = Presentation::new(
        "Sokoban",
        (config.window.width, config.window.height),
        BACKGROUND,
        Scene::Runner(runner_scene(&session)),
    );
    let mut state = RunnerLoop {
        session,
        storage,
        canvas: Vec2::ZERO,
        advance_in: None,
    };

    backend(config)
        .with_draw_hook(completion_logger())
        .run(presentation, move |dt, input, scene| {
            state.frame(dt, input);
            *scene = Scene::Runner(runner_scene(&state.session));
            true
        })
}

/// Editor state that lives inside the frame loop.
struct EditorLoop<B> {
    editor: Editor,
    storage: Storage<B>,
    name: String,
    level_id: Option<String>,
    output: Option<PathBuf>,
    canvas: Vec2,
    selecting: bool,
}

impl<B: KeyValueBackend> EditorLoop<B> {
    fn frame(&mut self, input: &FrameInput) {
        if input.window != self.canvas {
            self.canvas = input.window;
            self.editor.update_dimensions(self.canvas);
        }
        if let Some(tool) = input.tool_slot.and_then(|slot| Tool::ALL.get(slot)) {
            self.editor.set_current_tool(*tool);
        }
        self.pointer(input);
        if input.save {
            match self.save() {
                Ok(id) => info!(id = %id, "level saved"),
                Err(error) => warn!(error = %format!("{error:#}"), "failed to save level"),
            }
        }
    }

    fn pointer(&mut self, input: &FrameInput) {
        let cursor = input.cursor;
        if input.secondary.pressed || (input.primary.pressed && input.modifier) {
            self.editor.on_selection_start(cursor);
            self.selecting = true;
            return;
        }

        if self.selecting {
            if input.secondary.released || input.primary.released {
                self.editor.on_selection_end(cursor);
                self.selecting = false;
            } else {
                self.editor.on_selection_move(cursor);
            }
            return;
        }

        if input.primary.pressed {
            self.editor.on_cell_drag_start(cursor);
        }
        if input.primary.down {
            let _ = self.editor.on_cell_drag(cursor);
        }
    }

    /// Stores the level and mirrors it to the output file, if any.
    fn save(&mut self) -> Result<String> {
        let level = self.editor.level().context("edited level is invalid")?;
        if let Some(path) = &self.output {
            let json = serde_json::to_string_pretty(&level)?;
            fs::write(path, json)
                .with_context(|| format!("failed to write level to {}", path.display()))?;
        }

        let id = self.storage.custom_levels().save(CustomLevel {
            id: self.level_id.clone(),
            name: self.name.clone(),
            level,
        })?;
        self.level_id = Some(id.clone());
        Ok(id)
    }
}

/// Custom level opened in the editor.
#[derive(Debug)]
pub(crate) struct EditTarget {
    pub(crate) name: String,
    pub(crate) id: Option<String>,
    pub(crate) level: Option<Level>,
    pub(crate) size: Option<Dimensions>,
    pub(crate) output: Option<PathBuf>,
}

/// Opens the level editor in a window.
pub(crate) fn edit<B>(target: EditTarget, storage: Storage<B>, config: &AppConfig) -> Result<()>
where
    B: KeyValueBackend + 'static,
{
    let mut editor = Editor::new();
    if let Some(level) = &target.level {
        editor.load_level(level);
    }
    if let Some(size) = target.size {
        editor.update_grid_size(size);
    }
    editor.set_current_tool(Tool::WALL_BUILDER);

    let presentation = Presentation::new(
        format!("Sokoban editor: {}", target.name),
        (config.window.width, config.window.height),
        BACKGROUND,
        Scene::Editor(editor_scene(&editor)),
    );
    let mut state = EditorLoop {
        editor,
        storage,
        name: target.name,
        level_id: target.id,
        output: target.output,
        canvas: Vec2::ZERO,
        selecting: false,
    };

    backend(config).run(presentation, move |_, input, scene| {
        let revision = state.editor.revision();
        let canvas = state.canvas;
        state.frame(&input);
        if state.editor.revision() != revision || state.canvas != canvas {
            *scene = Scene::Editor(editor_scene(&state.editor));
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{tests::corridor, LevelSource};
    use sokoban_core::Vector;
    use sokoban_rendering::ButtonState;
    use sokoban_storage::MemoryBackend;

    fn canvas() -> Vec2 {
        Vec2::new(500.0, 500.0)
    }

    fn click(cursor: Vec2) -> FrameInput {
        FrameInput {
            cursor,
            primary: ButtonState {
                pressed: true,
                down: true,
                released: false,
            },
            window: canvas(),
            ..FrameInput::default()
        }
    }

    fn editor_loop() -> EditorLoop<MemoryBackend> {
        EditorLoop {
            editor: Editor::new(),
            storage: Storage::in_memory(),
            name: "corner".into(),
            level_id: None,
            output: None,
            canvas: Vec2::ZERO,
            selecting: false,
        }
    }

    fn runner_loop(levels: Vec<Level>) -> RunnerLoop<MemoryBackend> {
        let session = GameSession::new(
            LevelSource::Builtin {
                set: "Novice".into(),
            },
            levels,
            "ada",
            &AppConfig::default(),
        )
        .expect("session");
        RunnerLoop {
            session,
            storage: Storage::in_memory(),
            canvas: Vec2::ZERO,
            advance_in: None,
        }
    }

    #[test]
    fn runner_scene_lists_actors_in_draw_order() {
        let state = runner_loop(vec![corridor(4)]);
        let scene = runner_scene(&state.session);
        let assets: Vec<_> = scene.sprites.iter().map(|sprite| sprite.asset).collect();
        assert_eq!(assets, vec![AssetKey::Target, AssetKey::Box, AssetKey::Player]);
        assert!(scene.sprites[2].pose.is_some());
        assert_eq!(scene.title, "Novice 1/1");
    }

    #[test]
    fn completed_levels_advance_after_delay() {
        let mut state = runner_loop(vec![corridor(3), corridor(4)]);
        let push = FrameInput {
            directions: vec![Direction::Right],
            window: canvas(),
            ..FrameInput::default()
        };
        state.frame(Duration::from_millis(16), push);
        assert!(query::is_finished(state.session.world()));
        assert_eq!(
            state.storage.ranking().expect("ranking").points_of("ada"),
            Some(state.session.points())
        );

        state.frame(Duration::from_millis(1000), FrameInput::default());
        assert_eq!(state.session.title(), "Novice 1/2");
        state.frame(Duration::from_millis(600), FrameInput::default());
        assert_eq!(state.session.title(), "Novice 2/2");
        assert!(!query::is_finished(state.session.world()));
    }

    #[test]
    fn number_keys_pick_tools_and_clicks_stamp() {
        let mut state = editor_loop();
        state.frame(&FrameInput {
            tool_slot: Some(0),
            window: canvas(),
            ..FrameInput::default()
        });
        assert_eq!(state.editor.current_tool(), Some(Tool::BOX_BUILDER));

        state.frame(&click(Vec2::new(50.0, 50.0)));
        assert_eq!(state.editor.layout().boxes, vec![Vector::new(0, 0)]);

        let scene = editor_scene(&state.editor);
        assert_eq!(scene.tool, Some("Box builder"));
        assert_eq!(scene.sprites.last().map(|sprite| sprite.asset), Some(AssetKey::Player));
    }

    #[test]
    fn modifier_click_drives_rubber_band_selection() {
        let mut state = editor_loop();
        state.editor.set_current_tool(Tool::WALL_BUILDER);
        state.frame(&click(Vec2::new(150.0, 150.0)));
        assert_eq!(state.editor.layout().walls, vec![Vector::new(1, 1)]);

        state.frame(&FrameInput {
            modifier: true,
            ..click(Vec2::new(10.0, 10.0))
        });
        assert!(state.selecting);
        state.frame(&FrameInput {
            cursor: Vec2::new(260.0, 260.0),
            primary: ButtonState {
                pressed: false,
                down: false,
                released: true,
            },
            window: canvas(),
            ..FrameInput::default()
        });
        assert!(!state.selecting);
        assert_eq!(
            state.editor.selection().cells(),
            &[Vector::new(1, 1), Vector::new(2, 2)]
        );
    }

    #[test]
    fn saving_reuses_the_custom_level_id() {
        let mut state = editor_loop();
        state.frame(&FrameInput {
            window: canvas(),
            ..FrameInput::default()
        });
        let first = state.save().expect("save");
        let second = state.save().expect("save");
        assert_eq!(first, second);

        let levels = state.storage.custom_levels().all().expect("all");
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].name, "corner");
        assert_eq!(levels[0].level.layout().start, Vector::new(2, 2));
    }
}
