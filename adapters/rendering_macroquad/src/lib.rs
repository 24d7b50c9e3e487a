#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Sokoban.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.

mod sprites;

use std::{
    path::PathBuf,
    sync::mpsc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use glam::Vec2;
use macroquad::input::{
    is_key_down, is_key_pressed, is_mouse_button_down, is_mouse_button_pressed,
    is_mouse_button_released, mouse_position, KeyCode, MouseButton,
};
use sokoban_core::{grid::GridFit, AssetKey, Dimensions, Direction, Vector};
use sokoban_rendering::{
    default_palette, AssetManifest, AssetTable, ButtonState, Color, DrawHook, EditorScene,
    FrameInput, Presentation, RenderingBackend, RunnerScene, Scene, SceneSprite, TileFrame,
};

use self::sprites::SpriteAtlas;

const GRID_LINE: Color = Color::new(0.53, 0.53, 0.53, 1.0);
const SELECTION: Color = Color::new(0.3, 0.6, 1.0, 0.35);
const TEXT: Color = Color::new(0.92, 0.92, 0.92, 1.0);
const HUD_HEIGHT: f32 = 32.0;
const SPRITE_GAP: f32 = 0.08;

/// Keys polled once per frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct KeyboardShortcuts {
    quit_requested: bool,
    directions: Vec<Direction>,
    pause_toggle: bool,
    reset: bool,
    save: bool,
    tool_slot: Option<usize>,
    modifier: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        const DIRECTION_KEYS: [(KeyCode, Direction); 8] = [
            (KeyCode::Up, Direction::Up),
            (KeyCode::W, Direction::Up),
            (KeyCode::Down, Direction::Down),
            (KeyCode::S, Direction::Down),
            (KeyCode::Left, Direction::Left),
            (KeyCode::A, Direction::Left),
            (KeyCode::Right, Direction::Right),
            (KeyCode::D, Direction::Right),
        ];
        const TOOL_KEYS: [KeyCode; 5] = [
            KeyCode::Key1,
            KeyCode::Key2,
            KeyCode::Key3,
            KeyCode::Key4,
            KeyCode::Key5,
        ];

        let modifier = is_key_down(KeyCode::LeftControl) || is_key_down(KeyCode::RightControl);
        let directions = if modifier {
            Vec::new()
        } else {
            DIRECTION_KEYS
                .iter()
                .filter(|(key, _)| is_key_pressed(*key))
                .map(|(_, direction)| *direction)
                .collect()
        };

        Self {
            quit_requested: is_key_pressed(KeyCode::Escape),
            directions,
            pause_toggle: is_key_pressed(KeyCode::P),
            reset: is_key_pressed(KeyCode::R),
            save: modifier && is_key_pressed(KeyCode::S),
            tool_slot: TOOL_KEYS.iter().position(|key| is_key_pressed(*key)),
            modifier,
        }
    }
}

/// Rendering backend implemented on top of macroquad.
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
    manifest_path: PathBuf,
    palette: AssetTable<Color>,
    draw_hook: Option<DrawHook>,
}

impl std::fmt::Debug for MacroquadBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroquadBackend")
            .field("swap_interval", &self.swap_interval)
            .field("show_fps", &self.show_fps)
            .field("manifest_path", &self.manifest_path)
            .field("draw_hook", &self.draw_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
            manifest_path: AssetManifest::default_path(),
            palette: default_palette(),
            draw_hook: None,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend prints frame rate metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Reads sprites from the manifest at `path` instead of the default location.
    #[must_use]
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Registers a callback invoked after each runner scene is drawn.
    #[must_use]
    pub fn with_draw_hook(mut self, hook: DrawHook) -> Self {
        self.draw_hook = Some(hook);
        self
    }
}

/// Counts frames presented during the trailing second.
#[derive(Debug)]
struct FpsCounter {
    window_start: Instant,
    frames: u32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
        }
    }
}

impl FpsCounter {
    fn record_frame(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }

        let per_second = f64::from(self.frames) / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = now;
        Some(per_second)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> bool + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
            manifest_path,
            palette,
            mut draw_hook,
        } = self;

        let Presentation {
            window_title,
            window_size,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: i32::try_from(window_size.0).unwrap_or(i32::MAX),
            window_height: i32::try_from(window_size.1).unwrap_or(i32::MAX),
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        let (atlas_init_sender, atlas_init_receiver) = mpsc::channel::<Result<()>>();

        macroquad::Window::from_config(config, async move {
            let atlas = match SpriteAtlas::from_manifest_path(&manifest_path)
                .context("failed to initialise sprite atlas")
            {
                Ok(atlas) => atlas,
                Err(error) => {
                    let _ = atlas_init_sender.send(Err(error));
                    return;
                }
            };
            let _ = atlas_init_sender.send(Ok(()));
            tracing::debug!(textures = atlas.len(), "sprite atlas ready");

            let painter = Painter {
                atlas: &atlas,
                palette: &palette,
            };
            let background = to_macroquad_color(clear_color);
            let mut scene = scene;
            let mut fps_counter = FpsCounter::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }

                macroquad::window::clear_background(background);

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let window = Vec2::new(
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height() - HUD_HEIGHT,
                );
                let input = gather_frame_input(keyboard, window);

                if !update_scene(frame_dt, input, &mut scene) {
                    break;
                }

                match &scene {
                    Scene::Runner(runner) => {
                        painter.draw_runner(runner);
                        if let Some(hook) = draw_hook.as_mut() {
                            hook(runner);
                        }
                    }
                    Scene::Editor(editor) => painter.draw_editor(editor),
                }

                if show_fps {
                    if let Some(per_second) = fps_counter.record_frame(Instant::now()) {
                        println!("FPS: {per_second:.2}");
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        atlas_init_receiver.recv().unwrap_or_else(|_| Ok(()))?;

        Ok(())
    }
}

fn gather_frame_input(keyboard: KeyboardShortcuts, window: Vec2) -> FrameInput {
    let (cursor_x, cursor_y) = mouse_position();
    FrameInput {
        directions: keyboard.directions,
        pause_toggle: keyboard.pause_toggle,
        reset: keyboard.reset,
        save: keyboard.save,
        tool_slot: keyboard.tool_slot,
        cursor: Vec2::new(cursor_x, cursor_y - HUD_HEIGHT),
        primary: button_state(MouseButton::Left),
        secondary: button_state(MouseButton::Right),
        modifier: keyboard.modifier,
        window,
    }
}

fn button_state(button: MouseButton) -> ButtonState {
    ButtonState {
        pressed: is_mouse_button_pressed(button),
        down: is_mouse_button_down(button),
        released: is_mouse_button_released(button),
    }
}

/// Draws scenes below a one-line heads-up display.
struct Painter<'a> {
    atlas: &'a SpriteAtlas,
    palette: &'a AssetTable<Color>,
}

impl Painter<'_> {
    fn draw_runner(&self, scene: &RunnerScene) {
        draw_text(&format!("{}  {}", scene.title, scene.status_line()));
        let Some(dimensions) = scene.dimensions else {
            return;
        };

        let grid = hud_grid(scene.grid);
        self.draw_floor(&grid, dimensions);
        for sprite in &scene.sprites {
            self.draw_sprite(&grid, sprite);
        }
    }

    fn draw_editor(&self, scene: &EditorScene) {
        let tool = scene.tool.unwrap_or("no tool");
        draw_text(&format!(
            "{}x{} | {tool} | 1-5 tools, right drag or ctrl+drag selects, ctrl+s saves",
            scene.dimensions.width, scene.dimensions.height
        ));

        let grid = hud_grid(scene.grid);
        self.draw_floor(&grid, scene.dimensions);
        draw_grid_lines(&grid, scene.dimensions);
        for sprite in &scene.sprites {
            self.draw_sprite(&grid, sprite);
        }
        for cell in &scene.selection {
            fill_cell(&grid, *cell, SELECTION);
        }
        if let Some((min, max)) = scene.rubber_band {
            let origin = grid.cell_origin(Vec2::new(min.x as f32, min.y as f32));
            let end = grid.cell_origin(Vec2::new(max.x as f32 + 1.0, max.y as f32 + 1.0));
            let size = end - origin;
            macroquad::shapes::draw_rectangle_lines(
                origin.x,
                origin.y,
                size.x,
                size.y,
                2.0,
                to_macroquad_color(SELECTION.with_alpha(1.0)),
            );
        }
    }

    fn draw_floor(&self, grid: &GridFit, dimensions: Dimensions) {
        let color = self
            .palette
            .get(AssetKey::Floor)
            .copied()
            .unwrap_or(Color::new(0.0, 0.0, 0.0, 1.0));
        let size = Vec2::new(dimensions.width as f32, dimensions.height as f32) * grid.cell_size;
        macroquad::shapes::draw_rectangle(
            grid.offset.x,
            grid.offset.y,
            size.x,
            size.y,
            to_macroquad_color(color),
        );
    }

    fn draw_sprite(&self, grid: &GridFit, sprite: &SceneSprite) {
        let (origin, side) = sprite.screen_rect(grid);
        let frame = sprite.pose.map(TileFrame::for_pose);
        let white = Color::new(1.0, 1.0, 1.0, 1.0);
        if self.atlas.draw(sprite.asset, origin, side, frame, white) {
            return;
        }

        let Some(color) = self.palette.get(sprite.asset) else {
            return;
        };
        let gap = side * SPRITE_GAP;
        let inset = if sprite.asset == AssetKey::Target {
            side * 0.3
        } else {
            gap
        };
        macroquad::shapes::draw_rectangle(
            origin.x + inset,
            origin.y + inset,
            side - inset * 2.0,
            side - inset * 2.0,
            to_macroquad_color(*color),
        );
    }
}

/// Shifts the grid below the heads-up display.
fn hud_grid(grid: GridFit) -> GridFit {
    GridFit {
        cell_size: grid.cell_size,
        offset: grid.offset + Vec2::new(0.0, HUD_HEIGHT),
    }
}

fn fill_cell(grid: &GridFit, cell: Vector, color: Color) {
    let origin = grid.cell_origin(Vec2::new(cell.x as f32, cell.y as f32));
    macroquad::shapes::draw_rectangle(
        origin.x,
        origin.y,
        grid.cell_size,
        grid.cell_size,
        to_macroquad_color(color),
    );
}

fn draw_grid_lines(grid: &GridFit, dimensions: Dimensions) {
    let color = to_macroquad_color(GRID_LINE);
    for (start, end) in grid_line_segments(grid, dimensions) {
        macroquad::shapes::draw_line(start.x, start.y, end.x, end.y, 1.0, color);
    }
}

/// Inner grid lines; the outer border is left to the floor rectangle.
fn grid_line_segments(grid: &GridFit, dimensions: Dimensions) -> Vec<(Vec2, Vec2)> {
    let extent = Vec2::new(dimensions.width as f32, dimensions.height as f32);
    let columns = (1..dimensions.width).map(|column| {
        let x = column as f32;
        (
            grid.cell_origin(Vec2::new(x, 0.0)),
            grid.cell_origin(Vec2::new(x, extent.y)),
        )
    });
    let rows = (1..dimensions.height).map(|row| {
        let y = row as f32;
        (
            grid.cell_origin(Vec2::new(0.0, y)),
            grid.cell_origin(Vec2::new(extent.x, y)),
        )
    });
    columns.chain(rows).collect()
}

fn draw_text(text: &str) {
    let _ = macroquad::text::draw_text(text, 8.0, HUD_HEIGHT * 0.7, 22.0, to_macroquad_color(TEXT));
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_line_segments_skip_outer_border() {
        let grid = GridFit {
            cell_size: 10.0,
            offset: Vec2::ZERO,
        };
        let segments = grid_line_segments(&grid, Dimensions::new(3, 2));
        assert_eq!(
            segments,
            vec![
                (Vec2::new(10.0, 0.0), Vec2::new(10.0, 20.0)),
                (Vec2::new(20.0, 0.0), Vec2::new(20.0, 20.0)),
                (Vec2::new(0.0, 10.0), Vec2::new(30.0, 10.0)),
            ]
        );
    }

    #[test]
    fn hud_grid_moves_grid_below_status_line() {
        let grid = hud_grid(GridFit {
            cell_size: 12.0,
            offset: Vec2::new(4.0, 6.0),
        });
        assert_eq!(grid.offset, Vec2::new(4.0, 6.0 + HUD_HEIGHT));
        assert_eq!(grid.cell_size, 12.0);
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let start = Instant::now();
        let mut counter = FpsCounter {
            window_start: start,
            frames: 0,
        };
        for frame in 1..60 {
            assert!(counter
                .record_frame(start + Duration::from_millis(frame * 16))
                .is_none());
        }
        let rate = counter
            .record_frame(start + Duration::from_secs(1))
            .expect("a full second elapsed");
        assert!((rate - 60.0).abs() < 1e-9);
    }
}
