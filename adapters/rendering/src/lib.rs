#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Sokoban adapters.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result as AnyResult;
use glam::Vec2;
use serde::Deserialize;
use sokoban_core::{
    grid::GridFit, AssetKey, Dimensions, Direction, PlayerPose, Stance, Stats, Vector,
};
use thiserror::Error;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with a different alpha channel.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Explicit mapping from asset keys to drawable handles.
///
/// Adapters build one table per backend and hand it to whatever draws the
/// scene; there is no process-wide asset registry.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetTable<T> {
    entries: BTreeMap<AssetKey, T>,
}

impl<T> Default for AssetTable<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> AssetTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle` under `key`, returning the handle it replaced.
    pub fn insert(&mut self, key: AssetKey, handle: T) -> Option<T> {
        self.entries.insert(key, handle)
    }

    /// Resolves `key` to its handle.
    #[must_use]
    pub fn get(&self, key: AssetKey) -> Option<&T> {
        self.entries.get(&key)
    }

    /// Reports whether `key` has a handle.
    #[must_use]
    pub fn contains(&self, key: AssetKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of stored handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> FromIterator<(AssetKey, T)> for AssetTable<T> {
    fn from_iter<I: IntoIterator<Item = (AssetKey, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Flat colors used for assets that have no sprite.
#[must_use]
pub fn default_palette() -> AssetTable<Color> {
    [
        (AssetKey::Player, Color::from_rgb_u8(52, 120, 246)),
        (AssetKey::Box, Color::from_rgb_u8(196, 140, 72)),
        (AssetKey::Target, Color::from_rgb_u8(230, 76, 60)),
        (AssetKey::Wall, Color::from_rgb_u8(90, 90, 100)),
        (AssetKey::Floor, Color::from_rgb_u8(34, 36, 42)),
    ]
    .into_iter()
    .collect()
}

/// Manifest format version understood by [`AssetManifest::parse`].
pub const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Errors raised while reading an asset manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest is not valid TOML or names an unknown asset.
    #[error("failed to parse asset manifest: {0}")]
    Parse(#[from] toml::de::Error),
    /// The manifest declares a version this crate does not understand.
    #[error("unsupported asset manifest version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version declared by the manifest.
        found: u32,
        /// Version this crate supports.
        expected: u32,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    version: u32,
    #[serde(default)]
    sprites: BTreeMap<AssetKey, String>,
}

/// Sprite files keyed by asset, resolved against the manifest directory.
///
/// Assets missing from the manifest are drawn with flat colors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetManifest {
    sprites: BTreeMap<AssetKey, PathBuf>,
}

impl AssetManifest {
    /// Default manifest location relative to the working directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from("assets/manifest.toml")
    }

    /// Parses manifest `contents`, resolving paths relative to `base`.
    pub fn parse(contents: &str, base: &Path) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(contents)?;
        if raw.version != SUPPORTED_MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: raw.version,
                expected: SUPPORTED_MANIFEST_VERSION,
            });
        }

        Ok(Self {
            sprites: raw
                .sprites
                .into_iter()
                .map(|(key, relative)| (key, base.join(relative)))
                .collect(),
        })
    }

    /// Sprite files in asset order.
    pub fn sprites(&self) -> impl Iterator<Item = (AssetKey, &Path)> + '_ {
        self.sprites.iter().map(|(key, path)| (*key, path.as_path()))
    }
}

/// Side length in pixels of one frame of the player tileset.
pub const PLAYER_TILE_SIZE: f32 = 64.0;

/// Frame of the player tileset: stance selects the column, facing the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileFrame {
    /// Zero-based column.
    pub column: u32,
    /// Zero-based row.
    pub row: u32,
}

impl TileFrame {
    /// Tileset frame showing `pose`.
    #[must_use]
    pub const fn for_pose(pose: PlayerPose) -> Self {
        let column = match pose.stance {
            Stance::Idle => 0,
            Stance::LeftLeg => 1,
            Stance::RightLeg => 2,
        };
        let row = match pose.facing {
            Direction::Down => 0,
            Direction::Up => 1,
            Direction::Right => 2,
            Direction::Left => 3,
        };
        Self { column, row }
    }

    /// Source rectangle of the frame in tileset pixels as `(origin, size)`.
    #[must_use]
    pub fn source_rect(&self) -> (Vec2, Vec2) {
        (
            Vec2::new(self.column as f32, self.row as f32) * PLAYER_TILE_SIZE,
            Vec2::splat(PLAYER_TILE_SIZE),
        )
    }
}

/// Drawable element positioned in cell units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSprite {
    /// Asset used to draw the element.
    pub asset: AssetKey,
    /// Upper-left corner in cell units; fractional while sliding.
    pub position: Vec2,
    /// Player pose, absent for every other asset.
    pub pose: Option<PlayerPose>,
}

impl SceneSprite {
    /// Sprite resting on `cell`.
    #[must_use]
    pub fn at_cell(asset: AssetKey, cell: Vector) -> Self {
        Self {
            asset,
            position: Vec2::new(cell.x as f32, cell.y as f32),
            pose: None,
        }
    }

    /// Screen rectangle of the sprite as `(origin, side)`.
    #[must_use]
    pub fn screen_rect(&self, grid: &GridFit) -> (Vec2, f32) {
        (grid.cell_origin(self.position), grid.cell_size)
    }
}

/// Snapshot of a game in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct RunnerScene {
    /// Caption shown above the grid.
    pub title: String,
    /// Level dimensions; `None` before a level is loaded.
    pub dimensions: Option<Dimensions>,
    /// Cell size and offset for the current window.
    pub grid: GridFit,
    /// Elements in draw order.
    pub sprites: Vec<SceneSprite>,
    /// Statistics of the current attempt.
    pub stats: Stats,
    /// Whether input is paused.
    pub paused: bool,
    /// Whether every target is covered.
    pub finished: bool,
}

impl RunnerScene {
    /// Scene shown before any level is loaded.
    #[must_use]
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            dimensions: None,
            grid: GridFit::EMPTY,
            sprites: Vec::new(),
            stats: Stats::default(),
            paused: false,
            finished: false,
        }
    }

    /// One-line status summary.
    #[must_use]
    pub fn status_line(&self) -> String {
        let state = if self.finished {
            " | completed"
        } else if self.paused {
            " | paused"
        } else {
            ""
        };
        format!(
            "time {:.1}s | moves {} | pushes {}{state}",
            self.stats.time_ms as f64 / 1000.0,
            self.stats.moves.player,
            self.stats.moves.boxes
        )
    }
}

/// Snapshot of the level editor.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorScene {
    /// Grid dimensions.
    pub dimensions: Dimensions,
    /// Cell size and offset for the current window.
    pub grid: GridFit,
    /// Placed elements, start included.
    pub sprites: Vec<SceneSprite>,
    /// Selected cells, drawn with a translucent highlight.
    pub selection: Vec<Vector>,
    /// Rubber band in progress as inclusive `(min, max)` cells.
    pub rubber_band: Option<(Vector, Vector)>,
    /// Name of the active tool.
    pub tool: Option<&'static str>,
    /// Editor revision the scene was built from.
    pub revision: u64,
}

/// Scene handed to a backend each frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Scene {
    /// A game in progress.
    Runner(RunnerScene),
    /// The level editor.
    Editor(EditorScene),
}

impl Scene {
    /// Grid placement of the scene.
    #[must_use]
    pub fn grid(&self) -> GridFit {
        match self {
            Self::Runner(scene) => scene.grid,
            Self::Editor(scene) => scene.grid,
        }
    }
}

/// Callback invoked after the entities of a runner scene are drawn.
pub type DrawHook = Box<dyn FnMut(&RunnerScene)>;

/// Per-frame state of a pointer button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Pressed during this frame.
    pub pressed: bool,
    /// Held down.
    pub down: bool,
    /// Released during this frame.
    pub released: bool,
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Directions requested this frame, in press order.
    pub directions: Vec<Direction>,
    /// Pause toggle requested.
    pub pause_toggle: bool,
    /// Reset requested.
    pub reset: bool,
    /// Save requested.
    pub save: bool,
    /// Zero-based toolbar slot selected with a number key.
    pub tool_slot: Option<usize>,
    /// Cursor position in window pixels.
    pub cursor: Vec2,
    /// Primary pointer button.
    pub primary: ButtonState,
    /// Secondary pointer button.
    pub secondary: ButtonState,
    /// Selection modifier key held.
    pub modifier: bool,
    /// Window size in pixels.
    pub window: Vec2,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Initial window size in pixels.
    pub window_size: (u32, u32),
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(
        window_title: T,
        window_size: (u32, u32),
        clear_color: Color,
        scene: Scene,
    ) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            window_size,
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Sokoban scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and the
    /// per-frame input captured by the adapter, and may mutate the scene
    /// before it is rendered. Returning `false` closes the window.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> bool + 'static;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sokoban_core::MoveCounts;

    #[test]
    fn lighten_moves_channels_towards_white() {
        let color = Color::new(0.0, 0.5, 1.0, 0.25).lighten(0.5);
        assert_eq!(color, Color::new(0.5, 0.75, 1.0, 0.25));
    }

    #[test]
    fn default_palette_covers_every_asset() {
        let palette = default_palette();
        for key in [
            AssetKey::Player,
            AssetKey::Box,
            AssetKey::Target,
            AssetKey::Wall,
            AssetKey::Floor,
        ] {
            assert!(palette.contains(key), "{key:?} missing");
        }
    }

    #[test]
    fn asset_table_replaces_handles() {
        let mut table = AssetTable::new();
        assert_eq!(table.insert(AssetKey::Box, 1), None);
        assert_eq!(table.insert(AssetKey::Box, 2), Some(1));
        assert_eq!(table.get(AssetKey::Box), Some(&2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn manifest_resolves_paths_relative_to_base_directory() {
        let manifest = r#"
            version = 1

            [sprites]
            player = "player.png"
            box = "crates/box.png"
        "#;
        let parsed = AssetManifest::parse(manifest, Path::new("assets")).expect("manifest");
        let sprites: Vec<_> = parsed.sprites().collect();
        assert_eq!(
            sprites,
            vec![
                (AssetKey::Player, Path::new("assets/player.png")),
                (AssetKey::Box, Path::new("assets/crates/box.png")),
            ]
        );
    }

    #[test]
    fn manifest_rejects_unknown_assets_and_versions() {
        let unknown = "version = 1\n[sprites]\nghost = \"ghost.png\"\n";
        assert!(matches!(
            AssetManifest::parse(unknown, Path::new(".")),
            Err(ManifestError::Parse(_))
        ));

        let future = "version = 2\n";
        assert!(matches!(
            AssetManifest::parse(future, Path::new(".")),
            Err(ManifestError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn player_frames_follow_tileset_layout() {
        let frame = TileFrame::for_pose(PlayerPose {
            facing: Direction::Right,
            stance: Stance::RightLeg,
        });
        assert_eq!(frame, TileFrame { column: 2, row: 2 });
        assert_eq!(
            frame.source_rect(),
            (Vec2::new(128.0, 128.0), Vec2::splat(64.0))
        );
    }

    #[test]
    fn sprite_rect_uses_grid_offset() {
        let grid = GridFit {
            cell_size: 10.0,
            offset: Vec2::new(5.0, 7.0),
        };
        let sprite = SceneSprite::at_cell(AssetKey::Wall, Vector::new(2, 3));
        assert_eq!(sprite.screen_rect(&grid), (Vec2::new(25.0, 37.0), 10.0));
    }

    #[test]
    fn status_line_reports_state() {
        let mut scene = RunnerScene::empty("Novice 1");
        scene.stats = Stats {
            time_ms: 2_500,
            moves: MoveCounts {
                player: 7,
                boxes: 2,
            },
        };
        scene.finished = true;
        assert_eq!(
            scene.status_line(),
            "time 2.5s | moves 7 | pushes 2 | completed"
        );
    }
}
