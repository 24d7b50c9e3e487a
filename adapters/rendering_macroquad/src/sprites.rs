use std::{fs, path::Path};

use anyhow::{Context, Result};
use glam::Vec2;
use macroquad::{
    math::{Rect, Vec2 as MacroquadVec2},
    texture::{self, DrawTextureParams, Texture2D},
};
use sokoban_core::AssetKey;
use sokoban_rendering::{AssetManifest, AssetTable, Color, TileFrame};

use crate::to_macroquad_color;

/// Textures loaded from the asset manifest.
#[derive(Debug, Default)]
pub(crate) struct SpriteAtlas {
    textures: AssetTable<Texture2D>,
}

impl SpriteAtlas {
    /// Loads the manifest at `path`; a missing file yields an empty atlas.
    pub(crate) fn from_manifest_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read asset manifest at {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let manifest = AssetManifest::parse(&contents, base)
            .with_context(|| format!("invalid asset manifest at {}", path.display()))?;
        Self::from_manifest(&manifest, default_loader)
    }

    fn from_manifest(
        manifest: &AssetManifest,
        mut loader: impl FnMut(AssetKey, &Path) -> Result<Texture2D>,
    ) -> Result<Self> {
        let mut textures = AssetTable::new();
        for (key, path) in manifest.sprites() {
            let texture = loader(key, path).with_context(|| {
                format!("failed to load sprite {key:?} from {}", path.display())
            })?;
            let _ = textures.insert(key, texture);
        }
        Ok(Self { textures })
    }

    /// Number of loaded textures.
    pub(crate) fn len(&self) -> usize {
        self.textures.len()
    }

    /// Draws `key` into the square at `origin`, returning `false` when the
    /// atlas has no texture for it.
    pub(crate) fn draw(
        &self,
        key: AssetKey,
        origin: Vec2,
        side: f32,
        frame: Option<TileFrame>,
        tint: Color,
    ) -> bool {
        let Some(texture) = self.textures.get(key) else {
            return false;
        };

        let source = frame.map(|frame| {
            let (offset, size) = frame.source_rect();
            Rect::new(offset.x, offset.y, size.x, size.y)
        });
        texture::draw_texture_ex(
            *texture,
            origin.x,
            origin.y,
            to_macroquad_color(tint),
            DrawTextureParams {
                dest_size: Some(MacroquadVec2::splat(side)),
                source,
                ..DrawTextureParams::default()
            },
        );
        true
    }
}

fn default_loader(_key: AssetKey, path: &Path) -> Result<Texture2D> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read sprite asset at {}", path.display()))?;
    Ok(Texture2D::from_file_with_format(&bytes, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn atlas_loads_each_manifest_entry_once() {
        let manifest = AssetManifest::parse(
            "version = 1\n[sprites]\nwall = \"wall.png\"\nplayer = \"player.png\"\n",
            Path::new("assets"),
        )
        .expect("manifest");
        let loaded = RefCell::new(Vec::new());
        let atlas = SpriteAtlas::from_manifest(&manifest, |key, path| {
            loaded.borrow_mut().push((key, path.to_path_buf()));
            Ok(Texture2D::empty())
        })
        .expect("atlas");

        assert_eq!(atlas.len(), 2);
        assert_eq!(
            loaded.into_inner(),
            vec![
                (AssetKey::Player, Path::new("assets/player.png").to_path_buf()),
                (AssetKey::Wall, Path::new("assets/wall.png").to_path_buf()),
            ]
        );
    }

    #[test]
    fn atlas_reports_loader_failures() {
        let manifest =
            AssetManifest::parse("version = 1\n[sprites]\nbox = \"box.png\"\n", Path::new("."))
                .expect("manifest");
        let result = SpriteAtlas::from_manifest(&manifest, |_, _| anyhow::bail!("boom"));
        assert!(result.is_err());
    }

    #[test]
    fn missing_manifest_yields_empty_atlas() {
        let atlas = SpriteAtlas::from_manifest_path(Path::new("does/not/exist.toml"))
            .expect("missing manifest is not an error");
        assert_eq!(atlas.len(), 0);
    }
}
