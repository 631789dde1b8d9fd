use crate::model::{TerrainKind, TerrainTile};
use crate::viewport::Viewport;

/// Food value a fully grown grass tile reports; resource color interpolation
/// is normalized against this.
pub const MAX_GRASS_FOOD: f64 = 10.0;

/// Holds the last fetched tile snapshot for the active viewport, row-major.
/// Replaced wholesale on fetch, never patched; invalidated only on explicit
/// viewport changes.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    viewport: Viewport,
    tiles: Vec<TerrainTile>,
}

impl TerrainGrid {
    /// An empty grid for a freshly selected viewport. Off-world or not yet
    /// fetched cells render as background.
    pub fn seeded(viewport: Viewport) -> Self {
        Self {
            viewport,
            tiles: Vec::new(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Replaces the snapshot. A response shorter than w*h keeps whatever
    /// prefix arrived; lookups past the end just miss.
    pub fn replace(&mut self, viewport: Viewport, tiles: Vec<TerrainTile>) {
        self.viewport = viewport;
        self.tiles = tiles;
    }

    pub fn tile_at_cell(&self, col: u32, row: u32) -> Option<&TerrainTile> {
        if col >= self.viewport.width || row >= self.viewport.height {
            return None;
        }
        let index = row as usize * self.viewport.width as usize + col as usize;
        self.tiles.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Rendered as the background where no tile data exists.
pub const BACKGROUND: Rgb = Rgb(12, 12, 16);

fn base_color(kind: TerrainKind) -> Rgb {
    match kind {
        TerrainKind::Water => Rgb(36, 98, 188),
        TerrainKind::Grass => Rgb(72, 132, 60),
        TerrainKind::Dirt => Rgb(134, 108, 74),
        TerrainKind::Mountain => Rgb(128, 128, 132),
        TerrainKind::Unknown => Rgb(96, 80, 110),
    }
}

/// Final display color for one tile: base terrain color, blended toward a
/// richer green by normalized food for grass, then shaded by elevation.
pub fn tile_color(tile: &TerrainTile) -> Rgb {
    let mut color = base_color(tile.terrain);
    if tile.terrain == TerrainKind::Grass {
        let richness = (tile.food_available / MAX_GRASS_FOOD).clamp(0.0, 1.0);
        color = blend(color, Rgb(34, 170, 52), richness);
    }
    shade(color, height_factor(tile.height))
}

/// Multiplicative lighten/darken factor from tile elevation. Heights land
/// roughly in [-1.5, 1.5]; the factor stays in [0.75, 1.25].
fn height_factor(height: f64) -> f64 {
    let normalized = ((height + 1.5) / 3.0).clamp(0.0, 1.0);
    0.75 + 0.5 * normalized
}

fn blend(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * t).round() as u8 };
    Rgb(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

fn shade(color: Rgb, factor: f64) -> Rgb {
    let channel = |c: u8| -> u8 { (c as f64 * factor).round().clamp(0.0, 255.0) as u8 };
    Rgb(channel(color.0), channel(color.1), channel(color.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(kind: TerrainKind, height: f64, food: f64) -> TerrainTile {
        TerrainTile {
            x: 0,
            y: 0,
            terrain: kind,
            height,
            food_available: food,
        }
    }

    #[test]
    fn unknown_kind_gets_fallback_color() {
        let color = tile_color(&tile(TerrainKind::Unknown, 0.0, 0.0));
        assert_ne!(color, BACKGROUND);
    }

    #[test]
    fn richer_grass_is_greener() {
        let poor = tile_color(&tile(TerrainKind::Grass, 0.0, 0.0));
        let rich = tile_color(&tile(TerrainKind::Grass, 0.0, MAX_GRASS_FOOD));
        assert!(rich.1 > poor.1, "green channel should grow with food");
    }

    #[test]
    fn food_blend_clamps_beyond_maximum() {
        let full = tile_color(&tile(TerrainKind::Grass, 0.0, MAX_GRASS_FOOD));
        let over = tile_color(&tile(TerrainKind::Grass, 0.0, MAX_GRASS_FOOD * 3.0));
        assert_eq!(full, over);
    }

    #[test]
    fn extreme_heights_stay_in_channel_bounds() {
        // Factors are clamped, so even a wild height cannot overflow a channel.
        let high = tile_color(&tile(TerrainKind::Mountain, 100.0, 0.0));
        let low = tile_color(&tile(TerrainKind::Water, -100.0, 0.0));
        assert!(high.0 >= low.0);
        let brighter = tile_color(&tile(TerrainKind::Mountain, 1.5, 0.0));
        let darker = tile_color(&tile(TerrainKind::Mountain, -1.5, 0.0));
        assert!(brighter.0 > darker.0);
    }

    #[test]
    fn grid_lookup_is_row_major() {
        let viewport = Viewport::new(10, 20, 3, 2);
        let mut grid = TerrainGrid::seeded(viewport);
        assert!(grid.is_empty());

        let tiles: Vec<TerrainTile> = (0..6)
            .map(|i| tile(TerrainKind::Dirt, i as f64 * 0.1, 0.0))
            .collect();
        grid.replace(viewport, tiles);

        // Cell (2, 1) is index 1 * 3 + 2 = 5.
        let found = grid.tile_at_cell(2, 1).expect("tile exists");
        assert!((found.height - 0.5).abs() < 1e-9);
        assert!(grid.tile_at_cell(3, 0).is_none());
        assert!(grid.tile_at_cell(0, 2).is_none());
    }

    #[test]
    fn short_response_misses_past_prefix() {
        let viewport = Viewport::new(0, 0, 4, 4);
        let mut grid = TerrainGrid::seeded(viewport);
        grid.replace(viewport, vec![tile(TerrainKind::Water, 0.0, 0.0)]);
        assert!(grid.tile_at_cell(0, 0).is_some());
        assert!(grid.tile_at_cell(1, 0).is_none());
    }
}
