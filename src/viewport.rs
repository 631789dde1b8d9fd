use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The rectangular world-coordinate window currently rendered. Mutated only
/// by explicit user action or a deep-link; the render loop never touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub origin_x: i64,
    pub origin_y: i64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum ViewportError {
    #[error("viewport query missing parameter '{0}'")]
    Missing(&'static str),
    #[error("viewport parameter '{name}' is not a valid number: '{value}'")]
    Parse { name: &'static str, value: String },
    #[error("viewport width and height must be positive")]
    Degenerate,
}

impl Viewport {
    pub fn new(origin_x: i64, origin_y: i64, width: u32, height: u32) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// True when the world coordinate lies inside the viewport rectangle.
    pub fn contains(&self, world_x: i64, world_y: i64) -> bool {
        world_x >= self.origin_x
            && world_x < self.origin_x + self.width as i64
            && world_y >= self.origin_y
            && world_y < self.origin_y + self.height as i64
    }

    /// Viewport-relative cell index for a world coordinate, or None when the
    /// coordinate is outside the window.
    pub fn cell_of(&self, world_x: i64, world_y: i64) -> Option<(u32, u32)> {
        if !self.contains(world_x, world_y) {
            return None;
        }
        Some((
            (world_x - self.origin_x) as u32,
            (world_y - self.origin_y) as u32,
        ))
    }

    /// World coordinate of a viewport-relative cell. Cells beyond the
    /// viewport still map linearly; callers clamp where it matters.
    pub fn world_of(&self, col: u32, row: u32) -> (i64, i64) {
        (self.origin_x + col as i64, self.origin_y + row as i64)
    }

    pub fn pan(&self, dx: i64, dy: i64) -> Self {
        Self {
            origin_x: self.origin_x + dx,
            origin_y: self.origin_y + dy,
            ..*self
        }
    }

    /// Query-string form used for deep-linking, e.g. `x=50&y=50&w=20&h=20`.
    pub fn to_query(&self) -> String {
        format!(
            "x={}&y={}&w={}&h={}",
            self.origin_x, self.origin_y, self.width, self.height
        )
    }

    pub fn from_query(query: &str) -> Result<Self, ViewportError> {
        let mut x: Option<i64> = None;
        let mut y: Option<i64> = None;
        let mut w: Option<u32> = None;
        let mut h: Option<u32> = None;

        for pair in query.trim().trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key.trim() {
                "x" => x = Some(parse_i64("x", value)?),
                "y" => y = Some(parse_i64("y", value)?),
                "w" => w = Some(parse_u32("w", value)?),
                "h" => h = Some(parse_u32("h", value)?),
                _ => {}
            }
        }

        let viewport = Viewport {
            origin_x: x.ok_or(ViewportError::Missing("x"))?,
            origin_y: y.ok_or(ViewportError::Missing("y"))?,
            width: w.ok_or(ViewportError::Missing("w"))?,
            height: h.ok_or(ViewportError::Missing("h"))?,
        };
        if viewport.width == 0 || viewport.height == 0 {
            return Err(ViewportError::Degenerate);
        }
        Ok(viewport)
    }
}

fn parse_i64(name: &'static str, value: &str) -> Result<i64, ViewportError> {
    value.trim().parse().map_err(|_| ViewportError::Parse {
        name,
        value: value.to_string(),
    })
}

fn parse_u32(name: &'static str, value: &str) -> Result<u32, ViewportError> {
    value.trim().parse().map_err(|_| ViewportError::Parse {
        name,
        value: value.to_string(),
    })
}

/// Mapping between world coordinates and the rendering surface for one
/// viewport + surface pairing. Pure arithmetic; rebuilt per frame from the
/// current layout.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceTransform {
    origin_x: f64,
    origin_y: f64,
    scale_x: f64,
    scale_y: f64,
}

impl SurfaceTransform {
    pub fn new(viewport: Viewport, surface_width: f64, surface_height: f64) -> Self {
        let width = viewport.width.max(1) as f64;
        let height = viewport.height.max(1) as f64;
        Self {
            origin_x: viewport.origin_x as f64,
            origin_y: viewport.origin_y as f64,
            scale_x: surface_width.max(1.0) / width,
            scale_y: surface_height.max(1.0) / height,
        }
    }

    pub fn world_to_surface(&self, world_x: f64, world_y: f64) -> (f64, f64) {
        (
            (world_x - self.origin_x) * self.scale_x,
            (world_y - self.origin_y) * self.scale_y,
        )
    }

    pub fn surface_to_world(&self, surface_x: f64, surface_y: f64) -> (f64, f64) {
        (
            surface_x / self.scale_x + self.origin_x,
            surface_y / self.scale_y + self.origin_y,
        )
    }
}
