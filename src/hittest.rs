use crate::cache::CritterCache;
use crate::model::CritterId;
use crate::viewport::SurfaceTransform;

/// Selection geometry in surface units.
#[derive(Debug, Clone, Copy)]
pub struct HitTestParams {
    /// Radius of the drawn marker.
    pub draw_radius: f64,
    /// Extra slack accepted around the marker.
    pub tolerance: f64,
}

impl Default for HitTestParams {
    fn default() -> Self {
        Self {
            draw_radius: 0.5,
            tolerance: 1.5,
        }
    }
}

/// Finds the critter nearest to a pointer position, by *current* interpolated
/// position transformed into surface space. Returns None when nothing lies
/// within `draw_radius + tolerance`; ties keep the first record in cache
/// iteration order. A linear scan is the intended behavior for bounded
/// viewport sizes.
pub fn hit_test(
    surface_x: f64,
    surface_y: f64,
    transform: &SurfaceTransform,
    cache: &CritterCache,
    params: HitTestParams,
) -> Option<CritterId> {
    let limit = params.draw_radius + params.tolerance;
    let mut best: Option<(CritterId, f64)> = None;

    for record in cache.iter() {
        let (sx, sy) = transform.world_to_surface(record.current_x, record.current_y);
        let distance = (sx - surface_x).hypot(sy - surface_y);
        if distance > limit {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((record.id(), distance)),
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CritterSnapshot;
    use crate::viewport::Viewport;

    fn cache_with(positions: &[(u64, f64, f64)]) -> CritterCache {
        let snapshots: Vec<CritterSnapshot> = positions
            .iter()
            .map(|&(id, x, y)| {
                serde_json::from_value(serde_json::json!({"id": id, "x": x, "y": y})).unwrap()
            })
            .collect();
        let mut cache = CritterCache::new();
        cache.seed(&snapshots);
        cache
    }

    fn identity_transform() -> SurfaceTransform {
        // 20x20 viewport onto a 20x20 surface: one cell per surface unit.
        SurfaceTransform::new(Viewport::new(0, 0, 20, 20), 20.0, 20.0)
    }

    #[test]
    fn exact_pointer_position_selects() {
        let cache = cache_with(&[(1, 10.0, 10.0)]);
        let transform = identity_transform();
        let hit = hit_test(10.0, 10.0, &transform, &cache, HitTestParams::default());
        assert_eq!(hit, Some(1));
    }

    #[test]
    fn pointer_outside_tolerance_misses() {
        let cache = cache_with(&[(1, 10.0, 10.0)]);
        let transform = identity_transform();
        let params = HitTestParams::default();
        let beyond = params.draw_radius + params.tolerance + 0.5;
        let hit = hit_test(10.0 + beyond, 10.0, &transform, &cache, params);
        assert_eq!(hit, None);
    }

    #[test]
    fn nearer_of_two_candidates_wins() {
        let cache = cache_with(&[(1, 10.0, 10.0), (2, 11.0, 10.0)]);
        let transform = identity_transform();
        let hit = hit_test(10.8, 10.0, &transform, &cache, HitTestParams::default());
        assert_eq!(hit, Some(2));
    }

    #[test]
    fn equidistant_candidates_break_ties_by_id_order() {
        let cache = cache_with(&[(2, 11.0, 10.0), (1, 9.0, 10.0)]);
        let transform = identity_transform();
        let hit = hit_test(10.0, 10.0, &transform, &cache, HitTestParams::default());
        assert_eq!(hit, Some(1));
    }

    #[test]
    fn empty_cache_never_hits() {
        let cache = CritterCache::new();
        let transform = identity_transform();
        assert_eq!(
            hit_test(0.0, 0.0, &transform, &cache, HitTestParams::default()),
            None
        );
    }
}
