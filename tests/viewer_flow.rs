use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use critterscope::model::{CritterSnapshot, Diet, TerrainKind, TerrainTile};
use critterscope::poll::PollUpdate;
use critterscope::viewer::ViewerState;
use critterscope::viewport::Viewport;

fn snapshot(id: u64, x: f64, y: f64) -> CritterSnapshot {
    CritterSnapshot {
        id,
        x,
        y,
        diet: Diet::Herbivore,
        health: 80.0,
        max_health: 100.0,
        energy: 60.0,
        hunger: 20.0,
        thirst: 10.0,
        age: 3,
        speed: 1.0,
        size: 1.0,
        goal: "wander".into(),
        last_action: "move".into(),
    }
}

fn live(seq: u64, viewport: Viewport, critters: Vec<CritterSnapshot>) -> PollUpdate {
    PollUpdate::Live {
        seq,
        viewport,
        critters,
    }
}

#[test]
fn reconcile_flow_matches_polled_world() {
    let viewport = Viewport::new(50, 50, 20, 20);
    let mut state = ViewerState::new(viewport);

    let applied = state.apply_update(live(
        1,
        viewport,
        vec![
            snapshot(1, 55.0, 55.0),
            snapshot(2, 60.0, 60.0),
            snapshot(3, 65.0, 58.0),
        ],
    ));
    assert!(applied);
    assert_eq!(state.critters.len(), 3);

    // First sighting draws at the reported position, no slide-in.
    let rec = state.critters.get(1).unwrap();
    assert_eq!((rec.current_x, rec.current_y), (55.0, 55.0));

    // Partially animate toward a new target before the next poll lands.
    state.apply_update(live(
        2,
        viewport,
        vec![
            snapshot(1, 58.0, 55.0),
            snapshot(2, 60.0, 60.0),
            snapshot(3, 65.0, 58.0),
        ],
    ));
    for _ in 0..5 {
        state.frame(0.1);
    }
    let mid_x = state.critters.get(1).unwrap().current_x;
    assert!(mid_x > 55.0 && mid_x < 58.0);

    // Next poll: #2 gone, #4 new, #1 retargeted again mid-flight.
    state.apply_update(live(
        3,
        viewport,
        vec![
            snapshot(1, 52.0, 55.0),
            snapshot(3, 65.0, 58.0),
            snapshot(4, 51.0, 51.0),
        ],
    ));

    let ids: BTreeSet<u64> = state.critters.ids().collect();
    assert_eq!(ids, BTreeSet::from([1, 3, 4]));

    // Retargeting preserves the interpolated position.
    let rec = state.critters.get(1).unwrap();
    assert_eq!(rec.current_x, mid_x);
    assert_eq!(rec.target_x, 52.0);

    // The newcomer spawns directly at its position.
    let rec = state.critters.get(4).unwrap();
    assert_eq!((rec.current_x, rec.target_x), (51.0, 51.0));
}

#[test]
fn removing_the_selected_critter_drops_the_selection() {
    let viewport = Viewport::new(0, 0, 30, 30);
    let mut state = ViewerState::new(viewport);

    state.apply_update(live(
        1,
        viewport,
        vec![snapshot(7, 5.0, 5.0), snapshot(9, 10.0, 10.0)],
    ));
    state.selection.select(7);
    state.selection.sync(&state.critters);
    assert_eq!(state.selection.detail().map(|d| d.id), Some(7));

    state.apply_update(live(2, viewport, vec![snapshot(9, 11.0, 10.0)]));
    assert_eq!(state.selection.selected(), None);
    assert!(state.selection.detail().is_none());
}

#[test]
fn stale_results_never_reach_the_screen() {
    let old = Viewport::new(0, 0, 20, 20);
    let new = Viewport::new(100, 100, 20, 20);
    let mut state = ViewerState::new(old);

    state.apply_update(live(1, old, vec![snapshot(1, 5.0, 5.0)]));
    state.set_viewport(new);
    assert!(state.critters.is_empty());

    // A fetch that was in flight for the old window arrives late.
    assert!(!state.apply_update(live(2, old, vec![snapshot(1, 5.0, 5.0)])));
    assert!(state.critters.is_empty());

    // Results for the new window apply, but an out-of-order duplicate of an
    // already-applied sequence does not.
    assert!(state.apply_update(live(3, new, vec![snapshot(2, 105.0, 105.0)])));
    assert!(!state.apply_update(live(3, new, vec![snapshot(9, 101.0, 101.0)])));
    let ids: Vec<u64> = state.critters.ids().collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn slow_terrain_fetch_lands_despite_faster_live_polls() {
    let viewport = Viewport::new(50, 50, 20, 20);
    let mut state = ViewerState::new(viewport);

    // Two live polls complete while the startup terrain request is still in
    // flight; when it finally lands it must not be mistaken for stale data.
    assert!(state.apply_update(live(1, viewport, vec![snapshot(1, 55.0, 55.0)])));
    assert!(state.apply_update(live(2, viewport, vec![snapshot(1, 56.0, 55.0)])));
    let applied = state.apply_update(PollUpdate::Terrain {
        seq: 1,
        viewport,
        tiles: vec![TerrainTile {
            x: 50,
            y: 50,
            terrain: TerrainKind::Grass,
            height: 0.1,
            food_available: 3.0,
        }],
    });
    assert!(applied);
    assert!(!state.terrain.is_empty());

    // And the next live poll after the terrain swap applies as usual.
    assert!(state.apply_update(live(3, viewport, vec![snapshot(1, 57.0, 55.0)])));
}

#[test]
fn frames_converge_each_record_onto_its_target() {
    let viewport = Viewport::new(0, 0, 40, 40);
    let mut state = ViewerState::new(viewport);

    state.apply_update(live(1, viewport, vec![snapshot(1, 0.0, 0.0)]));
    state.apply_update(live(2, viewport, vec![snapshot(1, 10.0, 6.0)]));

    let mut last_distance = f64::INFINITY;
    for _ in 0..400 {
        state.frame(0.1);
        let rec = state.critters.get(1).unwrap();
        let distance = (rec.target_x - rec.current_x).hypot(rec.target_y - rec.current_y);
        assert!(distance <= last_distance);
        last_distance = distance;
    }
    let rec = state.critters.get(1).unwrap();
    assert_eq!((rec.current_x, rec.current_y), (10.0, 6.0));
}

#[test]
fn cache_always_mirrors_the_latest_poll() {
    let viewport = Viewport::new(0, 0, 100, 100);
    let mut state = ViewerState::new(viewport);
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for seq in 1..=50u64 {
        let count = rng.gen_range(0..20);
        let mut critters = Vec::with_capacity(count);
        let mut ids = BTreeSet::new();
        for _ in 0..count {
            let id = rng.gen_range(1..30u64);
            if !ids.insert(id) {
                continue;
            }
            critters.push(snapshot(
                id,
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..100.0),
            ));
        }
        state.apply_update(live(seq, viewport, critters));
        for _ in 0..rng.gen_range(0..4) {
            state.frame(0.1);
        }

        let cached: BTreeSet<u64> = state.critters.ids().collect();
        assert_eq!(cached, ids);
    }
}
