use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::CritterCache;
use crate::dashboard::Dashboard;
use crate::poll::PollUpdate;
use crate::selection::Selection;
use crate::terrain::TerrainGrid;
use crate::viewport::Viewport;

/// All mutable viewer state, owned by the single UI thread. Network results
/// arrive as `PollUpdate` messages and are applied between frames through
/// `apply_update`; the render loop advances animation through `frame`.
#[derive(Debug)]
pub struct ViewerState {
    viewport: Viewport,
    pub terrain: TerrainGrid,
    pub critters: CritterCache,
    pub selection: Selection,
    pub dashboard: Dashboard,
    pub season: Option<String>,
    pub last_live_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    last_live_seq: u64,
    last_terrain_seq: u64,
}

impl ViewerState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            terrain: TerrainGrid::seeded(viewport),
            critters: CritterCache::new(),
            selection: Selection::default(),
            dashboard: Dashboard::new(),
            season: None,
            last_live_at: None,
            last_error: None,
            last_live_seq: 0,
            last_terrain_seq: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// A manual viewport update: caches are seeded synchronously so the next
    /// frame draws the new window (as background until fetches land), and
    /// the selection is dropped along with the old entity set. The sequence
    /// floors are left alone; responses fetched for the old window are
    /// already rejected by the viewport guard.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }
        self.viewport = viewport;
        self.terrain = TerrainGrid::seeded(viewport);
        self.critters = CritterCache::new();
        self.selection.sync(&self.critters);
    }

    /// Applies one poller message. Live and terrain updates are discarded
    /// when they are older than the last applied one in the same family or
    /// were fetched for a viewport that is no longer current. The families
    /// are stamped and guarded independently, so a slow fetch in one never
    /// shadows a fresh result in the other. Returns whether the update took
    /// effect.
    pub fn apply_update(&mut self, update: PollUpdate) -> bool {
        match update {
            PollUpdate::Live {
                seq,
                viewport,
                critters,
            } => {
                if !admit(&mut self.last_live_seq, self.viewport, seq, viewport, "live") {
                    return false;
                }
                self.critters.reconcile(&critters);
                self.selection.sync(&self.critters);
                self.last_live_at = Some(Utc::now());
                self.last_error = None;
                true
            }
            PollUpdate::Terrain {
                seq,
                viewport,
                tiles,
            } => {
                if !admit(
                    &mut self.last_terrain_seq,
                    self.viewport,
                    seq,
                    viewport,
                    "terrain",
                ) {
                    return false;
                }
                self.terrain.replace(viewport, tiles);
                true
            }
            PollUpdate::History(entries) => {
                self.dashboard.apply_history(&entries);
                true
            }
            PollUpdate::Deaths(counts) => {
                self.dashboard.apply_deaths(&counts);
                true
            }
            PollUpdate::Season(season) => {
                self.season = Some(season.name);
                true
            }
            PollUpdate::Detail { id, events } => {
                self.selection.set_events(id, events);
                true
            }
            PollUpdate::Fault { family, message } => {
                self.last_error = Some(format!("{family}: {message}"));
                false
            }
        }
    }

    /// One render-loop step: advance every display record toward its target,
    /// then re-derive the selected critter's detail from the post-update
    /// positions.
    pub fn frame(&mut self, smoothing: f64) {
        self.critters.advance(smoothing);
        self.selection.sync(&self.critters);
    }
}

/// Staleness guard for one poll family: the fetched viewport must still be
/// current and the stamp must advance that family's floor.
fn admit(
    floor: &mut u64,
    current: Viewport,
    seq: u64,
    fetched: Viewport,
    family: &'static str,
) -> bool {
    if fetched != current {
        debug!(family, "dropping poll result for a stale viewport");
        return false;
    }
    if seq <= *floor {
        debug!(family, seq, "dropping out-of-order poll result");
        return false;
    }
    *floor = seq;
    true
}
