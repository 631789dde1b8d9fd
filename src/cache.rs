use std::collections::BTreeMap;

use crate::model::{CritterId, CritterSnapshot};

/// Remaining distance under which a stepped position snaps onto its target,
/// in world cells.
const SNAP_EPSILON: f64 = 1e-4;

/// Client-local animated position paired with the latest authoritative
/// snapshot for one critter.
#[derive(Debug, Clone)]
pub struct DisplayRecord {
    pub current_x: f64,
    pub current_y: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub snapshot: CritterSnapshot,
}

impl DisplayRecord {
    /// A record for a critter observed for the first time: no animation from
    /// an undefined origin, current and target start at the reported position.
    pub fn spawned(snapshot: CritterSnapshot) -> Self {
        Self {
            current_x: snapshot.x,
            current_y: snapshot.y,
            target_x: snapshot.x,
            target_y: snapshot.y,
            snapshot,
        }
    }

    /// Applies a fresh poll to an existing record. The interpolated position
    /// is preserved so animation continues from wherever it was drawn.
    pub fn retarget(&mut self, snapshot: CritterSnapshot) {
        self.target_x = snapshot.x;
        self.target_y = snapshot.y;
        self.snapshot = snapshot;
    }

    /// Advances the displayed position a fixed fraction of the remaining
    /// distance toward the target. For 0 < k < 1 the move is monotone and
    /// never overshoots; once inside a small epsilon it lands exactly.
    pub fn step(&mut self, k: f64) {
        let dx = self.target_x - self.current_x;
        let dy = self.target_y - self.current_y;
        if dx.hypot(dy) < SNAP_EPSILON {
            self.current_x = self.target_x;
            self.current_y = self.target_y;
            return;
        }
        self.current_x += dx * k;
        self.current_y += dy * k;
    }

    pub fn id(&self) -> CritterId {
        self.snapshot.id
    }
}

/// The entity display cache: id -> display record, reconciled against each
/// live fetch. BTreeMap keeps iteration order deterministic, which the
/// hit-tester's tie-break relies on.
#[derive(Debug, Clone, Default)]
pub struct CritterCache {
    records: BTreeMap<CritterId, DisplayRecord>,
}

impl CritterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: CritterId) -> Option<&DisplayRecord> {
        self.records.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayRecord> {
        self.records.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = CritterId> + '_ {
        self.records.keys().copied()
    }

    /// Drops everything and spawns records for the given snapshots. Used on
    /// explicit viewport changes, where continuing old animations would slide
    /// critters in from an unrelated window.
    pub fn seed(&mut self, snapshots: &[CritterSnapshot]) {
        self.records = snapshots
            .iter()
            .map(|snap| (snap.id, DisplayRecord::spawned(snap.clone())))
            .collect();
    }

    /// Merges a freshly polled critter list: present ids are retargeted (or
    /// spawned when new), absent ids removed. The new map is built on the
    /// side and swapped in as a single visible step, so an interleaved render
    /// pass never sees a half-applied update.
    pub fn reconcile(&mut self, snapshots: &[CritterSnapshot]) {
        let mut next = BTreeMap::new();
        for snap in snapshots {
            match self.records.remove(&snap.id) {
                Some(mut record) => {
                    record.retarget(snap.clone());
                    next.insert(snap.id, record);
                }
                None => {
                    next.insert(snap.id, DisplayRecord::spawned(snap.clone()));
                }
            }
        }
        self.records = next;
    }

    /// Steps every record's interpolated position.
    pub fn advance(&mut self, k: f64) {
        for record in self.records.values_mut() {
            record.step(k);
        }
    }
}
