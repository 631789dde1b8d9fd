use crate::cache::CritterCache;
use crate::model::{CritterEvent, CritterId, CritterSnapshot};

/// Outcome of re-syncing the selection against the display cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSync {
    /// Nothing selected.
    None,
    /// Selection still present; detail snapshot refreshed.
    Retained,
    /// The selected id vanished from the live set; selection cleared.
    Dropped,
}

/// At most one selected critter at a time. Set by a successful hit-test,
/// cleared by a miss or when the id disappears from the live set.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Option<CritterId>,
    detail: Option<CritterSnapshot>,
    events: Vec<CritterEvent>,
}

impl Selection {
    pub fn selected(&self) -> Option<CritterId> {
        self.selected
    }

    pub fn detail(&self) -> Option<&CritterSnapshot> {
        self.detail.as_ref()
    }

    pub fn events(&self) -> &[CritterEvent] {
        &self.events
    }

    pub fn select(&mut self, id: CritterId) {
        if self.selected != Some(id) {
            self.detail = None;
            self.events.clear();
        }
        self.selected = Some(id);
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.detail = None;
        self.events.clear();
    }

    /// Stores a fetched event log, ignoring logs for ids selected no longer.
    pub fn set_events(&mut self, id: CritterId, events: Vec<CritterEvent>) {
        if self.selected == Some(id) {
            self.events = events;
        }
    }

    /// Re-derives the selected critter's latest snapshot from the cache.
    /// Called after every reconciliation and after each frame's position
    /// update, so detail panels reflect the currently rendered state.
    pub fn sync(&mut self, cache: &CritterCache) -> SelectionSync {
        let Some(id) = self.selected else {
            return SelectionSync::None;
        };
        match cache.get(id) {
            Some(record) => {
                self.detail = Some(record.snapshot.clone());
                SelectionSync::Retained
            }
            None => {
                self.clear();
                SelectionSync::Dropped
            }
        }
    }
}
