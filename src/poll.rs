use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::model::{CritterEvent, CritterId, CritterSnapshot, LabelDistribution, Season, StatsEntry, TerrainTile};
use crate::service::HttpWorldService;
use crate::viewport::Viewport;

/// A complete message from one poller to the viewer thread. Applying one is
/// a single visible step between two render frames.
#[derive(Debug)]
pub enum PollUpdate {
    Terrain {
        seq: u64,
        viewport: Viewport,
        tiles: Vec<TerrainTile>,
    },
    Live {
        seq: u64,
        viewport: Viewport,
        critters: Vec<CritterSnapshot>,
    },
    History(Vec<StatsEntry>),
    Deaths(LabelDistribution),
    Season(Season),
    Detail {
        id: CritterId,
        events: Vec<CritterEvent>,
    },
    /// A fetch failed; stale data stays on screen and the interval retries.
    Fault {
        family: &'static str,
        message: String,
    },
}

/// Cadences for the independently scheduled fetchers.
#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub live: Duration,
    pub history: Duration,
    pub deaths: Duration,
    pub season: Duration,
    pub history_limit: u32,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            live: Duration::from_millis(2500),
            history: Duration::from_secs(10),
            deaths: Duration::from_secs(30),
            season: Duration::from_secs(60),
            history_limit: 100,
        }
    }
}

/// Handles to the recurring poll tasks: retarget the viewport, request a
/// detail fetch, and stop everything for a clean shutdown.
pub struct Pollers {
    tasks: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    viewport_tx: watch::Sender<Viewport>,
    detail_tx: mpsc::Sender<CritterId>,
}

impl Pollers {
    /// Spawns the live, terrain, history, deaths, season, and detail tasks.
    /// Each task owns its own fetch cycle end to end, so requests within a
    /// family never overlap; live and terrain responses each carry their own
    /// family's sequence number so stale results can be discarded without
    /// one family's progress shadowing the other's.
    pub fn spawn(
        service: HttpWorldService,
        intervals: PollIntervals,
        viewport: Viewport,
        updates: mpsc::Sender<PollUpdate>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (viewport_tx, _) = watch::channel(viewport);
        let (detail_tx, detail_rx) = mpsc::channel::<CritterId>(16);

        let tasks = vec![
            tokio::spawn(live_task(
                service.clone(),
                intervals.live,
                viewport_tx.subscribe(),
                shutdown_tx.subscribe(),
                updates.clone(),
            )),
            tokio::spawn(terrain_task(
                service.clone(),
                viewport_tx.subscribe(),
                shutdown_tx.subscribe(),
                updates.clone(),
            )),
            tokio::spawn(history_task(
                service.clone(),
                intervals.history,
                intervals.history_limit,
                shutdown_tx.subscribe(),
                updates.clone(),
            )),
            tokio::spawn(deaths_task(
                service.clone(),
                intervals.deaths,
                shutdown_tx.subscribe(),
                updates.clone(),
            )),
            tokio::spawn(season_task(
                service.clone(),
                intervals.season,
                shutdown_tx.subscribe(),
                updates.clone(),
            )),
            tokio::spawn(detail_task(
                service,
                detail_rx,
                shutdown_tx.subscribe(),
                updates,
            )),
        ];

        Self {
            tasks,
            shutdown_tx,
            viewport_tx,
            detail_tx,
        }
    }

    /// Retargets the live and terrain pollers. Sending the current viewport
    /// again forces a refetch.
    pub fn set_viewport(&self, viewport: Viewport) {
        let _ = self.viewport_tx.send(viewport);
    }

    pub fn request_detail(&self, id: CritterId) {
        let _ = self.detail_tx.try_send(id);
    }

    /// Signals every task and waits for them to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

async fn live_task(
    service: HttpWorldService,
    cadence: Duration,
    mut viewport_rx: watch::Receiver<Viewport>,
    mut shutdown_rx: watch::Receiver<bool>,
    updates: mpsc::Sender<PollUpdate>,
) {
    let mut ticker = interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stamp: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = viewport_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // New window: fetch now, then fall back onto the cadence.
                ticker.reset();
            }
            _ = shutdown_rx.changed() => break,
        }

        let viewport = *viewport_rx.borrow();
        stamp += 1;
        match service.critters(viewport).await {
            Ok(critters) => {
                debug!(count = critters.len(), seq = stamp, "live poll applied");
                if send_update(
                    &updates,
                    PollUpdate::Live {
                        seq: stamp,
                        viewport,
                        critters,
                    },
                )
                .await
                .is_err()
                {
                    break;
                }
            }
            Err(err) => {
                warn!(%err, "live poll failed; keeping stale critters");
                if fault(&updates, "live", err.to_string()).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Terrain is refetched only on explicit viewport changes, never on a clock.
async fn terrain_task(
    service: HttpWorldService,
    mut viewport_rx: watch::Receiver<Viewport>,
    mut shutdown_rx: watch::Receiver<bool>,
    updates: mpsc::Sender<PollUpdate>,
) {
    let mut stamp: u64 = 0;
    loop {
        let viewport = *viewport_rx.borrow_and_update();
        stamp += 1;
        match service.terrain(viewport).await {
            Ok(tiles) => {
                if send_update(
                    &updates,
                    PollUpdate::Terrain {
                        seq: stamp,
                        viewport,
                        tiles,
                    },
                )
                .await
                .is_err()
                {
                    break;
                }
            }
            Err(err) => {
                warn!(%err, "terrain fetch failed; keeping stale tiles");
                if fault(&updates, "terrain", err.to_string()).await.is_err() {
                    break;
                }
            }
        }

        tokio::select! {
            changed = viewport_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}

async fn history_task(
    service: HttpWorldService,
    cadence: Duration,
    limit: u32,
    mut shutdown_rx: watch::Receiver<bool>,
    updates: mpsc::Sender<PollUpdate>,
) {
    let mut ticker = interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }
        let outcome = match service.stats_history(limit).await {
            Ok(entries) => send_update(&updates, PollUpdate::History(entries)).await,
            Err(err) => {
                warn!(%err, "stats history fetch failed");
                fault(&updates, "history", err.to_string()).await
            }
        };
        if outcome.is_err() {
            break;
        }
    }
}

async fn deaths_task(
    service: HttpWorldService,
    cadence: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    updates: mpsc::Sender<PollUpdate>,
) {
    let mut ticker = interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }
        let outcome = match service.death_counts().await {
            Ok(counts) => send_update(&updates, PollUpdate::Deaths(counts)).await,
            Err(err) => {
                warn!(%err, "death stats fetch failed");
                fault(&updates, "deaths", err.to_string()).await
            }
        };
        if outcome.is_err() {
            break;
        }
    }
}

async fn season_task(
    service: HttpWorldService,
    cadence: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    updates: mpsc::Sender<PollUpdate>,
) {
    let mut ticker = interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }
        let outcome = match service.current_season().await {
            Ok(season) => send_update(&updates, PollUpdate::Season(season)).await,
            Err(err) => {
                warn!(%err, "season fetch failed");
                fault(&updates, "season", err.to_string()).await
            }
        };
        if outcome.is_err() {
            break;
        }
    }
}

async fn detail_task(
    service: HttpWorldService,
    mut requests: mpsc::Receiver<CritterId>,
    mut shutdown_rx: watch::Receiver<bool>,
    updates: mpsc::Sender<PollUpdate>,
) {
    loop {
        let id = tokio::select! {
            request = requests.recv() => match request {
                Some(id) => id,
                None => break,
            },
            _ = shutdown_rx.changed() => break,
        };
        let outcome = match service.critter_events(id).await {
            Ok(events) => send_update(&updates, PollUpdate::Detail { id, events }).await,
            Err(err) => {
                warn!(critter = id, %err, "event log fetch failed");
                fault(&updates, "detail", err.to_string()).await
            }
        };
        if outcome.is_err() {
            break;
        }
    }
}

async fn send_update(
    updates: &mpsc::Sender<PollUpdate>,
    update: PollUpdate,
) -> Result<(), mpsc::error::SendError<PollUpdate>> {
    updates.send(update).await
}

async fn fault(
    updates: &mpsc::Sender<PollUpdate>,
    family: &'static str,
    message: String,
) -> Result<(), mpsc::error::SendError<PollUpdate>> {
    updates
        .send(PollUpdate::Fault { family, message })
        .await
}
