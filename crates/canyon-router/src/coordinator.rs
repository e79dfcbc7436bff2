//! Generation-run coordination.
//!
//! Every structural change to the waypoint list starts a new run and cancels
//! the previous one. Only the latest run may publish.

use canyon_core::WaypointList;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::engine::{RouteEngine, RouteOutcome};
use crate::error::RunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Superseded,
    Failed,
}

/// Latest published view of the coordinator.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub generation: u64,
    pub state: RunState,
    /// Last completed route. Kept while a newer run is in flight, cleared on idle or failure.
    pub outcome: Option<Arc<RouteOutcome>>,
    pub error: Option<RunError>,
}

impl RunSnapshot {
    fn idle(generation: u64) -> Self {
        Self {
            generation,
            state: RunState::Idle,
            outcome: None,
            error: None,
        }
    }
}

#[derive(Debug, Default)]
struct ActiveRun {
    generation: u64,
    cancel: Option<CancellationToken>,
}

struct Shared {
    active: Mutex<ActiveRun>,
    publisher: watch::Sender<RunSnapshot>,
}

impl Shared {
    fn finish(&self, generation: u64, result: Result<RouteOutcome, RunError>) {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if active.generation != generation {
            tracing::debug!("Discarding result of superseded run {}", generation);
            return;
        }
        active.cancel = None;

        let snapshot = match result {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    tracing::warn!("{}", warning);
                }
                RunSnapshot {
                    generation,
                    state: RunState::Completed,
                    outcome: Some(Arc::new(outcome)),
                    error: None,
                }
            }
            Err(RunError::Cancelled) => {
                tracing::debug!("Run {} cancelled", generation);
                return;
            }
            Err(err) => {
                tracing::error!("Route generation {} failed: {}", generation, err);
                RunSnapshot {
                    generation,
                    state: RunState::Failed,
                    outcome: None,
                    error: Some(err),
                }
            }
        };
        self.publisher.send_replace(snapshot);
    }
}

/// Drives generation runs for a changing waypoint list.
pub struct RouteCoordinator {
    engine: Arc<RouteEngine>,
    shared: Arc<Shared>,
}

impl RouteCoordinator {
    pub fn new(engine: Arc<RouteEngine>) -> Self {
        let (publisher, _) = watch::channel(RunSnapshot::idle(0));
        Self {
            engine,
            shared: Arc::new(Shared {
                active: Mutex::new(ActiveRun::default()),
                publisher,
            }),
        }
    }

    pub fn engine(&self) -> &Arc<RouteEngine> {
        &self.engine
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.shared.publisher.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.shared.publisher.borrow().clone()
    }

    /// React to a structural change of the waypoint list. Returns the new generation.
    ///
    /// Must be called from within a Tokio runtime; routable lists spawn a run task.
    pub fn on_waypoints_changed(&self, waypoints: &WaypointList) -> u64 {
        let mut active = self.shared.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let generation = self.supersede(&mut active);

        if !waypoints.is_routable() {
            tracing::debug!("Waypoint list not routable ({} point(s)), going idle", waypoints.len());
            self.shared.publisher.send_replace(RunSnapshot::idle(generation));
            return generation;
        }

        let cancel = CancellationToken::new();
        active.cancel = Some(cancel.clone());
        let previous = self.shared.publisher.borrow().outcome.clone();
        self.shared.publisher.send_replace(RunSnapshot {
            generation,
            state: RunState::Running,
            outcome: previous,
            error: None,
        });
        drop(active);

        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.shared);
        let waypoints = waypoints.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(RunError::Cancelled),
                result = engine.generate(&waypoints, &cancel) => result,
            };
            shared.finish(generation, result);
        });

        generation
    }

    /// Cancel any run and clear the published route.
    pub fn reset(&self) -> u64 {
        let mut active = self.shared.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let generation = self.supersede(&mut active);
        self.shared.publisher.send_replace(RunSnapshot::idle(generation));
        generation
    }

    /// Wait until `generation` settles. `None` if a newer generation replaced it first.
    pub async fn settled(&self, generation: u64) -> Option<RunSnapshot> {
        let mut receiver = self.subscribe();
        let snapshot = receiver
            .wait_for(|snapshot| {
                snapshot.generation > generation
                    || (snapshot.generation == generation && snapshot.state != RunState::Running)
            })
            .await
            .ok()?
            .clone();
        (snapshot.generation == generation).then_some(snapshot)
    }

    fn supersede(&self, active: &mut ActiveRun) -> u64 {
        if let Some(previous) = active.cancel.take() {
            previous.cancel();
            tracing::debug!("Run {} superseded", active.generation);
            let outcome = self.shared.publisher.borrow().outcome.clone();
            self.shared.publisher.send_replace(RunSnapshot {
                generation: active.generation,
                state: RunState::Superseded,
                outcome,
                error: None,
            });
        }
        active.generation += 1;
        active.generation
    }
}

impl Drop for RouteCoordinator {
    fn drop(&mut self) {
        let active = self.shared.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(cancel) = &active.cancel {
            cancel.cancel();
        }
    }
}
