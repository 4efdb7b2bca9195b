use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    config::StoryConfig,
    models::{SessionOutcome, ViewerSession},
};

use super::{SegmentPhase, SegmentState, ViewerStatus};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const HEARTBEAT_EVERY_TICKS: u32 = 10;

/// Immutable view of the engine handed to renderers; the render layer never
/// touches the mutable timer state itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySnapshot {
    pub status: ViewerStatus,
    pub step_index: usize,
    pub step_count: usize,
    pub progress: f32,
    pub remaining_ms: u64,
    pub segments: Vec<SegmentPhase>,
}

impl StorySnapshot {
    fn from_state(state: &SegmentState) -> Self {
        Self {
            status: state.status,
            step_index: state.step_index,
            step_count: state.step_count,
            progress: state.progress(),
            remaining_ms: state.remaining_ms(),
            segments: state.phases(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "type")]
pub enum StoryEvent {
    StateChanged { snapshot: StorySnapshot },
    Tick { snapshot: StorySnapshot },
    StepChanged { step_index: usize },
    Completed,
    SessionEnded { session: ViewerSession },
}

#[derive(Clone)]
struct SessionMeta {
    id: String,
    started_at: DateTime<Utc>,
}

impl SessionMeta {
    fn begin() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }
}

struct Advancement {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct StoryController {
    config: StoryConfig,
    state: Arc<Mutex<SegmentState>>,
    events: broadcast::Sender<StoryEvent>,
    advancement: Arc<Mutex<Option<Advancement>>>,
    session: Arc<Mutex<Option<SessionMeta>>>,
    heartbeat_every_ticks: u32,
}

impl StoryController {
    pub fn new(config: StoryConfig) -> Self {
        let debug_mode = std::env::var("STORYPAGER_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            state: Arc::new(Mutex::new(SegmentState::new(
                config.step_count,
                config.step_duration_ms,
            ))),
            events,
            advancement: Arc::new(Mutex::new(None)),
            session: Arc::new(Mutex::new(None)),
            heartbeat_every_ticks: if debug_mode { 1 } else { HEARTBEAT_EVERY_TICKS },
            config,
        }
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoryEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> StorySnapshot {
        let mut guard = self.state.lock().await;
        guard.sync_active_from_anchor();
        StorySnapshot::from_state(&guard)
    }

    pub async fn start_session(&self) -> Result<StorySnapshot> {
        {
            let mut state = self.state.lock().await;
            if state.status != ViewerStatus::Idle {
                bail!("viewer session already started");
            }
            state.begin_segment(0, Instant::now());
        }

        *self.session.lock().await = Some(SessionMeta::begin());
        self.spawn_advancement().await;

        info!(
            "story session started: {} steps of {}ms",
            self.config.step_count, self.config.step_duration_ms
        );
        self.emit_state_changed().await
    }

    /// Idempotent. Freezes progress, remembers the remaining time and stops
    /// the in-flight advancement.
    pub async fn pause(&self) -> Result<StorySnapshot> {
        {
            let mut state = self.state.lock().await;
            if state.status != ViewerStatus::Advancing {
                return Ok(StorySnapshot::from_state(&state));
            }
            state.pause();
            debug!(
                "paused at step {} with {}ms remaining",
                state.step_index,
                state.remaining_ms()
            );
        }

        self.cancel_advancement().await;
        self.emit_state_changed().await
    }

    /// Idempotent. Continues from the frozen progress at the original rate:
    /// the remaining `duration * (1 - progress)` elapses, not a fresh full
    /// duration. A segment with nothing remaining completes on the first
    /// tick, which fires immediately.
    pub async fn resume(&self) -> Result<StorySnapshot> {
        {
            let mut state = self.state.lock().await;
            if state.status != ViewerStatus::Paused {
                return Ok(StorySnapshot::from_state(&state));
            }
            state.resume(Instant::now());
            debug!(
                "resumed step {} with {}ms remaining",
                state.step_index,
                state.remaining_ms()
            );
        }

        self.spawn_advancement().await;
        self.emit_state_changed().await
    }

    /// External index change from navigation. Cancels the in-flight
    /// advancement so no stale completion can fire, then restarts the target
    /// segment from zero with its full duration. While the viewer is held
    /// paused the reset applies but advancement waits for the release.
    pub async fn jump_to(&self, step_index: usize) -> Result<StorySnapshot> {
        if step_index >= self.config.step_count {
            bail!(
                "step index {} out of range (step count {})",
                step_index,
                self.config.step_count
            );
        }

        let status = {
            let state = self.state.lock().await;
            state.status
        };

        match status {
            ViewerStatus::Idle | ViewerStatus::Completed => {
                return Ok(self.snapshot().await);
            }
            ViewerStatus::Paused => {
                let mut state = self.state.lock().await;
                state.begin_segment_paused(step_index);
                debug!("jumped to step {} while held paused", step_index);
            }
            ViewerStatus::Advancing => {
                self.cancel_advancement().await;
                {
                    let mut state = self.state.lock().await;
                    state.begin_segment(step_index, Instant::now());
                }
                self.spawn_advancement().await;
                debug!("jumped to step {}", step_index);
            }
        }

        self.emit_state_changed().await
    }

    /// External dismissal mid-story. Terminal; the session summary reports
    /// how far the viewer got.
    pub async fn end_session(&self) -> Result<StorySnapshot> {
        let steps_viewed = {
            let mut state = self.state.lock().await;
            match state.status {
                ViewerStatus::Idle | ViewerStatus::Completed => {
                    bail!("no active viewer session to dismiss");
                }
                ViewerStatus::Advancing | ViewerStatus::Paused => {}
            }
            state.dismiss();
            state.step_index + 1
        };

        self.cancel_advancement().await;
        finish_session(
            &self.session,
            SessionOutcome::Dismissed,
            &self.events,
            steps_viewed,
        )
        .await;
        self.emit_state_changed().await
    }

    async fn spawn_advancement(&self) {
        let mut advancement = self.advancement.lock().await;
        if let Some(prior) = advancement.take() {
            prior.cancel.cancel();
            let _ = prior.handle.await;
        }

        let state = Arc::clone(&self.state);
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tick_interval = self.config.tick_interval();
        let heartbeat_every = self.heartbeat_every_ticks;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = token.cancelled() => {
                        debug!("advancement cancelled");
                        break;
                    }
                }

                let mut guard = state.lock().await;
                // Re-check under the lock: a cancelled advancement must not
                // apply any further updates, even if a tick was already due.
                if token.is_cancelled() || guard.status != ViewerStatus::Advancing {
                    break;
                }
                guard.sync_active_from_anchor();

                if guard.active_ms >= guard.step_duration_ms {
                    if guard.step_index + 1 < guard.step_count {
                        let next = guard.step_index + 1;
                        guard.begin_segment(next, Instant::now());
                        let snapshot = StorySnapshot::from_state(&guard);
                        drop(guard);

                        let _ = events.send(StoryEvent::StepChanged { step_index: next });
                        let _ = events.send(StoryEvent::StateChanged { snapshot });
                        continue;
                    }

                    guard.complete();
                    let steps_viewed = guard.step_count;
                    let snapshot = StorySnapshot::from_state(&guard);
                    drop(guard);

                    let _ = events.send(StoryEvent::Completed);
                    let _ = events.send(StoryEvent::StateChanged { snapshot });
                    finish_session(&session, SessionOutcome::Completed, &events, steps_viewed)
                        .await;
                    break;
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    let snapshot = StorySnapshot::from_state(&guard);
                    drop(guard);
                    let _ = events.send(StoryEvent::Tick { snapshot });
                }
            }
        });

        *advancement = Some(Advancement { handle, cancel });
    }

    async fn cancel_advancement(&self) {
        let prior = self.advancement.lock().await.take();
        if let Some(Advancement { handle, cancel }) = prior {
            cancel.cancel();
            let _ = handle.await;
        }
    }

    async fn emit_state_changed(&self) -> Result<StorySnapshot> {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(StoryEvent::StateChanged {
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }
}

async fn finish_session(
    session: &Arc<Mutex<Option<SessionMeta>>>,
    outcome: SessionOutcome,
    events: &broadcast::Sender<StoryEvent>,
    steps_viewed: usize,
) {
    if let Some(meta) = session.lock().await.take() {
        let summary = ViewerSession {
            id: meta.id,
            started_at: meta.started_at,
            ended_at: Utc::now(),
            outcome,
            steps_viewed,
        };
        info!(
            "story session {} ended: {} after {} steps",
            summary.id,
            summary.outcome.as_str(),
            summary.steps_viewed
        );
        let _ = events.send(StoryEvent::SessionEnded { session: summary });
    }
}
