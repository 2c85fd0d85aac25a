// Fixed-rate engine driver. Provider callbacks land on the shared session
// through this handle and only ever append to its buffers; a spawned loop
// task runs the pipeline tick at the configured cadence and publishes the
// latest update over a watch channel. Arrival times are stamped here.
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::providers::FeedKind;
use crate::session::{AttentionSession, IntentUpdate, SteeringTruth};
use crate::types::{GazeReading, Landmark, Reaction};

struct LoopState {
    stop_tx: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

pub struct AttentionEngine {
    session: Arc<Mutex<AttentionSession>>,
    state: Mutex<LoopState>,
    updates_tx: watch::Sender<Option<IntentUpdate>>,
    updates_rx: watch::Receiver<Option<IntentUpdate>>,
    tick_rate_hz: u32,
}

impl AttentionEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let tick_rate_hz = config.tick_rate_hz;
        let session = AttentionSession::new(config)?;
        let (updates_tx, updates_rx) = watch::channel(None);
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            state: Mutex::new(LoopState {
                stop_tx: None,
                task: None,
            }),
            updates_tx,
            updates_rx,
            tick_rate_hz,
        })
    }

    /// Latest published update; receivers see each tick's output.
    pub fn subscribe(&self) -> watch::Receiver<Option<IntentUpdate>> {
        self.updates_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().stop_tx.is_some()
    }

    /// Spawn the fixed-rate smoothing loop.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.stop_tx.is_some() {
            return Err(EngineError::AlreadyRunning.into());
        }

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let period = std::time::Duration::from_millis(1000 / self.tick_rate_hz.max(1) as u64);
        let session = Arc::clone(&self.session);
        let updates_tx = self.updates_tx.clone();

        log::info!("starting attention loop at {}Hz", self.tick_rate_hz);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    _ = interval.tick() => {
                        let update = {
                            let mut session = session.lock().unwrap();
                            session.tick(Utc::now().timestamp_millis())
                        };
                        let _ = updates_tx.send(Some(update));
                    }
                }
            }
            log::info!("attention loop stopped");
        });

        state.stop_tx = Some(stop_tx);
        state.task = Some(task);
        Ok(())
    }

    /// Stop the loop and wait for the task to wind down.
    pub async fn stop(&self) -> Result<()> {
        let (stop_tx, task) = {
            let mut state = self.state.lock().unwrap();
            (state.stop_tx.take(), state.task.take())
        };
        let stop_tx = stop_tx.ok_or(EngineError::NotRunning)?;
        let _ = stop_tx.send(()).await;
        if let Some(task) = task {
            let _ = task.await;
        }
        Ok(())
    }

    // --- provider callback surface ---

    pub fn on_gaze(&self, reading: Option<GazeReading>) {
        let now_ms = Utc::now().timestamp_millis();
        self.session.lock().unwrap().ingest_gaze(reading, now_ms);
    }

    pub fn on_landmarks(&self, landmarks: &[Landmark]) {
        self.session.lock().unwrap().ingest_landmarks(landmarks);
    }

    pub fn on_transform(&self, transform: Option<[f64; 16]>) {
        self.session.lock().unwrap().ingest_transform(transform);
    }

    pub fn on_pointer_moved(&self, x: f64, y: f64) {
        let now_ms = Utc::now().timestamp_millis();
        self.session.lock().unwrap().pointer_moved(x, y, now_ms);
    }

    pub fn on_reaction_confirmed(&self, reaction: Reaction, steering: Option<SteeringTruth>) {
        let now_ms = Utc::now().timestamp_millis();
        self.session
            .lock()
            .unwrap()
            .confirm_reaction(reaction, steering, now_ms);
    }

    pub fn set_gaze_calibrated(&self, calibrated: bool) {
        self.session.lock().unwrap().set_gaze_calibrated(calibrated);
    }

    pub fn set_feed_available(&self, feed: FeedKind, available: bool) {
        self.session
            .lock()
            .unwrap()
            .set_feed_available(feed, available);
    }

    /// Run a closure against the session for snapshots and predictions.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut AttentionSession) -> T) -> T {
        let mut session = self.session.lock().unwrap();
        f(&mut session)
    }
}
