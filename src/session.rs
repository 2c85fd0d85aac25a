// Per-session ownership of the whole pipeline. Sensor callbacks only append
// to the bounded buffers here; every classification, fusion and learning step
// runs synchronously inside tick() or the outcome-confirmed handler, in
// strict pipeline order. One instance per session, no globals.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adaptive::{BehaviorModel, CalibrationLearner, Correction, ModelSnapshot, Prediction};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::face::{FaceSignalProcessor, FaceSignals, HeadPose, HeadPoseNormalizer};
use crate::fusion::{fuse, GazeEvidence, IntentSmoother, PointerEvidence, SmoothedIntent};
use crate::gaze::{
    compute_blink_rate, detect_fixation, detect_saccades, estimate_engagement, ZoneClassifier,
    ZoneTable, ZoneUpdate,
};
use crate::providers::{FeedKind, PerceptionCapabilities};
use crate::types::{
    GazePoint, GazeReading, IntentSignal, Landmark, PointerState, Reaction, Zone,
};

/// Per-tick engine output: the raw fused signal, its smoothed counterpart and
/// the derived state flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntentUpdate {
    pub raw: IntentSignal,
    pub smoothed: IntentSignal,
    pub is_confused: bool,
    pub is_fatigued: bool,
    pub is_engaged: bool,
    pub zone: Zone,
    pub dwell_progress: f32,
    pub zone_activated: bool,
}

/// Ground truth attached to a confirmed click for steering calibration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SteeringTruth {
    pub target_yaw_rad: f64,
    pub target_pitch_rad: f64,
    pub base_yaw_rad: f64,
    pub base_pitch_rad: f64,
}

/// Running session counters for diagnostic displays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct SessionStats {
    pub total_ticks: u64,
    pub gaze_samples: u64,
    pub face_frames: u64,
    pub average_confidence: f32,
    pub last_update_ms: i64,
}

pub struct AttentionSession {
    pub id: String,
    config: EngineConfig,

    gaze_buffer: VecDeque<GazePoint>,
    latest_gaze: Option<GazePoint>,
    latest_gaze_confidence: f32,
    gaze_calibrated: bool,
    latest_landmarks: Option<Vec<Landmark>>,
    latest_transform: Option<[f64; 16]>,
    pointer: Option<PointerState>,

    zones: ZoneClassifier,
    face: FaceSignalProcessor,
    head_pose: HeadPoseNormalizer,
    smoother: IntentSmoother,
    behavior: BehaviorModel,
    calibration: CalibrationLearner,
    capabilities: PerceptionCapabilities,

    last_zone: Zone,
    last_face_signals: FaceSignals,
    last_head_pose: HeadPose,

    stats: SessionStats,
    confidence_sum: f64,
}

impl AttentionSession {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let zones = ZoneClassifier::new(ZoneTable::default())?;
        let smoother = IntentSmoother::new(config.smoothing_window);
        let id = Uuid::new_v4().to_string();
        log::info!("attention session {} created", id);
        Ok(Self {
            id,
            config,
            gaze_buffer: VecDeque::new(),
            latest_gaze: None,
            latest_gaze_confidence: 0.0,
            gaze_calibrated: false,
            latest_landmarks: None,
            latest_transform: None,
            pointer: None,
            zones,
            face: FaceSignalProcessor::new(),
            head_pose: HeadPoseNormalizer::new(),
            smoother,
            behavior: BehaviorModel::new(),
            calibration: CalibrationLearner::new(),
            capabilities: PerceptionCapabilities::default(),
            last_zone: Zone::Wander,
            last_face_signals: FaceSignals::untracked(),
            last_head_pose: HeadPose {
                yaw: 0.0,
                pitch: 0.0,
                face_detected: false,
            },
            stats: SessionStats::default(),
            confidence_sum: 0.0,
        })
    }

    /// Full reinitialization: rebuilds every component, recapturing baselines
    /// and neutral offsets. The session id survives.
    pub fn reset(&mut self) {
        log::info!("attention session {} reset", self.id);
        let config = self.config.clone();
        let capabilities = self.capabilities;
        let mut fresh = Self::new(config).expect("config was already validated");
        fresh.id = std::mem::take(&mut self.id);
        fresh.capabilities = capabilities;
        *self = fresh;
    }

    // --- sensor callback surface: buffer maintenance only ---

    /// Latest gaze provider reading, or `None` for a dropped frame.
    pub fn ingest_gaze(&mut self, reading: Option<GazeReading>, now_ms: i64) {
        match reading {
            Some(reading) => {
                let point = GazePoint {
                    x: reading.x,
                    y: reading.y,
                    timestamp_ms: now_ms,
                };
                if self.gaze_buffer.len() == self.config.gaze_buffer_capacity {
                    self.gaze_buffer.pop_front();
                }
                self.gaze_buffer.push_back(point);
                self.latest_gaze = Some(point);
                self.latest_gaze_confidence = reading.confidence;
                self.stats.gaze_samples += 1;
            }
            None => {
                self.latest_gaze = None;
            }
        }
    }

    /// Latest landmark frame. Undersized frames mean "no face" downstream.
    pub fn ingest_landmarks(&mut self, landmarks: &[Landmark]) {
        self.latest_landmarks = Some(landmarks.to_vec());
        self.stats.face_frames += 1;
    }

    /// Latest facial rigid transform, or `None` when no face this frame.
    pub fn ingest_transform(&mut self, transform: Option<[f64; 16]>) {
        self.latest_transform = transform;
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64, now_ms: i64) {
        self.pointer = Some(PointerState {
            x,
            y,
            last_moved_ms: now_ms,
        });
    }

    /// Set once the gaze provider reports its own calibration is complete.
    pub fn set_gaze_calibrated(&mut self, calibrated: bool) {
        self.gaze_calibrated = calibrated;
    }

    pub fn set_feed_available(&mut self, feed: FeedKind, available: bool) {
        self.capabilities.set_available(feed, available);
    }

    // --- the fixed-rate pipeline ---

    /// One smoothing-loop tick: extract features, classify, fuse, smooth.
    /// Strictly ordered and never reentrant.
    pub fn tick(&mut self, now_ms: i64) -> IntentUpdate {
        let points: Vec<GazePoint> = self.gaze_buffer.iter().copied().collect();

        let fixation = detect_fixation(
            &points,
            self.config.fixation_threshold_px,
            self.config.fixation_min_duration_ms,
        );
        let blink_rate = compute_blink_rate(&points);
        let saccade_rate = detect_saccades(&points);
        let engagement = estimate_engagement(&points);

        let zone_update: ZoneUpdate = self.zones.update(
            self.latest_gaze.as_ref(),
            self.config.screen_width as f64,
            self.config.screen_height as f64,
        );

        let face_signals = match &self.latest_landmarks {
            Some(landmarks) => self.face.process(landmarks),
            None => FaceSignals::untracked(),
        };
        let head_pose = self.head_pose.process(self.latest_transform.as_ref());

        let pointer_active = self
            .pointer
            .map(|p| p.is_active(now_ms, self.config.pointer_timeout_ms))
            .unwrap_or(false);

        let gaze_evidence = GazeEvidence {
            fixation,
            blink_rate,
            saccade_rate,
            engagement,
            zone: zone_update.zone,
            calibrated: self.gaze_calibrated,
            confidence: if self.latest_gaze.is_some() {
                self.latest_gaze_confidence
            } else {
                0.0
            },
        };
        let pointer_evidence = PointerEvidence {
            active: pointer_active,
        };

        let raw = fuse(&gaze_evidence, &face_signals, &pointer_evidence, now_ms);
        let smoothed: SmoothedIntent = self.smoother.push(raw);

        self.last_zone = zone_update.zone;
        self.last_face_signals = face_signals;
        self.last_head_pose = head_pose;

        self.stats.total_ticks += 1;
        self.confidence_sum += raw.confidence as f64;
        self.stats.average_confidence =
            (self.confidence_sum / self.stats.total_ticks as f64) as f32;
        self.stats.last_update_ms = now_ms;

        IntentUpdate {
            raw,
            smoothed: smoothed.signal,
            is_confused: smoothed.is_confused,
            is_fatigued: smoothed.is_fatigued,
            is_engaged: smoothed.is_engaged,
            zone: zone_update.zone,
            dwell_progress: zone_update.dwell_progress,
            zone_activated: zone_update.is_activated,
        }
    }

    // --- outcome-confirmed surface ---

    /// A confirmed application-level reaction: weak supervision for the
    /// behavior model, and - when steering ground truth is attached -
    /// another sample for the calibration learner.
    pub fn confirm_reaction(
        &mut self,
        reaction: Reaction,
        steering: Option<SteeringTruth>,
        now_ms: i64,
    ) {
        self.behavior
            .record_observation(self.last_zone, &self.last_face_signals, reaction, now_ms);

        if let Some(truth) = steering {
            if self.last_head_pose.face_detected {
                self.calibration.record_click(
                    self.last_head_pose.yaw as f64,
                    self.last_head_pose.pitch as f64,
                    truth.target_yaw_rad,
                    truth.target_pitch_rad,
                    truth.base_yaw_rad,
                    truth.base_pitch_rad,
                    now_ms,
                );
            }
        }
    }

    /// Predict the user's next reaction from current signal state.
    pub fn predict_reaction(&mut self) -> Option<Prediction> {
        self.behavior.predict(self.last_zone, &self.last_face_signals)
    }

    // --- read-only snapshots ---

    pub fn correction(&self) -> Correction {
        self.calibration.correction()
    }

    /// De-bias a raw normalized head pose using the learned correction.
    pub fn correct_steering(&self, raw_yaw: f64, raw_pitch: f64) -> (f64, f64) {
        self.calibration.correct(raw_yaw, raw_pitch)
    }

    pub fn model_snapshot(&self) -> ModelSnapshot {
        self.behavior.snapshot()
    }

    pub fn capabilities(&self) -> PerceptionCapabilities {
        self.capabilities
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Combined diagnostic blob for debug displays.
    pub fn diagnostics(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": self.id,
            "stats": self.stats,
            "capabilities": self.capabilities,
            "capability_notes": self.capabilities.notes(),
            "behavior_model": self.model_snapshot(),
            "correction": self.correction(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntentType;

    fn session() -> AttentionSession {
        AttentionSession::new(EngineConfig::default()).unwrap()
    }

    fn reading(x: f64, y: f64) -> Option<GazeReading> {
        Some(GazeReading {
            x,
            y,
            confidence: 0.8,
        })
    }

    #[test]
    fn no_input_ticks_read_idle() {
        let mut s = session();
        for i in 0..10 {
            let update = s.tick(i * 33);
            assert_eq!(update.raw.intent, IntentType::Idle);
            assert_eq!(update.zone, Zone::Wander);
            assert!(!update.is_confused);
        }
        assert_eq!(s.stats().total_ticks, 10);
    }

    #[test]
    fn gaze_buffer_is_bounded() {
        let mut s = session();
        for i in 0..200 {
            s.ingest_gaze(reading(960.0, 540.0), i * 16);
        }
        assert_eq!(s.gaze_buffer.len(), s.config.gaze_buffer_capacity);
        assert_eq!(s.stats().gaze_samples, 200);
    }

    #[test]
    fn gaze_dropout_clears_latest_but_keeps_buffer() {
        let mut s = session();
        for i in 0..10 {
            s.ingest_gaze(reading(960.0, 540.0), i * 16);
        }
        s.ingest_gaze(None, 160);
        assert!(s.latest_gaze.is_none());
        assert_eq!(s.gaze_buffer.len(), 10);

        // With no current gaze the zone machine resets to wander.
        let update = s.tick(200);
        assert_eq!(update.zone, Zone::Wander);
    }

    #[test]
    fn pointer_activity_times_out() {
        let mut s = session();
        s.set_gaze_calibrated(true);
        s.pointer_moved(100.0, 100.0, 0);
        let update = s.tick(1000);
        assert_eq!(update.raw.intent, IntentType::Navigate);
        let update = s.tick(3500);
        assert_eq!(update.raw.intent, IntentType::Idle);
    }

    #[test]
    fn confirmed_reactions_feed_the_behavior_model() {
        let mut s = session();
        s.set_gaze_calibrated(true);
        // Hold gaze in the agree zone long enough for the zone to commit.
        for i in 0..30 {
            s.ingest_gaze(reading(1850.0, 540.0), i * 33);
            s.tick(i * 33);
        }
        assert_eq!(s.last_zone, Zone::Agree);

        for i in 0..12 {
            s.confirm_reaction(Reaction::Agree, None, 1000 + i);
        }
        let snapshot = s.model_snapshot();
        assert_eq!(snapshot.observations, 12);
        assert!(snapshot
            .patterns
            .iter()
            .any(|p| p.outcome == Reaction::Agree));
    }

    #[test]
    fn steering_truth_requires_head_pose() {
        let mut s = session();
        let truth = SteeringTruth {
            target_yaw_rad: 0.1,
            target_pitch_rad: 0.0,
            base_yaw_rad: 0.0,
            base_pitch_rad: 0.0,
        };
        // No face was ever detected: the click cannot anchor a calibration
        // sample.
        s.confirm_reaction(Reaction::Agree, Some(truth), 0);
        assert_eq!(s.calibration.sample_count(), 0);
    }

    #[test]
    fn reset_rebuilds_components_but_keeps_identity() {
        let mut s = session();
        let id = s.id.clone();
        s.set_feed_available(FeedKind::Gaze, false);
        for i in 0..50 {
            s.ingest_gaze(reading(960.0, 540.0), i * 16);
            s.tick(i * 16);
        }
        s.reset();
        assert_eq!(s.id, id);
        assert_eq!(s.stats().total_ticks, 0);
        assert_eq!(s.gaze_buffer.len(), 0);
        assert!(!s.capabilities().is_available(FeedKind::Gaze));
    }

    #[test]
    fn diagnostics_blob_has_expected_sections() {
        let s = session();
        let diag = s.diagnostics();
        assert!(diag.get("session_id").is_some());
        assert!(diag.get("stats").is_some());
        assert!(diag.get("behavior_model").is_some());
        assert!(diag.get("correction").is_some());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            smoothing_window: 0,
            ..Default::default()
        };
        assert!(AttentionSession::new(config).is_err());
    }
}
