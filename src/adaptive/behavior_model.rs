// Online per-user behavior model. Learns which discrete behavioral signals
// co-occur with which confirmed reactions, then starts predicting reactions
// and scoring its own predictions against the next confirmed outcome. All
// learning is counting and correlation - interpretable and recomputable.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::face::FaceSignals;
use crate::types::{Reaction, Zone};

/// Face axes must clear this magnitude to register as a discrete signal.
const SIGNAL_AXIS_THRESHOLD: f32 = 0.25;

/// Observation counts gating the phase transitions.
const MODEL_PHASE_OBSERVATIONS: usize = 10;
const PREDICT_PHASE_OBSERVATIONS: usize = 20;
const REFINE_PHASE_PREDICTIONS: u32 = 5;

/// Minimum averaged correlation for a prediction to be emitted.
const PREDICTION_MIN_SCORE: f32 = 0.3;

/// Patterns below this correlation are noise and excluded from snapshots.
const PATTERN_MIN_CORRELATION: f32 = 0.1;

/// Discrete behavioral signals extracted from thresholded gaze and face state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorSignal {
    GazeRead,
    GazeAgree,
    GazeDisagree,
    GazeDeeper,
    GazeFlip,
    HeadNod,
    HeadShake,
    LeanIn,
    LeanBack,
    BrowRaise,
    BrowFurrow,
    Smile,
}

/// Learning phases, strictly ordered by observation and prediction counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningPhase {
    Observe,
    Model,
    Predict,
    Refine,
}

/// One confirmed observation in the append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorObservation {
    pub signals: Vec<BehaviorSignal>,
    pub outcome: Reaction,
    pub timestamp_ms: i64,
}

/// A learned signal-outcome correlation, derived from the running tallies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorPattern {
    pub signal: BehaviorSignal,
    pub outcome: Reaction,
    pub count: u32,
    pub correlation: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    pub reaction: Reaction,
    pub confidence: f32,
}

/// Read-only model state for diagnostic displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub phase: LearningPhase,
    pub observations: usize,
    pub predictions_scored: u32,
    pub prediction_accuracy: f32,
    pub patterns: Vec<BehaviorPattern>,
}

pub struct BehaviorModel {
    observations: Vec<BehaviorObservation>,
    signal_totals: HashMap<BehaviorSignal, u32>,
    co_occurrence: HashMap<(BehaviorSignal, Reaction), u32>,
    predictions_scored: u32,
    predictions_correct: u32,
    pending_prediction: Option<Reaction>,
    last_phase: LearningPhase,
}

impl BehaviorModel {
    pub fn new() -> Self {
        Self {
            observations: Vec::new(),
            signal_totals: HashMap::new(),
            co_occurrence: HashMap::new(),
            predictions_scored: 0,
            predictions_correct: 0,
            pending_prediction: None,
            last_phase: LearningPhase::Observe,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Threshold the current gaze zone and face axes into discrete signals.
    pub fn extract_signals(zone: Zone, face: &FaceSignals) -> Vec<BehaviorSignal> {
        let mut signals = Vec::new();
        match zone {
            Zone::Read => signals.push(BehaviorSignal::GazeRead),
            Zone::Agree => signals.push(BehaviorSignal::GazeAgree),
            Zone::Disagree => signals.push(BehaviorSignal::GazeDisagree),
            Zone::Deeper => signals.push(BehaviorSignal::GazeDeeper),
            Zone::Flip => signals.push(BehaviorSignal::GazeFlip),
            Zone::Wander => {}
        }
        if face.is_tracking {
            if face.head_nod > SIGNAL_AXIS_THRESHOLD {
                signals.push(BehaviorSignal::HeadNod);
            }
            if face.head_shake < -SIGNAL_AXIS_THRESHOLD {
                signals.push(BehaviorSignal::HeadShake);
            }
            if face.lean_in > SIGNAL_AXIS_THRESHOLD {
                signals.push(BehaviorSignal::LeanIn);
            }
            if face.lean_in < -SIGNAL_AXIS_THRESHOLD {
                signals.push(BehaviorSignal::LeanBack);
            }
            if face.brow_raise > SIGNAL_AXIS_THRESHOLD {
                signals.push(BehaviorSignal::BrowRaise);
            }
            if face.brow_furrow > SIGNAL_AXIS_THRESHOLD {
                signals.push(BehaviorSignal::BrowFurrow);
            }
            if face.smile > SIGNAL_AXIS_THRESHOLD {
                signals.push(BehaviorSignal::Smile);
            }
        }
        signals
    }

    pub fn phase(&self) -> LearningPhase {
        if self.observations.len() < MODEL_PHASE_OBSERVATIONS {
            LearningPhase::Observe
        } else if self.observations.len() < PREDICT_PHASE_OBSERVATIONS {
            LearningPhase::Model
        } else if self.predictions_scored < REFINE_PHASE_PREDICTIONS {
            LearningPhase::Predict
        } else {
            LearningPhase::Refine
        }
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    pub fn prediction_accuracy(&self) -> f32 {
        if self.predictions_scored == 0 {
            0.0
        } else {
            self.predictions_correct as f32 / self.predictions_scored as f32
        }
    }

    /// Record a confirmed outcome with the signal state that preceded it.
    /// Scores any outstanding prediction against this outcome first.
    pub fn record_observation(
        &mut self,
        zone: Zone,
        face: &FaceSignals,
        outcome: Reaction,
        now_ms: i64,
    ) {
        if let Some(predicted) = self.pending_prediction.take() {
            self.predictions_scored += 1;
            if predicted == outcome {
                self.predictions_correct += 1;
            }
        }

        let signals = Self::extract_signals(zone, face);
        for signal in &signals {
            *self.signal_totals.entry(*signal).or_insert(0) += 1;
            *self.co_occurrence.entry((*signal, outcome)).or_insert(0) += 1;
        }
        self.observations.push(BehaviorObservation {
            signals,
            outcome,
            timestamp_ms: now_ms,
        });

        let phase = self.phase();
        if phase != self.last_phase {
            log::info!(
                "behavior model entered {:?} phase after {} observations",
                phase,
                self.observations.len()
            );
            self.last_phase = phase;
        }
    }

    /// Predict the next reaction from the current signal state. Remembers the
    /// prediction so the next confirmed outcome can score it.
    pub fn predict(&mut self, zone: Zone, face: &FaceSignals) -> Option<Prediction> {
        if self.observations.len() < PREDICT_PHASE_OBSERVATIONS {
            return None;
        }
        let signals = Self::extract_signals(zone, face);
        if signals.is_empty() {
            return None;
        }

        let mut best: Option<(Reaction, f32)> = None;
        for outcome in [
            Reaction::Agree,
            Reaction::Disagree,
            Reaction::Deeper,
            Reaction::Flip,
        ] {
            let mut sum = 0.0f32;
            let mut contributing = 0u32;
            for signal in &signals {
                let total = self.signal_totals.get(signal).copied().unwrap_or(0);
                let co = self
                    .co_occurrence
                    .get(&(*signal, outcome))
                    .copied()
                    .unwrap_or(0);
                if total > 0 && co > 0 {
                    sum += co as f32 / total as f32;
                    contributing += 1;
                }
            }
            if contributing == 0 {
                continue;
            }
            let score = sum / contributing as f32;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((outcome, score));
            }
        }

        let (reaction, score) = best?;
        if score < PREDICTION_MIN_SCORE {
            return None;
        }

        let confidence = (score * (0.5 + 0.5 * self.prediction_accuracy())).min(1.0);
        self.pending_prediction = Some(reaction);
        Some(Prediction {
            reaction,
            confidence,
        })
    }

    /// Derive the full pattern list and phase state on demand.
    pub fn snapshot(&self) -> ModelSnapshot {
        let mut patterns: Vec<BehaviorPattern> = self
            .co_occurrence
            .iter()
            .filter_map(|(&(signal, outcome), &count)| {
                let total = self.signal_totals.get(&signal).copied().unwrap_or(0);
                if total == 0 {
                    return None;
                }
                let correlation = count as f32 / total as f32;
                if correlation > PATTERN_MIN_CORRELATION {
                    Some(BehaviorPattern {
                        signal,
                        outcome,
                        count,
                        correlation,
                    })
                } else {
                    None
                }
            })
            .collect();
        patterns.sort_by(|a, b| {
            b.correlation
                .partial_cmp(&a.correlation)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.count.cmp(&a.count))
                .then(a.signal.cmp(&b.signal))
                .then(a.outcome.cmp(&b.outcome))
        });

        ModelSnapshot {
            phase: self.phase(),
            observations: self.observations.len(),
            predictions_scored: self.predictions_scored,
            prediction_accuracy: self.prediction_accuracy(),
            patterns,
        }
    }
}

impl Default for BehaviorModel {
    fn default() -> Self {
        Self::new()
    }
}
