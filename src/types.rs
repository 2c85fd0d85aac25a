// Shared data model for the attention pipeline
use serde::{Deserialize, Serialize};

/// A single timestamped gaze estimate in screen pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
    pub timestamp_ms: i64,
}

/// One raw reading from the gaze provider, before the core stamps arrival time.
/// Confidence is the provider's own per-sample estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GazeReading {
    pub x: f64,
    pub y: f64,
    pub confidence: f32,
}

/// A facial landmark in normalized image space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Coarse screen regions used as an attention proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Read,
    Agree,
    Disagree,
    Deeper,
    Flip,
    Wander,
}

/// The closed set of intent decisions the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Agree,
    Disagree,
    Deeper,
    Flip,
    Navigate,
    Compare,
    DeepRead,
    Confused,
    Fatigued,
    Engaged,
    PullingAway,
    Idle,
}

/// Which evidence stream a signal was decided from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Gaze,
    Face,
    Mouse,
    Fused,
}

/// One fused decision. Constructed fresh every fusion call, never mutated after.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntentSignal {
    pub intent: IntentType,
    pub confidence: f32,
    pub source: SignalSource,
    pub timestamp_ms: i64,
}

/// A confirmed user reaction, used as weak supervision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Agree,
    Disagree,
    Deeper,
    Flip,
}

/// Latest pointer position plus when it last moved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointerState {
    pub x: f64,
    pub y: f64,
    pub last_moved_ms: i64,
}

impl PointerState {
    pub fn is_active(&self, now_ms: i64, timeout_ms: i64) -> bool {
        now_ms - self.last_moved_ms <= timeout_ms
    }
}

/// A spatially tight cluster of recent gaze points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fixation {
    pub x: f64,
    pub y: f64,
    pub duration_ms: i64,
}
