// attune - passive attention and intent inference.
//
// Ingests noisy, asynchronously-arriving gaze and facial-landmark signals
// and turns them into a single discrete intent decision with a confidence
// score, while learning the user's own signal-reaction correlations and
// steering bias from ordinary interaction - no calibration wizard.
//
// The embedding application owns the sensors and the screen; this crate
// owns everything between a raw sample and a decision.

pub mod adaptive;
pub mod config;
pub mod error;
pub mod face;
pub mod fusion;
pub mod gaze;
pub mod providers;
pub mod runtime;
pub mod session;
pub mod types;

pub use adaptive::{BehaviorModel, CalibrationLearner, Correction, LearningPhase, Prediction};
pub use config::EngineConfig;
pub use error::EngineError;
pub use face::{FaceSignalProcessor, FaceSignals, HeadPose, HeadPoseNormalizer};
pub use fusion::{fuse, GazeEvidence, IntentSmoother, PointerEvidence, SmoothedIntent};
pub use gaze::{ZoneClassifier, ZoneTable, ZoneUpdate};
pub use providers::{FeedKind, PerceptionCapabilities};
pub use runtime::AttentionEngine;
pub use session::{AttentionSession, IntentUpdate, SessionStats, SteeringTruth};
pub use types::{
    Fixation, GazePoint, GazeReading, IntentSignal, IntentType, Landmark, PointerState, Reaction,
    SignalSource, Zone,
};
