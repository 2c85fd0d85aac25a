// Online per-user learning: reaction prediction from behavioral signals and
// passive steering calibration from click ground truth
pub mod behavior_model;
pub mod calibration;

pub use behavior_model::{
    BehaviorModel, BehaviorPattern, BehaviorSignal, LearningPhase, ModelSnapshot, Prediction,
};
pub use calibration::{CalibrationLearner, Correction};
