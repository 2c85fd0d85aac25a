// Evidence fusion: the priority cascade and the fixed-rate smoothing state
pub mod engine;
pub mod smoothing;

pub use engine::{fuse, GazeEvidence, PointerEvidence};
pub use smoothing::{IntentSmoother, SmoothedIntent};
