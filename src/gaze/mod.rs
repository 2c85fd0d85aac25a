// Gaze-side processing: rolling-buffer feature extraction and zone classification
pub mod features;
pub mod zones;

pub use features::{compute_blink_rate, detect_fixation, detect_saccades, estimate_engagement};
pub use zones::{ZoneClassifier, ZoneTable, ZoneUpdate};
