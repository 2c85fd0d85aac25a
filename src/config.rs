// Engine configuration with tuned defaults
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Cadence of the smoothing loop.
    pub tick_rate_hz: u32,
    /// Capacity of the rolling gaze point buffer.
    pub gaze_buffer_capacity: usize,
    /// Size of the intent history window used for smoothing.
    pub smoothing_window: usize,
    /// Pointer counts as active if it moved within this window.
    pub pointer_timeout_ms: i64,
    /// Gaze below this provider confidence is not usable for fusion.
    pub gaze_confidence_threshold: f32,
    /// Cluster radius for fixation detection.
    pub fixation_threshold_px: f64,
    /// Minimum cluster time span for a fixation.
    pub fixation_min_duration_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
            tick_rate_hz: 30,
            gaze_buffer_capacity: 60,
            smoothing_window: 5,
            pointer_timeout_ms: 2000,
            gaze_confidence_threshold: 0.3,
            fixation_threshold_px: 50.0,
            fixation_min_duration_ms: 200,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(EngineError::InvalidConfig(
                "screen dimensions must be non-zero".into(),
            ));
        }
        if self.tick_rate_hz == 0 {
            return Err(EngineError::InvalidConfig("tick rate must be non-zero".into()));
        }
        if self.gaze_buffer_capacity < 2 {
            return Err(EngineError::InvalidConfig(
                "gaze buffer needs at least 2 samples".into(),
            ));
        }
        if self.smoothing_window == 0 {
            return Err(EngineError::InvalidConfig(
                "smoothing window must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_screen() {
        let config = EngineConfig {
            screen_width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
