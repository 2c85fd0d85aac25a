// Passive steering calibration. Every confirmed click is weak ground truth:
// the user was steering at the thing they clicked, so the gap between the
// head pose we read and the offset that would have pointed at the target is
// systematic bias. A per-axis linear fit over a rolling window corrects it,
// weighted toward recent clicks so posture changes age out of the model.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Rolling sample window.
const SAMPLE_CAP: usize = 50;

/// No model is fit below this many samples.
const MIN_FIT_SAMPLES: usize = 5;

/// Confidence reaches 1.0 at this many samples.
const FULL_CONFIDENCE_SAMPLES: usize = 20;

/// Sample weight half-life for the time-decayed fit.
const DECAY_HALF_LIFE_MS: f64 = 60_000.0;

/// Degenerate-fit guards.
const SCALE_MIN: f64 = 0.3;
const SCALE_MAX: f64 = 3.0;
const VARIANCE_EPSILON: f64 = 1e-9;

/// Clicked-target offsets normalize against this maximum angle, the steering
/// counterpart of the head pose normalization range.
const MAX_INTENDED_OFFSET_RAD: f64 = 30.0 * std::f64::consts::PI / 180.0;

/// One click's worth of ground truth, in normalized [-1,1] units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub head_yaw: f64,
    pub head_pitch: f64,
    pub intended_yaw: f64,
    pub intended_pitch: f64,
    pub timestamp_ms: i64,
}

/// Per-axis linear correction, blended by confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Correction {
    pub yaw_scale: f64,
    pub yaw_offset: f64,
    pub pitch_scale: f64,
    pub pitch_offset: f64,
    pub confidence: f32,
}

impl Correction {
    pub fn identity() -> Self {
        Self {
            yaw_scale: 1.0,
            yaw_offset: 0.0,
            pitch_scale: 1.0,
            pitch_offset: 0.0,
            confidence: 0.0,
        }
    }

    /// Apply the correction, blending raw and corrected by confidence:
    /// full raw at confidence 0, full corrected at 1.
    pub fn correct(&self, raw_yaw: f64, raw_pitch: f64) -> (f64, f64) {
        let corrected_yaw = raw_yaw * self.yaw_scale + self.yaw_offset;
        let corrected_pitch = raw_pitch * self.pitch_scale + self.pitch_offset;
        let blend = self.confidence as f64;
        (
            raw_yaw + (corrected_yaw - raw_yaw) * blend,
            raw_pitch + (corrected_pitch - raw_pitch) * blend,
        )
    }
}

pub struct CalibrationLearner {
    samples: VecDeque<CalibrationSample>,
    correction: Correction,
}

impl CalibrationLearner {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(SAMPLE_CAP),
            correction: Correction::identity(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn correction(&self) -> Correction {
        self.correction
    }

    /// Record a confirmed click: the target's direction relative to the
    /// current view base direction, against the head pose read at the time.
    /// Angles wrap to [-pi,pi] before normalizing into [-1,1].
    #[allow(clippy::too_many_arguments)]
    pub fn record_click(
        &mut self,
        head_yaw: f64,
        head_pitch: f64,
        target_yaw_rad: f64,
        target_pitch_rad: f64,
        base_yaw_rad: f64,
        base_pitch_rad: f64,
        now_ms: i64,
    ) {
        let intended_yaw = wrap_angle(target_yaw_rad - base_yaw_rad) / MAX_INTENDED_OFFSET_RAD;
        let intended_pitch =
            wrap_angle(target_pitch_rad - base_pitch_rad) / MAX_INTENDED_OFFSET_RAD;
        self.add_sample(
            head_yaw,
            head_pitch,
            intended_yaw.clamp(-1.0, 1.0),
            intended_pitch.clamp(-1.0, 1.0),
            now_ms,
        );
    }

    /// Append one normalized sample and refit. The fit is deterministic from
    /// the current window alone.
    pub fn add_sample(
        &mut self,
        head_yaw: f64,
        head_pitch: f64,
        intended_yaw: f64,
        intended_pitch: f64,
        now_ms: i64,
    ) {
        if self.samples.len() == SAMPLE_CAP {
            self.samples.pop_front();
        }
        self.samples.push_back(CalibrationSample {
            head_yaw,
            head_pitch,
            intended_yaw,
            intended_pitch,
            timestamp_ms: now_ms,
        });
        self.refit(now_ms);
    }

    /// Apply the current correction to a raw head pose reading.
    pub fn correct(&self, raw_yaw: f64, raw_pitch: f64) -> (f64, f64) {
        self.correction.correct(raw_yaw, raw_pitch)
    }

    fn refit(&mut self, now_ms: i64) {
        if self.samples.len() < MIN_FIT_SAMPLES {
            self.correction = Correction::identity();
            return;
        }

        let weights: Vec<f64> = self
            .samples
            .iter()
            .map(|s| 0.5f64.powf((now_ms - s.timestamp_ms) as f64 / DECAY_HALF_LIFE_MS))
            .collect();

        let (yaw_scale, yaw_offset) = weighted_fit(
            self.samples.iter().map(|s| (s.head_yaw, s.intended_yaw)),
            &weights,
        );
        let (pitch_scale, pitch_offset) = weighted_fit(
            self.samples.iter().map(|s| (s.head_pitch, s.intended_pitch)),
            &weights,
        );

        let confidence = (self.samples.len() as f32 / FULL_CONFIDENCE_SAMPLES as f32).min(1.0);
        self.correction = Correction {
            yaw_scale,
            yaw_offset,
            pitch_scale,
            pitch_offset,
            confidence,
        };
        log::debug!(
            "calibration refit over {} samples: yaw {:.3}x{:+.3}, pitch {:.3}x{:+.3}, confidence {:.2}",
            self.samples.len(),
            yaw_scale,
            yaw_offset,
            pitch_scale,
            pitch_offset,
            confidence
        );
    }
}

impl Default for CalibrationLearner {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponentially time-decayed weighted least squares for one axis. Falls back
/// to unit scale with a mean-matching offset when head pose has no variance.
fn weighted_fit(pairs: impl Iterator<Item = (f64, f64)> + Clone, weights: &[f64]) -> (f64, f64) {
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return (1.0, 0.0);
    }

    let mut head_mean = 0.0;
    let mut intended_mean = 0.0;
    for ((head, intended), w) in pairs.clone().zip(weights) {
        head_mean += w * head;
        intended_mean += w * intended;
    }
    head_mean /= weight_sum;
    intended_mean /= weight_sum;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for ((head, intended), w) in pairs.zip(weights) {
        let dh = head - head_mean;
        covariance += w * dh * (intended - intended_mean);
        variance += w * dh * dh;
    }

    if variance < VARIANCE_EPSILON {
        return (1.0, intended_mean - head_mean);
    }

    let scale = (covariance / variance).clamp(SCALE_MIN, SCALE_MAX);
    let offset = intended_mean - scale * head_mean;
    (scale, offset)
}

fn wrap_angle(angle: f64) -> f64 {
    let mut wrapped = angle % std::f64::consts::TAU;
    if wrapped > std::f64::consts::PI {
        wrapped -= std::f64::consts::TAU;
    } else if wrapped < -std::f64::consts::PI {
        wrapped += std::f64::consts::TAU;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_model_below_five_samples() {
        let mut learner = CalibrationLearner::new();
        for i in 0..4 {
            learner.add_sample(0.1 * i as f64, 0.0, 0.5, 0.0, i * 1000);
        }
        let correction = learner.correction();
        assert_eq!(correction.confidence, 0.0);
        // Pass-through below the fit threshold.
        assert_eq!(learner.correct(0.42, -0.17), (0.42, -0.17));
    }

    #[test]
    fn converges_on_exact_linear_bias() {
        let mut learner = CalibrationLearner::new();
        for i in 0..30 {
            let head = -0.4 + 0.025 * i as f64;
            learner.add_sample(head, head, 2.0 * head + 0.1, 2.0 * head + 0.1, i * 500);
        }
        let correction = learner.correction();
        assert!((correction.yaw_scale - 2.0).abs() < 1e-6);
        assert!((correction.yaw_offset - 0.1).abs() < 1e-6);
        assert!((correction.pitch_scale - 2.0).abs() < 1e-6);
        assert!((correction.pitch_offset - 0.1).abs() < 1e-6);
        assert_eq!(correction.confidence, 1.0);

        // Full confidence applies the full correction.
        let (yaw, _) = learner.correct(0.2, 0.0);
        assert!((yaw - 0.5).abs() < 1e-6);
    }

    #[test]
    fn scale_is_clamped_against_degenerate_fits() {
        let mut learner = CalibrationLearner::new();
        // Nearly flat head motion mapped onto a huge intended swing.
        for i in 0..10 {
            let head = 0.001 * i as f64;
            learner.add_sample(head, 0.0, head * 100.0, 0.0, i * 1000);
        }
        let correction = learner.correction();
        assert_eq!(correction.yaw_scale, SCALE_MAX);
    }

    #[test]
    fn zero_variance_falls_back_to_offset_from_means() {
        let mut learner = CalibrationLearner::new();
        for i in 0..8 {
            learner.add_sample(0.2, 0.2, 0.6, 0.6, i * 1000);
        }
        let correction = learner.correction();
        assert_eq!(correction.yaw_scale, 1.0);
        assert!((correction.yaw_offset - 0.4).abs() < 1e-9);
    }

    #[test]
    fn confidence_blends_raw_and_corrected() {
        let mut learner = CalibrationLearner::new();
        // 10 samples: confidence 0.5.
        for i in 0..10 {
            let head = -0.4 + 0.08 * i as f64;
            learner.add_sample(head, 0.0, 2.0 * head, 0.0, i * 1000);
        }
        let correction = learner.correction();
        assert_eq!(correction.confidence, 0.5);
        let (yaw, _) = learner.correct(0.3, 0.0);
        // Corrected would be 0.6; halfway blend lands at 0.45.
        assert!((yaw - 0.45).abs() < 1e-6);
    }

    #[test]
    fn window_is_capped_at_fifty() {
        let mut learner = CalibrationLearner::new();
        for i in 0..80 {
            learner.add_sample(0.0, 0.0, 0.0, 0.0, i * 100);
        }
        assert_eq!(learner.sample_count(), 50);
    }

    #[test]
    fn recent_samples_outweigh_stale_ones() {
        let mut learner = CalibrationLearner::new();
        // Old regime: intended = head. Newer regime (several half-lives
        // later): intended = head + 0.5. The fit must track the new bias.
        for i in 0..10 {
            let head = -0.4 + 0.08 * i as f64;
            learner.add_sample(head, 0.0, head, 0.0, i * 100);
        }
        for i in 0..10 {
            let head = -0.4 + 0.08 * i as f64;
            learner.add_sample(head, 0.0, head + 0.5, 0.0, 600_000 + i * 100);
        }
        let correction = learner.correction();
        assert!(
            correction.yaw_offset > 0.45,
            "offset {} still dominated by stale samples",
            correction.yaw_offset
        );
    }

    #[test]
    fn record_click_normalizes_and_wraps_angles() {
        let mut learner = CalibrationLearner::new();
        // Target just across the -pi/pi seam from the base direction: the
        // wrapped difference is small, not nearly a full turn.
        let base = std::f64::consts::PI - 0.1;
        let target = -std::f64::consts::PI + 0.1;
        for i in 0..6 {
            learner.record_click(0.0, 0.0, target, 0.0, base, 0.0, i * 1000);
        }
        let sample = learner.samples.back().unwrap();
        let expected = 0.2 / MAX_INTENDED_OFFSET_RAD;
        assert!((sample.intended_yaw - expected).abs() < 1e-9);
    }
}
