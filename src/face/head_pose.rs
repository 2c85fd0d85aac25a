// Head pose normalization from the provider's per-frame rigid transform.
// Auto-centers on the user's resting posture: a one-shot neutral capture over
// the first frames, then a much slower rolling recalibration that absorbs
// postural drift without ever jumping.
use serde::{Deserialize, Serialize};

/// Raw angles are normalized against this maximum before centering.
const MAX_ANGLE_RAD: f64 = 12.0 * std::f64::consts::PI / 180.0;

/// Valid frames batched into the one-shot neutral offset.
const CALIBRATION_FRAMES: usize = 15;

/// Per-frame rate of the rolling recalibration. Intentionally orders of
/// magnitude slower than the one-shot capture: the session offset can never
/// be overwritten in fewer than dozens of frames.
const DRIFT_RATE: f64 = 0.005;

/// Output smoothing rate, fast enough to stay responsive for steering.
const OUTPUT_SMOOTHING: f64 = 0.7;

/// Normalized head orientation in roughly [-1,1] per axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub face_detected: bool,
}

/// Stateful normalizer over the facial rigid-transform feed.
pub struct HeadPoseNormalizer {
    calibration_buffer: Vec<(f64, f64)>,
    neutral: Option<(f64, f64)>,
    smoothed: Option<(f64, f64)>,
}

impl HeadPoseNormalizer {
    pub fn new() -> Self {
        Self {
            calibration_buffer: Vec::with_capacity(CALIBRATION_FRAMES),
            neutral: None,
            smoothed: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True once the neutral offset has been captured.
    pub fn is_calibrated(&self) -> bool {
        self.neutral.is_some()
    }

    /// Process one frame. `transform` is the provider's 4x4 row-major rigid
    /// transform, or `None` when no face was detected this frame.
    pub fn process(&mut self, transform: Option<&[f64; 16]>) -> HeadPose {
        let matrix = match transform {
            Some(m) => m,
            None => {
                // Hold the last smoothed value so downstream steering does not
                // snap to center on a single dropped frame.
                let (yaw, pitch) = self.smoothed.unwrap_or((0.0, 0.0));
                return HeadPose {
                    yaw: yaw as f32,
                    pitch: pitch as f32,
                    face_detected: false,
                };
            }
        };

        let (yaw_rad, pitch_rad) = extract_angles(matrix);
        let norm_yaw = (yaw_rad / MAX_ANGLE_RAD).clamp(-1.0, 1.0);
        let norm_pitch = (pitch_rad / MAX_ANGLE_RAD).clamp(-1.0, 1.0);

        let (neutral_yaw, neutral_pitch) = match self.neutral {
            None => {
                self.calibration_buffer.push((norm_yaw, norm_pitch));
                if self.calibration_buffer.len() >= CALIBRATION_FRAMES {
                    let n = self.calibration_buffer.len() as f64;
                    let yaw = self.calibration_buffer.iter().map(|v| v.0).sum::<f64>() / n;
                    let pitch = self.calibration_buffer.iter().map(|v| v.1).sum::<f64>() / n;
                    self.neutral = Some((yaw, pitch));
                    self.calibration_buffer.clear();
                    log::info!(
                        "head pose neutral captured: yaw {:.3} pitch {:.3}",
                        yaw,
                        pitch
                    );
                }
                // No steering output until the neutral exists.
                return HeadPose {
                    yaw: 0.0,
                    pitch: 0.0,
                    face_detected: true,
                };
            }
            Some(neutral) => neutral,
        };

        // Rolling recalibration toward the live reading.
        let neutral_yaw = neutral_yaw + DRIFT_RATE * (norm_yaw - neutral_yaw);
        let neutral_pitch = neutral_pitch + DRIFT_RATE * (norm_pitch - neutral_pitch);
        self.neutral = Some((neutral_yaw, neutral_pitch));

        let centered_yaw = (norm_yaw - neutral_yaw).clamp(-1.0, 1.0);
        let centered_pitch = (norm_pitch - neutral_pitch).clamp(-1.0, 1.0);

        let smoothed = match self.smoothed {
            Some((sy, sp)) => (
                sy + OUTPUT_SMOOTHING * (centered_yaw - sy),
                sp + OUTPUT_SMOOTHING * (centered_pitch - sp),
            ),
            None => (centered_yaw, centered_pitch),
        };
        self.smoothed = Some(smoothed);

        HeadPose {
            yaw: smoothed.0 as f32,
            pitch: smoothed.1 as f32,
            face_detected: true,
        }
    }
}

impl Default for HeadPoseNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Yaw/pitch from the rotation block of a row-major 4x4 transform, under the
/// provider's Rx(pitch)*Ry(yaw) convention.
fn extract_angles(m: &[f64; 16]) -> (f64, f64) {
    let r20 = m[8];
    let r21 = m[9];
    let r22 = m[10];
    let yaw = (-r20).atan2(r22);
    let pitch = r21.clamp(-1.0, 1.0).asin();
    (yaw, pitch)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Row-major transform for the provider's Rx(pitch)*Ry(yaw) convention.
    fn transform(yaw: f64, pitch: f64) -> [f64; 16] {
        let (sy, cy) = yaw.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        [
            cy,
            0.0,
            sy,
            0.0,
            sp * sy,
            cp,
            -sp * cy,
            0.0,
            -cp * sy,
            sp,
            cp * cy,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ]
    }

    fn degrees(d: f64) -> f64 {
        d * std::f64::consts::PI / 180.0
    }

    #[test]
    fn angle_extraction_round_trips() {
        let m = transform(degrees(8.0), degrees(-5.0));
        let (yaw, pitch) = extract_angles(&m);
        assert!((yaw - degrees(8.0)).abs() < 1e-9);
        assert!((pitch - degrees(-5.0)).abs() < 1e-9);
    }

    #[test]
    fn calibration_window_emits_zero() {
        let mut n = HeadPoseNormalizer::new();
        let m = transform(degrees(6.0), degrees(3.0));
        for _ in 0..CALIBRATION_FRAMES {
            let pose = n.process(Some(&m));
            assert_eq!(pose.yaw, 0.0);
            assert_eq!(pose.pitch, 0.0);
            assert!(pose.face_detected);
        }
        assert!(n.is_calibrated());
    }

    #[test]
    fn neutral_posture_reads_near_zero_after_calibration() {
        let mut n = HeadPoseNormalizer::new();
        let m = transform(degrees(6.0), degrees(3.0));
        for _ in 0..CALIBRATION_FRAMES + 10 {
            n.process(Some(&m));
        }
        let pose = n.process(Some(&m));
        assert!(pose.yaw.abs() < 0.01, "yaw {}", pose.yaw);
        assert!(pose.pitch.abs() < 0.01, "pitch {}", pose.pitch);
    }

    #[test]
    fn turn_after_calibration_reads_as_offset() {
        let mut n = HeadPoseNormalizer::new();
        let neutral = transform(0.0, 0.0);
        for _ in 0..CALIBRATION_FRAMES {
            n.process(Some(&neutral));
        }
        // Turn halfway to the max angle.
        let turned = transform(degrees(6.0), 0.0);
        let mut pose = n.process(Some(&turned));
        for _ in 0..10 {
            pose = n.process(Some(&turned));
        }
        assert!(pose.yaw > 0.4, "yaw {}", pose.yaw);
        assert!(pose.pitch.abs() < 0.05);
    }

    #[test]
    fn rolling_recalibration_is_slow() {
        let mut n = HeadPoseNormalizer::new();
        let neutral = transform(0.0, 0.0);
        for _ in 0..CALIBRATION_FRAMES {
            n.process(Some(&neutral));
        }
        // A sustained turn must not be absorbed into neutral within dozens of
        // frames: after 50 frames the offset still reads close to full.
        let turned = transform(degrees(6.0), 0.0);
        let mut pose = HeadPose {
            yaw: 0.0,
            pitch: 0.0,
            face_detected: true,
        };
        for _ in 0..50 {
            pose = n.process(Some(&turned));
        }
        assert!(pose.yaw > 0.35, "neutral absorbed the turn too fast: {}", pose.yaw);
    }

    #[test]
    fn face_loss_holds_last_output() {
        let mut n = HeadPoseNormalizer::new();
        let neutral = transform(0.0, 0.0);
        for _ in 0..CALIBRATION_FRAMES {
            n.process(Some(&neutral));
        }
        let turned = transform(degrees(6.0), 0.0);
        let mut held = 0.0f32;
        for _ in 0..10 {
            held = n.process(Some(&turned)).yaw;
        }
        let pose = n.process(None);
        assert!(!pose.face_detected);
        assert_eq!(pose.yaw, held);
    }

    #[test]
    fn face_loss_before_first_frame_reads_zero() {
        let mut n = HeadPoseNormalizer::new();
        let pose = n.process(None);
        assert!(!pose.face_detected);
        assert_eq!(pose.yaw, 0.0);
        assert_eq!(pose.pitch, 0.0);
    }
}
