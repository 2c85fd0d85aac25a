// Face signal extraction: raw landmark geometry to six normalized behavioral
// axes. Brow and lip axes are measured against a baseline captured over the
// first frames of the session; motion axes are frame-to-frame deltas. All
// axes share one exponential smoothing constant.
use serde::{Deserialize, Serialize};

use crate::face::landmarks::{
    distance, CHIN, EXPECTED_LANDMARK_COUNT, FOREHEAD, LEFT_BROW, LEFT_CHEEK, LEFT_EYE_TOP,
    LOWER_LIP, MOUTH_LEFT, MOUTH_RIGHT, NOSE_TIP, RIGHT_BROW, RIGHT_CHEEK, RIGHT_EYE_TOP,
    UPPER_LIP,
};
use crate::types::Landmark;

/// Shared smoothing weight per frame: fast-reacting but not raw.
const AXIS_SMOOTHING: f64 = 0.3;

/// Frames of brow distance / lip width averaged into the one-shot baseline.
const BASELINE_FRAMES: u32 = 15;

/// Gains mapping raw geometry into roughly [-1,1] / [0,1].
const NOD_SCALE: f64 = 30.0;
const SHAKE_SCALE: f64 = 30.0;
const LEAN_SCALE: f64 = 12.0;
const BROW_SCALE: f64 = 8.0;
const SMILE_WIDTH_SCALE: f64 = 6.0;
const SMILE_ASPECT_NEUTRAL: f64 = 5.0;
const SMILE_ASPECT_WEIGHT: f64 = 0.25;

const GEOMETRY_EPSILON: f64 = 1e-6;

/// Normalized behavioral axes derived from the face. Signed axes sit in
/// [-1,1], unsigned in [0,1]; every value is clamped to its declared range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaceSignals {
    /// Positive while the head moves down (nod direction).
    pub head_nod: f32,
    /// Positive while the head moves right, negative left.
    pub head_shake: f32,
    /// Positive while the face grows in frame (leaning in), negative out.
    pub lean_in: f32,
    pub brow_raise: f32,
    pub brow_furrow: f32,
    pub smile: f32,
    pub is_tracking: bool,
}

impl FaceSignals {
    /// Degraded output when no usable face is in frame.
    pub fn untracked() -> Self {
        Self {
            head_nod: 0.0,
            head_shake: 0.0,
            lean_in: 0.0,
            brow_raise: 0.0,
            brow_furrow: 0.0,
            smile: 0.0,
            is_tracking: false,
        }
    }
}

/// Running mean over the first N valid frames, then frozen for the session.
#[derive(Debug, Default)]
struct Baseline {
    sum: f64,
    frames: u32,
}

impl Baseline {
    fn observe(&mut self, value: f64) {
        if self.frames < BASELINE_FRAMES {
            self.sum += value;
            self.frames += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        if self.frames >= BASELINE_FRAMES {
            Some(self.sum / self.frames as f64)
        } else {
            None
        }
    }
}

/// Stateful frame-by-frame extractor. One instance per session; baselines are
/// captured exactly once and survive temporary face loss until `reset`.
pub struct FaceSignalProcessor {
    prev_nose: Option<(f64, f64)>,
    prev_face_area: Option<f64>,
    brow_baseline: Baseline,
    lip_baseline: Baseline,
    nod: f64,
    shake: f64,
    lean: f64,
    raise: f64,
    furrow: f64,
    smile: f64,
}

impl FaceSignalProcessor {
    pub fn new() -> Self {
        Self {
            prev_nose: None,
            prev_face_area: None,
            brow_baseline: Baseline::default(),
            lip_baseline: Baseline::default(),
            nod: 0.0,
            shake: 0.0,
            lean: 0.0,
            raise: 0.0,
            furrow: 0.0,
            smile: 0.0,
        }
    }

    /// Full reinitialization: the only way baselines are ever recomputed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn process(&mut self, landmarks: &[Landmark]) -> FaceSignals {
        if landmarks.len() < EXPECTED_LANDMARK_COUNT {
            // Face lost: break the frame-delta chain so motion axes do not
            // spike when the face returns. Baselines stay frozen.
            self.prev_nose = None;
            self.prev_face_area = None;
            return FaceSignals::untracked();
        }

        let nose = &landmarks[NOSE_TIP];

        let (nod_raw, shake_raw) = match self.prev_nose {
            Some((px, py)) => (
                ((nose.y - py) * NOD_SCALE).clamp(-1.0, 1.0),
                ((nose.x - px) * SHAKE_SCALE).clamp(-1.0, 1.0),
            ),
            None => (0.0, 0.0),
        };
        self.prev_nose = Some((nose.x, nose.y));

        // Bounding-box area proxy: face width times face height.
        let face_area = distance(&landmarks[LEFT_CHEEK], &landmarks[RIGHT_CHEEK])
            * distance(&landmarks[FOREHEAD], &landmarks[CHIN]);
        let lean_raw = match self.prev_face_area {
            Some(prev) if prev > GEOMETRY_EPSILON => {
                ((face_area / prev - 1.0) * LEAN_SCALE).clamp(-1.0, 1.0)
            }
            _ => 0.0,
        };
        self.prev_face_area = Some(face_area);

        let brow_dist = (distance(&landmarks[LEFT_BROW], &landmarks[LEFT_EYE_TOP])
            + distance(&landmarks[RIGHT_BROW], &landmarks[RIGHT_EYE_TOP]))
            / 2.0;
        self.brow_baseline.observe(brow_dist);
        let (raise_raw, furrow_raw) = match self.brow_baseline.value() {
            Some(base) if base > GEOMETRY_EPSILON => {
                let deviation = (brow_dist - base) / base;
                if deviation > 0.0 {
                    ((deviation * BROW_SCALE).clamp(0.0, 1.0), 0.0)
                } else {
                    (0.0, (-deviation * BROW_SCALE).clamp(0.0, 1.0))
                }
            }
            _ => (0.0, 0.0),
        };

        let lip_width = distance(&landmarks[MOUTH_LEFT], &landmarks[MOUTH_RIGHT]);
        let lip_height = distance(&landmarks[UPPER_LIP], &landmarks[LOWER_LIP]);
        self.lip_baseline.observe(lip_width);
        let smile_raw = match self.lip_baseline.value() {
            Some(base) if base > GEOMETRY_EPSILON => {
                let width_dev = lip_width / base - 1.0;
                let aspect = lip_width / lip_height.max(GEOMETRY_EPSILON);
                let aspect_dev = (aspect - SMILE_ASPECT_NEUTRAL) / SMILE_ASPECT_NEUTRAL;
                (width_dev * SMILE_WIDTH_SCALE + aspect_dev * SMILE_ASPECT_WEIGHT)
                    .clamp(0.0, 1.0)
            }
            _ => 0.0,
        };

        self.nod = smooth(self.nod, nod_raw);
        self.shake = smooth(self.shake, shake_raw);
        self.lean = smooth(self.lean, lean_raw);
        self.raise = smooth(self.raise, raise_raw);
        self.furrow = smooth(self.furrow, furrow_raw);
        self.smile = smooth(self.smile, smile_raw);

        FaceSignals {
            head_nod: self.nod.clamp(-1.0, 1.0) as f32,
            head_shake: self.shake.clamp(-1.0, 1.0) as f32,
            lean_in: self.lean.clamp(-1.0, 1.0) as f32,
            brow_raise: self.raise.clamp(0.0, 1.0) as f32,
            brow_furrow: self.furrow.clamp(0.0, 1.0) as f32,
            smile: self.smile.clamp(0.0, 1.0) as f32,
            is_tracking: true,
        }
    }
}

impl Default for FaceSignalProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn smooth(previous: f64, target: f64) -> f64 {
    previous + AXIS_SMOOTHING * (target - previous)
}
