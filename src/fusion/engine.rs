// Priority-ordered fusion of gaze, face and pointer evidence into one intent.
// The cascade is absolute: the first matching rule wins and later rules are
// unreachable once an earlier one fires. Thresholds and confidence clamps are
// behavioral contracts - tuned empirically, not derived.
use serde::{Deserialize, Serialize};

use crate::face::FaceSignals;
use crate::types::{Fixation, IntentSignal, IntentType, SignalSource, Zone};

const FATIGUE_BLINK_RATE: f64 = 25.0;
const DARTING_SACCADE_RATE: f64 = 2.0;
const LONG_FIXATION_MS: i64 = 1000;
const LEAN_ENGAGED_FIXATION_MS: i64 = 800;
const USABLE_GAZE_CONFIDENCE: f32 = 0.3;

/// Gaze-side evidence for one fusion call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GazeEvidence {
    pub fixation: Option<Fixation>,
    pub blink_rate: f64,
    pub saccade_rate: f64,
    pub engagement: f32,
    pub zone: Zone,
    /// Set by the embedder once the gaze provider reports calibration.
    pub calibrated: bool,
    /// Latest provider confidence for the gaze estimate.
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointerEvidence {
    pub active: bool,
}

fn signal(intent: IntentType, confidence: f32, source: SignalSource, now_ms: i64) -> IntentSignal {
    IntentSignal {
        intent,
        confidence,
        source,
        timestamp_ms: now_ms,
    }
}

fn zone_intent(zone: Zone) -> Option<IntentType> {
    match zone {
        Zone::Agree => Some(IntentType::Agree),
        Zone::Disagree => Some(IntentType::Disagree),
        Zone::Deeper => Some(IntentType::Deeper),
        Zone::Flip => Some(IntentType::Flip),
        Zone::Read => Some(IntentType::DeepRead),
        Zone::Wander => None,
    }
}

/// Stateless decision function over the three evidence streams.
pub fn fuse(
    gaze: &GazeEvidence,
    face: &FaceSignals,
    pointer: &PointerEvidence,
    now_ms: i64,
) -> IntentSignal {
    let gaze_usable = gaze.calibrated && gaze.confidence > USABLE_GAZE_CONFIDENCE;
    let wandering = gaze.zone == Zone::Wander;
    let darting = gaze.saccade_rate > DARTING_SACCADE_RATE;

    // 1. Heavy blinking dominates everything else.
    if gaze.blink_rate > FATIGUE_BLINK_RATE {
        let confidence = ((gaze.blink_rate / 50.0) as f32).clamp(0.5, 1.0);
        return signal(IntentType::Fatigued, confidence, SignalSource::Gaze, now_ms);
    }

    // 2. Furrowed brow plus darting eyes.
    if face.is_tracking && face.brow_furrow > 0.4 && darting {
        let confidence = (face.brow_furrow + 0.3).clamp(0.5, 0.9);
        return signal(IntentType::Confused, confidence, SignalSource::Face, now_ms);
    }

    // 3. Shaking the head while looking at content is a conflicting signal.
    if face.is_tracking && face.head_shake < -0.3 && gaze_usable && !wandering {
        let confidence = (-face.head_shake + 0.3).clamp(0.5, 0.9);
        return signal(IntentType::Confused, confidence, SignalSource::Face, now_ms);
    }

    // 4. Nodding while on agreeable content.
    if face.is_tracking
        && face.head_nod > 0.3
        && matches!(gaze.zone, Zone::Agree | Zone::Read)
    {
        let confidence = (face.head_nod + gaze.confidence).clamp(0.5, 1.0);
        return signal(IntentType::Agree, confidence, SignalSource::Face, now_ms);
    }

    // 5. Leaning back with the gaze gone.
    if face.is_tracking && face.lean_in < -0.3 && wandering {
        let confidence = (-face.lean_in + 0.2).clamp(0.4, 0.8);
        return signal(
            IntentType::PullingAway,
            confidence,
            SignalSource::Face,
            now_ms,
        );
    }

    // 6. Furrowed but steady reads as concentration, not confusion.
    if face.is_tracking && face.brow_furrow > 0.3 && gaze.fixation.is_some() && !darting {
        let confidence = (face.brow_furrow + 0.3).clamp(0.5, 0.85);
        return signal(IntentType::Engaged, confidence, SignalSource::Face, now_ms);
    }

    // 7. Leaning in over a held fixation.
    if face.is_tracking && face.lean_in > 0.2 {
        if let Some(fixation) = gaze.fixation {
            if fixation.duration_ms > LEAN_ENGAGED_FIXATION_MS {
                let confidence = (face.lean_in + 0.4).clamp(0.5, 0.9);
                return signal(IntentType::Engaged, confidence, SignalSource::Face, now_ms);
            }
        }
    }

    // 8. Usable, fixated gaze maps zones to intents.
    if gaze_usable {
        if let Some(fixation) = gaze.fixation {
            let mapped = zone_intent(gaze.zone);
            if pointer.active {
                if let Some(intent) = mapped {
                    // Pointer and gaze agree: boosted confidence.
                    let confidence = (gaze.confidence + 0.2).min(1.0);
                    return signal(intent, confidence, SignalSource::Fused, now_ms);
                }
            } else if fixation.duration_ms > LONG_FIXATION_MS {
                let confidence =
                    ((fixation.duration_ms as f32) / 2000.0).clamp(0.4, 0.9);
                return signal(IntentType::DeepRead, confidence, SignalSource::Gaze, now_ms);
            } else if let Some(intent) = mapped {
                return signal(intent, gaze.confidence, SignalSource::Gaze, now_ms);
            }
        }
    }

    // 9. Pointer alone.
    if pointer.active && (!gaze_usable || gaze.fixation.is_none()) {
        return signal(IntentType::Navigate, 0.6, SignalSource::Mouse, now_ms);
    }

    // 10. Nothing to go on.
    signal(IntentType::Idle, 0.3, SignalSource::Fused, now_ms)
}
