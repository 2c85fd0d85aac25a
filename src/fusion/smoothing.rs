// Stabilizes the per-tick fusion output over a short ring history. The
// smoothed type wins by summed confidence, not simple majority, so one
// high-confidence signal can outvote two hesitant ones. The boolean state
// flags are level outputs recomputed every tick.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{IntentSignal, IntentType, SignalSource};

/// Smoothed decision plus derived state flags for one tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmoothedIntent {
    pub signal: IntentSignal,
    pub is_confused: bool,
    pub is_fatigued: bool,
    pub is_engaged: bool,
}

/// Fixed-size intent history with summed-confidence voting.
pub struct IntentSmoother {
    window: usize,
    history: VecDeque<IntentSignal>,
}

impl IntentSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            history: VecDeque::with_capacity(window),
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Push this tick's raw signal and derive the smoothed view.
    pub fn push(&mut self, raw: IntentSignal) -> SmoothedIntent {
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(raw);

        let mut best_intent = raw.intent;
        let mut best_sum = 0.0f32;
        for entry in &self.history {
            let sum: f32 = self
                .history
                .iter()
                .filter(|e| e.intent == entry.intent)
                .map(|e| e.confidence)
                .sum();
            if sum > best_sum {
                best_sum = sum;
                best_intent = entry.intent;
            }
        }

        let winners: Vec<f32> = self
            .history
            .iter()
            .filter(|e| e.intent == best_intent)
            .map(|e| e.confidence)
            .collect();
        let confidence = best_sum / winners.len() as f32;

        SmoothedIntent {
            signal: IntentSignal {
                intent: best_intent,
                confidence,
                source: SignalSource::Fused,
                timestamp_ms: raw.timestamp_ms,
            },
            is_confused: self.majority(IntentType::Confused),
            is_fatigued: self.majority(IntentType::Fatigued),
            is_engaged: self.majority(IntentType::Engaged),
        }
    }

    /// True when at least half the window (rounded up) carries this type.
    fn majority(&self, intent: IntentType) -> bool {
        let count = self.history.iter().filter(|e| e.intent == intent).count();
        count >= self.history.len().div_ceil(2)
    }
}
