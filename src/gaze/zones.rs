// Screen-zone classification with hysteresis. Raw classification is a static
// partition of the screen; the stateful classifier debounces zone switches and
// tracks dwell so boundary flicker never reaches the fusion layer.
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{GazePoint, Zone};

/// A raw zone change must be observed continuously for this long before the
/// classifier commits the switch.
const ZONE_SWITCH_DEBOUNCE_MS: i64 = 80;

/// Screen partition bands (fractions of screen size) plus per-zone dwell
/// thresholds. The five named sub-regions plus `read` cover the whole screen;
/// `wander` is only reported when there is no gaze at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneTable {
    /// Relative Y below this is `flip`.
    pub flip_band: f64,
    /// Relative Y above this is `deeper`.
    pub deeper_band: f64,
    /// Relative X below this is `disagree` (within the middle band).
    pub disagree_band: f64,
    /// Relative X above this is `agree` (within the middle band).
    pub agree_band: f64,
    pub read_dwell_ms: f64,
    pub agree_dwell_ms: f64,
    pub disagree_dwell_ms: f64,
    pub deeper_dwell_ms: f64,
    pub flip_dwell_ms: f64,
}

impl Default for ZoneTable {
    fn default() -> Self {
        DEFAULT_ZONE_TABLE.clone()
    }
}

lazy_static! {
    static ref DEFAULT_ZONE_TABLE: ZoneTable = ZoneTable {
        flip_band: 0.15,
        deeper_band: 0.85,
        disagree_band: 0.25,
        agree_band: 0.75,
        read_dwell_ms: 2000.0,
        agree_dwell_ms: 800.0,
        disagree_dwell_ms: 800.0,
        deeper_dwell_ms: 1000.0,
        flip_dwell_ms: 1000.0,
    };
}

impl ZoneTable {
    fn validate(&self) -> Result<(), EngineError> {
        let bands = [
            ("flip_band", self.flip_band),
            ("deeper_band", self.deeper_band),
            ("disagree_band", self.disagree_band),
            ("agree_band", self.agree_band),
        ];
        for (name, value) in bands {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(EngineError::InvalidZoneTable(format!(
                    "{} must be a fraction in [0,1], got {}",
                    name, value
                )));
            }
        }
        if self.flip_band >= self.deeper_band {
            return Err(EngineError::InvalidZoneTable(
                "flip band must sit above the deeper band".into(),
            ));
        }
        if self.disagree_band >= self.agree_band {
            return Err(EngineError::InvalidZoneTable(
                "disagree band must sit left of the agree band".into(),
            ));
        }
        let dwells = [
            ("read", self.read_dwell_ms),
            ("agree", self.agree_dwell_ms),
            ("disagree", self.disagree_dwell_ms),
            ("deeper", self.deeper_dwell_ms),
            ("flip", self.flip_dwell_ms),
        ];
        for (name, value) in dwells {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidZoneTable(format!(
                    "{} dwell threshold must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Dwell threshold for a zone. `wander` never auto-activates.
    fn dwell_threshold_ms(&self, zone: Zone) -> f64 {
        match zone {
            Zone::Read => self.read_dwell_ms,
            Zone::Agree => self.agree_dwell_ms,
            Zone::Disagree => self.disagree_dwell_ms,
            Zone::Deeper => self.deeper_dwell_ms,
            Zone::Flip => self.flip_dwell_ms,
            Zone::Wander => f64::INFINITY,
        }
    }
}

/// Per-tick classifier output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneUpdate {
    pub zone: Zone,
    /// Elapsed dwell over the zone's activation threshold, clamped to [0,1].
    pub dwell_progress: f32,
    /// True exactly once per uninterrupted dwell completion.
    pub is_activated: bool,
}

/// Hysteresis state machine mapping gaze points to screen zones.
pub struct ZoneClassifier {
    table: ZoneTable,
    current_zone: Zone,
    dwell_start_ms: i64,
    pending_zone: Option<Zone>,
    pending_since_ms: i64,
    last_activated_zone: Option<Zone>,
    activation_fired: bool,
}

impl ZoneClassifier {
    pub fn new(table: ZoneTable) -> Result<Self, EngineError> {
        table.validate()?;
        Ok(Self {
            table,
            current_zone: Zone::Wander,
            dwell_start_ms: 0,
            pending_zone: None,
            pending_since_ms: 0,
            last_activated_zone: None,
            activation_fired: false,
        })
    }

    /// Pure partition lookup. Every in-bounds point maps to exactly one zone.
    pub fn classify(&self, x: f64, y: f64, screen_w: f64, screen_h: f64) -> Zone {
        let rel_x = x / screen_w;
        let rel_y = y / screen_h;

        if rel_y < self.table.flip_band {
            Zone::Flip
        } else if rel_y > self.table.deeper_band {
            Zone::Deeper
        } else if rel_x < self.table.disagree_band {
            Zone::Disagree
        } else if rel_x > self.table.agree_band {
            Zone::Agree
        } else {
            Zone::Read
        }
    }

    pub fn current_zone(&self) -> Zone {
        self.current_zone
    }

    pub fn last_activated_zone(&self) -> Option<Zone> {
        self.last_activated_zone
    }

    /// Advance the state machine with the latest gaze sample (or none).
    /// Timing is driven entirely by sample timestamps.
    pub fn update(
        &mut self,
        sample: Option<&GazePoint>,
        screen_w: f64,
        screen_h: f64,
    ) -> ZoneUpdate {
        let point = match sample {
            Some(p) => p,
            None => {
                self.current_zone = Zone::Wander;
                self.pending_zone = None;
                self.activation_fired = false;
                return ZoneUpdate {
                    zone: Zone::Wander,
                    dwell_progress: 0.0,
                    is_activated: false,
                };
            }
        };

        let now_ms = point.timestamp_ms;
        let raw = self.classify(point.x, point.y, screen_w, screen_h);

        if raw == self.current_zone {
            self.pending_zone = None;
        } else {
            match self.pending_zone {
                Some(pending) if pending == raw => {
                    if now_ms - self.pending_since_ms >= ZONE_SWITCH_DEBOUNCE_MS {
                        log::debug!("zone switch {:?} -> {:?}", self.current_zone, raw);
                        self.current_zone = raw;
                        self.dwell_start_ms = now_ms;
                        self.pending_zone = None;
                        self.activation_fired = false;
                    }
                }
                _ => {
                    self.pending_zone = Some(raw);
                    self.pending_since_ms = now_ms;
                }
            }
        }

        let threshold = self.table.dwell_threshold_ms(self.current_zone);
        let dwell_progress = if threshold.is_finite() {
            ((now_ms - self.dwell_start_ms) as f64 / threshold).clamp(0.0, 1.0) as f32
        } else {
            0.0
        };

        let is_activated = dwell_progress >= 1.0 && !self.activation_fired;
        if is_activated {
            self.activation_fired = true;
            self.last_activated_zone = Some(self.current_zone);
            log::debug!("zone {:?} activated by dwell", self.current_zone);
        }

        ZoneUpdate {
            zone: self.current_zone,
            dwell_progress,
            is_activated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 1920.0;
    const H: f64 = 1080.0;

    fn classifier() -> ZoneClassifier {
        ZoneClassifier::new(ZoneTable::default()).unwrap()
    }

    fn point(x: f64, y: f64, t: i64) -> GazePoint {
        GazePoint {
            x,
            y,
            timestamp_ms: t,
        }
    }

    #[test]
    fn rejects_malformed_table() {
        let table = ZoneTable {
            flip_band: 0.9,
            ..ZoneTable::default()
        };
        assert!(ZoneClassifier::new(table).is_err());

        let table = ZoneTable {
            read_dwell_ms: 0.0,
            ..ZoneTable::default()
        };
        assert!(ZoneClassifier::new(table).is_err());

        let table = ZoneTable {
            agree_dwell_ms: f64::NAN,
            ..ZoneTable::default()
        };
        assert!(ZoneClassifier::new(table).is_err());
    }

    #[test]
    fn partition_covers_whole_screen() {
        // Every in-bounds point classifies to one of the five visible zones,
        // and each zone is reachable.
        let c = classifier();
        let mut seen = std::collections::HashSet::new();
        let steps = 64;
        for ix in 0..=steps {
            for iy in 0..=steps {
                let x = W * ix as f64 / steps as f64;
                let y = H * iy as f64 / steps as f64;
                let zone = c.classify(x, y, W, H);
                assert_ne!(zone, Zone::Wander, "({}, {}) left the partition", x, y);
                seen.insert(zone);
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn classify_band_edges() {
        let c = classifier();
        assert_eq!(c.classify(960.0, 0.0, W, H), Zone::Flip);
        assert_eq!(c.classify(960.0, H, W, H), Zone::Deeper);
        assert_eq!(c.classify(0.0, 540.0, W, H), Zone::Disagree);
        assert_eq!(c.classify(W, 540.0, W, H), Zone::Agree);
        assert_eq!(c.classify(960.0, 540.0, W, H), Zone::Read);
        // Band boundaries are exclusive: exactly 15% Y is not flip.
        assert_eq!(c.classify(960.0, H * 0.15, W, H), Zone::Read);
    }

    #[test]
    fn no_gaze_resets_to_wander() {
        let mut c = classifier();
        c.update(Some(&point(960.0, 540.0, 0)), W, H);
        let update = c.update(None, W, H);
        assert_eq!(update.zone, Zone::Wander);
        assert_eq!(update.dwell_progress, 0.0);
        assert!(!update.is_activated);
    }

    #[test]
    fn switch_requires_debounce() {
        let mut c = classifier();
        // Commit into read first.
        c.update(Some(&point(960.0, 540.0, 0)), W, H);
        c.update(Some(&point(960.0, 540.0, 100)), W, H);
        let update = c.update(Some(&point(960.0, 540.0, 200)), W, H);
        assert_eq!(update.zone, Zone::Read);

        // A glance at agree shorter than the debounce never commits.
        let update = c.update(Some(&point(1900.0, 540.0, 230)), W, H);
        assert_eq!(update.zone, Zone::Read);
        let update = c.update(Some(&point(1900.0, 540.0, 280)), W, H);
        assert_eq!(update.zone, Zone::Read);
        // Returning to read clears the pending switch.
        let update = c.update(Some(&point(960.0, 540.0, 300)), W, H);
        assert_eq!(update.zone, Zone::Read);

        // Held long enough, the switch commits.
        c.update(Some(&point(1900.0, 540.0, 330)), W, H);
        let update = c.update(Some(&point(1900.0, 540.0, 420)), W, H);
        assert_eq!(update.zone, Zone::Agree);
    }

    #[test]
    fn oscillation_commits_at_most_one_switch_per_debounce_window() {
        let mut c = classifier();
        c.update(Some(&point(960.0, 540.0, 0)), W, H);
        c.update(Some(&point(960.0, 540.0, 100)), W, H);

        // Alternate between read and agree every 20ms: the pending timer
        // restarts on every flip, so no switch ever commits.
        let mut switches = 0;
        let mut last = Zone::Read;
        for i in 0..50 {
            let t = 200 + i * 20;
            let x = if i % 2 == 0 { 1900.0 } else { 960.0 };
            let update = c.update(Some(&point(x, 540.0, t)), W, H);
            if update.zone != last {
                switches += 1;
                last = update.zone;
            }
        }
        assert_eq!(switches, 0);
    }

    #[test]
    fn dwell_progress_is_monotonic_and_activates_once() {
        let mut c = classifier();
        // Commit into agree (800ms dwell threshold).
        c.update(Some(&point(1900.0, 540.0, 0)), W, H);
        c.update(Some(&point(1900.0, 540.0, 100)), W, H);

        let mut previous = 0.0f32;
        let mut activations = 0;
        for i in 0..40 {
            let t = 100 + (i + 1) * 50;
            let update = c.update(Some(&point(1900.0, 540.0, t)), W, H);
            assert_eq!(update.zone, Zone::Agree);
            assert!(update.dwell_progress >= previous);
            previous = update.dwell_progress;
            if update.is_activated {
                activations += 1;
            }
        }
        assert_eq!(previous, 1.0);
        assert_eq!(activations, 1);
        assert_eq!(c.last_activated_zone(), Some(Zone::Agree));
    }

    #[test]
    fn wander_never_activates() {
        let mut c = classifier();
        for i in 0..100 {
            let update = c.update(None, W, H);
            assert!(!update.is_activated, "tick {}", i);
            assert_eq!(update.dwell_progress, 0.0);
        }
    }
}
