// Upstream perception feed availability. Providers that fail to initialize
// are reported here once by the embedder; the engine keeps running on
// whatever subset remains - gaze-only and face-only are supported modes.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Gaze,
    FaceLandmarks,
    FaceTransform,
    Pointer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerceptionCapabilities {
    pub gaze_available: bool,
    pub face_landmarks_available: bool,
    pub face_transform_available: bool,
    pub pointer_available: bool,
}

impl Default for PerceptionCapabilities {
    fn default() -> Self {
        Self {
            gaze_available: true,
            face_landmarks_available: true,
            face_transform_available: true,
            pointer_available: true,
        }
    }
}

impl PerceptionCapabilities {
    pub fn set_available(&mut self, feed: FeedKind, available: bool) {
        match feed {
            FeedKind::Gaze => self.gaze_available = available,
            FeedKind::FaceLandmarks => self.face_landmarks_available = available,
            FeedKind::FaceTransform => self.face_transform_available = available,
            FeedKind::Pointer => self.pointer_available = available,
        }
        if !available {
            log::warn!("{:?} feed reported unavailable, continuing degraded", feed);
        }
    }

    pub fn is_available(&self, feed: FeedKind) -> bool {
        match feed {
            FeedKind::Gaze => self.gaze_available,
            FeedKind::FaceLandmarks => self.face_landmarks_available,
            FeedKind::FaceTransform => self.face_transform_available,
            FeedKind::Pointer => self.pointer_available,
        }
    }

    pub fn any_available(&self) -> bool {
        self.gaze_available
            || self.face_landmarks_available
            || self.face_transform_available
            || self.pointer_available
    }

    /// Human-readable notes for diagnostic displays.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if !self.gaze_available {
            notes.push("gaze feed unavailable: zone and fixation evidence disabled".to_string());
        }
        if !self.face_landmarks_available {
            notes.push("landmark feed unavailable: face axes read as untracked".to_string());
        }
        if !self.face_transform_available {
            notes.push("transform feed unavailable: head pose steering disabled".to_string());
        }
        if !self.pointer_available {
            notes.push("pointer feed unavailable: navigation evidence disabled".to_string());
        }
        if notes.is_empty() {
            notes.push("all perception feeds available".to_string());
        }
        notes
    }
}
