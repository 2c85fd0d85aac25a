// Face mesh landmark indices and geometry helpers. Indices follow the
// MediaPipe FaceMesh topology delivered by the landmark provider.
use crate::types::Landmark;

/// Frames with fewer points than this are treated as "no face".
pub const EXPECTED_LANDMARK_COUNT: usize = 468;

pub const NOSE_TIP: usize = 1;
pub const FOREHEAD: usize = 10;
pub const CHIN: usize = 152;
pub const LEFT_CHEEK: usize = 234;
pub const RIGHT_CHEEK: usize = 454;
pub const LEFT_BROW: usize = 105;
pub const RIGHT_BROW: usize = 334;
pub const LEFT_EYE_TOP: usize = 159;
pub const RIGHT_EYE_TOP: usize = 386;
pub const MOUTH_LEFT: usize = 61;
pub const MOUTH_RIGHT: usize = 291;
pub const UPPER_LIP: usize = 13;
pub const LOWER_LIP: usize = 14;

/// Planar distance in normalized image space. Depth is ignored on purpose:
/// the z estimate is the noisiest channel the provider emits.
pub fn distance(a: &Landmark, b: &Landmark) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}
