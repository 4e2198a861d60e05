// Pinch detection: thumb tip close to index tip means "pen down".
// Visual: the cursor shrinks and ink flows while the two tips touch.

use crate::types::Point;

/// Distance (camera pixels, 1280x720 reference) under which the tips count as pinched.
/// Pinned, not normalized: at other capture sizes the same physical pinch
/// covers a different number of pixels.
pub const PINCH_THRESHOLD: f32 = 45.0;

/// Classifies one frame's fingertips. No hysteresis: each frame stands alone.
#[derive(Clone, Copy, Debug)]
pub struct PinchClassifier {
    threshold: f32,
}

impl Default for PinchClassifier {
    fn default() -> Self {
        Self { threshold: PINCH_THRESHOLD }
    }
}

impl PinchClassifier {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Both points must live in the same pixel space.
    pub fn is_pinching(&self, index_tip: Point, thumb_tip: Point) -> bool {
        index_tip.distance(thumb_tip) < self.threshold
    }
}
