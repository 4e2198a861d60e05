// Selfie-view coordinate mapping shared by the ink layer and the cursor.
// Visual: move your hand right and the cursor moves right on screen, like a mirror.

use crate::types::Point;

/// Maps normalized landmarks into the camera's pixel grid, and camera pixels
/// onto the horizontally mirrored screen (`translate(W, 0); scale(-1, 1)`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mirror {
    pub width: f32,
    pub height: f32,
}

impl Mirror {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width as f32, height: height as f32 }
    }

    /// Normalized `[0,1]^2` landmark to camera pixels (not mirrored).
    /// Pinch distances are measured here.
    pub fn to_camera(&self, nx: f32, ny: f32) -> Point {
        Point::new(nx * self.width, ny * self.height)
    }

    /// Camera pixels to screen pixels.
    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(self.width - p.x, p.y)
    }

    /// Screen pixels back to a normalized camera landmark.
    pub fn screen_to_normalized(&self, p: Point) -> (f32, f32) {
        ((self.width - p.x) / self.width, p.y / self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_then_flips_horizontally() {
        let m = Mirror::new(1280, 720);
        let cam = m.to_camera(0.25, 0.5);
        assert_eq!(cam, Point::new(320.0, 360.0));
        assert_eq!(m.to_screen(cam), Point::new(960.0, 360.0));
    }

    #[test]
    fn flip_preserves_distances() {
        let m = Mirror::new(640, 480);
        let a = m.to_camera(0.1, 0.2);
        let b = m.to_camera(0.3, 0.7);
        let d_cam = a.distance(b);
        let d_screen = m.to_screen(a).distance(m.to_screen(b));
        assert!((d_cam - d_screen).abs() < 1e-4);
    }

    #[test]
    fn screen_round_trips_to_normalized() {
        let m = Mirror::new(1280, 720);
        let (nx, ny) = m.screen_to_normalized(Point::new(100.0, 200.0));
        let back = m.to_screen(m.to_camera(nx, ny));
        assert!((back.x - 100.0).abs() < 1e-3);
        assert!((back.y - 200.0).abs() < 1e-3);
    }
}
