// Stroke renderer: owns the ink layer and the pen's continuity state.
// Each camera frame becomes one FrameEvent; the renderer classifies the pinch,
// joins this frame to the previous one if both pinched, and rasterizes that
// segment onto the persistent surface.
//
//            hand lost / pinch released
//   ┌──────────────────────────────────────┐
//   ▼                                      │
// IDLE ──pinch (erase off)──▶ DRAWING ─────┤
//   │                                      │
//   └───pinch (erase on)────▶ ERASING ─────┘
//
// Visual: ink appears only while you hold the pinch; the first pinched frame
// after a gap just puts the pen down, so there is no jump from the last stroke.

use image::RgbaImage;

use crate::config::BrushConfig;
use crate::gesture::PinchClassifier;
use crate::landmarks::LandmarkFrame;
use crate::raster::{self, Blend};
use crate::tools::ToolSnapshot;
use crate::transform::Mirror;
use crate::types::{Point, Rgba};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PenState {
    Idle,
    Drawing,
    Erasing,
}

/// Everything the renderer needs for one frame, read fresh every frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameEvent {
    pub landmarks: LandmarkFrame,
    pub tools: ToolSnapshot,
}

/// Where and how to draw the live cursor (screen space, overlay only).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    pub position: Point,
    pub pinching: bool,
    pub erase: bool,
    pub color: Rgba,
}

/// What happened this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameOutcome {
    pub state: PenState,
    pub cursor: Option<Cursor>,
    /// Segment laid onto the surface this frame, in screen space.
    pub segment: Option<(Point, Point)>,
}

pub struct StrokeRenderer {
    surface: RgbaImage,
    mirror: Mirror,
    classifier: PinchClassifier,
    ink_width: f32,
    erase_width: f32,
    last_point: Option<Point>, // camera space
    state: PenState,
}

impl StrokeRenderer {
    pub fn new(width: u32, height: u32, brush: &BrushConfig) -> Self {
        Self {
            surface: RgbaImage::new(width, height),
            mirror: Mirror::new(width, height),
            classifier: PinchClassifier::new(brush.pinch_threshold),
            ink_width: brush.ink_width,
            erase_width: brush.erase_width,
            last_point: None,
            state: PenState::Idle,
        }
    }

    /// Reallocate the surface at a new size. The old artwork does not survive;
    /// returns true when something visible was discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let lost = !self.is_empty();
        self.surface = RgbaImage::new(width, height);
        self.mirror = Mirror::new(width, height);
        self.last_point = None;
        self.state = PenState::Idle;
        if lost {
            log::warn!("Camera resolution changed to {width}x{height}: drawing was cleared");
        } else {
            log::info!("Drawing surface sized to {width}x{height}");
        }
        lost
    }

    /// Resize only if the source resolution differs from the surface.
    /// Returns `Some(lost)` when a resize happened.
    pub fn match_source(&mut self, width: u32, height: u32) -> Option<bool> {
        (self.surface.dimensions() != (width, height)).then(|| self.resize(width, height))
    }

    /// Wipe all ink. Safe on an empty surface.
    pub fn clear(&mut self) {
        for px in self.surface.pixels_mut() {
            *px = image::Rgba([0, 0, 0, 0]);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.surface.pixels().all(|p| p[3] == 0)
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn last_point(&self) -> Option<Point> {
        self.last_point
    }

    /// Advance one frame.
    pub fn handle(&mut self, event: &FrameEvent) -> FrameOutcome {
        let Some(tips) = event.landmarks.hand else {
            self.lift();
            return FrameOutcome { state: self.state, cursor: None, segment: None };
        };

        let index = self.mirror.to_camera(tips.index_tip.x, tips.index_tip.y);
        let thumb = self.mirror.to_camera(tips.thumb_tip.x, tips.thumb_tip.y);
        let pinching = self.classifier.is_pinching(index, thumb);
        let erase = event.tools.erase_mode;

        let cursor = Some(Cursor {
            position: self.mirror.to_screen(index),
            pinching,
            erase,
            color: event.tools.active_color,
        });

        if !pinching {
            self.lift();
            return FrameOutcome { state: self.state, cursor, segment: None };
        }

        let next = if erase { PenState::Erasing } else { PenState::Drawing };
        if self.state != next {
            log::debug!("pen {:?} -> {:?}", self.state, next);
        }
        self.state = next;

        let segment = self.last_point.map(|last| {
            let from = self.mirror.to_screen(last);
            let to = self.mirror.to_screen(index);
            let (width, blend) = if erase {
                (self.erase_width, Blend::DestinationOut)
            } else {
                (self.ink_width, Blend::SourceOver(event.tools.active_color))
            };
            raster::stroke_segment(&mut self.surface, from, to, width, blend);
            (from, to)
        });
        self.last_point = Some(index);

        FrameOutcome { state: self.state, cursor, segment }
    }

    fn lift(&mut self) {
        if self.state != PenState::Idle {
            log::debug!("pen {:?} -> Idle", self.state);
        }
        self.state = PenState::Idle;
        self.last_point = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;
    use crate::tools::ToolState;

    const W: u32 = 640;
    const H: u32 = 480;

    fn renderer() -> StrokeRenderer {
        StrokeRenderer::new(W, H, &BrushConfig::default())
    }

    /// A hand whose index tip sits at `screen` (mirrored pixels), pinched or open.
    fn hand_at(screen: Point, pinching: bool) -> LandmarkFrame {
        let m = Mirror::new(W, H);
        let (ix, iy) = m.screen_to_normalized(screen);
        let gap = if pinching { 10.0 } else { 80.0 };
        let (tx, ty) = m.screen_to_normalized(Point::new(screen.x, screen.y + gap));
        LandmarkFrame::with_tips(Landmark { x: ix, y: iy }, Landmark { x: tx, y: ty })
    }

    fn event(landmarks: LandmarkFrame, tools: &ToolState) -> FrameEvent {
        FrameEvent { landmarks, tools: tools.snapshot() }
    }

    #[test]
    fn only_consecutive_pinches_draw() {
        let mut r = renderer();
        let tools = ToolState::default();
        let (a, b, c) = (Point::new(50.0, 50.0), Point::new(100.0, 100.0), Point::new(200.0, 100.0));

        let out = r.handle(&event(hand_at(a, false), &tools));
        assert_eq!((out.state, out.segment), (PenState::Idle, None));

        let out = r.handle(&event(hand_at(b, true), &tools));
        assert_eq!(out.state, PenState::Drawing);
        assert_eq!(out.segment, None);
        assert!(r.is_empty());

        let out = r.handle(&event(hand_at(c, true), &tools));
        let (from, to) = out.segment.unwrap();
        assert!(from.distance(b) < 1e-3 && to.distance(c) < 1e-3);

        let out = r.handle(&event(hand_at(c, false), &tools));
        assert_eq!((out.state, out.segment), (PenState::Idle, None));
        assert_eq!(r.last_point(), None);

        // Ink lies between b and c on screen, nowhere near a
        assert_eq!(r.surface().get_pixel(150, 100)[3], 255);
        assert_eq!(r.surface().get_pixel(50, 50)[3], 0);
    }

    #[test]
    fn losing_the_hand_lifts_the_pen() {
        let mut r = renderer();
        let tools = ToolState::default();
        r.handle(&event(hand_at(Point::new(10.0, 10.0), true), &tools));
        assert!(r.last_point().is_some());

        let out = r.handle(&event(LandmarkFrame::ABSENT, &tools));
        assert_eq!(out, FrameOutcome { state: PenState::Idle, cursor: None, segment: None });
        assert_eq!(r.last_point(), None);

        // Coming back pinched starts fresh: no segment bridging the gap
        let out = r.handle(&event(hand_at(Point::new(300.0, 300.0), true), &tools));
        assert_eq!(out.segment, None);
    }

    #[test]
    fn ink_lands_mirrored_from_camera_space() {
        let mut r = renderer();
        let tools = ToolState::default();
        // Camera-space x = 0.1*W => screen x = 0.9*W
        let cam = |nx: f32| LandmarkFrame::with_tips(Landmark { x: nx, y: 0.5 }, Landmark { x: nx, y: 0.5 });
        r.handle(&event(cam(0.1), &tools));
        let out = r.handle(&event(cam(0.12), &tools));
        let (from, to) = out.segment.unwrap();
        assert!((from.x - 576.0).abs() < 1e-3);
        assert!((to.x - 563.2).abs() < 1e-3);
        assert_eq!(r.surface().get_pixel(570, 240)[3], 255);
        assert_eq!(r.surface().get_pixel(70, 240)[3], 0);
    }

    #[test]
    fn erasing_uses_wide_destructive_stroke() {
        let mut r = renderer();
        let mut tools = ToolState::default();
        let y = 200.0;
        r.handle(&event(hand_at(Point::new(100.0, y), true), &tools));
        r.handle(&event(hand_at(Point::new(300.0, y), true), &tools));
        r.handle(&event(hand_at(Point::new(300.0, y), false), &tools));
        assert_eq!(r.surface().get_pixel(200, 200)[3], 255);

        tools.toggle_erase();
        let out = r.handle(&event(hand_at(Point::new(200.0, 180.0), true), &tools));
        assert_eq!(out.state, PenState::Erasing);
        let out = r.handle(&event(hand_at(Point::new(200.0, 220.0), true), &tools));
        assert_eq!(out.state, PenState::Erasing);
        assert_eq!(r.surface().get_pixel(200, 200)[3], 0);
        // 30 px wide: 14 px left of the eraser path is gone, 20 px left is not
        assert_eq!(r.surface().get_pixel(186, 200)[3], 0);
        assert_eq!(r.surface().get_pixel(180, 200)[3], 255);
    }

    #[test]
    fn tool_changes_apply_on_the_next_frame() {
        let mut r = renderer();
        let mut tools = ToolState::default();
        r.handle(&event(hand_at(Point::new(100.0, 100.0), true), &tools));
        tools.select_palette(3);
        r.handle(&event(hand_at(Point::new(140.0, 100.0), true), &tools));
        let px = r.surface().get_pixel(120, 100);
        let red = tools.active_color();
        assert_eq!((px[0], px[1], px[2]), (red.r, red.g, red.b));
    }

    #[test]
    fn cursor_follows_fingertip_in_every_state() {
        let mut r = renderer();
        let mut tools = ToolState::default();
        let p = Point::new(320.0, 120.0);

        let open = r.handle(&event(hand_at(p, false), &tools)).cursor.unwrap();
        assert!(!open.pinching && !open.erase);
        assert!(open.position.distance(p) < 1e-3);
        assert_eq!(open.color, tools.active_color());

        tools.toggle_erase();
        let pinched = r.handle(&event(hand_at(p, true), &tools)).cursor.unwrap();
        assert!(pinched.pinching && pinched.erase);
        // The cursor itself never inks the surface
        assert!(r.is_empty());
    }

    #[test]
    fn resize_discards_artwork() {
        let mut r = renderer();
        let tools = ToolState::default();
        r.handle(&event(hand_at(Point::new(10.0, 10.0), true), &tools));
        r.handle(&event(hand_at(Point::new(60.0, 10.0), true), &tools));
        assert!(!r.is_empty());

        assert_eq!(r.match_source(W, H), None);
        assert_eq!(r.match_source(1280, 720), Some(true));
        assert_eq!(r.surface().dimensions(), (1280, 720));
        assert!(r.is_empty());
        assert_eq!(r.last_point(), None);
        assert_eq!(r.mirror, Mirror::new(1280, 720));

        assert!(!r.resize(640, 480));
    }

    #[test]
    fn clear_twice_is_fine() {
        let mut r = renderer();
        r.clear();
        r.clear();
        assert!(r.is_empty());
        assert_eq!(r.surface().dimensions(), (W, H));
    }
}
