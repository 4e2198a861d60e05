// One drawing session: from entering the pad until leaving it.
// Single owner of the stroke renderer (and so of the ink layer), the tool
// state and the caption line. The frame loop feeds it one detection result
// per camera frame; keys call the tool methods.
// Visual: once torn down, nothing more lands on the canvas.

use std::path::{Path, PathBuf};

use crate::caption::Captioner;
use crate::config::BrushConfig;
use crate::error::Error;
use crate::export;
use crate::landmarks::LandmarkFrame;
use crate::profile::SessionProfile;
use crate::renderer::{FrameEvent, FrameOutcome, PenState, StrokeRenderer};
use crate::tools::ToolState;

pub struct DrawingSession {
    renderer: Option<StrokeRenderer>, // None until the first frame tells us the size
    tools: ToolState,
    brush: BrushConfig,
    captioner: Captioner,
    caption: String,
    profile: Option<SessionProfile>,
    export_dir: PathBuf,
    last_outcome: Option<FrameOutcome>,
    alive: bool,
}

impl DrawingSession {
    pub fn new(
        brush: BrushConfig,
        captioner: Captioner,
        profile: Option<SessionProfile>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            renderer: None,
            tools: ToolState::default(),
            brush,
            captioner,
            caption: String::new(),
            profile,
            export_dir: export_dir.into(),
            last_outcome: None,
            alive: true,
        }
    }

    /// Feed one frame's detection. `width`/`height` is the camera's native size
    /// for this frame; a change reallocates (and clears) the ink layer.
    ///
    /// A detection error skips the whole frame: no resize, the pen stays where it was.
    pub fn on_frame(
        &mut self,
        detection: Result<LandmarkFrame, Error>,
        width: u32,
        height: u32,
    ) -> Option<FrameOutcome> {
        if !self.alive {
            return None;
        }

        let landmarks = match detection {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Hand detection failed, skipping frame: {e}");
                return None;
            }
        };

        let brush = &self.brush;
        let renderer = self.renderer.get_or_insert_with(|| {
            log::info!("Camera ready: {width}x{height}");
            StrokeRenderer::new(width, height, brush)
        });
        renderer.match_source(width, height);

        let outcome = renderer.handle(&FrameEvent { landmarks, tools: self.tools.snapshot() });
        self.last_outcome = Some(outcome);
        Some(outcome)
    }

    /// Wipe the ink and the caption.
    pub fn clear(&mut self) {
        if let Some(r) = &mut self.renderer {
            r.clear();
        }
        self.caption.clear();
    }

    /// Save a flattened PNG. No-op before the camera has delivered a frame.
    pub fn export(&self, unix_millis: u128) -> Result<Option<PathBuf>, Error> {
        export::save(
            self.renderer.as_ref().map(StrokeRenderer::surface),
            self.tools.export_theme(),
            &self.export_dir,
            unix_millis,
        )
    }

    /// Kick off a caption for the current ink (transparent PNG).
    /// Ignored while one is already running or before the surface exists.
    pub fn request_caption(&self) -> bool {
        let Some(r) = &self.renderer else {
            return false;
        };
        if self.captioner.is_busy() {
            return false;
        }
        match export::encode_png(r.surface()) {
            Ok(png) => self.captioner.request(png),
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Pick up a finished caption, if one arrived.
    pub fn poll_caption(&mut self) {
        if let Some(text) = self.captioner.poll() {
            if self.alive {
                self.caption = text;
            }
        }
    }

    /// Stop accepting frames. Anything delivered afterwards is ignored.
    pub fn teardown(&mut self) {
        if self.alive {
            log::info!("Leaving drawing session");
        }
        self.alive = false;
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolState {
        &mut self.tools
    }

    pub fn renderer(&self) -> Option<&StrokeRenderer> {
        self.renderer.as_ref()
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn caption_busy(&self) -> bool {
        self.captioner.is_busy()
    }

    pub fn greeting(&self) -> String {
        self.profile.as_ref().map_or_else(|| "Hi!".to_string(), SessionProfile::greeting)
    }

    pub fn pen_state(&self) -> PenState {
        self.last_outcome.map_or(PenState::Idle, |o| o.state)
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::CaptionBackend;
    use crate::landmarks::Landmark;
    use crate::tools::ExportTheme;
    use crate::transform::Mirror;
    use crate::types::{Point, Rgba};
    use std::sync::Arc;
    use std::time::Duration;

    struct Canned;

    impl CaptionBackend for Canned {
        fn describe(&self, png: &[u8]) -> Result<String, Error> {
            assert!(png.starts_with(b"\x89PNG"));
            Ok("Look at that blue sky!".into())
        }
    }

    const W: u32 = 1280;
    const H: u32 = 720;

    fn session(dir: &Path, profile: Option<SessionProfile>) -> DrawingSession {
        DrawingSession::new(BrushConfig::default(), Captioner::new(Arc::new(Canned)), profile, dir)
    }

    fn hand(screen: Point, pinching: bool, w: u32, h: u32) -> Result<LandmarkFrame, Error> {
        let m = Mirror::new(w, h);
        let (ix, iy) = m.screen_to_normalized(screen);
        let thumb = Point::new(screen.x + if pinching { 5.0 } else { 120.0 }, screen.y);
        let (tx, ty) = m.screen_to_normalized(thumb);
        Ok(LandmarkFrame::with_tips(Landmark { x: ix, y: iy }, Landmark { x: tx, y: ty }))
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vayu-lekha-{tag}-{}", export::unix_millis()))
    }

    #[test]
    fn pinch_sequence_draws_exactly_one_segment() {
        let mut s = session(Path::new(""), None);
        let (a, b, c) = (Point::new(40.0, 40.0), Point::new(400.0, 300.0), Point::new(500.0, 300.0));

        let segments: Vec<_> = [(a, false), (b, true), (c, true), (c, false)]
            .into_iter()
            .filter_map(|(p, pinch)| s.on_frame(hand(p, pinch, W, H), W, H))
            .filter_map(|o| o.segment)
            .collect();

        assert_eq!(segments.len(), 1);
        let (from, to) = segments[0];
        assert!(from.distance(b) < 1e-2 && to.distance(c) < 1e-2);
        assert_eq!(s.pen_state(), PenState::Idle);
    }

    #[test]
    fn detection_error_keeps_the_pen_down() {
        let mut s = session(Path::new(""), None);
        s.on_frame(hand(Point::new(100.0, 100.0), true, W, H), W, H);
        let before = s.renderer().unwrap().last_point();
        assert!(before.is_some());

        assert!(s.on_frame(Err(Error::Tracker("engine hiccup".into())), W, H).is_none());
        assert_eq!(s.renderer().unwrap().last_point(), before);

        let out = s.on_frame(hand(Point::new(150.0, 100.0), true, W, H), W, H).unwrap();
        assert!(out.segment.is_some());
    }

    #[test]
    fn surface_waits_for_first_frame() {
        let dir = temp_dir("early");
        let mut s = session(&dir, None);
        assert!(s.renderer().is_none());
        assert_eq!(s.export(1).unwrap(), None);
        assert!(!s.request_caption());

        // A failed detection does not count as the first frame
        s.on_frame(Err(Error::Tracker("warming up".into())), W, H);
        assert!(s.renderer().is_none());

        s.on_frame(Ok(LandmarkFrame::ABSENT), W, H);
        assert_eq!(s.renderer().unwrap().surface().dimensions(), (W, H));
    }

    #[test]
    fn failed_frame_at_new_resolution_keeps_stroke() {
        let mut s = session(Path::new(""), None);
        s.on_frame(hand(Point::new(100.0, 100.0), true, 640, 480), 640, 480);
        s.on_frame(hand(Point::new(200.0, 100.0), true, 640, 480), 640, 480);
        let before = s.renderer().unwrap().last_point();
        assert!(before.is_some());

        assert!(s.on_frame(Err(Error::Tracker("engine hiccup".into())), 1280, 720).is_none());
        let r = s.renderer().unwrap();
        assert_eq!(r.last_point(), before);
        assert_eq!(r.surface().dimensions(), (640, 480));
        assert!(!r.is_empty());
    }

    #[test]
    fn resolution_change_clears_the_drawing() {
        let mut s = session(Path::new(""), None);
        s.on_frame(hand(Point::new(100.0, 100.0), true, 640, 480), 640, 480);
        s.on_frame(hand(Point::new(200.0, 100.0), true, 640, 480), 640, 480);
        assert!(!s.renderer().unwrap().is_empty());

        s.on_frame(Ok(LandmarkFrame::ABSENT), 1280, 720);
        let r = s.renderer().unwrap();
        assert_eq!(r.surface().dimensions(), (1280, 720));
        assert!(r.surface().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn clear_is_idempotent_and_drops_caption() {
        let mut s = session(Path::new(""), None);
        s.clear(); // before any surface
        s.on_frame(Ok(LandmarkFrame::ABSENT), W, H);

        assert!(s.request_caption());
        s.caption = s.captioner.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(s.caption(), "Look at that blue sky!");

        s.clear();
        s.clear();
        assert!(s.renderer().unwrap().is_empty());
        assert_eq!(s.caption(), "");
    }

    #[test]
    fn teardown_ignores_late_frames() {
        let mut s = session(Path::new(""), None);
        s.on_frame(hand(Point::new(100.0, 100.0), true, W, H), W, H);
        s.teardown();
        assert!(s.on_frame(hand(Point::new(300.0, 100.0), true, W, H), W, H).is_none());
        assert!(s.renderer().unwrap().is_empty());
    }

    #[test]
    fn greeting_uses_profile() {
        let profile = SessionProfile::new("Mia", "5551234567").unwrap();
        assert_eq!(session(Path::new(""), Some(profile)).greeting(), "Hi Mia!");
        assert_eq!(session(Path::new(""), None).greeting(), "Hi!");
    }

    #[test]
    fn mia_draws_a_blue_line_and_saves_it_light() {
        let profile = SessionProfile::new("Mia", "5551234567").unwrap();
        let dir = temp_dir("e2e");
        let mut s = session(&dir, Some(profile));

        let blue = Rgba::from_hex("#50C2F7").unwrap();
        s.tools_mut().select_color(blue);
        s.tools_mut().set_export_theme(ExportTheme::Light);
        assert!(!s.tools().erase_mode());

        for i in 0..5 {
            let p = Point::new(100.0 + 50.0 * i as f32, 200.0);
            s.on_frame(hand(p, true, W, H), W, H);
        }
        s.on_frame(hand(Point::new(300.0, 200.0), false, W, H), W, H);

        let path = s.export(1_700_000_000_000).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "VayuLekha-light-1700000000000.png");
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (W, H));

        let blue_px = image::Rgba([blue.r, blue.g, blue.b, 255]);
        let white = image::Rgba([255, 255, 255, 255]);

        // Stroke thickness at the middle of the line
        let thick = (150..250).filter(|&y| *img.get_pixel(200, y) == blue_px).count();
        assert!((7..=9).contains(&thick), "thickness {thick}");

        // Spans x in [100, 300] at y = 200, nothing far past the ends
        for x in (100..=300).step_by(10) {
            assert_eq!(*img.get_pixel(x, 200), blue_px, "x = {x}");
        }
        assert_eq!(*img.get_pixel(90, 200), white);
        assert_eq!(*img.get_pixel(310, 200), white);
        assert_eq!(*img.get_pixel(200, 100), white);
        assert_eq!(*img.get_pixel(0, 0), white);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
