// Where fingertip positions come from.
// Two sources sit behind LandmarkSource:
// - SubprocessTracker: a hand-landmark model (MediaPipe Hands or compatible)
//   in a child process. Each frame goes to its stdin as a small header plus
//   raw RGB; it answers with one JSON line.
// - PointerSimulator: the mouse as a fake hand; holding the left button pinches.
// Visual: with --simulate the cursor sits under the mouse pointer.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::transform::Mirror;
use crate::types::{FrameBuffer, Point};

/// Hand landmark indices (MediaPipe hand model). Only the two tips are read.
pub const LANDMARK_COUNT: usize = 21;
pub const THUMB_TIP: usize = 4;
pub const INDEX_FINGER_TIP: usize = 8;

/// One landmark, normalized to the frame: x and y in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// The two tips a frame contributes to drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FingerTips {
    pub index_tip: Landmark,
    pub thumb_tip: Landmark,
}

/// Result of one detection. `hand == None` means no hand in view.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LandmarkFrame {
    pub hand: Option<FingerTips>,
}

impl LandmarkFrame {
    pub const ABSENT: LandmarkFrame = LandmarkFrame { hand: None };

    pub fn with_tips(index_tip: Landmark, thumb_tip: Landmark) -> Self {
        Self { hand: Some(FingerTips { index_tip, thumb_tip }) }
    }
}

/// Anything that turns a camera frame into zero or one hand.
pub trait LandmarkSource {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<LandmarkFrame, Error>;

    /// Latest pointer state from the window. Only the simulator listens.
    fn observe_pointer(&mut self, _pointer: Option<Point>, _pressed: bool) {}

    /// Release the engine. Called on teardown; must be safe to call twice.
    fn close(&mut self) {}
}

/* ---------------- Subprocess tracker ---------------- */

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    score: Option<f32>,
    landmarks: Vec<Landmark>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one response line from the tracker process.
/// The first hand with a full landmark set wins (the tracker runs with one hand max).
pub fn parse_detection(line: &str) -> Result<LandmarkFrame, Error> {
    let parsed: DetectionJson = serde_json::from_str(line.trim())
        .map_err(|e| Error::Tracker(format!("Bad tracker response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(Error::Tracker(err));
    }

    for hand in parsed.hands {
        if hand.landmarks.len() != LANDMARK_COUNT {
            log::warn!("Expected {LANDMARK_COUNT} landmarks, got {}", hand.landmarks.len());
            continue;
        }
        log::trace!("hand score {:?}", hand.score);
        return Ok(LandmarkFrame::with_tips(
            hand.landmarks[INDEX_FINGER_TIP],
            hand.landmarks[THUMB_TIP],
        ));
    }
    Ok(LandmarkFrame::ABSENT)
}

/// Hand tracker running as a child process (line protocol on stdin/stdout).
pub struct SubprocessTracker {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    scratch: Vec<u8>,
}

impl SubprocessTracker {
    /// Spawn the tracker and wait for its `READY` line.
    pub fn start(cfg: &TrackerConfig) -> Result<Self, Error> {
        log::info!("Starting hand tracker: {} {}", cfg.python, cfg.script);

        let mut child = Command::new(&cfg.python)
            .arg(&cfg.script)
            .arg("--max-num-hands")
            .arg(cfg.max_num_hands.to_string())
            .arg("--model-complexity")
            .arg(cfg.model_complexity.to_string())
            .arg("--min-detection-confidence")
            .arg(cfg.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(cfg.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Tracker(format!("Spawn tracker: {e}")))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().map(BufReader::new);
        let mut tracker = Self { child: Some(child), stdin, stdout, scratch: Vec::new() };

        let mut ready = String::new();
        let reader = tracker
            .stdout
            .as_mut()
            .ok_or_else(|| Error::Tracker("Tracker stdout unavailable".into()))?;
        reader
            .read_line(&mut ready)
            .map_err(|e| Error::Tracker(format!("Wait for READY: {e}")))?;
        if ready.trim() != "READY" {
            tracker.close();
            return Err(Error::Tracker(format!("Tracker did not signal ready, got: {}", ready.trim())));
        }

        log::info!("Hand tracker ready");
        Ok(tracker)
    }
}

impl LandmarkSource for SubprocessTracker {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<LandmarkFrame, Error> {
        let (Some(stdin), Some(stdout)) = (self.stdin.as_mut(), self.stdout.as_mut()) else {
            return Err(Error::Tracker("Tracker already closed".into()));
        };

        // Header: width, height, channels (u32 LE), then packed RGB.
        self.scratch.clear();
        self.scratch.reserve(12 + frame.pixels.len() * 3);
        self.scratch.extend_from_slice(&(frame.width as u32).to_le_bytes());
        self.scratch.extend_from_slice(&(frame.height as u32).to_le_bytes());
        self.scratch.extend_from_slice(&3u32.to_le_bytes());
        for &px in &frame.pixels {
            self.scratch.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, px as u8]);
        }

        stdin
            .write_all(&self.scratch)
            .and_then(|_| stdin.flush())
            .map_err(|e| Error::Tracker(format!("Send frame: {e}")))?;

        let mut line = String::new();
        let n = stdout
            .read_line(&mut line)
            .map_err(|e| Error::Tracker(format!("Read landmarks: {e}")))?;
        if n == 0 {
            return Err(Error::Tracker("Tracker closed its output".into()));
        }
        parse_detection(&line)
    }

    fn close(&mut self) {
        // Dropping stdin lets a well-behaved tracker exit on EOF.
        self.stdin = None;
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            log::info!("Hand tracker stopped");
        }
    }
}

impl Drop for SubprocessTracker {
    fn drop(&mut self) {
        self.close();
    }
}

/* ---------------- Pointer simulator ---------------- */

/// Screen-pixel gap between the fake thumb and index tips when not pinching.
const OPEN_HAND_GAP: f32 = 100.0;

/// Mouse-driven stand-in for a tracker.
/// The pointer is the index tip (in mirrored screen space, where the user looks);
/// the thumb sits on it while the button is held, otherwise below it.
#[derive(Default)]
pub struct PointerSimulator {
    pointer: Option<Point>,
    pressed: bool,
}

impl PointerSimulator {
    /// Build the landmark frame the tracker would have reported.
    pub fn frame_for(mirror: &Mirror, pointer: Option<Point>, pressed: bool) -> LandmarkFrame {
        let Some(p) = pointer else {
            return LandmarkFrame::ABSENT;
        };
        let (ix, iy) = mirror.screen_to_normalized(p);
        let thumb = if pressed { p } else { Point::new(p.x, p.y + OPEN_HAND_GAP) };
        let (tx, ty) = mirror.screen_to_normalized(thumb);
        LandmarkFrame::with_tips(Landmark { x: ix, y: iy }, Landmark { x: tx, y: ty })
    }
}

impl LandmarkSource for PointerSimulator {
    fn observe_pointer(&mut self, pointer: Option<Point>, pressed: bool) {
        self.pointer = pointer;
        self.pressed = pressed;
    }

    fn detect(&mut self, frame: &FrameBuffer) -> Result<LandmarkFrame, Error> {
        let (w, h) = frame.dimensions();
        Ok(Self::frame_for(&Mirror::new(w, h), self.pointer, self.pressed))
    }
}
