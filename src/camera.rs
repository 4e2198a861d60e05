// Opens the webcam for the length of a drawing session and hands out frames
// in the window's pixel format.
// Visual expectation: each `next_frame()` is one fresh (unmirrored) camera image;
// the stream light goes off as soon as the capture is stopped or dropped.

use crate::config::CameraConfig;
use crate::error::Error;
use crate::types::FrameBuffer;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
};

// A small wrapper around nokhwa::Camera so our main loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
    streaming: bool,
}

impl CameraCapture {
    /// Open the configured device near the requested resolution and start streaming.
    pub fn start(cfg: &CameraConfig) -> Result<Self, Error> {
        let idx = CameraIndex::Index(cfg.index);

        let fmt = CameraFormat::new(
            Resolution::new(cfg.width, cfg.height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            cfg.fps,
        );

        // Ask for RGB frames, closest to what we requested.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // The actual stream might choose a slightly different resolution.
        let actual = cam.resolution();
        log::info!(
            "Camera {} streaming at {}x{}",
            cfg.index,
            actual.width(),
            actual.height()
        );

        Ok(Self { cam, width: actual.width(), height: actual.height(), streaming: true })
    }

    /// Grab one frame and convert it to 0x00RRGGBB pixels.
    /// The frame's own size is authoritative: it can differ from what was negotiated
    /// at start if the driver renegotiates mid-stream.
    pub fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let (w, h) = rgb_img.dimensions();
        let pixels = rgb_img
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();

        if (w, h) != (self.width, self.height) {
            log::info!("Camera now delivering {w}x{h} (was {}x{})", self.width, self.height);
            self.width = w;
            self.height = h;
        }
        Ok(FrameBuffer { width: w as usize, height: h as usize, pixels })
    }

    /// Release the device. Safe to call more than once.
    pub fn stop(&mut self) {
        if !self.streaming {
            return;
        }
        self.streaming = false;
        match self.cam.stop_stream() {
            Ok(()) => log::info!("Camera stopped"),
            Err(e) => log::warn!("Camera stop failed: {e}"),
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Print the cameras nokhwa can see.
pub fn list_cameras() -> Result<(), Error> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| Error::CameraInit(format!("Query cameras: {e}")))?;
    println!("{:<5} | {:<30} | {}", "Index", "Name", "Description");
    println!("{}", "-".repeat(60));
    for cam in cameras {
        println!("{:<5} | {:<30} | {}", cam.index(), cam.human_name(), cam.description());
    }
    Ok(())
}
