// What you SEE:
// • Your mirrored camera feed, faded, with your drawing on top.
// • Pinch thumb + index finger to draw; open the pinch to lift the pen.
// • 1-0 pick a color, E toggles the eraser, C clears, S saves a PNG,
//   L/D pick the saved background, M asks for a caption. ESC quits.
// • --simulate swaps the hand tracker for the mouse (hold LMB to pinch).

mod camera;
mod caption;
mod config;
mod draw;
mod error;
mod export;
mod gesture;
mod landmarks;
mod profile;
mod raster;
mod renderer;
mod session;
mod tools;
mod transform;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use minifb::Key;

use camera::CameraCapture;
use caption::{Captioner, GeminiBackend};
use config::{AppConfig, TrackerConfig};
use draw::{Drawer, Hud};
use error::Error;
use landmarks::{LandmarkSource, PointerSimulator, SubprocessTracker};
use profile::SessionProfile;
use renderer::PenState;
use session::DrawingSession;
use tools::ExportTheme;
use types::FrameBuffer;

const WAITING_REPAINT: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "vayu-lekha", about = "Draw in the air with a pinch")]
struct Args {
    /// JSON settings file (missing file = defaults)
    #[arg(long, default_value = "vayu-lekha.json")]
    config: PathBuf,
    /// Camera index
    #[arg(long)]
    camera: Option<u32>,
    /// Requested capture width
    #[arg(long)]
    width: Option<u32>,
    /// Requested capture height
    #[arg(long)]
    height: Option<u32>,
    /// Drive the pen with the mouse instead of the hand tracker
    #[arg(long)]
    simulate: bool,
    /// Your name, for the greeting
    #[arg(long)]
    name: Option<String>,
    /// Family contact number (10 digits)
    #[arg(long)]
    phone: Option<String>,
    /// Where saved drawings go
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// List cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

impl Args {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(i) = self.camera {
            cfg.camera.index = i;
        }
        if let Some(w) = self.width {
            cfg.camera.width = w;
        }
        if let Some(h) = self.height {
            cfg.camera.height = h;
        }
        if let Some(dir) = &self.export_dir {
            cfg.export_dir = dir.clone();
        }
    }

    fn profile(&self) -> Result<Option<SessionProfile>, Error> {
        if self.name.is_none() && self.phone.is_none() {
            return Ok(None);
        }
        let name = self.name.as_deref().unwrap_or_default();
        let phone = self.phone.as_deref().unwrap_or_default();
        Ok(Some(SessionProfile::new(name, phone)?))
    }
}

/// The hand tracker, or the mouse standing in for it.
fn open_landmark_source(simulate: bool, tracker: &TrackerConfig) -> Result<Box<dyn LandmarkSource>, Error> {
    if simulate {
        log::info!("Simulating the hand with the mouse (hold LMB to pinch)");
        return Ok(Box::new(PointerSimulator::default()));
    }
    Ok(Box::new(SubprocessTracker::start(tracker)?))
}

/// Keep showing the "waking up" screen until the window is closed or ESC.
fn hold_waiting_screen(drawer: &mut Drawer, screen: &mut FrameBuffer) -> Result<(), Error> {
    while drawer.is_open() && !drawer.esc_pressed() {
        draw::compose_waiting(screen);
        drawer.present(screen)?;
        thread::sleep(WAITING_REPAINT);
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_cameras {
        return camera::list_cameras();
    }

    let mut cfg = AppConfig::load(&args.config);
    args.apply(&mut cfg);
    let profile = args.profile()?;
    if let Some(p) = &profile {
        log::info!("Drawing as {} (contact {})", p.name, p.contact_hint());
    }

    /* --- Window first, so the "waking up" screen shows while the camera starts --- */
    let (w, h) = (cfg.camera.width as usize, cfg.camera.height as usize);
    let mut drawer = Drawer::new("VayuLekha: Air Drawing Pad", w, h)?;
    let mut screen = FrameBuffer::filled(w, h, draw::SLATE.to_u32());
    draw::compose_waiting(&mut screen);
    drawer.present(&screen)?;

    /* --- Scoped resources: both release on drop, including on `?` exits --- */
    let started = CameraCapture::start(&cfg.camera)
        .and_then(|cam| Ok((cam, open_landmark_source(args.simulate, &cfg.tracker)?)));
    let (mut cam, mut source) = match started {
        Ok(devices) => devices,
        Err(e) => {
            // No retry: the pad just stays on its "waking up" screen.
            log::error!("{e}");
            return hold_waiting_screen(&mut drawer, &mut screen);
        }
    };

    let captioner = Captioner::new(Arc::new(GeminiBackend::from_env(&cfg.caption)));
    let mut session = DrawingSession::new(cfg.brush.clone(), captioner, profile, cfg.export_dir.clone());
    log::info!("Drawings will be saved to {:?}", session.export_dir());

    /* --- HUD / FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut fps_text = String::from("FPS: 0.0");
    let mut notice = String::new(); // last thing that happened (saved, cleared, color)

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();

        /* 1) Grab a fresh live frame. */
        let live = cam.next_frame()?;

        /* 2) Tool keys: applied before this frame's strokes so the renderer sees them. */
        if let Some(slot) = drawer.palette_key() {
            if let Some(option) = session.tools_mut().select_palette(slot) {
                notice = format!("COLOR: {}", option.name);
            }
        }
        if drawer.pressed_once(Key::E) {
            session.tools_mut().toggle_erase();
        }
        if drawer.pressed_once(Key::C) {
            session.clear();
            notice = "CLEARED".into();
        }
        if drawer.pressed_once(Key::L) {
            session.tools_mut().set_export_theme(ExportTheme::Light);
        }
        if drawer.pressed_once(Key::D) {
            session.tools_mut().set_export_theme(ExportTheme::Dark);
        }
        if drawer.pressed_once(Key::S) {
            match session.export(export::unix_millis()) {
                Ok(Some(path)) => notice = format!("SAVED {}", path.display()),
                Ok(None) => {}
                Err(e) => log::error!("{e}"),
            }
        }
        if drawer.pressed_once(Key::M) {
            session.request_caption();
        }
        session.poll_caption();

        /* 3) Landmarks -> pen. A detection error only skips this frame. */
        let (fw, fh) = live.dimensions();
        source.observe_pointer(drawer.pointer_in_frame(fw, fh), drawer.left_mouse_down());
        let detection = source.detect(&live);
        let outcome = session.on_frame(detection, fw, fh);
        let status = format!("{fps_text}  {notice}");

        /* 4) Compose what you see. */
        match session.renderer() {
            Some(r) => {
                let greeting = session.greeting();
                let hud = Hud {
                    greeting: &greeting,
                    erase_mode: session.tools().erase_mode(),
                    pinching: session.pen_state() != PenState::Idle,
                    caption: session.caption(),
                    caption_busy: session.caption_busy(),
                    theme: session.tools().export_theme().as_str(),
                    status: &status,
                };
                let cursor = outcome.as_ref().and_then(|o| o.cursor.as_ref());
                draw::compose(&mut screen, &live, r.surface(), cursor, &hud);
            }
            None => draw::compose_waiting(&mut screen),
        }

        /* 5) Present. */
        drawer.present(&screen)?;

        /* 6) FPS counter (log + HUD once per second) */
        frames_this_second += 1;
        let elapsed = now.duration_since(last_fps_time);
        if elapsed >= Duration::from_secs(1) {
            let fps = frames_this_second as f32 / elapsed.as_secs_f32();
            log::info!("FPS: {:.1}", fps);
            fps_text = format!("FPS: {:.1}", fps);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    /* --- Teardown: stop taking frames, then release tracker and camera --- */
    session.teardown();
    source.close();
    cam.stop();
    Ok(())
}
