// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the faded selfie view with the ink layer on top.
// 2) A round cursor that follows your index finger.
// 3) A tiny 5x7 bitmap font for the HUD (mode, greeting, caption).

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::error::Error;
use crate::raster;
use crate::renderer::Cursor;
use crate::types::{FrameBuffer, Point, Rgba};

pub const SLATE: Rgba = Rgba::opaque(0x0F, 0x17, 0x2A); // page background behind the camera
const CAMERA_OPACITY: f32 = 0.5;
const ERASE_CURSOR: Rgba = Rgba { r: 239, g: 68, b: 68, a: 102 }; // rgba(239,68,68,0.4)
const CURSOR_ALPHA: u8 = 0xBB;
const CURSOR_RADIUS_PINCH: f32 = 12.0;
const CURSOR_RADIUS_OPEN: f32 = 25.0;
const CURSOR_RING: f32 = 3.0;

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a resizable window; frames of any size are scaled to fit.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let opts = WindowOptions { resize: true, ..WindowOptions::default() };
        let window = Window::new(title, width, height, opts)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// True while ESC is held down (we'll exit when this is pressed).
    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Mouse position in the pixels of a `frame_w` x `frame_h` frame;
    /// None when the pointer is outside the window.
    pub fn pointer_in_frame(&self, frame_w: u32, frame_h: u32) -> Option<Point> {
        let (x, y) = self.window.get_mouse_pos(MouseMode::Discard)?;
        Some(scale_pointer(Point::new(x, y), self.window.get_size(), (frame_w, frame_h)))
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// Edge-triggered key press (no auto-repeat).
    pub fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// Palette slot for a freshly pressed digit: 1..9 -> 0..8, 0 -> 9.
    pub fn palette_key(&self) -> Option<usize> {
        const DIGITS: [Key; 10] = [
            Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
            Key::Key6, Key::Key7, Key::Key8, Key::Key9, Key::Key0,
        ];
        DIGITS.iter().position(|&k| self.pressed_once(k))
    }
}

/// Window pixels to frame pixels. The window can be resized freely while
/// frames keep the camera's size.
pub fn scale_pointer(p: Point, window: (usize, usize), frame: (u32, u32)) -> Point {
    let (ww, wh) = window;
    if ww == 0 || wh == 0 {
        return p;
    }
    Point::new(p.x * frame.0 as f32 / ww as f32, p.y * frame.1 as f32 / wh as f32)
}

/* ---------- Screen composition ---------- */

/// Everything the HUD shows besides the pictures.
pub struct Hud<'a> {
    pub greeting: &'a str,
    pub erase_mode: bool,
    pub pinching: bool,
    pub caption: &'a str,
    pub caption_busy: bool,
    pub theme: &'a str,
    pub status: &'a str,
}

/// Faded mirrored camera, then ink, then cursor, then HUD.
pub fn compose(
    screen: &mut FrameBuffer,
    live: &FrameBuffer,
    ink: &image::RgbaImage,
    cursor: Option<&Cursor>,
    hud: &Hud<'_>,
) {
    raster::mirrored_backdrop(screen, live, SLATE, CAMERA_OPACITY);
    raster::composite_surface(screen, ink);
    if let Some(c) = cursor {
        draw_cursor(screen, c);
    }
    draw_hud(screen, hud);
}

/// Shown until the first camera frame has been processed.
pub fn compose_waiting(screen: &mut FrameBuffer) {
    screen.pixels.fill(SLATE.to_u32());
    let text = "WAKING UP MAGIC STUDIO...";
    let scale = 3;
    let x = (screen.width as i32 - text_width(text, scale)) / 2;
    let y = screen.height as i32 / 2 - 7 * scale / 2;
    draw_text_5x7(screen, x, y, text, 0x00_FF_FF_FF, scale);
}

pub fn draw_cursor(fb: &mut FrameBuffer, c: &Cursor) {
    let fill = if c.erase { ERASE_CURSOR } else { c.color.with_alpha(CURSOR_ALPHA) };
    let radius = if c.pinching { CURSOR_RADIUS_PINCH } else { CURSOR_RADIUS_OPEN };
    raster::fill_disc(fb, c.position, radius, fill);
    raster::stroke_circle(fb, c.position, radius, CURSOR_RING, Rgba::WHITE);
}

fn draw_hud(fb: &mut FrameBuffer, hud: &Hud<'_>) {
    let w = fb.width as i32;
    let white = 0x00_FF_FF_FF;

    // Greeting, top center
    let greet = hud.greeting;
    draw_text_5x7(fb, (w - text_width(greet, 4)) / 2, 16, greet, white, 4);

    // Mode label + pen dot, top right
    let label = if hud.erase_mode { "ERASE MODE" } else { "WRITE MODE" };
    let lx = w - text_width(label, 2) - 16;
    draw_text_5x7(fb, lx, 20, label, white, 2);
    let dot = match (hud.pinching, hud.erase_mode) {
        (true, true) => Rgba::opaque(0xEF, 0x44, 0x44),
        (true, false) => Rgba::opaque(0x22, 0xC5, 0x5E),
        (false, _) => Rgba::opaque(0xCB, 0xD5, 0xE1),
    };
    raster::fill_disc(fb, Point::new(lx as f32 - 14.0, 26.0), 7.0, dot);

    // Caption (or the busy line), under the greeting
    let line = if hud.caption_busy { "THINKING..." } else { hud.caption };
    if !line.is_empty() {
        let quoted = format!("\"{line}\"");
        draw_text_5x7(fb, (w - text_width(&quoted, 2)).max(8) / 2, 72, &quoted, 0x00_E9_D5_FF, 2);
    }

    // Key help + status, bottom left
    let h = fb.height as i32;
    let help = format!("1-0 COLOR  E ERASER  C CLEAR  S SAVE ({})  L/D THEME  M MAGIC", hud.theme);
    draw_text_5x7(fb, 8, h - 32, &help, white, 1);
    draw_text_5x7(fb, 8, h - 16, hud.status, white, 1);
}

/* ---------- Software drawing: pixels, tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Return a 5x7 glyph bitmap. Lowercase maps to uppercase.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),
        '!' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100),
        '?' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b00000,0b00100),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '/' => g!(0b00001,0b00001,0b00010,0b00100,0b01000,0b10000,0b10000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),
        '\'' => g!(0b00100,0b00100,0b01000,0b00000,0b00000,0b00000,0b00000),
        '"' => g!(0b01010,0b01010,0b00000,0b00000,0b00000,0b00000,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y), each font pixel a `scale`x`scale` block.
/// A 1-block black shadow keeps it readable over the camera.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (offset, c) in [(scale, 0x00000000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        put_pixel(
                            fb,
                            x + rx * scale + sx + offset,
                            y + ry as i32 * scale + sy + offset,
                            c,
                        );
                    }
                }
            }
        }
    }
}

/// Pixel width of `text` at `scale` (5 px glyph + 1 px spacing).
pub fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * 6 * scale
}

/// Draw a text string using 5x7 glyphs.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += 6 * scale;
    }
}
