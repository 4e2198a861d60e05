// Software rasterizer for ink, eraser and the cursor overlay.
// Visual expectations:
// - A segment shows up as a thick line with round ends (and round joins, since
//   consecutive segments share an endpoint).
// - The eraser punches transparent holes in the ink layer.
// - The cursor is a soft colored disc with a white ring.

use image::RgbaImage;

use crate::types::{FrameBuffer, Point, Rgba};

/// How a segment touches the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    /// Paint `color` over whatever is there (canvas `source-over`).
    SourceOver(Rgba),
    /// Remove coverage from what is there (canvas `destination-out`).
    DestinationOut,
}

/// Shortest distance from `p` to the segment `a..b`.
fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len2 = abx * abx + aby * aby;
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len2).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + abx * t, a.y + aby * t))
}

/// Integer "over" for one 8-bit channel: (src*a + dst*(255-a)) / 255, rounded.
#[inline]
fn lerp_u8(dst: u8, src: u8, a: u8) -> u8 {
    let a = a as u32;
    ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8
}

/// Porter-Duff source-over of a straight-alpha color onto a straight-alpha pixel.
fn source_over(dst: &mut image::Rgba<u8>, src: Rgba, coverage: f32) {
    let sa = (src.a as f32 / 255.0) * coverage;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| -> u8 {
        let c = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    *dst = image::Rgba([
        mix(src.r, dst[0]),
        mix(src.g, dst[1]),
        mix(src.b, dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}

/// Porter-Duff destination-out: keep only the part of dst not covered.
fn destination_out(dst: &mut image::Rgba<u8>, coverage: f32) {
    let keep = 1.0 - coverage;
    dst[3] = (dst[3] as f32 * keep).round().clamp(0.0, 255.0) as u8;
    if dst[3] == 0 {
        *dst = image::Rgba([0, 0, 0, 0]);
    }
}

/// Stroke `a..b` with the given width and round caps onto the surface.
/// Edges get one pixel of anti-aliasing; pixels are sampled at their centers.
pub fn stroke_segment(surface: &mut RgbaImage, a: Point, b: Point, width: f32, blend: Blend) {
    let (w, h) = surface.dimensions();
    if w == 0 || h == 0 || width <= 0.0 {
        return;
    }
    let r = width / 2.0;
    let pad = r + 1.0;
    let x0 = (a.x.min(b.x) - pad).floor().max(0.0) as u32;
    let y0 = (a.y.min(b.y) - pad).floor().max(0.0) as u32;
    let x1 = (a.x.max(b.x) + pad).ceil().min(w as f32 - 1.0);
    let y1 = (a.y.max(b.y) + pad).ceil().min(h as f32 - 1.0);
    if x1 < 0.0 || y1 < 0.0 {
        return; // segment is entirely left/above the surface
    }
    let (x1, y1) = (x1 as u32, y1 as u32);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let d = distance_to_segment(center, a, b);
            let coverage = (r + 0.5 - d).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }
            let px = surface.get_pixel_mut(x, y);
            match blend {
                Blend::SourceOver(color) => source_over(px, color, coverage),
                Blend::DestinationOut => destination_out(px, coverage),
            }
        }
    }
}

/// Blend a straight-alpha color onto an opaque 0x00RRGGBB pixel.
#[inline]
fn over_u32(dst: u32, src: Rgba, coverage: f32) -> u32 {
    let a = ((src.a as f32) * coverage).round().clamp(0.0, 255.0) as u8;
    let r = lerp_u8(((dst >> 16) & 0xFF) as u8, src.r, a) as u32;
    let g = lerp_u8(((dst >> 8) & 0xFF) as u8, src.g, a) as u32;
    let b = lerp_u8((dst & 0xFF) as u8, src.b, a) as u32;
    (r << 16) | (g << 8) | b
}

/// Paint pixels whose distance to `center` falls in `[inner, outer]`.
/// A filled disc is `inner = 0`.
fn fill_annulus(fb: &mut FrameBuffer, center: Point, inner: f32, outer: f32, color: Rgba) {
    if outer <= 0.0 {
        return;
    }
    let x0 = (center.x - outer - 1.0).floor().max(0.0) as i64;
    let y0 = (center.y - outer - 1.0).floor().max(0.0) as i64;
    let x1 = ((center.x + outer + 1.0).ceil() as i64).min(fb.width as i64 - 1);
    let y1 = ((center.y + outer + 1.0).ceil() as i64).min(fb.height as i64 - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = Point::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
            let outer_cov = (outer + 0.5 - d).clamp(0.0, 1.0);
            let inner_cov = if inner > 0.0 { (d - inner + 0.5).clamp(0.0, 1.0) } else { 1.0 };
            let coverage = outer_cov.min(inner_cov);
            if coverage <= 0.0 {
                continue;
            }
            let idx = y as usize * fb.width + x as usize;
            fb.pixels[idx] = over_u32(fb.pixels[idx], color, coverage);
        }
    }
}

/// Filled disc, alpha-blended onto the frame.
pub fn fill_disc(fb: &mut FrameBuffer, center: Point, radius: f32, color: Rgba) {
    fill_annulus(fb, center, 0.0, radius, color);
}

/// Circle outline of `thickness`, centered on the radius (canvas `stroke()` after `arc()`).
pub fn stroke_circle(fb: &mut FrameBuffer, center: Point, radius: f32, thickness: f32, color: Rgba) {
    let half = thickness / 2.0;
    fill_annulus(fb, center, (radius - half).max(0.0), radius + half, color);
}

/// Composite the ink layer (screen space, same size) on top of the frame.
pub fn composite_surface(fb: &mut FrameBuffer, surface: &RgbaImage) {
    let (w, h) = surface.dimensions();
    if w as usize != fb.width || h as usize != fb.height {
        return;
    }
    for (dst, px) in fb.pixels.iter_mut().zip(surface.pixels()) {
        if px[3] == 0 {
            continue;
        }
        *dst = over_u32(*dst, Rgba { r: px[0], g: px[1], b: px[2], a: px[3] }, 1.0);
    }
}

/// Mirror `src` horizontally into `dst` at `opacity` over `backdrop`.
/// Visual: the faded selfie view behind the ink.
pub fn mirrored_backdrop(dst: &mut FrameBuffer, src: &FrameBuffer, backdrop: Rgba, opacity: f32) {
    if dst.width != src.width || dst.height != src.height {
        *dst = FrameBuffer::filled(src.width, src.height, backdrop.to_u32());
    }
    let a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let w = src.width;
    for y in 0..src.height {
        let row = y * w;
        for x in 0..w {
            let p = src.pixels[row + (w - 1 - x)];
            let r = lerp_u8(backdrop.r, ((p >> 16) & 0xFF) as u8, a) as u32;
            let g = lerp_u8(backdrop.g, ((p >> 8) & 0xFF) as u8, a) as u32;
            let b = lerp_u8(backdrop.b, (p & 0xFF) as u8, a) as u32;
            dst.pixels[row + x] = (r << 16) | (g << 8) | b;
        }
    }
}
