// Export: flatten the transparent ink layer onto a solid background and save a PNG.
// Visual: the saved file looks like the pad minus the camera, on white or slate.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::{ImageFormat, RgbaImage};

use crate::error::Error;
use crate::tools::ExportTheme;

pub const APP_NAME: &str = "VayuLekha";

/// Same-size opaque copy of `surface` over the theme's background (source-over).
pub fn flatten(surface: &RgbaImage, theme: ExportTheme) -> RgbaImage {
    let bg = theme.background();
    let mut out = RgbaImage::from_pixel(surface.width(), surface.height(), bg.to_image());
    for (dst, src) in out.pixels_mut().zip(surface.pixels()) {
        let a = src[3] as u32;
        if a == 0 {
            continue;
        }
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * a + dst[c] as u32 * (255 - a) + 127) / 255) as u8;
        }
    }
    out
}

/// Lossless PNG bytes of any RGBA raster.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::Export(format!("Encode PNG: {e}")))?;
    Ok(bytes)
}

/// `<AppName>-<theme>-<unixMillis>.png`
pub fn export_filename(theme: ExportTheme, unix_millis: u128) -> String {
    format!("{APP_NAME}-{theme}-{unix_millis}.png")
}

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Flatten and write into `dir`. No surface yet (camera not started) is a no-op.
pub fn save(
    surface: Option<&RgbaImage>,
    theme: ExportTheme,
    dir: &Path,
    unix_millis: u128,
) -> Result<Option<PathBuf>, Error> {
    let Some(surface) = surface else {
        log::info!("Nothing to export yet");
        return Ok(None);
    };

    let png = encode_png(&flatten(surface, theme))?;
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|e| Error::Export(format!("Create {dir:?}: {e}")))?;
    }
    let path = dir.join(export_filename(theme, unix_millis));
    fs::write(&path, png).map_err(|e| Error::Export(format!("Write {path:?}: {e}")))?;
    log::info!("Saved drawing to {:?}", path);
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgba;

    #[test]
    fn single_red_pixel_on_dark() {
        let mut s = RgbaImage::new(32, 24);
        s.put_pixel(10, 10, image::Rgba([255, 0, 0, 255]));
        let out = flatten(&s, ExportTheme::Dark);
        let dark = ExportTheme::Dark.background().to_image();
        for (x, y, px) in out.enumerate_pixels() {
            if (x, y) == (10, 10) {
                assert_eq!(*px, image::Rgba([255, 0, 0, 255]));
            } else {
                assert_eq!(*px, dark, "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn partial_alpha_mixes_with_background() {
        let mut s = RgbaImage::new(1, 1);
        s.put_pixel(0, 0, image::Rgba([0, 0, 0, 128]));
        let out = flatten(&s, ExportTheme::Light);
        assert_eq!(*out.get_pixel(0, 0), image::Rgba([127, 127, 127, 255]));
    }

    #[test]
    fn filename_pattern() {
        assert_eq!(export_filename(ExportTheme::Light, 1_700_000_000_123), "VayuLekha-light-1700000000123.png");
        assert_eq!(export_filename(ExportTheme::Dark, 5), "VayuLekha-dark-5.png");
    }

    #[test]
    fn no_surface_is_a_noop() {
        let dir = std::env::temp_dir().join("vayu-lekha-export-noop");
        assert_eq!(save(None, ExportTheme::Light, &dir, 1).unwrap(), None);
        assert!(!dir.join(export_filename(ExportTheme::Light, 1)).exists());
    }

    #[test]
    fn saved_png_decodes_opaque() {
        let dir = std::env::temp_dir().join(format!("vayu-lekha-export-{}", unix_millis()));
        let mut s = RgbaImage::new(8, 8);
        s.put_pixel(1, 1, Rgba::opaque(0x50, 0xC2, 0xF7).to_image());
        let path = save(Some(&s), ExportTheme::Light, &dir, 42).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "VayuLekha-light-42.png");

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (8, 8));
        assert_eq!(*back.get_pixel(1, 1), image::Rgba([0x50, 0xC2, 0xF7, 255]));
        assert_eq!(*back.get_pixel(0, 0), image::Rgba([255, 255, 255, 255]));
        let _ = fs::remove_dir_all(&dir);
    }
}
