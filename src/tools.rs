// Tool/mode state: which color is loaded, whether the eraser is on,
// and which background the exported PNG gets.

use std::fmt;

use crate::types::Rgba;

/// One swatch in the palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorOption {
    pub name: &'static str,
    pub color: Rgba,
}

const fn swatch(name: &'static str, r: u8, g: u8, b: u8) -> ColorOption {
    ColorOption { name, color: Rgba::opaque(r, g, b) }
}

/// Keys 1..9 then 0 pick these in order.
pub const PALETTE: [ColorOption; 10] = [
    swatch("Vayu Blue", 0x50, 0xC2, 0xF7),
    swatch("Lekha Purple", 0x7D, 0x3E, 0x98),
    swatch("Classic Black", 0x1E, 0x29, 0x3B),
    swatch("Ruby Red", 0xE1, 0x1D, 0x48),
    swatch("Deep Blue", 0x25, 0x63, 0xEB),
    swatch("Emerald Green", 0x10, 0xB9, 0x81),
    swatch("Vibrant Orange", 0xF5, 0x9E, 0x0B),
    swatch("Coral Pink", 0xFF, 0x6B, 0x9D),
    swatch("Teal", 0x4E, 0xCD, 0xC4),
    swatch("Golden Sun", 0xFA, 0xCC, 0x15),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportTheme {
    Light,
    #[default]
    Dark,
}

impl ExportTheme {
    pub fn background(self) -> Rgba {
        match self {
            ExportTheme::Light => Rgba::WHITE,
            ExportTheme::Dark => Rgba::opaque(0x1E, 0x29, 0x3B), // slate
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportTheme::Light => "light",
            ExportTheme::Dark => "dark",
        }
    }
}

impl fmt::Display for ExportTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the renderer reads every frame. `Copy` so a frame never holds
/// on to the live state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolSnapshot {
    pub active_color: Rgba,
    pub erase_mode: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolState {
    active_color: Rgba,
    erase_mode: bool,
    export_theme: ExportTheme,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active_color: PALETTE[0].color,
            erase_mode: false,
            export_theme: ExportTheme::default(),
        }
    }
}

impl ToolState {
    /// Picking a color always puts the pen back in draw mode.
    pub fn select_color(&mut self, color: Rgba) {
        self.active_color = color;
        self.erase_mode = false;
        log::debug!("color {color} selected");
    }

    /// Palette slot by index; out-of-range slots are ignored.
    pub fn select_palette(&mut self, slot: usize) -> Option<&'static ColorOption> {
        let option = PALETTE.get(slot)?;
        self.select_color(option.color);
        Some(option)
    }

    /// Flips the eraser; the stored color is untouched.
    pub fn toggle_erase(&mut self) -> bool {
        self.erase_mode = !self.erase_mode;
        log::debug!("erase mode {}", if self.erase_mode { "on" } else { "off" });
        self.erase_mode
    }

    pub fn set_export_theme(&mut self, theme: ExportTheme) {
        self.export_theme = theme;
    }

    pub fn active_color(&self) -> Rgba {
        self.active_color
    }

    pub fn erase_mode(&self) -> bool {
        self.erase_mode
    }

    pub fn export_theme(&self) -> ExportTheme {
        self.export_theme
    }

    pub fn snapshot(&self) -> ToolSnapshot {
        ToolSnapshot { active_color: self.active_color, erase_mode: self.erase_mode }
    }
}
