//! Light and dark colour themes

use std::fmt;

use serde::{Deserialize, Serialize};

/// 8-bit RGB colour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb`.
    #[must_use]
    pub const fn from_hex(hex: u32) -> Self {
        Self((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Display theme.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background
    #[default]
    Light,
    /// Dark background
    Dark,
}

impl Theme {
    /// Theme for a `dark_theme` flag.
    #[must_use]
    pub fn from_dark(dark: bool) -> Self {
        if dark {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// The other theme.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Colours for this theme.
    #[must_use]
    pub fn palette(self) -> Palette {
        match self {
            Self::Light => Palette {
                window: Rgb(240, 240, 240),
                figure: Rgb::from_hex(0xf0_f9_fa),
                axes: Rgb(255, 255, 255),
                text: Rgb(0, 0, 0),
                grid: Rgb(128, 128, 128),
                traces: TRACE_COLORS,
            },
            Self::Dark => Palette {
                window: Rgb(43, 43, 43),
                figure: Rgb::from_hex(0x2b_2b_2b),
                axes: Rgb::from_hex(0x3c_3f_41),
                text: Rgb(255, 255, 255),
                grid: Rgb(255, 255, 255),
                traces: TRACE_COLORS,
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

/// Theme colours for the three plots and their chrome.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Window background
    pub window: Rgb,
    /// Figure background
    pub figure: Rgb,
    /// Plot area background
    pub axes: Rgb,
    /// Tick labels and titles
    pub text: Rgb,
    /// Grid lines (drawn at 30% opacity)
    pub grid: Rgb,
    /// Data traces
    pub traces: TraceColors,
}

/// Colours of the plotted data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceColors {
    /// Raw signal trace
    pub raw: Rgb,
    /// Smoothed signal trace
    pub smoothed: Rgb,
    /// Heart-rate markers
    pub pulse: Rgb,
}

/// Trace colours, shared by both themes.
pub const TRACE_COLORS: TraceColors = TraceColors {
    raw: Rgb::from_hex(0x00_77_cc),
    smoothed: Rgb::from_hex(0x00_cc_cc),
    pulse: Rgb(255, 0, 0),
};
