//! Theme palettes and resolution
//!
//! The active palette is never stored; it is resolved from the dark-mode
//! setting and, when following the system, the host color scheme read at
//! the time of the call.

use crate::config::display::COLOR_SCHEME_ENV;
use crate::data::settings::DarkMode;
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Named colors used by the presentation layer (hex strings)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub background: &'static str,
    pub background_secondary: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub border: &'static str,
    pub primary: &'static str,
    pub error: &'static str,
}

pub const LIGHT_THEME: Theme = Theme {
    background: "#ffffff",
    background_secondary: "#f5f5f5",
    text: "#000000",
    text_secondary: "#666666",
    border: "#e0e0e0",
    primary: "#007AFF",
    error: "#ff3b30",
};

pub const DARK_THEME: Theme = Theme {
    background: "#121212",
    background_secondary: "#1e1e1e",
    text: "#ffffff",
    text_secondary: "#cccccc",
    border: "#333333",
    primary: "#0a84ff",
    error: "#ff453a",
};

impl Theme {
    pub fn is_dark(&self) -> bool {
        *self == DARK_THEME
    }

    /// Palette name for display
    pub fn name(&self) -> &'static str {
        if self.is_dark() {
            "dark"
        } else {
            "light"
        }
    }
}

/// Resolve the palette for a dark-mode setting and a host color scheme
///
/// Only an explicit `dark` signal selects the dark palette when following
/// the system; `light` and `unknown` both give the light palette.
pub fn resolve_theme(mode: DarkMode, scheme: ColorScheme) -> Theme {
    match mode {
        DarkMode::ExplicitDark => DARK_THEME,
        DarkMode::ExplicitLight => LIGHT_THEME,
        DarkMode::FollowSystem => match scheme {
            ColorScheme::Dark => DARK_THEME,
            ColorScheme::Light | ColorScheme::Unknown => LIGHT_THEME,
        },
    }
}

// =============================================================================
// Host color scheme
// =============================================================================

/// Color scheme reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    Dark,
    Light,
    #[default]
    Unknown,
}

impl ColorScheme {
    /// Parse a platform signal; anything but `dark`/`light` is `Unknown`
    pub fn from_signal(signal: &str) -> Self {
        match signal.trim().to_ascii_lowercase().as_str() {
            "dark" => ColorScheme::Dark,
            "light" => ColorScheme::Light,
            _ => ColorScheme::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Dark => "dark",
            ColorScheme::Light => "light",
            ColorScheme::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the host color scheme, queried synchronously on every use
pub trait ColorSchemeSource: Send + Sync {
    fn color_scheme(&self) -> ColorScheme;
}

/// Scheme set by the embedder (tests, command-line override)
#[derive(Debug, Default)]
pub struct ManualScheme {
    scheme: Mutex<ColorScheme>,
}

impl ManualScheme {
    pub fn new(scheme: ColorScheme) -> Self {
        Self { scheme: Mutex::new(scheme) }
    }

    /// Change the reported scheme (e.g. the OS switched appearance)
    pub fn set(&self, scheme: ColorScheme) {
        *self.scheme.lock().unwrap_or_else(|e| e.into_inner()) = scheme;
    }
}

impl ColorSchemeSource for ManualScheme {
    fn color_scheme(&self) -> ColorScheme {
        *self.scheme.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Reads the scheme from `HADITH_READER_COLOR_SCHEME` on each query
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvScheme;

impl ColorSchemeSource for EnvScheme {
    fn color_scheme(&self) -> ColorScheme {
        std::env::var(COLOR_SCHEME_ENV)
            .map(|v| ColorScheme::from_signal(&v))
            .unwrap_or_default()
    }
}
