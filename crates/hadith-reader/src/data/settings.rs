//! Display settings management
//!
//! Font preferences and the dark-mode state machine. The active theme is
//! derived on read from the dark-mode setting and the host color scheme.

use crate::config::display::{DEFAULT_FONT_SIZE, FONT_SIZES};
use crate::config::storage::SETTINGS_KEY;
use crate::data::persist::PersistWorker;
use crate::data::storage::{self, KeyValueStore};
use crate::data::theme::{resolve_theme, ColorScheme, ColorSchemeSource, Theme};
use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Font families offered by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Roboto,
    OpenSans,
    Montserrat,
    Lato,
    PTSans,
}

impl FontFamily {
    pub const ALL: [FontFamily; 5] = [
        FontFamily::Roboto,
        FontFamily::OpenSans,
        FontFamily::Montserrat,
        FontFamily::Lato,
        FontFamily::PTSans,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Roboto => "Roboto",
            FontFamily::OpenSans => "OpenSans",
            FontFamily::Montserrat => "Montserrat",
            FontFamily::Lato => "Lato",
            FontFamily::PTSans => "PTSans",
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontFamily {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        FontFamily::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::InvalidPreferenceValue(format!("unknown font family '{}'", s)))
    }
}

/// Dark-mode preference
///
/// Persisted as the legacy `isDarkMode` flag: `true`, `false` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum DarkMode {
    ExplicitDark,
    ExplicitLight,
    /// Track the host color scheme
    #[default]
    FollowSystem,
}

impl DarkMode {
    /// Next mode for the dark-mode toggle
    ///
    /// Leaving follow-system always lands on dark, whatever the host scheme
    /// is; after that the toggle alternates between the explicit modes.
    pub fn toggled(self) -> Self {
        match self {
            DarkMode::FollowSystem => DarkMode::ExplicitDark,
            DarkMode::ExplicitDark => DarkMode::ExplicitLight,
            DarkMode::ExplicitLight => DarkMode::ExplicitDark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DarkMode::ExplicitDark => "dark",
            DarkMode::ExplicitLight => "light",
            DarkMode::FollowSystem => "system",
        }
    }
}

impl From<Option<bool>> for DarkMode {
    fn from(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => DarkMode::ExplicitDark,
            Some(false) => DarkMode::ExplicitLight,
            None => DarkMode::FollowSystem,
        }
    }
}

impl From<DarkMode> for Option<bool> {
    fn from(mode: DarkMode) -> Self {
        match mode {
            DarkMode::ExplicitDark => Some(true),
            DarkMode::ExplicitLight => Some(false),
            DarkMode::FollowSystem => None,
        }
    }
}

impl fmt::Display for DarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted display settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub font_family: FontFamily,
    /// Point size; not range-checked here, see `SettingsRegistry::try_set_font_size`
    pub font_size: u32,
    #[serde(rename = "isDarkMode")]
    pub dark_mode: DarkMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_family: FontFamily::default(),
            font_size: DEFAULT_FONT_SIZE,
            dark_mode: DarkMode::default(),
        }
    }
}

/// Holds display settings and resolves the active theme
pub struct SettingsRegistry {
    settings: Mutex<Settings>,
    scheme: Arc<dyn ColorSchemeSource>,
    writer: PersistWorker,
    loaded: AtomicBool,
}

impl SettingsRegistry {
    /// Create a registry with default settings backed by `store`
    ///
    /// Nothing is read until [`load`](Self::load) is called.
    pub fn new(store: Arc<dyn KeyValueStore>, scheme: Arc<dyn ColorSchemeSource>) -> Self {
        Self {
            settings: Mutex::new(Settings::default()),
            scheme,
            writer: PersistWorker::spawn("settings", store),
            loaded: AtomicBool::new(false),
        }
    }

    /// Create a registry and load its persisted state
    pub fn open(store: Arc<dyn KeyValueStore>, scheme: Arc<dyn ColorSchemeSource>) -> Self {
        let registry = Self::new(store, scheme);
        registry.load();
        registry
    }

    /// Replace the in-memory settings with the persisted ones
    ///
    /// Absent, unreadable or malformed data yields the defaults. Missing or
    /// invalid fields take their default values; the other fields are kept.
    pub fn load(&self) {
        let mut settings = self.lock();
        self.writer.flush();

        let loaded = match storage::load_state::<Value>(self.writer.store().as_ref(), SETTINGS_KEY) {
            Ok(Some(state)) => recover_settings(&state),
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!(key = SETTINGS_KEY, error = %e, "Discarding stored settings");
                Settings::default()
            }
        };

        info!(
            font_family = %loaded.font_family,
            font_size = loaded.font_size,
            dark_mode = %loaded.dark_mode,
            "Loaded settings"
        );
        *settings = loaded;
        self.loaded.store(true, Ordering::SeqCst);
    }

    /// Whether [`load`](Self::load) has completed
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Current settings
    pub fn snapshot(&self) -> Settings {
        *self.lock()
    }

    pub fn font_family(&self) -> FontFamily {
        self.lock().font_family
    }

    pub fn font_size(&self) -> u32 {
        self.lock().font_size
    }

    pub fn dark_mode(&self) -> DarkMode {
        self.lock().dark_mode
    }

    pub fn set_font_family(&self, font_family: FontFamily) {
        self.update(|s| s.font_family = font_family);
    }

    /// Set the font size without checking it against the offered sizes
    pub fn set_font_size(&self, points: u32) {
        self.update(|s| s.font_size = points);
    }

    /// Set the font size, rejecting values the settings screen doesn't offer
    pub fn try_set_font_size(&self, points: u32) -> Result<()> {
        if !FONT_SIZES.contains(&points) {
            return Err(StoreError::InvalidPreferenceValue(format!(
                "font size {} is not one of {:?}",
                points, FONT_SIZES
            )));
        }
        self.set_font_size(points);
        Ok(())
    }

    /// Advance the dark-mode state machine, returning the new mode
    pub fn toggle_dark_mode(&self) -> DarkMode {
        self.update(|s| {
            s.dark_mode = s.dark_mode.toggled();
            s.dark_mode
        })
    }

    /// Follow the host color scheme again, returning the resulting theme
    pub fn set_system_theme(&self) -> Theme {
        self.update(|s| {
            s.dark_mode = DarkMode::FollowSystem;
            resolve_theme(s.dark_mode, self.system_scheme())
        })
    }

    /// Host color scheme, read now
    pub fn system_scheme(&self) -> ColorScheme {
        self.scheme.color_scheme()
    }

    /// Active theme for the current mode and host color scheme
    pub fn theme(&self) -> Theme {
        let mode = self.dark_mode();
        resolve_theme(mode, self.system_scheme())
    }

    /// Wait for queued writes to reach the store
    pub fn flush(&self) {
        self.writer.flush();
    }

    /// Most recent write failure, if the last write failed
    pub fn last_persist_error(&self) -> Option<String> {
        self.writer.last_error()
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `change` and queue the new settings while still holding the lock
    fn update<R>(&self, change: impl FnOnce(&mut Settings) -> R) -> R {
        let mut settings = self.lock();
        let result = change(&mut *settings);
        debug!(?settings, "Settings changed");
        self.writer.submit_state(SETTINGS_KEY, &*settings);
        result
    }
}

/// Build settings from a stored state object field by field
///
/// A field that is missing or can't be read falls back to its default
/// without discarding the others.
fn recover_settings(state: &Value) -> Settings {
    let mut settings = Settings::default();
    let Some(fields) = state.as_object() else {
        warn!(key = SETTINGS_KEY, "Stored settings are not an object");
        return settings;
    };

    if let Some(value) = fields.get("fontFamily") {
        match FontFamily::deserialize(value) {
            Ok(family) => settings.font_family = family,
            Err(e) => warn!(field = "fontFamily", %value, error = %e, "Ignoring stored setting"),
        }
    }

    if let Some(value) = fields.get("fontSize") {
        match stored_font_size(value) {
            Some(points) => settings.font_size = points,
            None => warn!(field = "fontSize", %value, "Ignoring stored setting"),
        }
    }

    if let Some(value) = fields.get("isDarkMode") {
        match DarkMode::deserialize(value) {
            Ok(mode) => settings.dark_mode = mode,
            Err(e) => warn!(field = "isDarkMode", %value, error = %e, "Ignoring stored setting"),
        }
    }

    settings
}

/// Whole point sizes are taken as is, fractional ones are rounded
fn stored_font_size(value: &Value) -> Option<u32> {
    if let Some(points) = value.as_u64() {
        return u32::try_from(points).ok();
    }
    value
        .as_f64()
        .filter(|points| points.is_finite() && *points >= 0.0 && *points <= f64::from(u32::MAX))
        .map(|points| points.round() as u32)
}
