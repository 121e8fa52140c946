//! Data persistence
//!
//! Handles favorites, display settings, theme resolution and storage.

pub mod favorites;
pub mod persist;
pub mod settings;
pub mod storage;
pub mod theme;
pub mod types;

// Re-export common types
pub use favorites::FavoriteRegistry;
pub use settings::{DarkMode, FontFamily, Settings, SettingsRegistry};
pub use storage::{data_dir, FileStore, KeyValueStore, MemoryStore};
pub use theme::{resolve_theme, ColorScheme, ColorSchemeSource, EnvScheme, ManualScheme, Theme, DARK_THEME, LIGHT_THEME};
pub use types::{Favorite, Item};
