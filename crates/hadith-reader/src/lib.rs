//! Hadith Reader core
//!
//! Persisted favorites, display settings and theme resolution for the
//! hadith reader. The corpus API and the UI are collaborators; this crate
//! only stores copies of items handed to it and the user's preferences.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hadith_reader::data::{EnvScheme, FavoriteRegistry, FileStore, Item, SettingsRegistry};
//!
//! let store = Arc::new(FileStore::open_default().unwrap());
//! let favorites = FavoriteRegistry::open(store.clone());
//! let settings = SettingsRegistry::open(store, Arc::new(EnvScheme));
//!
//! favorites.add(Item::hadith(7, "Actions are judged by intentions"));
//! let theme = settings.theme();
//! println!("{} favorites, {} theme", favorites.len(), theme.name());
//! ```

pub mod config;
pub mod data;
pub mod error;
