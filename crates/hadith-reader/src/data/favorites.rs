//! Favorites management
//!
//! Ordered, persisted set of favorited items keyed by item id.

use crate::config::storage::FAVORITES_KEY;
use crate::data::persist::PersistWorker;
use crate::data::storage::{self, KeyValueStore};
use crate::data::types::{Favorite, Item};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Persisted favorites state
#[derive(Debug, Default, Serialize, Deserialize)]
struct FavoritesState {
    #[serde(default)]
    favorites: Vec<Favorite>,
}

#[derive(Serialize)]
struct FavoritesStateRef<'a> {
    favorites: &'a [Favorite],
}

/// Manages favorites in memory and writes them through to the store
///
/// Entries keep insertion order (oldest first). Adding an id that is
/// already present replaces the stored copy in place.
pub struct FavoriteRegistry {
    favorites: Mutex<Vec<Favorite>>,
    writer: PersistWorker,
    loaded: AtomicBool,
}

impl FavoriteRegistry {
    /// Create an empty registry backed by `store`
    ///
    /// Nothing is read until [`load`](Self::load) is called.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            favorites: Mutex::new(Vec::new()),
            writer: PersistWorker::spawn("favorites", store),
            loaded: AtomicBool::new(false),
        }
    }

    /// Create a registry and load its persisted state
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let registry = Self::new(store);
        registry.load();
        registry
    }

    /// Replace the in-memory state with the persisted one
    ///
    /// Absent, unreadable or malformed data leaves the registry empty.
    /// Writes already queued land before the read, and mutations wait until
    /// the new state is in place.
    pub fn load(&self) {
        let mut favorites = self.lock();
        self.writer.flush();

        let loaded = match storage::load_state::<FavoritesState>(self.writer.store().as_ref(), FAVORITES_KEY) {
            Ok(Some(state)) => dedup_by_id(state.favorites),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = FAVORITES_KEY, error = %e, "Discarding stored favorites");
                Vec::new()
            }
        };

        info!(count = loaded.len(), "Loaded favorites");
        *favorites = loaded;
        self.loaded.store(true, Ordering::SeqCst);
    }

    /// Whether [`load`](Self::load) has completed
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Add a copy of `item`
    ///
    /// Returns `true` if a new entry was created, `false` if an existing
    /// entry with the same id was replaced.
    pub fn add(&self, item: Item) -> bool {
        let mut favorites = self.lock();
        let favorite = Favorite::new(item);

        let created = match favorites.iter_mut().find(|f| f.id() == favorite.id()) {
            Some(existing) => {
                debug!(id = favorite.id(), "Replacing existing favorite");
                *existing = favorite;
                false
            }
            None => {
                favorites.push(favorite);
                true
            }
        };

        self.persist(&favorites);
        created
    }

    /// Remove the favorite with `id`, if any
    pub fn remove(&self, id: i64) -> Option<Favorite> {
        let mut favorites = self.lock();
        let index = favorites.iter().position(|f| f.id() == id)?;
        let removed = favorites.remove(index);

        self.persist(&favorites);
        Some(removed)
    }

    /// Remove `item` if favorited, otherwise add it
    ///
    /// Returns `true` if the item is a favorite afterwards.
    pub fn toggle(&self, item: Item) -> bool {
        let mut favorites = self.lock();

        let now_favorite = match favorites.iter().position(|f| f.id() == item.id) {
            Some(index) => {
                favorites.remove(index);
                false
            }
            None => {
                favorites.push(Favorite::new(item));
                true
            }
        };

        self.persist(&favorites);
        now_favorite
    }

    /// Check if an item id is favorited
    pub fn is_favorite(&self, id: i64) -> bool {
        self.lock().iter().any(|f| f.id() == id)
    }

    /// Get a favorite by id
    pub fn get(&self, id: i64) -> Option<Favorite> {
        self.lock().iter().find(|f| f.id() == id).cloned()
    }

    /// All favorites, oldest first
    pub fn list(&self) -> Vec<Favorite> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for queued writes to reach the store
    pub fn flush(&self) {
        self.writer.flush();
    }

    /// Most recent write failure, if the last write failed
    pub fn last_persist_error(&self) -> Option<String> {
        self.writer.last_error()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Favorite>> {
        self.favorites.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the full collection; called with the lock held so writes keep mutation order
    fn persist(&self, favorites: &[Favorite]) {
        self.writer.submit_state(FAVORITES_KEY, &FavoritesStateRef { favorites });
    }
}

/// Collapse repeated ids, keeping the first position and the latest copy
fn dedup_by_id(entries: Vec<Favorite>) -> Vec<Favorite> {
    let mut result: Vec<Favorite> = Vec::with_capacity(entries.len());
    for entry in entries {
        match result.iter_mut().find(|f| f.id() == entry.id()) {
            Some(existing) => *existing = entry,
            None => result.push(entry),
        }
    }
    result
}
