//! Common data types for persistence
//!
//! Shared types used across the data module.

use crate::config::corpus::HADITH_KIND;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Item - a node of the corpus as served by the API
// =============================================================================

/// A book, section or hadith as returned by the corpus API
///
/// Field names follow the API's JSON (`desc`, `type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    /// Display/body text
    #[serde(rename = "desc")]
    pub description: String,
    /// `1000` for hadith leaves, lower values for books and sections
    #[serde(rename = "type")]
    pub kind: i64,
    /// Containing item, `None` for roots
    #[serde(default)]
    pub parent: Option<i64>,
}

impl Item {
    /// Create a root item
    pub fn new(id: i64, description: impl Into<String>, kind: i64) -> Self {
        Self {
            id,
            description: description.into(),
            kind,
            parent: None,
        }
    }

    /// Create a hadith leaf item
    pub fn hadith(id: i64, description: impl Into<String>) -> Self {
        Self::new(id, description, HADITH_KIND)
    }

    /// Set the parent reference
    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Leaf item holding displayable text
    pub fn is_hadith(&self) -> bool {
        self.kind == HADITH_KIND
    }

    /// Book or section
    pub fn is_container(&self) -> bool {
        self.kind < HADITH_KIND
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// =============================================================================
// Favorite - a saved copy of an item
// =============================================================================

/// A favorited item
///
/// Holds a full copy of the item as it was when favorited, so it stays
/// viewable even if the API later changes or drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// The item data
    #[serde(flatten)]
    pub item: Item,
    /// When the favorite was added (Unix timestamp)
    #[serde(default, rename = "addedAt")]
    pub added_at: u64,
}

impl Favorite {
    /// Create a favorite from an item snapshot, stamped with the current time
    pub fn new(item: Item) -> Self {
        Self {
            item,
            added_at: now_secs(),
        }
    }

    pub fn id(&self) -> i64 {
        self.item.id
    }

    pub fn description(&self) -> &str {
        &self.item.description
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kinds() {
        let hadith = Item::hadith(7, "text");
        assert!(hadith.is_hadith());
        assert!(!hadith.is_container());

        let book = Item::new(1, "Book", 1);
        assert!(book.is_container());
        assert!(!book.is_hadith());
        assert!(book.is_root());

        let section = Item::new(2, "Section", 10).with_parent(1);
        assert!(!section.is_root());
        assert_eq!(section.parent, Some(1));
    }

    #[test]
    fn test_item_api_json() {
        let json = r#"{"id": 12, "desc": "Narrated ...", "type": 1000, "parent": 3}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 12);
        assert_eq!(item.description, "Narrated ...");
        assert!(item.is_hadith());
        assert_eq!(item.parent, Some(3));
    }

    #[test]
    fn test_item_null_or_missing_parent() {
        let item: Item = serde_json::from_str(r#"{"id": 1, "desc": "B", "type": 1, "parent": null}"#).unwrap();
        assert_eq!(item.parent, None);

        let item: Item = serde_json::from_str(r#"{"id": 1, "desc": "B", "type": 1}"#).unwrap();
        assert_eq!(item.parent, None);
    }

    #[test]
    fn test_favorite_is_flat() {
        let favorite = Favorite { item: Item::hadith(5, "text"), added_at: 100 };
        let value = serde_json::to_value(&favorite).unwrap();

        assert_eq!(value["id"], 5);
        assert_eq!(value["desc"], "text");
        assert_eq!(value["type"], 1000);
        assert_eq!(value["addedAt"], 100);
    }

    #[test]
    fn test_favorite_from_plain_item_json() {
        // Entries saved without a timestamp still load
        let json = r#"{"id": 9, "desc": "old entry", "type": 1000, "parent": 2}"#;
        let favorite: Favorite = serde_json::from_str(json).unwrap();
        assert_eq!(favorite.id(), 9);
        assert_eq!(favorite.description(), "old entry");
        assert_eq!(favorite.added_at, 0);
    }

    #[test]
    fn test_favorite_new_stamps_time() {
        let favorite = Favorite::new(Item::hadith(1, "x"));
        assert!(favorite.added_at > 0);
    }
}
