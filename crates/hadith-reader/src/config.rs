//! Configuration constants for the hadith reader core

/// Application metadata
pub mod app {
    /// Application name (used for the data directory, etc.)
    pub const NAME: &str = "hadith-reader";
}

/// Durable storage configuration
pub mod storage {
    /// Key holding the favorites collection
    pub const FAVORITES_KEY: &str = "favorites-storage";

    /// Key holding the display settings
    pub const SETTINGS_KEY: &str = "settings-storage";

    /// Envelope version written alongside persisted state
    pub const STATE_VERSION: u32 = 0;

    /// File extension used by the file-backed store
    pub const FILE_EXTENSION: &str = "json";
}

/// Display-related configuration
pub mod display {
    /// Font sizes offered by the settings screen (points)
    pub const FONT_SIZES: [u32; 5] = [14, 16, 18, 20, 22];

    /// Default font size (points)
    pub const DEFAULT_FONT_SIZE: u32 = 16;

    /// Environment variable consulted for the host color scheme
    pub const COLOR_SCHEME_ENV: &str = "HADITH_READER_COLOR_SCHEME";
}

/// Corpus conventions of the remote API
pub mod corpus {
    /// `type` value of a leaf hadith item; anything below is a container
    pub const HADITH_KIND: i64 = 1000;
}
