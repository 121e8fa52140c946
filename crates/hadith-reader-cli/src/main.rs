//! Hadith Reader CLI: manage favorites and display settings

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use hadith_reader::config::corpus::HADITH_KIND;
use hadith_reader::config::display::FONT_SIZES;
use hadith_reader::data::{
    ColorScheme, ColorSchemeSource, EnvScheme, FavoriteRegistry, FileStore, FontFamily, Item,
    KeyValueStore, ManualScheme, SettingsRegistry,
};

#[derive(Parser)]
#[command(name = "hadith-reader", about = "Favorites and display settings for the hadith reader", version)]
struct Cli {
    /// Directory holding the stored state (defaults to the user data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Host color scheme to assume: dark, light or unknown
    /// (defaults to $HADITH_READER_COLOR_SCHEME)
    #[arg(long, global = true)]
    system_scheme: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage favorites
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Manage display settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Print the active theme palette
    Theme {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FavoritesCommand {
    /// List favorites, oldest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add an item (replaces an existing favorite with the same id)
    Add(ItemArgs),
    /// Remove a favorite by id
    Remove { id: i64 },
    /// Add the item if missing, remove it otherwise
    Toggle(ItemArgs),
    /// Tell whether an id is a favorite
    Check { id: i64 },
}

#[derive(Args)]
struct ItemArgs {
    /// Item id
    #[arg(long)]
    id: i64,
    /// Item text
    #[arg(long)]
    text: String,
    /// Item type (1000 = hadith)
    #[arg(long, default_value_t = HADITH_KIND)]
    kind: i64,
    /// Parent item id
    #[arg(long)]
    parent: Option<i64>,
}

impl ItemArgs {
    fn into_item(self) -> Item {
        Item {
            id: self.id,
            description: self.text,
            kind: self.kind,
            parent: self.parent,
        }
    }
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print current settings
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Set the font family
    FontFamily { name: String },
    /// Set the font size in points
    FontSize { points: u32 },
    /// Cycle the dark mode (system -> dark -> light -> dark ...)
    ToggleDark,
    /// Follow the system color scheme again
    FollowSystem,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store: Arc<dyn KeyValueStore> = match &cli.data_dir {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => Arc::new(FileStore::open_default()?),
    };
    let scheme: Arc<dyn ColorSchemeSource> = match &cli.system_scheme {
        Some(signal) => Arc::new(ManualScheme::new(ColorScheme::from_signal(signal))),
        None => Arc::new(EnvScheme),
    };

    let favorites = FavoriteRegistry::open(store.clone());
    let settings = SettingsRegistry::open(store, scheme);
    debug!(favorites = favorites.len(), "Registries loaded");

    let mut out = io::stdout().lock();
    run(cli.command, &favorites, &settings, &mut out)?;

    favorites.flush();
    settings.flush();
    if let Some(e) = favorites.last_persist_error().or_else(|| settings.last_persist_error()) {
        eprintln!("Warning: changes may not be saved: {}", e);
    }
    Ok(())
}

fn run(
    command: Command,
    favorites: &FavoriteRegistry,
    settings: &SettingsRegistry,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Favorites(cmd) => run_favorites(cmd, favorites, out)?,
        Command::Settings(cmd) => run_settings(cmd, settings, out)?,
        Command::Theme { json } => {
            let theme = settings.theme();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&theme)?)?;
            } else {
                writeln!(out, "theme: {} (mode: {}, system: {})", theme.name(), settings.dark_mode(), settings.system_scheme())?;
                writeln!(out, "background:           {}", theme.background)?;
                writeln!(out, "background secondary: {}", theme.background_secondary)?;
                writeln!(out, "text:                 {}", theme.text)?;
                writeln!(out, "text secondary:       {}", theme.text_secondary)?;
                writeln!(out, "border:               {}", theme.border)?;
                writeln!(out, "primary:              {}", theme.primary)?;
                writeln!(out, "error:                {}", theme.error)?;
            }
        }
    }
    Ok(())
}

fn run_favorites(
    cmd: FavoritesCommand,
    favorites: &FavoriteRegistry,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        FavoritesCommand::List { json } => {
            let list = favorites.list();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&list)?)?;
            } else if list.is_empty() {
                writeln!(out, "No favorites yet.")?;
            } else {
                for favorite in &list {
                    writeln!(out, "{:>8}  {}", favorite.id(), favorite.description())?;
                }
            }
        }
        FavoritesCommand::Add(args) => {
            let id = args.id;
            if favorites.add(args.into_item()) {
                writeln!(out, "Added {}", id)?;
            } else {
                writeln!(out, "Updated {}", id)?;
            }
        }
        FavoritesCommand::Remove { id } => match favorites.remove(id) {
            Some(_) => writeln!(out, "Removed {}", id)?,
            None => writeln!(out, "{} is not a favorite", id)?,
        },
        FavoritesCommand::Toggle(args) => {
            let id = args.id;
            if favorites.toggle(args.into_item()) {
                writeln!(out, "Added {}", id)?;
            } else {
                writeln!(out, "Removed {}", id)?;
            }
        }
        FavoritesCommand::Check { id } => {
            writeln!(out, "{}", favorites.is_favorite(id))?;
        }
    }
    Ok(())
}

fn run_settings(
    cmd: SettingsCommand,
    settings: &SettingsRegistry,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        SettingsCommand::Show { json } => {
            let snapshot = settings.snapshot();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
            } else {
                writeln!(out, "font family: {}", snapshot.font_family)?;
                writeln!(out, "font size:   {}", snapshot.font_size)?;
                writeln!(out, "dark mode:   {}", snapshot.dark_mode)?;
                writeln!(out, "theme:       {}", settings.theme().name())?;
            }
        }
        SettingsCommand::FontFamily { name } => {
            let family: FontFamily = name.parse()?;
            settings.set_font_family(family);
            writeln!(out, "Font family set to {}", family)?;
        }
        SettingsCommand::FontSize { points } => {
            settings.try_set_font_size(points)?;
            writeln!(out, "Font size set to {} (available: {:?})", points, FONT_SIZES)?;
        }
        SettingsCommand::ToggleDark => {
            let mode = settings.toggle_dark_mode();
            writeln!(out, "Dark mode: {} ({} theme)", mode, settings.theme().name())?;
        }
        SettingsCommand::FollowSystem => {
            let theme = settings.set_system_theme();
            writeln!(out, "Following system ({}): {} theme", settings.system_scheme(), theme.name())?;
        }
    }
    Ok(())
}
