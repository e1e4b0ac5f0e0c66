//! # Chat Library CLI (`chatlib`)
//!
//! ## Usage
//!
//! ```bash
//! chatlib --config ./chatlib.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chatlib roots` | Print the resolved archive roots |
//! | `chatlib scan` | Summarize characters, chats and images |
//! | `chatlib chat <character> <file>` | Print a sanitized transcript |
//! | `chatlib images` | List gallery images |
//! | `chatlib serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Browse explicit roots without a config file
//! CHAT_LIBRARY_PATH=/sdcard/ST-backup:/mnt/old chatlib scan
//!
//! # Read one chat as JSON
//! chatlib chat "Caius Reed" "2024-05-01@12h00m.jsonl" --json
//!
//! # Serve on another port
//! PORT=8080 chatlib serve
//! ```

use chat_library::{commands, config, library::Library, logging, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chat Library CLI: browse archived role-play chat backups.
#[derive(Parser)]
#[command(
    name = "chatlib",
    about = "Browse archived role-play chat backups",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./chatlib.toml`. A missing file means built-in defaults.
    #[arg(long, global = true, default_value = "./chatlib.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved archive roots, highest priority first.
    Roots,

    /// Summarize the catalog.
    Scan {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print one transcript with sanitized message bodies.
    Chat {
        /// Exact character folder name.
        character: String,

        /// Chat file name, including its extension.
        file: String,

        #[arg(long)]
        json: bool,
    },

    /// List gallery images.
    Images {
        /// Case-insensitive substring of the image's folder or file name.
        #[arg(long)]
        character: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;
    let library = Library::from_config(&cfg.archive);

    match cli.command {
        Commands::Roots => commands::run_roots(&library)?,
        Commands::Scan { json } => commands::run_scan(&library, json)?,
        Commands::Chat {
            character,
            file,
            json,
        } => commands::run_chat(&library, &character, &file, json)?,
        Commands::Images { character, json } => {
            commands::run_images(&library, character.as_deref(), json)?
        }
        Commands::Serve => server::run_server(&cfg, library).await?,
    }

    Ok(())
}
