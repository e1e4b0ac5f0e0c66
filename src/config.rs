use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable holding explicit archive roots (platform path list).
pub const ENV_ROOTS: &str = "CHAT_LIBRARY_PATH";
/// Environment variable overriding the server port.
pub const ENV_PORT: &str = "PORT";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Explicit roots. When non-empty, discovery is skipped.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    /// Home directory used to derive discovery locations.
    #[serde(default)]
    pub home: Option<PathBuf>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_chat_extension")]
    pub chat_extension: String,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            home: None,
            max_depth: default_max_depth(),
            chat_extension: default_chat_extension(),
            image_extensions: default_image_extensions(),
        }
    }
}

fn default_max_depth() -> usize {
    16
}
fn default_chat_extension() -> String {
    "jsonl".to_string()
}
fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "webp", "gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:7860".to_string()
}

impl ArchiveConfig {
    /// Home directory for discovery: the configured one, else the user's.
    pub fn home_dir(&self) -> PathBuf {
        self.home
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/data/data/com.termux/files/home"))
    }

    /// Chat extension without a leading dot.
    pub fn chat_ext(&self) -> &str {
        self.chat_extension.trim_start_matches('.')
    }
}

/// Loads configuration from `path`, then applies environment overrides.
///
/// A missing file means defaults. A file that exists but fails to parse is
/// an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        Config::default()
    };

    apply_overrides(
        &mut config,
        std::env::var_os(ENV_ROOTS).as_deref(),
        std::env::var(ENV_PORT).ok().as_deref(),
    )?;
    validate(&config)?;
    Ok(config)
}

/// Applies the root-list and port overrides.
pub fn apply_overrides(
    config: &mut Config,
    roots: Option<&std::ffi::OsStr>,
    port: Option<&str>,
) -> Result<()> {
    if let Some(raw) = roots {
        let roots: Vec<PathBuf> = std::env::split_paths(raw)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if !roots.is_empty() {
            config.archive.roots = roots;
        }
    }

    if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
        let port: u16 = port
            .parse()
            .with_context(|| format!("{} must be a port number, got '{}'", ENV_PORT, port))?;
        let mut addr = parse_bind(&config.server.bind)?;
        addr.set_port(port);
        config.server.bind = addr.to_string();
    }

    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.archive.max_depth == 0 {
        anyhow::bail!("archive.max_depth must be > 0");
    }
    if config.archive.chat_ext().is_empty() {
        anyhow::bail!("archive.chat_extension must not be empty");
    }
    if config.archive.image_extensions.is_empty() {
        anyhow::bail!("archive.image_extensions must not be empty");
    }
    parse_bind(&config.server.bind)?;
    Ok(())
}

fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .with_context(|| format!("server.bind is not a socket address: '{}'", bind))
}
