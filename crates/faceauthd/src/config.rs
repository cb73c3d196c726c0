use anyhow::{bail, Context, Result};
use faceauth_core::{StoreBackend, DEFAULT_THRESHOLD};
use serde::Deserialize;
use std::path::PathBuf;

/// Which D-Bus bus the daemon claims its name on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    Session,
    System,
}

impl std::str::FromStr for BusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "system" => Ok(Self::System),
            other => Err(format!("unknown bus '{other}' (expected session or system)")),
        }
    }
}

/// Daemon configuration: defaults, then an optional TOML file, then
/// `FACEAUTH_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Persistence backend for the enrolled identity.
    pub store_backend: StoreBackend,
    /// File backing the store.
    pub store_path: PathBuf,
    /// Euclidean distance below which a login matches.
    pub match_threshold: f64,
    /// Bus to serve on.
    pub bus: BusKind,
}

/// Shape of the optional TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    store_backend: Option<StoreBackend>,
    store_path: Option<PathBuf>,
    match_threshold: Option<f64>,
    bus: Option<BusKind>,
}

impl Config {
    /// Load configuration from `$FACEAUTH_CONFIG` (if set) and the process
    /// environment.
    pub fn load() -> Result<Self> {
        let file = match std::env::var_os("FACEAUTH_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                Some(text)
            }
            None => None,
        };
        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build a config from optional TOML text and an environment lookup.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file: FileConfig = match file {
            Some(text) => toml::from_str(text).context("parsing config file")?,
            None => FileConfig::default(),
        };

        let store_backend = env_parse(&env, "FACEAUTH_STORE_BACKEND")
            .or(file.store_backend)
            .unwrap_or_default();

        let store_path = env("FACEAUTH_STORE_PATH")
            .map(PathBuf::from)
            .or(file.store_path)
            .unwrap_or_else(|| default_data_dir(&env).join(store_backend.default_file_name()));

        let match_threshold = env_parse(&env, "FACEAUTH_MATCH_THRESHOLD")
            .or(file.match_threshold)
            .unwrap_or(DEFAULT_THRESHOLD);
        if !match_threshold.is_finite() || match_threshold <= 0.0 {
            bail!("match_threshold must be a positive number, got {match_threshold}");
        }

        let bus = env_parse(&env, "FACEAUTH_BUS")
            .or(file.bus)
            .unwrap_or_default();

        Ok(Self {
            store_backend,
            store_path,
            match_threshold,
            bus,
        })
    }
}

/// `$XDG_DATA_HOME/faceauth`, falling back to `$HOME/.local/share/faceauth`.
fn default_data_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("faceauth")
}

/// Parse an env var, ignoring (with a warning) values that do not parse.
fn env_parse<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
