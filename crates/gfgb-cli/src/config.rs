use log::warn;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bootrom_path: Option<PathBuf>,
    /// Instruction budget for `gfgb run`.
    pub max_steps: u64,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootrom_path: None,
            max_steps: DEFAULT_MAX_STEPS,
            log_level: "warn".to_string(),
        }
    }
}

const APP_DIR: &str = "gfgb";
const CONFIG_FILE: &str = "config.toml";

/// `gfgb/config.toml` under the platform config directory, or in the
/// working directory when none is known.
pub fn default_config_path() -> PathBuf {
    config_path_from(|name| std::env::var_os(name))
}

fn config_path_from(var: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    // empty variables count as unset
    let dir = |name: &str| var(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    let base = if cfg!(target_os = "windows") {
        dir("APPDATA")
    } else {
        None
    };
    base.or_else(|| dir("XDG_CONFIG_HOME"))
        .or_else(|| dir("HOME").map(|home| home.join(".config")))
        .map_or_else(
            || PathBuf::from(CONFIG_FILE),
            |base| base.join(APP_DIR).join(CONFIG_FILE),
        )
}

/// Read `path`, falling back to defaults when it is missing or malformed.
///
/// Runs before the logger is configured, so parse failures are also echoed
/// to stderr.
pub fn load_from_file(path: &Path) -> Config {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return Config::default(),
    };

    match toml::from_str::<Config>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to parse config {}: {e}; using defaults", path.display());
            warn!("Failed to parse config {}: {e}; using defaults", path.display());
            Config::default()
        }
    }
}
