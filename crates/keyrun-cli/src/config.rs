use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use keyrun_workflow::Discovery;
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".keyrun.yml";
/// TOML alternative, used only when no YAML config exists.
pub const CONFIG_FILE_TOML: &str = ".keyrun.toml";

/// Per-directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Environment variable -> key name; resolved and exported to the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Key name holding the secret that protects `.enc` files.
    #[serde(default)]
    pub key: Option<String>,
    /// Protect exactly these files instead of every `*.enc` in the directory.
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

impl Config {
    pub fn discovery(&self) -> Discovery {
        match &self.files {
            Some(files) => Discovery::Declared(files.clone()),
            None => Discovery::Scan,
        }
    }

    /// The master key name; commands that touch files cannot run without it.
    pub fn require_key(&self) -> Result<&str> {
        self.key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| eyre!("no `key` configured; set it in {CONFIG_FILE}"))
    }
}

/// Load the config for `dir`, or from `explicit` when given. A missing file is an error.
pub fn load(dir: &Path, explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_path(dir),
    };
    load_from_path(&path)
}

/// `.keyrun.yml`, falling back to `.keyrun.toml` when only that exists.
pub fn default_path(dir: &Path) -> PathBuf {
    let yaml = dir.join(CONFIG_FILE);
    let toml_path = dir.join(CONFIG_FILE_TOML);
    if !yaml.exists() && toml_path.exists() {
        return toml_path;
    }
    yaml
}

/// Parse a config file; the format follows the extension (YAML unless `.toml`).
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }

    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let cfg: Config = if is_toml {
        toml::from_str(&contents)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))?
    } else {
        serde_yaml::from_str(&contents)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))?
    };
    Ok(cfg)
}
