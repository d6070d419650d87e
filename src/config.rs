use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::Locale;
use crate::highlight::DEFAULT_MARKER;

#[derive(Parser, Debug)]
#[command(name = "psychepedia")]
#[command(about = "Read Psychepedia articles and manage your highlights", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print an article with its highlights applied
    Show {
        locale: Locale,
        slug: String,
        #[arg(long)]
        html: bool,
    },
    /// Highlight a fragment of an article
    Highlight {
        locale: Locale,
        slug: String,
        fragment: String,
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// List the highlights stored for an article
    List { locale: Locale, slug: String },
    /// Remove one highlight by id
    Remove {
        locale: Locale,
        slug: String,
        id: String,
    },
    /// Remove every highlight of an article
    Clear { locale: Locale, slug: String },
    /// Show or change highlight mode
    Mode { action: Option<ModeAction> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeAction {
    On,
    Off,
    Toggle,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".psychepedia")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default)]
    data_dir: Option<String>,
    #[serde(default)]
    content_dir: Option<String>,
    #[serde(default = "default_locale")]
    pub default_locale: Locale,
}

fn default_locale() -> Locale {
    Locale::En
}

impl Default for App {
    fn default() -> Self {
        Self {
            data_dir: None,
            content_dir: None,
            default_locale: default_locale(),
        }
    }
}

impl App {
    /// Directory holding the key-value store. Empty values fall back to
    /// `~/.psychepedia/store`.
    pub fn get_data_dir(&self) -> PathBuf {
        match self.data_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_config_dir().join("store"),
        }
    }

    pub fn get_content_dir(&self) -> Option<&Path> {
        self.content_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(Path::new)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Highlight {
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_tag")]
    pub default_tag: String,
    #[serde(default = "default_enabled")]
    pub enabled_by_default: bool,
    #[serde(default)]
    pub persist_mode: bool,
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

fn default_tag() -> String {
    "yellow".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Default for Highlight {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            default_tag: default_tag(),
            enabled_by_default: default_enabled(),
            persist_mode: false,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub highlight: Highlight,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Like [`Config::new`], but a missing file yields the defaults. Used for
    /// the implicit `~/.psychepedia/config.yaml`.
    pub fn new_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = ?path, "no config file, using defaults");
            return Ok(Config::default());
        }
        let path = path
            .to_str()
            .with_context(|| format!("config path {:?} is not valid UTF-8", path))?;
        Config::new(path)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str =
            fs::read_to_string(path).with_context(|| format!("failed to read config {}", path))?;
        Config::from_yaml(&yaml_str)
    }

    /// Expands `${VAR}` and `${VAR:-fallback}`. Unset variables without a
    /// fallback expand to nothing.
    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let placeholder = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .context("failed to build env placeholder pattern")?;

        let expanded = placeholder.replace_all(yaml_str, |caps: &Captures| {
            let name = &caps[1];
            match (env::var(name), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(fallback)) => fallback.as_str().to_string(),
                (Err(_), None) => {
                    tracing::warn!(var = name, "environment variable not set");
                    String::new()
                }
            }
        });
        Ok(expanded.into_owned())
    }
}
