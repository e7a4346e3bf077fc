//! Optional `kipart.toml` holding default symbol options.
//!
//! ```toml
//! [defaults]
//! sort = "num"
//! side = "left"
//! type = "input"
//! bundle = true
//! ```
//!
//! Command-line flags win over the file, the file wins over built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use kipart_symbol::{PinStyle, PinType, Side, SortBy, SymbolOptions};

pub const CONFIG_FILE: &str = "kipart.toml";

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
}

/// Values are kept as text so the file accepts the same aliases as the
/// command line (`pwr`, `inv`, `l`, ...).
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub sort: Option<String>,
    pub reverse: Option<bool>,
    pub side: Option<String>,
    #[serde(rename = "type")]
    pub pin_type: Option<String>,
    pub style: Option<String>,
    pub push: Option<f64>,
    pub bundle: Option<bool>,
    pub scrunch: Option<bool>,
    pub ccw: Option<bool>,
    pub alt_delimiter: Option<String>,
}

impl Config {
    /// Load `path` if given, otherwise `kipart.toml` in the current directory
    /// when there is one.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let local = PathBuf::from(CONFIG_FILE);
                if local.is_file() {
                    Self::load(&local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

impl Defaults {
    /// Overwrite the fields of `options` this file sets.
    pub fn apply(&self, options: &mut SymbolOptions) -> Result<()> {
        if let Some(sort) = &self.sort {
            options.sort_by = sort.parse::<SortBy>().context("Invalid `sort` in config")?;
        }
        if let Some(side) = &self.side {
            options.defaults.side = side.parse::<Side>().context("Invalid `side` in config")?;
        }
        if let Some(pin_type) = &self.pin_type {
            options.defaults.pin_type =
                pin_type.parse::<PinType>().context("Invalid `type` in config")?;
        }
        if let Some(style) = &self.style {
            options.defaults.style = style.parse::<PinStyle>().context("Invalid `style` in config")?;
        }
        if let Some(push) = self.push {
            options.push = push;
        }
        if let Some(reverse) = self.reverse {
            options.reverse = reverse;
        }
        if let Some(bundle) = self.bundle {
            options.bundle = bundle;
        }
        if let Some(scrunch) = self.scrunch {
            options.scrunch = scrunch;
        }
        if let Some(ccw) = self.ccw {
            options.ccw = ccw;
        }
        if let Some(delimiter) = &self.alt_delimiter {
            options.alt_delimiter = Some(delimiter.clone());
        }
        Ok(())
    }
}
