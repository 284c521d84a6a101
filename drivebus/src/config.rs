//! Configuration for the bus layer.
//!
//! A small TOML-backed config that applications hand to
//! [`BusRegistry::from_config`](crate::BusRegistry::from_config). Every
//! field has a default, so an empty file (or no file at all) yields a
//! working registry.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::driver::DEFAULT_BAUD_RATE;
use crate::error::{Error, Result};
use crate::registry::DEFAULT_MAX_BUSES;

/// Bus layer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// Device name opened by default (e.g. `/dev/ttyUSB0`, `10.0.0.5:4001`)
    pub device: Option<String>,

    /// Baud rate applied to opens
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Registry slot count
    #[serde(default = "default_max_buses")]
    pub max_buses: usize,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_max_buses() -> usize {
    DEFAULT_MAX_BUSES
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: DEFAULT_BAUD_RATE,
            max_buses: DEFAULT_MAX_BUSES,
        }
    }
}

impl BusConfig {
    /// Load configuration from a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }
}
