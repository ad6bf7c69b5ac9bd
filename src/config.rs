/// Sequencer configuration
use crate::clock::Resolution;
use crate::error::{Error, Result};
use crate::sequencer::grid::Palette;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ON_VELOCITY: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Clock resolution the sequencer starts with.
    pub resolution: Resolution,
    /// Velocity written when a step is toggled on.
    pub on_velocity: u8,
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            on_velocity: DEFAULT_ON_VELOCITY,
            palette: Palette::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=127).contains(&self.on_velocity) {
            return Err(Error::Config(format!(
                "on_velocity must be in 1..=127, got {}",
                self.on_velocity
            )));
        }
        Ok(())
    }
}
