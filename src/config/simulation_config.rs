use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::constants::*;
use crate::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub time_step: Tick,               // CO2 market lookback in ticks
    pub ticks: Tick,                   // Ticks to run from the loaded tick
    pub hours_per_year: f64,
    pub msr_withdrawal_rate: f64,      // Share of circulation moved into the reserve
    pub co2_seed_price: f64,
    pub seed: u64,                     // Seed for triangular trends
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            ticks: DEFAULT_TICKS,
            hours_per_year: HOURS_PER_YEAR,
            msr_withdrawal_rate: MSR_WITHDRAWAL_RATE,
            co2_seed_price: DEFAULT_CO2_SEED_PRICE,
            seed: DEFAULT_SEED,
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config; fields left out keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}
