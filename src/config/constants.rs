use crate::Tick;

// Time Constants
pub const HOURS_PER_YEAR: f64 = 8760.0;
pub const DEFAULT_TIME_STEP: Tick = 1;
pub const DEFAULT_TICKS: Tick = 10;

// Physical Constants
pub const GJ_PER_MWH: f64 = 3.6;

// Technology Defaults
pub const DEFAULT_TECHNOLOGY_LIFETIME: Tick = 40;

// CO2 Market
pub const CO2_SUBSTANCE_ID: &str = "CO2";
pub const DEFAULT_CO2_SEED_PRICE: f64 = 25.0; // €/tCO2, used when no CO2 substance exists

// Market Stability Reserve
pub const MSR_WITHDRAWAL_RATE: f64 = 0.12;
pub const MSR_LOOKBACK_TICKS: Tick = 2;

// Randomness
pub const DEFAULT_SEED: u64 = 20_240_601;
