use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityMarketParameters {
    pub installed_reserve_margin: f64,
    pub lower_margin: f64,
    pub upper_margin: f64,
    pub price_cap: f64, // €/MW
}

impl Default for CapacityMarketParameters {
    fn default() -> Self {
        Self {
            installed_reserve_margin: 0.0,
            lower_margin: 0.0,
            upper_margin: 0.0,
            price_cap: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2MarketParameters {
    pub export_trend: Option<String>, // tCO2 leaving the zone per tick
    pub hedging_share: f64,           // Share of exports already hedged
}

impl Default for Co2MarketParameters {
    fn default() -> Self {
        Self {
            export_trend: None,
            hedging_share: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketKind {
    ElectricitySpot,
    Capacity(CapacityMarketParameters),
    Co2(Co2MarketParameters),
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketKind::ElectricitySpot => write!(f, "ElectricitySpotMarket"),
            MarketKind::Capacity(_) => write!(f, "CapacityMarket"),
            MarketKind::Co2(_) => write!(f, "CO2Market"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub zone: String,
    pub reference_price: f64, // Scenario data only
    pub kind: MarketKind,
}

impl Market {
    pub fn new(id: String, zone: String, kind: MarketKind) -> Self {
        Self {
            id,
            zone,
            reference_price: 0.0,
            kind,
        }
    }

    pub fn is_spot(&self) -> bool {
        matches!(self.kind, MarketKind::ElectricitySpot)
    }

    pub fn capacity_parameters(&self) -> Option<&CapacityMarketParameters> {
        match &self.kind {
            MarketKind::Capacity(parameters) => Some(parameters),
            _ => None,
        }
    }

    pub fn co2_parameters(&self) -> Option<&Co2MarketParameters> {
        match &self.kind {
            MarketKind::Co2(parameters) => Some(parameters),
            _ => None,
        }
    }
}

/// A bidding zone and its demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub load_duration_curve: Vec<f64>, // Hourly load in MW
    pub demand_growth_trend: Option<String>,
}

impl Zone {
    pub fn new(id: String) -> Self {
        Self {
            id,
            load_duration_curve: Vec::new(),
            demand_growth_trend: None,
        }
    }

    /// Highest hourly load of the curve before demand growth is applied.
    pub fn base_peak_load(&self) -> f64 {
        self.load_duration_curve
            .iter()
            .copied()
            .fold(0.0, f64::max)
    }
}
