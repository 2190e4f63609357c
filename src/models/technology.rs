use serde::{Deserialize, Serialize};

use crate::config::constants::DEFAULT_TECHNOLOGY_LIFETIME;
use crate::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerGeneratingTechnology {
    pub id: String,
    pub capacity: f64,                  // MW per unit
    pub intermittent: bool,             // No fuel cost or emissions
    pub peak_availability: f64,         // Share of capacity available at peak
    pub base_availability: f64,         // Scenario data only
    pub permit_time: Tick,
    pub lead_time: Tick,
    pub lifetime: Tick,
    pub co2_capture_efficiency: f64,    // 0.0 - 1.0
    pub fixed_om_cost_trend: Option<String>, // €/MW/yr
    pub investment_cost_trend: Option<String>, // €/MW, scenario data only
}

impl PowerGeneratingTechnology {
    pub fn new(id: String, capacity: f64) -> Self {
        Self {
            id,
            capacity,
            intermittent: false,
            peak_availability: 1.0,
            base_availability: 1.0,
            permit_time: 0,
            lead_time: 0,
            lifetime: DEFAULT_TECHNOLOGY_LIFETIME,
            co2_capture_efficiency: 0.0,
            fixed_om_cost_trend: None,
            investment_cost_trend: None,
        }
    }

    /// Ticks between construction start and the first operational tick.
    pub fn online_delay(&self) -> Tick {
        self.permit_time + self.lead_time
    }
}
