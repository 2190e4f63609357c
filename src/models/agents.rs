use serde::{Deserialize, Serialize};

/// Owner of power plants. Bids every owned plant into its assigned markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyProducer {
    pub id: String,
    pub spot_market: Option<String>,
    pub capacity_market: Option<String>,
}

impl EnergyProducer {
    pub fn new(id: String) -> Self {
        Self {
            id,
            spot_market: None,
            capacity_market: None,
        }
    }
}

/// National government setting CO2 policy for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Government {
    pub id: String,
    pub zone: String,
    pub co2_cap_trend: Option<String>,
    pub co2_min_price_trend: Option<String>,
    pub co2_penalty: f64,
}

impl Government {
    pub fn new(id: String, zone: String) -> Self {
        Self {
            id,
            zone,
            co2_cap_trend: None,
            co2_min_price_trend: None,
            co2_penalty: 0.0,
        }
    }
}
