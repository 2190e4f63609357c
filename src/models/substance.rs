use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    pub id: String,
    pub co2_density: f64,    // tCO2 per tonne of fuel
    pub energy_density: f64, // GJ per tonne
    pub quality: f64,        // Scenario data only
    pub price_trend: Option<String>, // €/tonne
}

impl Substance {
    pub fn new(id: String) -> Self {
        Self {
            id,
            co2_density: 0.0,
            energy_density: 0.0,
            quality: 1.0,
            price_trend: None,
        }
    }
}

/// Share of a technology's input energy supplied by one substance. Shares of
/// one technology conventionally sum to 1, which is not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstanceInFuelMix {
    pub technology: String,
    pub substance: String,
    pub share: f64,
}
