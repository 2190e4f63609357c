use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::substance::Substance;
use super::technology::PowerGeneratingTechnology;
use crate::config::constants::GJ_PER_MWH;
use crate::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerPlant {
    pub id: String,
    pub technology: String,
    pub zone: String,
    pub owner: String,
    pub capacity: Option<f64>, // Falls back to the technology capacity
    pub efficiency: f64,
    pub construction_start_tick: Tick,
    pub dismantle_tick: Option<Tick>,
    pub banked_allowances: BTreeMap<Tick, f64>,
}

impl PowerPlant {
    pub fn new(id: String, technology: String, zone: String, owner: String) -> Self {
        Self {
            id,
            technology,
            zone,
            owner,
            capacity: None,
            efficiency: 1.0,
            construction_start_tick: 0,
            dismantle_tick: None,
            banked_allowances: BTreeMap::new(),
        }
    }

    pub fn nominal_capacity(&self, technology: &PowerGeneratingTechnology) -> f64 {
        self.capacity.unwrap_or(technology.capacity)
    }

    pub fn is_operational(&self, technology: &PowerGeneratingTechnology, tick: Tick) -> bool {
        let first_tick = self.construction_start_tick + technology.online_delay();
        let end_of_life = first_tick + technology.lifetime;
        if tick < first_tick || tick >= end_of_life {
            return false;
        }
        self.dismantle_tick.map_or(true, |dismantled| tick < dismantled)
    }

    /// Tonnes of `substance` burnt per MWh of electricity when it supplies
    /// `share` of the input energy.
    pub fn fuel_use_per_mwh(&self, substance: &Substance, share: f64) -> f64 {
        if self.efficiency <= 0.0 || substance.energy_density <= 0.0 {
            return 0.0;
        }
        share * GJ_PER_MWH / (self.efficiency * substance.energy_density)
    }

    /// tCO2 released per MWh from one substance of the fuel mix, net of capture.
    pub fn emission_intensity_of(
        &self,
        technology: &PowerGeneratingTechnology,
        substance: &Substance,
        share: f64,
    ) -> f64 {
        self.fuel_use_per_mwh(substance, share)
            * substance.co2_density
            * (1.0 - technology.co2_capture_efficiency)
    }

    /// Snapshot of banked allowances at exactly `tick`.
    pub fn banked_allowances_at(&self, tick: Tick) -> Option<f64> {
        self.banked_allowances.get(&tick).copied()
    }

    /// Most recent snapshot strictly before `tick`.
    pub fn latest_banked_before(&self, tick: Tick) -> Option<(Tick, f64)> {
        self.banked_allowances
            .range(..tick)
            .next_back()
            .map(|(t, amount)| (*t, *amount))
    }
}
