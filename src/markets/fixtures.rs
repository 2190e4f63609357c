//! Small hand-built markets shared by the clearing tests.

use crate::core::repository::Repository;
use crate::models::agents::{EnergyProducer, Government};
use crate::models::market::{CapacityMarketParameters, Co2MarketParameters, Market, MarketKind, Zone};
use crate::models::power_plant::PowerPlant;
use crate::models::substance::{Substance, SubstanceInFuelMix};
use crate::models::technology::PowerGeneratingTechnology;
use crate::models::trend::Trend;

pub const ZONE: &str = "nl";
pub const SPOT: &str = "spot_nl";
pub const CAPACITY: &str = "capacity_nl";
pub const CO2: &str = "co2_nl";
pub const PRODUCER: &str = "utility";

/// One zone with a flat load of `peak` MW, a spot market and one producer.
pub fn zone_with_spot_market(peak: f64) -> Repository {
    let mut repo = Repository::new();
    let mut zone = Zone::new(ZONE.to_string());
    zone.load_duration_curve = vec![peak * 0.6, peak, peak * 0.8];
    repo.add_zone(zone);
    repo.add_market(Market::new(SPOT.to_string(), ZONE.to_string(), MarketKind::ElectricitySpot));
    let mut producer = EnergyProducer::new(PRODUCER.to_string());
    producer.spot_market = Some(SPOT.to_string());
    repo.add_producer(producer);
    repo
}

pub fn add_capacity_market(repo: &mut Repository, parameters: CapacityMarketParameters) {
    repo.add_market(Market::new(
        CAPACITY.to_string(),
        ZONE.to_string(),
        MarketKind::Capacity(parameters),
    ));
}

pub fn add_co2_market(repo: &mut Repository, parameters: Co2MarketParameters) {
    repo.add_market(Market::new(CO2.to_string(), ZONE.to_string(), MarketKind::Co2(parameters)));
}

pub fn add_government(repo: &mut Repository, cap: f64, min_price: f64, penalty: f64) {
    repo.add_trend("co2_cap", Trend::constant(cap));
    repo.add_trend("co2_min_price", Trend::constant(min_price));
    let mut government = Government::new("government".to_string(), ZONE.to_string());
    government.co2_cap_trend = Some("co2_cap".to_string());
    government.co2_min_price_trend = Some("co2_min_price".to_string());
    government.co2_penalty = penalty;
    repo.add_government(government);
}

/// Adds a plant burning its own fuel so that its marginal cost equals
/// `marginal_cost` €/MWh and it emits `intensity` tCO2/MWh.
pub fn add_plant(repo: &mut Repository, id: &str, capacity: f64, marginal_cost: f64, intensity: f64) {
    let technology = format!("tech_{}", id);
    let fuel = format!("fuel_{}", id);
    let price_trend = format!("price_{}", id);

    repo.add_technology(PowerGeneratingTechnology::new(technology.clone(), capacity));
    repo.add_trend(price_trend.clone(), Trend::constant(marginal_cost));
    let mut substance = Substance::new(fuel.clone());
    // One tonne per MWh at unit efficiency
    substance.energy_density = 3.6;
    substance.co2_density = intensity;
    substance.price_trend = Some(price_trend);
    repo.add_substance(substance);
    repo.add_fuel_mix(SubstanceInFuelMix {
        technology: technology.clone(),
        substance: fuel,
        share: 1.0,
    });
    repo.add_power_plant(PowerPlant::new(
        id.to_string(),
        technology,
        ZONE.to_string(),
        PRODUCER.to_string(),
    ));
}
