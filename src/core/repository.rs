use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::error::{SimulationError, SimulationResult};
use crate::data::results::{BankedAllowanceRecord, ReserveStockRecord, TickResults};
use crate::models::agents::{EnergyProducer, Government};
use crate::models::dispatch::{BidStatus, MarketClearingPoint, PowerPlantDispatchPlan};
use crate::models::market::{Market, MarketKind, Zone};
use crate::models::power_plant::PowerPlant;
use crate::models::stability_reserve::MarketStabilityReserve;
use crate::models::substance::{Substance, SubstanceInFuelMix};
use crate::models::technology::PowerGeneratingTechnology;
use crate::models::trend::Trend;
use crate::Tick;

/// Operating figures of one plant for one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantFinancials {
    pub generation: f64,    // MWh
    pub revenue: f64,
    pub variable_cost: f64,
    pub fixed_cost: f64,
    pub emissions: f64,     // tCO2
}

impl PlantFinancials {
    /// Spot revenue minus fuel cost; fixed costs are sunk for dispatch decisions.
    pub fn operating_profit(&self) -> f64 {
        self.revenue - self.variable_cost
    }
}

/// In-memory model of one simulation run.
///
/// Holds every entity plus the dispatch plans and clearing points produced by
/// the market modules. Nothing is discarded between ticks, so earlier results
/// stay queryable. Lookups that miss log a warning and fall back to a neutral
/// value, since scenario data is routinely incomplete for some zones.
#[derive(Debug, Default)]
pub struct Repository {
    trends: BTreeMap<String, Trend>,
    technologies: BTreeMap<String, PowerGeneratingTechnology>,
    substances: BTreeMap<String, Substance>,
    fuel_mixes: BTreeMap<String, Vec<SubstanceInFuelMix>>,
    zones: BTreeMap<String, Zone>,
    markets: BTreeMap<String, Market>,
    producers: BTreeMap<String, EnergyProducer>,
    power_plants: BTreeMap<String, PowerPlant>,
    governments: BTreeMap<String, Government>,
    stability_reserves: BTreeMap<String, MarketStabilityReserve>,
    dispatch_plans: Vec<PowerPlantDispatchPlan>,
    dispatch_index: HashMap<(String, String, Tick), usize>,
    clearing_points: BTreeMap<(String, Tick), MarketClearingPoint>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- entity registration -------------------------------------------

    pub fn add_trend(&mut self, id: impl Into<String>, trend: Trend) {
        self.trends.insert(id.into(), trend);
    }

    pub fn add_technology(&mut self, technology: PowerGeneratingTechnology) {
        self.technologies.insert(technology.id.clone(), technology);
    }

    pub fn add_substance(&mut self, substance: Substance) {
        self.substances.insert(substance.id.clone(), substance);
    }

    pub fn add_fuel_mix(&mut self, entry: SubstanceInFuelMix) {
        let mix = self.fuel_mixes.entry(entry.technology.clone()).or_default();
        match mix.iter_mut().find(|existing| existing.substance == entry.substance) {
            Some(existing) => existing.share = entry.share,
            None => mix.push(entry),
        }
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.insert(zone.id.clone(), zone);
    }

    pub fn add_market(&mut self, market: Market) {
        self.markets.insert(market.id.clone(), market);
    }

    pub fn add_producer(&mut self, producer: EnergyProducer) {
        self.producers.insert(producer.id.clone(), producer);
    }

    /// Also the entry point for investment events injected between ticks.
    pub fn add_power_plant(&mut self, plant: PowerPlant) {
        self.power_plants.insert(plant.id.clone(), plant);
    }

    pub fn add_government(&mut self, government: Government) {
        self.governments.insert(government.id.clone(), government);
    }

    pub fn add_stability_reserve(&mut self, reserve: MarketStabilityReserve) {
        self.stability_reserves.insert(reserve.id.clone(), reserve);
    }

    /// Decommission event: the plant stops being operational from `tick` on.
    pub fn dismantle_power_plant(&mut self, plant_id: &str, tick: Tick) -> bool {
        match self.power_plants.get_mut(plant_id) {
            Some(plant) => {
                plant.dismantle_tick = Some(tick);
                true
            }
            None => {
                warn!(plant = plant_id, "Cannot dismantle unknown power plant");
                false
            }
        }
    }

    // ---- entity lookup -------------------------------------------------

    pub fn trend(&self, id: &str) -> Option<&Trend> {
        self.trends.get(id)
    }

    pub fn technology(&self, id: &str) -> Option<&PowerGeneratingTechnology> {
        self.technologies.get(id)
    }

    pub fn substance(&self, id: &str) -> Option<&Substance> {
        self.substances.get(id)
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub fn market(&self, id: &str) -> Option<&Market> {
        self.markets.get(id)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn producer(&self, id: &str) -> Option<&EnergyProducer> {
        self.producers.get(id)
    }

    pub fn producers(&self) -> impl Iterator<Item = &EnergyProducer> {
        self.producers.values()
    }

    pub fn power_plant(&self, id: &str) -> Option<&PowerPlant> {
        self.power_plants.get(id)
    }

    pub fn power_plants(&self) -> impl Iterator<Item = &PowerPlant> {
        self.power_plants.values()
    }

    pub fn governments(&self) -> impl Iterator<Item = &Government> {
        self.governments.values()
    }

    pub fn stability_reserves(&self) -> impl Iterator<Item = &MarketStabilityReserve> {
        self.stability_reserves.values()
    }

    pub fn stability_reserve_mut(&mut self, id: &str) -> Option<&mut MarketStabilityReserve> {
        self.stability_reserves.get_mut(id)
    }

    pub fn government_for_zone(&self, zone: &str) -> Option<&Government> {
        let government = self.governments.values().find(|g| g.zone == zone);
        if government.is_none() {
            warn!(zone, "No national government found for zone");
        }
        government
    }

    pub fn stability_reserve_for_zone(&self, zone: &str) -> Option<&MarketStabilityReserve> {
        self.stability_reserves.values().find(|msr| msr.zone == zone)
    }

    pub fn power_plants_by_owner(&self, owner: &str) -> Vec<&PowerPlant> {
        self.power_plants
            .values()
            .filter(|plant| plant.owner == owner)
            .collect()
    }

    pub fn operational_power_plants_in_zone(&self, zone: &str, tick: Tick) -> Vec<&PowerPlant> {
        self.power_plants
            .values()
            .filter(|plant| plant.zone == zone && self.is_operational(plant, tick))
            .collect()
    }

    pub fn is_operational(&self, plant: &PowerPlant, tick: Tick) -> bool {
        match self.technologies.get(&plant.technology) {
            Some(technology) => plant.is_operational(technology, tick),
            None => {
                warn!(plant = %plant.id, technology = %plant.technology, "Technology not found");
                false
            }
        }
    }

    /// Fuel mix of the plant's technology; empty when the technology has none.
    pub fn substances_in_fuel_mix(&self, plant: &PowerPlant) -> &[SubstanceInFuelMix] {
        match self.fuel_mixes.get(&plant.technology) {
            Some(mix) => mix.as_slice(),
            None => {
                debug!(plant = %plant.id, technology = %plant.technology, "No fuel mix for technology");
                &[]
            }
        }
    }

    /// Market of `kind` serving `zone`; the first by id when several exist.
    pub fn market_in_zone(&self, zone: &str, kind: fn(&MarketKind) -> bool) -> Option<&Market> {
        self.markets
            .values()
            .find(|market| market.zone == zone && kind(&market.kind))
    }

    pub fn spot_market_for(&self, producer: &EnergyProducer, plant: &PowerPlant) -> Option<&Market> {
        let assigned = producer.spot_market.as_deref().and_then(|id| self.markets.get(id));
        let market = assigned.or_else(|| {
            self.market_in_zone(&plant.zone, |kind| matches!(kind, MarketKind::ElectricitySpot))
        });
        if market.is_none() {
            warn!(producer = %producer.id, plant = %plant.id, "No electricity spot market found");
        }
        market
    }

    pub fn capacity_market_for(&self, producer: &EnergyProducer, plant: &PowerPlant) -> Option<&Market> {
        let assigned = producer.capacity_market.as_deref().and_then(|id| self.markets.get(id));
        assigned.or_else(|| {
            self.market_in_zone(&plant.zone, |kind| matches!(kind, MarketKind::Capacity(_)))
        })
    }

    // ---- trends and derived plant values ---------------------------------

    /// Unknown trends are a data gap and resolve to 0; a trend that cannot
    /// produce the requested index is a sequencing bug and aborts the tick.
    pub fn trend_value(&self, id: &str, tick: Tick) -> SimulationResult<f64> {
        match self.trends.get(id) {
            Some(trend) => trend.value(tick).ok_or_else(|| SimulationError::TrendSequence {
                trend: id.to_string(),
                tick,
            }),
            None => {
                warn!(trend = id, "Trend not found, using 0");
                Ok(0.0)
            }
        }
    }

    pub fn optional_trend_value(&self, id: Option<&str>, tick: Tick, default: f64) -> SimulationResult<f64> {
        match id {
            Some(id) => self.trend_value(id, tick),
            None => Ok(default),
        }
    }

    pub fn nominal_capacity(&self, plant: &PowerPlant) -> f64 {
        match self.technologies.get(&plant.technology) {
            Some(technology) => plant.nominal_capacity(technology),
            None => plant.capacity.unwrap_or(0.0),
        }
    }

    pub fn peak_availability(&self, plant: &PowerPlant) -> f64 {
        self.technologies
            .get(&plant.technology)
            .map_or(0.0, |technology| technology.peak_availability)
    }

    /// tCO2 per MWh of electricity, summed over the fuel mix. Intermittent
    /// technologies burn nothing.
    pub fn emission_intensity(&self, plant: &PowerPlant) -> f64 {
        let Some(technology) = self.technologies.get(&plant.technology) else {
            return 0.0;
        };
        if technology.intermittent {
            return 0.0;
        }
        self.substances_in_fuel_mix(plant)
            .iter()
            .filter_map(|entry| {
                self.substances
                    .get(&entry.substance)
                    .map(|substance| plant.emission_intensity_of(technology, substance, entry.share))
            })
            .sum()
    }

    /// Fuel cost per MWh of electricity at `tick`, CO2 excluded.
    pub fn marginal_cost_excluding_co2(&self, plant: &PowerPlant, tick: Tick) -> SimulationResult<f64> {
        if self
            .technologies
            .get(&plant.technology)
            .map_or(false, |technology| technology.intermittent)
        {
            return Ok(0.0);
        }
        let mut cost = 0.0;
        for entry in self.substances_in_fuel_mix(plant) {
            let Some(substance) = self.substances.get(&entry.substance) else {
                warn!(substance = %entry.substance, "Substance in fuel mix not found");
                continue;
            };
            let price = self.optional_trend_value(substance.price_trend.as_deref(), tick, 0.0)?;
            cost += plant.fuel_use_per_mwh(substance, entry.share) * price;
        }
        Ok(cost)
    }

    /// Fixed operation and maintenance cost of the whole plant for `tick`.
    pub fn fixed_operating_cost(&self, plant: &PowerPlant, tick: Tick) -> SimulationResult<f64> {
        let Some(technology) = self.technologies.get(&plant.technology) else {
            return Ok(0.0);
        };
        let per_mw = self.optional_trend_value(technology.fixed_om_cost_trend.as_deref(), tick, 0.0)?;
        Ok(per_mw * plant.nominal_capacity(technology))
    }

    /// Peak of the zone's load-duration curve scaled by its demand growth.
    pub fn peak_load(&self, zone_id: &str, tick: Tick) -> SimulationResult<f64> {
        let Some(zone) = self.zones.get(zone_id) else {
            warn!(zone = zone_id, "Zone not found, peak load is 0");
            return Ok(0.0);
        };
        let growth = self.optional_trend_value(zone.demand_growth_trend.as_deref(), tick, 1.0)?;
        Ok(zone.base_peak_load() * growth)
    }

    // ---- dispatch plans -------------------------------------------------

    /// Upserts the plan for (plant, market, tick). A resubmission overwrites
    /// the bid and puts the plan back to `Awaiting` with nothing accepted.
    pub fn create_or_update_dispatch_plan(
        &mut self,
        plant: &str,
        bidder: &str,
        market: &str,
        amount: f64,
        price: f64,
        tick: Tick,
    ) -> &PowerPlantDispatchPlan {
        let key = (plant.to_string(), market.to_string(), tick);
        let index = match self.dispatch_index.get(&key) {
            Some(&index) => {
                let plan = &mut self.dispatch_plans[index];
                plan.bidder = bidder.to_string();
                plan.amount = amount;
                plan.price = price;
                plan.status = BidStatus::Awaiting;
                plan.accepted_amount = 0.0;
                plan.outcome_recorded = false;
                index
            }
            None => {
                self.dispatch_plans.push(PowerPlantDispatchPlan {
                    id: PowerPlantDispatchPlan::key_id(plant, market, tick),
                    plant: plant.to_string(),
                    bidder: bidder.to_string(),
                    market: market.to_string(),
                    tick,
                    amount,
                    price,
                    status: BidStatus::Awaiting,
                    accepted_amount: 0.0,
                    outcome_recorded: false,
                });
                let index = self.dispatch_plans.len() - 1;
                self.dispatch_index.insert(key, index);
                index
            }
        };
        &self.dispatch_plans[index]
    }

    /// Records the clearing outcome of a plan. The accepted amount is clamped
    /// to the bid and a failed plan never keeps any volume.
    pub fn set_dispatch_plan_outcome(
        &mut self,
        plant: &str,
        market: &str,
        tick: Tick,
        status: BidStatus,
        accepted_amount: f64,
    ) -> SimulationResult<()> {
        let key = (plant.to_string(), market.to_string(), tick);
        let Some(&index) = self.dispatch_index.get(&key) else {
            return Err(SimulationError::UnknownDispatchPlan(
                PowerPlantDispatchPlan::key_id(plant, market, tick),
            ));
        };
        let plan = &mut self.dispatch_plans[index];
        if plan.outcome_recorded {
            return Err(SimulationError::OutcomeAlreadySet(plan.id.clone()));
        }
        plan.accepted_amount = match status {
            BidStatus::Failed | BidStatus::Awaiting => 0.0,
            _ => accepted_amount.clamp(0.0, plan.amount),
        };
        plan.status = status;
        plan.outcome_recorded = true;
        Ok(())
    }

    /// Drops every plan of `tick` so that a recomputed tick only clears the
    /// bids submitted in that pass.
    pub fn withdraw_dispatch_plans(&mut self, tick: Tick) -> usize {
        let before = self.dispatch_plans.len();
        self.dispatch_plans.retain(|plan| plan.tick != tick);
        self.dispatch_index = self
            .dispatch_plans
            .iter()
            .enumerate()
            .map(|(index, plan)| ((plan.plant.clone(), plan.market.clone(), plan.tick), index))
            .collect();
        before - self.dispatch_plans.len()
    }

    pub fn dispatch_plan(&self, plant: &str, market: &str, tick: Tick) -> Option<&PowerPlantDispatchPlan> {
        self.dispatch_index
            .get(&(plant.to_string(), market.to_string(), tick))
            .map(|&index| &self.dispatch_plans[index])
    }

    pub fn dispatch_plans_for(&self, market: &str, tick: Tick) -> impl Iterator<Item = &PowerPlantDispatchPlan> {
        let market = market.to_string();
        self.dispatch_plans
            .iter()
            .filter(move |plan| plan.market == market && plan.tick == tick)
    }

    /// Merit order: ascending bid price, ties broken by plant id.
    pub fn sorted_dispatch_plans_by_market_and_tick(&self, market: &str, tick: Tick) -> Vec<PowerPlantDispatchPlan> {
        let mut plans: Vec<PowerPlantDispatchPlan> = self.dispatch_plans_for(market, tick).cloned().collect();
        plans.sort_by(|a, b| a.price.total_cmp(&b.price).then_with(|| a.plant.cmp(&b.plant)));
        plans
    }

    /// Volume accepted for `plant` in `market` at `tick`.
    pub fn accepted_amount(&self, plant: &str, market: &str, tick: Tick) -> f64 {
        self.dispatch_plan(plant, market, tick)
            .map_or(0.0, |plan| plan.accepted_amount)
    }

    // ---- clearing points ------------------------------------------------

    pub fn create_or_update_clearing_point(
        &mut self,
        market: &str,
        price: f64,
        volume: f64,
        tick: Tick,
    ) -> &MarketClearingPoint {
        let point = self
            .clearing_points
            .entry((market.to_string(), tick))
            .or_insert_with(|| MarketClearingPoint {
                market: market.to_string(),
                tick,
                price,
                volume,
            });
        point.price = price;
        point.volume = volume;
        point
    }

    pub fn clearing_point(&self, market: &str, tick: Tick) -> Option<&MarketClearingPoint> {
        self.clearing_points.get(&(market.to_string(), tick))
    }

    /// Clearing price, or 0 with a warning when the market never cleared.
    pub fn clearing_price_or_zero(&self, market: &str, tick: Tick) -> f64 {
        match self.clearing_point(market, tick) {
            Some(point) => point.price,
            None => {
                warn!(market, tick, "No clearing point found, using price 0");
                0.0
            }
        }
    }

    // ---- aggregation ----------------------------------------------------

    /// Spot generation, revenue, costs and emissions of a plant for `tick`.
    pub fn plant_financials(&self, plant: &PowerPlant, tick: Tick, hours_per_year: f64) -> SimulationResult<PlantFinancials> {
        let mut financials = PlantFinancials::default();
        let spot_plans = self.dispatch_plans.iter().filter(|plan| {
            plan.plant == plant.id
                && plan.tick == tick
                && self.markets.get(&plan.market).is_some_and(Market::is_spot)
        });
        for plan in spot_plans {
            let generation = plan.accepted_amount * hours_per_year;
            if generation <= 0.0 {
                continue;
            }
            financials.generation += generation;
            financials.revenue += generation * self.clearing_price_or_zero(&plan.market, tick);
        }
        financials.variable_cost = financials.generation * self.marginal_cost_excluding_co2(plant, tick)?;
        financials.fixed_cost = self.fixed_operating_cost(plant, tick)?;
        financials.emissions = financials.generation * self.emission_intensity(plant);
        Ok(financials)
    }

    /// Sum of the plants' banked-allowance snapshots at `tick` in `zone`.
    pub fn allowances_in_circulation(&self, zone: &str, tick: Tick) -> f64 {
        self.power_plants
            .values()
            .filter(|plant| plant.zone == zone)
            .filter_map(|plant| plant.banked_allowances_at(tick))
            .sum()
    }

    pub fn set_banked_allowances(&mut self, plant_id: &str, tick: Tick, amount: f64) -> bool {
        match self.power_plants.get_mut(plant_id) {
            Some(plant) => {
                plant.banked_allowances.insert(tick, amount);
                true
            }
            None => {
                warn!(plant = plant_id, "Cannot bank allowances for unknown power plant");
                false
            }
        }
    }

    /// Copies each plant's latest earlier snapshot into `tick` when it has
    /// none yet. Returns the number of plants carried forward.
    pub fn carry_forward_banked_allowances(&mut self, tick: Tick) -> usize {
        let mut carried = 0;
        for plant in self.power_plants.values_mut() {
            if plant.banked_allowances.contains_key(&tick) {
                continue;
            }
            if let Some((_, amount)) = plant.latest_banked_before(tick) {
                plant.banked_allowances.insert(tick, amount);
                carried += 1;
            }
        }
        carried
    }

    // ---- persistence snapshot -------------------------------------------

    pub fn tick_results(&self, tick: Tick) -> TickResults {
        TickResults {
            tick,
            dispatch_plans: self
                .dispatch_plans
                .iter()
                .filter(|plan| plan.tick == tick)
                .cloned()
                .collect(),
            clearing_points: self
                .clearing_points
                .values()
                .filter(|point| point.tick == tick)
                .cloned()
                .collect(),
            reserve_stocks: self
                .stability_reserves
                .values()
                .filter_map(|msr| {
                    msr.stock_at(tick).map(|stock| ReserveStockRecord {
                        reserve: msr.id.clone(),
                        tick,
                        flow: msr.flow_at(tick),
                        stock,
                    })
                })
                .collect(),
            banked_allowances: self
                .power_plants
                .values()
                .filter_map(|plant| {
                    plant.banked_allowances_at(tick).map(|amount| BankedAllowanceRecord {
                        plant: plant.id.clone(),
                        tick,
                        amount,
                    })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::MarketKind;
    use crate::models::trend::{GeometricTrend, TriangularTrend};

    fn repository_with_plant() -> Repository {
        let mut repo = Repository::new();
        repo.add_technology(PowerGeneratingTechnology::new("ccgt".to_string(), 400.0));
        repo.add_substance(Substance {
            id: "gas".to_string(),
            co2_density: 2.75,
            energy_density: 50.0,
            quality: 1.0,
            price_trend: Some("gas_price".to_string()),
        });
        repo.add_trend("gas_price", Trend::Geometric(GeometricTrend::new(300.0, 0.0)));
        repo.add_fuel_mix(SubstanceInFuelMix {
            technology: "ccgt".to_string(),
            substance: "gas".to_string(),
            share: 1.0,
        });
        repo.add_market(Market::new("spot".to_string(), "nl".to_string(), MarketKind::ElectricitySpot));
        let mut plant = PowerPlant::new("p1".to_string(), "ccgt".to_string(), "nl".to_string(), "e1".to_string());
        plant.efficiency = 0.5;
        repo.add_power_plant(plant);
        repo
    }

    #[test]
    fn resubmitting_a_bid_updates_in_place() {
        let mut repo = repository_with_plant();
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 100.0, 30.0, 3);
        repo.set_dispatch_plan_outcome("p1", "spot", 3, BidStatus::Accepted, 100.0).unwrap();

        let plan = repo.create_or_update_dispatch_plan("p1", "e1", "spot", 80.0, 45.0, 3).clone();
        assert_eq!(plan.price, 45.0);
        assert_eq!(plan.amount, 80.0);
        assert_eq!(plan.status, BidStatus::Awaiting);
        assert_eq!(plan.accepted_amount, 0.0);
        assert_eq!(repo.dispatch_plans_for("spot", 3).count(), 1);
    }

    #[test]
    fn outcome_is_recorded_once_per_pass() {
        let mut repo = repository_with_plant();
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 100.0, 30.0, 0);
        repo.set_dispatch_plan_outcome("p1", "spot", 0, BidStatus::PartlyAccepted, 150.0).unwrap();
        assert_eq!(repo.accepted_amount("p1", "spot", 0), 100.0);
        let second = repo.set_dispatch_plan_outcome("p1", "spot", 0, BidStatus::Failed, 0.0);
        assert!(matches!(second, Err(SimulationError::OutcomeAlreadySet(_))));
        let missing = repo.set_dispatch_plan_outcome("p2", "spot", 0, BidStatus::Failed, 0.0);
        assert!(matches!(missing, Err(SimulationError::UnknownDispatchPlan(_))));
    }

    #[test]
    fn withdrawing_a_tick_keeps_other_ticks_addressable() {
        let mut repo = repository_with_plant();
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 100.0, 30.0, 0);
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 100.0, 31.0, 1);
        repo.create_or_update_dispatch_plan("p2", "e1", "spot", 50.0, 32.0, 1);
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 100.0, 33.0, 2);

        assert_eq!(repo.withdraw_dispatch_plans(1), 2);
        assert!(repo.dispatch_plan("p1", "spot", 1).is_none());
        assert_eq!(repo.dispatch_plan("p1", "spot", 2).unwrap().price, 33.0);
        repo.set_dispatch_plan_outcome("p1", "spot", 2, BidStatus::Accepted, 100.0).unwrap();
        assert_eq!(repo.accepted_amount("p1", "spot", 2), 100.0);
        assert_eq!(repo.dispatch_plan("p1", "spot", 0).unwrap().price, 30.0);
    }

    #[test]
    fn failed_plans_keep_no_volume() {
        let mut repo = repository_with_plant();
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 100.0, 30.0, 0);
        repo.set_dispatch_plan_outcome("p1", "spot", 0, BidStatus::Failed, 40.0).unwrap();
        assert_eq!(repo.accepted_amount("p1", "spot", 0), 0.0);
    }

    #[test]
    fn merit_order_breaks_price_ties_by_plant() {
        let mut repo = repository_with_plant();
        repo.create_or_update_dispatch_plan("p3", "e1", "spot", 10.0, 20.0, 1);
        repo.create_or_update_dispatch_plan("p2", "e1", "spot", 10.0, 20.0, 1);
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 10.0, 35.0, 1);
        repo.create_or_update_dispatch_plan("p4", "e1", "spot", 10.0, 5.0, 1);
        let order: Vec<String> = repo
            .sorted_dispatch_plans_by_market_and_tick("spot", 1)
            .into_iter()
            .map(|plan| plan.plant)
            .collect();
        assert_eq!(order, vec!["p4", "p2", "p3", "p1"]);
    }

    #[test]
    fn clearing_points_are_unique_per_market_and_tick() {
        let mut repo = repository_with_plant();
        repo.create_or_update_clearing_point("spot", 10.0, 50.0, 2);
        repo.create_or_update_clearing_point("spot", 12.0, 60.0, 2);
        assert_eq!(repo.tick_results(2).clearing_points.len(), 1);
        assert_eq!(repo.clearing_point("spot", 2).unwrap().price, 12.0);
        assert_eq!(repo.clearing_price_or_zero("spot", 3), 0.0);
    }

    #[test]
    fn marginal_cost_and_emissions_follow_fuel_mix() {
        let repo = repository_with_plant();
        let plant = repo.power_plant("p1").unwrap();
        // 3.6 GJ / (0.5 × 50 GJ/t) = 0.144 t gas per MWh
        let mc = repo.marginal_cost_excluding_co2(plant, 0).unwrap();
        assert!((mc - 0.144 * 300.0).abs() < 1e-9);
        assert!((repo.emission_intensity(plant) - 0.144 * 2.75).abs() < 1e-9);
    }

    #[test]
    fn intermittent_technologies_have_no_fuel_cost() {
        let mut repo = repository_with_plant();
        let mut wind = PowerGeneratingTechnology::new("ccgt".to_string(), 400.0);
        wind.intermittent = true;
        repo.add_technology(wind);
        let plant = repo.power_plant("p1").unwrap();
        assert_eq!(repo.substances_in_fuel_mix(plant).len(), 1);
        assert_eq!(repo.marginal_cost_excluding_co2(plant, 0).unwrap(), 0.0);
        assert_eq!(repo.emission_intensity(plant), 0.0);
    }

    #[test]
    fn unmapped_technology_has_empty_fuel_mix() {
        let mut repo = repository_with_plant();
        repo.add_power_plant(PowerPlant::new("w1".to_string(), "wind".to_string(), "nl".to_string(), "e1".to_string()));
        let plant = repo.power_plant("w1").unwrap();
        assert!(repo.substances_in_fuel_mix(plant).is_empty());
        assert_eq!(repo.marginal_cost_excluding_co2(plant, 0).unwrap(), 0.0);
        assert!(!repo.is_operational(plant, 0));
    }

    #[test]
    fn plant_financials_use_spot_clearing_price() {
        let mut repo = repository_with_plant();
        repo.create_or_update_dispatch_plan("p1", "e1", "spot", 400.0, 43.2, 0);
        repo.set_dispatch_plan_outcome("p1", "spot", 0, BidStatus::PartlyAccepted, 100.0).unwrap();
        repo.create_or_update_clearing_point("spot", 60.0, 100.0, 0);
        let plant = repo.power_plant("p1").unwrap();
        let financials = repo.plant_financials(plant, 0, 10.0).unwrap();
        assert_eq!(financials.generation, 1000.0);
        assert!((financials.revenue - 60_000.0).abs() < 1e-9);
        assert!((financials.operating_profit() - (60_000.0 - 43_200.0)).abs() < 1e-6);
        assert!((financials.emissions - 1000.0 * 0.144 * 2.75).abs() < 1e-9);
    }

    #[test]
    fn banked_allowances_carry_forward_and_sum_per_zone() {
        let mut repo = repository_with_plant();
        repo.add_power_plant(PowerPlant::new("p2".to_string(), "ccgt".to_string(), "be".to_string(), "e1".to_string()));
        repo.set_banked_allowances("p1", 0, 500.0);
        repo.set_banked_allowances("p2", 0, 70.0);
        assert_eq!(repo.carry_forward_banked_allowances(1), 2);
        assert_eq!(repo.allowances_in_circulation("nl", 1), 500.0);
        repo.set_banked_allowances("p1", 2, 300.0);
        assert_eq!(repo.carry_forward_banked_allowances(2), 1);
        assert_eq!(repo.allowances_in_circulation("nl", 2), 300.0);
        assert_eq!(repo.allowances_in_circulation("be", 2), 70.0);
    }

    #[test]
    fn trend_lookup_distinguishes_missing_data_from_sequencing_errors() {
        let mut repo = Repository::new();
        repo.add_trend("walk", Trend::Triangular(TriangularTrend::new(1.0, 1.0, 0.9, 1.1, 3)));
        assert_eq!(repo.trend_value("missing", 4).unwrap(), 0.0);
        assert!(matches!(
            repo.trend_value("walk", -1),
            Err(SimulationError::TrendSequence { .. })
        ));
    }

    #[test]
    fn peak_load_applies_demand_growth() {
        let mut repo = Repository::new();
        let mut zone = Zone::new("nl".to_string());
        zone.load_duration_curve = vec![60.0, 100.0, 80.0];
        zone.demand_growth_trend = Some("growth".to_string());
        repo.add_zone(zone);
        repo.add_trend("growth", Trend::Geometric(GeometricTrend::new(1.0, 0.1)));
        assert!((repo.peak_load("nl", 2).unwrap() - 121.0).abs() < 1e-9);
        assert_eq!(repo.peak_load("be", 2).unwrap(), 0.0);
    }
}
