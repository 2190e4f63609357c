use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::repository::Repository;
use crate::models::agents::{EnergyProducer, Government};
use crate::models::market::{CapacityMarketParameters, Co2MarketParameters, Market, MarketKind, Zone};
use crate::models::power_plant::PowerPlant;
use crate::models::stability_reserve::MarketStabilityReserve;
use crate::models::substance::{Substance, SubstanceInFuelMix};
use crate::models::technology::PowerGeneratingTechnology;
use crate::models::trend::{GeometricTrend, StepTrend, Trend, TriangularTrend};
use crate::utils::logging::{self, FileIOType, OperationCategory};
use crate::Tick;

#[derive(Error, Debug)]
pub enum ScenarioLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: unknown entity class '{class}'")]
    UnknownClass { line: u64, class: String },
    #[error("{class} '{id}' has no field '{field}'")]
    UnknownField { class: EntityClass, id: String, field: String },
    #[error("{class} '{id}': invalid value '{value}' for field '{field}'")]
    InvalidValue { class: EntityClass, id: String, field: String, value: String },
    #[error("{class} '{id}' is missing required field '{field}'")]
    MissingField { class: EntityClass, id: String, field: &'static str },
    #[error("line {line}: expected 4 columns (class,id,parameter,value)")]
    MalformedRow { line: u64 },
}

/// Every entity kind a scenario file may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityClass {
    Simulation,
    GeometricTrend,
    StepTrend,
    TriangularTrend,
    PowerGeneratingTechnology,
    Substance,
    SubstanceInFuelMix,
    Zone,
    ElectricitySpotMarket,
    CapacityMarket,
    CO2Market,
    EnergyProducer,
    PowerPlant,
    Government,
    MarketStabilityReserve,
}

impl FromStr for EntityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Simulation" => Ok(EntityClass::Simulation),
            "GeometricTrend" => Ok(EntityClass::GeometricTrend),
            "StepTrend" => Ok(EntityClass::StepTrend),
            "TriangularTrend" => Ok(EntityClass::TriangularTrend),
            "PowerGeneratingTechnology" => Ok(EntityClass::PowerGeneratingTechnology),
            "Substance" => Ok(EntityClass::Substance),
            "SubstanceInFuelMix" => Ok(EntityClass::SubstanceInFuelMix),
            "Zone" => Ok(EntityClass::Zone),
            "ElectricitySpotMarket" => Ok(EntityClass::ElectricitySpotMarket),
            "CapacityMarket" => Ok(EntityClass::CapacityMarket),
            "CO2Market" => Ok(EntityClass::CO2Market),
            "EnergyProducer" => Ok(EntityClass::EnergyProducer),
            "PowerPlant" => Ok(EntityClass::PowerPlant),
            "Government" => Ok(EntityClass::Government),
            "MarketStabilityReserve" => Ok(EntityClass::MarketStabilityReserve),
            _ => Err(format!("Unknown entity class: {}", s)),
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A loaded run: the populated model and the tick to resume from.
#[derive(Debug)]
pub struct LoadedScenario {
    pub repository: Repository,
    pub current_tick: Tick,
}

/// One `parameter,value` cell of an entity, with enough context to report
/// a bad value.
struct Field<'a> {
    class: EntityClass,
    id: &'a str,
    name: &'a str,
    value: &'a str,
}

impl<'a> Field<'a> {
    fn invalid(&self) -> ScenarioLoadError {
        ScenarioLoadError::InvalidValue {
            class: self.class,
            id: self.id.to_string(),
            field: self.name.to_string(),
            value: self.value.to_string(),
        }
    }

    fn unknown(&self) -> ScenarioLoadError {
        ScenarioLoadError::UnknownField {
            class: self.class,
            id: self.id.to_string(),
            field: self.name.to_string(),
        }
    }

    fn number(&self) -> Result<f64, ScenarioLoadError> {
        self.value.trim().parse().map_err(|_| self.invalid())
    }

    fn tick(&self) -> Result<Tick, ScenarioLoadError> {
        self.value.trim().parse().map_err(|_| self.invalid())
    }

    fn flag(&self) -> Result<bool, ScenarioLoadError> {
        match self.value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(self.invalid()),
        }
    }

    fn text(&self) -> String {
        self.value.trim().to_string()
    }

    /// Semicolon separated numbers, e.g. a load-duration curve.
    fn numbers(&self) -> Result<Vec<f64>, ScenarioLoadError> {
        self.value
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.parse().map_err(|_| self.invalid()))
            .collect()
    }

    /// Semicolon separated `tick:amount` pairs.
    fn tick_series(&self) -> Result<Vec<(Tick, f64)>, ScenarioLoadError> {
        self.value
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let (tick, amount) = item.split_once(':').ok_or_else(|| self.invalid())?;
                let tick = tick.trim().parse().map_err(|_| self.invalid())?;
                let amount = amount.trim().parse().map_err(|_| self.invalid())?;
                Ok((tick, amount))
            })
            .collect()
    }
}

fn missing(class: EntityClass, id: &str, field: &'static str) -> ScenarioLoadError {
    ScenarioLoadError::MissingField { class, id: id.to_string(), field }
}

/// Trend parameters collected before the trend is built.
#[derive(Debug, Clone)]
struct TrendSpec {
    start: f64,
    growth_rate: f64,
    duration: Option<Tick>,
    increment: f64,
    min_value: f64,
    top: f64,
    min: f64,
    max: f64,
}

impl Default for TrendSpec {
    fn default() -> Self {
        Self {
            start: 0.0,
            growth_rate: 0.0,
            duration: None,
            increment: 0.0,
            min_value: f64::NEG_INFINITY,
            top: 1.0,
            min: 1.0,
            max: 1.0,
        }
    }
}

fn apply_trend(spec: &mut TrendSpec, field: &Field) -> Result<(), ScenarioLoadError> {
    match (field.class, field.name) {
        (_, "start") => spec.start = field.number()?,
        (EntityClass::GeometricTrend, "growth_rate") => spec.growth_rate = field.number()?,
        (EntityClass::StepTrend, "duration") => spec.duration = Some(field.tick()?),
        (EntityClass::StepTrend, "increment") => spec.increment = field.number()?,
        (EntityClass::StepTrend, "min_value") => spec.min_value = field.number()?,
        (EntityClass::TriangularTrend, "top") => spec.top = field.number()?,
        (EntityClass::TriangularTrend, "min") => spec.min = field.number()?,
        (EntityClass::TriangularTrend, "max") => spec.max = field.number()?,
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn build_trend(class: EntityClass, id: &str, spec: TrendSpec, seed: u64) -> Result<Trend, ScenarioLoadError> {
    match class {
        EntityClass::StepTrend => {
            let duration = spec.duration.ok_or_else(|| missing(class, id, "duration"))?;
            if duration <= 0 {
                return Err(ScenarioLoadError::InvalidValue {
                    class,
                    id: id.to_string(),
                    field: "duration".to_string(),
                    value: duration.to_string(),
                });
            }
            Ok(Trend::Step(StepTrend::new(spec.start, duration, spec.increment, spec.min_value)))
        }
        EntityClass::TriangularTrend => Ok(Trend::Triangular(TriangularTrend::new(
            spec.start, spec.top, spec.min, spec.max, seed,
        ))),
        _ => Ok(Trend::Geometric(GeometricTrend::new(spec.start, spec.growth_rate))),
    }
}

fn apply_technology(technology: &mut PowerGeneratingTechnology, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "capacity" => technology.capacity = field.number()?,
        "intermittent" => technology.intermittent = field.flag()?,
        "peak_availability" => technology.peak_availability = field.number()?,
        "base_availability" => technology.base_availability = field.number()?,
        "permit_time" => technology.permit_time = field.tick()?,
        "lead_time" => technology.lead_time = field.tick()?,
        "lifetime" => technology.lifetime = field.tick()?,
        "co2_capture_efficiency" => technology.co2_capture_efficiency = field.number()?,
        "fixed_om_cost_trend" => technology.fixed_om_cost_trend = Some(field.text()),
        "investment_cost_trend" => technology.investment_cost_trend = Some(field.text()),
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn apply_substance(substance: &mut Substance, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "co2_density" => substance.co2_density = field.number()?,
        "energy_density" => substance.energy_density = field.number()?,
        "quality" => substance.quality = field.number()?,
        "price_trend" => substance.price_trend = Some(field.text()),
        _ => return Err(field.unknown()),
    }
    Ok(())
}

#[derive(Default)]
struct FuelMixSpec {
    technology: Option<String>,
    substance: Option<String>,
    share: Option<f64>,
}

fn apply_fuel_mix(spec: &mut FuelMixSpec, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "technology" => spec.technology = Some(field.text()),
        "substance" => spec.substance = Some(field.text()),
        "share" => spec.share = Some(field.number()?),
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn apply_zone(zone: &mut Zone, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "load_duration_curve" => zone.load_duration_curve = field.numbers()?,
        "demand_growth_trend" => zone.demand_growth_trend = Some(field.text()),
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn apply_market(market: &mut Market, field: &Field) -> Result<(), ScenarioLoadError> {
    match (&mut market.kind, field.name) {
        (_, "zone") => market.zone = field.text(),
        (_, "reference_price") => market.reference_price = field.number()?,
        (MarketKind::Capacity(parameters), "installed_reserve_margin") => {
            parameters.installed_reserve_margin = field.number()?
        }
        (MarketKind::Capacity(parameters), "lower_margin") => parameters.lower_margin = field.number()?,
        (MarketKind::Capacity(parameters), "upper_margin") => parameters.upper_margin = field.number()?,
        (MarketKind::Capacity(parameters), "price_cap") => parameters.price_cap = field.number()?,
        (MarketKind::Co2(parameters), "export_trend") => parameters.export_trend = Some(field.text()),
        (MarketKind::Co2(parameters), "hedging_share") => {
            let share = field.number()?;
            if !(0.0..=1.0).contains(&share) {
                return Err(field.invalid());
            }
            parameters.hedging_share = share;
        }
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn apply_producer(producer: &mut EnergyProducer, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "spot_market" => producer.spot_market = Some(field.text()),
        "capacity_market" => producer.capacity_market = Some(field.text()),
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn apply_power_plant(plant: &mut PowerPlant, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "technology" => plant.technology = field.text(),
        "zone" => plant.zone = field.text(),
        "owner" => plant.owner = field.text(),
        "capacity" => plant.capacity = Some(field.number()?),
        "efficiency" => plant.efficiency = field.number()?,
        "construction_start_tick" => plant.construction_start_tick = field.tick()?,
        "dismantle_tick" => plant.dismantle_tick = Some(field.tick()?),
        "banked_allowances" => plant.banked_allowances.extend(field.tick_series()?),
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn apply_government(government: &mut Government, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "zone" => government.zone = field.text(),
        "co2_cap_trend" => government.co2_cap_trend = Some(field.text()),
        "co2_min_price_trend" => government.co2_min_price_trend = Some(field.text()),
        "co2_penalty" => government.co2_penalty = field.number()?,
        _ => return Err(field.unknown()),
    }
    Ok(())
}

fn apply_stability_reserve(msr: &mut MarketStabilityReserve, field: &Field) -> Result<(), ScenarioLoadError> {
    match field.name {
        "zone" => msr.zone = field.text(),
        "upper_trigger_trend" => msr.upper_trigger_trend = Some(field.text()),
        "lower_trigger_trend" => msr.lower_trigger_trend = Some(field.text()),
        "release_trend" => msr.release_trend = Some(field.text()),
        "initial_stock" => msr.initial_stock = field.number()?,
        _ => return Err(field.unknown()),
    }
    Ok(())
}

/// Applies every row of one entity to a freshly defaulted value.
fn build<T>(
    mut entity: T,
    class: EntityClass,
    id: &str,
    rows: &[(String, String)],
    apply: fn(&mut T, &Field) -> Result<(), ScenarioLoadError>,
) -> Result<T, ScenarioLoadError> {
    for (name, value) in rows {
        apply(&mut entity, &Field { class, id, name, value })?;
    }
    Ok(entity)
}

fn require(class: EntityClass, id: &str, field: &'static str, value: &str) -> Result<(), ScenarioLoadError> {
    if value.is_empty() {
        return Err(missing(class, id, field));
    }
    Ok(())
}

type EntityRows = BTreeMap<(EntityClass, String), Vec<(String, String)>>;

fn read_rows<R: Read>(reader: R) -> Result<EntityRows, ScenarioLoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entities: EntityRows = BTreeMap::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |position| position.line());
        if record.len() != 4 {
            return Err(ScenarioLoadError::MalformedRow { line });
        }
        let class = EntityClass::from_str(&record[0]).map_err(|_| ScenarioLoadError::UnknownClass {
            line,
            class: record[0].to_string(),
        })?;
        entities
            .entry((class, record[1].to_string()))
            .or_default()
            .push((record[2].to_string(), record[3].to_string()));
    }
    Ok(entities)
}

/// Builds a repository from `class,id,parameter,value` rows. Triangular
/// trends are seeded from `seed` and their position in id order, so a
/// scenario loads identically every time.
pub fn load_scenario<R: Read>(reader: R, seed: u64) -> Result<LoadedScenario, ScenarioLoadError> {
    let _timing = logging::start_timing(
        "load_scenario",
        OperationCategory::FileIO { subcategory: FileIOType::ScenarioLoad },
    );

    let entities = read_rows(reader)?;
    let mut repository = Repository::new();
    let mut current_tick = 0;
    let mut triangular_count: u64 = 0;

    for ((class, id), rows) in &entities {
        let class = *class;
        match class {
            EntityClass::Simulation => {
                for (name, value) in rows {
                    let field = Field { class, id, name, value };
                    match field.name {
                        "current_tick" => current_tick = field.tick()?,
                        _ => return Err(field.unknown()),
                    }
                }
            }
            EntityClass::GeometricTrend | EntityClass::StepTrend | EntityClass::TriangularTrend => {
                let spec = build(TrendSpec::default(), class, id, rows, apply_trend)?;
                let trend_seed = seed.wrapping_add(triangular_count);
                if class == EntityClass::TriangularTrend {
                    triangular_count += 1;
                }
                repository.add_trend(id.clone(), build_trend(class, id, spec, trend_seed)?);
            }
            EntityClass::PowerGeneratingTechnology => {
                let technology = PowerGeneratingTechnology::new(id.clone(), 0.0);
                repository.add_technology(build(technology, class, id, rows, apply_technology)?);
            }
            EntityClass::Substance => {
                repository.add_substance(build(Substance::new(id.clone()), class, id, rows, apply_substance)?);
            }
            EntityClass::SubstanceInFuelMix => {
                let spec = build(FuelMixSpec::default(), class, id, rows, apply_fuel_mix)?;
                repository.add_fuel_mix(SubstanceInFuelMix {
                    technology: spec.technology.ok_or_else(|| missing(class, id, "technology"))?,
                    substance: spec.substance.ok_or_else(|| missing(class, id, "substance"))?,
                    share: spec.share.unwrap_or(1.0),
                });
            }
            EntityClass::Zone => {
                repository.add_zone(build(Zone::new(id.clone()), class, id, rows, apply_zone)?);
            }
            EntityClass::ElectricitySpotMarket | EntityClass::CapacityMarket | EntityClass::CO2Market => {
                let kind = match class {
                    EntityClass::CapacityMarket => MarketKind::Capacity(CapacityMarketParameters::default()),
                    EntityClass::CO2Market => MarketKind::Co2(Co2MarketParameters::default()),
                    _ => MarketKind::ElectricitySpot,
                };
                let market = build(Market::new(id.clone(), String::new(), kind), class, id, rows, apply_market)?;
                require(class, id, "zone", &market.zone)?;
                repository.add_market(market);
            }
            EntityClass::EnergyProducer => {
                repository.add_producer(build(EnergyProducer::new(id.clone()), class, id, rows, apply_producer)?);
            }
            EntityClass::PowerPlant => {
                let plant = PowerPlant::new(id.clone(), String::new(), String::new(), String::new());
                let plant = build(plant, class, id, rows, apply_power_plant)?;
                require(class, id, "technology", &plant.technology)?;
                require(class, id, "zone", &plant.zone)?;
                require(class, id, "owner", &plant.owner)?;
                repository.add_power_plant(plant);
            }
            EntityClass::Government => {
                let government = Government::new(id.clone(), String::new());
                let government = build(government, class, id, rows, apply_government)?;
                require(class, id, "zone", &government.zone)?;
                repository.add_government(government);
            }
            EntityClass::MarketStabilityReserve => {
                let msr = MarketStabilityReserve::new(id.clone(), String::new());
                let msr = build(msr, class, id, rows, apply_stability_reserve)?;
                require(class, id, "zone", &msr.zone)?;
                repository.add_stability_reserve(msr);
            }
        }
        debug!(%class, id = %id, fields = rows.len(), "Loaded entity");
    }

    info!(entities = entities.len(), current_tick, "Scenario loaded");
    Ok(LoadedScenario { repository, current_tick })
}

pub fn load_scenario_file(path: impl AsRef<Path>, seed: u64) -> Result<LoadedScenario, ScenarioLoadError> {
    let file = File::open(path)?;
    load_scenario(file, seed)
}
