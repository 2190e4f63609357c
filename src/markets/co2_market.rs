use tracing::{debug, info};

use crate::config::constants::CO2_SUBSTANCE_ID;
use crate::config::simulation_config::SimulationConfig;
use crate::core::error::SimulationResult;
use crate::core::repository::Repository;
use crate::models::dispatch::MarketClearingPoint;
use crate::models::market::Co2MarketParameters;
use crate::utils::logging::{self, MarketType, OperationCategory};
use crate::Tick;

/// A plant's willingness to pay for allowances, derived from what it earned
/// in the lookback tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowanceDemand {
    pub plant: String,
    pub willingness_to_pay: f64, // €/tCO2
    pub emissions: f64,          // tCO2
}

/// Sets the CO2 price of every CO2 market for `tick`.
pub fn determine_prices(
    repo: &mut Repository,
    tick: Tick,
    config: &SimulationConfig,
) -> SimulationResult<Vec<MarketClearingPoint>> {
    let _timing = logging::start_timing(
        "co2_determine_prices",
        OperationCategory::Clearing { subcategory: MarketType::Co2 },
    );

    let markets: Vec<(String, String, Co2MarketParameters)> = repo
        .markets()
        .filter_map(|market| {
            market
                .co2_parameters()
                .map(|parameters| (market.id.clone(), market.zone.clone(), parameters.clone()))
        })
        .collect();

    let mut points = Vec::with_capacity(markets.len());
    for (market, zone, parameters) in markets {
        let price = determine_price(repo, &zone, &parameters, tick, config)?;
        info!(market = %market, tick, price, "Determined CO2 price");
        points.push(repo.create_or_update_clearing_point(&market, price, 0.0, tick).clone());
    }
    Ok(points)
}

/// CO2 price for one zone, bounded above by the government penalty and
/// below by its minimum price.
pub fn determine_price(
    repo: &Repository,
    zone: &str,
    parameters: &Co2MarketParameters,
    tick: Tick,
    config: &SimulationConfig,
) -> SimulationResult<f64> {
    let mut price = if tick == 0 {
        initial_price(repo, config)?
    } else {
        let lookback = (tick - config.time_step).max(0);
        let limit = allowance_limit(repo, zone, parameters, tick, lookback)?;
        let demand = allowance_demand(repo, zone, lookback, config.hours_per_year)?;
        marginal_willingness_to_pay(&demand, limit)
    };

    if let Some(government) = repo.government_for_zone(zone) {
        if government.co2_penalty > 0.0 {
            price = price.min(government.co2_penalty);
        }
        let minimum = repo.optional_trend_value(government.co2_min_price_trend.as_deref(), tick, 0.0)?;
        price = price.max(minimum);
    }
    Ok(price)
}

fn initial_price(repo: &Repository, config: &SimulationConfig) -> SimulationResult<f64> {
    match repo.substance(CO2_SUBSTANCE_ID) {
        Some(co2) => repo.optional_trend_value(co2.price_trend.as_deref(), 0, config.co2_seed_price),
        None => Ok(config.co2_seed_price),
    }
}

/// Allowances the market can absorb: the lookback cap net of banked
/// allowances, reserve intake and unhedged exports.
pub fn allowance_limit(
    repo: &Repository,
    zone: &str,
    parameters: &Co2MarketParameters,
    tick: Tick,
    lookback: Tick,
) -> SimulationResult<f64> {
    let cap = match repo.government_for_zone(zone) {
        Some(government) => {
            repo.optional_trend_value(government.co2_cap_trend.as_deref(), lookback, f64::INFINITY)?
        }
        None => f64::INFINITY,
    };
    let circulation = repo.allowances_in_circulation(zone, lookback);
    let reserve_intake = repo
        .stability_reserve_for_zone(zone)
        .map_or(0.0, |msr| msr.flow_at(tick));
    let exports = repo.optional_trend_value(parameters.export_trend.as_deref(), lookback, 0.0)?;

    let limit = cap - circulation - reserve_intake - exports * (1.0 - parameters.hedging_share);
    debug!(zone, tick, cap, circulation, reserve_intake, exports, limit, "Computed allowance limit");
    Ok(limit)
}

/// Emitting plants ranked by willingness to pay, highest first.
pub fn allowance_demand(
    repo: &Repository,
    zone: &str,
    lookback: Tick,
    hours_per_year: f64,
) -> SimulationResult<Vec<AllowanceDemand>> {
    let mut demand = Vec::new();
    for plant in repo.operational_power_plants_in_zone(zone, lookback) {
        let financials = repo.plant_financials(plant, lookback, hours_per_year)?;
        if financials.emissions <= 0.0 {
            continue;
        }
        demand.push(AllowanceDemand {
            plant: plant.id.clone(),
            willingness_to_pay: financials.operating_profit() / financials.emissions,
            emissions: financials.emissions,
        });
    }
    demand.sort_by(|a, b| {
        b.willingness_to_pay
            .total_cmp(&a.willingness_to_pay)
            .then_with(|| a.plant.cmp(&b.plant))
    });
    Ok(demand)
}

/// Walks the ranked demand until the limit binds. The last admitted plant
/// sets the price; a limit that never binds leaves the price at zero.
pub fn marginal_willingness_to_pay(demand: &[AllowanceDemand], limit: f64) -> f64 {
    let mut admitted = 0.0;
    let mut last_admitted = None;
    for entry in demand {
        let needed = entry.emissions.ceil();
        if admitted + needed > limit {
            return last_admitted.unwrap_or(entry.willingness_to_pay);
        }
        admitted += needed;
        last_admitted = Some(entry.willingness_to_pay);
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::fixtures::{self, CO2, SPOT};
    use crate::markets::electricity_spot;
    use crate::models::stability_reserve::MarketStabilityReserve;
    use crate::models::substance::Substance;
    use crate::models::trend::Trend;

    fn demand(plant: &str, wtp: f64, emissions: f64) -> AllowanceDemand {
        AllowanceDemand {
            plant: plant.to_string(),
            willingness_to_pay: wtp,
            emissions,
        }
    }

    #[test]
    fn binding_limit_prices_at_last_admitted_plant() {
        let ranked = vec![demand("a", 80.0, 100.0), demand("b", 50.0, 100.0), demand("c", 20.0, 100.0)];
        assert_eq!(marginal_willingness_to_pay(&ranked, 250.0), 50.0);
        assert_eq!(marginal_willingness_to_pay(&ranked, 50.0), 80.0);
        assert_eq!(marginal_willingness_to_pay(&ranked, 1_000.0), 0.0);
        assert_eq!(marginal_willingness_to_pay(&[], 10.0), 0.0);
    }

    #[test]
    fn fractional_emissions_are_rounded_up() {
        let ranked = vec![demand("a", 80.0, 99.2), demand("b", 50.0, 100.5)];
        // 100 + 101 = 201 > 200
        assert_eq!(marginal_willingness_to_pay(&ranked, 200.0), 80.0);
    }

    #[test]
    fn tick_zero_uses_co2_substance_price() {
        let mut repo = fixtures::zone_with_spot_market(100.0);
        fixtures::add_co2_market(&mut repo, Co2MarketParameters::default());
        let config = SimulationConfig::default();

        let points = determine_prices(&mut repo, 0, &config).unwrap();
        assert_eq!(points[0].price, config.co2_seed_price);

        let mut co2 = Substance::new(CO2_SUBSTANCE_ID.to_string());
        co2.price_trend = Some("co2_price".to_string());
        repo.add_substance(co2);
        repo.add_trend("co2_price", Trend::constant(13.0));
        let points = determine_prices(&mut repo, 0, &config).unwrap();
        assert_eq!(points[0].price, 13.0);
        assert_eq!(points[0].volume, 0.0);
    }

    #[test]
    fn price_never_drops_below_minimum() {
        let mut repo = fixtures::zone_with_spot_market(100.0);
        fixtures::add_co2_market(&mut repo, Co2MarketParameters::default());
        fixtures::add_government(&mut repo, 1.0e9, 17.5, 0.0);
        fixtures::add_plant(&mut repo, "coal", 60.0, 10.0, 1.0);
        fixtures::add_plant(&mut repo, "gas", 60.0, 30.0, 0.4);

        let config = SimulationConfig::default();
        for tick in 0..3 {
            electricity_spot::submit_bids(&mut repo, tick).unwrap();
            electricity_spot::clear(&mut repo, tick).unwrap();
            let points = determine_prices(&mut repo, tick, &config).unwrap();
            assert!(points[0].price >= 17.5);
        }
        // The cap never binds, so only the floor remains
        assert_eq!(repo.clearing_point(CO2, 2).unwrap().price, 17.5);
    }

    #[test]
    fn scarce_allowances_price_at_willingness_to_pay() {
        let mut repo = fixtures::zone_with_spot_market(100.0);
        fixtures::add_co2_market(&mut repo, Co2MarketParameters::default());
        fixtures::add_plant(&mut repo, "coal", 60.0, 10.0, 1.0);
        fixtures::add_plant(&mut repo, "gas", 60.0, 30.0, 0.5);
        electricity_spot::submit_bids(&mut repo, 0).unwrap();
        electricity_spot::clear(&mut repo, 0).unwrap();
        assert_eq!(repo.clearing_point(SPOT, 0).unwrap().price, 30.0);

        let config = SimulationConfig { hours_per_year: 1.0, ..SimulationConfig::default() };
        // coal: 60 MWh earning 20 €/MWh at 1 t/MWh, WTP 20
        // gas: 40 MWh earning 0 at 0.5 t/MWh, WTP 0
        fixtures::add_government(&mut repo, 70.0, 0.0, 0.0);
        let price = determine_price(&repo, fixtures::ZONE, &Co2MarketParameters::default(), 1, &config).unwrap();
        assert!((price - 20.0).abs() < 1e-9);

        let exporting = Co2MarketParameters {
            export_trend: Some("exports".to_string()),
            hedging_share: 0.5,
        };
        repo.add_trend("exports", Trend::constant(40.0));
        // Limit 70 - 40 × 0.5 = 50 is exceeded by coal alone, so coal still sets the price
        let price = determine_price(&repo, fixtures::ZONE, &exporting, 1, &config).unwrap();
        assert!((price - 20.0).abs() < 1e-9);

        fixtures::add_government(&mut repo, 70.0, 0.0, 5.0);
        let ceiling = determine_price(&repo, fixtures::ZONE, &Co2MarketParameters::default(), 1, &config).unwrap();
        assert_eq!(ceiling, 5.0);
    }

    fn two_emitters_cleared_at_tick_zero() -> Repository {
        let mut repo = fixtures::zone_with_spot_market(100.0);
        fixtures::add_co2_market(&mut repo, Co2MarketParameters::default());
        fixtures::add_plant(&mut repo, "coal", 60.0, 10.0, 1.0);
        fixtures::add_plant(&mut repo, "gas", 60.0, 30.0, 0.5);
        electricity_spot::submit_bids(&mut repo, 0).unwrap();
        electricity_spot::clear(&mut repo, 0).unwrap();
        repo
    }

    #[test]
    fn reserve_intake_of_the_current_tick_tightens_the_cap() {
        let mut repo = two_emitters_cleared_at_tick_zero();
        let config = SimulationConfig { hours_per_year: 1.0, ..SimulationConfig::default() };
        let parameters = Co2MarketParameters::default();
        // 60 t of coal plus 20 t of gas fit under 100
        fixtures::add_government(&mut repo, 100.0, 0.0, 0.0);
        assert_eq!(determine_price(&repo, fixtures::ZONE, &parameters, 1, &config).unwrap(), 0.0);

        let mut msr = MarketStabilityReserve::new("msr".to_string(), fixtures::ZONE.to_string());
        msr.record_flow(0, 30.0);
        repo.add_stability_reserve(msr);
        assert_eq!(allowance_limit(&repo, fixtures::ZONE, &parameters, 1, 0).unwrap(), 100.0);
        assert_eq!(determine_price(&repo, fixtures::ZONE, &parameters, 1, &config).unwrap(), 0.0);

        repo.stability_reserve_mut("msr").unwrap().record_flow(1, 30.0);
        assert_eq!(allowance_limit(&repo, fixtures::ZONE, &parameters, 1, 0).unwrap(), 70.0);
        // Gas no longer fits, so coal becomes the marginal buyer
        let price = determine_price(&repo, fixtures::ZONE, &parameters, 1, &config).unwrap();
        assert!((price - 20.0).abs() < 1e-9);
    }

    #[test]
    fn longer_time_step_looks_further_back() {
        let mut repo = two_emitters_cleared_at_tick_zero();
        fixtures::add_government(&mut repo, 70.0, 0.0, 0.0);
        // Without gas, coal sets the spot price and earns nothing at tick 1
        repo.dismantle_power_plant("gas", 1);
        electricity_spot::submit_bids(&mut repo, 1).unwrap();
        electricity_spot::clear(&mut repo, 1).unwrap();
        assert_eq!(repo.clearing_point(SPOT, 1).unwrap().price, 10.0);

        let parameters = Co2MarketParameters::default();
        let yearly = SimulationConfig { hours_per_year: 1.0, ..SimulationConfig::default() };
        assert_eq!(determine_price(&repo, fixtures::ZONE, &parameters, 2, &yearly).unwrap(), 0.0);

        let biennial = SimulationConfig { time_step: 2, ..yearly };
        let price = determine_price(&repo, fixtures::ZONE, &parameters, 2, &biennial).unwrap();
        assert!((price - 20.0).abs() < 1e-9);
    }
}
