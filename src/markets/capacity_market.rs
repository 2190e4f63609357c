use tracing::{debug, info, warn};

use crate::config::simulation_config::SimulationConfig;
use crate::core::error::SimulationResult;
use crate::core::repository::Repository;
use crate::models::dispatch::{BidStatus, MarketClearingPoint};
use crate::models::market::CapacityMarketParameters;
use crate::utils::logging::{self, MarketType, OperationCategory};
use crate::Tick;

/// Administrative demand for capacity: full price cap up to `lower_volume`,
/// falling linearly to zero at `upper_volume`.
#[derive(Debug, Clone, PartialEq)]
pub struct SlopingDemandCurve {
    pub lower_volume: f64,
    pub upper_volume: f64,
    pub price_cap: f64,
}

impl SlopingDemandCurve {
    pub fn new(parameters: &CapacityMarketParameters, peak_load: f64) -> Self {
        let irm = parameters.installed_reserve_margin;
        Self {
            lower_volume: peak_load * (1.0 + irm - parameters.lower_margin),
            upper_volume: peak_load * (1.0 + irm + parameters.upper_margin),
            price_cap: parameters.price_cap,
        }
    }

    pub fn price_at(&self, volume: f64) -> f64 {
        if volume <= self.lower_volume {
            self.price_cap
        } else if volume >= self.upper_volume {
            0.0
        } else {
            let slope = self.price_cap / (self.upper_volume - self.lower_volume);
            self.price_cap - slope * (volume - self.lower_volume)
        }
    }
}

struct CapacityBid {
    plant: String,
    bidder: String,
    market: String,
    amount: f64,
    price: f64,
}

/// Plants bid the capacity premium they need to cover the loss they expect
/// from the energy market alone.
pub fn submit_bids(repo: &mut Repository, tick: Tick, config: &SimulationConfig) -> SimulationResult<usize> {
    let _timing = logging::start_timing(
        "capacity_submit_bids",
        OperationCategory::Bidding { subcategory: MarketType::Capacity },
    );

    let mut bids = Vec::new();
    for producer in repo.producers() {
        for plant in repo.power_plants_by_owner(&producer.id) {
            if !repo.is_operational(plant, tick) {
                continue;
            }
            let Some(market) = repo.capacity_market_for(producer, plant) else {
                warn!(producer = %producer.id, plant = %plant.id, "No capacity market found, skipping bid");
                continue;
            };

            let capacity = repo.nominal_capacity(plant);
            let previous_spot_price = match (tick > 0, repo.spot_market_for(producer, plant)) {
                (true, Some(spot)) => repo.clearing_price_or_zero(&spot.id, tick - 1),
                _ => 0.0,
            };
            let marginal_cost = repo.marginal_cost_excluding_co2(plant, tick)?;
            let fixed_cost = repo.fixed_operating_cost(plant, tick)?;
            let net_revenue =
                (previous_spot_price - marginal_cost) * capacity * config.hours_per_year - fixed_cost;

            let derated = capacity * repo.peak_availability(plant);
            let price = if tick > 0 && net_revenue < 0.0 && derated > 0.0 {
                -net_revenue / derated
            } else {
                0.0
            };

            bids.push(CapacityBid {
                plant: plant.id.clone(),
                bidder: producer.id.clone(),
                market: market.id.clone(),
                amount: capacity,
                price,
            });
        }
    }

    for bid in &bids {
        repo.create_or_update_dispatch_plan(&bid.plant, &bid.bidder, &bid.market, bid.amount, bid.price, tick);
    }
    debug!(tick, bids = bids.len(), "Submitted capacity market bids");
    Ok(bids.len())
}

pub fn clear(repo: &mut Repository, tick: Tick) -> SimulationResult<Vec<MarketClearingPoint>> {
    let _timing = logging::start_timing(
        "capacity_clear",
        OperationCategory::Clearing { subcategory: MarketType::Capacity },
    );

    let markets: Vec<(String, String, CapacityMarketParameters)> = repo
        .markets()
        .filter_map(|market| {
            market
                .capacity_parameters()
                .map(|parameters| (market.id.clone(), market.zone.clone(), parameters.clone()))
        })
        .collect();

    let mut points = Vec::with_capacity(markets.len());
    for (market, zone, parameters) in markets {
        let peak = repo.peak_load(&zone, tick)?;
        let curve = SlopingDemandCurve::new(&parameters, peak);
        points.push(clear_market(repo, &market, &curve, peak, tick)?);
    }
    Ok(points)
}

/// Accepts bids in merit order up to the peak load; the clearing price is
/// read off the demand curve at the accepted volume, or 0 when nothing
/// was accepted.
pub fn clear_market(
    repo: &mut Repository,
    market_id: &str,
    curve: &SlopingDemandCurve,
    peak: f64,
    tick: Tick,
) -> SimulationResult<MarketClearingPoint> {
    let mut accepted_total = 0.0;
    let mut price = 0.0;
    for plan in repo.sorted_dispatch_plans_by_market_and_tick(market_id, tick) {
        let (status, accepted) = if accepted_total + plan.amount <= peak {
            (BidStatus::Accepted, plan.amount)
        } else if peak - accepted_total > 0.0 {
            (BidStatus::PartlyAccepted, peak - accepted_total)
        } else {
            (BidStatus::Failed, 0.0)
        };
        if accepted > 0.0 {
            accepted_total += accepted;
            price = curve.price_at(accepted_total);
        }
        repo.set_dispatch_plan_outcome(&plan.plant, market_id, tick, status, accepted)?;
    }

    info!(
        market = market_id,
        tick,
        price,
        volume = accepted_total,
        lower = curve.lower_volume,
        upper = curve.upper_volume,
        "Cleared capacity market"
    );
    Ok(repo
        .create_or_update_clearing_point(market_id, price, accepted_total, tick)
        .clone())
}
