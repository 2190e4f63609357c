use tracing::{debug, info};

use crate::core::error::SimulationResult;
use crate::core::repository::Repository;
use crate::models::dispatch::{BidStatus, MarketClearingPoint};
use crate::utils::logging::{self, MarketType, OperationCategory};
use crate::Tick;

struct SpotBid {
    plant: String,
    bidder: String,
    market: String,
    amount: f64,
    price: f64,
}

/// Every producer offers the full capacity of each operational plant at its
/// fuel cost. Returns the number of bids placed.
pub fn submit_bids(repo: &mut Repository, tick: Tick) -> SimulationResult<usize> {
    let _timing = logging::start_timing(
        "spot_submit_bids",
        OperationCategory::Bidding { subcategory: MarketType::ElectricitySpot },
    );

    let mut bids = Vec::new();
    for producer in repo.producers() {
        for plant in repo.power_plants_by_owner(&producer.id) {
            if !repo.is_operational(plant, tick) {
                continue;
            }
            let Some(market) = repo.spot_market_for(producer, plant) else {
                continue;
            };
            bids.push(SpotBid {
                plant: plant.id.clone(),
                bidder: producer.id.clone(),
                market: market.id.clone(),
                amount: repo.nominal_capacity(plant),
                price: repo.marginal_cost_excluding_co2(plant, tick)?,
            });
        }
    }

    for bid in &bids {
        repo.create_or_update_dispatch_plan(&bid.plant, &bid.bidder, &bid.market, bid.amount, bid.price, tick);
    }
    debug!(tick, bids = bids.len(), "Submitted spot market bids");
    Ok(bids.len())
}

/// Clears every spot market for `tick`.
pub fn clear(repo: &mut Repository, tick: Tick) -> SimulationResult<Vec<MarketClearingPoint>> {
    let _timing = logging::start_timing(
        "spot_clear",
        OperationCategory::Clearing { subcategory: MarketType::ElectricitySpot },
    );

    let markets: Vec<String> = repo
        .markets()
        .filter(|market| market.is_spot())
        .map(|market| market.id.clone())
        .collect();

    markets
        .iter()
        .map(|market| clear_market(repo, market, tick))
        .collect()
}

/// Walks the merit order against the zone's peak load. Accepted plans are
/// paid their own bid; the last accepted bid sets the clearing price.
pub fn clear_market(repo: &mut Repository, market_id: &str, tick: Tick) -> SimulationResult<MarketClearingPoint> {
    let zone = match repo.market(market_id) {
        Some(market) => market.zone.clone(),
        None => String::new(),
    };
    let peak = repo.peak_load(&zone, tick)?;

    let mut accepted_total = 0.0;
    let mut clearing_price = 0.0;
    for plan in repo.sorted_dispatch_plans_by_market_and_tick(market_id, tick) {
        let (status, accepted) = if accepted_total + plan.amount <= peak {
            (BidStatus::Accepted, plan.amount)
        } else if peak - accepted_total > 0.0 {
            (BidStatus::PartlyAccepted, peak - accepted_total)
        } else {
            (BidStatus::Failed, 0.0)
        };

        if status != BidStatus::Failed {
            accepted_total += accepted;
            clearing_price = plan.price;
        }
        repo.set_dispatch_plan_outcome(&plan.plant, market_id, tick, status, accepted)?;
    }

    info!(
        market = market_id,
        tick,
        price = clearing_price,
        volume = accepted_total,
        peak,
        "Cleared electricity spot market"
    );
    Ok(repo
        .create_or_update_clearing_point(market_id, clearing_price, accepted_total, tick)
        .clone())
}
