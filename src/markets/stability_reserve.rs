use tracing::{debug, info};

use crate::config::constants::MSR_LOOKBACK_TICKS;
use crate::config::simulation_config::SimulationConfig;
use crate::core::error::SimulationResult;
use crate::core::repository::Repository;
use crate::utils::logging::{self, MarketType, OperationCategory};
use crate::Tick;

/// Moves allowances into or out of each zone's reserve depending on how many
/// were in circulation two ticks ago. Returns the flows applied, by reserve.
pub fn update_reserves(
    repo: &mut Repository,
    tick: Tick,
    config: &SimulationConfig,
) -> SimulationResult<Vec<(String, f64)>> {
    let _timing = logging::start_timing(
        "msr_update",
        OperationCategory::Clearing { subcategory: MarketType::StabilityReserve },
    );

    let mut flows = Vec::new();
    for msr in repo.stability_reserves() {
        if tick < MSR_LOOKBACK_TICKS {
            flows.push((msr.id.clone(), 0.0));
            continue;
        }

        let circulation = repo.allowances_in_circulation(&msr.zone, tick - MSR_LOOKBACK_TICKS);
        let upper = repo.optional_trend_value(msr.upper_trigger_trend.as_deref(), tick, f64::INFINITY)?;
        let lower = repo.optional_trend_value(msr.lower_trigger_trend.as_deref(), tick, f64::NEG_INFINITY)?;

        let flow = if circulation > upper {
            config.msr_withdrawal_rate * circulation
        } else if circulation < lower {
            let release = repo.optional_trend_value(msr.release_trend.as_deref(), tick, 0.0)?;
            -release.min(msr.stock_before(tick))
        } else {
            0.0
        };
        debug!(reserve = %msr.id, tick, circulation, upper, lower, flow, "Computed reserve flow");
        flows.push((msr.id.clone(), flow));
    }

    for (id, flow) in &flows {
        if let Some(msr) = repo.stability_reserve_mut(id) {
            let stock = msr.record_flow(tick, *flow);
            info!(reserve = %id, tick, flow, stock, "Updated market stability reserve");
        }
    }
    Ok(flows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::fixtures::{self, ZONE};
    use crate::models::stability_reserve::MarketStabilityReserve;
    use crate::models::trend::Trend;

    fn repository_with_reserve(initial_stock: f64) -> Repository {
        let mut repo = fixtures::zone_with_spot_market(100.0);
        fixtures::add_plant(&mut repo, "p1", 50.0, 10.0, 1.0);
        repo.add_trend("upper", Trend::constant(833.0));
        repo.add_trend("lower", Trend::constant(400.0));
        repo.add_trend("release", Trend::constant(100.0));
        let mut msr = MarketStabilityReserve::new("msr".to_string(), ZONE.to_string());
        msr.upper_trigger_trend = Some("upper".to_string());
        msr.lower_trigger_trend = Some("lower".to_string());
        msr.release_trend = Some("release".to_string());
        msr.initial_stock = initial_stock;
        repo.add_stability_reserve(msr);
        repo
    }

    #[test]
    fn surplus_above_upper_trigger_is_withdrawn() {
        let mut repo = repository_with_reserve(500.0);
        repo.set_banked_allowances("p1", 3, 1000.0);
        let flows = update_reserves(&mut repo, 5, &SimulationConfig::default()).unwrap();
        assert!((flows[0].1 - 120.0).abs() < 1e-9);
        let msr = repo.stability_reserves().next().unwrap();
        assert!((msr.stock_at(5).unwrap() - 620.0).abs() < 1e-9);
    }

    #[test]
    fn shortage_below_lower_trigger_releases_at_most_the_stock() {
        let mut repo = repository_with_reserve(60.0);
        repo.set_banked_allowances("p1", 3, 100.0);
        let flows = update_reserves(&mut repo, 5, &SimulationConfig::default()).unwrap();
        assert_eq!(flows[0].1, -60.0);
        let msr = repo.stability_reserves().next().unwrap();
        assert_eq!(msr.stock_at(5), Some(0.0));
    }

    #[test]
    fn circulation_within_band_leaves_reserve_unchanged() {
        let mut repo = repository_with_reserve(60.0);
        repo.set_banked_allowances("p1", 0, 500.0);
        let flows = update_reserves(&mut repo, 2, &SimulationConfig::default()).unwrap();
        assert_eq!(flows[0].1, 0.0);
    }

    #[test]
    fn first_two_ticks_only_carry_the_stock() {
        let mut repo = repository_with_reserve(60.0);
        repo.set_banked_allowances("p1", 0, 5000.0);
        for tick in 0..=1 {
            let flows = update_reserves(&mut repo, tick, &SimulationConfig::default()).unwrap();
            assert_eq!(flows[0].1, 0.0);
        }
        let msr = repo.stability_reserves().next().unwrap();
        assert_eq!(msr.stock_at(1), Some(60.0));
    }
}
