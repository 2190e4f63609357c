use anyhow::Context;
use tracing::{debug, info, warn};

use super::error::{SimulationError, SimulationResult};
use super::repository::Repository;
use crate::config::simulation_config::SimulationConfig;
use crate::data::results::ResultSink;
use crate::markets::{capacity_market, co2_market, electricity_spot, stability_reserve};
use crate::models::dispatch::MarketClearingPoint;
use crate::utils::logging::{self, OperationCategory};
use crate::Tick;

/// What one tick produced, for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    pub tick: Tick,
    pub spot_bids: usize,
    pub capacity_bids: usize,
    pub spot: Vec<MarketClearingPoint>,
    pub capacity: Vec<MarketClearingPoint>,
    pub co2: Vec<MarketClearingPoint>,
    pub reserve_flows: Vec<(String, f64)>,
    pub carried_allowances: usize,
}

/// Drives the markets tick by tick over one repository.
pub struct Simulation {
    repository: Repository,
    config: SimulationConfig,
    last_completed: Option<Tick>,
}

impl Simulation {
    pub fn new(repository: Repository, config: SimulationConfig) -> Self {
        Self {
            repository,
            config,
            last_completed: None,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Access for investment and decommissioning events between ticks.
    pub fn repository_mut(&mut self) -> &mut Repository {
        &mut self.repository
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn last_completed_tick(&self) -> Option<Tick> {
        self.last_completed
    }

    /// Runs the markets for `tick` in their fixed order. Re-running the last
    /// completed tick overwrites its results; going further back is refused.
    pub fn step(&mut self, tick: Tick) -> SimulationResult<TickSummary> {
        if tick < 0 {
            return Err(SimulationError::NegativeTick(tick));
        }
        if let Some(completed) = self.last_completed {
            if tick < completed {
                return Err(SimulationError::TickRegression { requested: tick, completed });
            }
            if tick == completed {
                warn!(tick, "Re-running an already completed tick");
            }
        }

        let _timing = logging::start_timing(&format!("tick_{}", tick), OperationCategory::Simulation);
        let repo = &mut self.repository;
        let config = &self.config;

        let withdrawn = repo.withdraw_dispatch_plans(tick);
        if withdrawn > 0 {
            debug!(tick, withdrawn, "Withdrew dispatch plans from the previous pass");
        }
        let carried_allowances = repo.carry_forward_banked_allowances(tick);
        let spot_bids = electricity_spot::submit_bids(repo, tick)?;
        let spot = electricity_spot::clear(repo, tick)?;
        let capacity_bids = capacity_market::submit_bids(repo, tick, config)?;
        let capacity = capacity_market::clear(repo, tick)?;
        let reserve_flows = stability_reserve::update_reserves(repo, tick, config)?;
        let co2 = co2_market::determine_prices(repo, tick, config)?;

        self.last_completed = Some(tick);
        info!(tick, spot_bids, capacity_bids, "Tick completed");
        Ok(TickSummary {
            tick,
            spot_bids,
            capacity_bids,
            spot,
            capacity,
            co2,
            reserve_flows,
            carried_allowances,
        })
    }

    /// Runs `tick` and hands its results to `sink`. A failed tick is never
    /// persisted.
    pub fn run_tick(&mut self, tick: Tick, sink: &mut dyn ResultSink) -> anyhow::Result<TickSummary> {
        let summary = self
            .step(tick)
            .with_context(|| format!("running tick {}", tick))?;
        sink.persist(&self.repository.tick_results(tick))
            .with_context(|| format!("persisting tick {}", tick))?;
        Ok(summary)
    }

    /// Runs `count` consecutive ticks from `start`, calling `on_tick` after
    /// each one is persisted.
    pub fn run(
        &mut self,
        start: Tick,
        count: Tick,
        sink: &mut dyn ResultSink,
        mut on_tick: impl FnMut(&TickSummary),
    ) -> anyhow::Result<Vec<TickSummary>> {
        let _timing = logging::start_timing("run_simulation", OperationCategory::Simulation);
        let mut summaries = Vec::new();
        for tick in start..start + count.max(0) {
            let summary = self.run_tick(tick, sink)?;
            on_tick(&summary);
            summaries.push(summary);
        }
        Ok(summaries)
    }
}
