use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::dispatch::{MarketClearingPoint, PowerPlantDispatchPlan};
use crate::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveStockRecord {
    pub reserve: String,
    pub tick: Tick,
    pub flow: f64,
    pub stock: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankedAllowanceRecord {
    pub plant: String,
    pub tick: Tick,
    pub amount: f64,
}

/// Everything a completed tick hands to persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickResults {
    pub tick: Tick,
    pub dispatch_plans: Vec<PowerPlantDispatchPlan>,
    pub clearing_points: Vec<MarketClearingPoint>,
    pub reserve_stocks: Vec<ReserveStockRecord>,
    pub banked_allowances: Vec<BankedAllowanceRecord>,
}

/// Receives the results of each completed tick.
pub trait ResultSink {
    fn persist(&mut self, results: &TickResults) -> anyhow::Result<()>;
}

/// Keeps persisted results in memory, indexed for point lookups. Persisting
/// the same tick twice replaces the earlier records.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    clearing_points: BTreeMap<(String, Tick), MarketClearingPoint>,
    dispatch_plans: BTreeMap<(String, Tick), Vec<PowerPlantDispatchPlan>>,
    reserve_stocks: BTreeMap<(String, Tick), ReserveStockRecord>,
    banked_allowances: BTreeMap<(String, Tick), f64>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clearing_point(&self, market: &str, tick: Tick) -> Option<&MarketClearingPoint> {
        self.clearing_points.get(&(market.to_string(), tick))
    }

    /// All clearing points of one market in tick order.
    pub fn price_history(&self, market: &str) -> Vec<(Tick, f64)> {
        self.clearing_points
            .values()
            .filter(|point| point.market == market)
            .map(|point| (point.tick, point.price))
            .collect()
    }

    pub fn dispatch_plans(&self, plant: &str, tick: Tick) -> &[PowerPlantDispatchPlan] {
        self.dispatch_plans
            .get(&(plant.to_string(), tick))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reserve_stock(&self, reserve: &str, tick: Tick) -> Option<&ReserveStockRecord> {
        self.reserve_stocks.get(&(reserve.to_string(), tick))
    }

    pub fn banked_allowances(&self, plant: &str, tick: Tick) -> Option<f64> {
        self.banked_allowances.get(&(plant.to_string(), tick)).copied()
    }

    pub fn persisted_ticks(&self) -> Vec<Tick> {
        let mut ticks: Vec<Tick> = self.clearing_points.keys().map(|(_, tick)| *tick).collect();
        ticks.sort_unstable();
        ticks.dedup();
        ticks
    }

    fn forget_tick(&mut self, tick: Tick) {
        self.clearing_points.retain(|(_, t), _| *t != tick);
        self.dispatch_plans.retain(|(_, t), _| *t != tick);
        self.reserve_stocks.retain(|(_, t), _| *t != tick);
        self.banked_allowances.retain(|(_, t), _| *t != tick);
    }
}

impl ResultSink for MemoryResultStore {
    fn persist(&mut self, results: &TickResults) -> anyhow::Result<()> {
        self.forget_tick(results.tick);
        for point in &results.clearing_points {
            self.clearing_points
                .insert((point.market.clone(), point.tick), point.clone());
        }
        for plan in &results.dispatch_plans {
            self.dispatch_plans
                .entry((plan.plant.clone(), plan.tick))
                .or_default()
                .push(plan.clone());
        }
        for record in &results.reserve_stocks {
            self.reserve_stocks
                .insert((record.reserve.clone(), record.tick), record.clone());
        }
        for record in &results.banked_allowances {
            self.banked_allowances
                .insert((record.plant.clone(), record.tick), record.amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dispatch::BidStatus;

    fn results(tick: Tick, price: f64) -> TickResults {
        TickResults {
            tick,
            dispatch_plans: vec![PowerPlantDispatchPlan {
                id: PowerPlantDispatchPlan::key_id("p1", "spot", tick),
                plant: "p1".to_string(),
                bidder: "e1".to_string(),
                market: "spot".to_string(),
                tick,
                amount: 50.0,
                price,
                status: BidStatus::Accepted,
                accepted_amount: 50.0,
                outcome_recorded: true,
            }],
            clearing_points: vec![MarketClearingPoint {
                market: "spot".to_string(),
                tick,
                price,
                volume: 50.0,
            }],
            reserve_stocks: Vec::new(),
            banked_allowances: vec![BankedAllowanceRecord {
                plant: "p1".to_string(),
                tick,
                amount: 12.0,
            }],
        }
    }

    #[test]
    fn lookups_by_market_and_plant() {
        let mut store = MemoryResultStore::new();
        store.persist(&results(0, 30.0)).unwrap();
        store.persist(&results(1, 35.0)).unwrap();

        assert_eq!(store.clearing_point("spot", 1).unwrap().price, 35.0);
        assert_eq!(store.dispatch_plans("p1", 0).len(), 1);
        assert!(store.dispatch_plans("p2", 0).is_empty());
        assert_eq!(store.banked_allowances("p1", 1), Some(12.0));
        assert_eq!(store.price_history("spot"), vec![(0, 30.0), (1, 35.0)]);
        assert_eq!(store.persisted_ticks(), vec![0, 1]);
    }

    #[test]
    fn persisting_a_tick_again_replaces_it() {
        let mut store = MemoryResultStore::new();
        store.persist(&results(0, 30.0)).unwrap();
        store.persist(&results(0, 31.0)).unwrap();
        assert_eq!(store.dispatch_plans("p1", 0).len(), 1);
        assert_eq!(store.clearing_point("spot", 0).unwrap().price, 31.0);
    }
}
