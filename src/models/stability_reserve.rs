use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStabilityReserve {
    pub id: String,
    pub zone: String,
    pub upper_trigger_trend: Option<String>,
    pub lower_trigger_trend: Option<String>,
    pub release_trend: Option<String>,
    pub initial_stock: f64,
    pub flow: f64, // Net movement of the latest processed tick, positive = withdrawal
    pub reserve: BTreeMap<Tick, f64>,
    pub flows: BTreeMap<Tick, f64>,
}

impl MarketStabilityReserve {
    pub fn new(id: String, zone: String) -> Self {
        Self {
            id,
            zone,
            upper_trigger_trend: None,
            lower_trigger_trend: None,
            release_trend: None,
            initial_stock: 0.0,
            flow: 0.0,
            reserve: BTreeMap::new(),
            flows: BTreeMap::new(),
        }
    }

    /// Reserve stock carried into `tick`.
    pub fn stock_before(&self, tick: Tick) -> f64 {
        self.reserve
            .range(..tick)
            .next_back()
            .map_or(self.initial_stock, |(_, stock)| *stock)
    }

    pub fn stock_at(&self, tick: Tick) -> Option<f64> {
        self.reserve.get(&tick).copied()
    }

    /// Applies `flow` on top of the stock carried into `tick`. Re-running a
    /// tick overwrites its entry rather than accumulating twice.
    pub fn record_flow(&mut self, tick: Tick, flow: f64) -> f64 {
        let stock = self.stock_before(tick) + flow;
        self.flow = flow;
        self.flows.insert(tick, flow);
        self.reserve.insert(tick, stock);
        stock
    }

    pub fn flow_at(&self, tick: Tick) -> f64 {
        self.flows.get(&tick).copied().unwrap_or(0.0)
    }
}
