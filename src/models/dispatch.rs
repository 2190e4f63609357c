use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidStatus {
    Awaiting,
    Accepted,
    PartlyAccepted,
    Failed,
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidStatus::Awaiting => write!(f, "Awaiting"),
            BidStatus::Accepted => write!(f, "Accepted"),
            BidStatus::PartlyAccepted => write!(f, "PartlyAccepted"),
            BidStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// One plant's bid into one market for one tick, and its clearing outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerPlantDispatchPlan {
    pub id: String,
    pub plant: String,
    pub bidder: String,
    pub market: String,
    pub tick: Tick,
    pub amount: f64, // MW
    pub price: f64,
    pub status: BidStatus,
    pub accepted_amount: f64,
    #[serde(skip)]
    pub(crate) outcome_recorded: bool,
}

impl PowerPlantDispatchPlan {
    pub fn key_id(plant: &str, market: &str, tick: Tick) -> String {
        format!("{}_{}_{}", plant, market, tick)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketClearingPoint {
    pub market: String,
    pub tick: Tick,
    pub price: f64,
    pub volume: f64,
}
