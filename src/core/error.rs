use thiserror::Error;

use crate::Tick;

/// Fatal errors raised while running a tick. Any of these aborts the tick
/// and leaves its results unpersisted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("trend '{trend}' cannot produce a value for tick {tick}")]
    TrendSequence { trend: String, tick: Tick },

    #[error("dispatch plan '{0}' already received an outcome in this clearing pass")]
    OutcomeAlreadySet(String),

    #[error("dispatch plan '{0}' does not exist")]
    UnknownDispatchPlan(String),

    #[error("tick regression: tick {requested} requested after tick {completed} completed")]
    TickRegression { requested: Tick, completed: Tick },

    #[error("tick {0} is negative")]
    NegativeTick(Tick),
}

pub type SimulationResult<T> = std::result::Result<T, SimulationError>;
