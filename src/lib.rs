// Main module declarations for the electricity market simulator

/// Simulation time in years. Plants built before the run start may carry
/// negative construction ticks.
pub type Tick = i64;

// Core simulation modules
pub mod core {
    pub mod error;
    pub mod repository;
    pub mod simulation;
}

// Model definitions
pub mod models {
    pub mod trend;
    pub mod technology;
    pub mod substance;
    pub mod power_plant;
    pub mod market;
    pub mod agents;
    pub mod dispatch;
    pub mod stability_reserve;
}

// Market clearing algorithms
pub mod markets {
    pub mod electricity_spot;
    pub mod capacity_market;
    pub mod co2_market;
    pub mod stability_reserve;
    #[cfg(test)]
    pub(crate) mod fixtures;
}

// Configuration modules
pub mod config {
    pub mod constants;
    pub mod simulation_config;
}

// Scenario loading and result persistence
pub mod data {
    pub mod scenario_loader;
    pub mod sources;
    pub mod results;
}

// Analysis and reporting
pub mod analysis {
    pub mod reporting;
}

// Utility functions
pub mod utils {
    pub mod logging;
    pub mod csv_export;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

// Re-export commonly used modules
pub use crate::config::simulation_config::SimulationConfig;
pub use crate::core::error::{SimulationError, SimulationResult};
pub use crate::core::repository::Repository;
pub use crate::core::simulation::Simulation;
