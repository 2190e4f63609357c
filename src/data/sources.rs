use std::path::PathBuf;

use anyhow::Context;

use super::scenario_loader::{load_scenario_file, LoadedScenario};

/// Supplies the initial model of a run.
pub trait ScenarioSource {
    fn load(&self, run_id: &str) -> anyhow::Result<LoadedScenario>;
}

/// Reads `<directory>/<run_id>.csv`.
#[derive(Debug, Clone)]
pub struct CsvScenarioSource {
    directory: PathBuf,
    seed: u64,
}

impl CsvScenarioSource {
    pub fn new(directory: impl Into<PathBuf>, seed: u64) -> Self {
        Self { directory: directory.into(), seed }
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.directory.join(format!("{}.csv", run_id))
    }
}

impl ScenarioSource for CsvScenarioSource {
    fn load(&self, run_id: &str) -> anyhow::Result<LoadedScenario> {
        let path = self.path_for(run_id);
        load_scenario_file(&path, self.seed)
            .with_context(|| format!("loading scenario {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_maps_to_csv_file() {
        let source = CsvScenarioSource::new("scenarios", 1);
        assert_eq!(source.path_for("baseline"), PathBuf::from("scenarios/baseline.csv"));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let source = CsvScenarioSource::new("/nonexistent/scenarios", 1);
        let error = source.load("baseline").unwrap_err();
        assert!(format!("{:#}", error).contains("baseline.csv"));
    }
}
