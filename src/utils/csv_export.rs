use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::data::results::{ResultSink, TickResults};
use crate::utils::logging::{self, FileIOType, OperationCategory};

pub const DISPATCH_PLANS_FILE: &str = "dispatch_plans.csv";
pub const CLEARING_POINTS_FILE: &str = "clearing_points.csv";
pub const RESERVE_STOCKS_FILE: &str = "reserve_stocks.csv";
pub const BANKED_ALLOWANCES_FILE: &str = "banked_allowances.csv";

/// Appends each tick's results to one CSV file per record kind.
#[derive(Debug, Clone)]
pub struct CsvResultWriter {
    directory: PathBuf,
}

impl CsvResultWriter {
    /// Creates `<base>/run_<timestamp>` for this run.
    pub fn new(base: impl AsRef<Path>) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::in_directory(base.as_ref().join(format!("run_{}", timestamp)))
    }

    pub fn in_directory(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .with_context(|| format!("creating output directory {}", directory.display()))?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn append<T: Serialize>(&self, file_name: &str, records: &[T]) -> Result<()> {
        // An empty file would suppress the header of the first real append
        if records.is_empty() {
            return Ok(());
        }
        let path = self.directory.join(file_name);
        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let mut writer = WriterBuilder::new().has_headers(is_new).from_writer(file);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ResultSink for CsvResultWriter {
    fn persist(&mut self, results: &TickResults) -> Result<()> {
        let _timing = logging::start_timing(
            "csv_persist",
            OperationCategory::FileIO { subcategory: FileIOType::ResultsSave },
        );
        self.append(DISPATCH_PLANS_FILE, &results.dispatch_plans)?;
        self.append(CLEARING_POINTS_FILE, &results.clearing_points)?;
        self.append(RESERVE_STOCKS_FILE, &results.reserve_stocks)?;
        self.append(BANKED_ALLOWANCES_FILE, &results.banked_allowances)?;
        debug!(tick = results.tick, directory = %self.directory.display(), "Wrote tick results");
        Ok(())
    }
}
