use clap::Parser;

use crate::Tick;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short = 's', long, default_value = "scenarios", help = "Directory holding <run-id>.csv scenario files")]
    scenario_dir: String,

    #[arg(short = 'r', long, default_value = "baseline")]
    run_id: String,

    #[arg(short, long, help = "JSON simulation config; defaults apply when omitted")]
    config: Option<String>,

    #[arg(short = 'n', long, help = "Number of ticks to run, overrides the config")]
    ticks: Option<Tick>,

    #[arg(long, help = "Random seed for triangular trends, overrides the config")]
    seed: Option<u64>,

    #[arg(short, long, default_value = "results")]
    output_dir: String,

    #[arg(long, default_value_t = false)]
    no_csv: bool,

    #[arg(long, default_value_t = false)]
    enable_timing: bool,

    #[arg(long, default_value_t = false)]
    debug_logging: bool,

    #[arg(long, default_value_t = false, help = "Print per-plant dispatch after every tick")]
    dispatch_details: bool,
}

impl Args {
    pub fn scenario_dir(&self) -> &str {
        &self.scenario_dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn ticks(&self) -> Option<Tick> {
        self.ticks
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn no_csv(&self) -> bool {
        self.no_csv
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }

    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    pub fn dispatch_details(&self) -> bool {
        self.dispatch_details
    }
}
