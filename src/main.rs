use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use emlab::analysis::reporting::{print_dispatch_details, print_tick_summary};
use emlab::cli::cli::Args;
use emlab::data::results::{MemoryResultStore, ResultSink};
use emlab::data::sources::{CsvScenarioSource, ScenarioSource};
use emlab::utils::csv_export::CsvResultWriter;
use emlab::utils::logging::{self, FileIOType, OperationCategory};
use emlab::{Simulation, SimulationConfig};

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging(args.enable_timing(), args.debug_logging())?;

    let mut config = match args.config() {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(ticks) = args.ticks() {
        config.ticks = ticks;
    }
    if let Some(seed) = args.seed() {
        config.seed = seed;
    }

    println!("Electricity Market Simulator");
    println!("Run: {}, ticks: {}, seed: {}", args.run_id(), config.ticks, config.seed);

    let scenario = {
        let _timing = logging::start_timing(
            "load_run",
            OperationCategory::FileIO { subcategory: FileIOType::ScenarioLoad },
        );
        CsvScenarioSource::new(args.scenario_dir(), config.seed).load(args.run_id())?
    };
    let start = scenario.current_tick;

    let mut sink: Box<dyn ResultSink> = if args.no_csv() {
        Box::new(MemoryResultStore::new())
    } else {
        let writer = CsvResultWriter::new(args.output_dir())?;
        println!("Writing results to {}", writer.directory().display());
        Box::new(writer)
    };

    let ticks = config.ticks.max(0);
    let mut simulation = Simulation::new(scenario.repository, config);

    let progress = ProgressBar::new(ticks as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks {msg}")?,
    );

    for tick in start..start + ticks {
        progress.set_message(format!("tick {}", tick));
        let summary = simulation.run_tick(tick, sink.as_mut())?;
        progress.suspend(|| {
            print_tick_summary(&summary);
            if args.dispatch_details() {
                print_dispatch_details(simulation.repository(), tick);
            }
        });
        progress.inc(1);
    }
    progress.finish_with_message("done");

    info!(first = start, last = start + ticks - 1, "Simulation finished");
    logging::print_timing_report();
    Ok(())
}
