//! Interference trend analysis.

use std::path::PathBuf;

use anyhow::bail;
use clap::ValueEnum;

use specscope_common::config::SpecscopeConfig;
use specscope_common::dataset::{self, TIMESTAMP};
use specscope_common::enrich::{TimestampPolicy, enrich};
use specscope_common::models::{RawReading, Reading};
use specscope_common::report::{GroupKey, Report, aggregate, overall_rate};

use crate::source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    File,
    Simulated,
}

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Where readings come from.
    #[arg(long, value_enum)]
    pub source: Source,

    /// CSV file path (with `--source file`).
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Number of simulated samples.
    #[arg(long, default_value_t = 200)]
    pub samples: usize,

    /// Grouping to report (hour, day, month, daypart); repeatable.
    /// Defaults to all four.
    #[arg(long = "by")]
    pub groupings: Vec<GroupKey>,

    /// Print the reports as JSON instead of tables.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: Args, config: &SpecscopeConfig) -> anyhow::Result<()> {
    let raw = load(&args, config)?;
    let readings = enrich(&raw, TimestampPolicy::Strict)?.readings;
    let keys = if args.groupings.is_empty() {
        GroupKey::ALL.to_vec()
    } else {
        args.groupings.clone()
    };
    let reports = build_reports(&readings, &keys);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if let Some(rate) = overall_rate(&readings) {
        println!("Readings: {}  Overall interference: {rate:.1}%\n", readings.len());
    }
    for report in &reports {
        println!("{report}");
    }
    Ok(())
}

fn load(args: &Args, config: &SpecscopeConfig) -> anyhow::Result<Vec<RawReading>> {
    match args.source {
        Source::File => {
            let Some(path) = &args.path else {
                bail!("--path is required with --source file");
            };
            Ok(dataset::read_csv(path, &[TIMESTAMP])?.raw_readings())
        }
        Source::Simulated => source::simulated_readings(config, args.samples),
    }
}

fn build_reports(readings: &[Reading], keys: &[GroupKey]) -> Vec<Report> {
    keys.iter().map(|&key| aggregate(readings, key)).collect()
}
