//! Band monitoring with the threshold policy.

use std::path::PathBuf;

use anyhow::bail;
use clap::ValueEnum;

use specscope_common::config::SpecscopeConfig;
use specscope_common::dataset::{self, REQUIRED_COLUMNS};
use specscope_common::enrich::{TimestampPolicy, enrich};
use specscope_common::labeling::{ThresholdPolicy, filter_band};
use specscope_common::models::{Band, RawReading, Reading};
use specscope_common::report::{GroupKey, Report, aggregate};

use crate::source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    Simulated,
    Csv,
}

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Where readings come from.
    #[arg(long, value_enum, default_value = "simulated")]
    pub source: Source,

    /// Number of simulated samples.
    #[arg(long, default_value_t = 300)]
    pub samples: usize,

    /// CSV file path (with `--source csv`).
    #[arg(long)]
    pub csv_path: Option<PathBuf>,

    /// Band start in MHz (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    pub band_start: f64,

    /// Band end in MHz (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    pub band_end: f64,

    /// Power threshold in dBm; readings strictly above it are flagged.
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,
}

/// Band readings, the flagged subset, and the hourly report.
#[derive(Debug)]
pub struct BandSummary {
    pub readings: Vec<Reading>,
    pub flagged: Vec<Reading>,
    pub hourly: Report,
}

pub fn summarize(readings: &[Reading], band: Band, policy: ThresholdPolicy) -> BandSummary {
    let in_band = filter_band(readings, band);
    let flagged = policy.detect(&in_band);
    let hourly = aggregate(&policy.label(&in_band), GroupKey::Hour);
    BandSummary {
        readings: in_band,
        flagged,
        hourly,
    }
}

pub fn run(args: Args, config: &SpecscopeConfig) -> anyhow::Result<()> {
    if args.band_start > args.band_end {
        bail!(
            "band start {} MHz is above band end {} MHz",
            args.band_start,
            args.band_end
        );
    }
    let policy = args.threshold.map(ThresholdPolicy::new).unwrap_or(config.monitor);
    let band = Band::new(args.band_start, args.band_end);

    let raw = load(&args, config)?;
    let enriched = enrich(&raw, TimestampPolicy::DropInvalid)?;
    let summary = summarize(&enriched.readings, band, policy);

    tracing::info!(
        band = %band,
        threshold_dbm = policy.threshold_dbm,
        in_band = summary.readings.len(),
        flagged = summary.flagged.len(),
        dropped = enriched.dropped.len(),
        "band monitored"
    );

    println!("Band {band}: {} readings", summary.readings.len());
    println!(
        "Interference (power > {} dBm): {} readings",
        policy.threshold_dbm,
        summary.flagged.len()
    );
    for r in &summary.flagged {
        println!(
            "  {}  {:>10.3} MHz  {:>8.2} dBm",
            r.timestamp,
            r.frequency.unwrap_or_default(),
            r.power.unwrap_or_default()
        );
    }
    println!();
    print!("{}", summary.hourly);
    Ok(())
}

fn load(args: &Args, config: &SpecscopeConfig) -> anyhow::Result<Vec<RawReading>> {
    match args.source {
        Source::Simulated => source::simulated_readings(config, args.samples),
        Source::Csv => {
            let Some(path) = &args.csv_path else {
                bail!("--csv-path is required with --source csv");
            };
            Ok(dataset::read_csv(path, &REQUIRED_COLUMNS)?.raw_readings())
        }
    }
}
