//! Synthetic sweep generator with the external simulator's interface:
//! `simulate <output> <samples>` writes a JSON array of readings.

use std::path::PathBuf;

use specscope_common::dataset;
use specscope_common::simulate::SyntheticSpectrum;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Output JSON file.
    pub output: PathBuf,

    /// Number of readings.
    pub samples: usize,

    /// Fixed RNG seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Sweep start in MHz.
    #[arg(long, default_value_t = 300.0)]
    pub start_mhz: f64,

    /// Sweep end in MHz.
    #[arg(long, default_value_t = 2800.0)]
    pub end_mhz: f64,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.start_mhz < args.end_mhz,
        "sweep start {} MHz must be below end {} MHz",
        args.start_mhz,
        args.end_mhz
    );
    let generator = SyntheticSpectrum {
        start_mhz: args.start_mhz,
        end_mhz: args.end_mhz,
        seed: args.seed,
        ..SyntheticSpectrum::default()
    };
    let readings = generator.generate(args.samples);
    dataset::write_json(&args.output, &readings)?;
    tracing::info!(
        output = %args.output.display(),
        samples = readings.len(),
        "simulated sweep written"
    );
    Ok(())
}
