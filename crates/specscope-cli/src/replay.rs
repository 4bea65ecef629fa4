//! Batch prediction over a CSV file.

use std::path::PathBuf;

use anyhow::Context;

use specscope_common::config::SpecscopeConfig;
use specscope_common::model::RandomForest;
use specscope_common::predict::{Predictor, replay_csv};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// CSV file with timestamp, frequency, power, latitude and longitude.
    pub path: PathBuf,

    /// Trained model artifact (defaults to the configured path).
    #[arg(long)]
    pub model: Option<PathBuf>,
}

pub fn run(args: Args, config: &SpecscopeConfig) -> anyhow::Result<()> {
    let model_path = args.model.unwrap_or_else(|| config.model_path.clone());
    let model = RandomForest::load(&model_path)
        .with_context(|| format!("cannot load model {}", model_path.display()))?;
    let predictor = Predictor::from_classifier(model);

    let outcome = replay_csv(&args.path, &predictor)?;
    print!("{outcome}");
    Ok(())
}
