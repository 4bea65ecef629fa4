//! Classifier training.

use std::path::PathBuf;

use specscope_common::config::SpecscopeConfig;
use specscope_common::dataset;
use specscope_common::models::TimePeriod;
use specscope_common::training::{TrainingOutcome, TrainingSet, build_training_set, train};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// JSON training data (defaults to the configured path).
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Where to write the model artifact.
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Number of trees.
    #[arg(long)]
    pub estimators: Option<usize>,

    /// Seed for the split and bootstrap sampling.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: Args, config: &SpecscopeConfig) -> anyhow::Result<()> {
    let data = args.data.unwrap_or_else(|| config.training.data.clone());
    let model_path = args.model.unwrap_or_else(|| config.model_path.clone());
    let mut params = config.training.forest;
    if let Some(n) = args.estimators {
        anyhow::ensure!(n > 0, "--estimators must be positive");
        params.n_estimators = n;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }

    let raw = dataset::read_json(&data)?;
    let set = build_training_set(&raw)?;
    print_distribution(&set);

    let outcome = train(&set, params, config.training.test_fraction)?;
    print_outcome(&outcome);

    outcome.model.save(&model_path)?;
    println!("\nModel saved to {}", model_path.display());
    Ok(())
}

fn print_distribution(set: &TrainingSet) {
    println!(
        "Training rows: {}  interference: {}  wifi_proximity: {}",
        set.len(),
        set.positives(),
        set.wifi_rows
    );
    for period in TimePeriod::ALL {
        let count = set.time_periods.get(&period).copied().unwrap_or(0);
        println!("  time_period {period:<10} {count:>6}");
    }
}

fn print_outcome(outcome: &TrainingOutcome) {
    println!(
        "\nClassification report ({} train / {} test rows):\n",
        outcome.train_rows, outcome.test_rows
    );
    print!("{}", outcome.report);
}

#[cfg(test)]
mod tests {
    use super::*;

    use specscope_common::model::RandomForest;
    use specscope_common::simulate::SyntheticSpectrum;

    #[test]
    fn trains_and_saves_a_loadable_model() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("rf_data.json");
        let model = dir.path().join("rf_model.json");
        dataset::write_json(&data, &SyntheticSpectrum::seeded(4).generate(300)).unwrap();

        run(
            Args {
                data: Some(data),
                model: Some(model.clone()),
                estimators: Some(8),
                seed: None,
            },
            &SpecscopeConfig::default(),
        )
        .unwrap();
        assert_eq!(RandomForest::load(&model).unwrap().n_trees(), 8);
    }

    #[test]
    fn missing_data_writes_no_model() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("rf_model.json");
        let result = run(
            Args {
                data: Some(dir.path().join("absent.json")),
                model: Some(model.clone()),
                estimators: None,
                seed: None,
            },
            &SpecscopeConfig::default(),
        );
        assert!(result.is_err());
        assert!(!model.exists());
    }
}
