//! Training-set construction and model evaluation.
//!
//! Ground truth comes from [`TrainingLabelPolicy`] (power > 30 dBm), never
//! from the monitoring threshold.

use std::collections::BTreeMap;
use std::fmt;

use rand::RngExt as _;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::enrich::{TimestampPolicy, enrich};
use crate::error::{Result, SpecscopeError};
use crate::labeling::TrainingLabelPolicy;
use crate::model::{Classifier, ForestParams, RandomForest};
use crate::models::{FeatureVector, N_FEATURES, RawReading, TimePeriod};

/// Labelled feature matrix.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<bool>,
    /// Row counts per training time period.
    pub time_periods: BTreeMap<TimePeriod, usize>,
    /// Rows inside the 2.4 GHz Wi-Fi band.
    pub wifi_rows: usize,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

/// Enrich and label raw training rows.
///
/// Every row must have a parseable timestamp and all five features.
pub fn build_training_set(raw: &[RawReading]) -> Result<TrainingSet> {
    let readings = enrich(raw, TimestampPolicy::Strict)?.readings;
    let policy = TrainingLabelPolicy;

    let mut set = TrainingSet::default();
    for (idx, reading) in readings.iter().enumerate() {
        let vector = reading.feature_vector().ok_or_else(|| SpecscopeError::MissingValue {
            row: idx + 1,
            column: "frequency/power/latitude/longitude".into(),
        })?;
        set.features.push(vector);
        set.labels.push(policy.label(reading));
        *set.time_periods.entry(reading.time_period).or_default() += 1;
        if reading.wifi_proximity {
            set.wifi_rows += 1;
        }
    }

    if set.is_empty() {
        return Err(SpecscopeError::EmptyDataset);
    }
    Ok(set)
}

/// Shuffled train/test index split. The test side gets
/// `ceil(n * test_fraction)` rows.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        idx.swap(i, j);
    }
    let n_test = ((n as f64 * test_fraction).ceil() as usize).min(n);
    let train = idx.split_off(n_test);
    (train, idx)
}

/// Precision/recall/F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation of a classifier on held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Index 0 = no interference, 1 = interference.
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub total: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationReport {
    pub fn from_predictions(truth: &[bool], predicted: &[bool]) -> Self {
        let mut confusion = [[0usize; 2]; 2];
        for (&t, &p) in truth.iter().zip(predicted) {
            confusion[usize::from(t)][usize::from(p)] += 1;
        }
        let metrics = |class: usize| {
            let tp = confusion[class][class];
            let support = confusion[class][0] + confusion[class][1];
            let predicted = confusion[0][class] + confusion[1][class];
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        };
        let total = truth.len().min(predicted.len());
        Self {
            classes: [metrics(0), metrics(1)],
            accuracy: ratio(confusion[0][0] + confusion[1][1], total),
            total,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for (class, m) in self.classes.iter().enumerate() {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>14} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.total)
    }
}

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForest,
    pub report: ClassificationReport,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Split, fit, and evaluate.
pub fn train(set: &TrainingSet, params: ForestParams, test_fraction: f64) -> Result<TrainingOutcome> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SpecscopeError::Config(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    let (train_idx, test_idx) = train_test_split(set.len(), test_fraction, params.seed);
    if train_idx.is_empty() {
        return Err(SpecscopeError::EmptyDataset);
    }

    let x_train: Vec<[f64; N_FEATURES]> = train_idx.iter().map(|&i| set.features[i].to_array()).collect();
    let y_train: Vec<bool> = train_idx.iter().map(|&i| set.labels[i]).collect();
    let model = RandomForest::fit(&x_train, &y_train, params)?;

    let truth: Vec<bool> = test_idx.iter().map(|&i| set.labels[i]).collect();
    let predicted: Vec<bool> = test_idx
        .iter()
        .map(|&i| model.predict_label(&set.features[i]))
        .collect();
    let report = ClassificationReport::from_predictions(&truth, &predicted);

    tracing::info!(
        train = train_idx.len(),
        test = test_idx.len(),
        accuracy = report.accuracy,
        "training complete"
    );

    Ok(TrainingOutcome {
        model,
        report,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    })
}
