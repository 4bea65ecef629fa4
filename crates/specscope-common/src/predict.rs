//! Prediction facade: single-reading and batch inference over any
//! [`Classifier`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dataset::{self, REQUIRED_COLUMNS};
use crate::enrich::{TimestampPolicy, enrich};
use crate::error::{Result, SpecscopeError};
use crate::model::Classifier;
use crate::models::{FeatureVector, Prediction, Reading};

/// Rows shown in the replay summary.
pub const PREVIEW_ROWS: usize = 10;

/// Round a probability to two decimals, ties to even (0.125 -> 0.12).
pub fn round_confidence(p: f64) -> f64 {
    (p * 100.0).round_ties_even() / 100.0
}

/// Immutable handle to a loaded classifier, shared by the HTTP service and
/// batch replay.
#[derive(Clone)]
pub struct Predictor {
    classifier: Arc<dyn Classifier>,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor").finish_non_exhaustive()
    }
}

impl Predictor {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn from_classifier(classifier: impl Classifier + 'static) -> Self {
        Self::new(Arc::new(classifier))
    }

    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        Prediction {
            interference: self.classifier.predict_label(features),
            confidence: round_confidence(self.classifier.predict_proba(features)),
        }
    }

    pub fn predict_batch(&self, rows: &[FeatureVector]) -> Vec<Prediction> {
        rows.iter().map(|f| self.predict(f)).collect()
    }
}

/// Outcome of a batch replay.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub output_path: PathBuf,
    /// Predicted rows in input order.
    pub rows: Vec<(Reading, Prediction)>,
    /// Input rows dropped for an unparseable timestamp.
    pub dropped: usize,
}

impl ReplayOutcome {
    pub fn positives(&self) -> usize {
        self.rows.iter().filter(|(_, p)| p.interference).count()
    }
}

impl fmt::Display for ReplayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Predictions saved to: {}", self.output_path.display())?;
        writeln!(f, "Rows: {}  Interference: {}  Dropped: {}", self.rows.len(), self.positives(), self.dropped)?;
        writeln!(
            f,
            "{:<28} {:>10} {:>8} {:>12} {:>10}",
            "timestamp", "frequency", "power", "interference", "confidence"
        )?;
        for (reading, prediction) in self.rows.iter().take(PREVIEW_ROWS) {
            writeln!(
                f,
                "{:<28} {:>10.2} {:>8.2} {:>12} {:>10.2}",
                reading.timestamp.to_string(),
                reading.frequency.unwrap_or_default(),
                reading.power.unwrap_or_default(),
                u8::from(prediction.interference),
                prediction.confidence
            )?;
        }
        Ok(())
    }
}

/// Predict every row of a CSV file and write `<stem>_with_predictions.csv`
/// beside it.
///
/// Rows with an unparseable timestamp are dropped. Any other problem aborts
/// the run before the output file is created.
pub fn replay_csv(path: &Path, predictor: &Predictor) -> Result<ReplayOutcome> {
    let dataset = dataset::read_csv(path, &REQUIRED_COLUMNS)?;
    let enriched = enrich(&dataset.raw_readings(), TimestampPolicy::DropInvalid)?;
    let dropped: HashSet<usize> = enriched.dropped.iter().copied().collect();

    let kept: Vec<_> = dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(idx, _)| !dropped.contains(idx))
        .map(|(_, row)| row)
        .collect();

    let features = kept
        .iter()
        .zip(&enriched.readings)
        .map(|(row, reading)| {
            reading.feature_vector().ok_or_else(|| SpecscopeError::MissingValue {
                row: row.line,
                column: "frequency/power/latitude/longitude".into(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let predictions = predictor.predict_batch(&features);

    let mut rows = Vec::with_capacity(predictions.len());
    let mut records = Vec::with_capacity(predictions.len());
    for ((row, reading), prediction) in kept.iter().zip(enriched.readings).zip(predictions) {
        records.push((&row.record, prediction));
        rows.push((reading.with_interference(prediction.interference), prediction));
    }

    let output_path = dataset::predictions_output_path(path);
    dataset::write_predictions(&output_path, &dataset.headers, &records)?;

    let outcome = ReplayOutcome {
        output_path,
        rows,
        dropped: dropped.len(),
    };
    tracing::info!(
        input = %path.display(),
        output = %outcome.output_path.display(),
        rows = outcome.rows.len(),
        positives = outcome.positives(),
        dropped = outcome.dropped,
        "replay complete"
    );
    Ok(outcome)
}
