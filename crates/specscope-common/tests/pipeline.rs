//! End-to-end pipeline tests: CSV load → enrich → label → report, and
//! batch replay through the prediction facade.

use std::path::{Path, PathBuf};

use specscope_common::SpecscopeError;
use specscope_common::dataset::{self, REQUIRED_COLUMNS};
use specscope_common::enrich::{TimestampPolicy, enrich, reenrich};
use specscope_common::labeling::{ThresholdPolicy, filter_band};
use specscope_common::model::Classifier;
use specscope_common::models::{Band, FeatureVector, RawReading};
use specscope_common::predict::{Predictor, replay_csv};
use specscope_common::report::{GroupKey, aggregate, overall_rate};
use specscope_common::simulate::{DataSource, SyntheticSpectrum};

const TWO_ROWS: &str = "timestamp,frequency,power,latitude,longitude\n\
                        2024-01-15T08:00:00,2450,-5,40.0,-74.0\n\
                        2024-01-15T08:00:00,900,-20,40.0,-74.0\n";

fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

struct Always(f64);

impl Classifier for Always {
    fn predict_proba(&self, _features: &FeatureVector) -> f64 {
        self.0
    }
}

/// Fixed readings in place of the simulator process.
struct Fixture(Vec<RawReading>);

impl DataSource for Fixture {
    fn readings(&self, samples: usize) -> specscope_common::Result<Vec<RawReading>> {
        Ok(self.0.iter().take(samples).cloned().collect())
    }
}

#[test]
fn band_threshold_and_hourly_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), "scan.csv", TWO_ROWS);

    let ds = dataset::read_csv(&path, &REQUIRED_COLUMNS).unwrap();
    let readings = enrich(&ds.raw_readings(), TimestampPolicy::DropInvalid)
        .unwrap()
        .readings;

    let band = filter_band(&readings, Band::new(2400.0, 2500.0));
    assert_eq!(band.len(), 1);
    assert_eq!(band[0].frequency, Some(2450.0));

    let policy = ThresholdPolicy::new(-10.0);
    let flagged = policy.detect(&band);
    assert_eq!(flagged.len(), 1);

    let report = aggregate(&policy.label(&band), GroupKey::Hour);
    assert_eq!(report.buckets.len(), 1);
    let hour8 = report.bucket("8").unwrap();
    assert_eq!(hour8.count, 1);
    assert_eq!(hour8.sum, 1);
    assert_eq!(hour8.percentage, 100.0);
}

#[test]
fn missing_interference_column_reports_zero_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), "scan.csv", TWO_ROWS);

    let ds = dataset::read_csv(&path, &REQUIRED_COLUMNS).unwrap();
    assert!(!ds.has_column("interference"));
    let readings = enrich(&ds.raw_readings(), TimestampPolicy::Strict)
        .unwrap()
        .readings;

    for key in GroupKey::ALL {
        let report = aggregate(&readings, key);
        assert_eq!(report.total_count(), 2);
        assert!(report.buckets.iter().all(|b| b.percentage == 0.0), "{key}");
    }
    assert_eq!(overall_rate(&readings), Some(0.0));
}

#[test]
fn weighted_bucket_rates_match_overall_rate() {
    let raw = SyntheticSpectrum::seeded(11).generate(400);
    let readings = enrich(&raw, TimestampPolicy::Strict).unwrap().readings;
    let labelled = ThresholdPolicy::default().label(&readings);
    let overall = overall_rate(&labelled).unwrap();

    for key in GroupKey::ALL {
        let report = aggregate(&labelled, key);
        assert_eq!(report.total_count(), labelled.len());
        let weighted: f64 = report
            .buckets
            .iter()
            .map(|b| b.percentage * b.count as f64)
            .sum::<f64>()
            / report.total_count() as f64;
        assert!((weighted - overall).abs() < 1e-9, "{key}: {weighted} vs {overall}");
    }
}

#[test]
fn enrichment_is_idempotent() {
    let raw = SyntheticSpectrum::seeded(5).generate(50);
    let once = enrich(&raw, TimestampPolicy::Strict).unwrap().readings;
    assert_eq!(reenrich(&once), once);
}

#[test]
fn missing_power_column_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        dir.path(),
        "broken.csv",
        "timestamp,frequency,latitude,longitude\n2024-01-15T08:00:00,2450,40.0,-74.0\n",
    );

    let err = replay_csv(&path, &Predictor::from_classifier(Always(0.9))).unwrap_err();
    match err {
        SpecscopeError::MissingColumns { missing, .. } => assert_eq!(missing, vec!["power"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dataset::predictions_output_path(&path).exists());
}

#[test]
fn missing_input_file_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.csv");
    let err = replay_csv(&path, &Predictor::from_classifier(Always(0.9))).unwrap_err();
    assert!(matches!(err, SpecscopeError::MissingFile(_)));
    assert!(!dataset::predictions_output_path(&path).exists());
}

#[test]
fn replay_with_substitute_classifier() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), "scan.csv", TWO_ROWS);

    let outcome = replay_csv(&path, &Predictor::from_classifier(Always(0.125))).unwrap();
    assert_eq!(outcome.rows.len(), 2);
    assert_eq!(outcome.positives(), 0);
    assert!(outcome.rows.iter().all(|(_, p)| p.confidence == 0.12));

    let written = dataset::read_csv(&outcome.output_path, &REQUIRED_COLUMNS).unwrap();
    assert!(written.has_column("confidence"));
    assert_eq!(written.rows.len(), 2);
    assert_eq!(written.rows[0].raw.interference, Some(false));
}

#[test]
fn injected_source_feeds_the_pipeline() {
    let source = Fixture(SyntheticSpectrum::seeded(2).generate(300));
    assert_eq!(source.readings(120).unwrap().len(), 120);
    let raw = source.readings(300).unwrap();

    let readings = enrich(&raw, TimestampPolicy::DropInvalid).unwrap().readings;
    let wifi = filter_band(&readings, Band::WIFI_2G4);
    assert!(!wifi.is_empty());
    assert!(wifi.iter().all(|r| r.wifi_proximity));
}
