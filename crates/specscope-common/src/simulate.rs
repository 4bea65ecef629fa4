//! Sources of spectrum readings for the scripts that do not read a file.
//!
//! [`DataSource`] produces a batch of raw readings for a sample count.
//! [`SubprocessSimulator`] runs an external program that writes a JSON
//! array to a file; [`SyntheticSpectrum`] generates a sweep in-process.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngExt as _;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use crate::dataset;
use crate::error::{Result, SpecscopeError};
use crate::models::RawReading;

/// Produces raw readings on demand.
pub trait DataSource: Send + Sync {
    fn readings(&self, samples: usize) -> Result<Vec<RawReading>>;
}

// ── External simulator ──────────────────────────────────────────────

/// Runs `program [args..] <path> <samples>` and reads the JSON array it
/// writes to `path`. Blocks until the process exits.
///
/// Every call hands the program a fresh path inside a scratch directory
/// next to `output`, so a file left over from an earlier run is never read
/// and concurrent calls never share a file. A successful sweep is then
/// moved to `output`.
#[derive(Debug, Clone)]
pub struct SubprocessSimulator {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub output: PathBuf,
}

impl SubprocessSimulator {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            output: output.into(),
        }
    }

    /// Build from a command line such as `["go", "run", "simulate.go"]`.
    pub fn from_command(command: &[String], output: impl Into<PathBuf>) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| SpecscopeError::Simulator("empty simulator command".into()))?;
        Ok(Self::new(program, args.to_vec(), output))
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let parent = match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        tempfile::Builder::new()
            .prefix(".specscope-sim-")
            .tempdir_in(parent)
            .map_err(|e| SpecscopeError::io(parent, e))
    }

    fn run(&self, path: &Path, samples: usize) -> Result<()> {
        tracing::info!(
            program = %self.program.display(),
            output = %path.display(),
            samples,
            "running simulator"
        );
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .arg(samples.to_string())
            .status()
            .map_err(|e| {
                SpecscopeError::Simulator(format!("failed to start {}: {e}", self.program.display()))
            })?;
        if !status.success() {
            return Err(SpecscopeError::Simulator(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }
        Ok(())
    }
}

impl DataSource for SubprocessSimulator {
    fn readings(&self, samples: usize) -> Result<Vec<RawReading>> {
        let scratch = self.scratch_dir()?;
        let file_name = self
            .output
            .file_name()
            .unwrap_or_else(|| OsStr::new("simulated_output.json"));
        let path = scratch.path().join(file_name);

        self.run(&path, samples)?;
        let readings = dataset::read_json(&path).map_err(|e| match e {
            SpecscopeError::MissingFile(_) => SpecscopeError::Simulator(format!(
                "{} exited without writing its output",
                self.program.display()
            )),
            SpecscopeError::Json(e) => {
                SpecscopeError::Simulator(format!("malformed simulator output: {e}"))
            }
            other => other,
        })?;

        if let Err(e) = std::fs::rename(&path, &self.output) {
            tracing::warn!(output = %self.output.display(), "could not keep simulator output: {e}");
        }
        Ok(readings)
    }
}

// ── Built-in generator ──────────────────────────────────────────────

/// In-process spectrum sweep with a band-specific power profile.
///
/// Frequencies step linearly from `start_mhz` towards `end_mhz`; timestamps
/// are 1 ms apart starting at `start`.
#[derive(Debug, Clone)]
pub struct SyntheticSpectrum {
    pub start_mhz: f64,
    pub end_mhz: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Width of the uniform jitter added to the coordinates.
    pub coordinate_jitter: f64,
    pub start: Option<DateTime<Utc>>,
    pub seed: Option<u64>,
}

impl Default for SyntheticSpectrum {
    fn default() -> Self {
        Self {
            start_mhz: 300.0,
            end_mhz: 2800.0,
            latitude: 37.0,
            longitude: -122.0,
            coordinate_jitter: 0.1,
            start: None,
            seed: None,
        }
    }
}

impl SyntheticSpectrum {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn generate(&self, samples: usize) -> Vec<RawReading> {
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);
        let start = self.start.unwrap_or_else(Utc::now);
        let step = if samples == 0 {
            0.0
        } else {
            (self.end_mhz - self.start_mhz) / samples as f64
        };

        (0..samples)
            .map(|i| {
                let frequency = self.start_mhz + i as f64 * step;
                let t = i as f64 / 10.0;
                let timestamp = start + Duration::milliseconds(i as i64);
                RawReading {
                    timestamp: Some(timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)),
                    frequency: Some(frequency),
                    power: Some(band_power(frequency, t, &mut rng)),
                    latitude: Some(self.latitude + rng.random::<f64>() * self.coordinate_jitter),
                    longitude: Some(self.longitude + rng.random::<f64>() * self.coordinate_jitter),
                    interference: None,
                }
            })
            .collect()
    }
}

impl DataSource for SyntheticSpectrum {
    fn readings(&self, samples: usize) -> Result<Vec<RawReading>> {
        Ok(self.generate(samples))
    }
}

/// Power in dBm for a frequency (MHz) at sweep time `t`.
fn band_power(freq: f64, t: f64, rng: &mut StdRng) -> f64 {
    let mut u = || rng.random::<f64>();
    match freq {
        // FM broadcast
        f if (88.0..=108.0).contains(&f) => 35.0 + u() * 5.0,
        // 2.4 GHz Wi-Fi
        f if (2400.0..=2485.0).contains(&f) => 25.0 + 10.0 * (0.2 * t).sin() + u() * 5.0,
        // AM broadcast
        f if (0.53..=1.7).contains(&f) => 10.0 + u() * 5.0,
        // GSM
        f if (850.0..=900.0).contains(&f) || (1800.0..=1900.0).contains(&f) => {
            30.0 + 5.0 * (0.5 * t).sin() + u() * 5.0
        }
        // GPS L1
        f if (1574.0..=1576.0).contains(&f) => -60.0 + u() * 3.0,
        // NOAA weather radio
        f if (162.4..=162.55).contains(&f) => 45.0 + u() * 2.0,
        // Quiet zone
        f if (300.0..=350.0).contains(&f) => -80.0 + u() * 5.0,
        // Random spikes
        _ if u() < 0.01 => 50.0 + u() * 10.0,
        _ => -50.0 + 10.0 * (0.1 * t).sin() + u() * 10.0,
    }
}
