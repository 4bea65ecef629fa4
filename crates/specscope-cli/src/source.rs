//! Simulated reading source selection.

use anyhow::Context;

use specscope_common::config::SpecscopeConfig;
use specscope_common::models::RawReading;
use specscope_common::simulate::{DataSource, SubprocessSimulator};

/// The configured simulator process, or this binary's own `simulate`
/// subcommand when none is configured.
pub fn simulator(config: &SpecscopeConfig) -> anyhow::Result<SubprocessSimulator> {
    let output = config.simulator.output.clone();
    if !config.simulator.command.is_empty() {
        return Ok(SubprocessSimulator::from_command(&config.simulator.command, output)?);
    }
    let exe = std::env::current_exe().context("cannot locate the specscope executable")?;
    Ok(SubprocessSimulator::new(exe, vec!["simulate".into()], output))
}

/// Run the simulator for `samples` readings.
pub fn simulated_readings(config: &SpecscopeConfig, samples: usize) -> anyhow::Result<Vec<RawReading>> {
    let readings = simulator(config)?.readings(samples)?;
    tracing::info!(samples = readings.len(), "simulated readings loaded");
    Ok(readings)
}
