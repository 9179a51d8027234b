//! Run file parsing.
//!
//! A run file is TOML with three optional sections:
//! `[run]` for the driver cadence, `[tissue]` for the initial layout and
//! `[engine]` (with sub-tables such as `[engine.physics]`) for everything
//! the core library consumes.

use std::path::Path;

use anyhow::{Context, bail};
use rosette_core::Config;
use serde::{Deserialize, Serialize};

/// Driver cadence in simulated time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RunSettings {
    pub total_time: f64,
    /// Simulated time between two biological cycles.
    pub cycle_interval: f64,
    /// Physics steps between two written frames.
    pub frame_every: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            total_time: 100.0,
            cycle_interval: 1.0,
            frame_every: 10,
        }
    }
}

/// Initial ring of neurons around a common centre.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TissueSettings {
    pub neurons: usize,
    pub ring_radius: f64,
}

impl Default for TissueSettings {
    fn default() -> Self {
        Self {
            neurons: 9,
            ring_radius: 24.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RunConfig {
    pub run: RunSettings,
    pub tissue: TissueSettings,
    pub engine: Config,
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading run file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in run file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(text).context("parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the driver settings; engine parameters are checked by the
    /// container itself.
    pub fn validate(&self) -> anyhow::Result<()> {
        let run = &self.run;
        if !(run.total_time.is_finite() && run.total_time >= 0.0) {
            bail!("run.total_time must be non-negative, got {}", run.total_time);
        }
        if !(run.cycle_interval.is_finite() && run.cycle_interval > 0.0) {
            bail!(
                "run.cycle_interval must be positive, got {}",
                run.cycle_interval
            );
        }
        if run.frame_every == 0 {
            bail!("run.frame_every must be at least 1");
        }
        if !(self.tissue.ring_radius.is_finite() && self.tissue.ring_radius >= 0.0) {
            bail!(
                "tissue.ring_radius must be non-negative, got {}",
                self.tissue.ring_radius
            );
        }
        Ok(())
    }

    /// Physics steps needed to cover `total_time`.
    pub fn total_steps(&self) -> u64 {
        (self.run.total_time / self.engine.physics.timestep).round() as u64
    }

    /// Physics steps between two cycles, at least one.
    pub fn steps_per_cycle(&self) -> u64 {
        ((self.run.cycle_interval / self.engine.physics.timestep).round() as u64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosette_core::clocks::ClockMode;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = RunConfig::parse("").expect("defaults are valid");
        assert_eq!(cfg, RunConfig::default());
        assert_eq!(cfg.total_steps(), 1000);
        assert_eq!(cfg.steps_per_cycle(), 10);
    }

    #[test]
    fn nested_engine_tables_override_defaults() {
        let cfg = RunConfig::parse(
            r#"
            [run]
            total_time = 5.0

            [engine]
            seed = 7

            [engine.physics]
            timestep = 0.5

            [engine.clocks]
            mode = "deterministic"
            growth_rate = 0.5
            "#,
        )
        .expect("valid run file");

        assert_eq!(cfg.engine.seed, 7);
        assert_eq!(cfg.engine.physics.timestep, 0.5);
        assert_eq!(cfg.engine.physics.viscosity, 7.96);
        assert_eq!(cfg.engine.clocks.mode, ClockMode::Deterministic);
        assert_eq!(cfg.total_steps(), 10);
        assert_eq!(cfg.steps_per_cycle(), 2);
    }

    #[test]
    fn rejects_bad_cadence() {
        assert!(RunConfig::parse("[run]\ncycle_interval = 0.0").is_err());
        assert!(RunConfig::parse("[run]\nframe_every = 0").is_err());
        assert!(RunConfig::parse("[tissue]\nring_radius = -1.0").is_err());
    }

    #[test]
    fn bundled_run_file_parses() {
        let cfg = RunConfig::parse(include_str!("../../config/rosette.toml"))
            .expect("bundled run file is valid");
        assert_eq!(cfg.tissue.neurons, 9);
        assert_eq!(cfg.engine.seed, 42);
        assert!(cfg.engine.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(RunConfig::parse("[run\n").is_err());
    }
}
