//! Simulation parameters.
//!
//! Every section has a `Default` and deserializes with `#[serde(default)]`,
//! so a caller may load a partial document from whatever source it likes.
//! The core never reads files itself; it only checks the values through
//! [`Config::validate`] before a [`crate::container::Container`] is built.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{
    clocks::ClockMode,
    error::{Result, SimError},
    grid,
    potentials::Potentials,
};

/// Overdamped integration parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    pub timestep: f64,
    pub viscosity: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            timestep: 0.1,
            viscosity: 7.96,
        }
    }
}

/// Bounds and resolution of the spatial grid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub min: DVec3,
    pub max: DVec3,
    pub cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::cube(-200.0, 200.0, 20.0)
    }
}

impl GridConfig {
    /// A cubic domain `[min, max]^3`.
    pub fn cube(min: f64, max: f64, cell_size: f64) -> Self {
        Self {
            min: DVec3::splat(min),
            max: DVec3::splat(max),
            cell_size,
        }
    }
}

/// Soma defaults used by [`crate::container::Container::create_new_neuron`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CellConfig {
    pub radius: f64,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self { radius: 8.0 }
    }
}

/// Neurite segment geometry and mechanics.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct NeuriteConfig {
    /// Rest length of a freshly created segment.
    pub default_length: f64,
    pub radius: f64,
    pub spring_constant: f64,
    /// Magnitude of the bias pulling growing tips along their axis.
    pub outgrowth_force: f64,
    /// Angle in radians between a branch and its parent's axis.
    pub branch_angle: f64,
    pub max_segments: usize,
}

impl Default for NeuriteConfig {
    fn default() -> Self {
        Self {
            default_length: 10.0,
            radius: 0.5,
            spring_constant: 10.0,
            outgrowth_force: 2.0,
            branch_angle: std::f64::consts::FRAC_PI_6,
            max_segments: 16,
        }
    }
}

/// Default clock rates given to new neurons, and how rates are read.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ClockConfig {
    pub mode: ClockMode,
    pub growth_rate: f64,
    pub branch_rate: f64,
    pub differentiation_rate: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            mode: ClockMode::Stochastic,
            growth_rate: 0.3,
            branch_rate: 0.05,
            differentiation_rate: 0.01,
        }
    }
}

/// Top-level construction parameters for a simulation run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub physics: PhysicsConfig,
    pub grid: GridConfig,
    pub cell: CellConfig,
    pub neurite: NeuriteConfig,
    pub potentials: Potentials,
    pub clocks: ClockConfig,
    pub seed: u64,
}

impl Config {
    /// Rejects any parameter the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("physics.timestep", self.physics.timestep)?;
        ensure_positive("physics.viscosity", self.physics.viscosity)?;

        grid::grid_dims(&self.grid)?;

        ensure_positive("cell.radius", self.cell.radius)?;

        ensure_positive("neurite.default_length", self.neurite.default_length)?;
        ensure_positive("neurite.radius", self.neurite.radius)?;
        ensure_non_negative("neurite.spring_constant", self.neurite.spring_constant)?;
        ensure_non_negative("neurite.outgrowth_force", self.neurite.outgrowth_force)?;
        ensure_non_negative("neurite.branch_angle", self.neurite.branch_angle)?;

        let (rc, rn) = (self.cell.radius, self.neurite.radius);
        self.potentials.cell_cell.validate("potentials.cell_cell", rc, rc)?;
        self.potentials
            .cell_neurite
            .validate("potentials.cell_neurite", rc, rn)?;
        self.potentials
            .neurite_neurite
            .validate("potentials.neurite_neurite", rn, rn)?;

        ensure_rates(
            self.clocks.growth_rate,
            self.clocks.branch_rate,
            self.clocks.differentiation_rate,
        )
    }
}

pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::configuration(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::configuration(format!(
            "{name} must be non-negative, got {value}"
        )))
    }
}

pub(crate) fn ensure_rates(growth: f64, branch: f64, differentiation: f64) -> Result<()> {
    ensure_non_negative("growth_rate", growth)?;
    ensure_non_negative("branch_rate", branch)?;
    ensure_non_negative("differentiation_rate", differentiation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_timestep_viscosity_and_cell_size() {
        let mut cfg = Config::default();
        cfg.physics.timestep = 0.0;
        assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));

        let mut cfg = Config::default();
        cfg.physics.viscosity = -1.0;
        assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));

        let mut cfg = Config::default();
        cfg.grid.cell_size = 0.0;
        assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));
    }

    #[test]
    fn rejects_cell_size_that_needs_too_many_buckets() {
        let mut cfg = Config::default();
        cfg.grid.cell_size = 1e-4;
        assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));
    }

    #[test]
    fn rejects_nan_timestep() {
        let mut cfg = Config::default();
        cfg.physics.timestep = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let mut cfg = Config::default();
        cfg.grid.min.y = 300.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_negative_clock_rate() {
        let mut cfg = Config::default();
        cfg.clocks.branch_rate = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_potential_cutoff() {
        let mut cfg = Config::default();
        cfg.potentials.neurite_neurite.repulsion_margin = -1.0;
        assert!(cfg.validate().is_err());
    }
}
