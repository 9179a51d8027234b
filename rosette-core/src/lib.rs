//! Core 3-D neurite growth and cell mechanics library.
//!
//! Main components:
//! - [`container`] — the simulation world and its update operations.
//! - [`neuron`] — somata, their neurite trees and cycle behaviour.
//! - [`neurite`] — cylindrical neurite segments and tree topology.
//! - [`clocks`] — growth, branch and differentiation clocks.
//! - [`phases`] — the physics pipeline run once per timestep.
//! - [`potentials`] — repulsion and adhesion force laws.
//! - [`cylinder`] — sphere and cylinder contact geometry.
//! - [`grid`] — uniform spatial grid for neighbour queries.
//! - [`forces`] — per-step force accumulation.
//! - [`frame`] — snapshots for renderers.
//! - [`config`] — run-wide parameters.
//! - [`error`] — the crate error type.
//! - [`rng`] — seeded per-neuron random streams.
//! - [`types`] — shared ids.

pub mod clocks;
pub mod config;
pub mod container;
pub mod cylinder;
pub mod error;
pub mod forces;
pub mod frame;
pub mod grid;
pub mod neurite;
pub mod neuron;
pub mod phases;
pub mod potentials;
pub mod rng;
pub mod types;

pub use config::Config;
pub use container::{Container, CycleReport};
pub use error::{Result, SimError};
pub use neuron::{Cell, Neuron};
