//! Error types for the simulation core.
//!
//! Every failure surfaced here is a contract violation by the caller or an
//! internal invariant violation; nothing in the core is transient, so none
//! of these are meant to be retried.

use thiserror::Error;

use crate::types::NeuronId;

/// Main error type for simulation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid construction parameters (timestep, viscosity, cell size,
    /// cutoffs, coefficients, axes).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A neuron that already carries an id was registered again.
    #[error("Neuron {0} is already registered")]
    DuplicateRegistration(NeuronId),

    /// A neurite refers to a parent that is not in its neuron's tree.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Lookup of a neuron id that the container never handed out.
    #[error("Unknown neuron: {0}")]
    UnknownNeuron(NeuronId),
}

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a new topology error.
    #[must_use]
    pub fn topology<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTopology(msg.into())
    }
}
