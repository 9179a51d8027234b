//! Per-neuron developmental clocks and the lifecycle state machine.
//!
//! Everything here is plain value state. [`advance_cycle`] and
//! [`check_differentiation`] are pure: they take the current state, the
//! clocks and the random draws for this cycle and return the next state,
//! the next clocks and the events the caller must apply. Applying events
//! (creating segments, stopping growth cones) is the neuron's job.

use serde::{Deserialize, Serialize};

use crate::{config::ensure_rates, error::Result};

/// How a clock turns its rate into firings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Each cycle fires with probability `min(rate, 1)`.
    #[default]
    Stochastic,
    /// `rate` accumulates every cycle; the clock fires whenever the total
    /// reaches 1.
    Deterministic,
}

/// Lifecycle of a neuron.
///
/// `Quiescent` is only ever the initial state and `Differentiated` is
/// terminal; `Growing` and `Branching` alternate freely in between.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NeuronState {
    #[default]
    Quiescent,
    Growing,
    Branching,
    Differentiated,
}

/// Side effect requested by a clock firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Grow,
    Branch,
    Differentiate,
}

/// A single counter tracking progress toward one event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Clock {
    pub rate: f64,
    /// Progress toward the next firing in deterministic mode.
    pub accumulated: f64,
    /// Cycles elapsed since this clock last fired.
    pub since_fired: u64,
    /// Total number of firings.
    pub fired: u64,
}

impl Clock {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }

    /// Advances one cycle; `draw` is a uniform sample in `[0, 1)`.
    #[must_use]
    pub fn tick(self, mode: ClockMode, draw: f64) -> (Self, bool) {
        let mut next = self;
        let fires = match mode {
            ClockMode::Stochastic => draw < self.rate.min(1.0),
            ClockMode::Deterministic => {
                next.accumulated += self.rate;
                if next.accumulated >= 1.0 {
                    // At most one firing per cycle; cap the backlog.
                    next.accumulated = (next.accumulated - 1.0).min(1.0);
                    true
                } else {
                    false
                }
            }
        };
        if fires {
            next.since_fired = 0;
            next.fired += 1;
        } else {
            next.since_fired += 1;
        }
        (next, fires)
    }
}

/// The three independent clocks owned by a neuron.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Clocks {
    pub growth: Clock,
    pub branch: Clock,
    pub differentiation: Clock,
}

impl Clocks {
    pub fn new(growth_rate: f64, branch_rate: f64, differentiation_rate: f64) -> Self {
        Self {
            growth: Clock::new(growth_rate),
            branch: Clock::new(branch_rate),
            differentiation: Clock::new(differentiation_rate),
        }
    }

    /// Replaces the three rates, keeping accumulated progress.
    ///
    /// ### Errors
    /// `Configuration` if any rate is negative or not finite.
    pub fn set_clocks(
        &mut self,
        growth_rate: f64,
        branch_rate: f64,
        differentiation_rate: f64,
    ) -> Result<()> {
        ensure_rates(growth_rate, branch_rate, differentiation_rate)?;
        self.growth.rate = growth_rate;
        self.branch.rate = branch_rate;
        self.differentiation.rate = differentiation_rate;
        Ok(())
    }
}

/// Uniform samples consumed by one call to [`advance_cycle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleDraws {
    pub growth: f64,
    pub branch: f64,
}

/// One biological cycle of growth and branching.
///
/// Growth is applied before branching, so a quiescent neuron whose two
/// clocks fire together first sprouts and then branches. Branching never
/// fires for a neuron that has not started growing.
#[must_use]
pub fn advance_cycle(
    state: NeuronState,
    clocks: Clocks,
    mode: ClockMode,
    draws: CycleDraws,
) -> (NeuronState, Clocks, Vec<ClockEvent>) {
    if state == NeuronState::Differentiated {
        return (state, clocks, Vec::new());
    }

    let (growth, grow) = clocks.growth.tick(mode, draws.growth);
    let (branch, branch_fired) = clocks.branch.tick(mode, draws.branch);
    let next_clocks = Clocks {
        growth,
        branch,
        ..clocks
    };

    let mut next = state;
    let mut events = Vec::with_capacity(2);
    if grow {
        next = NeuronState::Growing;
        events.push(ClockEvent::Grow);
    }
    if branch_fired && next != NeuronState::Quiescent {
        next = NeuronState::Branching;
        events.push(ClockEvent::Branch);
    }
    (next, next_clocks, events)
}

/// One differentiation check.
#[must_use]
pub fn check_differentiation(
    state: NeuronState,
    clocks: Clocks,
    mode: ClockMode,
    draw: f64,
) -> (NeuronState, Clocks, Option<ClockEvent>) {
    if state == NeuronState::Differentiated {
        return (state, clocks, None);
    }
    let (differentiation, fired) = clocks.differentiation.tick(mode, draw);
    let next_clocks = Clocks {
        differentiation,
        ..clocks
    };
    if fired {
        (
            NeuronState::Differentiated,
            next_clocks,
            Some(ClockEvent::Differentiate),
        )
    } else {
        (state, next_clocks, None)
    }
}
