use glam::DVec3;
use rand::Rng;
use rand_chacha::ChaCha12Rng;

use crate::{
    clocks::{self, ClockEvent, ClockMode, Clocks, CycleDraws, NeuronState},
    config::{NeuriteConfig, ensure_positive},
    error::{Result, SimError},
    neurite::{Neurite, NeuriteTree},
    rng,
    types::{NeuronId, SegmentId},
};

/// The soma of a neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub position: DVec3,
    pub radius: f64,
}

impl Cell {
    pub fn new(position: DVec3, radius: f64) -> Self {
        Self { position, radius }
    }
}

/// What one cycle did to a neuron.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleOutcome {
    pub events: Vec<ClockEvent>,
    /// Segments created by this cycle, in creation order.
    pub new_segments: Vec<SegmentId>,
}

/// A cell body with its tree of neurite segments and its clocks.
///
/// A neuron is built and configured by the caller, then handed to
/// [`crate::container::Container::register_neuron`], which assigns its id
/// and random stream.
#[derive(Debug, Clone)]
pub struct Neuron {
    id: Option<NeuronId>,
    pub cell: Cell,
    pub neurites: NeuriteTree,
    pub clocks: Clocks,
    state: NeuronState,
    outgrowth_axis: Option<DVec3>,
    rng: ChaCha12Rng,
}

impl Neuron {
    pub fn new(position: DVec3, radius: f64) -> Self {
        Self::with_cell(Cell::new(position, radius))
    }

    pub fn with_cell(cell: Cell) -> Self {
        Self {
            id: None,
            cell,
            neurites: NeuriteTree::new(),
            clocks: Clocks::default(),
            state: NeuronState::Quiescent,
            outgrowth_axis: None,
            rng: rng::create_rng(0),
        }
    }

    /// Id assigned at registration.
    pub fn id(&self) -> Option<NeuronId> {
        self.id
    }

    pub fn state(&self) -> NeuronState {
        self.state
    }

    pub fn is_differentiated(&self) -> bool {
        self.state == NeuronState::Differentiated
    }

    pub fn outgrowth_axis(&self) -> Option<DVec3> {
        self.outgrowth_axis
    }

    /// Sets the direction the first neurite sprouts in.
    ///
    /// ### Errors
    /// `Configuration` if `axis` is zero or not finite.
    pub fn set_outgrowth_axis(&mut self, axis: DVec3) -> Result<()> {
        let unit = axis.normalize_or_zero();
        if unit == DVec3::ZERO {
            return Err(SimError::configuration(format!(
                "outgrowth axis must be a non-zero finite vector, got {axis}"
            )));
        }
        self.outgrowth_axis = Some(unit);
        Ok(())
    }

    /// Checks the neuron can join a simulation.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_positive("cell.radius", self.cell.radius)?;
        if !self.cell.position.is_finite() {
            return Err(SimError::configuration("cell position must be finite"));
        }
        self.neurites.validate()
    }

    /// Hands out the id and random stream; called once by the container.
    pub(crate) fn assign(&mut self, id: NeuronId, seed: u64) {
        self.id = Some(id);
        self.rng = rng::derive_neuron_rng(seed, id);
        if self.state == NeuronState::Quiescent && self.neurites.growing_tips().next().is_some() {
            self.state = NeuronState::Growing;
        }
    }

    /// Runs the growth and branch clocks for one cycle and applies whatever fired.
    pub fn advance_cycle(&mut self, mode: ClockMode, cfg: &NeuriteConfig) -> Result<CycleOutcome> {
        let draws = CycleDraws {
            growth: self.rng.random(),
            branch: self.rng.random(),
        };
        let (state, clocks, events) = clocks::advance_cycle(self.state, self.clocks, mode, draws);
        self.state = state;
        self.clocks = clocks;

        let mut new_segments = Vec::new();
        for event in &events {
            match event {
                ClockEvent::Grow => new_segments.extend(self.grow(cfg)?),
                ClockEvent::Branch => new_segments.extend(self.branch(cfg)?),
                ClockEvent::Differentiate => self.stop_growth(),
            }
        }
        Ok(CycleOutcome {
            events,
            new_segments,
        })
    }

    /// Runs the differentiation clock once; returns whether it fired.
    pub fn differentiate(&mut self, mode: ClockMode) -> bool {
        let draw: f64 = self.rng.random();
        let (state, clocks, event) =
            clocks::check_differentiation(self.state, self.clocks, mode, draw);
        self.state = state;
        self.clocks = clocks;
        if event == Some(ClockEvent::Differentiate) {
            self.stop_growth();
            true
        } else {
            false
        }
    }

    /// Extends every growth cone by one segment, or sprouts the first
    /// neurite from the soma if there is none yet.
    fn grow(&mut self, cfg: &NeuriteConfig) -> Result<Vec<SegmentId>> {
        if self.neurites.is_empty() {
            if cfg.max_segments == 0 {
                return Ok(Vec::new());
            }
            let axis = match self.outgrowth_axis {
                Some(axis) => axis,
                None => {
                    let axis = random_unit(&mut self.rng);
                    self.outgrowth_axis = Some(axis);
                    axis
                }
            };
            let start = self.cell.position + axis * self.cell.radius;
            let root = self.neurites.add_root(Neurite::new_root(
                start + axis * cfg.default_length,
                axis,
                cfg.radius,
                cfg.default_length,
            ));
            return Ok(vec![root]);
        }

        let tips: Vec<SegmentId> = self.neurites.growing_tips().collect();
        let mut created = Vec::with_capacity(tips.len());
        for tip in tips {
            if self.neurites.len() >= cfg.max_segments {
                tracing::debug!(neuron = ?self.id, "segment cap reached, growth dropped");
                break;
            }
            let (distal, axis) = {
                let t = &self.neurites.segments[tip];
                (t.distal, t.axis)
            };
            let child = self.neurites.add_child(
                tip,
                Neurite::new_child(
                    distal + axis * cfg.default_length,
                    axis,
                    cfg.radius,
                    cfg.default_length,
                    tip,
                ),
            )?;
            self.neurites.segments[tip].growing = false;
            created.push(child);
        }
        Ok(created)
    }

    /// Spawns a side branch from a randomly chosen growth cone.
    fn branch(&mut self, cfg: &NeuriteConfig) -> Result<Option<SegmentId>> {
        let tips: Vec<SegmentId> = self.neurites.growing_tips().collect();
        if tips.is_empty() {
            return Ok(None);
        }
        if self.neurites.len() >= cfg.max_segments {
            tracing::debug!(neuron = ?self.id, "segment cap reached, branch dropped");
            return Ok(None);
        }
        let tip = tips[self.rng.random_range(0..tips.len())];
        let (distal, parent_axis) = {
            let t = &self.neurites.segments[tip];
            (t.distal, t.axis)
        };
        let axis = deflect(parent_axis, cfg.branch_angle, self.rng.random());
        let child = self.neurites.add_child(
            tip,
            Neurite::new_child(
                distal + axis * cfg.default_length,
                axis,
                cfg.radius,
                cfg.default_length,
                tip,
            ),
        )?;
        Ok(Some(child))
    }

    fn stop_growth(&mut self) {
        for segment in &mut self.neurites.segments {
            segment.growing = false;
        }
    }
}

/// Rotates unit vector `axis` by `angle` towards a perpendicular picked by
/// `turn` (a fraction of a full revolution around `axis`).
pub fn deflect(axis: DVec3, angle: f64, turn: f64) -> DVec3 {
    let (u, v) = axis.any_orthonormal_pair();
    let phi = turn * std::f64::consts::TAU;
    let perpendicular = u * phi.cos() + v * phi.sin();
    (axis * angle.cos() + perpendicular * angle.sin()).normalize()
}

fn random_unit(rng: &mut impl Rng) -> DVec3 {
    // Uniform on the sphere: uniform z and uniform azimuth.
    let z: f64 = rng.random_range(-1.0..=1.0);
    let phi: f64 = rng.random_range(0.0..std::f64::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    DVec3::new(r * phi.cos(), r * phi.sin(), z)
}
