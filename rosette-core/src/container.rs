//! The simulation world: neurons, spatial grid and run-wide parameters.
//!
//! An external driver decides the cadence. The reference rosette run calls
//! [`Container::update_cell_positions`] every physics step and
//! [`Container::advance_cycles`] plus [`Container::differentiate`] once per
//! unit of simulated time.

use glam::DVec3;

use crate::{
    clocks::ClockEvent,
    config::Config,
    error::{Result, SimError},
    forces::ForceBuffer,
    frame::{Animator, CellFrame, Frame, NeuriteFrame},
    grid::SpatialGrid,
    neuron::Neuron,
    phases::{self, AgentTable},
    types::{AgentId, NeuronId},
};

/// Events fired by one [`Container::advance_cycles`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub growth_events: usize,
    pub branch_events: usize,
    pub segments_created: usize,
}

/// Owns every agent of a run and advances it on request.
#[derive(Debug)]
pub struct Container {
    cfg: Config,
    neurons: Vec<Neuron>,
    grid: SpatialGrid,
    forces: ForceBuffer,
    steps: u64,
    cycles: u64,
}

impl Container {
    /// Builds an empty world.
    ///
    /// ### Errors
    /// `Configuration` if `cfg` fails [`Config::validate`].
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let grid = SpatialGrid::new(&cfg.grid)?;
        tracing::info!(
            timestep = cfg.physics.timestep,
            viscosity = cfg.physics.viscosity,
            cell_size = cfg.grid.cell_size,
            seed = cfg.seed,
            "container created"
        );
        Ok(Self {
            cfg,
            neurons: Vec::new(),
            grid,
            forces: ForceBuffer::default(),
            steps: 0,
            cycles: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, id: NeuronId) -> Result<&Neuron> {
        self.neurons.get(id).ok_or(SimError::UnknownNeuron(id))
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Total number of somata and segments.
    pub fn agent_count(&self) -> usize {
        self.neurons.iter().map(|n| 1 + n.neurites.len()).sum()
    }

    pub fn neurite_count(&self) -> usize {
        self.neurons.iter().map(|n| n.neurites.len()).sum()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Adds `neuron` to the world and indexes its soma and segments.
    ///
    /// ### Errors
    /// - `DuplicateRegistration` if the neuron already carries an id.
    /// - `Configuration` for a non-positive radius or non-finite position.
    /// - `InvalidTopology` if its neurite tree is inconsistent.
    pub fn register_neuron(&mut self, mut neuron: Neuron) -> Result<NeuronId> {
        if let Some(existing) = neuron.id() {
            return Err(SimError::DuplicateRegistration(existing));
        }
        neuron.validate()?;

        let id = self.neurons.len();
        neuron.assign(id, self.cfg.seed);

        self.grid.insert(AgentId::Cell(id), neuron.cell.position);
        for (s, segment) in neuron.neurites.segments.iter().enumerate() {
            self.grid.insert(AgentId::Neurite(id, s), segment.distal);
        }
        tracing::info!(
            neuron = id,
            segments = neuron.neurites.len(),
            position = %neuron.cell.position,
            "neuron registered"
        );
        self.neurons.push(neuron);
        Ok(id)
    }

    /// Builds a neuron with the configured soma radius and clock rates and
    /// registers it.
    pub fn create_new_neuron(&mut self, position: DVec3) -> Result<NeuronId> {
        let mut neuron = Neuron::new(position, self.cfg.cell.radius);
        let c = self.cfg.clocks;
        neuron
            .clocks
            .set_clocks(c.growth_rate, c.branch_rate, c.differentiation_rate)?;
        self.register_neuron(neuron)
    }

    /// Sets the outgrowth axis of a registered neuron.
    pub fn set_outgrowth_axis(&mut self, id: NeuronId, axis: DVec3) -> Result<()> {
        self.neurons
            .get_mut(id)
            .ok_or(SimError::UnknownNeuron(id))?
            .set_outgrowth_axis(axis)
    }

    /// Replaces the clock rates of a registered neuron.
    pub fn set_clocks(
        &mut self,
        id: NeuronId,
        growth_rate: f64,
        branch_rate: f64,
        differentiation_rate: f64,
    ) -> Result<()> {
        self.neurons
            .get_mut(id)
            .ok_or(SimError::UnknownNeuron(id))?
            .clocks
            .set_clocks(growth_rate, branch_rate, differentiation_rate)
    }

    /// Runs one biological cycle of growth and branching for every neuron.
    ///
    /// Each neuron draws from its own random stream, so the set of events
    /// fired does not depend on the order neurons are visited in.
    pub fn advance_cycles(&mut self) -> Result<CycleReport> {
        let mode = self.cfg.clocks.mode;
        let mut report = CycleReport::default();

        for (id, neuron) in self.neurons.iter_mut().enumerate() {
            let outcome = neuron.advance_cycle(mode, &self.cfg.neurite)?;
            for event in &outcome.events {
                match event {
                    ClockEvent::Grow => report.growth_events += 1,
                    ClockEvent::Branch => report.branch_events += 1,
                    ClockEvent::Differentiate => {}
                }
            }
            for &s in &outcome.new_segments {
                let distal = neuron.neurites.segments[s].distal;
                self.grid.insert(AgentId::Neurite(id, s), distal);
            }
            report.segments_created += outcome.new_segments.len();
            if !outcome.events.is_empty() {
                tracing::debug!(
                    neuron = id,
                    events = ?outcome.events,
                    state = ?neuron.state(),
                    created = outcome.new_segments.len(),
                    "cycle events"
                );
            }
        }
        self.cycles += 1;
        Ok(report)
    }

    /// Runs the differentiation clock of every neuron once.
    ///
    /// Returns how many neurons differentiated in this call.
    pub fn differentiate(&mut self) -> Result<usize> {
        let mode = self.cfg.clocks.mode;
        let mut count = 0;
        for (id, neuron) in self.neurons.iter_mut().enumerate() {
            if neuron.differentiate(mode) {
                tracing::debug!(neuron = id, "neuron differentiated");
                count += 1;
            }
        }
        Ok(count)
    }

    /// Advances the mechanics by one timestep.
    pub fn update_cell_positions(&mut self) -> Result<()> {
        let table = AgentTable::collect(&self.neurons)?;
        phases::interaction_phase(
            &table,
            &self.neurons,
            &self.grid,
            &self.cfg.potentials,
            &mut self.forces,
        )?;
        phases::spring_phase(&table, &self.cfg.neurite, &mut self.forces);
        phases::outgrowth_phase(&table, &self.cfg.neurite, &mut self.forces);
        let max_step = phases::integration_phase(
            &table,
            &self.forces,
            &self.cfg.physics,
            &mut self.neurons,
            &mut self.grid,
        );
        self.steps += 1;
        tracing::trace!(step = self.steps, agents = table.len(), max_step, "physics step");
        Ok(())
    }

    /// Snapshot of every soma and segment.
    pub fn frame(&self) -> Result<Frame> {
        let mut frame = Frame {
            step: self.steps,
            cycle: self.cycles,
            cells: Vec::with_capacity(self.neurons.len()),
            neurites: Vec::with_capacity(self.neurite_count()),
        };
        for (id, neuron) in self.neurons.iter().enumerate() {
            frame.cells.push(CellFrame {
                neuron: id,
                position: neuron.cell.position,
                radius: neuron.cell.radius,
                state: neuron.state(),
            });
            for (s, segment) in neuron.neurites.segments.iter().enumerate() {
                frame.neurites.push(NeuriteFrame {
                    neuron: id,
                    segment: s,
                    parent: segment.parent,
                    proximal: neuron.neurites.proximal_point(s, &neuron.cell)?,
                    distal: segment.distal,
                    radius: segment.radius,
                    growing: segment.growing,
                });
            }
        }
        Ok(frame)
    }

    /// Hands the current frame to `animator`.
    pub fn update_drawings(&self, animator: &mut impl Animator) -> Result<()> {
        animator.draw(&self.frame()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clocks::ClockMode, frame::FrameRecorder};

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.clocks.mode = ClockMode::Deterministic;
        cfg
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut cfg = config();
        cfg.physics.viscosity = 0.0;
        assert!(matches!(
            Container::new(cfg),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn register_assigns_sequential_ids_and_indexes_soma() {
        let mut c = Container::new(config()).expect("valid config");
        let a = c.create_new_neuron(DVec3::ZERO).expect("valid neuron");
        let b = c
            .create_new_neuron(DVec3::new(30.0, 0.0, 0.0))
            .expect("valid neuron");

        assert_eq!((a, b), (0, 1));
        assert!(c.grid().contains(AgentId::Cell(1)));
        assert_eq!(c.neuron(1).expect("registered").id(), Some(1));
        assert!(matches!(c.neuron(2), Err(SimError::UnknownNeuron(2))));
    }

    #[test]
    fn registering_twice_is_rejected() {
        let mut c = Container::new(config()).expect("valid config");
        let id = c.create_new_neuron(DVec3::ZERO).expect("valid neuron");
        let copy = c.neuron(id).expect("registered").clone();

        assert_eq!(
            c.register_neuron(copy),
            Err(SimError::DuplicateRegistration(id))
        );
        assert_eq!(c.neurons().len(), 1);
    }

    #[test]
    fn register_rejects_broken_tree() {
        let mut c = Container::new(config()).expect("valid config");
        let mut n = Neuron::new(DVec3::ZERO, 4.0);
        n.neurites.add_root(crate::neurite::Neurite::new_root(
            DVec3::X * 9.0,
            DVec3::X,
            0.5,
            5.0,
        ));
        n.neurites.segments[0].parent = Some(0);

        assert!(matches!(
            c.register_neuron(n),
            Err(SimError::InvalidTopology(_))
        ));
        assert!(c.grid().is_empty());
    }

    #[test]
    fn advance_cycles_registers_new_segments_in_grid() {
        let mut c = Container::new(config()).expect("valid config");
        let id = c.create_new_neuron(DVec3::ZERO).expect("valid neuron");
        c.set_outgrowth_axis(id, DVec3::Y).expect("non-zero axis");
        c.set_clocks(id, 1.0, 0.0, 0.0).expect("valid rates");

        let report = c.advance_cycles().expect("valid trees");
        assert_eq!(report.growth_events, 1);
        assert_eq!(report.segments_created, 1);
        assert!(c.grid().contains(AgentId::Neurite(id, 0)));
        assert_eq!(c.cycles(), 1);
    }

    #[test]
    fn differentiate_counts_new_differentiations_once() {
        let mut c = Container::new(config()).expect("valid config");
        let id = c.create_new_neuron(DVec3::ZERO).expect("valid neuron");
        c.set_clocks(id, 0.0, 0.0, 1.0).expect("valid rates");

        assert_eq!(c.differentiate(), Ok(1));
        assert_eq!(c.differentiate(), Ok(0));
        assert!(c.neuron(id).expect("registered").is_differentiated());
    }

    #[test]
    fn update_drawings_hands_frame_to_animator() {
        let mut c = Container::new(config()).expect("valid config");
        let id = c.create_new_neuron(DVec3::ZERO).expect("valid neuron");
        c.set_outgrowth_axis(id, DVec3::X).expect("non-zero axis");
        c.set_clocks(id, 1.0, 0.0, 0.0).expect("valid rates");
        c.advance_cycles().expect("valid trees");
        c.update_cell_positions().expect("consistent state");

        let mut recorder = FrameRecorder::default();
        c.update_drawings(&mut recorder).expect("consistent state");

        let frame = &recorder.frames[0];
        assert_eq!(frame.step, 1);
        assert_eq!(frame.cycle, 1);
        assert_eq!(frame.cells.len(), 1);
        assert_eq!(frame.neurites.len(), 1);
        assert_eq!(frame.neurites[0].parent, None);
    }
}
