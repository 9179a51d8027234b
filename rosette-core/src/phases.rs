//! Physics phases run by one call to `update_cell_positions`.
//!
//! The update is a fixed pipeline over a snapshot of every agent:
//! 1. [`AgentTable::collect`] — freeze shapes and proximal owners.
//! 2. [`interaction_phase`] — pairwise repulsion and adhesion between
//!    grid neighbours, equal and opposite on the two agents.
//! 3. [`spring_phase`] — each neurite segment pulls towards its rest length.
//! 4. [`outgrowth_phase`] — growth cones are pushed along their axis.
//! 5. [`integration_phase`] — overdamped position update and grid refresh.
//!
//! All forces are read from the snapshot, so the order in which agents or
//! pairs are visited never changes which forces are applied.

use std::collections::HashMap;

use glam::DVec3;

use crate::{
    config::{NeuriteConfig, PhysicsConfig},
    cylinder::{Contact, Shape},
    error::{Result, SimError},
    forces::ForceBuffer,
    grid::SpatialGrid,
    neuron::Neuron,
    potentials::Potentials,
    types::{AgentId, AgentKind},
};

/// One agent frozen at the start of a physics step.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub shape: Shape,
    /// Table index of the agent carrying this neurite's proximal end.
    pub owner: Option<usize>,
    pub rest_length: f64,
    pub axis: DVec3,
    /// Growth cone of a neuron that has not differentiated.
    pub pushing: bool,
}

impl Agent {
    pub fn kind(&self) -> AgentKind {
        self.id.kind()
    }
}

/// All agents of the current step, in neuron order with each soma before
/// its segments.
#[derive(Debug, Default)]
pub struct AgentTable {
    pub agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl AgentTable {
    /// Snapshots every neuron.
    ///
    /// ### Errors
    /// `InvalidTopology` if a segment's parent cannot be resolved.
    pub fn collect(neurons: &[Neuron]) -> Result<Self> {
        let total = neurons.iter().map(|n| 1 + n.neurites.len()).sum();
        let mut agents = Vec::with_capacity(total);
        let mut index = HashMap::with_capacity(total);

        for (n, neuron) in neurons.iter().enumerate() {
            let cell_index = agents.len();
            let id = AgentId::Cell(n);
            index.insert(id, cell_index);
            agents.push(Agent {
                id,
                shape: Shape::Sphere {
                    center: neuron.cell.position,
                    radius: neuron.cell.radius,
                },
                owner: None,
                rest_length: 0.0,
                axis: DVec3::ZERO,
                pushing: false,
            });

            for (s, segment) in neuron.neurites.segments.iter().enumerate() {
                let owner = match segment.parent {
                    None => cell_index,
                    Some(p) if p < s => cell_index + 1 + p,
                    Some(p) => {
                        return Err(SimError::topology(format!(
                            "neuron {n} segment {s} has parent {p} outside its tree"
                        )));
                    }
                };
                let id = AgentId::Neurite(n, s);
                index.insert(id, agents.len());
                agents.push(Agent {
                    id,
                    shape: Shape::Cylinder {
                        proximal: neuron.neurites.proximal_point(s, &neuron.cell)?,
                        distal: segment.distal,
                        radius: segment.radius,
                    },
                    owner: Some(owner),
                    rest_length: segment.rest_length,
                    axis: segment.axis,
                    pushing: segment.growing && !neuron.is_differentiated(),
                });
            }
        }
        Ok(Self { agents, index })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.index.get(&id).copied()
    }
}

/// Whether `a` and `b` are joined mechanically and must not interact
/// through the contact potentials.
fn bonded(neurons: &[Neuron], a: &Agent, b: &Agent) -> bool {
    match (a.id, b.id) {
        (AgentId::Cell(n), AgentId::Neurite(m, _))
        | (AgentId::Neurite(m, _), AgentId::Cell(n)) => n == m,
        (AgentId::Neurite(n, sa), AgentId::Neurite(m, sb)) if n == m => {
            neurons[n].neurites.bonded(sa, sb)
        }
        _ => false,
    }
}

/// Net force exerted on the first agent of a pair; the second receives the
/// exact negation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairForce {
    pub on_a: DVec3,
    pub contact: Contact,
}

/// Force between two shapes, or `None` when they are out of range.
///
/// Positive potential magnitudes push `a` away from `b`. Coincident closest
/// points have no direction; they are separated along +x.
pub fn pair_force(
    a: &Shape,
    kind_a: AgentKind,
    b: &Shape,
    kind_b: AgentKind,
    potentials: &Potentials,
) -> Option<PairForce> {
    let (ra, rb) = (a.radius(), b.radius());
    let potential = potentials.for_pair(kind_a, kind_b);
    let contact = a.contact(b);
    if contact.distance >= potential.cutoff(ra, rb) {
        return None;
    }
    let magnitude = potential.magnitude(contact.distance, ra, rb);
    if magnitude == 0.0 {
        return None;
    }
    let direction = if contact.distance > 0.0 {
        (contact.point_b - contact.point_a) / contact.distance
    } else {
        DVec3::X
    };
    Some(PairForce {
        on_a: -direction * magnitude,
        contact,
    })
}

/// Adds `f`, applied at parameter `t` along agent `i`, to `i` and its owner.
///
/// Cylinders share a contact force between their two ends by lever rule;
/// spheres (t = 1, no owner) take it whole.
#[inline]
fn distribute(table: &AgentTable, forces: &mut ForceBuffer, i: usize, t: f64, f: DVec3) {
    match table.agents[i].owner {
        Some(owner) if t < 1.0 => {
            forces.add(i, f * t);
            forces.add(owner, f * (1.0 - t));
        }
        _ => forces.add(i, f),
    }
}

/// Accumulates contact forces between every unbonded pair within range.
///
/// For each agent in table order:
///
/// 1. Queries the grid from its anchor (soma centre or distal point) with
///    radius `max_cutoff + own length + longest segment`, so no pair whose
///    closest points are in range can be missed.
/// 2. Skips candidates with a lower or equal table index, so each
///    unordered pair is evaluated exactly once.
/// 3. Skips bonded pairs: a soma with its own segments, a segment with its
///    parent or children, and siblings sharing a proximal point.
/// 4. Evaluates [`pair_force`] and spreads `on_a` over the first agent and
///    `-on_a` over the second, splitting a cylinder's share between its
///    distal point and its proximal owner by the contact parameter `t`.
///
/// The force buffer is resized (and cleared) to `table.len()` at the start
/// of this phase via [`ForceBuffer::ensure_len`].
///
/// ### Parameters
/// - `table` - Snapshot of every agent taken at the start of the step.
/// - `neurons` - The neurons the table was collected from; used to decide
///   whether two segments of one neuron are bonded.
/// - `grid` - Spatial index holding every agent's anchor.
/// - `potentials` - Pair potentials per agent-kind combination.
/// - `forces` - Scratch buffer receiving the net contact force per agent.
///
/// ### Errors
/// `InvalidTopology` if the grid returns an agent that is not in `table`.
pub fn interaction_phase(
    table: &AgentTable,
    neurons: &[Neuron],
    grid: &SpatialGrid,
    potentials: &Potentials,
    forces: &mut ForceBuffer,
) -> Result<()> {
    forces.ensure_len(table.len());

    let mut cell_radius: f64 = 0.0;
    let mut neurite_radius: f64 = 0.0;
    let mut longest: f64 = 0.0;
    for agent in &table.agents {
        match agent.kind() {
            AgentKind::Cell => cell_radius = cell_radius.max(agent.shape.radius()),
            AgentKind::Neurite => neurite_radius = neurite_radius.max(agent.shape.radius()),
        }
        longest = longest.max(agent.shape.length());
    }
    let reach = potentials.max_cutoff(cell_radius, neurite_radius);

    let mut candidates = Vec::new();
    for (i, a) in table.agents.iter().enumerate() {
        candidates.clear();
        let radius = reach + a.shape.length() + longest;
        grid.neighbors_into(a.shape.anchor(), radius, &mut candidates);

        for &id in &candidates {
            let j = table.index_of(id).ok_or_else(|| {
                SimError::topology(format!("grid holds {id:?} which no neuron owns"))
            })?;
            if j <= i {
                continue;
            }
            let b = &table.agents[j];
            if bonded(neurons, a, b) {
                continue;
            }
            if let Some(pf) = pair_force(&a.shape, a.kind(), &b.shape, b.kind(), potentials) {
                distribute(table, forces, i, pf.contact.t_a, pf.on_a);
                distribute(table, forces, j, pf.contact.t_b, -pf.on_a);
            }
        }
    }
    Ok(())
}

/// Pulls every segment towards its rest length.
///
/// Each segment is a Hookean spring of stiffness
/// [`NeuriteConfig::spring_constant`] between its proximal and distal
/// points. A stretched segment receives `k (L - L0)` towards its proximal
/// end on the distal point, and the same force reversed on its proximal
/// owner. Degenerate segments of zero length are skipped.
///
/// ### Parameters
/// - `table` - Snapshot of every agent; only cylinders with an owner are
///   considered.
/// - `cfg` - Neurite mechanics, providing the spring constant.
/// - `forces` - Buffer sized by [`interaction_phase`]; forces are added to
///   whatever it already holds.
pub fn spring_phase(table: &AgentTable, cfg: &NeuriteConfig, forces: &mut ForceBuffer) {
    for (i, agent) in table.agents.iter().enumerate() {
        let (Some(owner), Shape::Cylinder {
            proximal, distal, ..
        }) = (agent.owner, agent.shape)
        else {
            continue;
        };
        let span = distal - proximal;
        let length = span.length();
        if length <= f64::EPSILON {
            continue;
        }
        let tension = cfg.spring_constant * (length - agent.rest_length);
        let f = span / length * tension;
        forces.add_pair(owner, i, f);
    }
}

/// Pushes every active growth cone along its outgrowth axis.
///
/// Only segments flagged `pushing` in the table receive the bias: growing
/// tips of neurons that have not differentiated.
///
/// ### Parameters
/// - `table` - Snapshot of every agent.
/// - `cfg` - Neurite mechanics, providing [`NeuriteConfig::outgrowth_force`].
/// - `forces` - Buffer the bias is added to.
pub fn outgrowth_phase(table: &AgentTable, cfg: &NeuriteConfig, forces: &mut ForceBuffer) {
    if cfg.outgrowth_force == 0.0 {
        return;
    }
    for (i, agent) in table.agents.iter().enumerate() {
        if agent.pushing {
            forces.add(i, agent.axis * cfg.outgrowth_force);
        }
    }
}

/// Moves every agent under overdamped dynamics.
///
/// Each agent is displaced by `F / viscosity * timestep`, with no velocity
/// carried between steps. Somata move their centre and segments move their
/// distal point; proximal points follow implicitly. Every moved agent's
/// grid entry is updated, which only touches buckets when it changes cell.
///
/// ### Parameters
/// - `table` - Snapshot the forces were accumulated against.
/// - `forces` - Net force per table index.
/// - `physics` - Timestep and viscosity.
/// - `neurons` - Written back with the new positions.
/// - `grid` - Spatial index kept in sync with the new positions.
///
/// ### Returns
/// The largest displacement length of the step, `0.0` if nothing moved.
pub fn integration_phase(
    table: &AgentTable,
    forces: &ForceBuffer,
    physics: &PhysicsConfig,
    neurons: &mut [Neuron],
    grid: &mut SpatialGrid,
) -> f64 {
    let scale = physics.timestep / physics.viscosity;
    let mut max_step: f64 = 0.0;

    for (i, agent) in table.agents.iter().enumerate() {
        let displacement = forces.get(i) * scale;
        if displacement == DVec3::ZERO {
            continue;
        }
        max_step = max_step.max(displacement.length());
        let position = match agent.id {
            AgentId::Cell(n) => {
                let cell = &mut neurons[n].cell;
                cell.position += displacement;
                cell.position
            }
            AgentId::Neurite(n, s) => {
                let segment = &mut neurons[n].neurites.segments[s];
                segment.distal += displacement;
                segment.distal
            }
        };
        grid.update(agent.id, position);
    }
    max_step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GridConfig,
        neurite::Neurite,
        potentials::{PairPotential, RepulsionForm},
    };

    fn sphere(x: f64, r: f64) -> Shape {
        Shape::Sphere {
            center: DVec3::new(x, 0.0, 0.0),
            radius: r,
        }
    }

    fn repulsive_only() -> Potentials {
        let p = PairPotential {
            repulsion_coefficient: 10.0,
            repulsion: RepulsionForm::Linear,
            adhesion_coefficient: 0.0,
            ..PairPotential::default()
        };
        Potentials {
            cell_cell: p,
            cell_neurite: p,
            neurite_neurite: p,
        }
    }

    fn grid_for(neurons: &[Neuron]) -> SpatialGrid {
        let mut grid =
            SpatialGrid::new(&GridConfig::cube(-50.0, 50.0, 5.0)).expect("valid grid");
        let table = AgentTable::collect(neurons).expect("valid neurons");
        for a in &table.agents {
            grid.insert(a.id, a.shape.anchor());
        }
        grid
    }

    #[test]
    fn overlapping_spheres_push_apart() {
        let pf = pair_force(
            &sphere(0.0, 1.0),
            AgentKind::Cell,
            &sphere(1.0, 1.0),
            AgentKind::Cell,
            &repulsive_only(),
        )
        .expect("in range");
        // Linear: 10 * (1 - 1/2) = 5, pointing away from b.
        assert_eq!(pf.on_a, DVec3::new(-5.0, 0.0, 0.0));
    }

    #[test]
    fn distant_spheres_do_not_interact() {
        let pf = pair_force(
            &sphere(0.0, 1.0),
            AgentKind::Cell,
            &sphere(3.0, 1.0),
            AgentKind::Cell,
            &repulsive_only(),
        );
        assert!(pf.is_none());
    }

    #[test]
    fn collect_orders_soma_before_segments() {
        let mut n = Neuron::new(DVec3::ZERO, 1.0);
        let root = n.neurites.add_root(Neurite::new_root(DVec3::X * 4.0, DVec3::X, 0.5, 3.0));
        n.neurites
            .add_child(root, Neurite::new_root(DVec3::X * 7.0, DVec3::X, 0.5, 3.0))
            .expect("parent exists");
        let table = AgentTable::collect(&[n]).expect("valid neurons");

        let ids: Vec<AgentId> = table.agents.iter().map(|a| a.id).collect();
        assert_eq!(
            ids,
            vec![AgentId::Cell(0), AgentId::Neurite(0, 0), AgentId::Neurite(0, 1)]
        );
        assert_eq!(table.agents[1].owner, Some(0));
        assert_eq!(table.agents[2].owner, Some(1));
    }

    #[test]
    fn collect_rejects_broken_parent() {
        let mut n = Neuron::new(DVec3::ZERO, 1.0);
        n.neurites.add_root(Neurite::new_root(DVec3::X, DVec3::X, 0.5, 3.0));
        n.neurites.segments[0].parent = Some(4);
        assert!(matches!(
            AgentTable::collect(&[n]),
            Err(SimError::InvalidTopology(_))
        ));
    }

    #[test]
    fn own_neurites_do_not_touch_their_soma() {
        let mut n = Neuron::new(DVec3::ZERO, 2.0);
        n.neurites
            .add_root(Neurite::new_root(DVec3::X * 3.0, DVec3::X, 0.5, 1.0));
        let neurons = vec![n];
        let grid = grid_for(&neurons);
        let table = AgentTable::collect(&neurons).expect("valid neurons");
        let mut forces = ForceBuffer::default();

        interaction_phase(&table, &neurons, &grid, &repulsive_only(), &mut forces)
            .expect("consistent grid");
        assert_eq!(forces.get(0), DVec3::ZERO);
        assert_eq!(forces.get(1), DVec3::ZERO);
    }

    #[test]
    fn interaction_phase_conserves_momentum() {
        let mut a = Neuron::new(DVec3::ZERO, 2.0);
        a.neurites
            .add_root(Neurite::new_root(DVec3::new(6.0, 0.0, 0.0), DVec3::X, 0.5, 4.0));
        let b = Neuron::new(DVec3::new(4.0, 1.5, 0.0), 2.0);
        let neurons = vec![a, b];
        let grid = grid_for(&neurons);
        let table = AgentTable::collect(&neurons).expect("valid neurons");
        let mut forces = ForceBuffer::default();

        interaction_phase(&table, &neurons, &grid, &Potentials::default(), &mut forces)
            .expect("consistent grid");
        assert!(forces.get(2).length() > 0.0);
        assert!(forces.total().length() < 1e-9);
    }

    #[test]
    fn stretched_spring_pulls_tip_back() {
        let mut n = Neuron::new(DVec3::ZERO, 1.0);
        n.neurites
            .add_root(Neurite::new_root(DVec3::new(6.0, 0.0, 0.0), DVec3::X, 0.5, 3.0));
        let table = AgentTable::collect(&[n]).expect("valid neurons");
        let mut forces = ForceBuffer::with_len(table.len());
        let cfg = NeuriteConfig {
            spring_constant: 2.0,
            ..NeuriteConfig::default()
        };

        spring_phase(&table, &cfg, &mut forces);
        // Length 5 against rest length 3.
        assert_eq!(forces.get(1), DVec3::new(-4.0, 0.0, 0.0));
        assert_eq!(forces.get(0), DVec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn outgrowth_pushes_only_growth_cones() {
        let mut n = Neuron::new(DVec3::ZERO, 1.0);
        let root = n
            .neurites
            .add_root(Neurite::new_root(DVec3::new(4.0, 0.0, 0.0), DVec3::X, 0.5, 3.0));
        n.neurites
            .add_child(root, Neurite::new_root(DVec3::new(7.0, 0.0, 0.0), DVec3::X, 0.5, 3.0))
            .expect("parent exists");
        n.neurites.segments[root].growing = false;
        let table = AgentTable::collect(&[n]).expect("valid neurons");
        let mut forces = ForceBuffer::with_len(table.len());
        let cfg = NeuriteConfig {
            outgrowth_force: 1.5,
            ..NeuriteConfig::default()
        };

        outgrowth_phase(&table, &cfg, &mut forces);
        assert_eq!(forces.get(0), DVec3::ZERO);
        assert_eq!(forces.get(1), DVec3::ZERO);
        assert_eq!(forces.get(2), DVec3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn integration_moves_agents_and_grid() {
        let mut neurons = vec![Neuron::new(DVec3::ZERO, 1.0)];
        let mut grid = grid_for(&neurons);
        let table = AgentTable::collect(&neurons).expect("valid neurons");
        let mut forces = ForceBuffer::with_len(1);
        forces.add(0, DVec3::new(20.0, 0.0, 0.0));
        let physics = PhysicsConfig {
            timestep: 0.5,
            viscosity: 2.0,
        };

        let moved = integration_phase(&table, &forces, &physics, &mut neurons, &mut grid);
        assert_eq!(moved, 5.0);
        assert_eq!(neurons[0].cell.position, DVec3::new(5.0, 0.0, 0.0));
        assert_eq!(grid.position(AgentId::Cell(0)), Some(DVec3::new(5.0, 0.0, 0.0)));
    }
}
