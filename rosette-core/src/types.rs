/// Identifier for a registered [`crate::neuron::Neuron`].
///
/// This is an index into the container's neuron list, and is only
/// meaningful within the lifetime of a given `Container`.
pub type NeuronId = usize;

/// Identifier for a segment in a [`crate::neurite::NeuriteTree`].
///
/// Indexes `NeuriteTree::segments` of the owning neuron.
pub type SegmentId = usize;

/// Identity of a physical agent tracked by the spatial grid.
///
/// Ordering is neuron first, then the soma before any of its segments,
/// which is also the order the physics engine iterates agents in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentId {
    Cell(NeuronId),
    Neurite(NeuronId, SegmentId),
}

impl AgentId {
    pub fn neuron(self) -> NeuronId {
        match self {
            AgentId::Cell(n) | AgentId::Neurite(n, _) => n,
        }
    }

    pub fn kind(self) -> AgentKind {
        match self {
            AgentId::Cell(_) => AgentKind::Cell,
            AgentId::Neurite(..) => AgentKind::Neurite,
        }
    }
}

/// Agent-type tag used to pick pair potential parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Cell,
    Neurite,
}
