use glam::DVec3;

/// A per-step buffer that accumulates net force per agent.
///
/// Entry `i` belongs to the agent at index `i` of the physics step's agent
/// table. Forces are only ever added, so the order in which pairs are
/// evaluated changes the result by floating-point rounding alone.
#[derive(Debug, Default)]
pub struct ForceBuffer {
    force: Vec<DVec3>,
}

impl ForceBuffer {
    /// Creates a zeroed buffer for `len` agents.
    ///
    /// ### Parameters
    /// - `len` - Number of agents in the current agent table.
    ///
    /// ### Returns
    /// A new [`ForceBuffer`] with every entry set to `DVec3::ZERO`.
    pub fn with_len(len: usize) -> Self {
        Self {
            force: vec![DVec3::ZERO; len],
        }
    }

    /// Ensures the buffer has exactly `len` entries, all zero.
    ///
    /// The storage is resized only when the length differs; every entry is
    /// cleared either way.
    ///
    /// ### Parameters
    /// - `len` - Desired number of entries.
    pub fn ensure_len(&mut self, len: usize) {
        if self.force.len() != len {
            self.force.resize(len, DVec3::ZERO);
        }
        self.clear();
    }

    pub fn clear(&mut self) {
        for f in &mut self.force {
            *f = DVec3::ZERO;
        }
    }

    pub fn len(&self) -> usize {
        self.force.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty()
    }

    /// Adds `f` to agent `i`.
    ///
    /// ### Panics
    /// Panics if `i` is out of bounds.
    #[inline]
    pub fn add(&mut self, i: usize, f: DVec3) {
        self.force[i] += f;
    }

    /// Applies `f` to `a` and `-f` to `b`.
    ///
    /// ### Parameters
    /// - `a` - Index receiving `f`.
    /// - `b` - Index receiving the exact negation of `f`.
    /// - `f` - Force acting on `a`.
    ///
    /// ### Panics
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn add_pair(&mut self, a: usize, b: usize, f: DVec3) {
        self.force[a] += f;
        self.force[b] -= f;
    }

    #[inline]
    pub fn get(&self, i: usize) -> DVec3 {
        self.force[i]
    }

    /// Sum over all agents; zero when only internal forces were added.
    pub fn total(&self) -> DVec3 {
        self.force.iter().copied().sum()
    }
}
