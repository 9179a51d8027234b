use glam::DVec3;

use crate::{
    error::{Result, SimError},
    neuron::Cell,
    types::SegmentId,
};

/// One cylindrical neurite segment.
///
/// The proximal end is not stored: it is the parent's distal point, or a
/// point on the soma surface for segments rooted at the cell. Only the
/// distal point is integrated by the physics engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Neurite {
    pub distal: DVec3,
    /// Unit outgrowth direction; fixed at creation.
    pub axis: DVec3,
    pub radius: f64,
    pub rest_length: f64,
    pub parent: Option<SegmentId>,
    pub children: Vec<SegmentId>,
    /// Whether this segment is an active growth cone.
    pub growing: bool,
}

/// Arena of the segments owned by one neuron.
///
/// Parents are stored as ids, never as references, and a child's id is
/// always greater than its parent's, so the tree cannot contain a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeuriteTree {
    pub segments: Vec<Neurite>,
    pub roots: Vec<SegmentId>,
}

impl Neurite {
    pub fn new_root(distal: DVec3, axis: DVec3, radius: f64, rest_length: f64) -> Self {
        Self {
            distal,
            axis,
            radius,
            rest_length,
            parent: None,
            children: Vec::with_capacity(2),
            growing: true,
        }
    }

    pub fn new_child(
        distal: DVec3,
        axis: DVec3,
        radius: f64,
        rest_length: f64,
        parent: SegmentId,
    ) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new_root(distal, axis, radius, rest_length)
        }
    }
}

impl NeuriteTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: SegmentId) -> Option<&Neurite> {
        self.segments.get(id)
    }

    pub fn add_root(&mut self, segment: Neurite) -> SegmentId {
        let id = self.segments.len();
        self.segments.push(Neurite {
            parent: None,
            ..segment
        });
        self.roots.push(id);
        id
    }

    /// Appends `segment` under `parent`.
    ///
    /// ### Errors
    /// `InvalidTopology` if `parent` is not a segment of this tree.
    pub fn add_child(&mut self, parent: SegmentId, segment: Neurite) -> Result<SegmentId> {
        let id = self.segments.len();
        let Some(p) = self.segments.get_mut(parent) else {
            return Err(SimError::topology(format!(
                "parent segment {parent} does not exist (tree has {id} segments)"
            )));
        };
        p.children.push(id);
        self.segments.push(Neurite {
            parent: Some(parent),
            ..segment
        });
        Ok(id)
    }

    /// Ids of segments that are still growth cones, in id order.
    pub fn growing_tips(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, s)| if s.growing { Some(i) } else { None })
    }

    /// Start point of segment `id`.
    ///
    /// Root segments start on the soma surface along their own axis.
    pub fn proximal_point(&self, id: SegmentId, cell: &Cell) -> Result<DVec3> {
        let segment = self.segment(id)?;
        match segment.parent {
            None => Ok(cell.position + segment.axis * cell.radius),
            Some(p) => Ok(self.segment(p)?.distal),
        }
    }

    /// Current axis length of segment `id`.
    pub fn length(&self, id: SegmentId, cell: &Cell) -> Result<f64> {
        let proximal = self.proximal_point(id, cell)?;
        Ok(proximal.distance(self.segment(id)?.distal))
    }

    /// Whether `a` and `b` are mechanically joined: parent and child, or
    /// siblings sharing a proximal point.
    pub fn bonded(&self, a: SegmentId, b: SegmentId) -> bool {
        let (Some(sa), Some(sb)) = (self.segments.get(a), self.segments.get(b)) else {
            return false;
        };
        sa.parent == Some(b) || sb.parent == Some(a) || (sa.parent.is_some() && sa.parent == sb.parent)
    }

    /// Checks that every parent link resolves inside this tree, that parents
    /// precede their children and that child and root lists agree with them.
    pub fn validate(&self) -> Result<()> {
        for (id, s) in self.segments.iter().enumerate() {
            match s.parent {
                None => {
                    if !self.roots.contains(&id) {
                        return Err(SimError::topology(format!(
                            "segment {id} has no parent but is not a root"
                        )));
                    }
                }
                Some(p) => {
                    if p >= id {
                        return Err(SimError::topology(format!(
                            "segment {id} has parent {p} which does not precede it"
                        )));
                    }
                    if !self.segments[p].children.contains(&id) {
                        return Err(SimError::topology(format!(
                            "segment {id} is missing from the children of {p}"
                        )));
                    }
                }
            }
            for &c in &s.children {
                if self.segments.get(c).and_then(|child| child.parent) != Some(id) {
                    return Err(SimError::topology(format!(
                        "segment {id} lists child {c} whose parent is not {id}"
                    )));
                }
            }
        }
        for &r in &self.roots {
            if self.segments.get(r).is_none_or(|s| s.parent.is_some()) {
                return Err(SimError::topology(format!(
                    "root {r} is missing or has a parent"
                )));
            }
        }
        Ok(())
    }

    fn segment(&self, id: SegmentId) -> Result<&Neurite> {
        self.segments
            .get(id)
            .ok_or_else(|| SimError::topology(format!("segment {id} does not exist")))
    }
}
