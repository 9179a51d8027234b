//! Closest-point geometry for sphere and cylinder agents.
//!
//! Potentials are functions of a single distance. For spheres that is the
//! centre distance; as soon as a neurite is involved it is the distance
//! between the closest points of the segment axes, and the parameter of
//! that point along each segment decides how the force is shared between
//! the segment's two ends.

use glam::DVec3;

const EPS: f64 = 1e-12;

/// Physical extent of an agent at the start of a physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere {
        center: DVec3,
        radius: f64,
    },
    Cylinder {
        proximal: DVec3,
        distal: DVec3,
        radius: f64,
    },
}

/// Closest approach between two shapes.
///
/// `t_*` is the parameter along a cylinder axis (0 at the proximal end,
/// 1 at the distal end) and is always 1 for spheres, whose whole force
/// lands on the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub point_a: DVec3,
    pub point_b: DVec3,
    pub t_a: f64,
    pub t_b: f64,
    pub distance: f64,
}

impl Shape {
    pub fn radius(&self) -> f64 {
        match *self {
            Shape::Sphere { radius, .. } | Shape::Cylinder { radius, .. } => radius,
        }
    }

    /// Point the agent is indexed by in the spatial grid.
    pub fn anchor(&self) -> DVec3 {
        match *self {
            Shape::Sphere { center, .. } => center,
            Shape::Cylinder { distal, .. } => distal,
        }
    }

    /// Axis length; zero for spheres.
    pub fn length(&self) -> f64 {
        match *self {
            Shape::Sphere { .. } => 0.0,
            Shape::Cylinder {
                proximal, distal, ..
            } => proximal.distance(distal),
        }
    }

    /// Closest points between `self` and `other`.
    pub fn contact(&self, other: &Shape) -> Contact {
        match (*self, *other) {
            (Shape::Sphere { center: a, .. }, Shape::Sphere { center: b, .. }) => Contact {
                point_a: a,
                point_b: b,
                t_a: 1.0,
                t_b: 1.0,
                distance: a.distance(b),
            },
            (
                Shape::Sphere { center, .. },
                Shape::Cylinder {
                    proximal, distal, ..
                },
            ) => {
                let (point, t) = closest_point_on_segment(center, proximal, distal);
                Contact {
                    point_a: center,
                    point_b: point,
                    t_a: 1.0,
                    t_b: t,
                    distance: center.distance(point),
                }
            }
            (Shape::Cylinder { .. }, Shape::Sphere { .. }) => other.contact(self).swapped(),
            (
                Shape::Cylinder {
                    proximal: p1,
                    distal: q1,
                    ..
                },
                Shape::Cylinder {
                    proximal: p2,
                    distal: q2,
                    ..
                },
            ) => {
                let (s, t) = segment_segment_params(p1, q1, p2, q2);
                let a = p1 + (q1 - p1) * s;
                let b = p2 + (q2 - p2) * t;
                Contact {
                    point_a: a,
                    point_b: b,
                    t_a: s,
                    t_b: t,
                    distance: a.distance(b),
                }
            }
        }
    }
}

impl Contact {
    fn swapped(self) -> Self {
        Self {
            point_a: self.point_b,
            point_b: self.point_a,
            t_a: self.t_b,
            t_b: self.t_a,
            distance: self.distance,
        }
    }
}

/// Closest point to `p` on segment `a..b`, with its parameter in `[0, 1]`.
pub fn closest_point_on_segment(p: DVec3, a: DVec3, b: DVec3) -> (DVec3, f64) {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= EPS {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Parameters `(s, t)` of the closest points between segments `p1..q1`
/// and `p2..q2`, each clamped to `[0, 1]`.
///
/// Parallel segments pick `s = 0` and project onto the second segment.
pub fn segment_segment_params(p1: DVec3, q1: DVec3, p2: DVec3, q2: DVec3) -> (f64, f64) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= EPS && e <= EPS {
        return (0.0, 0.0);
    }
    if a <= EPS {
        return (0.0, (f / e).clamp(0.0, 1.0));
    }

    let c = d1.dot(r);
    if e <= EPS {
        return ((-c / a).clamp(0.0, 1.0), 0.0);
    }

    let b = d1.dot(d2);
    let denom = a * e - b * b;
    let mut s = if denom > EPS {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut t = (b * s + f) / e;
    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }
    (s, t)
}
