//! Force modules
//!
//! A force reads the pre-tick state of every body (and the spatial index
//! built from it) and adds its contribution to a per-body acceleration
//! buffer. Forces never write to the bodies themselves, so the order in
//! which modules run cannot change the result; the integrator applies the
//! summed buffer once every module has run.

mod center;
mod collision;
mod link;
mod many_body;
mod position;

use std::{f64::consts::PI, fmt};

use drift_core::{geometry::Point, identifier::NodeId};

use crate::quadtree::QuadTree;

pub use center::CenterForce;
pub use collision::CollisionForce;
pub use link::LinkForce;
pub use many_body::ManyBodyForce;
pub use position::PositionForce;

/// Length of the displacement substituted for a zero-length separation.
pub const EPSILON: f64 = 1e-6;

/// Pre-tick state of one node, as seen by the force modules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: NodeId,
    pub position: Point,
    pub velocity: Point,
    /// Fixed bodies act on others but their own acceleration is discarded.
    pub fixed: bool,
    pub radius: f64,
}

/// A link with its endpoints resolved to body indices and its policies evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLink {
    pub source: usize,
    pub target: usize,
    pub rest_length: f64,
    pub strength: f64,
    /// Share of the correction taken by the target: `deg(source) / (deg(source) + deg(target))`.
    pub bias: f64,
}

/// Read-only input of one force evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ForceContext<'a> {
    pub bodies: &'a [Body],
    pub links: &'a [ResolvedLink],
    /// Spatial index over `bodies`; entry `i` is body `i`.
    pub index: &'a QuadTree,
    pub alpha: f64,
}

/// A pluggable force.
///
/// Implementations add to `acceleration[i]` for body `i`. They must not keep
/// state between calls beyond their own configuration.
pub trait Force: fmt::Debug {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    fn apply(&self, context: &ForceContext<'_>, acceleration: &mut [Point]);
}

/// Deterministic stand-in for the direction from body `from` to body `to` when they coincide.
///
/// Antisymmetric (`jiggle(a, b) == -jiggle(b, a)`), so a coincident pair is
/// pushed apart along one axis, and the axis varies with the pair so that a
/// clump of coincident bodies does not collapse onto a line.
pub(crate) fn jiggle(from: usize, to: usize) -> Point {
    if from == to {
        return Point::new(EPSILON, 0.0);
    }
    let (low, high, sign) = if from < to {
        (from, to, 1.0)
    } else {
        (to, from, -1.0)
    };
    let golden_angle = PI * (3.0 - 5f64.sqrt());
    let angle = (low.wrapping_mul(31).wrapping_add(high)) as f64 * golden_angle;
    Point::new(angle.cos(), angle.sin()).scale(EPSILON * sign)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::quadtree::Entry;

    pub fn body(id: u64, x: f64, y: f64) -> Body {
        Body {
            id: NodeId::new(id),
            position: Point::new(x, y),
            velocity: Point::ORIGIN,
            fixed: false,
            radius: 1.0,
        }
    }

    pub fn index(bodies: &[Body], charge: f64) -> QuadTree {
        let entries: Vec<Entry> = bodies
            .iter()
            .map(|b| Entry::new(b.position, charge, b.radius))
            .collect();
        QuadTree::build(&entries)
    }

    /// Runs `force` over `bodies` and returns the acceleration buffer.
    pub fn run(
        force: &dyn Force,
        bodies: &[Body],
        links: &[ResolvedLink],
        charge: f64,
        alpha: f64,
    ) -> Vec<Point> {
        let index = index(bodies, charge);
        let context = ForceContext {
            bodies,
            links,
            index: &index,
            alpha,
        };
        let mut acceleration = vec![Point::ORIGIN; bodies.len()];
        force.apply(&context, &mut acceleration);
        acceleration
    }
}
