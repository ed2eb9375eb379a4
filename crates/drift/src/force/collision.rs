//! Overlap resolution between node circles.

use drift_core::geometry::Point;

use super::{Force, ForceContext, jiggle};
use crate::{config::CollisionConfig, quadtree::Visit};

/// Pushes apart every pair of bodies whose circles overlap.
///
/// The overlap `r - l` of a pair (`r` the sum of radii, `l` the distance
/// between the projected positions) is split between the two bodies in
/// proportion to the other body's squared radius, so small nodes yield to
/// large ones. Not scaled by alpha.
///
/// Candidate pairs come from the spatial index: a cell is pruned when its
/// bounds, inflated by the query radius and the largest radius below it,
/// cannot contain an overlapping body. Additional iterations re-run the
/// query on positions shifted by the offsets of the previous passes.
#[derive(Debug, Clone)]
pub struct CollisionForce {
    strength: f64,
    iterations: usize,
}

impl CollisionForce {
    pub fn new(strength: f64, iterations: usize) -> Self {
        Self {
            strength,
            iterations,
        }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.strength(), config.iterations())
    }
}

impl Force for CollisionForce {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn apply(&self, context: &ForceContext<'_>, acceleration: &mut [Point]) {
        let bodies = context.bodies;
        let mut offset = vec![Point::ORIGIN; bodies.len()];

        for _ in 0..self.iterations {
            let current: Vec<Point> = bodies
                .iter()
                .zip(&offset)
                .map(|(body, o)| body.position.add_point(body.velocity).add_point(*o))
                .collect();
            // Cells are bounded by pre-tick positions, so the pruning margin
            // grows by the largest displacement from them.
            let drift = bodies
                .iter()
                .zip(&current)
                .map(|(body, p)| p.sub_point(body.position).hypot())
                .filter(|d| d.is_finite())
                .fold(0.0, f64::max);
            let mut pass = vec![Point::ORIGIN; bodies.len()];

            for (i, body) in bodies.iter().enumerate() {
                if !current[i].is_finite() {
                    continue;
                }
                let ri = body.radius;
                context.index.visit(|cell| {
                    let reach = ri + cell.max_radius() + 2.0 * drift;
                    if !cell.bounds().inflate(reach).contains(body.position) {
                        return Visit::Skip;
                    }
                    for &j in cell.entries() {
                        if j <= i {
                            continue;
                        }
                        let rj = bodies[j].radius;
                        let r = ri + rj;
                        let mut delta = current[i].sub_point(current[j]);
                        let mut distance2 = delta.length_squared();
                        if distance2 >= r * r {
                            continue;
                        }
                        if distance2 == 0.0 {
                            delta = jiggle(j, i);
                            distance2 = delta.length_squared();
                        }
                        let distance = distance2.sqrt();
                        let k = (r - distance) / distance * self.strength;
                        let push = delta.scale(k);

                        let weights = ri * ri + rj * rj;
                        let share = if weights > 0.0 { rj * rj / weights } else { 0.5 };
                        pass[i] = pass[i].add_point(push.scale(share));
                        pass[j] = pass[j].sub_point(push.scale(1.0 - share));
                    }
                    Visit::Descend
                });
            }

            for (o, p) in offset.iter_mut().zip(&pass) {
                *o = o.add_point(*p);
            }
        }

        for (a, o) in acceleration.iter_mut().zip(&offset) {
            *a = a.add_point(*o);
        }
    }
}
