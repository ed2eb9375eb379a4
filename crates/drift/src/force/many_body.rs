//! Barnes–Hut approximated n-body force.

use drift_core::geometry::Point;

use super::{Force, ForceContext, jiggle};
use crate::{config::ManyBodyConfig, quadtree::Interaction};

/// Mutual repulsion (negative strength) or attraction (positive strength)
/// with magnitude `strength * alpha / distance`.
///
/// The vector form is `delta * strength * alpha / distance²`: the inverse
/// square applies to the unnormalized offset, which leaves an inverse-distance
/// magnitude.
///
/// Uses the spatial index's aggregates for distant cells. The charge of each
/// body is the mass it was indexed with; separations below `distance_min`
/// are softened, separations at or beyond `distance_max` are ignored.
#[derive(Debug, Clone)]
pub struct ManyBodyForce {
    theta: f64,
    distance_min2: f64,
    distance_max2: f64,
}

impl ManyBodyForce {
    pub fn new(theta: f64, distance_min: f64, distance_max: Option<f64>) -> Self {
        Self {
            theta,
            distance_min2: distance_min * distance_min,
            distance_max2: distance_max.map_or(f64::INFINITY, |max| max * max),
        }
    }

    pub fn from_config(config: &ManyBodyConfig) -> Self {
        Self::new(config.theta(), config.distance_min(), config.distance_max())
    }

    fn contribution(&self, mut delta: Point, mass: f64, alpha: f64) -> Point {
        let mut distance2 = delta.length_squared();
        if distance2 >= self.distance_max2 {
            return Point::ORIGIN;
        }
        if distance2 < self.distance_min2 {
            distance2 = (self.distance_min2 * distance2).sqrt();
            if distance2 == 0.0 {
                delta = Point::ORIGIN;
                distance2 = 1.0;
            }
        }
        delta.scale(mass * alpha / distance2)
    }
}

impl Force for ManyBodyForce {
    fn name(&self) -> &'static str {
        "many_body"
    }

    fn apply(&self, context: &ForceContext<'_>, acceleration: &mut [Point]) {
        for (i, body) in context.bodies.iter().enumerate() {
            if body.fixed || !body.position.is_finite() {
                continue;
            }

            let mut total = Point::ORIGIN;
            context
                .index
                .approximate(body.position, self.theta, |interaction| {
                    let term = match interaction {
                        Interaction::Aggregate { center, mass } => self.contribution(
                            center.sub_point(body.position),
                            mass,
                            context.alpha,
                        ),
                        Interaction::Entry(j) if j == i => return,
                        Interaction::Entry(j) => {
                            let other = context.index.entry(j);
                            let mut delta = other.position.sub_point(body.position);
                            if delta.is_zero() {
                                delta = jiggle(i, j);
                            }
                            self.contribution(delta, other.mass, context.alpha)
                        }
                    };
                    total = total.add_point(term);
                });
            acceleration[i] = acceleration[i].add_point(total);
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::force::{Body, test_support};

    fn exact(bodies: &[Body], charge: f64, alpha: f64) -> Vec<Point> {
        bodies
            .iter()
            .enumerate()
            .map(|(i, a)| {
                bodies
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .fold(Point::ORIGIN, |acc, (_, b)| {
                        let delta = b.position.sub_point(a.position);
                        acc.add_point(delta.scale(charge * alpha / delta.length_squared().max(1.0)))
                    })
            })
            .collect()
    }

    #[test]
    fn test_two_bodies_repel() {
        let bodies = [test_support::body(0, 0.0, 0.0), test_support::body(1, 10.0, 0.0)];
        let force = ManyBodyForce::new(0.9, 1.0, None);
        let acc = test_support::run(&force, &bodies, &[], -30.0, 1.0);

        // -30 * 10 / 100 = -3 on the left body, +3 on the right.
        assert_approx_eq!(f64, acc[0].x(), -3.0);
        assert_approx_eq!(f64, acc[1].x(), 3.0);
    }

    #[test]
    fn test_fixed_bodies_still_repel_others() {
        let mut bodies = [test_support::body(0, 0.0, 0.0), test_support::body(1, 10.0, 0.0)];
        bodies[0].fixed = true;
        let force = ManyBodyForce::new(0.9, 1.0, None);
        let acc = test_support::run(&force, &bodies, &[], -30.0, 1.0);

        assert!(acc[0].is_zero());
        assert_approx_eq!(f64, acc[1].x(), 3.0);
    }

    #[test]
    fn test_distance_max_cuts_off() {
        let bodies = [test_support::body(0, 0.0, 0.0), test_support::body(1, 300.0, 0.0)];
        let force = ManyBodyForce::new(0.9, 1.0, Some(250.0));
        let acc = test_support::run(&force, &bodies, &[], -30.0, 1.0);

        assert!(acc.iter().all(|a| a.is_zero()));
    }

    #[test]
    fn test_coincident_bodies_get_finite_push() {
        let bodies = [test_support::body(0, 2.0, 2.0), test_support::body(1, 2.0, 2.0)];
        let force = ManyBodyForce::new(0.9, 1.0, None);
        let acc = test_support::run(&force, &bodies, &[], -30.0, 1.0);

        assert!(acc.iter().all(|a| a.is_finite()));
        assert!(!acc[0].is_zero());
        assert_approx_eq!(f64, acc[0].x(), -acc[1].x());
        assert_approx_eq!(f64, acc[0].y(), -acc[1].y());
    }

    #[test]
    fn test_approximation_close_to_exact() {
        let bodies: Vec<_> = (0..60)
            .map(|i| {
                test_support::body(
                    i,
                    ((i * 37) % 101) as f64 * 4.0,
                    ((i * 53) % 97) as f64 * 4.0,
                )
            })
            .collect();
        let force = ManyBodyForce::new(0.5, 1.0, None);
        let approx = test_support::run(&force, &bodies, &[], -30.0, 1.0);
        let reference = exact(&bodies, -30.0, 1.0);
        let scale = reference.iter().map(|e| e.hypot()).fold(0.0, f64::max);

        for (a, e) in approx.iter().zip(&reference) {
            let error = a.sub_point(*e).hypot();
            assert!(
                error <= 0.1 * scale,
                "approximation error {error} too large for {e:?}"
            );
        }
    }

    #[test]
    fn test_zero_theta_limit_is_exact() {
        let bodies: Vec<_> = (0..12)
            .map(|i| test_support::body(i, (i % 4) as f64 * 20.0, (i / 4) as f64 * 15.0))
            .collect();
        let force = ManyBodyForce::new(1e-9, 1.0, None);
        let approx = test_support::run(&force, &bodies, &[], -30.0, 0.5);
        let reference = exact(&bodies, -30.0, 0.5);

        for (a, e) in approx.iter().zip(&reference) {
            assert_approx_eq!(f64, a.x(), e.x(), epsilon = 1e-9);
            assert_approx_eq!(f64, a.y(), e.y(), epsilon = 1e-9);
        }
    }
}
