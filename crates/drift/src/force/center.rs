//! Translation of the free nodes toward the layout center.

use drift_core::geometry::Point;

use super::{Force, ForceContext};

/// Shifts every free body by the same amount so that the centroid of the
/// free bodies moves toward `target`.
///
/// Relative positions are unaffected. Not scaled by alpha.
#[derive(Debug, Clone)]
pub struct CenterForce {
    target: Point,
    strength: f64,
}

impl CenterForce {
    pub fn new(target: Point, strength: f64) -> Self {
        Self { target, strength }
    }

    pub fn target(&self) -> Point {
        self.target
    }
}

impl Force for CenterForce {
    fn name(&self) -> &'static str {
        "center"
    }

    fn apply(&self, context: &ForceContext<'_>, acceleration: &mut [Point]) {
        let free = context
            .bodies
            .iter()
            .filter(|body| !body.fixed && body.position.is_finite())
            .map(|body| body.position);
        let Some(centroid) = Point::centroid(free) else {
            return;
        };

        let shift = self.target.sub_point(centroid).scale(self.strength);
        for (body, a) in context.bodies.iter().zip(acceleration.iter_mut()) {
            if !body.fixed {
                *a = a.add_point(shift);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::force::test_support;

    #[test]
    fn test_centroid_moves_to_target() {
        let bodies = [test_support::body(0, 10.0, 10.0), test_support::body(1, 30.0, 20.0)];
        let force = CenterForce::new(Point::new(0.0, 0.0), 1.0);
        let acc = test_support::run(&force, &bodies, &[], 0.0, 0.1);

        // Centroid (20, 15); both bodies shift by (-20, -15).
        for a in &acc {
            assert_approx_eq!(f64, a.x(), -20.0);
            assert_approx_eq!(f64, a.y(), -15.0);
        }
    }

    #[test]
    fn test_fixed_bodies_excluded() {
        let mut bodies = [test_support::body(0, 100.0, 0.0), test_support::body(1, 4.0, 0.0)];
        bodies[0].fixed = true;
        let force = CenterForce::new(Point::new(0.0, 0.0), 0.5);
        let acc = test_support::run(&force, &bodies, &[], 0.0, 1.0);

        assert!(acc[0].is_zero());
        assert_approx_eq!(f64, acc[1].x(), -2.0);
    }

    #[test]
    fn test_no_free_bodies() {
        let mut bodies = [test_support::body(0, 5.0, 5.0)];
        bodies[0].fixed = true;
        let acc = test_support::run(&CenterForce::new(Point::ORIGIN, 1.0), &bodies, &[], 0.0, 1.0);
        assert!(acc[0].is_zero());
    }
}
