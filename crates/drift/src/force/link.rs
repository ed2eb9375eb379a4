//! Spring force along links.

use drift_core::geometry::Point;

use super::{Force, ForceContext, jiggle};

/// Pulls or pushes the endpoints of every link toward its rest length.
///
/// The correction is measured on the positions the endpoints will reach
/// with their current velocity, scaled by the link strength and alpha, and
/// split between the endpoints by [`super::ResolvedLink::bias`] so that
/// high-degree nodes move less.
#[derive(Debug, Clone, Default)]
pub struct LinkForce;

impl LinkForce {
    pub fn new() -> Self {
        Self
    }
}

impl Force for LinkForce {
    fn name(&self) -> &'static str {
        "link"
    }

    fn apply(&self, context: &ForceContext<'_>, acceleration: &mut [Point]) {
        for link in context.links {
            let source = &context.bodies[link.source];
            let target = &context.bodies[link.target];
            if link.source == link.target || (source.fixed && target.fixed) {
                continue;
            }

            let mut delta = target
                .position
                .add_point(target.velocity)
                .sub_point(source.position.add_point(source.velocity));
            if delta.is_zero() {
                delta = jiggle(link.source, link.target);
            }

            let length = delta.hypot();
            let factor = (length - link.rest_length) / length * context.alpha * link.strength;
            let correction = delta.scale(factor);

            acceleration[link.target] =
                acceleration[link.target].sub_point(correction.scale(link.bias));
            acceleration[link.source] =
                acceleration[link.source].add_point(correction.scale(1.0 - link.bias));
        }
    }
}
