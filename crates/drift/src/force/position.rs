//! Per-axis attraction toward fixed coordinates.

use drift_core::geometry::Point;

use super::{Force, ForceContext};
use crate::config::PositionConfig;

/// Pulls each free body toward `x` and/or `y`, proportionally to its distance
/// on that axis, scaled by strength and alpha. An axis without a target is
/// left alone.
#[derive(Debug, Clone)]
pub struct PositionForce {
    x: Option<f64>,
    y: Option<f64>,
    strength: f64,
}

impl PositionForce {
    pub fn new(x: Option<f64>, y: Option<f64>, strength: f64) -> Self {
        Self { x, y, strength }
    }

    pub fn from_config(config: &PositionConfig) -> Self {
        Self::new(config.x(), config.y(), config.strength())
    }
}

impl Force for PositionForce {
    fn name(&self) -> &'static str {
        "position"
    }

    fn apply(&self, context: &ForceContext<'_>, acceleration: &mut [Point]) {
        let k = self.strength * context.alpha;
        for (body, a) in context.bodies.iter().zip(acceleration.iter_mut()) {
            if body.fixed {
                continue;
            }
            let dx = self.x.map_or(0.0, |x| (x - body.position.x()) * k);
            let dy = self.y.map_or(0.0, |y| (y - body.position.y()) * k);
            *a = a.add_point(Point::new(dx, dy));
        }
    }
}
