//! Configuration types for the force simulation.
//!
//! Every tunable of the engine lives here, so that the radius, link-distance
//! and charge heuristics of a particular graph are policy rather than code.
//! All types implement [`serde::Deserialize`] for loading from external
//! sources; every field has a default.
//!
//! # Overview
//!
//! - [`SimulationConfig`] - Top-level configuration of one simulation.
//! - [`AlphaConfig`] - Cooling schedule and velocity decay.
//! - [`LinkConfig`] - Spring force policies ([`LinkDistance`], [`LinkStrength`]).
//! - [`ManyBodyConfig`] - Barnes–Hut repulsion.
//! - [`CollisionConfig`] - Overlap avoidance.
//! - [`CenterConfig`] - Centroid translation toward the layout center.
//! - [`PositionConfig`] - Optional pull toward fixed x / y lines.
//! - [`PlacementConfig`] - Seeding of entered and expanded nodes.
//!
//! # Example
//!
//! ```
//! # use drift::config::SimulationConfig;
//! let config: SimulationConfig = toml::from_str(r#"
//!     seed = 7
//!
//!     [many_body]
//!     strength = -100.0
//!
//!     [link.distance]
//!     kind = "clustered"
//!     open = 150.0
//!     closed = 25.0
//! "#).unwrap();
//!
//! assert_eq!(config.seed(), 7);
//! assert_eq!(config.many_body().strength(), -100.0);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use drift_core::geometry::Point;

use crate::error::{Error, Result};

/// Top-level configuration of one simulation instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed of the default random source used for expansion jitter.
    seed: u64,

    /// Layout center: spawn point of unanchored nodes and default centering target.
    center: Point,

    alpha: AlphaConfig,
    link: LinkConfig,
    many_body: ManyBodyConfig,
    collision: CollisionConfig,
    centering: CenterConfig,
    positioning: PositionConfig,
    placement: PlacementConfig,
}

impl SimulationConfig {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn alpha(&self) -> &AlphaConfig {
        &self.alpha
    }

    pub fn link(&self) -> &LinkConfig {
        &self.link
    }

    pub fn many_body(&self) -> &ManyBodyConfig {
        &self.many_body
    }

    pub fn collision(&self) -> &CollisionConfig {
        &self.collision
    }

    pub fn centering(&self) -> &CenterConfig {
        &self.centering
    }

    pub fn positioning(&self) -> &PositionConfig {
        &self.positioning
    }

    pub fn placement(&self) -> &PlacementConfig {
        &self.placement
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    pub fn with_alpha(mut self, alpha: AlphaConfig) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    pub fn with_many_body(mut self, many_body: ManyBodyConfig) -> Self {
        self.many_body = many_body;
        self
    }

    pub fn with_collision(mut self, collision: CollisionConfig) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_centering(mut self, centering: CenterConfig) -> Self {
        self.centering = centering;
        self
    }

    pub fn with_positioning(mut self, positioning: PositionConfig) -> Self {
        self.positioning = positioning;
        self
    }

    pub fn with_placement(mut self, placement: PlacementConfig) -> Self {
        self.placement = placement;
        self
    }

    /// Checks that every parameter lies in its admissible range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, message: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidConfig(message.to_string()))
            }
        }

        let alpha = &self.alpha;
        check(self.center.is_finite(), "center must be finite")?;
        check(
            (0.0..=1.0).contains(&alpha.alpha_min),
            "alpha_min must lie in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&alpha.alpha_decay),
            "alpha_decay must lie in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&alpha.alpha_target),
            "alpha_target must lie in [0, 1]",
        )?;
        check(
            (0.0..1.0).contains(&alpha.velocity_decay),
            "velocity_decay must lie in [0, 1)",
        )?;
        check(
            self.many_body.theta > 0.0 && self.many_body.theta.is_finite(),
            "many_body.theta must be positive",
        )?;
        check(
            self.many_body.strength.is_finite(),
            "many_body.strength must be finite",
        )?;
        check(
            self.many_body.distance_min > 0.0 && self.many_body.distance_min.is_finite(),
            "many_body.distance_min must be positive and finite",
        )?;
        check(
            self.many_body
                .distance_max
                .is_none_or(|max| max > self.many_body.distance_min),
            "many_body.distance_max must exceed distance_min",
        )?;
        check(
            self.collision.radius >= 0.0 && self.collision.radius.is_finite(),
            "collision.radius must be finite and not negative",
        )?;
        check(
            self.collision.strength.is_finite(),
            "collision.strength must be finite",
        )?;
        check(
            self.collision.iterations > 0,
            "collision.iterations must be at least 1",
        )?;
        check(
            self.link.distance.is_valid(),
            "link.distance must be finite and not negative",
        )?;
        check(
            self.link.strength.is_valid(),
            "link.strength must be finite",
        )?;
        check(
            self.centering.strength.is_finite()
                && self.centering.target.is_none_or(Point::is_finite),
            "centering strength and target must be finite",
        )?;
        check(
            self.positioning.strength.is_finite()
                && self.positioning.x.is_none_or(f64::is_finite)
                && self.positioning.y.is_none_or(f64::is_finite),
            "positioning strength and targets must be finite",
        )?;
        check(
            [self.placement.initial_radius, self.placement.expand_jitter]
                .iter()
                .all(|radius| *radius >= 0.0 && radius.is_finite()),
            "placement radii must be finite and not negative",
        )?;
        check(
            (0.0..=1.0).contains(&self.placement.expand_alpha),
            "placement.expand_alpha must lie in [0, 1]",
        )?;
        Ok(())
    }
}

/// Cooling schedule ("alpha") and velocity decay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlphaConfig {
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            alpha_min,
            // Reaches alpha_min from 1 in 300 ticks.
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
        }
    }
}

impl AlphaConfig {
    pub fn alpha_min(&self) -> f64 {
        self.alpha_min
    }

    pub fn alpha_decay(&self) -> f64 {
        self.alpha_decay
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn velocity_decay(&self) -> f64 {
        self.velocity_decay
    }

    pub fn with_alpha_min(mut self, alpha_min: f64) -> Self {
        self.alpha_min = alpha_min;
        self
    }

    pub fn with_alpha_decay(mut self, alpha_decay: f64) -> Self {
        self.alpha_decay = alpha_decay;
        self
    }

    pub fn with_alpha_target(mut self, alpha_target: f64) -> Self {
        self.alpha_target = alpha_target;
        self
    }

    pub fn with_velocity_decay(mut self, velocity_decay: f64) -> Self {
        self.velocity_decay = velocity_decay;
        self
    }
}

/// Rest length policy for links without an explicit `rest_length`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum LinkDistance {
    /// Every link has the same rest length.
    Constant { value: f64 },

    /// `open` between two expanded nodes, `closed` otherwise.
    ///
    /// Keeps expanded clusters apart while their children stay tight.
    Clustered { open: f64, closed: f64 },
}

impl Default for LinkDistance {
    fn default() -> Self {
        Self::Constant { value: 30.0 }
    }
}

impl LinkDistance {
    /// Rest length of a link whose endpoints have the given expansion state.
    pub fn rest_length(&self, source_expanded: bool, target_expanded: bool) -> f64 {
        match *self {
            Self::Constant { value } => value,
            Self::Clustered { open, closed } => {
                if source_expanded && target_expanded {
                    open
                } else {
                    closed
                }
            }
        }
    }

    fn is_valid(&self) -> bool {
        match *self {
            Self::Constant { value } => value >= 0.0 && value.is_finite(),
            Self::Clustered { open, closed } => {
                [open, closed].iter().all(|d| *d >= 0.0 && d.is_finite())
            }
        }
    }
}

/// Stiffness policy for links without an explicit `strength`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum LinkStrength {
    /// `1 / min(degree(source), degree(target))`, softening links into hubs.
    #[default]
    Degree,

    Constant { value: f64 },
}

impl LinkStrength {
    /// Strength of a link whose endpoints have the given degrees.
    pub fn strength(&self, source_degree: usize, target_degree: usize) -> f64 {
        match *self {
            Self::Degree => 1.0 / source_degree.min(target_degree).max(1) as f64,
            Self::Constant { value } => value,
        }
    }

    fn is_valid(&self) -> bool {
        match *self {
            Self::Degree => true,
            Self::Constant { value } => value.is_finite(),
        }
    }
}

/// Spring force configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    distance: LinkDistance,
    strength: LinkStrength,
}

impl LinkConfig {
    pub fn new(distance: LinkDistance, strength: LinkStrength) -> Self {
        Self { distance, strength }
    }

    pub fn distance(&self) -> LinkDistance {
        self.distance
    }

    pub fn strength(&self) -> LinkStrength {
        self.strength
    }
}

/// Barnes–Hut repulsion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManyBodyConfig {
    enabled: bool,
    /// Negative values repel, positive values attract.
    strength: f64,
    theta: f64,
    distance_min: f64,
    distance_max: Option<f64>,
}

impl Default for ManyBodyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: -30.0,
            theta: 0.9,
            distance_min: 1.0,
            distance_max: None,
        }
    }
}

impl ManyBodyConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn distance_min(&self) -> f64 {
        self.distance_min
    }

    pub fn distance_max(&self) -> Option<f64> {
        self.distance_max
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_distance_max(mut self, distance_max: Option<f64>) -> Self {
        self.distance_max = distance_max;
        self
    }
}

/// Collision (overlap avoidance) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollisionConfig {
    enabled: bool,
    /// Radius of nodes that do not carry their own.
    radius: f64,
    strength: f64,
    iterations: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 1.0,
            strength: 1.0,
            iterations: 1,
        }
    }
}

impl CollisionConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

/// Centering force configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CenterConfig {
    enabled: bool,
    strength: f64,
    /// Overrides the layout center as the centering target.
    target: Option<Point>,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: 1.0,
            target: None,
        }
    }
}

impl CenterConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn target(&self) -> Option<Point> {
        self.target
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_target(mut self, target: Option<Point>) -> Self {
        self.target = target;
        self
    }
}

/// Pull toward a vertical line (`x`) and/or a horizontal line (`y`).
///
/// Both are unset by default, which disables the force.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PositionConfig {
    x: Option<f64>,
    y: Option<f64>,
    strength: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            strength: 0.1,
        }
    }
}

impl PositionConfig {
    pub fn x(&self) -> Option<f64> {
        self.x
    }

    pub fn y(&self) -> Option<f64> {
        self.y
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn with_x(mut self, x: Option<f64>) -> Self {
        self.x = x;
        self
    }

    pub fn with_y(mut self, y: Option<f64>) -> Self {
        self.y = y;
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn is_active(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }
}

/// Seeding of new nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    /// Scale of the spiral offset separating co-entered nodes.
    initial_radius: f64,
    /// Half-width of the square in which expanded children are jittered around their parent.
    expand_jitter: f64,
    /// Alpha the simulation restarts with after an expansion.
    expand_alpha: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            initial_radius: 10.0,
            expand_jitter: 10.0,
            expand_alpha: 1.0,
        }
    }
}

impl PlacementConfig {
    pub fn initial_radius(&self) -> f64 {
        self.initial_radius
    }

    pub fn expand_jitter(&self) -> f64 {
        self.expand_jitter
    }

    pub fn expand_alpha(&self) -> f64 {
        self.expand_alpha
    }

    pub fn with_expand_alpha(mut self, expand_alpha: f64) -> Self {
        self.expand_alpha = expand_alpha;
        self
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_approx_eq!(f64, config.alpha().velocity_decay(), 0.4);
        assert_approx_eq!(f64, config.many_body().theta(), 0.9);
        assert_eq!(config.collision().iterations(), 1);
    }

    #[test]
    fn test_default_decay_reaches_alpha_min_in_300_ticks() {
        let alpha = AlphaConfig::default();
        let remaining = (1.0 - alpha.alpha_decay()).powi(300);
        assert_approx_eq!(f64, remaining, alpha.alpha_min(), epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_velocity_decay() {
        let config = SimulationConfig::default()
            .with_alpha(AlphaConfig::default().with_velocity_decay(1.0));
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_distance_max() {
        let config = SimulationConfig::default()
            .with_many_body(ManyBodyConfig::default().with_distance_max(Some(0.5)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_collision_iterations_rejected() {
        let config = SimulationConfig::default()
            .with_collision(CollisionConfig::default().with_iterations(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for source in [
            "[placement]\nexpand_jitter = inf",
            "[placement]\ninitial_radius = nan",
            "[many_body]\ndistance_min = inf",
            "[many_body]\nstrength = -inf",
            "[collision]\nradius = inf",
            "[collision]\nstrength = nan",
            "[centering]\nstrength = inf",
            "[centering]\ntarget = { x = nan, y = 0.0 }",
            "[positioning]\nx = inf",
            "[link.distance]\nkind = \"constant\"\nvalue = inf",
            "[link.strength]\nkind = \"constant\"\nvalue = nan",
        ] {
            let config: SimulationConfig = toml::from_str(source).unwrap();
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "accepted {source:?}"
            );
        }
    }

    #[test]
    fn test_clustered_distance_policy() {
        let policy = LinkDistance::Clustered {
            open: 150.0,
            closed: 25.0,
        };
        assert_approx_eq!(f64, policy.rest_length(true, true), 150.0);
        assert_approx_eq!(f64, policy.rest_length(true, false), 25.0);
        assert_approx_eq!(f64, policy.rest_length(false, false), 25.0);
    }

    #[test]
    fn test_degree_strength_policy() {
        assert_approx_eq!(f64, LinkStrength::Degree.strength(1, 4), 1.0);
        assert_approx_eq!(f64, LinkStrength::Degree.strength(3, 2), 0.5);
        assert_approx_eq!(
            f64,
            LinkStrength::Constant { value: 0.7 }.strength(3, 2),
            0.7
        );
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let config: SimulationConfig = toml::from_str(
            r#"
            [alpha]
            velocity_decay = 0.6

            [collision]
            radius = 13.0

            [positioning]
            x = 0.0
            "#,
        )
        .unwrap();

        assert_approx_eq!(f64, config.alpha().velocity_decay(), 0.6);
        assert_approx_eq!(f64, config.alpha().alpha_min(), 0.001);
        assert_approx_eq!(f64, config.collision().radius(), 13.0);
        assert!(config.positioning().is_active());
        assert_eq!(config.positioning().y(), None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<SimulationConfig, _> = toml::from_str("gravity = 1.0");
        assert!(result.is_err());
    }
}
