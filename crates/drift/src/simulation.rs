//! The simulation driver: cooling schedule, force evaluation and integration.
//!
//! [`Simulation`] owns the entity store, the configured force modules and
//! the random source used by the mutation API. Every [`Simulation::tick`]
//! first drains the queue of pending mutations, then, unless the layout has
//! converged, advances it by one step.

mod mutation;

use std::collections::VecDeque;

use log::{debug, info, trace, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use drift_core::geometry::Point;

use crate::{
    config::SimulationConfig,
    error::{Error, Result},
    force::{
        Body, CenterForce, CollisionForce, Force, ForceContext, LinkForce, ManyBodyForce,
        PositionForce, ResolvedLink,
    },
    quadtree::{Entry, QuadTree},
    snapshot::{RenderSink, Snapshot},
    store::{EntityStore, GraphData, ReconcileResult, Seeding},
};

pub use mutation::{ChildSpec, Mutation};

/// Outcome of one [`Simulation::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStatus {
    /// Alpha after the tick.
    pub alpha: f64,
    pub converged: bool,
}

/// An incremental force-directed layout.
///
/// The simulation is `Running` while alpha is above `alpha_min` and
/// `Converged` once it drops to it; ticks in the converged state leave every
/// node untouched. [`Simulation::restart`] leaves the converged state.
///
/// Ticks are deterministic: identical state, configuration and alpha give
/// bit-identical results. The random source `R` is only consumed by
/// [`Simulation::expand`].
///
/// # Examples
///
/// ```
/// use drift::{GraphData, Simulation, config::SimulationConfig};
///
/// let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
/// simulation
///     .reconcile(&GraphData::positional(3, [(0, 1), (1, 2)]))
///     .unwrap();
///
/// let ticks = simulation.run(1000);
/// assert!(simulation.is_converged());
/// assert!(ticks <= 1000);
/// assert_eq!(simulation.snapshot().nodes.len(), 3);
/// ```
#[derive(Debug)]
pub struct Simulation<R = ChaCha8Rng> {
    config: SimulationConfig,
    store: EntityStore,
    alpha: f64,
    alpha_target: f64,
    ticks: u64,
    forces: Vec<Box<dyn Force>>,
    pending: VecDeque<Mutation>,
    rng: R,
}

impl Simulation<ChaCha8Rng> {
    /// Creates an empty simulation whose random source is seeded from the config.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed());
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    /// Creates an empty simulation drawing expansion jitter from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if the configuration does not validate.
    pub fn with_rng(config: SimulationConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let forces = default_forces(&config);
        debug!(
            forces:? = forces.iter().map(|force| force.name()).collect::<Vec<_>>();
            "Configured force modules"
        );

        Ok(Self {
            alpha: 1.0,
            alpha_target: config.alpha().alpha_target(),
            ticks: 0,
            forces,
            pending: VecDeque::new(),
            store: EntityStore::new(),
            config,
            rng,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    /// Number of ticks that advanced the layout.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_converged(&self) -> bool {
        self.alpha <= self.config.alpha().alpha_min()
    }

    /// Appends a custom force module, evaluated after the configured ones.
    pub fn add_force(&mut self, force: Box<dyn Force>) {
        debug!(force = force.name(); "Added force module");
        self.forces.push(force);
    }

    /// Maps `data` onto the stored identities.
    ///
    /// Alpha is left alone; call [`Simulation::restart`] afterwards so the
    /// structural change settles at a high temperature.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Identity`] for a structurally invalid snapshot,
    /// in which case the store is unchanged.
    pub fn reconcile(&mut self, data: &GraphData) -> Result<ReconcileResult> {
        let seeding = Seeding {
            center: self.config.center(),
            initial_radius: self.config.placement().initial_radius(),
        };
        self.store.reconcile(data, seeding)
    }

    /// Resets alpha, leaving the converged state if `alpha` exceeds `alpha_min`.
    pub fn restart(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
        info!(alpha = self.alpha; "Restarted simulation");
    }

    /// Sets the value alpha decays toward.
    ///
    /// A target above `alpha_min` keeps the layout running indefinitely.
    pub fn reheat(&mut self, alpha_target: f64) {
        self.alpha_target = alpha_target.clamp(0.0, 1.0);
        info!(alpha_target = self.alpha_target; "Changed alpha target");
    }

    /// Advances the layout by one step.
    ///
    /// Pending mutations are applied first; a rejected one is logged and
    /// skipped. In the converged state nothing else happens.
    pub fn tick(&mut self) -> TickStatus {
        self.apply_pending();

        if self.is_converged() {
            return self.status();
        }

        self.step();
        self.ticks += 1;

        let alpha = self.config.alpha();
        self.alpha += (self.alpha_target - self.alpha) * alpha.alpha_decay();
        trace!(tick = self.ticks, alpha = self.alpha; "Tick");

        let status = self.status();
        if status.converged {
            info!(ticks = self.ticks, nodes = self.store.len(); "Layout converged");
        }
        status
    }

    /// Ticks once and hands the resulting snapshot to `sink`.
    pub fn tick_into(&mut self, sink: &mut impl RenderSink) -> TickStatus {
        let status = self.tick();
        sink.on_tick(&self.snapshot());
        status
    }

    /// Ticks until converged or `max_ticks` steps were taken.
    ///
    /// Returns the number of steps taken; zero if the layout was already converged.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        self.apply_pending();
        for taken in 0..max_ticks {
            if self.is_converged() {
                return taken;
            }
            self.tick();
        }
        max_ticks
    }

    /// Read-only view of the current positions.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.store)
    }

    /// Applies every queued mutation in order, returning the rejected ones' errors.
    pub fn apply_pending(&mut self) -> Vec<Error> {
        let mut rejected = Vec::new();
        while let Some(mutation) = self.pending.pop_front() {
            let kind = mutation.kind();
            if let Err(err) = self.apply(mutation) {
                warn!(mutation = kind, err:%; "Rejected queued mutation");
                rejected.push(err);
            }
        }
        rejected
    }

    fn status(&self) -> TickStatus {
        TickStatus {
            alpha: self.alpha,
            converged: self.is_converged(),
        }
    }

    /// Evaluates every force against the pre-tick state, then integrates.
    fn step(&mut self) {
        let default_radius = self.config.collision().radius();
        let bodies: Vec<Body> = self
            .store
            .nodes()
            .map(|node| Body {
                id: node.id(),
                position: node.position(),
                velocity: node.velocity(),
                fixed: node.is_fixed(),
                radius: node.radius().unwrap_or(default_radius),
            })
            .collect();

        let links = self.resolve_links();

        let charge = self.config.many_body().strength();
        let entries: Vec<Entry> = bodies
            .iter()
            .map(|body| Entry::new(body.position, charge, body.radius))
            .collect();
        let index = QuadTree::build(&entries);

        let context = ForceContext {
            bodies: &bodies,
            links: &links,
            index: &index,
            alpha: self.alpha,
        };
        let mut acceleration = vec![Point::ORIGIN; bodies.len()];
        for force in &self.forces {
            force.apply(&context, &mut acceleration);
        }

        let retain = 1.0 - self.config.alpha().velocity_decay();
        for (node, a) in self.store.nodes_mut().zip(&acceleration) {
            if let Some(fixed) = node.fixed_position() {
                node.set_motion(fixed, Point::ORIGIN);
                continue;
            }
            let velocity = node.velocity().add_point(*a).scale(retain);
            let position = node.position().add_point(velocity);
            node.set_motion(position, velocity);
        }
    }

    fn resolve_links(&self) -> Vec<ResolvedLink> {
        let degrees = self.store.degrees();
        let policy = self.config.link();

        self.store
            .links()
            .filter_map(|link| {
                let source = self.store.index_of(link.source())?;
                let target = self.store.index_of(link.target())?;
                let (source_degree, target_degree) = (degrees[source], degrees[target]);

                let rest_length = link.rest_length().unwrap_or_else(|| {
                    let expanded = |id| self.store.get(id).is_some_and(|node| node.is_expanded());
                    policy
                        .distance()
                        .rest_length(expanded(link.source()), expanded(link.target()))
                });
                let strength = link
                    .strength()
                    .unwrap_or_else(|| policy.strength().strength(source_degree, target_degree));
                let total = (source_degree + target_degree).max(1) as f64;

                Some(ResolvedLink {
                    source,
                    target,
                    rest_length,
                    strength,
                    bias: source_degree as f64 / total,
                })
            })
            .collect()
    }
}

/// Builds the force modules enabled by `config`.
fn default_forces(config: &SimulationConfig) -> Vec<Box<dyn Force>> {
    let mut forces: Vec<Box<dyn Force>> = vec![Box::new(LinkForce::new())];

    if config.many_body().enabled() {
        forces.push(Box::new(ManyBodyForce::from_config(config.many_body())));
    }
    if config.collision().enabled() {
        forces.push(Box::new(CollisionForce::from_config(config.collision())));
    }
    let centering = config.centering();
    if centering.enabled() {
        let target = centering.target().unwrap_or(config.center());
        forces.push(Box::new(CenterForce::new(target, centering.strength())));
    }
    if config.positioning().is_active() {
        forces.push(Box::new(PositionForce::from_config(config.positioning())));
    }
    forces
}
