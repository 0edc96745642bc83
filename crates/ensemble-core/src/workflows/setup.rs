//! Turns a declarative description into a populated, runnable system.

use super::WorkflowError;
use crate::core::models::atom::Atom;
use crate::core::models::boundary::Boundary;
use crate::core::models::system::SimulationBox;
use crate::core::potentials::analytic::{LennardJones, SoftSphere};
use crate::core::potentials::PairPotential;
use crate::engine::config::{PotentialForm, SimulationSpec};
use crate::engine::registry::PotentialRegistry;
use crate::engine::simulation::Simulation;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;
use tracing::debug;

/// Builds a [`Simulation`] from a validated spec: boundary, lattice-placed
/// atoms, and the interaction table. Neighbor lists are not built yet; the
/// integrator's reset does that.
pub fn build_simulation(spec: &SimulationSpec) -> Result<Simulation, WorkflowError> {
    spec.validate()?;

    let lengths = Vector3::new(
        spec.region.lengths[0],
        spec.region.lengths[1],
        spec.region.lengths[2],
    );
    let mut system = SimulationBox::new(Boundary::new(lengths, spec.region.periodic));
    place_lattice(&mut system, spec);

    let mut registry = PotentialRegistry::new();
    for p in &spec.potentials {
        let potential: Arc<dyn PairPotential> = match p.form {
            PotentialForm::LennardJones {
                epsilon,
                sigma,
                cutoff,
            } => Arc::new(LennardJones::new(epsilon, sigma, cutoff)),
            PotentialForm::SoftSphere {
                epsilon,
                sigma,
                exponent,
                cutoff,
            } => Arc::new(SoftSphere::new(epsilon, sigma, exponent, cutoff)),
        };
        registry.register_with_margin(
            p.species.0,
            p.species.1,
            potential,
            spec.neighbor.safety_margin,
        );
    }

    debug!(
        atoms = system.len(),
        potentials = registry.len(),
        "system assembled"
    );
    Ok(Simulation::new(system, registry, spec.neighbor))
}

/// Places every species on a shared simple-cubic lattice spanning the box.
///
/// Sites are filled in row-major order, species after species, so mixtures
/// start segregated; equilibration is the integrator's job.
fn place_lattice(system: &mut SimulationBox, spec: &SimulationSpec) {
    let total: usize = spec.species.iter().map(|s| s.count).sum();
    let per_edge = (total as f64).cbrt().ceil().max(1.0) as usize;
    let lengths = system.boundary().lengths();
    let spacing = lengths / per_edge as f64;

    let mut sites = (0..total).map(|site| {
        let i = site % per_edge;
        let j = (site / per_edge) % per_edge;
        let k = site / (per_edge * per_edge);
        Point3::new(
            (i as f64 + 0.5) * spacing.x,
            (j as f64 + 0.5) * spacing.y,
            (k as f64 + 0.5) * spacing.z,
        )
    });
    for (species, s) in spec.species.iter().enumerate() {
        for _ in 0..s.count {
            // sites yields exactly `total` positions
            if let Some(position) = sites.next() {
                system.add_atom(Atom::new(species as u32, position).with_mass(s.mass));
            }
        }
    }
}

/// Draws Maxwell-Boltzmann velocities at the given temperature (reduced
/// units) and removes the net momentum so the system has no bulk drift.
/// A non-positive temperature leaves all velocities at zero.
pub fn seed_velocities(system: &mut SimulationBox, temperature: f64, rng: &mut StdRng) {
    if temperature <= 0.0 || system.is_empty() {
        return;
    }
    for (_, atom) in system.atoms_iter_mut() {
        let sigma = (temperature / atom.mass).sqrt();
        let Ok(normal) = Normal::new(0.0, sigma) else {
            continue;
        };
        atom.velocity = Vector3::new(
            normal.sample(rng),
            normal.sample(rng),
            normal.sample(rng),
        );
    }

    let total_mass: f64 = system.atoms_iter().map(|(_, a)| a.mass).sum();
    let momentum: Vector3<f64> = system
        .atoms_iter()
        .map(|(_, a)| a.velocity * a.mass)
        .sum();
    let drift = momentum / total_mass;
    for (_, atom) in system.atoms_iter_mut() {
        atom.velocity -= drift;
    }
}

/// Derives a deterministic RNG from the spec's seed, or an OS-seeded one.
pub fn rng_from_spec(spec: &SimulationSpec) -> StdRng {
    use rand::SeedableRng;
    match spec.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// The seed handed to stochastic integrators, derived from the setup RNG so
/// that one spec seed fixes the whole run.
pub fn integrator_seed(rng: &mut StdRng) -> u64 {
    rng.gen_range(0..u64::MAX)
}
