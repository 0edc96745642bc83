use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// What to do when an atom is found to have moved beyond the full safety
/// margin before the rebuild triggered, meaning an interaction may already
/// have been silently missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsafeListPolicy {
    /// Log a warning and continue; the rebuild has already run by the time
    /// the condition is detected.
    #[default]
    Warn,
    /// Stop the simulation with [`EngineError::UnsafeDisplacement`](super::error::EngineError::UnsafeDisplacement),
    /// invalidating the current sampling pass.
    Fail,
}

/// Tuning for the neighbor-list machinery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborConfig {
    /// Staleness is checked every this many completed steps.
    pub update_interval: u32,
    /// Extra listing range beyond the interaction cutoff (the Verlet skin).
    /// Larger margins list more pairs but rebuild less often.
    pub safety_margin: f64,
    /// Policy for the unsafe-displacement diagnostic.
    pub unsafe_policy: UnsafeListPolicy,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            update_interval: 10,
            safety_margin: 0.5,
            unsafe_policy: UnsafeListPolicy::Warn,
        }
    }
}

/// Geometry of the simulated region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub lengths: [f64; 3],
    #[serde(default = "default_periodic")]
    pub periodic: [bool; 3],
}

fn default_periodic() -> [bool; 3] {
    [true; 3]
}

/// One species of particles to place in the box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSpec {
    pub count: usize,
    #[serde(default = "default_mass")]
    pub mass: f64,
}

fn default_mass() -> f64 {
    1.0
}

/// An analytic pair-potential form, deserializable from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "kebab-case")]
pub enum PotentialForm {
    LennardJones { epsilon: f64, sigma: f64, cutoff: f64 },
    SoftSphere { epsilon: f64, sigma: f64, exponent: i32, cutoff: f64 },
}

/// A potential applied to an (unordered) pair of species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialSpec {
    pub species: (u32, u32),
    #[serde(flatten)]
    pub form: PotentialForm,
}

/// Which integrator drives the simulation, with its parameters.
///
/// Temperatures are in reduced units (k_B = 1), so `temperature` carries the
/// dimensions of energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IntegratorSpec {
    MonteCarlo {
        temperature: f64,
        max_displacement: f64,
        #[serde(default)]
        hard_core_diameter: f64,
        #[serde(default)]
        ignore_overlap: bool,
    },
    MolecularDynamics {
        time_step: f64,
        #[serde(default)]
        initial_temperature: f64,
    },
}

/// A complete declarative description of a simulation run, consumed by
/// [`workflows::simulate`](crate::workflows::simulate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSpec {
    pub region: RegionSpec,
    pub species: Vec<SpeciesSpec>,
    pub potentials: Vec<PotentialSpec>,
    #[serde(default)]
    pub neighbor: NeighborConfig,
    pub integrator: IntegratorSpec,
    pub steps: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationSpec {
    /// Validates cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.species.iter().map(|s| s.count).sum::<usize>() == 0 {
            return Err(ConfigError::MissingParameter("species.count"));
        }
        if self.potentials.is_empty() {
            return Err(ConfigError::MissingParameter("potentials"));
        }
        if self.species.iter().any(|s| s.mass <= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "species.mass",
                reason: "masses must be positive".into(),
            });
        }
        if self.region.lengths.iter().any(|&l| l <= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "region.lengths",
                reason: "edge lengths must be positive".into(),
            });
        }
        let n_species = self.species.len() as u32;
        for p in &self.potentials {
            if p.species.0 >= n_species || p.species.1 >= n_species {
                return Err(ConfigError::InvalidParameter {
                    name: "potentials.species",
                    reason: format!(
                        "species pair {:?} out of range (have {} species)",
                        p.species, n_species
                    ),
                });
            }
        }
        if self.neighbor.safety_margin < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "neighbor.safety_margin",
                reason: "safety margin cannot be negative".into(),
            });
        }
        match self.integrator {
            IntegratorSpec::MonteCarlo { temperature, .. } if temperature <= 0.0 => {
                Err(ConfigError::InvalidParameter {
                    name: "integrator.temperature",
                    reason: "temperature must be positive".into(),
                })
            }
            IntegratorSpec::MolecularDynamics { time_step, .. } if time_step <= 0.0 => {
                Err(ConfigError::InvalidParameter {
                    name: "integrator.time_step",
                    reason: "time step must be positive".into(),
                })
            }
            _ => Ok(()),
        }
    }
}
