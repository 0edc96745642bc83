use super::{PairEnergy, PairPotential};
use nalgebra::Vector3;

// Overlapping pairs report this instead of an infinity so that sums stay
// finite and comparable.
const OVERLAP_ENERGY: f64 = 1e10;
const MIN_DISTANCE_SQ: f64 = 1e-12;

/// Truncated 12-6 Lennard-Jones potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LennardJones {
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64, cutoff: f64) -> Self {
        Self {
            epsilon,
            sigma,
            cutoff,
        }
    }
}

impl PairPotential for LennardJones {
    fn range(&self) -> f64 {
        self.cutoff
    }

    fn evaluate(&self, separation: &Vector3<f64>) -> PairEnergy {
        let r2 = separation.norm_squared();
        if r2 >= self.cutoff * self.cutoff {
            return PairEnergy::ZERO;
        }
        if r2 < MIN_DISTANCE_SQ {
            return PairEnergy {
                energy: OVERLAP_ENERGY,
                force: Vector3::zeros(),
            };
        }
        let s2 = self.sigma * self.sigma / r2;
        let s6 = s2 * s2 * s2;
        let s12 = s6 * s6;
        let energy = 4.0 * self.epsilon * (s12 - s6);
        // du/dr / r, applied to the separation vector gives the force on A.
        let scale = 24.0 * self.epsilon * (s6 - 2.0 * s12) / r2;
        PairEnergy {
            energy,
            force: separation * scale,
        }
    }
}

/// Purely repulsive inverse-power (soft-sphere) potential, u = ε(σ/r)ⁿ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftSphere {
    pub epsilon: f64,
    pub sigma: f64,
    pub exponent: i32,
    pub cutoff: f64,
}

impl SoftSphere {
    pub fn new(epsilon: f64, sigma: f64, exponent: i32, cutoff: f64) -> Self {
        Self {
            epsilon,
            sigma,
            exponent,
            cutoff,
        }
    }
}

impl PairPotential for SoftSphere {
    fn range(&self) -> f64 {
        self.cutoff
    }

    fn evaluate(&self, separation: &Vector3<f64>) -> PairEnergy {
        let r2 = separation.norm_squared();
        if r2 >= self.cutoff * self.cutoff {
            return PairEnergy::ZERO;
        }
        if r2 < MIN_DISTANCE_SQ {
            return PairEnergy {
                energy: OVERLAP_ENERGY,
                force: Vector3::zeros(),
            };
        }
        let r = r2.sqrt();
        let energy = self.epsilon * (self.sigma / r).powi(self.exponent);
        let scale = -(self.exponent as f64) * energy / r2;
        PairEnergy {
            energy,
            force: separation * scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn lennard_jones_is_zero_at_sigma() {
        let lj = LennardJones::new(1.0, 1.0, 2.5);
        let result = lj.evaluate(&Vector3::new(1.0, 0.0, 0.0));
        assert!(f64_approx_equal(result.energy, 0.0));
    }

    #[test]
    fn lennard_jones_minimum_is_at_well_depth() {
        let lj = LennardJones::new(1.5, 1.0, 5.0);
        let r_min = 2.0f64.powf(1.0 / 6.0);
        let result = lj.evaluate(&Vector3::new(r_min, 0.0, 0.0));
        assert!(f64_approx_equal(result.energy, -1.5));
        // The force vanishes at the minimum.
        assert!(result.force.norm() < 1e-9);
    }

    #[test]
    fn lennard_jones_force_is_repulsive_inside_sigma() {
        let lj = LennardJones::new(1.0, 1.0, 2.5);
        let result = lj.evaluate(&Vector3::new(0.9, 0.0, 0.0));
        // Separation points from A toward B; A is pushed the other way.
        assert!(result.force.x < 0.0);
    }

    #[test]
    fn lennard_jones_truncates_at_cutoff() {
        let lj = LennardJones::new(1.0, 1.0, 2.5);
        assert_eq!(lj.evaluate(&Vector3::new(2.5, 0.0, 0.0)), PairEnergy::ZERO);
        assert_eq!(lj.evaluate(&Vector3::new(3.0, 0.0, 0.0)), PairEnergy::ZERO);
    }

    #[test]
    fn lennard_jones_overlap_is_finite_and_large() {
        let lj = LennardJones::new(1.0, 1.0, 2.5);
        let result = lj.evaluate(&Vector3::zeros());
        assert!(f64_approx_equal(result.energy, OVERLAP_ENERGY));
        assert!(result.force.norm() < TOLERANCE);
    }

    #[test]
    fn soft_sphere_energy_matches_inverse_power() {
        let ss = SoftSphere::new(2.0, 1.0, 12, 3.0);
        let result = ss.evaluate(&Vector3::new(0.5, 0.0, 0.0));
        assert!(f64_approx_equal(result.energy, 2.0 * 2.0f64.powi(12)));
    }

    #[test]
    fn soft_sphere_force_is_always_repulsive() {
        let ss = SoftSphere::new(1.0, 1.0, 12, 3.0);
        for r in [0.5, 0.9, 1.3, 2.0] {
            let result = ss.evaluate(&Vector3::new(r, 0.0, 0.0));
            assert!(result.force.x < 0.0, "force not repulsive at r = {r}");
        }
    }

    #[test]
    fn forces_match_numeric_energy_gradient() {
        let lj = LennardJones::new(1.0, 1.0, 2.5);
        let h = 1e-6;
        for r in [0.95, 1.1, 1.5, 2.0] {
            let e_plus = lj.evaluate(&Vector3::new(r + h, 0.0, 0.0)).energy;
            let e_minus = lj.evaluate(&Vector3::new(r - h, 0.0, 0.0)).energy;
            let du_dr = (e_plus - e_minus) / (2.0 * h);
            let force = lj.evaluate(&Vector3::new(r, 0.0, 0.0)).force;
            assert!(
                (force.x - du_dr).abs() < 1e-4,
                "force/gradient mismatch at r = {r}: {} vs {}",
                force.x,
                du_dr
            );
        }
    }
}
