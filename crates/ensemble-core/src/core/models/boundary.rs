use nalgebra::{Point3, Vector3};

/// The geometry of the simulation region: edge lengths plus per-axis
/// periodicity flags.
///
/// The boundary owns the two geometric operations every other subsystem
/// depends on: folding positions into the primary cell and reducing
/// separation vectors to their minimum image. It is immutable except for
/// [`resize`](Boundary::resize), which bumps a generation counter so that
/// derived structures (the cell grid) can detect that they are stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    lengths: Vector3<f64>,
    periodic: [bool; 3],
    generation: u64,
}

impl Boundary {
    /// Creates a fully periodic boundary with the given edge lengths.
    pub fn periodic(lengths: Vector3<f64>) -> Self {
        Self::new(lengths, [true; 3])
    }

    /// Creates a boundary with explicit per-axis periodicity.
    ///
    /// # Arguments
    ///
    /// * `lengths` - Edge lengths along x, y, z. Must all be positive.
    /// * `periodic` - Which axes wrap around.
    pub fn new(lengths: Vector3<f64>, periodic: [bool; 3]) -> Self {
        assert!(
            lengths.iter().all(|&l| l > 0.0),
            "boundary edge lengths must be positive, got {lengths:?}"
        );
        Self {
            lengths,
            periodic,
            generation: 0,
        }
    }

    /// Returns the edge lengths.
    pub fn lengths(&self) -> Vector3<f64> {
        self.lengths
    }

    /// Returns the per-axis periodicity flags.
    pub fn periodicity(&self) -> [bool; 3] {
        self.periodic
    }

    /// Returns the volume of the region.
    pub fn volume(&self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }

    /// Returns the generation counter, bumped on every [`resize`](Boundary::resize).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resizes the region.
    ///
    /// Positions are left untouched; callers performing volume moves rescale
    /// coordinates themselves. Any cell grid built against the previous
    /// dimensions becomes stale and must be rebuilt, which the neighbor
    /// manager detects through the generation counter.
    pub fn resize(&mut self, new_lengths: Vector3<f64>) {
        assert!(
            new_lengths.iter().all(|&l| l > 0.0),
            "boundary edge lengths must be positive, got {new_lengths:?}"
        );
        self.lengths = new_lengths;
        self.generation += 1;
    }

    /// Reduces a separation vector to its minimum image.
    ///
    /// For each periodic axis, subtracts the nearest integer multiple of the
    /// period so the component lies in (−L/2, L/2]. This is correct for
    /// separations spanning multiple periods, not just a single box length:
    /// volume moves or large displacements between rebuilds can leave atoms
    /// more than one period apart. Non-periodic axes pass through unchanged.
    pub fn minimum_image(&self, v: Vector3<f64>) -> Vector3<f64> {
        let mut out = v;
        for axis in 0..3 {
            if !self.periodic[axis] {
                continue;
            }
            let l = self.lengths[axis];
            let mut c = out[axis] - l * (out[axis] / l).round();
            // round() ties map L/2 to -L/2; the contract is (-L/2, L/2].
            if c <= -0.5 * l {
                c += l;
            }
            out[axis] = c;
        }
        out
    }

    /// Returns the minimum-image separation `b - a`.
    pub fn separation(&self, a: &Point3<f64>, b: &Point3<f64>) -> Vector3<f64> {
        self.minimum_image(b - a)
    }

    /// Folds a position into the primary cell, `[0, L)` on each periodic axis.
    pub fn wrap(&self, p: Point3<f64>) -> Point3<f64> {
        let mut out = p;
        for axis in 0..3 {
            if self.periodic[axis] {
                out[axis] = out[axis].rem_euclid(self.lengths[axis]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn vec_approx_equal(a: Vector3<f64>, b: Vector3<f64>) -> bool {
        (a - b).norm() < TOLERANCE
    }

    #[test]
    fn volume_is_product_of_lengths() {
        let boundary = Boundary::periodic(Vector3::new(2.0, 3.0, 4.0));
        assert!((boundary.volume() - 24.0).abs() < TOLERANCE);
    }

    #[test]
    fn minimum_image_wraps_across_the_periodic_boundary() {
        // Two atoms at 0.1 and 9.95 in a 10-box are 0.15 apart, not 9.85.
        let boundary = Boundary::periodic(Vector3::new(10.0, 10.0, 10.0));
        let a = Point3::new(0.1, 0.0, 0.0);
        let b = Point3::new(9.95, 0.0, 0.0);
        let sep = boundary.separation(&a, &b);
        assert!((sep.norm() - 0.15).abs() < 1e-9, "got {}", sep.norm());
        assert!((sep.x - (-0.15)).abs() < 1e-9);
    }

    #[test]
    fn minimum_image_handles_multiple_periods() {
        let boundary = Boundary::periodic(Vector3::new(10.0, 10.0, 10.0));
        let v = Vector3::new(33.0, -27.0, 0.0);
        let reduced = boundary.minimum_image(v);
        assert!(vec_approx_equal(reduced, Vector3::new(3.0, 3.0, 0.0)));
    }

    #[test]
    fn minimum_image_components_lie_in_half_open_interval() {
        let boundary = Boundary::periodic(Vector3::new(10.0, 10.0, 10.0));
        // Exactly half a box length must map to +L/2, never -L/2.
        let reduced = boundary.minimum_image(Vector3::new(5.0, -5.0, 15.0));
        assert!((reduced.x - 5.0).abs() < TOLERANCE);
        assert!((reduced.y - 5.0).abs() < TOLERANCE);
        assert!((reduced.z - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn non_periodic_axes_pass_through() {
        let boundary = Boundary::new(Vector3::new(10.0, 10.0, 10.0), [true, false, false]);
        let reduced = boundary.minimum_image(Vector3::new(8.0, 8.0, -12.0));
        assert!(vec_approx_equal(reduced, Vector3::new(-2.0, 8.0, -12.0)));
    }

    #[test]
    fn wrap_folds_into_primary_cell() {
        let boundary = Boundary::periodic(Vector3::new(10.0, 10.0, 10.0));
        let wrapped = boundary.wrap(Point3::new(10.5, -0.25, 29.0));
        assert!((wrapped.x - 0.5).abs() < TOLERANCE);
        assert!((wrapped.y - 9.75).abs() < TOLERANCE);
        assert!((wrapped.z - 9.0).abs() < TOLERANCE);
    }

    #[test]
    fn wrap_leaves_non_periodic_axes_alone() {
        let boundary = Boundary::new(Vector3::new(10.0, 10.0, 10.0), [false, true, true]);
        let wrapped = boundary.wrap(Point3::new(-3.0, 11.0, 5.0));
        assert!((wrapped.x - (-3.0)).abs() < TOLERANCE);
        assert!((wrapped.y - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn resize_bumps_generation() {
        let mut boundary = Boundary::periodic(Vector3::new(10.0, 10.0, 10.0));
        assert_eq!(boundary.generation(), 0);
        boundary.resize(Vector3::new(12.0, 12.0, 12.0));
        assert_eq!(boundary.generation(), 1);
        assert!((boundary.volume() - 1728.0).abs() < TOLERANCE);
    }

    #[test]
    #[should_panic(expected = "edge lengths must be positive")]
    fn zero_length_boundary_is_rejected() {
        Boundary::periodic(Vector3::new(0.0, 10.0, 10.0));
    }
}
