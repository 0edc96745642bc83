use crate::core::models::boundary::Boundary;
use crate::core::models::ids::AtomId;
use nalgebra::{Point3, Vector3};
use slotmap::SecondaryMap;
use std::collections::BTreeSet;

/// A lattice of cells partitioning the simulation region, used to restrict
/// pairwise search to geometrically nearby buckets.
///
/// Cell edges are sized at or above the largest listing range, so every pair
/// within range lives in the same or in adjacent cells. Adjacency is stored
/// as a forward half: each geometric cell pair appears under exactly one of
/// its two cells, which lets [`for_each_cell_pair`](CellGrid::for_each_cell_pair)
/// visit every pair once. The grid snapshots the boundary's generation
/// counter; a resize makes it stale and the neighbor manager rebuilds it.
#[derive(Debug, Clone)]
pub struct CellGrid {
    shape: [usize; 3],
    lengths: Vector3<f64>,
    periodic: [bool; 3],
    boundary_generation: u64,
    cells: Vec<Vec<AtomId>>,
    forward_neighbors: Vec<Vec<usize>>,
    atom_cell: SecondaryMap<AtomId, usize>,
}

impl CellGrid {
    /// Picks the cell count per axis for a listing range: as many cells as
    /// fit while keeping every edge at least `range` long.
    ///
    /// When the range exceeds an edge length the axis degenerates to a single
    /// cell; with a range beyond half the box on every axis the grid is one
    /// giant cell and pair search falls back to brute force, losing
    /// efficiency but never correctness.
    pub fn shape_for(boundary: &Boundary, range: f64) -> [usize; 3] {
        assert!(range > 0.0, "listing range must be positive");
        let lengths = boundary.lengths();
        let mut shape = [1usize; 3];
        for axis in 0..3 {
            shape[axis] = ((lengths[axis] / range).floor() as usize).max(1);
        }
        shape
    }

    /// Allocates the lattice and precomputes forward cell adjacency,
    /// including periodic wrap-around neighbors, deduplicated.
    pub fn new(boundary: &Boundary, shape: [usize; 3]) -> Self {
        assert!(
            shape.iter().all(|&n| n > 0),
            "cell grid shape must be non-zero, got {shape:?}"
        );
        let cell_count = shape[0] * shape[1] * shape[2];
        let periodic = boundary.periodicity();

        // Enumerate each adjacent cell pair once, globally: with few cells
        // per axis, wrap-around makes several of the 26 offsets land on the
        // same neighbor (or back on the cell itself), so per-cell forward
        // offsets alone would double-visit pairs.
        let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
        for z in 0..shape[2] {
            for y in 0..shape[1] {
                for x in 0..shape[0] {
                    let home = Self::linearize(shape, [x, y, z]);
                    for offset in Self::offsets() {
                        let mut coord = [0usize; 3];
                        let mut in_range = true;
                        for axis in 0..3 {
                            let raw = [x, y, z][axis] as isize + offset[axis];
                            let n = shape[axis] as isize;
                            let folded = if periodic[axis] {
                                raw.rem_euclid(n)
                            } else if (0..n).contains(&raw) {
                                raw
                            } else {
                                in_range = false;
                                break;
                            };
                            coord[axis] = folded as usize;
                        }
                        if !in_range {
                            continue;
                        }
                        let other = Self::linearize(shape, coord);
                        if other != home {
                            pairs.insert((home.min(other), home.max(other)));
                        }
                    }
                }
            }
        }

        let mut forward_neighbors = vec![Vec::new(); cell_count];
        for (a, b) in pairs {
            forward_neighbors[a].push(b);
        }

        Self {
            shape,
            lengths: boundary.lengths(),
            periodic,
            boundary_generation: boundary.generation(),
            cells: vec![Vec::new(); cell_count],
            forward_neighbors,
            atom_cell: SecondaryMap::new(),
        }
    }

    fn offsets() -> impl Iterator<Item = [isize; 3]> {
        (-1..=1).flat_map(move |dz| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).filter_map(move |dx| {
                    if (dx, dy, dz) == (0, 0, 0) {
                        None
                    } else {
                        Some([dx, dy, dz])
                    }
                })
            })
        })
    }

    fn linearize(shape: [usize; 3], coord: [usize; 3]) -> usize {
        coord[0] + shape[0] * (coord[1] + shape[1] * coord[2])
    }

    /// Whether the boundary has been resized since this grid was built.
    pub fn is_stale(&self, boundary: &Boundary) -> bool {
        self.boundary_generation != boundary.generation()
    }

    /// Returns the lattice dimensions.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Returns the total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Computes the bucket index for a position, folding periodic axes into
    /// the primary cell first.
    pub fn cell_index_for(&self, position: &Point3<f64>) -> usize {
        let mut coord = [0usize; 3];
        for axis in 0..3 {
            let n = self.shape[axis];
            let l = self.lengths[axis];
            let folded = if self.periodic[axis] {
                position[axis].rem_euclid(l)
            } else {
                position[axis].clamp(0.0, l)
            };
            // The upper edge (folded == l) belongs to the last cell.
            coord[axis] = ((folded / l * n as f64) as usize).min(n - 1);
        }
        Self::linearize(self.shape, coord)
    }

    /// Moves an atom into the bucket matching its position, removing it from
    /// any prior bucket.
    pub fn assign(&mut self, id: AtomId, position: &Point3<f64>) {
        let target = self.cell_index_for(position);
        if let Some(&current) = self.atom_cell.get(id) {
            if current == target {
                return;
            }
            let bucket = &mut self.cells[current];
            if let Some(slot) = bucket.iter().position(|&a| a == id) {
                bucket.swap_remove(slot);
            }
        }
        self.cells[target].push(id);
        self.atom_cell.insert(id, target);
    }

    /// Clears every bucket and reassigns all given atoms; used during full
    /// rebuilds.
    pub fn assign_all<'a>(&mut self, atoms: impl Iterator<Item = (AtomId, &'a Point3<f64>)>) {
        for bucket in &mut self.cells {
            bucket.clear();
        }
        self.atom_cell.clear();
        for (id, position) in atoms {
            let target = self.cell_index_for(position);
            self.cells[target].push(id);
            self.atom_cell.insert(id, target);
        }
    }

    /// Removes an atom from its bucket, if assigned.
    pub fn remove(&mut self, id: AtomId) {
        if let Some(cell) = self.atom_cell.remove(id) {
            let bucket = &mut self.cells[cell];
            if let Some(slot) = bucket.iter().position(|&a| a == id) {
                bucket.swap_remove(slot);
            }
        }
    }

    /// Returns the bucket an atom is currently assigned to.
    pub fn cell_of(&self, id: AtomId) -> Option<usize> {
        self.atom_cell.get(id).copied()
    }

    /// Returns the atoms in a cell.
    pub fn cell_atoms(&self, cell: usize) -> &[AtomId] {
        &self.cells[cell]
    }

    /// Returns the forward-adjacent cells of a cell (each geometric cell pair
    /// is listed under exactly one of its two cells).
    pub fn forward_neighbors(&self, cell: usize) -> &[usize] {
        &self.forward_neighbors[cell]
    }

    /// Visits every cell paired with itself (intra-cell pairs) and with each
    /// forward-adjacent cell: the basis of both the O(N) rebuild and the
    /// direct full-scan dispatch path.
    pub fn for_each_cell_pair(&self, mut f: impl FnMut(usize, usize)) {
        for cell in 0..self.cells.len() {
            f(cell, cell);
            for &other in &self.forward_neighbors[cell] {
                f(cell, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn boundary(l: f64) -> Boundary {
        Boundary::periodic(Vector3::new(l, l, l))
    }

    #[test]
    fn shape_for_fits_cells_to_the_range() {
        assert_eq!(CellGrid::shape_for(&boundary(10.0), 2.5), [4, 4, 4]);
        assert_eq!(CellGrid::shape_for(&boundary(10.0), 3.0), [3, 3, 3]);
        // Range beyond the box: one giant cell, brute-force equivalent.
        assert_eq!(CellGrid::shape_for(&boundary(10.0), 12.0), [1, 1, 1]);
    }

    #[test]
    fn forward_adjacency_covers_each_pair_exactly_once() {
        let grid = CellGrid::new(&boundary(10.0), [4, 4, 4]);
        let mut seen = HashSet::new();
        grid.for_each_cell_pair(|a, b| {
            let key = (a.min(b), a.max(b));
            assert!(seen.insert(key), "cell pair {key:?} visited twice");
        });
        // 64 self-pairs plus 13 forward neighbors for each of 64 cells
        // (full 26-neighborhood halves under periodic wrap).
        assert_eq!(seen.len(), 64 + 64 * 13);
    }

    #[test]
    fn two_cell_axis_does_not_double_visit_wrapped_neighbors() {
        let grid = CellGrid::new(&boundary(10.0), [2, 1, 1]);
        let mut pairs = Vec::new();
        grid.for_each_cell_pair(|a, b| pairs.push((a, b)));
        // Cells 0 and 1 are adjacent both directly and across the wrap; the
        // pair must still appear once, next to the two self-pairs.
        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&(0, 0)));
        assert!(pairs.contains(&(1, 1)));
        assert!(pairs.contains(&(0, 1)));
    }

    #[test]
    fn single_cell_grid_has_no_neighbors() {
        let grid = CellGrid::new(&boundary(10.0), [1, 1, 1]);
        let mut pairs = Vec::new();
        grid.for_each_cell_pair(|a, b| pairs.push((a, b)));
        assert_eq!(pairs, vec![(0, 0)]);
    }

    #[test]
    fn adjacency_wraps_around_periodic_axes() {
        let grid = CellGrid::new(&boundary(10.0), [4, 1, 1]);
        // Cell 0 and cell 3 touch across the boundary.
        let mut seen = HashSet::new();
        grid.for_each_cell_pair(|a, b| {
            seen.insert((a.min(b), a.max(b)));
        });
        assert!(seen.contains(&(0, 3)));
    }

    #[test]
    fn non_periodic_axes_do_not_wrap() {
        let b = Boundary::new(Vector3::new(10.0, 10.0, 10.0), [false, true, true]);
        let grid = CellGrid::new(&b, [4, 1, 1]);
        let mut seen = HashSet::new();
        grid.for_each_cell_pair(|a_, b_| {
            seen.insert((a_.min(b_), a_.max(b_)));
        });
        assert!(!seen.contains(&(0, 3)), "no wrap on a non-periodic axis");
        assert!(seen.contains(&(0, 1)));
    }

    #[test]
    fn assign_moves_atoms_between_buckets() {
        let mut grid = CellGrid::new(&boundary(10.0), [4, 4, 4]);
        let mut atoms = slotmap::SlotMap::<AtomId, ()>::with_key();
        let id = atoms.insert(());

        grid.assign(id, &Point3::new(1.0, 1.0, 1.0));
        let first = grid.cell_of(id).unwrap();
        assert!(grid.cell_atoms(first).contains(&id));

        grid.assign(id, &Point3::new(9.0, 9.0, 9.0));
        let second = grid.cell_of(id).unwrap();
        assert_ne!(first, second);
        assert!(grid.cell_atoms(first).is_empty());
        assert!(grid.cell_atoms(second).contains(&id));
    }

    #[test]
    fn cell_index_folds_out_of_box_positions() {
        let grid = CellGrid::new(&boundary(10.0), [4, 4, 4]);
        let inside = grid.cell_index_for(&Point3::new(1.0, 1.0, 1.0));
        let wrapped = grid.cell_index_for(&Point3::new(11.0, -9.0, 21.0));
        assert_eq!(inside, wrapped);
        // The exact upper edge belongs to the last cell, not one past it.
        let edge = grid.cell_index_for(&Point3::new(10.0 - 1e-13, 0.0, 0.0));
        assert!(edge < grid.cell_count());
    }

    #[test]
    fn assign_all_resets_previous_contents() {
        let mut grid = CellGrid::new(&boundary(10.0), [2, 2, 2]);
        let mut atoms = slotmap::SlotMap::<AtomId, ()>::with_key();
        let a = atoms.insert(());
        let b = atoms.insert(());

        grid.assign(a, &Point3::new(1.0, 1.0, 1.0));
        let pa = Point3::new(9.0, 9.0, 9.0);
        let pb = Point3::new(1.0, 1.0, 1.0);
        grid.assign_all([(a, &pa), (b, &pb)].into_iter());

        assert_eq!(grid.cell_of(a), Some(grid.cell_index_for(&pa)));
        assert_eq!(grid.cell_of(b), Some(grid.cell_index_for(&pb)));
        let total: usize = (0..grid.cell_count()).map(|c| grid.cell_atoms(c).len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn staleness_tracks_boundary_generation() {
        let mut b = boundary(10.0);
        let grid = CellGrid::new(&b, [4, 4, 4]);
        assert!(!grid.is_stale(&b));
        b.resize(Vector3::new(12.0, 12.0, 12.0));
        assert!(grid.is_stale(&b));
    }
}
