//! The n-dimensional toroidal or bounded world grid.
//!
//! Each cell holds a [`Molecule`] and an owner id (0 = unowned).
//! Coordinates are flattened row-major for storage, matching the
//! teacher's `ToroidalBoundary` (a flat `[u8; N]` addressed by a
//! wrapping [`Cell`]-like index) generalized from a fixed 1-D ring to
//! an arbitrary-rank shape.

use crate::coord::Coord;
use crate::molecule::Molecule;

/// Compile-time and runtime shared description of the grid (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentProperties {
    pub world_shape: Vec<i64>,
    pub toroidal: bool,
}

impl EnvironmentProperties {
    #[must_use]
    pub fn dims(&self) -> usize {
        self.world_shape.len()
    }
}

/// The shared grid all organisms execute against.
#[derive(Debug, Clone)]
pub struct World {
    shape: Vec<i64>,
    toroidal: bool,
    cells: Vec<Molecule>,
    owners: Vec<u64>,
}

impl World {
    #[must_use]
    pub fn new(props: &EnvironmentProperties) -> Self {
        let len = props.world_shape.iter().product::<i64>().max(0) as usize;
        Self {
            shape: props.world_shape.clone(),
            toroidal: props.toroidal,
            cells: vec![Molecule::empty(); len],
            owners: vec![0; len],
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    #[must_use]
    pub fn toroidal(&self) -> bool {
        self.toroidal
    }

    /// Toroidal wrap of a coordinate; identity under bounded topology.
    #[must_use]
    pub fn wrap(&self, coord: &Coord) -> Coord {
        Coord(
            coord
                .0
                .iter()
                .zip(&self.shape)
                .map(|(&c, &s)| c.rem_euclid(s))
                .collect(),
        )
    }

    #[must_use]
    pub fn in_bounds(&self, coord: &Coord) -> bool {
        coord
            .0
            .iter()
            .zip(&self.shape)
            .all(|(&c, &s)| c >= 0 && c < s)
    }

    /// Row-major flat index, after resolving toroidal wrap if enabled.
    fn index(&self, coord: &Coord) -> Option<usize> {
        let resolved = if self.toroidal {
            self.wrap(coord)
        } else {
            if !self.in_bounds(coord) {
                return None;
            }
            coord.clone()
        };
        let mut idx: i64 = 0;
        for (c, s) in resolved.0.iter().zip(&self.shape) {
            idx = idx * s + c;
        }
        Some(idx as usize)
    }

    /// Reads the molecule at `coord`. Out-of-bounds reads on a bounded
    /// world return the empty molecule.
    #[must_use]
    pub fn get(&self, coord: &Coord) -> Molecule {
        self.index(coord)
            .map(|i| self.cells[i])
            .unwrap_or_else(Molecule::empty)
    }

    #[must_use]
    pub fn get_owner(&self, coord: &Coord) -> u64 {
        self.index(coord).map(|i| self.owners[i]).unwrap_or(0)
    }

    /// Writes `molecule` with the given `owner`. Returns `false` (a
    /// no-op) on an out-of-bounds write to a bounded world — this is
    /// how the world signals "impassable" to the caller (§4.2).
    pub fn set(&mut self, coord: &Coord, molecule: Molecule, owner: u64) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.cells[i] = molecule;
                self.owners[i] = owner;
                true
            }
            None => false,
        }
    }

    /// Resets a cell to empty and clears its owner.
    pub fn clear(&mut self, coord: &Coord) -> bool {
        self.set(coord, Molecule::empty(), 0)
    }

    /// The axis-aligned neighbors of `coord`: `(axis, positive_sign, neighbor_coord)`.
    pub fn neighbors_axis_aligned(&self, coord: &Coord) -> Vec<(usize, bool, Coord)> {
        let dims = coord.dims();
        let mut out = Vec::with_capacity(dims * 2);
        for axis in 0..dims {
            for &positive in &[true, false] {
                let dv = Coord::unit(dims, axis, positive);
                out.push((axis, positive, &*coord + &dv));
            }
        }
        out
    }

    /// True iff `coord` is accessible to `actor`: empty, owned by
    /// `actor`, or owned by `actor`'s direct parent (§3.3).
    #[must_use]
    pub fn is_accessible(&self, coord: &Coord, actor: u64, actor_parent: u64) -> bool {
        let owner = self.get_owner(coord);
        owner == 0 || owner == actor || owner == actor_parent
    }

    /// Row-major decode of a flat index back into an n-D coord; inverse
    /// of [`World::index`].
    fn coord_of(&self, mut flat: usize) -> Coord {
        let mut components = vec![0i64; self.shape.len()];
        for (axis, &s) in self.shape.iter().enumerate().rev() {
            let s = s.max(1) as usize;
            components[axis] = (flat % s) as i64;
            flat /= s;
        }
        Coord(components)
    }

    /// All non-empty cells, for snapshotting (§6).
    pub fn non_empty_cells(&self) -> impl Iterator<Item = (Coord, Molecule, u64)> + '_ {
        self.cells.iter().zip(&self.owners).enumerate().filter_map(move |(i, (&m, &o))| {
            if m.is_empty() {
                None
            } else {
                Some((self.coord_of(i), m, o))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::MoleculeType;
    use proptest::prelude::*;

    fn props() -> EnvironmentProperties {
        EnvironmentProperties {
            world_shape: vec![20, 5],
            toroidal: true,
        }
    }

    #[test]
    fn toroidal_wrap_round_trips() {
        let mut w = World::new(&props());
        let c = Coord(vec![19, 0]);
        let m = Molecule::new(MoleculeType::Data, 7);
        w.set(&c, m, 1);
        let wrapped = Coord(vec![19 + 20 * 3, 0 - 5 * 2]);
        assert_eq!(w.get(&wrapped), m);
    }

    #[test]
    fn bounded_out_of_range_read_is_empty() {
        let props = EnvironmentProperties {
            world_shape: vec![4, 4],
            toroidal: false,
        };
        let w = World::new(&props);
        assert!(w.get(&Coord(vec![-1, 0])).is_empty());
    }

    #[test]
    fn bounded_out_of_range_write_is_noop() {
        let props = EnvironmentProperties {
            world_shape: vec![4, 4],
            toroidal: false,
        };
        let mut w = World::new(&props);
        let ok = w.set(&Coord(vec![10, 0]), Molecule::new(MoleculeType::Data, 1), 5);
        assert!(!ok);
    }

    proptest! {
        #[test]
        fn toroidal_wrap_invariant(kx in -3i64..3, ky in -3i64..3) {
            let mut w = World::new(&props());
            let c = Coord(vec![5, 2]);
            let m = Molecule::new(MoleculeType::Data, 42);
            w.set(&c, m, 9);
            let shifted = Coord(vec![5 + kx * 20, 2 + ky * 5]);
            prop_assert_eq!(w.get(&shifted), m);
        }
    }
}
