//! n-dimensional coordinates and direction vectors.

use std::ops::{Add, Sub};

/// An n-tuple of signed integers: an absolute position or a direction
/// vector, depending on context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Coord(pub Vec<i64>);

impl Coord {
    #[must_use]
    pub fn zero(dims: usize) -> Self {
        Self(vec![0; dims])
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.0.len()
    }

    /// A unit vector along `axis` with the given sign (`+1` or `-1`).
    #[must_use]
    pub fn unit(dims: usize, axis: usize, positive: bool) -> Self {
        let mut v = vec![0; dims];
        v[axis] = if positive { 1 } else { -1 };
        Self(v)
    }

    /// True iff exactly one component has absolute value 1 and all
    /// others are 0.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        let mut nonzero = 0;
        for &c in &self.0 {
            match c {
                0 => {}
                1 | -1 => nonzero += 1,
                _ => return false,
            }
        }
        nonzero == 1
    }

    /// For a unit vector, `(axis, positive)`. Panics if not a unit vector.
    #[must_use]
    pub fn unit_axis(&self) -> (usize, bool) {
        self.0
            .iter()
            .position(|&c| c != 0)
            .map(|axis| (axis, self.0[axis] > 0))
            .expect("is_unit() must be checked before calling unit_axis()")
    }

    #[must_use]
    pub fn scaled(&self, factor: i64) -> Self {
        Self(self.0.iter().map(|c| c * factor).collect())
    }
}

impl Add for &Coord {
    type Output = Coord;
    fn add(self, rhs: &Coord) -> Coord {
        Coord(self.0.iter().zip(&rhs.0).map(|(a, b)| a + b).collect())
    }
}

impl Sub for &Coord {
    type Output = Coord;
    fn sub(self, rhs: &Coord) -> Coord {
        Coord(self.0.iter().zip(&rhs.0).map(|(a, b)| a - b).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_detection() {
        assert!(Coord(vec![0, 1, 0]).is_unit());
        assert!(Coord(vec![-1, 0]).is_unit());
        assert!(!Coord(vec![1, 1]).is_unit());
        assert!(!Coord(vec![0, 0]).is_unit());
        assert!(!Coord(vec![2, 0]).is_unit());
    }

    #[test]
    fn add_sub_are_inverse() {
        let a = Coord(vec![3, -2]);
        let b = Coord(vec![1, 5]);
        assert_eq!(&(&a + &b) - &b, a);
    }
}
