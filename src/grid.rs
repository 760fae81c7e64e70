use crate::{Float, ALMOST_ZERO};
use std::ops::Range;

/// Where a coordinate sits relative to the region of interest on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundsCase {
    InBounds,
    OnLowEdge,
    OnHighEdge,
    OutOfBounds,
}

/// Cell index triple, axis order (r, phi, z).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Idx3 {
    pub r: usize,
    pub phi: usize,
    pub z: usize,
}

impl Idx3 {
    pub fn new(r: usize, phi: usize, z: usize) -> Idx3 {
        Idx3 { r, phi, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDim {
    pub nr: usize,
    pub nphi: usize,
    pub nz: usize,
}

impl GridDim {
    pub fn new(nr: usize, nphi: usize, nz: usize) -> GridDim {
        GridDim { nr, nphi, nz }
    }

    pub fn len(&self) -> usize {
        self.nr * self.nphi * self.nz
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_index(&self, pos: Idx3) -> usize {
        // Row major, z is the fastest running index.
        // For a (2, 2, 2) grid the flat layout is
        // [0]: (0,0,0)  [1]: (0,0,1)  [2]: (0,1,0)  [3]: (0,1,1)
        // [4]: (1,0,0)  [5]: (1,0,1)  [6]: (1,1,0)  [7]: (1,1,1)
        if !cfg!(feature = "unchecked") {
            assert!(pos.r < self.nr);
            assert!(pos.phi < self.nphi);
            assert!(pos.z < self.nz);
        }
        (pos.r * self.nphi + pos.phi) * self.nz + pos.z
    }

    /// Inverse of `get_index`.
    pub fn get_pos(&self, index: usize) -> Idx3 {
        if !cfg!(feature = "unchecked") {
            assert!(index < self.len());
        }
        Idx3 {
            r: index / (self.nphi * self.nz),
            phi: (index / self.nz) % self.nphi,
            z: index % self.nz,
        }
    }
}

/// Shape of the unit-field table: every ROI target cell against every
/// cell of the full grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupDim {
    pub target: GridDim,
    pub source: GridDim,
}

impl LookupDim {
    pub fn len(&self) -> usize {
        self.target.len() * self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat offset of (target-r, target-phi, target-z, source-r, source-phi, source-z).
    pub fn get_index(&self, target: Idx3, source: Idx3) -> usize {
        self.target.get_index(target) * self.source.len() + self.source.get_index(source)
    }
}

/// Wraps an azimuthal index into [0, nphi).
pub fn filter_phi_index(phi: isize, nphi: usize) -> isize {
    phi.rem_euclid(nphi as isize)
}

/// One discretized axis of the detector volume together with its
/// region of interest.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    origin: Float,
    step: Float,
    n: usize,
    roi: Range<usize>,
    periodic: bool,
}

impl Axis {
    pub fn new(origin: Float, span: Float, n: usize, roi: Range<usize>, periodic: bool) -> Axis {
        Axis {
            origin,
            step: span / n as Float,
            n,
            roi,
            periodic,
        }
    }

    pub fn step(&self) -> Float {
        self.step
    }

    pub fn roi(&self) -> Range<usize> {
        self.roi.clone()
    }

    pub fn roi_len(&self) -> usize {
        self.roi.end - self.roi.start
    }

    /// Position in units of step, measured from the low edge of cell 0.
    #[inline(always)]
    pub fn normalized(&self, pos: Float) -> Float {
        (pos - self.origin) / self.step
    }

    /// Low edge of cell `i`.
    pub fn low_edge(&self, i: isize) -> Float {
        self.origin + i as Float * self.step
    }

    pub fn center(&self, i: usize) -> Float {
        self.origin + (i as Float + 0.5) * self.step
    }

    pub fn filter_index(&self, i: isize) -> isize {
        if self.periodic {
            filter_phi_index(i, self.n)
        } else {
            i
        }
    }

    pub fn in_roi(&self, i: isize) -> bool {
        i >= self.roi.start as isize && i < self.roi.end as isize
    }

    /// Cell index of `pos` and its classification against the ROI. A
    /// coordinate within ALMOST_ZERO of a cell boundary is treated as an
    /// edge case rather than falling to either side on rounding noise.
    pub fn index_and_bounds(&self, pos: Float) -> (isize, BoundsCase) {
        if !pos.is_finite() {
            return (-1, BoundsCase::OutOfBounds);
        }
        let f = self.normalized(pos);
        let i0 = self.filter_index(f.floor() as isize);
        let lowered = self.filter_index((f - ALMOST_ZERO).floor() as isize);
        let raised = self.filter_index((f + ALMOST_ZERO).floor() as isize);
        let lo = self.roi.start as isize;
        let hi = self.roi.end as isize;

        let out = if self.periodic {
            // Around index 0 lowering wraps to n-1, and around n-1 raising
            // wraps to 0; neither wrap may flag the point as outside.
            (lowered >= hi && i0 != 0) || (raised < lo && i0 != self.n as isize - 1)
        } else {
            lowered >= hi || raised < lo
        };
        if out {
            return (i0, BoundsCase::OutOfBounds);
        }
        // anything left outside the roi is within ALMOST_ZERO of its edge
        if i0 >= hi {
            return (i0, BoundsCase::OnHighEdge);
        }
        if i0 < lo {
            return (i0, BoundsCase::OnLowEdge);
        }
        (i0, BoundsCase::InBounds)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::PI;

    fn r_axis() -> Axis {
        // 4 cells of 15 cm from 20 cm, roi is cells 1 and 2
        Axis::new(20.0, 60.0, 4, 1..3, false)
    }

    #[test]
    fn row_major_order() {
        let dim = GridDim::new(3, 4, 5);
        let mut index = 0;
        for r in 0..dim.nr {
            for phi in 0..dim.nphi {
                for z in 0..dim.nz {
                    let pos = Idx3::new(r, phi, z);
                    assert_eq!(dim.get_index(pos), index);
                    assert_eq!(dim.get_pos(index), pos);
                    index += 1;
                }
            }
        }
        assert_eq!(index, dim.len());
    }

    #[test]
    fn lookup_row_major_order() {
        let dim = LookupDim {
            target: GridDim::new(2, 1, 2),
            source: GridDim::new(2, 3, 2),
        };
        assert_eq!(dim.len(), 4 * 12);
        let mut index = 0;
        for t in 0..dim.target.len() {
            for s in 0..dim.source.len() {
                let ti = dim.target.get_pos(t);
                let si = dim.source.get_pos(s);
                assert_eq!(dim.get_index(ti, si), index);
                index += 1;
            }
        }
    }

    #[test]
    fn phi_filter_wraps() {
        assert_eq!(filter_phi_index(-1, 8), 7);
        assert_eq!(filter_phi_index(8, 8), 0);
        assert_eq!(filter_phi_index(-9, 8), 7);
        assert_eq!(filter_phi_index(17, 8), 1);
        // far outside the first turn, as from a histogram binned in degrees
        assert_eq!(filter_phi_index(360_000_003, 8), 3);
        assert_eq!(filter_phi_index(-360_000_003, 8), 5);
        for i in 0..8 {
            assert_eq!(filter_phi_index(i, 8), i);
        }
    }

    #[test]
    fn interior_points() {
        let ax = r_axis();
        assert_eq!(ax.step(), 15.0);
        assert_eq!(ax.index_and_bounds(42.5), (1, BoundsCase::InBounds));
        assert_eq!(ax.index_and_bounds(57.5), (2, BoundsCase::InBounds));
        assert_eq!(ax.index_and_bounds(27.5), (0, BoundsCase::OutOfBounds));
        assert_eq!(ax.index_and_bounds(72.5), (3, BoundsCase::OutOfBounds));
        assert_eq!(ax.index_and_bounds(5.0), (-1, BoundsCase::OutOfBounds));
    }

    #[test]
    fn boundaries_are_edges_not_outside() {
        let ax = r_axis();
        let nudge = 0.5 * ALMOST_ZERO * ax.step();

        // low edge of the roi: cell 1 starts at 35
        for pos in &[35.0, 35.0 - nudge, 35.0 + nudge] {
            let (i, case) = ax.index_and_bounds(*pos);
            assert_ne!(case, BoundsCase::OutOfBounds);
            match i {
                0 => assert_eq!(case, BoundsCase::OnLowEdge),
                1 => assert_eq!(case, BoundsCase::InBounds),
                _ => panic!("unexpected index {}", i),
            }
        }
        assert_eq!(ax.index_and_bounds(35.0), (1, BoundsCase::InBounds));

        // high edge of the roi: cell 3 starts at 65
        for pos in &[65.0, 65.0 - nudge, 65.0 + nudge] {
            let (i, case) = ax.index_and_bounds(*pos);
            assert_ne!(case, BoundsCase::OutOfBounds);
            match i {
                2 => assert_eq!(case, BoundsCase::InBounds),
                3 => assert_eq!(case, BoundsCase::OnHighEdge),
                _ => panic!("unexpected index {}", i),
            }
        }
        assert_eq!(ax.index_and_bounds(65.0), (3, BoundsCase::OnHighEdge));

        // an interior cell boundary is simply in bounds on both sides
        for pos in &[50.0, 50.0 - nudge, 50.0 + nudge] {
            assert_eq!(ax.index_and_bounds(*pos).1, BoundsCase::InBounds);
        }
    }

    #[test]
    fn periodic_axis_wraps_in_bounds() {
        let ax = Axis::new(0.0, 2.0 * PI, 8, 0..8, true);
        let step = ax.step();
        // just below zero azimuth lands in the last cell, not outside
        assert_eq!(ax.index_and_bounds(-0.5 * step), (7, BoundsCase::InBounds));
        assert_eq!(ax.index_and_bounds(0.5 * step), (0, BoundsCase::InBounds));
        assert_eq!(ax.index_and_bounds(0.0), (0, BoundsCase::InBounds));
        assert_eq!(ax.index_and_bounds(7.5 * step), (7, BoundsCase::InBounds));
    }

    #[test]
    fn periodic_axis_partial_roi() {
        let ax = Axis::new(0.0, 2.0 * PI, 8, 2..5, true);
        let step = ax.step();
        assert_eq!(ax.index_and_bounds(3.5 * step), (3, BoundsCase::InBounds));
        assert_eq!(ax.index_and_bounds(0.5 * step).1, BoundsCase::OutOfBounds);
        assert_eq!(ax.index_and_bounds(-0.5 * step).1, BoundsCase::OutOfBounds);
        assert_eq!(ax.index_and_bounds(6.5 * step).1, BoundsCase::OutOfBounds);
        assert_eq!(ax.index_and_bounds(0.1 * step), (0, BoundsCase::OutOfBounds));
    }

    #[test]
    fn periodic_first_cell_is_not_flagged_by_wrap() {
        // roi covers the low end; lowering index 0 wraps to 7 which is
        // beyond the roi, but the point itself is fine.
        let ax = Axis::new(0.0, 2.0 * PI, 8, 0..4, true);
        assert_eq!(ax.index_and_bounds(0.0), (0, BoundsCase::InBounds));
        // roi covers the high end; raising n-1 wraps to 0 which is below it
        let ax = Axis::new(0.0, 2.0 * PI, 8, 4..8, true);
        let just_below_two_pi = 2.0 * PI - 0.5 * ALMOST_ZERO * ax.step();
        assert_eq!(ax.index_and_bounds(just_below_two_pi), (7, BoundsCase::InBounds));
        assert_eq!(ax.index_and_bounds(7.5 * ax.step()), (7, BoundsCase::InBounds));
    }

    #[test]
    fn non_finite_is_outside() {
        let ax = r_axis();
        assert_eq!(ax.index_and_bounds(Float::NAN).1, BoundsCase::OutOfBounds);
        assert_eq!(ax.index_and_bounds(Float::INFINITY).1, BoundsCase::OutOfBounds);
        let phi = Axis::new(0.0, 2.0 * PI, 8, 0..8, true);
        assert_eq!(phi.index_and_bounds(Float::NAN).1, BoundsCase::OutOfBounds);
    }

    #[test]
    fn cell_geometry() {
        let ax = r_axis();
        assert_eq!(ax.center(0), 27.5);
        assert_eq!(ax.low_edge(2), 50.0);
        assert!(ax.in_roi(1));
        assert!(!ax.in_roi(3));
        assert_eq!(ax.roi_len(), 2);
    }
}
