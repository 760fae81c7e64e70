use crate::grid::{GridDim, Idx3, LookupDim};
use crate::{Float, Sim, Vec3, ALMOST_ZERO};
use rayon::prelude::*;
use tracing::debug;

/// Coulomb constant in N cm^2 / C^2, so that charge in coulomb and
/// distance in cm give a field in V/cm.
pub const COULOMB_K: Float = 8.987e13;

/// Field at `at` due to one coulomb sitting at `from`.
/// Returns exactly zero when the two points coincide.
#[inline(always)]
pub fn calc_unit_field(at: Vec3, from: Vec3) -> Vec3 {
    let delta = at - from;
    let dist = delta.norm();
    if dist < ALMOST_ZERO * ALMOST_ZERO {
        return Vec3::zeros();
    }
    delta.normalize() * (COULOMB_K / (dist * dist))
}

/// Which point of a cell stands in for the charge it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellCentering {
    Midpoint,
    VolumeWeighted,
}

impl CellCentering {
    pub fn center(&self, sim: &Sim, cell: Idx3) -> Vec3 {
        match self {
            CellCentering::Midpoint => sim.cell_center(cell),
            CellCentering::VolumeWeighted => sim.weighted_cell_center(cell),
        }
    }
}

/// Unit field at every roi cell due to every cell of the full grid.
pub struct UnitFieldLookup {
    pub dim: LookupDim,
    data: Vec<Vec3>,
    populated: bool,
}

impl UnitFieldLookup {
    pub fn new(sim: &Sim) -> UnitFieldLookup {
        let dim = LookupDim {
            target: sim.roi_dim(),
            source: sim.full_dim(),
        };
        UnitFieldLookup {
            dim,
            data: vec![Vec3::zeros(); dim.len()],
            populated: false,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Evaluates the kernel for every (target, source) pair. Only depends
    /// on the geometry, so one table serves any charge distribution.
    pub fn populate(&mut self, sim: &Sim, centering: CellCentering) {
        let target: GridDim = self.dim.target;
        let source: GridDim = self.dim.source;
        let sources: Vec<Vec3> = (0..source.len())
            .map(|i| centering.center(sim, source.get_pos(i)))
            .collect();

        // one row of the table per target cell
        self.data
            .par_chunks_mut(source.len())
            .enumerate()
            .for_each(|(t, row)| {
                let at = centering.center(sim, sim.absolute_index(target.get_pos(t)));
                for (out, from) in row.iter_mut().zip(sources.iter()) {
                    *out = calc_unit_field(at, *from);
                }
            });
        self.populated = true;
        debug!("unit field lookup filled, {} entries", self.dim.len());
    }

    /// Unit field at roi-relative `target` due to absolute `source`.
    #[inline(always)]
    pub fn get(&self, target: Idx3, source: Idx3) -> Vec3 {
        self.data[self.dim.get_index(target, source)]
    }

    /// The full row of `target`, in source flat order.
    pub fn row(&self, target: Idx3) -> &[Vec3] {
        let n = self.dim.source.len();
        let start = self.dim.target.get_index(target) * n;
        &self.data[start..start + n]
    }
}
