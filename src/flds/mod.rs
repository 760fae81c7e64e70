use crate::charge::SpaceCharge;
use crate::grid::Idx3;
use crate::lookup::UnitFieldLookup;
use crate::{Float, Sim, Vec3};
use itertools::izip;
use rayon::prelude::*;

pub mod field;
pub mod integral;
use crate::flds::field::VectorField;

/// Multipliers applied to the external E grid during summation and to
/// the B grid during drift. Kept out of the grids themselves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldScales {
    pub e: Float,
    pub b: Float,
}

impl Default for FieldScales {
    fn default() -> FieldScales {
        FieldScales { e: 1.0, b: 1.0 }
    }
}

pub struct Flds {
    // The struct that holds all the roi-sized fields.
    // e_field is the total, the only one read by the line integrals.
    pub e_field: VectorField,
    pub e_external: VectorField,
    pub b_field: VectorField,
}

impl Flds {
    pub fn new(sim: &Sim) -> Flds {
        let dim = sim.roi_dim();
        Flds {
            e_field: VectorField::new("efield", dim),
            e_external: VectorField::new("eexternal", dim),
            b_field: VectorField::new("bfield", dim),
        }
    }

    /// Uniform axial fields, B in tesla and E in V/cm.
    pub fn set_flat_fields(&mut self, b: Float, e: Float) {
        self.b_field.fill(Vec3::new(0.0, 0.0, b));
        self.e_external.fill(Vec3::new(0.0, 0.0, e));
    }

    /// Sums every roi cell into `e_field`.
    pub fn populate_fieldmap(
        &mut self,
        sim: &Sim,
        lookup: &UnitFieldLookup,
        q: &SpaceCharge,
        scales: FieldScales,
    ) {
        let dim = self.e_field.dim;
        let e_external = &self.e_external;
        self.e_field
            .data
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, e)| {
                *e = sum_field_at(sim, lookup, q, e_external, dim.get_pos(i), scales);
            });
    }
}

/// Total field at roi-relative `cell`: the unit field of every other
/// cell weighted by its charge, plus the scaled external field.
pub fn sum_field_at(
    sim: &Sim,
    lookup: &UnitFieldLookup,
    q: &SpaceCharge,
    e_external: &VectorField,
    cell: Idx3,
    scales: FieldScales,
) -> Vec3 {
    if !cfg!(feature = "unchecked") {
        assert_eq!(lookup.dim.source, q.dim);
    }
    let own = q.dim.get_index(sim.absolute_index(cell));
    let mut sum = Vec3::zeros();
    for (i, (unit, charge)) in izip!(lookup.row(cell), &q.q).enumerate() {
        if i == own {
            continue;
        }
        sum += *unit * *charge;
    }
    sum + e_external.get(cell) * scales.e
}
