use crate::charge::{ChargeDensity, LoadSummary, SpaceCharge};
use crate::drift;
use crate::flds::field::VectorField;
use crate::flds::integral;
use crate::flds::{FieldScales, Flds};
use crate::grid::Idx3;
use crate::lookup::{CellCentering, UnitFieldLookup};
use crate::{Config, DriftError, Fields, Float, Params, Sim, Vec3};
use anyhow::Result;
use tracing::{info, warn};

/// A detector volume with its charge, fields and lookup table, and the
/// bookkeeping that keeps queries from reading a stale field map.
pub struct AnnularFieldSim {
    sim: Sim,
    q: SpaceCharge,
    lookup: UnitFieldLookup,
    flds: Flds,
    scales: FieldScales,
    centering: CellCentering,
    fieldmap_fresh: bool,
}

impl AnnularFieldSim {
    pub fn new(params: &Params, fields: &Fields) -> Result<AnnularFieldSim> {
        let sim = Sim::new(params)?;
        let mut flds = Flds::new(&sim);
        flds.set_flat_fields(fields.b_z, fields.e_z);
        let centering = if params.weighted_centers {
            CellCentering::VolumeWeighted
        } else {
            CellCentering::Midpoint
        };
        info!(
            "built {}x{}x{} grid, r {}..{} cm, z {}..{} cm",
            sim.nr, sim.nphi, sim.nz, sim.rmin, sim.rmax, sim.zmin, sim.zmax
        );
        Ok(AnnularFieldSim {
            q: SpaceCharge::new(sim.full_dim()),
            lookup: UnitFieldLookup::new(&sim),
            flds,
            scales: FieldScales {
                e: fields.e_scale,
                b: fields.b_scale,
            },
            centering,
            fieldmap_fresh: false,
            sim,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<AnnularFieldSim> {
        AnnularFieldSim::new(&cfg.params, &cfg.fields)
    }

    /// Region of interest covering the whole grid, default fields.
    pub fn full_grid(
        rmin: Float,
        rmax: Float,
        z_length: Float,
        nr: usize,
        nphi: usize,
        nz: usize,
        vdrift: Float,
    ) -> Result<AnnularFieldSim> {
        let params = Params {
            rmin,
            rmax,
            z_length,
            nr,
            nphi,
            nz,
            roi: None,
            vdrift,
            weighted_centers: false,
        };
        AnnularFieldSim::new(&params, &Fields::default())
    }

    pub fn geometry(&self) -> &Sim {
        &self.sim
    }

    pub fn charge(&self) -> &SpaceCharge {
        &self.q
    }

    pub fn efield(&self) -> &VectorField {
        &self.flds.e_field
    }

    pub fn bfield(&self) -> &VectorField {
        &self.flds.b_field
    }

    pub fn is_fieldmap_fresh(&self) -> bool {
        self.fieldmap_fresh
    }

    pub fn load_spacecharge<D: ChargeDensity>(
        &mut self,
        density: &D,
        zoffset: Float,
        scalefactor: Float,
    ) -> LoadSummary {
        self.fieldmap_fresh = false;
        self.q.load(&self.sim, density, zoffset, scalefactor)
    }

    /// Charge in a single cell, in coulomb.
    pub fn set_cell_charge(&mut self, cell: Idx3, q: Float) {
        self.fieldmap_fresh = false;
        self.q.set(cell, q);
    }

    /// Uniform axial B (tesla) and external E (V/cm).
    pub fn set_flat_fields(&mut self, b: Float, e: Float) {
        self.fieldmap_fresh = false;
        self.flds.set_flat_fields(b, e);
    }

    /// External E at roi-relative `cell`.
    pub fn set_external_efield(&mut self, cell: Idx3, e: Vec3) {
        self.fieldmap_fresh = false;
        self.flds.e_external.set(cell, e);
    }

    /// B at roi-relative `cell`. Only the first roi cell is read by the
    /// drift, so B should be uniform.
    pub fn set_bfield(&mut self, cell: Idx3, b: Vec3) {
        self.flds.b_field.set(cell, b);
    }

    pub fn set_escale(&mut self, e: Float) {
        self.fieldmap_fresh = false;
        self.scales.e = e;
    }

    pub fn set_bscale(&mut self, b: Float) {
        self.scales.b = b;
    }

    pub fn populate_lookup(&mut self) {
        self.lookup.populate(&self.sim, self.centering);
    }

    pub fn populate_fieldmap(&mut self) -> Result<(), DriftError> {
        if !self.lookup.is_populated() {
            return Err(DriftError::LookupNotPopulated);
        }
        self.flds
            .populate_fieldmap(&self.sim, &self.lookup, &self.q, self.scales);
        self.fieldmap_fresh = true;
        Ok(())
    }

    fn check_fresh(&self) -> Result<(), DriftError> {
        if self.fieldmap_fresh {
            Ok(())
        } else {
            Err(DriftError::StaleFieldmap)
        }
    }

    pub fn field_integral(&self, zdest: Float, start: Vec3) -> Result<Vec3, DriftError> {
        self.check_fresh()?;
        integral::field_integral(&self.sim, &self.flds.e_field, zdest, start)
    }

    pub fn interpolated_field_integral(
        &self,
        zdest: Float,
        start: Vec3,
    ) -> Result<Vec3, DriftError> {
        self.check_fresh()?;
        integral::interpolated_field_integral(&self.sim, &self.flds.e_field, zdest, start)
    }

    pub fn try_swim_to(&self, zdest: Float, start: Vec3, interpolate: bool) -> Result<Vec3, DriftError> {
        self.check_fresh()?;
        drift::swim_to(&self.sim, &self.flds, self.scales, zdest, start, interpolate)
    }

    pub fn try_swim_to_in_steps(
        &self,
        zdest: Float,
        start: Vec3,
        steps: u32,
        interpolate: bool,
    ) -> Result<Vec3, DriftError> {
        self.check_fresh()?;
        drift::swim_to_in_steps(&self.sim, &self.flds, self.scales, zdest, start, steps, interpolate)
    }

    /// Like `try_swim_to`, but logs a failure and hands back `start`.
    pub fn swim_to(&self, zdest: Float, start: Vec3, interpolate: bool) -> Vec3 {
        match self.try_swim_to(zdest, start, interpolate) {
            Ok(end) => end,
            Err(e) => {
                warn!("could not swim from {:?} to z={}: {}", start, zdest, e);
                start
            }
        }
    }

    /// Like `try_swim_to_in_steps`, but logs a failure and hands back the
    /// last position reached.
    pub fn swim_to_in_steps(&self, zdest: Float, start: Vec3, steps: u32, interpolate: bool) -> Vec3 {
        match self.try_swim_to_in_steps(zdest, start, steps, interpolate) {
            Ok(end) => end,
            Err(DriftError::Stopped {
                position, cause, ..
            }) => {
                warn!("swim from {:?} to z={} stopped at {:?}: {}", start, zdest, position, cause);
                position
            }
            Err(e) => {
                warn!("could not swim from {:?} to z={}: {}", start, zdest, e);
                start
            }
        }
    }
}
