use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use tracing::info;

pub mod charge;
pub mod drift;
pub mod error;
pub mod flds;
pub mod grid;
pub mod lookup;
pub mod save;
pub mod simulation;
pub mod vec3;

pub use crate::error::DriftError;
pub use crate::grid::{BoundsCase, Idx3};
pub use crate::simulation::AnnularFieldSim;
pub use crate::vec3::{Cylindrical, Vec3};

// We use a type alias for f64/Float to easily support
// double and single precision.
#[cfg(feature = "dprec")]
pub type Float = f64;

#[cfg(not(feature = "dprec"))]
pub type Float = f32;

pub const PI: Float = std::f64::consts::PI as Float;

/// Tolerance, in units of a cell step, for treating a coordinate as
/// sitting on a cell boundary.
pub const ALMOST_ZERO: Float = 0.00001;

#[derive(Deserialize)]
pub struct Config {
    pub params: Params,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub output: Output,
}

#[derive(Deserialize)]
pub struct Params {
    /// inner radius of the drift volume, cm
    pub rmin: Float,
    /// outer radius, cm
    pub rmax: Float,
    /// drift length, cm
    pub z_length: Float,
    pub nr: usize,
    pub nphi: usize,
    pub nz: usize,
    /// Region of interest. Defaults to the full grid.
    #[serde(default)]
    pub roi: Option<Roi>,
    /// nominal drift velocity, cm/s
    pub vdrift: Float,
    /// build the unit-field table from volume weighted cell centers
    #[serde(default)]
    pub weighted_centers: bool,
}

/// Half-open cell ranges, [start, end), per axis.
#[derive(Deserialize, Clone)]
pub struct Roi {
    pub r: [usize; 2],
    pub phi: [usize; 2],
    pub z: [usize; 2],
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct Fields {
    /// uniform axial external E, V/cm
    pub e_z: Float,
    /// uniform axial B, T
    pub b_z: Float,
    pub e_scale: Float,
    pub b_scale: Float,
}

impl Default for Fields {
    fn default() -> Fields {
        Fields {
            e_z: 200.0,
            b_z: 1.4,
            e_scale: 1.0,
            b_scale: 1.0,
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct Output {
    pub write_output: bool,
    pub output_dir: String,
    pub interpolate: bool,
    pub steps: u32,
}

impl Default for Output {
    fn default() -> Output {
        Output {
            write_output: false,
            output_dir: "output".to_string(),
            interpolate: false,
            steps: 1,
        }
    }
}

impl Config {
    pub fn new() -> Result<Config> {
        Config::from_file("config.toml")
    }

    pub fn from_file(path: &str) -> Result<Config> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Could not open the {} file", path))?;
        toml::from_str(&contents).with_context(|| "Could not parse Config file")
    }
}

/// Geometry of the simulation: the three discretized axes with their
/// regions of interest, plus the nominal drift velocity.
#[derive(Clone, Debug)]
pub struct Sim {
    pub nr: usize,
    pub nphi: usize,
    pub nz: usize,
    pub rmin: Float,
    pub rmax: Float,
    pub zmin: Float,
    pub zmax: Float,
    pub vdrift: Float,
    pub r_axis: grid::Axis,
    pub phi_axis: grid::Axis,
    pub z_axis: grid::Axis,
}

fn check_roi(name: &str, roi: [usize; 2], n: usize) -> Result<()> {
    if roi[0] >= n || roi[1] > n || roi[0] >= roi[1] {
        return Err(anyhow::Error::msg(format!(
            "{} roi [{}, {}) is out of range or not ordered for {} cells",
            name, roi[0], roi[1], n
        )));
    }
    Ok(())
}

impl Sim {
    pub fn new(params: &Params) -> Result<Sim> {
        if params.nr == 0 || params.nphi == 0 || params.nz == 0 {
            return Err(anyhow::Error::msg("Every axis needs at least one cell"));
        }
        if !(params.rmax > params.rmin) || params.rmin < 0.0 {
            return Err(anyhow::Error::msg(
                "Outer radius must exceed a non-negative inner radius",
            ));
        }
        if !(params.z_length > 0.0) {
            return Err(anyhow::Error::msg("Drift length must be positive"));
        }
        let roi = params.roi.clone().unwrap_or(Roi {
            r: [0, params.nr],
            phi: [0, params.nphi],
            z: [0, params.nz],
        });
        check_roi("r", roi.r, params.nr)?;
        // an ordered phi roi inside [0, nphi) can not span the wrap-around
        check_roi("phi", roi.phi, params.nphi)
            .context("phi roi is out of range or spans the wrap-around")?;
        check_roi("z", roi.z, params.nz)?;

        Ok(Sim {
            nr: params.nr,
            nphi: params.nphi,
            nz: params.nz,
            rmin: params.rmin,
            rmax: params.rmax,
            zmin: 0.0,
            zmax: params.z_length,
            vdrift: params.vdrift,
            r_axis: grid::Axis::new(
                params.rmin,
                params.rmax - params.rmin,
                params.nr,
                roi.r[0]..roi.r[1],
                false,
            ),
            phi_axis: grid::Axis::new(0.0, 2.0 * PI, params.nphi, roi.phi[0]..roi.phi[1], true),
            z_axis: grid::Axis::new(0.0, params.z_length, params.nz, roi.z[0]..roi.z[1], false),
        })
    }

    pub fn full_dim(&self) -> grid::GridDim {
        grid::GridDim::new(self.nr, self.nphi, self.nz)
    }

    pub fn roi_dim(&self) -> grid::GridDim {
        grid::GridDim::new(
            self.r_axis.roi_len(),
            self.phi_axis.roi_len(),
            self.z_axis.roi_len(),
        )
    }

    /// Converts an absolute cell index inside the roi into the index
    /// used by the roi-sized arrays.
    pub fn roi_index(&self, cell: Idx3) -> Idx3 {
        if !cfg!(feature = "unchecked") {
            assert!(self.r_axis.in_roi(cell.r as isize));
            assert!(self.phi_axis.in_roi(cell.phi as isize));
            assert!(self.z_axis.in_roi(cell.z as isize));
        }
        Idx3 {
            r: cell.r - self.r_axis.roi().start,
            phi: cell.phi - self.phi_axis.roi().start,
            z: cell.z - self.z_axis.roi().start,
        }
    }

    /// Inverse of `roi_index`.
    pub fn absolute_index(&self, roi_cell: Idx3) -> Idx3 {
        Idx3 {
            r: roi_cell.r + self.r_axis.roi().start,
            phi: roi_cell.phi + self.phi_axis.roi().start,
            z: roi_cell.z + self.z_axis.roi().start,
        }
    }

    /// Midpoint of the cell, halfway between each pair of edges.
    pub fn cell_center(&self, cell: Idx3) -> Vec3 {
        Vec3::from_cylindrical(
            self.r_axis.center(cell.r),
            self.phi_axis.center(cell.phi),
            self.z_axis.center(cell.z),
        )
    }

    /// Cell center with the radius moved to the volume weighted centroid
    /// of the annular sector.
    pub fn weighted_cell_center(&self, cell: Idx3) -> Vec3 {
        let dr = self.r_axis.step();
        let dphi = self.phi_axis.step();
        let rin = self.r_axis.low_edge(cell.r as isize);
        let rout = rin + dr;
        let r_mid = 4.0 * (dphi / 2.0).sin() * (rout.powi(3) - rin.powi(3))
            / (3.0 * dphi * (rout.powi(2) - rin.powi(2)));
        Vec3::from_cylindrical(
            r_mid,
            self.phi_axis.center(cell.phi),
            self.z_axis.center(cell.z),
        )
    }

    /// Checks that `pos` can start a drift: r and phi strictly inside the
    /// roi, z inside or just touching the high edge.
    pub fn check_start(&self, pos: Vec3) -> bool {
        let (_, r_case) = self.r_axis.index_and_bounds(pos.rho());
        let (_, phi_case) = self.phi_axis.index_and_bounds(pos.azimuth());
        let (_, z_case) = self.z_axis.index_and_bounds(pos.z);
        r_case == BoundsCase::InBounds
            && phi_case == BoundsCase::InBounds
            && (z_case == BoundsCase::InBounds || z_case == BoundsCase::OnHighEdge)
    }
}

pub fn run(cfg: Config) -> Result<()> {
    let mut sim = AnnularFieldSim::from_config(&cfg)?;
    let geom = sim.geometry().clone();
    info!(
        "populating unit field lookup for ({}x{}x{}) roi against ({}x{}x{}) grid",
        geom.r_axis.roi_len(),
        geom.phi_axis.roi_len(),
        geom.z_axis.roi_len(),
        geom.nr,
        geom.nphi,
        geom.nz
    );
    sim.populate_lookup();
    info!("summing field map");
    sim.populate_fieldmap()?;

    // drift one electron down every roi column, from the center of the
    // top roi layer to the center of the bottom one
    let z_top = geom.z_axis.center(geom.z_axis.roi().end - 1);
    let z_bottom = geom.z_axis.center(geom.z_axis.roi().start);
    let mut start_x: Vec<Float> = Vec::new();
    let mut start_y: Vec<Float> = Vec::new();
    let mut dx: Vec<Float> = Vec::new();
    let mut dy: Vec<Float> = Vec::new();
    for ir in geom.r_axis.roi() {
        for iphi in geom.phi_axis.roi() {
            let mut start = geom.cell_center(Idx3::new(ir, iphi, 0));
            start.z = z_top;
            let end = sim.swim_to_in_steps(z_bottom, start, cfg.output.steps, cfg.output.interpolate);
            start_x.push(start.x);
            start_y.push(start.y);
            dx.push(end.x - start.x);
            dy.push(end.y - start.y);
        }
    }
    info!("drifted {} electrons", dx.len());

    if cfg.output.write_output {
        let outdir = &cfg.output.output_dir;
        fs::create_dir_all(format!("{}/flds", outdir)).context("Unable to create output directory")?;
        save::save_drift_map(outdir, &start_x, &start_y, &dx, &dy)?;
        save::save_field(sim.efield(), "efield", outdir)?;
        save::save_field(sim.bfield(), "bfield", outdir)?;
    }
    Ok(())
}

#[cfg(test)]
pub const E_TOL: Float = 1E-4;

#[cfg(test)]
pub(crate) fn build_test_params() -> Params {
    // This is a function that sets up a dummy small
    // simulation so that it can be used in testing;
    Params {
        rmin: 20.0,
        rmax: 80.0,
        z_length: 100.0,
        nr: 4,
        nphi: 4,
        nz: 4,
        roi: None,
        vdrift: 8.0e6,
        weighted_centers: false,
    }
}

#[cfg(test)]
pub(crate) fn build_test_sim() -> Sim {
    match Sim::new(&build_test_params()) {
        Ok(sim) => sim,
        Err(e) => panic!("test geometry rejected: {}", e),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn steps_from_extents() {
        let sim = build_test_sim();
        assert_eq!(sim.r_axis.step(), 15.0);
        assert_eq!(sim.z_axis.step(), 25.0);
        assert!((sim.phi_axis.step() - 0.5 * PI).abs() < E_TOL);
        assert_eq!(sim.roi_dim(), sim.full_dim());
    }

    #[test]
    fn rejects_bad_roi() {
        let mut params = build_test_params();
        params.roi = Some(Roi {
            r: [2, 2],
            phi: [0, 4],
            z: [0, 4],
        });
        assert!(Sim::new(&params).is_err());

        params.roi = Some(Roi {
            r: [0, 4],
            phi: [3, 5],
            z: [0, 4],
        });
        assert!(Sim::new(&params).is_err());

        params.roi = Some(Roi {
            r: [0, 4],
            phi: [0, 4],
            z: [4, 4],
        });
        assert!(Sim::new(&params).is_err());

        params.roi = Some(Roi {
            r: [1, 3],
            phi: [1, 2],
            z: [0, 3],
        });
        let sim = Sim::new(&params).expect("valid roi");
        assert_eq!(sim.roi_dim(), grid::GridDim::new(2, 1, 3));
        let cell = Idx3::new(2, 1, 2);
        assert_eq!(sim.roi_index(cell), Idx3::new(1, 0, 2));
        assert_eq!(sim.absolute_index(sim.roi_index(cell)), cell);
    }

    #[test]
    fn cell_centers() {
        let sim = build_test_sim();
        let c = sim.cell_center(Idx3::new(1, 0, 2));
        assert!((c.rho() - 42.5).abs() < E_TOL * 42.5);
        assert!((c.azimuth() - 0.25 * PI).abs() < E_TOL);
        assert_eq!(c.z, 62.5);

        // the sector centroid stays within the radial span of the cell
        let w = sim.weighted_cell_center(Idx3::new(1, 0, 2));
        assert!(w.rho() > 35.0 && w.rho() < 50.0);
        assert!((w.azimuth() - c.azimuth()).abs() < E_TOL);
        assert_eq!(w.z, c.z);
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let sim = build_test_sim();
        assert!(sim.check_start(sim.cell_center(Idx3::new(1, 1, 1))));
        assert!(!sim.check_start(Vec3::new(Float::NAN, Float::NAN, Float::NAN)));
        let mut pos = sim.cell_center(Idx3::new(1, 1, 1));
        pos.z = Float::NAN;
        assert!(!sim.check_start(pos));
    }

    #[test]
    fn config_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [params]
            rmin = 20.0
            rmax = 78.0
            z_length = 105.5
            nr = 10
            nphi = 12
            nz = 20
            vdrift = 8.0e6

            [params.roi]
            r = [2, 8]
            phi = [0, 6]
            z = [0, 20]

            [fields]
            e_z = 400.0
            "#,
        )
        .expect("config parses");
        assert_eq!(cfg.fields.e_z, 400.0);
        assert_eq!(cfg.fields.b_z, 1.4);
        assert_eq!(cfg.output.steps, 1);
        assert!(!cfg.params.weighted_centers);
        let sim = Sim::new(&cfg.params).expect("valid geometry");
        assert_eq!(sim.roi_dim(), grid::GridDim::new(6, 6, 20));
    }
}
