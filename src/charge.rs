use crate::grid::{filter_phi_index, GridDim, Idx3};
use crate::{Float, Sim};
use tracing::{debug, info};

/// An externally computed charge density on its own cylindrical binning.
/// Axes are ordered (phi, r, z) throughout.
pub trait ChargeDensity {
    /// Number of bins along (phi, r, z).
    fn n_bins(&self) -> [usize; 3];
    /// Physical (min, max) of each axis, ordered (phi, r, z).
    fn extent(&self) -> [(Float, Float); 3];
    /// Density in bin (iphi, ir, iz).
    fn content(&self, iphi: usize, ir: usize, iz: usize) -> Float;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinAxis {
    pub n: usize,
    pub min: Float,
    pub max: Float,
}

impl BinAxis {
    pub fn new(n: usize, min: Float, max: Float) -> BinAxis {
        BinAxis { n, min, max }
    }

    pub fn step(&self) -> Float {
        (self.max - self.min) / self.n as Float
    }

    pub fn center(&self, i: usize) -> Float {
        self.min + self.step() * (i as Float + 0.5)
    }
}

/// Dense in-memory `ChargeDensity`.
#[derive(Clone, Debug)]
pub struct DensityHistogram {
    pub phi: BinAxis,
    pub r: BinAxis,
    pub z: BinAxis,
    data: Vec<Float>,
}

impl DensityHistogram {
    pub fn new(phi: BinAxis, r: BinAxis, z: BinAxis) -> DensityHistogram {
        DensityHistogram {
            phi,
            r,
            z,
            data: vec![0.0; phi.n * r.n * z.n],
        }
    }

    fn index(&self, iphi: usize, ir: usize, iz: usize) -> usize {
        if !cfg!(feature = "unchecked") {
            assert!(iphi < self.phi.n);
            assert!(ir < self.r.n);
            assert!(iz < self.z.n);
        }
        (iphi * self.r.n + ir) * self.z.n + iz
    }

    pub fn set(&mut self, iphi: usize, ir: usize, iz: usize, v: Float) {
        let i = self.index(iphi, ir, iz);
        self.data[i] = v;
    }
}

impl ChargeDensity for DensityHistogram {
    fn n_bins(&self) -> [usize; 3] {
        [self.phi.n, self.r.n, self.z.n]
    }

    fn extent(&self) -> [(Float, Float); 3] {
        [
            (self.phi.min, self.phi.max),
            (self.r.min, self.r.max),
            (self.z.min, self.z.max),
        ]
    }

    fn content(&self, iphi: usize, ir: usize, iz: usize) -> Float {
        self.data[self.index(iphi, ir, iz)]
    }
}

/// Volume of the cylindrical shell segment of a bin centered at radius
/// `r` with widths `dr`, `dphi`, `dz`.
pub fn bin_volume(r: Float, dr: Float, dphi: Float, dz: Float) -> Float {
    dphi * r * dr * dz
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// Space charge over the full grid, in coulomb per cell.
#[derive(Clone, Debug)]
pub struct SpaceCharge {
    pub q: Vec<Float>,
    pub dim: GridDim,
}

impl SpaceCharge {
    pub fn new(dim: GridDim) -> SpaceCharge {
        SpaceCharge {
            q: vec![0.0; dim.len()],
            dim,
        }
    }

    #[inline(always)]
    pub fn get(&self, pos: Idx3) -> Float {
        self.q[self.dim.get_index(pos)]
    }

    pub fn set(&mut self, pos: Idx3, v: Float) {
        let i = self.dim.get_index(pos);
        self.q[i] = v;
    }

    pub fn clear(&mut self) {
        for v in self.q.iter_mut() {
            *v = 0.0;
        }
    }

    pub fn total(&self) -> Float {
        self.q.iter().sum()
    }

    /// Replaces the grid contents with `density` rebinned onto the
    /// simulation cells. Bin centers are shifted toward z=0 by `zoffset`,
    /// and `scalefactor` converts density x volume into coulomb. Bins whose
    /// center falls outside the volume are skipped.
    pub fn load<D: ChargeDensity>(
        &mut self,
        sim: &Sim,
        density: &D,
        zoffset: Float,
        scalefactor: Float,
    ) -> LoadSummary {
        if !cfg!(feature = "unchecked") {
            assert_eq!(self.dim, sim.full_dim());
        }
        let [hphin, hrn, hzn] = density.n_bins();
        let [(hphimin, hphimax), (hrmin, hrmax), (hzmin, hzmax)] = density.extent();
        let hphistep = (hphimax - hphimin) / hphin as Float;
        let hrstep = (hrmax - hrmin) / hrn as Float;
        let hzstep = (hzmax - hzmin) / hzn as Float;

        self.clear();
        let mut loaded = 0;

        // skip straight to the first bins that can reach the volume
        let first_r = ((sim.rmin - hrmin) / hrstep).floor().max(0.0) as usize;
        let first_z = ((sim.zmin - (hzmin - zoffset)) / hzstep).floor().max(0.0) as usize;

        for ir in first_r..hrn {
            let hr = hrmin + hrstep * (ir as Float + 0.5);
            let localr = sim.r_axis.normalized(hr).floor() as isize;
            if localr < 0 {
                debug!("charge bin r={} is below rmin={}, skipping", hr, sim.rmin);
                continue;
            }
            if localr >= sim.nr as isize {
                debug!("charge bin r={} is beyond rmax={}, skipping the rest", hr, sim.rmax);
                break;
            }
            for iphi in 0..hphin {
                let hphi = hphimin + hphistep * (iphi as Float + 0.5);
                let localphi =
                    filter_phi_index(sim.phi_axis.normalized(hphi).floor() as isize, sim.nphi);
                for iz in first_z..hzn {
                    let hz = hzmin - zoffset + hzstep * (iz as Float + 0.5);
                    let localz = sim.z_axis.normalized(hz).floor() as isize;
                    if localz < 0 {
                        debug!("charge bin z={} is below zmin={}, skipping", hz, sim.zmin);
                        continue;
                    }
                    if localz >= sim.nz as isize {
                        debug!("charge bin z={} is beyond zmax={}, skipping the rest", hz, sim.zmax);
                        break;
                    }
                    let vol = bin_volume(hr, hrstep, hphistep, hzstep);
                    let qbin = scalefactor * vol * density.content(iphi, ir, iz);
                    let cell = Idx3::new(localr as usize, localphi as usize, localz as usize);
                    let i = self.dim.get_index(cell);
                    self.q[i] += qbin;
                    loaded += 1;
                }
            }
        }

        let summary = LoadSummary {
            loaded,
            skipped: hphin * hrn * hzn - loaded,
        };
        info!(
            "loaded {} charge bins ({} outside the volume), total charge {:e} C",
            summary.loaded,
            summary.skipped,
            self.total()
        );
        summary
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::{build_test_sim, E_TOL, PI};

    fn wide_histogram() -> DensityHistogram {
        // r and z reach past the 20..80 x 0..100 test volume on both sides
        let mut h = DensityHistogram::new(
            BinAxis::new(8, -PI, PI),
            BinAxis::new(16, 10.0, 90.0),
            BinAxis::new(24, 0.0, 120.0),
        );
        for iphi in 0..8 {
            for ir in 0..16 {
                for iz in 0..24 {
                    h.set(iphi, ir, iz, 1.0 + (iphi + 2 * ir + 3 * iz) as Float * 0.01);
                }
            }
        }
        h
    }

    #[test]
    fn charge_is_conserved() {
        let sim = build_test_sim();
        let h = wide_histogram();
        let zoffset = 1.0;
        let scale = 1e-12;
        let mut q = SpaceCharge::new(sim.full_dim());
        let summary = q.load(&sim, &h, zoffset, scale);

        let mut expected = 0.0;
        let mut inside = 0;
        for iphi in 0..h.phi.n {
            for ir in 0..h.r.n {
                for iz in 0..h.z.n {
                    let hr = h.r.center(ir);
                    let hz = h.z.center(iz) - zoffset;
                    if hr >= 20.0 && hr < 80.0 && hz >= 0.0 && hz < 100.0 {
                        let vol = bin_volume(hr, h.r.step(), h.phi.step(), h.z.step());
                        expected += scale * vol * h.content(iphi, ir, iz);
                        inside += 1;
                    }
                }
            }
        }
        assert_eq!(summary.loaded, inside);
        assert_eq!(summary.loaded + summary.skipped, 8 * 16 * 24);
        assert!(((q.total() - expected) / expected).abs() < E_TOL);
    }

    #[test]
    fn load_replaces_previous_charge() {
        let sim = build_test_sim();
        let h = wide_histogram();
        let mut q = SpaceCharge::new(sim.full_dim());
        q.load(&sim, &h, 1.0, 1e-12);
        let first = q.total();
        q.load(&sim, &h, 1.0, 1e-12);
        assert!(((q.total() - first) / first).abs() < E_TOL);
    }

    #[test]
    fn single_bin_lands_in_enclosing_cell() {
        let sim = build_test_sim();
        // one bin centered at r=42.5, phi=-pi/4, z=60 (after the offset)
        let mut h = DensityHistogram::new(
            BinAxis::new(4, -PI, PI),
            BinAxis::new(4, 20.0, 80.0),
            BinAxis::new(5, 0.0, 100.0),
        );
        h.set(1, 1, 3, 2.0);
        let mut q = SpaceCharge::new(sim.full_dim());
        q.load(&sim, &h, 10.0, 0.5);

        // phi=-pi/4 wraps into the last of four azimuthal cells
        let cell = Idx3::new(1, 3, 2);
        let vol = bin_volume(42.5, 15.0, 0.5 * PI, 20.0);
        assert!((q.get(cell) - 0.5 * vol * 2.0).abs() < E_TOL * q.get(cell));
        assert!((q.total() - q.get(cell)).abs() < E_TOL * q.get(cell));
    }
}
