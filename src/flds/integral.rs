use crate::flds::field::VectorField;
use crate::grid::{BoundsCase, Idx3};
use crate::vec3::Cylindrical;
use crate::{DriftError, Float, Sim, Vec3, ALMOST_ZERO};
use tracing::trace;

/// Ordered z extent of an integral: `lo` <= `hi`, with `dir` holding the
/// sign of the requested direction.
struct ZSpan {
    zi: usize,
    zf: usize,
    lo: Float,
    hi: Float,
    dir: Float,
}

fn z_span(sim: &Sim, zdest: Float, start_z: Float) -> Result<ZSpan, DriftError> {
    let dir = if start_z > zdest { -1.0 } else { 1.0 };
    let (lo, hi) = if dir > 0.0 {
        (start_z, zdest)
    } else {
        (zdest, start_z)
    };
    let (zi, lo_case) = sim.z_axis.index_and_bounds(lo);
    let (zf, hi_case) = sim.z_axis.index_and_bounds(hi);
    // barely touching the high edge just drops the final sliver
    let hi_ok = hi_case == BoundsCase::InBounds || hi_case == BoundsCase::OnHighEdge;
    if lo_case != BoundsCase::InBounds || !hi_ok {
        return Err(DriftError::DepthOutOfBounds {
            start_z: lo,
            end_z: hi,
            start_index: zi,
            end_index: zf,
        });
    }
    Ok(ZSpan {
        zi: zi as usize,
        zf: zf as usize,
        lo,
        hi,
        dir,
    })
}

/// Unsigned integral along one absolute (r, phi) column over `span`.
fn column_integral(sim: &Sim, efield: &VectorField, r: usize, phi: usize, span: &ZSpan) -> Vec3 {
    let dz = sim.z_axis.step();
    let at = |z: usize| efield.get(sim.roi_index(Idx3::new(r, phi, z)));

    // every cell from the low end up to, not including, the high end cell
    let mut sum = Vec3::zeros();
    for z in span.zi..span.zf {
        sum += at(z) * dz;
    }
    // cells hold their low edge, so trim what we skipped of the first one
    sum -= at(span.zi) * (span.lo - sim.z_axis.low_edge(span.zi as isize));
    if sim.z_axis.normalized(span.hi) - span.zf as Float > ALMOST_ZERO {
        sum += at(span.zf) * (span.hi - sim.z_axis.low_edge(span.zf as isize));
    }
    sum
}

/// Integral of E dz from `start` to `zdest` along the single column
/// containing `start`.
pub fn field_integral(
    sim: &Sim,
    efield: &VectorField,
    zdest: Float,
    start: Vec3,
) -> Result<Vec3, DriftError> {
    let (r, r_case) = sim.r_axis.index_and_bounds(start.rho());
    let (phi, phi_case) = sim.phi_axis.index_and_bounds(start.azimuth());
    if r_case != BoundsCase::InBounds || phi_case != BoundsCase::InBounds {
        return Err(DriftError::ColumnOutOfBounds {
            r: start.rho(),
            phi: start.azimuth(),
            r_index: r,
            phi_index: phi,
        });
    }
    let span = z_span(sim, zdest, start.z)?;
    trace!(
        "integrating column ({},{}) over cells {}..={}",
        r,
        phi,
        span.zi,
        span.zf
    );
    Ok(column_integral(sim, efield, r as usize, phi as usize, &span) * span.dir)
}

/// The two columns bracketing `pos` on one axis with their linear
/// weights. A column outside the roi is dropped and the other takes
/// the full weight.
fn bracket(axis: &crate::grid::Axis, pos: Float) -> [Option<(usize, Float)>; 2] {
    let f = axis.normalized(pos) - 0.5;
    let lo = f.floor();
    let frac = f - lo;
    let lo_i = axis.filter_index(lo as isize);
    let hi_i = axis.filter_index(lo as isize + 1);
    let lo_in = axis.in_roi(lo_i);
    let hi_in = axis.in_roi(hi_i);
    let lo_w = if hi_in { 1.0 - frac } else { 1.0 };
    let hi_w = if lo_in { frac } else { 1.0 };
    [
        if lo_in { Some((lo_i as usize, lo_w)) } else { None },
        if hi_in { Some((hi_i as usize, hi_w)) } else { None },
    ]
}

/// Integral of E dz from `start` to `zdest`, bilinearly interpolated in
/// (r, phi) between the four column centers surrounding `start`.
pub fn interpolated_field_integral(
    sim: &Sim,
    efield: &VectorField,
    zdest: Float,
    start: Vec3,
) -> Result<Vec3, DriftError> {
    let (r, r_case) = sim.r_axis.index_and_bounds(start.rho());
    let (phi, phi_case) = sim.phi_axis.index_and_bounds(start.azimuth());
    if r_case != BoundsCase::InBounds || phi_case != BoundsCase::InBounds {
        return Err(DriftError::ColumnOutOfBounds {
            r: start.rho(),
            phi: start.azimuth(),
            r_index: r,
            phi_index: phi,
        });
    }
    let span = z_span(sim, zdest, start.z)?;

    let mut sum = Vec3::zeros();
    for (ri, rw) in bracket(&sim.r_axis, start.rho()).iter().flatten() {
        for (pi, pw) in bracket(&sim.phi_axis, start.azimuth()).iter().flatten() {
            trace!("column ({},{}) weight {}", ri, pi, rw * pw);
            sum += column_integral(sim, efield, *ri, *pi, &span) * (rw * pw);
        }
    }
    Ok(sum * span.dir)
}
