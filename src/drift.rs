use crate::flds::integral::{field_integral, interpolated_field_integral};
use crate::flds::{FieldScales, Flds};
use crate::grid::Idx3;
use crate::{DriftError, Float, Sim, Vec3, ALMOST_ZERO};
use tracing::{debug, trace};

/// Coefficients (c0, c1, c2) of the second order Langevin expansion for
/// a given omega tau.
pub fn langevin_coefficients(omega_tau: Float) -> (Float, Float, Float) {
    let c0 = 1.0 / (1.0 + omega_tau * omega_tau);
    let c1 = c0 * omega_tau;
    let c2 = c1 * omega_tau;
    (c0, c1, c2)
}

/// Drifts a charge from `start` to depth `zdest` in one step. The
/// transverse displacement follows from the E integral along the path
/// and the B field of the reference cell; z lands exactly on `zdest`.
pub fn swim_to(
    sim: &Sim,
    flds: &Flds,
    scales: FieldScales,
    zdest: Float,
    start: Vec3,
    interpolate: bool,
) -> Result<Vec3, DriftError> {
    if !sim.check_start(start) {
        return Err(DriftError::StartOutsideRoi(start));
    }
    let zdist = zdest - start.z;
    if zdist.abs() < ALMOST_ZERO * sim.z_axis.step() {
        debug!("no drift length from z={} to z={}, staying put", start.z, zdest);
        return Ok(start);
    }

    let int = if interpolate {
        interpolated_field_integral(sim, &flds.e_field, zdest, start)?
    } else {
        field_integral(sim, &flds.e_field, zdest, start)?
    };
    // B is uniform, the first roi cell stands in for the whole volume
    let b = flds.b_field.get(Idx3::new(0, 0, 0)) * scales.b;

    // average longitudinal field over the path
    let fieldz = int.z / zdist;
    if fieldz == 0.0 || !fieldz.is_finite() {
        return Err(DriftError::VanishingField);
    }
    let mu = sim.vdrift / fieldz;
    // cm^2/m^2 to unitless
    let omega_tau = mu * b.z * 1e-4;
    let (c0, c1, c2) = langevin_coefficients(omega_tau);
    let (bx_bz, by_bz) = if b.z == 0.0 {
        (0.0, 0.0)
    } else {
        (b.x / b.z, b.y / b.z)
    };

    let dx = c0 * int.x / fieldz + c1 * int.y / fieldz - c1 * by_bz * zdist + c2 * bx_bz * zdist;
    let dy = c0 * int.y / fieldz - c1 * int.x / fieldz + c1 * bx_bz * zdist + c2 * by_bz * zdist;
    trace!("omega tau {}, displacement ({}, {})", omega_tau, dx, dy);

    Ok(Vec3::new(start.x + dx, start.y + dy, zdest))
}

/// `swim_to` split into `steps` equal z increments, re-checking the
/// position before each one. A failure reports the last good position.
pub fn swim_to_in_steps(
    sim: &Sim,
    flds: &Flds,
    scales: FieldScales,
    zdest: Float,
    start: Vec3,
    steps: u32,
    interpolate: bool,
) -> Result<Vec3, DriftError> {
    if steps == 0 {
        return Ok(start);
    }
    let zstep = (zdest - start.z) / steps as Float;
    let mut pos = start;
    for i in 0..steps {
        let stopped = move |cause: DriftError| DriftError::Stopped {
            step: i,
            steps,
            position: pos,
            cause: Box::new(cause),
        };
        if !sim.check_start(pos) {
            return Err(stopped(DriftError::StartOutsideRoi(pos)));
        }
        let target = if i + 1 == steps {
            zdest
        } else {
            start.z + zstep * (i + 1) as Float
        };
        pos = swim_to(sim, flds, scales, target, pos, interpolate).map_err(stopped)?;
    }
    Ok(pos)
}
