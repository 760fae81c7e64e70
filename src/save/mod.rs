use crate::{flds::field::VectorField, Float};
use anyhow::{Context, Result};
use tracing::info;

/// Writes each cartesian component of `fld` to `{outdir}/flds/{name}_{x,y,z}.npy`
/// in flat (r, phi, z) order.
pub(crate) fn save_field(fld: &VectorField, name: &str, outdir: &str) -> Result<()> {
    for (axis, suffix) in ["x", "y", "z"].iter().enumerate() {
        let out_vec: Vec<Float> = fld.component(axis);
        npy::to_file(format!("{}/flds/{}_{}.npy", outdir, name, suffix), out_vec)
            .context(format!("Could not save {} data to file", fld.name))?;
    }
    Ok(())
}

/// Start positions and transverse displacements of the drifted charges.
pub(crate) fn save_drift_map(
    outdir: &str,
    start_x: &[Float],
    start_y: &[Float],
    dx: &[Float],
    dy: &[Float],
) -> Result<()> {
    info!("saving drift map to {}", outdir);
    npy::to_file(format!("{}/x.npy", outdir), start_x.iter().copied())
        .context("Could not save x data to file")?;
    npy::to_file(format!("{}/y.npy", outdir), start_y.iter().copied())
        .context("Could not save y data to file")?;
    npy::to_file(format!("{}/dx.npy", outdir), dx.iter().copied())
        .context("Could not save dx data to file")?;
    npy::to_file(format!("{}/dy.npy", outdir), dy.iter().copied())
        .context("Could not save dy data to file")?;
    Ok(())
}
