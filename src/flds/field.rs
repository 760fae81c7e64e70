use crate::grid::{GridDim, Idx3};
use crate::{Float, Vec3};

/// A dense vector field, one `Vec3` per cell of a (r, phi, z) grid.
#[derive(Clone, Debug)]
pub struct VectorField {
    pub name: String,
    pub data: Vec<Vec3>,
    pub dim: GridDim,
}

impl VectorField {
    pub fn new(name: &str, dim: GridDim) -> VectorField {
        VectorField {
            name: name.to_string(),
            data: vec![Vec3::zeros(); dim.len()],
            dim,
        }
    }

    #[inline(always)]
    pub fn get(&self, pos: Idx3) -> Vec3 {
        self.data[self.dim.get_index(pos)]
    }

    #[inline(always)]
    pub fn set(&mut self, pos: Idx3, v: Vec3) {
        let i = self.dim.get_index(pos);
        self.data[i] = v;
    }

    pub fn fill(&mut self, v: Vec3) {
        for cell in self.data.iter_mut() {
            *cell = v;
        }
    }

    /// One cartesian component of every cell, in flat order.
    pub fn component(&self, axis: usize) -> Vec<Float> {
        self.data
            .iter()
            .map(|v| match axis {
                0 => v.x,
                1 => v.y,
                _ => v.z,
            })
            .collect()
    }
}
