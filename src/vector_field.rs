// src/vector_field.rs

use crate::error::{Result, ViewError};
use crate::grid::Grid2D;
use crate::vec3::normalize_or_zero;

/// Magnetisation samples on a 2D grid (a slice of a 3D field).
/// Each cell stores (mx, my, mz) in the global frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField2D {
    pub grid: Grid2D,
    pub data: Vec<[f64; 3]>,
}

impl VectorField2D {
    /// Create a new field on the given grid, initialised along +z.
    pub fn new(grid: Grid2D) -> Self {
        let n = grid.n_cells();
        Self {
            grid,
            data: vec![[0.0, 0.0, 1.0]; n],
        }
    }

    /// Wrap existing samples, checking that the grid is non-empty and the
    /// sample count matches nx*ny.
    pub fn from_data(grid: Grid2D, data: Vec<[f64; 3]>) -> Result<Self> {
        if grid.nx == 0 || grid.ny == 0 {
            return Err(ViewError::InvalidInput(format!(
                "grid dimensions must be positive, got {}x{}",
                grid.nx, grid.ny
            )));
        }
        if data.len() != grid.n_cells() {
            return Err(ViewError::InvalidInput(format!(
                "grid is not rectangular: got {} samples, expected {} ({}x{})",
                data.len(),
                grid.n_cells(),
                grid.nx,
                grid.ny
            )));
        }
        Ok(Self { grid, data })
    }

    /// Get the flat index in `data` for grid indices (i, j).
    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        self.grid.idx(i, j)
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> [f64; 3] {
        self.data[self.idx(i, j)]
    }

    /// Rescale every non-zero cell to unit length in place.
    pub fn normalise(&mut self) {
        for v in &mut self.data {
            *v = normalize_or_zero(*v);
        }
    }

    /// Extract one component per cell (0 = x, 1 = y, 2 = z), same layout as `data`.
    pub fn component(&self, c: usize) -> Vec<f64> {
        self.data.iter().map(|v| v[c]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_data_rejects_ragged_and_empty_grids() {
        let g = Grid2D::new(2, 2, 1.0, 1.0);
        assert!(matches!(
            VectorField2D::from_data(g, vec![[0.0; 3]; 3]),
            Err(ViewError::InvalidInput(_))
        ));
        let empty = Grid2D::new(0, 4, 1.0, 1.0);
        assert!(matches!(
            VectorField2D::from_data(empty, vec![]),
            Err(ViewError::InvalidInput(_))
        ));
        assert!(VectorField2D::from_data(g, vec![[0.0; 3]; 4]).is_ok());
    }

    #[test]
    fn normalise_keeps_vacuum_cells_zero() {
        let g = Grid2D::new(2, 1, 1.0, 1.0);
        let mut m = VectorField2D::from_data(g, vec![[0.0, 2.0, 0.0], [0.0; 3]]).unwrap();
        m.normalise();
        assert_eq!(m.get(0, 0), [0.0, 1.0, 0.0]);
        assert_eq!(m.get(1, 0), [0.0; 3]);
        assert_eq!(m.component(1), vec![1.0, 0.0]);
    }
}
