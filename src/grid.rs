// src/grid.rs

/// Simple 2D cell grid (one slice plane of a mesh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid2D {
    pub nx: usize,
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
}

impl Grid2D {
    /// Create a new 2D grid with nx × ny cells and spacings dx, dy.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> Self {
        Self { nx, ny, dx, dy }
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Convert (i, j) indices to a flat index into a 1D array (i fastest).
    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny);
        j * self.nx + i
    }

    /// Cell-center coordinates, centered at the grid center.
    ///
    /// For i∈[0,nx), x = (i+0.5 - nx/2)*dx.
    #[inline]
    pub fn cell_center_centered(&self, i: usize, j: usize) -> (f64, f64) {
        let cx = (self.nx as f64) * 0.5;
        let cy = (self.ny as f64) * 0.5;
        let x = (i as f64 + 0.5 - cx) * self.dx;
        let y = (j as f64 + 0.5 - cy) * self.dy;
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_indexing_is_consistent() {
        let g = Grid2D::new(4, 3, 1.0, 1.0);
        assert_eq!(g.idx(0, 0), 0);
        assert_eq!(g.idx(1, 0), 1);
        assert_eq!(g.idx(0, 1), 4);
        assert_eq!(g.idx(3, 2), 11); // (j=2)*4 + i=3 = 11
        assert_eq!(g.n_cells(), 12);
    }

    #[test]
    fn centered_coordinates_are_symmetric() {
        let g = Grid2D::new(4, 2, 2.0, 1.0);
        let (x0, y0) = g.cell_center_centered(0, 0);
        let (x3, y1) = g.cell_center_centered(3, 1);
        assert_eq!((x0, y0), (-3.0, -0.5));
        assert_eq!((x3, y1), (3.0, 0.5));
    }
}
