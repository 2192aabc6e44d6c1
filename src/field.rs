// src/field.rs
//
// Rectangular 3D magnetisation field as stored in an OMF snapshot, plus
// slicing into a 2D plane.
//
// Conventions:
// - Data is stored x fastest, then y, then z (OVF order).
// - Slicing keeps the full (global-frame) vectors; callers pick in-plane /
//   out-of-plane components through `SliceAxis::components()`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ViewError};
use crate::grid::Grid2D;
use crate::vec3::normalize_or_zero;
use crate::vector_field::VectorField2D;

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// Axis normal to a slice plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceAxis {
    X,
    Y,
    Z,
}

impl SliceAxis {
    /// (first in-plane, second in-plane, out-of-plane) component indices.
    pub fn components(self) -> (usize, usize, usize) {
        match self {
            SliceAxis::Z => (0, 1, 2),
            SliceAxis::Y => (0, 2, 1),
            SliceAxis::X => (1, 2, 0),
        }
    }

    /// Names of the two in-plane key dimensions.
    pub fn plane_dims(self) -> [String; 2] {
        let (a0, a1, _) = self.components();
        [AXIS_NAMES[a0].to_string(), AXIS_NAMES[a1].to_string()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SliceAxis::X => "x",
            SliceAxis::Y => "y",
            SliceAxis::Z => "z",
        }
    }

    pub fn as_char(self) -> char {
        match self {
            SliceAxis::X => 'x',
            SliceAxis::Y => 'y',
            SliceAxis::Z => 'z',
        }
    }
}

impl FromStr for SliceAxis {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" => Ok(SliceAxis::X),
            "y" => Ok(SliceAxis::Y),
            "z" => Ok(SliceAxis::Z),
            _ => Err(ViewError::InvalidArgument(
                "Slice Axis must be one of 'x', 'y' ,'z'".to_string(),
            )),
        }
    }
}

impl fmt::Display for SliceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rectangular mesh: corner points p1 < p2 (metres) and cell counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mesh {
    pub p1: [f64; 3],
    pub p2: [f64; 3],
    pub n: [usize; 3],
}

impl Mesh {
    pub fn new(p1: [f64; 3], p2: [f64; 3], n: [usize; 3]) -> Self {
        Self { p1, p2, n }
    }

    /// Mesh with origin at 0 and the given cell size.
    pub fn from_cell(n: [usize; 3], cell: [f64; 3]) -> Self {
        let p2 = [
            n[0] as f64 * cell[0],
            n[1] as f64 * cell[1],
            n[2] as f64 * cell[2],
        ];
        Self::new([0.0; 3], p2, n)
    }

    pub fn n_cells(&self) -> usize {
        self.n[0] * self.n[1] * self.n[2]
    }

    pub fn cell(&self) -> [f64; 3] {
        [
            (self.p2[0] - self.p1[0]) / self.n[0] as f64,
            (self.p2[1] - self.p1[1]) / self.n[1] as f64,
            (self.p2[2] - self.p1[2]) / self.n[2] as f64,
        ]
    }

    /// Cell-centre coordinates along one axis.
    pub fn centers(&self, axis: usize) -> Vec<f64> {
        let d = self.cell()[axis];
        (0..self.n[axis])
            .map(|i| self.p1[axis] + (i as f64 + 0.5) * d)
            .collect()
    }

    #[inline]
    pub fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.n[1] + j) * self.n[0] + i
    }
}

/// Vector field on a rectangular 3D mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Field3D {
    pub mesh: Mesh,
    pub data: Vec<[f64; 3]>,
}

/// A 2D cut through a `Field3D`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlice {
    pub axis: SliceAxis,
    /// Coordinate along `axis` of the selected cell layer.
    pub coord: f64,
    /// Cell centres along the first in-plane axis.
    pub x: Vec<f64>,
    /// Cell centres along the second in-plane axis.
    pub y: Vec<f64>,
    /// Full vectors, i along the first in-plane axis (fastest).
    pub vectors: VectorField2D,
    /// [min0, min1, max0, max1] of the plane.
    pub bounds: [f64; 4],
}

impl FieldSlice {
    pub fn kdims(&self) -> [String; 2] {
        self.axis.plane_dims()
    }
}

impl Field3D {
    pub fn new(mesh: Mesh, data: Vec<[f64; 3]>) -> Result<Self> {
        if mesh.n.contains(&0) {
            return Err(ViewError::InvalidInput(format!(
                "mesh dimensions must be positive, got {:?}",
                mesh.n
            )));
        }
        if data.len() != mesh.n_cells() {
            return Err(ViewError::InvalidInput(format!(
                "field has {} samples, mesh {:?} needs {}",
                data.len(),
                mesh.n,
                mesh.n_cells()
            )));
        }
        Ok(Self { mesh, data })
    }

    /// Uniform field on `mesh`.
    pub fn uniform(mesh: Mesh, v: [f64; 3]) -> Self {
        Self {
            mesh,
            data: vec![v; mesh.n_cells()],
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        self.data[self.mesh.idx(i, j, k)]
    }

    /// Copy of the field with every non-zero vector rescaled to unit length.
    pub fn normalised(&self) -> Self {
        Self {
            mesh: self.mesh,
            data: self.data.iter().map(|&v| normalize_or_zero(v)).collect(),
        }
    }

    pub fn normalise(&mut self) {
        for v in &mut self.data {
            *v = normalize_or_zero(*v);
        }
    }

    /// Cut the cell layer containing `coord` along `axis`.
    ///
    /// `coord == p2[axis]` selects the last layer.
    pub fn slice(&self, axis: SliceAxis, coord: f64) -> Result<FieldSlice> {
        let (a0, a1, a2) = axis.components();
        let mesh = &self.mesh;
        let (lo, hi) = (mesh.p1[a2], mesh.p2[a2]);
        if !(coord >= lo && coord <= hi) {
            return Err(ViewError::CoordinateOutOfRange {
                axis: axis.as_char(),
                coord,
                min: lo,
                max: hi,
            });
        }

        let cell = mesh.cell();
        let layer = (((coord - lo) / cell[a2]).floor() as usize).min(mesh.n[a2] - 1);

        let (n0, n1) = (mesh.n[a0], mesh.n[a1]);
        let mut data = Vec::with_capacity(n0 * n1);
        let mut ijk = [0usize; 3];
        ijk[a2] = layer;
        for j in 0..n1 {
            ijk[a1] = j;
            for i in 0..n0 {
                ijk[a0] = i;
                data.push(self.get(ijk[0], ijk[1], ijk[2]));
            }
        }

        let grid = Grid2D::new(n0, n1, cell[a0], cell[a1]);
        Ok(FieldSlice {
            axis,
            coord: lo + (layer as f64 + 0.5) * cell[a2],
            x: mesh.centers(a0),
            y: mesh.centers(a1),
            vectors: VectorField2D::from_data(grid, data)?,
            bounds: [mesh.p1[a0], mesh.p1[a1], mesh.p2[a0], mesh.p2[a1]],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Field whose vector encodes its own (i, j, k) index.
    fn indexed_field() -> Field3D {
        let mesh = Mesh::from_cell([4, 3, 2], [1.0, 2.0, 5.0]);
        let mut data = Vec::new();
        for k in 0..2 {
            for j in 0..3 {
                for i in 0..4 {
                    data.push([i as f64, j as f64, k as f64]);
                }
            }
        }
        Field3D::new(mesh, data).unwrap()
    }

    #[test]
    fn bad_axis_message_is_verbatim() {
        let err = "w".parse::<SliceAxis>().unwrap_err();
        assert_eq!(err.to_string(), "Slice Axis must be one of 'x', 'y' ,'z'");
        assert_eq!("y".parse::<SliceAxis>().unwrap(), SliceAxis::Y);
    }

    #[test]
    fn z_slice_picks_layer_containing_coordinate() {
        let f = indexed_field();
        let s = f.slice(SliceAxis::Z, 7.0).unwrap();
        assert_eq!(s.vectors.grid.nx, 4);
        assert_eq!(s.vectors.grid.ny, 3);
        assert_eq!(s.vectors.get(3, 2), [3.0, 2.0, 1.0]);
        assert_eq!(s.coord, 7.5);
        assert_eq!(s.x, vec![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(s.bounds, [0.0, 0.0, 4.0, 6.0]);
        assert_eq!(s.kdims(), ["x".to_string(), "y".to_string()]);

        // upper face belongs to the last layer
        let top = f.slice(SliceAxis::Z, 10.0).unwrap();
        assert_eq!(top.vectors.get(0, 0)[2], 1.0);
    }

    #[test]
    fn x_slice_uses_y_and_z_as_plane_axes() {
        let f = indexed_field();
        let s = f.slice(SliceAxis::X, 2.2).unwrap();
        assert_eq!((s.vectors.grid.nx, s.vectors.grid.ny), (3, 2));
        assert_eq!(s.vectors.get(1, 1), [2.0, 1.0, 1.0]);
        assert_eq!(s.bounds, [0.0, 0.0, 6.0, 10.0]);
        assert_eq!(s.kdims(), ["y".to_string(), "z".to_string()]);
    }

    #[test]
    fn coordinate_outside_mesh_is_rejected() {
        let f = indexed_field();
        assert!(matches!(
            f.slice(SliceAxis::Y, 6.5),
            Err(ViewError::CoordinateOutOfRange { axis: 'y', .. })
        ));
        assert!(f.slice(SliceAxis::Y, f64::NAN).is_err());
    }

    #[test]
    fn normalisation_keeps_vacuum_cells_at_zero() {
        let mesh = Mesh::from_cell([3, 1, 1], [1.0; 3]);
        let mut f = Field3D::new(mesh, vec![[3.0, 0.0, 4.0], [0.0; 3], [0.0, -2.0, 0.0]]).unwrap();
        let copy = f.normalised();
        assert!((copy.data[0][0] - 0.6).abs() < 1e-15 && (copy.data[0][2] - 0.8).abs() < 1e-15);
        assert_eq!(copy.data[1..], [[0.0; 3], [0.0, -1.0, 0.0]]);
        assert_eq!(f.data[0], [3.0, 0.0, 4.0]);

        f.normalise();
        assert_eq!(f, copy);
    }
}
