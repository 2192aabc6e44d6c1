// src/views.rs
//
// Plot objects handed to a visualisation front end, and the conversions
// from a sliced magnetisation field into them.
//
// Every object is plain data (serde-serialisable) tagged with its key
// dimensions (kdims), value dimensions (vdims) and a label.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::{Field3D, FieldSlice, SliceAxis};
use crate::maps::KeyValue;
use crate::topology::{compute_density_with, BoundaryPolicy};

/// Named axis of a plot object, optionally with a value range and the
/// discrete values a viewer may select.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<KeyValue>,
    /// Display strings for `values`, same order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_labels: Option<Vec<String>>,
}

impl Dimension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: None,
            values: Vec::new(),
            value_labels: None,
        }
    }

    pub fn with_range(mut self, lo: f64, hi: f64) -> Self {
        self.range = Some((lo, hi));
        self
    }

    pub fn with_values(mut self, values: Vec<KeyValue>) -> Self {
        self.values = values;
        self
    }

    pub fn with_value_labels(mut self, labels: Vec<String>) -> Self {
        self.value_labels = Some(labels);
        self
    }
}

/// Arrow field: one arrow per cell with direction `angle` and length
/// `magnitude`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorFieldView {
    pub kdims: [String; 2],
    pub vdims: Vec<String>,
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub angle: Vec<f64>,
    pub magnitude: Vec<f64>,
}

/// Raster image over rectangular `bounds` = [left, bottom, right, top].
/// `data[j * nx + i]`, i along the first key dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub kdims: [String; 2],
    pub vdim: Dimension,
    pub label: String,
    pub bounds: [f64; 4],
    pub nx: usize,
    pub ny: usize,
    pub data: Vec<f64>,
}

impl ImageView {
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[j * self.nx + i]
    }

    /// (min, max) over finite values, falling back to the vdim range.
    pub fn value_range(&self) -> (f64, f64) {
        if let Some(r) = self.vdim.range {
            return r;
        }
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in self.data.iter().filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if !lo.is_finite() || !hi.is_finite() {
            (-1.0, 1.0)
        } else {
            (lo, hi)
        }
    }
}

/// y against x.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub kdim: String,
    pub vdim: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Named columns of numeric rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// The field maps that can be built from a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldViewKind {
    InPlane,
    Angle,
    OutOfPlane,
    Density,
}

impl FieldViewKind {
    pub const ALL: [FieldViewKind; 4] = [
        FieldViewKind::InPlane,
        FieldViewKind::Angle,
        FieldViewKind::OutOfPlane,
        FieldViewKind::Density,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldViewKind::InPlane => "inplane",
            FieldViewKind::Angle => "angle",
            FieldViewKind::OutOfPlane => "outofplane",
            FieldViewKind::Density => "density",
        }
    }
}

/// Either kind of plot object produced from a field slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FieldView {
    VectorField(VectorFieldView),
    Image(ImageView),
}

/// Build the requested view of a slice.
pub fn field_view(slice: &FieldSlice, kind: FieldViewKind, policy: BoundaryPolicy) -> Result<FieldView> {
    Ok(match kind {
        FieldViewKind::InPlane => FieldView::VectorField(slice_to_inplane_vectors(slice)),
        FieldViewKind::Angle => FieldView::Image(slice_to_inplane_angle(slice)),
        FieldViewKind::OutOfPlane => FieldView::Image(slice_to_outofplane(slice)),
        FieldViewKind::Density => FieldView::Image(slice_to_topological_density(slice, policy)?),
    })
}

/// Normalise the slice vectors if the caller handed in a raw field.
fn normalised(slice: &FieldSlice) -> FieldSlice {
    let mut s = slice.clone();
    s.vectors.normalise();
    s
}

pub fn slice_to_inplane_vectors(slice: &FieldSlice) -> VectorFieldView {
    let s = normalised(slice);
    let (a0, a1, _) = s.axis.components();
    let g = s.vectors.grid;

    let mut x = Vec::with_capacity(g.n_cells());
    let mut y = Vec::with_capacity(g.n_cells());
    let mut angle = Vec::with_capacity(g.n_cells());
    let mut magnitude = Vec::with_capacity(g.n_cells());
    for j in 0..g.ny {
        for i in 0..g.nx {
            let v = s.vectors.get(i, j);
            x.push(s.x[i]);
            y.push(s.y[j]);
            angle.push(v[a1].atan2(v[a0]));
            // squared in-plane length
            magnitude.push(v[a0] * v[a0] + v[a1] * v[a1]);
        }
    }

    VectorFieldView {
        kdims: s.kdims(),
        vdims: vec!["xyfield".to_string()],
        label: "In-plane Magnetisation".to_string(),
        x,
        y,
        angle,
        magnitude,
    }
}

pub fn slice_to_inplane_angle(slice: &FieldSlice) -> ImageView {
    let s = normalised(slice);
    let (a0, a1, _) = s.axis.components();
    let data = s
        .vectors
        .data
        .iter()
        .map(|v| PI + v[a1].atan2(v[a0]))
        .collect();
    image(
        &s,
        data,
        Dimension::new("xyfield").with_range(0.0, 2.0 * PI),
        "In-plane Magnetisation angle",
    )
}

pub fn slice_to_outofplane(slice: &FieldSlice) -> ImageView {
    let s = normalised(slice);
    let (_, _, a2) = s.axis.components();
    let data = s.vectors.component(a2);
    image(
        &s,
        data,
        Dimension::new(format!("M{}", s.axis)).with_range(-1.0, 1.0),
        "Out of plane Magnetisation",
    )
}

pub fn slice_to_topological_density(slice: &FieldSlice, policy: BoundaryPolicy) -> Result<ImageView> {
    let s = normalised(slice);
    let data = compute_density_with(&s.vectors, policy)?;
    Ok(image(
        &s,
        data,
        Dimension::new(format!("Q_{}", s.axis)),
        "Topological Density",
    ))
}

fn image(s: &FieldSlice, data: Vec<f64>, vdim: Dimension, label: &str) -> ImageView {
    ImageView {
        kdims: s.kdims(),
        vdim,
        label: label.to_string(),
        bounds: s.bounds,
        nx: s.vectors.grid.nx,
        ny: s.vectors.grid.ny,
        data,
    }
}

/// In-plane arrow field of `field` cut at `coord` along `axis`.
pub fn field_to_inplane_vectors(field: &Field3D, axis: SliceAxis, coord: f64) -> Result<VectorFieldView> {
    Ok(slice_to_inplane_vectors(&field.slice(axis, coord)?))
}

/// In-plane angle image, values in [0, 2π].
pub fn field_to_inplane_angle(field: &Field3D, axis: SliceAxis, coord: f64) -> Result<ImageView> {
    Ok(slice_to_inplane_angle(&field.slice(axis, coord)?))
}

/// Out-of-plane component image, values in [-1, 1].
pub fn field_to_outofplane(field: &Field3D, axis: SliceAxis, coord: f64) -> Result<ImageView> {
    Ok(slice_to_outofplane(&field.slice(axis, coord)?))
}

/// Topological charge density image (zero-padded boundary).
pub fn field_to_topological_density(field: &Field3D, axis: SliceAxis, coord: f64) -> Result<ImageView> {
    slice_to_topological_density(&field.slice(axis, coord)?, BoundaryPolicy::Zero)
}
