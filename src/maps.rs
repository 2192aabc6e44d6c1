// src/maps.rs
//
// Keyed collections of plot objects.
//
// - `HoloMap`: fully materialised, insertion-ordered (key tuple -> element).
// - `DynamicMap`: declared key dimensions plus a pure callback evaluated on
//   every `select`; nothing is memoised, caching belongs to the caller.
//
// The builders at the bottom turn an ordered list of OMF snapshots and a
// set of slice coordinates into either kind of map.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Result, ViewError};
use crate::field::{FieldSlice, SliceAxis};
use crate::ovf::read_ovf;
use crate::snapshot::file_index;
use crate::topology::BoundaryPolicy;
use crate::views::{
    field_view, slice_to_inplane_angle, slice_to_inplane_vectors, slice_to_outofplane,
    slice_to_topological_density, Dimension, FieldView, FieldViewKind, ImageView,
    VectorFieldView,
};

/// One component of a map key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl KeyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KeyValue::Int(i) => Some(*i as f64),
            KeyValue::Float(f) => Some(*f),
            KeyValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            KeyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Equality with Int/Float treated as the same number.
    pub fn matches(&self, other: &KeyValue) -> bool {
        match (self, other) {
            (KeyValue::Text(a), KeyValue::Text(b)) => a == b,
            (KeyValue::Text(_), _) | (_, KeyValue::Text(_)) => false,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::Float(x) => write!(f, "{}", x),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<f64> for KeyValue {
    fn from(v: f64) -> Self {
        KeyValue::Float(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Text(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Text(v)
    }
}

fn format_key(key: &[KeyValue]) -> String {
    let parts: Vec<String> = key.iter().map(|k| k.to_string()).collect();
    format!("({})", parts.join(", "))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoloMapEntry<E> {
    pub key: Vec<KeyValue>,
    pub element: E,
}

/// Materialised collection of plot objects indexed by key tuples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoloMap<E> {
    pub kdims: Vec<Dimension>,
    entries: Vec<HoloMapEntry<E>>,
}

impl<E> HoloMap<E> {
    pub fn new(kdims: Vec<Dimension>) -> Self {
        Self {
            kdims,
            entries: Vec::new(),
        }
    }

    /// Insert or replace the element at `key`.
    pub fn insert(&mut self, key: Vec<KeyValue>, element: E) -> Result<()> {
        if key.len() != self.kdims.len() {
            return Err(ViewError::InvalidArgument(format!(
                "key {} has {} values, map has {} key dimensions",
                format_key(&key),
                key.len(),
                self.kdims.len()
            )));
        }
        if let Some(slot) = self.entries.iter_mut().find(|e| keys_match(&e.key, &key)) {
            warn!("replacing holomap entry at {}", format_key(&key));
            slot.element = element;
        } else {
            self.entries.push(HoloMapEntry { key, element });
        }
        Ok(())
    }

    pub fn get(&self, key: &[KeyValue]) -> Option<&E> {
        self.entries
            .iter()
            .find(|e| keys_match(&e.key, key))
            .map(|e| &e.element)
    }

    pub fn keys(&self) -> impl Iterator<Item = &[KeyValue]> {
        self.entries.iter().map(|e| e.key.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[KeyValue], &E)> {
        self.entries.iter().map(|e| (e.key.as_slice(), &e.element))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn keys_match(a: &[KeyValue], b: &[KeyValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
}

pub type Callback<E> = Box<dyn Fn(&[KeyValue]) -> Result<E> + Send + Sync>;

/// Plot objects computed on demand from a key tuple.
pub struct DynamicMap<E> {
    pub kdims: Vec<Dimension>,
    callback: Callback<E>,
}

impl<E> fmt::Debug for DynamicMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicMap")
            .field("kdims", &self.kdims)
            .finish_non_exhaustive()
    }
}

impl<E> DynamicMap<E> {
    pub fn new<F>(kdims: Vec<Dimension>, callback: F) -> Self
    where
        F: Fn(&[KeyValue]) -> Result<E> + Send + Sync + 'static,
    {
        Self {
            kdims,
            callback: Box::new(callback),
        }
    }

    /// Evaluate the callback for `key`.
    ///
    /// The key must have one value per dimension, and each value must be one
    /// of the dimension's declared values when it declares any.
    pub fn select(&self, key: &[KeyValue]) -> Result<E> {
        if key.len() != self.kdims.len() {
            return Err(ViewError::InvalidArgument(format!(
                "key {} has {} values, map has {} key dimensions",
                format_key(key),
                key.len(),
                self.kdims.len()
            )));
        }
        for (dim, value) in self.kdims.iter().zip(key) {
            if !dim.values.is_empty() && !dim.values.iter().any(|v| v.matches(value)) {
                return Err(ViewError::InvalidArgument(format!(
                    "'{}' is not a declared value of dimension '{}'",
                    value, dim.name
                )));
            }
        }
        (self.callback)(key)
    }

    /// Cartesian product of every dimension's declared values, first
    /// dimension slowest.
    pub fn keys(&self) -> Result<Vec<Vec<KeyValue>>> {
        let mut keys: Vec<Vec<KeyValue>> = vec![Vec::new()];
        for dim in &self.kdims {
            if dim.values.is_empty() {
                return Err(ViewError::InvalidArgument(format!(
                    "dimension '{}' declares no values to enumerate",
                    dim.name
                )));
            }
            keys = keys
                .into_iter()
                .flat_map(|prefix| {
                    dim.values.iter().map(move |v| {
                        let mut k = prefix.clone();
                        k.push(v.clone());
                        k
                    })
                })
                .collect();
        }
        Ok(keys)
    }

    /// Evaluate every declared key into a `HoloMap`.
    pub fn to_holomap(&self) -> Result<HoloMap<E>> {
        let mut map = HoloMap::new(self.kdims.clone());
        for key in self.keys()? {
            let element = self.select(&key)?;
            map.insert(key, element)?;
        }
        Ok(map)
    }
}

// ---------------------------
// Builders over OMF snapshots
// ---------------------------

fn build_holomap<E, F>(files: &[PathBuf], coords: &[f64], axis: SliceAxis, view: F) -> Result<HoloMap<E>>
where
    E: Send,
    F: Fn(&FieldSlice) -> Result<E> + Sync,
{
    let kdims = vec![
        Dimension::new("File"),
        Dimension::new(format!("{} coordinate", axis)),
    ];

    let per_file: Vec<Vec<(Vec<KeyValue>, E)>> = files
        .par_iter()
        .map(|path| {
            let index = file_index(path)?;
            let mut field = read_ovf(path)?;
            field.normalise();
            coords
                .iter()
                .map(|&c| {
                    let element = view(&field.slice(axis, c)?)?;
                    Ok((vec![KeyValue::Int(index), KeyValue::Float(c)], element))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut map = HoloMap::new(kdims);
    for (key, element) in per_file.into_iter().flatten() {
        map.insert(key, element)?;
    }
    info!(
        "built holomap with {} entries from {} files along {}",
        map.len(),
        files.len(),
        axis
    );
    Ok(map)
}

fn build_dynamic_map<E, F>(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
    view: F,
) -> Result<DynamicMap<E>>
where
    F: Fn(&FieldSlice) -> Result<E> + Send + Sync + 'static,
{
    let labels = files
        .iter()
        .map(|p| file_index(p).map(|i| i.to_string()))
        .collect::<Result<Vec<_>>>()?;
    let file_values = files
        .iter()
        .map(|p| KeyValue::Text(p.to_string_lossy().into_owned()))
        .collect();

    let kdims = vec![
        Dimension::new("File")
            .with_values(file_values)
            .with_value_labels(labels),
        Dimension::new("slice_axis").with_values(vec![KeyValue::from(axis.as_str())]),
        Dimension::new("slice_coord")
            .with_values(coords.iter().map(|&c| KeyValue::Float(c)).collect()),
    ];

    Ok(DynamicMap::new(kdims, move |key: &[KeyValue]| {
        let bad = |what: &str| ViewError::InvalidArgument(format!("{} in key {}", what, format_key(key)));
        let path = key[0].as_text().ok_or_else(|| bad("file must be a path"))?;
        let axis: SliceAxis = key[1].as_text().ok_or_else(|| bad("slice_axis must be text"))?.parse()?;
        let coord = key[2].as_f64().ok_or_else(|| bad("slice_coord must be a number"))?;
        debug!("dynamic map: {} {}={:e}", path, axis, coord);
        let field = read_ovf(Path::new(path))?.normalised();
        view(&field.slice(axis, coord)?)
    }))
}

/// In-plane arrow fields keyed by (file index, slice coordinate).
pub fn create_inplane_holomap(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
) -> Result<HoloMap<VectorFieldView>> {
    build_holomap(files, coords, axis, |s| Ok(slice_to_inplane_vectors(s)))
}

/// In-plane angle images keyed by (file index, slice coordinate).
pub fn create_inplane_angle_holomap(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
) -> Result<HoloMap<ImageView>> {
    build_holomap(files, coords, axis, |s| Ok(slice_to_inplane_angle(s)))
}

/// Out-of-plane component images keyed by (file index, slice coordinate).
pub fn create_outofplane_holomap(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
) -> Result<HoloMap<ImageView>> {
    build_holomap(files, coords, axis, |s| Ok(slice_to_outofplane(s)))
}

pub fn create_topological_density_holomap(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
    policy: BoundaryPolicy,
) -> Result<HoloMap<ImageView>> {
    build_holomap(files, coords, axis, move |s| slice_to_topological_density(s, policy))
}

/// Any field view kind, for callers choosing the kind at runtime.
pub fn create_field_holomap(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
    kind: FieldViewKind,
    policy: BoundaryPolicy,
) -> Result<HoloMap<FieldView>> {
    build_holomap(files, coords, axis, move |s| field_view(s, kind, policy))
}

pub fn create_inplane_dynamic_map(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
) -> Result<DynamicMap<VectorFieldView>> {
    build_dynamic_map(files, coords, axis, |s| Ok(slice_to_inplane_vectors(s)))
}

pub fn create_inplane_angle_dynamic_map(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
) -> Result<DynamicMap<ImageView>> {
    build_dynamic_map(files, coords, axis, |s| Ok(slice_to_inplane_angle(s)))
}

pub fn create_outofplane_dynamic_map(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
) -> Result<DynamicMap<ImageView>> {
    build_dynamic_map(files, coords, axis, |s| Ok(slice_to_outofplane(s)))
}

pub fn create_topological_density_dynamic_map(
    files: &[PathBuf],
    coords: &[f64],
    axis: SliceAxis,
    policy: BoundaryPolicy,
) -> Result<DynamicMap<ImageView>> {
    build_dynamic_map(files, coords, axis, move |s| slice_to_topological_density(s, policy))
}
