// src/topology.rs
//
// Discrete topological charge density of a sliced magnetisation field.
//
// For every cell with vector m and axis neighbours r (i+1), u (j+1),
// l (i-1), d (j-1):
//
//   q = m·(r×u) + m·(l×d) − m·(l×u) − m·(r×d)  =  m·((r−l)×(u−d))
//
// i.e. 4 m·(∂x m × ∂y m) with central differences on a unit-spaced lattice.
// Neighbours outside the grid come from a padded copy whose border is
// filled according to a `BoundaryPolicy` (zero vectors by default).

use std::f64::consts::PI;
use std::str::FromStr;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};
use crate::vec3::triple;
use crate::vector_field::VectorField2D;

/// How the one-cell border around the grid is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Zero vectors outside the grid (open boundary).
    #[default]
    #[serde(alias = "zeropad")]
    Zero,
    /// Border repeats the adjacent edge cell (zero normal gradient).
    Reflect,
    /// Border wraps to the opposite edge.
    Periodic,
}

impl FromStr for BoundaryPolicy {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" | "zeropad" => Ok(Self::Zero),
            "reflect" => Ok(Self::Reflect),
            "periodic" => Ok(Self::Periodic),
            other => Err(ViewError::InvalidArgument(format!(
                "boundary must be one of 'zero', 'reflect', 'periodic', got '{}'",
                other
            ))),
        }
    }
}

fn check_shape(m: &VectorField2D) -> Result<(usize, usize)> {
    let (w, h) = (m.grid.nx, m.grid.ny);
    if w == 0 || h == 0 {
        return Err(ViewError::InvalidInput(format!(
            "grid dimensions must be positive, got {}x{}",
            w, h
        )));
    }
    if m.data.len() != w * h {
        return Err(ViewError::InvalidInput(format!(
            "grid is not rectangular: {} samples for {}x{}",
            m.data.len(),
            w,
            h
        )));
    }
    Ok((w, h))
}

/// (W+2)×(H+2) copy of `m` with the border filled per `policy`.
fn padded(m: &VectorField2D, policy: BoundaryPolicy) -> Vec<[f64; 3]> {
    let (w, h) = (m.grid.nx, m.grid.ny);
    let pw = w + 2;
    let mut big = vec![[0.0; 3]; pw * (h + 2)];

    for pj in 0..h + 2 {
        for pi in 0..pw {
            let interior = (1..=w).contains(&pi) && (1..=h).contains(&pj);
            let src = if interior {
                Some((pi - 1, pj - 1))
            } else {
                match policy {
                    BoundaryPolicy::Zero => None,
                    BoundaryPolicy::Reflect => {
                        Some((pi.clamp(1, w) - 1, pj.clamp(1, h) - 1))
                    }
                    BoundaryPolicy::Periodic => Some(((pi + w - 1) % w, (pj + h - 1) % h)),
                }
            };
            if let Some((i, j)) = src {
                big[pj * pw + pi] = m.get(i, j);
            }
        }
    }
    big
}

/// Topological density with zero-vector neighbours outside the grid.
pub fn compute_density(m: &VectorField2D) -> Result<Vec<f64>> {
    compute_density_with(m, BoundaryPolicy::Zero)
}

/// Topological density per cell, same layout as `m.data` (i fastest).
pub fn compute_density_with(m: &VectorField2D, policy: BoundaryPolicy) -> Result<Vec<f64>> {
    let (w, h) = check_shape(m)?;
    trace!("topological density on {}x{} grid ({:?} boundary)", w, h, policy);

    let pw = w + 2;
    let big = padded(m, policy);
    let at = |i: usize, j: usize| big[j * pw + i];

    let mut q = vec![0.0; pw * (h + 2)];
    for j in 1..=h {
        for i in 1..=w {
            let c = at(i, j);
            let right = at(i + 1, j);
            let up = at(i, j + 1);
            let left = at(i - 1, j);
            let down = at(i, j - 1);
            q[j * pw + i] = triple(c, right, up) + triple(c, left, down)
                - triple(c, left, up)
                - triple(c, right, down);
        }
    }

    let mut out = Vec::with_capacity(w * h);
    for j in 1..=h {
        out.extend_from_slice(&q[j * pw + 1..j * pw + 1 + w]);
    }
    Ok(out)
}

/// Integrated skyrmion number Q = Σq / (16π).
pub fn topological_charge(density: &[f64]) -> f64 {
    density.iter().sum::<f64>() / (16.0 * PI)
}
