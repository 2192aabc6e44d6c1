// src/initial_states.rs
//
// Synthetic magnetisation textures (uniform, skyrmion, vortex) used by the
// `seed` command and by tests that need a field with known topology.
//
// Coordinate system:
// - Centered cell centers: (0,0) at the middle of the x–y plane, in meters.
// - 3D fields repeat the same x–y profile on every z layer.

use crate::field::{Field3D, Mesh};
use crate::grid::Grid2D;
use crate::vec3::normalize;
use crate::vector_field::VectorField2D;

/// Evaluate `f(x, y)` at every centered cell center of `grid`.
pub fn fill_plane<F>(grid: Grid2D, f: F) -> VectorField2D
where
    F: Fn(f64, f64) -> [f64; 3],
{
    let mut m = VectorField2D::new(grid);
    for j in 0..grid.ny {
        for i in 0..grid.nx {
            let (x, y) = grid.cell_center_centered(i, j);
            let id = grid.idx(i, j);
            m.data[id] = f(x, y);
        }
    }
    m
}

/// Repeat a 2D profile through all z layers of `mesh`.
pub fn fill_layers<F>(mesh: Mesh, f: F) -> Field3D
where
    F: Fn(f64, f64) -> [f64; 3],
{
    let cell = mesh.cell();
    let plane = fill_plane(Grid2D::new(mesh.n[0], mesh.n[1], cell[0], cell[1]), f);
    let mut data = Vec::with_capacity(mesh.n_cells());
    for _ in 0..mesh.n[2] {
        data.extend_from_slice(&plane.data);
    }
    Field3D { mesh, data }
}

/// Skyrmion profile at offset (dx, dy) from its centre.
///
/// Profile:
///   θ(r) = 2 * atan( exp( (R0 - r)/Δ ) )
///   m_z  = -p * cosθ
///   m_xy = sinθ * (cosφ, sinφ) with φ = atan2(y,x) + helicity
///
/// - `core_polarity` p = +1 means core points +z, background -z.
/// - `helicity` 0 = Néel (radial), π/2 = Bloch (tangential).
pub fn skyrmion_at(dx: f64, dy: f64, r0: f64, delta: f64, helicity: f64, core_polarity: f64) -> [f64; 3] {
    let p = core_polarity.signum();
    let inv_delta = 1.0 / delta.max(1e-30);
    let r = (dx * dx + dy * dy).sqrt();

    let theta = 2.0 * (((r0 - r) * inv_delta).exp()).atan();
    let phi = dy.atan2(dx) + helicity;
    normalize([
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        -p * theta.cos(),
    ])
}

/// Vortex at offset (dx, dy): in-plane curl with an out-of-plane core.
///
/// - `polarity`: +1 core up, -1 core down
/// - `chirality`: +1 CCW, -1 CW
pub fn vortex_at(dx: f64, dy: f64, polarity: f64, chirality: f64, core_radius: f64) -> [f64; 3] {
    let pol = polarity.signum();
    let chi = chirality.signum();
    let r2 = dx * dx + dy * dy;
    if r2 < 1e-30 {
        return [0.0, 0.0, pol];
    }

    // Azimuthal unit vector e_phi = (-y, x)/r
    let r = r2.sqrt();
    let ex = -dy / r;
    let ey = dx / r;

    let mut mz = 0.0;
    if r <= core_radius {
        let t = 1.0 - (r / core_radius).clamp(0.0, 1.0);
        mz = pol * t;
    }
    let in_plane_scale = (1.0 - mz * mz).max(0.0).sqrt();
    normalize([chi * ex * in_plane_scale, chi * ey * in_plane_scale, mz])
}

pub fn uniform(mesh: Mesh, dir: [f64; 3]) -> Field3D {
    Field3D::uniform(mesh, normalize(dir))
}

/// Néel skyrmion centred in the film.
pub fn skyrmion(mesh: Mesh, r0: f64, delta: f64, core_polarity: f64) -> Field3D {
    fill_layers(mesh, |x, y| skyrmion_at(x, y, r0, delta, 0.0, core_polarity))
}

/// Counter-clockwise vortex centred in the film.
pub fn vortex(mesh: Mesh, polarity: f64, core_radius: f64) -> Field3D {
    fill_layers(mesh, |x, y| vortex_at(x, y, polarity, 1.0, core_radius))
}
