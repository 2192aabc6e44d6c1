// src/vec3.rs

/// 3D vector dot product.
#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 3D vector cross product: a × b.
#[inline]
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Scalar triple product m · (a × b).
#[inline]
pub fn triple(m: [f64; 3], a: [f64; 3], b: [f64; 3]) -> f64 {
    dot(m, cross(a, b))
}

#[inline]
pub fn norm(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

/// Normalise to unit length. Zero vectors (vacuum cells) stay zero.
#[inline]
pub fn normalize_or_zero(v: [f64; 3]) -> [f64; 3] {
    let n2 = dot(v, v);
    if n2 == 0.0 || !n2.is_finite() {
        return [0.0; 3];
    }
    let inv = 1.0 / n2.sqrt();
    [v[0] * inv, v[1] * inv, v[2] * inv]
}

/// Normalise a 3D vector to unit length. If zero, return (0, 0, 1).
#[inline]
pub fn normalize(v: [f64; 3]) -> [f64; 3] {
    let n = normalize_or_zero(v);
    if n == [0.0; 3] {
        [0.0, 0.0, 1.0]
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_of_basis_vectors_is_right_handed() {
        assert_eq!(cross([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(triple([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), 1.0);
    }

    #[test]
    fn zero_vector_stays_zero_unless_defaulted() {
        assert_eq!(normalize_or_zero([0.0; 3]), [0.0; 3]);
        assert_eq!(normalize([0.0; 3]), [0.0, 0.0, 1.0]);
        let v = normalize_or_zero([3.0, 0.0, 4.0]);
        assert!((norm(v) - 1.0).abs() < 1e-15);
    }
}
