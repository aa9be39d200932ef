//! Small dense kernels shared by the five multifrontal drivers: panel Cholesky, triangular
//! inversion, and the handful of matrix products the walks need. All operate on `f64`
//! column-major panels (`faer::MatRef`/`MatMut`) and read/write only the triangle the caller
//! tells them to — see each function's doc comment.
//!
//! These are intentionally plain, loop-based kernels rather than calls into `faer`'s own
//! factorization routines: the panels here are small (bounded by supernode width) and the
//! walk in `crate::drivers` needs to interleave them with scatter/gather against the shared
//! frontal buffer, which is easiest to reason about with direct element access.

use faer::{Mat, MatMut, MatRef};
use problemo::Problem;

use crate::error::ChordalError;

/// Left-looking Cholesky of an `n x nk` panel (`nk <= n`), in place: factors the leading
/// `nk x nk` diagonal block as `L11` and solves the trailing `(n - nk) x nk` extension as
/// `L21 = A21 * L11^{-T}`. Reads and writes only `f[.., 0..nk]`.
pub fn cholesky_panel(mut f: MatMut<'_, f64>, nk: usize, n: usize) -> Result<(), Problem> {
    for j in 0..nk {
        let mut sum = 0.0;
        for p in 0..j {
            let v = f.read(j, p);
            sum += v * v;
        }
        let pivot = f.read(j, j) - sum;
        if pivot <= 0.0 {
            return Err(ChordalError::NotPositiveDefinite.into());
        }
        let ljj = pivot.sqrt();
        f.write(j, j, ljj);

        for i in (j + 1)..n {
            let mut s = 0.0;
            for p in 0..j {
                s += f.read(i, p) * f.read(j, p);
            }
            let val = (f.read(i, j) - s) / ljj;
            f.write(i, j, val);
        }
    }
    Ok(())
}

/// Subtracts `L21 * L21^T` (lower triangle only) from `f`'s trailing `(n - nk) x (n - nk)`
/// block in place, where `L21 = f[nk..n, 0..nk]`. Leaves `f[.., 0..nk]` untouched.
pub fn apply_schur_complement(mut f: MatMut<'_, f64>, nk: usize, n: usize) {
    for j in nk..n {
        for i in j..n {
            let mut s = 0.0;
            for p in 0..nk {
                s += f.read(i, p) * f.read(j, p);
            }
            let v = f.read(i, j) - s;
            f.write(i, j, v);
        }
    }
}

/// Adds `L21 * L21^T` (lower triangle only) into `f`'s trailing `(n - nk) x (n - nk)` block
/// in place. The product inverse of [`apply_schur_complement`], used by `llt`.
pub fn add_outer_product(mut f: MatMut<'_, f64>, nk: usize, n: usize) {
    for j in nk..n {
        for i in j..n {
            let mut s = 0.0;
            for p in 0..nk {
                s += f.read(i, p) * f.read(j, p);
            }
            let v = f.read(i, j) + s;
            f.write(i, j, v);
        }
    }
}

/// Explicit dense inverse of a lower-triangular `n x n` matrix, computed column-by-column by
/// forward substitution against the identity. Fails with `Singular` if a diagonal entry is
/// (numerically) zero.
pub fn invert_lower_triangular(l: MatRef<'_, f64>, n: usize) -> Result<Mat<f64>, Problem> {
    let mut inv = Mat::<f64>::zeros(n, n);
    for col in 0..n {
        let ljj = l.read(col, col);
        if ljj == 0.0 {
            return Err(ChordalError::Singular.into());
        }
        inv.write(col, col, 1.0 / ljj);
        for i in (col + 1)..n {
            let mut s = 0.0;
            for p in col..i {
                s += l.read(i, p) * inv.read(p, col);
            }
            inv.write(i, col, -s / l.read(i, i));
        }
    }
    Ok(inv)
}

/// `a * b`, `a` is `m x k`, `b` is `k x n`.
pub fn matmul(a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> Mat<f64> {
    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    Mat::from_fn(m, n, |i, j| {
        let mut s = 0.0;
        for p in 0..k {
            s += a.read(i, p) * b.read(p, j);
        }
        s
    })
}

/// `a^T * b`, `a` is `k x m`, `b` is `k x n`.
pub fn matmul_at_b(a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> Mat<f64> {
    let (k, m, n) = (a.nrows(), a.ncols(), b.ncols());
    Mat::from_fn(m, n, |i, j| {
        let mut s = 0.0;
        for p in 0..k {
            s += a.read(p, i) * b.read(p, j);
        }
        s
    })
}

/// `a * b^T`, `a` is `m x k`, `b` is `n x k`.
pub fn matmul_a_bt(a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> Mat<f64> {
    let (m, k, n) = (a.nrows(), a.ncols(), b.nrows());
    Mat::from_fn(m, n, |i, j| {
        let mut s = 0.0;
        for p in 0..k {
            s += a.read(i, p) * b.read(j, p);
        }
        s
    })
}

/// Adds `panel * panel^T` (lower triangle only) into `f`, over the full `n x n` range rather
/// than just the trailing `(n - nk) x (n - nk)` block — the inverse direction of
/// [`apply_schur_complement`]/[`add_outer_product`], used by `llt` to reconstitute `X` from a
/// factor panel that has already had its columns eliminated (so the pivot block needs the
/// outer product too, not just the extension).
pub fn add_outer_product_full(f: MatMut<'_, f64>, panel: MatRef<'_, f64>, n: usize, nk: usize) {
    let mut f = f;
    for j in 0..n {
        for i in j..n {
            let mut s = 0.0;
            for p in 0..nk {
                s += panel.read(i, p) * panel.read(j, p);
            }
            let v = f.read(i, j) + s;
            f.write(i, j, v);
        }
    }
}

/// Mirrors the stored lower triangle of an `n x n` frontal block into a full dense symmetric
/// matrix. Used where a driver needs both triangles of a block that is only ever stored (or
/// only ever valid) below the diagonal.
pub fn symmetric_full(f: MatRef<'_, f64>, n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| if i >= j { f.read(i, j) } else { f.read(j, i) })
}

/// Explicit SPD inverse of an `n x n` symmetric positive definite matrix `a`, via its own
/// Cholesky factor: `a^{-1} = L^{-T} L^{-1}`. Reads only the lower triangle of `a`.
pub fn invert_spd(a: MatRef<'_, f64>, n: usize) -> Result<Mat<f64>, Problem> {
    let mut l = Mat::<f64>::zeros(n, n);
    for j in 0..n {
        for i in j..n {
            l.write(i, j, a.read(i, j));
        }
    }
    cholesky_panel(l.as_mut(), n, n)?;
    let linv = invert_lower_triangular(l.as_ref(), n)?;
    Ok(matmul_at_b(linv.as_ref(), linv.as_ref()))
}

/// Explicit dense inverse of a general (not necessarily symmetric) `n x n` matrix by
/// Gauss-Jordan elimination with partial pivoting. Used by [`crate::drivers::completion`]'s
/// `factored_updates = false` path, where the accumulated block is not guaranteed symmetric
/// until the final writeback.
pub fn invert_general(a: MatRef<'_, f64>, n: usize) -> Result<Mat<f64>, Problem> {
    let mut aug = Mat::<f64>::zeros(n, 2 * n);
    for i in 0..n {
        for j in 0..n {
            aug.write(i, j, a.read(i, j));
        }
        aug.write(i, n + i, 1.0);
    }

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = aug.read(col, col).abs();
        for row in (col + 1)..n {
            let v = aug.read(row, col).abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = row;
            }
        }
        if pivot_val == 0.0 {
            return Err(ChordalError::Singular.into());
        }
        if pivot_row != col {
            for j in 0..(2 * n) {
                let tmp = aug.read(col, j);
                aug.write(col, j, aug.read(pivot_row, j));
                aug.write(pivot_row, j, tmp);
            }
        }

        let pivot = aug.read(col, col);
        for j in 0..(2 * n) {
            aug.write(col, j, aug.read(col, j) / pivot);
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug.read(row, col);
            if factor == 0.0 {
                continue;
            }
            for j in 0..(2 * n) {
                let v = aug.read(row, j) - factor * aug.read(col, j);
                aug.write(row, j, v);
            }
        }
    }

    Ok(Mat::from_fn(n, n, |i, j| aug.read(i, n + j)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::MatMut;
    use faer::prelude::ReborrowMut;

    #[test]
    fn cholesky_panel_matches_known_2x2() {
        // S1: X = [[4, 2], [2, 5]] -> L = [[2, 0], [1, 2]].
        let mut data = vec![4.0, 2.0, 2.0, 5.0];
        let f = MatMut::from_column_major_slice_mut(&mut data, 2, 2);
        cholesky_panel(f, 2, 2).unwrap();
        assert_eq!(data, vec![2.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn rejects_non_positive_pivot() {
        let mut data = vec![-1.0, 0.0, 0.0, 1.0];
        let f = MatMut::from_column_major_slice_mut(&mut data, 2, 2);
        assert!(cholesky_panel(f, 2, 2).is_err());
    }

    #[test]
    fn schur_complement_round_trips_with_outer_product() {
        let mut data = vec![4.0, 2.0, 1.0, 2.0, 5.0, 1.0, 1.0, 1.0, 9.0];
        let f = MatMut::from_column_major_slice_mut(&mut data, 3, 3);
        cholesky_panel(f, 1, 3).unwrap();
        let mut f = MatMut::from_column_major_slice_mut(&mut data, 3, 3);
        let f22_before = (f.read(1, 1), f.read(2, 1), f.read(2, 2));
        apply_schur_complement(f.rb_mut(), 1, 3);
        add_outer_product(f.rb_mut(), 1, 3);
        assert!((f.read(1, 1) - f22_before.0).abs() < 1e-12);
        assert!((f.read(2, 1) - f22_before.1).abs() < 1e-12);
        assert!((f.read(2, 2) - f22_before.2).abs() < 1e-12);
    }

    #[test]
    fn inverts_lower_triangular() {
        let data = vec![2.0, 1.0, 0.0, 2.0];
        let l = MatRef::from_column_major_slice(&data, 2, 2);
        let inv = invert_lower_triangular(l, 2).unwrap();
        let prod = matmul(l, inv.as_ref());
        assert!((prod.read(0, 0) - 1.0).abs() < 1e-12);
        assert!((prod.read(1, 1) - 1.0).abs() < 1e-12);
        assert!(prod.read(0, 1).abs() < 1e-12);
        assert!(prod.read(1, 0).abs() < 1e-12);
    }

    #[test]
    fn full_outer_product_matches_s1() {
        // S1: L = [[2, 0], [1, 2]] -> L L^T = [[4, 2], [2, 5]].
        let panel = vec![2.0, 1.0, 0.0, 2.0];
        let panel = MatRef::from_column_major_slice(&panel, 2, 2);
        let mut f = Mat::<f64>::zeros(2, 2);
        add_outer_product_full(f.as_mut(), panel, 2, 2);
        assert_eq!(f.read(0, 0), 4.0);
        assert_eq!(f.read(1, 0), 2.0);
        assert_eq!(f.read(1, 1), 5.0);
    }

    #[test]
    fn mirrors_lower_triangle_into_symmetric() {
        let data = vec![4.0, 2.0, 2.0, 5.0];
        let f = MatRef::from_column_major_slice(&data, 2, 2);
        let full = symmetric_full(f, 2);
        assert_eq!(full.read(0, 1), full.read(1, 0));
        assert_eq!(full.read(0, 1), 2.0);
    }

    #[test]
    fn spd_inverse_matches_s1() {
        // S1: X = [[4, 2], [2, 5]].
        let data = vec![4.0, 2.0, 2.0, 5.0];
        let a = MatRef::from_column_major_slice(&data, 2, 2);
        let inv = invert_spd(a, 2).unwrap();
        let full = symmetric_full(a, 2);
        let prod = matmul(full.as_ref(), inv.as_ref());
        assert!((prod.read(0, 0) - 1.0).abs() < 1e-10);
        assert!((prod.read(1, 1) - 1.0).abs() < 1e-10);
        assert!(prod.read(0, 1).abs() < 1e-10);
    }

    #[test]
    fn general_inverse_round_trips() {
        let data = vec![4.0, 2.0, 1.0, 3.0];
        let a = MatRef::from_column_major_slice(&data, 2, 2);
        let inv = invert_general(a, 2).unwrap();
        let prod = matmul(a, inv.as_ref());
        assert!((prod.read(0, 0) - 1.0).abs() < 1e-10);
        assert!((prod.read(1, 1) - 1.0).abs() < 1e-10);
        assert!(prod.read(0, 1).abs() < 1e-10);
        assert!(prod.read(1, 0).abs() < 1e-10);
    }

    #[test]
    fn general_inverse_rejects_singular() {
        let data = vec![1.0, 2.0, 2.0, 4.0];
        let a = MatRef::from_column_major_slice(&data, 2, 2);
        assert!(invert_general(a, 2).is_err());
    }
}
