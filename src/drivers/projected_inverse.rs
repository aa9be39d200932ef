//! Projected inverse: `L -> Y`, the chordal projection of `X^{-1}` where `X = L Lᵀ`, per §4.6.
//! Unlike [`crate::drivers::cholesky`]/[`crate::drivers::llt`], this walk runs
//! [`Symbolic::reverse_post_order`] — a supernode needs its parent's already-computed trailing
//! block (`Y22`, the portion of `Y` restricted to its own separator) before it can compute its
//! own leading columns, so the root must be visited first.

use faer::prelude::{Reborrow, ReborrowMut};
use faer::{Mat, MatRef};
use problemo::Problem;

use crate::drivers::{is_root, trailing_relidx, writeback_panel};
use crate::frontal::frontal_get_update;
use crate::linalg::dense::{invert_lower_triangular, matmul, matmul_at_b, symmetric_full};
use crate::matrix::ChordalMatrix;
use crate::workspace::Workspace;

/// Overwrites `l` (currently holding `L`, `is_factor = true`) in place with `Y`, the chordal
/// projection of `X^{-1}`, setting `is_factor = false` on success. Fails with a validation
/// error if `l` is not already a factor, or a numerical error if a supernode's `L11` block is
/// singular; `l` is left untouched on any error.
///
/// Per §4.6: `Y21 = -Y22 L21 L11^-1`, `Y11 = L11^-T L11^-1 - Y21^T L21 L11^-1` (lower triangle
/// only). `Y22` itself — already resolved at the parent, since a supernode's separator is a
/// subset of its parent's frontal — is left unchanged and propagated further down to children.
pub fn projected_inverse(l: &mut ChordalMatrix) -> Result<(), Problem> {
    l.require_factor(true)?;
    let symb = l.symb().clone();
    let mut ws = Workspace::new(&symb)?;

    for k in symb.reverse_post_order() {
        let nk = symb.ncols(k);
        let n = symb.nrows(k);
        let p = n - nk;
        let (frontal, stack) = ws.split_mut();
        let mut f = frontal.view(n)?;

        // L11, L21 are read out of `l`'s own (unmodified-so-far) block, before this
        // supernode's panel is overwritten with Y11/Y21 below.
        let l11 = MatRef::from_column_major_slice(l.block(k), n, nk).submatrix(0, 0, nk, nk);
        let l11inv = invert_lower_triangular(l11, nk)?;

        let y22 = if is_root(&symb, k) {
            Mat::<f64>::zeros(p, p)
        } else {
            let popped = stack.pop()?;
            symmetric_full(popped, p)
        };

        let l11inv_t_l11inv = matmul_at_b(l11inv.as_ref(), l11inv.as_ref());

        if p > 0 {
            let l21 = MatRef::from_column_major_slice(l.block(k), n, nk).submatrix(nk, 0, p, nk);
            // y21 = Y22 * L21 * L11^-1; Y21 (written) = -y21.
            let y21 = matmul(matmul(y22.as_ref(), l21).as_ref(), l11inv.as_ref());
            let mut f21 = f.rb_mut().submatrix_mut(nk, 0, p, nk);
            for j in 0..nk {
                for i in 0..p {
                    f21.write(i, j, -y21.read(i, j));
                }
            }

            // correction = Y21^T L21 L11^-1 = -(y21^T L21 L11^-1)
            let l21_l11inv = matmul(l21, l11inv.as_ref());
            let correction = matmul_at_b(y21.as_ref(), l21_l11inv.as_ref());
            let mut f11 = f.rb_mut().submatrix_mut(0, 0, nk, nk);
            for j in 0..nk {
                for i in j..nk {
                    f11.write(i, j, l11inv_t_l11inv.read(i, j) + correction.read(i, j));
                }
            }
        } else {
            let mut f11 = f.rb_mut().submatrix_mut(0, 0, nk, nk);
            for j in 0..nk {
                for i in j..nk {
                    f11.write(i, j, l11inv_t_l11inv.read(i, j));
                }
            }
        }

        writeback_panel(f.rb(), l.block_mut(k), n, nk);

        if !symb.children(k).is_empty() {
            // Re-assemble the full n x n frontal (Y11/Y21 just written, Y22 restored
            // unchanged in the trailing block if this node itself has an extension) so each
            // child can gather its own relidx-addressed sub-block, even when this node has no
            // extension of its own (p == 0: the frontal is then just Y11/Y21).
            let mut full = f.rb_mut();
            for j in 0..p {
                for i in j..p {
                    full.write(nk + i, nk + j, y22.read(i, j));
                }
            }
            for &c in symb.children(k) {
                // §3.3: only the trailing `(Nc - nc) x (Nc - nc)` corner of `c`'s own frontal
                // is ever popped (as `c`'s `y22`), so that is all that needs gathering here.
                let relidx_c = trailing_relidx(&symb, c);
                let gathered = frontal_get_update(full.rb(), relidx_c);
                let mut u = stack.push(relidx_c.len())?;
                u.copy_from(gathered.as_ref());
            }
        }
    }

    debug_assert!(ws.stack().is_empty());
    l.set_factor(false);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::Symbolic;
    use std::sync::Arc;

    /// S1: `X = [[4, 2], [2, 5]]`, single dense `2 x 2` supernode, no parent/children.
    fn dense_2x2() -> Arc<Symbolic> {
        Arc::new(
            Symbolic::new(2, vec![0], vec![0, 2], vec![0, 2], vec![0, 1], vec![0, 0], vec![], vec![0, 4], 1, 4, 4)
                .unwrap(),
        )
    }

    #[test]
    fn inverts_dense_2x2_matching_s1() {
        let symb = dense_2x2();
        // L = [[2, 0], [1, 2]], X = L Lᵀ = [[4, 2], [2, 5]], X^-1 = [[0.3125, -0.125], [-0.125, 0.25]]
        let mut l = ChordalMatrix::new(symb, vec![2.0, 1.0, 0.0, 2.0], true).unwrap();
        projected_inverse(&mut l).unwrap();
        assert!(!l.is_factor());
        let y = l.blkval();
        assert!((y[0] - 0.3125).abs() < 1e-10);
        assert!((y[1] - (-0.125)).abs() < 1e-10);
        assert!((y[3] - 0.25).abs() < 1e-10);
    }

    #[test]
    fn rejects_matrix_not_in_factor_state() {
        let symb = dense_2x2();
        let mut l = ChordalMatrix::new(symb, vec![2.0, 1.0, 0.0, 2.0], false).unwrap();
        assert!(projected_inverse(&mut l).is_err());
    }

    /// Two supernodes: `{0}` (leaf, owns var0, row-extended by var2 only — var0/var1 are not
    /// adjacent in the pattern) and `{1, 2}` (root, owns vars 1 and 2, no extension).
    fn two_supernode_layout() -> Arc<Symbolic> {
        Arc::new(
            Symbolic::new(
                3,
                vec![0, 1],
                vec![0, 1, 3],
                vec![0, 2, 4],
                vec![0, 1, 0, 1],
                vec![0, 0, 1],
                vec![0],
                vec![0, 2, 6],
                2,
                4,
                4,
            )
            .unwrap(),
        )
    }

    #[test]
    fn inverts_two_supernode_chain() {
        let symb = two_supernode_layout();
        // X = [[4, 0, 1], [0, 3, 0], [1, 0, 2]]: node0 stores column 0 (rows 0, 2), node1
        // stores the dense 2x2 block for vars 1, 2.
        let mut x = ChordalMatrix::new(symb.clone(), vec![4.0, 1.0, 3.0, 0.0, 0.0, 2.0], false).unwrap();
        crate::drivers::cholesky(&mut x).unwrap();
        let l_blk = x.blkval().to_vec();
        let mut l = ChordalMatrix::new(symb, l_blk, true).unwrap();
        projected_inverse(&mut l).unwrap();
        assert!(!l.is_factor());

        let dense = faer::Mat::<f64>::from_fn(3, 3, |i, j| {
            let vals = [[4.0, 0.0, 1.0], [0.0, 3.0, 0.0], [1.0, 0.0, 2.0]];
            vals[i][j]
        });
        let full_inv = crate::linalg::dense::invert_spd(dense.as_ref(), 3).unwrap();
        let y = l.blkval();
        // node0's own diagonal: Y[var0, var0]
        assert!((y[0] - full_inv.read(0, 0)).abs() < 1e-8);
        // node1's block: column-major 2x2 over (var1, var2); flat offsets (row,col) -> (0,0)=2,
        // (1,0)=3, (0,1)=4, (1,1)=5 within blkval.
        assert!((y[2] - full_inv.read(1, 1)).abs() < 1e-8);
        assert!((y[5] - full_inv.read(2, 2)).abs() < 1e-8);
    }
}
