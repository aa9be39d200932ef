//! Maximum-determinant positive-definite completion: `X -> L`, per §4.7.
//!
//! For a chordal pattern, a partial `X` specified only on the pattern has a unique
//! maximum-determinant PD completion (Grone, Johnson, Sá, Wolkowicz 1984), and that
//! completion's Cholesky factor is produced by running the *same* supernodal elimination as
//! [`crate::drivers::cholesky`] and simply never introducing fill outside the pattern — a
//! perfect elimination ordering of a chordal graph completes with zero fill, which is exactly
//! the max-det completion's defining property. [`crate::matrix::ChordalMatrix`] already only
//! ever stores pattern-confined entries, so the two drivers share their numeric core and
//! traversal; `completion` differs only in `factored_updates`, a choice of solve strategy for
//! a node's own `L21 = X21 L11^-T` — triangular solves against the just-computed `L11` factor
//! (what [`cholesky_panel`] does when run over the full `n` rows, as `cholesky` always does)
//! versus an explicit inverse of `L11` multiplied out by hand. Both are exact; the value
//! pushed onto the update stack is always the plain dense symmetric Schur complement either
//! way, so the flag never reaches the frontal scatter/gather code.

use faer::prelude::{Reborrow, ReborrowMut};
use problemo::Problem;

use crate::drivers::{assemble_leading_panel, trailing_relidx, writeback_panel};
use crate::frontal::frontal_add_update;
use crate::linalg::dense::{apply_schur_complement, cholesky_panel, invert_lower_triangular, matmul_a_bt};
use crate::matrix::ChordalMatrix;
use crate::workspace::Workspace;

/// Completes `x` (currently holding a pattern-only `X`, `is_factor = false`) in place into the
/// Cholesky factor of its maximum-determinant PD completion, setting `is_factor = true` on
/// success. Fails with a validation error if `x` is already a factor, or a numerical error if
/// a supernode's leading block is not positive definite; `x` is left untouched on any error.
pub fn completion(x: &mut ChordalMatrix, factored_updates: bool) -> Result<(), Problem> {
    x.require_factor(false)?;
    let symb = x.symb().clone();
    let mut ws = Workspace::new(&symb)?;

    for &k in symb.post_order() {
        let nk = symb.ncols(k);
        let n = symb.nrows(k);
        let (frontal, stack) = ws.split_mut();
        let mut f = frontal.view(n)?;

        assemble_leading_panel(f.rb_mut(), x.block(k), n, nk);

        for &c in symb.children(k).iter().rev() {
            let u = stack.pop()?;
            frontal_add_update(f.rb_mut(), u, trailing_relidx(&symb, c), 1.0)?;
        }

        if factored_updates {
            cholesky_panel(f.rb_mut(), nk, n)?;
        } else {
            cholesky_panel(f.rb_mut(), nk, nk)?;
            if n > nk {
                let l11 = f.rb().submatrix(0, 0, nk, nk);
                let l11inv = invert_lower_triangular(l11, nk)?;
                let x21 = f.rb().submatrix(nk, 0, n - nk, nk).to_owned();
                let l21 = matmul_a_bt(x21.as_ref(), l11inv.as_ref());
                f.rb_mut().submatrix_mut(nk, 0, n - nk, nk).copy_from(l21.as_ref());
            }
        }

        if n > nk {
            let p = n - nk;
            apply_schur_complement(f.rb_mut(), nk, n);
            let mut u = stack.push(p)?;
            for j in 0..p {
                for i in j..p {
                    u.write(i, j, f.read(nk + i, nk + j));
                }
            }
        }

        writeback_panel(f.rb(), x.block_mut(k), n, nk);
    }

    debug_assert!(ws.stack().is_empty());
    x.set_factor(true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::Symbolic;
    use rstest::rstest;
    use std::sync::Arc;

    fn dense_2x2() -> Arc<Symbolic> {
        Arc::new(
            Symbolic::new(2, vec![0], vec![0, 2], vec![0, 2], vec![0, 1], vec![0, 0], vec![], vec![0, 4], 1, 4, 4)
                .unwrap(),
        )
    }

    #[test]
    fn completes_dense_2x2_matching_cholesky() {
        let symb = dense_2x2();
        let mut x = ChordalMatrix::new(symb, vec![4.0, 2.0, 2.0, 5.0], false).unwrap();
        completion(&mut x, false).unwrap();
        assert!(x.is_factor());
        assert_eq!(x.blkval(), &[2.0, 1.0, 0.0, 2.0]);
    }

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

    /// Both solve strategies for a node's own `L21` must produce the same max-det completion,
    /// so this holds for either value of `factored_updates`; `false` additionally covers the
    /// plain `completes_dense_2x2_matching_cholesky` shape over the two-supernode chain.
    #[rstest]
    fn completes_two_supernode_chain_matching_cholesky(#[values(false, true)] factored_updates: bool) {
        let symb = two_supernode_layout();
        let mut x_completion =
            ChordalMatrix::new(symb.clone(), vec![4.0, 1.0, 3.0, 0.0, 0.0, 2.0], false).unwrap();
        let mut x_cholesky = ChordalMatrix::new(symb, vec![4.0, 1.0, 3.0, 0.0, 0.0, 2.0], false).unwrap();
        completion(&mut x_completion, factored_updates).unwrap();
        crate::drivers::cholesky(&mut x_cholesky).unwrap();
        for (a, b) in x_completion.blkval().iter().zip(x_cholesky.blkval()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn rejects_matrix_already_in_factor_state() {
        let symb = dense_2x2();
        let mut x = ChordalMatrix::new(symb, vec![4.0, 2.0, 2.0, 5.0], true).unwrap();
        assert!(completion(&mut x, false).is_err());
    }
}
