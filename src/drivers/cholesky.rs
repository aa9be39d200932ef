//! Supernodal Cholesky factorization: `X -> L` such that `X = L Lᵀ`, per §4.4.

use faer::prelude::{Reborrow, ReborrowMut};
use problemo::Problem;

use crate::drivers::{assemble_leading_panel, trailing_relidx, writeback_panel};
use crate::frontal::frontal_add_update;
use crate::linalg::dense::{apply_schur_complement, cholesky_panel};
use crate::matrix::ChordalMatrix;
use crate::workspace::Workspace;

/// Factors `x` (currently holding `X`, `is_factor = false`) in place into its Cholesky
/// factor `L`, setting `is_factor = true` on success. Fails with a validation error if `x`
/// is already a factor, or a numerical error if a supernode's leading block is not positive
/// definite; `x` is left untouched on any error.
pub fn cholesky(x: &mut ChordalMatrix) -> Result<(), Problem> {
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

        cholesky_panel(f.rb_mut(), nk, n)?;

        if n > nk {
            let p = n - nk;
            // §3.3: the update stack only ever holds `(Nk - nk) x (Nk - nk)` blocks, so the
            // Schur complement (sitting at `F`'s trailing `p x p` corner) is copied down to
            // the origin of the pushed block rather than pushed at its own `n x n` offset.
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
