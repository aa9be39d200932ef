//! Supernodal Cholesky product: `L -> X` such that `X = L Lᵀ`, per §4.5. The inverse walk of
//! [`crate::drivers::cholesky`] — same post-order traversal and the same extend-add shape, but
//! accumulating outer products instead of eliminating columns.

use faer::prelude::{Reborrow, ReborrowMut};
use faer::{Mat, MatRef};
use problemo::Problem;

use crate::drivers::{trailing_relidx, writeback_panel};
use crate::frontal::frontal_add_update;
use crate::linalg::dense::add_outer_product_full;
use crate::matrix::ChordalMatrix;
use crate::workspace::Workspace;

/// Expands `l` (currently holding `L`, `is_factor = true`) in place into `X = L Lᵀ`, setting
/// `is_factor = false` on success. Fails with a validation error if `l` is not already a
/// factor; `l` is left untouched on any error.
pub fn llt(l: &mut ChordalMatrix) -> Result<(), Problem> {
    l.require_factor(true)?;
    let symb = l.symb().clone();
    let mut ws = Workspace::new(&symb)?;

    for &k in symb.post_order() {
        let nk = symb.ncols(k);
        let n = symb.nrows(k);
        let (frontal, stack) = ws.split_mut();
        let mut f = frontal.view(n)?;

        let panel: Mat<f64> = MatRef::from_column_major_slice(l.block(k), n, nk).to_owned();
        add_outer_product_full(f.rb_mut(), panel.as_ref(), n, nk);

        for &c in symb.children(k).iter().rev() {
            let u = stack.pop()?;
            frontal_add_update(f.rb_mut(), u, trailing_relidx(&symb, c), 1.0)?;
        }

        writeback_panel(f.rb(), l.block_mut(k), n, nk);

        if n > nk {
            let p = n - nk;
            let mut u = stack.push(p)?;
            for j in 0..p {
                for i in j..p {
                    u.write(i, j, f.read(nk + i, nk + j));
                }
            }
        }
    }

    debug_assert!(ws.stack().is_empty());
    l.set_factor(false);
    Ok(())
}
