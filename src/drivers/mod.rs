//! The five supernodal multifrontal walks. Each driver shares the same scaffold — iterate
//! [`Symbolic::post_order`] or [`Symbolic::reverse_post_order`], assemble a frontal panel,
//! run a dense kernel, write back, push/pop the update stack — and differs only in
//! traversal direction and kernel. The scaffold-level helpers below are factored out so each
//! driver file reads as the walk plus its own numerics.

use faer::{MatMut, MatRef};

use crate::symbolic::Symbolic;

mod cholesky;
mod completion;
mod hessian;
mod llt;
mod projected_inverse;

pub use cholesky::cholesky;
pub use completion::completion;
pub use hessian::{HessianDirection, hessian};
pub use llt::llt;
pub use projected_inverse::projected_inverse;

/// Copies a supernode's stored `n x nk` block-value panel into the leading `nk` columns of
/// its `n x n` frontal view.
fn assemble_leading_panel(f: MatMut<'_, f64>, block: &[f64], n: usize, nk: usize) {
    let src = MatRef::from_column_major_slice(block, n, nk);
    f.submatrix_mut(0, 0, n, nk).copy_from(src);
}

/// Copies the leading `nk` columns of a supernode's `n x n` frontal view back into its
/// stored `n x nk` block-value panel.
fn writeback_panel(f: MatRef<'_, f64>, block: &mut [f64], n: usize, nk: usize) {
    let mut dst = MatMut::from_column_major_slice_mut(block, n, nk);
    dst.copy_from(f.submatrix(0, 0, n, nk));
}

/// Whether supernode `k` is a root of the elimination forest, i.e. it never appears as a
/// child of any other supernode. `Symbolic` only stores child pointers, so root-ness is
/// determined by scanning them; reverse-post-order drivers use this to know when there is no
/// parent-pushed update to pop.
fn is_root(symb: &Symbolic, k: usize) -> bool {
    (0..symb.num_supernodes()).all(|j| !symb.children(j).contains(&k))
}

/// The trailing `(Nc - nc)` entries of child `c`'s relative index, the rows of `c`'s own
/// frontal that survive into its parent's as an extension. The update stack only ever holds
/// blocks sized `(Nc - nc) x (Nc - nc)` (§3.3), so a scatter-add of a popped child update
/// must address only this trailing slice, not the full `Nc`-length `relidx(c)`.
fn trailing_relidx(symb: &Symbolic, c: usize) -> &[usize] {
    &symb.relidx(c)[symb.ncols(c)..]
}
