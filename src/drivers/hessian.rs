//! Hessian of the log-det barrier at a chordal PD `X = L Lᵀ`, and the three related chordal
//! congruence maps it is built from, per §4.8.
//!
//! `H_X(U) = P(X^-1 U X^-1)` factors as `G_X^adj(G_X(U))` where `G_X(U) = P(L^-1 U L^-T)` and
//! `G_X^adj` is its adjoint under the trace inner product, `G_X^adj(V) = P(L^-T V L^-1)`.
//! [`hessian`] evaluates one of the four combinations named by [`HessianDirection`] — `G_X`,
//! `G_X^adj`, or either one's inverse — or, when `adj` is left unset, composes `G_X` and
//! `G_X^adj` (or their inverses, in the opposite order) into the full barrier Hessian.
//!
//! Both `G_X` and `G_X^adj` walk [`Symbolic::reverse_post_order`], same as
//! [`crate::drivers::projected_inverse`]: a supernode's own contribution needs its *parent's*
//! `L11^-1`, not just its own, because the relation between a supernode's extension rows and
//! its own columns is a three-term product running through the parent's block. Concretely, for
//! a supernode with leading block `L11`, extension block `L21`, and parent-gathered inverse
//! `C` (itself `L11^-1` of some ancestor, gathered down through every generation in between):
//!
//! - own block: `V11 = A U11 A^T` (`G_X`) or `W11 = A^T V11 A` (`G_X^adj`), `A = L11^-1`,
//!   entirely local — no parent data needed.
//! - extension block: `V21 = C (U21 A^T - L21 V11)` (`G_X`); `W21 = (C^T V21 - W_p L21) A`
//!   (`G_X^adj`, `W_p` the parent's own already-computed `W11`, gathered down alongside `C`).
//!
//! Two channels therefore flow top-down through the tree, gathered at each generation the same
//! way [`crate::frontal::frontal_get_update`] gathers a popped stack block, but via a local
//! helper rather than that module's: the `L11^-1` channel is not symmetric (it is itself a
//! triangular inverse), so it cannot be stored or scattered through the engine's
//! symmetric-lower-triangle-only frontal/update-stack machinery. This driver keeps its own
//! small `Vec` of per-supernode matrices instead of [`crate::workspace::Workspace`]'s arena —
//! the one driver in this crate that does not fit the shared scaffold in `drivers/mod.rs`.
//!
//! The two inverse mappings run the identical traversal and reuse the identical channels,
//! inverting only the small `p x p` gathered piece locally (via
//! [`crate::linalg::dense::invert_general`], since a gather of a non-symmetric matrix is not
//! triangular even though the matrix it was gathered from is) rather than requiring a second,
//! differently-shaped traversal.
//!
//! `factored_updates` chooses, as in [`crate::drivers::completion`], between two arithmetically
//! equivalent ways of forming a supernode's own sandwich product; it never changes which data
//! is pushed to children.

use faer::{Mat, MatMut, MatRef};
use problemo::Problem;

use crate::drivers::is_root;
use crate::error::ChordalError;
use crate::linalg::dense::{invert_general, invert_lower_triangular, matmul, matmul_a_bt, matmul_at_b, symmetric_full};
use crate::matrix::ChordalMatrix;

/// Selects which of §4.8's four chordal congruence maps [`hessian`] evaluates.
///
/// `adj = Some(false)` is `G_X`, `adj = Some(true)` is `G_X^adj`; `inv` requests the inverse of
/// whichever map `adj` names. `adj = None` requests the full barrier Hessian `H_X =
/// G_X^adj ∘ G_X` (or, if `inv` is also set, its inverse `H_X^-1 = G_X^-1 ∘ (G_X^adj)^-1`) —
/// applying both maps in sequence rather than either alone.
#[derive(Debug, Clone, Copy)]
pub struct HessianDirection {
    pub adj: Option<bool>,
    pub inv: bool,
}

/// Applies `dir` to every matrix in `u` in place, treating `L` (`l`, `is_factor = true`) as the
/// fixed Cholesky factor the congruence is built from.
///
/// `y`, `X`'s projected inverse (`is_factor = false`), is validated against `l`'s pattern and
/// flag but — unlike the reference implementation this is grounded on — is not otherwise read:
/// every map in the action table above is fully determined by `L` alone, so carrying `Y`'s
/// values through the walk would be redundant work, not extra precision.
///
/// All of `l`, `y`, and every entry of `u` must share `l`'s symbolic layout
/// ([`ChordalMatrix::shares_pattern_with`]), or this fails with `SymbolIdentityMismatch`. Fails
/// with a numerical error if a supernode's `L11` block or a gathered parent block is singular.
/// `u` is left untouched on any error.
pub fn hessian(
    l: &ChordalMatrix,
    y: &ChordalMatrix,
    u: &mut [ChordalMatrix],
    dir: HessianDirection,
    factored_updates: bool,
) -> Result<(), Problem> {
    l.require_factor(true)?;
    y.require_factor(false)?;
    if !l.shares_pattern_with(y) {
        return Err(ChordalError::SymbolIdentityMismatch.into());
    }
    for ui in u.iter() {
        if !l.shares_pattern_with(ui) {
            return Err(ChordalError::SymbolIdentityMismatch.into());
        }
    }

    for ui in u.iter_mut() {
        match dir.adj {
            Some(adj) => apply_congruence(l, ui, adj, dir.inv, factored_updates)?,
            None if dir.inv => {
                apply_congruence(l, ui, true, true, factored_updates)?;
                apply_congruence(l, ui, false, true, factored_updates)?;
            }
            None => {
                apply_congruence(l, ui, false, false, factored_updates)?;
                apply_congruence(l, ui, true, false, factored_updates)?;
            }
        }
    }
    Ok(())
}

/// One pass of `G_X` (`adjoint = false`), `G_X^adj` (`adjoint = true`), or either one's inverse
/// (`inverse = true`), overwriting `u` in place.
fn apply_congruence(
    l: &ChordalMatrix,
    u: &mut ChordalMatrix,
    adjoint: bool,
    inverse: bool,
    factored_updates: bool,
) -> Result<(), Problem> {
    let symb = l.symb().clone();
    let nsn = symb.num_supernodes();
    // `recv_a[k]`: `L11^-1` of the nearest ancestor with a pushed update, gathered down to `k`'s
    // own `nrows(k) x nrows(k)` frontal — only the trailing `p x p` corner is meaningful, same
    // convention as a popped `UpdateStack` block.
    let mut recv_a: Vec<Option<Mat<f64>>> = vec![None; nsn];
    // `recv_w[k]`: the analogous channel for `G_X^adj`'s own-block output (or, in the inverse
    // direction, the analogous ancestor's *input* block) — only populated when `adjoint`.
    let mut recv_w: Vec<Option<Mat<f64>>> = vec![None; nsn];

    for k in symb.reverse_post_order() {
        let nk = symb.ncols(k);
        let n = symb.nrows(k);
        let p = n - nk;

        let l11 = MatRef::from_column_major_slice(l.block(k), n, nk).submatrix(0, 0, nk, nk);
        let a_own = invert_lower_triangular(l11, nk)?;

        let input: Vec<f64> = u.block(k).to_vec();
        let raw = MatRef::from_column_major_slice(&input, n, nk);
        let in00 = symmetric_full(raw.submatrix(0, 0, nk, nk), nk);
        let in21 = if p > 0 { raw.submatrix(nk, 0, p, nk).to_owned() } else { Mat::<f64>::zeros(0, nk) };

        let own_diag = own_block(in00.as_ref(), a_own.as_ref(), l11, adjoint, inverse, factored_updates);

        let ap = if p > 0 {
            if is_root(&symb, k) {
                Mat::<f64>::zeros(p, p)
            } else {
                let full = recv_a[k].as_ref().ok_or(ChordalError::MalformedSymbolic)?;
                full.as_ref().submatrix(nk, nk, p, p).to_owned()
            }
        } else {
            Mat::<f64>::zeros(0, 0)
        };
        let wp = if adjoint && p > 0 {
            if is_root(&symb, k) {
                Mat::<f64>::zeros(p, p)
            } else {
                let full = recv_w[k].as_ref().ok_or(ChordalError::MalformedSymbolic)?;
                full.as_ref().submatrix(nk, nk, p, p).to_owned()
            }
        } else {
            Mat::<f64>::zeros(0, 0)
        };

        let out21 = if p > 0 {
            let l21 = MatRef::from_column_major_slice(l.block(k), n, nk).submatrix(nk, 0, p, nk);
            Some(cross_block(
                in21.as_ref(),
                l21,
                l11,
                a_own.as_ref(),
                ap.as_ref(),
                wp.as_ref(),
                own_diag.as_ref(),
                adjoint,
                inverse,
            )?)
        } else {
            None
        };

        write_panel(u.block_mut(k), n, nk, own_diag.as_ref(), out21.as_ref());

        if !symb.children(k).is_empty() {
            let l21 = if p > 0 {
                Some(MatRef::from_column_major_slice(l.block(k), n, nk).submatrix(nk, 0, p, nk).to_owned())
            } else {
                None
            };
            let b_own = l21.as_ref().map(|l21| {
                let ap_l21 = matmul(ap.as_ref(), l21.as_ref());
                let prod = matmul(ap_l21.as_ref(), a_own.as_ref());
                Mat::from_fn(p, nk, |i, j| -prod.read(i, j))
            });
            let full_a = build_full(a_own.as_ref(), b_own.as_ref().map(|m| m.as_ref()), ap.as_ref(), n, nk, p);

            let full_w = if adjoint {
                // Non-inverse: push this node's own just-computed `G_X^adj` output, so a child
                // reads its parent's *result*. Inverse: `u` already holds the full given input
                // everywhere, so push this node's own (untouched) *input* instead — there is
                // nothing further to compute at this node for that channel.
                let (diag, cross) = if inverse { (in00.as_ref(), in21.as_ref()) } else { (own_diag.as_ref(), out21.as_ref().map(|m| m.as_ref()).unwrap_or(in21.as_ref())) };
                Some(build_full(diag, if p > 0 { Some(cross) } else { None }, wp.as_ref(), n, nk, p))
            } else {
                None
            };

            for &c in symb.children(k) {
                let ridx = symb.relidx(c);
                recv_a[c] = Some(gather_general(full_a.as_ref(), ridx));
                if let Some(full_w) = &full_w {
                    recv_w[c] = Some(gather_general(full_w.as_ref(), ridx));
                }
            }
        }
    }

    Ok(())
}

/// The own-block sandwich: `A U A^T` (`G_X`), `A^T U A` (`G_X^adj`), or the corresponding
/// inverse sandwich against `L11` itself. `factored_updates` only changes the order the two
/// products are taken in; the result is identical either way.
fn own_block(
    in00: MatRef<'_, f64>,
    a_own: MatRef<'_, f64>,
    l11: MatRef<'_, f64>,
    adjoint: bool,
    inverse: bool,
    factored_updates: bool,
) -> Mat<f64> {
    match (adjoint, inverse) {
        (false, false) => {
            if factored_updates {
                matmul(matmul(a_own, in00).as_ref(), a_own.transpose())
            } else {
                matmul(a_own, matmul_a_bt(in00, a_own).as_ref())
            }
        }
        (true, false) => {
            if factored_updates {
                matmul(matmul_at_b(a_own, in00).as_ref(), a_own)
            } else {
                matmul(matmul(a_own.transpose(), in00).as_ref(), a_own)
            }
        }
        (false, true) => {
            if factored_updates {
                matmul(matmul(l11, in00).as_ref(), l11.transpose())
            } else {
                matmul(l11, matmul_a_bt(in00, l11).as_ref())
            }
        }
        (true, true) => {
            if factored_updates {
                matmul(matmul_at_b(l11, in00).as_ref(), l11)
            } else {
                matmul(matmul(l11.transpose(), in00).as_ref(), l11)
            }
        }
    }
}

/// The extension-block formula: reads `ap` (`C`, the parent-gathered `L11^-1`) and, only for
/// `adjoint`, `wp` (`C`'s sibling channel, the parent's own `G_X^adj` output or, in the inverse
/// direction, the parent's own input). The inverse directions additionally invert the small
/// gathered `ap` block, since a submatrix of a non-symmetric matrix's inverse is not in general
/// the inverse of the corresponding submatrix.
///
/// `own_diag` is this node's own leading-block output, already computed by [`own_block`] for
/// the same `(adjoint, inverse)` combination.
fn cross_block(
    in21: MatRef<'_, f64>,
    l21: MatRef<'_, f64>,
    l11: MatRef<'_, f64>,
    a_own: MatRef<'_, f64>,
    ap: MatRef<'_, f64>,
    wp: MatRef<'_, f64>,
    own_diag: MatRef<'_, f64>,
    adjoint: bool,
    inverse: bool,
) -> Result<Mat<f64>, Problem> {
    Ok(match (adjoint, inverse) {
        // G_X: V21 = C (U21 A^T - L21 V11)
        (false, false) => {
            let rhs = matmul_a_bt(in21, a_own);
            let correction = matmul(l21, own_diag);
            let diff = Mat::from_fn(rhs.nrows(), rhs.ncols(), |i, j| rhs.read(i, j) - correction.read(i, j));
            matmul(ap, diff.as_ref())
        }
        // G_X^adj: W21 = (C^T V21 - W_p L21) A
        (true, false) => {
            let term1 = matmul_at_b(ap, in21);
            let term2 = matmul(wp, l21);
            let diff = Mat::from_fn(term1.nrows(), term1.ncols(), |i, j| term1.read(i, j) - term2.read(i, j));
            matmul(diff.as_ref(), a_own)
        }
        // G_X^-1: U21 = (C^-1 V21 + L21 U00) L11^T
        (false, true) => {
            let ap_inv = invert_general(ap, ap.nrows())?;
            let t1 = matmul(ap_inv.as_ref(), in21);
            let t2 = matmul(l21, own_diag);
            let sum = Mat::from_fn(t1.nrows(), t1.ncols(), |i, j| t1.read(i, j) + t2.read(i, j));
            matmul_a_bt(sum.as_ref(), l11)
        }
        // (G_X^adj)^-1: V21 = (C^-1)^T (W21 L11 + W_p L21)
        (true, true) => {
            let ap_inv = invert_general(ap, ap.nrows())?;
            let t1 = matmul(in21, l11);
            let t2 = matmul(wp, l21);
            let rhs = Mat::from_fn(t1.nrows(), t1.ncols(), |i, j| t1.read(i, j) + t2.read(i, j));
            matmul_at_b(ap_inv.as_ref(), rhs.as_ref())
        }
    })
}

/// Embeds `diag` (`nk x nk`) at the leading corner and `trailing` (`p x p`, this node's own
/// received-from-parent value, passed through unchanged) at the trailing corner of an
/// `n x n` matrix, with `cross` (`p x nk`, zero if absent) at the lower-left and zero at the
/// upper-right — the shape a child's [`gather_general`] reads its own `relidx`-addressed
/// sub-block out of. Mirrors [`crate::drivers::projected_inverse`]'s full-frontal reassembly,
/// generalized to a possibly non-symmetric `diag`/`trailing` pair.
fn build_full(diag: MatRef<'_, f64>, cross: Option<MatRef<'_, f64>>, trailing: MatRef<'_, f64>, n: usize, nk: usize, p: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| {
        if i < nk && j < nk {
            diag.read(i, j)
        } else if i >= nk && j < nk {
            cross.map(|c| c.read(i - nk, j)).unwrap_or(0.0)
        } else if i < nk {
            0.0
        } else {
            let _ = p;
            trailing.read(i - nk, j - nk)
        }
    })
}

/// Gathers the general (not lower-triangle-restricted) `relidx.len() x relidx.len()` submatrix
/// of `full` addressed by `relidx`, the way [`crate::frontal::frontal_get_update`] does for the
/// engine's symmetric-only channels.
fn gather_general(full: MatRef<'_, f64>, relidx: &[usize]) -> Mat<f64> {
    let m = relidx.len();
    Mat::from_fn(m, m, |i, j| full.read(relidx[i], relidx[j]))
}

/// Writes `diag`'s lower triangle (upper left zero, matching every other symmetric-result
/// driver in this crate) and `cross` (fully, it is never triangular) into `block`.
fn write_panel(block: &mut [f64], n: usize, nk: usize, diag: MatRef<'_, f64>, cross: Option<MatRef<'_, f64>>) {
    let mut dst = MatMut::from_column_major_slice_mut(block, n, nk);
    for j in 0..nk {
        for i in 0..nk {
            let v = if i >= j { diag.read(i, j) } else { 0.0 };
            dst.write(i, j, v);
        }
    }
    if let Some(cross) = cross {
        let p = n - nk;
        for j in 0..nk {
            for i in 0..p {
                dst.write(nk + i, j, cross.read(i, j));
            }
        }
    }
}
