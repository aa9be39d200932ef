//! Frontal scatter/gather: mapping a child supernode's square update block into (and out of)
//! its parent's frontal panel via the per-supernode relative index.

use faer::{MatMut, MatRef};
use problemo::{Problem, ProblemResult};

use crate::error::ChordalError;

/// Scatter-adds `alpha * U` into `F` at the rows/columns named by `relidx`, lower triangle
/// only: for all `0 <= j <= i < relidx.len()`, `F[relidx[i], relidx[j]] += alpha * U[i, j]`.
pub fn frontal_add_update(
    mut f: MatMut<'_, f64>,
    u: MatRef<'_, f64>,
    relidx: &[usize],
    alpha: f64,
) -> Result<(), Problem> {
    let n = relidx.len();
    if u.nrows() != n || u.ncols() != n {
        return Err(ChordalError::ShapeMismatch.into());
    }
    for j in 0..n {
        let rj = relidx[j];
        for i in j..n {
            let ri = relidx[i];
            let updated = f.read(ri, rj) + alpha * u.read(i, j);
            f.write(ri, rj, updated);
        }
    }
    Ok(())
}

/// Gathers a fresh `N x N` block out of `F`'s lower triangle at the rows/columns named by
/// `relidx`. The strict upper triangle of the result is left at zero but must not be relied
/// upon by callers (see §4.2).
pub fn frontal_get_update(f: MatRef<'_, f64>, relidx: &[usize]) -> faer::Mat<f64> {
    let n = relidx.len();
    faer::Mat::from_fn(n, n, |i, j| {
        if i >= j {
            f.read(relidx[i], relidx[j])
        } else {
            0.0
        }
    })
}

/// Merges two strictly ascending integer ranges, `left[offsetl..offsetl+nl]` and
/// `right[offsetr..offsetr+nr]`, into their ascending set-union, written back into `left`
/// starting at `offsetl`. Equal elements are emitted once, so the returned length `k`
/// satisfies `max(nl, nr) <= k <= nl + nr`. `left` must have room for `offsetl + nl + nr`
/// entries; the merge uses a temporary buffer of size `nl + nr`, freed before returning.
pub fn lmerge(
    left: &mut [usize],
    right: &[usize],
    offsetl: usize,
    offsetr: usize,
    nl: usize,
    nr: usize,
) -> Result<usize, Problem> {
    let mut tmp = Vec::new();
    tmp.try_reserve_exact(nl + nr).via(ChordalError::Allocation)?;

    let (mut il, mut ir) = (0usize, 0usize);
    while il < nl && ir < nr {
        let lv = left[offsetl + il];
        let rv = right[offsetr + ir];
        if lv < rv {
            tmp.push(lv);
            il += 1;
        } else if lv > rv {
            tmp.push(rv);
            ir += 1;
        } else {
            tmp.push(lv);
            il += 1;
            ir += 1;
        }
    }
    tmp.extend_from_slice(&left[offsetl + il..offsetl + nl]);
    tmp.extend_from_slice(&right[offsetr + ir..offsetr + nr]);

    let k = tmp.len();
    left[offsetl..offsetl + k].copy_from_slice(&tmp);
    Ok(k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;
    use faer::prelude::{Reborrow, ReborrowMut};

    #[test]
    fn scatter_add_touches_only_mapped_lower_triangle() {
        let mut f_data = vec![0.0; 9];
        let mut f = MatMut::from_column_major_slice_mut(&mut f_data, 3, 3);
        let u = Mat::from_fn(2, 2, |i, j| if i == 0 && j == 0 { 1.0 } else { 2.0 });
        frontal_add_update(f.rb_mut(), u.as_ref(), &[0, 2], 1.0).unwrap();
        assert_eq!(f.read(0, 0), 1.0);
        assert_eq!(f.read(2, 0), 2.0);
        assert_eq!(f.read(2, 2), 2.0);
        assert_eq!(f.read(1, 1), 0.0);
    }

    #[test]
    fn gather_is_inverse_of_scatter_with_alpha_one() {
        let mut f_data = vec![0.0; 9];
        let mut f = MatMut::from_column_major_slice_mut(&mut f_data, 3, 3);
        let u = Mat::from_fn(2, 2, |i, j| (i * 2 + j + 1) as f64);
        frontal_add_update(f.rb_mut(), u.as_ref(), &[0, 2], 1.0).unwrap();
        let gathered = frontal_get_update(f.as_ref(), &[0, 2]);
        assert_eq!(gathered.read(0, 0), u.read(0, 0));
        assert_eq!(gathered.read(1, 0), u.read(1, 0));
        assert_eq!(gathered.read(1, 1), u.read(1, 1));
    }

    #[test]
    fn rejects_shape_mismatch() {
        let mut f_data = vec![0.0; 9];
        let f = MatMut::from_column_major_slice_mut(&mut f_data, 3, 3);
        let u = Mat::from_fn(3, 3, |_, _| 1.0);
        assert!(frontal_add_update(f, u.as_ref(), &[0, 2], 1.0).is_err());
    }

    /// S4: `left=[1,3,5,7]`, `right=[2,3,6]` merge to `[1,2,3,5,6,7]`, `k=6`. `left`'s backing
    /// storage must have room for `offsetl + nl + nr` entries even though only its first `nl`
    /// are meaningful going in.
    #[test]
    fn lmerge_matches_s4() {
        let mut left = vec![1, 3, 5, 7, 0, 0, 0];
        let right = vec![2, 3, 6];
        let k = lmerge(&mut left, &right, 0, 0, 4, 3).unwrap();
        assert_eq!(k, 6);
        assert_eq!(&left[..k], &[1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn lmerge_handles_disjoint_and_offsets() {
        // Offset ranges, no shared elements: left's own prefix before offsetl is untouched,
        // and the trailing capacity for the merged (possibly longer) result is pre-sized.
        let mut left = vec![99, 1, 4, 9, 0, 0];
        let right = vec![2, 5];
        let k = lmerge(&mut left, &right, 1, 0, 3, 2).unwrap();
        assert_eq!(k, 5);
        assert_eq!(left[0], 99);
        assert_eq!(&left[1..1 + k], &[1, 2, 4, 5, 9]);
    }
}
