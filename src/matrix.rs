//! The numeric matrix: a flat block-value buffer over a [`Symbolic`] layout, plus the
//! `is_factor` flag that tracks whether the buffer currently holds `X` or `L`.

use std::sync::Arc;

use problemo::Problem;

use crate::error::ChordalError;
use crate::symbolic::Symbolic;

/// A chordal matrix's block-value buffer, tied to a symbolic layout by identity.
///
/// Two matrices are considered to share a pattern only if their [`Symbolic`] handles point
/// to the same allocation ([`Arc::ptr_eq`]) — structural equality of two independently built
/// layouts is not enough, matching the source's dynamically-typed identity check (see
/// `DESIGN.md`).
#[derive(Debug, Clone)]
pub struct ChordalMatrix {
    symb: Arc<Symbolic>,
    blkval: Vec<f64>,
    is_factor: bool,
}

impl ChordalMatrix {
    /// Wraps a block-value buffer for `symb`. `is_factor` records whether `blkval` currently
    /// holds `X` (`false`) or `L` (`true`).
    pub fn new(symb: Arc<Symbolic>, blkval: Vec<f64>, is_factor: bool) -> Result<Self, Problem> {
        if blkval.len() != symb.blkval_len() {
            return Err(ChordalError::ShapeMismatch.into());
        }
        Ok(Self {
            symb,
            blkval,
            is_factor,
        })
    }

    /// A zeroed matrix of the shape implied by `symb`, with `is_factor = false`.
    pub fn zeros(symb: Arc<Symbolic>) -> Self {
        let len = symb.blkval_len();
        Self {
            symb,
            blkval: vec![0.0; len],
            is_factor: false,
        }
    }

    pub fn symb(&self) -> &Arc<Symbolic> {
        &self.symb
    }

    /// True if two matrices were built from the *same* symbolic layout allocation.
    pub fn shares_pattern_with(&self, other: &ChordalMatrix) -> bool {
        Arc::ptr_eq(&self.symb, &other.symb)
    }

    pub fn is_factor(&self) -> bool {
        self.is_factor
    }

    pub(crate) fn set_factor(&mut self, is_factor: bool) {
        self.is_factor = is_factor;
    }

    pub fn blkval(&self) -> &[f64] {
        &self.blkval
    }

    pub fn blkval_mut(&mut self) -> &mut [f64] {
        &mut self.blkval
    }

    /// The `Nk x nk` column-major dense panel owned by supernode `k`.
    pub fn block(&self, k: usize) -> &[f64] {
        &self.blkval[self.symb.block_range(k)]
    }

    pub fn block_mut(&mut self, k: usize) -> &mut [f64] {
        let range = self.symb.block_range(k);
        &mut self.blkval[range]
    }

    pub(crate) fn require_factor(&self, expected: bool) -> Result<(), Problem> {
        if self.is_factor != expected {
            return Err(ChordalError::FlagMismatch.into());
        }
        Ok(())
    }
}
