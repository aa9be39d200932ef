//! A supernodal multifrontal engine for dense linear algebra over a fixed chordal sparsity
//! pattern: Cholesky factorization, its inverse (the Cholesky product), the chordal
//! projection of a matrix inverse, maximum-determinant positive-definite completion, and the
//! Hessian (and related congruence maps) of the log-det barrier.
//!
//! [`Symbolic`] holds the fixed elimination-tree/supernode layout every operation walks.
//! [`ChordalMatrix`] pairs a block-value buffer with a `Symbolic` by identity and tracks
//! whether the buffer currently holds `X` or its factor `L`. The five walks live in
//! [`drivers`], built on the shared scratch in [`workspace`] and the relative-index
//! scatter/gather in [`frontal`].

pub mod drivers;
pub mod error;
pub mod frontal;
pub mod linalg;
pub mod matrix;
pub mod symbolic;
pub mod workspace;

pub use drivers::{HessianDirection, cholesky, completion, hessian, llt, projected_inverse};
pub use error::ChordalError;
pub use frontal::lmerge;
pub use matrix::ChordalMatrix;
pub use symbolic::Symbolic;
