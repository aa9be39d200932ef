use derive_more::{Display, Error};

/// Errors raised by the chordal matrix engine: one variant per failure mode named by the
/// engine's contract, surfaced uniformly through [`problemo::Problem`] at call sites via
/// `.via(...)`/`.ok_or(...)`.
#[derive(Debug, Display, Error, PartialEq)]
pub enum ChordalError {
    #[display("malformed symbolic factorization")]
    MalformedSymbolic,

    #[display("numeric matrix flag is not in the state required by this operation")]
    FlagMismatch,

    #[display("numeric matrix block buffer length does not match its symbolic layout")]
    ShapeMismatch,

    #[display("operands do not share the same symbolic factorization")]
    SymbolIdentityMismatch,

    #[display("workspace memory allocation failed")]
    Allocation,

    #[display("supernode pivot was not positive definite")]
    NotPositiveDefinite,

    #[display("factor block was singular")]
    Singular,
}
