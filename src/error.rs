//! The error taxonomy shared by every component in this crate.
//!
//! Every kind named in the design is a programming error: callers above this
//! layer are expected to validate their inputs, and none of these are meant
//! to be recovered from locally. They surface immediately via `?`.

use snafu::Snafu;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("unknown type: {}", type_name))]
    UnknownType { type_name: String },

    #[snafu(display("type mismatch: {}", detail))]
    TypeMismatch { detail: String },

    #[snafu(display(
        "arity mismatch: row has {} values but chunk has {} columns",
        row_len,
        column_count
    ))]
    ArityMismatch { row_len: usize, column_count: usize },

    #[snafu(display("out of range: index {} but size is {}", index, size))]
    OutOfRange { index: usize, size: usize },

    #[snafu(display("invariant violated: {}", detail))]
    InvariantViolated { detail: String },

    #[snafu(display(
        "overflow: value id {} exceeds attribute vector width ({} bytes)",
        value_id,
        width
    ))]
    Overflow { value_id: u32, width: u8 },

    #[snafu(display("immutable: {} segments do not accept append", segment_kind))]
    Immutable { segment_kind: &'static str },

    #[snafu(display("not ready: input operator has not been executed"))]
    NotReady,

    #[snafu(display("no output: operator has not been executed yet"))]
    NoOutput,

    #[snafu(display("operator has already been executed"))]
    AlreadyExecuted,
}
