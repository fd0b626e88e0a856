// error.rs — Fatal emission errors
//
// Conditions that make the generated text meaningless abort the pass with an
// `EmitError`. Tolerated mismatches (an early-exit guard of an unrecognised
// shape) are not errors; they surface as warning diagnostics instead.

use thiserror::Error;

use crate::diag::{codes, Diagnostic, SourceLoc};
use crate::id::{KernelId, StmtId};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("array `{array}` has a fixed-size multi-dimensional layout and cannot be passed as an argument")]
    UnsupportedLayout {
        array: String,
        loc: Option<SourceLoc>,
    },

    #[error("user node `{call}` carries no annotation")]
    MissingAnnotation { call: String },

    #[error("no kernel with id {0}")]
    UnknownKernel(KernelId),

    #[error("no kernel statement {0}")]
    UnknownStmt(StmtId),

    #[error("no array named `{0}`")]
    UnknownArray(String),

    #[error("break statement {brk} refers to {target}, which is not a domain statement")]
    BreakTarget { brk: StmtId, target: StmtId },

    #[error("array `{array}` has {n_index} index dimensions but {bounds} bounds")]
    BoundMismatch {
        array: String,
        n_index: usize,
        bounds: usize,
    },

    #[error("invalid emission bundle: {0}")]
    Bundle(#[from] serde_json::Error),
}

impl EmitError {
    /// Render as a diagnostic with a stable code.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let d = Diagnostic::error(self.to_string());
        match self {
            EmitError::UnsupportedLayout { loc, .. } => d
                .with_code(codes::E0300)
                .with_loc(*loc)
                .with_hint("mark the array `linearize` so it is passed as a flat pointer"),
            EmitError::MissingAnnotation { .. } => d.with_code(codes::E0200),
            EmitError::UnknownKernel(_) => d.with_code(codes::E0201),
            EmitError::UnknownStmt(_) => d.with_code(codes::E0202),
            EmitError::UnknownArray(_) => d.with_code(codes::E0203),
            EmitError::BreakTarget { .. } => d.with_code(codes::E0204),
            EmitError::BoundMismatch { .. } => d
                .with_code(codes::E0205)
                .with_hint("list one bound per index dimension"),
            EmitError::Bundle(_) => d.with_code(codes::E0100),
        }
    }
}
