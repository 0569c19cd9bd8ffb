use serde::Serialize;

use crate::diagnostics::{Diagnostic, DiagnosticLabel, Span};
use crate::resolve::Resolved;
use crate::store::Mismatch;
use crate::types::LowerError;

/// A user-facing type error. These are collected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, found {actual}")]
    Mismatch {
        expected: Resolved,
        actual: Resolved,
        span: Span,
        checkpoint: Option<Span>,
    },
    #[error("infinite type: {var} would have to contain itself in {ty}")]
    OccursCheck {
        var: Resolved,
        ty: Resolved,
        span: Span,
        checkpoint: Option<Span>,
    },
    #[error("record mismatch: expected {expected}, found {actual}")]
    RecordFieldMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
        expected: Resolved,
        actual: Resolved,
        span: Span,
        checkpoint: Option<Span>,
    },
}

impl TypeError {
    pub(crate) fn from_mismatch(mismatch: Mismatch, span: Span, checkpoint: Option<Span>) -> Self {
        match mismatch {
            Mismatch::Shape { expected, actual } => TypeError::Mismatch {
                expected,
                actual,
                span,
                checkpoint,
            },
            Mismatch::Occurs { var, ty } => TypeError::OccursCheck {
                var,
                ty,
                span,
                checkpoint,
            },
            Mismatch::Fields {
                missing,
                extra,
                expected,
                actual,
            } => TypeError::RecordFieldMismatch {
                missing,
                extra,
                expected,
                actual,
                span,
                checkpoint,
            },
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeError::Mismatch { span, .. }
            | TypeError::OccursCheck { span, .. }
            | TypeError::RecordFieldMismatch { span, .. } => *span,
        }
    }

    /// Region of the nearest enclosing checkpoint when the error was raised.
    pub fn checkpoint(&self) -> Option<Span> {
        match self {
            TypeError::Mismatch { checkpoint, .. }
            | TypeError::OccursCheck { checkpoint, .. }
            | TypeError::RecordFieldMismatch { checkpoint, .. } => *checkpoint,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TypeError::Mismatch { .. } => "E3001",
            TypeError::OccursCheck { .. } => "E3002",
            TypeError::RecordFieldMismatch { .. } => "E3003",
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut labels = Vec::new();
        if let TypeError::RecordFieldMismatch { missing, extra, .. } = self {
            if !missing.is_empty() {
                labels.push(DiagnosticLabel {
                    message: format!("missing fields: {}", missing.join(", ")),
                    span: self.span(),
                });
            }
            if !extra.is_empty() {
                labels.push(DiagnosticLabel {
                    message: format!("unexpected fields: {}", extra.join(", ")),
                    span: self.span(),
                });
            }
        }
        if let Some(checkpoint) = self.checkpoint() {
            labels.push(DiagnosticLabel {
                message: "in this definition".to_string(),
                span: checkpoint,
            });
        }
        Diagnostic {
            code: self.code().to_string(),
            message: self.to_string(),
            span: self.span(),
            labels,
        }
    }
}

/// Broken invariants from earlier phases. These abort the pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    #[error("internal error: no scheme for '{name}' is in scope")]
    UnboundName { name: String, span: Span },
    #[error("internal error: unknown constructor '{name}'")]
    UnknownConstructor { name: String, span: Span },
    #[error("invalid signature for '{name}': {source}")]
    InvalidSignature {
        name: String,
        #[source]
        source: LowerError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum InferError {
    /// `suppressed` counts diagnostics dropped past `max_errors`.
    #[error("{} type error(s)", .errors.len() + .suppressed)]
    Types {
        errors: Vec<TypeError>,
        suppressed: usize,
    },
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl InferError {
    pub fn type_errors(&self) -> &[TypeError] {
        match self {
            InferError::Types { errors, .. } => errors,
            _ => &[],
        }
    }
}
