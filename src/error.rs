use thiserror::Error;

use crate::source::{ParseError, Span};

/// Failures scoped to one declaration. The declaration is left unpatched
/// and processing continues with the next one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("rendered trees differ in shape at `{path}`: {detail}")]
    ShapeMismatch { path: String, detail: String },

    #[error("source annotation does not correlate with resolved value at `{path}`: {detail}")]
    SourceMismatch { path: String, detail: String },

    #[error("annotation source could not be parsed: {0}")]
    SourceSyntax(#[from] ParseError),

    #[error("invalid resolved value: {0}")]
    InvalidValue(String),

    #[error("transformer broke the visitor protocol: {0}")]
    RenderProtocol(String),
}

/// A single leaf whose source expression cannot be rewritten. Only that
/// leaf's patch is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot rewrite `{path}`: found {found}")]
pub struct UnsupportedLeafForm {
    pub path: String,
    pub found: String,
}

/// Fatal for the whole compilation unit; its pending edits are discarded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("owning type of `{declaration}` cannot be resolved on the classpath")]
    UnresolvedClasspath { declaration: String },

    #[error("edit {new:?} overlaps pending edit {existing:?}")]
    EditOverlap { existing: Span, new: Span },

    #[error("span {span:?} is outside the source text (length {len})")]
    SpanOutOfBounds { span: Span, len: usize },
}

impl DeclarationError {
    /// Stable snake_case label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            DeclarationError::ShapeMismatch { .. } => "shape_mismatch",
            DeclarationError::SourceMismatch { .. } => "source_mismatch",
            DeclarationError::SourceSyntax(_) => "source_syntax",
            DeclarationError::InvalidValue(_) => "invalid_value",
            DeclarationError::RenderProtocol(_) => "render_protocol",
        }
    }
}
