//! Pending byte-span replacements for one compilation unit.
//!
//! Edits are recorded, never applied in place. The buffer is owned by the
//! unit's task; dropping it discards every pending edit.
use serde::Serialize;

use crate::error::UnitError;
use crate::source::Span;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    source_len: usize,
    edits: Vec<Edit>,
}

impl EditBuffer {
    pub fn new(source: &str) -> Self {
        Self { source_len: source.len(), edits: Vec::new() }
    }

    /// Record a replacement. Spans must be in bounds and disjoint from every
    /// pending edit.
    pub fn replace(&mut self, span: Span, replacement: impl Into<String>) -> Result<(), UnitError> {
        if span.start > span.end || span.end > self.source_len {
            return Err(UnitError::SpanOutOfBounds { span, len: self.source_len });
        }
        if let Some(existing) = self.edits.iter().find(|e| e.span.overlaps(&span) || e.span == span) {
            return Err(UnitError::EditOverlap { existing: existing.span, new: span });
        }
        self.edits.push(Edit { span, replacement: replacement.into() });
        Ok(())
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Splice every pending edit into `source`, which must be the text the
    /// buffer was created for.
    pub fn apply(&self, source: &str) -> Result<String, UnitError> {
        if source.len() != self.source_len {
            return Err(UnitError::SpanOutOfBounds {
                span: Span::new(0, self.source_len),
                len: source.len(),
            });
        }
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by_key(|e| std::cmp::Reverse(e.span.start));

        let mut out = source.to_string();
        for edit in ordered {
            if !out.is_char_boundary(edit.span.start) || !out.is_char_boundary(edit.span.end) {
                return Err(UnitError::SpanOutOfBounds { span: edit.span, len: self.source_len });
            }
            out.replace_range(edit.span.start..edit.span.end, &edit.replacement);
        }
        Ok(out)
    }
}
