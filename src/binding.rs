//! Resolved input handed to the pass by the front end.
//!
//! These types mirror what a compiler front end exposes after name
//! resolution: binary names instead of descriptors, constant-folded values,
//! and the byte span of each annotation's text inside its compilation unit.
//! They are serde-loadable so unit jobs can be fed from JSON.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::source::Span;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub path: PathBuf,
    pub source: String,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

/// An annotated declaration (usually a method of a mixin class).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    #[serde(default)]
    pub descriptor: Option<String>,
    /// `None` when the owning type could not be resolved on the classpath.
    #[serde(default)]
    pub owner: Option<ClassBinding>,
    #[serde(default)]
    pub annotations: Vec<AnnotationSite>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassBinding {
    /// Binary name, e.g. `com.example.mixin.CoreMixin`.
    pub binary_name: String,
    #[serde(default)]
    pub annotations: Vec<ResolvedAnnotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSite {
    /// Byte range of the annotation text, starting at its `@`.
    pub span: Span,
    pub binding: ResolvedAnnotation,
}

/// Declared member-value pairs only; defaults are not materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAnnotation {
    pub type_name: String,
    #[serde(default)]
    pub members: Vec<(String, ResolvedValue)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResolvedValue {
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    /// Binary name of a class literal; primitives and `[]` suffixes allowed.
    Class(String),
    Enum { declaring: String, constant: String },
    Annotation(ResolvedAnnotation),
    Array(Vec<ResolvedValue>),
}

impl ResolvedAnnotation {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), members: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: ResolvedValue) -> Self {
        self.members.push((name.into(), value));
        self
    }
}
