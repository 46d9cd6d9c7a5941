//! Semantic annotation values. No syntax or spans here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    Byte,
    Short,
}

/// A primitive or string constant. `raw` holds the constant's text form
/// (the string itself for `String`, the decimal form for numbers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub kind: LiteralKind,
    pub raw: String,
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Self { kind: LiteralKind::String, raw: s.into() }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.kind {
            LiteralKind::String => Some(&self.raw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValue {
    Literal(Literal),
    /// `descriptor` is a field descriptor, e.g. `Lcom/example/Core;` or `I`.
    TypeRef(String),
    EnumRef { declaring: String, constant: String },
    Nested(Annotation),
    Array(Vec<AnnotationValue>),
}

/// A resolved annotation: type descriptor plus members in declaration order.
/// Member names are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub descriptor: String,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub value: AnnotationValue,
}

impl Annotation {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self { descriptor: descriptor.into(), members: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        self.members.push(Member { name: name.into(), value });
        self
    }

    pub fn member(&self, name: &str) -> Option<&AnnotationValue> {
        self.members.iter().find(|m| m.name == name).map(|m| &m.value)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl AnnotationValue {
    pub fn string(s: impl Into<String>) -> Self {
        AnnotationValue::Literal(Literal::string(s))
    }

    pub fn type_ref(descriptor: impl Into<String>) -> Self {
        AnnotationValue::TypeRef(descriptor.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Literal(lit) => lit.as_str(),
            _ => None,
        }
    }

    /// Iterate the value as a list: arrays yield their elements, anything
    /// else yields itself (single-value shorthand for array members).
    pub fn elements(&self) -> std::slice::Iter<'_, AnnotationValue> {
        match self {
            AnnotationValue::Array(xs) => xs.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }
}
