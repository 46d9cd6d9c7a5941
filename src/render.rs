//! Dual rendering: push one annotation through the renaming transformer
//! twice, once with the real oracle and once with the identity oracle,
//! and capture what the transformer emits each time.
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::DeclarationError;
use crate::oracle::{IdentityRemapper, Remapper};
use crate::value::{Annotation, AnnotationValue, Literal};
use crate::visitor::{replay, AnnotationVisitor, TreeBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Remapped,
    Identity,
}

/// The renaming transformer, seen through the visitor protocol: given an
/// oracle and a downstream visitor, returns the visitor to feed events into.
/// Implementations hold no per-call state, so one instance serves every
/// rendering.
pub trait RemapTransformer: Sync {
    fn wrap<'a>(
        &'a self,
        remapper: &'a dyn Remapper,
        downstream: &'a mut dyn AnnotationVisitor,
    ) -> Box<dyn AnnotationVisitor + 'a>;
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERED TREE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Leaf {
    Literal(Literal),
    Type { descriptor: String },
    Enum { declaring: String, constant: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Rendered {
    Leaf(Leaf),
    Nested(RenderedAnnotation),
    Array(Vec<Rendered>),
}

/// Members keyed by name; insertion order is the order the transformer
/// emitted them, which need not match source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedAnnotation {
    pub descriptor: String,
    pub members: IndexMap<String, Rendered>,
}

impl Leaf {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Leaf::Literal(lit) => lit.as_str(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leaf::Literal(lit) => write!(f, "{:?}", lit.raw),
            Leaf::Type { descriptor } => write!(f, "{descriptor}.class"),
            Leaf::Enum { declaring, constant } => write!(f, "{declaring}.{constant}"),
        }
    }
}

impl From<Annotation> for RenderedAnnotation {
    fn from(annotation: Annotation) -> Self {
        Self {
            descriptor: annotation.descriptor,
            members: annotation
                .members
                .into_iter()
                .map(|m| (m.name, Rendered::from(m.value)))
                .collect(),
        }
    }
}

impl From<AnnotationValue> for Rendered {
    fn from(value: AnnotationValue) -> Self {
        match value {
            AnnotationValue::Literal(lit) => Rendered::Leaf(Leaf::Literal(lit)),
            AnnotationValue::TypeRef(descriptor) => Rendered::Leaf(Leaf::Type { descriptor }),
            AnnotationValue::EnumRef { declaring, constant } => {
                Rendered::Leaf(Leaf::Enum { declaring, constant })
            }
            AnnotationValue::Nested(inner) => Rendered::Nested(inner.into()),
            AnnotationValue::Array(elems) => Rendered::Array(elems.into_iter().map(Rendered::from).collect()),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

pub fn render(
    annotation: &Annotation,
    mode: RenderMode,
    oracle: &dyn Remapper,
    transformer: &dyn RemapTransformer,
) -> Result<RenderedAnnotation, DeclarationError> {
    let identity = IdentityRemapper;
    let remapper: &dyn Remapper = match mode {
        RenderMode::Remapped => oracle,
        RenderMode::Identity => &identity,
    };

    let mut capture = TreeBuilder::new();
    {
        let mut visitor = transformer.wrap(remapper, &mut capture);
        replay(annotation, visitor.as_mut());
    }
    capture
        .finish()
        .map(RenderedAnnotation::from)
        .map_err(|detail| DeclarationError::RenderProtocol(format!("{mode:?} rendering: {detail}")))
}

/// `(remapped, unmapped)` renderings of the same input.
pub fn render_pair(
    annotation: &Annotation,
    oracle: &dyn Remapper,
    transformer: &dyn RemapTransformer,
) -> Result<(RenderedAnnotation, RenderedAnnotation), DeclarationError> {
    let remapped = render(annotation, RenderMode::Remapped, oracle, transformer)?;
    let unmapped = render(annotation, RenderMode::Identity, oracle, transformer)?;
    Ok((remapped, unmapped))
}

/// Forwards every event untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl RemapTransformer for PassThrough {
    fn wrap<'a>(
        &'a self,
        _remapper: &'a dyn Remapper,
        downstream: &'a mut dyn AnnotationVisitor,
    ) -> Box<dyn AnnotationVisitor + 'a> {
        Box::new(Forward(downstream))
    }
}

struct Forward<'a>(&'a mut dyn AnnotationVisitor);

impl AnnotationVisitor for Forward<'_> {
    fn begin_annotation(&mut self, descriptor: &str) {
        self.0.begin_annotation(descriptor)
    }
    fn visit_primitive(&mut self, name: Option<&str>, value: &Literal) {
        self.0.visit_primitive(name, value)
    }
    fn visit_type(&mut self, name: Option<&str>, descriptor: &str) {
        self.0.visit_type(name, descriptor)
    }
    fn visit_enum(&mut self, name: Option<&str>, declaring: &str, constant: &str) {
        self.0.visit_enum(name, declaring, constant)
    }
    fn begin_nested(&mut self, name: Option<&str>, descriptor: &str) {
        self.0.begin_nested(name, descriptor)
    }
    fn end_nested(&mut self) {
        self.0.end_nested()
    }
    fn begin_array(&mut self, name: Option<&str>) {
        self.0.begin_array(name)
    }
    fn end_array(&mut self) {
        self.0.end_array()
    }
    fn end_annotation(&mut self) {
        self.0.end_annotation()
    }
}
