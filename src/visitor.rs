//! Annotation visitor protocol.
//!
//! A flat event stream in the shape bytecode tools use for annotations:
//! `begin_annotation`, then one event per member value (`name` is `None`
//! for array elements), with nested annotations and arrays bracketed by
//! begin/end pairs, then `end_annotation`.
use crate::value::{Annotation, AnnotationValue, Literal, Member};

pub trait AnnotationVisitor {
    fn begin_annotation(&mut self, descriptor: &str);
    fn visit_primitive(&mut self, name: Option<&str>, value: &Literal);
    fn visit_type(&mut self, name: Option<&str>, descriptor: &str);
    fn visit_enum(&mut self, name: Option<&str>, declaring: &str, constant: &str);
    fn begin_nested(&mut self, name: Option<&str>, descriptor: &str);
    fn end_nested(&mut self);
    fn begin_array(&mut self, name: Option<&str>);
    fn end_array(&mut self);
    fn end_annotation(&mut self);
}

/// Drive `visitor` with the events describing `annotation`.
pub fn replay(annotation: &Annotation, visitor: &mut dyn AnnotationVisitor) {
    visitor.begin_annotation(&annotation.descriptor);
    replay_members(&annotation.members, visitor);
    visitor.end_annotation();
}

fn replay_members(members: &[Member], visitor: &mut dyn AnnotationVisitor) {
    for member in members {
        replay_value(Some(&member.name), &member.value, visitor);
    }
}

fn replay_value(name: Option<&str>, value: &AnnotationValue, visitor: &mut dyn AnnotationVisitor) {
    match value {
        AnnotationValue::Literal(lit) => visitor.visit_primitive(name, lit),
        AnnotationValue::TypeRef(desc) => visitor.visit_type(name, desc),
        AnnotationValue::EnumRef { declaring, constant } => visitor.visit_enum(name, declaring, constant),
        AnnotationValue::Nested(inner) => {
            visitor.begin_nested(name, &inner.descriptor);
            replay_members(&inner.members, visitor);
            visitor.end_nested();
        }
        AnnotationValue::Array(elems) => {
            visitor.begin_array(name);
            for elem in elems {
                replay_value(None, elem, visitor);
            }
            visitor.end_array();
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TREE BUILDER
// ————————————————————————————————————————————————————————————————————————————

enum Frame {
    Annotation { name: Option<String>, annotation: Annotation },
    Array { name: Option<String>, elems: Vec<AnnotationValue> },
}

/// Rebuilds an [`Annotation`] from protocol events. Every call produces a
/// fresh tree; misuse of the protocol is recorded and reported by
/// [`TreeBuilder::finish`].
#[derive(Default)]
pub struct TreeBuilder {
    stack: Vec<Frame>,
    done: Option<Annotation>,
    error: Option<String>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    fn push_value(&mut self, name: Option<&str>, value: AnnotationValue) {
        let problem = match self.stack.last_mut() {
            Some(Frame::Annotation { annotation, .. }) => match name {
                None => Some("unnamed value inside an annotation".to_string()),
                Some(name) if annotation.members.iter().any(|m| m.name == name) => {
                    Some(format!("member `{name}` emitted twice"))
                }
                Some(name) => {
                    annotation.members.push(Member { name: name.to_string(), value });
                    None
                }
            },
            Some(Frame::Array { elems, .. }) => {
                if name.is_some() {
                    Some("named value inside an array".to_string())
                } else {
                    elems.push(value);
                    None
                }
            }
            None => Some("value outside of any annotation".to_string()),
        };
        if let Some(problem) = problem {
            self.fail(problem);
        }
    }

    pub fn finish(self) -> Result<Annotation, String> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.stack.is_empty() {
            return Err("annotation was not closed".into());
        }
        self.done.ok_or_else(|| "no annotation was emitted".to_string())
    }
}

impl AnnotationVisitor for TreeBuilder {
    fn begin_annotation(&mut self, descriptor: &str) {
        if !self.stack.is_empty() || self.done.is_some() {
            return self.fail("annotation begun twice");
        }
        self.stack.push(Frame::Annotation { name: None, annotation: Annotation::new(descriptor) });
    }

    fn visit_primitive(&mut self, name: Option<&str>, value: &Literal) {
        self.push_value(name, AnnotationValue::Literal(value.clone()));
    }

    fn visit_type(&mut self, name: Option<&str>, descriptor: &str) {
        self.push_value(name, AnnotationValue::TypeRef(descriptor.to_string()));
    }

    fn visit_enum(&mut self, name: Option<&str>, declaring: &str, constant: &str) {
        self.push_value(name, AnnotationValue::EnumRef {
            declaring: declaring.to_string(),
            constant: constant.to_string(),
        });
    }

    fn begin_nested(&mut self, name: Option<&str>, descriptor: &str) {
        if self.stack.is_empty() {
            return self.fail("nested annotation outside of any annotation");
        }
        self.stack.push(Frame::Annotation {
            name: name.map(str::to_string),
            annotation: Annotation::new(descriptor),
        });
    }

    fn end_nested(&mut self) {
        match self.stack.pop() {
            Some(Frame::Annotation { name, annotation }) if !self.stack.is_empty() => {
                self.push_value(name.as_deref(), AnnotationValue::Nested(annotation));
            }
            _ => self.fail("unbalanced end_nested"),
        }
    }

    fn begin_array(&mut self, name: Option<&str>) {
        if self.stack.is_empty() {
            return self.fail("array outside of any annotation");
        }
        self.stack.push(Frame::Array { name: name.map(str::to_string), elems: Vec::new() });
    }

    fn end_array(&mut self) {
        match self.stack.pop() {
            Some(Frame::Array { name, elems }) => {
                self.push_value(name.as_deref(), AnnotationValue::Array(elems));
            }
            _ => self.fail("unbalanced end_array"),
        }
    }

    fn end_annotation(&mut self) {
        match self.stack.pop() {
            Some(Frame::Annotation { annotation, .. }) if self.stack.is_empty() => {
                self.done = Some(annotation);
            }
            _ => self.fail("unbalanced end_annotation"),
        }
    }
}
