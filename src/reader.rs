use std::collections::HashSet;

use crate::binding::{ResolvedAnnotation, ResolvedValue};
use crate::descriptor::descriptor_of;
use crate::error::DeclarationError;
use crate::value::{Annotation, AnnotationValue, Literal, LiteralKind, Member};

/// Lower a resolved annotation into semantic values, keeping member and
/// element order exactly as declared.
pub fn read_annotation(resolved: &ResolvedAnnotation) -> Result<Annotation, DeclarationError> {
    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(resolved.members.len());
    for (name, value) in &resolved.members {
        if !seen.insert(name.as_str()) {
            return Err(DeclarationError::InvalidValue(format!(
                "duplicate member `{name}` in @{}",
                resolved.type_name
            )));
        }
        members.push(Member { name: name.clone(), value: read_value(value)? });
    }
    Ok(Annotation {
        descriptor: descriptor_of(&resolved.type_name),
        members,
    })
}

fn literal(kind: LiteralKind, raw: impl ToString) -> AnnotationValue {
    AnnotationValue::Literal(Literal { kind, raw: raw.to_string() })
}

pub fn read_value(value: &ResolvedValue) -> Result<AnnotationValue, DeclarationError> {
    Ok(match value {
        ResolvedValue::String(s) => literal(LiteralKind::String, s),
        ResolvedValue::Int(x) => literal(LiteralKind::Int, x),
        ResolvedValue::Long(x) => literal(LiteralKind::Long, x),
        ResolvedValue::Float(x) => literal(LiteralKind::Float, x),
        ResolvedValue::Double(x) => literal(LiteralKind::Double, x),
        ResolvedValue::Boolean(x) => literal(LiteralKind::Bool, x),
        ResolvedValue::Char(x) => literal(LiteralKind::Char, x),
        ResolvedValue::Byte(x) => literal(LiteralKind::Byte, x),
        ResolvedValue::Short(x) => literal(LiteralKind::Short, x),
        ResolvedValue::Class(name) => {
            if name.trim().is_empty() {
                return Err(DeclarationError::InvalidValue("empty class literal".into()));
            }
            AnnotationValue::TypeRef(descriptor_of(name))
        }
        ResolvedValue::Enum { declaring, constant } => AnnotationValue::EnumRef {
            declaring: descriptor_of(declaring),
            constant: constant.clone(),
        },
        ResolvedValue::Annotation(inner) => AnnotationValue::Nested(read_annotation(inner)?),
        ResolvedValue::Array(xs) => AnnotationValue::Array(
            xs.iter().map(read_value).collect::<Result<Vec<_>, _>>()?,
        ),
    })
}
