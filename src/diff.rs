//! Leaf-level differences between the remapped and unmapped renderings.
//!
//! Nested annotations are correlated by member name (the transformer may
//! reorder members), arrays strictly by index.
use serde::Serialize;
use std::fmt;

use crate::error::DeclarationError;
use crate::render::{Leaf, Rendered, RenderedAnnotation};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Member(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafDiff {
    #[serde(serialize_with = "serialize_path")]
    pub path: Vec<PathSegment>,
    pub old: Leaf,
    pub new: Leaf,
}

/// Renders a path as `at.target` or `method[0]`.
pub struct DisplayPath<'a>(pub &'a [PathSegment]);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ix, seg) in self.0.iter().enumerate() {
            match seg {
                PathSegment::Member(name) if ix == 0 => write!(f, "{name}")?,
                PathSegment::Member(name) => write!(f, ".{name}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

fn serialize_path<S: serde::Serializer>(path: &[PathSegment], s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&DisplayPath(path))
}

impl LeafDiff {
    pub fn display_path(&self) -> DisplayPath<'_> {
        DisplayPath(&self.path)
    }
}

/// Every leaf whose remapped value differs from its unmapped value, in the
/// remapped rendering's traversal order.
pub fn diff(
    remapped: &RenderedAnnotation,
    unmapped: &RenderedAnnotation,
) -> Result<Vec<LeafDiff>, DeclarationError> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    diff_annotation(remapped, unmapped, &mut path, &mut out)?;
    Ok(out)
}

fn shape_error(path: &[PathSegment], detail: impl Into<String>) -> DeclarationError {
    DeclarationError::ShapeMismatch {
        path: DisplayPath(path).to_string(),
        detail: detail.into(),
    }
}

fn diff_annotation(
    remapped: &RenderedAnnotation,
    unmapped: &RenderedAnnotation,
    path: &mut Vec<PathSegment>,
    out: &mut Vec<LeafDiff>,
) -> Result<(), DeclarationError> {
    if remapped.members.len() != unmapped.members.len() {
        return Err(shape_error(path, format!(
            "{} members against {}",
            remapped.members.len(),
            unmapped.members.len()
        )));
    }
    for (name, new) in &remapped.members {
        let Some(old) = unmapped.members.get(name) else {
            return Err(shape_error(path, format!("member `{name}` missing from unmapped rendering")));
        };
        path.push(PathSegment::Member(name.clone()));
        diff_node(new, old, path, out)?;
        path.pop();
    }
    Ok(())
}

fn diff_node(
    new: &Rendered,
    old: &Rendered,
    path: &mut Vec<PathSegment>,
    out: &mut Vec<LeafDiff>,
) -> Result<(), DeclarationError> {
    match (new, old) {
        (Rendered::Leaf(n), Rendered::Leaf(o)) => {
            if n != o {
                out.push(LeafDiff { path: path.clone(), old: o.clone(), new: n.clone() });
            }
            Ok(())
        }
        (Rendered::Nested(n), Rendered::Nested(o)) => diff_annotation(n, o, path, out),
        (Rendered::Array(n), Rendered::Array(o)) => {
            if n.len() != o.len() {
                return Err(shape_error(path, format!("array of {} against {}", n.len(), o.len())));
            }
            for (ix, (n, o)) in n.iter().zip(o).enumerate() {
                path.push(PathSegment::Index(ix));
                diff_node(n, o, path, out)?;
                path.pop();
            }
            Ok(())
        }
        _ => Err(shape_error(path, format!("{} against {}", kind_name(new), kind_name(old)))),
    }
}

fn kind_name(node: &Rendered) -> &'static str {
    match node {
        Rendered::Leaf(_) => "leaf",
        Rendered::Nested(_) => "annotation",
        Rendered::Array(_) => "array",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Annotation, AnnotationValue, Literal, LiteralKind};

    fn int(v: &str) -> AnnotationValue {
        AnnotationValue::Literal(Literal { kind: LiteralKind::Int, raw: v.into() })
    }

    fn strings(xs: &[&str]) -> AnnotationValue {
        AnnotationValue::Array(xs.iter().map(|s| AnnotationValue::string(*s)).collect())
    }

    #[test]
    fn reordered_members_correlate_by_name() {
        let unmapped = RenderedAnnotation::from(Annotation::new("LA;").with("foo", int("1")).with("bar", int("2")));
        let remapped = RenderedAnnotation::from(Annotation::new("LA;").with("bar", int("2")).with("foo", int("9")));
        let diffs = diff(&remapped, &unmapped).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path, [PathSegment::Member("foo".into())]);
        assert_eq!(diffs[0].old.to_string(), "\"1\"");
        assert_eq!(diffs[0].new.to_string(), "\"9\"");
    }

    #[test]
    fn arrays_correlate_by_index() {
        let unmapped = RenderedAnnotation::from(Annotation::new("LA;").with("xs", strings(&["a", "b", "c"])));
        let remapped = RenderedAnnotation::from(Annotation::new("LA;").with("xs", strings(&["x", "b", "c"])));
        let diffs = diff(&remapped, &unmapped).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].display_path().to_string(), "xs[0]");
        assert_eq!(diffs[0].new.as_str(), Some("x"));
    }

    #[test]
    fn nested_paths_and_identical_renderings() {
        let build = |t: &str| {
            RenderedAnnotation::from(Annotation::new("LI;").with(
                "at",
                AnnotationValue::Nested(Annotation::new("LAt;").with("target", AnnotationValue::string(t))),
            ))
        };
        let diffs = diff(&build("LO;b()V"), &build("LO;a()V")).unwrap();
        assert_eq!(diffs[0].display_path().to_string(), "at.target");
        assert_eq!(
            serde_json::to_value(&diffs[0]).unwrap(),
            serde_json::json!({
                "path": "at.target",
                "old": {"form": "literal", "kind": "string", "raw": "LO;a()V"},
                "new": {"form": "literal", "kind": "string", "raw": "LO;b()V"},
            })
        );
        assert!(diff(&build("LO;a()V"), &build("LO;a()V")).unwrap().is_empty());
    }

    #[test]
    fn structural_disagreement_is_a_shape_mismatch() {
        let a = RenderedAnnotation::from(Annotation::new("LA;").with("xs", strings(&["a", "b"])));
        let b = RenderedAnnotation::from(Annotation::new("LA;").with("xs", strings(&["a"])));
        assert!(matches!(diff(&a, &b), Err(DeclarationError::ShapeMismatch { .. })));

        let c = RenderedAnnotation::from(Annotation::new("LA;").with("ys", strings(&["a", "b"])));
        assert!(matches!(diff(&a, &c), Err(DeclarationError::ShapeMismatch { .. })));

        let d = RenderedAnnotation::from(Annotation::new("LA;").with("xs", AnnotationValue::string("a")));
        let Err(DeclarationError::ShapeMismatch { path, .. }) = diff(&a, &d) else { panic!() };
        assert_eq!(path, "xs");
    }
}
