//! Maps leaf differences back onto the annotation text and records
//! replacement literals in the unit's edit buffer.
use crate::diff::{DisplayPath, LeafDiff, PathSegment};
use crate::edit::EditBuffer;
use crate::error::{DeclarationError, UnitError, UnsupportedLeafForm};
use crate::render::{Leaf, Rendered, RenderedAnnotation};
use crate::source::literal::quote;
use crate::source::{Expr, ExprKind, SourceAnnotation};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub applied: usize,
    pub skipped: Vec<UnsupportedLeafForm>,
}

// ————————————————————————————————————————————————————————————————————————————
// CORRELATION
// ————————————————————————————————————————————————————————————————————————————

/// Confirm that the written annotation has the structure of the resolved
/// one: same member names at every annotation level, same array lengths,
/// and string constants that fold to the resolved strings. A single
/// expression where an array is expected stands for a one-element array.
pub fn check_correlation(source: &SourceAnnotation, unmapped: &RenderedAnnotation) -> Result<(), DeclarationError> {
    let mut path = Vec::new();
    correlate_annotation(source, unmapped, &mut path)
}

fn mismatch(path: &[PathSegment], detail: impl Into<String>) -> DeclarationError {
    DeclarationError::SourceMismatch {
        path: DisplayPath(path).to_string(),
        detail: detail.into(),
    }
}

fn correlate_annotation(
    source: &SourceAnnotation,
    rendered: &RenderedAnnotation,
    path: &mut Vec<PathSegment>,
) -> Result<(), DeclarationError> {
    if source.pairs.len() != rendered.members.len() {
        return Err(mismatch(path, format!(
            "@{} has {} members in source, {} resolved",
            source.simple_name(),
            source.pairs.len(),
            rendered.members.len()
        )));
    }
    for pair in &source.pairs {
        let Some(node) = rendered.members.get(&pair.name) else {
            return Err(mismatch(path, format!("member `{}` was not resolved", pair.name)));
        };
        path.push(PathSegment::Member(pair.name.clone()));
        correlate_node(&pair.value, node, path)?;
        path.pop();
    }
    Ok(())
}

fn correlate_node(expr: &Expr, node: &Rendered, path: &mut Vec<PathSegment>) -> Result<(), DeclarationError> {
    let expr = expr.unparen();
    match (&expr.kind, node) {
        (ExprKind::Array(elems), Rendered::Array(nodes)) => {
            if elems.len() != nodes.len() {
                return Err(mismatch(path, format!(
                    "array initializer has {} elements, {} resolved",
                    elems.len(),
                    nodes.len()
                )));
            }
            for (ix, (elem, node)) in elems.iter().zip(nodes).enumerate() {
                path.push(PathSegment::Index(ix));
                correlate_node(elem, node, path)?;
                path.pop();
            }
            Ok(())
        }
        (_, Rendered::Array(nodes)) => match nodes.as_slice() {
            [single] => {
                path.push(PathSegment::Index(0));
                correlate_node(expr, single, path)?;
                path.pop();
                Ok(())
            }
            _ => Err(mismatch(path, format!("{} where {} values were resolved", expr.describe(), nodes.len()))),
        },
        (ExprKind::Annotation(inner), Rendered::Nested(nested)) => correlate_annotation(inner, nested, path),
        (ExprKind::Array(_) | ExprKind::Annotation(_), _) | (_, Rendered::Nested(_)) => {
            Err(mismatch(path, format!("{} does not match the resolved value", expr.describe())))
        }
        (_, Rendered::Leaf(leaf)) => correlate_leaf(expr, leaf, path),
    }
}

fn correlate_leaf(expr: &Expr, leaf: &Leaf, path: &[PathSegment]) -> Result<(), DeclarationError> {
    let Some(folded) = expr.fold_string() else {
        // Named constants and non-string literals are not checked further.
        return Ok(());
    };
    match leaf.as_str() {
        Some(resolved) if resolved == folded => Ok(()),
        Some(resolved) => Err(mismatch(path, format!("source folds to {folded:?}, resolved {resolved:?}"))),
        None => Err(mismatch(path, format!("string in source, resolved {leaf}"))),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATCHING
// ————————————————————————————————————————————————————————————————————————————

enum Cursor<'a> {
    Annotation(&'a SourceAnnotation),
    Expr(&'a Expr),
}

fn locate<'a>(source: &'a SourceAnnotation, path: &[PathSegment]) -> Option<&'a Expr> {
    let mut cursor = Cursor::Annotation(source);
    for seg in path {
        cursor = match (cursor, seg) {
            (Cursor::Annotation(ann), PathSegment::Member(name)) => Cursor::Expr(&ann.pair(name)?.value),
            (Cursor::Expr(expr), PathSegment::Member(name)) => match &expr.unparen().kind {
                ExprKind::Annotation(ann) => Cursor::Expr(&ann.pair(name)?.value),
                _ => return None,
            },
            (Cursor::Expr(expr), PathSegment::Index(ix)) => match &expr.unparen().kind {
                ExprKind::Array(elems) => Cursor::Expr(elems.get(*ix)?),
                _ if *ix == 0 => Cursor::Expr(expr),
                _ => return None,
            },
            (Cursor::Annotation(_), PathSegment::Index(_)) => return None,
        };
    }
    match cursor {
        Cursor::Expr(expr) => Some(expr),
        Cursor::Annotation(_) => None,
    }
}

/// Record one replacement per rewritable diff. A diff whose source
/// expression is not a string constant is skipped and reported; edit
/// buffer violations are fatal for the unit.
pub fn apply(source: &SourceAnnotation, diffs: &[LeafDiff], edits: &mut EditBuffer) -> Result<PatchReport, UnitError> {
    let mut report = PatchReport::default();
    for diff in diffs {
        let skip = |found: &str| UnsupportedLeafForm {
            path: diff.display_path().to_string(),
            found: found.to_string(),
        };
        let Some(expr) = locate(source, &diff.path) else {
            report.skipped.push(skip("no matching source expression"));
            continue;
        };
        let rewritable = matches!(expr.unparen().kind, ExprKind::Str(_) | ExprKind::Concat(_));
        match diff.new.as_str() {
            Some(new) if rewritable => {
                edits.replace(expr.span, quote(new))?;
                report.applied += 1;
            }
            Some(_) => report.skipped.push(skip(expr.describe())),
            None => report.skipped.push(skip(&format!("{} for {}", expr.describe(), diff.new))),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::mixin::{MixinContext, MixinTransformer};
    use crate::oracle::MappingSet;
    use crate::render::render_pair;
    use crate::source::parse_annotation;
    use crate::value::{Annotation, AnnotationValue};

    const INJECT: &str = "Lorg/spongepowered/asm/mixin/injection/Inject;";
    const AT: &str = "Lorg/spongepowered/asm/mixin/injection/At;";

    fn run(text: &str, resolved: &Annotation, oracle: &MappingSet) -> (String, PatchReport) {
        let start = text.find('@').unwrap();
        let source = parse_annotation(text, start).unwrap();
        let transformer = MixinTransformer::new(MixinContext::new(["Owner"]));
        let (remapped, unmapped) = render_pair(resolved, oracle, &transformer).unwrap();
        check_correlation(&source, &unmapped).unwrap();
        let diffs = diff(&remapped, &unmapped).unwrap();
        let mut edits = EditBuffer::new(text);
        let report = apply(&source, &diffs, &mut edits).unwrap();
        (edits.apply(text).unwrap(), report)
    }

    fn inject(methods: &[&str], target: &str) -> Annotation {
        Annotation::new(INJECT)
            .with("method", AnnotationValue::Array(methods.iter().map(|m| AnnotationValue::string(*m)).collect()))
            .with("at", AnnotationValue::Nested(Annotation::new(AT).with("target", AnnotationValue::string(target))))
    }

    #[test]
    fn rewrites_only_the_changed_literals() {
        let text = "    @Inject(method=\"a()V\", at=@At(target=\"LOwner;a()V\"))\n    void hook() {}";
        let oracle = MappingSet::new().method("Owner", "a", "()V", "b");
        let (patched, report) = run(text, &inject(&["a()V"], "LOwner;a()V"), &oracle);
        assert_eq!(patched, "    @Inject(method=\"b()V\", at=@At(target=\"LOwner;b()V\"))\n    void hook() {}");
        assert_eq!(report.applied, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn array_elements_patch_by_index() {
        let text = "@Inject(method = {\"a()V\", \"b()V\", \"c()V\"}, at = @At(target = \"LOwner;c()V\"))";
        let oracle = MappingSet::new().method("Owner", "a", "()V", "x");
        let (patched, report) = run(text, &inject(&["a()V", "b()V", "c()V"], "LOwner;c()V"), &oracle);
        assert_eq!(patched, "@Inject(method = {\"x()V\", \"b()V\", \"c()V\"}, at = @At(target = \"LOwner;c()V\"))");
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn concatenation_is_replaced_by_one_literal() {
        let text = "@Inject(method = (\"a\" + \"()V\"), at = @At(target = \"LOwner;\" + \"a()V\"))";
        let oracle = MappingSet::new().method("Owner", "a", "()V", "b");
        let (patched, _) = run(text, &inject(&["a()V"], "LOwner;a()V"), &oracle);
        assert_eq!(patched, "@Inject(method = \"b()V\", at = @At(target = \"LOwner;b()V\"))");
    }

    #[test]
    fn named_constants_are_skipped_not_rewritten() {
        let text = "@Inject(method = Names.HOOK, at = @At(target = \"LOwner;a()V\"))";
        let oracle = MappingSet::new().method("Owner", "a", "()V", "b");
        let (patched, report) = run(text, &inject(&["a()V"], "LOwner;a()V"), &oracle);
        assert_eq!(patched, "@Inject(method = Names.HOOK, at = @At(target = \"LOwner;b()V\"))");
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, [UnsupportedLeafForm { path: "method[0]".into(), found: "name".into() }]);
    }

    #[test]
    fn correlation_failures() {
        let resolved = RenderedAnnotation::from(inject(&["a()V", "b()V"], "LOwner;a()V"));

        let single = parse_annotation("@Inject(method = \"a()V\", at = @At(target = \"LOwner;a()V\"))", 0).unwrap();
        assert!(matches!(check_correlation(&single, &resolved), Err(DeclarationError::SourceMismatch { .. })));

        let stale = parse_annotation("@Inject(method = {\"a()V\", \"z()V\"}, at = @At(target = \"LOwner;a()V\"))", 0).unwrap();
        let Err(DeclarationError::SourceMismatch { path, .. }) = check_correlation(&stale, &resolved) else { panic!() };
        assert_eq!(path, "method[1]");

        let missing = parse_annotation("@Inject(method = {\"a()V\", \"b()V\"})", 0).unwrap();
        assert!(check_correlation(&missing, &resolved).is_err());

        let ok = parse_annotation("@Inject(method = {\"a()V\", \"b()V\",}, at = @At(target = \"LOwner;a()V\"))", 0).unwrap();
        assert_eq!(check_correlation(&ok, &resolved), Ok(()));
    }
}
