//! Default renaming transformer for Mixin metadata.
//!
//! Knows which annotation members encode bytecode selectors:
//! - injector `method` values are method selectors resolved against the
//!   mixin's target classes,
//! - `@At(target = ...)` is a full member reference,
//! - `@Accessor`/`@Invoker` values name a field/method of the target,
//! - class and enum values go through the class mapping.
//!
//! Everything else, and every annotation it does not recognize, is emitted
//! unchanged. `remap = false` switches remapping off for an annotation and
//! everything nested in it, starting from the class-level `@Mixin`; a
//! nested annotation with its own `remap` value overrides the inherited one.
pub mod selector;

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::binding::{ClassBinding, ResolvedAnnotation};
use crate::descriptor::{internal_name, internal_of};
use crate::oracle::Remapper;
use crate::reader::read_annotation;
use crate::render::RemapTransformer;
use crate::value::{Annotation, AnnotationValue, Literal, LiteralKind, Member};
use crate::visitor::{replay, AnnotationVisitor, TreeBuilder};

pub const MIXIN: &str = "org.spongepowered.asm.mixin.Mixin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Injector,
    At,
    Accessor,
    Invoker,
    Other,
}

static KINDS: Lazy<HashMap<&'static str, AnnotationKind>> = Lazy::new(|| {
    use AnnotationKind::*;
    HashMap::from([
        ("Lorg/spongepowered/asm/mixin/injection/Inject;", Injector),
        ("Lorg/spongepowered/asm/mixin/injection/Redirect;", Injector),
        ("Lorg/spongepowered/asm/mixin/injection/ModifyArg;", Injector),
        ("Lorg/spongepowered/asm/mixin/injection/ModifyArgs;", Injector),
        ("Lorg/spongepowered/asm/mixin/injection/ModifyVariable;", Injector),
        ("Lorg/spongepowered/asm/mixin/injection/ModifyConstant;", Injector),
        ("Lorg/spongepowered/asm/mixin/injection/At;", At),
        ("Lorg/spongepowered/asm/mixin/gen/Accessor;", Accessor),
        ("Lorg/spongepowered/asm/mixin/gen/Invoker;", Invoker),
    ])
});

impl AnnotationKind {
    pub fn of(descriptor: &str) -> Self {
        KINDS.get(descriptor).copied().unwrap_or(AnnotationKind::Other)
    }
}

/// Classification predicate: is this the class-level `@Mixin` annotation?
pub fn is_mixin_annotation(annotation: &ResolvedAnnotation) -> bool {
    annotation.type_name == MIXIN
}

// ————————————————————————————————————————————————————————————————————————————
// CONTEXT
// ————————————————————————————————————————————————————————————————————————————

/// Target classes of the mixin owning the declaration being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinContext {
    /// Internal names, `value` classes first, then `targets` strings.
    pub targets: Vec<String>,
    /// `@Mixin(remap = ...)`; members inherit it unless they set their own.
    pub remap: bool,
}

impl Default for MixinContext {
    fn default() -> Self {
        Self { targets: Vec::new(), remap: true }
    }
}

impl MixinContext {
    pub fn new(targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { targets: targets.into_iter().map(Into::into).collect(), remap: true }
    }

    /// `None` when the owner is not a mixin class.
    pub fn from_owner(owner: &ClassBinding) -> Option<Self> {
        let mixin = owner.annotations.iter().find(|a| is_mixin_annotation(a))?;
        // An unreadable @Mixin still marks a mixin; it just has no targets.
        let Ok(mixin) = read_annotation(mixin) else {
            return Some(Self::default());
        };
        let mut targets = Vec::new();
        if let Some(classes) = mixin.member("value") {
            for class in classes.elements() {
                if let AnnotationValue::TypeRef(desc) = class {
                    if let Some(internal) = internal_of(desc) {
                        targets.push(internal.to_string());
                    }
                }
            }
        }
        if let Some(names) = mixin.member("targets") {
            targets.extend(names.elements().filter_map(|v| v.as_str()).map(internal_name));
        }
        Some(Self { targets, remap: remap_flag(&mixin).unwrap_or(true) })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TRANSFORM
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
pub struct MixinTransformer {
    pub context: MixinContext,
}

impl MixinTransformer {
    pub fn new(context: MixinContext) -> Self {
        Self { context }
    }

    /// Remap a whole annotation. Unrecognized top-level annotations come
    /// back as an exact copy.
    pub fn transform(&self, annotation: &Annotation, remapper: &dyn Remapper) -> Annotation {
        if AnnotationKind::of(&annotation.descriptor) == AnnotationKind::Other {
            return annotation.clone();
        }
        Remap { remapper, targets: &self.context.targets }.annotation(annotation, self.context.remap)
    }
}

struct Remap<'a> {
    remapper: &'a dyn Remapper,
    targets: &'a [String],
}

impl Remap<'_> {
    fn annotation(&self, annotation: &Annotation, enabled: bool) -> Annotation {
        let kind = AnnotationKind::of(&annotation.descriptor);
        let enabled = remap_flag(annotation).unwrap_or(enabled);
        Annotation {
            descriptor: annotation.descriptor.clone(),
            members: annotation
                .members
                .iter()
                .map(|m| Member {
                    name: m.name.clone(),
                    value: self.value(kind, &m.name, &m.value, enabled),
                })
                .collect(),
        }
    }

    fn value(&self, kind: AnnotationKind, member: &str, value: &AnnotationValue, enabled: bool) -> AnnotationValue {
        match value {
            AnnotationValue::Literal(lit) if enabled && lit.kind == LiteralKind::String => {
                AnnotationValue::Literal(Literal::string(self.string(kind, member, &lit.raw)))
            }
            AnnotationValue::TypeRef(desc) if enabled => {
                AnnotationValue::TypeRef(self.remapper.map_descriptor(desc))
            }
            AnnotationValue::EnumRef { declaring, constant } if enabled => AnnotationValue::EnumRef {
                declaring: self.remapper.map_descriptor(declaring),
                constant: constant.clone(),
            },
            AnnotationValue::Nested(inner) => AnnotationValue::Nested(self.annotation(inner, enabled)),
            AnnotationValue::Array(elems) => AnnotationValue::Array(
                elems.iter().map(|e| self.value(kind, member, e, enabled)).collect(),
            ),
            other => other.clone(),
        }
    }

    fn string(&self, kind: AnnotationKind, member: &str, text: &str) -> String {
        match (kind, member) {
            (AnnotationKind::Injector, "method") | (AnnotationKind::At, "target") => {
                selector::remap_selector(text, self.remapper, self.targets)
            }
            (AnnotationKind::Accessor, "value") => self.target_member(text, true),
            (AnnotationKind::Invoker, "value") => self.target_member(text, false),
            _ => text.to_string(),
        }
    }

    fn target_member(&self, name: &str, field: bool) -> String {
        if name.is_empty() {
            return String::new();
        }
        self.targets
            .iter()
            .map(|owner| {
                if field {
                    self.remapper.map_field(owner, name, None)
                } else {
                    self.remapper.map_method(owner, name, None)
                }
            })
            .find(|n| n != name)
            .unwrap_or_else(|| name.to_string())
    }
}

/// An explicit `remap` member overrides whatever the enclosing scope says.
fn remap_flag(annotation: &Annotation) -> Option<bool> {
    match annotation.member("remap") {
        Some(AnnotationValue::Literal(Literal { kind: LiteralKind::Bool, raw })) => Some(raw == "true"),
        _ => None,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VISITOR
// ————————————————————————————————————————————————————————————————————————————

impl RemapTransformer for MixinTransformer {
    fn wrap<'a>(
        &'a self,
        remapper: &'a dyn Remapper,
        downstream: &'a mut dyn AnnotationVisitor,
    ) -> Box<dyn AnnotationVisitor + 'a> {
        Box::new(MixinRemapVisitor {
            transformer: self,
            remapper,
            downstream,
            buffer: TreeBuilder::new(),
        })
    }
}

/// Buffers one annotation (a `remap` flag may follow the members it
/// governs), then emits the remapped tree downstream at `end_annotation`.
struct MixinRemapVisitor<'a> {
    transformer: &'a MixinTransformer,
    remapper: &'a dyn Remapper,
    downstream: &'a mut dyn AnnotationVisitor,
    buffer: TreeBuilder,
}

impl AnnotationVisitor for MixinRemapVisitor<'_> {
    fn begin_annotation(&mut self, descriptor: &str) {
        self.buffer.begin_annotation(descriptor)
    }
    fn visit_primitive(&mut self, name: Option<&str>, value: &Literal) {
        self.buffer.visit_primitive(name, value)
    }
    fn visit_type(&mut self, name: Option<&str>, descriptor: &str) {
        self.buffer.visit_type(name, descriptor)
    }
    fn visit_enum(&mut self, name: Option<&str>, declaring: &str, constant: &str) {
        self.buffer.visit_enum(name, declaring, constant)
    }
    fn begin_nested(&mut self, name: Option<&str>, descriptor: &str) {
        self.buffer.begin_nested(name, descriptor)
    }
    fn end_nested(&mut self) {
        self.buffer.end_nested()
    }
    fn begin_array(&mut self, name: Option<&str>) {
        self.buffer.begin_array(name)
    }
    fn end_array(&mut self) {
        self.buffer.end_array()
    }
    fn end_annotation(&mut self) {
        self.buffer.end_annotation();
        let buffered = std::mem::take(&mut self.buffer);
        // A broken event stream is forwarded as nothing; the capture side
        // reports it.
        if let Ok(annotation) = buffered.finish() {
            let remapped = self.transformer.transform(&annotation, self.remapper);
            replay(&remapped, &mut *self.downstream);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ResolvedValue;
    use crate::oracle::{IdentityRemapper, MappingSet};
    use crate::render::{render_pair, Leaf, Rendered};

    const INJECT: &str = "Lorg/spongepowered/asm/mixin/injection/Inject;";
    const AT: &str = "Lorg/spongepowered/asm/mixin/injection/At;";

    fn inject(method: &str, target: &str) -> Annotation {
        Annotation::new(INJECT)
            .with("method", AnnotationValue::Array(vec![AnnotationValue::string(method)]))
            .with("at", AnnotationValue::Nested(
                Annotation::new(AT)
                    .with("value", AnnotationValue::string("INVOKE"))
                    .with("target", AnnotationValue::string(target)),
            ))
    }

    fn oracle() -> MappingSet {
        MappingSet::new().method("Owner", "a", "()V", "b")
    }

    #[test]
    fn context_from_mixin_owner() {
        let owner = ClassBinding {
            binary_name: "mixin.SimpleMixin".into(),
            annotations: vec![
                ResolvedAnnotation::new(MIXIN)
                    .with("value", ResolvedValue::Array(vec![ResolvedValue::Class("com.example.Core".into())]))
                    .with("targets", ResolvedValue::Array(vec![ResolvedValue::String("com.example.Hidden$Impl".into())])),
            ],
        };
        let ctx = MixinContext::from_owner(&owner).unwrap();
        assert_eq!(ctx.targets, ["com/example/Core", "com/example/Hidden$Impl"]);
        assert!(ctx.remap);

        let plain = ClassBinding { binary_name: "a.B".into(), annotations: vec![] };
        assert_eq!(MixinContext::from_owner(&plain), None);
    }

    #[test]
    fn remaps_method_selector_and_at_target() {
        let t = MixinTransformer::new(MixinContext::new(["Owner"]));
        let out = t.transform(&inject("a()V", "LOwner;a()V"), &oracle());
        assert_eq!(out, inject("b()V", "LOwner;b()V"));
        // identity leaves everything as is
        let same = t.transform(&inject("a()V", "LOwner;a()V"), &IdentityRemapper);
        assert_eq!(same, inject("a()V", "LOwner;a()V"));
    }

    #[test]
    fn remap_false_disables_the_annotation_and_its_children() {
        let t = MixinTransformer::new(MixinContext::new(["Owner"]));
        let ann = inject("a()V", "LOwner;a()V").with(
            "remap",
            AnnotationValue::Literal(Literal { kind: LiteralKind::Bool, raw: "false".into() }),
        );
        assert_eq!(t.transform(&ann, &oracle()), ann);

        // only the nested @At opts out
        let mut partial = inject("a()V", "LOwner;a()V");
        if let AnnotationValue::Nested(at) = &mut partial.members[1].value {
            at.members.push(Member {
                name: "remap".into(),
                value: AnnotationValue::Literal(Literal { kind: LiteralKind::Bool, raw: "false".into() }),
            });
        }
        let out = t.transform(&partial, &oracle());
        assert_eq!(out.member("method").unwrap().elements().next().unwrap().as_str(), Some("b()V"));
        let AnnotationValue::Nested(at) = out.member("at").unwrap() else { panic!() };
        assert_eq!(at.member("target").unwrap().as_str(), Some("LOwner;a()V"));
    }

    #[test]
    fn explicit_remap_true_overrides_inherited_false() {
        let t = MixinTransformer::new(MixinContext::new(["Owner"]));
        let yes = AnnotationValue::Literal(Literal { kind: LiteralKind::Bool, raw: "true".into() });
        let no = AnnotationValue::Literal(Literal { kind: LiteralKind::Bool, raw: "false".into() });
        let mut ann = inject("a()V", "LOwner;a()V").with("remap", no);
        if let AnnotationValue::Nested(at) = &mut ann.members[1].value {
            at.members.push(Member { name: "remap".into(), value: yes });
        }
        let out = t.transform(&ann, &oracle());
        assert_eq!(out.member("method").unwrap().elements().next().unwrap().as_str(), Some("a()V"));
        let AnnotationValue::Nested(at) = out.member("at").unwrap() else { panic!() };
        assert_eq!(at.member("target").unwrap().as_str(), Some("LOwner;b()V"));
    }

    #[test]
    fn class_level_remap_false_disables_members() {
        let owner = ClassBinding {
            binary_name: "mixin.SimpleMixin".into(),
            annotations: vec![
                ResolvedAnnotation::new(MIXIN)
                    .with("value", ResolvedValue::Array(vec![ResolvedValue::Class("Owner".into())]))
                    .with("remap", ResolvedValue::Boolean(false)),
            ],
        };
        let ctx = MixinContext::from_owner(&owner).unwrap();
        assert!(!ctx.remap);
        let t = MixinTransformer::new(ctx);
        let ann = inject("a()V", "LOwner;a()V");
        assert_eq!(t.transform(&ann, &oracle()), ann);
        assert!(MixinTransformer::new(MixinContext::new(["Owner"])).transform(&ann, &oracle()) != ann);
    }

    #[test]
    fn unknown_annotations_pass_through_untouched() {
        let t = MixinTransformer::new(MixinContext::new(["Owner"]));
        let ann = Annotation::new("Lcom/example/Custom;")
            .with("method", AnnotationValue::string("a()V"))
            .with("type", AnnotationValue::type_ref("LOwner;"));
        let oracle = oracle().class("Owner", "Renamed");
        assert_eq!(t.transform(&ann, &oracle), ann);
    }

    #[test]
    fn class_and_enum_values_follow_class_mapping_inside_known_annotations() {
        let t = MixinTransformer::default();
        let ann = Annotation::new(AT)
            .with("value", AnnotationValue::string("NEW"))
            .with("args", AnnotationValue::type_ref("LOwner;"))
            .with("shift", AnnotationValue::EnumRef { declaring: "LOwner$Shift;".into(), constant: "BEFORE".into() });
        let oracle = MappingSet::new().class("Owner", "Renamed").class("Owner$Shift", "Renamed$Shift");
        let out = t.transform(&ann, &oracle);
        assert_eq!(out.member("value").unwrap().as_str(), Some("NEW"));
        assert_eq!(out.member("args"), Some(&AnnotationValue::type_ref("LRenamed;")));
        assert_eq!(
            out.member("shift"),
            Some(&AnnotationValue::EnumRef { declaring: "LRenamed$Shift;".into(), constant: "BEFORE".into() })
        );
    }

    #[test]
    fn accessor_value_resolves_against_targets() {
        let t = MixinTransformer::new(MixinContext::new(["Owner"]));
        let ann = Annotation::new("Lorg/spongepowered/asm/mixin/gen/Accessor;").with("value", AnnotationValue::string("count"));
        let oracle = MappingSet::new().field("Owner", "count", "I", "size");
        assert_eq!(t.transform(&ann, &oracle).member("value").unwrap().as_str(), Some("size"));
    }

    #[test]
    fn renders_through_the_visitor_protocol() {
        let t = MixinTransformer::new(MixinContext::new(["Owner"]));
        let (remapped, unmapped) = render_pair(&inject("a()V", "LOwner;a()V"), &oracle(), &t).unwrap();
        let Rendered::Array(methods) = &remapped.members["method"] else { panic!() };
        assert_eq!(methods[0], Rendered::Leaf(Leaf::Literal(Literal::string("b()V"))));
        let Rendered::Array(methods) = &unmapped.members["method"] else { panic!() };
        assert_eq!(methods[0], Rendered::Leaf(Leaf::Literal(Literal::string("a()V"))));
    }
}
