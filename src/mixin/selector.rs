//! Mixin member selectors: `name`, `name(desc)ret`, `Lowner;name(desc)ret`,
//! `Lowner;name:desc`.

use crate::oracle::Remapper;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSelector<'s> {
    /// Internal name of an explicit owner.
    pub owner: Option<&'s str>,
    pub name: &'s str,
    pub descriptor: Option<Descriptor<'s>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor<'s> {
    Method(&'s str),
    Field(&'s str),
}

impl<'s> MemberSelector<'s> {
    /// `None` for regex selectors, wildcards and quantifiers, which are
    /// passed through untouched.
    pub fn parse(text: &'s str) -> Option<Self> {
        if text.is_empty() || text.starts_with('/') || text.contains(char::is_whitespace) {
            return None;
        }
        let (owner, rest) = split_owner(text);
        let name_end = rest.find(['(', ':']).unwrap_or(rest.len());
        let name = &rest[..name_end];
        if name.contains(['*', '{', '}', '/', ';', '.']) {
            return None;
        }
        let descriptor = match rest[name_end..].chars().next() {
            None => None,
            Some('(') => Some(Descriptor::Method(&rest[name_end..])),
            Some(_) => Some(Descriptor::Field(&rest[name_end + 1..])),
        };
        if let Some(Descriptor::Method(d)) = descriptor {
            if !crate::descriptor::is_method_descriptor(d) {
                return None;
            }
        }
        Some(Self { owner, name, descriptor })
    }

    fn is_field(&self) -> bool {
        matches!(self.descriptor, Some(Descriptor::Field(_)))
    }

    fn descriptor_text(&self) -> Option<&'s str> {
        match self.descriptor {
            Some(Descriptor::Method(d)) | Some(Descriptor::Field(d)) => Some(d),
            None => None,
        }
    }

    /// Remap against the explicit owner, or against each mixin target in
    /// turn until one of them knows the member.
    pub fn remap(&self, remapper: &dyn Remapper, targets: &[String]) -> String {
        let desc = self.descriptor_text();
        let new_name = if self.name.is_empty() || self.name.starts_with('<') {
            self.name.to_string()
        } else {
            let lookup = |owner: &str| {
                if self.is_field() {
                    remapper.map_field(owner, self.name, desc)
                } else {
                    remapper.map_method(owner, self.name, desc)
                }
            };
            match self.owner {
                Some(owner) => lookup(owner),
                None => targets
                    .iter()
                    .map(|t| lookup(t.as_str()))
                    .find(|n| n != self.name)
                    .unwrap_or_else(|| self.name.to_string()),
            }
        };

        let mut out = String::new();
        if let Some(owner) = self.owner {
            out.push('L');
            out.push_str(&remapper.map_class(owner));
            out.push(';');
        }
        out.push_str(&new_name);
        match self.descriptor {
            Some(Descriptor::Method(d)) => out.push_str(&remapper.map_descriptor(d)),
            Some(Descriptor::Field(d)) => {
                out.push(':');
                out.push_str(&remapper.map_descriptor(d));
            }
            None => {}
        }
        out
    }
}

fn split_owner(text: &str) -> (Option<&str>, &str) {
    if let Some(after_l) = text.strip_prefix('L') {
        let limit = after_l.find(['(', ':']).unwrap_or(after_l.len());
        if let Some(semi) = after_l[..limit].find(';') {
            return (Some(&after_l[..semi]), &after_l[semi + 1..]);
        }
    }
    (None, text)
}

/// A bare internal class name, e.g. the `@At("NEW")` target `com/example/Foo`.
fn is_internal_class_name(text: &str) -> bool {
    text.contains('/')
        && text
            .split('/')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
}

/// Remap a method selector (`@Inject(method = ...)`), an `@At` target or a
/// bare class name. Unparseable selectors come back unchanged.
pub fn remap_selector(text: &str, remapper: &dyn Remapper, targets: &[String]) -> String {
    if is_internal_class_name(text) {
        return remapper.map_class(text);
    }
    match MemberSelector::parse(text) {
        Some(sel) => sel.remap(remapper, targets),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{IdentityRemapper, MappingSet};

    #[test]
    fn parses_selector_forms() {
        assert_eq!(MemberSelector::parse("tick"), Some(MemberSelector { owner: None, name: "tick", descriptor: None }));
        assert_eq!(
            MemberSelector::parse("LCore;firstName()Ljava/lang/String;"),
            Some(MemberSelector {
                owner: Some("Core"),
                name: "firstName",
                descriptor: Some(Descriptor::Method("()Ljava/lang/String;")),
            })
        );
        assert_eq!(
            MemberSelector::parse("La/b/C;count:I"),
            Some(MemberSelector { owner: Some("a/b/C"), name: "count", descriptor: Some(Descriptor::Field("I")) })
        );
        // method named `Load`, no owner
        assert_eq!(
            MemberSelector::parse("Load(LWorld;)V"),
            Some(MemberSelector { owner: None, name: "Load", descriptor: Some(Descriptor::Method("(LWorld;)V")) })
        );
        assert_eq!(MemberSelector::parse("tick*"), None);
        assert_eq!(MemberSelector::parse("/^on.*$/"), None);
        assert_eq!(MemberSelector::parse("render{2}"), None);
    }

    #[test]
    fn remaps_against_targets_and_explicit_owner() {
        let m = MappingSet::new()
            .class("Core", "net/Kernel")
            .class("World", "net/Level")
            .method("Core", "firstName", "()Ljava/lang/String;", "givenName")
            .method("Other", "tick", "()V", "update");
        let targets = vec!["Core".to_string(), "Other".to_string()];

        assert_eq!(remap_selector("firstName()Ljava/lang/String;", &m, &targets), "givenName()Ljava/lang/String;");
        assert_eq!(remap_selector("tick", &m, &targets), "update");
        assert_eq!(
            remap_selector("LCore;firstName()Ljava/lang/String;", &m, &[]),
            "Lnet/Kernel;givenName()Ljava/lang/String;"
        );
        assert_eq!(remap_selector("<init>(LWorld;)V", &m, &targets), "<init>(Lnet/Level;)V");
        assert_eq!(remap_selector("tick*", &m, &targets), "tick*");
    }

    #[test]
    fn bare_class_targets_follow_class_mapping() {
        let m = MappingSet::new().class("com/example/World", "net/example/Level");
        assert_eq!(remap_selector("com/example/World", &m, &[]), "net/example/Level");
        assert_eq!(remap_selector("com/example/Other", &m, &[]), "com/example/Other");
        assert_eq!(remap_selector("com/example/", &m, &[]), "com/example/");
        assert_eq!(remap_selector("/^on.*$/", &m, &[]), "/^on.*$/");
    }

    #[test]
    fn identity_remap_reproduces_input() {
        for s in ["a()V", "LOwner;a()V", "Lp/Q;f:Lp/R;", "name", "<clinit>()V", "p/Q"] {
            assert_eq!(remap_selector(s, &IdentityRemapper, &["Owner".to_string()]), s);
        }
    }
}
