//! The renaming oracle: maps an old symbol identity to its new name.
//!
//! Implementations must be deterministic and free of observable side
//! effects; one oracle is shared read-only by every unit task.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::descriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Method,
    Field,
}

pub trait Remapper: Sync {
    /// Owners and class names are internal names (`a/b/C`). For
    /// `SymbolKind::Class` the owner is ignored and `name` is the class.
    /// A `None` descriptor asks for a name-only lookup.
    fn resolve_new_name(
        &self,
        kind: SymbolKind,
        owner: &str,
        name: &str,
        descriptor: Option<&str>,
    ) -> String;

    fn map_class(&self, internal_name: &str) -> String {
        self.resolve_new_name(SymbolKind::Class, "", internal_name, None)
    }

    fn map_method(&self, owner: &str, name: &str, descriptor: Option<&str>) -> String {
        self.resolve_new_name(SymbolKind::Method, owner, name, descriptor)
    }

    fn map_field(&self, owner: &str, name: &str, descriptor: Option<&str>) -> String {
        self.resolve_new_name(SymbolKind::Field, owner, name, descriptor)
    }

    fn map_descriptor(&self, desc: &str) -> String {
        descriptor::map_class_tokens(desc, |n| self.map_class(n)).into_owned()
    }
}

/// Returns every symbol unchanged. Drives the baseline rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRemapper;

impl Remapper for IdentityRemapper {
    fn resolve_new_name(&self, _: SymbolKind, _: &str, name: &str, _: Option<&str>) -> String {
        name.to_string()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MAPPING TABLE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMapping {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub new_name: String,
}

/// On-disk mapping file shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default)]
    pub classes: HashMap<String, String>,
    #[serde(default)]
    pub methods: Vec<MemberMapping>,
    #[serde(default)]
    pub fields: Vec<MemberMapping>,
}

type MemberKey = (String, String, String);

/// Table-backed oracle. Member keys use the *original* owner and descriptor.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    classes: HashMap<String, String>,
    methods: HashMap<MemberKey, String>,
    fields: HashMap<MemberKey, String>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, from: &str, to: &str) -> Self {
        self.classes.insert(from.to_string(), to.to_string());
        self
    }

    pub fn method(mut self, owner: &str, name: &str, desc: &str, new_name: &str) -> Self {
        self.methods.insert(
            (owner.to_string(), name.to_string(), desc.to_string()),
            new_name.to_string(),
        );
        self
    }

    pub fn field(mut self, owner: &str, name: &str, desc: &str, new_name: &str) -> Self {
        self.fields.insert(
            (owner.to_string(), name.to_string(), desc.to_string()),
            new_name.to_string(),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.methods.len() + self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup_member(
        table: &HashMap<MemberKey, String>,
        owner: &str,
        name: &str,
        desc: Option<&str>,
    ) -> Option<String> {
        if let Some(desc) = desc {
            return table
                .get(&(owner.to_string(), name.to_string(), desc.to_string()))
                .cloned();
        }
        // Name-only: accept when every overload maps to the same new name.
        let mut found: Option<&String> = None;
        for ((o, n, _), new_name) in table {
            if o != owner || n != name {
                continue;
            }
            match found {
                None => found = Some(new_name),
                Some(prev) if prev == new_name => {}
                Some(_) => return None,
            }
        }
        found.cloned()
    }
}

impl From<MappingFile> for MappingSet {
    fn from(file: MappingFile) -> Self {
        let key = |m: &MemberMapping| (m.owner.clone(), m.name.clone(), m.descriptor.clone());
        Self {
            classes: file.classes,
            methods: file.methods.iter().map(|m| (key(m), m.new_name.clone())).collect(),
            fields: file.fields.iter().map(|m| (key(m), m.new_name.clone())).collect(),
        }
    }
}

impl Remapper for MappingSet {
    fn resolve_new_name(
        &self,
        kind: SymbolKind,
        owner: &str,
        name: &str,
        desc: Option<&str>,
    ) -> String {
        let hit = match kind {
            SymbolKind::Class => self.classes.get(name).cloned(),
            SymbolKind::Method => Self::lookup_member(&self.methods, owner, name, desc),
            SymbolKind::Field => Self::lookup_member(&self.fields, owner, name, desc),
        };
        hit.unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_returns_inputs() {
        let id = IdentityRemapper;
        assert_eq!(id.map_class("a/B"), "a/B");
        assert_eq!(id.map_method("a/B", "run", Some("()V")), "run");
        assert_eq!(id.map_descriptor("(La/B;)V"), "(La/B;)V");
    }

    #[test]
    fn mapping_set_exact_and_name_only_lookups() {
        let m = MappingSet::new()
            .class("a/B", "x/Y")
            .method("a/B", "run", "()V", "go")
            .method("a/B", "get", "()I", "fetchInt")
            .method("a/B", "get", "()J", "fetchLong");

        assert_eq!(m.map_class("a/B"), "x/Y");
        assert_eq!(m.map_class("a/C"), "a/C");
        assert_eq!(m.map_method("a/B", "run", Some("()V")), "go");
        assert_eq!(m.map_method("a/B", "run", None), "go");
        // overloads disagree → ambiguous → unchanged
        assert_eq!(m.map_method("a/B", "get", None), "get");
        assert_eq!(m.map_method("a/B", "get", Some("()J")), "fetchLong");
        assert_eq!(m.map_descriptor("(La/B;)La/C;"), "(Lx/Y;)La/C;");
    }

    #[test]
    fn mapping_file_loads() {
        let file: MappingFile = serde_json::from_value(json!({
            "classes": { "Core": "Kernel" },
            "methods": [{ "owner": "Core", "name": "firstName", "descriptor": "()Ljava/lang/String;", "new_name": "givenName" }]
        }))
        .unwrap();
        let m = MappingSet::from(file);
        assert_eq!(m.len(), 2);
        assert_eq!(m.map_method("Core", "firstName", Some("()Ljava/lang/String;")), "givenName");
        assert_eq!(m.map_field("Core", "firstName", None), "firstName");
    }
}
