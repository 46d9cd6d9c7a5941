//! Binary names, internal names and JVM descriptors.
//!
//! - binary name:   `com.example.Outer$Inner`
//! - internal name: `com/example/Outer$Inner`
//! - descriptor:    `Lcom/example/Outer$Inner;`, `I`, `[Ljava/lang/String;`
use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CLASS_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"L([^;()\[<>]+);").expect("class token regex")
});

pub fn internal_name(binary_name: &str) -> String {
    binary_name.replace('.', "/")
}

fn primitive_descriptor(name: &str) -> Option<&'static str> {
    Some(match name {
        "boolean" => "Z",
        "byte" => "B",
        "char" => "C",
        "short" => "S",
        "int" => "I",
        "long" => "J",
        "float" => "F",
        "double" => "D",
        "void" => "V",
        _ => return None,
    })
}

/// Descriptor of a type given by binary name. Trailing `[]` pairs become
/// array dimensions.
pub fn descriptor_of(binary_name: &str) -> String {
    let mut base = binary_name.trim();
    let mut dims = 0;
    while let Some(rest) = base.strip_suffix("[]") {
        base = rest.trim_end();
        dims += 1;
    }
    let mut out = "[".repeat(dims);
    match primitive_descriptor(base) {
        Some(p) => out.push_str(p),
        None => {
            out.push('L');
            out.push_str(&internal_name(base));
            out.push(';');
        }
    }
    out
}

/// `Lcom/example/Core;` → `com/example/Core`. `None` for primitives and arrays.
pub fn internal_of(descriptor: &str) -> Option<&str> {
    descriptor.strip_prefix('L')?.strip_suffix(';')
}

/// Rewrite every class token in a field or method descriptor.
pub fn map_class_tokens<'a>(descriptor: &'a str, mut map: impl FnMut(&str) -> String) -> Cow<'a, str> {
    CLASS_TOKEN.replace_all(descriptor, |caps: &Captures| format!("L{};", map(&caps[1])))
}

pub fn is_method_descriptor(s: &str) -> bool {
    s.starts_with('(') && s.contains(')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_from_binary_names() {
        assert_eq!(descriptor_of("com.example.Core"), "Lcom/example/Core;");
        assert_eq!(descriptor_of("Outer$Inner"), "LOuter$Inner;");
        assert_eq!(descriptor_of("int"), "I");
        assert_eq!(descriptor_of("java.lang.String[][]"), "[[Ljava/lang/String;");
        assert_eq!(descriptor_of("long[]"), "[J");
    }

    #[test]
    fn internal_name_only_for_class_descriptors() {
        assert_eq!(internal_of("Lcom/example/Core;"), Some("com/example/Core"));
        assert_eq!(internal_of("I"), None);
        assert_eq!(internal_of("[LCore;"), None);
    }

    #[test]
    fn class_tokens_rewritten_in_method_descriptors() {
        let out = map_class_tokens("(ILa/B;[La/C;)La/B;", |n| match n {
            "a/B" => "x/Y".to_string(),
            other => other.to_string(),
        });
        assert_eq!(out, "(ILx/Y;[La/C;)Lx/Y;");
        assert_eq!(map_class_tokens("()V", |n| n.to_uppercase()), "()V");
    }
}
