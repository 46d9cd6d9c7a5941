//! Bytecode-name remapping for Mixin annotations written in source.
//!
//! A resolved annotation is rendered through the renaming transformer twice
//! (real oracle, identity oracle); the leaves that differ are located in
//! the annotation's text and replaced with new string literals.
pub mod binding;
pub mod descriptor;
pub mod diff;
pub mod edit;
pub mod error;
pub mod mixin;
pub mod oracle;
pub mod pass;
pub mod patch;
pub mod path_de;
pub mod reader;
pub mod render;
pub mod source;
pub mod value;
pub mod visitor;

pub use error::{DeclarationError, UnitError, UnsupportedLeafForm};
pub use oracle::{IdentityRemapper, MappingSet, Remapper};
pub use pass::{PassConfig, RemapPass, UnitReport};
