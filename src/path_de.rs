//! JSON loading with the failing JSON path in every error.
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::binding::CompilationUnit;
use crate::oracle::{MappingFile, MappingSet};

#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct PathError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

impl From<serde_path_to_error::Error<serde_json::Error>> for PathError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        Self { path, source: err.into_inner() }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    Ok(serde_path_to_error::deserialize::<_, T>(de)?)
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    from_slice_with_path(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

/// A unit job file: the compilation units handed over by the front end.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitJob {
    #[serde(default)]
    pub units: Vec<CompilationUnit>,
}

pub fn load_units(path: &Path) -> anyhow::Result<Vec<CompilationUnit>> {
    Ok(load_json::<UnitJob>(path)?.units)
}

pub fn load_mappings(path: &Path) -> anyhow::Result<MappingSet> {
    Ok(load_json::<MappingFile>(path)?.into())
}
