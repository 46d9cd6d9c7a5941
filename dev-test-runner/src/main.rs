//! Golden fixtures: each `fixtures/*.json` case runs one unit through the
//! pass and compares the patched text and diagnostic kinds.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use colored::Colorize;
use serde::Deserialize;

use mixin_remap::binding::{AnnotationSite, ClassBinding, CompilationUnit, Declaration, ResolvedAnnotation};
use mixin_remap::oracle::MappingFile;
use mixin_remap::path_de::load_json;
use mixin_remap::source::Span;
use mixin_remap::{MappingSet, PassConfig, RemapPass};

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    config: PassConfig,
    mappings: MappingFile,
    source: String,
    declarations: Vec<FixtureDeclaration>,
    /// `null` when the source must come out unchanged.
    expected: Option<String>,
    #[serde(default)]
    expected_diagnostics: Vec<String>,
    /// Set when the unit itself must fail.
    #[serde(default)]
    expected_error: bool,
}

#[derive(Debug, Deserialize)]
struct FixtureDeclaration {
    name: String,
    #[serde(default)]
    owner: Option<ClassBinding>,
    sites: Vec<FixtureSite>,
}

/// Sites are located by their text, so fixtures need no byte offsets.
#[derive(Debug, Deserialize)]
struct FixtureSite {
    text: String,
    binding: ResolvedAnnotation,
}

impl Fixture {
    fn unit(&self, path: &Path) -> anyhow::Result<CompilationUnit> {
        let mut declarations = Vec::new();
        for decl in &self.declarations {
            let mut annotations = Vec::new();
            for site in &decl.sites {
                let start = self
                    .source
                    .find(&site.text)
                    .with_context(|| format!("site text not found: {}", site.text))?;
                annotations.push(AnnotationSite {
                    span: Span::new(start, start + site.text.len()),
                    binding: site.binding.clone(),
                });
            }
            declarations.push(Declaration {
                name: decl.name.clone(),
                descriptor: None,
                owner: decl.owner.clone(),
                annotations,
            });
        }
        Ok(CompilationUnit { path: path.to_path_buf(), source: self.source.clone(), declarations })
    }

    fn check(&self, path: &Path) -> anyhow::Result<()> {
        let unit = self.unit(path)?;
        let mappings = MappingSet::from(self.mappings.clone());
        let result = RemapPass::new(&mappings, self.config).process_unit(&unit);
        let report = match (result, self.expected_error) {
            (Err(_), true) => return Ok(()),
            (Ok(_), true) => bail!("expected the unit to fail"),
            (Err(error), false) => bail!("unit failed: {error}"),
            (Ok(report), false) => report,
        };
        let patched = report.patched.as_deref().unwrap_or(&unit.source);
        let expected = self.expected.as_deref().unwrap_or(&unit.source);
        if patched != expected {
            bail!("patched source differs\n--- expected\n{expected}\n--- actual\n{patched}");
        }
        let kinds: Vec<_> = report.diagnostics.iter().map(|d| d.kind).collect();
        if kinds != self.expected_diagnostics {
            bail!("diagnostics {kinds:?}, expected {:?}", self.expected_diagnostics);
        }
        Ok(())
    }
}

fn fixture_paths() -> anyhow::Result<Vec<PathBuf>> {
    let pattern = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/*.json");
    let mut paths = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

fn main() -> anyhow::Result<()> {
    let paths = fixture_paths()?;
    let mut failures = 0;
    for path in &paths {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let outcome = load_json::<Fixture>(path).and_then(|fixture| fixture.check(path));
        match outcome {
            Ok(()) => eprintln!("{} {name}", "✓".green()),
            Err(error) => {
                failures += 1;
                eprintln!("{} {name}: {error:#}", "✗".red());
            }
        }
    }
    eprintln!("{} fixtures, {} failed", paths.len(), failures);
    if failures > 0 {
        bail!("{failures} fixture(s) failed");
    }
    Ok(())
}
