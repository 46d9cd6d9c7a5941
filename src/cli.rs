//! Batch driver: load unit jobs, remap, write or print the results.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use mixin_remap::binding::CompilationUnit;
use mixin_remap::path_de::{load_mappings, load_units};
use mixin_remap::{MappingSet, PassConfig, RemapPass, UnitReport};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// remap bytecode member references inside Mixin annotations in source
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    /// tracing filter, e.g. `debug` or `mixin_remap=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// patch annotation string literals and write the patched sources
    Apply(ApplyOut),
    /// print the leaf differences per annotation as JSON, without patching
    Diff(DiffOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// mapping table (JSON: classes, methods, fields)
    #[arg(long, short)]
    mappings: PathBuf,

    /// One or more unit job files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// skip declarations whose owning type is unresolved instead of failing the unit
    #[arg(long, default_value_t = false)]
    lenient: bool,
}

#[derive(clap::Parser, Debug)]
struct ApplyOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output directory for patched sources (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// report what would change without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Parser, Debug)]
struct DiffOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> anyhow::Result<(MappingSet, Vec<CompilationUnit>)> {
        let mappings = load_mappings(&self.mappings)?;
        tracing::info!(entries = mappings.len(), path = %self.mappings.display(), "mappings loaded");
        let job_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let units = job_paths
            .par_iter()
            .map(|path| load_units(path))
            .collect::<anyhow::Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        tracing::info!(jobs = job_paths.len(), units = units.len(), "units loaded");
        Ok((mappings, units))
    }

    fn config(&self) -> PassConfig {
        PassConfig { lenient: self.lenient }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Apply(target) => target.run(),
            Command::Diff(target) => target.run(),
        }
    }
}

impl ApplyOut {
    fn run(&self) -> anyhow::Result<()> {
        let (mappings, units) = self.input_settings.load()?;
        let pass = RemapPass::new(&mappings, self.input_settings.config());
        let results = pass.process_units(&units);

        let mut failed = 0;
        for (unit, result) in units.iter().zip(&results) {
            match result {
                Ok(report) => {
                    print_summary(report);
                    if !self.dry_run {
                        self.write(report)?;
                    }
                }
                Err(error) => {
                    failed += 1;
                    eprintln!("{} {}: {error}", "✗".red(), unit.path.display());
                }
            }
        }
        let patched = results.iter().flatten().filter(|r| r.patched.is_some()).count();
        eprintln!(
            "{} units, {} patched, {} failed",
            units.len(),
            patched.to_string().green(),
            if failed > 0 { failed.to_string().red() } else { failed.to_string().normal() }
        );
        if failed > 0 {
            bail!("{failed} unit(s) failed");
        }
        Ok(())
    }

    fn write(&self, report: &UnitReport) -> anyhow::Result<()> {
        let Some(patched) = report.patched.as_ref() else {
            return Ok(());
        };
        match self.out.as_ref() {
            Some(out) => {
                let dest = out.join(relative(&report.path));
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                std::fs::write(&dest, patched).with_context(|| format!("failed to write {}", dest.display()))?;
            }
            None => {
                println!("// {}", report.path.display());
                println!("{patched}");
            }
        }
        Ok(())
    }
}

impl DiffOut {
    fn run(&self) -> anyhow::Result<()> {
        let (mappings, units) = self.input_settings.load()?;
        let pass = RemapPass::new(&mappings, self.input_settings.config());
        let diffs = units
            .par_iter()
            .map(|unit| pass.diff_unit(unit).with_context(|| format!("failed to diff {}", unit.path.display())))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let json = serde_json::to_string_pretty(&diffs)?;
        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(out, &json).with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_summary(report: &UnitReport) {
    let mark = if report.patched.is_some() { "✓".green() } else { "·".dimmed() };
    eprintln!("{mark} {} ({} edits)", report.path.display(), report.edits.len());
    for skipped in &report.skipped_declarations {
        eprintln!("    {} {skipped}: owner unresolved", "skipped".yellow());
    }
    for diag in &report.diagnostics {
        eprintln!("    {} {}: {}", diag.kind.yellow(), diag.declaration, diag.message);
    }
}

/// Unit paths may be absolute; keep them inside the output directory.
fn relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .collect()
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    Ok(out)
}
