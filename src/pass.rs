//! The per-declaration pipeline and its unit-level drivers.
//!
//! For every annotation site of a mixin member:
//! read, render twice, diff, correlate with the written text, patch.
//! Declaration failures are logged and reported, never propagated; unit
//! failures discard the unit's pending edits.
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::binding::{AnnotationSite, CompilationUnit, Declaration};
use crate::diff::{diff, LeafDiff};
use crate::edit::{Edit, EditBuffer};
use crate::error::{DeclarationError, UnitError, UnsupportedLeafForm};
use crate::mixin::{AnnotationKind, MixinContext, MixinTransformer};
use crate::oracle::Remapper;
use crate::patch::{self, check_correlation};
use crate::reader::read_annotation;
use crate::render::render_pair;
use crate::source::{parse_annotation, SourceAnnotation, Span};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    /// Skip declarations whose owning type is unresolved instead of
    /// failing the unit.
    #[serde(default)]
    pub lenient: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub declaration: String,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationStatus {
    /// Edits were recorded.
    Patched,
    /// Nothing to rewrite.
    Unchanged,
    /// Owning type unresolved under the lenient policy.
    Skipped,
    /// Owner is not a mixin class.
    NotMixin,
    /// A declaration-level error left the declaration untouched.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationOutcome {
    pub status: DeclarationStatus,
    pub applied: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub path: PathBuf,
    /// Patched text; `None` when nothing changed.
    pub patched: Option<String>,
    pub edits: Vec<Edit>,
    pub diagnostics: Vec<Diagnostic>,
    pub skipped_declarations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteDiff {
    pub declaration: String,
    pub annotation: String,
    pub span: Span,
    pub diffs: Vec<LeafDiff>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitDiff {
    pub path: PathBuf,
    pub sites: Vec<SiteDiff>,
    pub diagnostics: Vec<Diagnostic>,
    pub skipped_declarations: Vec<String>,
}

/// What one annotation site needs rewritten.
struct SitePlan {
    source: SourceAnnotation,
    diffs: Vec<LeafDiff>,
}

impl DeclarationOutcome {
    fn status(status: DeclarationStatus) -> Self {
        Self { status, applied: 0, diagnostics: Vec::new() }
    }
}

fn diagnostic(decl: &Declaration, kind: &'static str, message: impl Into<String>) -> Diagnostic {
    Diagnostic { declaration: decl.name.clone(), kind, message: message.into() }
}

fn leaf_diagnostic(decl: &Declaration, skip: &UnsupportedLeafForm) -> Diagnostic {
    tracing::info!(declaration = %decl.name, path = %skip.path, found = %skip.found, "leaf left unpatched");
    diagnostic(decl, "unsupported_leaf_form", skip.to_string())
}

/// `org.example.Outer$Inner` as written may be `Inner`, `Outer.Inner` or
/// fully qualified.
fn names_match(binary_name: &str, written: &str) -> bool {
    let dotted = binary_name.replace('$', ".");
    dotted == written || dotted.ends_with(&format!(".{written}"))
}

pub struct RemapPass<'o> {
    oracle: &'o dyn Remapper,
    config: PassConfig,
}

impl<'o> RemapPass<'o> {
    pub fn new(oracle: &'o dyn Remapper, config: PassConfig) -> Self {
        Self { oracle, config }
    }

    /// Mixin context of the owning class, or the status of a declaration
    /// with nothing to do.
    fn context(&self, decl: &Declaration) -> Result<Result<MixinContext, DeclarationStatus>, UnitError> {
        let Some(owner) = &decl.owner else {
            if self.config.lenient {
                tracing::debug!(declaration = %decl.name, "owner unresolved, skipping");
                return Ok(Err(DeclarationStatus::Skipped));
            }
            return Err(UnitError::UnresolvedClasspath { declaration: decl.name.clone() });
        };
        match MixinContext::from_owner(owner) {
            Some(ctx) => Ok(Ok(ctx)),
            None => {
                tracing::trace!(declaration = %decl.name, owner = %owner.binary_name, "not a mixin member");
                Ok(Err(DeclarationStatus::NotMixin))
            }
        }
    }

    fn plan_site(
        &self,
        unit_source: &str,
        site: &AnnotationSite,
        transformer: &MixinTransformer,
    ) -> Result<Option<SitePlan>, DeclarationError> {
        let annotation = read_annotation(&site.binding)?;
        if annotation.is_empty() || AnnotationKind::of(&annotation.descriptor) == AnnotationKind::Other {
            return Ok(None);
        }
        let (remapped, unmapped) = render_pair(&annotation, self.oracle, transformer)?;
        let diffs = diff(&remapped, &unmapped)?;
        if diffs.is_empty() {
            return Ok(None);
        }

        let source = parse_annotation(unit_source, site.span.start)?;
        if source.span.end > site.span.end {
            return Err(DeclarationError::SourceMismatch {
                path: String::new(),
                detail: format!("annotation text ends at {}, past its site {:?}", source.span.end, site.span),
            });
        }
        if !names_match(&site.binding.type_name, &source.name) {
            return Err(DeclarationError::SourceMismatch {
                path: String::new(),
                detail: format!("@{} written where {} was resolved", source.name, site.binding.type_name),
            });
        }
        check_correlation(&source, &unmapped)?;
        Ok(Some(SitePlan { source, diffs }))
    }

    /// Plans for every site of a mixin member, or the first failure.
    fn plan_declaration<'d>(
        &self,
        unit_source: &str,
        decl: &'d Declaration,
        ctx: MixinContext,
    ) -> Result<Vec<(&'d AnnotationSite, SitePlan)>, DeclarationError> {
        let transformer = MixinTransformer::new(ctx);
        let mut plans = Vec::new();
        for site in &decl.annotations {
            if let Some(plan) = self.plan_site(unit_source, site, &transformer)? {
                plans.push((site, plan));
            }
        }
        Ok(plans)
    }

    /// Run the pipeline for one declaration, recording its edits in
    /// `edits`. Either every site of the declaration is patched or none is.
    pub fn process_declaration(
        &self,
        unit_source: &str,
        decl: &Declaration,
        edits: &mut EditBuffer,
    ) -> Result<DeclarationOutcome, UnitError> {
        let ctx = match self.context(decl)? {
            Ok(ctx) => ctx,
            Err(status) => return Ok(DeclarationOutcome::status(status)),
        };
        let plans = match self.plan_declaration(unit_source, decl, ctx) {
            Ok(plans) => plans,
            Err(error) => {
                tracing::warn!(declaration = %decl.name, kind = error.kind(), %error, "declaration left unmodified");
                let mut outcome = DeclarationOutcome::status(DeclarationStatus::Failed);
                outcome.diagnostics.push(diagnostic(decl, error.kind(), error.to_string()));
                return Ok(outcome);
            }
        };

        let mut scratch = EditBuffer::new(unit_source);
        let mut outcome = DeclarationOutcome::status(DeclarationStatus::Unchanged);
        for (_, plan) in &plans {
            let report = patch::apply(&plan.source, &plan.diffs, &mut scratch)?;
            outcome.applied += report.applied;
            outcome.diagnostics.extend(report.skipped.iter().map(|s| leaf_diagnostic(decl, s)));
        }
        for edit in scratch.edits() {
            edits.replace(edit.span, edit.replacement.clone())?;
        }
        if outcome.applied > 0 {
            outcome.status = DeclarationStatus::Patched;
            tracing::debug!(declaration = %decl.name, applied = outcome.applied, "declaration patched");
        }
        Ok(outcome)
    }

    pub fn process_unit(&self, unit: &CompilationUnit) -> Result<UnitReport, UnitError> {
        let _span = tracing::debug_span!("unit", path = %unit.path.display()).entered();
        let mut edits = EditBuffer::new(&unit.source);
        let mut diagnostics = Vec::new();
        let mut skipped_declarations = Vec::new();
        for decl in &unit.declarations {
            let outcome = self.process_declaration(&unit.source, decl, &mut edits)?;
            if outcome.status == DeclarationStatus::Skipped {
                skipped_declarations.push(decl.name.clone());
            }
            diagnostics.extend(outcome.diagnostics);
        }
        let patched = if edits.is_empty() { None } else { Some(edits.apply(&unit.source)?) };
        tracing::info!(
            edits = edits.len(),
            diagnostics = diagnostics.len(),
            skipped = skipped_declarations.len(),
            "unit processed"
        );
        Ok(UnitReport {
            path: unit.path.clone(),
            patched,
            edits: edits.edits().to_vec(),
            diagnostics,
            skipped_declarations,
        })
    }

    /// One task per unit on the rayon pool. Results keep input order.
    pub fn process_units(&self, units: &[CompilationUnit]) -> Vec<Result<UnitReport, UnitError>> {
        units.par_iter().map(|unit| self.process_unit(unit)).collect()
    }

    /// Leaf differences per annotation site, without touching the source.
    pub fn diff_unit(&self, unit: &CompilationUnit) -> Result<UnitDiff, UnitError> {
        let mut report = UnitDiff {
            path: unit.path.clone(),
            sites: Vec::new(),
            diagnostics: Vec::new(),
            skipped_declarations: Vec::new(),
        };
        for decl in &unit.declarations {
            let ctx = match self.context(decl)? {
                Ok(ctx) => ctx,
                Err(DeclarationStatus::Skipped) => {
                    report.skipped_declarations.push(decl.name.clone());
                    continue;
                }
                Err(_) => continue,
            };
            match self.plan_declaration(&unit.source, decl, ctx) {
                Ok(plans) => report.sites.extend(plans.into_iter().map(|(site, plan)| SiteDiff {
                    declaration: decl.name.clone(),
                    annotation: site.binding.type_name.clone(),
                    span: site.span,
                    diffs: plan.diffs,
                })),
                Err(error) => report.diagnostics.push(diagnostic(decl, error.kind(), error.to_string())),
            }
        }
        Ok(report)
    }
}
