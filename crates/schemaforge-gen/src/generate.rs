//! # Generator
//!
//! Drives one generation run over a compilation unit: resolve the
//! configuration once, generate every root concurrently against a shared
//! [`DefinitionRegistry`], then emit or check the resulting documents.
//!
//! ## Failure Model
//!
//! Configuration errors abort the run before any root is generated, so no
//! file is written. Any other error aborts only its root; the remaining
//! roots are still generated and emitted, and the failure is reported in
//! the run's report.

use std::path::{Path, PathBuf};

use schemaforge_core::{BaseUri, CompilationUnit, Diagnostic, GenerationConfig, TypeName, TypeSource};

use crate::builder::SchemaBuilder;
use crate::config::resolve_configuration;
use crate::diagnostics::DiagnosticSink;
use crate::emit::{is_current, DocumentEmitter, SchemaDocument, WriteOutcome};
use crate::error::GenerationError;
use crate::extract::Extractor;
use crate::reference::ReferenceResolver;
use crate::registry::DefinitionRegistry;

/// Outcome of generating one root.
pub type RootResult = (TypeName, Result<SchemaDocument, GenerationError>);

/// Result of [`Generator::emit_all`].
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Files created or replaced.
    pub written: Vec<PathBuf>,
    /// Files whose content was already current.
    pub unchanged: Vec<PathBuf>,
    pub failures: Vec<(TypeName, GenerationError)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of [`Generator::check`].
#[derive(Debug, Default)]
pub struct CheckReport {
    pub current: Vec<PathBuf>,
    /// Files on disk whose content differs from what would be generated.
    pub stale: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    pub failures: Vec<(TypeName, GenerationError)>,
}

impl CheckReport {
    pub fn is_up_to_date(&self) -> bool {
        self.stale.is_empty() && self.missing.is_empty() && self.failures.is_empty()
    }
}

/// Schema generator for one compilation unit.
#[derive(Debug)]
pub struct Generator {
    unit: CompilationUnit,
    config: GenerationConfig,
    diagnostics: DiagnosticSink,
}

impl Generator {
    /// Resolve the configuration of `unit`.
    ///
    /// # Errors
    ///
    /// `AmbiguousConfiguration` or `InvalidConfiguration`.
    pub fn new(unit: CompilationUnit) -> Result<Self, GenerationError> {
        let config = resolve_configuration(&unit)?;
        tracing::debug!(types = unit.len(), draft = ?config.draft, "generator ready");
        Ok(Self {
            unit,
            config,
            diagnostics: DiagnosticSink::new(),
        })
    }

    /// Load declaration files or directories and resolve their configuration.
    pub fn load(paths: &[PathBuf]) -> Result<Self, GenerationError> {
        Self::new(CompilationUnit::load(paths)?)
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    /// Root types in declaration order.
    pub fn roots(&self) -> Vec<TypeName> {
        self.unit.roots()
    }

    /// Find a root by qualified name, nested name or schema name.
    pub fn find_root(&self, name: &str) -> Option<TypeName> {
        self.unit
            .types()
            .filter(|declared| declared.declaration.schema.is_some())
            .find(|declared| {
                let schema_name = declared
                    .declaration
                    .schema
                    .as_ref()
                    .and_then(|annotation| annotation.name.as_deref());
                declared.name.qualified() == name
                    || declared.name.nested_name() == name
                    || schema_name == Some(name)
            })
            .map(|declared| declared.name.clone())
    }

    /// Diagnostics recorded so far, sorted.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.snapshot()
    }

    /// The configured base URI.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the unit declares no configuration.
    pub fn base_uri(&self) -> Result<&BaseUri, GenerationError> {
        self.config
            .base_uri
            .as_ref()
            .ok_or_else(|| GenerationError::InvalidConfiguration {
                reason: "no base_uri configured; declare a configuration block with an absolute base_uri"
                    .to_string(),
            })
    }

    /// Generate the document of one root.
    pub fn generate_document(
        &self,
        root: &TypeName,
        registry: &DefinitionRegistry,
    ) -> Result<SchemaDocument, GenerationError> {
        let base = self.base_uri()?;
        let graph = Extractor::new(&self.unit, &self.config, &self.diagnostics).extract(root)?;
        let builder = SchemaBuilder::new(&self.config, &self.diagnostics);
        let resolved = ReferenceResolver::new(&graph, builder, registry, base).resolve_root(root)?;
        tracing::debug!(
            root = %root,
            definitions = resolved.definitions.len(),
            "generated document"
        );
        Ok(SchemaDocument {
            schema_name: resolved.definition.schema_name.clone(),
            id: resolved.definition.id.clone(),
            draft: self.config.draft,
            root: resolved.definition.node.clone(),
            definitions: resolved.definitions,
        })
    }

    /// Generate the document of every root, one thread per root.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when no base URI is configured; per-root
    /// failures are returned alongside the root.
    pub fn generate_all(&self) -> Result<Vec<RootResult>, GenerationError> {
        self.base_uri()?;
        let roots = self.roots();
        let registry = DefinitionRegistry::new();

        let results = std::thread::scope(|scope| {
            let handles: Vec<_> = roots
                .iter()
                .map(|root| {
                    let registry = &registry;
                    scope.spawn(move || self.generate_document(root, registry))
                })
                .collect();
            handles
                .into_iter()
                .zip(&roots)
                .map(|(handle, root)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                    (root.clone(), result)
                })
                .collect()
        });
        Ok(results)
    }

    /// Generate every root and publish the documents under
    /// `output_dir/{output_location}`.
    pub fn emit_all(&self, output_dir: &Path) -> Result<GenerationReport, GenerationError> {
        let documents = self.generate_all()?;
        let emitter = DocumentEmitter::new(output_dir, &self.config.output_location);
        let mut report = GenerationReport::default();

        for (root, result) in documents {
            let published = result.and_then(|document| {
                let outcome = emitter.emit(&document)?;
                Ok((emitter.path_for(&document), outcome))
            });
            match published {
                Ok((path, WriteOutcome::Written)) => report.written.push(path),
                Ok((path, WriteOutcome::Unchanged)) => report.unchanged.push(path),
                Err(e) => {
                    tracing::error!(root = %root, error = %e, "schema generation failed");
                    report.failures.push((root, e));
                }
            }
        }
        report.diagnostics = self.diagnostics();
        tracing::info!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            failed = report.failures.len(),
            "generation complete"
        );
        Ok(report)
    }

    /// Compare what would be generated with what is on disk, writing nothing.
    pub fn check(&self, output_dir: &Path) -> Result<CheckReport, GenerationError> {
        let documents = self.generate_all()?;
        let emitter = DocumentEmitter::new(output_dir, &self.config.output_location);
        let mut report = CheckReport::default();

        for (root, result) in documents {
            let rendered = result.and_then(|document| {
                document.check()?;
                let content = document.render()?;
                let path = emitter.path_for(&document);
                let current = is_current(&path, &content)?;
                Ok((path, current))
            });
            match rendered {
                Ok((path, true)) => report.current.push(path),
                Ok((path, false)) if path.exists() => report.stale.push(path),
                Ok((path, false)) => report.missing.push(path),
                Err(e) => report.failures.push((root, e)),
            }
        }
        Ok(report)
    }
}
