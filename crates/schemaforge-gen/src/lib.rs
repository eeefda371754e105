//! # schemaforge-gen: JSON Schema Generation Engine
//!
//! Compiles the declared types of a [`CompilationUnit`] into one JSON
//! Schema document per root type.
//!
//! ## Pipeline
//!
//! For each root, in its own thread:
//!
//! 1. [`extract`] describes the root and every nominal type reachable from it.
//! 2. [`builder`] turns each descriptor into a [`SchemaNode`], using
//!    [`constraints`] to map validation constraints onto keywords.
//! 3. [`reference`] replaces nominal placeholders with `$ref`s, registering
//!    each referenced type once in the shared [`DefinitionRegistry`].
//! 4. [`emit`] assembles the document, [`validate`] self-checks it, and the
//!    emitter publishes it atomically.
//!
//! The run's settings come from [`config`], resolved once per unit.
//! [`Generator`] ties the stages together.
//!
//! ## Crate Policy
//!
//! - Depends only on `schemaforge-core` internally.
//! - Output is deterministic: the same declarations produce byte-identical
//!   documents regardless of thread scheduling. Each root commits its
//!   definitions to the shared registry as one closed batch.
//! - No document is published unless it validates against its meta-schema.
//! - No `unsafe` code. No `panic!()` or `.unwrap()` outside tests.
//!
//! [`CompilationUnit`]: schemaforge_core::CompilationUnit

pub mod builder;
pub mod config;
pub mod constraints;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod extract;
pub mod generate;
pub mod node;
pub mod reference;
pub mod registry;
pub mod resources;
pub mod validate;

pub use builder::SchemaBuilder;
pub use config::resolve_configuration;
pub use constraints::{ConstraintMapper, MappedConstraints};
pub use diagnostics::DiagnosticSink;
pub use emit::{DocumentEmitter, SchemaDocument, WriteOutcome};
pub use error::GenerationError;
pub use extract::{Extractor, TypeGraph};
pub use generate::{CheckReport, GenerationReport, Generator, RootResult};
pub use node::{Keywords, ObjectNode, SchemaNode};
pub use reference::{ReferenceResolver, ResolvedRoot};
pub use registry::{Definition, DefinitionRegistry};
pub use resources::SchemaResources;
pub use validate::check_document;
