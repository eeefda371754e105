//! # schemaforge-core: Declaration Model for SchemaForge
//!
//! This crate defines everything the schema generator reads: declaration
//! files, the type-expression grammar, the structural descriptors built
//! from declarations, validation constraints, generation settings, and
//! the identifiers under which schemas are published. It performs no
//! generation itself; `schemaforge-gen` does.
//!
//! ## Key Design Principles
//!
//! 1. **Explicit descriptors.** Types reach the generator as
//!    [`TypeDescriptor`]/[`PropertyDescriptor`]/[`ConstraintDescriptor`]
//!    values, never as language metadata. Declaration files are one
//!    front-end; anything implementing [`TypeSource`] is another.
//!
//! 2. **Nominal vs. structural.** Named types are [`TypeDescriptor`]s and
//!    receive their own definition. Scalars, collections and nullability
//!    are [`TypeRef`]s folded into the referencing schema.
//!
//! 3. **Identifier newtypes.** [`TypeName`], [`BaseUri`] and
//!    [`CanonicalId`] are distinct types; an identifier can only be minted
//!    from a validated base URI.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `schemaforge-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod constraint;
pub mod declaration;
pub mod descriptor;
pub mod diagnostic;
pub mod error;
pub mod identity;
pub mod type_expr;
pub mod unit;

// Re-export primary types for ergonomic imports.
pub use config::{DescriptionPolicy, Draft, GenerationConfig, NullInclusion, TitlePolicy};
pub use constraint::{ConstraintDescriptor, MAX_DIGITS};
pub use declaration::{
    ConfigurationDeclaration, DeclarationFile, DeclaredKind, PropertyDeclaration,
    SchemaAnnotation, TypeDeclaration, VariantDeclaration,
};
pub use descriptor::{
    InclusionPolicy, Primitive, PropertyDescriptor, ScalarType, Shape, TypeDescriptor, TypeKind,
    TypeRef, UnionVariant,
};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::ModelError;
pub use identity::{validate_schema_name, BaseUri, CanonicalId, TypeName, SCHEMA_FILE_SUFFIX};
pub use type_expr::TypeExpr;
pub use unit::{CompilationUnit, DeclaredType, TypeSource};
