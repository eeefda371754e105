//! # Type Model Extractor
//!
//! Produces [`TypeDescriptor`]s for a root type and for every nominal type
//! reachable from it through properties, collection elements, map values,
//! additional properties and union variants.
//!
//! ## Design
//!
//! Declarations are read through [`TypeSource`] only. The result is a
//! [`TypeGraph`]: an arena of descriptors keyed by [`TypeName`], with
//! references between types expressed as `TypeRef::Named` rather than
//! pointers, so cyclic declarations need no special handling here.
//!
//! Type names written in a property are resolved against the declaring
//! type's own scope first, then each enclosing type, then the package, and
//! finally as a fully qualified name.
//!
//! An `unwrapped` property is replaced by the properties of its object
//! type, resolved in that type's scope. The unwrapped type itself is not
//! referenced unless something else names it.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use schemaforge_core::{
    validate_schema_name, ConstraintDescriptor, DeclaredKind, DiagnosticKind, GenerationConfig,
    Primitive, PropertyDeclaration, PropertyDescriptor, ScalarType, TypeDeclaration, TypeDescriptor,
    TypeExpr, TypeKind, TypeName, TypeRef, TypeSource, UnionVariant,
};

use crate::diagnostics::DiagnosticSink;
use crate::error::GenerationError;

/// Discriminator property of a union when none is declared.
pub const DEFAULT_DISCRIMINATOR: &str = "type";

/// Descriptors of every type reachable from one root, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: IndexMap<TypeName, TypeDescriptor>,
}

impl TypeGraph {
    pub fn get(&self, name: &TypeName) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Builds [`TypeGraph`]s from a [`TypeSource`].
pub struct Extractor<'a, S: TypeSource + ?Sized> {
    source: &'a S,
    config: &'a GenerationConfig,
    diagnostics: &'a DiagnosticSink,
}

impl<'a, S: TypeSource + ?Sized> Extractor<'a, S> {
    pub fn new(source: &'a S, config: &'a GenerationConfig, diagnostics: &'a DiagnosticSink) -> Self {
        Self {
            source,
            config,
            diagnostics,
        }
    }

    /// Describe `root` and every type reachable from it.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` naming the offending type and property
    /// path when a reachable type cannot be represented, and
    /// `Model(InvalidSchemaName)` for an unusable schema name override.
    pub fn extract(&self, root: &TypeName) -> Result<TypeGraph, GenerationError> {
        let mut graph = TypeGraph::default();
        let mut pending = VecDeque::from([root.clone()]);

        while let Some(name) = pending.pop_front() {
            if graph.contains(&name) {
                continue;
            }
            let (name, declaration) = self.declaration(&name)?;
            let mut discovered = Vec::new();
            let descriptor = self.describe(name, declaration, &mut discovered)?;
            tracing::debug!(type_name = %descriptor.name, "described type");
            graph.types.insert(descriptor.name.clone(), descriptor);
            pending.extend(discovered.into_iter().filter(|n| !graph.contains(n)));
        }
        Ok(graph)
    }

    fn declaration(&self, name: &TypeName) -> Result<(&'a TypeName, &'a TypeDeclaration), GenerationError> {
        self.source
            .lookup(&name.qualified())
            .ok_or_else(|| GenerationError::UnsupportedType {
                type_name: name.qualified(),
                path: String::new(),
                reason: "type is not declared".to_string(),
            })
    }

    fn describe(
        &self,
        name: &TypeName,
        declaration: &TypeDeclaration,
        discovered: &mut Vec<TypeName>,
    ) -> Result<TypeDescriptor, GenerationError> {
        let annotation = declaration.schema.as_ref();
        let schema_name = annotation
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| name.nested_name());
        validate_schema_name(&schema_name)?;

        let kind = match declaration.kind {
            DeclaredKind::Object => self.describe_object(name, declaration, discovered)?,
            DeclaredKind::Enum => {
                if declaration.values.is_empty() {
                    return Err(unsupported(name, "", "enum declares no values"));
                }
                TypeKind::Enum {
                    values: declaration.values.clone(),
                }
            }
            DeclaredKind::Union | DeclaredKind::Interface => {
                self.describe_union(name, declaration, discovered)?
            }
        };

        Ok(TypeDescriptor {
            name: name.clone(),
            schema_name,
            kind,
            title: annotation.and_then(|a| a.title.clone()),
            description: annotation
                .and_then(|a| a.description.clone())
                .or_else(|| declaration.description.clone()),
            root: annotation.is_some(),
        })
    }

    fn describe_object(
        &self,
        name: &TypeName,
        declaration: &TypeDeclaration,
        discovered: &mut Vec<TypeName>,
    ) -> Result<TypeKind, GenerationError> {
        let mut properties: IndexMap<String, PropertyDescriptor> = IndexMap::new();
        let mut unwrapping = vec![name.clone()];
        self.collect_properties(name, declaration, &mut unwrapping, &mut properties, discovered)?;
        self.check_filters(name, declaration);

        let additional_properties = declaration
            .additional_properties
            .as_ref()
            .map(|expr| self.resolve_expr(name, "additionalProperties", expr, discovered))
            .transpose()?;

        Ok(TypeKind::Object {
            properties: properties.into_values().collect(),
            additional_properties,
        })
    }

    /// Describe the properties of `declaration` into `properties`, inlining
    /// unwrapped ones. `unwrapping` holds the types being flattened.
    fn collect_properties(
        &self,
        name: &TypeName,
        declaration: &TypeDeclaration,
        unwrapping: &mut Vec<TypeName>,
        properties: &mut IndexMap<String, PropertyDescriptor>,
        discovered: &mut Vec<TypeName>,
    ) -> Result<(), GenerationError> {
        for property in declaration.properties.iter().filter(|p| !p.ignore) {
            let json_name = property.rename.clone().unwrap_or_else(|| property.name.clone());
            if !self.passes_filters(declaration, &json_name) {
                continue;
            }
            if property.unwrapped {
                self.unwrap_property(name, property, &json_name, unwrapping, properties, discovered)?;
                continue;
            }
            if properties.contains_key(&json_name) {
                return Err(unsupported(
                    name,
                    &json_name,
                    "two properties serialize under the same JSON name",
                ));
            }
            let descriptor = self.describe_property(name, property, json_name.clone(), discovered)?;
            properties.insert(json_name, descriptor);
        }
        Ok(())
    }

    fn unwrap_property(
        &self,
        owner: &TypeName,
        property: &PropertyDeclaration,
        json_name: &str,
        unwrapping: &mut Vec<TypeName>,
        properties: &mut IndexMap<String, PropertyDescriptor>,
        discovered: &mut Vec<TypeName>,
    ) -> Result<(), GenerationError> {
        let TypeExpr::Named(written) = &property.type_expr else {
            return Err(unsupported(owner, json_name, "only a non-null object type can be unwrapped"));
        };
        let (target, declaration) = self
            .resolve_name(owner, written)
            .ok_or_else(|| unsupported(owner, json_name, format!("undeclared type '{written}'")))?;
        if declaration.kind != DeclaredKind::Object {
            return Err(unsupported(owner, json_name, "only a non-null object type can be unwrapped"));
        }
        if unwrapping.contains(target) {
            return Err(unsupported(
                owner,
                json_name,
                format!("unwrapping '{target}' leads back to a type being unwrapped"),
            ));
        }
        tracing::trace!(owner = %owner, target = %target, "unwrapping property");
        unwrapping.push(target.clone());
        self.collect_properties(target, declaration, unwrapping, properties, discovered)?;
        unwrapping.pop();
        Ok(())
    }

    fn passes_filters(&self, declaration: &TypeDeclaration, json_name: &str) -> bool {
        if declaration.ignore_properties.iter().any(|p| p == json_name) {
            return false;
        }
        match &declaration.include_properties {
            Some(included) => included.iter().any(|p| p == json_name),
            None => true,
        }
    }

    /// Filters naming properties the type does not have are reported.
    fn check_filters(&self, name: &TypeName, declaration: &TypeDeclaration) {
        let known: IndexSet<String> = declaration
            .properties
            .iter()
            .map(|p| p.rename.clone().unwrap_or_else(|| p.name.clone()))
            .collect();
        let filters = declaration
            .ignore_properties
            .iter()
            .chain(declaration.include_properties.iter().flatten());
        for filter in filters.filter(|f| !known.contains(*f)) {
            self.diagnostics.record(
                DiagnosticKind::UnresolvedFilter,
                name.qualified(),
                format!("property filter '{filter}' matches no property"),
            );
        }
    }

    fn describe_property(
        &self,
        owner: &TypeName,
        property: &PropertyDeclaration,
        json_name: String,
        discovered: &mut Vec<TypeName>,
    ) -> Result<PropertyDescriptor, GenerationError> {
        let mut type_ref = self.resolve_expr(owner, &json_name, &property.type_expr, discovered)?;
        let not_null = property
            .constraints
            .iter()
            .any(|c| matches!(c, ConstraintDescriptor::NotNull));
        if not_null {
            type_ref = type_ref.into_non_null();
        }

        Ok(PropertyDescriptor {
            nullable: type_ref.is_nullable(),
            type_ref,
            name: json_name,
            declared_name: property.name.clone(),
            constraints: property.constraints.clone(),
            item_constraints: property.item_constraints.clone(),
            inclusion: property.include,
            description: property.description.clone(),
            deprecated: property.deprecated,
            read_only: property.read_only,
            write_only: property.write_only,
            default: property.default.clone(),
        })
    }

    fn describe_union(
        &self,
        name: &TypeName,
        declaration: &TypeDeclaration,
        discovered: &mut Vec<TypeName>,
    ) -> Result<TypeKind, GenerationError> {
        if declaration.variants.is_empty() {
            return Err(unsupported(
                name,
                "",
                "polymorphic type declares no variants and cannot be represented",
            ));
        }
        let mut variants = Vec::with_capacity(declaration.variants.len());
        for variant in &declaration.variants {
            let path = format!("variants.{}", variant.target);
            let (target, target_declaration) = self
                .resolve_name(name, &variant.target)
                .ok_or_else(|| unsupported(name, &path, format!("undeclared type '{}'", variant.target)))?;
            if target_declaration.kind != DeclaredKind::Object {
                return Err(unsupported(name, &path, "union variants must be object types"));
            }
            let tag = variant
                .tag
                .clone()
                .unwrap_or_else(|| target.simple_name().to_string());
            discovered.push(target.clone());
            variants.push(UnionVariant {
                tag,
                target: target.clone(),
            });
        }
        Ok(TypeKind::Union {
            discriminator: declaration
                .discriminator
                .clone()
                .unwrap_or_else(|| DEFAULT_DISCRIMINATOR.to_string()),
            variants,
        })
    }

    fn resolve_expr(
        &self,
        owner: &TypeName,
        path: &str,
        expr: &TypeExpr,
        discovered: &mut Vec<TypeName>,
    ) -> Result<TypeRef, GenerationError> {
        let resolved = match expr {
            TypeExpr::Scalar(scalar) => TypeRef::Scalar(*scalar),
            TypeExpr::Any => {
                if !self.config.allow_any {
                    return Err(unsupported(
                        owner,
                        path,
                        "'any' requires allow_any in the configuration",
                    ));
                }
                TypeRef::Any
            }
            TypeExpr::Named(written) => {
                let (target, declaration) = self
                    .resolve_name(owner, written)
                    .ok_or_else(|| unsupported(owner, path, format!("undeclared type '{written}'")))?;
                let open = declaration.kind == DeclaredKind::Interface && declaration.variants.is_empty();
                if open {
                    if !self.config.allow_any {
                        return Err(unsupported(
                            owner,
                            path,
                            format!("open polymorphic type '{target}' has no variants"),
                        ));
                    }
                    TypeRef::Any
                } else {
                    discovered.push(target.clone());
                    TypeRef::Named(target.clone())
                }
            }
            TypeExpr::List(items) | TypeExpr::Set(items) => TypeRef::Array {
                items: Box::new(self.resolve_expr(owner, &format!("{path}.items"), items, discovered)?),
                unique: matches!(expr, TypeExpr::Set(_)),
            },
            TypeExpr::Map(key, values) => {
                let string_key = matches!(
                    key.as_ref(),
                    TypeExpr::Scalar(scalar) if scalar.primitive() == Primitive::String
                        && *scalar != ScalarType::Bytes
                );
                if !string_key {
                    return Err(unsupported(
                        owner,
                        path,
                        format!("map keys must be strings, found '{key}'"),
                    ));
                }
                TypeRef::Map {
                    values: Box::new(self.resolve_expr(owner, &format!("{path}.values"), values, discovered)?),
                }
            }
            TypeExpr::Nullable(inner) => {
                TypeRef::Nullable(Box::new(self.resolve_expr(owner, path, inner, discovered)?))
            }
        };
        Ok(resolved)
    }

    fn resolve_name(&self, owner: &TypeName, written: &str) -> Option<(&'a TypeName, &'a TypeDeclaration)> {
        owner
            .scopes()
            .iter()
            .find_map(|scope| self.source.lookup(&format!("{scope}.{written}")))
            .or_else(|| self.source.lookup(written))
    }
}

fn unsupported(owner: &TypeName, path: &str, reason: impl Into<String>) -> GenerationError {
    GenerationError::UnsupportedType {
        type_name: owner.qualified(),
        path: path.to_string(),
        reason: reason.into(),
    }
}
