//! # Reference Resolver
//!
//! Replaces the nominal placeholders of a built node with `$ref`s to
//! canonical identifiers, building and registering each referenced type
//! exactly once.
//!
//! ## Algorithm
//!
//! The walk is depth-first. For each placeholder:
//!
//! 1. Mint the identifier `{base_uri}/{schema_name}.schema.json` and claim
//!    it for the type (two types on one identifier is a collision).
//! 2. If the identifier is not in the visiting set, not staged by this
//!    walk and not registered, build the type, resolve it recursively with
//!    the identifier marked as visiting, then stage it.
//! 3. Replace the placeholder with a `$ref` in every case.
//!
//! A type met again while it is still being expanded is only referenced,
//! which is what terminates cyclic graphs.
//!
//! ## Commit
//!
//! Everything one root expands, the root included, is committed to the
//! shared registry in a single batch once the walk completes. A committed
//! batch is closed: each of its references is either in the batch or was
//! already registered. Another root therefore never observes a definition
//! whose cycle partner is still being expanded.
//!
//! Definitions are deduplicated by identifier, never by structure: two
//! identical shapes under different names stay separate.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use schemaforge_core::{BaseUri, CanonicalId, TypeDescriptor, TypeName};

use crate::builder::SchemaBuilder;
use crate::error::GenerationError;
use crate::extract::TypeGraph;
use crate::node::SchemaNode;
use crate::registry::{Definition, DefinitionRegistry};

/// A root type with everything its document needs.
#[derive(Debug, Clone)]
pub struct ResolvedRoot {
    pub definition: Arc<Definition>,
    /// Definitions reachable from the root, excluding the root, in
    /// depth-first discovery order.
    pub definitions: Vec<Arc<Definition>>,
}

/// Resolves the nominal references of one root's type graph.
pub struct ReferenceResolver<'a> {
    graph: &'a TypeGraph,
    builder: SchemaBuilder<'a>,
    registry: &'a DefinitionRegistry,
    base: &'a BaseUri,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(
        graph: &'a TypeGraph,
        builder: SchemaBuilder<'a>,
        registry: &'a DefinitionRegistry,
        base: &'a BaseUri,
    ) -> Self {
        Self {
            graph,
            builder,
            registry,
            base,
        }
    }

    /// Canonical identifier of `descriptor`.
    pub fn canonical_id(&self, descriptor: &TypeDescriptor) -> CanonicalId {
        CanonicalId::new(self.base, &descriptor.schema_name)
    }

    /// Build and resolve `root`, then collect the definitions it reaches.
    ///
    /// # Errors
    ///
    /// - `IdentifierCollision` if two reachable types share an identifier.
    /// - `UnresolvedReference` if a referenced definition was never
    ///   registered.
    pub fn resolve_root(&self, root: &TypeName) -> Result<ResolvedRoot, GenerationError> {
        let descriptor = self.descriptor(root)?;
        let id = self.canonical_id(descriptor);
        self.registry.claim(&id, root)?;

        let mut walk = Walk {
            visiting: HashSet::from([id.clone()]),
            staged: IndexMap::new(),
        };
        self.expand(descriptor, id.clone(), &mut walk)?;
        tracing::trace!(root = %id, staged = walk.staged.len(), "committing expansion");
        self.registry.register_all(walk.staged.into_values());

        let definition = self
            .registry
            .get(&id)
            .ok_or_else(|| GenerationError::UnresolvedReference(id.clone()))?;
        let definitions = self.reachable(&definition)?;
        Ok(ResolvedRoot {
            definition,
            definitions,
        })
    }

    fn descriptor(&self, name: &TypeName) -> Result<&'a TypeDescriptor, GenerationError> {
        self.graph
            .get(name)
            .ok_or_else(|| GenerationError::UnsupportedType {
                type_name: name.qualified(),
                path: String::new(),
                reason: "type was not extracted".to_string(),
            })
    }

    /// Build, resolve and stage one type. `id` must already be in
    /// `walk.visiting`; it moves to `walk.staged` once resolved.
    fn expand(&self, descriptor: &TypeDescriptor, id: CanonicalId, walk: &mut Walk) -> Result<(), GenerationError> {
        let mut node = self.builder.build(descriptor);
        self.resolve_node(&mut node, walk)?;
        walk.visiting.remove(&id);
        walk.staged.insert(
            id.clone(),
            Definition {
                references: node.references(),
                id,
                type_name: descriptor.name.clone(),
                schema_name: descriptor.schema_name.clone(),
                node,
            },
        );
        Ok(())
    }

    fn resolve_node(&self, node: &mut SchemaNode, walk: &mut Walk) -> Result<(), GenerationError> {
        match node {
            SchemaNode::Nominal { name, keywords } => {
                let descriptor = self.descriptor(name)?;
                let id = self.canonical_id(descriptor);
                self.registry.claim(&id, name)?;
                if walk.visiting.contains(&id) {
                    tracing::trace!(id = %id, "cycle, referencing in-progress type");
                } else if !walk.staged.contains_key(&id) && !self.registry.contains(&id) {
                    walk.visiting.insert(id.clone());
                    self.expand(descriptor, id.clone(), walk)?;
                }
                *node = SchemaNode::Ref {
                    target: id,
                    keywords: std::mem::take(keywords),
                };
            }
            SchemaNode::Array { items, .. } => self.resolve_node(items, walk)?,
            SchemaNode::Nullable(inner) => self.resolve_node(inner, walk)?,
            SchemaNode::OneOf { variants, .. } => {
                for variant in variants {
                    self.resolve_node(variant, walk)?;
                }
            }
            SchemaNode::Object(object) => {
                for child in object.all_of.iter_mut().chain(object.properties.values_mut()) {
                    self.resolve_node(child, walk)?;
                }
                if let Some(additional) = object.additional_properties.as_deref_mut() {
                    self.resolve_node(additional, walk)?;
                }
            }
            SchemaNode::Any(_)
            | SchemaNode::Null(_)
            | SchemaNode::Scalar { .. }
            | SchemaNode::Enum { .. }
            | SchemaNode::Ref { .. } => {}
        }
        Ok(())
    }

    /// Definitions reachable from `root` in depth-first preorder, each once.
    ///
    /// Computed from the registered definitions' own reference lists, so
    /// the order does not depend on which root registered a shared type.
    fn reachable(&self, root: &Definition) -> Result<Vec<Arc<Definition>>, GenerationError> {
        let mut seen = HashSet::from([root.id.clone()]);
        let mut ordered = Vec::new();
        let mut stack: Vec<CanonicalId> = root.references.iter().rev().cloned().collect();

        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let definition = self
                .registry
                .get(&id)
                .ok_or_else(|| GenerationError::UnresolvedReference(id.clone()))?;
            stack.extend(definition.references.iter().rev().cloned());
            ordered.push(definition);
        }
        Ok(ordered)
    }
}

/// State of one root's walk.
struct Walk {
    /// Types whose expansion is in progress.
    visiting: HashSet<CanonicalId>,
    /// Fully resolved types awaiting commit, in completion order.
    staged: IndexMap<CanonicalId, Definition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
    use crate::extract::Extractor;
    use schemaforge_core::{CompilationUnit, DeclarationFile, GenerationConfig};

    const ZOO: &str = r#"
package: com.example
types:
  - name: Possum
    schema: {}
    properties:
      - name: children
        type: list<Possum>?
      - name: environment
        type: Environment?
      - name: birthplace
        type: Environment?
    nested:
      - name: Environment
        properties:
          - name: neighbour
            type: Salamander?
          - name: owner
            type: Possum?
  - name: Salamander
    schema: {}
    properties:
      - name: home
        type: Possum.Environment
"#;

    fn fixture() -> (CompilationUnit, GenerationConfig) {
        let file = DeclarationFile::from_yaml_str(ZOO, "zoo.yaml").unwrap();
        let unit = CompilationUnit::from_files([("zoo.yaml".to_string(), file)]).unwrap();
        let config = GenerationConfig {
            base_uri: Some(BaseUri::parse("https://example.com/schemas").unwrap()),
            ..GenerationConfig::default()
        };
        (unit, config)
    }

    fn resolve(
        unit: &CompilationUnit,
        config: &GenerationConfig,
        registry: &DefinitionRegistry,
        root: &TypeName,
    ) -> ResolvedRoot {
        let sink = DiagnosticSink::new();
        let graph = Extractor::new(unit, config, &sink).extract(root).unwrap();
        let base = config.base_uri.as_ref().unwrap();
        let builder = SchemaBuilder::new(config, &sink);
        ReferenceResolver::new(&graph, builder, registry, base)
            .resolve_root(root)
            .unwrap()
    }

    fn schema_names(resolved: &ResolvedRoot) -> Vec<&str> {
        resolved
            .definitions
            .iter()
            .map(|d| d.schema_name.as_str())
            .collect()
    }

    #[test]
    fn test_cycles_terminate_with_refs() {
        let (unit, config) = fixture();
        let registry = DefinitionRegistry::new();
        let possum = TypeName::new("com.example", "Possum");
        let resolved = resolve(&unit, &config, &registry, &possum);

        assert_eq!(schema_names(&resolved), vec!["Possum.Environment", "Salamander"]);
        assert_eq!(
            resolved.definition.references,
            vec![
                CanonicalId::new(config.base_uri.as_ref().unwrap(), "Possum"),
                CanonicalId::new(config.base_uri.as_ref().unwrap(), "Possum.Environment"),
            ]
        );
        // Possum, Environment and Salamander, each once.
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_shared_type_registered_once_for_every_reference() {
        let (unit, config) = fixture();
        let registry = DefinitionRegistry::new();
        let possum = TypeName::new("com.example", "Possum");
        let resolved = resolve(&unit, &config, &registry, &possum);

        let SchemaNode::Object(object) = &resolved.definition.node else {
            panic!("expected object");
        };
        let environment = CanonicalId::new(config.base_uri.as_ref().unwrap(), "Possum.Environment");
        for property in ["environment", "birthplace"] {
            assert_eq!(object.properties[property].references(), vec![environment.clone()]);
        }
        let count = resolved
            .definitions
            .iter()
            .filter(|d| d.id == environment)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_discovery_order_independent_of_registration_order() {
        let (unit, config) = fixture();
        let salamander = TypeName::new("com.example", "Salamander");
        let possum = TypeName::new("com.example", "Possum");

        let fresh = DefinitionRegistry::new();
        let alone = resolve(&unit, &config, &fresh, &salamander);

        let shared = DefinitionRegistry::new();
        resolve(&unit, &config, &shared, &possum);
        let after_possum = resolve(&unit, &config, &shared, &salamander);

        assert_eq!(schema_names(&alone), vec!["Possum.Environment", "Possum"]);
        assert_eq!(schema_names(&alone), schema_names(&after_possum));
    }

    const TANGLE: &str = r#"
package: com.example
types:
  - name: Possum
    schema: {}
    properties:
      - name: environment
        type: Environment
      - name: children
        type: list<Possum>?
  - name: Environment
    schema: {}
    properties:
      - name: owner
        type: Possum?
      - name: friend
        type: Salamander?
  - name: Salamander
    schema: {}
    properties:
      - name: home
        type: Environment
"#;

    fn tangle() -> (CompilationUnit, GenerationConfig) {
        let file = DeclarationFile::from_yaml_str(TANGLE, "tangle.yaml").unwrap();
        let unit = CompilationUnit::from_files([("tangle.yaml".to_string(), file)]).unwrap();
        (unit, fixture().1)
    }

    #[test]
    fn test_registry_is_closed_after_each_root() {
        let (unit, config) = tangle();
        let registry = DefinitionRegistry::new();
        for root in ["Possum", "Salamander", "Environment"] {
            resolve(&unit, &config, &registry, &TypeName::new("com.example", root));
            for id in registry.ids() {
                for reference in &registry.get(&id).unwrap().references {
                    assert!(registry.contains(reference), "{id} references unregistered {reference}");
                }
            }
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_concurrent_roots_over_a_cycle_always_resolve() {
        let (unit, config) = tangle();
        let roots: Vec<TypeName> = ["Possum", "Salamander", "Environment"]
            .into_iter()
            .map(|name| TypeName::new("com.example", name))
            .collect();
        let expected: Vec<Vec<String>> = roots
            .iter()
            .map(|root| {
                let resolved = resolve(&unit, &config, &DefinitionRegistry::new(), root);
                schema_names(&resolved).into_iter().map(String::from).collect::<Vec<_>>()
            })
            .collect();

        for _ in 0..200 {
            let registry = DefinitionRegistry::new();
            let actual: Vec<Vec<String>> = std::thread::scope(|scope| {
                let handles: Vec<_> = roots
                    .iter()
                    .map(|root| {
                        let (unit, config, registry) = (&unit, &config, &registry);
                        scope.spawn(move || {
                            let resolved = resolve(unit, config, registry, root);
                            schema_names(&resolved).into_iter().map(String::from).collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_identifier_collision() {
        let yaml = r#"
types:
  - name: Llama
    schema: {}
    properties:
      - name: cousin
        type: Alpaca
  - name: Alpaca
    schema: { name: Llama }
"#;
        let file = DeclarationFile::from_yaml_str(yaml, "llama.yaml").unwrap();
        let unit = CompilationUnit::from_files([("llama.yaml".to_string(), file)]).unwrap();
        let (_, config) = fixture();
        let sink = DiagnosticSink::new();
        let root = TypeName::new("", "Llama");
        let graph = Extractor::new(&unit, &config, &sink).extract(&root).unwrap();
        let registry = DefinitionRegistry::new();
        let base = config.base_uri.as_ref().unwrap();
        let err = ReferenceResolver::new(&graph, SchemaBuilder::new(&config, &sink), &registry, base)
            .resolve_root(&root)
            .unwrap_err();
        assert!(matches!(err, GenerationError::IdentifierCollision { .. }));
    }
}
