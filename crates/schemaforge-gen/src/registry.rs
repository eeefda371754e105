//! # Definition Registry
//!
//! The deduplicated set of named schema definitions of one generation run,
//! keyed by canonical identifier. Roots generated concurrently share one
//! registry.
//!
//! ## Invariants
//!
//! - At most one definition is committed per identifier. The first
//!   registration wins; later registrations get the committed definition
//!   back and their own copy is dropped.
//! - An identifier belongs to exactly one type. Claiming an identifier
//!   already claimed by a different type is an `IdentifierCollision`.
//! - A batch passed to `register_all` becomes visible atomically.
//! - Insertion order is preserved.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use schemaforge_core::{CanonicalId, TypeName};

use crate::error::GenerationError;
use crate::node::SchemaNode;

/// A registered nominal type.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub id: CanonicalId,
    pub type_name: TypeName,
    /// Key under `$defs` and file stem of standalone documents.
    pub schema_name: String,
    /// Fully resolved node: nominal placeholders replaced by `$ref`s.
    pub node: SchemaNode,
    /// Identifiers referenced from `node`, in order of first occurrence.
    pub references: Vec<CanonicalId>,
}

#[derive(Debug, Default)]
struct RegistryState {
    definitions: IndexMap<CanonicalId, Arc<Definition>>,
    claims: IndexMap<CanonicalId, TypeName>,
}

/// Shared, synchronized store of definitions.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    state: RwLock<RegistryState>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `id` for `type_name`.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierCollision` if a different type already holds `id`.
    pub fn claim(&self, id: &CanonicalId, type_name: &TypeName) -> Result<(), GenerationError> {
        if let Some(owner) = self.state.read().claims.get(id) {
            return check_owner(id, owner, type_name);
        }
        let mut state = self.state.write();
        match state.claims.get(id) {
            Some(owner) => check_owner(id, owner, type_name),
            None => {
                state.claims.insert(id.clone(), type_name.clone());
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &CanonicalId) -> Option<Arc<Definition>> {
        self.state.read().definitions.get(id).cloned()
    }

    pub fn contains(&self, id: &CanonicalId) -> bool {
        self.state.read().definitions.contains_key(id)
    }

    /// Commit `definition` unless its identifier is already registered.
    /// Returns the committed definition either way.
    pub fn register(&self, definition: Definition) -> Arc<Definition> {
        commit(&mut self.state.write(), definition)
    }

    /// Commit a batch under one write lock, so readers see either none or
    /// all of it. Identifiers already registered keep their definition.
    /// Returns the committed definitions in batch order.
    pub fn register_all(&self, definitions: impl IntoIterator<Item = Definition>) -> Vec<Arc<Definition>> {
        let mut state = self.state.write();
        definitions
            .into_iter()
            .map(|definition| commit(&mut state, definition))
            .collect()
    }

    /// Registered identifiers in insertion order.
    pub fn ids(&self) -> Vec<CanonicalId> {
        self.state.read().definitions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().definitions.is_empty()
    }
}

fn commit(state: &mut RegistryState, definition: Definition) -> Arc<Definition> {
    if let Some(existing) = state.definitions.get(&definition.id) {
        tracing::trace!(id = %definition.id, "definition already registered");
        return Arc::clone(existing);
    }
    tracing::debug!(id = %definition.id, type_name = %definition.type_name, "registered definition");
    let committed = Arc::new(definition);
    state
        .definitions
        .insert(committed.id.clone(), Arc::clone(&committed));
    committed
}

fn check_owner(id: &CanonicalId, owner: &TypeName, claimant: &TypeName) -> Result<(), GenerationError> {
    if owner == claimant {
        Ok(())
    } else {
        Err(GenerationError::IdentifierCollision {
            id: id.clone(),
            first: owner.clone(),
            second: claimant.clone(),
        })
    }
}
