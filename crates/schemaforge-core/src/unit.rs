//! # Compilation Units
//!
//! A compilation unit is the set of declaration files processed together
//! by one generator run. It indexes every declared type (nested types
//! included) by qualified name and exposes them through the
//! [`TypeSource`] trait, which is all the extractor needs to know about
//! where declarations come from.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::declaration::{ConfigurationDeclaration, DeclarationFile, TypeDeclaration};
use crate::error::ModelError;
use crate::identity::TypeName;

/// File extensions picked up when a directory is loaded.
const DECLARATION_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Read-only access to declared types.
pub trait TypeSource {
    /// Look up a declaration by fully qualified name.
    fn lookup(&self, qualified: &str) -> Option<(&TypeName, &TypeDeclaration)>;

    /// Types marked for standalone documents, in declaration order.
    fn roots(&self) -> Vec<TypeName>;
}

/// A declared type together with where it came from.
#[derive(Debug, Clone)]
pub struct DeclaredType {
    pub name: TypeName,
    pub declaration: TypeDeclaration,
    pub origin: String,
}

/// All declarations of one generator run.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    types: IndexMap<String, DeclaredType>,
    configurations: Vec<(String, ConfigurationDeclaration)>,
}

impl CompilationUnit {
    /// Create an empty unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a unit from already-parsed files, labelled by origin.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::DuplicateDeclaration` if two declarations share
    /// a qualified name.
    pub fn from_files(
        files: impl IntoIterator<Item = (String, DeclarationFile)>,
    ) -> Result<Self, ModelError> {
        let mut unit = Self::new();
        for (origin, file) in files {
            unit.add_file(&origin, file)?;
        }
        Ok(unit)
    }

    /// Load declaration files. Directories are scanned (non-recursively)
    /// for `.yaml`, `.yml` and `.json` files in file-name order.
    pub fn load(paths: &[PathBuf]) -> Result<Self, ModelError> {
        let mut unit = Self::new();
        for path in paths {
            for file_path in expand_path(path)? {
                let file = DeclarationFile::load(&file_path)?;
                unit.add_file(&file_path.display().to_string(), file)?;
            }
        }
        Ok(unit)
    }

    /// Add one parsed file.
    pub fn add_file(&mut self, origin: &str, file: DeclarationFile) -> Result<(), ModelError> {
        if let Some(configuration) = file.configuration {
            self.configurations.push((origin.to_string(), configuration));
        }
        let package = file.package.unwrap_or_default();
        for declaration in file.types {
            let name = TypeName::new(package.clone(), declaration.name.clone());
            self.add_type(origin, name, declaration)?;
        }
        Ok(())
    }

    fn add_type(
        &mut self,
        origin: &str,
        name: TypeName,
        mut declaration: TypeDeclaration,
    ) -> Result<(), ModelError> {
        let nested = std::mem::take(&mut declaration.nested);
        let qualified = name.qualified();
        if let Some(existing) = self.types.get(&qualified) {
            return Err(ModelError::DuplicateDeclaration {
                name: qualified,
                first: existing.origin.clone(),
                second: origin.to_string(),
            });
        }
        self.types.insert(
            qualified,
            DeclaredType {
                name: name.clone(),
                declaration,
                origin: origin.to_string(),
            },
        );
        for child in nested {
            let child_name = name.nested(child.name.clone());
            self.add_type(origin, child_name, child)?;
        }
        Ok(())
    }

    /// Configuration blocks found, with their origins.
    pub fn configurations(&self) -> &[(String, ConfigurationDeclaration)] {
        &self.configurations
    }

    /// All declared types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &DeclaredType> {
        self.types.values()
    }

    /// Number of declared types, nested ones included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeSource for CompilationUnit {
    fn lookup(&self, qualified: &str) -> Option<(&TypeName, &TypeDeclaration)> {
        self.types
            .get(qualified)
            .map(|declared| (&declared.name, &declared.declaration))
    }

    fn roots(&self) -> Vec<TypeName> {
        self.types
            .values()
            .filter(|declared| declared.declaration.schema.is_some())
            .map(|declared| declared.name.clone())
            .collect()
    }
}

fn expand_path(path: &Path) -> Result<Vec<PathBuf>, ModelError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        let is_declaration = entry_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DECLARATION_EXTENSIONS.contains(&ext));
        if entry_path.is_file() && is_declaration {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}
