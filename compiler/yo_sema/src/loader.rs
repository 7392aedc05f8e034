//! The module-loading contract.

use std::fmt;

use yo_ir::Decl;

/// Error produced by a module loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No module with this name is available.
    NotFound { module: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound { module } => write!(f, "module '{}' not found", module),
        }
    }
}

impl std::error::Error for LoadError {}

/// Provides the declarations of named library modules.
///
/// The driver calls `load` during preflight for every `use` directive
/// naming a module not yet loaded; each module is loaded at most once
/// per compilation.
pub trait ModuleLoader {
    fn load(&mut self, module: &str) -> Result<Vec<Decl>, LoadError>;
}

/// A loader with no modules. Units without `use` directives compile
/// against it.
pub struct NoModules;

impl ModuleLoader for NoModules {
    fn load(&mut self, module: &str) -> Result<Vec<Decl>, LoadError> {
        Err(LoadError::NotFound {
            module: module.to_owned(),
        })
    }
}
