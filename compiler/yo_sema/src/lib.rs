//! Semantic middle-end for the yo compiler.
//!
//! This crate implements the passes between a completed parse tree and
//! backend lowering:
//!
//! - type-descriptor resolution against a scoped environment
//! - the callable registry and name mangling
//! - overload resolution with template-argument deduction and on-demand
//!   specialization
//! - type-directed expression elaboration (literal coercion, operator
//!   normalization, `match` and cast validation)
//! - the module driver: preflight registration in phase order, then
//!   per-declaration lowering through the [`emit::Emitter`] contract
//!
//! The backend and the module source store are collaborators behind the
//! [`emit::Emitter`] and [`ModuleLoader`] traits; this crate never
//! touches LLVM or the filesystem itself.

pub mod emit;
pub mod mangle;
pub mod tracing_setup;

mod errors;
mod loader;
mod lower;
mod registry;
mod scope;
mod specialize;

pub use errors::{SemaError, SemaResult};
pub use loader::{LoadError, ModuleLoader, NoModules};
pub use lower::Lowering;
pub use registry::{CallableRegistry, ResolvedCallable};
pub use scope::{LocalVar, ScopeMarker, SymbolTable};
pub use specialize::TemplateSpecializer;
