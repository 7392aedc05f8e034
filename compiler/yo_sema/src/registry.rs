//! The callable registry.
//!
//! Two tables back call resolution:
//!
//! - `overloads`: canonical name → candidates in registration order.
//!   Overload resolution iterates these; the order is part of the
//!   resolver's determinism contract.
//! - `resolved`: fully-mangled name → the unique resolved callable.
//!   Insert-once; template specializations are memoized here.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use yo_ir::FunctionDecl;

use crate::emit::FuncToken;

/// A callable the resolver can pick: its declaration, the declared
/// backend function (absent for templates and intrinsics), and the
/// implicit-argument offset of its kind.
#[derive(Clone, Debug)]
pub struct ResolvedCallable {
    pub decl: Rc<FunctionDecl>,
    pub func: Option<FuncToken>,
    pub arg_offset: u8,
    /// Set on registrations produced by template instantiation; such
    /// entries are reachable through the resolved table and are skipped
    /// during overload scoring.
    pub from_template: bool,
}

/// Callable tables of one compilation.
#[derive(Default)]
pub struct CallableRegistry {
    overloads: FxHashMap<String, Vec<ResolvedCallable>>,
    resolved: FxHashMap<String, ResolvedCallable>,
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates registered under a canonical name, in registration
    /// order.
    pub fn overloads_of(&self, canonical: &str) -> &[ResolvedCallable] {
        self.overloads.get(canonical).map_or(&[], Vec::as_slice)
    }

    /// Whether any overload is registered under a canonical name.
    pub fn has_overloads(&self, canonical: &str) -> bool {
        !self.overloads_of(canonical).is_empty()
    }

    /// Append a candidate under a canonical name.
    pub fn add_overload(&mut self, canonical: String, callable: ResolvedCallable) {
        self.overloads.entry(canonical).or_default().push(callable);
    }

    /// The callable resolved under a mangled name, if any.
    pub fn resolved_by_name(&self, mangled: &str) -> Option<&ResolvedCallable> {
        self.resolved.get(mangled)
    }

    /// Record the resolved callable for a mangled name.
    pub fn insert_resolved(&mut self, mangled: String, callable: ResolvedCallable) {
        self.resolved.insert(mangled, callable);
    }

    /// Number of distinct mangled names resolved.
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }
}
