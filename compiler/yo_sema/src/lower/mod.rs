//! The module driver.
//!
//! A [`Lowering`] owns the compilation context — type interner, callable
//! registry, scope, nominal-type table — and drives one translation unit
//! through preflight registration and per-declaration lowering.
//!
//! Registration order is fixed: type aliases, then struct declarations,
//! then free functions, then impl blocks; within a phase, source order.
//! The lowering pass then revisits declarations in source order and
//! emits function bodies through the [`Emitter`](crate::emit::Emitter).

mod call_resolution;
mod deduction;
mod expr;
mod functions;
mod intrinsics;
mod registration;
mod type_resolution;

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use yo_ir::{Decl, FunctionDecl, Name, SharedInterner, StructDecl, TypeId};
use yo_types::SharedTypeInterner;

use crate::emit::{BlockToken, CtorKind, Emitter, FuncToken, ValueToken};
use crate::errors::{SemaError, SemaResult};
use crate::loader::ModuleLoader;
use crate::registry::CallableRegistry;
use crate::scope::{LocalVar, SymbolTable};

/// State of the function currently being lowered.
pub(crate) struct FunctionState {
    pub decl: Rc<FunctionDecl>,
    pub return_block: BlockToken,
    /// Slot holding the return value; `None` for void functions.
    pub retval: Option<ValueToken>,
    pub ret_type: TypeId,
}

/// Which lowering a source slot needs in the second pass.
enum Phase {
    Struct,
    Function,
    Impl,
}

/// The semantic middle-end for one translation unit.
pub struct Lowering<'e, E: Emitter> {
    pub(crate) emitter: &'e mut E,
    pub(crate) names: SharedInterner,
    pub(crate) types: SharedTypeInterner,
    pub(crate) registry: CallableRegistry,
    /// Local value bindings of the function being lowered.
    pub(crate) scope: SymbolTable<LocalVar>,
    /// Nominal-type table: struct names, type aliases, and — bracketed
    /// by markers — template-argument injections.
    pub(crate) nominal_types: SymbolTable<TypeId>,
    pub(crate) current_fn: Option<FunctionState>,
    pub(crate) startup_fns: Vec<FuncToken>,
    pub(crate) shutdown_fns: Vec<FuncToken>,
    pub(crate) loaded_modules: FxHashSet<Name>,
    /// Implicit `init` declarations per struct, for body synthesis.
    pub(crate) struct_inits: FxHashMap<Name, Rc<FunctionDecl>>,
    prelude_registered: bool,
}

impl<'e, E: Emitter> Lowering<'e, E> {
    /// Create a lowering context over an emitter and a shared string
    /// interner (the one the AST was built with).
    pub fn new(emitter: &'e mut E, names: SharedInterner) -> Self {
        Lowering {
            emitter,
            names,
            types: SharedTypeInterner::new(),
            registry: CallableRegistry::new(),
            scope: SymbolTable::new(),
            nominal_types: SymbolTable::new(),
            current_fn: None,
            startup_fns: Vec::new(),
            shutdown_fns: Vec::new(),
            loaded_modules: FxHashSet::default(),
            struct_inits: FxHashMap::default(),
            prelude_registered: false,
        }
    }

    /// The shared type interner of this compilation.
    pub fn types(&self) -> &SharedTypeInterner {
        &self.types
    }

    /// The shared string interner of this compilation.
    pub fn names(&self) -> &SharedInterner {
        &self.names
    }

    /// The callable registry of this compilation.
    pub fn registry(&self) -> &CallableRegistry {
        &self.registry
    }

    /// Lower a full translation unit: preflight registration in phase
    /// order, then per-declaration lowering in source order.
    pub fn lower_unit(
        &mut self,
        decls: Vec<Decl>,
        loader: &mut dyn ModuleLoader,
    ) -> SemaResult<()> {
        self.register_prelude()?;

        let mut expanded = Vec::with_capacity(decls.len());
        self.expand_uses(decls, loader, &mut expanded)?;

        let mut aliases = Vec::new();
        let mut structs: Vec<Rc<StructDecl>> = Vec::new();
        let mut pending_functions = Vec::new();
        let mut pending_impls = Vec::new();
        let mut order: Vec<(Phase, usize)> = Vec::new();

        for decl in expanded {
            match decl {
                Decl::Typealias(alias) => aliases.push(alias),
                Decl::Struct(decl) => {
                    order.push((Phase::Struct, structs.len()));
                    structs.push(Rc::new(decl));
                }
                Decl::Function(decl) => {
                    order.push((Phase::Function, pending_functions.len()));
                    pending_functions.push(decl);
                }
                Decl::Impl(block) => {
                    order.push((Phase::Impl, pending_impls.len()));
                    pending_impls.push(block);
                }
                Decl::Use(_) => {}
            }
        }

        for alias in &aliases {
            self.register_typealias(alias)?;
        }
        for decl in &structs {
            self.register_struct(decl)?;
        }
        let functions: Vec<Rc<FunctionDecl>> = pending_functions
            .into_iter()
            .map(|decl| self.register_function(decl))
            .collect::<SemaResult<_>>()?;
        let impls: Vec<Vec<Rc<FunctionDecl>>> = pending_impls
            .into_iter()
            .map(|block| self.register_impl_block(block))
            .collect::<SemaResult<_>>()?;

        debug!(
            types = self.types.len(),
            callables = self.registry.resolved_len(),
            "preflight complete"
        );

        for (phase, idx) in order {
            match phase {
                Phase::Struct => self.lower_struct(&structs[idx])?,
                Phase::Function => self.lower_registered_function(&functions[idx])?,
                Phase::Impl => {
                    for method in &impls[idx] {
                        self.lower_registered_function(method)?;
                    }
                }
            }
        }

        self.emit_ctor_arrays();
        Ok(())
    }

    /// Replace every `use` directive by the declarations of the named
    /// module, recursively. A module is loaded at most once.
    fn expand_uses(
        &mut self,
        decls: Vec<Decl>,
        loader: &mut dyn ModuleLoader,
        out: &mut Vec<Decl>,
    ) -> SemaResult<()> {
        for decl in decls {
            if let Decl::Use(use_decl) = decl {
                if self.loaded_modules.insert(use_decl.module) {
                    let module = self.names.lookup(use_decl.module);
                    let loaded = loader.load(module).map_err(|_| SemaError::ModuleNotFound {
                        module: module.to_owned(),
                        span: use_decl.span,
                    })?;
                    self.expand_uses(loaded, loader, out)?;
                }
            } else {
                out.push(decl);
            }
        }
        Ok(())
    }

    fn emit_ctor_arrays(&mut self) {
        if !self.startup_fns.is_empty() {
            self.emitter.emit_ctor_array(CtorKind::Startup, &self.startup_fns);
        }
        if !self.shutdown_fns.is_empty() {
            self.emitter.emit_ctor_array(CtorKind::Shutdown, &self.shutdown_fns);
        }
    }

    /// Run `f` with an empty local scope and no current function,
    /// restoring both (and the emitter's insertion point) afterwards.
    /// Used to emit a template instantiation from the middle of another
    /// function's body.
    pub(crate) fn with_clean_slate<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> SemaResult<T>,
    ) -> SemaResult<T> {
        let saved_scope = std::mem::take(&mut self.scope);
        let saved_fn = self.current_fn.take();
        let saved_block = self.emitter.current_block();

        let result = f(self);

        self.scope = saved_scope;
        self.current_fn = saved_fn;
        self.emitter.position_at_end(saved_block);
        result
    }

    /// Mark that the intrinsic prelude has been registered.
    pub(crate) fn prelude_done(&mut self) -> bool {
        std::mem::replace(&mut self.prelude_registered, true)
    }
}
