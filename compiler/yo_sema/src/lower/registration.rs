//! Preflight registration.
//!
//! Enters every top-level entity into the nominal-type table and the
//! callable registry before any body is lowered, so that declarations
//! may reference each other regardless of source order (within the
//! phase ordering the driver enforces).

use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::debug;

use yo_ir::{
    CallingConv, FunctionAttributes, FunctionDecl, FunctionKind, FunctionSignature, ImplBlock,
    SideEffect, Span, StructDecl, TypeDesc, TypeId, TypealiasDecl,
};

use crate::emit::{Emitter, Linkage};
use crate::errors::{SemaError, SemaResult};
use crate::mangle;
use crate::registry::ResolvedCallable;

use super::Lowering;

impl<E: Emitter> Lowering<'_, E> {
    /// Canonical name of a declaration.
    pub(crate) fn canonical_of(&self, decl: &FunctionDecl) -> String {
        let name = self.names.lookup(decl.name);
        let owner = decl.owner.map(|owner| self.names.lookup(owner));
        mangle::canonical_name(decl.kind, owner, name)
    }

    /// Linkage symbol of a declaration with fully-resolved types.
    pub(crate) fn linkage_name(
        &self,
        decl: &FunctionDecl,
        param_types: &[TypeId],
        ret: TypeId,
    ) -> String {
        let plain = self.names.lookup(decl.name);
        if decl.attrs.no_mangle {
            return plain.to_owned();
        }
        if let Some(explicit) = &decl.attrs.mangled_name {
            return explicit.clone();
        }
        let owner = decl.owner.map(|owner| self.names.lookup(owner));
        mangle::mangled_name(
            decl.kind,
            owner,
            plain,
            param_types,
            ret,
            &self.types,
            &self.names,
        )
    }

    /// Register a type alias in the nominal-type table.
    pub(crate) fn register_typealias(&mut self, alias: &TypealiasDecl) -> SemaResult<()> {
        let ty = self.resolve_type_desc(&alias.ty, true)?;
        self.nominal_types.insert(alias.name, ty);
        Ok(())
    }

    /// Register a struct declaration: create its canonical type and,
    /// unless suppressed, the implicit `init` static method whose
    /// parameters are the fields in declaration order.
    pub(crate) fn register_struct(&mut self, decl: &Rc<StructDecl>) -> SemaResult<()> {
        let plain = self.names.lookup(decl.name);

        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            if fields.iter().any(|&(name, _)| name == field.name) {
                return Err(SemaError::Redefinition {
                    name: format!("{}.{}", plain, self.names.lookup(field.name)),
                    span: field.span,
                });
            }
            let ty = self.resolve_type_desc(&field.ty, true)?;
            fields.push((field.name, ty));
        }

        let struct_ty = self
            .types
            .make_struct(decl.name, fields, decl.span)
            .map_err(|_| SemaError::Redefinition {
                name: plain.to_owned(),
                span: decl.span,
            })?;
        self.nominal_types.insert(decl.name, struct_ty);
        debug!(name = plain, "registered struct");

        if !decl.attrs.no_init {
            let ptr = self.types.pointer_to(struct_ty);
            let init_decl = FunctionDecl {
                name: self.names.intern("init"),
                kind: FunctionKind::StaticMethod,
                sig: FunctionSignature {
                    params: decl.fields.iter().map(|field| field.ty.clone()).collect(),
                    ret: TypeDesc::resolved(ptr, decl.span),
                    is_variadic: false,
                    template_params: Vec::new(),
                    conv: CallingConv::C,
                },
                param_names: decl.fields.iter().map(|field| field.name).collect(),
                attrs: FunctionAttributes::default(),
                body: None,
                owner: Some(decl.name),
                span: decl.span,
            };
            let registered = self.register_function(init_decl)?;
            self.struct_inits.insert(decl.name, registered);
        }
        Ok(())
    }

    /// Register a function declaration, declaring its symbol through the
    /// emitter unless it is a template or an intrinsic.
    pub(crate) fn register_function(
        &mut self,
        mut decl: FunctionDecl,
    ) -> SemaResult<Rc<FunctionDecl>> {
        decl.attrs.validate().map_err(|err| SemaError::InvalidAttribute {
            message: err.to_string(),
            span: decl.span,
        })?;
        if decl.attrs.extern_ {
            decl.attrs.no_mangle = true;
        }

        let plain = self.names.lookup(decl.name);
        if decl.kind == FunctionKind::Global && plain == "main" {
            decl.attrs.no_mangle = true;
            self.check_main_signature(&decl)?;
        }

        if decl.sig.is_template() || decl.attrs.intrinsic {
            let mut seen = FxHashSet::default();
            for &param in &decl.sig.template_params {
                if !seen.insert(param) {
                    return Err(SemaError::Redefinition {
                        name: self.names.lookup(param).to_owned(),
                        span: decl.span,
                    });
                }
            }
            let canonical = self.canonical_of(&decl);
            let arg_offset = decl.kind.argument_offset();
            let registered = Rc::new(decl);
            self.registry.add_overload(
                canonical,
                ResolvedCallable {
                    decl: registered.clone(),
                    func: None,
                    arg_offset,
                    from_template: false,
                },
            );
            return Ok(registered);
        }

        let ret = self.resolve_type_desc(&decl.sig.ret, true)?;
        let mut param_types = Vec::with_capacity(decl.sig.params.len());
        for param in &decl.sig.params {
            param_types.push(self.resolve_type_desc(param, true)?);
        }

        let canonical = self.canonical_of(&decl);
        let linkage_name = self.linkage_name(&decl, &param_types, ret);

        if let Some(existing) = self.registry.resolved_by_name(&linkage_name) {
            let existing_decl = existing.decl.clone();
            let existing_func = existing.func;
            if !self.signatures_equal(&existing_decl.sig, &decl.sig)? {
                return Err(SemaError::IncompatibleRedeclaration {
                    name: plain.to_owned(),
                    span: decl.span,
                });
            }
            if existing_decl.body.is_some() && decl.body.is_some() {
                return Err(SemaError::Redefinition {
                    name: plain.to_owned(),
                    span: decl.span,
                });
            }
            if decl.body.is_some() {
                // The definition supersedes the forward declaration; the
                // declared symbol is reused.
                let arg_offset = decl.kind.argument_offset();
                let registered = Rc::new(decl);
                self.registry.insert_resolved(
                    linkage_name,
                    ResolvedCallable {
                        decl: registered.clone(),
                        func: existing_func,
                        arg_offset,
                        from_template: false,
                    },
                );
                return Ok(registered);
            }
            return Ok(existing_decl);
        }

        let fn_type = self.types.function(ret, param_types.clone(), decl.sig.conv);
        let func = self.emitter.declare_function(
            &linkage_name,
            fn_type,
            decl.sig.is_variadic,
            Linkage::External,
            &self.types,
        );
        debug!(name = plain, symbol = linkage_name.as_str(), "registered function");

        if decl.attrs.startup || decl.attrs.shutdown {
            if !param_types.is_empty() || ret != TypeId::VOID {
                return Err(SemaError::TypeMismatch {
                    expected: "() -> void".to_owned(),
                    found: self.display_type(fn_type),
                    context: "startup/shutdown function signature",
                    span: decl.span,
                });
            }
            if decl.attrs.startup {
                self.startup_fns.push(func);
            }
            if decl.attrs.shutdown {
                self.shutdown_fns.push(func);
            }
        }

        let arg_offset = decl.kind.argument_offset();
        let registered = Rc::new(decl);
        let callable = ResolvedCallable {
            decl: registered.clone(),
            func: Some(func),
            arg_offset,
            from_template: false,
        };
        self.registry.insert_resolved(linkage_name, callable.clone());
        self.registry.add_overload(canonical, callable);
        Ok(registered)
    }

    /// `main` must be `() -> i32` or `(i32, **i8) -> i32`.
    fn check_main_signature(&mut self, decl: &FunctionDecl) -> SemaResult<()> {
        let ret = self.resolve_type_desc(&decl.sig.ret, true)?;
        let ok = if decl.sig.params.is_empty() {
            ret == TypeId::I32
        } else if decl.sig.params.len() == 2 {
            let first = self.resolve_type_desc(&decl.sig.params[0], true)?;
            let second = self.resolve_type_desc(&decl.sig.params[1], true)?;
            let argv = {
                let inner = self.types.pointer_to(TypeId::I8);
                self.types.pointer_to(inner)
            };
            ret == TypeId::I32 && first == TypeId::I32 && second == argv
        } else {
            false
        };
        if ok {
            Ok(())
        } else {
            Err(SemaError::TypeMismatch {
                expected: "() -> i32 or (i32, **i8) -> i32".to_owned(),
                found: self.display_signature(decl),
                context: "signature of 'main'",
                span: decl.span,
            })
        }
    }

    /// Register the methods of an impl block. A method whose first
    /// parameter is named `self` and resolves to a pointer to the impl
    /// type becomes an instance method; anything else is static.
    pub(crate) fn register_impl_block(
        &mut self,
        block: ImplBlock,
    ) -> SemaResult<Vec<Rc<FunctionDecl>>> {
        let ty = self
            .nominal_types
            .get(block.type_name)
            .copied()
            .ok_or_else(|| SemaError::UnknownType {
                name: self.names.lookup(block.type_name).to_owned(),
                span: block.span,
            })?;
        if !self.types.is_struct(ty) {
            return Err(SemaError::TypeMismatch {
                expected: "a struct type".to_owned(),
                found: self.display_type(ty),
                context: "impl block target",
                span: block.span,
            });
        }
        let self_ptr = self.types.pointer_to(ty);

        let mut registered = Vec::with_capacity(block.methods.len());
        for mut method in block.methods {
            if method.attrs.no_mangle {
                return Err(SemaError::InvalidAttribute {
                    message: "'no_mangle' is not valid on impl-block methods".to_owned(),
                    span: method.span,
                });
            }
            method.owner = Some(block.type_name);
            method.kind = FunctionKind::StaticMethod;

            let is_instance = match (method.sig.params.first(), method.param_names.first()) {
                (Some(first_ty), Some(&first_name))
                    if !method.sig.is_template() && self.names.lookup(first_name) == "self" =>
                {
                    self.resolve_type_desc(first_ty, false)? == self_ptr
                }
                _ => false,
            };
            if is_instance {
                method.kind = FunctionKind::InstanceMethod;
            }
            registered.push(self.register_function(method)?);
        }
        Ok(registered)
    }

    /// Register the intrinsic prelude: the operator callables and the
    /// type-level intrinsics the resolver dispatches internally.
    pub(crate) fn register_prelude(&mut self) -> SemaResult<()> {
        if self.prelude_done() {
            return Ok(());
        }

        const ARITHMETIC: [&str; 10] = [
            "__add", "__sub", "__mul", "__div", "__mod", "__and", "__or", "__xor", "__shl",
            "__shr",
        ];
        for op in ARITHMETIC {
            let t = self.names.intern("T");
            let decl = self.intrinsic_decl(
                op,
                FunctionKind::Operator,
                vec![t],
                vec![nominal(t), nominal(t)],
                nominal(t),
                &["lhs", "rhs"],
            );
            self.register_function(decl)?;
        }

        for op in ["__eq", "__lt", "__gt"] {
            let a = self.names.intern("A");
            let b = self.names.intern("B");
            let decl = self.intrinsic_decl(
                op,
                FunctionKind::Operator,
                vec![a, b],
                vec![nominal(a), nominal(b)],
                resolved(TypeId::BOOL),
                &["lhs", "rhs"],
            );
            self.register_function(decl)?;
        }

        for op in ["__land", "__lor"] {
            let decl = self.intrinsic_decl(
                op,
                FunctionKind::Operator,
                vec![],
                vec![resolved(TypeId::BOOL), resolved(TypeId::BOOL)],
                resolved(TypeId::BOOL),
                &["lhs", "rhs"],
            );
            self.register_function(decl)?;
        }

        for cast in ["static_cast", "reinterpret_cast"] {
            let t = self.names.intern("T");
            let u = self.names.intern("U");
            let decl = self.intrinsic_decl(
                cast,
                FunctionKind::Global,
                vec![t, u],
                vec![nominal(u)],
                nominal(t),
                &["value"],
            );
            self.register_function(decl)?;
        }

        let t = self.names.intern("T");
        let sizeof_decl =
            self.intrinsic_decl("sizeof", FunctionKind::Global, vec![t], vec![], resolved(TypeId::I64), &[]);
        self.register_function(sizeof_decl)?;

        let t = self.names.intern("T");
        let byte_ptr = self.types.pointer_to(TypeId::I8);
        let typename_decl = self.intrinsic_decl(
            "__typename",
            FunctionKind::Global,
            vec![t],
            vec![],
            resolved(byte_ptr),
            &[],
        );
        self.register_function(typename_decl)?;

        let a = self.names.intern("A");
        let b = self.names.intern("B");
        let is_same_decl = self.intrinsic_decl(
            "__is_same",
            FunctionKind::Global,
            vec![a, b],
            vec![],
            resolved(TypeId::BOOL),
            &[],
        );
        self.register_function(is_same_decl)?;

        let t = self.names.intern("T");
        let is_pointer_decl = self.intrinsic_decl(
            "__is_pointer",
            FunctionKind::Global,
            vec![t],
            vec![],
            resolved(TypeId::BOOL),
            &[],
        );
        self.register_function(is_pointer_decl)?;

        let trap_decl =
            self.intrinsic_decl("__trap", FunctionKind::Global, vec![], vec![], resolved(TypeId::VOID), &[]);
        self.register_function(trap_decl)?;

        Ok(())
    }

    fn intrinsic_decl(
        &self,
        name: &str,
        kind: FunctionKind,
        template_params: Vec<yo_ir::Name>,
        params: Vec<TypeDesc>,
        ret: TypeDesc,
        param_names: &[&str],
    ) -> FunctionDecl {
        debug_assert_eq!(params.len(), param_names.len());
        FunctionDecl {
            name: self.names.intern(name),
            kind,
            sig: FunctionSignature {
                params,
                ret,
                is_variadic: false,
                template_params,
                conv: CallingConv::C,
            },
            param_names: param_names.iter().map(|n| self.names.intern(n)).collect(),
            attrs: FunctionAttributes {
                intrinsic: true,
                side_effects: vec![SideEffect::None],
                ..Default::default()
            },
            body: Some(Vec::new()),
            owner: None,
            span: Span::DUMMY,
        }
    }
}

fn nominal(name: yo_ir::Name) -> TypeDesc {
    TypeDesc::nominal(name, Span::DUMMY)
}

fn resolved(ty: TypeId) -> TypeDesc {
    TypeDesc::resolved(ty, Span::DUMMY)
}
