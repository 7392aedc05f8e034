//! Function-body lowering: statements, control flow, and expression
//! emission.

use std::rc::Rc;

use tracing::debug;

use yo_ir::{
    BinaryOp, CallExpr, CastKind, Expr, ExprKind, FunctionDecl, FunctionKind, MatchExpr,
    NumberKind, Span, Stmt, StmtKind, StructDecl, TypeDesc, TypeId, UnaryOp,
};

use crate::emit::{CastOp, Emitter, FuncToken, ValueToken};
use crate::errors::{SemaError, SemaResult};
use crate::mangle;
use crate::scope::LocalVar;

use super::call_resolution::CalleeSource;
use super::{FunctionState, Lowering};

/// Whether an expression is lowered for its value or its address.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum ValueMode {
    Value,
    Address,
}

impl<E: Emitter> Lowering<'_, E> {
    /// Lower a registered declaration's body, if it has one to lower.
    /// Templates wait for instantiation; intrinsics and forward
    /// declarations have nothing to emit.
    pub(crate) fn lower_registered_function(&mut self, decl: &Rc<FunctionDecl>) -> SemaResult<()> {
        if decl.sig.is_template() || decl.attrs.intrinsic || decl.body.is_none() {
            return Ok(());
        }
        let ret = self.resolve_type_desc(&decl.sig.ret, true)?;
        let mut param_types = Vec::with_capacity(decl.sig.params.len());
        for param in &decl.sig.params {
            param_types.push(self.resolve_type_desc(param, true)?);
        }
        let linkage_name = self.linkage_name(decl, &param_types, ret);
        let func = match self.registry.resolved_by_name(&linkage_name).and_then(|c| c.func) {
            Some(func) => func,
            None => return Ok(()),
        };
        self.lower_function_body(decl, func)
    }

    /// Emit the body of `decl` into `func`.
    pub(crate) fn lower_function_body(
        &mut self,
        decl: &Rc<FunctionDecl>,
        func: FuncToken,
    ) -> SemaResult<()> {
        debug!(name = self.names.lookup(decl.name), "lowering function body");

        self.emitter.begin_function(func);
        let entry = self.emitter.append_block("entry");
        self.emitter.position_at_end(entry);

        let ret_type = self.resolve_type_desc(&decl.sig.ret, true)?;
        let return_block = self.emitter.append_block("return");
        let retval = if ret_type != TypeId::VOID {
            Some(self.emitter.alloca(ret_type, "retval", &self.types))
        } else {
            None
        };

        let scope_marker = self.scope.marker();
        for (index, (&param_name, param_desc)) in
            decl.param_names.iter().zip(&decl.sig.params).enumerate()
        {
            let ty = self.resolve_type_desc(param_desc, true)?;
            let slot = self
                .emitter
                .alloca(ty, self.names.lookup(param_name), &self.types);
            let value = self.emitter.param(index as u32);
            self.emitter.store(value, slot);
            self.scope.insert(param_name, LocalVar { ty, value: slot });
        }

        let saved_fn = self.current_fn.replace(FunctionState {
            decl: decl.clone(),
            return_block,
            retval,
            ret_type,
        });

        let mut body = decl.body.clone().unwrap_or_default();
        for stmt in &mut body {
            self.lower_stmt(stmt)?;
        }

        if !self.emitter.is_terminated() {
            self.emitter.br(return_block);
        }
        self.emitter.position_at_end(return_block);
        match retval {
            Some(slot) => {
                let value = self.emitter.load(slot, ret_type, &self.types);
                self.emitter.ret(Some(value));
            }
            None => self.emitter.ret(None),
        }
        self.emitter.end_function(func);

        self.current_fn = saved_fn;
        self.scope.remove_all_since(scope_marker);
        Ok(())
    }

    /// Lower the implicit `init` of a struct: allocate an instance,
    /// store every parameter into its field, return the pointer. Uses a
    /// registered `alloc` callable when one exists, a stack allocation
    /// otherwise.
    pub(crate) fn lower_struct(&mut self, decl: &Rc<StructDecl>) -> SemaResult<()> {
        if decl.attrs.no_init {
            return Ok(());
        }
        let Some(init) = self.struct_inits.get(&decl.name).cloned() else {
            return Ok(());
        };
        let Some(&struct_ty) = self.nominal_types.get(decl.name) else {
            return Err(SemaError::UnknownType {
                name: self.names.lookup(decl.name).to_owned(),
                span: decl.span,
            });
        };

        let ret = self.resolve_type_desc(&init.sig.ret, true)?;
        let mut param_types = Vec::with_capacity(init.sig.params.len());
        for param in &init.sig.params {
            param_types.push(self.resolve_type_desc(param, true)?);
        }
        let linkage_name = self.linkage_name(&init, &param_types, ret);
        let func = match self.registry.resolved_by_name(&linkage_name).and_then(|c| c.func) {
            Some(func) => func,
            None => return Ok(()),
        };
        debug!(name = self.names.lookup(decl.name), "lowering struct initializer");

        self.emitter.begin_function(func);
        let entry = self.emitter.append_block("entry");
        self.emitter.position_at_end(entry);

        let alloc_canonical = mangle::canonical_name(FunctionKind::Global, None, "alloc");
        let instance = if self.registry.has_overloads(&alloc_canonical) {
            let alloc = self.names.intern("alloc");
            let mut alloc_call = CallExpr {
                target: Box::new(Expr::ident(alloc, decl.span)),
                args: vec![Expr::integer(1, decl.span)],
                template_args: vec![TypeDesc::resolved(struct_ty, decl.span)],
            };
            self.lower_call(&mut alloc_call, decl.span)?
        } else {
            self.emitter.alloca(struct_ty, "self", &self.types)
        };

        for index in 0..decl.fields.len() {
            let field_addr = self.emitter.struct_gep(instance, index as u32);
            let value = self.emitter.param(index as u32);
            self.emitter.store(value, field_addr);
        }
        self.emitter.ret(Some(instance));
        self.emitter.end_function(func);
        Ok(())
    }

    pub(crate) fn lower_stmt(&mut self, stmt: &mut Stmt) -> SemaResult<()> {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Composite(stmts) => {
                let marker = self.scope.marker();
                for inner in stmts {
                    self.lower_stmt(inner)?;
                }
                self.scope.remove_all_since(marker);
            }
            StmtKind::VarDecl { name, ty, init } => {
                let var_ty = if let Some(desc) = ty {
                    self.resolve_type_desc(desc, true)?
                } else if let Some(init) = init.as_ref() {
                    self.guess_type(init)?
                } else {
                    return Err(SemaError::NoInitialValue {
                        name: self.names.lookup(*name).to_owned(),
                        span,
                    });
                };
                let slot = self
                    .emitter
                    .alloca(var_ty, self.names.lookup(*name), &self.types);
                if let Some(init) = init {
                    if !self.typecheck_and_coerce(init, var_ty)? {
                        let found = self.guess_type(init)?;
                        return Err(SemaError::TypeMismatch {
                            expected: self.display_type(var_ty),
                            found: self.display_type(found),
                            context: "variable initialization",
                            span: init.span,
                        });
                    }
                    let value = self.lower_expr(init, ValueMode::Value)?;
                    self.emitter.store(value, slot);
                }
                self.scope.insert(*name, LocalVar { ty: var_ty, value: slot });
            }
            StmtKind::Assign { target, value } => {
                if !matches!(
                    target.kind,
                    ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Subscript { .. }
                ) {
                    return Err(SemaError::TypeMismatch {
                        expected: "an assignable expression".to_owned(),
                        found: "an rvalue".to_owned(),
                        context: "assignment target",
                        span: target.span,
                    });
                }
                let target_ty = self.guess_type(target)?;
                if !self.typecheck_and_coerce(value, target_ty)? {
                    let found = self.guess_type(value)?;
                    return Err(SemaError::TypeMismatch {
                        expected: self.display_type(target_ty),
                        found: self.display_type(found),
                        context: "assignment",
                        span: value.span,
                    });
                }
                let value = self.lower_expr(value, ValueMode::Value)?;
                let addr = self.lower_expr(target, ValueMode::Address)?;
                self.emitter.store(value, addr);
            }
            StmtKind::Return(value) => self.lower_return(value.as_mut(), span)?,
            StmtKind::If { branches } => {
                let merge = self.emitter.append_block("if_merge");
                let count = branches.len();
                for (index, branch) in branches.iter_mut().enumerate() {
                    let marker = self.scope.marker();
                    if let Some(cond) = &mut branch.cond {
                        let cond_ty = self.guess_type(cond)?;
                        if cond_ty != TypeId::BOOL {
                            return Err(SemaError::TypeMismatch {
                                expected: "bool".to_owned(),
                                found: self.display_type(cond_ty),
                                context: "if condition",
                                span: cond.span,
                            });
                        }
                        let cond_value = self.lower_expr(cond, ValueMode::Value)?;
                        let body_block = self.emitter.append_block("if_body");
                        let next_block = if index + 1 < count {
                            self.emitter.append_block("if_cond")
                        } else {
                            merge
                        };
                        self.emitter.cond_br(cond_value, body_block, next_block);
                        self.emitter.position_at_end(body_block);
                        for inner in &mut branch.body {
                            self.lower_stmt(inner)?;
                        }
                        if !self.emitter.is_terminated() {
                            self.emitter.br(merge);
                        }
                        if index + 1 < count {
                            self.emitter.position_at_end(next_block);
                        }
                    } else {
                        // The trailing else runs in the chain's fall-through block.
                        for inner in &mut branch.body {
                            self.lower_stmt(inner)?;
                        }
                        if !self.emitter.is_terminated() {
                            self.emitter.br(merge);
                        }
                    }
                    self.scope.remove_all_since(marker);
                }
                self.emitter.position_at_end(merge);
            }
            StmtKind::While { cond, body } => {
                let cond_block = self.emitter.append_block("while_cond");
                let body_block = self.emitter.append_block("while_body");
                let merge = self.emitter.append_block("while_merge");

                self.emitter.br(cond_block);
                self.emitter.position_at_end(cond_block);
                let cond_ty = self.guess_type(cond)?;
                if cond_ty != TypeId::BOOL {
                    return Err(SemaError::TypeMismatch {
                        expected: "bool".to_owned(),
                        found: self.display_type(cond_ty),
                        context: "while condition",
                        span: cond.span,
                    });
                }
                let cond_value = self.lower_expr(cond, ValueMode::Value)?;
                self.emitter.cond_br(cond_value, body_block, merge);

                self.emitter.position_at_end(body_block);
                let marker = self.scope.marker();
                for inner in body {
                    self.lower_stmt(inner)?;
                }
                self.scope.remove_all_since(marker);
                if !self.emitter.is_terminated() {
                    self.emitter.br(cond_block);
                }
                self.emitter.position_at_end(merge);
            }
            StmtKind::For { .. } => {
                return Err(SemaError::Unimplemented {
                    what: "for loops",
                    span,
                });
            }
            StmtKind::Expr(expr) => {
                self.lower_expr(expr, ValueMode::Value)?;
            }
        }
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&mut Expr>, span: Span) -> SemaResult<()> {
        let Some(state) = self.current_fn.as_ref() else {
            return Err(SemaError::Unimplemented {
                what: "statements outside function bodies",
                span,
            });
        };
        let ret_type = state.ret_type;
        let return_block = state.return_block;
        let retval = state.retval;

        match value {
            Some(expr) => {
                let Some(slot) = retval else {
                    let found = self.guess_type(expr)?;
                    return Err(SemaError::TypeMismatch {
                        expected: "void".to_owned(),
                        found: self.display_type(found),
                        context: "return statement",
                        span: expr.span,
                    });
                };
                if !self.typecheck_and_coerce(expr, ret_type)? {
                    let found = self.guess_type(expr)?;
                    return Err(SemaError::TypeMismatch {
                        expected: self.display_type(ret_type),
                        found: self.display_type(found),
                        context: "return statement",
                        span: expr.span,
                    });
                }
                let value = self.lower_expr(expr, ValueMode::Value)?;
                self.emitter.store(value, slot);
                self.emitter.br(return_block);
            }
            None => {
                if ret_type != TypeId::VOID {
                    return Err(SemaError::TypeMismatch {
                        expected: self.display_type(ret_type),
                        found: "void".to_owned(),
                        context: "return statement",
                        span,
                    });
                }
                self.emitter.br(return_block);
            }
        }
        Ok(())
    }

    pub(crate) fn lower_expr(&mut self, expr: &mut Expr, mode: ValueMode) -> SemaResult<ValueToken> {
        let span = expr.span;
        if mode == ValueMode::Address
            && !matches!(
                expr.kind,
                ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Subscript { .. }
            )
        {
            return Err(SemaError::TypeMismatch {
                expected: "an assignable expression".to_owned(),
                found: "an rvalue".to_owned(),
                context: "address-of lowering",
                span,
            });
        }

        match &mut expr.kind {
            ExprKind::Number(literal) => Ok(match literal.kind {
                NumberKind::Integer => self.emitter.const_int(TypeId::I64, literal.value, &self.types),
                NumberKind::Character => self.emitter.const_int(TypeId::U8, literal.value, &self.types),
                NumberKind::Boolean => self.emitter.const_bool(literal.value != 0),
                NumberKind::Double => self.emitter.const_float(literal.as_f64()),
            }),
            ExprKind::String { value, kind } => match kind {
                yo_ir::StringKind::ByteString => Ok(self.emitter.global_string(value)),
                yo_ir::StringKind::Normal => {
                    // A normal string is a *String built by String::init
                    // from the raw bytes.
                    let bytes = self.emitter.global_string(value);
                    let byte_ptr = self.types.pointer_to(TypeId::I8);
                    let string_name = self.names.intern("String");
                    let init_name = self.names.intern("init");
                    let mut synthetic = CallExpr {
                        target: Box::new(Expr::new(
                            ExprKind::StaticDeclRef {
                                type_name: string_name,
                                member: init_name,
                            },
                            span,
                        )),
                        args: vec![Expr::new(
                            ExprKind::Raw {
                                handle: bytes.0,
                                ty: byte_ptr,
                            },
                            span,
                        )],
                        template_args: Vec::new(),
                    };
                    self.lower_call(&mut synthetic, span)
                }
            },
            ExprKind::Ident(name) => {
                let Some(var) = self.scope.get(*name).copied() else {
                    return Err(SemaError::UnknownIdentifier {
                        name: self.names.lookup(*name).to_owned(),
                        span,
                    });
                };
                Ok(match mode {
                    ValueMode::Address => var.value,
                    ValueMode::Value => self.emitter.load(var.value, var.ty, &self.types),
                })
            }
            ExprKind::Cast { expr: inner, dest, cast } => {
                let dest = dest.clone();
                let cast = *cast;
                self.lower_cast(inner, &dest, cast, span)
            }
            ExprKind::Unary { op, expr: inner } => {
                let op = *op;
                self.lower_unary(op, inner, span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                // Normalize into a call to the operator's canonical
                // callable; `!=`, `<=`, `>=` negate the base result.
                let (base, negate) = op.base();
                let target = self.names.intern(base.canonical_name());
                let lhs = std::mem::replace(&mut **lhs, Expr::integer(0, span));
                let rhs = std::mem::replace(&mut **rhs, Expr::integer(0, span));
                let mut synthetic = CallExpr {
                    target: Box::new(Expr::ident(target, span)),
                    args: vec![lhs, rhs],
                    template_args: Vec::new(),
                };
                let mut value = self.lower_call(&mut synthetic, span)?;
                if negate {
                    value = self.emitter.not(value);
                }
                Ok(value)
            }
            ExprKind::Call(call) => self.lower_call(call, span),
            ExprKind::Member { target, member } => {
                let member = *member;
                let target_ty = self.guess_type(target)?;
                let pointee = self
                    .types
                    .pointee(target_ty)
                    .filter(|&inner| self.types.is_struct(inner))
                    .ok_or_else(|| SemaError::TypeMismatch {
                        expected: "a pointer to a struct".to_owned(),
                        found: self.display_type(target_ty),
                        context: "member access",
                        span: target.span,
                    })?;
                let Some((index, field_ty)) = self.types.struct_field(pointee, member) else {
                    return Err(SemaError::UnknownIdentifier {
                        name: format!(
                            "{}.{}",
                            self.display_type(pointee),
                            self.names.lookup(member)
                        ),
                        span,
                    });
                };
                let base = self.lower_expr(target, ValueMode::Value)?;
                let addr = self.emitter.struct_gep(base, index as u32);
                Ok(match mode {
                    ValueMode::Address => addr,
                    ValueMode::Value => self.emitter.load(addr, field_ty, &self.types),
                })
            }
            ExprKind::Subscript { target, index } => {
                let target_ty = self.guess_type(target)?;
                let Some(pointee) = self.types.pointee(target_ty) else {
                    return Err(SemaError::TypeMismatch {
                        expected: "a pointer".to_owned(),
                        found: self.display_type(target_ty),
                        context: "subscript target",
                        span: target.span,
                    });
                };
                let base = self.lower_expr(target, ValueMode::Value)?;
                let offset = self.lower_expr(index, ValueMode::Value)?;
                let addr = self.emitter.gep(base, offset);
                Ok(match mode {
                    ValueMode::Address => addr,
                    ValueMode::Value => self.emitter.load(addr, pointee, &self.types),
                })
            }
            ExprKind::Match(match_expr) => self.lower_match(match_expr, span),
            ExprKind::StaticDeclRef { .. } => Err(SemaError::UnresolvedCall { span }),
            ExprKind::Raw { handle, .. } => Ok(ValueToken(*handle)),
        }
    }

    /// Resolve and emit a call: coerce arguments against the selected
    /// signature, dispatch intrinsics, insert the implicit receiver for
    /// instance methods, then emit the call instruction.
    pub(crate) fn lower_call(&mut self, call: &mut CallExpr, span: Span) -> SemaResult<ValueToken> {
        let target = self.resolve_call(call, span, false)?;

        if let Some(callee_decl) = &target.decl {
            let allowed = match &self.current_fn {
                Some(state) => state.decl.attrs.may_call(&callee_decl.attrs),
                None => true,
            };
            if !allowed {
                return Err(SemaError::IncompatibleSideEffects {
                    callee: self.names.lookup(callee_decl.name).to_owned(),
                    span,
                });
            }
        }

        let offset = target.arg_offset as usize;
        for i in offset..target.sig.params.len() {
            let expected = self.resolve_type_desc(&target.sig.params[i], true)?;
            let Some(arg) = call.args.get_mut(i - offset) else {
                break;
            };
            if !self.typecheck_and_coerce(arg, expected)? {
                let found = self.guess_type(arg)?;
                return Err(SemaError::TypeMismatch {
                    expected: self.display_type(expected),
                    found: self.display_type(found),
                    context: "call argument",
                    span: arg.span,
                });
            }
        }

        if target.decl.as_ref().is_some_and(|decl| decl.attrs.intrinsic) {
            return self.lower_intrinsic(&target, call, span);
        }

        let callee = match target.callee {
            CalleeSource::Func(func) => self.emitter.function_address(func),
            CalleeSource::TargetValue => self.lower_expr(&mut call.target, ValueMode::Value)?,
            CalleeSource::NotEmitted => return Err(SemaError::UnresolvedCall { span }),
        };

        let mut args = Vec::with_capacity(call.args.len() + offset);
        if offset == 1 {
            let ExprKind::Member { target: receiver, .. } = &mut call.target.kind else {
                return Err(SemaError::UnresolvedCall { span });
            };
            args.push(self.lower_expr(receiver, ValueMode::Value)?);
        }
        for arg in &mut call.args {
            args.push(self.lower_expr(arg, ValueMode::Value)?);
        }
        Ok(self.emitter.call(callee, &args))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &mut Expr, span: Span) -> SemaResult<ValueToken> {
        let operand_ty = self.guess_type(operand)?;
        match op {
            UnaryOp::Neg => {
                if !self.types.is_numeric(operand_ty) {
                    return Err(SemaError::InvalidOperator {
                        op: "-".to_owned(),
                        operand: self.display_type(operand_ty),
                        span,
                    });
                }
                let value = self.lower_expr(operand, ValueMode::Value)?;
                Ok(self.emitter.neg(value))
            }
            UnaryOp::BitNot => {
                let is_integer = self
                    .types
                    .numeric_kind(operand_ty)
                    .is_some_and(|kind| kind.is_integer());
                if !is_integer {
                    return Err(SemaError::InvalidOperator {
                        op: "~".to_owned(),
                        operand: self.display_type(operand_ty),
                        span,
                    });
                }
                let value = self.lower_expr(operand, ValueMode::Value)?;
                Ok(self.emitter.not(value))
            }
            UnaryOp::LNot => {
                let valid = operand_ty == TypeId::BOOL
                    || self.types.is_pointer(operand_ty)
                    || self
                        .types
                        .numeric_kind(operand_ty)
                        .is_some_and(|kind| kind.is_integer());
                if !valid {
                    return Err(SemaError::InvalidOperator {
                        op: "!".to_owned(),
                        operand: self.display_type(operand_ty),
                        span,
                    });
                }
                let value = self.lower_expr(operand, ValueMode::Value)?;
                Ok(self.emitter.is_null(value))
            }
        }
    }

    /// Emit a cast. Bitcasts require equal bit widths and permit
    /// pointer-integer conversions; static casts follow the numeric
    /// widening and narrowing rules.
    pub(crate) fn lower_cast(
        &mut self,
        inner: &mut Expr,
        dest: &TypeDesc,
        kind: CastKind,
        span: Span,
    ) -> SemaResult<ValueToken> {
        let src = self.guess_type(inner)?;
        let dst = self.resolve_type_desc(dest, true)?;
        if src == dst {
            return self.lower_expr(inner, ValueMode::Value);
        }

        let invalid = |this: &Self| SemaError::InvalidCast {
            from: this.display_type(src),
            to: this.display_type(dst),
            span,
        };

        match kind {
            CastKind::Bit => {
                let (Some(src_bits), Some(dst_bits)) = (self.width_bits(src), self.width_bits(dst))
                else {
                    return Err(invalid(self));
                };
                if src_bits != dst_bits {
                    return Err(invalid(self));
                }
                let op = if self.types.is_pointer(src) && self.types.is_numeric(dst) {
                    CastOp::PtrToInt
                } else if self.types.is_numeric(src) && self.types.is_pointer(dst) {
                    CastOp::IntToPtr
                } else {
                    CastOp::Bit
                };
                let value = self.lower_expr(inner, ValueMode::Value)?;
                Ok(self.emitter.cast(op, value, dst, &self.types))
            }
            CastKind::Static => {
                let (Some(src_kind), Some(dst_kind)) =
                    (self.types.numeric_kind(src), self.types.numeric_kind(dst))
                else {
                    return Err(invalid(self));
                };
                let op = if dst_kind.is_float() && src_kind.is_integer() {
                    if src_kind.is_signed() {
                        CastOp::SIToFP
                    } else {
                        CastOp::UIToFP
                    }
                } else if src_kind.is_float() || dst_kind.is_float() {
                    return Err(invalid(self));
                } else if src_kind.width_bits() > dst_kind.width_bits() {
                    CastOp::Trunc
                } else if src_kind.width_bits() < dst_kind.width_bits() {
                    if src_kind.is_signed() {
                        CastOp::SExt
                    } else {
                        CastOp::ZExt
                    }
                } else {
                    // Same width: the value is unchanged.
                    return self.lower_expr(inner, ValueMode::Value);
                };
                let value = self.lower_expr(inner, ValueMode::Value)?;
                Ok(self.emitter.cast(op, value, dst, &self.types))
            }
        }
    }

    /// Bit width of a type for bitcast checking: numerics have their
    /// kind's width, pointers are 64-bit.
    fn width_bits(&self, ty: TypeId) -> Option<u32> {
        if let Some(kind) = self.types.numeric_kind(ty) {
            return Some(u32::from(kind.width_bits()));
        }
        if self.types.is_pointer(ty) {
            return Some(64);
        }
        None
    }

    /// Lower a `match` expression into a compare-and-branch chain with a
    /// phi at the merge point. Patterns must be literals trivially
    /// convertible to the matched type; the final branch must be the
    /// wildcard `_`.
    fn lower_match(&mut self, match_expr: &mut MatchExpr, span: Span) -> SemaResult<ValueToken> {
        if match_expr.branches.is_empty() {
            return Err(SemaError::InvalidMatchPattern {
                message: "match must have at least one branch".to_owned(),
                span,
            });
        }
        let target_ty = self.guess_type(&match_expr.target)?;
        let result_ty = self.guess_type(&match_expr.branches[0].value)?;
        let target_value = self.lower_expr(&mut match_expr.target, ValueMode::Value)?;

        let merge = self.emitter.append_block("match_merge");
        let mut incoming: Vec<(ValueToken, crate::emit::BlockToken)> = Vec::new();
        let branch_count = match_expr.branches.len();

        for (branch_index, branch) in match_expr.branches.iter_mut().enumerate() {
            let is_last = branch_index + 1 == branch_count;
            let is_wildcard = branch.patterns.len() == 1
                && matches!(
                    &branch.patterns[0].kind,
                    ExprKind::Ident(name) if self.names.lookup(*name) == "_"
                );

            if is_wildcard {
                if !is_last {
                    return Err(SemaError::InvalidMatchPattern {
                        message: "wildcard must be the final branch".to_owned(),
                        span: branch.span,
                    });
                }
                let value = self.lower_branch_value(&mut branch.value, result_ty)?;
                incoming.push((value, self.emitter.current_block()));
                self.emitter.br(merge);
            } else {
                if is_last {
                    return Err(SemaError::InvalidMatchPattern {
                        message: "match must end in a wildcard branch".to_owned(),
                        span: branch.span,
                    });
                }
                let value_block = self.emitter.append_block("match_value");
                let next_block = self.emitter.append_block("match_next");
                let pattern_count = branch.patterns.len();
                for (pattern_index, pattern) in branch.patterns.iter_mut().enumerate() {
                    let Some(&literal) = pattern.as_number_literal() else {
                        return Err(SemaError::InvalidMatchPattern {
                            message: "patterns must be literal values".to_owned(),
                            span: pattern.span,
                        });
                    };
                    let pattern_ty = self.guess_type(pattern)?;
                    if pattern_ty != target_ty && !self.literal_fits(literal, target_ty) {
                        return Err(SemaError::InvalidMatchPattern {
                            message: format!(
                                "cannot match a value of type '{}' against '{}'",
                                self.display_type(target_ty),
                                self.display_type(pattern_ty)
                            ),
                            span: pattern.span,
                        });
                    }
                    let mut compare = Expr::new(
                        ExprKind::Binary {
                            op: BinaryOp::Eq,
                            lhs: Box::new(Expr::new(
                                ExprKind::Raw {
                                    handle: target_value.0,
                                    ty: target_ty,
                                },
                                pattern.span,
                            )),
                            rhs: Box::new(pattern.clone()),
                        },
                        pattern.span,
                    );
                    let cond = self.lower_expr(&mut compare, ValueMode::Value)?;
                    if pattern_index + 1 == pattern_count {
                        self.emitter.cond_br(cond, value_block, next_block);
                    } else {
                        let alt = self.emitter.append_block("match_pattern");
                        self.emitter.cond_br(cond, value_block, alt);
                        self.emitter.position_at_end(alt);
                    }
                }
                self.emitter.position_at_end(value_block);
                let value = self.lower_branch_value(&mut branch.value, result_ty)?;
                incoming.push((value, self.emitter.current_block()));
                self.emitter.br(merge);
                self.emitter.position_at_end(next_block);
            }
        }

        self.emitter.position_at_end(merge);
        Ok(self.emitter.phi(result_ty, &incoming, &self.types))
    }

    fn lower_branch_value(&mut self, value: &mut Expr, result_ty: TypeId) -> SemaResult<ValueToken> {
        if !self.typecheck_and_coerce(value, result_ty)? {
            let found = self.guess_type(value)?;
            return Err(SemaError::TypeMismatch {
                expected: self.display_type(result_ty),
                found: self.display_type(found),
                context: "match branch",
                span: value.span,
            });
        }
        self.lower_expr(value, ValueMode::Value)
    }
}
