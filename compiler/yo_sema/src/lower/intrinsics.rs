//! Intrinsic call lowering.
//!
//! The resolver dispatches a fixed set of names to internal handlers
//! instead of external symbols: the arithmetic and comparison operator
//! callables, short-circuiting logical and/or, the cast builtins, and
//! the type-level queries.

use yo_ir::{BinaryOp, CallExpr, CastKind, Expr, Span, TypeId};

use crate::emit::{ArithOp, Emitter, FloatPredicate, IntPredicate, ValueToken};
use crate::errors::{SemaError, SemaResult};

use super::call_resolution::CallTarget;
use super::functions::ValueMode;
use super::Lowering;

#[derive(Copy, Clone, Debug)]
enum Intrinsic {
    Arith(BinaryOp),
    Cmp(BinaryOp),
    Logical { is_and: bool },
    StaticCast,
    ReinterpretCast,
    Sizeof,
    Trap,
    Typename,
    IsSame,
    IsPointer,
}

fn intrinsic_by_name(name: &str) -> Option<Intrinsic> {
    let intrinsic = match name {
        "__add" => Intrinsic::Arith(BinaryOp::Add),
        "__sub" => Intrinsic::Arith(BinaryOp::Sub),
        "__mul" => Intrinsic::Arith(BinaryOp::Mul),
        "__div" => Intrinsic::Arith(BinaryOp::Div),
        "__mod" => Intrinsic::Arith(BinaryOp::Mod),
        "__and" => Intrinsic::Arith(BinaryOp::And),
        "__or" => Intrinsic::Arith(BinaryOp::Or),
        "__xor" => Intrinsic::Arith(BinaryOp::Xor),
        "__shl" => Intrinsic::Arith(BinaryOp::Shl),
        "__shr" => Intrinsic::Arith(BinaryOp::Shr),
        "__eq" => Intrinsic::Cmp(BinaryOp::Eq),
        "__lt" => Intrinsic::Cmp(BinaryOp::Lt),
        "__gt" => Intrinsic::Cmp(BinaryOp::Gt),
        "__land" => Intrinsic::Logical { is_and: true },
        "__lor" => Intrinsic::Logical { is_and: false },
        "static_cast" => Intrinsic::StaticCast,
        "reinterpret_cast" => Intrinsic::ReinterpretCast,
        "sizeof" => Intrinsic::Sizeof,
        "__trap" => Intrinsic::Trap,
        "__typename" => Intrinsic::Typename,
        "__is_same" => Intrinsic::IsSame,
        "__is_pointer" => Intrinsic::IsPointer,
        _ => return None,
    };
    Some(intrinsic)
}

fn two_args(call: &mut CallExpr, span: Span) -> SemaResult<(&mut Expr, &mut Expr)> {
    if call.args.len() != 2 {
        return Err(SemaError::UnresolvedCall { span });
    }
    let (head, tail) = call.args.split_at_mut(1);
    Ok((&mut head[0], &mut tail[0]))
}

impl<E: Emitter> Lowering<'_, E> {
    /// Dispatch a call whose winning candidate is an intrinsic.
    pub(crate) fn lower_intrinsic(
        &mut self,
        target: &CallTarget,
        call: &mut CallExpr,
        span: Span,
    ) -> SemaResult<ValueToken> {
        let Some(decl) = target.decl.as_ref() else {
            return Err(SemaError::UnresolvedCall { span });
        };
        let name = self.names.lookup(decl.name);
        let Some(intrinsic) = intrinsic_by_name(name) else {
            return Err(SemaError::UnknownIntrinsic {
                name: name.to_owned(),
                span,
            });
        };

        match intrinsic {
            Intrinsic::StaticCast | Intrinsic::ReinterpretCast => {
                let Some(dest) = call.template_args.first().cloned() else {
                    return Err(SemaError::TemplateDeductionFailure {
                        name: name.to_owned(),
                        param: "T".to_owned(),
                        span,
                    });
                };
                let Some(arg) = call.args.first_mut() else {
                    return Err(SemaError::UnresolvedCall { span });
                };
                let cast = if matches!(intrinsic, Intrinsic::StaticCast) {
                    CastKind::Static
                } else {
                    CastKind::Bit
                };
                self.lower_cast(arg, &dest, cast, span)
            }
            Intrinsic::Sizeof => {
                let ty = self.explicit_type_arg(call, name, 0, span)?;
                let size = self.emitter.type_alloc_size(ty, &self.types);
                Ok(self.emitter.const_int(TypeId::I64, size, &self.types))
            }
            Intrinsic::Trap => Ok(self.emitter.trap()),
            Intrinsic::Typename => {
                let ty = self.explicit_type_arg(call, name, 0, span)?;
                let text = self.display_type(ty);
                Ok(self.emitter.global_string(&text))
            }
            Intrinsic::IsSame => {
                let lhs = self.explicit_type_arg(call, name, 0, span)?;
                let rhs = self.explicit_type_arg(call, name, 1, span)?;
                Ok(self.emitter.const_bool(lhs == rhs))
            }
            Intrinsic::IsPointer => {
                let ty = self.explicit_type_arg(call, name, 0, span)?;
                let is_pointer = self.types.is_pointer(ty);
                Ok(self.emitter.const_bool(is_pointer))
            }
            Intrinsic::Arith(op) => self.lower_arith_intrinsic(op, call, span),
            Intrinsic::Cmp(op) => self.lower_cmp_intrinsic(op, call, span),
            Intrinsic::Logical { is_and } => self.lower_logical_intrinsic(is_and, call, span),
        }
    }

    fn explicit_type_arg(
        &mut self,
        call: &CallExpr,
        name: &str,
        index: usize,
        span: Span,
    ) -> SemaResult<TypeId> {
        match call.template_args.get(index) {
            Some(desc) => self.resolve_type_desc(desc, true),
            None => Err(SemaError::TemplateDeductionFailure {
                name: name.to_owned(),
                param: "T".to_owned(),
                span,
            }),
        }
    }

    /// Arithmetic requires both operands of the same numeric type after
    /// literal reconciliation; integers pick signed or unsigned opcodes
    /// per the operand signedness, floats admit add/sub/mul/div only.
    fn lower_arith_intrinsic(
        &mut self,
        op: BinaryOp,
        call: &mut CallExpr,
        span: Span,
    ) -> SemaResult<ValueToken> {
        let (lhs, rhs) = two_args(call, span)?;
        let Some((lhs_ty, rhs_ty)) = self.reconcile_numeric_operands(lhs, rhs)? else {
            let found_lhs = self.guess_type(lhs)?;
            let found_rhs = self.guess_type(rhs)?;
            return Err(SemaError::TypeMismatch {
                expected: self.display_type(found_lhs),
                found: self.display_type(found_rhs),
                context: "binary operator operands",
                span,
            });
        };
        debug_assert_eq!(lhs_ty, rhs_ty);
        let Some(kind) = self.types.numeric_kind(lhs_ty) else {
            return Err(SemaError::InvalidOperator {
                op: op.canonical_name().to_owned(),
                operand: self.display_type(lhs_ty),
                span,
            });
        };

        let machine_op = if kind.is_float() {
            match op {
                BinaryOp::Add => ArithOp::FAdd,
                BinaryOp::Sub => ArithOp::FSub,
                BinaryOp::Mul => ArithOp::FMul,
                BinaryOp::Div => ArithOp::FDiv,
                _ => {
                    return Err(SemaError::InvalidOperator {
                        op: op.canonical_name().to_owned(),
                        operand: "f64".to_owned(),
                        span,
                    });
                }
            }
        } else {
            let signed = kind.is_signed();
            match op {
                BinaryOp::Add => ArithOp::Add,
                BinaryOp::Sub => ArithOp::Sub,
                BinaryOp::Mul => ArithOp::Mul,
                BinaryOp::Div => {
                    if signed {
                        ArithOp::SDiv
                    } else {
                        ArithOp::UDiv
                    }
                }
                BinaryOp::Mod => {
                    if signed {
                        ArithOp::SRem
                    } else {
                        ArithOp::URem
                    }
                }
                BinaryOp::And => ArithOp::And,
                BinaryOp::Or => ArithOp::Or,
                BinaryOp::Xor => ArithOp::Xor,
                BinaryOp::Shl => ArithOp::Shl,
                // Right shift is logical: zero-fill.
                BinaryOp::Shr => ArithOp::LShr,
                _ => {
                    return Err(SemaError::InvalidOperator {
                        op: op.canonical_name().to_owned(),
                        operand: self.display_type(lhs_ty),
                        span,
                    });
                }
            }
        };

        let lhs_value = self.lower_expr(lhs, ValueMode::Value)?;
        let rhs_value = self.lower_expr(rhs, ValueMode::Value)?;
        Ok(self.emitter.arith(machine_op, lhs_value, rhs_value))
    }

    /// Comparisons return bool. Equal f64 operands compare ordered;
    /// mixed-width integers are promoted to the wider of i32/i64 and
    /// compared signed iff either side is signed.
    fn lower_cmp_intrinsic(
        &mut self,
        op: BinaryOp,
        call: &mut CallExpr,
        span: Span,
    ) -> SemaResult<ValueToken> {
        let (lhs, rhs) = two_args(call, span)?;
        let lhs_ty = self.guess_type(lhs)?;
        let rhs_ty = self.guess_type(rhs)?;

        if lhs_ty == rhs_ty && lhs_ty == TypeId::F64 {
            let pred = match op {
                BinaryOp::Eq => FloatPredicate::Oeq,
                BinaryOp::Lt => FloatPredicate::Olt,
                BinaryOp::Gt => FloatPredicate::Ogt,
                _ => {
                    return Err(SemaError::InvalidOperator {
                        op: op.canonical_name().to_owned(),
                        operand: "f64".to_owned(),
                        span,
                    });
                }
            };
            let lhs_value = self.lower_expr(lhs, ValueMode::Value)?;
            let rhs_value = self.lower_expr(rhs, ValueMode::Value)?;
            return Ok(self.emitter.fcmp(pred, lhs_value, rhs_value));
        }

        let (Some(lhs_kind), Some(rhs_kind)) = (
            self.types.numeric_kind(lhs_ty),
            self.types.numeric_kind(rhs_ty),
        ) else {
            return Err(SemaError::TypeMismatch {
                expected: self.display_type(lhs_ty),
                found: self.display_type(rhs_ty),
                context: "comparison operands",
                span,
            });
        };
        if !lhs_kind.is_integer() || !rhs_kind.is_integer() {
            return Err(SemaError::TypeMismatch {
                expected: self.display_type(lhs_ty),
                found: self.display_type(rhs_ty),
                context: "comparison operands",
                span,
            });
        }

        if lhs_ty == rhs_ty {
            let pred = int_predicate(op, lhs_kind.is_signed(), span)?;
            let lhs_value = self.lower_expr(lhs, ValueMode::Value)?;
            let rhs_value = self.lower_expr(rhs, ValueMode::Value)?;
            return Ok(self.emitter.icmp(pred, lhs_value, rhs_value));
        }

        // Mixed widths: promote both sides before comparing.
        let larger = lhs_kind.size_bytes().max(rhs_kind.size_bytes());
        let promoted = if larger <= 4 { TypeId::I32 } else { TypeId::I64 };
        self.wrap_in_static_cast_unless(lhs, lhs_ty, promoted);
        self.wrap_in_static_cast_unless(rhs, rhs_ty, promoted);
        let pred = int_predicate(op, lhs_kind.is_signed() || rhs_kind.is_signed(), span)?;
        let lhs_value = self.lower_expr(lhs, ValueMode::Value)?;
        let rhs_value = self.lower_expr(rhs, ValueMode::Value)?;
        Ok(self.emitter.icmp(pred, lhs_value, rhs_value))
    }

    fn wrap_in_static_cast_unless(&self, expr: &mut Expr, current: TypeId, dest: TypeId) {
        if current != dest {
            self.wrap_in_cast(expr, dest);
        }
    }

    /// Short-circuiting logical and/or: the left operand decides whether
    /// the right one is evaluated at all.
    fn lower_logical_intrinsic(
        &mut self,
        is_and: bool,
        call: &mut CallExpr,
        span: Span,
    ) -> SemaResult<ValueToken> {
        let (lhs, rhs) = two_args(call, span)?;
        let lhs_ty = self.guess_type(lhs)?;
        let rhs_ty = self.guess_type(rhs)?;
        if lhs_ty != TypeId::BOOL || rhs_ty != TypeId::BOOL {
            return Err(SemaError::TypeMismatch {
                expected: "bool".to_owned(),
                found: self.display_type(if lhs_ty == TypeId::BOOL { rhs_ty } else { lhs_ty }),
                context: "logical operator operands",
                span,
            });
        }

        let lhs_value = self.lower_expr(lhs, ValueMode::Value)?;
        let short_value = self.emitter.const_bool(!is_and);
        let lhs_end = self.emitter.current_block();
        let rhs_block = self.emitter.append_block("logical_rhs");
        let merge = self.emitter.append_block("logical_merge");
        if is_and {
            self.emitter.cond_br(lhs_value, rhs_block, merge);
        } else {
            self.emitter.cond_br(lhs_value, merge, rhs_block);
        }

        self.emitter.position_at_end(rhs_block);
        let rhs_value = self.lower_expr(rhs, ValueMode::Value)?;
        let rhs_end = self.emitter.current_block();
        self.emitter.br(merge);

        self.emitter.position_at_end(merge);
        Ok(self.emitter.phi(
            TypeId::BOOL,
            &[(short_value, lhs_end), (rhs_value, rhs_end)],
            &self.types,
        ))
    }
}

fn int_predicate(op: BinaryOp, signed: bool, span: Span) -> SemaResult<IntPredicate> {
    let pred = match op {
        BinaryOp::Eq => IntPredicate::Eq,
        BinaryOp::Lt => {
            if signed {
                IntPredicate::Slt
            } else {
                IntPredicate::Ult
            }
        }
        BinaryOp::Gt => {
            if signed {
                IntPredicate::Sgt
            } else {
                IntPredicate::Ugt
            }
        }
        _ => {
            return Err(SemaError::InvalidOperator {
                op: op.canonical_name().to_owned(),
                operand: "integer".to_owned(),
                span,
            });
        }
    };
    Ok(pred)
}
