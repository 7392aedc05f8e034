//! Expression type guessing and implicit numeric-literal coercion.

use yo_ir::{
    CallExpr, CastKind, Expr, ExprKind, NumberKind, NumberLiteral, StringKind, TypeDesc, TypeId,
};
use yo_types::NumericKind;

use crate::emit::Emitter;
use crate::errors::{SemaError, SemaResult};

use super::Lowering;

impl<E: Emitter> Lowering<'_, E> {
    /// The type an expression would produce, without emitting anything.
    pub fn guess_type(&mut self, expr: &Expr) -> SemaResult<TypeId> {
        match &expr.kind {
            ExprKind::Number(literal) => Ok(match literal.kind {
                NumberKind::Integer => TypeId::I64,
                NumberKind::Character => TypeId::U8,
                NumberKind::Boolean => TypeId::BOOL,
                NumberKind::Double => TypeId::F64,
            }),
            ExprKind::String { kind, .. } => match kind {
                StringKind::ByteString => Ok(self.types.pointer_to(TypeId::I8)),
                StringKind::Normal => {
                    let string_name = self.names.intern("String");
                    match self.nominal_types.get(string_name).copied() {
                        Some(ty) => Ok(self.types.pointer_to(ty)),
                        None => Err(SemaError::UnknownType {
                            name: "String".to_owned(),
                            span: expr.span,
                        }),
                    }
                }
            },
            ExprKind::Ident(name) => match self.scope.get(*name) {
                Some(var) => Ok(var.ty),
                None => Err(SemaError::UnknownIdentifier {
                    name: self.names.lookup(*name).to_owned(),
                    span: expr.span,
                }),
            },
            ExprKind::Cast { dest, .. } => self.resolve_type_desc(dest, true),
            ExprKind::Call(call) => {
                let target = self.resolve_call(call, expr.span, true)?;
                self.resolve_type_desc(&target.sig.ret, false)
            }
            ExprKind::Member { target, member } => {
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
                match self.types.struct_field(pointee, *member) {
                    Some((_, field_ty)) => Ok(field_ty),
                    None => Err(SemaError::UnknownIdentifier {
                        name: format!(
                            "{}.{}",
                            self.display_type(pointee),
                            self.names.lookup(*member)
                        ),
                        span: expr.span,
                    }),
                }
            }
            ExprKind::Subscript { target, .. } => {
                let target_ty = self.guess_type(target)?;
                self.types
                    .pointee(target_ty)
                    .ok_or_else(|| SemaError::TypeMismatch {
                        expected: "a pointer".to_owned(),
                        found: self.display_type(target_ty),
                        context: "subscript target",
                        span: target.span,
                    })
            }
            ExprKind::Unary { expr: operand, .. } => self.guess_type(operand),
            ExprKind::Binary { op, lhs, rhs } => {
                // Normalized form: a call to the operator's canonical
                // callable; its resolved return type is the answer.
                let (base, _) = op.base();
                let target = self.names.intern(base.canonical_name());
                let synthetic = CallExpr {
                    target: Box::new(Expr::ident(target, expr.span)),
                    args: vec![(**lhs).clone(), (**rhs).clone()],
                    template_args: Vec::new(),
                };
                let resolved = self.resolve_call(&synthetic, expr.span, true)?;
                self.resolve_type_desc(&resolved.sig.ret, false)
            }
            ExprKind::Match(match_expr) => match match_expr.branches.first() {
                Some(branch) => self.guess_type(&branch.value),
                None => Err(SemaError::InvalidMatchPattern {
                    message: "match must have at least one branch".to_owned(),
                    span: expr.span,
                }),
            },
            ExprKind::StaticDeclRef { type_name, member } => Err(SemaError::UnknownIdentifier {
                name: format!(
                    "{}::{}",
                    self.names.lookup(*type_name),
                    self.names.lookup(*member)
                ),
                span: expr.span,
            }),
            ExprKind::Raw { ty, .. } => Ok(*ty),
        }
    }

    /// Whether a numeric literal trivially fits the expected type:
    /// booleans only into bool, doubles and integers into f64, and
    /// integers into any integer type wide enough for their magnitude.
    pub fn literal_fits(&self, literal: NumberLiteral, expected: TypeId) -> bool {
        let Some(kind) = self.types.numeric_kind(expected) else {
            return false;
        };
        match literal.kind {
            NumberKind::Boolean => kind == NumericKind::Bool,
            NumberKind::Double => kind.is_float(),
            NumberKind::Integer => {
                if kind.is_float() {
                    return true;
                }
                let bits = 64 - literal.value.leading_zeros();
                bits <= u32::from(kind.width_bits())
            }
            NumberKind::Character => false,
        }
    }

    /// Check an expression against an expected type, rewriting a fitting
    /// numeric literal into a cast to that type. Returns whether the
    /// expression now has the expected type.
    pub fn typecheck_and_coerce(
        &mut self,
        expr: &mut Expr,
        expected: TypeId,
    ) -> SemaResult<bool> {
        let found = self.guess_type(expr)?;
        if found == expected {
            return Ok(true);
        }
        if let ExprKind::Number(literal) = expr.kind {
            if self.literal_fits(literal, expected) {
                self.wrap_in_cast(expr, expected);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Rewrite `expr` in place into a static cast to `dest`.
    pub(crate) fn wrap_in_cast(&self, expr: &mut Expr, dest: TypeId) {
        let span = expr.span;
        let inner = std::mem::replace(expr, Expr::integer(0, span));
        *expr = Expr::new(
            ExprKind::Cast {
                expr: Box::new(inner),
                dest: TypeDesc::resolved(dest, span),
                cast: CastKind::Static,
            },
            span,
        );
    }

    /// Bring two operands to a common numeric type, casting whichever
    /// side is a literal to the other side's type. Returns the operand
    /// types after reconciliation, or `None` when they cannot be
    /// reconciled.
    pub(crate) fn reconcile_numeric_operands(
        &mut self,
        lhs: &mut Expr,
        rhs: &mut Expr,
    ) -> SemaResult<Option<(TypeId, TypeId)>> {
        let lhs_ty = self.guess_type(lhs)?;
        let rhs_ty = self.guess_type(rhs)?;
        if lhs_ty == rhs_ty {
            return Ok(Some((lhs_ty, rhs_ty)));
        }
        if !self.types.is_numeric(lhs_ty) || !self.types.is_numeric(rhs_ty) {
            return Ok(None);
        }
        if let ExprKind::Number(literal) = lhs.kind {
            if self.literal_fits(literal, rhs_ty) {
                self.wrap_in_cast(lhs, rhs_ty);
                return Ok(Some((rhs_ty, rhs_ty)));
            }
        }
        if let ExprKind::Number(literal) = rhs.kind {
            if self.literal_fits(literal, lhs_ty) {
                self.wrap_in_cast(rhs, lhs_ty);
                return Ok(Some((lhs_ty, lhs_ty)));
            }
        }
        Ok(None)
    }
}
