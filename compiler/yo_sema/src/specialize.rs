//! Template specialization.
//!
//! Produces a deep clone of a declaration with a type-descriptor
//! substitution applied: every plain nominal descriptor whose name maps
//! to a descriptor in the substitution is replaced by a copy of the
//! mapped descriptor. Everything else is cloned preserving kind, source
//! locations copied verbatim.
//!
//! Specialization is pure: it never consults the registry, the scope,
//! or the type interner.

use rustc_hash::FxHashMap;
use yo_ir::{
    CallExpr, Expr, ExprKind, FieldDecl, FunctionDecl, FunctionTypeDesc, IfBranch, ImplBlock,
    MatchBranch, MatchExpr, Name, Stmt, StmtKind, StructDecl, TypeDesc, TypeDescKind,
};

/// Applies a template-parameter substitution to declarations.
pub struct TemplateSpecializer<'a> {
    mapping: &'a FxHashMap<Name, TypeDesc>,
}

impl<'a> TemplateSpecializer<'a> {
    /// Create a specializer over `mapping`, which maps template
    /// parameter names to fully-resolved descriptors.
    pub fn new(mapping: &'a FxHashMap<Name, TypeDesc>) -> Self {
        TemplateSpecializer { mapping }
    }

    /// Specialize a function declaration.
    ///
    /// The result has an empty template-parameter list; every template
    /// parameter of the input must have a mapping.
    pub fn specialize_function(&self, decl: &FunctionDecl) -> FunctionDecl {
        debug_assert!(decl
            .sig
            .template_params
            .iter()
            .all(|param| self.mapping.contains_key(param)));

        let mut sig = decl.sig.clone();
        sig.params = decl.sig.params.iter().map(|p| self.resolve_type(p)).collect();
        sig.ret = self.resolve_type(&decl.sig.ret);
        sig.template_params = Vec::new();

        // Intrinsics have empty bodies; there is nothing to walk.
        let body = if decl.attrs.intrinsic {
            decl.body.clone()
        } else {
            decl.body
                .as_ref()
                .map(|stmts| stmts.iter().map(|s| self.specialize_stmt(s)).collect())
        };

        FunctionDecl {
            name: decl.name,
            kind: decl.kind,
            sig,
            param_names: decl.param_names.clone(),
            attrs: decl.attrs.clone(),
            body,
            owner: decl.owner,
            span: decl.span,
        }
    }

    /// Specialize a struct declaration.
    pub fn specialize_struct(&self, decl: &StructDecl) -> StructDecl {
        StructDecl {
            name: decl.name,
            fields: decl
                .fields
                .iter()
                .map(|field| FieldDecl {
                    name: field.name,
                    ty: self.resolve_type(&field.ty),
                    span: field.span,
                })
                .collect(),
            attrs: decl.attrs,
            span: decl.span,
        }
    }

    /// Specialize an impl block.
    pub fn specialize_impl_block(&self, block: &ImplBlock) -> ImplBlock {
        ImplBlock {
            type_name: block.type_name,
            methods: block
                .methods
                .iter()
                .map(|method| self.specialize_function(method))
                .collect(),
            span: block.span,
        }
    }

    /// Rewrite a type descriptor under the substitution.
    fn resolve_type(&self, desc: &TypeDesc) -> TypeDesc {
        let span = desc.span;
        match &desc.kind {
            TypeDescKind::Resolved(ty) => TypeDesc::resolved(*ty, span),
            TypeDescKind::Nominal(name) => match self.mapping.get(name) {
                Some(mapped) => mapped.clone(),
                None => TypeDesc::nominal(*name, span),
            },
            TypeDescKind::NominalTemplated { name, args } => TypeDesc::nominal_templated(
                *name,
                args.iter().map(|arg| self.resolve_type(arg)).collect(),
                span,
            ),
            TypeDescKind::Pointer(inner) => TypeDesc::pointer(self.resolve_type(inner), span),
            TypeDescKind::Reference(inner) => TypeDesc::reference(self.resolve_type(inner), span),
            TypeDescKind::Function(FunctionTypeDesc { conv, params, ret }) => TypeDesc::function(
                *conv,
                params.iter().map(|param| self.resolve_type(param)).collect(),
                self.resolve_type(ret),
                span,
            ),
            TypeDescKind::Tuple(members) => TypeDesc::tuple(
                members.iter().map(|member| self.resolve_type(member)).collect(),
                span,
            ),
            TypeDescKind::Decltype(expr) => TypeDesc::decltype(self.specialize_expr(expr), span),
        }
    }

    fn specialize_stmt(&self, stmt: &Stmt) -> Stmt {
        let kind = match &stmt.kind {
            StmtKind::Composite(stmts) => {
                StmtKind::Composite(stmts.iter().map(|s| self.specialize_stmt(s)).collect())
            }
            StmtKind::VarDecl { name, ty, init } => StmtKind::VarDecl {
                name: *name,
                ty: ty.as_ref().map(|t| self.resolve_type(t)),
                init: init.as_ref().map(|e| self.specialize_expr(e)),
            },
            StmtKind::Assign { target, value } => StmtKind::Assign {
                target: self.specialize_expr(target),
                value: self.specialize_expr(value),
            },
            StmtKind::Return(expr) => {
                StmtKind::Return(expr.as_ref().map(|e| self.specialize_expr(e)))
            }
            StmtKind::If { branches } => StmtKind::If {
                branches: branches
                    .iter()
                    .map(|branch| IfBranch {
                        kind: branch.kind,
                        cond: branch.cond.as_ref().map(|c| self.specialize_expr(c)),
                        body: branch.body.iter().map(|s| self.specialize_stmt(s)).collect(),
                        span: branch.span,
                    })
                    .collect(),
            },
            StmtKind::While { cond, body } => StmtKind::While {
                cond: self.specialize_expr(cond),
                body: body.iter().map(|s| self.specialize_stmt(s)).collect(),
            },
            StmtKind::For {
                binding,
                iterable,
                body,
            } => StmtKind::For {
                binding: *binding,
                iterable: self.specialize_expr(iterable),
                body: body.iter().map(|s| self.specialize_stmt(s)).collect(),
            },
            StmtKind::Expr(expr) => StmtKind::Expr(self.specialize_expr(expr)),
        };
        Stmt::new(kind, stmt.span)
    }

    fn specialize_expr(&self, expr: &Expr) -> Expr {
        let kind = match &expr.kind {
            // Leaves carry no descriptors; a plain clone suffices.
            ExprKind::Number(_)
            | ExprKind::String { .. }
            | ExprKind::Ident(_)
            | ExprKind::StaticDeclRef { .. }
            | ExprKind::Raw { .. } => expr.kind.clone(),

            ExprKind::Cast { expr: inner, dest, cast } => ExprKind::Cast {
                expr: Box::new(self.specialize_expr(inner)),
                dest: self.resolve_type(dest),
                cast: *cast,
            },
            ExprKind::Unary { op, expr: inner } => ExprKind::Unary {
                op: *op,
                expr: Box::new(self.specialize_expr(inner)),
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: Box::new(self.specialize_expr(lhs)),
                rhs: Box::new(self.specialize_expr(rhs)),
            },
            ExprKind::Call(call) => ExprKind::Call(CallExpr {
                target: Box::new(self.specialize_expr(&call.target)),
                args: call.args.iter().map(|arg| self.specialize_expr(arg)).collect(),
                template_args: call
                    .template_args
                    .iter()
                    .map(|arg| self.resolve_type(arg))
                    .collect(),
            }),
            ExprKind::Member { target, member } => ExprKind::Member {
                target: Box::new(self.specialize_expr(target)),
                member: *member,
            },
            ExprKind::Subscript { target, index } => ExprKind::Subscript {
                target: Box::new(self.specialize_expr(target)),
                index: Box::new(self.specialize_expr(index)),
            },
            ExprKind::Match(match_expr) => ExprKind::Match(MatchExpr {
                target: Box::new(self.specialize_expr(&match_expr.target)),
                branches: match_expr
                    .branches
                    .iter()
                    .map(|branch| MatchBranch {
                        patterns: branch
                            .patterns
                            .iter()
                            .map(|pattern| self.specialize_expr(pattern))
                            .collect(),
                        value: self.specialize_expr(&branch.value),
                        span: branch.span,
                    })
                    .collect(),
            }),
        };
        Expr::new(kind, expr.span)
    }
}
