//! Type-descriptor resolution.

use yo_ir::{FunctionSignature, TypeDesc, TypeDescKind, TypeId};
use yo_types::TypeInterner;

use crate::emit::Emitter;
use crate::errors::{SemaError, SemaResult};

use super::Lowering;

impl<E: Emitter> Lowering<'_, E> {
    /// Resolve a syntactic type descriptor to its canonical type.
    ///
    /// With `memoize` set, the resolution is cached on the descriptor so
    /// later calls are O(1); with it clear, no descriptor is mutated —
    /// the mode overload scoring uses while template parameters are
    /// transiently installed in the nominal-type table.
    pub fn resolve_type_desc(&mut self, desc: &TypeDesc, memoize: bool) -> SemaResult<TypeId> {
        if let Some(ty) = desc.resolved_type() {
            return Ok(ty);
        }

        let ty = match &desc.kind {
            TypeDescKind::Resolved(ty) => *ty,
            TypeDescKind::Nominal(name) => {
                let text = self.names.lookup(*name);
                if let Some(primitive) = TypeInterner::primitive_by_name(text) {
                    primitive
                } else if let Some(&known) = self.nominal_types.get(*name) {
                    known
                } else {
                    return Err(SemaError::UnknownType {
                        name: text.to_owned(),
                        span: desc.span,
                    });
                }
            }
            TypeDescKind::Pointer(inner) => {
                let pointee = self.resolve_type_desc(inner, memoize)?;
                self.types.pointer_to(pointee)
            }
            // References collapse to their referent at this layer.
            TypeDescKind::Reference(inner) => self.resolve_type_desc(inner, memoize)?,
            TypeDescKind::Function(fd) => {
                let ret = self.resolve_type_desc(&fd.ret, memoize)?;
                let mut params = Vec::with_capacity(fd.params.len());
                for param in &fd.params {
                    params.push(self.resolve_type_desc(param, memoize)?);
                }
                self.types.function(ret, params, fd.conv)
            }
            TypeDescKind::Tuple(members) => {
                if members.is_empty() {
                    TypeId::VOID
                } else {
                    return Err(SemaError::Unimplemented {
                        what: "tuple types",
                        span: desc.span,
                    });
                }
            }
            TypeDescKind::Decltype(expr) => self.guess_type(expr)?,
            TypeDescKind::NominalTemplated { .. } => {
                return Err(SemaError::Unimplemented {
                    what: "templated nominal types",
                    span: desc.span,
                });
            }
        };

        if memoize {
            desc.cache_resolution(ty);
        }
        Ok(ty)
    }

    /// Whether two signatures denote the same callable shape: resolved
    /// return types, resolved parameter types pairwise, and template
    /// parameter lists all equal.
    pub(crate) fn signatures_equal(
        &mut self,
        lhs: &FunctionSignature,
        rhs: &FunctionSignature,
    ) -> SemaResult<bool> {
        if lhs.template_params != rhs.template_params {
            return Ok(false);
        }
        if lhs.params.len() != rhs.params.len() {
            return Ok(false);
        }
        if self.resolve_type_desc(&lhs.ret, false)? != self.resolve_type_desc(&rhs.ret, false)? {
            return Ok(false);
        }
        for (a, b) in lhs.params.iter().zip(&rhs.params) {
            if self.resolve_type_desc(a, false)? != self.resolve_type_desc(b, false)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Render a canonical type for diagnostics.
    pub(crate) fn display_type(&self, ty: TypeId) -> String {
        self.types.display(ty, &self.names)
    }

    /// Render a descriptor without resolving it.
    pub(crate) fn display_desc(&self, desc: &TypeDesc) -> String {
        if let Some(ty) = desc.resolved_type() {
            return self.display_type(ty);
        }
        match &desc.kind {
            TypeDescKind::Nominal(name) => self.names.lookup(*name).to_owned(),
            TypeDescKind::NominalTemplated { name, args } => {
                let args: Vec<String> = args.iter().map(|arg| self.display_desc(arg)).collect();
                format!("{}<{}>", self.names.lookup(*name), args.join(", "))
            }
            TypeDescKind::Pointer(inner) => format!("*{}", self.display_desc(inner)),
            TypeDescKind::Reference(inner) => format!("&{}", self.display_desc(inner)),
            TypeDescKind::Function(fd) => {
                let params: Vec<String> =
                    fd.params.iter().map(|param| self.display_desc(param)).collect();
                format!("({}) -> {}", params.join(", "), self.display_desc(&fd.ret))
            }
            TypeDescKind::Tuple(members) => {
                let members: Vec<String> =
                    members.iter().map(|member| self.display_desc(member)).collect();
                format!("({})", members.join(", "))
            }
            TypeDescKind::Decltype(_) => "decltype(..)".to_owned(),
            TypeDescKind::Resolved(ty) => self.display_type(*ty),
        }
    }

    /// Render a declaration's signature for diagnostics.
    pub(crate) fn display_signature(&self, decl: &yo_ir::FunctionDecl) -> String {
        let params: Vec<String> = decl
            .sig
            .params
            .iter()
            .map(|param| self.display_desc(param))
            .collect();
        format!(
            "{}({}) -> {}",
            self.names.lookup(decl.name),
            params.join(", "),
            self.display_desc(&decl.sig.ret)
        )
    }
}
