//! Syntactic type descriptors.
//!
//! A `TypeDesc` mirrors a type expression as written in the source:
//! nominal names, pointers, references, function types, tuples, and
//! `decltype` expressions. The semantic passes resolve descriptors into
//! canonical `TypeId`s; resolution is memoized on the descriptor itself
//! so repeated resolution is O(1) and idempotent.

use std::cell::Cell;

use crate::ast::Expr;
use crate::{Name, Span, TypeId};

/// Calling convention of a function type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum CallingConv {
    #[default]
    C,
}

/// Function type written in the source: `(params) -> ret`.
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionTypeDesc {
    pub conv: CallingConv,
    pub params: Vec<TypeDesc>,
    pub ret: Box<TypeDesc>,
}

/// The shape of a type descriptor.
#[derive(Clone, PartialEq, Debug)]
pub enum TypeDescKind {
    /// A plain type name: `i32`, `String`, a template parameter.
    Nominal(Name),
    /// A templated nominal type: `Foo<T, U>`. Reserved; resolution is
    /// not implemented.
    NominalTemplated { name: Name, args: Vec<TypeDesc> },
    /// A pointer: `*T`.
    Pointer(Box<TypeDesc>),
    /// A reference: `&T`. Collapses to the referent during resolution.
    Reference(Box<TypeDesc>),
    /// A function type.
    Function(FunctionTypeDesc),
    /// A tuple type: `(T, U)`.
    Tuple(Vec<TypeDesc>),
    /// `decltype(expr)`.
    Decltype(Box<Expr>),
    /// An already-resolved type, synthesized by the compiler.
    Resolved(TypeId),
}

/// A type expression with source location and resolution memo.
#[derive(Clone, Debug)]
pub struct TypeDesc {
    pub kind: TypeDescKind,
    pub span: Span,
    /// Cached result of resolution. Written at most once per descriptor
    /// (re-resolution always produces the same canonical id).
    resolved: Cell<Option<TypeId>>,
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        // The memo is derived state; structural equality ignores it.
        self.kind == other.kind
    }
}

impl TypeDesc {
    /// Create a descriptor of the given kind.
    pub fn new(kind: TypeDescKind, span: Span) -> Self {
        TypeDesc {
            kind,
            span,
            resolved: Cell::new(None),
        }
    }

    /// A plain nominal type.
    pub fn nominal(name: Name, span: Span) -> Self {
        Self::new(TypeDescKind::Nominal(name), span)
    }

    /// A templated nominal type.
    pub fn nominal_templated(name: Name, args: Vec<TypeDesc>, span: Span) -> Self {
        Self::new(TypeDescKind::NominalTemplated { name, args }, span)
    }

    /// A pointer to `inner`.
    pub fn pointer(inner: TypeDesc, span: Span) -> Self {
        Self::new(TypeDescKind::Pointer(Box::new(inner)), span)
    }

    /// A reference to `inner`.
    pub fn reference(inner: TypeDesc, span: Span) -> Self {
        Self::new(TypeDescKind::Reference(Box::new(inner)), span)
    }

    /// A function type.
    pub fn function(conv: CallingConv, params: Vec<TypeDesc>, ret: TypeDesc, span: Span) -> Self {
        Self::new(
            TypeDescKind::Function(FunctionTypeDesc {
                conv,
                params,
                ret: Box::new(ret),
            }),
            span,
        )
    }

    /// A tuple type.
    pub fn tuple(members: Vec<TypeDesc>, span: Span) -> Self {
        Self::new(TypeDescKind::Tuple(members), span)
    }

    /// A `decltype` over an expression.
    pub fn decltype(expr: Expr, span: Span) -> Self {
        Self::new(TypeDescKind::Decltype(Box::new(expr)), span)
    }

    /// A descriptor that is already resolved to a canonical type.
    pub fn resolved(ty: TypeId, span: Span) -> Self {
        let desc = Self::new(TypeDescKind::Resolved(ty), span);
        desc.resolved.set(Some(ty));
        desc
    }

    /// The cached resolution, if any.
    #[inline]
    pub fn resolved_type(&self) -> Option<TypeId> {
        if let TypeDescKind::Resolved(ty) = self.kind {
            return Some(ty);
        }
        self.resolved.get()
    }

    /// Whether this descriptor has been resolved.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved_type().is_some()
    }

    /// Record the resolution of this descriptor.
    #[inline]
    pub fn cache_resolution(&self, ty: TypeId) {
        self.resolved.set(Some(ty));
    }

    /// The nominal name, if this is a plain nominal descriptor.
    pub fn nominal_name(&self) -> Option<Name> {
        match self.kind {
            TypeDescKind::Nominal(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this is a pointer descriptor.
    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeDescKind::Pointer(_))
    }

    /// The pointee descriptor of a pointer or reference.
    pub fn pointee(&self) -> Option<&TypeDesc> {
        match &self.kind {
            TypeDescKind::Pointer(inner) | TypeDescKind::Reference(inner) => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_descriptor() {
        let desc = TypeDesc::resolved(TypeId::I32, Span::DUMMY);
        assert!(desc.is_resolved());
        assert_eq!(desc.resolved_type(), Some(TypeId::I32));
    }

    #[test]
    fn test_resolution_memo() {
        let desc = TypeDesc::nominal(Name::new(0, 1), Span::DUMMY);
        assert!(!desc.is_resolved());
        desc.cache_resolution(TypeId::BOOL);
        assert_eq!(desc.resolved_type(), Some(TypeId::BOOL));
    }

    #[test]
    fn test_structural_equality_ignores_memo() {
        let a = TypeDesc::nominal(Name::new(0, 1), Span::DUMMY);
        let b = TypeDesc::nominal(Name::new(0, 1), Span::new(5, 10));
        a.cache_resolution(TypeId::I64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_pointee() {
        let inner = TypeDesc::nominal(Name::new(0, 2), Span::DUMMY);
        let ptr = TypeDesc::pointer(inner.clone(), Span::DUMMY);
        assert!(ptr.is_pointer());
        assert_eq!(ptr.pointee(), Some(&inner));
    }
}
