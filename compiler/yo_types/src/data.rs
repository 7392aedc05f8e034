//! Structural type representation.

use yo_ir::{CallingConv, Name, TypeId};

use crate::NumericKind;

/// The structure of a canonical type.
///
/// `TypeData` is what the interner deduplicates on. Struct types carry
/// only their name here; member layout lives in the interner's struct
/// table, so a struct's identity is its name, never its member list.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    Void,
    Numeric(NumericKind),
    Pointer(TypeId),
    Function {
        ret: TypeId,
        params: Box<[TypeId]>,
        conv: CallingConv,
    },
    Struct(Name),
}

impl TypeData {
    /// Whether this is the void type.
    pub fn is_void(&self) -> bool {
        matches!(self, TypeData::Void)
    }

    /// Whether this is a numerical type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeData::Numeric(_))
    }

    /// Whether this is a pointer type.
    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeData::Pointer(_))
    }

    /// Whether this is a function type.
    pub fn is_function(&self) -> bool {
        matches!(self, TypeData::Function { .. })
    }

    /// Whether this is a struct type.
    pub fn is_struct(&self) -> bool {
        matches!(self, TypeData::Struct(_))
    }

    /// The numeric kind, if numerical.
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            TypeData::Numeric(kind) => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(TypeData::Void.is_void());
        assert!(TypeData::Numeric(NumericKind::I32).is_numeric());
        assert!(TypeData::Pointer(TypeId::I8).is_pointer());
        assert!(TypeData::Struct(Name::EMPTY).is_struct());
    }

    #[test]
    fn test_hash_equality() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(TypeData::Pointer(TypeId::I8));
        set.insert(TypeData::Pointer(TypeId::I8));
        set.insert(TypeData::Pointer(TypeId::I16));
        assert_eq!(set.len(), 2);
    }
}
