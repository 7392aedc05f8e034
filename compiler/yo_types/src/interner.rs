//! The canonical type interner.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use yo_ir::{CallingConv, Name, Span, StringInterner, TypeId};

use crate::{NumericKind, TypeData};

/// Error when creating a type fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInternError {
    /// A struct with this name already exists.
    DuplicateStruct { name: Name },
}

impl std::fmt::Display for TypeInternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeInternError::DuplicateStruct { name } => {
                write!(f, "struct type {:?} already registered", name)
            }
        }
    }
}

impl std::error::Error for TypeInternError {}

/// Member layout of a struct type.
#[derive(Clone, PartialEq, Debug)]
pub struct StructLayout {
    /// The canonical id of the struct type itself.
    pub ty: TypeId,
    /// Fields in declaration order. Immutable after creation.
    pub fields: Vec<(Name, TypeId)>,
    /// Location of the declaration.
    pub span: Span,
}

impl StructLayout {
    /// Look up a field by name, returning its index and type.
    pub fn field(&self, name: Name) -> Option<(usize, TypeId)> {
        self.fields
            .iter()
            .position(|&(field, _)| field == name)
            .map(|idx| (idx, self.fields[idx].1))
    }
}

struct InternerInner {
    /// Storage indexed by `TypeId` raw value.
    types: Vec<TypeData>,
    /// Deduplication map.
    map: FxHashMap<TypeData, u32>,
    /// Struct layouts by name.
    structs: FxHashMap<Name, StructLayout>,
}

/// Canonical type interner.
///
/// Owns every `TypeData` for the lifetime of a compilation. All
/// accessors are idempotent: interning the same structure twice returns
/// the same `TypeId`, so id equality is type identity.
pub struct TypeInterner {
    inner: RwLock<InternerInner>,
}

impl TypeInterner {
    /// Create an interner with the primitives pre-interned at the fixed
    /// ids in `yo_ir::TypeId`.
    pub fn new() -> Self {
        let primitives = [
            TypeData::Void,                          // 0 = TypeId::VOID
            TypeData::Numeric(NumericKind::Bool),    // 1 = TypeId::BOOL
            TypeData::Numeric(NumericKind::I8),      // 2 = TypeId::I8
            TypeData::Numeric(NumericKind::I16),     // 3 = TypeId::I16
            TypeData::Numeric(NumericKind::I32),     // 4 = TypeId::I32
            TypeData::Numeric(NumericKind::I64),     // 5 = TypeId::I64
            TypeData::Numeric(NumericKind::U8),      // 6 = TypeId::U8
            TypeData::Numeric(NumericKind::U16),     // 7 = TypeId::U16
            TypeData::Numeric(NumericKind::U32),     // 8 = TypeId::U32
            TypeData::Numeric(NumericKind::U64),     // 9 = TypeId::U64
            TypeData::Numeric(NumericKind::F64),     // 10 = TypeId::F64
        ];

        let mut inner = InternerInner {
            types: Vec::with_capacity(256),
            map: FxHashMap::default(),
            structs: FxHashMap::default(),
        };
        for (idx, data) in primitives.into_iter().enumerate() {
            inner.map.insert(data.clone(), idx as u32);
            inner.types.push(data);
        }

        TypeInterner {
            inner: RwLock::new(inner),
        }
    }

    /// Intern a type structure, returning its canonical id.
    pub fn intern(&self, data: TypeData) -> TypeId {
        {
            let guard = self.inner.read();
            if let Some(&idx) = guard.map.get(&data) {
                return TypeId::from_raw(idx);
            }
        }

        let mut guard = self.inner.write();
        if let Some(&idx) = guard.map.get(&data) {
            return TypeId::from_raw(idx);
        }
        let idx = guard.types.len() as u32;
        guard.types.push(data.clone());
        guard.map.insert(data, idx);
        TypeId::from_raw(idx)
    }

    /// Look up the structure of a type.
    ///
    /// # Panics
    /// Panics if the id was not produced by this interner.
    pub fn lookup(&self, id: TypeId) -> TypeData {
        let guard = self.inner.read();
        guard.types[id.raw() as usize].clone()
    }

    /// The unique pointer type to `pointee`. Memoized: repeated calls
    /// return the same id.
    pub fn pointer_to(&self, pointee: TypeId) -> TypeId {
        self.intern(TypeData::Pointer(pointee))
    }

    /// The unique function type for the given return type, parameter
    /// types, and calling convention.
    pub fn function(&self, ret: TypeId, params: impl Into<Box<[TypeId]>>, conv: CallingConv) -> TypeId {
        self.intern(TypeData::Function {
            ret,
            params: params.into(),
            conv,
        })
    }

    /// Create a new struct type.
    ///
    /// Fails if a struct with this name already exists; struct identity
    /// is nominal and a name is created at most once.
    pub fn make_struct(
        &self,
        name: Name,
        fields: Vec<(Name, TypeId)>,
        span: Span,
    ) -> Result<TypeId, TypeInternError> {
        let mut guard = self.inner.write();
        if guard.structs.contains_key(&name) {
            return Err(TypeInternError::DuplicateStruct { name });
        }

        let data = TypeData::Struct(name);
        let idx = guard.types.len() as u32;
        guard.types.push(data.clone());
        guard.map.insert(data, idx);
        let ty = TypeId::from_raw(idx);
        guard.structs.insert(name, StructLayout { ty, fields, span });
        Ok(ty)
    }

    /// The layout of a struct by name.
    pub fn struct_layout(&self, name: Name) -> Option<StructLayout> {
        self.inner.read().structs.get(&name).cloned()
    }

    /// Look up a struct field through the struct's type id.
    pub fn struct_field(&self, ty: TypeId, field: Name) -> Option<(usize, TypeId)> {
        let name = self.struct_name(ty)?;
        self.struct_layout(name)?.field(field)
    }

    /// Whether `id` is the void type.
    pub fn is_void(&self, id: TypeId) -> bool {
        id == TypeId::VOID
    }

    /// Whether `id` is a numerical type.
    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.lookup(id).is_numeric()
    }

    /// The numeric kind of `id`, if numerical.
    pub fn numeric_kind(&self, id: TypeId) -> Option<NumericKind> {
        self.lookup(id).numeric_kind()
    }

    /// Whether `id` is a pointer type.
    pub fn is_pointer(&self, id: TypeId) -> bool {
        self.lookup(id).is_pointer()
    }

    /// The pointee of a pointer type.
    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.lookup(id) {
            TypeData::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// Whether `id` is a function type.
    pub fn is_function(&self, id: TypeId) -> bool {
        self.lookup(id).is_function()
    }

    /// Return type, parameter types, and convention of a function type.
    pub fn function_parts(&self, id: TypeId) -> Option<(TypeId, Vec<TypeId>, CallingConv)> {
        match self.lookup(id) {
            TypeData::Function { ret, params, conv } => Some((ret, params.into_vec(), conv)),
            _ => None,
        }
    }

    /// Whether `id` is a struct type.
    pub fn is_struct(&self, id: TypeId) -> bool {
        self.lookup(id).is_struct()
    }

    /// The name of a struct type.
    pub fn struct_name(&self, id: TypeId) -> Option<Name> {
        match self.lookup(id) {
            TypeData::Struct(name) => Some(name),
            _ => None,
        }
    }

    /// The primitive type named `name`, if any.
    pub fn primitive_by_name(name: &str) -> Option<TypeId> {
        let id = match name {
            "void" => TypeId::VOID,
            "bool" => TypeId::BOOL,
            "i8" => TypeId::I8,
            "i16" => TypeId::I16,
            "i32" => TypeId::I32,
            "i64" => TypeId::I64,
            "u8" => TypeId::U8,
            "u16" => TypeId::U16,
            "u32" => TypeId::U32,
            "u64" => TypeId::U64,
            "f64" => TypeId::F64,
            _ => return None,
        };
        Some(id)
    }

    /// Render a type for diagnostics.
    pub fn display(&self, id: TypeId, names: &StringInterner) -> String {
        match self.lookup(id) {
            TypeData::Void => "void".to_owned(),
            TypeData::Numeric(kind) => kind.name().to_owned(),
            TypeData::Pointer(inner) => format!("*{}", self.display(inner, names)),
            TypeData::Function { ret, params, .. } => {
                let params: Vec<String> =
                    params.iter().map(|&p| self.display(p, names)).collect();
                format!("({}) -> {}", params.join(", "), self.display(ret, names))
            }
            TypeData::Struct(name) => names.lookup(name).to_owned(),
        }
    }

    /// Number of interned types.
    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    /// Whether only the primitives are interned.
    pub fn is_empty(&self) -> bool {
        self.len() as u32 <= TypeId::NUM_PRIMITIVES
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to a shared type interner.
///
/// The interner is shared between registration, resolution, and
/// lowering; all phases see the same canonical ids.
#[derive(Clone)]
pub struct SharedTypeInterner(Arc<TypeInterner>);

impl SharedTypeInterner {
    /// Create a new shared type interner.
    pub fn new() -> Self {
        SharedTypeInterner(Arc::new(TypeInterner::new()))
    }
}

impl Default for SharedTypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SharedTypeInterner {
    type Target = TypeInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for SharedTypeInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTypeInterner")
            .field("len", &self.0.len())
            .finish()
    }
}
