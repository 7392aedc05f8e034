//! Name mangling.
//!
//! Two name layers:
//!
//! - The **canonical name** identifies a callable by kind, enclosing
//!   type, and plain name. Overloads share a canonical name.
//! - The **mangled name** appends the fully-resolved parameter and
//!   return types. It is injective over distinct signatures and serves
//!   as the external linkage symbol.
//!
//! Grammar:
//!
//! ```text
//! <mangled>    := <canonical> "$" <param-list> "$" <return>
//! <canonical>  := "$" <kind> [ <scope> ] <name>
//! <kind>       := "G" | "S" | "I" | "O"
//! <param-list> := { "_" <type> }
//! ```
//!
//! Components are length-prefixed; types use a fixed one-letter prefix
//! code (`v` void, `b` bool, `c`/`C` i8/u8, `s`/`S` i16/u16, `i`/`I`
//! i32/u32, `l`/`L` i64/u64, `d` f64, `P<T>` pointer, `F<R>{_<P>}E`
//! function, `N<name>` struct).

use std::fmt::Write;

use yo_ir::{FunctionKind, StringInterner, TypeId};
use yo_types::{NumericKind, TypeData, TypeInterner};

/// One-letter kind code.
fn kind_code(kind: FunctionKind) -> char {
    match kind {
        FunctionKind::Global => 'G',
        FunctionKind::StaticMethod => 'S',
        FunctionKind::InstanceMethod => 'I',
        FunctionKind::Operator => 'O',
    }
}

fn push_component(out: &mut String, component: &str) {
    let _ = write!(out, "{}{}", component.len(), component);
}

/// Canonical name for a callable.
pub fn canonical_name(kind: FunctionKind, owner: Option<&str>, name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    out.push('$');
    out.push(kind_code(kind));
    if let Some(owner) = owner {
        push_component(&mut out, owner);
    }
    push_component(&mut out, name);
    out
}

/// Canonical name of an operator callable.
pub fn canonical_operator(name: &str) -> String {
    canonical_name(FunctionKind::Operator, None, name)
}

/// Append the type code for `ty`.
pub fn push_type_code(out: &mut String, ty: TypeId, types: &TypeInterner, names: &StringInterner) {
    match types.lookup(ty) {
        TypeData::Void => out.push('v'),
        TypeData::Numeric(kind) => out.push(match kind {
            NumericKind::Bool => 'b',
            NumericKind::I8 => 'c',
            NumericKind::U8 => 'C',
            NumericKind::I16 => 's',
            NumericKind::U16 => 'S',
            NumericKind::I32 => 'i',
            NumericKind::U32 => 'I',
            NumericKind::I64 => 'l',
            NumericKind::U64 => 'L',
            NumericKind::F64 => 'd',
        }),
        TypeData::Pointer(pointee) => {
            out.push('P');
            push_type_code(out, pointee, types, names);
        }
        TypeData::Function { ret, params, .. } => {
            out.push('F');
            push_type_code(out, ret, types, names);
            for &param in params.iter() {
                out.push('_');
                push_type_code(out, param, types, names);
            }
            out.push('E');
        }
        TypeData::Struct(name) => {
            out.push('N');
            push_component(out, names.lookup(name));
        }
    }
}

/// Fully-resolved mangled name for a callable with the given resolved
/// parameter and return types.
pub fn mangled_name(
    kind: FunctionKind,
    owner: Option<&str>,
    name: &str,
    param_types: &[TypeId],
    ret: TypeId,
    types: &TypeInterner,
    names: &StringInterner,
) -> String {
    let mut out = canonical_name(kind, owner, name);
    out.push('$');
    for &param in param_types {
        out.push('_');
        push_type_code(&mut out, param, types, names);
    }
    out.push('$');
    push_type_code(&mut out, ret, types, names);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use yo_ir::{CallingConv, Span};

    #[test]
    fn test_canonical_names() {
        assert_eq!(
            canonical_name(FunctionKind::Global, None, "main"),
            "$G4main"
        );
        assert_eq!(
            canonical_name(FunctionKind::StaticMethod, Some("Point"), "init"),
            "$S5Point4init"
        );
        assert_eq!(
            canonical_name(FunctionKind::InstanceMethod, Some("Point"), "norm"),
            "$I5Point4norm"
        );
        assert_eq!(canonical_operator("__add"), "$O5__add");
    }

    #[test]
    fn test_mangled_name_encodes_types() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let mangled = mangled_name(
            FunctionKind::Global,
            None,
            "f",
            &[TypeId::I32, TypeId::U8],
            TypeId::VOID,
            &types,
            &names,
        );
        assert_eq!(mangled, "$G1f$_i_C$v");
    }

    #[test]
    fn test_mangled_name_pointer_and_struct() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let point = names.intern("Point");
        let x = names.intern("x");
        let struct_ty = types
            .make_struct(point, vec![(x, TypeId::I32)], Span::DUMMY)
            .unwrap();
        let ptr = types.pointer_to(struct_ty);

        let mangled = mangled_name(
            FunctionKind::StaticMethod,
            Some("Point"),
            "init",
            &[TypeId::I32],
            ptr,
            &types,
            &names,
        );
        assert_eq!(mangled, "$S5Point4init$_i$PN5Point");
    }

    #[test]
    fn test_mangling_injective_over_signatures() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let a = mangled_name(
            FunctionKind::Global,
            None,
            "f",
            &[TypeId::I32],
            TypeId::I32,
            &types,
            &names,
        );
        let b = mangled_name(
            FunctionKind::Global,
            None,
            "f",
            &[TypeId::U32],
            TypeId::U32,
            &types,
            &names,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_function_type_code_delimited() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let callback = types.function(TypeId::VOID, [TypeId::I32, TypeId::I32], CallingConv::C);
        let mut out = String::new();
        push_type_code(&mut out, callback, &types, &names);
        assert_eq!(out, "Fv_i_iE");
    }
}
