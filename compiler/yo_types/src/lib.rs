//! Type system for the yo compiler.
//!
//! Every type the compiler reasons about is canonicalized through
//! [`TypeInterner`]: one `TypeId` per distinct type for the lifetime of a
//! compilation, so type equality is id equality.
//!
//! - Primitives are pre-interned at the fixed ids in `yo_ir::TypeId`.
//! - Pointer and function types are deduplicated structurally; the
//!   pointer-to operation is memoized.
//! - Struct types are identified by name and created at most once, so
//!   two structs with identical member lists are still distinct types.

mod data;
mod interner;
mod kind;

pub use data::TypeData;
pub use interner::{SharedTypeInterner, StructLayout, TypeInternError, TypeInterner};
pub use kind::NumericKind;
