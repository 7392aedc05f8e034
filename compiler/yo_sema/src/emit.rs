//! The backend emission contract.
//!
//! The semantic core drives an [`Emitter`] to lower declarations and
//! function bodies. The emitter is an opaque collaborator: the core
//! never sees backend values, only the token handles defined here. The
//! core guarantees that `define_function` is reached at most once per
//! mangled name; the emitter is expected to be idempotent over repeated
//! declarations of the same symbol.
//!
//! Blocks are appended to the function most recently passed to
//! [`Emitter::begin_function`]; the emitter maintains a current
//! insertion block the way an IR builder does.

use yo_ir::TypeId;
use yo_types::TypeInterner;

/// Opaque backend type handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeToken(pub u32);

/// Opaque backend function handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FuncToken(pub u32);

/// Opaque backend value handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ValueToken(pub u32);

/// Opaque basic-block handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BlockToken(pub u32);

/// Function linkage.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Linkage {
    External,
    Internal,
}

/// Which global constructor array to populate.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CtorKind {
    Startup,
    Shutdown,
}

/// Machine-level binary operations.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    /// Logical (zero-fill) right shift.
    LShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

/// Integer comparison predicates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

/// Ordered float comparison predicates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FloatPredicate {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

/// Cast instructions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CastOp {
    Trunc,
    SExt,
    ZExt,
    PtrToInt,
    IntToPtr,
    Bit,
    SIToFP,
    UIToFP,
}

/// What the core requires from its backend.
pub trait Emitter {
    /// Lower a canonical type to a backend type handle.
    fn lower_type(&mut self, ty: TypeId, types: &TypeInterner) -> TypeToken;

    /// Allocation size of a type in bytes.
    fn type_alloc_size(&mut self, ty: TypeId, types: &TypeInterner) -> u64;

    /// Declare a function symbol. Idempotent per name.
    fn declare_function(
        &mut self,
        name: &str,
        fn_type: TypeId,
        is_variadic: bool,
        linkage: Linkage,
        types: &TypeInterner,
    ) -> FuncToken;

    /// The address of a declared function as a callable value.
    fn function_address(&mut self, func: FuncToken) -> ValueToken;

    /// Start defining the body of `func`. Subsequent blocks and
    /// instructions belong to it until `end_function`.
    fn begin_function(&mut self, func: FuncToken);

    /// Finish defining the current function.
    fn end_function(&mut self, func: FuncToken);

    /// The `index`th parameter of the function being defined.
    fn param(&mut self, index: u32) -> ValueToken;

    /// Append a block to the function being defined.
    fn append_block(&mut self, name: &str) -> BlockToken;

    /// Move the insertion point to the end of `block`.
    fn position_at_end(&mut self, block: BlockToken);

    /// The current insertion block.
    fn current_block(&self) -> BlockToken;

    /// Whether the current block already ends in a terminator.
    fn is_terminated(&self) -> bool;

    fn alloca(&mut self, ty: TypeId, name: &str, types: &TypeInterner) -> ValueToken;
    fn load(&mut self, ptr: ValueToken, ty: TypeId, types: &TypeInterner) -> ValueToken;
    fn store(&mut self, value: ValueToken, ptr: ValueToken);
    fn call(&mut self, callee: ValueToken, args: &[ValueToken]) -> ValueToken;

    fn br(&mut self, dest: BlockToken);
    fn cond_br(&mut self, cond: ValueToken, then_block: BlockToken, else_block: BlockToken);
    fn ret(&mut self, value: Option<ValueToken>);
    fn phi(
        &mut self,
        ty: TypeId,
        incoming: &[(ValueToken, BlockToken)],
        types: &TypeInterner,
    ) -> ValueToken;

    fn arith(&mut self, op: ArithOp, lhs: ValueToken, rhs: ValueToken) -> ValueToken;
    fn icmp(&mut self, pred: IntPredicate, lhs: ValueToken, rhs: ValueToken) -> ValueToken;
    fn fcmp(&mut self, pred: FloatPredicate, lhs: ValueToken, rhs: ValueToken) -> ValueToken;
    fn cast(&mut self, op: CastOp, value: ValueToken, dest: TypeId, types: &TypeInterner)
        -> ValueToken;
    fn neg(&mut self, value: ValueToken) -> ValueToken;
    fn not(&mut self, value: ValueToken) -> ValueToken;
    /// Compare a value against the null/zero of its type.
    fn is_null(&mut self, value: ValueToken) -> ValueToken;

    /// Pointer arithmetic: `ptr + index` scaled by the pointee size.
    fn gep(&mut self, ptr: ValueToken, index: ValueToken) -> ValueToken;
    /// Address of field `index` of the struct `ptr` points at.
    fn struct_gep(&mut self, ptr: ValueToken, index: u32) -> ValueToken;

    fn const_int(&mut self, ty: TypeId, value: u64, types: &TypeInterner) -> ValueToken;
    fn const_float(&mut self, value: f64) -> ValueToken;
    fn const_bool(&mut self, value: bool) -> ValueToken;
    fn const_null(&mut self, ty: TypeId, types: &TypeInterner) -> ValueToken;
    fn global_string(&mut self, value: &str) -> ValueToken;

    /// Emit a trap instruction; the result is unreachable.
    fn trap(&mut self) -> ValueToken;

    /// Populate the startup or shutdown constructor array with the given
    /// functions, in order.
    fn emit_ctor_array(&mut self, kind: CtorKind, funcs: &[FuncToken]);
}
