//! AST node definitions.
//!
//! Declarations, statements, and expressions are closed tagged sums.
//! Every node owns its children (single-owner trees); the template
//! specializer produces structurally independent deep clones.

use crate::{
    BinaryOp, CallingConv, FunctionAttributes, Name, Span, StructAttributes, TypeDesc, TypeId,
    UnaryOp,
};

/// A top-level declaration.
#[derive(Clone, PartialEq, Debug)]
pub enum Decl {
    Function(FunctionDecl),
    Struct(StructDecl),
    Impl(ImplBlock),
    Typealias(TypealiasDecl),
    Use(UseDecl),
}

impl Decl {
    /// Source location of the declaration.
    pub fn span(&self) -> Span {
        match self {
            Decl::Function(decl) => decl.span,
            Decl::Struct(decl) => decl.span,
            Decl::Impl(block) => block.span,
            Decl::Typealias(decl) => decl.span,
            Decl::Use(decl) => decl.span,
        }
    }
}

/// The kind of callable a function declaration introduces.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FunctionKind {
    /// A free global function.
    Global,
    /// A static method of a type.
    StaticMethod,
    /// An instance method; the first parameter is the `self` slot.
    InstanceMethod,
    /// An operator callable (`__add` and friends).
    Operator,
}

impl FunctionKind {
    /// Number of implicit leading arguments a call must supply.
    pub fn argument_offset(self) -> u8 {
        match self {
            FunctionKind::InstanceMethod => 1,
            FunctionKind::Global | FunctionKind::StaticMethod | FunctionKind::Operator => 0,
        }
    }
}

/// A function signature: parameter and return descriptors plus the
/// template-parameter list.
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionSignature {
    pub params: Vec<TypeDesc>,
    pub ret: TypeDesc,
    pub is_variadic: bool,
    pub template_params: Vec<Name>,
    pub conv: CallingConv,
}

impl FunctionSignature {
    /// Create a plain non-variadic, non-template signature.
    pub fn simple(params: Vec<TypeDesc>, ret: TypeDesc) -> Self {
        FunctionSignature {
            params,
            ret,
            is_variadic: false,
            template_params: Vec::new(),
            conv: CallingConv::C,
        }
    }

    /// A signature is a template signature iff it declares template
    /// parameters.
    #[inline]
    pub fn is_template(&self) -> bool {
        !self.template_params.is_empty()
    }
}

/// A function declaration.
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionDecl {
    pub name: Name,
    pub kind: FunctionKind,
    pub sig: FunctionSignature,
    /// One name per signature parameter, in order.
    pub param_names: Vec<Name>,
    pub attrs: FunctionAttributes,
    /// `None` for forward declarations; intrinsics carry `Some` with an
    /// empty statement list.
    pub body: Option<Vec<Stmt>>,
    /// Declaring type for methods.
    pub owner: Option<Name>,
    pub span: Span,
}

/// A struct declaration.
#[derive(Clone, PartialEq, Debug)]
pub struct StructDecl {
    pub name: Name,
    pub fields: Vec<FieldDecl>,
    pub attrs: StructAttributes,
    pub span: Span,
}

/// A single struct field.
#[derive(Clone, PartialEq, Debug)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: TypeDesc,
    pub span: Span,
}

/// An `impl` block attaching methods to a struct.
#[derive(Clone, PartialEq, Debug)]
pub struct ImplBlock {
    pub type_name: Name,
    pub methods: Vec<FunctionDecl>,
    pub span: Span,
}

/// A type alias.
#[derive(Clone, PartialEq, Debug)]
pub struct TypealiasDecl {
    pub name: Name,
    pub ty: TypeDesc,
    pub span: Span,
}

/// A `use` directive naming a library module.
#[derive(Clone, PartialEq, Debug)]
pub struct UseDecl {
    pub module: Name,
    pub span: Span,
}

/// A statement.
#[derive(Clone, PartialEq, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement kinds.
#[derive(Clone, PartialEq, Debug)]
pub enum StmtKind {
    /// A braced block.
    Composite(Vec<Stmt>),
    /// `let name: ty = init`.
    VarDecl {
        name: Name,
        ty: Option<TypeDesc>,
        init: Option<Expr>,
    },
    /// `target = value`.
    Assign { target: Expr, value: Expr },
    /// `return expr?`.
    Return(Option<Expr>),
    If {
        branches: Vec<IfBranch>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    /// `for binding in iterable { .. }`. Parsed but not lowered.
    For {
        binding: Name,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    /// An expression evaluated for its effect.
    Expr(Expr),
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// One branch of an `if` chain.
#[derive(Clone, PartialEq, Debug)]
pub struct IfBranch {
    pub kind: IfBranchKind,
    /// `None` only for `Else`.
    pub cond: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IfBranchKind {
    If,
    ElseIf,
    Else,
}

/// An expression.
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression kinds.
#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    Number(NumberLiteral),
    String {
        value: String,
        kind: StringKind,
    },
    Ident(Name),
    Cast {
        expr: Box<Expr>,
        dest: TypeDesc,
        cast: CastKind,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call(CallExpr),
    Member {
        target: Box<Expr>,
        member: Name,
    },
    Subscript {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Match(MatchExpr),
    /// `Type::member` as a call target.
    StaticDeclRef {
        type_name: Name,
        member: Name,
    },
    /// An already-lowered backend value carrying its type. Synthesized
    /// by the lowering pass, never produced by the parser.
    Raw {
        handle: u32,
        ty: TypeId,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    /// An identifier expression.
    pub fn ident(name: Name, span: Span) -> Self {
        Expr::new(ExprKind::Ident(name), span)
    }

    /// An integer literal.
    pub fn integer(value: u64, span: Span) -> Self {
        Expr::new(
            ExprKind::Number(NumberLiteral {
                value,
                kind: NumberKind::Integer,
            }),
            span,
        )
    }

    /// The literal payload, if this is a number literal.
    pub fn as_number_literal(&self) -> Option<&NumberLiteral> {
        match &self.kind {
            ExprKind::Number(literal) => Some(literal),
            _ => None,
        }
    }
}

/// A numeric literal. Doubles store their IEEE 754 bit pattern.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NumberLiteral {
    pub value: u64,
    pub kind: NumberKind,
}

impl NumberLiteral {
    /// The payload reinterpreted as a double.
    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.value)
    }
}

/// What kind of number a literal is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NumberKind {
    Integer,
    Boolean,
    Character,
    Double,
}

/// What kind of string a literal is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StringKind {
    /// `b"..."` — a `*i8` pointing at the raw bytes.
    ByteString,
    /// `"..."` — a `*String` instance.
    Normal,
}

/// A call expression.
#[derive(Clone, PartialEq, Debug)]
pub struct CallExpr {
    pub target: Box<Expr>,
    pub args: Vec<Expr>,
    /// Explicit template arguments: `foo<i32>(..)`.
    pub template_args: Vec<TypeDesc>,
}

/// A `match` expression.
#[derive(Clone, PartialEq, Debug)]
pub struct MatchExpr {
    pub target: Box<Expr>,
    pub branches: Vec<MatchBranch>,
}

/// One branch of a `match`.
#[derive(Clone, PartialEq, Debug)]
pub struct MatchBranch {
    /// Patterns this branch matches; any match takes the branch.
    pub patterns: Vec<Expr>,
    pub value: Expr,
    pub span: Span,
}

/// How a cast converts its operand.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CastKind {
    /// Width-changing numeric conversion.
    Static,
    /// Same-width reinterpretation; pointer-integer conversions allowed.
    Bit,
}
