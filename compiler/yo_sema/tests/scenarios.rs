//! End-to-end scenarios for the semantic middle-end, driven against a
//! recording emitter.

use std::collections::{HashMap, HashSet};

use yo_ir::{
    CallExpr, Decl, Expr, ExprKind, FieldDecl, FunctionAttributes, FunctionDecl, FunctionKind,
    FunctionSignature, MatchBranch, MatchExpr, Name, NumberKind, NumberLiteral, SharedInterner,
    Span, Stmt, StmtKind, StructDecl, TypeDesc, TypeId,
};
use yo_sema::emit::{
    ArithOp, BlockToken, CastOp, CtorKind, Emitter, FloatPredicate, FuncToken, IntPredicate,
    Linkage, TypeToken, ValueToken,
};
use yo_sema::{Lowering, NoModules, SemaError};
use yo_types::TypeInterner;

/// An emitter that hands out fresh tokens and records what the core
/// asked for.
#[derive(Default)]
struct RecordingEmitter {
    next_token: u32,
    current_block: u32,
    terminated: HashSet<u32>,
    declared: HashMap<String, u32>,
    defined: Vec<u32>,
    calls: usize,
    phis: usize,
    casts: Vec<CastOp>,
    arith_ops: Vec<ArithOp>,
    int_cmps: Vec<IntPredicate>,
    ctor_arrays: Vec<(CtorKind, usize)>,
}

impl RecordingEmitter {
    fn fresh(&mut self) -> u32 {
        self.next_token += 1;
        self.next_token
    }

    fn definitions_of(&self, name: &str) -> usize {
        match self.declared.get(name) {
            Some(&token) => self.defined.iter().filter(|&&t| t == token).count(),
            None => 0,
        }
    }
}

impl Emitter for RecordingEmitter {
    fn lower_type(&mut self, _ty: TypeId, _types: &TypeInterner) -> TypeToken {
        TypeToken(self.fresh())
    }

    fn type_alloc_size(&mut self, ty: TypeId, types: &TypeInterner) -> u64 {
        match types.numeric_kind(ty) {
            Some(kind) => u64::from(kind.size_bytes()),
            None => 8,
        }
    }

    fn declare_function(
        &mut self,
        name: &str,
        _fn_type: TypeId,
        _is_variadic: bool,
        _linkage: Linkage,
        _types: &TypeInterner,
    ) -> FuncToken {
        if let Some(&token) = self.declared.get(name) {
            return FuncToken(token);
        }
        let token = self.fresh();
        self.declared.insert(name.to_owned(), token);
        FuncToken(token)
    }

    fn function_address(&mut self, func: FuncToken) -> ValueToken {
        ValueToken(func.0)
    }

    fn begin_function(&mut self, func: FuncToken) {
        self.defined.push(func.0);
    }

    fn end_function(&mut self, _func: FuncToken) {}

    fn param(&mut self, _index: u32) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn append_block(&mut self, _name: &str) -> BlockToken {
        BlockToken(self.fresh())
    }

    fn position_at_end(&mut self, block: BlockToken) {
        self.current_block = block.0;
    }

    fn current_block(&self) -> BlockToken {
        BlockToken(self.current_block)
    }

    fn is_terminated(&self) -> bool {
        self.terminated.contains(&self.current_block)
    }

    fn alloca(&mut self, _ty: TypeId, _name: &str, _types: &TypeInterner) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn load(&mut self, _ptr: ValueToken, _ty: TypeId, _types: &TypeInterner) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn store(&mut self, _value: ValueToken, _ptr: ValueToken) {}

    fn call(&mut self, _callee: ValueToken, _args: &[ValueToken]) -> ValueToken {
        self.calls += 1;
        ValueToken(self.fresh())
    }

    fn br(&mut self, _dest: BlockToken) {
        self.terminated.insert(self.current_block);
    }

    fn cond_br(&mut self, _cond: ValueToken, _then_block: BlockToken, _else_block: BlockToken) {
        self.terminated.insert(self.current_block);
    }

    fn ret(&mut self, _value: Option<ValueToken>) {
        self.terminated.insert(self.current_block);
    }

    fn phi(
        &mut self,
        _ty: TypeId,
        _incoming: &[(ValueToken, BlockToken)],
        _types: &TypeInterner,
    ) -> ValueToken {
        self.phis += 1;
        ValueToken(self.fresh())
    }

    fn arith(&mut self, op: ArithOp, _lhs: ValueToken, _rhs: ValueToken) -> ValueToken {
        self.arith_ops.push(op);
        ValueToken(self.fresh())
    }

    fn icmp(&mut self, pred: IntPredicate, _lhs: ValueToken, _rhs: ValueToken) -> ValueToken {
        self.int_cmps.push(pred);
        ValueToken(self.fresh())
    }

    fn fcmp(&mut self, _pred: FloatPredicate, _lhs: ValueToken, _rhs: ValueToken) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn cast(
        &mut self,
        op: CastOp,
        _value: ValueToken,
        _dest: TypeId,
        _types: &TypeInterner,
    ) -> ValueToken {
        self.casts.push(op);
        ValueToken(self.fresh())
    }

    fn neg(&mut self, _value: ValueToken) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn not(&mut self, _value: ValueToken) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn is_null(&mut self, _value: ValueToken) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn gep(&mut self, _ptr: ValueToken, _index: ValueToken) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn struct_gep(&mut self, _ptr: ValueToken, _index: u32) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn const_int(&mut self, _ty: TypeId, _value: u64, _types: &TypeInterner) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn const_float(&mut self, _value: f64) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn const_bool(&mut self, _value: bool) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn const_null(&mut self, _ty: TypeId, _types: &TypeInterner) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn global_string(&mut self, _value: &str) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn trap(&mut self) -> ValueToken {
        ValueToken(self.fresh())
    }

    fn emit_ctor_array(&mut self, kind: CtorKind, funcs: &[FuncToken]) {
        self.ctor_arrays.push((kind, funcs.len()));
    }
}

// AST construction helpers.

fn nominal(names: &SharedInterner, name: &str) -> TypeDesc {
    TypeDesc::nominal(names.intern(name), Span::DUMMY)
}

fn integer(value: u64) -> Expr {
    Expr::integer(value, Span::DUMMY)
}

fn ident(names: &SharedInterner, name: &str) -> Expr {
    Expr::ident(names.intern(name), Span::DUMMY)
}

fn call(target: Expr, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call(CallExpr {
            target: Box::new(target),
            args,
            template_args: Vec::new(),
        }),
        Span::DUMMY,
    )
}

fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr(expr), Span::DUMMY)
}

fn return_stmt(expr: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return(expr), Span::DUMMY)
}

fn var_decl(names: &SharedInterner, name: &str, ty: Option<TypeDesc>, init: Option<Expr>) -> Stmt {
    Stmt::new(
        StmtKind::VarDecl {
            name: names.intern(name),
            ty,
            init,
        },
        Span::DUMMY,
    )
}

fn function(
    names: &SharedInterner,
    name: &str,
    params: Vec<(&str, TypeDesc)>,
    ret: TypeDesc,
    body: Vec<Stmt>,
) -> FunctionDecl {
    let param_names: Vec<Name> = params.iter().map(|(n, _)| names.intern(n)).collect();
    let param_types: Vec<TypeDesc> = params.into_iter().map(|(_, t)| t).collect();
    FunctionDecl {
        name: names.intern(name),
        kind: FunctionKind::Global,
        sig: FunctionSignature::simple(param_types, ret),
        param_names,
        attrs: FunctionAttributes::default(),
        body: Some(body),
        owner: None,
        span: Span::DUMMY,
    }
}

fn template_function(
    names: &SharedInterner,
    name: &str,
    template_params: &[&str],
    params: Vec<(&str, TypeDesc)>,
    ret: TypeDesc,
    body: Vec<Stmt>,
) -> FunctionDecl {
    let mut decl = function(names, name, params, ret, body);
    decl.sig.template_params = template_params.iter().map(|p| names.intern(p)).collect();
    decl
}

fn struct_decl(names: &SharedInterner, name: &str, fields: Vec<(&str, TypeDesc)>) -> StructDecl {
    StructDecl {
        name: names.intern(name),
        fields: fields
            .into_iter()
            .map(|(field, ty)| FieldDecl {
                name: names.intern(field),
                ty,
                span: Span::DUMMY,
            })
            .collect(),
        attrs: Default::default(),
        span: Span::DUMMY,
    }
}

fn main_returning_zero(names: &SharedInterner, mut body: Vec<Stmt>) -> FunctionDecl {
    body.push(return_stmt(Some(integer(0))));
    function(names, "main", vec![], nominal(names, "i32"), body)
}

// Scenario S1: primitive identity and pointer memoization.
#[test]
fn resolution_is_idempotent_and_canonical() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut lowering = Lowering::new(&mut emitter, names.clone());

    let desc = nominal(&names, "i32");
    let first = lowering.resolve_type_desc(&desc, true).unwrap();
    let second = lowering.resolve_type_desc(&desc, true).unwrap();
    assert_eq!(first, TypeId::I32);
    assert_eq!(first, second);

    // A structurally equal descriptor resolves to the same canonical id.
    let other = nominal(&names, "i32");
    assert_eq!(lowering.resolve_type_desc(&other, false).unwrap(), first);
    // Speculative mode does not memoize.
    assert!(!other.is_resolved());

    let ptr_a = lowering.types().pointer_to(first);
    let ptr_b = lowering.types().pointer_to(first);
    assert_eq!(ptr_a, ptr_b);
}

// Scenario S2: overload selection on literal fit.
#[test]
fn overload_picks_candidate_the_literal_fits() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let decls = vec![
            Decl::Function(function(
                &names,
                "f",
                vec![("x", nominal(&names, "i8"))],
                nominal(&names, "void"),
                vec![],
            )),
            Decl::Function(function(
                &names,
                "f",
                vec![("x", nominal(&names, "i64"))],
                nominal(&names, "void"),
                vec![],
            )),
            // 300 does not fit i8, so the i64 overload wins with score 1.
            Decl::Function(main_returning_zero(
                &names,
                vec![expr_stmt(call(ident(&names, "f"), vec![integer(300)]))],
            )),
        ];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    assert!(emitter.declared.contains_key("$G1f$_c$v"));
    assert!(emitter.declared.contains_key("$G1f$_l$v"));
    assert_eq!(emitter.calls, 1);
}

// Scenario S5: both candidates fit equally well.
#[test]
fn equally_scored_candidates_are_ambiguous() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut lowering = Lowering::new(&mut emitter, names.clone());
    let decls = vec![
        Decl::Function(function(
            &names,
            "g",
            vec![("x", nominal(&names, "i32"))],
            nominal(&names, "void"),
            vec![],
        )),
        Decl::Function(function(
            &names,
            "g",
            vec![("x", nominal(&names, "u32"))],
            nominal(&names, "void"),
            vec![],
        )),
        Decl::Function(main_returning_zero(
            &names,
            vec![expr_stmt(call(ident(&names, "g"), vec![integer(1)]))],
        )),
    ];
    let err = lowering.lower_unit(decls, &mut NoModules).unwrap_err();
    assert!(matches!(err, SemaError::AmbiguousCall { .. }));
    if let SemaError::AmbiguousCall { candidates, .. } = err {
        assert_eq!(candidates.len(), 2);
    }
}

// Scenario S3: deduction instantiates once; repeats reuse the cache.
#[test]
fn template_instantiation_is_memoized() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let id = template_function(
            &names,
            "id",
            &["T"],
            vec![("x", nominal(&names, "T"))],
            nominal(&names, "T"),
            vec![return_stmt(Some(ident(&names, "x")))],
        );
        let body = vec![
            var_decl(&names, "a", Some(nominal(&names, "i64")), Some(integer(7))),
            expr_stmt(call(ident(&names, "id"), vec![ident(&names, "a")])),
            expr_stmt(call(ident(&names, "id"), vec![ident(&names, "a")])),
        ];
        let decls = vec![
            Decl::Function(id),
            Decl::Function(main_returning_zero(&names, body)),
        ];
        lowering.lower_unit(decls, &mut NoModules).unwrap();

        let cached = lowering.registry().resolved_by_name("$G2id$_l$l");
        assert!(cached.is_some());
    }
    // One specialization definition serves both call sites.
    assert_eq!(emitter.definitions_of("$G2id$_l$l"), 1);
    assert_eq!(emitter.calls, 2);
}

// Scenario S4: a non-literal argument dominates a literal during
// deduction; the literal is coerced afterwards.
#[test]
fn deduction_prefers_expression_over_literal() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let pair = template_function(
            &names,
            "pair",
            &["T"],
            vec![("a", nominal(&names, "T")), ("b", nominal(&names, "T"))],
            nominal(&names, "T"),
            vec![return_stmt(Some(ident(&names, "a")))],
        );
        let body = vec![
            var_decl(&names, "x", Some(nominal(&names, "i32")), Some(integer(1))),
            expr_stmt(call(ident(&names, "pair"), vec![ident(&names, "x"), integer(3)])),
        ];
        let decls = vec![
            Decl::Function(pair),
            Decl::Function(main_returning_zero(&names, body)),
        ];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
        assert!(lowering.registry().resolved_by_name("$G4pair$_i_i$i").is_some());
    }
    assert_eq!(emitter.definitions_of("$G4pair$_i_i$i"), 1);
}

// Scenario S6: struct registration synthesizes a single initializer.
#[test]
fn struct_init_is_synthesized_once() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let point = struct_decl(
            &names,
            "P",
            vec![("x", nominal(&names, "i32")), ("y", nominal(&names, "i32"))],
        );
        let init_ref = |a: u64, b: u64| {
            Expr::new(
                ExprKind::Call(CallExpr {
                    target: Box::new(Expr::new(
                        ExprKind::StaticDeclRef {
                            type_name: names.intern("P"),
                            member: names.intern("init"),
                        },
                        Span::DUMMY,
                    )),
                    args: vec![integer(a), integer(b)],
                    template_args: Vec::new(),
                }),
                Span::DUMMY,
            )
        };
        let body = vec![
            expr_stmt(init_ref(1, 2)),
            expr_stmt(init_ref(3, 4)),
        ];
        let decls = vec![
            Decl::Struct(point),
            Decl::Function(main_returning_zero(&names, body)),
        ];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
        assert!(lowering
            .registry()
            .resolved_by_name("$S1P4init$_i_i$PN1P")
            .is_some());
    }
    assert_eq!(emitter.definitions_of("$S1P4init$_i_i$PN1P"), 1);
    // Both call sites call the same initializer.
    assert_eq!(emitter.calls, 2);
}

// Property 6: coercion rewrites the literal into a cast that carries
// the original value.
#[test]
fn coercion_preserves_literal_value() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut lowering = Lowering::new(&mut emitter, names.clone());

    let mut expr = integer(7);
    assert!(lowering.typecheck_and_coerce(&mut expr, TypeId::I32).unwrap());
    match &expr.kind {
        ExprKind::Cast { expr: inner, dest, .. } => {
            assert_eq!(dest.resolved_type(), Some(TypeId::I32));
            assert_eq!(
                inner.as_number_literal(),
                Some(&NumberLiteral {
                    value: 7,
                    kind: NumberKind::Integer
                })
            );
        }
        other => panic!("expected a cast wrapper, got {:?}", other),
    }

    // A literal that does not fit is not rewritten.
    let mut too_big = integer(300);
    assert!(!lowering.typecheck_and_coerce(&mut too_big, TypeId::I8).unwrap());
    assert!(too_big.as_number_literal().is_some());
}

// Operator expressions lower through the canonical operator callables.
#[test]
fn binop_normalizes_to_operator_intrinsics() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let body = vec![
            var_decl(&names, "a", Some(nominal(&names, "i64")), Some(integer(2))),
            var_decl(
                &names,
                "b",
                None,
                Some(Expr::new(
                    ExprKind::Binary {
                        op: yo_ir::BinaryOp::Add,
                        lhs: Box::new(ident(&names, "a")),
                        rhs: Box::new(integer(5)),
                    },
                    Span::DUMMY,
                )),
            ),
            var_decl(
                &names,
                "c",
                None,
                Some(Expr::new(
                    ExprKind::Binary {
                        op: yo_ir::BinaryOp::Lt,
                        lhs: Box::new(ident(&names, "a")),
                        rhs: Box::new(ident(&names, "b")),
                    },
                    Span::DUMMY,
                )),
            ),
        ];
        let decls = vec![Decl::Function(main_returning_zero(&names, body))];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    assert_eq!(emitter.arith_ops, vec![ArithOp::Add]);
    assert_eq!(emitter.int_cmps, vec![IntPredicate::Slt]);
    // Intrinsics are handled internally; only no calls were emitted for
    // the operators themselves.
    assert_eq!(emitter.calls, 0);
}

// Mixed-width comparisons promote to the wider of i32/i64 and compare
// signed if either side is signed.
#[test]
fn mixed_width_comparison_promotes() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let body = vec![
            var_decl(&names, "a", Some(nominal(&names, "u8")), Some(integer(2))),
            var_decl(&names, "b", Some(nominal(&names, "i16")), Some(integer(5))),
            var_decl(
                &names,
                "c",
                None,
                Some(Expr::new(
                    ExprKind::Binary {
                        op: yo_ir::BinaryOp::Gt,
                        lhs: Box::new(ident(&names, "a")),
                        rhs: Box::new(ident(&names, "b")),
                    },
                    Span::DUMMY,
                )),
            ),
        ];
        let decls = vec![Decl::Function(main_returning_zero(&names, body))];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    // Both sides are widened to i32, compared signed.
    assert!(emitter.casts.iter().any(|op| matches!(op, CastOp::ZExt)));
    assert!(emitter.casts.iter().any(|op| matches!(op, CastOp::SExt)));
    assert_eq!(emitter.int_cmps, vec![IntPredicate::Sgt]);
}

// Logical operators short-circuit through a phi.
#[test]
fn logical_and_short_circuits() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let boolean = |value: u64| {
            Expr::new(
                ExprKind::Number(NumberLiteral {
                    value,
                    kind: NumberKind::Boolean,
                }),
                Span::DUMMY,
            )
        };
        let body = vec![var_decl(
            &names,
            "a",
            None,
            Some(Expr::new(
                ExprKind::Binary {
                    op: yo_ir::BinaryOp::LAnd,
                    lhs: Box::new(boolean(1)),
                    rhs: Box::new(boolean(0)),
                },
                Span::DUMMY,
            )),
        )];
        let decls = vec![Decl::Function(main_returning_zero(&names, body))];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    assert_eq!(emitter.phis, 1);
}

// A match lowers to a compare chain with a phi; branch values coerce to
// the first branch's type.
#[test]
fn match_lowering_produces_phi() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let match_expr = Expr::new(
            ExprKind::Match(MatchExpr {
                target: Box::new(ident(&names, "x")),
                branches: vec![
                    MatchBranch {
                        patterns: vec![integer(0)],
                        value: integer(10),
                        span: Span::DUMMY,
                    },
                    MatchBranch {
                        patterns: vec![integer(1), integer(2)],
                        value: integer(20),
                        span: Span::DUMMY,
                    },
                    MatchBranch {
                        patterns: vec![ident(&names, "_")],
                        value: integer(30),
                        span: Span::DUMMY,
                    },
                ],
            }),
            Span::DUMMY,
        );
        let classify = function(
            &names,
            "classify",
            vec![("x", nominal(&names, "i64"))],
            nominal(&names, "i64"),
            vec![return_stmt(Some(match_expr))],
        );
        let decls = vec![Decl::Function(classify)];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    assert_eq!(emitter.phis, 1);
    // Three comparisons: one for branch one, two for branch two.
    assert_eq!(emitter.int_cmps.len(), 3);
}

// A match without a trailing wildcard is rejected.
#[test]
fn non_exhaustive_match_is_rejected() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut lowering = Lowering::new(&mut emitter, names.clone());
    let match_expr = Expr::new(
        ExprKind::Match(MatchExpr {
            target: Box::new(ident(&names, "x")),
            branches: vec![MatchBranch {
                patterns: vec![integer(0)],
                value: integer(10),
                span: Span::DUMMY,
            }],
        }),
        Span::DUMMY,
    );
    let classify = function(
        &names,
        "classify",
        vec![("x", nominal(&names, "i64"))],
        nominal(&names, "i64"),
        vec![return_stmt(Some(match_expr))],
    );
    let err = lowering
        .lower_unit(vec![Decl::Function(classify)], &mut NoModules)
        .unwrap_err();
    assert!(matches!(err, SemaError::InvalidMatchPattern { .. }));
}

// Extern variadic functions accept trailing arguments past the fixed
// parameters.
#[test]
fn extern_variadic_call() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let mut printf = function(
            &names,
            "printf",
            vec![(
                "fmt",
                TypeDesc::pointer(nominal(&names, "i8"), Span::DUMMY),
            )],
            nominal(&names, "i32"),
            vec![],
        );
        printf.attrs.extern_ = true;
        printf.sig.is_variadic = true;
        printf.body = None;

        let format = Expr::new(
            ExprKind::String {
                value: "%d\n".to_owned(),
                kind: yo_ir::StringKind::ByteString,
            },
            Span::DUMMY,
        );
        let body = vec![expr_stmt(call(
            ident(&names, "printf"),
            vec![format, integer(42)],
        ))];
        let decls = vec![
            Decl::Function(printf),
            Decl::Function(main_returning_zero(&names, body)),
        ];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    // Extern functions link under their plain name.
    assert!(emitter.declared.contains_key("printf"));
    assert_eq!(emitter.calls, 1);
}

// Startup and shutdown functions are collected into constructor arrays.
#[test]
fn startup_shutdown_arrays() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let mut setup = function(&names, "setup", vec![], nominal(&names, "void"), vec![]);
        setup.attrs.startup = true;
        let mut teardown = function(&names, "teardown", vec![], nominal(&names, "void"), vec![]);
        teardown.attrs.shutdown = true;
        let decls = vec![Decl::Function(setup), Decl::Function(teardown)];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    assert_eq!(
        emitter.ctor_arrays,
        vec![(CtorKind::Startup, 1), (CtorKind::Shutdown, 1)]
    );
}

// Type aliases register into the nominal-type table ahead of everything
// else.
#[test]
fn typealias_resolves_in_signatures() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut lowering = Lowering::new(&mut emitter, names.clone());
    let alias = yo_ir::TypealiasDecl {
        name: names.intern("Int"),
        ty: nominal(&names, "i32"),
        span: Span::DUMMY,
    };
    let f = function(
        &names,
        "f",
        vec![("x", nominal(&names, "Int"))],
        nominal(&names, "void"),
        vec![],
    );
    let decls = vec![Decl::Typealias(alias), Decl::Function(f)];
    lowering.lower_unit(decls, &mut NoModules).unwrap();
    assert!(lowering.registry().resolved_by_name("$G1f$_i$v").is_some());
}

// A variable declaration with neither annotation nor initializer is an
// error.
#[test]
fn var_decl_requires_type_or_value() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut lowering = Lowering::new(&mut emitter, names.clone());
    let body = vec![var_decl(&names, "x", None, None)];
    let decls = vec![Decl::Function(main_returning_zero(&names, body))];
    let err = lowering.lower_unit(decls, &mut NoModules).unwrap_err();
    assert!(matches!(err, SemaError::NoInitialValue { .. }));
}

// Unknown nominal types fail resolution.
#[test]
fn unknown_type_is_reported() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut lowering = Lowering::new(&mut emitter, names.clone());
    let f = function(
        &names,
        "f",
        vec![("x", nominal(&names, "Missing"))],
        nominal(&names, "void"),
        vec![],
    );
    let err = lowering
        .lower_unit(vec![Decl::Function(f)], &mut NoModules)
        .unwrap_err();
    assert!(matches!(err, SemaError::UnknownType { ref name, .. } if name == "Missing"));
}

// Use directives pull declarations from the module loader, once per
// module.
#[test]
fn use_directive_loads_module_once() {
    struct OneModule {
        names: SharedInterner,
        loads: usize,
    }
    impl yo_sema::ModuleLoader for OneModule {
        fn load(&mut self, module: &str) -> Result<Vec<Decl>, yo_sema::LoadError> {
            if module != "runtime" {
                return Err(yo_sema::LoadError::NotFound {
                    module: module.to_owned(),
                });
            }
            self.loads += 1;
            Ok(vec![Decl::Function(function(
                &self.names,
                "helper",
                vec![],
                nominal(&self.names, "void"),
                vec![],
            ))])
        }
    }

    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    let mut loader = OneModule {
        names: names.clone(),
        loads: 0,
    };
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let use_decl = |_: ()| {
            Decl::Use(yo_ir::UseDecl {
                module: names.intern("runtime"),
                span: Span::DUMMY,
            })
        };
        let body = vec![expr_stmt(call(ident(&names, "helper"), vec![]))];
        let decls = vec![
            use_decl(()),
            use_decl(()),
            Decl::Function(main_returning_zero(&names, body)),
        ];
        lowering.lower_unit(decls, &mut loader).unwrap();
    }
    assert_eq!(loader.loads, 1);
}

// Redeclaration rules: an equal-signature forward declaration is
// idempotent, an incompatible one is rejected.
#[test]
fn forward_declarations() {
    let names = SharedInterner::default();

    // Idempotent forward declaration.
    let mut emitter = RecordingEmitter::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let mut forward = function(&names, "f", vec![], nominal(&names, "void"), vec![]);
        forward.body = None;
        let definition = function(&names, "f", vec![], nominal(&names, "void"), vec![]);
        let decls = vec![Decl::Function(forward), Decl::Function(definition)];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    assert_eq!(emitter.definitions_of("$G1f$$v"), 1);

    // Incompatible redeclaration.
    let mut emitter = RecordingEmitter::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let mut forward = function(&names, "g", vec![], nominal(&names, "void"), vec![]);
        forward.body = None;
        forward.attrs.no_mangle = true;
        let mut other = function(&names, "g", vec![], nominal(&names, "i32"), vec![
            return_stmt(Some(integer(0))),
        ]);
        other.attrs.no_mangle = true;
        let decls = vec![Decl::Function(forward), Decl::Function(other)];
        let err = lowering.lower_unit(decls, &mut NoModules).unwrap_err();
        assert!(matches!(err, SemaError::IncompatibleRedeclaration { .. }));
    }
}

// sizeof and the type-level intrinsics resolve through explicit
// template arguments.
#[test]
fn type_level_intrinsics() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let sizeof_call = Expr::new(
            ExprKind::Call(CallExpr {
                target: Box::new(ident(&names, "sizeof")),
                args: vec![],
                template_args: vec![nominal(&names, "i64")],
            }),
            Span::DUMMY,
        );
        let body = vec![var_decl(&names, "n", None, Some(sizeof_call))];
        let decls = vec![Decl::Function(main_returning_zero(&names, body))];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    // No call instruction: the intrinsic folds to a constant.
    assert_eq!(emitter.calls, 0);
}

// Instance methods get the receiver as implicit first argument.
#[test]
fn instance_method_call() {
    let mut emitter = RecordingEmitter::default();
    let names = SharedInterner::default();
    {
        let mut lowering = Lowering::new(&mut emitter, names.clone());
        let point = struct_decl(&names, "Point", vec![("x", nominal(&names, "i64"))]);

        let getter = FunctionDecl {
            body: Some(vec![return_stmt(Some(Expr::new(
                ExprKind::Member {
                    target: Box::new(ident(&names, "self")),
                    member: names.intern("x"),
                },
                Span::DUMMY,
            )))]),
            ..function(
                &names,
                "get_x",
                vec![(
                    "self",
                    TypeDesc::pointer(nominal(&names, "Point"), Span::DUMMY),
                )],
                nominal(&names, "i64"),
                vec![],
            )
        };
        let block = yo_ir::ImplBlock {
            type_name: names.intern("Point"),
            methods: vec![getter],
            span: Span::DUMMY,
        };

        let make_point = Expr::new(
            ExprKind::Call(CallExpr {
                target: Box::new(Expr::new(
                    ExprKind::StaticDeclRef {
                        type_name: names.intern("Point"),
                        member: names.intern("init"),
                    },
                    Span::DUMMY,
                )),
                args: vec![integer(5)],
                template_args: Vec::new(),
            }),
            Span::DUMMY,
        );
        let method_call = Expr::new(
            ExprKind::Call(CallExpr {
                target: Box::new(Expr::new(
                    ExprKind::Member {
                        target: Box::new(ident(&names, "p")),
                        member: names.intern("get_x"),
                    },
                    Span::DUMMY,
                )),
                args: vec![],
                template_args: Vec::new(),
            }),
            Span::DUMMY,
        );
        let body = vec![
            var_decl(&names, "p", None, Some(make_point)),
            var_decl(&names, "v", None, Some(method_call)),
        ];
        let decls = vec![
            Decl::Struct(point),
            Decl::Impl(block),
            Decl::Function(main_returning_zero(&names, body)),
        ];
        lowering.lower_unit(decls, &mut NoModules).unwrap();
    }
    // The instance method mangles with the receiver pointer parameter.
    assert!(emitter.declared.contains_key("$I5Point5get_x$_PN5Point$l"));
    // init + method call.
    assert_eq!(emitter.calls, 2);
}
