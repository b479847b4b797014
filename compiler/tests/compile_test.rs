use compiler::{compile, CompileErrorKind, GrammarPolicy};
use proptest::prelude::*;
use vm::disasm::disassemble;
use vm::opcode::instruction::decode_opcode;
use vm::{OpCode, UpvalueSource};

fn policy() -> GrammarPolicy {
    GrammarPolicy::default().with_reserved(["len", "print", "quit"])
}

fn ops(chunk: &[u32]) -> Vec<OpCode> {
    chunk
        .iter()
        .filter_map(|i| OpCode::from_u8(decode_opcode(*i)))
        .collect()
}

#[test]
fn main_function_ends_with_return() {
    let unit = compile("let x = 1 + 2", &policy()).unwrap();
    assert_eq!(unit.main.name, "main");
    assert_eq!(unit.main.arity, 0);
    assert_eq!(ops(&unit.main.chunk).last(), Some(&OpCode::Return));
    assert_eq!(unit.main.chunk.len(), unit.main.line_info.len());
}

#[test]
fn top_level_bindings_become_globals() {
    let unit = compile("let a = 1\nmut b = 2\nfn f() { a }", &policy()).unwrap();
    let listing = disassemble(&unit.main);
    assert!(listing.contains("DEF_GLOBAL_LET"), "{listing}");
    assert!(listing.contains("DEF_GLOBAL_VAR"), "{listing}");
    assert!(listing.contains(r#"("a")"#), "{listing}");
    assert_eq!(unit.main.functions.len(), 1);
    assert_eq!(unit.main.functions[0].name, "f");
}

#[test]
fn block_locals_stay_in_registers() {
    let unit = compile("if true { let a = 1\n a + 1 }", &policy()).unwrap();
    let main_ops = ops(&unit.main.chunk);
    assert!(!main_ops.contains(&OpCode::DefGlobalLet));
    assert!(main_ops.contains(&OpCode::Move));
}

#[test]
fn closures_record_capture_sources() {
    let src = "fn outer() {\n let a = 1\n let b = 2\n fn () { a + b }\n}";
    let unit = compile(src, &policy()).unwrap();
    let outer = &unit.main.functions[0];
    assert_eq!(outer.name, "outer");
    let lambda = &outer.functions[0];
    assert_eq!(lambda.name, "lambda");
    assert_eq!(lambda.upvalues.len(), 2);
    assert!(matches!(lambda.upvalues[0], UpvalueSource::Local(_)));
}

#[test]
fn captures_thread_through_intermediate_functions() {
    let src = "fn a() {\n let x = 1\n fn () { fn () { x } }\n}";
    let unit = compile(src, &policy()).unwrap();
    let middle = &unit.main.functions[0].functions[0];
    let inner = &middle.functions[0];
    assert!(matches!(middle.upvalues[0], UpvalueSource::Local(_)));
    assert_eq!(inner.upvalues, vec![UpvalueSource::Upvalue(0)]);
}

#[test]
fn named_functions_refer_to_themselves() {
    let src = "fn outer() {\n fn fact(n) { if n <= 1 { 1 } else { n * fact(n - 1) } }\n fact(5)\n}";
    let unit = compile(src, &policy()).unwrap();
    let fact = &unit.main.functions[0].functions[0];
    assert!(ops(&fact.chunk).contains(&OpCode::LoadSelf));
    assert!(fact.upvalues.is_empty());
}

#[test]
fn line_info_follows_source_lines() {
    let unit = compile("let a = 1\n\nlet b = a + 2", &policy()).unwrap();
    assert_eq!(unit.main.line_info.first(), Some(&1));
    assert!(unit.main.line_info.contains(&3));
}

#[test]
fn syntax_errors_carry_position() {
    let err = compile("let x = \nlet", &policy()).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert!(err.line >= 1);
    assert!(err.to_string().starts_with("syntax error at line"));
}

#[test]
fn loop_control_outside_loops_is_rejected() {
    assert_eq!(
        compile("break", &policy()).unwrap_err().kind,
        CompileErrorKind::Syntax
    );
    let err = compile("while true { fn () { continue } }", &policy()).unwrap_err();
    assert!(err.message.contains("continue"));
}

#[test]
fn immutable_and_captured_assignments_are_rejected() {
    let err = compile("let a = 1\na = 2", &policy()).unwrap_err();
    assert!(err.message.contains("immutable"), "{err}");
    assert_eq!(err.line, 2);

    let err = compile("fn f() { let a = 1\n a = 2 }", &policy()).unwrap_err();
    assert!(err.message.contains("immutable"), "{err}");

    let err = compile("fn f() { mut a = 1\n fn () { a = 2 } }", &policy()).unwrap_err();
    assert!(err.message.contains("captured"), "{err}");

    compile("mut a = 1\na = 2", &policy()).unwrap();
    compile("fn f() { mut a = 1\n a = a + 1\n a }", &policy()).unwrap();
}

#[test]
fn restricted_constructs_never_reach_codegen() {
    for src in [
        "import os",
        "math.pi = 1",
        "let _hidden = 1",
        "let print = 1",
        "\"s\".upper",
    ] {
        let err = compile(src, &policy()).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Restricted, "{src}");
    }
    compile("import math\nmath.sqrt(4)", &policy()).unwrap();
}

#[test]
fn duplicate_parameters_are_rejected() {
    let err = compile("fn f(a, a) { a }", &policy()).unwrap_err();
    assert!(err.message.contains("duplicate parameter"));
}

#[test]
fn huge_integer_literal_is_a_limit_error() {
    let err = compile("99999999999999999999999", &policy()).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Limit);
}

#[test]
fn for_loops_lower_to_guarded_iteration() {
    let unit = compile("for x in [1, 2] { x }\nfor i in 0..3 { i }", &policy()).unwrap();
    let main_ops = ops(&unit.main.chunk);
    assert!(main_ops.contains(&OpCode::GetIter));
    assert!(main_ops.contains(&OpCode::ForIter));
    assert!(main_ops.contains(&OpCode::ForRange));
}

fn arb_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0i64..1000).prop_map(|n| n.to_string()),
        Just("x".to_string()),
        Just("nil".to_string()),
        Just("\"s\"".to_string()),
    ];
    leaf.prop_recursive(5, 48, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} + {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} * {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} && {b})")),
            prop::collection::vec(inner.clone(), 0..4).prop_map(|v| format!("[{}]", v.join(", "))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("if {a} {{ {b} }} else {{ nil }}")),
            inner.clone().prop_map(|a| format!("len([{a}])")),
        ]
    })
}

proptest! {
    #[test]
    fn generated_expressions_compile(expr in arb_expr()) {
        let src = format!("fn f(x) {{ {expr} }}\nlet r = {expr}");
        let unit = compile(&src, &policy()).unwrap();
        let f = &unit.main.functions[0];
        prop_assert_eq!(f.chunk.len(), f.line_info.len());
        prop_assert!(f.max_slots as usize <= 250);
        let f_ops = ops(&f.chunk);
        prop_assert_eq!(f_ops.last(), Some(&OpCode::Return));
    }
}
