use cart_parser::ast::{BinOp, Expr, ForIterable, Stmt, UnaryOp};
use cart_parser::{parse_block, parse_program};

#[test]
fn parses_minimal_cartridge() {
    let src = r#"
        mut x = 0

        fn setup() {
            print("ready")
        }

        fn update() {
            x = x + 1
            draw_sprite(x % 120, 60)
            if get_input().a { quit() }
        }
    "#;
    let prog = parse_program(src).expect("cartridge should parse");
    assert_eq!(prog.stmts.len(), 3);
    assert!(matches!(&prog.stmts[0], Stmt::MutDecl { name, .. } if name == "x"));
    assert!(matches!(&prog.stmts[1], Stmt::FnDecl { name, .. } if name == "setup"));
    assert!(matches!(&prog.stmts[2], Stmt::FnDecl { name, .. } if name == "update"));
}

#[test]
fn nested_sprite_grid_literal() {
    let prog = parse_program("let grid = [[1, 2], [3, 4],]").unwrap();
    match &prog.stmts[0] {
        Stmt::LetDecl { value: Expr::Array { elements, .. }, .. } => {
            assert_eq!(elements.len(), 2);
            assert!(elements.iter().all(|e| matches!(e, Expr::Array { .. })));
        }
        other => panic!("expected list literal, got {other:?}"),
    }
}

#[test]
fn unary_binds_tighter_than_multiplication() {
    let prog = parse_program("-a * b").unwrap();
    match &prog.stmts[0] {
        Stmt::Expr(Expr::BinOp { op: BinOp::Mul, lhs, .. }) => {
            assert!(matches!(lhs.as_ref(), Expr::UnaryOp { op: UnaryOp::Neg, .. }));
        }
        other => panic!("expected Mul at root, got {other:?}"),
    }
}

#[test]
fn pow_binds_tighter_than_unary() {
    // -2^2 is -(2^2)
    let prog = parse_program("-2^2").unwrap();
    match &prog.stmts[0] {
        Stmt::Expr(Expr::UnaryOp { op: UnaryOp::Neg, operand, .. }) => {
            assert!(matches!(operand.as_ref(), Expr::BinOp { op: BinOp::Pow, .. }));
        }
        other => panic!("expected Neg at root, got {other:?}"),
    }
}

#[test]
fn logical_precedence() {
    let prog = parse_program("a || b && c").unwrap();
    match &prog.stmts[0] {
        Stmt::Expr(Expr::BinOp { op: BinOp::Or, rhs, .. }) => {
            assert!(matches!(rhs.as_ref(), Expr::BinOp { op: BinOp::And, .. }));
        }
        other => panic!("expected Or at root, got {other:?}"),
    }
}

#[test]
fn range_end_can_be_a_call() {
    let prog = parse_program("for i in 0..len(xs) { print(i) }").unwrap();
    match &prog.stmts[0] {
        Stmt::Expr(Expr::For {
            iterable: ForIterable::Range { end, .. },
            ..
        }) => assert!(matches!(end.as_ref(), Expr::Call { .. })),
        other => panic!("expected range loop, got {other:?}"),
    }
}

#[test]
fn block_expression_value() {
    let block = parse_block("{ let a = 1; let b = 2; a + b }").unwrap();
    assert_eq!(block.stmts.len(), 3);
    assert!(matches!(block.stmts[2], Stmt::Expr(Expr::BinOp { .. })));
}

#[test]
fn forever_with_break() {
    let prog = parse_program("forever { break }").unwrap();
    match &prog.stmts[0] {
        Stmt::Expr(Expr::Forever { body, .. }) => {
            assert!(matches!(body.stmts[0], Stmt::Break { .. }));
        }
        other => panic!("expected forever, got {other:?}"),
    }
}

#[test]
fn member_assignment_parses_but_is_left_for_validation() {
    // The parser accepts any assignable-looking expression; the compiler
    // decides which targets are legal.
    let prog = parse_program("math.pi = 3").unwrap();
    assert!(matches!(
        &prog.stmts[0],
        Stmt::Assignment { target: Expr::DotAccess { .. }, .. }
    ));
}

#[test]
fn syntax_errors() {
    for src in [
        "let = 5",
        "fn (",
        "[1, 2",
        "{ a: }",
        "let x = 1 +",
        "if x { 1 } else",
        "x & y",
        "\"unterminated",
        "/* never closed",
        "a < b > c",
    ] {
        assert!(parse_program(src).is_err(), "expected error for {src:?}");
    }
}

#[test]
fn error_position_is_one_based() {
    let err = parse_program("let x = [1, 2\nlet y = 3").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.col, 1);
    let shown = err.to_string();
    assert!(shown.starts_with("parse error at line 2, col 1"), "{shown}");
}

#[test]
fn empty_source_is_empty_program() {
    let prog = parse_program("  // nothing here\n").unwrap();
    assert!(prog.stmts.is_empty());
}
