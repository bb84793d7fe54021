//! Parser tests.

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::error::ParserError;
    use crate::parser::Parser;

    fn parse_program(source: &str) -> Program {
        Parser::new(source).parse().expect("parse error")
    }

    fn parse_errors(source: &str) -> Vec<ParserError> {
        Parser::new(source)
            .parse()
            .expect_err("expected parse errors")
    }

    /// Parse `source` as the single statement of a main body and return
    /// the expression inside it.
    fn parse_expr(source: &str) -> Expr {
        let program = parse_program(&format!("fn main() {{ {} ; }}", source));
        match program.functions[0].body[0].kind.clone() {
            StmtKind::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_basic_function() {
        let program = parse_program(
            r#"
            fn main() {
                let x: i32 = 42;
                let y: bool = true;
                let z: str = "hello";
            }
            "#,
        );
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].name, "main");
        assert_eq!(program.functions[0].body.len(), 3);
        assert!(program.functions[0].return_type.is_none());
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse_expr("1 + 2 * 3");
        match expr.kind {
            ExprKind::Binary {
                operator: BinaryOp::Add,
                right,
                ..
            } => match right.kind {
                ExprKind::Binary {
                    operator: BinaryOp::Multiply,
                    ..
                } => {}
                other => panic!("expected multiply on right, got {:?}", other),
            },
            other => panic!("expected add at top, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        // (1 + 2) * 3 parses with multiply at the top
        let expr = parse_expr("(1 + 2) * 3");
        match expr.kind {
            ExprKind::Binary {
                operator: BinaryOp::Multiply,
                left,
                ..
            } => assert!(matches!(left.kind, ExprKind::Grouping(_))),
            other => panic!("expected multiply at top, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_precedence() {
        // !true && false || true parses as ((!true && false) || true)
        let expr = parse_expr("!true && false || true");
        match expr.kind {
            ExprKind::LogicalOr { left, right } => {
                assert!(matches!(left.kind, ExprKind::LogicalAnd { .. }));
                assert!(matches!(right.kind, ExprKind::BoolLiteral(true)));
            }
            other => panic!("expected logical or at top, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_operators() {
        for (source, op) in [
            ("1 < 2", BinaryOp::Less),
            ("1 <= 2", BinaryOp::LessEqual),
            ("1 > 2", BinaryOp::Greater),
            ("1 >= 2", BinaryOp::GreaterEqual),
            ("1 == 2", BinaryOp::Equal),
            ("1 != 2", BinaryOp::NotEqual),
        ] {
            let expr = parse_expr(source);
            match expr.kind {
                ExprKind::Binary { operator, .. } => assert_eq!(operator, op),
                other => panic!("expected binary for {:?}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_unary_chain() {
        let expr = parse_expr("-(-1)");
        match expr.kind {
            ExprKind::Unary {
                operator: UnaryOp::Negate,
                operand,
            } => assert!(matches!(operand.kind, ExprKind::Grouping(_))),
            other => panic!("expected negate, got {:?}", other),
        }
    }

    #[test]
    fn test_borrow_expressions() {
        let expr = parse_expr("&x");
        assert!(matches!(expr.kind, ExprKind::Borrow { is_mut: false, .. }));

        let expr = parse_expr("&mut x");
        assert!(matches!(expr.kind, ExprKind::Borrow { is_mut: true, .. }));

        // && in operand position is a borrow of a borrow
        let expr = parse_expr("&&x");
        match expr.kind {
            ExprKind::Borrow { is_mut: false, expr } => {
                assert!(matches!(expr.kind, ExprKind::Borrow { .. }))
            }
            other => panic!("expected nested borrow, got {:?}", other),
        }
    }

    #[test]
    fn test_deref_and_deref_assignment() {
        let expr = parse_expr("*p");
        assert!(matches!(expr.kind, ExprKind::Deref(_)));

        let expr = parse_expr("*p = x + 10");
        match expr.kind {
            ExprKind::Assign { target, .. } => assert!(matches!(target.kind, ExprKind::Deref(_))),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_call_arguments() {
        let expr = parse_expr("add(40, 2)");
        match expr.kind {
            ExprKind::Call { callee, arguments } => {
                assert!(matches!(callee.kind, ExprKind::Variable(ref n) if n == "add"));
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errors = parse_errors("fn main() { 1 + 2 = 3; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParserError::InvalidAssignmentTarget(_))));
    }

    #[test]
    fn test_reference_types() {
        let program = parse_program(
            r#"
            fn main() {
                let mut x: i32 = 42;
                let y: &i32 = &x;
                let z: &mut i32 = &mut x;
                let n: &&i32 = &&x;
            }
            "#,
        );
        let body = &program.functions[0].body;
        match &body[2].kind {
            StmtKind::Let { ty, .. } => {
                assert!(matches!(&ty.kind, TypeKind::MutRef(inner) if inner.kind == TypeKind::I32))
            }
            other => panic!("expected let, got {:?}", other),
        }
        match &body[3].kind {
            StmtKind::Let { ty, .. } => {
                assert!(matches!(&ty.kind, TypeKind::Ref(inner)
                    if matches!(&inner.kind, TypeKind::Ref(innermost) if innermost.kind == TypeKind::I32)))
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_function_signature() {
        let program = parse_program("fn add(x: i32, y: i32) -> i32 { return x + y; }");
        let func = &program.functions[0];
        assert_eq!(func.name, "add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].name, "x");
        assert!(!func.params[0].is_mut);
        assert_eq!(
            func.return_type.as_ref().map(|t| t.kind.clone()),
            Some(TypeKind::I32)
        );
    }

    #[test]
    fn test_mut_parameter() {
        let program = parse_program("fn bump(mut x: i32) { x = x + 1; }");
        assert!(program.functions[0].params[0].is_mut);
    }

    #[test]
    fn test_else_if_chain() {
        let program = parse_program(
            r#"
            fn main() {
                if a { b; } else if c { d; } else { e; }
            }
            "#,
        );
        match &program.functions[0].body[0].kind {
            StmtKind::If { else_branch, .. } => {
                let else_branch = else_branch.as_ref().expect("else branch");
                assert!(matches!(else_branch.kind, StmtKind::If { .. }));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_condition_parens() {
        let with = parse_program("fn main() { if (x > 0) { y; } }");
        let without = parse_program("fn main() { if x > 0 { y; } }");
        // Same shape apart from the grouping node around the condition.
        assert!(matches!(with.functions[0].body[0].kind, StmtKind::If { .. }));
        assert!(matches!(
            without.functions[0].body[0].kind,
            StmtKind::If { .. }
        ));
    }

    #[test]
    fn test_while_loop() {
        let program = parse_program("fn main() { while x < 10 { x = x + 1; } }");
        assert!(matches!(
            program.functions[0].body[0].kind,
            StmtKind::While { .. }
        ));
    }

    #[test]
    fn test_return_forms() {
        let program = parse_program("fn f() { return; }");
        assert!(matches!(
            program.functions[0].body[0].kind,
            StmtKind::Return(None)
        ));

        let program = parse_program("fn f() -> i32 { return 42; }");
        assert!(matches!(
            program.functions[0].body[0].kind,
            StmtKind::Return(Some(_))
        ));
    }

    #[test]
    fn test_tail_expression_desugars_to_return() {
        let program = parse_program("fn add(x: i32, y: i32) -> i32 { x + y }");
        match &program.functions[0].body[0].kind {
            StmtKind::Return(Some(expr)) => {
                assert!(matches!(expr.kind, ExprKind::Binary { .. }))
            }
            other => panic!("expected implicit return, got {:?}", other),
        }
    }

    #[test]
    fn test_string_escapes() {
        let expr = parse_expr(r#""a\"b\\c""#);
        match expr.kind {
            ExprKind::StringLiteral(s) => assert_eq!(s, "a\"b\\c"),
            other => panic!("expected string literal, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_string() {
        let errors = parse_errors("fn main() { let s: str = \"oops; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParserError::UnterminatedString(_))));
    }

    #[test]
    fn test_integer_out_of_range() {
        let errors = parse_errors("fn main() { let x: i32 = 99999999999; }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParserError::InvalidNumber(_, _))));
    }

    #[test]
    fn test_line_comments() {
        let program = parse_program(
            "fn main() { // set up\n let x: i32 = 1; // trailing\n // done\n }",
        );
        assert_eq!(program.functions[0].body.len(), 1);
    }

    #[test]
    fn test_keyword_boundary() {
        // `letx` is an identifier, not `let` + `x`
        let program = parse_program("fn main() { letx; }");
        match &program.functions[0].body[0].kind {
            StmtKind::Expression(expr) => {
                assert!(matches!(expr.kind, ExprKind::Variable(ref n) if n == "letx"))
            }
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_error_recovery_reports_multiple() {
        let errors = parse_errors(
            r#"
            fn main() {
                let x: i32 = ;
                let y: i32 = 10;
                let z: = 3;
            }
            "#,
        );
        assert!(errors.len() >= 2);
    }

    #[test]
    fn test_recovery_keeps_later_functions() {
        // The second function still parses even though the first is broken.
        let mut parser = Parser::new("fn broken( { } fn ok() { return; }");
        let errors = parser.parse().expect_err("expected errors");
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_totality_on_pathological_inputs() {
        // Termination is the property; any error list is acceptable.
        for source in [
            "",
            "fn",
            "fn fn fn",
            "@#$%^",
            "fn main() {",
            "fn main() { let",
            "let x = 1;",
            "}}}}",
            "fn main() { \"",
        ] {
            let _ = Parser::new(source).parse();
        }
    }
}
