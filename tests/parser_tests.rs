// tests/parser_tests.rs

use rql_fixtures::ast::{BinOp, Expr, UnaryOp};
use rql_fixtures::language::Language;
use rql_fixtures::parser::{ParseError, parse_expression};

fn parse(source: &str, language: Language) -> Expr {
    parse_expression(source, language)
        .unwrap_or_else(|e| panic!("failed to parse {:?} as {}: {}", source, language, e))
}

fn parse_err(source: &str, language: Language) -> ParseError {
    match parse_expression(source, language) {
        Ok(expr) => panic!("expected {:?} to fail as {}, got {:?}", source, language, expr),
        Err(e) => e,
    }
}

fn name(s: &str) -> Box<Expr> {
    Box::new(Expr::Name(s.to_string()))
}

fn int(n: i64) -> Box<Expr> {
    Box::new(Expr::Integer(n))
}

// ============================================================================
// Shared Syntax
// ============================================================================

#[test]
fn test_literals_in_every_dialect() {
    for lang in Language::ALL {
        assert_eq!(parse("42", lang), Expr::Integer(42));
        assert_eq!(parse("-3", lang), Expr::Integer(-3));
        assert_eq!(parse("2.5", lang), Expr::Float(2.5));
        assert_eq!(parse("'a'", lang), Expr::String("a".to_string()));
        assert_eq!(
            parse("[1, 'b', null]", lang),
            Expr::Array(vec![
                Expr::Integer(1),
                Expr::String("b".to_string()),
                Expr::Null
            ])
        );
    }
}

#[test]
fn test_object_literal_keeps_order() {
    assert_eq!(
        parse("{'b': 1, 'a': [2]}", Language::Python),
        Expr::Object(vec![
            ("b".to_string(), Expr::Integer(1)),
            ("a".to_string(), Expr::Array(vec![Expr::Integer(2)])),
        ])
    );
}

#[test]
fn test_method_chain() {
    assert_eq!(
        parse("arr.append(4).count()", Language::JavaScript),
        Expr::MethodCall {
            object: Box::new(Expr::MethodCall {
                object: name("arr"),
                method: "append".to_string(),
                args: vec![Expr::Integer(4)],
            }),
            method: "count".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn test_r_expr() {
    assert_eq!(
        parse("r.expr([1])", Language::Python),
        Expr::MethodCall {
            object: Box::new(Expr::Driver),
            method: "expr".to_string(),
            args: vec![Expr::Array(vec![Expr::Integer(1)])],
        }
    );
}

#[test]
fn test_r_row_in_argument() {
    let expr = parse("arr.filter(r.row.gt(1))", Language::Python);
    match expr {
        Expr::MethodCall { args, .. } => {
            assert_eq!(
                args[0],
                Expr::MethodCall {
                    object: Box::new(Expr::ImplicitVar),
                    method: "gt".to_string(),
                    args: vec![Expr::Integer(1)],
                }
            );
        }
        other => panic!("expected method call, got {:?}", other),
    }
}

#[test]
fn test_trailing_comma() {
    assert_eq!(
        parse("[1, 2,]", Language::Ruby),
        Expr::Array(vec![Expr::Integer(1), Expr::Integer(2)])
    );
}

#[test]
fn test_trailing_input_rejected() {
    let err = parse_err("1 2", Language::Python);
    assert!(
        matches!(err, ParseError::Unexpected { ref expected, .. } if expected == "end of input"),
        "got {:?}",
        err
    );
}

#[test]
fn test_unclosed_call_reports_end_of_input() {
    let err = parse_err("arr.append(", Language::Python);
    assert!(err.to_string().contains("found end of input"), "got {}", err);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_precedence() {
    assert_eq!(
        parse("1 + 2 * 3", Language::Python),
        Expr::BinaryOp {
            op: BinOp::Add,
            left: int(1),
            right: Box::new(Expr::BinaryOp {
                op: BinOp::Mul,
                left: int(2),
                right: int(3),
            }),
        }
    );
}

#[test]
fn test_comparison_binds_tighter_than_and() {
    assert_eq!(
        parse("(x > 1) & (x < 3)", Language::Ruby),
        Expr::BinaryOp {
            op: BinOp::And,
            left: Box::new(Expr::BinaryOp {
                op: BinOp::Gt,
                left: name("x"),
                right: int(1),
            }),
            right: Box::new(Expr::BinaryOp {
                op: BinOp::Lt,
                left: name("x"),
                right: int(3),
            }),
        }
    );
}

#[test]
fn test_prefix_operators() {
    assert_eq!(
        parse("~x", Language::Python),
        Expr::UnaryOp {
            op: UnaryOp::Not,
            operand: name("x"),
        }
    );
    assert_eq!(
        parse("-x", Language::Ruby),
        Expr::UnaryOp {
            op: UnaryOp::Neg,
            operand: name("x"),
        }
    );
}

#[test]
fn test_javascript_rejects_operators() {
    for source in ["arr + 1", "x == 1", "x & y", "~x", "-x", "x * 2"] {
        let err = parse_err(source, Language::JavaScript);
        assert!(
            matches!(err, ParseError::Unsupported { ref message, .. } if message.contains("not available in javascript")),
            "Failed for input: {} ({:?})",
            source,
            err
        );
    }
}

// ============================================================================
// Python
// ============================================================================

#[test]
fn test_python_slices() {
    let test_cases = vec![
        ("arr[1:2]", Some(1), Some(2)),
        ("arr[:2]", None, Some(2)),
        ("arr[1:]", Some(1), None),
        ("arr[-2:-1]", Some(-2), Some(-1)),
    ];

    for (source, start, end) in test_cases {
        assert_eq!(
            parse(source, Language::Python),
            Expr::Slice {
                object: name("arr"),
                start: start.map(int),
                end: end.map(int),
                closed: false,
            },
            "Failed for input: {}",
            source
        );
    }
}

#[test]
fn test_python_index_and_field() {
    assert_eq!(
        parse("arr[0]", Language::Python),
        Expr::Index {
            object: name("arr"),
            index: int(0),
        }
    );
    assert_eq!(
        parse("x['a']", Language::Python),
        Expr::Index {
            object: name("x"),
            index: Box::new(Expr::String("a".to_string())),
        }
    );
}

#[test]
fn test_python_lambda() {
    assert_eq!(
        parse("lambda acc, x: acc + x", Language::Python),
        Expr::Lambda {
            params: vec!["acc".to_string(), "x".to_string()],
            body: Box::new(Expr::BinaryOp {
                op: BinOp::Add,
                left: name("acc"),
                right: name("x"),
            }),
        }
    );
}

#[test]
fn test_python_requires_parentheses() {
    let err = parse_err("arr.count", Language::Python);
    assert!(err.to_string().contains("'(' after method name 'count'"), "got {}", err);
}

#[test]
fn test_python_rejects_dialect_syntax() {
    assert!(parse_expression("function(x) { return x; }", Language::Python).is_err());
    assert!(parse_expression("{'a' => 1}", Language::Python).is_err());
    assert!(parse_expression("r.expr([1])(0)", Language::Python).is_err());
}

// ============================================================================
// JavaScript
// ============================================================================

#[test]
fn test_js_function() {
    let expected = Expr::Lambda {
        params: vec!["x".to_string()],
        body: Box::new(Expr::MethodCall {
            object: name("x"),
            method: "mul".to_string(),
            args: vec![Expr::Integer(2)],
        }),
    };
    assert_eq!(parse("function(x) { return x.mul(2); }", Language::JavaScript), expected);
    assert_eq!(parse("function(x) { return x.mul(2) }", Language::JavaScript), expected);
}

#[test]
fn test_js_call_access() {
    assert_eq!(
        parse("nested(0)(1)", Language::JavaScript),
        Expr::Call {
            callee: Box::new(Expr::Call {
                callee: name("nested"),
                args: vec![Expr::Integer(0)],
            }),
            args: vec![Expr::Integer(1)],
        }
    );
    assert_eq!(
        parse("r.row('c')", Language::JavaScript),
        Expr::Call {
            callee: Box::new(Expr::ImplicitVar),
            args: vec![Expr::String("c".to_string())],
        }
    );
    assert!(parse_expression("r.row('c')", Language::Python).is_err());
}

#[test]
fn test_js_r_call_is_expr() {
    assert_eq!(
        parse("r(1)", Language::JavaScript),
        Expr::MethodCall {
            object: Box::new(Expr::Driver),
            method: "expr".to_string(),
            args: vec![Expr::Integer(1)],
        }
    );
}

#[test]
fn test_js_rejects_brackets_and_lambda() {
    let err = parse_err("arr[0]", Language::JavaScript);
    assert!(err.to_string().contains("use x(...)"), "got {}", err);
    assert!(parse_expression("lambda x: x", Language::JavaScript).is_err());
}

// ============================================================================
// Ruby
// ============================================================================

#[test]
fn test_ruby_ranges() {
    assert_eq!(
        parse("arr[1..2]", Language::Ruby),
        Expr::Slice {
            object: name("arr"),
            start: Some(int(1)),
            end: Some(int(2)),
            closed: true,
        }
    );
    assert_eq!(
        parse("arr[1...2]", Language::Ruby),
        Expr::Slice {
            object: name("arr"),
            start: Some(int(1)),
            end: Some(int(2)),
            closed: false,
        }
    );
    assert_eq!(
        parse("arr[1..]", Language::Ruby),
        Expr::Slice {
            object: name("arr"),
            start: Some(int(1)),
            end: None,
            closed: true,
        }
    );
}

#[test]
fn test_ruby_block_becomes_last_argument() {
    assert_eq!(
        parse("arr.map{|x| x * 2}", Language::Ruby),
        Expr::MethodCall {
            object: name("arr"),
            method: "map".to_string(),
            args: vec![Expr::Lambda {
                params: vec!["x".to_string()],
                body: Box::new(Expr::BinaryOp {
                    op: BinOp::Mul,
                    left: name("x"),
                    right: int(2),
                }),
            }],
        }
    );

    match parse("arr.reduce(0){|a, b| a + b}", Language::Ruby) {
        Expr::MethodCall { args, .. } => {
            assert_eq!(args.len(), 2);
            assert_eq!(args[0], Expr::Integer(0));
            assert!(matches!(args[1], Expr::Lambda { ref params, .. } if params.len() == 2));
        }
        other => panic!("expected method call, got {:?}", other),
    }
}

#[test]
fn test_ruby_method_without_parentheses() {
    assert_eq!(
        parse("arr.distinct", Language::Ruby),
        Expr::MethodCall {
            object: name("arr"),
            method: "distinct".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn test_ruby_hash_rocket() {
    assert_eq!(
        parse("{'a' => 1, 'b' => 2}", Language::Ruby),
        Expr::Object(vec![
            ("a".to_string(), Expr::Integer(1)),
            ("b".to_string(), Expr::Integer(2)),
        ])
    );
    assert_eq!(parse("{}", Language::Ruby), Expr::Object(vec![]));
}
