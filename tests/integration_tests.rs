// tests/integration_tests.rs

use rql_fixtures::{ErrorKind, Evaluator, Language, ReqlError, Value, parse_expression};

/// Evaluator with the bindings most cases below lean on.
fn evaluator(language: Language) -> Evaluator {
    let mut evaluator = Evaluator::new(language);
    let defs = [
        ("arr", "r.expr([1, 2, 3])"),
        ("dupe_arr", "r.expr([1, 1, 2, 3, 3])"),
        ("nested", "r.expr([[1, 2], [3, 4]])"),
    ];
    for (name, source) in defs {
        let expr = parse_expression(source, language).unwrap();
        evaluator.define(name, &expr).unwrap();
    }
    let obj_arr = match language {
        Language::Ruby => "r.expr([{'a' => 1, 'b' => 'x'}, {'a' => 2}, {'c' => 3}])",
        _ => "r.expr([{'a': 1, 'b': 'x'}, {'a': 2}, {'c': 3}])",
    };
    let expr = parse_expression(obj_arr, language).unwrap();
    evaluator.define("objArr", &expr).unwrap();
    evaluator
}

fn eval_in(source: &str, language: Language) -> Result<Value, ReqlError> {
    let expr = parse_expression(source, language)
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", source, e));
    evaluator(language).eval(&expr)
}

/// Evaluates in Python and renders the result as JSON.
fn eval_expr(source: &str) -> String {
    match eval_in(source, Language::Python) {
        Ok(value) => value.to_string(),
        Err(e) => panic!("{:?} failed: {}", source, e),
    }
}

fn eval_err(source: &str, language: Language) -> ReqlError {
    match eval_in(source, language) {
        Ok(value) => panic!("expected {:?} to fail, got {}", source, value),
        Err(e) => e,
    }
}

fn check_all(cases: &[(&str, &str)]) {
    for (source, expected) in cases {
        assert_eq!(eval_expr(source), *expected, "Failed for input: {}", source);
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_append_prepend_union() {
    check_all(&[
        ("arr.append(4)", "[1,2,3,4]"),
        ("arr.prepend(0)", "[0,1,2,3]"),
        ("arr.append([4])", "[1,2,3,[4]]"),
        ("arr.union([4, 5])", "[1,2,3,4,5]"),
        ("arr.union([4], [5])", "[1,2,3,4,5]"),
        ("arr.difference([2])", "[1,3]"),
        ("dupe_arr.difference([1])", "[2,3,3]"),
    ]);
}

#[test]
fn test_set_operations_dedupe() {
    check_all(&[
        ("dupe_arr.set_insert(1)", "[1,2,3]"),
        ("dupe_arr.set_insert(4)", "[1,2,3,4]"),
        ("dupe_arr.set_union([3, 4])", "[1,2,3,4]"),
        ("dupe_arr.set_intersection([1, 3, 5])", "[1,3]"),
        ("dupe_arr.set_difference([1])", "[2,3]"),
    ]);
}

#[test]
fn test_javascript_camel_case_names() {
    let value = eval_in("dupe_arr.setInsert(4)", Language::JavaScript).unwrap();
    assert_eq!(value.to_string(), "[1,2,3,4]");
}

// ============================================================================
// Positional
// ============================================================================

#[test]
fn test_legacy_slice() {
    check_all(&[
        ("arr.slice(1)", "[2,3]"),
        ("arr.slice(0, 2)", "[1,2]"),
        ("arr.slice(-2, -1)", "[2,3]"),
        ("arr.slice(5)", "[]"),
        ("arr.slice(2, 1)", "[]"),
    ]);
}

#[test]
fn test_bracket_slices_per_dialect() {
    assert_eq!(eval_expr("arr[0:2]"), "[1,2]");
    assert_eq!(eval_expr("arr[-2:-1]"), "[2]");
    assert_eq!(eval_in("arr[0..1]", Language::Ruby).unwrap().to_string(), "[1,2]");
    assert_eq!(eval_in("arr[0...1]", Language::Ruby).unwrap().to_string(), "[1]");
    assert_eq!(eval_in("arr[1..-1]", Language::Ruby).unwrap().to_string(), "[2,3]");
}

#[test]
fn test_slice_bounds_at_integer_limits() {
    let cases = [
        (Language::Ruby, "arr[0..9223372036854775807]"),
        (Language::Ruby, "arr[0...9223372036854775807]"),
        (Language::Python, "arr[0:9223372036854775807]"),
        (Language::Python, "arr.slice(0, 9223372036854775807)"),
    ];
    for (lang, source) in cases {
        assert_eq!(
            eval_in(source, lang).unwrap().to_string(),
            "[1,2,3]",
            "Failed for {} input: {}",
            lang,
            source
        );
    }
}

#[test]
fn test_skip_limit() {
    check_all(&[
        ("arr.skip(1)", "[2,3]"),
        ("arr.skip(10)", "[]"),
        ("arr.limit(2)", "[1,2]"),
        ("arr.limit(0)", "[]"),
    ]);
    let err = eval_err("arr.limit(-1)", Language::Python);
    assert_eq!(err.message, "LIMIT takes a non-negative argument.");
}

#[test]
fn test_nth_and_brackets() {
    check_all(&[
        ("arr.nth(0)", "1"),
        ("arr.nth(-1)", "3"),
        ("arr[1]", "2"),
        ("nested[1][0]", "3"),
    ]);
    assert_eq!(eval_in("nested(0)(1)", Language::JavaScript).unwrap(), Value::Integer(2));

    let err = eval_err("arr.nth(3)", Language::Python);
    assert_eq!(err.kind, ErrorKind::RqlRuntimeError);
    assert_eq!(err.message, "Index out of bounds: 3");
}

#[test]
fn test_positional_edits() {
    check_all(&[
        ("arr.insert_at(1, 9)", "[1,9,2,3]"),
        ("arr.insert_at(3, 9)", "[1,2,3,9]"),
        ("arr.splice_at(1, [8, 9])", "[1,8,9,2,3]"),
        ("arr.change_at(0, 'a')", "[\"a\",2,3]"),
        ("arr.delete_at(0)", "[2,3]"),
        ("arr.delete_at(-1)", "[1,2]"),
        ("arr.delete_at(0, 2)", "[3]"),
        ("dupe_arr.indexes_of(3)", "[3,4]"),
        ("arr.indexes_of(lambda x: x > 1)", "[1,2]"),
    ]);

    let err = eval_err("arr.insert_at(4, 9)", Language::Python);
    assert_eq!(err.message, "Index `4` out of bounds for array of size: `3`.");
    let err = eval_err("arr.delete_at(2, 1)", Language::Python);
    assert_eq!(err.message, "Start index `2` is greater than end index `1`.");
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_document_operations() {
    check_all(&[
        ("objArr.pluck('a')", r#"[{"a":1},{"a":2},{}]"#),
        ("objArr.without('a')", r#"[{"b":"x"},{},{"c":3}]"#),
        ("objArr['a']", "[1,2]"),
        ("objArr.get_field('c')", "[3]"),
        ("objArr.has_fields('a')", r#"[{"a":1,"b":"x"},{"a":2}]"#),
        ("objArr.nth(0).merge({'b': 'y'})", r#"{"a":1,"b":"y"}"#),
        ("objArr.nth(0)['b']", r#""x""#),
    ]);
    let err = eval_err("objArr.nth(1)['b']", Language::Python);
    assert_eq!(err.message, "No attribute `b` in object.");
    assert!(err.non_existence);
}

#[test]
fn test_pluck_rejects_non_objects() {
    let err = eval_err("arr.pluck('a')", Language::Python);
    assert_eq!(err.message, "Expected type OBJECT but found NUMBER.");
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_map_in_every_dialect() {
    let cases = [
        (Language::Python, "arr.map(lambda x: x * 2)"),
        (Language::JavaScript, "arr.map(function(x) { return x.mul(2); })"),
        (Language::Ruby, "arr.map{|x| x * 2}"),
        (Language::Python, "arr.map(r.row * 2)"),
    ];
    for (lang, source) in cases {
        assert_eq!(
            eval_in(source, lang).unwrap().to_string(),
            "[2,4,6]",
            "Failed for {} input: {}",
            lang,
            source
        );
    }
}

#[test]
fn test_concat_map_filter_reduce() {
    check_all(&[
        ("nested.concat_map(lambda x: x)", "[1,2,3,4]"),
        ("arr.filter(lambda x: x > 1)", "[2,3]"),
        ("arr.filter(r.row != 2)", "[1,3]"),
        ("objArr.filter({'a': 2})", r#"[{"a":2}]"#),
        ("arr.reduce(lambda acc, x: acc + x)", "6"),
        ("arr.reduce(lambda acc, x: acc + x, 10)", "16"),
    ]);
}

#[test]
fn test_filter_drops_missing_fields() {
    assert_eq!(eval_expr("objArr.filter(lambda x: x['a'] > 1)"), r#"[{"a":2}]"#);
}

#[test]
fn test_javascript_row_call_access() {
    let value = eval_in("objArr.filter(r.row('c').eq(3))", Language::JavaScript).unwrap();
    assert_eq!(value.to_string(), r#"[{"c":3}]"#);
    let value = eval_in("objArr.map(r.row('a'))", Language::JavaScript);
    assert!(value.is_err());
    let value = eval_in("arr.map(r.row.mul(2))", Language::JavaScript).unwrap();
    assert_eq!(value.to_string(), "[2,4,6]");
}

#[test]
fn test_wrong_function_arity() {
    let err = eval_err("arr.map(lambda a, b: a)", Language::Python);
    assert_eq!(
        err.message,
        "Expected function with 1 argument but found function with 2 arguments."
    );
}

#[test]
fn test_reduce_empty() {
    let err = eval_err("r.expr([]).reduce(lambda a, b: a + b)", Language::Python);
    assert_eq!(err.message, "Cannot reduce over an empty stream.");
}

// ============================================================================
// Aggregation and Inspection
// ============================================================================

#[test]
fn test_distinct_sorts() {
    assert_eq!(eval_expr("r.expr([3, 'a', 1, [], 1]).distinct()"), r#"[[],1,3,"a"]"#);
}

#[test]
fn test_count_contains_type_of() {
    check_all(&[
        ("arr.count()", "3"),
        ("dupe_arr.count(3)", "2"),
        ("arr.count(lambda x: x > 1)", "2"),
        ("r.expr([]).is_empty()", "true"),
        ("arr.contains(2)", "true"),
        ("arr.contains(2, 5)", "false"),
        ("arr.contains(lambda x: x > 2)", "true"),
        ("arr.type_of()", r#""ARRAY""#),
        ("arr.nth(0).type_of()", r#""NUMBER""#),
    ]);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_arithmetic_and_comparison() {
    check_all(&[
        ("arr + [4]", "[1,2,3,4]"),
        ("arr * 2", "[1,2,3,1,2,3]"),
        ("r.expr(7) % 3", "1"),
        ("r.expr(1) / 2", "0.5"),
        ("r.expr(0.1) + 0.2", "0.3"),
        ("arr == [1, 2, 3]", "true"),
        ("arr < [1, 2, 4]", "true"),
        ("r.expr(1).lt(2, 3)", "true"),
        ("r.expr([]) < True", "true"),
        ("~r.expr(False)", "true"),
        ("r.expr(True) & False", "false"),
    ]);

    let err = eval_err("arr + 1", Language::Python);
    assert_eq!(err.message, "Expected type ARRAY but found NUMBER.");
    let err = eval_err("r.expr(1) / 0", Language::Python);
    assert_eq!(err.message, "Cannot divide by zero.");
}

#[test]
fn test_array_repetition() {
    check_all(&[
        ("r.expr(2) * arr", "[1,2,3,1,2,3]"),
        ("arr * 0", "[]"),
        ("arr * -1", "[]"),
    ]);
    let value = eval_in("r.expr(2).mul(arr)", Language::JavaScript).unwrap();
    assert_eq!(value.to_string(), "[1,2,3,1,2,3]");

    for source in ["arr * 9223372036854775807", "arr.mul(40000)"] {
        let err = eval_err(source, Language::Python);
        assert_eq!(err.kind, ErrorKind::RqlRuntimeError);
        assert_eq!(err.message, "Array over size limit `100000`.", "Failed for input: {}", source);
    }
}

#[test]
fn test_integer_overflow_edges() {
    let value = eval_in("r.expr(-9223372036854775807).sub(1).mod(-1)", Language::Python).unwrap();
    assert_eq!(value, Value::Integer(0));
    let value = eval_in("r.expr(-9223372036854775807).sub(1).div(-1)", Language::Python).unwrap();
    assert_eq!(value, Value::Float(9223372036854775808.0));
    let value = eval_in("r.expr(-9223372036854775807).sub(1) % -1", Language::Ruby).unwrap();
    assert_eq!(value, Value::Integer(0));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_arity_errors_per_dialect() {
    let err = eval_err("arr.append()", Language::Python);
    assert_eq!(err.kind, ErrorKind::RqlCompileError);
    assert_eq!(err.message, "Expected 2 arguments but found 1.");

    let err = eval_err("arr.append()", Language::JavaScript);
    assert_eq!(err.kind, ErrorKind::RqlDriverError);
    assert_eq!(err.message, "Expected 1 argument but found 0.");
}

#[test]
fn test_unknown_names() {
    let err = eval_err("arr.explode()", Language::Python);
    assert_eq!(err.to_string(), "RqlDriverError: Unknown method `explode`.");

    let err = eval_err("missing.count()", Language::Python);
    assert_eq!(err.message, "Unbound name `missing`.");
}

#[test]
fn test_type_errors() {
    let err = eval_err("r.expr(1).append(2)", Language::Python);
    assert_eq!(err.kind, ErrorKind::RqlRuntimeError);
    assert_eq!(err.message, "Expected type ARRAY but found NUMBER.");
}
