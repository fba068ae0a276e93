use kotoha_driver::{CompileError, Error};
use kotoha_dynamics::err::{ResolveError, RuntimeError};
use kotoha_surface::err::LexError;
use kotoha_tests::utils::{init_logging, try_run};
use kotoha_utils::span::Cursor2;

#[test]
fn unterminated_string_reports_its_own_line_and_column() {
    init_logging();
    let err = kotoha_driver::compile(
        "1を甲とする。\n2を乙とする。\n「あ\n",
        "main.kth",
    )
    .unwrap_err();
    let CompileError::Lex { name, at, err } = err else {
        panic!("expected a lex error, got {err:?}")
    };
    assert_eq!(name, "main.kth");
    assert_eq!(at, Cursor2 { line: 3, column: 1 });
    assert!(matches!(err, LexError::UnterminatedString { .. }));
}

#[test]
fn truncated_input_is_incomplete_malformed_is_not() {
    init_logging();
    let err = kotoha_driver::compile("10を20に", "<repl>").unwrap_err();
    assert!(err.is_incomplete());
    let err = kotoha_driver::compile("10を】する。", "<repl>").unwrap_err();
    assert!(!err.is_incomplete());
}

#[test]
fn semantic_errors_carry_a_location() {
    init_logging();
    let err = kotoha_driver::compile("を二倍する。", "<repl>").unwrap_err();
    assert!(!err.is_incomplete());
    let CompileError::Semantic { at, .. } = err else {
        panic!("expected a semantic error, got {err:?}")
    };
    assert_eq!(at.line, 1);
}

#[test]
fn calling_an_undefined_name_fails() {
    let err = try_run("10を未知する。").unwrap_err();
    let Error::Runtime(RuntimeError::Undefined { name }) = err else {
        panic!("got {err:?}")
    };
    assert_eq!(name, "未知");
}

#[test]
fn resolution_failure_names_both_particle_sequences() {
    let err = try_run(
        "以下の手順で、AをBに配置する。Aを返却する。以上。\
         1が2と配置する。",
    )
    .unwrap_err();
    let Error::Runtime(RuntimeError::Resolve { name, err }) = err else {
        panic!("got {err:?}")
    };
    assert_eq!(name, "配置");
    let ResolveError::Unbound { particle, expected, supplied } = err else {
        panic!()
    };
    assert_eq!(particle, "に");
    assert_eq!(expected, "を・に");
    assert_eq!(supplied, "が・と");
}

#[test]
fn unknown_operators_fail_at_run_time() {
    let err = try_run("1<>2が結果となる。").unwrap_err();
    let Error::Runtime(RuntimeError::UnknownOperator { op }) = err else {
        panic!("got {err:?}")
    };
    assert_eq!(op, "<>");
}

#[test]
fn division_by_zero() {
    let err = try_run("1÷0が結果となる。").unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::DivisionByZero)
    ));
}

#[test]
fn conditions_must_be_boolean_or_null() {
    let err = try_run("もし1ならば2が結果となる。").unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::TypeMismatch { .. })
    ));
}

#[test]
fn property_access_requires_a_record() {
    let err = try_run(
        "以下の手順で、AをBに配置する。Aを返却する。以上。\
         配置の幅が結果となる。",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::TypeMismatch { .. })
    ));
}
