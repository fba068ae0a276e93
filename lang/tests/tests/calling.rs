use kotoha_dynamics::syntax::{HostFunction, Value};
use kotoha_tests::utils::{run, run_with, try_run};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

#[test]
fn argument_order_is_commutative() {
    let defun = "以下の手順で、AがBをCに組する。［A、B、C］を返却する。以上。";
    let calls = [
        "1が2を3に組する。",
        "1が3に2を組する。",
        "2を1が3に組する。",
        "2を3に1が組する。",
        "3に1が2を組する。",
        "3に2を1が組する。",
    ];
    let expected =
        Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    for call in calls {
        let v = run(&format!("{defun}{call}"));
        assert_eq!(v, expected, "call {call}");
    }
}

#[test]
fn conjoined_surplus_folds_right_nested() {
    let v = run_with("1と2と3で束する。", |globals| {
        globals.register(
            "束",
            HostFunction::new(&["で"], |args, _| {
                Ok(args.into_iter().next().unwrap_or(Value::Null))
            }),
        );
    });
    assert_eq!(
        v,
        Value::cons(Value::Int(1), Value::cons(Value::Int(2), Value::Int(3)))
    );
}

#[test]
fn conjoined_parameters_bind_positionally() {
    let v = run(
        "以下の手順で、AとBとCで整列する。［A、B、C］を返却する。以上。\
         1と2と3で整列する。",
    );
    assert_eq!(
        v,
        Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn best_effort_call_of_a_missing_callee_yields_null() {
    let v = run("10を未知してみる。");
    assert_eq!(v, Value::Null);
}

#[test]
fn best_effort_call_swallows_resolution_failure() {
    let v = run_with("1を束してみる。", |globals| {
        globals.register(
            "束",
            HostFunction::new(&["で"], |args, _| {
                Ok(args.into_iter().next().unwrap_or(Value::Null))
            }),
        );
    });
    assert_eq!(v, Value::Null);
}

#[test]
fn best_effort_call_keeps_successes() {
    let v = run(
        "以下の手順で、Aを二倍する。A×2を返却する。以上。\
         21を二倍してみる。",
    );
    assert_eq!(v, Value::Int(42));
}

#[test]
fn map_call_broadcasts_over_a_list() {
    let v = run(
        "以下の手順で、Aを二倍する。A×2を返却する。以上。\
         ［1、2、3］をそれぞれ二倍する。",
    );
    assert_eq!(
        v,
        Value::list(vec![Value::Int(2), Value::Int(4), Value::Int(6)])
    );
}

#[test]
fn map_call_over_a_non_list_fails() {
    let err = try_run(
        "以下の手順で、Aを二倍する。A×2を返却する。以上。\
         5をそれぞれ二倍する。",
    )
    .unwrap_err();
    assert!(err.to_string().contains("list"), "got {err}");
}

#[test]
fn host_function_reads_and_writes_globals() {
    let v = run_with("生成し、机とする。10を机の幅とする。机の幅＋5を返却する。", |globals| {
        globals.register(
            "生成",
            HostFunction::new(&[], |_, _| Ok(Value::record(HashMap::new()))),
        );
    });
    assert_eq!(v, Value::Int(15));
}

#[test]
fn repeated_slot_is_one_parameter() {
    let v = run(
        "【□×□】を自乗とする。\
         7を自乗する。",
    );
    assert_eq!(v, Value::Int(49));
}

#[test]
fn rebinding_a_function_name_drops_its_calling_convention() {
    // 内側 starts as a が・を function returning が, then is rebound to
    // a one-slot lambda (を); the call must resolve against the new
    // value's particles, not the original definition's
    let v = run(
        "以下の手順で、Zが試験する。\
         以下の手順で、AがBを内側する。Aを返却する。以上。\
         【□】が内側となる。\
         1が2を内側する。\
         以上。\
         0が試験する。",
    );
    assert_eq!(v, Value::Int(2));
}

#[test]
fn unused_arguments_are_tolerated() {
    let v = run(
        "以下の手順で、Aを二倍する。A×2を返却する。以上。\
         5を9に二倍する。",
    );
    assert_eq!(v, Value::Int(10));
}
