use kotoha_dynamics::syntax::{GlobalScope, Value};
use kotoha_tests::utils::{init_logging, run};
use pretty_assertions::assert_eq;
use std::rc::Rc;

#[test]
fn lambda_definition_and_particle_call() {
    let v = run("【□＋△】を加算とする。10を20に加算する。");
    assert_eq!(v, Value::Int(30));
}

#[test]
fn phrase_chain_pipes_the_previous_result() {
    let v = run(
        "以下の手順で、Aを二倍する。A×2を返却する。以上。\
         以下の手順で、Aを五倍する。A×5を返却する。以上。\
         3を二倍し、五倍する。",
    );
    assert_eq!(v, Value::Int(30));
}

#[test]
fn define_then_assign() {
    let v = run("10を基礎とする。基礎＋5が結果となる。");
    assert_eq!(v, Value::Int(15));
}

#[test]
fn chain_result_feeds_a_definition() {
    let v = run(
        "以下の手順で、Aを二倍する。A×2を返却する。以上。\
         21を二倍し、答とする。答を返却する。",
    );
    assert_eq!(v, Value::Int(42));
}

#[test]
fn function_locals_shadow_globals() {
    init_logging();
    let mut globals = GlobalScope::new();
    let v = kotoha_driver::run(
        "100が結果となる。\
         以下の手順で、Aを更新する。Aが結果となる。結果を返却する。以上。\
         7を更新する。",
        "<test>",
        &mut globals,
    )
    .unwrap();
    assert_eq!(v, Value::Int(7));
    // the global binding was shadowed, not written through
    assert_eq!(globals.get("結果"), Some(Value::Int(100)));
}

#[test]
fn block_bindings_do_not_escape() {
    let v = run(
        "1を種とする。\
         以下を実行する。10が種となる。以上。\
         種を返却する。",
    );
    assert_eq!(v, Value::Int(1));
}

#[test]
fn block_value_is_its_last_statement() {
    let v = run("以下を実行する。1＋2が結果となる。以上。");
    assert_eq!(v, Value::Int(3));
}

#[test]
fn else_if_chains() {
    let v = run(
        "5が値となる。\
         もし値＜0ならば「負」が種となる。\
         そうでなければもし値＝0ならば「零」が種となる。\
         そうでなければ「正」が種となる。",
    );
    assert_eq!(v, Value::str("正"));
}

#[test]
fn executing_twice_from_fresh_scopes_agrees() {
    init_logging();
    let form = kotoha_driver::compile(
        "以下の手順で、AがBを加算する。\
         もしA≦0ならばBを返却する。\
         そうでなければA−1がB＋1を加算する。\
         以上。\
         100が23を加算する。",
        "<test>",
    )
    .unwrap();
    let mut first = GlobalScope::new();
    let a = kotoha_driver::execute(&form, &mut first).unwrap();
    let mut second = GlobalScope::new();
    let b = kotoha_driver::execute(&form, &mut second).unwrap();
    assert_eq!(a, Value::Int(123));
    assert_eq!(a, b);
}

#[test]
fn function_values_do_not_keep_themselves_alive() {
    init_logging();
    let form = kotoha_driver::compile(
        "以下の手順で、Aを二倍する。A×2を返却する。以上。",
        "<test>",
    )
    .unwrap();
    let mut globals = GlobalScope::new();
    kotoha_driver::execute(&form, &mut globals).unwrap();
    let Some(Value::Func(func)) = globals.get("二倍") else {
        panic!("二倍 is not bound to a function")
    };
    drop(globals);
    drop(form);
    // a self-reference embedded in the captured environment would keep
    // this count at two forever
    assert_eq!(Rc::strong_count(&func), 1);
}

#[test]
fn string_concatenation_and_comparison() {
    let v = run("「答は」＆42が表示文となる。");
    assert_eq!(v, Value::str("答は42"));
    let v = run("もし「あ」＜「い」ならば1が結果となる。そうでなければ2が結果となる。");
    assert_eq!(v, Value::Int(1));
}
