use kotoha_dynamics::syntax::Value;
use kotoha_tests::utils::run;
use num_bigint::BigInt;
use pretty_assertions::assert_eq;

#[test]
fn self_tail_recursion_runs_in_constant_stack() {
    // a million self calls; only survivable because the tail pass
    // turned them into a loop
    let v = run(
        "以下の手順で、AがBを加算する。\
         もしA≦0ならばBを返却する。\
         そうでなければA−1がB＋1を加算する。\
         以上。\
         1000000が1000000を加算する。",
    );
    assert_eq!(v, Value::Int(2_000_000));
}

#[test]
fn tail_jump_reads_all_arguments_before_rebinding() {
    // swapping parameters only works if both argument reads happen
    // before either parameter is rebound
    let v = run(
        "以下の手順で、NがAをBに輪番する。\
         もしN≦0ならば［A、B］を返却する。\
         そうでなければN−1がBをAに輪番する。\
         以上。\
         5が1を2に輪番する。",
    );
    assert_eq!(v, Value::list(vec![Value::Int(2), Value::Int(1)]));
}

#[test]
fn non_tail_recursion_still_recurses() {
    let v = run(
        "以下の手順で、Nを階乗する。\
         もしN≦1ならば1を返却する。\
         N−1を階乗し、下位とする。\
         N×下位を返却する。\
         以上。\
         20を階乗する。",
    );
    assert_eq!(v, Value::Int(2_432_902_008_176_640_000));
}

#[test]
fn arithmetic_promotes_past_machine_integers() {
    let v = run(
        "以下の手順で、Nを階乗する。\
         もしN≦1ならば1を返却する。\
         N−1を階乗し、下位とする。\
         N×下位を返却する。\
         以上。\
         25を階乗する。",
    );
    let expected: BigInt = "15511210043330985984000000".parse().unwrap();
    assert_eq!(v, Value::big(expected));
}
