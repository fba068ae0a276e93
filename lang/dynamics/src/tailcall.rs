use crate::syntax::{Op, RcOp};
use std::rc::Rc;

/// Rewrite self-targeted static calls in tail position into jumps and,
/// when at least one was rewritten, wrap the body in a loop that
/// rebinds the parameters. Runs once per freshly generated function
/// body; gives self tail recursion constant stack.
pub fn rewrite(body: RcOp, fn_id: usize, params: &[String]) -> RcOp {
    let mut changed = false;
    let body = tail(&body, fn_id, &mut changed);
    if changed {
        log::debug!("tail recursion rewritten into a loop (fn #{fn_id})");
        Rc::new(Op::Loop { params: params.to_vec(), body })
    } else {
        body
    }
}

/// Descend tail positions only; anything else keeps its call.
fn tail(op: &RcOp, fn_id: usize, changed: &mut bool) -> RcOp {
    match &**op {
        | Op::CallStatic { fn_id: id, args, maybe: false, .. } if *id == fn_id => {
            *changed = true;
            Rc::new(Op::TailJump { args: args.clone() })
        }
        | Op::Seq(ops) if !ops.is_empty() => {
            let mut before = false;
            let last = tail(ops.last().unwrap(), fn_id, &mut before);
            if !before {
                return op.clone();
            }
            *changed = true;
            let mut ops = ops.clone();
            *ops.last_mut().unwrap() = last;
            Rc::new(Op::Seq(ops))
        }
        | Op::If { cond, then, els } => {
            let mut here = false;
            let then = tail(then, fn_id, &mut here);
            let els = els.as_ref().map(|e| tail(e, fn_id, &mut here));
            if !here {
                return op.clone();
            }
            *changed = true;
            Rc::new(Op::If { cond: cond.clone(), then, els })
        }
        | Op::Scope(body) => {
            let mut here = false;
            let body = tail(body, fn_id, &mut here);
            if !here {
                return op.clone();
            }
            *changed = true;
            Rc::new(Op::Scope(body))
        }
        | Op::StoreLocal(name, rhs) => {
            let mut here = false;
            let rhs = tail(rhs, fn_id, &mut here);
            if !here {
                return op.clone();
            }
            *changed = true;
            Rc::new(Op::StoreLocal(name.clone(), rhs))
        }
        | Op::Return(Some(inner)) => {
            let mut here = false;
            let inner = tail(inner, fn_id, &mut here);
            if !here {
                return op.clone();
            }
            *changed = true;
            Rc::new(Op::Return(Some(inner)))
        }
        | _ => op.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Value;

    fn call(fn_id: usize) -> RcOp {
        Rc::new(Op::CallStatic {
            fn_id,
            target: Rc::new(Op::Load("f".into())),
            args: vec![Rc::new(Op::Const(Value::Int(1)))],
            maybe: false,
        })
    }

    #[test]
    fn rewrites_tail_call_and_wraps_in_loop() {
        let body = Rc::new(Op::Seq(vec![call(7)]));
        let out = rewrite(body, 7, &["A".to_string()]);
        let Op::Loop { params, body } = &*out else { panic!("got {out:?}") };
        assert_eq!(params, &["A".to_string()]);
        let Op::Seq(ops) = &**body else { panic!() };
        assert!(matches!(*ops[0], Op::TailJump { .. }));
    }

    #[test]
    fn descends_both_if_arms() {
        let body = Rc::new(Op::If {
            cond: Rc::new(Op::Const(Value::Bool(true))),
            then: call(3),
            els: Some(call(3)),
        });
        let out = rewrite(body, 3, &[]);
        let Op::Loop { body, .. } = &*out else { panic!() };
        let Op::If { then, els, .. } = &**body else { panic!() };
        assert!(matches!(**then, Op::TailJump { .. }));
        assert!(matches!(**els.as_ref().unwrap(), Op::TailJump { .. }));
    }

    #[test]
    fn other_functions_and_non_tail_positions_stay() {
        // a call to someone else
        let other = Rc::new(Op::Seq(vec![call(9)]));
        let out = rewrite(other, 3, &[]);
        assert!(!matches!(*out, Op::Loop { .. }));
        // a self call that is not the last op
        let body = Rc::new(Op::Seq(vec![call(3), Rc::new(Op::Const(Value::Null))]));
        let out = rewrite(body, 3, &[]);
        assert!(!matches!(*out, Op::Loop { .. }));
    }

    #[test]
    fn best_effort_calls_are_not_rewritten() {
        let body = Rc::new(Op::CallStatic {
            fn_id: 3,
            target: Rc::new(Op::Load("f".into())),
            args: vec![],
            maybe: true,
        });
        let out = rewrite(body, 3, &[]);
        assert!(!matches!(*out, Op::Loop { .. }));
    }
}
