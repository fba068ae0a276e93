use crate::err::RuntimeError;
use crate::resolve::{resolve, Bound};
use crate::syntax::{
    Callable, Env, ExecutableForm, GlobalScope, HostFunction, Op, UserFunction, Value,
};
use kotoha_surface::token::Operator;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cmp::Ordering;
use std::rc::Rc;

/// How control leaves an op: fall through with a value, unwind to the
/// function boundary, or restart the enclosing loop.
pub enum Flow {
    Next(Value),
    Return(Value),
    Jump(Vec<Value>),
}

macro_rules! next {
    ($flow:expr) => {
        match $flow {
            | Flow::Next(v) => v,
            | other => return Ok(other),
        }
    };
}

/// Run a compiled program against the given global scope. The form is
/// immutable; re-execution against a fresh scope starts from nothing.
pub fn execute(
    form: &ExecutableForm,
    globals: &mut GlobalScope,
) -> Result<Value, RuntimeError> {
    let mut env = Env::new();
    match eval(&form.root, &mut env, globals)? {
        | Flow::Next(v) | Flow::Return(v) => Ok(v),
        | Flow::Jump(_) => unreachable!("jump without an enclosing loop"),
    }
}

pub fn eval(
    op: &Op,
    env: &mut Env,
    globals: &mut GlobalScope,
) -> Result<Flow, RuntimeError> {
    match op {
        | Op::Const(v) => Ok(Flow::Next(v.clone())),
        | Op::LoadLocal(name) => match env.get(name) {
            | Some(v) => Ok(Flow::Next(v.clone())),
            | None => Err(RuntimeError::Undefined { name: name.clone() }),
        },
        | Op::Load(name) => match env.get(name).cloned().or_else(|| globals.get(name)) {
            | Some(v) => Ok(Flow::Next(v)),
            | None => Err(RuntimeError::Undefined { name: name.clone() }),
        },
        | Op::StoreLocal(name, rhs) => {
            let v = next!(eval(rhs, env, globals)?);
            env.insert(name.clone(), v.clone());
            Ok(Flow::Next(v))
        }
        | Op::StoreGlobal(name, rhs) => {
            let v = next!(eval(rhs, env, globals)?);
            globals.set(name, v.clone());
            Ok(Flow::Next(v))
        }
        | Op::Seq(ops) => {
            let mut last = Value::Null;
            for op in ops {
                last = next!(eval(op, env, globals)?);
            }
            Ok(Flow::Next(last))
        }
        | Op::Scope(body) => {
            let mut inner = env.clone();
            eval(body, &mut inner, globals)
        }
        | Op::If { cond, then, els } => {
            let c = next!(eval(cond, env, globals)?);
            if truthy(&c)? {
                eval(then, env, globals)
            } else if let Some(els) = els {
                eval(els, env, globals)
            } else {
                Ok(Flow::Next(Value::Null))
            }
        }
        | Op::Return(value) => {
            let v = match value {
                | Some(op) => next!(eval(op, env, globals)?),
                | None => Value::Null,
            };
            Ok(Flow::Return(v))
        }
        | Op::Binary { op: Operator::And, lhs, rhs } => {
            if !truthy(&next!(eval(lhs, env, globals)?))? {
                return Ok(Flow::Next(Value::Bool(false)));
            }
            let r = truthy(&next!(eval(rhs, env, globals)?))?;
            Ok(Flow::Next(Value::Bool(r)))
        }
        | Op::Binary { op: Operator::Or, lhs, rhs } => {
            if truthy(&next!(eval(lhs, env, globals)?))? {
                return Ok(Flow::Next(Value::Bool(true)));
            }
            let r = truthy(&next!(eval(rhs, env, globals)?))?;
            Ok(Flow::Next(Value::Bool(r)))
        }
        | Op::Binary { op, lhs, rhs } => {
            let l = next!(eval(lhs, env, globals)?);
            let r = next!(eval(rhs, env, globals)?);
            Ok(Flow::Next(binary(op, l, r)?))
        }
        | Op::Unary { op, arg } => {
            let v = next!(eval(arg, env, globals)?);
            Ok(Flow::Next(unary(op, v)?))
        }
        | Op::MakeFunc { name, particles, params, body } => {
            let func = Rc::new(UserFunction {
                name: name.clone(),
                particles: particles.clone(),
                params: params.clone(),
                body: body.clone(),
                env: env.clone(),
            });
            Ok(Flow::Next(Value::Func(func)))
        }
        | Op::CallStatic { target, args, maybe, .. } => {
            let callee = match eval(target, env, globals) {
                | Ok(flow) => next!(flow),
                | Err(RuntimeError::Undefined { .. }) if *maybe => {
                    return Ok(Flow::Next(Value::Null));
                }
                | Err(err) => return Err(err),
            };
            let func = match callee {
                | Value::Func(c) => c,
                | _ if *maybe => return Ok(Flow::Next(Value::Null)),
                | other => {
                    return Err(RuntimeError::NotCallable { name: other.to_string() });
                }
            };
            let mut vals = Vec::with_capacity(args.len());
            for a in args {
                vals.push(next!(eval(a, env, globals)?));
            }
            Ok(Flow::Next(func.invoke(vals, globals)?))
        }
        | Op::CallDynamic { callee, args, pipe, maybe, map } => {
            let callee = match eval(callee, env, globals) {
                | Ok(flow) => next!(flow),
                | Err(RuntimeError::Undefined { .. }) if *maybe => {
                    return Ok(Flow::Next(Value::Null));
                }
                | Err(err) => return Err(err),
            };
            let func = match callee {
                | Value::Func(c) => c,
                | _ if *maybe => return Ok(Flow::Next(Value::Null)),
                | other => {
                    return Err(RuntimeError::NotCallable { name: other.to_string() });
                }
            };
            let mut vals = Vec::with_capacity(args.len());
            for (a, particle) in args {
                vals.push((next!(eval(a, env, globals)?), particle.clone()));
            }
            let pipe = match pipe {
                | Some(op) => Some(next!(eval(op, env, globals)?)),
                | None => None,
            };
            match map {
                | None => match invoke_resolved(&func, vals, pipe, globals) {
                    | Ok(v) => Ok(Flow::Next(v)),
                    | Err(err) if *maybe && recoverable(&err) => {
                        Ok(Flow::Next(Value::Null))
                    }
                    | Err(err) => Err(err),
                },
                | Some(idx) => {
                    let (seed, particle) = vals[*idx].clone();
                    let Some(items) = seed.list_elements() else {
                        if *maybe {
                            return Ok(Flow::Next(Value::Null));
                        }
                        return Err(RuntimeError::TypeMismatch {
                            expected: "list".to_string(),
                            found: seed.type_name().to_string(),
                        });
                    };
                    let mut results = Vec::with_capacity(items.len());
                    for item in items {
                        let mut per = vals.clone();
                        per[*idx] = (item, particle.clone());
                        match invoke_resolved(&func, per, pipe.clone(), globals) {
                            | Ok(v) => results.push(v),
                            | Err(err) if *maybe && recoverable(&err) => {
                                results.push(Value::Null);
                            }
                            | Err(err) => return Err(err),
                        }
                    }
                    Ok(Flow::Next(Value::list(results)))
                }
            }
        }
        | Op::PropGet { base, field } => {
            let b = next!(eval(base, env, globals)?);
            match b {
                | Value::Record(fields) => match fields.borrow().get(field) {
                    | Some(v) => Ok(Flow::Next(v.clone())),
                    | None => Err(RuntimeError::NoProperty { field: field.clone() }),
                },
                | other => Err(RuntimeError::TypeMismatch {
                    expected: "record".to_string(),
                    found: other.type_name().to_string(),
                }),
            }
        }
        | Op::PropSet { base, field, value } => {
            let b = next!(eval(base, env, globals)?);
            let v = next!(eval(value, env, globals)?);
            match b {
                | Value::Record(fields) => {
                    fields.borrow_mut().insert(field.clone(), v.clone());
                    Ok(Flow::Next(v))
                }
                | other => Err(RuntimeError::TypeMismatch {
                    expected: "record".to_string(),
                    found: other.type_name().to_string(),
                }),
            }
        }
        | Op::Loop { params, body } => loop {
            match eval(body, env, globals)? {
                | Flow::Jump(vals) => {
                    for (p, v) in params.iter().zip(vals) {
                        env.insert(p.clone(), v);
                    }
                }
                | other => return Ok(other),
            }
        },
        | Op::TailJump { args } => {
            // all argument reads happen before any parameter rebinds
            let mut vals = Vec::with_capacity(args.len());
            for a in args {
                vals.push(next!(eval(a, env, globals)?));
            }
            Ok(Flow::Jump(vals))
        }
    }
}

fn invoke_resolved(
    func: &Rc<dyn Callable>,
    args: Vec<(Value, String)>,
    pipe: Option<Value>,
    globals: &mut GlobalScope,
) -> Result<Value, RuntimeError> {
    let bound = resolve(func.particles(), &args, pipe).map_err(|err| {
        RuntimeError::Resolve { name: func.name().to_string(), err }
    })?;
    let positional = bound
        .into_iter()
        .map(|b| match b {
            | Bound::Single(v) => v,
            | Bound::Fold(vs) => Value::chain(vs),
        })
        .collect();
    func.clone().invoke(positional, globals)
}

/// Which failures a best-effort call absorbs: the callee being absent
/// or uncallable, and argument-resolution mismatch. Failures inside
/// the callee's body still propagate.
fn recoverable(err: &RuntimeError) -> bool {
    matches!(
        err,
        RuntimeError::Resolve { .. }
            | RuntimeError::Undefined { .. }
            | RuntimeError::NotCallable { .. }
    )
}

fn truthy(v: &Value) -> Result<bool, RuntimeError> {
    match v {
        | Value::Bool(b) => Ok(*b),
        | Value::Null => Ok(false),
        | other => Err(RuntimeError::TypeMismatch {
            expected: "boolean".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

/* ------------------------------- Callables -------------------------------- */

impl Callable for UserFunction {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn particles(&self) -> &[String] {
        &self.particles
    }

    fn invoke(
        self: Rc<Self>,
        args: Vec<Value>,
        globals: &mut GlobalScope,
    ) -> Result<Value, RuntimeError> {
        let mut env = self.env.clone();
        // a named function sees itself; bound per call rather than
        // embedded in the captured environment, which would cycle
        if let Some(name) = &self.name {
            env.insert(name.clone(), Value::Func(self.clone()));
        }
        for (p, v) in self.params.iter().zip(args) {
            env.insert(p.clone(), v);
        }
        match eval(&self.body, &mut env, globals)? {
            | Flow::Next(v) | Flow::Return(v) => Ok(v),
            | Flow::Jump(_) => unreachable!("jump without an enclosing loop"),
        }
    }
}

impl Callable for HostFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn particles(&self) -> &[String] {
        &self.particles
    }

    fn invoke(
        self: Rc<Self>,
        args: Vec<Value>,
        globals: &mut GlobalScope,
    ) -> Result<Value, RuntimeError> {
        (self.body)(args, globals)
    }
}

/* ------------------------------- Operators -------------------------------- */

enum Num {
    I(i64),
    B(BigInt),
    F(f64),
}

fn num(v: &Value) -> Option<Num> {
    match v {
        | Value::Int(n) => Some(Num::I(*n)),
        | Value::Big(n) => Some(Num::B((**n).clone())),
        | Value::Float(x) => Some(Num::F(*x)),
        | _ => None,
    }
}

fn as_f64(n: &Num) -> f64 {
    match n {
        | Num::I(i) => *i as f64,
        | Num::B(b) => b.to_f64().unwrap_or(f64::NAN),
        | Num::F(x) => *x,
    }
}

/// Integers fit in `i64` until an operation overflows, then promote to
/// arbitrary precision; results shrink back when they fit again.
fn shrink(n: BigInt) -> Value {
    match n.to_i64() {
        | Some(i) => Value::Int(i),
        | None => Value::big(n),
    }
}

fn binary(op: &Operator, l: Value, r: Value) -> Result<Value, RuntimeError> {
    match op {
        | Operator::Cons => Ok(Value::cons(l, r)),
        | Operator::Concat => Ok(Value::str(format!("{}{}", l, r))),
        | Operator::Eq => Ok(Value::Bool(value_eq(&l, &r))),
        | Operator::Ne => Ok(Value::Bool(!value_eq(&l, &r))),
        | Operator::Lt => Ok(Value::Bool(compare(&l, &r)? == Ordering::Less)),
        | Operator::Gt => Ok(Value::Bool(compare(&l, &r)? == Ordering::Greater)),
        | Operator::Le => Ok(Value::Bool(compare(&l, &r)? != Ordering::Greater)),
        | Operator::Ge => Ok(Value::Bool(compare(&l, &r)? != Ordering::Less)),
        | Operator::Add | Operator::Sub | Operator::Mul | Operator::Div
        | Operator::Mod => arith(op, l, r),
        | Operator::Unknown(s) => Err(RuntimeError::UnknownOperator { op: s.clone() }),
        | Operator::And | Operator::Or | Operator::Not => {
            unreachable!("handled before operand evaluation")
        }
    }
}

fn unary(op: &Operator, v: Value) -> Result<Value, RuntimeError> {
    match op {
        | Operator::Not => Ok(Value::Bool(!truthy(&v)?)),
        | Operator::Sub => match v {
            | Value::Int(n) => match n.checked_neg() {
                | Some(m) => Ok(Value::Int(m)),
                | None => Ok(shrink(-BigInt::from(n))),
            },
            | Value::Big(n) => Ok(shrink(-(*n).clone())),
            | Value::Float(x) => Ok(Value::Float(-x)),
            | other => Err(RuntimeError::TypeMismatch {
                expected: "number".to_string(),
                found: other.type_name().to_string(),
            }),
        },
        | Operator::Unknown(s) => Err(RuntimeError::UnknownOperator { op: s.clone() }),
        | _ => unreachable!("parser only builds − and ！ unaries"),
    }
}

fn value_eq(l: &Value, r: &Value) -> bool {
    match (num(l), num(r)) {
        | (Some(a), Some(b)) => num_cmp(&a, &b) == Some(Ordering::Equal),
        | _ => l == r,
    }
}

fn num_cmp(a: &Num, b: &Num) -> Option<Ordering> {
    match (a, b) {
        | (Num::F(_), _) | (_, Num::F(_)) => as_f64(a).partial_cmp(&as_f64(b)),
        | (Num::I(x), Num::I(y)) => Some(x.cmp(y)),
        | (Num::B(x), Num::B(y)) => Some(x.cmp(y)),
        | (Num::I(x), Num::B(y)) => Some(BigInt::from(*x).cmp(y)),
        | (Num::B(x), Num::I(y)) => Some(x.cmp(&BigInt::from(*y))),
    }
}

fn compare(l: &Value, r: &Value) -> Result<Ordering, RuntimeError> {
    if let (Some(a), Some(b)) = (num(l), num(r)) {
        return num_cmp(&a, &b).ok_or(RuntimeError::TypeMismatch {
            expected: "comparable numbers".to_string(),
            found: "incomparable floats".to_string(),
        });
    }
    match (l, r) {
        | (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        | _ => Err(RuntimeError::TypeMismatch {
            expected: "two numbers or two strings".to_string(),
            found: format!("{} and {}", l.type_name(), r.type_name()),
        }),
    }
}

fn arith(op: &Operator, l: Value, r: Value) -> Result<Value, RuntimeError> {
    let (a, b) = match (num(&l), num(&r)) {
        | (Some(a), Some(b)) => (a, b),
        | (None, _) => {
            return Err(RuntimeError::TypeMismatch {
                expected: "number".to_string(),
                found: l.type_name().to_string(),
            });
        }
        | (_, None) => {
            return Err(RuntimeError::TypeMismatch {
                expected: "number".to_string(),
                found: r.type_name().to_string(),
            });
        }
    };
    if matches!(a, Num::F(_)) || matches!(b, Num::F(_)) {
        let (x, y) = (as_f64(&a), as_f64(&b));
        if matches!(op, Operator::Div | Operator::Mod) && y == 0.0 {
            return Err(RuntimeError::DivisionByZero);
        }
        let z = match op {
            | Operator::Add => x + y,
            | Operator::Sub => x - y,
            | Operator::Mul => x * y,
            | Operator::Div => x / y,
            | Operator::Mod => x % y,
            | _ => unreachable!(),
        };
        return Ok(Value::Float(z));
    }
    if let (Num::I(x), Num::I(y)) = (&a, &b) {
        let (x, y) = (*x, *y);
        if matches!(op, Operator::Div | Operator::Mod) && y == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        let small = match op {
            | Operator::Add => x.checked_add(y),
            | Operator::Sub => x.checked_sub(y),
            | Operator::Mul => x.checked_mul(y),
            | Operator::Div => x.checked_div(y),
            | Operator::Mod => x.checked_rem(y),
            | _ => unreachable!(),
        };
        if let Some(z) = small {
            return Ok(Value::Int(z));
        }
    }
    let x = match a {
        | Num::I(i) => BigInt::from(i),
        | Num::B(b) => b,
        | Num::F(_) => unreachable!(),
    };
    let y = match b {
        | Num::I(i) => BigInt::from(i),
        | Num::B(b) => b,
        | Num::F(_) => unreachable!(),
    };
    use num_traits::Zero;
    if matches!(op, Operator::Div | Operator::Mod) && y.is_zero() {
        return Err(RuntimeError::DivisionByZero);
    }
    let z = match op {
        | Operator::Add => x + y,
        | Operator::Sub => x - y,
        | Operator::Mul => x * y,
        | Operator::Div => x / y,
        | Operator::Mod => x % y,
        | _ => unreachable!(),
    };
    Ok(shrink(z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_promotes_and_results_shrink() {
        let big = binary(&Operator::Mul, Value::Int(i64::MAX), Value::Int(2)).unwrap();
        assert!(matches!(big, Value::Big(_)));
        let back =
            binary(&Operator::Div, big, Value::Int(i64::MAX)).unwrap();
        assert_eq!(back, Value::Int(2));
    }

    #[test]
    fn mixed_numeric_equality() {
        assert!(value_eq(&Value::Int(3), &Value::Float(3.0)));
        assert!(value_eq(&Value::Int(3), &Value::big(BigInt::from(3))));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = binary(&Operator::Div, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn concat_uses_display_form() {
        let v = binary(&Operator::Concat, Value::str("値は"), Value::Int(3)).unwrap();
        assert_eq!(v, Value::str("値は3"));
    }

    #[test]
    fn strict_truthiness() {
        assert!(!truthy(&Value::Null).unwrap());
        assert!(truthy(&Value::Bool(true)).unwrap());
        assert!(truthy(&Value::Int(1)).is_err());
    }
}
