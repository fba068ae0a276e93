use crate::syntax::Value;
use num_bigint::BigInt;
use std::rc::Rc;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            | Value::Null => "null",
            | Value::Bool(_) => "boolean",
            | Value::Int(_) | Value::Big(_) => "integer",
            | Value::Float(_) => "number",
            | Value::Str(_) => "string",
            | Value::Cons(_) => "pair",
            | Value::Record(_) => "record",
            | Value::Func(_) => "function",
        }
    }

    /// The elements of a null-terminated cons chain, or `None` if the
    /// value is not a proper list.
    pub fn list_elements(&self) -> Option<Vec<Value>> {
        let mut out = Vec::new();
        let mut cur = self.clone();
        loop {
            match cur {
                | Value::Null => return Some(out),
                | Value::Cons(cell) => {
                    out.push(cell.0.clone());
                    cur = cell.1.clone();
                }
                | _ => return None,
            }
        }
    }

    /// A null-terminated list from the given elements.
    pub fn list(elements: Vec<Value>) -> Value {
        let mut acc = Value::Null;
        for e in elements.into_iter().rev() {
            acc = Value::cons(e, acc);
        }
        acc
    }

    /// A right-nested chain whose final cdr is the last element; the
    /// shape an aggregated argument group folds into.
    pub fn chain(elements: Vec<Value>) -> Value {
        let mut iter = elements.into_iter().rev();
        let Some(mut acc) = iter.next() else { return Value::Null };
        for e in iter {
            acc = Value::cons(e, acc);
        }
        acc
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            | Value::Null => write!(f, "Null"),
            | Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            | Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            | Value::Big(n) => f.debug_tuple("Big").field(n).finish(),
            | Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            | Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            | Value::Cons(cell) => {
                f.debug_tuple("Cons").field(&cell.0).field(&cell.1).finish()
            }
            | Value::Record(fields) => {
                f.debug_tuple("Record").field(&fields.borrow()).finish()
            }
            | Value::Func(c) => write!(f, "Func({})", c.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            | (Value::Null, Value::Null) => true,
            | (Value::Bool(a), Value::Bool(b)) => a == b,
            | (Value::Int(a), Value::Int(b)) => a == b,
            | (Value::Big(a), Value::Big(b)) => a == b,
            | (Value::Float(a), Value::Float(b)) => a == b,
            | (Value::Str(a), Value::Str(b)) => a == b,
            | (Value::Cons(a), Value::Cons(b)) => a.0 == b.0 && a.1 == b.1,
            | (Value::Record(a), Value::Record(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            // functions compare by identity
            | (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            | _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::new(s))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::new(s.to_string()))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::Big(Rc::new(n))
    }
}
