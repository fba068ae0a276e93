use crate::syntax::Value;
use std::fmt::{Display, Formatter, Result};

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            | Value::Null => write!(f, "無"),
            | Value::Bool(true) => write!(f, "真"),
            | Value::Bool(false) => write!(f, "偽"),
            | Value::Int(n) => write!(f, "{}", n),
            | Value::Big(n) => write!(f, "{}", n),
            | Value::Float(x) => write!(f, "{}", x),
            | Value::Str(s) => write!(f, "{}", s),
            | Value::Cons(cell) => match self.list_elements() {
                | Some(items) => {
                    write!(f, "［")?;
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            write!(f, "、")?;
                        }
                        write!(f, "{}", item)?;
                    }
                    write!(f, "］")
                }
                | None => write!(f, "{}：{}", cell.0, cell.1),
            },
            | Value::Record(fields) => {
                let fields = fields.borrow();
                let mut keys: Vec<_> = fields.keys().collect();
                keys.sort();
                write!(f, "〔")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, "、")?;
                    }
                    write!(f, "{}＝{}", k, fields[*k])?;
                }
                write!(f, "〕")
            }
            | Value::Func(c) if c.name().is_empty() => write!(f, "＜手順＞"),
            | Value::Func(c) => write!(f, "＜手順：{}＞", c.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::Value;

    #[test]
    fn lists_display_bracketed() {
        let v = Value::list(vec![Value::Int(1), Value::str("あ"), Value::Null]);
        assert_eq!(v.to_string(), "［1、あ、無］");
    }

    #[test]
    fn improper_pairs_display_as_cons() {
        let v = Value::cons(Value::Int(1), Value::Int(2));
        assert_eq!(v.to_string(), "1：2");
    }
}
