use crate::err::RuntimeError;
use kotoha_surface::token::Operator;
use num_bigint::BigInt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Run-time lexical environment. Persistent so closures capture by
/// cheap clone; insertion shadows.
pub type Env = im::HashMap<String, Value>;

pub type RcOp = Rc<Op>;

/* ---------------------------------- Value --------------------------------- */

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Big(Rc<BigInt>),
    Float(f64),
    Str(Rc<String>),
    Cons(Rc<(Value, Value)>),
    Record(Rc<RefCell<HashMap<String, Value>>>),
    Func(Rc<dyn Callable>),
}

impl Value {
    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Cons(Rc::new((car, cdr)))
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(Rc::new(s.into()))
    }

    pub fn big(n: BigInt) -> Value {
        Value::Big(Rc::new(n))
    }

    pub fn record(fields: HashMap<String, Value>) -> Value {
        Value::Record(Rc::new(RefCell::new(fields)))
    }
}

/* -------------------------------- Callables -------------------------------- */

/// The callable capability. Argument resolution sees only the particle
/// list; invocation receives positionally resolved values.
pub trait Callable {
    fn name(&self) -> &str;
    fn particles(&self) -> &[String];
    fn invoke(
        self: Rc<Self>,
        args: Vec<Value>,
        globals: &mut GlobalScope,
    ) -> Result<Value, RuntimeError>;
}

/// A function defined in the language: compiled body plus the lexical
/// environment captured at definition. A named function is bound under
/// its own name in each call's environment, so recursion needs no
/// global and the captured environment never references the function.
pub struct UserFunction {
    pub(crate) name: Option<String>,
    pub(crate) particles: Vec<String>,
    pub(crate) params: Vec<String>,
    pub(crate) body: RcOp,
    pub(crate) env: Env,
}

/// A function provided by the embedding host; see
/// `GlobalScope::register`.
pub struct HostFunction {
    pub(crate) name: String,
    pub(crate) particles: Vec<String>,
    #[allow(clippy::type_complexity)]
    pub(crate) body: Box<dyn Fn(Vec<Value>, &mut GlobalScope) -> Result<Value, RuntimeError>>,
}

impl HostFunction {
    pub fn new(
        particles: &[&str],
        body: impl Fn(Vec<Value>, &mut GlobalScope) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        HostFunction {
            name: String::new(),
            particles: particles.iter().map(|p| p.to_string()).collect(),
            body: Box::new(body),
        }
    }
}

/* ------------------------------- Global scope ------------------------------ */

/// The per-program-instance global namespace. Passed explicitly
/// through compilation products; never a singleton.
#[derive(Default)]
pub struct GlobalScope {
    vars: HashMap<String, Value>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn register(&mut self, name: &str, mut host: HostFunction) {
        host.name = name.to_string();
        self.set(name, Value::Func(Rc::new(host)));
    }
}

/* ----------------------------------- Op ------------------------------------ */

/// The executable form: a tree of operations produced by the
/// generator, walked by the evaluator.
#[derive(Clone, Debug)]
pub enum Op {
    Const(Value),
    /// Read a name known to be lexically bound.
    LoadLocal(String),
    /// Read a name lexically if present, else from the global scope.
    Load(String),
    /// Bind (shadow) in the current environment; yields the value.
    StoreLocal(String, RcOp),
    StoreGlobal(String, RcOp),
    Seq(Vec<RcOp>),
    /// Run the body in a copy of the current environment; bindings made
    /// inside do not escape.
    Scope(RcOp),
    If {
        cond: RcOp,
        then: RcOp,
        els: Option<RcOp>,
    },
    Return(Option<RcOp>),
    Binary {
        op: Operator,
        lhs: RcOp,
        rhs: RcOp,
    },
    Unary {
        op: Operator,
        arg: RcOp,
    },
    MakeFunc {
        name: Option<String>,
        particles: Vec<String>,
        params: Vec<String>,
        body: RcOp,
    },
    /// Call whose argument order was resolved at generation time.
    /// `fn_id` identifies the callee among statically known functions;
    /// the tail pass matches on it.
    CallStatic {
        fn_id: usize,
        target: RcOp,
        args: Vec<RcOp>,
        maybe: bool,
    },
    /// Call resolved against the callee's particle list at run time.
    CallDynamic {
        callee: RcOp,
        args: Vec<(RcOp, String)>,
        /// The phrase-chain pipe value, offered to the resolver as the
        /// single untagged implicit argument.
        pipe: Option<RcOp>,
        maybe: bool,
        map: Option<usize>,
    },
    PropGet {
        base: RcOp,
        field: String,
    },
    PropSet {
        base: RcOp,
        field: String,
        value: RcOp,
    },
    /// Installed by the tail pass around a rewritten function body.
    Loop {
        params: Vec<String>,
        body: RcOp,
    },
    /// Evaluates its arguments into temporaries, then rebinds the
    /// enclosing loop's parameters and restarts it.
    TailJump {
        args: Vec<RcOp>,
    },
}

/// A compiled program, ready for `execute` any number of times.
#[derive(Debug)]
pub struct ExecutableForm {
    pub(crate) root: RcOp,
}
