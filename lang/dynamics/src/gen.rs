use crate::err::SemanticError;
use crate::resolve::{resolve, Bound};
use crate::syntax::{ExecutableForm, Op, RcOp, Value};
use crate::tailcall;
use kotoha_surface::ast::*;
use kotoha_surface::token::{Literal, Operator, SLOT_MARKS};
use kotoha_utils::span::{Span, Sp};
use std::collections::HashMap;
use std::rc::Rc;

/// The phrase-chain pipe value lives in an unspellable local; no
/// surface identifier can collide with it.
pub(crate) const PIPE: &str = "%pipe";

/// Default particles handed to lambda slots by order of first
/// appearance.
const SLOT_PARTICLES: [&str; 6] = ["を", "に", "と", "で", "から", "まで"];

pub fn generate(prog: &Program) -> Result<ExecutableForm, SemanticError> {
    let mut gen = Generator::new();
    let ops = gen.statements(&prog.body)?;
    Ok(ExecutableForm { root: Rc::new(Op::Seq(ops)) })
}

struct FnInfo {
    id: usize,
    particles: Vec<String>,
}

enum Binding {
    Var,
    /// A name bound by defun, with the metadata static call
    /// specialization needs.
    Func(Rc<FnInfo>),
}

enum FrameKind {
    Global,
    Function,
    Block,
}

struct Frame {
    kind: FrameKind,
    names: HashMap<String, Binding>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Frame { kind, names: HashMap::new() }
    }
}

struct Generator {
    scopes: Vec<Frame>,
    /// Functions whose bodies are being generated, innermost last;
    /// lets a self-call specialize even when the definition site is
    /// the global frame.
    current_fn: Vec<(String, Rc<FnInfo>)>,
    next_fn_id: usize,
}

impl Generator {
    fn new() -> Self {
        Generator {
            scopes: vec![Frame::new(FrameKind::Global)],
            current_fn: Vec::new(),
            next_fn_id: 0,
        }
    }

    fn at_global(&self) -> bool {
        matches!(self.scopes.last().map(|f| &f.kind), Some(FrameKind::Global))
    }

    /// Is `name` lexically bound below the global frame?
    fn is_local(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| {
                frame
                    .names
                    .get(name)
                    .map(|_| !matches!(frame.kind, FrameKind::Global))
            })
            .unwrap_or(false)
    }

    /* ----------------------------- Statements ----------------------------- */

    fn statements(
        &mut self,
        stmts: &[Sp<Statement>],
    ) -> Result<Vec<RcOp>, SemanticError> {
        stmts.iter().map(|s| self.statement(s)).collect()
    }

    fn statement(&mut self, stmt: &Sp<Statement>) -> Result<RcOp, SemanticError> {
        match &stmt.inner {
            | Statement::If(i) => {
                let cond = self.element(&i.cond)?;
                let then = self.statement(&i.then)?;
                let els = match &i.els {
                    | Some(els) => Some(self.statement(els)?),
                    | None => None,
                };
                Ok(Rc::new(Op::If { cond, then, els }))
            }
            | Statement::Defun(d) => self.defun(d),
            | Statement::BlockExec(b) => {
                self.scopes.push(Frame::new(FrameKind::Block));
                let body = self.statements(&b.body);
                self.scopes.pop();
                Ok(Rc::new(Op::Scope(Rc::new(Op::Seq(body?)))))
            }
            | Statement::Return(r) => {
                let value = match &r.value {
                    | Some(e) => Some(self.element(e)?),
                    | None => None,
                };
                Ok(Rc::new(Op::Return(value)))
            }
            | Statement::Phrases(phrases) => {
                let mut ops = Vec::with_capacity(phrases.len());
                for (idx, ph) in phrases.iter().enumerate() {
                    let op = self.phrase(ph, idx > 0)?;
                    // each phrase's result becomes the next one's pipe;
                    // the store evaluates to the stored value, so the
                    // chain's value is its last phrase's
                    ops.push(Rc::new(Op::StoreLocal(PIPE.to_string(), op)));
                }
                Ok(Rc::new(Op::Seq(ops)))
            }
        }
    }

    fn defun(&mut self, d: &Defun) -> Result<RcOp, SemanticError> {
        let name = d.name.inner.clone();
        let params: Vec<String> = d.params.iter().map(|(n, _)| n.clone()).collect();
        let particles: Vec<String> =
            d.params.iter().map(|(_, p)| p.clone()).collect();
        let id = self.next_fn_id;
        self.next_fn_id += 1;
        let info = Rc::new(FnInfo { id, particles: particles.clone() });
        let global = self.at_global();
        // bound in the parent scope before the body is generated, so
        // the body can name it
        let frame = self.scopes.last_mut().unwrap();
        if !global && frame.names.contains_key(&name) {
            return Err(SemanticError::Redefinition {
                name,
                span: d.name.span,
            });
        }
        frame.names.insert(name.clone(), Binding::Func(info.clone()));

        let mut inner = Frame::new(FrameKind::Function);
        for p in &params {
            inner.names.insert(p.clone(), Binding::Var);
        }
        self.scopes.push(inner);
        self.current_fn.push((name.clone(), info));
        let body = self.statements(&d.body);
        self.current_fn.pop();
        self.scopes.pop();
        let body = Rc::new(Op::Seq(body?));
        let body = tailcall::rewrite(body, id, &params);

        let mk = Rc::new(Op::MakeFunc {
            name: Some(name.clone()),
            particles,
            params,
            body,
        });
        Ok(Rc::new(if global {
            Op::StoreGlobal(name, mk)
        } else {
            Op::StoreLocal(name, mk)
        }))
    }

    /* ------------------------------- Phrases ------------------------------ */

    fn phrase(
        &mut self,
        ph: &Sp<Phrase>,
        has_pipe: bool,
    ) -> Result<RcOp, SemanticError> {
        match &ph.inner {
            | Phrase::DefineValue(d) => {
                let value = self.phrase_value(&d.args, has_pipe, ph.span)?;
                let name = d.name.inner.clone();
                if self.at_global() {
                    self.scopes[0].names.insert(name.clone(), Binding::Var);
                    Ok(Rc::new(Op::StoreGlobal(name, value)))
                } else {
                    let frame = self.scopes.last_mut().unwrap();
                    if frame.names.contains_key(&name) {
                        return Err(SemanticError::Redefinition {
                            name,
                            span: d.name.span,
                        });
                    }
                    frame.names.insert(name.clone(), Binding::Var);
                    Ok(Rc::new(Op::StoreLocal(name, value)))
                }
            }
            | Phrase::Assign(a) => {
                // assignment rebinds freely; in a function it shadows
                // rather than touching a same-named global
                let value = self.phrase_value(&a.args, has_pipe, ph.span)?;
                let name = a.name.inner.clone();
                if self.at_global() {
                    self.scopes[0].names.insert(name.clone(), Binding::Var);
                    Ok(Rc::new(Op::StoreGlobal(name, value)))
                } else {
                    let frame = self.scopes.last_mut().unwrap();
                    // a rebind drops any function metadata the name had,
                    // so later calls resolve against the new value
                    frame.names.insert(name.clone(), Binding::Var);
                    Ok(Rc::new(Op::StoreLocal(name, value)))
                }
            }
            | Phrase::PropertySet(p) => {
                let value = self.phrase_value(&p.args, has_pipe, ph.span)?;
                let base = self.element(p.target.inner.base.as_ref())?;
                Ok(Rc::new(Op::PropSet {
                    base,
                    field: p.target.inner.field.clone(),
                    value,
                }))
            }
            | Phrase::Call(c) => self.call(c, has_pipe),
        }
    }

    /// The single value a definition or assignment binds: the lone
    /// tagged element, or the pipe value when the phrase supplies none.
    fn phrase_value(
        &mut self,
        args: &[Argument],
        has_pipe: bool,
        span: Span,
    ) -> Result<RcOp, SemanticError> {
        match args {
            | [] => {
                if has_pipe {
                    Ok(load_pipe())
                } else {
                    Err(SemanticError::NoValue { span })
                }
            }
            | [(elem, _)] => {
                if is_placeholder(elem) {
                    if has_pipe {
                        Ok(load_pipe())
                    } else {
                        Err(SemanticError::NoValue { span: elem.span })
                    }
                } else {
                    self.element(elem)
                }
            }
            | _ => Err(SemanticError::MalformedAggregation { span }),
        }
    }

    fn call(&mut self, c: &Call, has_pipe: bool) -> Result<RcOp, SemanticError> {
        let mut pipe_consumed = false;
        let mut args: Vec<(RcOp, String)> = Vec::with_capacity(c.args.len());
        for (elem, particle) in &c.args {
            let op = if is_placeholder(elem) {
                if !has_pipe {
                    return Err(SemanticError::NoValue { span: elem.span });
                }
                pipe_consumed = true;
                load_pipe()
            } else {
                self.element(elem)?
            };
            args.push((op, particle.clone()));
        }
        let pipe = if has_pipe && !pipe_consumed { Some(load_pipe()) } else { None };

        // specialize when the callee's particle list is known here;
        // map-calls stay dynamic, they re-resolve per element
        if c.map.is_none() {
            if let Element::Symbol(name) = &c.callee.inner {
                if let Some(info) = self.static_info(name) {
                    match resolve(&info.particles, &args, pipe.clone()) {
                        | Ok(bound) => {
                            let positional = bound
                                .into_iter()
                                .map(|b| match b {
                                    | Bound::Single(op) => op,
                                    | Bound::Fold(ops) => fold_ops(ops),
                                })
                                .collect();
                            let target = self.element(&c.callee)?;
                            return Ok(Rc::new(Op::CallStatic {
                                fn_id: info.id,
                                target,
                                args: positional,
                                maybe: c.maybe,
                            }));
                        }
                        | Err(err) => {
                            log::trace!(
                                "static resolution of `{}` failed ({}), \
                                 deferring to run time",
                                name,
                                err
                            );
                        }
                    }
                }
            }
        }

        let callee = self.element(&c.callee)?;
        Ok(Rc::new(Op::CallDynamic {
            callee,
            args,
            pipe,
            maybe: c.maybe,
            map: c.map,
        }))
    }

    fn static_info(&self, name: &str) -> Option<Rc<FnInfo>> {
        if let Some((_, info)) =
            self.current_fn.iter().rev().find(|(n, _)| n == name)
        {
            return Some(info.clone());
        }
        for frame in self.scopes.iter().rev() {
            match frame.names.get(name) {
                // a global binding may be replaced between statements
                // at run time, so only lexical bindings specialize
                | Some(Binding::Func(info))
                    if !matches!(frame.kind, FrameKind::Global) =>
                {
                    return Some(info.clone());
                }
                | Some(_) => return None,
                | None => {}
            }
        }
        None
    }

    /* ------------------------------- Elements ----------------------------- */

    fn element(&mut self, elem: &Sp<Element>) -> Result<RcOp, SemanticError> {
        match &elem.inner {
            | Element::Lit(lit) => Ok(Rc::new(Op::Const(lit_value(lit)))),
            | Element::Symbol(name) => {
                if self.is_local(name) {
                    Ok(Rc::new(Op::LoadLocal(name.clone())))
                } else {
                    Ok(Rc::new(Op::Load(name.clone())))
                }
            }
            | Element::Binary(b) => Ok(Rc::new(Op::Binary {
                op: b.op.clone(),
                lhs: self.element(b.lhs.as_ref())?,
                rhs: self.element(b.rhs.as_ref())?,
            })),
            | Element::Unary(u) => Ok(Rc::new(Op::Unary {
                op: u.op.clone(),
                arg: self.element(u.arg.as_ref())?,
            })),
            | Element::Property(p) => Ok(Rc::new(Op::PropGet {
                base: self.element(p.base.as_ref())?,
                field: p.field.clone(),
            })),
            | Element::Lambda(l) => self.lambda(l),
            | Element::Slot(i) => {
                let name = slot_name(*i);
                if self.is_local(&name) {
                    Ok(Rc::new(Op::LoadLocal(name)))
                } else {
                    Err(SemanticError::StraySlot { span: elem.span })
                }
            }
        }
    }

    fn lambda(&mut self, l: &Lambda) -> Result<RcOp, SemanticError> {
        let mut slots = Vec::new();
        collect_slots(l.body.as_ref(), &mut slots);
        let params: Vec<String> = slots.iter().map(|&i| slot_name(i)).collect();
        let particles: Vec<String> = slots
            .iter()
            .enumerate()
            .map(|(k, _)| SLOT_PARTICLES[k].to_string())
            .collect();
        let mut frame = Frame::new(FrameKind::Function);
        for p in &params {
            frame.names.insert(p.clone(), Binding::Var);
        }
        self.scopes.push(frame);
        let body = self.element(l.body.as_ref());
        self.scopes.pop();
        Ok(Rc::new(Op::MakeFunc {
            name: None,
            particles,
            params,
            body: body?,
        }))
    }
}

/// Slots in order of first appearance; a nested lambda owns its own.
fn collect_slots(elem: &Sp<Element>, out: &mut Vec<usize>) {
    match &elem.inner {
        | Element::Slot(i) => {
            if !out.contains(i) {
                out.push(*i);
            }
        }
        | Element::Binary(b) => {
            collect_slots(b.lhs.as_ref(), out);
            collect_slots(b.rhs.as_ref(), out);
        }
        | Element::Unary(u) => collect_slots(u.arg.as_ref(), out),
        | Element::Property(p) => collect_slots(p.base.as_ref(), out),
        | Element::Lit(_) | Element::Symbol(_) | Element::Lambda(_) => {}
    }
}

fn slot_name(i: usize) -> String {
    SLOT_MARKS[i].to_string()
}

fn is_placeholder(elem: &Sp<Element>) -> bool {
    matches!(elem.inner, Element::Lit(Literal::Null))
}

fn load_pipe() -> RcOp {
    Rc::new(Op::LoadLocal(PIPE.to_string()))
}

fn lit_value(lit: &Literal) -> Value {
    match lit {
        | Literal::Str(s) => Value::str(s.clone()),
        | Literal::Int(n) => Value::Int(*n as i64),
        | Literal::Long(n) => Value::Int(*n),
        | Literal::Big(n) => Value::big(n.clone()),
        | Literal::Float(x) => Value::Float(*x),
        | Literal::Bool(b) => Value::Bool(*b),
        | Literal::Null => Value::Null,
    }
}

/// A caller-surplus argument group folds into one right-nested chain.
fn fold_ops(ops: Vec<RcOp>) -> RcOp {
    let mut iter = ops.into_iter().rev();
    let Some(mut acc) = iter.next() else {
        return Rc::new(Op::Const(Value::Null));
    };
    for op in iter {
        acc = Rc::new(Op::Binary { op: Operator::Cons, lhs: op, rhs: acc });
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use kotoha_surface::{Lexer, Parser};

    fn gen(src: &str) -> ExecutableForm {
        let prog = Parser::new(Lexer::new(src)).parse_program().unwrap();
        generate(&prog).unwrap()
    }

    fn gen_err(src: &str) -> SemanticError {
        let prog = Parser::new(Lexer::new(src)).parse_program().unwrap();
        generate(&prog).unwrap_err()
    }

    #[test]
    fn self_tail_call_becomes_a_loop() {
        let form = gen(
            "以下の手順で、AがBを加算する。\
             もしA≦0ならばBを返却する。\
             そうでなければA−1がB＋1を加算する。\
             以上。",
        );
        let Op::Seq(top) = &*form.root else { panic!() };
        let Op::StoreGlobal(name, mk) = &*top[0] else { panic!() };
        assert_eq!(name, "加算");
        let Op::MakeFunc { body, .. } = &**mk else { panic!() };
        assert!(matches!(**body, Op::Loop { .. }), "got {body:?}");
    }

    #[test]
    fn non_tail_self_call_stays_a_call() {
        let form = gen(
            "以下の手順で、Aを累算する。\
             もしA≦1ならば1を返却する。\
             A−1を累算し、Bとする。\
             A＋Bを返却する。\
             以上。",
        );
        let Op::Seq(top) = &*form.root else { panic!() };
        let Op::StoreGlobal(_, mk) = &*top[0] else { panic!() };
        let Op::MakeFunc { body, .. } = &**mk else { panic!() };
        assert!(!matches!(**body, Op::Loop { .. }));
    }

    #[test]
    fn phrase_chain_threads_the_pipe() {
        let form = gen("3を二倍し、五倍する。");
        let Op::Seq(top) = &*form.root else { panic!() };
        let Op::Seq(chain) = &*top[0] else { panic!() };
        assert_eq!(chain.len(), 2);
        let Op::StoreLocal(slot, second) = &*chain[1] else { panic!() };
        assert_eq!(slot, PIPE);
        let Op::CallDynamic { pipe, .. } = &**second else { panic!() };
        assert!(pipe.is_some());
    }

    #[test]
    fn leading_placeholder_has_no_value() {
        let err = gen_err("を二倍する。");
        assert!(matches!(err, SemanticError::NoValue { .. }));
    }

    #[test]
    fn local_redefinition_is_rejected() {
        let err = gen_err(
            "以下の手順で、Aを試験する。\
             1をBとする。2をBとする。\
             以上。",
        );
        assert!(matches!(err, SemanticError::Redefinition { .. }));
    }

    #[test]
    fn assignment_rebinds_without_error() {
        gen("以下の手順で、Aを試験する。1がBとなる。2がBとなる。以上。");
    }

    #[test]
    fn stray_slot_is_rejected() {
        let err = gen_err("□を二倍する。");
        assert!(matches!(err, SemanticError::StraySlot { .. }));
    }

    #[test]
    fn definition_binds_exactly_one_value() {
        let err = gen_err("1を2にBとする。");
        assert!(matches!(err, SemanticError::MalformedAggregation { .. }));
    }

    #[test]
    fn lambda_slots_take_default_particles() {
        let form = gen("【□＋△】を加算とする。");
        let Op::Seq(top) = &*form.root else { panic!() };
        let Op::Seq(chain) = &*top[0] else { panic!() };
        let Op::StoreLocal(_, store) = &*chain[0] else { panic!() };
        let Op::StoreGlobal(name, mk) = &**store else { panic!() };
        assert_eq!(name, "加算");
        let Op::MakeFunc { particles, params, .. } = &**mk else { panic!() };
        assert_eq!(particles, &["を".to_string(), "に".to_string()]);
        assert_eq!(params, &["□".to_string(), "△".to_string()]);
    }
}
