use crate::token::{Literal, Operator};
use derive_more::From;
use kotoha_utils::span::Sp;
use std::rc::Rc;

/// A postposition tag, e.g. `が`, `を`, `に`.
pub type Particle = String;

pub type RcElem = Rc<Sp<Element>>;

/* --------------------------------- Element -------------------------------- */

#[derive(Clone, Debug, PartialEq)]
pub struct Binary {
    pub op: Operator,
    pub lhs: RcElem,
    pub rhs: RcElem,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Unary {
    pub op: Operator,
    pub arg: RcElem,
}

/// `対象の項目`: property read.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub base: RcElem,
    pub field: String,
}

/// `【□＋△】`: an anonymous function whose parameters are its slots
/// in order of first appearance.
#[derive(Clone, Debug, PartialEq)]
pub struct Lambda {
    pub body: RcElem,
}

#[derive(From, Clone, Debug, PartialEq)]
pub enum Element {
    Lit(Literal),
    Symbol(String),
    Binary(Binary),
    Unary(Unary),
    Property(Property),
    Lambda(Lambda),
    /// Lambda slot by marker index; legal only inside a lambda body.
    Slot(usize),
}

/* --------------------------------- Phrase --------------------------------- */

/// One `(element, particle)` call argument. The element is a null
/// literal when the source wrote a bare particle; the generator fills
/// it with the previous phrase's result.
pub type Argument = (Sp<Element>, Particle);

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub callee: Sp<Element>,
    pub args: Vec<Argument>,
    /// してみる: argument-resolution failures yield null.
    pub maybe: bool,
    /// それぞれ: broadcast over the argument at this index.
    pub map: Option<usize>,
}

/// `値を名前とする`: bind under a (new) name.
#[derive(Clone, Debug, PartialEq)]
pub struct DefineValue {
    pub name: Sp<String>,
    /// Pairs preceding the name pair; empty means the previous
    /// phrase's result is the value.
    pub args: Vec<Argument>,
}

/// `値が名前となる`.
#[derive(Clone, Debug, PartialEq)]
pub struct Assign {
    pub name: Sp<String>,
    pub args: Vec<Argument>,
}

/// `値を対象の項目とする`: property write.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertySet {
    pub target: Sp<Property>,
    pub args: Vec<Argument>,
}

#[derive(From, Clone, Debug, PartialEq)]
pub enum Phrase {
    Call(Call),
    DefineValue(DefineValue),
    Assign(Assign),
    PropertySet(PropertySet),
}

/* -------------------------------- Statement ------------------------------- */

#[derive(Clone, Debug, PartialEq)]
pub struct If {
    pub cond: Sp<Element>,
    pub then: Box<Sp<Statement>>,
    pub els: Option<Box<Sp<Statement>>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Defun {
    pub name: Sp<String>,
    /// Ordered (parameter name, particle) pairs; the same shape the
    /// resolver matches call arguments against.
    pub params: Vec<(String, Particle)>,
    pub body: Vec<Sp<Statement>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockExec {
    pub body: Vec<Sp<Statement>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Return {
    pub value: Option<Sp<Element>>,
}

#[derive(From, Clone, Debug, PartialEq)]
pub enum Statement {
    If(If),
    Defun(Defun),
    BlockExec(BlockExec),
    Return(Return),
    /// A comma-separated phrase chain ending in `。`; each phrase's
    /// result feeds the next as the pipe value.
    Phrases(Vec<Sp<Phrase>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub body: Vec<Sp<Statement>>,
}
