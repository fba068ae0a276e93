use num_bigint::BigInt;
use std::fmt::Display;

/// Literal payloads. Integers are promoted at lexing time: `i32`, then
/// `i64`, then arbitrary precision.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i32),
    Long(i64),
    Big(BigInt),
    Float(f64),
    Bool(bool),
    Null,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Concat,
    Cons,
    Not,
    /// Maximal-munch run over the operator charset that matched no
    /// known spelling.
    Unknown(String),
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            | Operator::Add => write!(f, "＋"),
            | Operator::Sub => write!(f, "−"),
            | Operator::Mul => write!(f, "×"),
            | Operator::Div => write!(f, "÷"),
            | Operator::Mod => write!(f, "％"),
            | Operator::Eq => write!(f, "＝"),
            | Operator::Ne => write!(f, "≠"),
            | Operator::Lt => write!(f, "＜"),
            | Operator::Gt => write!(f, "＞"),
            | Operator::Le => write!(f, "≦"),
            | Operator::Ge => write!(f, "≧"),
            | Operator::And => write!(f, "∧"),
            | Operator::Or => write!(f, "∨"),
            | Operator::Concat => write!(f, "＆"),
            | Operator::Cons => write!(f, "："),
            | Operator::Not => write!(f, "！"),
            | Operator::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Reserved control words. The kana-spelled ones are reached through
/// kana-run splitting in the lexer, the kanji-spelled ones through the
/// identifier path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reserved {
    /// する, the plain call verb
    Do,
    /// し, the continuative call verb
    DoAnd,
    /// してみる, the best-effort call verb
    Try,
    /// なる, the assignment verb
    Become,
    /// それぞれ, the map marker
    Each,
    /// もし
    If,
    /// ならば
    Then,
    /// そうでなければ
    Else,
    /// 手順
    Procedure,
    /// 以下
    Below,
    /// 以上
    Above,
    /// 実行
    Execute,
    /// 返却
    Return,
}

impl Reserved {
    pub fn spelling(self) -> &'static str {
        match self {
            | Reserved::Do => "する",
            | Reserved::DoAnd => "し",
            | Reserved::Try => "してみる",
            | Reserved::Become => "なる",
            | Reserved::Each => "それぞれ",
            | Reserved::If => "もし",
            | Reserved::Then => "ならば",
            | Reserved::Else => "そうでなければ",
            | Reserved::Procedure => "手順",
            | Reserved::Below => "以下",
            | Reserved::Above => "以上",
            | Reserved::Execute => "実行",
            | Reserved::Return => "返却",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bracket {
    ParenOpen,
    ParenClose,
    ListOpen,
    ListClose,
    LambdaOpen,
    LambdaClose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Punct {
    /// `。`
    Period,
    /// `、`
    Comma,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Symbol(String),
    Particle(String),
    Lit(Literal),
    Op(Operator),
    Reserved(Reserved),
    Punct(Punct),
    Bracket(Bracket),
    /// Lambda slot, by slot-marker index (□△○◇).
    Slot(usize),
    Eof,
}

pub const SLOT_MARKS: [char; 4] = ['□', '△', '○', '◇'];

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            | Token::Symbol(s) => write!(f, "{}", s),
            | Token::Particle(p) => write!(f, "{}", p),
            | Token::Lit(Literal::Str(s)) => write!(f, "「{}」", s),
            | Token::Lit(Literal::Int(n)) => write!(f, "{}", n),
            | Token::Lit(Literal::Long(n)) => write!(f, "{}", n),
            | Token::Lit(Literal::Big(n)) => write!(f, "{}", n),
            | Token::Lit(Literal::Float(x)) => write!(f, "{}", x),
            | Token::Lit(Literal::Bool(b)) => write!(f, "{}", b),
            | Token::Lit(Literal::Null) => write!(f, "無"),
            | Token::Op(op) => write!(f, "{}", op),
            | Token::Reserved(r) => write!(f, "{}", r.spelling()),
            | Token::Punct(Punct::Period) => write!(f, "。"),
            | Token::Punct(Punct::Comma) => write!(f, "、"),
            | Token::Bracket(Bracket::ParenOpen) => write!(f, "("),
            | Token::Bracket(Bracket::ParenClose) => write!(f, ")"),
            | Token::Bracket(Bracket::ListOpen) => write!(f, "［"),
            | Token::Bracket(Bracket::ListClose) => write!(f, "］"),
            | Token::Bracket(Bracket::LambdaOpen) => write!(f, "【"),
            | Token::Bracket(Bracket::LambdaClose) => write!(f, "】"),
            | Token::Slot(i) => write!(f, "{}", SLOT_MARKS[*i]),
            | Token::Eof => write!(f, "<eof>"),
        }
    }
}
