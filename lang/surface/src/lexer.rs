use crate::err::LexError;
use crate::token::{Bracket, Literal, Operator, Punct, Reserved, Token, SLOT_MARKS};
use kotoha_utils::span::{Span, Sp};
use num_bigint::BigInt;

/// The particles the resolver recognizes. `の` additionally drives the
/// property-access layer in the parser; `と` doubles as the
/// cons-conjunction at call sites.
pub const PARTICLES: [&str; 12] =
    ["が", "を", "に", "で", "と", "へ", "から", "まで", "より", "は", "も", "の"];

/// Kana-spelled reserved words, longest first so suffix splitting is
/// maximal-munch.
const KANA_RESERVED: [(&str, Reserved); 8] = [
    ("そうでなければ", Reserved::Else),
    ("してみる", Reserved::Try),
    ("それぞれ", Reserved::Each),
    ("ならば", Reserved::Then),
    ("もし", Reserved::If),
    ("する", Reserved::Do),
    ("なる", Reserved::Become),
    ("し", Reserved::DoAnd),
];

const KANJI_RESERVED: [(&str, Reserved); 5] = [
    ("手順", Reserved::Procedure),
    ("以下", Reserved::Below),
    ("以上", Reserved::Above),
    ("実行", Reserved::Execute),
    ("返却", Reserved::Return),
];

const OPERATORS: [(&str, Operator); 34] = [
    ("＋", Operator::Add),
    ("+", Operator::Add),
    ("−", Operator::Sub),
    ("－", Operator::Sub),
    ("-", Operator::Sub),
    ("×", Operator::Mul),
    ("*", Operator::Mul),
    ("÷", Operator::Div),
    ("/", Operator::Div),
    ("％", Operator::Mod),
    ("%", Operator::Mod),
    ("＝", Operator::Eq),
    ("=", Operator::Eq),
    ("==", Operator::Eq),
    ("≠", Operator::Ne),
    ("!=", Operator::Ne),
    ("≦", Operator::Le),
    ("<=", Operator::Le),
    ("≧", Operator::Ge),
    (">=", Operator::Ge),
    ("＜", Operator::Lt),
    ("<", Operator::Lt),
    ("＞", Operator::Gt),
    (">", Operator::Gt),
    ("！", Operator::Not),
    ("!", Operator::Not),
    ("＆", Operator::Concat),
    ("&", Operator::Concat),
    ("：", Operator::Cons),
    (":", Operator::Cons),
    ("∧", Operator::And),
    ("&&", Operator::And),
    ("∨", Operator::Or),
    ("||", Operator::Or),
];

fn operator_of(text: &str) -> Option<Operator> {
    OPERATORS.iter().find(|(s, _)| *s == text).map(|(_, op)| op.clone())
}

fn is_operator_char(c: char) -> bool {
    "＋+−－-×*÷/％%＝=≠≦≧＜<＞>！!＆&：:∧∨|".contains(c)
}

fn is_hiragana(c: char) -> bool {
    ('\u{3041}'..='\u{3096}').contains(&c)
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

fn normalize_digit(c: char) -> char {
    if ('０'..='９').contains(&c) {
        char::from(b'0' + (c as u32 - '０' as u32) as u8)
    } else {
        c
    }
}

fn is_ident_start(c: char) -> bool {
    // kanji, katakana, latin (half- and full-width); hiragana is the
    // postposition path, never identifier material
    ('\u{4e00}'..='\u{9fff}').contains(&c)
        || ('\u{3400}'..='\u{4dbf}').contains(&c)
        || ('\u{30a1}'..='\u{30fa}').contains(&c)
        || c == 'ー'
        || c == '々'
        || c.is_ascii_alphabetic()
        || ('Ａ'..='Ｚ').contains(&c)
        || ('ａ'..='ｚ').contains(&c)
        || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || is_digit(c)
}

enum KanaPiece {
    Particle(String),
    Reserved(Reserved),
}

impl KanaPiece {
    fn len(&self) -> usize {
        match self {
            | KanaPiece::Particle(p) => p.chars().count(),
            | KanaPiece::Reserved(r) => r.spelling().chars().count(),
        }
    }
    fn into_token(self) -> Token {
        match self {
            | KanaPiece::Particle(p) => Token::Particle(p),
            | KanaPiece::Reserved(r) => Token::Reserved(r),
        }
    }
}

/// Decompose a greedily read kana run into particle/reserved pieces.
/// A run is either a reserved word, a particle, or a decomposable
/// prefix followed by a reserved suffix (`とする` → と + する,
/// `をそれぞれ` → を + それぞれ, `そうでなければもし` → two keywords).
fn split_kana(run: &[char]) -> Option<Vec<KanaPiece>> {
    if run.is_empty() {
        return Some(Vec::new());
    }
    let s: String = run.iter().collect();
    if let Some(&(_, r)) = KANA_RESERVED.iter().find(|(w, _)| *w == s) {
        return Some(vec![KanaPiece::Reserved(r)]);
    }
    if PARTICLES.contains(&s.as_str()) {
        return Some(vec![KanaPiece::Particle(s)]);
    }
    for (w, r) in KANA_RESERVED {
        if s.ends_with(w) {
            let cut = run.len() - w.chars().count();
            if let Some(mut pieces) = split_kana(&run[..cut]) {
                pieces.push(KanaPiece::Reserved(r));
                return Some(pieces);
            }
        }
    }
    None
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    /// LIFO buffer for synthesized tokens produced by kana-run
    /// splitting; popped before the character stream is consulted.
    pushback: Vec<Sp<Token>>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer { chars: source.chars().collect(), pos: 0, pushback: Vec::new() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, k: usize) -> Option<char> {
        self.chars.get(self.pos + k).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Produce the next token; `Token::Eof` at end of input, never an
    /// absent token.
    pub fn next_token(&mut self) -> Result<Sp<Token>, LexError> {
        if let Some(t) = self.pushback.pop() {
            return Ok(t);
        }
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Span::new(start, start).make(Token::Eof));
        };
        match c {
            | '「' | '"' => self.read_string(),
            | '。' | '.' => {
                self.bump();
                Ok(Span::new(start, self.pos).make(Token::Punct(Punct::Period)))
            }
            | '、' | ',' => {
                self.bump();
                Ok(Span::new(start, self.pos).make(Token::Punct(Punct::Comma)))
            }
            | '(' => self.bracket(Bracket::ParenOpen),
            | ')' => self.bracket(Bracket::ParenClose),
            | '[' | '［' => self.bracket(Bracket::ListOpen),
            | ']' | '］' => self.bracket(Bracket::ListClose),
            | '【' => self.bracket(Bracket::LambdaOpen),
            | '】' => self.bracket(Bracket::LambdaClose),
            | c if is_digit(c) => self.read_number(),
            | c if is_operator_char(c) => self.read_operator(),
            | c if SLOT_MARKS.contains(&c) => {
                self.bump();
                let idx = SLOT_MARKS.iter().position(|&m| m == c).unwrap();
                Ok(Span::new(start, self.pos).make(Token::Slot(idx)))
            }
            | c if is_hiragana(c) => self.read_kana_run(),
            | c if is_ident_start(c) => self.read_identifier(),
            | c => Err(LexError::Unrecognized { ch: c, span: Span::new(start, start + 1) }),
        }
    }

    fn bracket(&mut self, b: Bracket) -> Result<Sp<Token>, LexError> {
        let start = self.pos;
        self.bump();
        Ok(Span::new(start, self.pos).make(Token::Bracket(b)))
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                | Some(c) if c.is_whitespace() || c == '　' => {
                    self.bump();
                }
                | Some('※') => {
                    let start = self.pos;
                    self.bump();
                    loop {
                        match self.bump() {
                            | Some('※') => break,
                            | Some(_) => {}
                            | None => {
                                return Err(LexError::UnterminatedComment {
                                    span: Span::new(start, start + 1),
                                });
                            }
                        }
                    }
                }
                | Some('（') => {
                    let start = self.pos;
                    self.bump();
                    let mut depth = 1usize;
                    loop {
                        match self.bump() {
                            | Some('（') => depth += 1,
                            | Some('）') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            | Some(_) => {}
                            | None => {
                                return Err(LexError::UnterminatedComment {
                                    span: Span::new(start, start + 1),
                                });
                            }
                        }
                    }
                }
                | _ => return Ok(()),
            }
        }
    }

    fn read_string(&mut self) -> Result<Sp<Token>, LexError> {
        let start = self.pos;
        let open = self.bump().unwrap();
        let close = if open == '「' { '」' } else { '"' };
        let mut text = String::new();
        loop {
            match self.bump() {
                | Some(c) if c == close => break,
                | Some(c) => text.push(c),
                | None => {
                    // report the opening quote, not end of input
                    return Err(LexError::UnterminatedString {
                        span: Span::new(start, start + 1),
                    });
                }
            }
        }
        Ok(Span::new(start, self.pos).make(Token::Lit(Literal::Str(text))))
    }

    fn read_number(&mut self) -> Result<Sp<Token>, LexError> {
        let start = self.pos;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_digit(c) {
                text.push(normalize_digit(c));
                self.bump();
            } else {
                break;
            }
        }
        let is_point = |c| c == '.' || c == '．';
        if self.peek().is_some_and(is_point) && self.peek_at(1).is_some_and(is_digit) {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if is_digit(c) {
                    text.push(normalize_digit(c));
                    self.bump();
                } else {
                    break;
                }
            }
            let value: f64 = text.parse().map_err(|_| LexError::MalformedNumber {
                text: text.clone(),
                span: Span::new(start, self.pos),
            })?;
            return Ok(Span::new(start, self.pos).make(Token::Lit(Literal::Float(value))));
        }
        // i32, then i64, then arbitrary precision
        let lit = if let Ok(n) = text.parse::<i32>() {
            Literal::Int(n)
        } else if let Ok(n) = text.parse::<i64>() {
            Literal::Long(n)
        } else {
            let n: BigInt = text.parse().map_err(|_| LexError::MalformedNumber {
                text: text.clone(),
                span: Span::new(start, self.pos),
            })?;
            Literal::Big(n)
        };
        Ok(Span::new(start, self.pos).make(Token::Lit(lit)))
    }

    fn read_operator(&mut self) -> Result<Sp<Token>, LexError> {
        let start = self.pos;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_operator_char(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let op = operator_of(&text).unwrap_or(Operator::Unknown(text));
        Ok(Span::new(start, self.pos).make(Token::Op(op)))
    }

    fn read_kana_run(&mut self) -> Result<Sp<Token>, LexError> {
        let start = self.pos;
        let mut run = Vec::new();
        while let Some(c) = self.peek() {
            if is_hiragana(c) {
                run.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let pieces = match split_kana(&run) {
            | Some(pieces) => pieces,
            // an undecomposable run is a postposition candidate as a whole
            | None => vec![KanaPiece::Particle(run.iter().collect())],
        };
        let mut spanned = Vec::new();
        let mut at = start;
        for piece in pieces {
            let end = at + piece.len();
            spanned.push(Span::new(at, end).make(piece.into_token()));
            at = end;
        }
        let first = spanned.remove(0);
        // push back the synthesized remainder, LIFO
        for t in spanned.into_iter().rev() {
            self.pushback.push(t);
        }
        Ok(first)
    }

    fn read_identifier(&mut self) -> Result<Sp<Token>, LexError> {
        let start = self.pos;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let tok = match KANJI_RESERVED.iter().find(|(w, _)| *w == text) {
            | Some(&(_, r)) => Token::Reserved(r),
            | None => Token::Symbol(text),
        };
        Ok(Span::new(start, self.pos).make(tok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().unwrap();
            if t.inner == Token::Eof {
                break;
            }
            out.push(t.inner);
        }
        out
    }

    #[test]
    fn lexes_a_lambda_definition() {
        let got = toks("【□＋△】を加算とする。");
        assert_eq!(
            got,
            vec![
                Token::Bracket(Bracket::LambdaOpen),
                Token::Slot(0),
                Token::Op(Operator::Add),
                Token::Slot(1),
                Token::Bracket(Bracket::LambdaClose),
                Token::Particle("を".into()),
                Token::Symbol("加算".into()),
                Token::Particle("と".into()),
                Token::Reserved(Reserved::Do),
                Token::Punct(Punct::Period),
            ]
        );
    }

    #[test]
    fn splits_fused_map_keyword() {
        let got = toks("をそれぞれ");
        assert_eq!(
            got,
            vec![Token::Particle("を".into()), Token::Reserved(Reserved::Each)]
        );
    }

    #[test]
    fn splits_fused_keywords_and_keeps_spans() {
        let mut lexer = Lexer::new("とする");
        let a = lexer.next_token().unwrap();
        assert_eq!(a.inner, Token::Particle("と".into()));
        assert_eq!((a.span.start, a.span.end), (0, 1));
        let b = lexer.next_token().unwrap();
        assert_eq!(b.inner, Token::Reserved(Reserved::Do));
        assert_eq!((b.span.start, b.span.end), (1, 3));
    }

    #[test]
    fn splits_chained_keywords() {
        let got = toks("そうでなければもし");
        assert_eq!(
            got,
            vec![Token::Reserved(Reserved::Else), Token::Reserved(Reserved::If)]
        );
    }

    #[test]
    fn keeps_whole_run_as_particle_when_undecomposable() {
        let got = toks("ずつ");
        assert_eq!(got, vec![Token::Particle("ずつ".into())]);
    }

    #[test]
    fn promotes_integers_by_width() {
        assert_eq!(toks("12"), vec![Token::Lit(Literal::Int(12))]);
        assert_eq!(
            toks("3000000000"),
            vec![Token::Lit(Literal::Long(3_000_000_000))]
        );
        let big = "123456789012345678901234567890";
        assert_eq!(
            toks(big),
            vec![Token::Lit(Literal::Big(big.parse().unwrap()))]
        );
    }

    #[test]
    fn reads_full_width_digits_and_floats() {
        assert_eq!(toks("１２３"), vec![Token::Lit(Literal::Int(123))]);
        assert_eq!(toks("1．5"), vec![Token::Lit(Literal::Float(1.5))]);
    }

    #[test]
    fn unterminated_string_reports_the_opening_quote() {
        let mut lexer = Lexer::new("10を「あい");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(
            err,
            LexError::UnterminatedString { span: Span::new(3, 4) }
        );
    }

    #[test]
    fn unknown_operators_are_munched_whole() {
        assert_eq!(
            toks("<>"),
            vec![Token::Op(Operator::Unknown("<>".into()))]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            toks("1※注釈※＋（中（の）注）2"),
            vec![
                Token::Lit(Literal::Int(1)),
                Token::Op(Operator::Add),
                Token::Lit(Literal::Int(2)),
            ]
        );
    }

    #[test]
    fn reserved_kanji_words() {
        assert_eq!(
            toks("以下の手順で"),
            vec![
                Token::Reserved(Reserved::Below),
                Token::Particle("の".into()),
                Token::Reserved(Reserved::Procedure),
                Token::Particle("で".into()),
            ]
        );
    }
}
