use crate::ast::*;
use crate::err::SyntaxError;
use crate::lexer::Lexer;
use crate::token::{Bracket, Literal, Operator, Punct, Reserved, Token};
use kotoha_utils::span::{Span, Sp};
use std::rc::Rc;

/// Recursive-descent parser over a lazily lexed, position-restartable
/// token stream. `try_*` helpers advance or return a sentinel; the
/// `expect_*` family raises a located syntax error.
pub struct Parser {
    lexer: Lexer,
    cache: Vec<Sp<Token>>,
    pos: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser { lexer, cache: Vec::new(), pos: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();
        while !self.at_eof()? {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    /* ------------------------------- Stream ------------------------------- */

    fn fill(&mut self) -> Result<(), SyntaxError> {
        while self.cache.len() <= self.pos {
            let t = self.lexer.next_token()?;
            self.cache.push(t);
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<&Sp<Token>, SyntaxError> {
        self.fill()?;
        Ok(&self.cache[self.pos])
    }

    fn bump(&mut self) -> Result<Sp<Token>, SyntaxError> {
        self.fill()?;
        let t = self.cache[self.pos].clone();
        if t.inner != Token::Eof {
            self.pos += 1;
        }
        Ok(t)
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    fn at_eof(&mut self) -> Result<bool, SyntaxError> {
        Ok(self.peek()?.inner == Token::Eof)
    }

    fn unexpected<T>(&mut self, expected: &str) -> Result<T, SyntaxError> {
        let t = self.peek()?;
        if t.inner == Token::Eof {
            Err(SyntaxError::UnexpectedEof { expected: expected.to_string(), span: t.span })
        } else {
            Err(SyntaxError::Unexpected {
                expected: expected.to_string(),
                found: t.inner.to_string(),
                span: t.span,
            })
        }
    }

    /* ----------------------------- Combinators ---------------------------- */

    fn eat(&mut self, tok: &Token) -> Result<bool, SyntaxError> {
        if &self.peek()?.inner == tok {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_reserved(&mut self, r: Reserved) -> Result<bool, SyntaxError> {
        self.eat(&Token::Reserved(r))
    }

    fn expect(&mut self, tok: Token, what: &str) -> Result<Span, SyntaxError> {
        if &self.peek()?.inner == &tok {
            Ok(self.bump()?.span)
        } else {
            self.unexpected(what)
        }
    }

    fn expect_reserved(&mut self, r: Reserved) -> Result<Span, SyntaxError> {
        self.expect(Token::Reserved(r), r.spelling())
    }

    fn expect_period(&mut self) -> Result<Span, SyntaxError> {
        self.expect(Token::Punct(Punct::Period), "。")
    }

    fn expect_particle(&mut self, p: &str) -> Result<Span, SyntaxError> {
        self.expect(Token::Particle(p.to_string()), p)
    }

    fn try_particle(&mut self) -> Result<Option<Sp<String>>, SyntaxError> {
        match &self.peek()?.inner {
            | Token::Particle(_) => {
                let t = self.bump()?;
                match t.inner {
                    | Token::Particle(p) => Ok(Some(t.span.make(p))),
                    | _ => unreachable!(),
                }
            }
            | _ => Ok(None),
        }
    }

    fn try_symbol(&mut self) -> Result<Option<Sp<String>>, SyntaxError> {
        match &self.peek()?.inner {
            | Token::Symbol(_) => {
                let t = self.bump()?;
                match t.inner {
                    | Token::Symbol(s) => Ok(Some(t.span.make(s))),
                    | _ => unreachable!(),
                }
            }
            | _ => Ok(None),
        }
    }

    fn try_op(&mut self, ops: &[Operator]) -> Result<Option<Sp<Operator>>, SyntaxError> {
        match &self.peek()?.inner {
            | Token::Op(op) if ops.contains(op) => {
                let t = self.bump()?;
                match t.inner {
                    | Token::Op(op) => Ok(Some(t.span.make(op))),
                    | _ => unreachable!(),
                }
            }
            | _ => Ok(None),
        }
    }

    /* ----------------------------- Statements ----------------------------- */

    pub fn parse_statement(&mut self) -> Result<Sp<Statement>, SyntaxError> {
        match self.peek()?.inner {
            | Token::Reserved(Reserved::If) => self.parse_if(),
            | Token::Reserved(Reserved::Below) => self.parse_below(),
            | _ => {
                if let Some(stmt) = self.try_return()? {
                    Ok(stmt)
                } else {
                    self.parse_phrases()
                }
            }
        }
    }

    fn parse_if(&mut self) -> Result<Sp<Statement>, SyntaxError> {
        let start = self.expect_reserved(Reserved::If)?;
        let cond = self.parse_element()?;
        self.expect_reserved(Reserved::Then)?;
        self.eat(&Token::Punct(Punct::Comma))?;
        let then = self.parse_statement()?;
        let mut span = start.join(then.span);
        let els = if self.eat_reserved(Reserved::Else)? {
            self.eat(&Token::Punct(Punct::Comma))?;
            let els = self.parse_statement()?;
            span = span.join(els.span);
            Some(Box::new(els))
        } else {
            None
        };
        Ok(span.make(If { cond, then: Box::new(then), els }.into()))
    }

    /// `以下の手順で…` (function definition) or `以下を実行する…`
    /// (block-execute); both close with `以上。`.
    fn parse_below(&mut self) -> Result<Sp<Statement>, SyntaxError> {
        let start = self.expect_reserved(Reserved::Below)?;
        match self.try_particle()? {
            | Some(p) if p.inner == "の" => {
                self.expect_reserved(Reserved::Procedure)?;
                self.expect_particle("で")?;
                self.eat(&Token::Punct(Punct::Comma))?;
                let mut params = Vec::new();
                loop {
                    let mark = self.mark();
                    if let Some(sym) = self.try_symbol()? {
                        if let Some(particle) = self.try_particle()? {
                            params.push((sym.inner, particle.inner));
                            continue;
                        }
                    }
                    self.reset(mark);
                    break;
                }
                let name = match self.try_symbol()? {
                    | Some(name) => name,
                    | None => return self.unexpected("function name"),
                };
                self.expect_reserved(Reserved::Do)?;
                self.expect_period()?;
                let (body, end) = self.parse_body()?;
                Ok(start.join(end).make(Defun { name, params, body }.into()))
            }
            | Some(p) if p.inner == "を" => {
                self.expect_reserved(Reserved::Execute)?;
                self.expect_reserved(Reserved::Do)?;
                self.expect_period()?;
                let (body, end) = self.parse_body()?;
                Ok(start.join(end).make(BlockExec { body }.into()))
            }
            | _ => self.unexpected("の or を"),
        }
    }

    /// Statements up to the closing `以上。`.
    fn parse_body(&mut self) -> Result<(Vec<Sp<Statement>>, Span), SyntaxError> {
        let mut body = Vec::new();
        loop {
            if self.at_eof()? {
                return self.unexpected("以上");
            }
            if self.eat_reserved(Reserved::Above)? {
                let end = self.expect_period()?;
                return Ok((body, end));
            }
            body.push(self.parse_statement()?);
        }
    }

    /// `値を返却する。`; backtracks wholesale when the shape does not
    /// match, since the opening element is ambiguous with a phrase.
    fn try_return(&mut self) -> Result<Option<Sp<Statement>>, SyntaxError> {
        let mark = self.mark();
        let attempt = (|| -> Result<Sp<Statement>, SyntaxError> {
            let start = self.peek()?.span;
            let value = if self.peek()?.inner == Token::Reserved(Reserved::Return) {
                None
            } else {
                let elem = self.parse_element()?;
                self.expect_particle("を")?;
                Some(elem)
            };
            self.expect_reserved(Reserved::Return)?;
            self.expect_reserved(Reserved::Do)?;
            let end = self.expect_period()?;
            Ok(start.join(end).make(Return { value }.into()))
        })();
        match attempt {
            | Ok(stmt) => Ok(Some(stmt)),
            // lexical failures cannot be replayed, only token
            // mismatches backtrack
            | Err(err @ SyntaxError::Lex(_)) => Err(err),
            | Err(err) => {
                log::trace!("not a return statement ({err}), backtracking");
                self.reset(mark);
                Ok(None)
            }
        }
    }

    fn parse_phrases(&mut self) -> Result<Sp<Statement>, SyntaxError> {
        let mut phrases = Vec::new();
        let start = self.peek()?.span;
        let end;
        loop {
            phrases.push(self.parse_phrase()?);
            if self.eat(&Token::Punct(Punct::Comma))? {
                continue;
            }
            end = self.expect_period()?;
            break;
        }
        Ok(start.join(end).make(Statement::Phrases(phrases)))
    }

    /* ------------------------------- Phrases ------------------------------ */

    /// A phrase is `(element particle)* [callee] verb`. Classification
    /// is data-driven: the same pair sequence becomes a DefineValue,
    /// Assign or Call depending on the trailing particle and the verb
    /// spelling, tried in that order.
    fn parse_phrase(&mut self) -> Result<Sp<Phrase>, SyntaxError> {
        let start = self.peek()?.span;
        let mut pairs: Vec<Argument> = Vec::new();
        let mut map = None;
        let (callee, verb, verb_span) = loop {
            match &self.peek()?.inner {
                | Token::Particle(_) => {
                    // bare particle: placeholder for the pipe value
                    let p = self.try_particle()?.unwrap();
                    pairs.push((p.span.make(Element::Lit(Literal::Null)), p.inner));
                    if self.eat_reserved(Reserved::Each)? {
                        map = Some(pairs.len() - 1);
                    }
                }
                | Token::Reserved(
                    r @ (Reserved::Do | Reserved::DoAnd | Reserved::Try | Reserved::Become),
                ) => {
                    let r = *r;
                    let span = self.bump()?.span;
                    break (None, r, span);
                }
                | _ => {
                    let elem = self.parse_element()?;
                    match &self.peek()?.inner {
                        | Token::Particle(_) => {
                            let p = self.try_particle()?.unwrap();
                            pairs.push((elem, p.inner));
                            if self.eat_reserved(Reserved::Each)? {
                                map = Some(pairs.len() - 1);
                            }
                        }
                        | Token::Reserved(
                            r @ (Reserved::Do | Reserved::DoAnd | Reserved::Try),
                        ) => {
                            let r = *r;
                            let span = self.bump()?.span;
                            break (Some(elem), r, span);
                        }
                        | _ => return self.unexpected("particle or verb"),
                    }
                }
            }
        };
        let span = start.join(verb_span);
        match (callee, verb) {
            | (Some(callee), Reserved::Do | Reserved::DoAnd) => {
                Ok(span.make(Call { callee, args: pairs, maybe: false, map }.into()))
            }
            | (Some(callee), Reserved::Try) => {
                Ok(span.make(Call { callee, args: pairs, maybe: true, map }.into()))
            }
            | (Some(_), Reserved::Become) => self.unexpected("する"),
            | (None, Reserved::Do | Reserved::DoAnd) => {
                // `…と` + する: value definition or property write
                match pairs.pop() {
                    | Some((target, p)) if p == "と" => match target.inner {
                        | Element::Symbol(name) => Ok(span.make(
                            DefineValue { name: target.span.make(name), args: pairs }.into(),
                        )),
                        | Element::Property(prop) => Ok(span.make(
                            PropertySet { target: target.span.make(prop), args: pairs }.into(),
                        )),
                        | _ => self.unexpected("name to define"),
                    },
                    | _ => self.unexpected("defined name tagged と"),
                }
            }
            | (None, Reserved::Become) => match pairs.pop() {
                | Some((target, p)) if p == "と" => match target.inner {
                    | Element::Symbol(name) => Ok(span
                        .make(Assign { name: target.span.make(name), args: pairs }.into())),
                    | _ => self.unexpected("name to assign"),
                },
                | _ => self.unexpected("assigned name tagged と"),
            },
            | (None, Reserved::Try) => self.unexpected("callee before してみる"),
            | _ => unreachable!(),
        }
    }

    /* ------------------------------- Elements ----------------------------- */

    pub fn parse_element(&mut self) -> Result<Sp<Element>, SyntaxError> {
        self.parse_or()
    }

    fn mk_binary(&self, op: Operator, lhs: Sp<Element>, rhs: Sp<Element>) -> Sp<Element> {
        let span = lhs.span.join(rhs.span);
        span.make(Binary { op, lhs: Rc::new(lhs), rhs: Rc::new(rhs) }.into())
    }

    fn parse_or(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let lhs = self.parse_and()?;
        // parses a single ∨ then stops: the original grammar's or tier
        // loops and unconditionally breaks, making 3+ chained ∨
        // effectively non-associative; preserved as-is
        if let Some(op) = self.try_op(&[Operator::Or])? {
            let rhs = self.parse_and()?;
            return Ok(self.mk_binary(op.inner, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let mut lhs = self.parse_cmp()?;
        while let Some(op) = self.try_op(&[Operator::And])? {
            let rhs = self.parse_cmp()?;
            lhs = self.mk_binary(op.inner, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Sp<Element>, SyntaxError> {
        use Operator::*;
        let mut lhs = self.parse_cons()?;
        while let Some(op) = self.try_op(&[Eq, Ne, Lt, Gt, Le, Ge])? {
            let rhs = self.parse_cons()?;
            lhs = self.mk_binary(op.inner, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_cons(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let lhs = self.parse_concat()?;
        if let Some(op) = self.try_op(&[Operator::Cons])? {
            // right-associative
            let rhs = self.parse_cons()?;
            return Ok(self.mk_binary(op.inner, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_concat(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let lhs = self.parse_add()?;
        // single-shot, like the or tier; see parse_or
        if let Some(op) = self.try_op(&[Operator::Concat])? {
            let rhs = self.parse_add()?;
            return Ok(self.mk_binary(op.inner, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let mut lhs = self.parse_mul()?;
        while let Some(op) = self.try_op(&[Operator::Add, Operator::Sub])? {
            let rhs = self.parse_mul()?;
            lhs = self.mk_binary(op.inner, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let mut lhs = self.parse_unknown()?;
        while let Some(op) =
            self.try_op(&[Operator::Mul, Operator::Div, Operator::Mod])?
        {
            let rhs = self.parse_unknown()?;
            lhs = self.mk_binary(op.inner, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unknown(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match &self.peek()?.inner {
                | Token::Op(Operator::Unknown(_)) => {
                    let t = self.bump()?;
                    let op = match t.inner {
                        | Token::Op(op) => op,
                        | _ => unreachable!(),
                    };
                    let rhs = self.parse_unary()?;
                    lhs = self.mk_binary(op, lhs, rhs);
                }
                | _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Sp<Element>, SyntaxError> {
        if let Some(op) = self.try_op(&[Operator::Sub, Operator::Not])? {
            let arg = self.parse_unary()?;
            let span = op.span.join(arg.span);
            return Ok(span.make(Unary { op: op.inner, arg: Rc::new(arg) }.into()));
        }
        self.parse_property()
    }

    fn parse_property(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let mut base = self.parse_primary()?;
        loop {
            let mark = self.mark();
            match self.try_particle()? {
                | Some(p) if p.inner == "の" => match self.try_symbol()? {
                    | Some(field) => {
                        let span = base.span.join(field.span);
                        base = span
                            .make(Property { base: Rc::new(base), field: field.inner }.into());
                    }
                    | None => {
                        self.reset(mark);
                        break;
                    }
                },
                | _ => {
                    self.reset(mark);
                    break;
                }
            }
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Sp<Element>, SyntaxError> {
        let t = self.peek()?.clone();
        match t.inner {
            | Token::Bracket(Bracket::ParenOpen) => {
                self.bump()?;
                let inner = self.parse_element()?;
                self.expect(Token::Bracket(Bracket::ParenClose), ")")?;
                Ok(inner)
            }
            | Token::Bracket(Bracket::ListOpen) => {
                let start = self.bump()?.span;
                let mut items = Vec::new();
                if self.peek()?.inner != Token::Bracket(Bracket::ListClose) {
                    loop {
                        items.push(self.parse_element()?);
                        if !self.eat(&Token::Punct(Punct::Comma))? {
                            break;
                        }
                    }
                }
                let end = self.expect(Token::Bracket(Bracket::ListClose), "］")?;
                // a list literal is sugar for a null-terminated cons chain
                let mut acc = end.make(Element::Lit(Literal::Null));
                for item in items.into_iter().rev() {
                    acc = self.mk_binary(Operator::Cons, item, acc);
                }
                Ok(start.join(end).make(acc.inner))
            }
            | Token::Bracket(Bracket::LambdaOpen) => {
                let start = self.bump()?.span;
                let body = self.parse_element()?;
                let end = self.expect(Token::Bracket(Bracket::LambdaClose), "】")?;
                Ok(start.join(end).make(Lambda { body: Rc::new(body) }.into()))
            }
            | Token::Slot(i) => {
                let span = self.bump()?.span;
                Ok(span.make(Element::Slot(i)))
            }
            | Token::Lit(_) => {
                let t = self.bump()?;
                match t.inner {
                    | Token::Lit(lit) => Ok(t.span.make(Element::Lit(lit))),
                    | _ => unreachable!(),
                }
            }
            | Token::Symbol(_) => {
                let t = self.bump()?;
                match t.inner {
                    | Token::Symbol(s) => Ok(t.span.make(Element::Symbol(s))),
                    | _ => unreachable!(),
                }
            }
            | _ => self.unexpected("element"),
        }
    }
}
