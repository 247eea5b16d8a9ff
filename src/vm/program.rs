// src/vm/program.rs

//! Syntax tree and parser for strategy scripts.
//!
//! The language is a small JavaScript-flavoured subset: variable
//! declarations, assignment, `if`/`else`, `while`, `for`, `throw`, and
//! expressions over booleans, numbers, strings and arrays. Semicolons may be
//! omitted at the end of a line, before `}` or at the end of input.

use super::lexer::{Span, Token, TokenKind, syntax_error, tokenize};
use crate::core::ChshError;
use std::fmt;
use std::sync::Arc;

/// Deepest allowed nesting of statements and expressions.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    BitAnd,
    BitXor,
    BitOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(Arc<str>),
    Bool(bool),
    Undefined,
    Ident { name: String, span: Span },
    Array(Vec<Expr>),
    Index { target: Box<Expr>, index: Box<Expr>, span: Span },
    /// `target.name`; only `length` exists at runtime.
    Member { target: Box<Expr>, name: String, span: Span },
    /// Calls name host functions or builtins, possibly dotted (`Math.random`).
    Call { callee: String, args: Vec<Expr>, span: Span },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Logical { op: LogicalOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { test: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Assign { name: String, value: Box<Expr>, span: Span },
    /// `++x`, `x--` and friends.
    Update { name: String, delta: f64, prefix: bool, span: Span },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Empty,
    Expr(Expr),
    Block(Vec<Stmt>),
    Declare { kind: DeclKind, declarators: Vec<Declarator> },
    If { test: Expr, then: Box<Stmt>, otherwise: Option<Box<Stmt>> },
    While { test: Expr, body: Box<Stmt> },
    For { init: Option<Box<Stmt>>, test: Option<Expr>, update: Option<Expr>, body: Box<Stmt> },
    Break { span: Span },
    Continue { span: Span },
    Throw { value: Expr, span: Span },
}

/// A parsed strategy script, ready to be run any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    statements: Vec<Stmt>,
}

impl Program {
    /// Parses `source`.
    ///
    /// # Returns
    /// * `Err(ChshError::Evaluation)` with a `SyntaxError: ... at line L, column C`
    ///   message when the source is malformed or nested too deeply.
    pub fn parse(source: &str) -> Result<Program, ChshError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0, depth: 0, loop_depth: 0 };
        let mut statements = Vec::new();
        while !parser.at_eof() {
            statements.push(parser.statement()?);
        }
        Ok(Program { statements })
    }

    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }

    /// Returns the number of top-level statements.
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Strategy Program ({} statements)", self.statement_count())?;
        for (i, stmt) in self.statements.iter().enumerate() {
            writeln!(f, "  {:04}: {:?}", i, stmt)?;
        }
        Ok(())
    }
}

const KEYWORDS: &[&str] = &[
    "var", "let", "const", "if", "else", "while", "for", "break", "continue", "throw", "true",
    "false", "undefined", "function", "return", "new",
];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    loop_depth: usize,
}

type ParseResult<T> = Result<T, ChshError>;

impl Parser {
    fn current(&self) -> &Token {
        // The token list always ends with Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn previous_line(&self) -> u32 {
        self.pos.checked_sub(1).map_or(0, |p| self.tokens[p].span.line)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Punct(q) if *q == p)
    }

    fn is_keyword(&self, k: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(name) if name == k)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> ParseResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{}'", p)))
        }
    }

    fn unexpected(&self, context: &str) -> ChshError {
        let token = self.current();
        syntax_error(token.span, format!("unexpected {}, {}", token.kind, context))
    }

    fn identifier(&mut self) -> ParseResult<(String, Span)> {
        match &self.current().kind {
            TokenKind::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                let span = self.advance().span;
                Ok((name, span))
            }
            _ => Err(self.unexpected("expected an identifier")),
        }
    }

    /// Statement terminator with automatic insertion at line breaks.
    fn terminator(&mut self) -> ParseResult<()> {
        if self.eat_punct(";") || self.is_punct("}") || self.at_eof() {
            return Ok(());
        }
        if self.span().line > self.previous_line() {
            return Ok(());
        }
        Err(self.unexpected("expected ';'"))
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(syntax_error(self.span(), "nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Runs a left-associative chain whose links are counted with [`Self::link`],
    /// releasing them all when the chain ends.
    fn chained<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let depth = self.depth;
        let result = f(self);
        self.depth = depth;
        result
    }

    // Each link deepens the tree by one node, so it spends the same budget as nesting.
    fn link(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(syntax_error(self.span(), "nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    // --- Statements ---

    fn statement(&mut self) -> ParseResult<Stmt> {
        self.nested(|p| p.statement_inner())
    }

    fn statement_inner(&mut self) -> ParseResult<Stmt> {
        let span = self.span();
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        if self.eat_punct("{") {
            let mut body = Vec::new();
            while !self.is_punct("}") {
                if self.at_eof() {
                    return Err(self.unexpected("expected '}'"));
                }
                body.push(self.statement()?);
            }
            self.advance();
            return Ok(Stmt::Block(body));
        }

        let keyword = match &self.current().kind {
            TokenKind::Ident(k) => k.clone(),
            _ => String::new(),
        };
        match keyword.as_str() {
            "var" | "let" | "const" => {
                let stmt = self.declaration()?;
                self.terminator()?;
                Ok(stmt)
            }
            "if" => {
                self.advance();
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let then = Box::new(self.statement()?);
                let otherwise = if self.is_keyword("else") {
                    self.advance();
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If { test, then, otherwise })
            }
            "while" => {
                self.advance();
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.loop_body()?);
                Ok(Stmt::While { test, body })
            }
            "for" => self.for_statement(),
            "break" | "continue" => {
                self.advance();
                if self.loop_depth == 0 {
                    return Err(syntax_error(span, format!("'{}' outside of a loop", keyword)));
                }
                self.terminator()?;
                Ok(if keyword == "break" { Stmt::Break { span } } else { Stmt::Continue { span } })
            }
            "throw" => {
                self.advance();
                let value = self.expression()?;
                self.terminator()?;
                Ok(Stmt::Throw { value, span })
            }
            "function" | "return" | "new" | "else" => {
                Err(syntax_error(span, format!("'{}' is not supported", keyword)))
            }
            _ => {
                let expr = self.expression()?;
                self.terminator()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn loop_body(&mut self) -> ParseResult<Stmt> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        body
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        let kind = match &self.advance().kind {
            TokenKind::Ident(k) if k == "let" => DeclKind::Let,
            TokenKind::Ident(k) if k == "const" => DeclKind::Const,
            _ => DeclKind::Var,
        };
        let mut declarators = Vec::new();
        loop {
            let (name, span) = self.identifier()?;
            let init = if self.eat_punct("=") { Some(self.assignment()?) } else { None };
            if kind == DeclKind::Const && init.is_none() {
                return Err(syntax_error(span, "missing initializer in const declaration"));
            }
            declarators.push(Declarator { name, init, span });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::Declare { kind, declarators })
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.expect_punct("(")?;
        let init = if self.eat_punct(";") {
            None
        } else {
            let stmt = if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
                self.declaration()?
            } else {
                Stmt::Expr(self.expression()?)
            };
            self.expect_punct(";")?;
            Some(Box::new(stmt))
        };
        let test = if self.is_punct(";") { None } else { Some(self.expression()?) };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") { None } else { Some(self.expression()?) };
        self.expect_punct(")")?;
        let body = Box::new(self.loop_body()?);
        Ok(Stmt::For { init, test, update, body })
    }

    // --- Expressions, lowest precedence first ---

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        self.nested(|p| p.assignment_inner())
    }

    fn assignment_inner(&mut self) -> ParseResult<Expr> {
        let span = self.span();
        let target = self.conditional()?;

        let compound = match &self.current().kind {
            TokenKind::Punct("=") => None,
            TokenKind::Punct("+=") => Some(BinaryOp::Add),
            TokenKind::Punct("-=") => Some(BinaryOp::Sub),
            TokenKind::Punct("*=") => Some(BinaryOp::Mul),
            TokenKind::Punct("/=") => Some(BinaryOp::Div),
            TokenKind::Punct("%=") => Some(BinaryOp::Rem),
            TokenKind::Punct("&=") => Some(BinaryOp::BitAnd),
            TokenKind::Punct("|=") => Some(BinaryOp::BitOr),
            TokenKind::Punct("^=") => Some(BinaryOp::BitXor),
            _ => return Ok(target),
        };
        let Expr::Ident { name, .. } = &target else {
            return Err(syntax_error(span, "invalid assignment target"));
        };
        let name = name.clone();
        self.advance();
        let rhs = self.assignment()?;
        let value = match compound {
            None => rhs,
            Some(op) => Expr::Binary { op, lhs: Box::new(target), rhs: Box::new(rhs) },
        };
        Ok(Expr::Assign { name, value: Box::new(value), span })
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let test = self.logical_or()?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let then = self.assignment()?;
        self.expect_punct(":")?;
        let otherwise = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        self.chained(|p| {
            let mut lhs = p.logical_and()?;
            while p.eat_punct("||") {
                p.link()?;
                let rhs = p.logical_and()?;
                lhs = Expr::Logical { op: LogicalOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
            }
            Ok(lhs)
        })
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        self.chained(|p| {
            let mut lhs = p.binary_level(0)?;
            while p.eat_punct("&&") {
                p.link()?;
                let rhs = p.binary_level(0)?;
                lhs = Expr::Logical { op: LogicalOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
            }
            Ok(lhs)
        })
    }

    /// Left-associative binary operators, from `|` (level 0) to `*` (level 6).
    fn binary_level(&mut self, level: usize) -> ParseResult<Expr> {
        const LEVELS: &[&[(&str, BinaryOp)]] = &[
            &[("|", BinaryOp::BitOr)],
            &[("^", BinaryOp::BitXor)],
            &[("&", BinaryOp::BitAnd)],
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::LooseEq),
                ("!=", BinaryOp::LooseNe),
            ],
            &[("<=", BinaryOp::Le), (">=", BinaryOp::Ge), ("<", BinaryOp::Lt), (">", BinaryOp::Gt)],
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
        ];
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        self.chained(|p| {
            let mut lhs = p.binary_level(level + 1)?;
            'outer: loop {
                for (punct, op) in ops.iter() {
                    if p.eat_punct(punct) {
                        p.link()?;
                        let rhs = p.binary_level(level + 1)?;
                        lhs = Expr::Binary { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
                        continue 'outer;
                    }
                }
                return Ok(lhs);
            }
        })
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match &self.current().kind {
            TokenKind::Punct("!") => UnaryOp::Not,
            TokenKind::Punct("-") => UnaryOp::Neg,
            TokenKind::Punct("+") => UnaryOp::Plus,
            TokenKind::Punct("~") => UnaryOp::BitNot,
            TokenKind::Punct("++") | TokenKind::Punct("--") => {
                let delta = if self.is_punct("++") { 1.0 } else { -1.0 };
                let span = self.advance().span;
                let (name, _) = self.identifier()?;
                return Ok(Expr::Update { name, delta, prefix: true, span });
            }
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.nested(|p| p.unary())?;
        Ok(Expr::Unary { op, operand: Box::new(operand) })
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        self.chained(|p| p.postfix_chain())
    }

    fn postfix_chain(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            let span = self.span();
            if self.is_punct("(") || self.is_punct("[") || self.is_punct(".") {
                self.link()?;
            }
            if self.eat_punct("(") {
                let callee = path_name(&expr)
                    .ok_or_else(|| syntax_error(span, "only named functions can be called"))?;
                let args = self.comma_list(")")?;
                expr = Expr::Call { callee, args, span };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index { target: Box::new(expr), index: Box::new(index), span };
            } else if self.eat_punct(".") {
                let name = match self.advance().kind {
                    TokenKind::Ident(name) => name,
                    _ => return Err(syntax_error(span, "expected a property name after '.'")),
                };
                expr = Expr::Member { target: Box::new(expr), name, span };
            } else if (self.is_punct("++") || self.is_punct("--"))
                && self.span().line == self.previous_line()
            {
                let Expr::Ident { name, .. } = &expr else {
                    return Err(syntax_error(span, "invalid update target"));
                };
                let delta = if self.is_punct("++") { 1.0 } else { -1.0 };
                let name = name.clone();
                self.advance();
                expr = Expr::Update { name, delta, prefix: false, span };
            } else {
                return Ok(expr);
            }
        }
    }

    fn comma_list(&mut self, close: &str) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.eat_punct(close) {
            items.push(self.assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(Arc::from(s.as_str())))
            }
            TokenKind::Punct("(") => {
                self.advance();
                let inner = self.expression()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => {
                self.advance();
                Ok(Expr::Array(self.nested(|p| p.comma_list("]"))?))
            }
            TokenKind::Ident(ref name) => match name.as_str() {
                "true" => {
                    self.advance();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(Expr::Bool(false))
                }
                "undefined" => {
                    self.advance();
                    Ok(Expr::Undefined)
                }
                "NaN" => {
                    self.advance();
                    Ok(Expr::Number(f64::NAN))
                }
                "Infinity" => {
                    self.advance();
                    Ok(Expr::Number(f64::INFINITY))
                }
                _ => {
                    let (name, span) = self.identifier()?;
                    Ok(Expr::Ident { name, span })
                }
            },
            _ => Err(self.unexpected("expected an expression")),
        }
    }
}

fn path_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident { name, .. } => Some(name.clone()),
        Expr::Member { target, name, .. } => path_name(target).map(|p| format!("{}.{}", p, name)),
        _ => None,
    }
}
