//! Recursive-descent parser producing [`crate::ast`] nodes.

use std::rc::Rc;

use crate::ast::{
    BinOp, BoolOp, CmpOp, CompClause, CompElement, CompKind, Expr, FPart, FunctionDef, Index,
    Param, Stmt, StmtKind, Target, UnaryOp,
};
use crate::error::{Fault, FaultKind};
use crate::lexer::{self, Op, Tok, Token};

/// Nested expressions and blocks allowed before parsing gives up.
const MAX_NESTING: usize = 200;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn unsupported_statement(word: &str) -> Option<&'static str> {
    Some(match word {
        "class" => "classes are not supported",
        "try" | "except" | "finally" => "'try' statements are not supported",
        "with" => "'with' statements are not supported",
        "raise" => "'raise' statements are not supported",
        "nonlocal" => "'nonlocal' declarations are not supported",
        "async" | "await" => "async code is not supported",
        "yield" => "'yield' is not supported",
        "lambda" => "lambda expressions are not supported",
        _ => return None,
    })
}

/// Parses a whole program.
///
/// # Errors
///
/// Returns a `SyntaxError` or `IndentationError` fault.
pub fn parse(source: &str) -> Result<Vec<Stmt>, Fault> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens).module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
    loop_depth: usize,
    function_depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
            loop_depth: 0,
            function_depth: 0,
        }
    }

    // ─── Token cursor ──────────────────────────────────────────────────────

    fn token_at(&self, offset: usize) -> Option<&Token> {
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
    }

    fn peek(&self) -> &Tok {
        self.token_at(0).map_or(&Tok::Eof, |token| &token.tok)
    }

    fn peek_is_keyword(&self, offset: usize, keyword: &str) -> bool {
        matches!(self.token_at(offset), Some(Token { tok: Tok::Name(word), .. }) if word == keyword)
    }

    fn line(&self) -> usize {
        self.token_at(0).map_or(0, |token| token.line)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_op(&self, op: Op) -> bool {
        matches!(self.peek(), Tok::Op(found) if *found == op)
    }

    fn eat_op(&mut self, op: Op) -> bool {
        let found = self.at_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: Op) -> Result<(), Fault> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", op.spelling())))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek_is_keyword(0, keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.advance();
        }
        found
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), Fault> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{keyword}'")))
        }
    }

    fn error(&self, message: impl Into<String>) -> Fault {
        Fault::syntax(message, self.line())
    }

    fn unexpected(&self) -> Fault {
        let line = self.line();
        match self.peek() {
            Tok::Indent => {
                Fault::new(FaultKind::IndentationError, "unexpected indent").at_line(line)
            }
            Tok::Eof => Fault::syntax("unexpected end of input", line),
            Tok::Newline | Tok::Dedent => Fault::syntax("invalid syntax", line),
            tok => Fault::syntax(format!("invalid syntax near {}", describe(tok)), line),
        }
    }

    fn name(&mut self) -> Result<Rc<str>, Fault> {
        match self.peek() {
            Tok::Name(word) if !is_keyword(word) => {
                let name: Rc<str> = Rc::from(word.as_str());
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, Fault>) -> Result<T, Fault> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error("too many nested expressions or blocks"));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    // ─── Statements ────────────────────────────────────────────────────────

    fn module(mut self) -> Result<Vec<Stmt>, Fault> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Tok::Eof => break,
                Tok::Newline => self.advance(),
                Tok::Indent | Tok::Dedent => return Err(self.unexpected()),
                _ => self.statement(&mut body)?,
            }
        }
        Ok(body)
    }

    fn statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), Fault> {
        if let Tok::Name(word) = self.peek().clone() {
            let compound = match word.as_str() {
                "if" => Some(self.if_statement()?),
                "while" => Some(self.while_statement()?),
                "for" => Some(self.for_statement()?),
                "def" => Some(self.function_def()?),
                _ => None,
            };
            if let Some(stmt) = compound {
                out.push(stmt);
                return Ok(());
            }
            if let Some(message) = unsupported_statement(&word) {
                return Err(self.error(message));
            }
        }
        self.simple_statements(out)
    }

    fn simple_statements(&mut self, out: &mut Vec<Stmt>) -> Result<(), Fault> {
        loop {
            out.push(self.simple_statement()?);
            if !self.eat_op(Op::Semicolon) || matches!(self.peek(), Tok::Newline | Tok::Eof) {
                break;
            }
        }
        match self.peek() {
            Tok::Newline => {
                self.advance();
                Ok(())
            }
            Tok::Eof => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn simple_statement(&mut self) -> Result<Stmt, Fault> {
        let line = self.line();
        let word = match self.peek() {
            Tok::Name(word) => word.clone(),
            _ => String::new(),
        };
        let kind = match word.as_str() {
            "pass" => {
                self.advance();
                StmtKind::Pass
            }
            "break" => {
                if self.loop_depth == 0 {
                    return Err(self.error("'break' outside loop"));
                }
                self.advance();
                StmtKind::Break
            }
            "continue" => {
                if self.loop_depth == 0 {
                    return Err(self.error("'continue' not properly in loop"));
                }
                self.advance();
                StmtKind::Continue
            }
            "return" => {
                if self.function_depth == 0 {
                    return Err(self.error("'return' outside function"));
                }
                self.advance();
                let value = if self.at_expr_start() {
                    Some(self.testlist()?)
                } else {
                    None
                };
                StmtKind::Return(value)
            }
            "global" => {
                self.advance();
                let mut names = vec![self.name()?];
                while self.eat_op(Op::Comma) {
                    names.push(self.name()?);
                }
                StmtKind::Global(names)
            }
            "del" => {
                self.advance();
                let targets = match self.target_list()? {
                    Target::Unpack(items) => items,
                    single => vec![single],
                };
                StmtKind::Del(targets)
            }
            "assert" => {
                self.advance();
                let test = self.test()?;
                let msg = if self.eat_op(Op::Comma) {
                    Some(self.test()?)
                } else {
                    None
                };
                StmtKind::Assert { test, msg }
            }
            "import" | "from" => {
                self.advance();
                let module = self.module_name()?;
                while !matches!(self.peek(), Tok::Newline | Tok::Eof | Tok::Op(Op::Semicolon)) {
                    self.advance();
                }
                StmtKind::Import(module)
            }
            _ => self.expression_statement(line)?,
        };
        Ok(Stmt { line, kind })
    }

    fn module_name(&mut self) -> Result<String, Fault> {
        let mut name = String::new();
        while self.eat_op(Op::Dot) {
            name.push('.');
        }
        while let Tok::Name(part) = self.peek() {
            if is_keyword(part) {
                break;
            }
            name.push_str(part);
            self.advance();
            if !self.eat_op(Op::Dot) {
                break;
            }
            name.push('.');
        }
        if name.is_empty() {
            return Err(self.unexpected());
        }
        Ok(name)
    }

    fn expression_statement(&mut self, line: usize) -> Result<StmtKind, Fault> {
        let first = self.testlist()?;

        if let Some(op) = self.augmented_op() {
            self.advance();
            let target = to_target(first, line)?;
            if matches!(target, Target::Unpack(_)) {
                return Err(Fault::syntax(
                    "illegal expression for augmented assignment",
                    line,
                ));
            }
            let value = self.testlist()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }

        if self.at_op(Op::Assign) {
            let mut exprs = vec![first];
            while self.eat_op(Op::Assign) {
                exprs.push(self.testlist()?);
            }
            let value = exprs.pop().ok_or_else(|| self.unexpected())?;
            let targets = exprs
                .into_iter()
                .map(|expr| to_target(expr, line))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(StmtKind::Assign { targets, value });
        }

        // Annotations are accepted and ignored.
        if self.eat_op(Op::Colon) {
            self.test()?;
            let target = to_target(first, line)?;
            if self.eat_op(Op::Assign) {
                let value = self.test()?;
                return Ok(StmtKind::Assign {
                    targets: vec![target],
                    value,
                });
            }
            return Ok(StmtKind::Pass);
        }

        Ok(StmtKind::Expr(first))
    }

    fn augmented_op(&self) -> Option<BinOp> {
        let Tok::Op(op) = self.peek() else {
            return None;
        };
        Some(match op {
            Op::PlusEq => BinOp::Add,
            Op::MinusEq => BinOp::Sub,
            Op::StarEq => BinOp::Mul,
            Op::SlashEq => BinOp::Div,
            Op::DoubleSlashEq => BinOp::FloorDiv,
            Op::PercentEq => BinOp::Mod,
            Op::DoubleStarEq => BinOp::Pow,
            _ => return None,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, Fault> {
        self.expect_op(Op::Colon)?;
        self.nested(|p| {
            let mut body = Vec::new();
            if !matches!(p.peek(), Tok::Newline) {
                p.simple_statements(&mut body)?;
                return Ok(body);
            }
            p.advance();
            if !matches!(p.peek(), Tok::Indent) {
                return Err(Fault::new(FaultKind::IndentationError, "expected an indented block")
                    .at_line(p.line()));
            }
            p.advance();
            loop {
                match p.peek() {
                    Tok::Dedent => {
                        p.advance();
                        break;
                    }
                    Tok::Eof => break,
                    Tok::Newline => p.advance(),
                    Tok::Indent => return Err(p.unexpected()),
                    _ => p.statement(&mut body)?,
                }
            }
            Ok(body)
        })
    }

    fn loop_body(&mut self) -> Result<Vec<Stmt>, Fault> {
        self.loop_depth += 1;
        let body = self.block();
        self.loop_depth -= 1;
        let body = body?;
        if self.at_keyword("else") {
            return Err(self.error("'else' clauses on loops are not supported"));
        }
        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt, Fault> {
        let line = self.line();
        self.advance();
        let test = self.test()?;
        let body = self.block()?;
        let mut branches = vec![(test, body)];
        let mut orelse = Vec::new();
        loop {
            if self.eat_keyword("elif") {
                let test = self.test()?;
                let body = self.block()?;
                branches.push((test, body));
                continue;
            }
            if self.eat_keyword("else") {
                orelse = self.block()?;
            }
            break;
        }
        Ok(Stmt {
            line,
            kind: StmtKind::If { branches, orelse },
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, Fault> {
        let line = self.line();
        self.advance();
        let test = self.test()?;
        let body = self.loop_body()?;
        Ok(Stmt {
            line,
            kind: StmtKind::While { test, body },
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, Fault> {
        let line = self.line();
        self.advance();
        let target = self.target_list()?;
        self.expect_keyword("in")?;
        let iter = self.testlist()?;
        let body = self.loop_body()?;
        Ok(Stmt {
            line,
            kind: StmtKind::For { target, iter, body },
        })
    }

    fn function_def(&mut self) -> Result<Stmt, Fault> {
        let line = self.line();
        self.advance();
        let name = self.name()?;
        self.expect_op(Op::LParen)?;
        let params = self.parameters()?;
        self.expect_op(Op::RParen)?;
        if self.eat_op(Op::Arrow) {
            self.test()?;
        }

        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;
        self.loop_depth = saved_loop_depth;

        Ok(Stmt {
            line,
            kind: StmtKind::FunctionDef(Rc::new(FunctionDef {
                name,
                params,
                body: body?,
                line,
            })),
        })
    }

    fn parameters(&mut self) -> Result<Vec<Param>, Fault> {
        let mut params: Vec<Param> = Vec::new();
        while !self.at_op(Op::RParen) {
            if self.at_op(Op::Star) || self.at_op(Op::DoubleStar) {
                return Err(self.error("variadic parameters are not supported"));
            }
            let name = self.name()?;
            if params.iter().any(|param| param.name == name) {
                return Err(self.error(format!(
                    "duplicate argument '{name}' in function definition"
                )));
            }
            if self.eat_op(Op::Colon) {
                self.test()?;
            }
            let default = if self.eat_op(Op::Assign) {
                Some(self.test()?)
            } else if params.iter().any(|param| param.default.is_some()) {
                return Err(self.error("non-default argument follows default argument"));
            } else {
                None
            };
            params.push(Param { name, default });
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        Ok(params)
    }

    /// Assignment targets of `for` loops, comprehensions and `del`.
    fn target_list(&mut self) -> Result<Target, Fault> {
        let line = self.line();
        let first = self.primary()?;
        if !self.at_op(Op::Comma) {
            return to_target(first, line);
        }
        let mut items = vec![first];
        while self.eat_op(Op::Comma) {
            if !self.at_target_start() {
                break;
            }
            items.push(self.primary()?);
        }
        to_target(Expr::Tuple(items), line)
    }

    fn at_target_start(&self) -> bool {
        match self.peek() {
            Tok::Name(word) => !is_keyword(word),
            Tok::Op(op) => matches!(op, Op::LParen | Op::LBracket),
            _ => false,
        }
    }

    // ─── Expressions ───────────────────────────────────────────────────────

    fn at_expr_start(&self) -> bool {
        match self.peek() {
            Tok::Int(_) | Tok::Float(_) | Tok::Str(_) | Tok::FStr { .. } => true,
            Tok::Op(op) => matches!(
                op,
                Op::LParen | Op::LBracket | Op::LBrace | Op::Minus | Op::Plus
            ),
            Tok::Name(word) => {
                !is_keyword(word)
                    || matches!(word.as_str(), "True" | "False" | "None" | "not" | "lambda")
            }
            _ => false,
        }
    }

    /// Comma-separated expressions; more than one yields a tuple.
    fn testlist(&mut self) -> Result<Expr, Fault> {
        let first = self.test()?;
        if !self.at_op(Op::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(Op::Comma) {
            if !self.at_expr_start() {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn test(&mut self) -> Result<Expr, Fault> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Expr, Fault> {
        if let Tok::Name(word) = self.peek() {
            if matches!(word.as_str(), "lambda" | "yield" | "await") {
                if let Some(message) = unsupported_statement(word) {
                    return Err(self.error(message));
                }
            }
        }
        let body = self.or_test()?;
        if !self.eat_keyword("if") {
            return Ok(body);
        }
        let test = self.or_test()?;
        self.expect_keyword("else")?;
        let orelse = self.test()?;
        Ok(Expr::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    fn or_test(&mut self) -> Result<Expr, Fault> {
        let mut left = self.and_test()?;
        while self.eat_keyword("or") {
            let right = self.and_test()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Expr, Fault> {
        let mut left = self.not_test()?;
        while self.eat_keyword("and") {
            let right = self.not_test()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Expr, Fault> {
        if self.eat_keyword("not") {
            let operand = self.nested(Self::not_test)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, Fault> {
        let first = self.arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let (op, width) = match self.peek() {
            Tok::Op(Op::EqEq) => (CmpOp::Eq, 1),
            Tok::Op(Op::NotEq) => (CmpOp::NotEq, 1),
            Tok::Op(Op::Lt) => (CmpOp::Lt, 1),
            Tok::Op(Op::LtE) => (CmpOp::LtE, 1),
            Tok::Op(Op::Gt) => (CmpOp::Gt, 1),
            Tok::Op(Op::GtE) => (CmpOp::GtE, 1),
            Tok::Name(word) if word == "in" => (CmpOp::In, 1),
            Tok::Name(word) if word == "not" && self.peek_is_keyword(1, "in") => (CmpOp::NotIn, 2),
            Tok::Name(word) if word == "is" => {
                if self.peek_is_keyword(1, "not") {
                    (CmpOp::IsNot, 2)
                } else {
                    (CmpOp::Is, 1)
                }
            }
            _ => return None,
        };
        self.pos += width;
        Some(op)
    }

    fn arith(&mut self) -> Result<Expr, Fault> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Op(Op::Plus) => BinOp::Add,
                Tok::Op(Op::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, Fault> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Tok::Op(Op::Star) => BinOp::Mul,
                Tok::Op(Op::Slash) => BinOp::Div,
                Tok::Op(Op::DoubleSlash) => BinOp::FloorDiv,
                Tok::Op(Op::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, Fault> {
        let op = match self.peek() {
            Tok::Op(Op::Minus) => UnaryOp::Neg,
            Tok::Op(Op::Plus) => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.nested(Self::factor)?;
        Ok(match (op, operand) {
            (UnaryOp::Neg, Expr::Int(value)) => Expr::Int(-value),
            (UnaryOp::Neg, Expr::Float(value)) => Expr::Float(-value),
            (op, operand) => Expr::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn power(&mut self) -> Result<Expr, Fault> {
        let base = self.primary()?;
        if self.eat_op(Op::DoubleStar) {
            let exponent = self.nested(Self::factor)?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, Fault> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Tok::Op(Op::LParen) => {
                    self.advance();
                    expr = self.call(expr)?;
                }
                Tok::Op(Op::LBracket) => {
                    self.advance();
                    let index = self.subscript()?;
                    self.expect_op(Op::RBracket)?;
                    expr = Expr::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Tok::Op(Op::Dot) => {
                    self.advance();
                    let name = self.name()?;
                    expr = Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn keyword_argument(&self) -> Option<Rc<str>> {
        let Tok::Name(word) = self.peek() else {
            return None;
        };
        let followed_by_assign = matches!(
            self.token_at(1),
            Some(Token {
                tok: Tok::Op(Op::Assign),
                ..
            })
        );
        (followed_by_assign && !is_keyword(word)).then(|| Rc::from(word.as_str()))
    }

    fn call(&mut self, func: Expr) -> Result<Expr, Fault> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(Rc<str>, Expr)> = Vec::new();
        while !self.at_op(Op::RParen) {
            if self.at_op(Op::Star) || self.at_op(Op::DoubleStar) {
                return Err(self.error("argument unpacking is not supported"));
            }
            if let Some(name) = self.keyword_argument() {
                self.advance();
                self.advance();
                if kwargs.iter().any(|(existing, _)| *existing == name) {
                    return Err(self.error(format!("keyword argument repeated: {name}")));
                }
                let value = self.test()?;
                kwargs.push((name, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                let arg = self.test()?;
                if self.at_keyword("for") {
                    let clauses = self.comprehension_clauses()?;
                    args.push(Expr::Comprehension {
                        kind: CompKind::List,
                        element: CompElement::Single(Box::new(arg)),
                        clauses,
                    });
                } else {
                    args.push(arg);
                }
            }
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RParen)?;
        Ok(Expr::Call {
            func: Box::new(func),
            args,
            kwargs,
        })
    }

    fn subscript(&mut self) -> Result<Index, Fault> {
        let lower = if self.at_op(Op::Colon) {
            None
        } else {
            Some(self.test()?)
        };
        if !self.eat_op(Op::Colon) {
            let item = lower.ok_or_else(|| self.unexpected())?;
            if !self.at_op(Op::Comma) {
                return Ok(Index::Item(item));
            }
            let mut items = vec![item];
            while self.eat_op(Op::Comma) {
                if self.at_op(Op::RBracket) {
                    break;
                }
                items.push(self.test()?);
            }
            return Ok(Index::Item(Expr::Tuple(items)));
        }
        let upper = if self.at_op(Op::Colon) || self.at_op(Op::RBracket) {
            None
        } else {
            Some(self.test()?)
        };
        let step = if self.eat_op(Op::Colon) && !self.at_op(Op::RBracket) {
            Some(self.test()?)
        } else {
            None
        };
        Ok(Index::Slice { lower, upper, step })
    }

    fn atom(&mut self) -> Result<Expr, Fault> {
        match self.peek().clone() {
            Tok::Int(value) => {
                self.advance();
                Ok(Expr::Int(value))
            }
            Tok::Float(value) => {
                self.advance();
                Ok(Expr::Float(value))
            }
            Tok::Str(_) | Tok::FStr { .. } => self.strings(),
            Tok::Name(word) => {
                let expr = match word.as_str() {
                    "True" => Expr::Bool(true),
                    "False" => Expr::Bool(false),
                    "None" => Expr::None,
                    other if is_keyword(other) => {
                        return Err(match unsupported_statement(other) {
                            Some(message) => self.error(message),
                            None => self.unexpected(),
                        });
                    }
                    other => Expr::Name(Rc::from(other)),
                };
                self.advance();
                Ok(expr)
            }
            Tok::Op(Op::LParen) => {
                self.advance();
                self.parenthesized()
            }
            Tok::Op(Op::LBracket) => {
                self.advance();
                self.list_display()
            }
            Tok::Op(Op::LBrace) => {
                self.advance();
                self.brace_display()
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Adjacent string literals concatenate; any f-string makes the whole
    /// run formatted.
    fn strings(&mut self) -> Result<Expr, Fault> {
        let mut parts: Vec<FPart> = Vec::new();
        let mut formatted = false;
        loop {
            let line = self.line();
            match self.peek().clone() {
                Tok::Str(text) => {
                    self.advance();
                    push_literal(&mut parts, &text);
                }
                Tok::FStr { body, raw } => {
                    self.advance();
                    formatted = true;
                    for part in fstring_parts(&body, raw, line, self.nesting)? {
                        match part {
                            FPart::Literal(text) => push_literal(&mut parts, &text),
                            field => parts.push(field),
                        }
                    }
                }
                _ => break,
            }
        }
        if formatted {
            return Ok(Expr::FString(parts));
        }
        let text = match parts.pop() {
            Some(FPart::Literal(text)) => text,
            _ => String::new(),
        };
        Ok(Expr::Str(Rc::from(text)))
    }

    fn parenthesized(&mut self) -> Result<Expr, Fault> {
        if self.eat_op(Op::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.test()?;
        if self.at_keyword("for") {
            let clauses = self.comprehension_clauses()?;
            self.expect_op(Op::RParen)?;
            return Ok(Expr::Comprehension {
                kind: CompKind::List,
                element: CompElement::Single(Box::new(first)),
                clauses,
            });
        }
        if !self.at_op(Op::Comma) {
            self.expect_op(Op::RParen)?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RParen) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect_op(Op::RParen)?;
        Ok(Expr::Tuple(items))
    }

    fn list_display(&mut self) -> Result<Expr, Fault> {
        if self.eat_op(Op::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.test()?;
        if self.at_keyword("for") {
            let clauses = self.comprehension_clauses()?;
            self.expect_op(Op::RBracket)?;
            return Ok(Expr::Comprehension {
                kind: CompKind::List,
                element: CompElement::Single(Box::new(first)),
                clauses,
            });
        }
        let mut items = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBracket) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect_op(Op::RBracket)?;
        Ok(Expr::List(items))
    }

    fn brace_display(&mut self) -> Result<Expr, Fault> {
        if self.eat_op(Op::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }
        if self.at_op(Op::DoubleStar) || self.at_op(Op::Star) {
            return Err(self.error("unpacking in displays is not supported"));
        }
        let first = self.test()?;

        if self.eat_op(Op::Colon) {
            let value = self.test()?;
            if self.at_keyword("for") {
                let clauses = self.comprehension_clauses()?;
                self.expect_op(Op::RBrace)?;
                return Ok(Expr::Comprehension {
                    kind: CompKind::Dict,
                    element: CompElement::Pair(Box::new(first), Box::new(value)),
                    clauses,
                });
            }
            let mut entries = vec![(first, value)];
            while self.eat_op(Op::Comma) {
                if self.at_op(Op::RBrace) {
                    break;
                }
                let key = self.test()?;
                self.expect_op(Op::Colon)?;
                let value = self.test()?;
                entries.push((key, value));
            }
            self.expect_op(Op::RBrace)?;
            return Ok(Expr::Dict(entries));
        }

        if self.at_keyword("for") {
            let clauses = self.comprehension_clauses()?;
            self.expect_op(Op::RBrace)?;
            return Ok(Expr::Comprehension {
                kind: CompKind::Set,
                element: CompElement::Single(Box::new(first)),
                clauses,
            });
        }
        let mut items = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBrace) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect_op(Op::RBrace)?;
        Ok(Expr::Set(items))
    }

    fn comprehension_clauses(&mut self) -> Result<Vec<CompClause>, Fault> {
        let mut clauses = Vec::new();
        while self.eat_keyword("for") {
            let target = self.target_list()?;
            self.expect_keyword("in")?;
            let iter = self.or_test()?;
            let mut conditions = Vec::new();
            while self.eat_keyword("if") {
                conditions.push(self.nested(Self::or_test)?);
            }
            clauses.push(CompClause {
                target,
                iter,
                conditions,
            });
        }
        Ok(clauses)
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Name(word) => format!("'{word}'"),
        Tok::Int(value) => format!("'{value}'"),
        Tok::Float(value) => format!("'{value}'"),
        Tok::Str(_) | Tok::FStr { .. } => "string literal".to_string(),
        Tok::Op(op) => format!("'{}'", op.spelling()),
        Tok::Newline => "end of line".to_string(),
        Tok::Indent => "indent".to_string(),
        Tok::Dedent => "dedent".to_string(),
        Tok::Eof => "end of input".to_string(),
    }
}

fn to_target(expr: Expr, line: usize) -> Result<Target, Fault> {
    match expr {
        Expr::Name(name) => Ok(Target::Name(name)),
        Expr::Subscript { object, index } => Ok(Target::Subscript { object, index }),
        Expr::Tuple(items) | Expr::List(items) => items
            .into_iter()
            .map(|item| to_target(item, line))
            .collect::<Result<Vec<_>, _>>()
            .map(Target::Unpack),
        Expr::Attribute { .. } => Err(Fault::syntax("cannot assign to attribute", line)),
        Expr::Call { .. } => Err(Fault::syntax("cannot assign to function call", line)),
        Expr::None
        | Expr::Bool(_)
        | Expr::Int(_)
        | Expr::Float(_)
        | Expr::Str(_)
        | Expr::FString(_) => Err(Fault::syntax("cannot assign to literal", line)),
        _ => Err(Fault::syntax("cannot assign to expression", line)),
    }
}

fn push_literal(parts: &mut Vec<FPart>, text: &str) {
    if let Some(FPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FPart::Literal(text.to_string()));
    }
}

// ─── f-strings ─────────────────────────────────────────────────────────────

fn fstring_parts(body: &str, raw: bool, line: usize, nesting: usize) -> Result<Vec<FPart>, Fault> {
    let chars: Vec<char> = body.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while let Some(&ch) = chars.get(i) {
        match ch {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return Err(Fault::syntax("f-string: single '}' is not allowed", line)),
            '{' => {
                flush_literal(&mut parts, &mut literal, raw, line)?;
                i = fstring_field(&chars, i + 1, line, nesting, &mut parts)?;
            }
            _ => {
                literal.push(ch);
                i += 1;
            }
        }
    }
    flush_literal(&mut parts, &mut literal, raw, line)?;
    Ok(parts)
}

fn flush_literal(
    parts: &mut Vec<FPart>,
    literal: &mut String,
    raw: bool,
    line: usize,
) -> Result<(), Fault> {
    if literal.is_empty() {
        return Ok(());
    }
    let text = if raw {
        std::mem::take(literal)
    } else {
        let text = lexer::unescape(literal).map_err(|msg| Fault::syntax(msg, line))?;
        literal.clear();
        text
    };
    push_literal(parts, &text);
    Ok(())
}

/// Parses one `{expr!c:spec}` field starting just after `{`.
///
/// Returns the index just past the closing `}`.
fn fstring_field(
    chars: &[char],
    start: usize,
    line: usize,
    nesting: usize,
    parts: &mut Vec<FPart>,
) -> Result<usize, Fault> {
    let unclosed = || Fault::syntax("f-string: expecting '}'", line);

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;
    let expr_end = loop {
        let &ch = chars.get(i).ok_or_else(unclosed)?;
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            i += 1;
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth > 0 => depth -= 1,
            '}' => break i,
            '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => break i,
            ':' if depth == 0 => break i,
            _ => {}
        }
        i += 1;
    };

    let text: String = chars[start..expr_end].iter().collect();
    let trimmed = text.trim_end();
    let self_documenting = trimmed.ends_with('=')
        && !["==", "!=", "<=", ">="]
            .iter()
            .any(|op| trimmed.ends_with(op));
    let expr_text = if self_documenting {
        &trimmed[..trimmed.len() - 1]
    } else {
        text.as_str()
    };
    if expr_text.trim().is_empty() {
        return Err(Fault::syntax("f-string: empty expression not allowed", line));
    }
    let expr = parse_embedded(expr_text.trim(), line, nesting)?;

    let mut i = expr_end;
    let mut conversion = None;
    if chars.get(i) == Some(&'!') {
        match chars.get(i + 1) {
            Some(&c @ ('r' | 's' | 'a')) => conversion = Some(c),
            _ => return Err(Fault::syntax("f-string: invalid conversion character", line)),
        }
        i += 2;
    }

    let mut spec = Vec::new();
    if chars.get(i) == Some(&':') {
        let spec_start = i + 1;
        let mut depth = 0usize;
        i = spec_start;
        loop {
            match *chars.get(i).ok_or_else(unclosed)? {
                '{' => depth += 1,
                '}' if depth > 0 => depth -= 1,
                '}' => break,
                _ => {}
            }
            i += 1;
        }
        let spec_text: String = chars[spec_start..i].iter().collect();
        spec = fstring_parts(&spec_text, true, line, nesting + 1)?;
    }
    if chars.get(i) != Some(&'}') {
        return Err(unclosed());
    }

    if self_documenting {
        push_literal(parts, &text);
        if conversion.is_none() && spec.is_empty() {
            conversion = Some('r');
        }
    }
    parts.push(FPart::Field {
        expr: Box::new(expr),
        conversion,
        spec,
    });
    Ok(i + 1)
}

fn parse_embedded(text: &str, line: usize, nesting: usize) -> Result<Expr, Fault> {
    let relocate = |fault: Fault| Fault::new(fault.kind(), fault.message()).at_line(line);
    if nesting >= MAX_NESTING {
        return Err(Fault::syntax("too many nested expressions or blocks", line));
    }
    let mut tokens = lexer::tokenize(&format!("({text})")).map_err(relocate)?;
    for token in &mut tokens {
        token.line = line;
    }
    let mut parser = Parser::new(tokens);
    parser.nesting = nesting + 1;
    let expr = parser.test()?;
    if !matches!(parser.peek(), Tok::Newline) {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expr {
        match parse(src).unwrap().remove(0).kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("not an expression statement: {other:?}"),
        }
    }

    fn syntax_error(src: &str) -> Fault {
        parse(src).unwrap_err()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            expr("1 + 2 * 3"),
            binary(
                BinOp::Add,
                Expr::Int(1),
                binary(BinOp::Mul, Expr::Int(2), Expr::Int(3))
            )
        );
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_minus() {
        assert_eq!(
            expr("-2 ** 2"),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(binary(BinOp::Pow, Expr::Int(2), Expr::Int(2))),
            }
        );
    }

    #[test]
    fn chained_comparison_keeps_all_operands() {
        let Expr::Compare { rest, .. } = expr("1 < x <= 3 not in y") else {
            panic!("expected comparison");
        };
        let ops: Vec<_> = rest.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE, CmpOp::NotIn]);
    }

    #[test]
    fn parses_blocks_and_else_if_chains() {
        let program = parse(
            "if x > 1:\n    y = 1\nelif x == 1:\n    y = 2\nelse:\n    y = 3\n",
        )
        .unwrap();
        let StmtKind::If { branches, orelse } = &program[0].kind else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(orelse.len(), 1);
        assert_eq!(orelse[0].line, 6);
    }

    #[test]
    fn parses_function_with_defaults() {
        let program = parse("def area(w, h=2):\n    return w * h\n").unwrap();
        let StmtKind::FunctionDef(def) = &program[0].kind else {
            panic!("expected def");
        };
        assert_eq!(&*def.name, "area");
        assert_eq!(def.params.len(), 2);
        assert!(def.params[1].default.is_some());
    }

    #[test]
    fn chained_and_unpacking_assignment() {
        let program = parse("a = b = 1\nx, (y, z) = 1, (2, 3)\n").unwrap();
        let StmtKind::Assign { targets, .. } = &program[0].kind else {
            panic!("expected assign");
        };
        assert_eq!(targets.len(), 2);
        let StmtKind::Assign { targets, value } = &program[1].kind else {
            panic!("expected assign");
        };
        assert!(matches!(&targets[0], Target::Unpack(items) if items.len() == 2));
        assert!(matches!(value, Expr::Tuple(items) if items.len() == 2));
    }

    #[test]
    fn comprehension_with_condition() {
        let Expr::Comprehension { kind, clauses, .. } = expr("[x * 2 for x in range(5) if x % 2]")
        else {
            panic!("expected comprehension");
        };
        assert_eq!(kind, CompKind::List);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].conditions.len(), 1);
    }

    #[test]
    fn generator_argument_becomes_comprehension() {
        let Expr::Call { args, .. } = expr("sum(x for x in y)") else {
            panic!("expected call");
        };
        assert!(matches!(args[0], Expr::Comprehension { .. }));
    }

    #[test]
    fn slices_parse_all_three_parts() {
        let Expr::Subscript { index, .. } = expr("s[1:-1:2]") else {
            panic!("expected subscript");
        };
        assert!(matches!(
            *index,
            Index::Slice {
                lower: Some(_),
                upper: Some(_),
                step: Some(_)
            }
        ));
    }

    #[test]
    fn f_string_fields_and_specs() {
        let Expr::FString(parts) = expr(r#"f"Hi {name!r}, {total:>8.2f}{{}}""#) else {
            panic!("expected f-string");
        };
        assert_eq!(parts[0], FPart::Literal("Hi ".into()));
        assert!(matches!(&parts[1], FPart::Field { conversion: Some('r'), .. }));
        let FPart::Field { spec, .. } = &parts[3] else {
            panic!("expected field");
        };
        assert_eq!(spec, &vec![FPart::Literal(">8.2f".into())]);
        assert_eq!(parts[4], FPart::Literal("{}".into()));
    }

    #[test]
    fn f_string_with_nested_quotes_and_comparison() {
        let Expr::FString(parts) = expr(r#"f"{d['k']} {a != b}""#) else {
            panic!("expected f-string");
        };
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn adjacent_strings_concatenate() {
        assert_eq!(expr("'a' 'b'"), Expr::Str(Rc::from("ab")));
    }

    #[test]
    fn unsupported_constructs_are_named() {
        assert!(syntax_error("class A:\n    pass\n").message().contains("classes"));
        assert!(syntax_error("try:\n    x\nexcept:\n    y\n").message().contains("'try'"));
        assert!(syntax_error("f = lambda x: x\n").message().contains("lambda"));
        assert!(syntax_error("with a as b:\n    pass\n").message().contains("'with'"));
    }

    #[test]
    fn control_flow_outside_context_is_rejected() {
        assert_eq!(syntax_error("break\n").message(), "'break' outside loop");
        assert_eq!(syntax_error("return 1\n").message(), "'return' outside function");
        let nested = "for i in x:\n    def f():\n        break\n";
        assert_eq!(syntax_error(nested).message(), "'break' outside loop");
    }

    #[test]
    fn default_ordering_is_checked() {
        let err = syntax_error("def f(a=1, b):\n    pass\n");
        assert_eq!(err.message(), "non-default argument follows default argument");
    }

    #[test]
    fn attribute_assignment_is_rejected() {
        let err = syntax_error("x.y = 1\n");
        assert_eq!(err.message(), "cannot assign to attribute");
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn unexpected_indent_is_indentation_error() {
        let err = syntax_error("x = 1\n    y = 2\n");
        assert_eq!(err.kind(), FaultKind::IndentationError);
    }

    #[test]
    fn missing_block_is_indentation_error() {
        let err = syntax_error("if x:\nprint(x)\n");
        assert_eq!(err.kind(), FaultKind::IndentationError);
        assert_eq!(err.message(), "expected an indented block");
    }

    #[test]
    fn missing_colon_reports_line() {
        let err = syntax_error("x = 1\nif x\n    pass\n");
        assert_eq!(err.message(), "expected ':'");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let src = format!("x = {}1{}\n", "(".repeat(300), ")".repeat(300));
        let fault = std::thread::Builder::new()
            .stack_size(crate::Limits::default().stack_size)
            .spawn(move || syntax_error(&src))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(fault.kind(), FaultKind::SyntaxError);
    }

    #[test]
    fn import_parses_with_module_name() {
        let program = parse("from os import path\n").unwrap();
        assert_eq!(program[0].kind, StmtKind::Import("os".into()));
    }
}
