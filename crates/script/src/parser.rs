//! Parser for PadScript
//!
//! Recursive descent over the token list from [`crate::lexer`]. Binary
//! operators use precedence climbing. Semicolons may be omitted at the end
//! of a line, before `}` and at the end of input.

use crate::ast::*;
use crate::error::ScriptError;
use crate::lexer::{TemplatePart, Token, TokenKind, tokenize, tokenize_at};
use crate::value::format_number;
use std::rc::Rc;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "default", "do", "else", "false",
    "finally", "for", "function", "if", "new", "null", "return", "switch", "this", "throw", "true",
    "try", "typeof", "var", "void", "while", "let",
];

/// Deepest nesting of statements and expressions a program may use
pub const MAX_NESTING_DEPTH: usize = 200;

/// Whether `name` is a keyword that cannot be used as a binding
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Parse a complete program
pub fn parse(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    parser.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Line of the most recently consumed token
    prev_line: usize,
    depth: usize,
}

/// How a binary-position token combines its operands
#[derive(Clone, Copy)]
enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn infix_info(token: &Token) -> Option<(u8, Infix)> {
    let TokenKind::Punct(p) = &token.kind else {
        return None;
    };
    let info = match *p {
        "??" => (1, Infix::Logical(LogicalOp::Nullish)),
        "||" => (2, Infix::Logical(LogicalOp::Or)),
        "&&" => (3, Infix::Logical(LogicalOp::And)),
        "==" => (4, Infix::Binary(BinaryOp::Eq)),
        "!=" => (4, Infix::Binary(BinaryOp::NotEq)),
        "===" => (4, Infix::Binary(BinaryOp::StrictEq)),
        "!==" => (4, Infix::Binary(BinaryOp::StrictNotEq)),
        "<" => (5, Infix::Binary(BinaryOp::Lt)),
        "<=" => (5, Infix::Binary(BinaryOp::LtEq)),
        ">" => (5, Infix::Binary(BinaryOp::Gt)),
        ">=" => (5, Infix::Binary(BinaryOp::GtEq)),
        "+" => (6, Infix::Binary(BinaryOp::Add)),
        "-" => (6, Infix::Binary(BinaryOp::Sub)),
        "*" => (7, Infix::Binary(BinaryOp::Mul)),
        "/" => (7, Infix::Binary(BinaryOp::Div)),
        "%" => (7, Infix::Binary(BinaryOp::Rem)),
        "**" => (8, Infix::Binary(BinaryOp::Pow)),
        _ => return None,
    };
    Some(info)
}

fn assign_op(token: &Token) -> Option<Option<BinaryOp>> {
    let TokenKind::Punct(p) = &token.kind else {
        return None;
    };
    match *p {
        "=" => Some(None),
        "+=" => Some(Some(BinaryOp::Add)),
        "-=" => Some(Some(BinaryOp::Sub)),
        "*=" => Some(Some(BinaryOp::Mul)),
        "/=" => Some(Some(BinaryOp::Div)),
        "%=" => Some(Some(BinaryOp::Rem)),
        "**=" => Some(Some(BinaryOp::Pow)),
        _ => None,
    }
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            prev_line: 1,
            depth: 0,
        }
    }

    /// Enter one more level of nesting
    fn descend(&mut self) -> Result<(), ScriptError> {
        if self.depth >= MAX_NESTING_DEPTH {
            let token = self.peek();
            return Err(ScriptError::syntax(
                "Maximum nesting depth exceeded",
                token.line,
                token.column,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        // The token list always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.prev_line = token.line;
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, p: &str) -> bool {
        self.peek().is_punct(p)
    }

    fn check_ident(&self, name: &str) -> bool {
        self.peek().is_ident(name)
    }

    fn eat(&mut self, p: &str) -> bool {
        if self.check(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.check_ident(name) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> ScriptError {
        let token = self.peek();
        ScriptError::syntax(token.describe(), token.line, token.column)
    }

    fn expect(&mut self, p: &str) -> Result<(), ScriptError> {
        if self.eat(p) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_binding(&mut self) -> Result<String, ScriptError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) if !is_reserved(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Statement terminator: `;`, or an implied one
    fn consume_semicolon(&mut self) -> Result<(), ScriptError> {
        if self.eat(";") {
            return Ok(());
        }
        if self.check("}") || self.at_eof() || self.peek().line > self.prev_line {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn program(&mut self) -> Result<Program, ScriptError> {
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.nested(Self::statement_body)
    }

    fn statement_body(&mut self) -> Result<Stmt, ScriptError> {
        let token = self.peek().clone();

        if token.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        if token.is_punct(";") {
            self.advance();
            return Ok(Stmt::Empty);
        }

        let TokenKind::Identifier(word) = &token.kind else {
            return self.expression_statement();
        };

        match word.as_str() {
            "let" | "const" | "var" => {
                let stmt = self.declaration()?;
                self.consume_semicolon()?;
                Ok(stmt)
            }
            "function" => {
                self.advance();
                let name = self.expect_binding()?;
                let def = self.function_rest(Some(name))?;
                Ok(Stmt::Function(Rc::new(def)))
            }
            "return" => {
                self.advance();
                let value = if self.check(";")
                    || self.check("}")
                    || self.at_eof()
                    || self.peek().line > self.prev_line
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(value))
            }
            "if" => self.if_statement(),
            "while" => {
                self.advance();
                self.expect("(")?;
                let test = self.expression()?;
                self.expect(")")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While { test, body })
            }
            "do" => {
                self.advance();
                let body = Box::new(self.statement()?);
                if !self.eat_ident("while") {
                    return Err(self.unexpected());
                }
                self.expect("(")?;
                let test = self.expression()?;
                self.expect(")")?;
                self.eat(";");
                Ok(Stmt::DoWhile { body, test })
            }
            "for" => self.for_statement(),
            "break" => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Stmt::Break)
            }
            "continue" => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Stmt::Continue)
            }
            "throw" => {
                self.advance();
                if self.peek().line > self.prev_line {
                    let token = self.peek();
                    return Err(ScriptError::syntax(
                        "Illegal newline after throw",
                        token.line,
                        token.column,
                    ));
                }
                let value = self.expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(value))
            }
            "try" => self.try_statement(),
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> Result<Stmt, ScriptError> {
        let expr = self.expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect("{")?;
        let mut body = Vec::new();
        while !self.check("}") {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    /// `let a = 1, b` (without the terminator)
    fn declaration(&mut self) -> Result<Stmt, ScriptError> {
        let kind = match &self.advance().kind {
            TokenKind::Identifier(w) if w == "const" => DeclKind::Const,
            TokenKind::Identifier(w) if w == "var" => DeclKind::Var,
            _ => DeclKind::Let,
        };
        let first = self.expect_binding()?;
        self.declaration_rest(kind, first)
    }

    fn declaration_rest(&mut self, kind: DeclKind, first: String) -> Result<Stmt, ScriptError> {
        let mut declarations = Vec::new();
        let mut name = first;
        loop {
            let init = if self.eat("=") {
                Some(self.assignment()?)
            } else if kind == DeclKind::Const {
                let token = self.peek();
                return Err(ScriptError::syntax(
                    "Missing initializer in const declaration",
                    token.line,
                    token.column,
                ));
            } else {
                None
            };
            declarations.push((name, init));
            if !self.eat(",") {
                break;
            }
            name = self.expect_binding()?;
        }
        Ok(Stmt::Declare { kind, declarations })
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        self.expect("(")?;
        let test = self.expression()?;
        self.expect(")")?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.eat_ident("else") {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        self.expect("(")?;

        let init = if self.check_ident("let") || self.check_ident("const") || self.check_ident("var")
        {
            let kind = match &self.advance().kind {
                TokenKind::Identifier(w) if w == "const" => DeclKind::Const,
                TokenKind::Identifier(w) if w == "var" => DeclKind::Var,
                _ => DeclKind::Let,
            };
            let name = self.expect_binding()?;
            if self.eat_ident("of") {
                let iterable = self.expression()?;
                self.expect(")")?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::ForOf {
                    kind,
                    name,
                    iterable,
                    body,
                });
            }
            Some(Box::new(self.declaration_rest(kind, name)?))
        } else if self.check(";") {
            None
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect(";")?;

        let test = if self.check(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;

        let update = if self.check(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(")")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> Result<Stmt, ScriptError> {
        let try_token = self.advance();
        let block = self.block()?;

        let mut param = None;
        let mut handler = None;
        if self.eat_ident("catch") {
            if self.eat("(") {
                param = Some(self.expect_binding()?);
                self.expect(")")?;
            }
            handler = Some(self.block()?);
        }

        let finalizer = if self.eat_ident("finally") {
            Some(self.block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(ScriptError::syntax(
                "Missing catch or finally after try",
                try_token.line,
                try_token.column,
            ));
        }

        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    /// Parameter list and block body of a function
    fn function_rest(&mut self, name: Option<String>) -> Result<FunctionDef, ScriptError> {
        self.expect("(")?;
        let params = self.params()?;
        let body = FunctionBody::Block(self.block()?);
        Ok(FunctionDef { name, params, body })
    }

    /// Comma-separated bindings up to and including `)`
    fn params(&mut self) -> Result<Vec<String>, ScriptError> {
        let mut params = Vec::new();
        while !self.eat(")") {
            params.push(self.expect_binding()?);
            if !self.check(")") {
                self.expect(",")?;
            }
        }
        Ok(params)
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ScriptError> {
        self.nested(Self::assignment_body)
    }

    fn assignment_body(&mut self) -> Result<Expr, ScriptError> {
        if let Some(arrow) = self.arrow_function()? {
            return Ok(arrow);
        }

        let target = self.conditional()?;
        let Some(op) = assign_op(self.peek()) else {
            return Ok(target);
        };
        if !target.is_assignable() {
            let token = self.peek();
            return Err(ScriptError::syntax(
                "Invalid left-hand side in assignment",
                token.line,
                token.column,
            ));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// `x => ...` or `(a, b) => ...`, if that is what comes next
    fn arrow_function(&mut self) -> Result<Option<Expr>, ScriptError> {
        let params = match &self.peek().kind {
            TokenKind::Identifier(name) if !is_reserved(name) && self.peek_at(1).is_punct("=>") => {
                let name = name.clone();
                self.advance();
                self.advance();
                vec![name]
            }
            TokenKind::Punct("(") => {
                let Some(close) = self.matching_paren() else {
                    return Ok(None);
                };
                if !self.tokens[close + 1].is_punct("=>") {
                    return Ok(None);
                }
                self.advance();
                let params = self.params()?;
                self.expect("=>")?;
                params
            }
            _ => return Ok(None),
        };

        let body = if self.check("{") {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(Box::new(self.assignment()?))
        };
        Ok(Some(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body,
        }))))
    }

    /// Index of the `)` matching the `(` at the current position
    fn matching_paren(&self) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(self.pos) {
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    return (i + 1 < self.tokens.len()).then_some(i);
                }
            } else if token.kind == TokenKind::Eof {
                return None;
            }
        }
        None
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let test = self.binary(0)?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, ScriptError> {
        let base = self.depth;
        let mut left = self.unary()?;

        while let Some((prec, infix)) = infix_info(self.peek()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            // Every fold nests the left operand one level deeper
            self.descend()?;
            // `**` is right-associative
            let next_min = match infix {
                Infix::Binary(BinaryOp::Pow) => prec,
                _ => prec + 1,
            };
            let right = self.binary(next_min)?;
            left = match infix {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Infix::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }

        self.depth = base;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.peek().clone();
        let op = match &token.kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Identifier(w) if w == "typeof" => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.nested(Self::unary)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        if token.is_punct("++") || token.is_punct("--") {
            self.advance();
            let target = self.nested(Self::unary)?;
            if !target.is_assignable() {
                return Err(ScriptError::syntax(
                    "Invalid left-hand side expression in prefix operation",
                    token.line,
                    token.column,
                ));
            }
            return Ok(Expr::Update {
                increment: token.is_punct("++"),
                prefix: true,
                target: Box::new(target),
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.call_member()?;
        let token = self.peek().clone();
        if (token.is_punct("++") || token.is_punct("--")) && token.line == self.prev_line {
            if !expr.is_assignable() {
                return Err(ScriptError::syntax(
                    "Invalid left-hand side expression in postfix operation",
                    token.line,
                    token.column,
                ));
            }
            self.advance();
            return Ok(Expr::Update {
                increment: token.is_punct("++"),
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn call_member(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = if self.eat_ident("new") {
            let callee = self.member_chain(false)?;
            let args = if self.eat("(") {
                self.arguments()?
            } else {
                Vec::new()
            };
            Expr::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.primary()?
        };
        expr = self.member_tail(expr, true)?;
        Ok(expr)
    }

    fn member_chain(&mut self, calls: bool) -> Result<Expr, ScriptError> {
        let expr = self.primary()?;
        self.member_tail(expr, calls)
    }

    fn member_tail(&mut self, mut expr: Expr, calls: bool) -> Result<Expr, ScriptError> {
        let base = self.depth;
        loop {
            if self.eat(".") {
                self.descend()?;
                let token = self.advance();
                let name = match &token.kind {
                    TokenKind::Identifier(name) => name.clone(),
                    _ => {
                        return Err(ScriptError::syntax(
                            token.describe(),
                            token.line,
                            token.column,
                        ));
                    }
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(Expr::Str(Rc::from(name.as_str()))),
                    dotted: true,
                };
            } else if self.eat("[") {
                self.descend()?;
                let property = self.expression()?;
                self.expect("]")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                    dotted: false,
                };
            } else if calls && self.check("(") {
                self.advance();
                self.descend()?;
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.depth = base;
                return Ok(expr);
            }
        }
    }

    /// Call arguments after the opening `(`
    fn arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();
        while !self.eat(")") {
            args.push(self.assignment()?);
            if !self.check(")") {
                self.expect(",")?;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Str(Rc::from(s.as_str())))
            }
            TokenKind::Template(parts) => {
                self.advance();
                let mut segments = Vec::with_capacity(parts.len());
                for part in parts {
                    segments.push(match part {
                        TemplatePart::Text(text) => TemplateSegment::Text(text),
                        TemplatePart::Substitution {
                            source,
                            line,
                            column,
                        } => TemplateSegment::Expr(self.nested(|parser| {
                            parse_substitution(&source, line, column, parser.depth)
                        })?),
                    });
                }
                Ok(Expr::Template(segments))
            }
            TokenKind::Identifier(ref word) => match word.as_str() {
                "true" => {
                    self.advance();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Null)
                }
                "function" => {
                    self.advance();
                    let name = if matches!(self.peek().kind, TokenKind::Identifier(_)) {
                        Some(self.expect_binding()?)
                    } else {
                        None
                    };
                    let def = self.function_rest(name)?;
                    Ok(Expr::Function(Rc::new(def)))
                }
                w if is_reserved(w) => Err(self.unexpected()),
                _ => {
                    self.advance();
                    Ok(Expr::Ident(word.clone()))
                }
            },
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.eat("]") {
                    items.push(self.assignment()?);
                    if !self.check("]") {
                        self.expect(",")?;
                    }
                }
                Ok(Expr::Array(items))
            }
            TokenKind::Punct("{") => self.object_literal(),
            _ => Err(self.unexpected()),
        }
    }

    fn object_literal(&mut self) -> Result<Expr, ScriptError> {
        self.expect("{")?;
        let mut properties = Vec::new();

        while !self.eat("}") {
            let token = self.advance();
            let (key, shorthand_ok) = match token.kind {
                TokenKind::Identifier(ref name) => (name.clone(), !is_reserved(name)),
                TokenKind::String(ref s) => (s.clone(), false),
                TokenKind::Number(n) => (format_number(n), false),
                _ => {
                    return Err(ScriptError::syntax(
                        token.describe(),
                        token.line,
                        token.column,
                    ));
                }
            };

            let value = if self.check("(") {
                let def = self.function_rest(Some(key.clone()))?;
                Expr::Function(Rc::new(def))
            } else if self.eat(":") {
                self.assignment()?
            } else if shorthand_ok && (self.check(",") || self.check("}")) {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected());
            };
            properties.push((key, value));

            if !self.check("}") {
                self.expect(",")?;
            }
        }

        Ok(Expr::Object(properties))
    }
}

/// Parse the source of one `${...}` template substitution
fn parse_substitution(
    source: &str,
    line: usize,
    column: usize,
    depth: usize,
) -> Result<Expr, ScriptError> {
    let tokens = tokenize_at(source, line, column)?;
    let mut parser = Parser::new(tokens);
    parser.prev_line = line;
    parser.depth = depth;
    let expr = parser.expression()?;
    if !parser.at_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(source: &str) -> Expr {
        let program = parse(source).unwrap();
        match program.body.into_iter().next() {
            Some(Stmt::Expr(expr)) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_two_statements_with_semicolons() {
        let program = parse("console.log('a'); console.log('b')").unwrap();
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_newline_terminates_statement() {
        let program = parse("let a = 1\nlet b = 2\na + b").unwrap();
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_missing_separator_on_same_line_is_error() {
        let err = parse("let a = 1 let b = 2").unwrap_err();
        assert_eq!(err.message(), "Unexpected token 'let'");
        assert_eq!(err.position(), Some((1, 11)));
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let expr = parse_expr("2 ** 3 ** 2");
        let Expr::Binary { op, left, right } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Pow);
        assert_eq!(*left, Expr::Number(2.0));
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn test_arrow_functions() {
        assert!(matches!(parse_expr("x => x * 2"), Expr::Function(_)));
        assert!(matches!(parse_expr("(a, b) => { return a }"), Expr::Function(_)));
        // A parenthesized expression is not an arrow
        assert!(matches!(parse_expr("(1 + 2) * 3"), Expr::Binary { .. }));
    }

    #[test]
    fn test_new_error() {
        let expr = parse_expr("new Error('boom')");
        let Expr::New { callee, args } = expr else {
            panic!("expected new");
        };
        assert_eq!(*callee, Expr::Ident("Error".to_string()));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_throw_statement() {
        let program = parse("throw new Error('boom')").unwrap();
        assert!(matches!(program.body[0], Stmt::Throw(Expr::New { .. })));
    }

    #[test]
    fn test_return_before_newline_has_no_value() {
        let program = parse("function f() {\n  return\n  1\n}").unwrap();
        let Stmt::Function(def) = &program.body[0] else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &def.body else {
            panic!("expected block body");
        };
        assert_eq!(body[0], Stmt::Return(None));
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_for_of_and_c_style_for() {
        let program = parse("for (const x of xs) {}\nfor (let i = 0; i < 3; i++) {}").unwrap();
        assert!(matches!(program.body[0], Stmt::ForOf { kind: DeclKind::Const, .. }));
        assert!(matches!(program.body[1], Stmt::For { .. }));
    }

    #[test]
    fn test_object_literal_forms() {
        let expr = parse_expr("({a: 1, 'b c': 2, 3: x, d, e() { return 1 }})");
        let Expr::Object(props) = expr else {
            panic!("expected object");
        };
        let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b c", "3", "d", "e"]);
    }

    #[test]
    fn test_template_substitution() {
        let expr = parse_expr("`a${1 + 1}b`");
        let Expr::Template(segments) = expr else {
            panic!("expected template");
        };
        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[1], TemplateSegment::Expr(Expr::Binary { .. })));
    }

    #[test]
    fn test_try_requires_catch_or_finally() {
        let err = parse("try {}").unwrap_err();
        assert_eq!(err.message(), "Missing catch or finally after try");
        assert!(parse("try {} catch {}").is_ok());
        assert!(parse("try {} finally {}").is_ok());
    }

    #[test]
    fn test_const_requires_initializer() {
        let err = parse("const x;").unwrap_err();
        assert_eq!(err.message(), "Missing initializer in const declaration");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("1 = 2").unwrap_err();
        assert_eq!(err.message(), "Invalid left-hand side in assignment");
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let err = parse("console.log(").unwrap_err();
        assert_eq!(err.message(), "Unexpected end of input");
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let depth = MAX_NESTING_DEPTH + 50;
        let source = format!("console.log({}1{})", "[".repeat(depth), "]".repeat(depth));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.message(), "Maximum nesting depth exceeded");
        assert!(err.position().is_some());

        let parens = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(
            parse(&parens).unwrap_err().message(),
            "Maximum nesting depth exceeded"
        );

        let blocks = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
        assert_eq!(
            parse(&blocks).unwrap_err().message(),
            "Maximum nesting depth exceeded"
        );
    }

    #[test]
    fn test_long_operator_chains_are_bounded() {
        let negations = format!("{}x", "!".repeat(MAX_NESTING_DEPTH + 1));
        assert!(parse(&negations).is_err());

        let sum = vec!["1"; MAX_NESTING_DEPTH + 10].join(" + ");
        assert_eq!(
            parse(&sum).unwrap_err().message(),
            "Maximum nesting depth exceeded"
        );

        let calls = format!("f{}", "()".repeat(MAX_NESTING_DEPTH + 10));
        assert!(parse(&calls).is_err());
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let source = format!("console.log({}1{})", "[".repeat(50), "]".repeat(50));
        assert!(parse(&source).is_ok());
        let sum = vec!["1"; 100].join(" + ");
        assert!(parse(&sum).is_ok());
    }

    #[test]
    fn test_reserved_word_as_property_name() {
        assert!(parse("a.new; a.return").is_ok());
    }
}
