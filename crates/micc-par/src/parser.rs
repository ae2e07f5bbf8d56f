//! Recursive-descent parser with Pratt expression parsing.

use micc_lex::{Lexer, Token, TokenKind};
use micc_util::{Diagnostic, SourceLoc, Span};

use crate::ast::{
    BinaryOp, Declaration, Expr, ExprKind, Function, FunctionParameter, FunctionPrototype, Name,
    Root, Stmt, StmtKind, UnaryOp, Variable,
};
use crate::precedence::Precedence;
use crate::types::Type;

type ParseResult<T> = Result<T, Diagnostic>;

/// The parser owns a lexer cursor over the borrowed source buffer.
///
/// Lookahead is value-level: [`Parser::peek_token`] copies the cursor,
/// advances the copy, and throws it away, so peeking never commits.
pub struct Parser<'a> {
    buffer: &'a str,
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(buffer: &'a str) -> Self {
        Self {
            buffer,
            lexer: Lexer::new(buffer),
        }
    }

    fn next_token(&mut self) -> Token {
        self.lexer.next_token()
    }

    fn peek_token(&self) -> Token {
        let mut lexer_copy = self.lexer;
        lexer_copy.next_token()
    }

    /// Consume the next token iff it has the expected kind.
    fn eat_token(&mut self, kind: TokenKind) -> bool {
        if self.peek_token().kind == kind {
            self.next_token();
            true
        } else {
            false
        }
    }

    fn loc(&self, span: Span) -> SourceLoc {
        SourceLoc::from_offset(self.buffer, span.start)
    }

    fn peek_loc(&self) -> SourceLoc {
        self.loc(self.peek_token().span)
    }

    fn error_at_peek(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(self.peek_loc(), message)
    }

    /// Parse the whole buffer into an ordered declaration list.
    pub fn parse_root(&mut self) -> ParseResult<Root> {
        let mut root = Root::default();

        while self.peek_token().kind != TokenKind::Eof {
            root.declarations.push(self.parse_declaration()?);
        }

        Ok(root)
    }

    fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        if !self.peek_token().kind.starts_type() {
            return Err(self.error_at_peek("expected a top level declaration"));
        }

        let ty = self.parse_type()?;
        let name = self.parse_name()?;

        match self.peek_token().kind {
            TokenKind::Semicolon | TokenKind::Assign => {
                let variable = self.parse_variable_declaration(ty, name)?;
                Ok(Declaration::Variable(variable))
            }
            TokenKind::OpenParen => {
                let function = self.parse_function_declaration(ty, name)?;
                Ok(Declaration::Function(function))
            }
            _ => Err(self.error_at_peek("expected a ';' after top level declarator")),
        }
    }

    /// Parse a type name, including the multi-word `short`/`long` forms.
    fn parse_type(&mut self) -> ParseResult<Type> {
        let token = self.next_token();

        let ty = match token.kind {
            TokenKind::KeywordVoid => Type::Void,
            TokenKind::KeywordChar => Type::Char,
            TokenKind::KeywordShort => {
                // "short int" is just "short".
                self.eat_token(TokenKind::KeywordInt);
                Type::Short
            }
            TokenKind::KeywordInt => Type::Int,
            TokenKind::KeywordLong => {
                if self.peek_token().kind == TokenKind::KeywordLong {
                    self.next_token();
                    self.eat_token(TokenKind::KeywordInt);
                    Type::LongLong
                } else if self.peek_token().kind == TokenKind::KeywordDouble {
                    self.next_token();
                    Type::LongDouble
                } else {
                    self.eat_token(TokenKind::KeywordInt);
                    Type::Long
                }
            }
            TokenKind::KeywordFloat => Type::Float,
            TokenKind::KeywordDouble => Type::Double,
            _ => {
                return Err(Diagnostic::error(self.loc(token.span), "unkown type"));
            }
        };

        Ok(ty)
    }

    fn parse_name(&mut self) -> ParseResult<Name> {
        if self.peek_token().kind != TokenKind::Identifier {
            return Err(self.error_at_peek("expected an identifier"));
        }

        let token = self.next_token();

        Ok(Name {
            text: token.span.text(self.buffer).to_string(),
            loc: self.loc(token.span),
        })
    }

    /// The Pratt loop: parse a prefix expression, then extend it while the
    /// next token binds tighter than `min_precedence`.
    fn parse_expr(&mut self, min_precedence: Precedence) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary_expr()?;

        while self.peek_token().kind != TokenKind::Semicolon
            && min_precedence < Precedence::from_token(self.peek_token().kind)
        {
            lhs = self.parse_infix_expr(lhs)?;
        }

        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expr> {
        match self.peek_token().kind {
            TokenKind::Minus => self.parse_unary_operation(UnaryOp::Minus),
            TokenKind::Bang => self.parse_unary_operation(UnaryOp::Bang),
            TokenKind::Int => self.parse_int_expr(),
            TokenKind::Float => self.parse_float_expr(),
            TokenKind::Identifier => {
                let name = self.parse_name()?;
                let loc = name.loc;
                Ok(Expr {
                    kind: ExprKind::Identifier(name),
                    loc,
                })
            }
            _ => Err(self.error_at_peek("expected an expression")),
        }
    }

    fn parse_unary_operation(&mut self, op: UnaryOp) -> ParseResult<Expr> {
        let operator_token = self.next_token();
        let loc = self.loc(operator_token.span);

        let rhs = self.parse_expr(Precedence::Prefix)?;

        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                rhs: Box::new(rhs),
            },
            loc,
        })
    }

    fn parse_int_expr(&mut self) -> ParseResult<Expr> {
        let token = self.next_token();
        let loc = self.loc(token.span);

        let value = token.span.text(self.buffer).parse::<u64>().map_err(|_| {
            Diagnostic::error(
                loc,
                "integer constant is too big to represent in any integer type",
            )
        })?;

        Ok(Expr {
            kind: ExprKind::Int(value),
            loc,
        })
    }

    fn parse_float_expr(&mut self) -> ParseResult<Expr> {
        let token = self.next_token();
        let loc = self.loc(token.span);
        let text = token.span.text(self.buffer);

        // The token scanner consumes dots greedily, so the text may have a
        // malformed tail like "1.2.3". Parse the longest valid prefix, the
        // way strtold stops at the first byte it cannot use.
        let mut end = text.len();
        let value = loop {
            if let Ok(value) = text[..end].parse::<f64>() {
                break value;
            }

            end -= 1;

            if end == 0 {
                break 0.0;
            }
        };

        if value.is_infinite() {
            return Err(Diagnostic::error(
                loc,
                "float constant is too big to represent in any float type",
            ));
        }

        Ok(Expr {
            kind: ExprKind::Float(value),
            loc,
        })
    }

    fn parse_infix_expr(&mut self, lhs: Expr) -> ParseResult<Expr> {
        match self.peek_token().kind {
            TokenKind::Plus => self.parse_binary_operation(lhs, BinaryOp::Plus),
            TokenKind::Minus => self.parse_binary_operation(lhs, BinaryOp::Minus),
            TokenKind::Star => self.parse_binary_operation(lhs, BinaryOp::Star),
            TokenKind::ForwardSlash => self.parse_binary_operation(lhs, BinaryOp::Slash),
            TokenKind::OpenParen => self.parse_call_expr(lhs),
            _ => Err(self.error_at_peek("expected an expression")),
        }
    }

    fn parse_binary_operation(&mut self, lhs: Expr, op: BinaryOp) -> ParseResult<Expr> {
        let operator_token = self.next_token();
        let loc = self.loc(operator_token.span);

        // Passing the operator's own precedence as the minimum makes the
        // operator left-associative: an equal-precedence follower will not
        // be folded into the right-hand side.
        let rhs = self.parse_expr(Precedence::from_token(operator_token.kind))?;

        Ok(Expr {
            kind: ExprKind::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            },
            loc,
        })
    }

    /// Parse a call suffix; `lhs` becomes the callee.
    fn parse_call_expr(&mut self, callee: Expr) -> ParseResult<Expr> {
        let loc = callee.loc;

        self.next_token(); // the open paren

        let mut args = Vec::new();

        while self.peek_token().kind != TokenKind::Eof
            && self.peek_token().kind != TokenKind::CloseParen
        {
            args.push(self.parse_expr(Precedence::Lowest)?);

            if !self.eat_token(TokenKind::Comma)
                && self.peek_token().kind != TokenKind::CloseParen
            {
                return Err(self.error_at_peek("expected a ','"));
            }
        }

        if !self.eat_token(TokenKind::CloseParen) {
            return Err(self.error_at_peek("expected a ')'"));
        }

        Ok(Expr {
            kind: ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            loc,
        })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.peek_token().kind {
            // Empty statements are permitted and discarded.
            TokenKind::Semicolon => {
                self.next_token();
                self.parse_stmt()
            }

            kind if kind.starts_type() => {
                let ty = self.parse_type()?;
                let name = self.parse_name()?;
                let loc = name.loc;

                // Only the variable form exists inside a function body.
                let variable = self.parse_variable_declaration(ty, name)?;

                Ok(Stmt {
                    kind: StmtKind::VariableDecl(variable),
                    loc,
                })
            }

            TokenKind::KeywordReturn => self.parse_return_stmt(),

            _ => {
                let loc = self.peek_loc();
                let expr = self.parse_expr(Precedence::Lowest)?;

                if !self.eat_token(TokenKind::Semicolon) {
                    return Err(self.error_at_peek("expected a ';' at the end of statement"));
                }

                Ok(Stmt {
                    kind: StmtKind::Expr(expr),
                    loc,
                })
            }
        }
    }

    fn parse_return_stmt(&mut self) -> ParseResult<Stmt> {
        let return_token = self.next_token();
        let loc = self.loc(return_token.span);

        let value = if self.peek_token().kind != TokenKind::Semicolon {
            Some(self.parse_expr(Precedence::Lowest)?)
        } else {
            None
        };

        if !self.eat_token(TokenKind::Semicolon) {
            return Err(self.error_at_peek("expected a ';' at the end of statement"));
        }

        Ok(Stmt {
            kind: StmtKind::Return(value),
            loc,
        })
    }

    /// Parse what follows `(type, name)` when it is a variable: either an
    /// immediate `;` (default initialization) or `= expr ;`.
    fn parse_variable_declaration(&mut self, ty: Type, name: Name) -> ParseResult<Variable> {
        let mut value = None;

        if !self.eat_token(TokenKind::Semicolon) {
            if !self.eat_token(TokenKind::Assign) {
                return Err(self.error_at_peek("expected a ';' at the end of declaration"));
            }

            value = Some(self.parse_expr(Precedence::Lowest)?);

            if !self.eat_token(TokenKind::Semicolon) {
                return Err(self.error_at_peek("expected a ';' at the end of declaration"));
            }
        }

        Ok(Variable { ty, name, value })
    }

    fn parse_function_declaration(
        &mut self,
        return_type: Type,
        name: Name,
    ) -> ParseResult<Function> {
        let (parameters, variadic) = self.parse_function_parameters()?;

        let mut prototype = FunctionPrototype {
            return_type,
            name,
            parameters,
            variadic,
            is_definition: false,
        };

        let mut body = Vec::new();

        if !self.eat_token(TokenKind::Semicolon) {
            prototype.is_definition = true;
            body = self.parse_function_body()?;
        }

        Ok(Function { prototype, body })
    }

    /// Parse a parenthesized parameter list.
    ///
    /// Returns the parameters and the variadic flag. The flag starts true
    /// (an empty list promises nothing about arguments) and is cleared by
    /// any parameter, including the lone `void` that declares "takes no
    /// arguments" without declaring a parameter.
    fn parse_function_parameters(&mut self) -> ParseResult<(Vec<FunctionParameter>, bool)> {
        if !self.eat_token(TokenKind::OpenParen) {
            return Err(self.error_at_peek("expected a '('"));
        }

        let mut parameters = Vec::new();
        let mut variadic = true;

        while self.peek_token().kind != TokenKind::Eof
            && self.peek_token().kind != TokenKind::CloseParen
        {
            let parameter_type_loc = self.peek_loc();
            let ty = self.parse_type()?;

            if ty == Type::Void {
                if self.peek_token().kind == TokenKind::Identifier {
                    return Err(self.error_at_peek("function parameter with incomplete type"));
                }

                if !variadic {
                    return Err(Diagnostic::error(
                        parameter_type_loc,
                        "'void' must be the first and only parameter",
                    ));
                }
            } else {
                let name = self.parse_name()?;
                parameters.push(FunctionParameter { ty, name });
            }

            variadic = false;

            if !self.eat_token(TokenKind::Comma)
                && self.peek_token().kind != TokenKind::CloseParen
            {
                return Err(self.error_at_peek("expected a ','"));
            }
        }

        if !self.eat_token(TokenKind::CloseParen) {
            return Err(self.error_at_peek("expected a ')'"));
        }

        Ok((parameters, variadic))
    }

    fn parse_function_body(&mut self) -> ParseResult<Vec<Stmt>> {
        if !self.eat_token(TokenKind::OpenBrace) {
            return Err(self.error_at_peek("expected a '{'"));
        }

        let mut body = Vec::new();

        while self.peek_token().kind != TokenKind::Eof
            && self.peek_token().kind != TokenKind::CloseBrace
        {
            body.push(self.parse_stmt()?);
        }

        if !self.eat_token(TokenKind::CloseBrace) {
            return Err(self.error_at_peek("expected a '}'"));
        }

        Ok(body)
    }
}
