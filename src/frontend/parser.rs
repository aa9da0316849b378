//! Parser for the Spl language
//!
//! Recursive descent parser with Pratt parsing for expressions.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Set while parsing `if`/`while` conditions and match scrutinees,
    /// where `Name {` opens a block rather than a struct literal
    no_struct_literal: bool,
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        Ok(Self::from_tokens(lexer.tokenize()?))
    }

    /// Create a parser from pre-tokenized input
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, no_struct_literal: false }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::UnexpectedToken {
            expected: expected.to_string(),
            got: self.current_kind().to_string(),
            span: self.current().span,
        }
    }

    /// Span from `start` through the last consumed token
    fn span_from(&self, start: Span) -> Span {
        start.merge(&self.tokens[self.pos.saturating_sub(1)].span)
    }

    /// Parse `item (, item)* [,]` up to (not including) `close`
    fn parse_comma_list<T>(
        &mut self,
        close: &TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while !self.check(close) && !self.is_at_end() {
            items.push(item(self)?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut items = Vec::new();

        while !self.is_at_end() {
            items.push(self.parse_item()?);
        }

        Ok(Program { items })
    }

    fn parse_item(&mut self) -> Result<Item> {
        match self.current_kind() {
            TokenKind::Fn => Ok(Item::Function(self.parse_function()?)),
            TokenKind::Struct => Ok(Item::Struct(self.parse_struct()?)),
            TokenKind::Enum => Ok(Item::Enum(self.parse_enum()?)),
            TokenKind::Trait => Ok(Item::Trait(self.parse_trait()?)),
            TokenKind::Impl => Ok(Item::Impl(self.parse_impl()?)),
            _ => Err(self.unexpected("item (fn, struct, enum, trait, impl)")),
        }
    }

    fn parse_function(&mut self) -> Result<Function> {
        let start = self.current().span;
        let sig = self.parse_fn_sig()?;
        let body = self.parse_block()?;

        Ok(Function { sig, body, span: self.span_from(start) })
    }

    fn parse_fn_sig(&mut self) -> Result<FunctionSig> {
        let start = self.current().span;
        self.expect(TokenKind::Fn)?;

        let name = self.parse_ident()?;
        let generics = self.parse_generic_params()?;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_comma_list(&TokenKind::RParen, Self::parse_param)?;
        self.expect(TokenKind::RParen)?;

        let ret_type = if self.consume(&TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let where_clause = self.parse_where_clause()?;

        Ok(FunctionSig {
            name,
            generics,
            params,
            ret_type,
            where_clause,
            span: self.span_from(start),
        })
    }

    fn parse_param(&mut self) -> Result<Param> {
        let start = self.current().span;
        let name = self.parse_ident()?;
        if name.name == "self" && !self.check(&TokenKind::Colon) {
            return Ok(Param { name, ty: None, span: start });
        }
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;

        Ok(Param { name, ty: Some(ty), span: self.span_from(start) })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident { name, span: token.span })
            }
            _ => Err(Error::ExpectedIdent { span: token.span }),
        }
    }

    /// `<T: A + B, U>`, or nothing
    fn parse_generic_params(&mut self) -> Result<Vec<GenericParam>> {
        if !self.consume(&TokenKind::Lt) {
            return Ok(Vec::new());
        }
        let params = self.parse_comma_list(&TokenKind::Gt, |p| {
            let start = p.current().span;
            let name = p.parse_ident()?;
            let bounds = if p.consume(&TokenKind::Colon) {
                p.parse_bounds()?
            } else {
                Vec::new()
            };
            Ok(GenericParam { name, bounds, span: p.span_from(start) })
        })?;
        self.expect(TokenKind::Gt)?;
        Ok(params)
    }

    /// `A + B<X> + C`
    fn parse_bounds(&mut self) -> Result<Vec<TraitBound>> {
        let mut bounds = vec![self.parse_trait_bound()?];
        while self.consume(&TokenKind::Plus) {
            bounds.push(self.parse_trait_bound()?);
        }
        Ok(bounds)
    }

    fn parse_trait_bound(&mut self) -> Result<TraitBound> {
        let start = self.current().span;
        let name = self.parse_ident()?;
        let args = self.parse_type_args()?;
        Ok(TraitBound { name, args, span: self.span_from(start) })
    }

    fn parse_where_clause(&mut self) -> Result<Vec<WherePredicate>> {
        if !self.consume(&TokenKind::Where) {
            return Ok(Vec::new());
        }
        let mut predicates = Vec::new();
        loop {
            let start = self.current().span;
            let param = self.parse_ident()?;
            self.expect(TokenKind::Colon)?;
            let bounds = self.parse_bounds()?;
            predicates.push(WherePredicate { param, bounds, span: self.span_from(start) });
            if !self.consume(&TokenKind::Comma) || self.check(&TokenKind::LBrace) {
                break;
            }
        }
        Ok(predicates)
    }

    fn parse_type_args(&mut self) -> Result<Vec<Type>> {
        if !self.consume(&TokenKind::Lt) {
            return Ok(Vec::new());
        }
        let args = self.parse_comma_list(&TokenKind::Gt, Self::parse_type)?;
        self.expect(TokenKind::Gt)?;
        Ok(args)
    }

    fn parse_type(&mut self) -> Result<Type> {
        let start = self.current().span;

        if self.consume(&TokenKind::Fn) {
            self.expect(TokenKind::LParen)?;
            let params = self.parse_comma_list(&TokenKind::RParen, Self::parse_type)?;
            self.expect(TokenKind::RParen)?;
            let ret = if self.consume(&TokenKind::Arrow) {
                self.parse_type()?
            } else {
                Type::Named { name: "Unit".to_string(), args: Vec::new(), span: self.span_from(start) }
            };
            return Ok(Type::Function {
                params,
                ret: Box::new(ret),
                span: self.span_from(start),
            });
        }

        if let TokenKind::Ident(name) = self.current_kind().clone() {
            self.advance();
            let args = self.parse_type_args()?;
            return Ok(Type::Named { name, args, span: self.span_from(start) });
        }

        Err(Error::ExpectedType { span: self.current().span })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.current().span;
        self.expect(TokenKind::LBrace)?;

        // Struct literals are allowed again inside nested blocks
        let saved = std::mem::replace(&mut self.no_struct_literal, false);
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }
        self.no_struct_literal = saved;

        self.expect(TokenKind::RBrace)?;

        Ok(Block { stmts, span: self.span_from(start) })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.current_kind() {
            TokenKind::Let => self.parse_let_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break => {
                let span = self.advance().span;
                self.consume(&TokenKind::Semicolon);
                Ok(Stmt::Break { span })
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                self.consume(&TokenKind::Semicolon);
                Ok(Stmt::Continue { span })
            }
            _ => {
                let expr = self.parse_expr()?;
                let semi = self.consume(&TokenKind::Semicolon);
                if !semi && !expr.is_block_like() && !self.check(&TokenKind::RBrace) {
                    return Err(self.unexpected("';'"));
                }
                Ok(Stmt::Expr { expr, semi })
            }
        }
    }

    fn parse_let_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Let)?;

        let name = self.parse_ident()?;
        let ty = if self.consume(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::Let { name, ty, value, span: self.span_from(start) })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Return)?;

        let value = if !self.check(&TokenKind::Semicolon) && !self.check(&TokenKind::RBrace) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let span = self.span_from(start);
        self.consume(&TokenKind::Semicolon);

        Ok(Stmt::Return { value, span })
    }

    // ==================== Expression Parsing (Pratt) ====================

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    /// Expression in a position followed by a block (`if c {`, `match x {`)
    fn parse_expr_no_struct(&mut self) -> Result<Expr> {
        let saved = std::mem::replace(&mut self.no_struct_literal, true);
        let result = self.parse_expr();
        self.no_struct_literal = saved;
        result
    }

    /// Parse expression with binding power (Pratt parsing)
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op_token = self.current().clone();
            let Some(bp) = op_token.kind.binary_precedence() else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.advance();

            if let Some(assign_op) = Self::token_to_assign_op(&op_token.kind) {
                // Right-associative
                let value = self.parse_expr_bp(bp)?;
                let span = left.span().merge(&value.span());
                left = Expr::Assign {
                    target: Box::new(left),
                    op: assign_op,
                    value: Box::new(value),
                    span,
                };
                continue;
            }

            let op = Self::token_to_binop(&op_token.kind).ok_or_else(|| Error::UnexpectedToken {
                expected: "binary operator".to_string(),
                got: op_token.kind.to_string(),
                span: op_token.span,
            })?;
            let right = self.parse_expr_bp(bp + 1)?;
            let span = left.span().merge(&right.span());

            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Minus => {
                self.advance();
                // Fold the sign into integer literals so `-9223372036854775808` fits Int
                if let TokenKind::IntLit { value, suffix } = self.current_kind().clone() {
                    let lit = self.advance();
                    let expr = Expr::Literal(Literal::Int {
                        value: -(value as i128),
                        suffix,
                        span: token.span.merge(&lit.span),
                    });
                    return self.parse_postfix(expr);
                }
                let expr = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    span: token.span.merge(&expr.span()),
                    expr: Box::new(expr),
                })
            }
            TokenKind::Not => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    span: token.span.merge(&expr.span()),
                    expr: Box::new(expr),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        let expr = match token.kind {
            TokenKind::IntLit { value, suffix } => {
                self.advance();
                Expr::Literal(Literal::Int { value: value as i128, suffix, span: token.span })
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Expr::Literal(Literal::String(s, token.span))
            }
            TokenKind::True => {
                self.advance();
                Expr::Literal(Literal::Bool(true, token.span))
            }
            TokenKind::False => {
                self.advance();
                Expr::Literal(Literal::Bool(false, token.span))
            }

            // Identifier or struct literal
            TokenKind::Ident(ref name) => {
                let is_type_name = name.starts_with(|c: char| c.is_uppercase());
                let ident = self.parse_ident()?;
                if is_type_name && !self.no_struct_literal && self.check(&TokenKind::LBrace) {
                    self.parse_struct_literal(ident)?
                } else {
                    Expr::Ident(ident)
                }
            }

            TokenKind::LParen => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_struct_literal, false);
                let inner = self.parse_expr();
                self.no_struct_literal = saved;
                let inner = inner?;
                self.expect(TokenKind::RParen)?;
                inner
            }

            TokenKind::LBrace => Expr::Block(self.parse_block()?),
            TokenKind::If => self.parse_if_expr()?,
            TokenKind::Match => self.parse_match_expr()?,

            TokenKind::Loop => {
                self.advance();
                let body = self.parse_block()?;
                Expr::Loop { span: token.span.merge(&body.span), body }
            }

            TokenKind::While => {
                self.advance();
                let cond = self.parse_expr_no_struct()?;
                let body = self.parse_block()?;
                Expr::While {
                    cond: Box::new(cond),
                    span: token.span.merge(&body.span),
                    body,
                }
            }

            TokenKind::LBracket => {
                self.advance();
                let elements = self.parse_comma_list(&TokenKind::RBracket, Self::parse_expr)?;
                self.expect(TokenKind::RBracket)?;
                Expr::Array { elements, span: self.span_from(token.span) }
            }

            _ => return Err(Error::ExpectedExpr { span: token.span }),
        };

        self.parse_postfix(expr)
    }

    fn parse_struct_literal(&mut self, name: Ident) -> Result<Expr> {
        self.expect(TokenKind::LBrace)?;
        let fields = self.parse_comma_list(&TokenKind::RBrace, |p| {
            let field = p.parse_ident()?;
            p.expect(TokenKind::Colon)?;
            let value = p.parse_expr()?;
            Ok((field, value))
        })?;
        let end = self.expect(TokenKind::RBrace)?;
        Ok(Expr::StructLit {
            span: name.span.merge(&end.span),
            name,
            fields,
        })
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        let saved = std::mem::replace(&mut self.no_struct_literal, false);
        let args = self.parse_comma_list(&TokenKind::RParen, Self::parse_expr);
        self.no_struct_literal = saved;
        let args = args?;
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            if self.consume(&TokenKind::LParen) {
                let args = self.parse_call_args()?;
                expr = Expr::Call {
                    span: self.span_from(expr.span()),
                    func: Box::new(expr),
                    args,
                };
            } else if self.consume(&TokenKind::Dot) {
                let field = self.parse_ident()?;
                if self.consume(&TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    expr = Expr::MethodCall {
                        span: self.span_from(expr.span()),
                        expr: Box::new(expr),
                        method: field,
                        args,
                    };
                } else {
                    expr = Expr::Field {
                        span: expr.span().merge(&field.span),
                        expr: Box::new(expr),
                        field,
                    };
                }
            } else if self.consume(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    span: self.span_from(expr.span()),
                    expr: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_if_expr(&mut self) -> Result<Expr> {
        let start = self.current().span;
        self.expect(TokenKind::If)?;

        let cond = self.parse_expr_no_struct()?;
        let then_block = self.parse_block()?;

        let else_branch = if self.consume(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(Box::new(self.parse_if_expr()?))
            } else {
                Some(Box::new(Expr::Block(self.parse_block()?)))
            }
        } else {
            None
        };

        Ok(Expr::If {
            cond: Box::new(cond),
            then_block,
            else_branch,
            span: self.span_from(start),
        })
    }

    fn parse_match_expr(&mut self) -> Result<Expr> {
        let start = self.current().span;
        self.expect(TokenKind::Match)?;

        let expr = self.parse_expr_no_struct()?;
        self.expect(TokenKind::LBrace)?;

        let mut arms = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            arms.push(self.parse_match_arm()?);
        }

        self.expect(TokenKind::RBrace)?;

        Ok(Expr::Match {
            expr: Box::new(expr),
            arms,
            span: self.span_from(start),
        })
    }

    fn parse_match_arm(&mut self) -> Result<MatchArm> {
        let start = self.current().span;
        let pattern = self.parse_pattern()?;

        self.expect(TokenKind::FatArrow)?;
        let body = self.parse_expr()?;
        let span = self.span_from(start);

        if !self.consume(&TokenKind::Comma) && !body.is_block_like() && !self.check(&TokenKind::RBrace) {
            return Err(self.unexpected("','"));
        }

        Ok(MatchArm { pattern, body, span })
    }

    /// `Ctor` or `Ctor(a, _, c)`
    fn parse_pattern(&mut self) -> Result<Pattern> {
        let start = self.current().span;
        let constructor = match self.current_kind() {
            TokenKind::Ident(_) => self.parse_ident()?,
            _ => return Err(Error::ExpectedPattern { span: start }),
        };

        let bindings = if self.consume(&TokenKind::LParen) {
            let bindings = self.parse_comma_list(&TokenKind::RParen, Self::parse_ident)?;
            self.expect(TokenKind::RParen)?;
            bindings
        } else {
            Vec::new()
        };

        Ok(Pattern { constructor, bindings, span: self.span_from(start) })
    }

    // ==================== Struct, Enum, Trait, Impl ====================

    fn parse_struct(&mut self) -> Result<StructDef> {
        let start = self.current().span;
        self.expect(TokenKind::Struct)?;

        let name = self.parse_ident()?;
        let generics = self.parse_generic_params()?;
        self.expect(TokenKind::LBrace)?;

        let fields = self.parse_comma_list(&TokenKind::RBrace, |p| {
            let name = p.parse_ident()?;
            p.expect(TokenKind::Colon)?;
            let ty = p.parse_type()?;
            Ok(Field { span: name.span.merge(&ty.span()), name, ty })
        })?;

        self.expect(TokenKind::RBrace)?;

        Ok(StructDef { name, generics, fields, span: self.span_from(start) })
    }

    fn parse_enum(&mut self) -> Result<EnumDef> {
        let start = self.current().span;
        self.expect(TokenKind::Enum)?;

        let name = self.parse_ident()?;
        let generics = self.parse_generic_params()?;
        self.expect(TokenKind::LBrace)?;

        let variants = self.parse_comma_list(&TokenKind::RBrace, |p| {
            let var_start = p.current().span;
            let name = p.parse_ident()?;
            let fields = if p.consume(&TokenKind::LParen) {
                let fields = p.parse_comma_list(&TokenKind::RParen, Self::parse_type)?;
                p.expect(TokenKind::RParen)?;
                fields
            } else {
                Vec::new()
            };
            Ok(Variant { name, fields, span: p.span_from(var_start) })
        })?;

        self.expect(TokenKind::RBrace)?;

        Ok(EnumDef { name, generics, variants, span: self.span_from(start) })
    }

    fn parse_trait(&mut self) -> Result<TraitDef> {
        let start = self.current().span;
        self.expect(TokenKind::Trait)?;

        let name = self.parse_ident()?;
        let generics = self.parse_generic_params()?;
        self.expect(TokenKind::LBrace)?;

        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            methods.push(self.parse_fn_sig()?);
            self.expect(TokenKind::Semicolon)?;
        }

        self.expect(TokenKind::RBrace)?;

        Ok(TraitDef { name, generics, methods, span: self.span_from(start) })
    }

    fn parse_impl(&mut self) -> Result<ImplBlock> {
        let start = self.current().span;
        self.expect(TokenKind::Impl)?;

        let generics = self.parse_generic_params()?;
        let first = self.parse_type()?;

        let (trait_ref, target) = if self.consume(&TokenKind::For) {
            let trait_ref = match first {
                Type::Named { name, args, span } => TraitBound {
                    name: Ident::new(name, span),
                    args,
                    span,
                },
                Type::Function { span, .. } => {
                    return Err(Error::UnexpectedToken {
                        expected: "trait name".to_string(),
                        got: "function type".to_string(),
                        span,
                    })
                }
            };
            (Some(trait_ref), self.parse_type()?)
        } else {
            (None, first)
        };
        let where_clause = self.parse_where_clause()?;

        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            methods.push(self.parse_function()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(ImplBlock {
            generics,
            trait_ref,
            target,
            where_clause,
            methods,
            span: self.span_from(start),
        })
    }

    fn token_to_binop(kind: &TokenKind) -> Option<BinOp> {
        match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::Ne => Some(BinOp::Ne),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Ge => Some(BinOp::Ge),
            TokenKind::AndAnd => Some(BinOp::And),
            TokenKind::OrOr => Some(BinOp::Or),
            _ => None,
        }
    }

    /// `=` maps to `Some(None)`, `+=` to `Some(Some(Add))`
    fn token_to_assign_op(kind: &TokenKind) -> Option<Option<BinOp>> {
        match kind {
            TokenKind::Eq => Some(None),
            TokenKind::PlusEq => Some(Some(BinOp::Add)),
            TokenKind::MinusEq => Some(Some(BinOp::Sub)),
            TokenKind::StarEq => Some(Some(BinOp::Mul)),
            TokenKind::SlashEq => Some(Some(BinOp::Div)),
            _ => None,
        }
    }
}
