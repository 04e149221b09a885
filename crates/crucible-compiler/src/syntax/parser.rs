//! Recursive-descent parser.
//!
//! Errors are reported into the [`DiagnosticBag`] and parsing continues:
//! statements resynchronise on `;` or `}`, and an expression that cannot
//! start yields [`ExprKind::Error`] without consuming the offending token.
//!
//! The checker and the code generator walk the tree recursively, so the
//! parser caps how deep it nests. A construct past [`MAX_NESTING`] is
//! reported once as `CRU8078` and skipped with its brackets balanced.

use super::Span;
use super::ast::{
    BinaryOp, Block, ClassDecl, CompilationUnit, Declarator, Expr, ExprKind, FieldDecl, IncDec,
    Member, MethodDecl, Modifiers, Param, Stmt, StmtKind, TypeRef, TypeRefKind, UnaryOp, Using,
};
use super::token::{Token, TokenKind, TokenValue};
use crate::diagnostics::{Code, DiagnosticBag};

use TokenKind as K;

/// Deepest nesting of statements, expressions, binary-operator chains and
/// member-access chains the parser builds.
pub(crate) const MAX_NESTING: usize = 64;

/// Parse a token stream produced by [`super::lex`].
pub(crate) fn parse(tokens: Vec<Token>, diags: &mut DiagnosticBag) -> CompilationUnit {
    Parser::new(tokens, diags).unit()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    diags: &'a mut DiagnosticBag,
    /// Start of the last reported error; a second error at the same spot is
    /// a cascade and is dropped.
    last_error: Option<u32>,
    namespace: String,
    depth: usize,
    nesting_reported: bool,
}

impl<'a> Parser<'a> {
    fn new(mut tokens: Vec<Token>, diags: &'a mut DiagnosticBag) -> Self {
        if tokens.last().is_none_or(|t| t.kind != K::Eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(Token {
                kind: K::Eof,
                span: Span::new(end, end),
                value: TokenValue::None,
            });
        }
        Self {
            tokens,
            pos: 0,
            diags,
            last_error: None,
            namespace: String::new(),
            depth: 0,
            nesting_reported: false,
        }
    }

    // -----------------------------------------------------------------------
    // Token cursor
    // -----------------------------------------------------------------------

    fn nth(&self, ahead: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.saturating_add(ahead).min(last)]
    }

    fn peek(&self) -> &Token {
        self.nth(0)
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn nth_kind(&self, ahead: usize) -> TokenKind {
        self.nth(ahead).kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != K::Eof {
            self.pos = self.pos.saturating_add(1);
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// End of the previous token, where "missing X" errors are reported.
    fn prev_end(&self) -> Span {
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end);
        Span::new(end, end)
    }

    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(Span::default, |t| t.span)
    }

    fn error(&mut self, code: Code, span: Span, message: impl Into<String>) {
        if self.last_error == Some(span.start) {
            return;
        }
        self.last_error = Some(span.start);
        self.diags.report(code, span, message);
    }

    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        let (code, message) = match kind {
            K::Semicolon => (Code::SemicolonExpected, "; expected".to_owned()),
            K::RBrace => (Code::CloseBraceExpected, "} expected".to_owned()),
            K::LBrace => (Code::OpenBraceExpected, "{ expected".to_owned()),
            K::Ident => (Code::IdentifierExpected, "Identifier expected".to_owned()),
            other => (Code::TokenExpected, format!("{other} expected")),
        };
        let span = if kind == K::Ident || self.at(K::Eof) {
            self.peek().span
        } else {
            self.prev_end()
        };
        self.error(code, span, message);
        false
    }

    fn expect_ident(&mut self) -> (String, Span) {
        if self.at(K::Ident) {
            let token = self.bump();
            (token.ident().to_owned(), token.span)
        } else {
            let span = self.peek().span;
            self.expect(K::Ident);
            (String::new(), span)
        }
    }

    /// Skip to just after the next `;`, or to a `}` or end of file.
    fn synchronize(&mut self) {
        loop {
            match self.kind() {
                K::Semicolon => {
                    self.bump();
                    return;
                },
                K::RBrace | K::Eof => return,
                _ => {
                    self.bump();
                },
            }
        }
    }

    // -----------------------------------------------------------------------
    // Nesting limit
    // -----------------------------------------------------------------------

    /// Enter one nesting level. `false` once the limit is exceeded; the
    /// caller still has to [`Self::ascend`].
    fn descend(&mut self) -> bool {
        self.depth = self.depth.saturating_add(1);
        self.depth <= MAX_NESTING
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Whether a chain of `links` left-nested nodes built at the current
    /// depth stays within the limit.
    fn chain_fits(&self, links: usize) -> bool {
        self.depth.saturating_add(links) <= MAX_NESTING
    }

    fn too_deep(&mut self) {
        if self.nesting_reported {
            return;
        }
        self.nesting_reported = true;
        let span = self.peek().span;
        self.error(
            Code::NestingTooDeep,
            span,
            "Statement or expression is nested too deeply",
        );
    }

    /// Skip the rest of a construct nested too deeply to build, keeping
    /// brackets balanced.
    ///
    /// A statement ends after its `;` or after the `}` closing a block it
    /// opened. An expression ends before a `;`, `,` or an unmatched closing
    /// bracket.
    fn skip_nested(&mut self, statement: bool) -> Span {
        let start = self.peek().span;
        let first = self.pos;
        let mut open = 0usize;
        loop {
            let kind = self.kind();
            match kind {
                K::Eof => break,
                K::LParen | K::LBrace | K::LBracket => open = open.saturating_add(1),
                K::RParen | K::RBrace | K::RBracket if open == 0 => break,
                K::RParen | K::RBrace | K::RBracket => open = open.saturating_sub(1),
                K::Semicolon if open == 0 => {
                    if statement {
                        self.bump();
                    }
                    break;
                },
                K::Comma if open == 0 && !statement => break,
                _ => {},
            }
            self.bump();
            if statement && open == 0 && kind == K::RBrace {
                break;
            }
        }
        if self.pos == first {
            start
        } else {
            start.to(self.prev_span())
        }
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn unit(mut self) -> CompilationUnit {
        let mut unit = CompilationUnit::default();

        while self.at(K::Using) {
            self.bump();
            let (name, span) = self.qualified_name();
            self.expect(K::Semicolon);
            unit.usings.push(Using { name, span });
        }

        while !self.at(K::Eof) {
            let before = self.pos;
            self.top_level(&mut unit);
            if self.pos == before {
                self.bump();
            }
        }

        unit
    }

    fn qualified_name(&mut self) -> (String, Span) {
        let (mut name, mut span) = self.expect_ident();
        while self.at(K::Dot) && self.nth_kind(1) == K::Ident {
            self.bump();
            let token = self.bump();
            name.push('.');
            name.push_str(token.ident());
            span = span.to(token.span);
        }
        (name, span)
    }

    fn top_level(&mut self, unit: &mut CompilationUnit) {
        if self.at(K::Namespace) {
            self.bump();
            let (name, _) = self.qualified_name();
            if self.eat(K::Semicolon) {
                self.namespace = name;
                return;
            }
            let outer = std::mem::replace(&mut self.namespace, name);
            if !self.descend() {
                self.too_deep();
                self.skip_nested(true);
            } else if self.expect(K::LBrace) {
                while !self.at(K::RBrace) && !self.at(K::Eof) {
                    let before = self.pos;
                    self.top_level(unit);
                    if self.pos == before {
                        self.bump();
                    }
                }
                self.expect(K::RBrace);
            }
            self.ascend();
            self.namespace = outer;
            return;
        }

        if self.at(K::Using) {
            let span = self.peek().span;
            self.error(
                Code::InvalidMemberToken,
                span,
                "A using clause must precede all other elements defined in the namespace",
            );
            self.synchronize();
            return;
        }

        let start = self.pos;
        let modifiers = self.modifiers();
        if self.at(K::Class) {
            if let Some(class) = self.class(modifiers) {
                unit.classes.push(class);
            }
            return;
        }

        // Members and statements outside of a type: report once, then parse
        // them anyway so the rest of the unit stays in sync.
        let span = self.tokens[start].span;
        self.error(
            Code::MemberOutsideType,
            span,
            "A namespace cannot directly contain members such as fields, methods or statements",
        );
        if self.looks_like_method() {
            let _ = self.method_after_signature(modifiers);
        } else {
            let _ = self.statement();
        }
    }

    fn modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        while self.kind().is_modifier() {
            match self.bump().kind {
                K::Public => modifiers.is_public = true,
                K::Static => modifiers.is_static = true,
                _ => {},
            }
        }
        modifiers
    }

    fn class(&mut self, modifiers: Modifiers) -> Option<ClassDecl> {
        self.bump();
        let (name, name_span) = self.expect_ident();
        if !self.expect(K::LBrace) {
            self.synchronize();
            return None;
        }

        let mut members = Vec::new();
        while !self.at(K::RBrace) && !self.at(K::Eof) {
            let before = self.pos;
            if let Some(member) = self.member() {
                members.push(member);
            }
            if self.pos == before {
                self.bump();
            }
        }
        self.expect(K::RBrace);

        Some(ClassDecl {
            namespace: self.namespace.clone(),
            name,
            name_span,
            modifiers,
            members,
        })
    }

    fn member(&mut self) -> Option<Member> {
        let modifiers = self.modifiers();
        if !self.starts_type() {
            let token = self.bump();
            self.error(
                Code::InvalidMemberToken,
                token.span,
                format!("Invalid token '{}' in class member declaration", token.kind),
            );
            return None;
        }
        if self.looks_like_method() {
            return self.method_after_signature(modifiers).map(Member::Method);
        }

        let ty = self.type_ref();
        let (name, name_span) = self.expect_ident();
        let init = if self.eat(K::Assign) {
            Some(self.expression())
        } else {
            None
        };
        if !self.expect(K::Semicolon) {
            self.synchronize();
        }
        Some(Member::Field(FieldDecl {
            modifiers,
            ty,
            name,
            name_span,
            init,
        }))
    }

    /// `Type Name (` ahead of the cursor.
    fn looks_like_method(&self) -> bool {
        let Some(after_type) = self.type_len(0) else {
            return false;
        };
        self.nth_kind(after_type) == K::Ident
            && self.nth_kind(after_type.saturating_add(1)) == K::LParen
    }

    fn method_after_signature(&mut self, modifiers: Modifiers) -> Option<MethodDecl> {
        let return_type = self.type_ref();
        let (name, name_span) = self.expect_ident();
        self.expect(K::LParen);

        let mut params = Vec::new();
        if !self.at(K::RParen) {
            loop {
                if !self.starts_type() {
                    let span = self.peek().span;
                    self.error(Code::IdentifierExpected, span, "Identifier expected");
                    break;
                }
                let ty = self.type_ref();
                let (pname, span) = self.expect_ident();
                params.push(Param {
                    ty,
                    name: pname,
                    span,
                });
                if !self.eat(K::Comma) {
                    break;
                }
            }
        }
        self.expect(K::RParen);

        if !self.at(K::LBrace) {
            self.expect(K::LBrace);
            self.synchronize();
            return None;
        }
        let body = self.block();
        Some(MethodDecl {
            modifiers,
            return_type,
            name,
            name_span,
            params,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn starts_type(&self) -> bool {
        self.kind().is_primitive_type() || matches!(self.kind(), K::Ident | K::Var)
    }

    /// Number of tokens a type starting `ahead` tokens away spans.
    fn type_len(&self, ahead: usize) -> Option<usize> {
        let first = self.nth_kind(ahead);
        if !(first.is_primitive_type() || first == K::Ident || first == K::Var) {
            return None;
        }
        let mut len = 1usize;
        while self.nth_kind(ahead.saturating_add(len)) == K::LBracket
            && self.nth_kind(ahead.saturating_add(len).saturating_add(1)) == K::RBracket
        {
            len = len.saturating_add(2);
        }
        Some(ahead.saturating_add(len))
    }

    fn type_ref(&mut self) -> TypeRef {
        let token = self.bump();
        let kind = match token.kind {
            K::Void => TypeRefKind::Void,
            K::Int => TypeRefKind::Int,
            K::Long => TypeRefKind::Long,
            K::Double => TypeRefKind::Double,
            K::Bool => TypeRefKind::Bool,
            K::String => TypeRefKind::String,
            K::Var => TypeRefKind::Var,
            _ => TypeRefKind::Named(token.ident().to_owned()),
        };
        let mut ty = TypeRef {
            kind,
            span: token.span,
        };
        let mut rank = 0usize;
        while self.at(K::LBracket) && self.nth_kind(1) == K::RBracket {
            rank = rank.saturating_add(1);
            if !self.chain_fits(rank) {
                self.too_deep();
                self.bump();
                self.bump();
                continue;
            }
            self.bump();
            let close = self.bump();
            let span = ty.span.to(close.span);
            ty = TypeRef {
                kind: TypeRefKind::Array(Box::new(ty)),
                span,
            };
        }
        ty
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn block(&mut self) -> Block {
        let open = self.peek().span;
        self.expect(K::LBrace);
        let mut stmts = Vec::new();
        while !self.at(K::RBrace) && !self.at(K::Eof) {
            let before = self.pos;
            stmts.push(self.statement());
            if self.pos == before {
                self.bump();
            }
        }
        let close = self.peek().span;
        self.expect(K::RBrace);
        Block {
            stmts,
            span: open.to(close),
        }
    }

    /// Whether the cursor starts a local declaration (`T name`).
    fn looks_like_local(&self) -> bool {
        match self.kind() {
            K::Var => self.nth_kind(1) == K::Ident,
            k if k.is_primitive_type() => self.nth_kind(1) != K::Dot,
            K::Ident => self
                .type_len(0)
                .is_some_and(|after| self.nth_kind(after) == K::Ident),
            _ => false,
        }
    }

    fn statement(&mut self) -> Stmt {
        let stmt = if self.descend() {
            self.statement_at_depth()
        } else {
            self.too_deep();
            Stmt {
                kind: StmtKind::Empty,
                span: self.skip_nested(true),
            }
        };
        self.ascend();
        stmt
    }

    fn statement_at_depth(&mut self) -> Stmt {
        let start = self.peek().span;
        let kind = match self.kind() {
            K::LBrace => StmtKind::Block(self.block()),
            K::Semicolon => {
                self.bump();
                StmtKind::Empty
            },
            K::If => self.if_statement(),
            K::While => {
                self.bump();
                self.expect(K::LParen);
                let cond = self.expression();
                self.expect(K::RParen);
                let body = Box::new(self.statement());
                StmtKind::While { cond, body }
            },
            K::For => self.for_statement(),
            K::Return => {
                self.bump();
                let value = if self.at(K::Semicolon) {
                    None
                } else {
                    Some(self.expression())
                };
                self.end_statement();
                StmtKind::Return(value)
            },
            K::Break => {
                self.bump();
                self.end_statement();
                StmtKind::Break
            },
            K::Continue => {
                self.bump();
                self.end_statement();
                StmtKind::Continue
            },
            _ if self.looks_like_local() => {
                let local = self.local_declaration();
                self.end_statement();
                local
            },
            _ => {
                let expr = self.expression();
                self.end_statement();
                StmtKind::Expr(expr)
            },
        };
        Stmt {
            kind,
            span: start.to(self.prev_span()),
        }
    }

    /// Require `;`. A missing `;` before something that can start the next
    /// statement is reported without skipping anything.
    fn end_statement(&mut self) {
        if !self.expect(K::Semicolon) && !Self::starts_statement(self.kind()) {
            self.synchronize();
        }
    }

    fn starts_statement(kind: TokenKind) -> bool {
        kind.is_primitive_type()
            || matches!(
                kind,
                K::Ident
                    | K::Var
                    | K::If
                    | K::While
                    | K::For
                    | K::Return
                    | K::Break
                    | K::Continue
                    | K::LBrace
                    | K::RBrace
                    | K::New
                    | K::PlusPlus
                    | K::MinusMinus
                    | K::Eof
            )
    }

    fn if_statement(&mut self) -> StmtKind {
        self.bump();
        self.expect(K::LParen);
        let cond = self.expression();
        self.expect(K::RParen);
        let then = Box::new(self.statement());
        let otherwise = if self.eat(K::Else) {
            Some(Box::new(self.statement()))
        } else {
            None
        };
        StmtKind::If {
            cond,
            then,
            otherwise,
        }
    }

    fn for_statement(&mut self) -> StmtKind {
        self.bump();
        self.expect(K::LParen);

        let mut init = Vec::new();
        if self.looks_like_local() {
            let start = self.peek().span;
            let kind = self.local_declaration();
            init.push(Stmt {
                kind,
                span: start.to(self.prev_span()),
            });
        } else if !self.at(K::Semicolon) {
            loop {
                let expr = self.expression();
                let span = expr.span;
                init.push(Stmt {
                    kind: StmtKind::Expr(expr),
                    span,
                });
                if !self.eat(K::Comma) {
                    break;
                }
            }
        }
        self.expect(K::Semicolon);

        let cond = if self.at(K::Semicolon) {
            None
        } else {
            Some(self.expression())
        };
        self.expect(K::Semicolon);

        let mut step = Vec::new();
        if !self.at(K::RParen) {
            loop {
                step.push(self.expression());
                if !self.eat(K::Comma) {
                    break;
                }
            }
        }
        self.expect(K::RParen);

        let body = Box::new(self.statement());
        StmtKind::For {
            init,
            cond,
            step,
            body,
        }
    }

    fn local_declaration(&mut self) -> StmtKind {
        let ty = self.type_ref();
        let mut declarators = Vec::new();
        loop {
            let (name, span) = self.expect_ident();
            let init = if self.eat(K::Assign) {
                Some(self.expression())
            } else {
                None
            };
            declarators.push(Declarator { name, span, init });
            if !self.eat(K::Comma) {
                break;
            }
        }
        StmtKind::Local { ty, declarators }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expression(&mut self) -> Expr {
        let expr = if self.descend() {
            self.assignment()
        } else {
            self.too_deep();
            Expr::error(self.skip_nested(false))
        };
        self.ascend();
        expr
    }

    fn assignment(&mut self) -> Expr {
        let target = self.conditional();
        let op = match self.kind() {
            K::Assign => None,
            K::PlusAssign => Some(BinaryOp::Add),
            K::MinusAssign => Some(BinaryOp::Sub),
            K::StarAssign => Some(BinaryOp::Mul),
            K::SlashAssign => Some(BinaryOp::Div),
            K::PercentAssign => Some(BinaryOp::Rem),
            _ => return target,
        };
        self.bump();
        let value = self.expression();
        let span = target.span.to(value.span);
        Expr {
            kind: ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        }
    }

    fn conditional(&mut self) -> Expr {
        let cond = self.binary(0);
        if !self.eat(K::Question) {
            return cond;
        }
        let then = self.expression();
        self.expect(K::Colon);
        let otherwise = self.expression();
        let span = cond.span.to(otherwise.span);
        Expr {
            kind: ExprKind::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        }
    }

    fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
        Some(match kind {
            K::OrOr => (BinaryOp::Or, 1),
            K::AndAnd => (BinaryOp::And, 2),
            K::EqEq => (BinaryOp::Eq, 3),
            K::NotEq => (BinaryOp::Ne, 3),
            K::Lt => (BinaryOp::Lt, 4),
            K::Gt => (BinaryOp::Gt, 4),
            K::LtEq => (BinaryOp::Le, 4),
            K::GtEq => (BinaryOp::Ge, 4),
            K::Plus => (BinaryOp::Add, 5),
            K::Minus => (BinaryOp::Sub, 5),
            K::Star => (BinaryOp::Mul, 6),
            K::Slash => (BinaryOp::Div, 6),
            K::Percent => (BinaryOp::Rem, 6),
            _ => return None,
        })
    }

    /// Precedence climbing over left-associative binary operators.
    ///
    /// Each operator adds a level to the left spine, and operands to its
    /// right are parsed one level deeper than the previous one.
    fn binary(&mut self, min_prec: u8) -> Expr {
        let mut lhs = self.unary();
        let mut links = 0usize;
        while let Some((op, prec)) = Self::binary_op(self.kind()) {
            if prec <= min_prec {
                break;
            }
            if !self.chain_fits(1) {
                self.too_deep();
                let rest = self.skip_nested(false);
                lhs = Expr::error(lhs.span.to(rest));
                break;
            }
            self.bump();
            links = links.saturating_add(1);
            self.depth = self.depth.saturating_add(1);
            let rhs = self.binary(prec);
            let span = lhs.span.to(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        self.depth = self.depth.saturating_sub(links);
        lhs
    }

    fn unary(&mut self) -> Expr {
        let start = self.peek().span;
        let op = match self.kind() {
            K::Minus => Some(UnaryOp::Neg),
            K::Plus => Some(UnaryOp::Plus),
            K::Bang => Some(UnaryOp::Not),
            K::PlusPlus | K::MinusMinus => {
                let inc = self.bump().kind == K::PlusPlus;
                let target = self.nested_unary();
                let span = start.to(target.span);
                return Expr {
                    kind: ExprKind::IncDec {
                        op: if inc { IncDec::PreInc } else { IncDec::PreDec },
                        target: Box::new(target),
                    },
                    span,
                };
            },
            K::LParen if self.nth_kind(1).is_primitive_type() => {
                if let Some(after) = self.type_len(1)
                    && self.nth_kind(after) == K::RParen
                {
                    self.bump();
                    let ty = self.type_ref();
                    self.bump();
                    let operand = self.nested_unary();
                    let span = start.to(operand.span);
                    return Expr {
                        kind: ExprKind::Cast {
                            ty,
                            operand: Box::new(operand),
                        },
                        span,
                    };
                }
                None
            },
            _ => None,
        };

        if let Some(op) = op {
            self.bump();
            let operand = self.nested_unary();
            let span = start.to(operand.span);
            return Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            };
        }
        self.postfix()
    }

    /// Operand of a prefix operator or cast.
    fn nested_unary(&mut self) -> Expr {
        let expr = if self.descend() {
            self.unary()
        } else {
            self.too_deep();
            Expr::error(self.skip_nested(false))
        };
        self.ascend();
        expr
    }

    /// Member accesses, calls, indexing and postfix `++`/`--`. Every suffix
    /// wraps the expression so far, so the chain counts toward the nesting
    /// limit like a binary chain does.
    fn postfix(&mut self) -> Expr {
        let mut expr = self.primary();
        let mut links = 0usize;
        loop {
            let suffix = matches!(
                self.kind(),
                K::Dot | K::LParen | K::LBracket | K::PlusPlus | K::MinusMinus
            );
            if !suffix {
                break;
            }
            if !self.chain_fits(1) {
                self.too_deep();
                let rest = self.skip_nested(false);
                expr = Expr::error(expr.span.to(rest));
                break;
            }
            links = links.saturating_add(1);
            self.depth = self.depth.saturating_add(1);
            match self.kind() {
                K::Dot => {
                    self.bump();
                    let (name, name_span) = self.expect_ident();
                    let span = expr.span.to(name_span);
                    expr = Expr {
                        kind: ExprKind::Member {
                            target: Box::new(expr),
                            name,
                            name_span,
                        },
                        span,
                    };
                },
                K::LParen => {
                    self.bump();
                    let args = self.arguments();
                    let span = expr.span.to(self.prev_span());
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                },
                K::LBracket => {
                    self.bump();
                    let index = self.expression();
                    self.expect(K::RBracket);
                    let span = expr.span.to(self.prev_span());
                    expr = Expr {
                        kind: ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                },
                K::PlusPlus | K::MinusMinus => {
                    let inc = self.bump().kind == K::PlusPlus;
                    let span = expr.span.to(self.prev_span());
                    expr = Expr {
                        kind: ExprKind::IncDec {
                            op: if inc { IncDec::PostInc } else { IncDec::PostDec },
                            target: Box::new(expr),
                        },
                        span,
                    };
                },
                _ => {},
            }
        }
        self.depth = self.depth.saturating_sub(links);
        expr
    }

    fn arguments(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if self.eat(K::RParen) {
            return args;
        }
        loop {
            args.push(self.expression());
            if !self.eat(K::Comma) {
                break;
            }
        }
        self.expect(K::RParen);
        args
    }

    fn primary(&mut self) -> Expr {
        let token = self.peek().clone();
        let kind = match (token.kind, &token.value) {
            (K::IntLiteral, TokenValue::Int(v)) => ExprKind::Int(*v),
            (K::LongLiteral, TokenValue::Long(v)) => ExprKind::Long(*v),
            (K::DoubleLiteral, TokenValue::Double(v)) => ExprKind::Double(*v),
            (K::StringLiteral, TokenValue::Str(s)) => ExprKind::Str(s.clone()),
            (K::True, _) => ExprKind::Bool(true),
            (K::False, _) => ExprKind::Bool(false),
            (K::Null, _) => ExprKind::Null,
            (K::Ident, TokenValue::Ident(name)) => ExprKind::Name(name.clone()),
            (K::LParen, _) => {
                self.bump();
                let inner = self.expression();
                self.expect(K::RParen);
                return Expr {
                    kind: inner.kind,
                    span: token.span.to(self.prev_span()),
                };
            },
            (K::New, _) => return self.new_array(),
            (kind, _) if kind.is_primitive_type() && self.nth_kind(1) == K::Dot => {
                let ty = match kind {
                    K::Int => TypeRefKind::Int,
                    K::Long => TypeRefKind::Long,
                    K::Double => TypeRefKind::Double,
                    K::Bool => TypeRefKind::Bool,
                    K::String => TypeRefKind::String,
                    _ => TypeRefKind::Void,
                };
                ExprKind::Primitive(ty)
            },
            (kind, _) => {
                self.error(
                    Code::InvalidExpressionTerm,
                    token.span,
                    format!("Invalid expression term '{kind}'"),
                );
                return Expr::error(token.span);
            },
        };
        self.bump();
        Expr {
            kind,
            span: token.span,
        }
    }

    fn new_array(&mut self) -> Expr {
        let start = self.bump().span;
        if !self.starts_type() || self.at(K::Var) {
            let span = self.peek().span;
            self.error(Code::TypeNotFound, span, "Type expected");
            return Expr::error(start);
        }

        // Parse the element type by hand: `new int[n]` must not be taken as
        // the array type `int[]`.
        let token = self.bump();
        let elem_kind = match token.kind {
            K::Int => TypeRefKind::Int,
            K::Long => TypeRefKind::Long,
            K::Double => TypeRefKind::Double,
            K::Bool => TypeRefKind::Bool,
            K::String => TypeRefKind::String,
            K::Void => TypeRefKind::Void,
            _ => TypeRefKind::Named(token.ident().to_owned()),
        };
        let elem = TypeRef {
            kind: elem_kind,
            span: token.span,
        };

        if !self.expect(K::LBracket) {
            return Expr::error(start.to(token.span));
        }

        if self.eat(K::RBracket) {
            self.expect(K::LBrace);
            let mut items = Vec::new();
            while !self.at(K::RBrace) && !self.at(K::Eof) {
                items.push(self.expression());
                if !self.eat(K::Comma) {
                    break;
                }
            }
            self.expect(K::RBrace);
            return Expr {
                kind: ExprKind::ArrayInit { elem, items },
                span: start.to(self.prev_span()),
            };
        }

        let len = self.expression();
        self.expect(K::RBracket);
        Expr {
            kind: ExprKind::NewArray {
                elem,
                len: Box::new(len),
            },
            span: start.to(self.prev_span()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lex;

    fn parse_src(src: &str) -> (CompilationUnit, Vec<&'static str>) {
        let mut diags = DiagnosticBag::new();
        let tokens = lex(src, &mut diags);
        let unit = parse(tokens, &mut diags);
        let index = crate::syntax::LineIndex::new(src);
        let ids = diags.into_diagnostics(&index).iter().map(|d| d.id()).collect();
        (unit, ids)
    }

    fn body(src: &str) -> (Vec<Stmt>, Vec<&'static str>) {
        let (unit, ids) = parse_src(&format!("class C {{ void M() {{ {src} }} }}"));
        let Member::Method(method) = unit.classes[0].members[0].clone() else {
            panic!("expected method");
        };
        (method.body.stmts, ids)
    }

    #[test]
    fn test_usings_and_file_scoped_namespace() {
        let (unit, ids) = parse_src("using Core;\nusing Core.Text;\nnamespace App;\npublic class Runner { }");
        assert!(ids.is_empty());
        assert_eq!(unit.usings.len(), 2);
        assert_eq!(unit.usings[1].name, "Core.Text");
        assert_eq!(unit.classes[0].full_name(), "App.Runner");
        assert!(unit.classes[0].modifiers.is_public);
    }

    #[test]
    fn test_block_namespace() {
        let (unit, ids) = parse_src("namespace A.B { class X { } } class Y { }");
        assert!(ids.is_empty());
        assert_eq!(unit.classes[0].full_name(), "A.B.X");
        assert_eq!(unit.classes[1].full_name(), "Y");
    }

    #[test]
    fn test_members() {
        let (unit, ids) = parse_src(
            "class C { static int count = 1; public static void Run(string[] args) { } int Twice(int x) { return x * 2; } }",
        );
        assert!(ids.is_empty());
        let members = &unit.classes[0].members;
        assert!(matches!(&members[0], Member::Field(f) if f.modifiers.is_static && f.init.is_some()));
        let Member::Method(run) = &members[1] else {
            panic!("expected method");
        };
        assert!(matches!(
            &run.params[0].ty.kind,
            TypeRefKind::Array(inner) if inner.kind == TypeRefKind::String
        ));
    }

    #[test]
    fn test_precedence() {
        let (stmts, ids) = body("x = 1 + 2 * 3;");
        assert!(ids.is_empty());
        let StmtKind::Expr(Expr {
            kind: ExprKind::Assign { value, .. },
            ..
        }) = &stmts[0].kind
        else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { op, rhs, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_local_declarations() {
        let (stmts, ids) = body("int a = 1, b; string[] names = new string[3]; var n = names.Length; Item item;");
        assert!(ids.is_empty());
        assert_eq!(stmts.len(), 4);
        assert!(matches!(&stmts[0].kind, StmtKind::Local { declarators, .. } if declarators.len() == 2));
        assert!(matches!(&stmts[3].kind, StmtKind::Local { ty, .. } if ty.kind == TypeRefKind::Named("Item".into())));
    }

    #[test]
    fn test_control_flow() {
        let (stmts, ids) = body(
            "for (int i = 0; i < 10; i++) { if (i % 2 == 0) continue; else break; } while (true) { }",
        );
        assert!(ids.is_empty());
        assert!(matches!(&stmts[0].kind, StmtKind::For { init, cond: Some(_), step, .. } if init.len() == 1 && step.len() == 1));
        assert!(matches!(&stmts[1].kind, StmtKind::While { .. }));
    }

    #[test]
    fn test_cast_and_primitive_member() {
        let (stmts, ids) = body("double d = (double)x / 2; int m = int.MaxValue;");
        assert!(ids.is_empty());
        let StmtKind::Local { declarators, .. } = &stmts[0].kind else {
            panic!("expected local");
        };
        let init = declarators[0].init.as_ref().map(|e| &e.kind);
        assert!(matches!(init, Some(ExprKind::Binary { lhs, .. }) if matches!(lhs.kind, ExprKind::Cast { .. })));
    }

    #[test]
    fn test_array_initializer() {
        let (stmts, ids) = body("int[] xs = new int[] { 1, 2, 3 };");
        assert!(ids.is_empty());
        let StmtKind::Local { declarators, .. } = &stmts[0].kind else {
            panic!("expected local");
        };
        assert!(matches!(
            declarators[0].init.as_ref().map(|e| &e.kind),
            Some(ExprKind::ArrayInit { items, .. }) if items.len() == 3
        ));
    }

    #[test]
    fn test_missing_initializer_reports_once() {
        let (_, ids) = body("int x = ;");
        assert_eq!(ids, vec!["CRU1525"]);
    }

    #[test]
    fn test_missing_semicolon() {
        let (stmts, ids) = body("int x = 1\nint y = 2;");
        assert_eq!(ids, vec!["CRU1002"]);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_missing_close_brace() {
        let (_, ids) = parse_src("class C { void M() { }");
        assert_eq!(ids, vec!["CRU1513"]);
    }

    #[test]
    fn test_top_level_statement() {
        let (unit, ids) = parse_src("Console.WriteLine(1);");
        assert_eq!(ids, vec!["CRU0116"]);
        assert!(unit.classes.is_empty());
    }

    #[test]
    fn test_invalid_member_token() {
        let (_, ids) = parse_src("class C { 42 }");
        assert_eq!(ids, vec!["CRU1519"]);
    }

    #[test]
    fn test_parentheses_up_to_the_nesting_limit() {
        let depth = MAX_NESTING.saturating_sub(8);
        let (stmts, ids) = body(&format!("x = {}1{};", "(".repeat(depth), ")".repeat(depth)));
        assert!(ids.is_empty());
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Expr(Expr { kind: ExprKind::Assign { value, .. }, .. }) if matches!(value.kind, ExprKind::Int(1))
        ));

        let (_, ids) = body(&format!("x = {}1{};", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING)));
        assert_eq!(ids, vec!["CRU8078"]);
    }

    #[test]
    fn test_too_deep_block_is_skipped_whole() {
        let (stmts, ids) = body(&format!("{}{} int z = 1;", "{".repeat(100), "}".repeat(100)));
        assert_eq!(ids, vec!["CRU8078"]);
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[1].kind, StmtKind::Local { .. }));
    }

    #[test]
    fn test_operator_chain_is_bounded() {
        let (stmts, ids) = body(&format!("x = 1{};", " * 2 - 3".repeat(100)));
        assert_eq!(ids, vec!["CRU8078"]);
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Expr(Expr { kind: ExprKind::Assign { value, .. }, .. }) if matches!(value.kind, ExprKind::Error)
        ));
    }

    #[test]
    fn test_array_rank_is_bounded() {
        let (stmts, ids) = body(&format!("int{} xs; int y = 2;", "[]".repeat(200)));
        assert_eq!(ids, vec!["CRU8078"]);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_nested_namespaces_are_bounded() {
        let (_, ids) = parse_src(&format!("{}{} class Y {{ }}", "namespace N { ".repeat(200), "}".repeat(200)));
        assert_eq!(ids, vec!["CRU8078"]);
    }
}
