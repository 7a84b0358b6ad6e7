//! Recursive-descent parser producing the cons-cell AST.
//!
//! Grammar and precedence ladder follow the teacher's `core/parser.rs`
//! structure (one token of lookahead, same statement/expression split), but
//! every production here builds a tagged list cell instead of a typed
//! `Statement`/`Expr` node.

use crate::cons::{self, Cons, Elem};
use crate::js_error::JSError;
use crate::symbol::tags;
use crate::token::{TemplatePart, Token};
use std::rc::Rc;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, JSError>;

pub fn parse(source: &str) -> PResult<Rc<Cons>> {
    let tokens = crate::lexer::tokenize(source)?;
    Parser::new(tokens).parse_program()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, t: &Token) -> bool {
        self.peek() == t
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.check(t) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Token) -> PResult<()> {
        if self.eat(&t) {
            Ok(())
        } else {
            Err(JSError::ParseError {
                message: format!("expected {t:?}, found {:?}", self.peek()),
            })
        }
    }

    fn consume_semicolon(&mut self) {
        self.eat(&Token::Semicolon);
    }

    fn ident_name(&mut self) -> PResult<String> {
        match self.advance() {
            Token::Identifier(name) => Ok(name),
            other => other
                .as_identifier_string()
                .map(|s| s.to_string())
                .ok_or_else(|| JSError::ParseError { message: format!("expected identifier, found {other:?}") }),
        }
    }

    // ---- program & statements ----

    pub fn parse_program(&mut self) -> PResult<Rc<Cons>> {
        let mut stmts = Vec::new();
        while !self.check(&Token::Eof) {
            stmts.push(cons::list_elem(self.parse_statement()?));
        }
        Ok(cons::node(Elem::Sym(tags::program()), stmts))
    }

    fn parse_block(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            stmts.push(cons::list_elem(self.parse_statement()?));
        }
        self.expect(Token::RBrace)?;
        Ok(cons::node(Elem::Sym(tags::block()), stmts))
    }

    fn parse_statement(&mut self) -> PResult<Rc<Cons>> {
        match self.peek().clone() {
            Token::LBrace => self.parse_block(),
            Token::Var | Token::Let | Token::Const => self.parse_decl_statement(),
            Token::Function => self.parse_function_decl(false),
            Token::Async if self.peek_at(1) == &Token::Function => {
                self.advance();
                self.parse_function_decl(true)
            }
            Token::If => self.parse_if(),
            Token::For => self.parse_for(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do_while(),
            Token::Break => {
                self.advance();
                let label = if let Token::Identifier(name) = self.peek().clone() {
                    self.advance();
                    vec![cons::sym(&name)]
                } else {
                    vec![]
                };
                self.consume_semicolon();
                Ok(cons::node(Elem::Sym(tags::r#break()), label))
            }
            Token::Continue => {
                self.advance();
                let label = if let Token::Identifier(name) = self.peek().clone() {
                    self.advance();
                    vec![cons::sym(&name)]
                } else {
                    vec![]
                };
                self.consume_semicolon();
                Ok(cons::node(Elem::Sym(tags::r#continue()), label))
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) || self.check(&Token::RBrace) || self.check(&Token::Eof) {
                    vec![]
                } else {
                    vec![cons::list_elem(self.parse_expression()?)]
                };
                self.consume_semicolon();
                Ok(cons::node(Elem::Sym(tags::r#return()), value))
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.consume_semicolon();
                Ok(cons::node(Elem::Sym(tags::throw()), vec![cons::list_elem(value)]))
            }
            Token::Try => self.parse_try(),
            Token::Switch => self.parse_switch(),
            Token::Class => self.parse_class(None),
            Token::Semicolon => {
                self.advance();
                Ok(cons::node(Elem::Sym(tags::empty()), vec![]))
            }
            Token::Identifier(name) if self.peek_at(1) == &Token::Colon => {
                self.advance();
                self.advance();
                let body = self.parse_statement()?;
                Ok(cons::node(Elem::Sym(tags::label()), vec![cons::sym(&name), cons::list_elem(body)]))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon();
                Ok(expr)
            }
        }
    }

    fn parse_decl_statement(&mut self) -> PResult<Rc<Cons>> {
        let kind_tok = self.advance();
        let tag = match kind_tok {
            Token::Var => tags::var_decl(),
            Token::Let => tags::let_decl(),
            Token::Const => tags::const_decl(),
            _ => unreachable!(),
        };
        let mut decls = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            let init = if self.eat(&Token::Assign) { Some(self.parse_assignment()?) } else { None };
            let pair = cons::node(
                cons::sym("Decl"),
                match init {
                    Some(e) => vec![cons::list_elem(target), cons::list_elem(e)],
                    None => vec![cons::list_elem(target)],
                },
            );
            decls.push(cons::list_elem(pair));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.consume_semicolon();
        Ok(cons::node(Elem::Sym(tag), decls))
    }

    fn parse_binding_target(&mut self) -> PResult<Rc<Cons>> {
        match self.peek().clone() {
            Token::LBracket => self.parse_array_destructure(),
            Token::LBrace => self.parse_object_destructure(),
            _ => {
                let name = self.ident_name()?;
                Ok(cons::node(Elem::Sym(tags::ident()), vec![cons::sym(&name)]))
            }
        }
    }

    fn parse_array_destructure(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::LBracket)?;
        let mut elems = Vec::new();
        while !self.check(&Token::RBracket) {
            if self.eat(&Token::Comma) {
                elems.push(Elem::Nil);
                continue;
            }
            if self.eat(&Token::DotDotDot) {
                let target = self.parse_binding_target()?;
                elems.push(cons::list_elem(cons::node(Elem::Sym(tags::rest()), vec![cons::list_elem(target)])));
            } else {
                let target = self.parse_binding_target()?;
                let elem = if self.eat(&Token::Assign) {
                    let default = self.parse_assignment()?;
                    cons::node(Elem::Sym(tags::default_param()), vec![cons::list_elem(target), cons::list_elem(default)])
                } else {
                    target
                };
                elems.push(cons::list_elem(elem));
            }
            if !self.check(&Token::RBracket) {
                self.eat(&Token::Comma);
            }
        }
        self.expect(Token::RBracket)?;
        Ok(cons::node(Elem::Sym(tags::destructure_array()), elems))
    }

    fn parse_object_destructure(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::LBrace)?;
        let mut elems = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.eat(&Token::DotDotDot) {
                let name = self.ident_name()?;
                elems.push(cons::list_elem(cons::node(Elem::Sym(tags::rest()), vec![cons::sym(&name)])));
            } else {
                let key = self.ident_name()?;
                let target = if self.eat(&Token::Colon) {
                    self.parse_binding_target()?
                } else {
                    cons::node(Elem::Sym(tags::ident()), vec![cons::sym(&key)])
                };
                let with_default = if self.eat(&Token::Assign) {
                    let default = self.parse_assignment()?;
                    cons::node(Elem::Sym(tags::default_param()), vec![cons::list_elem(target), cons::list_elem(default)])
                } else {
                    target
                };
                elems.push(cons::list_elem(cons::node(
                    cons::sym("PropTarget"),
                    vec![cons::sym(&key), cons::list_elem(with_default)],
                )));
            }
            if !self.check(&Token::RBrace) {
                self.eat(&Token::Comma);
            }
        }
        self.expect(Token::RBrace)?;
        Ok(cons::node(Elem::Sym(tags::destructure_object()), elems))
    }

    fn parse_function_decl(&mut self, is_async: bool) -> PResult<Rc<Cons>> {
        self.expect(Token::Function)?;
        let is_generator = self.eat(&Token::Star);
        let name = self.ident_name()?;
        let params = self.parse_param_list()?;
        let body = self.parse_block()?;
        let tag = if is_async {
            tags::async_function()
        } else if is_generator {
            tags::generator_function()
        } else {
            tags::function()
        };
        Ok(cons::node(
            Elem::Sym(tag),
            vec![cons::sym(&name), cons::list_elem(params), cons::list_elem(body)],
        ))
    }

    fn parse_param_list(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            if self.eat(&Token::DotDotDot) {
                let target = self.parse_binding_target()?;
                params.push(cons::list_elem(cons::node(Elem::Sym(tags::rest()), vec![cons::list_elem(target)])));
            } else {
                let target = self.parse_binding_target()?;
                let p = if self.eat(&Token::Assign) {
                    let default = self.parse_assignment()?;
                    cons::node(Elem::Sym(tags::default_param()), vec![cons::list_elem(target), cons::list_elem(default)])
                } else {
                    target
                };
                params.push(cons::list_elem(p));
            }
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(cons::node(Elem::Sym(tags::param_list()), params))
    }

    fn parse_if(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.eat(&Token::Else) { Some(self.parse_statement()?) } else { None };
        let mut args = vec![cons::list_elem(cond), cons::list_elem(then_branch)];
        if let Some(e) = else_branch {
            args.push(cons::list_elem(e));
        }
        Ok(cons::node(Elem::Sym(tags::r#if()), args))
    }

    fn parse_while(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::While)?;
        self.expect(Token::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let body = self.parse_statement()?;
        Ok(cons::node(Elem::Sym(tags::r#while()), vec![cons::list_elem(cond), cons::list_elem(body)]))
    }

    fn parse_do_while(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::Do)?;
        let body = self.parse_statement()?;
        self.expect(Token::While)?;
        self.expect(Token::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(Token::RParen)?;
        self.consume_semicolon();
        Ok(cons::node(Elem::Sym(tags::do_while()), vec![cons::list_elem(body), cons::list_elem(cond)]))
    }

    fn parse_for(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::For)?;
        self.expect(Token::LParen)?;

        let is_decl = matches!(self.peek(), Token::Var | Token::Let | Token::Const);
        let decl_kind_tok = self.peek().clone();

        // Peek ahead far enough to detect `in`/`of` without fully committing.
        let save = self.pos;
        let head: Rc<Cons> = if is_decl {
            let kind_tag = match decl_kind_tok {
                Token::Var => tags::var_decl(),
                Token::Let => tags::let_decl(),
                _ => tags::const_decl(),
            };
            self.advance();
            let target = self.parse_binding_target()?;
            cons::node(Elem::Sym(kind_tag), vec![cons::list_elem(target)])
        } else if self.check(&Token::Semicolon) {
            Cons::nil()
        } else {
            self.parse_expression()?
        };

        if self.eat(&Token::In) {
            let iterable = self.parse_expression()?;
            self.expect(Token::RParen)?;
            let body = self.parse_statement()?;
            return Ok(cons::node(
                Elem::Sym(tags::for_in()),
                vec![cons::list_elem(head), cons::list_elem(iterable), cons::list_elem(body)],
            ));
        }
        if self.eat(&Token::Of) {
            let iterable = self.parse_assignment()?;
            self.expect(Token::RParen)?;
            let body = self.parse_statement()?;
            return Ok(cons::node(
                Elem::Sym(tags::for_of()),
                vec![cons::list_elem(head), cons::list_elem(iterable), cons::list_elem(body)],
            ));
        }

        // Classic C-style for: rewind and reparse init as a full statement
        // since it may declare several comma-separated bindings.
        self.pos = save;
        let init: Option<Rc<Cons>> = if self.check(&Token::Semicolon) {
            None
        } else if is_decl {
            Some(self.parse_decl_statement_no_semi()?)
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::Semicolon)?;
        let test = if self.check(&Token::Semicolon) { None } else { Some(self.parse_expression()?) };
        self.expect(Token::Semicolon)?;
        let update = if self.check(&Token::RParen) { None } else { Some(self.parse_expression()?) };
        self.expect(Token::RParen)?;
        let body = self.parse_statement()?;

        let mut args = Vec::new();
        args.push(cons::list_elem(init.unwrap_or_else(Cons::nil)));
        args.push(cons::list_elem(test.unwrap_or_else(Cons::nil)));
        args.push(cons::list_elem(update.unwrap_or_else(Cons::nil)));
        args.push(cons::list_elem(body));
        Ok(cons::node(Elem::Sym(tags::r#for()), args))
    }

    fn parse_decl_statement_no_semi(&mut self) -> PResult<Rc<Cons>> {
        let kind_tok = self.advance();
        let tag = match kind_tok {
            Token::Var => tags::var_decl(),
            Token::Let => tags::let_decl(),
            Token::Const => tags::const_decl(),
            _ => unreachable!(),
        };
        let mut decls = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            let init = if self.eat(&Token::Assign) { Some(self.parse_assignment()?) } else { None };
            let pair = cons::node(
                cons::sym("Decl"),
                match init {
                    Some(e) => vec![cons::list_elem(target), cons::list_elem(e)],
                    None => vec![cons::list_elem(target)],
                },
            );
            decls.push(cons::list_elem(pair));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(cons::node(Elem::Sym(tag), decls))
    }

    fn parse_try(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::Try)?;
        let try_block = self.parse_block()?;
        let mut args = vec![cons::list_elem(try_block)];
        if self.eat(&Token::Catch) {
            let param = if self.eat(&Token::LParen) {
                let p = self.parse_binding_target()?;
                self.expect(Token::RParen)?;
                Some(p)
            } else {
                None
            };
            let catch_block = self.parse_block()?;
            args.push(cons::list_elem(cons::node(
                cons::sym("Catch"),
                match param {
                    Some(p) => vec![cons::list_elem(p), cons::list_elem(catch_block)],
                    None => vec![cons::list_elem(catch_block)],
                },
            )));
        } else {
            args.push(Elem::Nil);
        }
        if self.eat(&Token::Finally) {
            let finally_block = self.parse_block()?;
            args.push(cons::list_elem(finally_block));
        }
        Ok(cons::node(Elem::Sym(tags::r#try()), args))
    }

    fn parse_switch(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::Switch)?;
        self.expect(Token::LParen)?;
        let disc = self.parse_expression()?;
        self.expect(Token::RParen)?;
        self.expect(Token::LBrace)?;
        let mut cases = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.eat(&Token::Case) {
                let test = self.parse_expression()?;
                self.expect(Token::Colon)?;
                let mut body = Vec::new();
                while !matches!(self.peek(), Token::Case | Token::Default | Token::RBrace) {
                    body.push(cons::list_elem(self.parse_statement()?));
                }
                cases.push(cons::list_elem(cons::node(Elem::Sym(tags::case()), {
                    let mut v = vec![cons::list_elem(test)];
                    v.extend(body);
                    v
                })));
            } else if self.eat(&Token::Default) {
                self.expect(Token::Colon)?;
                let mut body = Vec::new();
                while !matches!(self.peek(), Token::Case | Token::Default | Token::RBrace) {
                    body.push(cons::list_elem(self.parse_statement()?));
                }
                cases.push(cons::list_elem(cons::node(Elem::Sym(tags::default()), body)));
            } else {
                return Err(JSError::ParseError { message: "expected case or default in switch".into() });
            }
        }
        self.expect(Token::RBrace)?;
        let mut args = vec![cons::list_elem(disc)];
        args.extend(cases);
        Ok(cons::node(Elem::Sym(tags::switch()), args))
    }

    fn parse_class(&mut self, _name_hint: Option<&str>) -> PResult<Rc<Cons>> {
        self.expect(Token::Class)?;
        let name = if let Token::Identifier(n) = self.peek().clone() {
            self.advance();
            Some(n)
        } else {
            None
        };
        let superclass = if self.eat(&Token::Extends) { Some(self.parse_lhs_expr()?) } else { None };
        self.expect(Token::LBrace)?;
        let mut members = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.eat(&Token::Semicolon) {
                continue;
            }
            let is_static = if self.check(&Token::Static) && self.peek_at(1) != &Token::LParen {
                self.advance();
                true
            } else {
                false
            };
            let is_async = if self.check(&Token::Async) && self.peek_at(1) != &Token::LParen {
                self.advance();
                true
            } else {
                false
            };
            let is_generator = self.eat(&Token::Star);
            let accessor = if self.check(&Token::Get) && self.peek_at(1) != &Token::LParen {
                self.advance();
                Some(tags::getter())
            } else if self.check(&Token::Set) && self.peek_at(1) != &Token::LParen {
                self.advance();
                Some(tags::setter())
            } else {
                None
            };
            let member_name = self.ident_name()?;
            let params = self.parse_param_list()?;
            let body = self.parse_block()?;
            let tag = accessor.unwrap_or_else(tags::method);
            let mut args = vec![cons::sym(&member_name), cons::list_elem(params), cons::list_elem(body)];
            if is_static {
                args.push(cons::sym("static"));
            }
            if is_async {
                args.push(cons::sym("async"));
            }
            if is_generator {
                args.push(cons::sym("generator"));
            }
            members.push(cons::list_elem(cons::node(Elem::Sym(tag), args)));
        }
        self.expect(Token::RBrace)?;
        let mut args = Vec::new();
        args.push(match &name {
            Some(n) => cons::sym(n),
            None => Elem::Undefined,
        });
        args.push(match superclass {
            Some(s) => cons::list_elem(s),
            None => Elem::Nil,
        });
        args.extend(members);
        Ok(cons::node(Elem::Sym(tags::class()), args))
    }

    // ---- expressions ----

    fn parse_expression(&mut self) -> PResult<Rc<Cons>> {
        let first = self.parse_assignment()?;
        if self.check(&Token::Comma) {
            let mut items = vec![cons::list_elem(first)];
            while self.eat(&Token::Comma) {
                items.push(cons::list_elem(self.parse_assignment()?));
            }
            return Ok(cons::node(Elem::Sym(tags::sequence()), items));
        }
        Ok(first)
    }

    fn parse_assignment(&mut self) -> PResult<Rc<Cons>> {
        // arrow function lookahead: `(params) =>` or `ident =>`
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        if self.check(&Token::Async) && self.is_arrow_ahead_from_async() {
            return self.parse_async_arrow();
        }
        if self.check(&Token::Yield) {
            return self.parse_yield();
        }
        let lhs = self.parse_conditional()?;
        let op = match self.peek() {
            Token::Assign => Some("="),
            Token::PlusAssign => Some("+="),
            Token::MinusAssign => Some("-="),
            Token::StarAssign => Some("*="),
            Token::SlashAssign => Some("/="),
            Token::PercentAssign => Some("%="),
            Token::StarStarAssign => Some("**="),
            Token::AndAssign => Some("&="),
            Token::OrAssign => Some("|="),
            Token::XorAssign => Some("^="),
            Token::ShlAssign => Some("<<="),
            Token::ShrAssign => Some(">>="),
            Token::UShrAssign => Some(">>>="),
            Token::AndAndAssign => Some("&&="),
            Token::OrOrAssign => Some("||="),
            Token::QuestionQuestionEq => Some("??="),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_assignment()?;
            return Ok(cons::node(
                Elem::Sym(tags::assign()),
                vec![cons::sym(op), cons::list_elem(lhs), cons::list_elem(rhs)],
            ));
        }
        Ok(lhs)
    }

    fn parse_yield(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::Yield)?;
        let is_star = self.eat(&Token::Star);
        let tag = if is_star { tags::yield_star() } else { tags::yield_() };
        if self.check(&Token::Semicolon) || self.check(&Token::RBrace) || self.check(&Token::RParen) || self.check(&Token::Comma) {
            return Ok(cons::node(Elem::Sym(tag), vec![]));
        }
        let value = self.parse_assignment()?;
        Ok(cons::node(Elem::Sym(tag), vec![cons::list_elem(value)]))
    }

    fn is_arrow_ahead_from_async(&self) -> bool {
        matches!(self.peek_at(1), Token::LParen | Token::Identifier(_))
    }

    fn parse_async_arrow(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::Async)?;
        let arrow = self.try_parse_arrow()?.ok_or_else(|| JSError::ParseError { message: "expected arrow function after async".into() })?;
        Ok(cons::node(Elem::Sym(tags::async_function()), vec![Elem::Undefined, cons::list_elem(arrow)]))
    }

    /// Tries to parse `(params) => body` or `ident => body`; restores
    /// position and returns `None` if the lookahead doesn't pan out.
    fn try_parse_arrow(&mut self) -> PResult<Option<Rc<Cons>>> {
        let save = self.pos;
        let params = if let Token::Identifier(name) = self.peek().clone() {
            if self.peek_at(1) == &Token::Arrow {
                self.advance();
                Some(cons::node(Elem::Sym(tags::param_list()), vec![cons::list_elem(cons::node(Elem::Sym(tags::ident()), vec![cons::sym(&name)]))]))
            } else {
                None
            }
        } else if self.check(&Token::LParen) {
            match self.parse_param_list() {
                Ok(p) if self.check(&Token::Arrow) => Some(p),
                _ => {
                    self.pos = save;
                    None
                }
            }
        } else {
            None
        };
        let Some(params) = params else {
            self.pos = save;
            return Ok(None);
        };
        self.expect(Token::Arrow)?;
        let body = if self.check(&Token::LBrace) {
            self.parse_block()?
        } else {
            let expr = self.parse_assignment()?;
            cons::node(Elem::Sym(tags::block()), vec![cons::list_elem(cons::node(Elem::Sym(tags::r#return()), vec![cons::list_elem(expr)]))])
        };
        Ok(Some(cons::node(Elem::Sym(tags::arrow()), vec![cons::list_elem(params), cons::list_elem(body)])))
    }

    fn parse_conditional(&mut self) -> PResult<Rc<Cons>> {
        let cond = self.parse_nullish()?;
        if self.eat(&Token::QuestionMark) {
            let then_e = self.parse_assignment()?;
            self.expect(Token::Colon)?;
            let else_e = self.parse_assignment()?;
            return Ok(cons::node(
                Elem::Sym(tags::conditional()),
                vec![cons::list_elem(cond), cons::list_elem(then_e), cons::list_elem(else_e)],
            ));
        }
        Ok(cond)
    }

    fn parse_nullish(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_or()?;
        while self.eat(&Token::QuestionQuestion) {
            let rhs = self.parse_or()?;
            lhs = cons::node(Elem::Sym(tags::logical()), vec![cons::sym("??"), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = cons::node(Elem::Sym(tags::logical()), vec![cons::sym("||"), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_bitor()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.parse_bitor()?;
            lhs = cons::node(Elem::Sym(tags::logical()), vec![cons::sym("&&"), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_bitxor()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_bitxor()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym("|"), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_bitand()?;
        while self.eat(&Token::Xor) {
            let rhs = self.parse_bitand()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym("^"), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_equality()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym("&"), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => "==",
                Token::NotEq => "!=",
                Token::StrictEq => "===",
                Token::StrictNotEq => "!==",
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym(op), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_shift()?;
        loop {
            let op = match self.peek() {
                Token::Lt => "<",
                Token::Gt => ">",
                Token::LtEq => "<=",
                Token::GtEq => ">=",
                Token::Instanceof => "instanceof",
                Token::In => "in",
                _ => break,
            };
            self.advance();
            let rhs = self.parse_shift()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym(op), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Shl => "<<",
                Token::Shr => ">>",
                Token::UShr => ">>>",
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym(op), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => "+",
                Token::Minus => "-",
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym(op), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Rc<Cons>> {
        let mut lhs = self.parse_exponent()?;
        loop {
            let op = match self.peek() {
                Token::Star => "*",
                Token::Slash => "/",
                Token::Percent => "%",
                _ => break,
            };
            self.advance();
            let rhs = self.parse_exponent()?;
            lhs = cons::node(Elem::Sym(tags::binary()), vec![cons::sym(op), cons::list_elem(lhs), cons::list_elem(rhs)]);
        }
        Ok(lhs)
    }

    fn parse_exponent(&mut self) -> PResult<Rc<Cons>> {
        let lhs = self.parse_unary()?;
        if self.eat(&Token::StarStar) {
            // right-associative
            let rhs = self.parse_exponent()?;
            return Ok(cons::node(Elem::Sym(tags::binary()), vec![cons::sym("**"), cons::list_elem(lhs), cons::list_elem(rhs)]));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Rc<Cons>> {
        let op = match self.peek() {
            Token::Not => Some("!"),
            Token::Minus => Some("-"),
            Token::Plus => Some("+"),
            Token::BitNot => Some("~"),
            Token::Typeof => Some("typeof"),
            Token::Void => Some("void"),
            Token::Delete => Some("delete"),
            Token::Await => Some("await"),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.parse_unary()?;
            let tag = if op == "await" { tags::await_() } else { tags::unary() };
            let args = if op == "await" { vec![cons::list_elem(arg)] } else { vec![cons::sym(op), cons::list_elem(arg)] };
            return Ok(cons::node(Elem::Sym(tag), args));
        }
        if matches!(self.peek(), Token::PlusPlus | Token::MinusMinus) {
            let op = if self.check(&Token::PlusPlus) { "++" } else { "--" };
            self.advance();
            let arg = self.parse_unary()?;
            return Ok(cons::node(Elem::Sym(tags::update()), vec![cons::sym(op), cons::sym("prefix"), cons::list_elem(arg)]));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Rc<Cons>> {
        let expr = self.parse_lhs_expr()?;
        if matches!(self.peek(), Token::PlusPlus | Token::MinusMinus) {
            let op = if self.check(&Token::PlusPlus) { "++" } else { "--" };
            self.advance();
            return Ok(cons::node(Elem::Sym(tags::update()), vec![cons::sym(op), cons::sym("postfix"), cons::list_elem(expr)]));
        }
        Ok(expr)
    }

    fn parse_lhs_expr(&mut self) -> PResult<Rc<Cons>> {
        let mut expr = if self.check(&Token::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            expr = match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.ident_name()?;
                    cons::node(Elem::Sym(tags::member()), vec![cons::list_elem(expr), cons::sym(&name)])
                }
                Token::QuestionDot => {
                    self.advance();
                    if self.check(&Token::LParen) {
                        let args = self.parse_call_args()?;
                        let mut v = vec![cons::list_elem(expr)];
                        v.extend(args);
                        cons::node(Elem::Sym(tags::optional_member()), v)
                    } else {
                        let name = self.ident_name()?;
                        cons::node(Elem::Sym(tags::optional_member()), vec![cons::list_elem(expr), cons::sym(&name)])
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let idx = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    cons::node(Elem::Sym(tags::index()), vec![cons::list_elem(expr), cons::list_elem(idx)])
                }
                Token::LParen => {
                    let args = self.parse_call_args()?;
                    let mut v = vec![cons::list_elem(expr)];
                    v.extend(args);
                    cons::node(Elem::Sym(tags::call()), v)
                }
                Token::TemplateString(_) => {
                    let Token::TemplateString(parts) = self.advance() else { unreachable!() };
                    let template = self.build_template(parts)?;
                    cons::node(cons::sym("TaggedTemplate"), vec![cons::list_elem(expr), cons::list_elem(template)])
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Elem>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            if self.check(&Token::Comma) {
                args.push(Elem::Nil);
                self.advance();
                continue;
            }
            if self.eat(&Token::DotDotDot) {
                let a = self.parse_assignment()?;
                args.push(cons::list_elem(cons::node(Elem::Sym(tags::spread()), vec![cons::list_elem(a)])));
            } else {
                args.push(cons::list_elem(self.parse_assignment()?));
            }
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_new(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::New)?;
        let callee = if self.check(&Token::New) { self.parse_new()? } else { self.parse_primary_for_new()? };
        let args = if self.check(&Token::LParen) { self.parse_call_args()? } else { Vec::new() };
        let mut v = vec![cons::list_elem(callee)];
        v.extend(args);
        Ok(cons::node(Elem::Sym(tags::new()), v))
    }

    fn parse_primary_for_new(&mut self) -> PResult<Rc<Cons>> {
        let mut expr = self.parse_primary()?;
        loop {
            expr = match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.ident_name()?;
                    cons::node(Elem::Sym(tags::member()), vec![cons::list_elem(expr), cons::sym(&name)])
                }
                Token::LBracket => {
                    self.advance();
                    let idx = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    cons::node(Elem::Sym(tags::index()), vec![cons::list_elem(expr), cons::list_elem(idx)])
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Rc<Cons>> {
        match self.advance() {
            Token::Number(n) => Ok(cons::node(Elem::Sym(tags::literal()), vec![Elem::Num(n)])),
            Token::BigIntLit(text) => Ok(cons::node(cons::sym("BigIntLiteral"), vec![Elem::Str(Rc::from(text.as_str()))])),
            Token::StringLit(s) => Ok(cons::node(Elem::Sym(tags::literal()), vec![Elem::Str(Rc::from(s.as_str()))])),
            Token::TemplateString(parts) => self.build_template(parts),
            Token::RegexLit { pattern, flags } => Ok(cons::node(
                Elem::Sym(tags::regexp()),
                vec![Elem::Str(Rc::from(pattern.as_str())), Elem::Str(Rc::from(flags.as_str()))],
            )),
            Token::Identifier(name) => Ok(cons::node(Elem::Sym(tags::ident()), vec![cons::sym(&name)])),
            Token::True => Ok(cons::node(Elem::Sym(tags::literal()), vec![Elem::Bool(true)])),
            Token::False => Ok(cons::node(Elem::Sym(tags::literal()), vec![Elem::Bool(false)])),
            Token::Null => Ok(cons::node(Elem::Sym(tags::literal()), vec![Elem::Null])),
            Token::Undefined => Ok(cons::node(Elem::Sym(tags::literal()), vec![Elem::Undefined])),
            Token::This => Ok(cons::node(Elem::Sym(tags::this()), vec![])),
            Token::Super => Ok(cons::node(Elem::Sym(tags::super_()), vec![])),
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                self.pos -= 1;
                self.parse_array_literal()
            }
            Token::LBrace => {
                self.pos -= 1;
                self.parse_object_literal()
            }
            Token::Function => {
                self.pos -= 1;
                self.parse_function_expr(false)
            }
            Token::Async if self.check(&Token::Function) => self.parse_function_expr(true),
            Token::Class => {
                self.pos -= 1;
                self.parse_class(None)
            }
            other => Err(JSError::ParseError { message: format!("unexpected token {other:?} in expression") }),
        }
    }

    fn parse_function_expr(&mut self, is_async: bool) -> PResult<Rc<Cons>> {
        self.expect(Token::Function)?;
        let is_generator = self.eat(&Token::Star);
        let name = if let Token::Identifier(n) = self.peek().clone() {
            self.advance();
            Some(n)
        } else {
            None
        };
        let params = self.parse_param_list()?;
        let body = self.parse_block()?;
        let tag = if is_async {
            tags::async_function()
        } else if is_generator {
            tags::generator_function()
        } else {
            tags::function()
        };
        Ok(cons::node(
            Elem::Sym(tag),
            vec![
                name.as_deref().map(cons::sym).unwrap_or(Elem::Undefined),
                cons::list_elem(params),
                cons::list_elem(body),
            ],
        ))
    }

    fn build_template(&mut self, parts: Vec<TemplatePart>) -> PResult<Rc<Cons>> {
        let mut elems = Vec::new();
        for part in parts {
            match part {
                TemplatePart::Str(s) => elems.push(Elem::Str(Rc::from(s.as_str()))),
                TemplatePart::Expr(tokens) => {
                    let mut sub = Parser::new({
                        let mut v = tokens;
                        v.push(Token::Eof);
                        v
                    });
                    let expr = sub.parse_expression()?;
                    elems.push(cons::list_elem(expr));
                }
            }
        }
        Ok(cons::node(Elem::Sym(tags::template()), elems))
    }

    fn parse_array_literal(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::LBracket)?;
        let mut elems = Vec::new();
        while !self.check(&Token::RBracket) {
            if self.eat(&Token::Comma) {
                elems.push(Elem::Nil);
                continue;
            }
            if self.eat(&Token::DotDotDot) {
                let e = self.parse_assignment()?;
                elems.push(cons::list_elem(cons::node(Elem::Sym(tags::spread()), vec![cons::list_elem(e)])));
            } else {
                elems.push(cons::list_elem(self.parse_assignment()?));
            }
            if !self.check(&Token::RBracket) {
                self.eat(&Token::Comma);
            }
        }
        self.expect(Token::RBracket)?;
        Ok(cons::node(Elem::Sym(tags::array_lit()), elems))
    }

    fn parse_object_literal(&mut self) -> PResult<Rc<Cons>> {
        self.expect(Token::LBrace)?;
        let mut props = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.eat(&Token::DotDotDot) {
                let e = self.parse_assignment()?;
                props.push(cons::list_elem(cons::node(Elem::Sym(tags::spread()), vec![cons::list_elem(e)])));
            } else {
                let is_async = self.check(&Token::Async) && self.peek_at(1) != &Token::Colon && self.peek_at(1) != &Token::LParen;
                if is_async {
                    self.advance();
                }
                let is_generator = self.eat(&Token::Star);
                let accessor = if self.check(&Token::Get) && !matches!(self.peek_at(1), Token::Colon | Token::Comma | Token::RBrace) {
                    self.advance();
                    Some(tags::getter())
                } else if self.check(&Token::Set) && !matches!(self.peek_at(1), Token::Colon | Token::Comma | Token::RBrace) {
                    self.advance();
                    Some(tags::setter())
                } else {
                    None
                };
                let key = if self.check(&Token::LBracket) {
                    self.advance();
                    let e = self.parse_assignment()?;
                    self.expect(Token::RBracket)?;
                    ComputedOrName::Computed(e)
                } else {
                    ComputedOrName::Name(self.prop_key_name()?)
                };
                if let Some(tag) = accessor {
                    let params = self.parse_param_list()?;
                    let body = self.parse_block()?;
                    let key_elem = match key {
                        ComputedOrName::Name(n) => cons::sym(&n),
                        ComputedOrName::Computed(e) => cons::list_elem(e),
                    };
                    props.push(cons::list_elem(cons::node(Elem::Sym(tag), vec![key_elem, cons::list_elem(params), cons::list_elem(body)])));
                } else if self.check(&Token::LParen) {
                    let params = self.parse_param_list()?;
                    let body = self.parse_block()?;
                    let tag = if is_async {
                        tags::async_function()
                    } else if is_generator {
                        tags::generator_function()
                    } else {
                        tags::method()
                    };
                    let key_elem = match key {
                        ComputedOrName::Name(n) => cons::sym(&n),
                        ComputedOrName::Computed(e) => cons::list_elem(e),
                    };
                    props.push(cons::list_elem(cons::node(Elem::Sym(tag), vec![key_elem, cons::list_elem(params), cons::list_elem(body)])));
                } else if self.eat(&Token::Colon) {
                    let value = self.parse_assignment()?;
                    let key_elem = match key {
                        ComputedOrName::Name(n) => cons::sym(&n),
                        ComputedOrName::Computed(e) => cons::list_elem(e),
                    };
                    props.push(cons::list_elem(cons::node(cons::sym("Prop"), vec![key_elem, cons::list_elem(value)])));
                } else {
                    // shorthand { x }
                    let ComputedOrName::Name(n) = key else {
                        return Err(JSError::ParseError { message: "computed key requires a value".into() });
                    };
                    let ident = cons::node(Elem::Sym(tags::ident()), vec![cons::sym(&n)]);
                    props.push(cons::list_elem(cons::node(cons::sym("Prop"), vec![cons::sym(&n), cons::list_elem(ident)])));
                }
            }
            if !self.check(&Token::RBrace) {
                self.eat(&Token::Comma);
            }
        }
        self.expect(Token::RBrace)?;
        Ok(cons::node(Elem::Sym(tags::object_lit()), props))
    }

    fn prop_key_name(&mut self) -> PResult<String> {
        match self.advance() {
            Token::Identifier(n) => Ok(n),
            Token::StringLit(s) => Ok(s),
            Token::Number(n) => Ok(crate::number::number_to_string(n)),
            other => other.as_identifier_string().map(|s| s.to_string()).ok_or_else(|| JSError::ParseError {
                message: format!("expected property key, found {other:?}"),
            }),
        }
    }
}

enum ComputedOrName {
    Name(String),
    Computed(Rc<Cons>),
}
