//! Hand-written tokenizer, grounded on the teacher's `core/token.rs`
//! `tokenize` function: a single left-to-right scan with one character of
//! lookahead, no external lexer-generator crate.

use crate::js_error::JSError;
use crate::token::{TemplatePart, Token};

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    src: &'a str,
    pub line: u32,
    pub column: u32,
    prev_significant: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
            src,
            line: 1,
            column: 1,
            prev_significant: None,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), JSError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.advance() {
                        if c == '*' && self.peek() == Some('/') {
                            self.advance();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(JSError::SyntaxError {
                            message: "unterminated block comment".into(),
                        });
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Division vs. regex-literal disambiguation: a `/` is a regex start
    /// unless the previous significant token could end an expression.
    fn regex_allowed(&self) -> bool {
        !matches!(
            self.prev_significant,
            Some(
                Token::Identifier(_)
                    | Token::Number(_)
                    | Token::StringLit(_)
                    | Token::RParen
                    | Token::RBracket
                    | Token::RBrace
                    | Token::This
                    | Token::Super
            )
        )
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, JSError> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let Some(c) = self.peek() else {
                out.push(Token::Eof);
                break;
            };
            let tok = self.next_token(c)?;
            self.prev_significant = Some(tok.clone());
            out.push(tok);
        }
        Ok(out)
    }

    fn next_token(&mut self, c: char) -> Result<Token, JSError> {
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            return self.read_number();
        }
        if c == '"' || c == '\'' {
            return self.read_string(c);
        }
        if c == '`' {
            return self.read_template();
        }
        if c.is_alphabetic() || c == '_' || c == '$' {
            return Ok(self.read_identifier_or_keyword());
        }
        if c == '/' && self.regex_allowed() {
            return self.read_regex();
        }
        self.read_punctuator()
    }

    fn read_number(&mut self) -> Result<Token, JSError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek() == Some('n') {
            let text: String = self.chars[start..self.pos].iter().collect();
            self.advance();
            return Ok(Token::BigIntLit(text));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| JSError::SyntaxError { message: format!("invalid number literal '{text}'") })
    }

    fn read_string(&mut self, quote: char) -> Result<Token, JSError> {
        self.advance();
        let mut s = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(JSError::SyntaxError { message: "unterminated string literal".into() });
                }
                Some(c) if c == quote => break,
                Some('\\') => s.push(self.read_escape()?),
                Some(c) => s.push(c),
            }
        }
        Ok(Token::StringLit(s))
    }

    fn read_escape(&mut self) -> Result<char, JSError> {
        match self.advance() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('0') => Ok('\0'),
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('`') => Ok('`'),
            Some('\n') => Ok('\n'),
            Some(other) => Ok(other),
            None => Err(JSError::SyntaxError { message: "unterminated escape sequence".into() }),
        }
    }

    fn read_template(&mut self) -> Result<Token, JSError> {
        self.advance();
        let mut parts = Vec::new();
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => return Err(JSError::SyntaxError { message: "unterminated template literal".into() }),
                Some('`') => {
                    self.advance();
                    parts.push(TemplatePart::Str(std::mem::take(&mut buf)));
                    break;
                }
                Some('\\') => {
                    self.advance();
                    buf.push(self.read_escape()?);
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    parts.push(TemplatePart::Str(std::mem::take(&mut buf)));
                    self.advance();
                    self.advance();
                    let mut depth = 1usize;
                    let mut inner = Vec::new();
                    loop {
                        self.skip_whitespace_and_comments()?;
                        match self.peek() {
                            Some('{') => {
                                depth += 1;
                                let t = self.read_punctuator()?;
                                inner.push(t);
                            }
                            Some('}') => {
                                depth -= 1;
                                if depth == 0 {
                                    self.advance();
                                    break;
                                }
                                let t = self.read_punctuator()?;
                                inner.push(t);
                            }
                            None => return Err(JSError::SyntaxError { message: "unterminated template expression".into() }),
                            Some(c) => {
                                let t = self.next_token(c)?;
                                inner.push(t);
                            }
                        }
                    }
                    parts.push(TemplatePart::Expr(inner));
                }
                Some(c) => {
                    self.advance();
                    buf.push(c);
                }
            }
        }
        Ok(Token::TemplateString(parts))
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            self.advance();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "var" => Token::Var,
            "let" => Token::Let,
            "const" => Token::Const,
            "function" => Token::Function,
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "for" => Token::For,
            "while" => Token::While,
            "do" => Token::Do,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "new" => Token::New,
            "class" => Token::Class,
            "extends" => Token::Extends,
            "super" => Token::Super,
            "this" => Token::This,
            "typeof" => Token::Typeof,
            "instanceof" => Token::Instanceof,
            "in" => Token::In,
            "of" => Token::Of,
            "try" => Token::Try,
            "catch" => Token::Catch,
            "finally" => Token::Finally,
            "throw" => Token::Throw,
            "switch" => Token::Switch,
            "case" => Token::Case,
            "default" => Token::Default,
            "delete" => Token::Delete,
            "void" => Token::Void,
            "yield" => Token::Yield,
            "async" => Token::Async,
            "await" => Token::Await,
            "static" => Token::Static,
            "get" => Token::Get,
            "set" => Token::Set,
            "null" => Token::Null,
            "true" => Token::True,
            "false" => Token::False,
            "undefined" => Token::Undefined,
            _ => Token::Identifier(text),
        }
    }

    fn read_regex(&mut self) -> Result<Token, JSError> {
        let start_pos = self.pos;
        self.advance();
        let mut in_class = false;
        let pattern_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    self.pos = start_pos;
                    return self.read_punctuator();
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => {
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let pattern: String = self.chars[pattern_start..self.pos].iter().collect();
        self.advance();
        let flags_start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphabetic()) {
            self.advance();
        }
        let flags: String = self.chars[flags_start..self.pos].iter().collect();
        Ok(Token::RegexLit { pattern, flags })
    }

    fn read_punctuator(&mut self) -> Result<Token, JSError> {
        macro_rules! two {
            ($b:expr, $then:expr, $else_:expr) => {{
                if self.peek_at(1) == Some($b) {
                    self.advance();
                    self.advance();
                    $then
                } else {
                    self.advance();
                    $else_
                }
            }};
        }
        let c = self.peek().unwrap();
        Ok(match c {
            '(' => {
                self.advance();
                Token::LParen
            }
            ')' => {
                self.advance();
                Token::RParen
            }
            '{' => {
                self.advance();
                Token::LBrace
            }
            '}' => {
                self.advance();
                Token::RBrace
            }
            '[' => {
                self.advance();
                Token::LBracket
            }
            ']' => {
                self.advance();
                Token::RBracket
            }
            ';' => {
                self.advance();
                Token::Semicolon
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            ':' => {
                self.advance();
                Token::Colon
            }
            '~' => {
                self.advance();
                Token::BitNot
            }
            '.' => {
                if self.peek_at(1) == Some('.') && self.peek_at(2) == Some('.') {
                    self.advance();
                    self.advance();
                    self.advance();
                    Token::DotDotDot
                } else {
                    self.advance();
                    Token::Dot
                }
            }
            '?' => {
                if self.peek_at(1) == Some('.') && !self.peek_at(2).is_some_and(|d| d.is_ascii_digit()) {
                    self.advance();
                    self.advance();
                    Token::QuestionDot
                } else if self.peek_at(1) == Some('?') {
                    self.advance();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::QuestionQuestionEq
                    } else {
                        Token::QuestionQuestion
                    }
                } else {
                    self.advance();
                    Token::QuestionMark
                }
            }
            '=' => {
                if self.peek_at(1) == Some('=') && self.peek_at(2) == Some('=') {
                    self.advance();
                    self.advance();
                    self.advance();
                    Token::StrictEq
                } else if self.peek_at(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::Eq
                } else if self.peek_at(1) == Some('>') {
                    self.advance();
                    self.advance();
                    Token::Arrow
                } else {
                    self.advance();
                    Token::Assign
                }
            }
            '!' => {
                if self.peek_at(1) == Some('=') && self.peek_at(2) == Some('=') {
                    self.advance();
                    self.advance();
                    self.advance();
                    Token::StrictNotEq
                } else {
                    two!('=', Token::NotEq, Token::Not)
                }
            }
            '<' => {
                if self.peek_at(1) == Some('<') && self.peek_at(2) == Some('=') {
                    self.advance();
                    self.advance();
                    self.advance();
                    Token::ShlAssign
                } else if self.peek_at(1) == Some('<') {
                    self.advance();
                    self.advance();
                    Token::Shl
                } else {
                    two!('=', Token::LtEq, Token::Lt)
                }
            }
            '>' => {
                if self.peek_at(1) == Some('>') && self.peek_at(2) == Some('>') {
                    self.advance();
                    self.advance();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::UShrAssign
                    } else {
                        Token::UShr
                    }
                } else if self.peek_at(1) == Some('>') && self.peek_at(2) == Some('=') {
                    self.advance();
                    self.advance();
                    self.advance();
                    Token::ShrAssign
                } else if self.peek_at(1) == Some('>') {
                    self.advance();
                    self.advance();
                    Token::Shr
                } else {
                    two!('=', Token::GtEq, Token::Gt)
                }
            }
            '+' => {
                if self.peek_at(1) == Some('+') {
                    self.advance();
                    self.advance();
                    Token::PlusPlus
                } else {
                    two!('=', Token::PlusAssign, Token::Plus)
                }
            }
            '-' => {
                if self.peek_at(1) == Some('-') {
                    self.advance();
                    self.advance();
                    Token::MinusMinus
                } else {
                    two!('=', Token::MinusAssign, Token::Minus)
                }
            }
            '*' => {
                if self.peek_at(1) == Some('*') {
                    self.advance();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::StarStarAssign
                    } else {
                        Token::StarStar
                    }
                } else {
                    two!('=', Token::StarAssign, Token::Star)
                }
            }
            '/' => two!('=', Token::SlashAssign, Token::Slash),
            '%' => two!('=', Token::PercentAssign, Token::Percent),
            '&' => {
                if self.peek_at(1) == Some('&') {
                    self.advance();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::AndAndAssign
                    } else {
                        Token::AndAnd
                    }
                } else {
                    two!('=', Token::AndAssign, Token::And)
                }
            }
            '|' => {
                if self.peek_at(1) == Some('|') {
                    self.advance();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::OrOrAssign
                    } else {
                        Token::OrOr
                    }
                } else {
                    two!('=', Token::OrAssign, Token::Or)
                }
            }
            '^' => two!('=', Token::XorAssign, Token::Xor),
            other => {
                return Err(JSError::SyntaxError {
                    message: format!("unexpected character '{other}' at {}:{}", self.line, self.column),
                });
            }
        })
    }
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, JSError> {
    Lexer::new(src).tokenize()
}
