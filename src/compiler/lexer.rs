use std::iter::Peekable;
use std::str::Chars;

use serde_json::Number;

use crate::error::Location;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Identifiers and keywords; keywords are recognized by the parser in context.
    Ident(String),
    Str(String),
    Number(Number),

    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    Equals,
    Semicolon,

    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("`{s}`"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Number(n) => format!("number {n}"),
            Self::LBrace => "`{`".into(),
            Self::RBrace => "`}`".into(),
            Self::LBracket => "`[`".into(),
            Self::RBracket => "`]`".into(),
            Self::LParen => "`(`".into(),
            Self::RParen => "`)`".into(),
            Self::Colon => "`:`".into(),
            Self::Comma => "`,`".into(),
            Self::Equals => "`=`".into(),
            Self::Semicolon => "`;`".into(),
            Self::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned<T> {
    pub node: T,
    pub at: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LexError {
    pub message: String,
    pub at: Location,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

/// Splits blueprint text into tokens, dropping whitespace and comments.
/// The returned vector always ends with `Token::Eof`.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Spanned<Token>>, LexError> {
    let mut lexer = Lexer { chars: text.chars().peekable(), line: 1, column: 1 };
    let mut out = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.node == Token::Eof;
        out.push(token);
        if done {
            return Ok(out);
        }
    }
}

impl Lexer<'_> {
    fn here(&self) -> Location {
        Location { line: self.line, column: self.column }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, at: Location, message: impl Into<String>) -> LexError {
        LexError { message: message.into(), at }
    }

    fn next_token(&mut self) -> Result<Spanned<Token>, LexError> {
        self.skip_trivia()?;
        let at = self.here();
        let Some(&ch) = self.chars.peek() else {
            return Ok(Spanned { node: Token::Eof, at });
        };
        let node = match ch {
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            ':' => self.single(Token::Colon),
            ',' => self.single(Token::Comma),
            '=' => self.single(Token::Equals),
            ';' => self.single(Token::Semicolon),
            '"' => self.read_string(at)?,
            '-' | '0'..='9' => self.read_number(at)?,
            c if c.is_alphabetic() || c == '_' => self.read_ident(),
            other => return Err(self.error(at, format!("unexpected character {other:?}"))),
        };
        Ok(Spanned { node, at })
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Whitespace, `#` and `//` line comments, `/* */` block comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => self.skip_line(),
                Some('/') => {
                    let at = self.here();
                    self.advance();
                    match self.chars.peek() {
                        Some('/') => self.skip_line(),
                        Some('*') => {
                            self.advance();
                            self.skip_block(at)?;
                        }
                        _ => return Err(self.error(at, "unexpected character '/'")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block(&mut self, start: Location) -> Result<(), LexError> {
        while let Some(ch) = self.advance() {
            if ch == '*' && self.chars.peek() == Some(&'/') {
                self.advance();
                return Ok(());
            }
        }
        Err(self.error(start, "unterminated block comment"))
    }

    fn read_ident(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::Ident(ident)
    }

    /// JSON number grammar; the text is handed to `serde_json` for the value.
    fn read_number(&mut self, at: Location) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E') {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text.parse::<Number>()
            .map(Token::Number)
            .map_err(|_| self.error(at, format!("invalid number literal `{text}`")))
    }

    fn read_string(&mut self, at: Location) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(Token::Str(out)),
                Some('\\') => {
                    let escaped = match self.advance() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(other) => {
                            return Err(self.error(at, format!("invalid escape sequence \\{other}")));
                        }
                        None => return Err(self.error(at, "unterminated string")),
                    };
                    out.push(escaped);
                }
                Some('\n') | None => return Err(self.error(at, "unterminated string")),
                Some(ch) => out.push(ch),
            }
        }
    }
}
