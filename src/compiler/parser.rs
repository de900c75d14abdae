// Recursive-descent parser: tokens -> unresolved blueprint AST.
use serde_json::Number;

use super::lexer::{Spanned, Token};
use crate::error::Location;
use crate::ir::ScalarKind;

// ————————————————————————————————————————————————————————————————————————————
// AST
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Openness {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Literal {
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConstraintAst {
    pub key: Spanned<String>,
    pub value: Spanned<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypeAst {
    Scalar {
        kind: ScalarKind,
        constraints: Vec<ConstraintAst>,
    },
    Named(Spanned<String>),
    Inline {
        openness: Option<Openness>,
        fields: Vec<FieldAst>,
    },
    Array(Box<TypeAst>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldAst {
    pub name: Spanned<String>,
    pub optional: bool,
    pub ty: TypeAst,
    pub default: Option<Spanned<Literal>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TypeDecl {
    pub name: Spanned<String>,
    pub root: bool,
    pub openness: Option<Openness>,
    pub fields: Vec<FieldAst>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Type(TypeDecl),
    /// `root Name` without a body.
    RootMark(Spanned<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParseError {
    pub message: String,
    pub at: Location,
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

/// Deepest allowed nesting of inline objects, and separately of `[]`.
/// Matches serde_json's recursion limit, so no accepted document is
/// deeper than a blueprint can describe.
pub(crate) const MAX_NESTING: usize = 128;

pub(crate) fn parse(tokens: Vec<Spanned<Token>>) -> Result<Vec<Item>, ParseError> {
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let mut items = Vec::new();
    while parser.peek() != &Token::Eof {
        items.push(parser.item()?);
    }
    Ok(items)
}

struct Parser {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    /// Open `{` bodies on the current descent.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        // `tokenize` guarantees a trailing Eof, so clamp to it.
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].node
    }

    fn at(&self) -> Location {
        self.tokens[self.pos.min(self.tokens.len() - 1)].at
    }

    fn advance(&mut self) -> Spanned<Token> {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_word(&self, n: usize, word: &str) -> bool {
        matches!(self.peek_nth(n), Token::Ident(s) if s == word)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError {
            message: format!("expected {expected}, found {}", self.peek().describe()),
            at: self.at(),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn ident(&mut self, what: &str) -> Result<Spanned<String>, ParseError> {
        match self.peek() {
            Token::Ident(_) => {
                let Spanned { node, at } = self.advance();
                let Token::Ident(name) = node else { unreachable!() };
                Ok(Spanned { node: name, at })
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn openness(&mut self) -> Option<Openness> {
        if self.is_word(0, "open") {
            self.advance();
            Some(Openness::Open)
        } else if self.is_word(0, "closed") {
            self.advance();
            Some(Openness::Closed)
        } else {
            None
        }
    }

    fn item(&mut self) -> Result<Item, ParseError> {
        let openness = self.openness();
        if self.is_word(0, "type") {
            self.advance();
            let name = self.ident("a type name")?;
            let fields = self.body()?;
            return Ok(Item::Type(TypeDecl { name, root: false, openness, fields }));
        }
        if self.is_word(0, "root") {
            self.advance();
            let name = self.ident("a root type name")?;
            if self.peek() == &Token::LBrace {
                let fields = self.body()?;
                return Ok(Item::Type(TypeDecl { name, root: true, openness, fields }));
            }
            if openness.is_some() {
                return Err(self.unexpected("`{` after an open/closed root"));
            }
            self.eat(&Token::Semicolon);
            return Ok(Item::RootMark(name));
        }
        Err(self.unexpected("`type` or `root`"))
    }

    fn too_deep(&self) -> ParseError {
        ParseError {
            message: format!("nested too deeply (limit {MAX_NESTING})"),
            at: self.at(),
        }
    }

    fn body(&mut self) -> Result<Vec<FieldAst>, ParseError> {
        if self.depth == MAX_NESTING {
            return Err(self.too_deep());
        }
        self.expect(Token::LBrace)?;
        self.depth += 1;
        let mut fields = Vec::new();
        while !self.eat(&Token::RBrace) {
            fields.push(self.field()?);
            self.eat(&Token::Comma);
        }
        self.depth -= 1;
        Ok(fields)
    }

    fn field(&mut self) -> Result<FieldAst, ParseError> {
        // `optional` is a modifier only when a field name follows it.
        let optional = self.is_word(0, "optional")
            && matches!(self.peek_nth(1), Token::Ident(_) | Token::Str(_));
        if optional {
            self.advance();
        }

        let name = match self.peek() {
            Token::Ident(_) => self.ident("a field name")?,
            Token::Str(_) => {
                let Spanned { node, at } = self.advance();
                let Token::Str(name) = node else { unreachable!() };
                Spanned { node: name, at }
            }
            _ => return Err(self.unexpected("a field name or `}`")),
        };
        self.expect(Token::Colon)?;
        let ty = self.ty()?;
        let default = if self.eat(&Token::Equals) { Some(self.literal()?) } else { None };
        Ok(FieldAst { name, optional, ty, default })
    }

    fn ty(&mut self) -> Result<TypeAst, ParseError> {
        let mut ty = self.base_ty()?;
        let mut dims = 0;
        while self.peek() == &Token::LBracket {
            if dims == MAX_NESTING {
                return Err(self.too_deep());
            }
            self.advance();
            self.expect(Token::RBracket)?;
            ty = TypeAst::Array(Box::new(ty));
            dims += 1;
        }
        Ok(ty)
    }

    fn base_ty(&mut self) -> Result<TypeAst, ParseError> {
        let inline_modifier = (self.is_word(0, "open") || self.is_word(0, "closed"))
            && self.peek_nth(1) == &Token::LBrace;
        if inline_modifier || self.peek() == &Token::LBrace {
            let openness = self.openness();
            let fields = self.body()?;
            return Ok(TypeAst::Inline { openness, fields });
        }
        let name = self.ident("a type")?;
        match ScalarKind::from_keyword(&name.node) {
            Some(kind) => {
                let constraints = if self.peek() == &Token::LParen {
                    self.constraints()?
                } else {
                    Vec::new()
                };
                Ok(TypeAst::Scalar { kind, constraints })
            }
            None => Ok(TypeAst::Named(name)),
        }
    }

    fn constraints(&mut self) -> Result<Vec<ConstraintAst>, ParseError> {
        self.expect(Token::LParen)?;
        let mut out = Vec::new();
        while !self.eat(&Token::RParen) {
            let key = self.ident("a constraint name")?;
            self.expect(Token::Equals)?;
            let value = self.literal()?;
            out.push(ConstraintAst { key, value });
            if !self.eat(&Token::Comma) && self.peek() != &Token::RParen {
                return Err(self.unexpected("`,` or `)`"));
            }
        }
        Ok(out)
    }

    fn literal(&mut self) -> Result<Spanned<Literal>, ParseError> {
        let at = self.at();
        let node = match self.peek() {
            Token::Number(n) => Literal::Number(n.clone()),
            Token::Str(s) => Literal::String(s.clone()),
            Token::Ident(w) if w == "true" => Literal::Bool(true),
            Token::Ident(w) if w == "false" => Literal::Bool(false),
            Token::Ident(w) if w == "null" => Literal::Null,
            _ => return Err(self.unexpected("a literal")),
        };
        self.advance();
        Ok(Spanned { node, at })
    }
}
