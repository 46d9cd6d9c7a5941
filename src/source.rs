//! Annotation syntax as written in the unit text.
//!
//! The parser reads a single annotation starting at its `@` and keeps the
//! absolute byte span of every expression, so the patcher can splice
//! replacement literals without re-printing anything else.
pub mod lexer;
pub mod literal;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lexer::{Lexer, Tok, Token};

/// Byte range into a compilation unit's text, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub const fn join(self, other: Span) -> Span {
        let start = if self.start < other.start { self.start } else { other.start };
        let end = if self.end > other.end { self.end } else { other.end };
        Span { start, end }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("at byte {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct SourceAnnotation {
    /// Name as written, possibly qualified.
    pub name: String,
    pub span: Span,
    /// `@A(x)` is read as a single pair named `value`.
    pub pairs: Vec<Pair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Decoded string value.
    Str(String),
    Char(char),
    /// Numeric literal text, sign included.
    Number(String),
    Bool(bool),
    Null,
    /// Type text of `T.class`, e.g. `Core`, `int[]`.
    ClassLit(String),
    /// Simple or qualified name (constants, enum values).
    Name(String),
    Annotation(SourceAnnotation),
    Array(Vec<Expr>),
    /// Operands of a `+` chain, flattened.
    Concat(Vec<Expr>),
    Paren(Box<Expr>),
}

impl SourceAnnotation {
    pub fn pair(&self, name: &str) -> Option<&Pair> {
        self.pairs.iter().find(|p| p.name == name)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl Expr {
    /// Strip redundant parentheses.
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }

    /// Short label for diagnostics.
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            ExprKind::Str(_) => "string literal",
            ExprKind::Char(_) => "char literal",
            ExprKind::Number(_) => "number literal",
            ExprKind::Bool(_) => "boolean literal",
            ExprKind::Null => "null",
            ExprKind::ClassLit(_) => "class literal",
            ExprKind::Name(_) => "name",
            ExprKind::Annotation(_) => "annotation",
            ExprKind::Array(_) => "array initializer",
            ExprKind::Concat(_) => "concatenation",
            ExprKind::Paren(inner) => inner.describe(),
        }
    }

    /// Fold a string-valued constant expression the way `javac` does.
    /// `None` when some operand is not a literal (e.g. a named constant)
    /// or the expression is not string-typed.
    pub fn fold_string(&self) -> Option<String> {
        match &self.unparen().kind {
            ExprKind::Str(s) => Some(s.clone()),
            ExprKind::Concat(parts) => {
                // `1 + 2 + "x"` is "3x" in Java; only fold when the first
                // operand is already a string to stay exact.
                let mut it = parts.iter();
                let mut acc = it.next()?.fold_string()?;
                for part in it {
                    match &part.unparen().kind {
                        ExprKind::Str(s) => acc.push_str(s),
                        ExprKind::Char(c) => acc.push(*c),
                        ExprKind::Bool(b) => acc.push_str(if *b { "true" } else { "false" }),
                        ExprKind::Number(n) if is_plain_int(n) => acc.push_str(n),
                        ExprKind::Concat(_) => acc.push_str(&part.fold_string()?),
                        _ => return None,
                    }
                }
                Some(acc)
            }
            _ => None,
        }
    }
}

fn is_plain_int(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

/// Parse the annotation whose `@` sits at byte `start` of `text`.
pub fn parse_annotation(text: &str, start: usize) -> Result<SourceAnnotation, ParseError> {
    if start > text.len() || !text.is_char_boundary(start) {
        return Err(ParseError { offset: start, message: "start offset is not inside the text".into() });
    }
    let mut parser = Parser::new(text, start)?;
    let at = parser.bump()?;
    if at.tok != Tok::At {
        return Err(ParseError { offset: at.span.start, message: "expected `@`".into() });
    }
    parser.annotation_after_at(at.span)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Token,
    last_end: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, start: usize) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(text, start);
        let peeked = lexer.next_token()?;
        Ok(Self { lexer, peeked, last_end: start })
    }

    fn peek(&self) -> &Tok {
        &self.peeked.tok
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        let tok = std::mem::replace(&mut self.peeked, next);
        self.last_end = tok.span.end;
        Ok(tok)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError { offset: self.peeked.span.start, message: message.into() })
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<Token, ParseError> {
        if *self.peek() == tok {
            self.bump()
        } else {
            self.error(format!("expected {what}, found {:?}", self.peek()))
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.bump()?;
                Ok(name)
            }
            other => self.error(format!("expected identifier, found {other:?}")),
        }
    }

    fn qualified_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.ident()?;
        while *self.peek() == Tok::Dot {
            self.bump()?;
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn annotation_after_at(&mut self, at: Span) -> Result<SourceAnnotation, ParseError> {
        let name = self.qualified_name()?;
        let mut pairs = Vec::new();

        if *self.peek() == Tok::LParen {
            self.bump()?;
            if *self.peek() != Tok::RParen {
                let named = matches!(self.peek(), Tok::Ident(_)) && self.ident_followed_by_eq();
                if named {
                    loop {
                        let key = self.ident()?;
                        self.expect(Tok::Eq, "`=`")?;
                        let value = self.element_value()?;
                        if pairs.iter().any(|p: &Pair| p.name == key) {
                            return self.error(format!("duplicate member `{key}`"));
                        }
                        pairs.push(Pair { name: key, value });
                        if *self.peek() == Tok::Comma {
                            self.bump()?;
                            continue;
                        }
                        break;
                    }
                } else {
                    let value = self.element_value()?;
                    pairs.push(Pair { name: "value".into(), value });
                }
            }
            self.expect(Tok::RParen, "`)`")?;
        }

        Ok(SourceAnnotation { name, span: Span::new(at.start, self.last_end), pairs })
    }

    /// Look past the current identifier without consuming it.
    fn ident_followed_by_eq(&self) -> bool {
        let mut probe = Lexer::new(self.lexer_text(), self.peeked.span.end);
        matches!(probe.next_token(), Ok(Token { tok: Tok::Eq, .. }))
    }

    fn lexer_text(&self) -> &'a str {
        self.lexer.text()
    }

    fn element_value(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Tok::At => {
                let at = self.bump()?;
                let ann = self.annotation_after_at(at.span)?;
                let span = ann.span;
                Ok(Expr { kind: ExprKind::Annotation(ann), span })
            }
            Tok::LBrace => self.array_initializer(),
            _ => self.additive(),
        }
    }

    fn array_initializer(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(Tok::LBrace, "`{`")?;
        let mut elems = Vec::new();
        while *self.peek() != Tok::RBrace {
            elems.push(self.element_value()?);
            if *self.peek() == Tok::Comma {
                self.bump()?;
            } else {
                break;
            }
        }
        let close = self.expect(Tok::RBrace, "`}`")?;
        Ok(Expr { kind: ExprKind::Array(elems), span: open.span.join(close.span) })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let first = self.unary()?;
        if *self.peek() != Tok::Plus {
            return Ok(first);
        }
        let mut parts = vec![first];
        while *self.peek() == Tok::Plus {
            self.bump()?;
            parts.push(self.unary()?);
        }
        let span = parts[0].span.join(parts[parts.len() - 1].span);
        Ok(Expr { kind: ExprKind::Concat(parts), span })
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if *self.peek() == Tok::Minus {
            let minus = self.bump()?;
            return match self.bump()? {
                Token { tok: Tok::Number(n), span } => Ok(Expr {
                    kind: ExprKind::Number(format!("-{n}")),
                    span: minus.span.join(span),
                }),
                other => Err(ParseError {
                    offset: other.span.start,
                    message: "only numeric literals may be negated".into(),
                }),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.bump()?;
        let span = tok.span;
        let kind = match tok.tok {
            Tok::Str(s) => ExprKind::Str(s),
            Tok::Char(c) => ExprKind::Char(c),
            Tok::Number(n) => ExprKind::Number(n),
            Tok::LParen => {
                let inner = self.element_value()?;
                let close = self.expect(Tok::RParen, "`)`")?;
                return Ok(Expr { kind: ExprKind::Paren(Box::new(inner)), span: span.join(close.span) });
            }
            Tok::Ident(first) => return self.name_or_class_literal(first, span),
            Tok::Other(c) => {
                return Err(ParseError { offset: span.start, message: format!("unexpected character `{c}`") });
            }
            other => {
                return Err(ParseError { offset: span.start, message: format!("unexpected {other:?}") });
            }
        };
        Ok(Expr { kind, span })
    }

    fn name_or_class_literal(&mut self, first: String, start: Span) -> Result<Expr, ParseError> {
        match first.as_str() {
            "true" => return Ok(Expr { kind: ExprKind::Bool(true), span: start }),
            "false" => return Ok(Expr { kind: ExprKind::Bool(false), span: start }),
            "null" => return Ok(Expr { kind: ExprKind::Null, span: start }),
            _ => {}
        }
        let mut name = first;
        loop {
            match self.peek() {
                Tok::Dot => {
                    self.bump()?;
                    let part = self.ident()?;
                    if part == "class" {
                        return Ok(Expr { kind: ExprKind::ClassLit(name), span: Span::new(start.start, self.last_end) });
                    }
                    name.push('.');
                    name.push_str(&part);
                }
                Tok::LBracket => {
                    self.bump()?;
                    self.expect(Tok::RBracket, "`]`")?;
                    name.push_str("[]");
                    if *self.peek() != Tok::LBracket && *self.peek() != Tok::Dot {
                        return self.error("array type must be followed by `.class`");
                    }
                }
                _ => break,
            }
        }
        if name.ends_with("[]") {
            return self.error("array type must be followed by `.class`");
        }
        Ok(Expr { kind: ExprKind::Name(name), span: Span::new(start.start, self.last_end) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inject_with_nested_at() {
        let text = r#"    @Inject(method = "firstName()Ljava/lang/String;", at = @At(value = "INVOKE", target = "LCore;firstName()Ljava/lang/String;"))
    private static void inject() {}"#;
        let ann = parse_annotation(text, 4).unwrap();
        assert_eq!(ann.name, "Inject");
        assert_eq!(&text[ann.span.start..ann.span.end], text.lines().next().unwrap().trim());

        let method = &ann.pair("method").unwrap().value;
        assert_eq!(method.kind, ExprKind::Str("firstName()Ljava/lang/String;".into()));
        assert_eq!(&text[method.span.start..method.span.end], "\"firstName()Ljava/lang/String;\"");

        let ExprKind::Annotation(at) = &ann.pair("at").unwrap().value.kind else {
            panic!("expected nested annotation");
        };
        assert_eq!(at.simple_name(), "At");
        let target = &at.pair("target").unwrap().value;
        assert_eq!(&text[target.span.start..target.span.end], "\"LCore;firstName()Ljava/lang/String;\"");
    }

    #[test]
    fn shorthand_and_class_literals() {
        let ann = parse_annotation("@Mixin({Core.class, int[].class, a.b.C.Inner.class})", 0).unwrap();
        assert_eq!(ann.pairs.len(), 1);
        let ExprKind::Array(elems) = &ann.pair("value").unwrap().value.kind else {
            panic!("expected array");
        };
        let kinds: Vec<_> = elems.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(kinds, vec![
            ExprKind::ClassLit("Core".into()),
            ExprKind::ClassLit("int[]".into()),
            ExprKind::ClassLit("a.b.C.Inner".into()),
        ]);
    }

    #[test]
    fn marker_and_empty_parens() {
        let ann = parse_annotation("@Overwrite public void x()", 0).unwrap();
        assert_eq!(ann.span, Span::new(0, 10));
        assert!(ann.pairs.is_empty());
        let ann = parse_annotation("@org.example.Marker() int f;", 0).unwrap();
        assert_eq!(ann.name, "org.example.Marker");
        assert!(ann.pairs.is_empty());
    }

    #[test]
    fn concatenation_folds_and_spans_whole_chain() {
        let text = r#"@Inject(method = "first" + /* c */ "Name" + "()V", remap = false, ordinal = -2, shift = At.Shift.AFTER)"#;
        let ann = parse_annotation(text, 0).unwrap();
        let method = &ann.pair("method").unwrap().value;
        assert!(matches!(method.kind, ExprKind::Concat(ref xs) if xs.len() == 3));
        assert_eq!(method.fold_string().as_deref(), Some("firstName()V"));
        assert_eq!(&text[method.span.start..method.span.end], r#""first" + /* c */ "Name" + "()V""#);
        assert_eq!(ann.pair("remap").unwrap().value.kind, ExprKind::Bool(false));
        assert_eq!(ann.pair("ordinal").unwrap().value.kind, ExprKind::Number("-2".into()));
        assert_eq!(ann.pair("shift").unwrap().value.kind, ExprKind::Name("At.Shift.AFTER".into()));
    }

    #[test]
    fn fold_refuses_non_literal_operands() {
        let ann = parse_annotation(r#"@A(x = PREFIX + "()V", y = 1 + "a", z = ("a" + 'b') + 2)"#, 0).unwrap();
        assert_eq!(ann.pair("x").unwrap().value.fold_string(), None);
        assert_eq!(ann.pair("y").unwrap().value.fold_string(), None);
        assert_eq!(ann.pair("z").unwrap().value.fold_string().as_deref(), Some("ab2"));
    }

    #[test]
    fn trailing_comma_in_array() {
        let ann = parse_annotation(r#"@A(method = {"a()V", "b()V",})"#, 0).unwrap();
        let ExprKind::Array(elems) = &ann.pair("method").unwrap().value.kind else {
            panic!("expected array");
        };
        assert_eq!(elems.len(), 2);
    }

    #[test]
    fn rejects_malformed_annotations() {
        assert!(parse_annotation("Inject(method = \"a\")", 0).is_err());
        assert!(parse_annotation("@Inject(method = )", 0).is_err());
        assert!(parse_annotation("@Inject(a = 1, a = 2)", 0).is_err());
        assert!(parse_annotation("@Inject(method = \"a\"", 0).is_err());
        assert!(parse_annotation("@A", 99).is_err());
    }
}
