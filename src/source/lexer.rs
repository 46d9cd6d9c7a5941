use super::literal::unescape;
use super::{ParseError, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    At,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Eq,
    Dot,
    Plus,
    Minus,
    Ident(String),
    Str(String),
    Char(char),
    Number(String),
    /// Anything else; only an error if the parser reaches it.
    Other(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub span: Span,
}

/// On-demand tokenizer over a window of the unit text. Spans are absolute
/// byte offsets into the full text.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, start: usize) -> Self {
        Self { src, pos: start }
    }

    pub fn text(&self) -> &'a str {
        self.src
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    fn err(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError { offset, message: message.into() }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek_byte(0), self.peek_byte(1)) {
                (Some(b), _) if b.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    let rest = &self.src[self.pos..];
                    self.pos += rest.find('\n').unwrap_or(rest.len());
                }
                (Some(b'/'), Some(b'*')) => {
                    let rest = &self.src[self.pos + 2..];
                    match rest.find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => return Err(self.err(self.pos, "unterminated block comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.src[start..].chars().next() else {
            return Ok(Token { tok: Tok::Eof, span: Span::new(start, start) });
        };
        let punct = match c {
            '@' => Some(Tok::At),
            '(' => Some(Tok::LParen),
            ')' => Some(Tok::RParen),
            '{' => Some(Tok::LBrace),
            '}' => Some(Tok::RBrace),
            '[' => Some(Tok::LBracket),
            ']' => Some(Tok::RBracket),
            ',' => Some(Tok::Comma),
            '=' => Some(Tok::Eq),
            '+' => Some(Tok::Plus),
            '-' => Some(Tok::Minus),
            // `.5f` is a number, a lone `.` is a separator
            '.' if !matches!(self.peek_byte(1), Some(b) if b.is_ascii_digit()) => Some(Tok::Dot),
            _ => None,
        };
        if let Some(tok) = punct {
            self.pos += 1;
            return Ok(Token { tok, span: Span::new(start, self.pos) });
        }

        let tok = match c {
            '"' => {
                if self.src[start..].starts_with("\"\"\"") {
                    return Err(self.err(start, "text blocks are not supported in annotations"));
                }
                let body = self.quoted(start, '"')?;
                Tok::Str(body)
            }
            '\'' => {
                let body = self.quoted(start, '\'')?;
                let mut chars = body.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Tok::Char(ch),
                    _ => return Err(self.err(start, "char literal must hold exactly one character")),
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let rest = &self.src[start..];
                let len = rest
                    .char_indices()
                    .find(|&(i, ch)| !number_char(rest, i, ch))
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                self.pos += len;
                Tok::Number(rest[..len].to_string())
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let rest = &self.src[start..];
                let len = rest
                    .char_indices()
                    .find(|&(_, ch)| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                self.pos += len;
                Tok::Ident(rest[..len].to_string())
            }
            other => {
                self.pos += other.len_utf8();
                Tok::Other(other)
            }
        };
        Ok(Token { tok, span: Span::new(start, self.pos) })
    }

    /// Consume a quoted literal starting at `start`; returns the decoded body.
    fn quoted(&mut self, start: usize, quote: char) -> Result<String, ParseError> {
        let body_start = start + 1;
        let mut escaped = false;
        for (i, ch) in self.src[body_start..].char_indices() {
            match ch {
                '\n' | '\r' => break,
                '\\' if !escaped => escaped = true,
                ch if ch == quote && !escaped => {
                    let body = &self.src[body_start..body_start + i];
                    self.pos = body_start + i + 1;
                    return unescape(body)
                        .map_err(|(at, message)| self.err(body_start + at, message));
                }
                _ => escaped = false,
            }
        }
        Err(self.err(start, "unterminated literal"))
    }
}

fn number_char(text: &str, i: usize, ch: char) -> bool {
    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
        return true;
    }
    // exponent sign: 1e-5, 0x1p+3
    if ch == '+' || ch == '-' {
        let prev = text[..i].chars().last();
        let hex = text.starts_with("0x") || text.starts_with("0X");
        return match prev {
            Some('e' | 'E') => !hex,
            Some('p' | 'P') => hex,
            _ => false,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        let mut lx = Lexer::new(src, 0);
        let mut out = Vec::new();
        loop {
            let t = lx.next_token().unwrap();
            if t.tok == Tok::Eof {
                return out;
            }
            out.push(t.tok);
        }
    }

    #[test]
    fn lexes_annotation_tokens() {
        assert_eq!(
            toks(r#"@At(value = "INVOKE", ordinal = -1) // trailing"#),
            vec![
                Tok::At,
                Tok::Ident("At".into()),
                Tok::LParen,
                Tok::Ident("value".into()),
                Tok::Eq,
                Tok::Str("INVOKE".into()),
                Tok::Comma,
                Tok::Ident("ordinal".into()),
                Tok::Eq,
                Tok::Minus,
                Tok::Number("1".into()),
                Tok::RParen,
            ]
        );
    }

    #[test]
    fn numbers_keep_suffixes_and_exponents() {
        assert_eq!(toks("1.5e-3f 0x1Fp+2 10L .5"), vec![
            Tok::Number("1.5e-3f".into()),
            Tok::Number("0x1Fp+2".into()),
            Tok::Number("10L".into()),
            Tok::Number(".5".into()),
        ]);
        assert_eq!(toks("1+2"), vec![Tok::Number("1".into()), Tok::Plus, Tok::Number("2".into())]);
    }

    #[test]
    fn spans_are_absolute() {
        let src = "void x; /* c */ @Foo";
        let mut lx = Lexer::new(src, 8);
        let at = lx.next_token().unwrap();
        assert_eq!(at.span, Span::new(16, 17));
        let name = lx.next_token().unwrap();
        assert_eq!(name.span, Span::new(17, 20));
    }

    #[test]
    fn string_with_escaped_quote() {
        assert_eq!(toks(r#""a\"b" 'c' '\n'"#), vec![
            Tok::Str("a\"b".into()),
            Tok::Char('c'),
            Tok::Char('\n'),
        ]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lx = Lexer::new("\"abc\n\"", 0);
        assert!(lx.next_token().is_err());
    }
}
