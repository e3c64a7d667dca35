//! Script lexer
//!
//! Produces tokens lazily from UTF-8 source. Comments are returned as
//! [`TokenKind::Comment`] tokens. Lexical errors are recorded and lexing
//! continues with the next character.

use crate::token::{SourcePosition, SourceRange, Token, TokenKind, keyword};

/// A lexical error awaiting collection by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub range: SourceRange,
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    line_start: usize,
    /// Byte offset of the first character of each line.
    line_map: Vec<usize>,
    errors: Vec<LexError>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        let pos = if src.starts_with('\u{FEFF}') { 3 } else { 0 };
        Self {
            src,
            bytes: src.as_bytes(),
            pos,
            line: 0,
            line_start: pos,
            line_map: vec![pos],
            errors: Vec::new(),
            done: false,
        }
    }

    /// Lexes `src[start..end]`, reporting positions as if the whole source
    /// had been lexed. `line_start` is the offset of the line holding `start`.
    pub fn with_span(src: &'a str, start: usize, end: usize, line: usize, line_start: usize) -> Self {
        let end = end.min(src.len());
        let src = src.get(..end).unwrap_or(src);
        Self {
            src,
            bytes: src.as_bytes(),
            pos: start.min(end),
            line,
            line_start,
            line_map: vec![line_start],
            errors: Vec::new(),
            done: false,
        }
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    pub fn line_map(&self) -> &[usize] {
        &self.line_map
    }

    pub fn into_line_map(self) -> Vec<usize> {
        self.line_map
    }

    /// Drains errors recorded since the last call.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    fn peek(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn cursor_position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.pos - self.line_start)
    }

    /// Consumes a line terminator at the cursor, if any. CRLF counts once.
    fn eat_newline(&mut self) -> bool {
        let len = match (self.peek(0), self.peek(1)) {
            (b'\r', b'\n') => 2,
            (b'\r', _) | (b'\n', _) => 1,
            _ => return false,
        };
        self.pos += len;
        self.line += 1;
        self.line_start = self.pos;
        self.line_map.push(self.pos);
        true
    }

    fn error(&mut self, message: impl Into<String>, start: SourcePosition) {
        self.errors.push(LexError {
            message: message.into(),
            range: SourceRange::new(start, self.cursor_position()),
        });
    }

    fn make(&self, kind: TokenKind, start: usize, start_pos: SourcePosition) -> Token {
        Token {
            kind,
            range: SourceRange::new(start_pos, self.cursor_position()),
            start,
            end: self.pos,
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.at_end() {
            match self.peek(0) {
                b' ' | b'\t' | 0x0B | 0x0C => self.pos += 1,
                b'\r' | b'\n' => {
                    self.eat_newline();
                }
                _ => break,
            }
        }
    }

    /// Lexes the next token. Returns [`TokenKind::End`] at end of input.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let start_pos = self.cursor_position();
            if self.at_end() {
                return self.make(TokenKind::End, start, start_pos);
            }

            let c = self.peek(0);
            let kind = match c {
                b'/' if self.peek(1) == b'/' => self.line_comment(),
                b'/' if self.peek(1) == b'*' => self.block_comment(start_pos),
                b'*' if self.peek(1) == b'/' => {
                    self.pos += 2;
                    self.error("unmatched '*/'", start_pos);
                    continue;
                }
                b'r' if self.peek(1) == b'"' => self.raw_string(start_pos),
                b'f' if self.peek(1) == b'"' => self.fstring(start_pos),
                b'"' => self.string(start_pos),
                b'0'..=b'9' => self.number(start_pos),
                b'.' if self.peek(1).is_ascii_digit() => self.number(start_pos),
                c if c.is_ascii_alphabetic() || c == b'_' => self.identifier(),
                _ => match self.punctuation() {
                    Some(kind) => kind,
                    None => {
                        let ch = self.src[self.pos..].chars().next().unwrap_or('\u{FFFD}');
                        self.pos += ch.len_utf8().max(1);
                        self.error(format!("unrecognized character '{ch}'"), start_pos);
                        continue;
                    }
                },
            };
            return self.make(kind, start, start_pos);
        }
    }

    fn line_comment(&mut self) -> TokenKind {
        while !self.at_end() && !matches!(self.peek(0), b'\r' | b'\n') {
            self.pos += 1;
        }
        TokenKind::Comment
    }

    fn block_comment(&mut self, start_pos: SourcePosition) -> TokenKind {
        self.pos += 2;
        loop {
            if self.at_end() {
                self.error("unterminated block comment", start_pos);
                break;
            }
            if self.peek(0) == b'*' && self.peek(1) == b'/' {
                self.pos += 2;
                break;
            }
            if !self.eat_newline() {
                self.pos += 1;
            }
        }
        TokenKind::Comment
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek(0).is_ascii_alphanumeric() || self.peek(0) == b'_' {
            self.pos += 1;
        }
        keyword(&self.src[start..self.pos]).unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self, start_pos: SourcePosition) -> TokenKind {
        if self.peek(0) == b'0' {
            let radix_digits: Option<fn(u8) -> bool> = match self.peek(1) {
                b'x' | b'X' => Some(|b: u8| b.is_ascii_hexdigit()),
                b'b' | b'B' => Some(|b: u8| b == b'0' || b == b'1'),
                b'o' | b'O' => Some(|b: u8| (b'0'..=b'7').contains(&b)),
                _ => None,
            };
            if let Some(is_digit) = radix_digits {
                self.pos += 2;
                let digits = self.pos;
                while is_digit(self.peek(0)) {
                    self.pos += 1;
                }
                if self.pos == digits {
                    self.error("expected digits after integer prefix", start_pos);
                }
                return TokenKind::IntLiteral;
            }
        }

        let mut is_float = false;
        while self.peek(0).is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek(0) == b'.' {
            is_float = true;
            self.pos += 1;
            while self.peek(0).is_ascii_digit() {
                self.pos += 1;
            }
        }
        if matches!(self.peek(0), b'f' | b'F') {
            is_float = true;
            self.pos += 1;
        }
        if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    /// Scans to the closing quote of a single-line string. Returns false if
    /// the line or input ended first.
    fn scan_quoted(&mut self) -> bool {
        while !self.at_end() {
            match self.peek(0) {
                b'"' => {
                    self.pos += 1;
                    return true;
                }
                b'\\' if !matches!(self.peek(1), b'\r' | b'\n' | 0) => self.pos += 2,
                b'\r' | b'\n' => return false,
                _ => self.pos += 1,
            }
        }
        false
    }

    fn string(&mut self, start_pos: SourcePosition) -> TokenKind {
        self.pos += 1;
        if !self.scan_quoted() {
            self.error("unterminated string literal", start_pos);
        }
        TokenKind::StringLiteral
    }

    /// `r"..."`: no escapes, may span lines.
    fn raw_string(&mut self, start_pos: SourcePosition) -> TokenKind {
        self.pos += 2;
        loop {
            if self.at_end() {
                self.error("unterminated raw string literal", start_pos);
                break;
            }
            if self.peek(0) == b'"' {
                self.pos += 1;
                break;
            }
            if !self.eat_newline() {
                self.pos += 1;
            }
        }
        TokenKind::RawStringLiteral
    }

    /// `f"..."`: quotes inside `{}` belong to nested string literals.
    fn fstring(&mut self, start_pos: SourcePosition) -> TokenKind {
        self.pos += 2;
        let mut depth = 0usize;
        loop {
            if self.at_end() || matches!(self.peek(0), b'\r' | b'\n') {
                self.error("unterminated interpolated string", start_pos);
                break;
            }
            match self.peek(0) {
                b'\\' if !matches!(self.peek(1), b'\r' | b'\n' | 0) => self.pos += 2,
                b'{' if depth == 0 && self.peek(1) == b'{' => self.pos += 2,
                b'}' if depth == 0 && self.peek(1) == b'}' => self.pos += 2,
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                b'"' if depth > 0 => {
                    self.pos += 1;
                    if !self.scan_quoted() {
                        self.error("unterminated interpolated string", start_pos);
                        break;
                    }
                }
                b'"' => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        TokenKind::FStringLiteral
    }

    fn punctuation(&mut self) -> Option<TokenKind> {
        use TokenKind::*;
        let (kind, len) = match (self.peek(0), self.peek(1), self.peek(2), self.peek(3)) {
            (b'>', b'>', b'>', b'=') => (UShrEq, 4),
            (b'>', b'>', b'>', _) => (UShr, 3),
            (b'>', b'>', b'=', _) => (ShrEq, 3),
            (b'<', b'<', b'=', _) => (ShlEq, 3),
            (b'>', b'>', _, _) => (Shr, 2),
            (b'<', b'<', _, _) => (Shl, 2),
            (b'>', b'=', _, _) => (GtEq, 2),
            (b'<', b'=', _, _) => (LtEq, 2),
            (b'=', b'=', _, _) => (EqEq, 2),
            (b'!', b'=', _, _) => (NotEq, 2),
            (b'&', b'&', _, _) => (AndAnd, 2),
            (b'|', b'|', _, _) => (OrOr, 2),
            (b'+', b'+', _, _) => (PlusPlus, 2),
            (b'-', b'-', _, _) => (MinusMinus, 2),
            (b'+', b'=', _, _) => (PlusEq, 2),
            (b'-', b'=', _, _) => (MinusEq, 2),
            (b'*', b'=', _, _) => (StarEq, 2),
            (b'/', b'=', _, _) => (SlashEq, 2),
            (b'%', b'=', _, _) => (PercentEq, 2),
            (b'&', b'=', _, _) => (AmpEq, 2),
            (b'|', b'=', _, _) => (PipeEq, 2),
            (b'^', b'=', _, _) => (CaretEq, 2),
            (b'(', ..) => (LParen, 1),
            (b')', ..) => (RParen, 1),
            (b'{', ..) => (LBrace, 1),
            (b'}', ..) => (RBrace, 1),
            (b'[', ..) => (LBracket, 1),
            (b']', ..) => (RBracket, 1),
            (b',', ..) => (Comma, 1),
            (b':', ..) => (Colon, 1),
            (b';', ..) => (Semicolon, 1),
            (b'?', ..) => (Question, 1),
            (b'.', ..) => (Dot, 1),
            (b'#', ..) => (Pound, 1),
            (b'+', ..) => (Plus, 1),
            (b'-', ..) => (Minus, 1),
            (b'*', ..) => (Star, 1),
            (b'/', ..) => (Slash, 1),
            (b'%', ..) => (Percent, 1),
            (b'&', ..) => (Amp, 1),
            (b'|', ..) => (Pipe, 1),
            (b'^', ..) => (Caret, 1),
            (b'~', ..) => (Tilde, 1),
            (b'!', ..) => (Not, 1),
            (b'=', ..) => (Eq, 1),
            (b'<', ..) => (Lt, 1),
            (b'>', ..) => (Gt, 1),
            _ => return None,
        };
        self.pos += len;
        Some(kind)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token including a final [`TokenKind::End`].
    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        self.done = token.kind == TokenKind::End;
        Some(token)
    }
}

/// Decodes the body of a quoted literal, handling backslash escapes.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("int x = 1; x >>>= 2;"),
            [Int, Identifier, Eq, IntLiteral, Semicolon, Identifier, UShrEq, IntLiteral, Semicolon, End]
        );
    }

    #[test]
    fn test_number_forms() {
        use TokenKind::*;
        assert_eq!(
            kinds("0x1F 0b101 0o17 42 1.5 1.5f 2f .25"),
            [IntLiteral, IntLiteral, IntLiteral, IntLiteral, FloatLiteral, FloatLiteral, FloatLiteral, FloatLiteral, End]
        );
    }

    #[test]
    fn test_string_forms() {
        use TokenKind::*;
        let src = r#""a\"b" r"c:\path" f"x = {f("y")}!""#;
        let mut lexer = Lexer::new(src);
        let tokens: Vec<_> = lexer.by_ref().collect();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            [StringLiteral, RawStringLiteral, FStringLiteral, End]
        );
        assert_eq!(tokens[0].text(src), r#""a\"b""#);
        assert_eq!(tokens[1].text(src), r#"r"c:\path""#);
        assert_eq!(tokens[2].text(src), r#"f"x = {f("y")}!""#);
        assert!(lexer.take_errors().is_empty());
    }

    #[test]
    fn test_comments_and_lines() {
        let src = "// one\r\nint x; /* two\nthree */\rint y;";
        let mut lexer = Lexer::new(src);
        let tokens: Vec<_> = lexer.by_ref().collect();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].text(src), "// one");
        let y = tokens.iter().rfind(|t| t.kind == TokenKind::Identifier).unwrap();
        assert_eq!(y.range.start, SourcePosition::new(3, 4));
        assert_eq!(lexer.line_map(), &[0, 8, 22, 31]);
    }

    #[test]
    fn test_invalid_character_recovers() {
        let src = "int x = 1; @ int y = 2;";
        let mut lexer = Lexer::new(src);
        let count = lexer.by_ref().filter(|t| t.kind == TokenKind::Int).count();
        assert_eq!(count, 2);
        let errors = lexer.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].range.start, SourcePosition::new(0, 11));
    }

    #[test]
    fn test_token_ranges() {
        let mut lexer = Lexer::new("int\n  value;");
        let int = lexer.next_token();
        assert_eq!(int.range, SourceRange::new(SourcePosition::new(0, 0), SourcePosition::new(0, 3)));
        let value = lexer.next_token();
        assert_eq!(value.range, SourceRange::new(SourcePosition::new(1, 2), SourcePosition::new(1, 7)));
        assert_eq!(lexer.next_token().range.start, SourcePosition::new(1, 7));
    }

    #[test]
    fn test_unterminated() {
        let mut lexer = Lexer::new("string s = \"abc\nint y;");
        let tokens: Vec<_> = lexer.by_ref().collect();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Int));
        assert_eq!(lexer.take_errors().len(), 1);

        let mut lexer = Lexer::new("/* never closed");
        lexer.by_ref().for_each(drop);
        assert_eq!(lexer.take_errors()[0].message, "unterminated block comment");
    }

    #[test]
    fn test_bom_and_macros() {
        use TokenKind::*;
        assert_eq!(
            kinds("\u{FEFF}__LINE__ OBJECT_SELF JSON_NULL"),
            [MacroLine, ObjectSelf, JsonNull, End]
        );
    }

    #[test]
    fn test_span_positions() {
        let src = "x;\nstring s = f\"{a + b}\";";
        let start = src.find("a +").unwrap();
        let mut lexer = Lexer::with_span(src, start, start + 5, 1, 3);
        let a = lexer.next_token();
        assert_eq!(a.text(src), "a");
        assert_eq!(a.range.start, SourcePosition::new(1, start - 3));
        assert_eq!(lexer.next_token().kind, TokenKind::Plus);
        assert_eq!(lexer.next_token().text(src), "b");
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a\"b\n\\"#), "a\"b\n\\");
    }
}
