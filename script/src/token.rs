//! Tokens and source positions.

use std::fmt;

/// A zero-based line and byte column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A half-open range of source positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// True if `pos` lies within the range. The end position counts, so a
    /// cursor placed right after an identifier still hits it.
    pub fn contains(&self, pos: SourcePosition) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// True if the two ranges overlap.
    pub fn intersects(&self, other: &SourceRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest range covering both.
    pub fn merge(self, other: SourceRange) -> SourceRange {
        SourceRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    End,
    Invalid,
    Identifier,
    Comment,

    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    RawStringLiteral,
    FStringLiteral,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Question,
    Dot,
    Pound,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Not,
    Shl,
    Shr,
    UShr,
    AndAnd,
    OrOr,
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    UShrEq,
    PlusPlus,
    MinusMinus,

    // Keywords
    Action,
    As,
    Break,
    Case,
    Const,
    Continue,
    Default,
    Do,
    Else,
    Float,
    Fn,
    For,
    From,
    If,
    Import,
    In,
    Int,
    Object,
    Return,
    String,
    Struct,
    Switch,
    Type,
    Vector,
    Void,
    While,

    // Literal constants
    ObjectSelf,
    ObjectInvalid,
    LocationInvalid,
    JsonNull,
    JsonFalse,
    JsonTrue,
    JsonObject,
    JsonArray,
    JsonString,

    // Macros
    MacroFunction,
    MacroFile,
    MacroDate,
    MacroTime,
    MacroLine,
}

impl TokenKind {
    /// Built-in type keywords.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Action
                | TokenKind::Float
                | TokenKind::Int
                | TokenKind::Object
                | TokenKind::String
                | TokenKind::Vector
                | TokenKind::Void
        )
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
                | TokenKind::UShrEq
        )
    }
}

/// Maps an identifier to its keyword, if it is one.
///
/// Dispatches on the first byte so most identifiers are rejected after one
/// comparison.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident.as_bytes().first()? {
        b'a' => match ident {
            "action" => TokenKind::Action,
            "as" => TokenKind::As,
            _ => return None,
        },
        b'b' if ident == "break" => TokenKind::Break,
        b'c' => match ident {
            "case" => TokenKind::Case,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            _ => return None,
        },
        b'd' => match ident {
            "default" => TokenKind::Default,
            "do" => TokenKind::Do,
            _ => return None,
        },
        b'e' if ident == "else" => TokenKind::Else,
        b'f' => match ident {
            "float" => TokenKind::Float,
            "fn" => TokenKind::Fn,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            _ => return None,
        },
        b'i' => match ident {
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "int" => TokenKind::Int,
            _ => return None,
        },
        b'o' if ident == "object" => TokenKind::Object,
        b'r' if ident == "return" => TokenKind::Return,
        b's' => match ident {
            "string" => TokenKind::String,
            "struct" => TokenKind::Struct,
            "switch" => TokenKind::Switch,
            _ => return None,
        },
        b't' if ident == "type" => TokenKind::Type,
        b'v' => match ident {
            "vector" => TokenKind::Vector,
            "void" => TokenKind::Void,
            _ => return None,
        },
        b'w' if ident == "while" => TokenKind::While,
        b'J' => match ident {
            "JSON_NULL" => TokenKind::JsonNull,
            "JSON_FALSE" => TokenKind::JsonFalse,
            "JSON_TRUE" => TokenKind::JsonTrue,
            "JSON_OBJECT" => TokenKind::JsonObject,
            "JSON_ARRAY" => TokenKind::JsonArray,
            "JSON_STRING" => TokenKind::JsonString,
            _ => return None,
        },
        b'L' if ident == "LOCATION_INVALID" => TokenKind::LocationInvalid,
        b'O' => match ident {
            "OBJECT_SELF" => TokenKind::ObjectSelf,
            "OBJECT_INVALID" => TokenKind::ObjectInvalid,
            _ => return None,
        },
        b'_' => match ident {
            "__FUNCTION__" => TokenKind::MacroFunction,
            "__FILE__" => TokenKind::MacroFile,
            "__DATE__" => TokenKind::MacroDate,
            "__TIME__" => TokenKind::MacroTime,
            "__LINE__" => TokenKind::MacroLine,
            _ => return None,
        },
        _ => return None,
    };
    Some(kind)
}

/// A lexed token. The text is `source[start..end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: SourceRange,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(keyword("int"), Some(TokenKind::Int));
        assert_eq!(keyword("import"), Some(TokenKind::Import));
        assert_eq!(keyword("OBJECT_SELF"), Some(TokenKind::ObjectSelf));
        assert_eq!(keyword("__LINE__"), Some(TokenKind::MacroLine));
        assert_eq!(keyword("integer"), None);
        assert_eq!(keyword("Int"), None);
        assert_eq!(keyword(""), None);
    }

    #[test]
    fn test_range_contains() {
        let range = SourceRange::new(SourcePosition::new(1, 4), SourcePosition::new(1, 9));
        assert!(range.contains(SourcePosition::new(1, 4)));
        assert!(range.contains(SourcePosition::new(1, 9)));
        assert!(!range.contains(SourcePosition::new(1, 10)));
        assert!(!range.contains(SourcePosition::new(0, 5)));
    }
}
