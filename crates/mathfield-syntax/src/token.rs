//! Token types produced by the tokenizer.
//!
//! Following the same split as a lexer/parser pair, there are two enums:
//!
//! 1. [`Token`] carries the payload (the literal grapheme, the command name,
//!    the parameter index) and is what [`tokenize`](crate::tokenize) returns
//! 2. [`TokenKind`] is the payload-free discriminant, cheap to copy and
//!    compare, which the parser uses for lookahead
//!
//! Tokens are immutable values. They own their payload so a token stream can
//! outlive the comment-stripped buffer it was scanned from.

use std::fmt;

/// The payload of a `#` parameter token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamIndex {
    /// `#0` through `#9`
    Digit(u8),
    /// `#?`, a placeholder to be filled in by the user
    Placeholder,
}

/// A lexical unit of math markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Exactly one grapheme cluster that has no structural meaning.
    Literal(String),
    /// `^`
    Superscript,
    /// `_`
    Subscript,
    /// `\name` (the payload excludes the backslash)
    Command(String),
    /// `{` or `\bgroup`
    GroupOpen,
    /// `}` or `\egroup`
    GroupClose,
    /// `#0`..`#9` or `#?`
    Param(ParamIndex),
    /// `$`
    MathShift,
    /// `$$`
    MathShiftDouble,
    /// One whitespace grapheme. Runs are not coalesced.
    Space,
}

/// Payload-free discriminant of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Literal,
    Superscript,
    Subscript,
    Command,
    GroupOpen,
    GroupClose,
    Param,
    MathShift,
    MathShiftDouble,
    Space,
}

impl Token {
    /// Create a literal token.
    ///
    /// A closing brace is always structural, so it can never be the payload
    /// of a literal.
    pub fn literal(grapheme: impl Into<String>) -> Self {
        let grapheme = grapheme.into();
        debug_assert_ne!(grapheme, "}", "`}}` must be tokenized as GroupClose");
        Token::Literal(grapheme)
    }

    /// Create a command token from a name without its leading backslash.
    pub fn command(name: impl Into<String>) -> Self {
        Token::Command(name.into())
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Literal(_) => TokenKind::Literal,
            Token::Superscript => TokenKind::Superscript,
            Token::Subscript => TokenKind::Subscript,
            Token::Command(_) => TokenKind::Command,
            Token::GroupOpen => TokenKind::GroupOpen,
            Token::GroupClose => TokenKind::GroupClose,
            Token::Param(_) => TokenKind::Param,
            Token::MathShift => TokenKind::MathShift,
            Token::MathShiftDouble => TokenKind::MathShiftDouble,
            Token::Space => TokenKind::Space,
        }
    }

    /// The literal grapheme, if this is a literal token.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Token::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// The command name, if this is a command token.
    pub fn as_command(&self) -> Option<&str> {
        match self {
            Token::Command(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the token back as markup.
///
/// This is not guaranteed to reproduce the original source (`\bgroup` comes
/// back as `{`, whitespace comes back as a plain space) but re-tokenizing the
/// output yields the same token.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(s) => f.write_str(s),
            Token::Superscript => f.write_str("^"),
            Token::Subscript => f.write_str("_"),
            Token::Command(name) => write!(f, "\\{name}"),
            Token::GroupOpen => f.write_str("{"),
            Token::GroupClose => f.write_str("}"),
            Token::Param(ParamIndex::Digit(d)) => write!(f, "#{d}"),
            Token::Param(ParamIndex::Placeholder) => f.write_str("#?"),
            Token::MathShift => f.write_str("$"),
            Token::MathShiftDouble => f.write_str("$$"),
            Token::Space => f.write_str(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kinds_match_variants() {
        assert_eq!(Token::literal("x").kind(), TokenKind::Literal);
        assert_eq!(Token::command("alpha").kind(), TokenKind::Command);
        assert_eq!(Token::Param(ParamIndex::Digit(3)).kind(), TokenKind::Param);
        assert_eq!(Token::MathShiftDouble.kind(), TokenKind::MathShiftDouble);
    }

    #[test]
    fn display_renders_markup() {
        assert_eq!(Token::command("frac").to_string(), "\\frac");
        assert_eq!(Token::Param(ParamIndex::Digit(1)).to_string(), "#1");
        assert_eq!(Token::Param(ParamIndex::Placeholder).to_string(), "#?");
        assert_eq!(Token::MathShiftDouble.to_string(), "$$");
        assert_eq!(Token::literal("😀").to_string(), "😀");
    }

    #[test]
    fn accessors() {
        assert_eq!(Token::literal("a").as_literal(), Some("a"));
        assert_eq!(Token::literal("a").as_command(), None);
        assert_eq!(Token::command("pi").as_command(), Some("pi"));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn literal_close_brace_is_rejected() {
        let _ = Token::literal("}");
    }
}
