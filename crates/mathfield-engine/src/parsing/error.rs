use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// What went wrong while building atoms from markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseErrorCode {
    /// A `\command` with no known meaning. It is kept in the tree verbatim.
    UnknownCommand,
    /// A `}` with no matching `{`, or a group left open at the end.
    UnbalancedBraces,
    /// A command or script that needed an argument did not get one.
    MissingArgument,
    /// `#0`..`#9` outside of a macro definition.
    UnexpectedParameter,
    /// A `$` or `$$` inside math content.
    UnexpectedModeShift,
    /// Groups or arguments nested past the parser's depth limit.
    NestingTooDeep,
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseErrorCode::UnknownCommand => "unknown-command",
            ParseErrorCode::UnbalancedBraces => "unbalanced-braces",
            ParseErrorCode::MissingArgument => "missing-argument",
            ParseErrorCode::UnexpectedParameter => "unexpected-parameter",
            ParseErrorCode::UnexpectedModeShift => "unexpected-mode-shift",
            ParseErrorCode::NestingTooDeep => "nesting-too-deep",
        })
    }
}

/// A recoverable problem found while parsing markup.
///
/// The parser never stops at an error: it records one of these and carries
/// on with the most literal interpretation of the offending tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code} near `{context}`")]
pub struct ParseError {
    pub code: ParseErrorCode,
    /// Markup surrounding the offending token.
    pub context: String,
}

impl ParseError {
    pub fn new(code: ParseErrorCode, context: impl Into<String>) -> Self {
        Self {
            code,
            context: context.into(),
        }
    }
}
