//! # Markup Parsing
//!
//! Builds atoms from the token stream produced by `mathfield-syntax`.
//!
//! ## Architecture
//!
//! The parser is a recursive-descent walk over a [`cursor::TokenCursor`].
//! It appends atoms straight into an [`AtomTree`](crate::models::AtomTree)
//! branch, so callers decide where parsed content lands: the root body for a
//! whole document, or a detached container when inserting at the caret.
//!
//! ## Modules
//!
//! - **`cursor`**: `TokenCursor` with one-token lookahead and error context
//! - **`symbols`**: table of symbol commands, their glyphs and classes
//! - **`error`**: `ParseError` / `ParseErrorCode`
//! - **`parser`**: `parse_math()` entry point, with a nesting depth limit
//!
//! ## Recognized Commands
//!
//! | markup | atom |
//! |---|---|
//! | `\frac{a}{b}`, `\dfrac`, `\tfrac`, `\cfrac` | `Fraction` |
//! | `\sqrt[n]{x}` | `Surd` |
//! | `\text{...}`, `\mbox{...}` | one `Text` atom per grapheme |
//! | `\left(` / `\right)` | `Literal` with verbatim source |
//! | `\,` `\;` `\quad` ... | `Space` |
//! | `\%` `\{` ... | escaped `Literal` |
//! | `\alpha` `\times` ... | `Command` |
//! | `#?`, `\placeholder{}` | `Placeholder` |
//! | anything else | `Error` plus an `UnknownCommand` error |

pub mod cursor;
pub mod error;
pub mod parser;
pub mod symbols;

pub use error::{ParseError, ParseErrorCode};
pub use parser::{MAX_NESTING_DEPTH, parse_math, parse_math_at_depth};
