//! # mathfield-syntax
//!
//! The tokenizer for the LaTeX-like markup accepted by the math editor.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → strip_comments → Grapheme Scanner → Vec<Token>
//!               (per line)       (unicode-segmentation)
//! ```
//!
//! This crate has no knowledge of the document model. The engine crate owns
//! the parser that turns tokens into atoms; this crate only guarantees that
//! any input string produces a well-formed token stream.
//!
//! ## Module Structure
//!
//! ```text
//! mathfield-syntax/
//! ├── lib.rs     # This file - public API and integration tests
//! ├── token.rs   # Token / TokenKind / ParamIndex
//! └── lexer.rs   # Comment stripping and the grapheme scanner
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use mathfield_syntax::{tokenize, Token};
//!
//! let tokens = tokenize("x^2 % squared");
//! assert_eq!(
//!     tokens,
//!     vec![
//!         Token::literal("x"),
//!         Token::Superscript,
//!         Token::literal("2"),
//!         Token::Space,
//!     ]
//! );
//! ```

pub mod lexer;
pub mod token;

pub use lexer::{strip_comments, tokenize, tokenize_with_spans};
pub use token::{ParamIndex, Token, TokenKind};
