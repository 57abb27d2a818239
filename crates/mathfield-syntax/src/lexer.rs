//! # Lexer - Tokenizing Math Markup
//!
//! This module turns a string of LaTeX-like markup into a flat sequence of
//! [`Token`]s. It runs in two stages:
//!
//! 1. **Comment stripping** ([`strip_comments`]): the input is split into
//!    lines on `\r?\n`, everything from an unescaped `%` to the end of its line
//!    is dropped, and the lines are joined back with a single space.
//! 2. **Scanning**: the joined stream is split into extended grapheme
//!    clusters and scanned one unit at a time. An emoji or a letter with
//!    combining marks is one scan unit and is never split.
//!
//! ## Precedence
//!
//! At each position the first matching rule wins:
//!
//! | input | token |
//! |---|---|
//! | whitespace grapheme | `Space` (one per grapheme) |
//! | `\` + `[A-Za-z*]+` | `Command`, or `GroupOpen`/`GroupClose` for `bgroup`/`egroup` |
//! | `\` + any other grapheme | `Command` named by that grapheme |
//! | `{` / `}` | `GroupOpen` / `GroupClose` |
//! | `#` + `0-9?` + non-alphanumeric or end | `Param` |
//! | `$$` / `$` | `MathShiftDouble` / `MathShift` |
//! | `^` / `_` | `Superscript` / `Subscript` |
//! | anything else | `Literal` of one grapheme |
//!
//! ## Never Fails
//!
//! There is no error path. Ambiguous input degrades to the most literal
//! interpretation (`#1x` is three literals, a bare `#` is a literal) and it is
//! up to the parser to reject token sequences it cannot use.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::token::{ParamIndex, Token};

fn line_break_regex() -> &'static Regex {
    static LINE_BREAK: OnceLock<Regex> = OnceLock::new();
    LINE_BREAK.get_or_init(|| Regex::new(r"\r?\n").expect("Invalid line break regex"))
}

fn uncommented_prefix_regex() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^(?:\\%|[^%])*").expect("Invalid comment regex"))
}

/// Remove `%` comments and join the input lines with single spaces.
///
/// Stripping happens strictly per line, before joining: a comment cannot
/// swallow the space that stands in for its line break.
///
/// ```
/// use mathfield_syntax::strip_comments;
///
/// assert_eq!(strip_comments("x % note\ny"), "x  y");
/// assert_eq!(strip_comments("50\\% off"), "50\\% off");
/// ```
pub fn strip_comments(input: &str) -> String {
    let prefix = uncommented_prefix_regex();
    let mut stream = String::with_capacity(input.len());
    for (i, line) in line_break_regex().split(input).enumerate() {
        if i > 0 {
            stream.push(' ');
        }
        if let Some(m) = prefix.find(line) {
            stream.push_str(m.as_str());
        }
    }
    stream
}

/// Whitespace as understood by the scanner.
///
/// The set is explicit rather than `char::is_whitespace` so that the
/// tokenization of a given string does not depend on the Unicode version.
fn is_whitespace_char(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\u{0C}' | '\r' | '\n' | '\u{0B}' | '\u{A0}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_command_letter(grapheme: &str) -> bool {
    let mut chars = grapheme.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if c.is_ascii_alphabetic() || c == '*'
    )
}

fn is_param_marker(grapheme: &str) -> bool {
    let mut chars = grapheme.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if c.is_ascii_digit() || c == '?'
    )
}

fn is_ascii_alphanumeric(grapheme: &str) -> bool {
    let mut chars = grapheme.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if c.is_ascii_alphanumeric()
    )
}

/// A cursor over the grapheme clusters of the comment-stripped stream.
struct Lexer<'a> {
    graphemes: Vec<&'a str>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(stream: &'a str) -> Self {
        Self {
            graphemes: stream.graphemes(true).collect(),
            pos: 0,
        }
    }

    fn end(&self) -> bool {
        self.pos >= self.graphemes.len()
    }

    /// Look ahead `n` graphemes without advancing.
    fn nth(&self, n: usize) -> Option<&'a str> {
        self.graphemes.get(self.pos + n).copied()
    }

    fn peek(&self) -> Option<&'a str> {
        self.nth(0)
    }

    /// Return the next grapheme and advance.
    fn bump(&mut self) -> Option<&'a str> {
        let g = self.peek()?;
        self.pos += 1;
        Some(g)
    }

    fn is_whitespace(&self) -> bool {
        self.peek()
            .is_some_and(|g| g.chars().any(is_whitespace_char))
    }

    /// Consume a run of command letters and return it joined.
    fn command_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(g) = self.peek() {
            if !is_command_letter(g) {
                break;
            }
            name.push_str(g);
            self.pos += 1;
        }
        name
    }

    /// Scan a single token.
    ///
    /// Returns `None` either at the end of the stream or when the consumed
    /// input produces no token (a trailing lone backslash).
    fn next_token(&mut self) -> Option<Token> {
        let current = self.peek()?;

        // In text mode spaces are significant, so runs are not coalesced.
        if self.is_whitespace() {
            self.bump();
            return Some(Token::Space);
        }

        match current {
            "\\" => {
                self.bump();
                if self.end() {
                    return None;
                }
                let name = self.command_name();
                match name.as_str() {
                    "bgroup" => Some(Token::GroupOpen),
                    "egroup" => Some(Token::GroupClose),
                    "" => self.bump().map(Token::command),
                    _ => Some(Token::Command(name)),
                }
            }
            "{" => {
                self.bump();
                Some(Token::GroupOpen)
            }
            "}" => {
                self.bump();
                Some(Token::GroupClose)
            }
            "#" => {
                self.bump();
                Some(self.param_or_hash())
            }
            "$" => {
                self.bump();
                if self.peek() == Some("$") {
                    self.bump();
                    Some(Token::MathShiftDouble)
                } else {
                    Some(Token::MathShift)
                }
            }
            "^" => {
                self.bump();
                Some(Token::Superscript)
            }
            "_" => {
                self.bump();
                Some(Token::Subscript)
            }
            _ => self.bump().map(Token::literal),
        }
    }

    /// Disambiguate what follows a `#` that has already been consumed.
    ///
    /// A parameter is `#` followed by a digit or `?`, itself followed by
    /// something that is not alphanumeric (or by the end of the stream).
    /// `#1x` is therefore a literal `#` and `#1+` is parameter 1 then `+`.
    fn param_or_hash(&mut self) -> Token {
        let Some(marker) = self.peek() else {
            return Token::literal("#");
        };
        if !is_param_marker(marker) {
            return Token::literal("#");
        }
        if self.nth(1).is_some_and(is_ascii_alphanumeric) {
            return Token::literal("#");
        }
        self.bump();
        match marker.parse::<u8>() {
            Ok(digit) => Token::Param(ParamIndex::Digit(digit)),
            Err(_) => Token::Param(ParamIndex::Placeholder),
        }
    }
}

/// Tokenize math markup.
///
/// The input may span several lines and contain `%` comments.
///
/// ```
/// use mathfield_syntax::{tokenize, Token};
///
/// let tokens = tokenize("\\frac{1}{2}");
/// assert_eq!(tokens[0], Token::command("frac"));
/// assert_eq!(tokens.len(), 7);
/// ```
pub fn tokenize(input: &str) -> Vec<Token> {
    tokenize_with_spans(input)
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

/// Tokenize and return each token with the range of graphemes it consumed.
///
/// Ranges index into the graphemes of the comment-stripped stream (see
/// [`strip_comments`]), not into the original input.
pub fn tokenize_with_spans(input: &str) -> Vec<(Token, Range<usize>)> {
    let stream = strip_comments(input);
    let mut lexer = Lexer::new(&stream);
    let mut tokens = Vec::new();

    while !lexer.end() {
        let start = lexer.pos;
        if let Some(token) = lexer.next_token() {
            tokens.push((token, start..lexer.pos));
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn lit(s: &str) -> Token {
        Token::literal(s)
    }

    fn cmd(s: &str) -> Token {
        Token::command(s)
    }

    #[test]
    fn tokenize_empty_input() {
        assert_eq!(tokenize(""), vec![]);
    }

    #[test]
    fn tokenize_scripts_in_order() {
        assert_eq!(
            tokenize("x^2_n"),
            vec![
                lit("x"),
                Token::Superscript,
                lit("2"),
                Token::Subscript,
                lit("n"),
            ]
        );
    }

    #[test]
    fn tokenize_command_and_groups() {
        assert_eq!(
            tokenize("\\frac{a}{b}"),
            vec![
                cmd("frac"),
                Token::GroupOpen,
                lit("a"),
                Token::GroupClose,
                Token::GroupOpen,
                lit("b"),
                Token::GroupClose,
            ]
        );
    }

    #[test]
    fn command_name_is_greedy_over_letters_and_stars() {
        assert_eq!(tokenize("\\operatorname*x"), vec![cmd("operatorname*x")]);
        assert_eq!(tokenize("\\alpha2"), vec![cmd("alpha"), lit("2")]);
    }

    #[test]
    fn command_falls_back_to_single_grapheme() {
        assert_eq!(tokenize("\\{"), vec![cmd("{")]);
        assert_eq!(tokenize("\\,x"), vec![cmd(","), lit("x")]);
        assert_eq!(tokenize("\\😀"), vec![cmd("😀")]);
    }

    #[test]
    fn bgroup_and_egroup_are_structural() {
        assert_eq!(
            tokenize("\\bgroup x\\egroup"),
            vec![Token::GroupOpen, Token::Space, lit("x"), Token::GroupClose]
        );
    }

    #[test]
    fn trailing_backslash_produces_nothing() {
        assert_eq!(tokenize("x\\"), vec![lit("x")]);
    }

    #[test]
    fn escaped_percent_survives_comment_stripping() {
        assert_eq!(tokenize("a\\%b"), vec![lit("a"), cmd("%"), lit("b")]);
    }

    #[test]
    fn comment_runs_to_end_of_line_only() {
        assert_eq!(
            tokenize("a%comment\nb"),
            vec![lit("a"), Token::Space, lit("b")]
        );
    }

    #[test]
    fn crlf_line_breaks_become_one_space() {
        assert_eq!(
            tokenize("a\r\nb"),
            vec![lit("a"), Token::Space, lit("b")]
        );
    }

    #[test]
    fn whitespace_is_not_coalesced() {
        assert_eq!(
            tokenize("a \t\u{A0}b"),
            vec![lit("a"), Token::Space, Token::Space, Token::Space, lit("b")]
        );
    }

    #[rstest]
    #[case("#1", vec![Token::Param(ParamIndex::Digit(1))])]
    #[case("#?", vec![Token::Param(ParamIndex::Placeholder)])]
    #[case("#1+", vec![Token::Param(ParamIndex::Digit(1)), lit("+")])]
    #[case("#9}", vec![Token::Param(ParamIndex::Digit(9)), Token::GroupClose])]
    #[case("#1x", vec![lit("#"), lit("1"), lit("x")])]
    #[case("#12", vec![lit("#"), lit("1"), lit("2")])]
    #[case("#a", vec![lit("#"), lit("a")])]
    #[case("#", vec![lit("#")])]
    fn hash_disambiguation(#[case] input: &str, #[case] expected: Vec<Token>) {
        assert_eq!(tokenize(input), expected);
    }

    #[rstest]
    #[case("$", vec![Token::MathShift])]
    #[case("$$", vec![Token::MathShiftDouble])]
    #[case("$$$", vec![Token::MathShiftDouble, Token::MathShift])]
    #[case("$x$", vec![Token::MathShift, lit("x"), Token::MathShift])]
    fn math_shift(#[case] input: &str, #[case] expected: Vec<Token>) {
        assert_eq!(tokenize(input), expected);
    }

    #[test]
    fn emoji_is_one_literal() {
        assert_eq!(tokenize("😀"), vec![lit("😀")]);
        // Family emoji: several code points joined with ZWJ
        let family = "👨\u{200D}👩\u{200D}👧";
        assert_eq!(tokenize(family), vec![lit(family)]);
    }

    #[test]
    fn combining_marks_stay_with_their_base() {
        assert_eq!(tokenize("e\u{301}x"), vec![lit("e\u{301}"), lit("x")]);
    }

    #[test]
    fn close_brace_is_never_a_literal() {
        for token in tokenize("}}\\}{}") {
            assert_ne!(token, Token::Literal("}".into()));
        }
    }

    #[test]
    fn spans_cover_the_stripped_stream() {
        let inputs = [
            "x^2_n",
            "\\frac{\\alpha}{#1}",
            "a % comment\n  b",
            "😀 \\bgroup e\u{301} \\egroup $$",
            "#1x#?",
        ];
        for input in inputs {
            let stream = strip_comments(input);
            let total = stream.graphemes(true).count();
            let spans = tokenize_with_spans(input);
            let consumed: usize = spans.iter().map(|(_, span)| span.len()).sum();
            assert_eq!(consumed, total, "grapheme count mismatch for {input:?}");

            let mut expected_start = 0;
            for (_, span) in &spans {
                assert_eq!(span.start, expected_start, "gap in spans for {input:?}");
                expected_start = span.end;
            }
        }
    }

    #[test]
    fn strip_comments_keeps_escaped_percent() {
        assert_eq!(strip_comments("a\\%b%c"), "a\\%b");
        assert_eq!(strip_comments("%all\n%gone"), " ");
        assert_eq!(strip_comments("one\ntwo\r\nthree"), "one two three");
    }

    #[test]
    fn kinds_of_a_mixed_stream() {
        let kinds: Vec<TokenKind> = tokenize("$\\pi r^2$").iter().map(Token::kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::MathShift,
                TokenKind::Command,
                TokenKind::Space,
                TokenKind::Literal,
                TokenKind::Superscript,
                TokenKind::Literal,
                TokenKind::MathShift,
            ]
        );
    }
}
