use mathfield_syntax::{ParamIndex, Token, TokenKind, tokenize};
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Atom, AtomId, AtomKind, AtomTree, Branch, ParseMode};

use super::{
    cursor::TokenCursor,
    error::{ParseError, ParseErrorCode},
    symbols::{is_escaped_symbol, spacing_width, symbol},
};

/// Parses math markup and appends the resulting atoms to `parent`'s
/// `branch`.
///
/// # Tolerance
/// Parsing never fails. Each problem is recorded as a [`ParseError`] and the
/// offending tokens are kept in the most literal form possible: an unknown
/// command becomes an [`AtomKind::Error`] atom, a missing argument becomes a
/// placeholder, a stray `}` is dropped.
///
/// # Nesting
/// No list is parsed more than [`MAX_NESTING_DEPTH`] levels below the root.
/// A group that would go past it is kept whole, as a single
/// [`AtomKind::Error`] atom holding its markup.
///
/// # Returns
/// The errors met along the way, in source order.
pub fn parse_math(tree: &mut AtomTree, parent: AtomId, branch: Branch, markup: &str) -> Vec<ParseError> {
    let depth = tree.depth(parent);
    parse_math_at_depth(tree, parent, branch, markup, depth)
}

/// Like [`parse_math`], for a `parent` that is not attached yet and will end
/// up `depth` levels below the root.
pub fn parse_math_at_depth(
    tree: &mut AtomTree,
    parent: AtomId,
    branch: Branch,
    markup: &str,
    depth: usize,
) -> Vec<ParseError> {
    let mut parser = Parser {
        cur: TokenCursor::new(tokenize(markup)),
        tree,
        errors: vec![],
        depth,
    };
    parser.tree.add_branch(parent, branch);
    parser.parse_list(parent, branch, false);

    for error in &parser.errors {
        log::debug!("parse error: {error}");
    }
    parser.errors
}

/// Deepest level, counted from the root, that a list is parsed at.
pub const MAX_NESTING_DEPTH: usize = 128;

struct Parser<'t> {
    cur: TokenCursor,
    tree: &'t mut AtomTree,
    errors: Vec<ParseError>,
    /// Level of the list currently being parsed into
    depth: usize,
}

impl Parser<'_> {
    fn error(&mut self, code: ParseErrorCode) {
        self.errors.push(ParseError::new(code, self.cur.context()));
    }

    fn append(&mut self, parent: AtomId, branch: Branch, atom: Atom) -> AtomId {
        self.tree.append_child(parent, branch, atom)
    }

    /// Run `f` one nesting level down. Returns `false`, without running
    /// it, if that level is past [`MAX_NESTING_DEPTH`].
    fn descend(&mut self, f: impl FnOnce(&mut Self)) -> bool {
        if self.depth >= MAX_NESTING_DEPTH {
            return false;
        }
        self.depth += 1;
        f(self);
        self.depth -= 1;
        true
    }

    /// Parse tokens into `branch` until the end of input, or until the
    /// closing brace of the current group when `in_group` is set.
    fn parse_list(&mut self, parent: AtomId, branch: Branch, in_group: bool) {
        if !self.descend(|p| p.parse_items(parent, branch, in_group)) {
            self.error(ParseErrorCode::NestingTooDeep);
            self.keep_too_deep(parent, branch, in_group);
        }
    }

    fn parse_items(&mut self, parent: AtomId, branch: Branch, in_group: bool) {
        loop {
            match self.cur.peek_kind() {
                None => {
                    if in_group {
                        self.error(ParseErrorCode::UnbalancedBraces);
                    }
                    return;
                }
                Some(TokenKind::GroupClose) => {
                    if in_group {
                        self.cur.bump();
                        return;
                    }
                    self.error(ParseErrorCode::UnbalancedBraces);
                    self.cur.bump();
                }
                Some(TokenKind::Space) => {
                    self.cur.bump();
                }
                Some(_) => self.parse_item(parent, branch),
            }
        }
    }

    /// Parse one syntactic item: a token together with any arguments it
    /// consumes. The cursor must not be at a `}` or at the end.
    fn parse_item(&mut self, parent: AtomId, branch: Branch) {
        let Some(token) = self.cur.bump() else {
            return;
        };
        match token {
            Token::Literal(glyph) => {
                self.append(parent, branch, Atom::literal(glyph));
            }
            Token::GroupOpen => {
                let group = self.append(parent, branch, Atom::new(AtomKind::Group, Some(ParseMode::Math), ""));
                self.tree.add_branch(group, Branch::Body);
                self.parse_list(group, Branch::Body, true);
            }
            Token::GroupClose => {
                self.error(ParseErrorCode::UnbalancedBraces);
            }
            Token::Superscript => self.parse_script(parent, branch, Branch::Superscript),
            Token::Subscript => self.parse_script(parent, branch, Branch::Subscript),
            Token::Command(name) => self.parse_command(parent, branch, &name),
            Token::Param(ParamIndex::Placeholder) => {
                self.append(parent, branch, Atom::placeholder());
            }
            Token::Param(index @ ParamIndex::Digit(_)) => {
                self.error(ParseErrorCode::UnexpectedParameter);
                let source = Token::Param(index).to_string();
                self.append(parent, branch, Atom::new(AtomKind::Error, Some(ParseMode::Math), source));
            }
            Token::MathShift | Token::MathShiftDouble => {
                self.error(ParseErrorCode::UnexpectedModeShift);
            }
            Token::Space => {}
        }
    }

    /// Attach a script to the last atom of the list, or to a new empty-base
    /// atom if there is nothing to attach to (or the slot is already used).
    fn parse_script(&mut self, parent: AtomId, branch: Branch, script: Branch) {
        let last = self
            .tree
            .children(parent, branch)
            .last()
            .copied()
            .filter(|&id| self.tree.kind(id) != Some(AtomKind::First));

        let target = match last {
            Some(id) if !self.tree.get(id).is_some_and(|a| a.has_branch(script)) => id,
            _ => self.append(parent, branch, Atom::new(AtomKind::Subsup, Some(ParseMode::Math), "")),
        };
        self.parse_argument(target, script);
    }

    /// Parse a mandatory argument: a `{...}` group or a single item.
    fn parse_argument(&mut self, parent: AtomId, branch: Branch) {
        self.tree.add_branch(parent, branch);
        self.cur.skip_spaces();
        match self.cur.peek_kind() {
            Some(TokenKind::GroupOpen) => {
                self.cur.bump();
                self.parse_list(parent, branch, true);
            }
            None | Some(TokenKind::GroupClose | TokenKind::Superscript | TokenKind::Subscript) => {
                self.error(ParseErrorCode::MissingArgument);
                self.append(parent, branch, Atom::placeholder());
            }
            Some(_) => {
                if !self.descend(|p| p.parse_item(parent, branch)) {
                    self.error(ParseErrorCode::NestingTooDeep);
                }
            }
        }
    }

    /// Keep the rest of a list that is nested too deeply as one error atom
    /// holding its markup: up to the closing brace when `in_group` is set,
    /// otherwise through the end of input. The braces themselves belong to
    /// the enclosing atom.
    fn keep_too_deep(&mut self, parent: AtomId, branch: Branch, in_group: bool) {
        let mut source = String::new();
        let mut depth = 0usize;
        let mut after_word_command = false;
        let mut closed = !in_group;
        while let Some(token) = self.cur.bump() {
            match token {
                Token::GroupOpen => depth += 1,
                Token::GroupClose if in_group && depth == 0 => {
                    closed = true;
                    break;
                }
                Token::GroupClose => depth = depth.saturating_sub(1),
                _ => {}
            }
            // `\alpha x` must not turn into `\alphax`
            let text = token.to_string();
            if after_word_command && text.starts_with(|c: char| c.is_ascii_alphabetic()) {
                source.push(' ');
            }
            after_word_command =
                matches!(&token, Token::Command(name) if name.ends_with(|c: char| c.is_ascii_alphabetic()));
            source.push_str(&text);
        }
        if !closed {
            self.error(ParseErrorCode::UnbalancedBraces);
        }
        if !source.is_empty() {
            self.append(parent, branch, Atom::new(AtomKind::Error, Some(ParseMode::Math), source));
        }
    }

    /// Parse `[...]` into `branch` if the cursor is at a `[`.
    fn parse_optional_argument(&mut self, parent: AtomId, branch: Branch) {
        self.tree.add_branch(parent, branch);
        self.cur.skip_spaces();
        if !self.cur.at_literal("[") {
            return;
        }
        self.cur.bump();
        loop {
            if self.cur.at_literal("]") {
                self.cur.bump();
                return;
            }
            match self.cur.peek_kind() {
                None | Some(TokenKind::GroupClose) => {
                    self.error(ParseErrorCode::UnbalancedBraces);
                    return;
                }
                Some(TokenKind::Space) => {
                    self.cur.bump();
                }
                Some(_) => {
                    if !self.descend(|p| p.parse_item(parent, branch)) {
                        self.error(ParseErrorCode::NestingTooDeep);
                        return;
                    }
                }
            }
        }
    }

    fn parse_command(&mut self, parent: AtomId, branch: Branch, name: &str) {
        match name {
            "frac" | "dfrac" | "tfrac" | "cfrac" => {
                let frac = self.append(
                    parent,
                    branch,
                    Atom::new(AtomKind::Fraction, Some(ParseMode::Math), format!("\\{name}")),
                );
                self.parse_argument(frac, Branch::Numerator);
                self.parse_argument(frac, Branch::Denominator);
            }
            "sqrt" => {
                let surd = self.append(parent, branch, Atom::new(AtomKind::Surd, Some(ParseMode::Math), "\\sqrt"));
                self.parse_optional_argument(surd, Branch::Index);
                self.parse_argument(surd, Branch::Body);
            }
            "text" | "textrm" | "textnormal" | "textit" | "textbf" | "mbox" => {
                self.parse_text_argument(parent, branch);
            }
            "placeholder" => {
                self.skip_group();
                self.append(parent, branch, Atom::placeholder());
            }
            "left" | "right" => self.parse_delimiter(parent, branch, name),
            _ if spacing_width(name).is_some() => {
                self.append(
                    parent,
                    branch,
                    Atom::new(AtomKind::Space, Some(ParseMode::Math), format!("\\{name}")),
                );
            }
            _ if is_escaped_symbol(name) => {
                self.append(parent, branch, Atom::literal(name));
            }
            _ if symbol(name).is_some() => {
                self.append(parent, branch, Atom::command(name));
            }
            _ => {
                self.error(ParseErrorCode::UnknownCommand);
                self.append(
                    parent,
                    branch,
                    Atom::new(AtomKind::Error, Some(ParseMode::Math), format!("\\{name}")),
                );
            }
        }
    }

    /// `\left(` and `\right)` become literal fences that remember their
    /// source spelling.
    fn parse_delimiter(&mut self, parent: AtomId, branch: Branch, side: &str) {
        self.cur.skip_spaces();
        let (glyph, source) = match self.cur.peek() {
            Some(Token::Literal(glyph)) => (glyph.clone(), glyph.clone()),
            Some(Token::Command(name)) if is_escaped_symbol(name) => (name.clone(), format!("\\{name}")),
            Some(Token::Command(name)) => match symbol(name) {
                Some(sym) => (sym.glyph.to_string(), format!("\\{name}")),
                None => {
                    self.error(ParseErrorCode::MissingArgument);
                    return;
                }
            },
            _ => {
                self.error(ParseErrorCode::MissingArgument);
                return;
            }
        };
        self.cur.bump();
        // `.` is the invisible delimiter
        let glyph = if glyph == "." { String::new() } else { glyph };
        let mut atom = Atom::literal(glyph);
        atom.verbatim_latex = Some(format!("\\{side}{source}"));
        self.append(parent, branch, atom);
    }

    /// Parse the argument of `\text{...}` into text-mode atoms, one per
    /// grapheme, appended directly to the current list.
    fn parse_text_argument(&mut self, parent: AtomId, branch: Branch) {
        self.cur.skip_spaces();
        if self.cur.peek_kind() != Some(TokenKind::GroupOpen) {
            match self.cur.bump() {
                Some(token) if token.kind() != TokenKind::GroupClose => {
                    self.append_text_token(parent, branch, &token);
                }
                _ => self.error(ParseErrorCode::MissingArgument),
            }
            return;
        }
        self.cur.bump();

        let mut depth = 0usize;
        loop {
            let Some(token) = self.cur.bump() else {
                self.error(ParseErrorCode::UnbalancedBraces);
                return;
            };
            match token {
                Token::GroupOpen => depth += 1,
                Token::GroupClose if depth == 0 => return,
                Token::GroupClose => depth -= 1,
                token => self.append_text_token(parent, branch, &token),
            }
        }
    }

    fn append_text_token(&mut self, parent: AtomId, branch: Branch, token: &Token) {
        let text = match token {
            Token::Space => " ".to_string(),
            Token::Command(name) if name == "textbackslash" => "\\".to_string(),
            Token::Command(name) if is_escaped_symbol(name) => name.clone(),
            Token::Command(name) if name == " " || name == "," => " ".to_string(),
            other => other.to_string(),
        };
        for grapheme in text.graphemes(true) {
            self.append(parent, branch, Atom::text(grapheme));
        }
    }

    /// Consume a `{...}` group without building atoms, if one follows.
    fn skip_group(&mut self) {
        self.cur.skip_spaces();
        if self.cur.peek_kind() != Some(TokenKind::GroupOpen) {
            return;
        }
        self.cur.bump();
        let mut depth = 0usize;
        while let Some(token) = self.cur.bump() {
            match token.kind() {
                TokenKind::GroupOpen => depth += 1,
                TokenKind::GroupClose if depth == 0 => return,
                TokenKind::GroupClose => depth -= 1,
                _ => {}
            }
        }
        self.error(ParseErrorCode::UnbalancedBraces);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(markup: &str) -> (AtomTree, Vec<ParseError>) {
        let mut tree = AtomTree::new();
        let root = tree.root();
        let errors = parse_math(&mut tree, root, Branch::Body, markup);
        (tree, errors)
    }

    fn kinds(tree: &AtomTree, ids: &[AtomId]) -> Vec<AtomKind> {
        ids.iter().filter_map(|&id| tree.kind(id)).collect()
    }

    fn codes(errors: &[ParseError]) -> Vec<ParseErrorCode> {
        errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn parse_literals_skips_math_spaces() {
        let (tree, errors) = parse("a + b");
        assert!(errors.is_empty());
        let body = tree.children(tree.root(), Branch::Body);
        assert_eq!(
            kinds(&tree, body),
            vec![AtomKind::First, AtomKind::Literal, AtomKind::Literal, AtomKind::Literal]
        );
        assert_eq!(tree.latex(tree.root()), "a+b");
    }

    #[test]
    fn parse_fraction() {
        let (tree, errors) = parse("\\frac{1}{x+1}");
        assert!(errors.is_empty());
        let body = tree.children(tree.root(), Branch::Body);
        let frac = body[1];
        assert_eq!(tree.kind(frac), Some(AtomKind::Fraction));
        assert_eq!(tree.children(frac, Branch::Numerator).len(), 2);
        assert_eq!(tree.children(frac, Branch::Denominator).len(), 4);
        assert_eq!(tree.latex(tree.root()), "\\frac{1}{x+1}");
    }

    #[test]
    fn parse_fraction_with_bare_arguments() {
        let (tree, errors) = parse("\\frac12");
        assert!(errors.is_empty());
        assert_eq!(tree.latex(tree.root()), "\\frac{1}{2}");
    }

    #[test]
    fn parse_sqrt_with_index() {
        let (tree, errors) = parse("\\sqrt[3]{x}");
        assert!(errors.is_empty());
        assert_eq!(tree.latex(tree.root()), "\\sqrt[3]{x}");
    }

    #[test]
    fn parse_scripts_attach_to_previous_atom() {
        let (tree, errors) = parse("x^2_n");
        assert!(errors.is_empty());
        let body = tree.children(tree.root(), Branch::Body);
        assert_eq!(body.len(), 2);
        let x = body[1];
        assert!(tree.get(x).unwrap().has_branch(Branch::Superscript));
        assert!(tree.get(x).unwrap().has_branch(Branch::Subscript));
        assert_eq!(tree.latex(tree.root()), "x^2_n");
    }

    #[test]
    fn leading_script_creates_subsup() {
        let (tree, _) = parse("^2");
        let body = tree.children(tree.root(), Branch::Body);
        assert_eq!(tree.kind(body[1]), Some(AtomKind::Subsup));
        assert_eq!(tree.latex(tree.root()), "^2");
    }

    #[test]
    fn symbol_commands_keep_verbatim_source() {
        let (tree, errors) = parse("2\\pi r");
        assert!(errors.is_empty());
        let body = tree.children(tree.root(), Branch::Body);
        let pi = tree.get(body[2]).unwrap();
        assert_eq!(pi.kind, AtomKind::Command);
        assert_eq!(pi.verbatim_latex.as_deref(), Some("\\pi"));
        assert_eq!(tree.latex(tree.root()), "2\\pi r");
    }

    #[test]
    fn text_argument_becomes_text_atoms() {
        let (tree, errors) = parse("x\\text{ if }y");
        assert!(errors.is_empty());
        let body = tree.children(tree.root(), Branch::Body);
        let text: String = body
            .iter()
            .filter_map(|&id| tree.get(id))
            .filter(|a| a.kind == AtomKind::Text)
            .map(|a| a.value.as_str())
            .collect();
        assert_eq!(text, " if ");
        assert_eq!(tree.latex(tree.root()), "x\\text{ if }y");
    }

    #[test]
    fn left_right_delimiters() {
        let (tree, errors) = parse("\\left(x\\right)");
        assert!(errors.is_empty());
        assert_eq!(tree.latex(tree.root()), "\\left(x\\right)");
        assert_eq!(tree.latex_expanded(tree.root()), "(x)");
    }

    #[test]
    fn spacing_and_escapes() {
        let (tree, errors) = parse("a\\,\\%");
        assert!(errors.is_empty());
        let body = tree.children(tree.root(), Branch::Body);
        assert_eq!(
            kinds(&tree, body),
            vec![AtomKind::First, AtomKind::Literal, AtomKind::Space, AtomKind::Literal]
        );
        assert_eq!(tree.latex(tree.root()), "a\\,\\%");
    }

    #[test]
    fn unknown_command_is_kept() {
        let (tree, errors) = parse("\\foo x");
        assert_eq!(codes(&errors), vec![ParseErrorCode::UnknownCommand]);
        assert_eq!(errors[0].context, "\\foo x");
        assert_eq!(tree.latex(tree.root()), "\\foo x");
    }

    #[test]
    fn missing_argument_becomes_placeholder() {
        let (tree, errors) = parse("\\frac{1}");
        assert_eq!(codes(&errors), vec![ParseErrorCode::MissingArgument]);
        assert_eq!(tree.latex(tree.root()), "\\frac{1}{\\placeholder{}}");
    }

    #[test]
    fn unbalanced_braces() {
        let (tree, errors) = parse("{x");
        assert_eq!(codes(&errors), vec![ParseErrorCode::UnbalancedBraces]);
        assert_eq!(tree.latex(tree.root()), "{x}");

        let (tree, errors) = parse("x}");
        assert_eq!(codes(&errors), vec![ParseErrorCode::UnbalancedBraces]);
        assert_eq!(tree.latex(tree.root()), "x");
    }

    #[test]
    fn parameters_and_mode_shifts() {
        let (tree, errors) = parse("$#1+#?$");
        assert_eq!(
            codes(&errors),
            vec![
                ParseErrorCode::UnexpectedModeShift,
                ParseErrorCode::UnexpectedParameter,
                ParseErrorCode::UnexpectedModeShift,
            ]
        );
        assert_eq!(tree.latex(tree.root()), "#1+\\placeholder{}");
    }

    #[test]
    fn placeholder_command() {
        let (tree, errors) = parse("\\placeholder{}");
        assert!(errors.is_empty());
        let body = tree.children(tree.root(), Branch::Body);
        assert_eq!(tree.kind(body[1]), Some(AtomKind::Placeholder));
    }

    fn nested_groups(levels: usize, inner: &str) -> String {
        format!("{}{inner}{}", "{".repeat(levels), "}".repeat(levels))
    }

    #[test]
    fn deep_groups_are_kept_as_markup() {
        let markup = nested_groups(5000, "x");
        let (tree, errors) = parse(&markup);
        assert_eq!(codes(&errors), vec![ParseErrorCode::NestingTooDeep]);
        assert_eq!(tree.latex(tree.root()), markup);

        let deepest = tree
            .descendants(tree.root())
            .into_iter()
            .map(|id| tree.depth(id))
            .max();
        assert_eq!(deepest, Some(MAX_NESTING_DEPTH + 1));
    }

    #[test]
    fn groups_at_the_limit_parse_normally() {
        let markup = nested_groups(MAX_NESTING_DEPTH - 1, "x");
        let (tree, errors) = parse(&markup);
        assert!(errors.is_empty());
        assert_eq!(tree.latex(tree.root()), markup);
    }

    #[test]
    fn deep_argument_chains_stop_at_the_limit() {
        let markup = format!("{}x", "\\sqrt".repeat(1000));
        let (tree, errors) = parse(&markup);
        assert!(codes(&errors).contains(&ParseErrorCode::NestingTooDeep));
        let deepest = tree
            .descendants(tree.root())
            .into_iter()
            .map(|id| tree.depth(id))
            .max()
            .unwrap_or(0);
        assert!(deepest <= MAX_NESTING_DEPTH + 1, "depth {deepest}");
    }

    #[test]
    fn depth_limit_counts_from_the_insertion_point() {
        let mut tree = AtomTree::new();
        let container = tree.create(Atom::new(AtomKind::Group, Some(ParseMode::Math), ""));
        let errors = parse_math_at_depth(&mut tree, container, Branch::Body, "{y}", MAX_NESTING_DEPTH - 1);
        assert_eq!(codes(&errors), vec![ParseErrorCode::NestingTooDeep]);
        let body = tree.children(container, Branch::Body);
        assert_eq!(tree.kind(body[1]), Some(AtomKind::Group));
    }
}
