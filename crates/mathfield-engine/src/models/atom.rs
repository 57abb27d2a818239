use std::cell::OnceCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

slotmap::new_key_type! {
    /// Stable handle to an atom in an [`AtomTree`](crate::models::AtomTree).
    ///
    /// Ids stay valid until the atom is removed from the tree; a removed id
    /// is never reused for a different atom.
    pub struct AtomId;
}

/// The interpretation context of an atom.
///
/// The set of modes is closed: every mode-dependent behaviour is a `match`
/// on this enum rather than a lookup in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    Math,
    Text,
    Latex,
}

/// Structural kind of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    /// The document root. Owns the top-level `Body` branch.
    Root,
    /// Sentinel seeding every branch. Never deletable, never selected.
    First,
    /// A math symbol, letter, digit or operator
    Literal,
    /// A symbol spelled as a command, such as `\alpha` or `\times`
    Command,
    /// One character of text-mode content
    Text,
    /// One character of raw latex-mode content
    Latex,
    /// `{...}`
    Group,
    /// `\frac{numerator}{denominator}`
    Fraction,
    /// `\sqrt[index]{body}`
    Surd,
    /// A script with no base, as in `^2` at the start of a list
    Subsup,
    /// An empty slot waiting for input
    Placeholder,
    /// Spacing commands (`\,`, `\quad`, ...)
    Space,
    /// Markup the parser could not interpret, kept verbatim
    Error,
}

/// Named child list of an atom.
///
/// The derive order of the variants is the left-to-right traversal order
/// used for caret positions: the index of a root comes before its body and
/// scripts come after everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    /// Index of a `\sqrt[n]{}`
    Index,
    /// Numerator of a fraction
    Numerator,
    /// Denominator of a fraction
    Denominator,
    Body,
    Superscript,
    Subscript,
}

/// A node of the document tree.
///
/// Atoms are created detached with the constructors below and become part of
/// a document through [`AtomTree`](crate::models::AtomTree). The tree owns
/// the child lists and the parent link, so neither is settable here.
#[derive(Debug, Clone)]
pub struct Atom {
    pub kind: AtomKind,
    /// `None` for atoms that have no mode of their own (sentinels, root)
    pub mode: Option<ParseMode>,
    /// The glyph or the command this atom stands for
    pub value: String,
    pub is_suggestion: bool,
    /// Exact source to use when serializing to LaTeX, if known
    pub verbatim_latex: Option<String>,
    /// Lazily computed LaTeX. Cleared on every structural edit below this
    /// atom and recomputed on the next read.
    pub(crate) latex: OnceCell<String>,
    pub(crate) parent: Option<(AtomId, Branch)>,
    pub(crate) branches: BTreeMap<Branch, Vec<AtomId>>,
}

impl Atom {
    pub fn new(kind: AtomKind, mode: Option<ParseMode>, value: impl Into<String>) -> Self {
        Self {
            kind,
            mode,
            value: value.into(),
            is_suggestion: false,
            verbatim_latex: None,
            latex: OnceCell::new(),
            parent: None,
            branches: BTreeMap::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(AtomKind::Root, None, "")
    }

    pub fn first() -> Self {
        Self::new(AtomKind::First, None, "")
    }

    /// A math-mode symbol (`x`, `2`, `+`).
    pub fn literal(value: impl Into<String>) -> Self {
        Self::new(AtomKind::Literal, Some(ParseMode::Math), value)
    }

    /// A symbol command; `name` excludes the backslash.
    pub fn command(name: &str) -> Self {
        let latex = format!("\\{name}");
        let mut atom = Self::new(AtomKind::Command, Some(ParseMode::Math), latex.clone());
        atom.verbatim_latex = Some(latex);
        atom
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(AtomKind::Text, Some(ParseMode::Text), value)
    }

    pub fn raw_latex(value: impl Into<String>) -> Self {
        Self::new(AtomKind::Latex, Some(ParseMode::Latex), value)
    }

    pub fn placeholder() -> Self {
        Self::new(AtomKind::Placeholder, Some(ParseMode::Math), "")
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn suggestion(mut self) -> Self {
        self.is_suggestion = true;
        self
    }

    pub fn is_first(&self) -> bool {
        self.kind == AtomKind::First
    }

    /// The owning atom and the branch this atom sits in.
    pub fn parent(&self) -> Option<(AtomId, Branch)> {
        self.parent
    }

    pub fn has_branch(&self, branch: Branch) -> bool {
        self.branches.contains_key(&branch)
    }

    /// Branches in traversal order.
    pub fn branches(&self) -> impl Iterator<Item = (Branch, &[AtomId])> {
        self.branches.iter().map(|(b, ids)| (*b, ids.as_slice()))
    }

    /// The cached LaTeX, if it has been computed since the last edit.
    pub fn cached_latex(&self) -> Option<&str> {
        self.latex.get().map(String::as_str)
    }
}
