//! # Export
//!
//! Serializes ranges of a [`Model`] for the clipboard and for
//! [`Model::get_value`].
//!
//! A copy produces one [`ClipboardData`] holding every format the content
//! supports. Each format is computed from the tree independently:
//!
//! | MIME type | content |
//! |---|---|
//! | `text/plain` | LaTeX wrapped in a mode shift, or the raw text |
//! | `application/x-latex` | LaTeX |
//! | `application/json` | MathJSON |
//! | `application/mathml+xml` | presentation MathML |

pub mod math_json;
pub mod math_ml;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editing::{Model, Range};
use crate::models::{AtomId, AtomKind, AtomTree, ParseMode};

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_LATEX: &str = "application/x-latex";
pub const MIME_JSON: &str = "application/json";
pub const MIME_MATHML: &str = "application/mathml+xml";

/// Delimiter pairs that switch a LaTeX document into math mode.
pub const MODE_SHIFT_COMMANDS: &[(&str, &str)] = &[
    ("\\[", "\\]"),
    ("\\(", "\\)"),
    ("$$", "$$"),
    ("$", "$"),
    ("\\begin{math}", "\\end{math}"),
    ("\\begin{displaymath}", "\\end{displaymath}"),
    ("\\begin{equation}", "\\end{equation}"),
    ("\\begin{equation*}", "\\end{equation*}"),
];

/// Find the mode-shift pair wrapping `text`, if any.
fn mode_shift_pair(text: &str) -> Option<(&'static str, &'static str)> {
    MODE_SHIFT_COMMANDS.iter().copied().find(|(open, close)| {
        text.len() >= open.len() + close.len() && text.starts_with(open) && text.ends_with(close)
    })
}

/// True if `text` starts with the opening half of a mode-shift pair and ends
/// with its closing half. Surrounding whitespace counts.
pub fn is_mode_shift_wrapped(text: &str) -> bool {
    MODE_SHIFT_COMMANDS
        .iter()
        .any(|(open, close)| text.starts_with(open) && text.ends_with(close))
}

/// The content between a surrounding mode-shift pair, trimmed.
///
/// ```rust
/// # use mathfield_engine::export::strip_mode_shift;
/// assert_eq!(strip_mode_shift("\\[ x^2 \\]"), Some("x^2"));
/// assert_eq!(strip_mode_shift("x^2"), None);
/// ```
pub fn strip_mode_shift(text: &str) -> Option<&str> {
    let text = text.trim();
    let (open, close) = mode_shift_pair(text)?;
    Some(text[open.len()..text.len() - close.len()].trim())
}

/// Clipboard content keyed by MIME type, in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipboardData(BTreeMap<String, String>);

impl ClipboardData {
    pub fn get(&self, mime: &str) -> Option<&str> {
        self.0.get(mime).map(String::as_str)
    }

    pub fn set(&mut self, mime: &str, value: impl Into<String>) {
        self.0.insert(mime.to_string(), value.into());
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How math is wrapped when it is put on the clipboard as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub begin: String,
    pub end: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            begin: "\\begin{equation*}".to_string(),
            end: "\\end{equation*}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// LaTeX honouring verbatim overrides
    Latex,
    /// LaTeX rebuilt from structure
    LatexExpanded,
    MathJson,
    MathMl,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown output format `{0}`")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latex" => Ok(Self::Latex),
            "latex-expanded" => Ok(Self::LatexExpanded),
            "math-json" | "json" => Ok(Self::MathJson),
            "math-ml" | "mathml" => Ok(Self::MathMl),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Latex => "latex",
            Self::LatexExpanded => "latex-expanded",
            Self::MathJson => "math-json",
            Self::MathMl => "math-ml",
        };
        f.write_str(name)
    }
}

/// Serialize a run of sibling-ordered atoms.
pub fn format_atoms(tree: &AtomTree, atoms: &[AtomId], format: OutputFormat) -> String {
    match format {
        OutputFormat::Latex => tree.list_latex(atoms, false),
        OutputFormat::LatexExpanded => tree.list_latex(atoms, true),
        OutputFormat::MathJson => math_json::to_math_json(tree, atoms).to_string(),
        OutputFormat::MathMl => math_ml::to_math_ml(tree, atoms),
    }
}

/// Clipboard content for `range`.
pub fn export_range(model: &Model, range: &Range, options: &ExportOptions) -> ClipboardData {
    let tree = model.tree();
    let atoms = model.get_atoms(range, false);
    let mut data = ClipboardData::default();

    if atoms.is_empty() {
        for mime in [MIME_TEXT, MIME_LATEX, MIME_JSON, MIME_MATHML] {
            data.set(mime, "");
        }
        return data;
    }

    let modes: Vec<Option<ParseMode>> = atoms
        .iter()
        .map(|&id| tree.get(id).and_then(|atom| atom.mode))
        .collect();

    if modes.iter().all(|mode| matches!(mode, None | Some(ParseMode::Text))) {
        let text: String = atoms
            .iter()
            .filter_map(|&id| tree.get(id))
            .filter(|atom| atom.kind == AtomKind::Text)
            .map(|atom| atom.value.as_str())
            .collect();
        data.set(MIME_TEXT, text);
        return data;
    }

    if modes.iter().all(|mode| *mode == Some(ParseMode::Latex)) {
        let text: String = model
            .get_atoms(range, true)
            .iter()
            .filter_map(|&id| tree.get(id))
            .map(|atom| atom.value.as_str())
            .collect();
        data.set(MIME_TEXT, text);
        return data;
    }

    let content = match atoms.as_slice() {
        [single] if tree.get(*single).is_some_and(|atom| atom.verbatim_latex.is_some()) => tree.latex(*single),
        _ => tree.list_latex(&atoms, true),
    };
    let plain = if is_mode_shift_wrapped(&content) {
        content.clone()
    } else {
        format!("{} {content} {}", options.begin, options.end)
    };
    log::debug!("exporting {} atoms as {content:?}", atoms.len());

    data.set(MIME_LATEX, content);
    data.set(MIME_TEXT, plain);
    data.set(MIME_JSON, math_json::to_math_json(tree, &atoms).to_string());
    data.set(MIME_MATHML, math_ml::to_math_ml(tree, &atoms));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{InsertOptions, RawRange};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("\\[x\\]", Some("x"))]
    #[case("\\( x \\)", Some("x"))]
    #[case("$$x+1$$", Some("x+1"))]
    #[case("  $x$  ", Some("x"))]
    #[case("\\begin{equation*}x\\end{equation*}", Some("x"))]
    #[case("\\begin{displaymath} y \\end{displaymath}", Some("y"))]
    #[case("x", None)]
    #[case("$x", None)]
    #[case("\\[x\\)", None)]
    fn mode_shift_stripping(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(strip_mode_shift(input), expected);
    }

    #[rstest]
    #[case("$x$", true)]
    #[case("\\[x\\]", true)]
    #[case("\\begin{equation}x\\end{equation}", true)]
    #[case(" $x$", false)]
    #[case("$x$ ", false)]
    #[case("x", false)]
    #[case("\\[x\\)", false)]
    fn mode_shift_detection_is_exact(#[case] content: &str, #[case] wrapped: bool) {
        assert_eq!(is_mode_shift_wrapped(content), wrapped);
    }

    #[test]
    fn output_format_names() {
        assert_eq!("latex-expanded".parse::<OutputFormat>(), Ok(OutputFormat::LatexExpanded));
        assert_eq!("mathml".parse::<OutputFormat>(), Ok(OutputFormat::MathMl));
        assert_eq!(OutputFormat::MathJson.to_string(), "math-json");
        assert_eq!(
            "svg".parse::<OutputFormat>(),
            Err(UnknownFormat("svg".to_string()))
        );
    }

    #[test]
    fn empty_range_exports_every_format_empty() {
        let model = Model::from_latex("x");
        let data = export_range(&model, &Range::caret(0), &ExportOptions::default());
        assert_eq!(data.len(), 4);
        assert!(data.formats().all(|mime| data.get(mime) == Some("")));
    }

    #[test]
    fn text_only_exports_plain_text() {
        let mut model = Model::new();
        model.insert(
            "a+b",
            InsertOptions {
                mode: Some(ParseMode::Text),
                ..InsertOptions::default()
            },
        );
        let data = export_range(&model, &model.whole_range(), &ExportOptions::default());
        assert_eq!(data.formats().collect::<Vec<_>>(), vec![MIME_TEXT]);
        assert_eq!(data.get(MIME_TEXT), Some("a+b"));
    }

    #[test]
    fn latex_only_exports_raw_values() {
        let mut model = Model::new();
        model.set_mode(ParseMode::Latex);
        model.insert("\\frac", InsertOptions::default());
        let data = export_range(&model, &model.whole_range(), &ExportOptions::default());
        assert_eq!(data.len(), 1);
        assert_eq!(data.get(MIME_TEXT), Some("\\frac"));
    }

    #[test]
    fn single_verbatim_atom_exports_its_spelling() {
        let model = Model::from_latex("\\pi");
        let data = export_range(&model, &model.whole_range(), &ExportOptions::default());
        assert_eq!(data.get(MIME_LATEX), Some("\\pi"));
        assert_eq!(data.get(MIME_TEXT), Some("\\begin{equation*} \\pi \\end{equation*}"));
        assert_eq!(data.get(MIME_JSON), Some("\"Pi\""));
    }

    #[test]
    fn custom_wrapper() {
        let model = Model::from_latex("x+1");
        let options = ExportOptions {
            begin: "$$".into(),
            end: "$$".into(),
        };
        let data = export_range(&model, &model.whole_range(), &options);
        assert_eq!(data.get(MIME_TEXT), Some("$$ x+1 $$"));
    }

    #[test]
    fn partial_selection_uses_expanded_latex() {
        let mut model = Model::from_latex("\\left(x\\right)+1");
        model.set_selection(&[RawRange::new(0, 3)]);
        let range = *model.selection().first();
        let data = export_range(&model, &range, &ExportOptions::default());
        assert_eq!(data.get(MIME_LATEX), Some("(x)"));
    }
}
