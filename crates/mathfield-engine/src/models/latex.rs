//! LaTeX serialization of the atom tree.
//!
//! Two flavours are produced:
//!
//! | method | verbatim overrides | cache |
//! |---|---|---|
//! | [`AtomTree::latex`] | used when present | read and filled |
//! | [`AtomTree::latex_expanded`] | ignored | bypassed |
//!
//! The expanded form always reflects the current structure, so it is what the
//! clipboard export uses when more than one atom is selected.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::atom::{AtomId, AtomKind, Branch, ParseMode};
use crate::models::tree::AtomTree;

/// Characters that have to be escaped to be read back as themselves.
const ESCAPED: &[&str] = &["%", "#", "&", "$", "_", "{", "}"];

fn escape_symbol(value: &str) -> String {
    if ESCAPED.contains(&value) {
        format!("\\{value}")
    } else {
        value.to_string()
    }
}

fn escape_text(value: &str) -> String {
    match value {
        "\\" => "\\textbackslash{}".to_string(),
        "~" => "\\textasciitilde{}".to_string(),
        "^" => "\\textasciicircum{}".to_string(),
        _ => escape_symbol(value),
    }
}

/// `^2` for a single grapheme, `^{10}` otherwise.
fn script_argument(latex: &str) -> String {
    let mut graphemes = latex.graphemes(true);
    match (graphemes.next(), graphemes.next()) {
        (Some(g), None) if g != "\\" => g.to_string(),
        _ => format!("{{{latex}}}"),
    }
}

/// True if `latex` ends in a control word such as `\alpha`.
fn ends_with_control_word(latex: &str) -> bool {
    let trimmed = latex.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    trimmed.len() < latex.len() && trimmed.ends_with('\\') && !trimmed.ends_with("\\\\")
}

/// Concatenate fragments, separating a control word from a following letter
/// so that `\pi` then `r` does not become `\pir`.
fn join_fragments(fragments: impl IntoIterator<Item = String>) -> String {
    let mut out = String::new();
    for fragment in fragments {
        if fragment.is_empty() {
            continue;
        }
        if ends_with_control_word(&out) && fragment.starts_with(|c: char| c.is_ascii_alphabetic()) {
            out.push(' ');
        }
        out.push_str(&fragment);
    }
    out
}

/// Move a pending run into `fragments`, wrapped by `wrap`.
fn flush(fragments: &mut Vec<String>, run: &mut String, wrap: impl FnOnce(String) -> String) {
    if !run.is_empty() {
        fragments.push(wrap(std::mem::take(run)));
    }
}

impl AtomTree {
    /// LaTeX of an atom and its branches, honouring verbatim overrides.
    ///
    /// The result is cached on the atom until the next structural edit at
    /// or below it.
    pub fn latex(&self, id: AtomId) -> String {
        let Some(atom) = self.get(id) else {
            return String::new();
        };
        atom.latex
            .get_or_init(|| self.serialize_atom(id, false))
            .clone()
    }

    /// LaTeX of an atom derived from structure only.
    pub fn latex_expanded(&self, id: AtomId) -> String {
        self.serialize_atom(id, true)
    }

    /// LaTeX of a run of sibling atoms. Sentinels are skipped, adjacent
    /// text-mode atoms are grouped into a single `\text{...}` and adjacent
    /// latex-mode atoms are concatenated as they are.
    pub fn list_latex(&self, ids: &[AtomId], expanded: bool) -> String {
        let mut fragments = Vec::new();
        let mut text_run = String::new();
        let mut raw_run = String::new();

        for &id in ids {
            let Some(atom) = self.get(id) else {
                continue;
            };
            if atom.is_first() {
                continue;
            }
            let leaf = atom.branches.is_empty();
            match (atom.kind, atom.mode) {
                (AtomKind::Text, Some(ParseMode::Text)) if leaf => {
                    flush(&mut fragments, &mut raw_run, |s| s);
                    text_run.push_str(&escape_text(&atom.value));
                }
                (AtomKind::Latex, Some(ParseMode::Latex)) if leaf => {
                    flush(&mut fragments, &mut text_run, |s| format!("\\text{{{s}}}"));
                    raw_run.push_str(&atom.value);
                }
                _ => {
                    flush(&mut fragments, &mut text_run, |s| format!("\\text{{{s}}}"));
                    flush(&mut fragments, &mut raw_run, |s| s);
                    fragments.push(if expanded {
                        self.latex_expanded(id)
                    } else {
                        self.latex(id)
                    });
                }
            }
        }
        flush(&mut fragments, &mut text_run, |s| format!("\\text{{{s}}}"));
        flush(&mut fragments, &mut raw_run, |s| s);

        join_fragments(fragments)
    }

    fn branch_latex(&self, id: AtomId, branch: Branch, expanded: bool) -> String {
        self.list_latex(self.children(id, branch), expanded)
    }

    fn serialize_atom(&self, id: AtomId, expanded: bool) -> String {
        let Some(atom) = self.get(id) else {
            return String::new();
        };

        let body = match (&atom.verbatim_latex, expanded) {
            (Some(verbatim), false) => verbatim.clone(),
            _ => match atom.kind {
                AtomKind::Root => self.branch_latex(id, Branch::Body, expanded),
                AtomKind::First | AtomKind::Subsup => String::new(),
                AtomKind::Literal => escape_symbol(&atom.value),
                AtomKind::Text => format!("\\text{{{}}}", escape_text(&atom.value)),
                AtomKind::Command | AtomKind::Latex | AtomKind::Space | AtomKind::Error => {
                    atom.value.clone()
                }
                AtomKind::Group => format!("{{{}}}", self.branch_latex(id, Branch::Body, expanded)),
                AtomKind::Fraction => format!(
                    "{}{{{}}}{{{}}}",
                    atom.value,
                    self.branch_latex(id, Branch::Numerator, expanded),
                    self.branch_latex(id, Branch::Denominator, expanded),
                ),
                AtomKind::Surd => {
                    let index = self.branch_latex(id, Branch::Index, expanded);
                    let body = self.branch_latex(id, Branch::Body, expanded);
                    if index.is_empty() {
                        format!("\\sqrt{{{body}}}")
                    } else {
                        format!("\\sqrt[{index}]{{{body}}}")
                    }
                }
                AtomKind::Placeholder => "\\placeholder{}".to_string(),
            },
        };

        let mut fragments = vec![body];
        for (branch, marker) in [(Branch::Superscript, "^"), (Branch::Subscript, "_")] {
            if atom.has_branch(branch) {
                let script = self.branch_latex(id, branch, expanded);
                fragments.push(format!("{marker}{}", script_argument(&script)));
            }
        }
        join_fragments(fragments)
    }
}
