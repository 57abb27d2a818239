//! Presentation MathML serialization.

use html_escape::encode_text;

use crate::models::{AtomId, AtomKind, AtomTree, Branch, ParseMode};
use crate::parsing::symbols::{SymbolClass, spacing_width, symbol_for_command};

const NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// A `<math>` element for a run of atoms.
pub fn to_math_ml(tree: &AtomTree, atoms: &[AtomId]) -> String {
    let elements = Writer { tree }.elements(atoms);
    format!("<math xmlns=\"{NAMESPACE}\">{}</math>", elements.concat())
}

fn leaf(tag: &str, content: &str) -> String {
    format!("<{tag}>{}</{tag}>", encode_text(content))
}

fn is_numeric(value: &str) -> bool {
    value == "." || (value.len() == 1 && value.chars().all(|c| c.is_ascii_digit()))
}

struct Writer<'t> {
    tree: &'t AtomTree,
}

impl Writer<'_> {
    fn elements(&self, atoms: &[AtomId]) -> Vec<String> {
        let atoms: Vec<AtomId> = atoms
            .iter()
            .copied()
            .filter(|&id| self.tree.kind(id) != Some(AtomKind::First))
            .collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < atoms.len() {
            let id = atoms[i];
            let Some(atom) = self.tree.get(id) else {
                i += 1;
                continue;
            };
            match (atom.kind, atom.mode) {
                (AtomKind::Literal, _) if is_numeric(&atom.value) => {
                    let mut digits = String::new();
                    let mut last = id;
                    while let Some(&next) = atoms.get(i) {
                        let Some(a) = self.tree.get(next) else { break };
                        if a.kind != AtomKind::Literal || !is_numeric(&a.value) || (!digits.is_empty() && self.has_scripts(last)) {
                            break;
                        }
                        digits.push_str(&a.value);
                        last = next;
                        i += 1;
                    }
                    out.push(self.with_scripts(last, leaf("mn", &digits)));
                    continue;
                }
                (AtomKind::Text, Some(ParseMode::Text)) | (AtomKind::Latex, Some(ParseMode::Latex)) => {
                    let kind = atom.kind;
                    let mut run = String::new();
                    while let Some(a) = atoms.get(i).and_then(|&next| self.tree.get(next)) {
                        if a.kind != kind {
                            break;
                        }
                        run.push_str(&a.value);
                        i += 1;
                    }
                    out.push(leaf("mtext", &run));
                    continue;
                }
                _ => {}
            }
            if let Some(element) = self.element(id) {
                out.push(self.with_scripts(id, element));
            }
            i += 1;
        }
        out
    }

    /// A single element for a list, wrapped in `<mrow>` unless it already is
    /// one element.
    fn row(&self, id: AtomId, branch: Branch) -> String {
        let mut elements = self.elements(self.tree.children(id, branch));
        match elements.len() {
            1 => elements.remove(0),
            _ => format!("<mrow>{}</mrow>", elements.concat()),
        }
    }

    fn has_scripts(&self, id: AtomId) -> bool {
        self.tree
            .get(id)
            .is_some_and(|a| a.has_branch(Branch::Superscript) || a.has_branch(Branch::Subscript))
    }

    fn element(&self, id: AtomId) -> Option<String> {
        let atom = self.tree.get(id)?;
        let element = match atom.kind {
            AtomKind::First => return None,
            AtomKind::Root => self.row(id, Branch::Body),
            AtomKind::Literal => match atom.value.as_str() {
                "" => return None,
                value if value.chars().all(char::is_alphabetic) => leaf("mi", value),
                value => leaf("mo", value),
            },
            AtomKind::Command => match symbol_for_command(&atom.value) {
                Some(symbol) => match symbol.class {
                    SymbolClass::Identifier | SymbolClass::Function => leaf("mi", symbol.glyph),
                    SymbolClass::Operator
                    | SymbolClass::Relation
                    | SymbolClass::BigOperator
                    | SymbolClass::Fence => leaf("mo", symbol.glyph),
                },
                None => leaf("mi", &atom.value),
            },
            AtomKind::Text | AtomKind::Latex => leaf("mtext", &atom.value),
            AtomKind::Group => self.row(id, Branch::Body),
            AtomKind::Fraction => format!(
                "<mfrac>{}{}</mfrac>",
                self.row(id, Branch::Numerator),
                self.row(id, Branch::Denominator)
            ),
            AtomKind::Surd => {
                let body = self.row(id, Branch::Body);
                if self.tree.is_empty_mathlist(self.tree.children(id, Branch::Index)) {
                    format!("<msqrt>{body}</msqrt>")
                } else {
                    format!("<mroot>{body}{}</mroot>", self.row(id, Branch::Index))
                }
            }
            AtomKind::Subsup => "<mrow></mrow>".to_string(),
            AtomKind::Placeholder => leaf("mi", "⬚"),
            AtomKind::Space => {
                let width = atom
                    .value
                    .strip_prefix('\\')
                    .and_then(spacing_width)
                    .unwrap_or(0.0);
                format!("<mspace width=\"{width:.3}em\"/>")
            }
            AtomKind::Error => format!("<merror>{}</merror>", leaf("mtext", &atom.value)),
        };
        Some(element)
    }

    fn with_scripts(&self, id: AtomId, base: String) -> String {
        let Some(atom) = self.tree.get(id) else {
            return base;
        };
        match (atom.has_branch(Branch::Subscript), atom.has_branch(Branch::Superscript)) {
            (true, true) => format!(
                "<msubsup>{base}{}{}</msubsup>",
                self.row(id, Branch::Subscript),
                self.row(id, Branch::Superscript)
            ),
            (true, false) => format!("<msub>{base}{}</msub>", self.row(id, Branch::Subscript)),
            (false, true) => format!("<msup>{base}{}</msup>", self.row(id, Branch::Superscript)),
            (false, false) => base,
        }
    }
}
