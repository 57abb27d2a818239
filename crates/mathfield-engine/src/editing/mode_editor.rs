//! Mode-specific editing behaviour.
//!
//! The set of modes is closed, so each operation is a single `match` on
//! [`ParseMode`]:
//!
//! | mode | insert | paste reads |
//! |---|---|---|
//! | `Math` | parse the markup | `application/x-latex`, then `text/plain` |
//! | `Text` | one text atom per grapheme | `text/plain` |
//! | `Latex` | one raw latex atom per grapheme | `text/plain` |

use unicode_segmentation::UnicodeSegmentation;

use crate::editing::{
    model::{ContentChange, Model},
    options::{InsertOptions, InsertionMode},
};
use crate::export::{self, ClipboardData, ExportOptions};
use crate::models::{Atom, Branch, ParseMode};
use crate::parsing::parse_math_at_depth;

/// Insert `text` into the model according to `options`.
///
/// Returns `false` if nothing was inserted.
pub fn insert(model: &mut Model, text: &str, options: InsertOptions) -> bool {
    if options.suppress_change_notifications {
        let options = InsertOptions {
            suppress_change_notifications: false,
            ..options
        };
        return model.with_notifications_suppressed(|model| insert(model, text, options));
    }
    if text.is_empty() {
        return false;
    }

    let mode = options.mode.unwrap_or(model.mode());
    // Level of the list the content lands in, for the parser's depth limit
    let depth = match options.insertion_mode {
        InsertionMode::ReplaceAll => 0,
        _ => model
            .caret_atom()
            .map_or(0, |atom| model.tree().depth(atom).saturating_sub(1)),
    };
    let container = model.new_container(mode);
    let tree = model.tree_mut();
    let errors = match mode {
        ParseMode::Math => {
            let markup = export::strip_mode_shift(text).unwrap_or(text);
            parse_math_at_depth(tree, container, Branch::Body, markup, depth)
        }
        ParseMode::Text => {
            for grapheme in text.graphemes(true) {
                tree.append_child(container, Branch::Body, Atom::text(grapheme));
            }
            vec![]
        }
        ParseMode::Latex => {
            for grapheme in text.graphemes(true) {
                tree.append_child(container, Branch::Body, Atom::raw_latex(grapheme));
            }
            vec![]
        }
    };
    model.set_parse_errors(errors);

    if !model.splice(container, &options) {
        return false;
    }
    log::debug!("inserted {text:?} in {mode:?} mode");
    model.content_did_change(ContentChange::Insert {
        text: text.to_string(),
    });
    true
}

/// Clipboard content for a copy: the selection, or the whole document when
/// the selection is a plain caret.
pub fn on_copy(model: &Model, options: &ExportOptions) -> ClipboardData {
    let range = if model.selection_is_collapsed() {
        model.whole_range()
    } else {
        model.selection().span()
    };
    export::export_range(model, &range, options)
}

/// Insert clipboard content, picking the format the current mode reads.
pub fn on_paste(model: &mut Model, data: &ClipboardData) -> bool {
    let mode = model.mode();
    let text = match mode {
        ParseMode::Math => data.get(export::MIME_LATEX).or_else(|| data.get(export::MIME_TEXT)),
        ParseMode::Text | ParseMode::Latex => data.get(export::MIME_TEXT),
    };
    let Some(text) = text else {
        return false;
    };
    insert(
        model,
        text,
        InsertOptions {
            mode: Some(mode),
            ..InsertOptions::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::range::RawRange;
    use crate::models::AtomKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_text_inserts_nothing() {
        let mut model = Model::new();
        assert!(!insert(&mut model, "", InsertOptions::default()));
        assert_eq!(model.last_position(), 0);
    }

    #[test]
    fn text_mode_inserts_one_atom_per_grapheme() {
        let mut model = Model::new();
        model.set_mode(ParseMode::Text);
        assert!(insert(&mut model, "hé😀", InsertOptions::default()));
        assert_eq!(model.last_position(), 3);
        let range = model.whole_range();
        for atom in model.get_atoms(&range, false) {
            assert_eq!(model.tree().kind(atom), Some(AtomKind::Text));
        }
        assert_eq!(model.value(), "\\text{hé😀}");
    }

    #[test]
    fn latex_mode_keeps_markup_raw() {
        let mut model = Model::new();
        model.set_mode(ParseMode::Latex);
        insert(&mut model, "\\pi", InsertOptions::default());
        assert_eq!(model.last_position(), 3);
        assert_eq!(model.value(), "\\pi");
    }

    #[test]
    fn option_mode_overrides_model_mode() {
        let mut model = Model::new();
        insert(
            &mut model,
            "ab",
            InsertOptions {
                mode: Some(ParseMode::Text),
                ..InsertOptions::default()
            },
        );
        assert_eq!(model.value(), "\\text{ab}");
        assert_eq!(model.mode(), ParseMode::Math);
    }

    #[test]
    fn parse_errors_are_kept_on_the_model() {
        let mut model = Model::new();
        insert(&mut model, "\\nope", InsertOptions::default());
        assert_eq!(model.parse_errors().len(), 1);
        assert_eq!(model.value(), "\\nope");
    }

    #[test]
    fn copy_with_caret_exports_everything() {
        let model = Model::from_latex("x+1");
        let data = on_copy(&model, &ExportOptions::default());
        assert_eq!(data.get(export::MIME_LATEX), Some("x+1"));
    }

    #[test]
    fn copy_with_selection_exports_the_selection() {
        let mut model = Model::from_latex("x+1");
        model.set_selection(&[RawRange::new(2, 3)]);
        let data = on_copy(&model, &ExportOptions::default());
        assert_eq!(data.get(export::MIME_LATEX), Some("+1"));
    }

    #[test]
    fn paste_prefers_latex_and_strips_wrappers() {
        let mut model = Model::new();
        let mut data = ClipboardData::default();
        data.set(export::MIME_TEXT, "\\begin{equation*} y \\end{equation*}");
        data.set(export::MIME_LATEX, "x");
        assert!(on_paste(&mut model, &data));
        assert_eq!(model.value(), "x");

        let mut data = ClipboardData::default();
        data.set(export::MIME_TEXT, "\\begin{equation*} y \\end{equation*}");
        assert!(on_paste(&mut model, &data));
        assert_eq!(model.value(), "xy");
    }

    #[test]
    fn paste_without_a_usable_format() {
        let mut model = Model::new();
        let mut data = ClipboardData::default();
        data.set(export::MIME_MATHML, "<math></math>");
        assert!(!on_paste(&mut model, &data));
    }
}
