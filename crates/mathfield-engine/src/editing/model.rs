use std::collections::HashSet;
use std::fmt;

use crate::editing::{
    iterator::PositionIterator,
    mode_editor,
    options::{InsertOptions, InsertionMode, SelectionMode},
    range::{NormalizeOptions, Range, RawRange, Selection, normalize_range},
};
use crate::export::{self, OutputFormat};
use crate::models::{Atom, AtomId, AtomKind, AtomTree, Branch, ParseMode};
use crate::parsing::{ParseError, parse_math};

/// What an edit did, as reported to the change listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentChange {
    Insert { text: String },
    Delete { range: Range },
    RemoveSuggestion,
}

pub type ChangeListener = Box<dyn FnMut(&ContentChange)>;

/// The editable document: one atom tree plus a selection over it.
///
/// ## Editing context
///
/// The caret position names an atom (see [`PositionIterator`]). The list that
/// atom sits in is the current insertion context, returned by
/// [`Model::siblings`], and [`Model::ancestor`] walks up from it.
///
/// ## Change notifications
///
/// Edits notify the listener installed with [`Model::set_change_listener`]
/// unless notifications are suppressed. Batches suppress them through
/// [`Model::with_notifications_suppressed`], which restores the previous
/// state when the batch returns.
///
/// ```rust
/// # use mathfield_engine::editing::Model;
/// # use mathfield_engine::export::OutputFormat;
/// let model = Model::from_latex("\\frac{1}{2}");
/// let everything = model.whole_range();
/// assert_eq!(model.get_value(&everything, OutputFormat::Latex), "\\frac{1}{2}");
/// assert_eq!(model.position(), model.last_position());
/// ```
pub struct Model {
    tree: AtomTree,
    selection: Selection,
    mode: ParseMode,
    suppress_change_notifications: bool,
    listener: Option<ChangeListener>,
    /// Errors reported by the most recent parse
    parse_errors: Vec<ParseError>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("value", &self.value())
            .field("selection", &self.selection)
            .field("mode", &self.mode)
            .field("suppress_change_notifications", &self.suppress_change_notifications)
            .finish_non_exhaustive()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// An empty math-mode document with the caret at position 0.
    pub fn new() -> Self {
        Self {
            tree: AtomTree::new(),
            selection: Selection::default(),
            mode: ParseMode::Math,
            suppress_change_notifications: false,
            listener: None,
            parse_errors: vec![],
        }
    }

    /// Parse a document from math markup, leaving the caret at the end.
    ///
    /// A surrounding mode-shift pair (`$$...$$`, `\[...\]`, ...) is stripped
    /// first. Problems are available from [`Model::parse_errors`].
    pub fn from_latex(markup: &str) -> Self {
        let mut model = Self::new();
        let root = model.tree.root();
        let markup = export::strip_mode_shift(markup).unwrap_or(markup);
        model.parse_errors = parse_math(&mut model.tree, root, Branch::Body, markup);
        let end = model.last_position() as i64;
        model.set_selection(&[RawRange::caret(end)]);
        model
    }

    pub fn tree(&self) -> &AtomTree {
        &self.tree
    }

    /// Direct access to the tree. Structural edits through [`AtomTree`]
    /// invalidate caches on their own; the selection is not adjusted.
    pub fn tree_mut(&mut self) -> &mut AtomTree {
        &mut self.tree
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ParseMode) {
        self.mode = mode;
    }

    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    pub(crate) fn set_parse_errors(&mut self, errors: Vec<ParseError>) {
        self.parse_errors = errors;
    }

    /// Position table for the current tree. Valid until the next edit.
    pub fn iter(&self) -> PositionIterator<'_> {
        PositionIterator::new(&self.tree)
    }

    pub fn last_position(&self) -> usize {
        self.iter().last_position()
    }

    pub fn normalize(&self, raw: RawRange) -> Range {
        self.normalize_with(raw, NormalizeOptions::default())
    }

    pub fn normalize_with(&self, raw: RawRange, options: NormalizeOptions) -> Range {
        normalize_range(&self.iter(), raw, options)
    }

    /// The range from the start of the document through its end.
    pub fn whole_range(&self) -> Range {
        self.normalize(RawRange::new(0, -1))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection. Every range is normalized; an empty list
    /// selects position 0.
    pub fn set_selection(&mut self, ranges: &[RawRange]) {
        let normalized: Vec<Range> = {
            let iter = PositionIterator::new(&self.tree);
            ranges
                .iter()
                .map(|&raw| normalize_range(&iter, raw, NormalizeOptions::default()))
                .collect()
        };
        self.selection = match Selection::from_ranges(normalized) {
            Some(selection) => selection,
            None => Selection::new(self.normalize(RawRange::caret(0))),
        };
        log::trace!("selection set to {:?}", self.selection.ranges());
    }

    pub fn selection_is_collapsed(&self) -> bool {
        self.selection.is_collapsed()
    }

    /// The caret position, see [`Selection::position`].
    pub fn position(&self) -> usize {
        self.selection.position()
    }

    pub fn set_position(&mut self, position: i64) {
        self.set_selection(&[RawRange::caret(position)]);
    }

    /// Re-normalize the selection after the tree changed under it.
    fn revalidate_selection(&mut self) {
        let raws: Vec<RawRange> = self.selection.ranges().iter().map(|&r| r.into()).collect();
        self.set_selection(&raws);
    }

    /// The atom just before the caret.
    pub fn caret_atom(&self) -> Option<AtomId> {
        self.iter().at(self.position())
    }

    /// The list hosting the caret atom, sentinel included.
    pub fn siblings(&self) -> &[AtomId] {
        match self.caret_atom() {
            Some(atom) => self.tree.siblings(atom),
            None => &[],
        }
    }

    /// The atom `depth` levels above the caret atom: 0 is the caret atom,
    /// 1 its parent. `None` past the root.
    pub fn ancestor(&self, depth: usize) -> Option<AtomId> {
        let caret = self.caret_atom()?;
        match depth {
            0 => Some(caret),
            _ => self.tree.ancestors(caret).nth(depth - 1),
        }
    }

    /// Clear the cached LaTeX of every ancestor of the caret, from its
    /// parent up to and including the root.
    pub fn invalidate_verbatim_latex(&mut self) {
        let Some(caret) = self.caret_atom() else {
            return;
        };
        let chain: Vec<AtomId> = self.tree.ancestors(caret).collect();
        for atom in chain {
            self.tree.invalidate_latex(atom);
        }
    }

    /// Remove every suggestion atom from the current insertion context.
    ///
    /// The list is scanned back to front so that removing an atom never
    /// shifts one that is yet to be visited.
    pub fn remove_suggestion(&mut self) -> bool {
        let siblings = self.siblings().to_vec();
        self.invalidate_verbatim_latex();

        let mut removed = 0;
        for i in (0..siblings.len()).rev() {
            let is_suggestion = self.tree.get(siblings[i]).is_some_and(|a| a.is_suggestion);
            if is_suggestion && self.tree.remove(siblings[i]) {
                removed += 1;
            }
        }
        if removed == 0 {
            return false;
        }

        log::debug!("removed {removed} suggestion atoms");
        self.revalidate_selection();
        self.content_did_change(ContentChange::RemoveSuggestion);
        true
    }

    pub fn notifications_suppressed(&self) -> bool {
        self.suppress_change_notifications
    }

    /// Run `f` with change notifications suppressed, then restore the
    /// previous setting whatever `f` returned.
    pub fn with_notifications_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.suppress_change_notifications;
        self.suppress_change_notifications = true;
        let result = f(self);
        self.suppress_change_notifications = saved;
        result
    }

    pub fn set_change_listener(&mut self, listener: impl FnMut(&ContentChange) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub(crate) fn content_did_change(&mut self, change: ContentChange) {
        if self.suppress_change_notifications {
            log::trace!("suppressed change notification {change:?}");
            return;
        }
        if let Some(listener) = self.listener.as_mut() {
            listener(&change);
        }
    }

    /// Atoms whose caret slot lies in `(range.start, range.end]`, sentinels
    /// excluded, in position order.
    ///
    /// Without `include_children` only the outermost atoms are returned: an
    /// atom whose ancestor is also in the range is left out.
    pub fn get_atoms(&self, range: &Range, include_children: bool) -> Vec<AtomId> {
        let iter = self.iter();
        let atoms: Vec<AtomId> = (range.start + 1..=range.end)
            .filter_map(|position| iter.at(position))
            .filter(|&id| self.tree.kind(id) != Some(AtomKind::First))
            .collect();
        if include_children {
            return atoms;
        }

        let in_range: HashSet<AtomId> = atoms.iter().copied().collect();
        atoms
            .into_iter()
            .filter(|&id| !self.tree.ancestors(id).any(|a| in_range.contains(&a)))
            .collect()
    }

    /// The whole document as LaTeX.
    pub fn value(&self) -> String {
        self.tree.latex(self.tree.root())
    }

    pub fn get_value(&self, range: &Range, format: OutputFormat) -> String {
        let atoms = self.get_atoms(range, false);
        export::format_atoms(&self.tree, &atoms, format)
    }

    /// Replace the whole document. An empty `markup` clears it.
    ///
    /// `markup` is always read as math markup, whatever the current mode:
    /// it is what [`Model::value`] produces.
    pub fn set_value(&mut self, markup: &str, options: InsertOptions) -> bool {
        let options = InsertOptions {
            insertion_mode: InsertionMode::ReplaceAll,
            mode: Some(ParseMode::Math),
            ..options
        };
        if markup.is_empty() {
            let range = self.whole_range();
            self.clear();
            self.set_position(0);
            self.content_did_change(ContentChange::Delete { range });
            return true;
        }
        self.insert(markup, options)
    }

    /// Insert `text` at the caret, interpreted in the current mode (or in
    /// `options.mode`).
    pub fn insert(&mut self, text: &str, options: InsertOptions) -> bool {
        mode_editor::insert(self, text, options)
    }

    /// Delete the atoms in `range` and put the caret where they were.
    pub fn delete_range(&mut self, range: &Range) -> bool {
        let atoms = self.get_atoms(range, false);
        let Some(&first) = atoms.first() else {
            return false;
        };
        let anchor = self.preceding_sibling(first);

        self.invalidate_verbatim_latex();
        for &atom in &atoms {
            self.tree.remove(atom);
        }
        log::debug!("deleted {} atoms in {}..{}", atoms.len(), range.start, range.end);

        let caret = anchor.and_then(|a| self.iter().offset_of(a)).unwrap_or(0);
        self.set_position(caret as i64);
        self.content_did_change(ContentChange::Delete { range: *range });
        true
    }

    fn preceding_sibling(&self, atom: AtomId) -> Option<AtomId> {
        let index = self.tree.index_in_parent(atom)?;
        self.tree.siblings(atom).get(index.checked_sub(1)?).copied()
    }

    fn clear(&mut self) {
        let root = self.tree.root();
        let content: Vec<AtomId> = self.tree.children(root, Branch::Body).iter().skip(1).copied().collect();
        for atom in content {
            self.tree.remove(atom);
        }
    }

    /// Move the content of a detached container into the document according
    /// to `options`, update the selection, and drop the container.
    ///
    /// Returns `false` if the container was empty.
    pub(crate) fn splice(&mut self, container: AtomId, options: &InsertOptions) -> bool {
        let content: Vec<AtomId> = self.tree.children(container, Branch::Body).iter().skip(1).copied().collect();
        if content.is_empty() {
            self.tree.remove(container);
            return false;
        }

        let position = match options.insertion_mode {
            InsertionMode::ReplaceAll => {
                self.clear();
                0
            }
            InsertionMode::ReplaceSelection => {
                if !self.selection.is_collapsed() {
                    let mut ranges = self.selection.ranges().to_vec();
                    // Delete from the end so earlier offsets stay valid
                    ranges.sort_by(|a, b| b.start.cmp(&a.start));
                    self.with_notifications_suppressed(|model| {
                        for range in &ranges {
                            model.delete_range(range);
                        }
                    });
                }
                self.position()
            }
            InsertionMode::InsertBefore => self.selection.span().start,
            InsertionMode::InsertAfter => self.selection.span().end,
        };

        let root = self.tree.root();
        let before = self.iter().at(position);
        let (parent, branch, index) = before
            .and_then(|atom| {
                let (parent, branch) = self.tree.get(atom)?.parent()?;
                Some((parent, branch, self.tree.index_in_parent(atom)? + 1))
            })
            .unwrap_or((root, Branch::Body, 1));

        for (offset, &atom) in content.iter().enumerate() {
            self.tree.detach(atom);
            self.tree.attach(parent, branch, index + offset, atom);
        }
        self.tree.remove(container);

        self.select_after_insert(before, &content, options.selection_mode);
        self.invalidate_verbatim_latex();
        true
    }

    fn select_after_insert(&mut self, before: Option<AtomId>, content: &[AtomId], mode: SelectionMode) {
        let (start, end, placeholder) = {
            let iter = self.iter();
            let start = before.and_then(|a| iter.offset_of(a)).unwrap_or(0);
            let end = content.last().and_then(|&a| iter.offset_of(a)).unwrap_or(start);
            let placeholder = content
                .iter()
                .flat_map(|&atom| {
                    let mut subtree = self.tree.descendants(atom);
                    subtree.push(atom);
                    subtree
                })
                .find(|&atom| self.tree.kind(atom) == Some(AtomKind::Placeholder))
                .and_then(|atom| iter.offset_of(atom));
            (start as i64, end as i64, placeholder)
        };

        let raw = match (mode, placeholder) {
            (SelectionMode::Placeholder, Some(offset)) => RawRange::new(offset as i64 - 1, offset as i64),
            (SelectionMode::Placeholder | SelectionMode::After, _) => RawRange::caret(end),
            (SelectionMode::Before, _) => RawRange::caret(start),
            (SelectionMode::Item, _) => RawRange::new(start, end),
        };
        self.set_selection(&[raw]);
    }

    /// Create a detached container to parse or build inserted content in.
    pub(crate) fn new_container(&mut self, mode: ParseMode) -> AtomId {
        let container = self.tree.create(Atom::new(AtomKind::Group, Some(mode), ""));
        self.tree.add_branch(container, Branch::Body);
        container
    }
}
