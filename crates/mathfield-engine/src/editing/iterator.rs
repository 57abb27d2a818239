use slotmap::SecondaryMap;

use crate::models::{AtomId, AtomTree};

/// One caret slot: the slot immediately after `atom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEntry {
    pub atom: AtomId,
    /// Number of ancestors of `atom`, the root included. Top-level atoms
    /// have depth 1.
    pub depth: usize,
}

/// Linear addressing of caret positions over an [`AtomTree`].
///
/// The table is computed once, in post-order: within each branch an atom's
/// descendants come before the atom itself, and each branch starts with its
/// `First` sentinel. Position `p` is the caret slot after `positions()[p]`,
/// so a sentinel names the slot at the start of its branch and position 0 is
/// the start of the document.
///
/// The iterator borrows the tree, so it cannot outlive the next edit.
#[derive(Debug)]
pub struct PositionIterator<'t> {
    tree: &'t AtomTree,
    positions: Vec<PositionEntry>,
    offsets: SecondaryMap<AtomId, usize>,
}

impl<'t> PositionIterator<'t> {
    pub fn new(tree: &'t AtomTree) -> Self {
        let positions: Vec<PositionEntry> = tree
            .descendants(tree.root())
            .into_iter()
            .map(|atom| PositionEntry {
                atom,
                depth: tree.depth(atom),
            })
            .collect();

        let mut offsets = SecondaryMap::with_capacity(positions.len());
        for (offset, entry) in positions.iter().enumerate() {
            offsets.insert(entry.atom, offset);
        }

        Self {
            tree,
            positions,
            offsets,
        }
    }

    pub fn tree(&self) -> &'t AtomTree {
        self.tree
    }

    pub fn positions(&self) -> &[PositionEntry] {
        &self.positions
    }

    /// The highest valid caret position. The root body always holds its
    /// sentinel, so the table is never empty.
    pub fn last_position(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }

    /// The atom just before the caret at `position`.
    pub fn at(&self, position: usize) -> Option<AtomId> {
        self.positions.get(position).map(|e| e.atom)
    }

    /// The position of the caret slot right after `atom`.
    pub fn offset_of(&self, atom: AtomId) -> Option<usize> {
        self.offsets.get(atom).copied()
    }

    pub fn depth(&self, position: usize) -> Option<usize> {
        self.positions.get(position).map(|e| e.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, AtomKind, Branch};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_has_one_position() {
        let tree = AtomTree::new();
        let iter = PositionIterator::new(&tree);
        assert_eq!(iter.last_position(), 0);
        assert_eq!(tree.kind(iter.at(0).unwrap()), Some(AtomKind::First));
        assert_eq!(iter.depth(0), Some(1));
        assert_eq!(iter.at(1), None);
    }

    #[test]
    fn superscript_positions_come_before_their_base() {
        let mut tree = AtomTree::new();
        let root = tree.root();
        let x = tree.append_child(root, Branch::Body, Atom::literal("x"));
        let two = tree.append_child(x, Branch::Superscript, Atom::literal("2"));
        let iter = PositionIterator::new(&tree);

        assert_eq!(iter.last_position(), 3);
        assert_eq!(iter.at(2), Some(two));
        assert_eq!(iter.at(3), Some(x));
        assert_eq!(iter.offset_of(x), Some(3));
        assert_eq!(iter.depth(1), Some(2));
        assert_eq!(iter.depth(2), Some(2));
        assert_eq!(iter.depth(3), Some(1));
    }

    #[test]
    fn positions_are_injective() {
        let mut tree = AtomTree::new();
        let root = tree.root();
        for c in ["a", "b", "c"] {
            tree.append_child(root, Branch::Body, Atom::literal(c));
        }
        let iter = PositionIterator::new(&tree);
        for (offset, entry) in iter.positions().iter().enumerate() {
            assert_eq!(iter.offset_of(entry.atom), Some(offset));
        }
    }

    #[test]
    fn detached_atoms_have_no_offset() {
        let mut tree = AtomTree::new();
        let loose = tree.create(Atom::literal("z"));
        let iter = PositionIterator::new(&tree);
        assert_eq!(iter.offset_of(loose), None);
    }
}
