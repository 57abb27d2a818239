use slotmap::SlotMap;

use crate::models::atom::{Atom, AtomId, AtomKind, Branch};

/// Arena-backed document tree.
///
/// The tree owns every atom. Child lists hold [`AtomId`]s and each atom keeps
/// a non-owning link to its parent, which is only used for ancestor walks.
/// Every branch starts with a [`AtomKind::First`] sentinel, so an empty
/// branch is one containing only the sentinel.
///
/// ## Cache invalidation
///
/// Every structural mutation goes through [`AtomTree::invalidate_chain`],
/// which clears the cached LaTeX of the edited atom and all its ancestors.
/// Reads recompute lazily; nothing is patched incrementally. Verbatim
/// overrides only describe an atom's own token, never its branches, so an
/// edit below an atom leaves its override valid.
#[derive(Debug, Clone)]
pub struct AtomTree {
    atoms: SlotMap<AtomId, Atom>,
    root: AtomId,
}

impl Default for AtomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomTree {
    /// Create a tree whose root has an empty `Body` branch.
    pub fn new() -> Self {
        let mut atoms = SlotMap::with_key();
        let root = atoms.insert(Atom::root());
        let mut tree = Self { atoms, root };
        tree.add_branch(root, Branch::Body);
        tree
    }

    pub fn root(&self) -> AtomId {
        self.root
    }

    pub fn get(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Mutable access to an atom's own fields.
    ///
    /// Editing `value` or `verbatim_latex` through this handle does not
    /// invalidate caches; call [`AtomTree::invalidate_chain`] afterwards.
    pub fn get_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    pub fn contains(&self, id: AtomId) -> bool {
        self.atoms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn kind(&self, id: AtomId) -> Option<AtomKind> {
        self.get(id).map(|a| a.kind)
    }

    pub fn parent(&self, id: AtomId) -> Option<AtomId> {
        self.get(id)?.parent.map(|(p, _)| p)
    }

    pub fn branch_of(&self, id: AtomId) -> Option<Branch> {
        self.get(id)?.parent.map(|(_, b)| b)
    }

    /// Children of `id` in `branch`, sentinel included. Empty if the branch
    /// does not exist.
    pub fn children(&self, id: AtomId, branch: Branch) -> &[AtomId] {
        self.get(id)
            .and_then(|a| a.branches.get(&branch))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The list that contains `id` (its siblings, itself included).
    pub fn siblings(&self, id: AtomId) -> &[AtomId] {
        match self.get(id).and_then(|a| a.parent) {
            Some((parent, branch)) => self.children(parent, branch),
            None => &[],
        }
    }

    pub(crate) fn siblings_mut(&mut self, id: AtomId) -> Option<&mut Vec<AtomId>> {
        let (parent, branch) = self.get(id)?.parent?;
        self.atoms.get_mut(parent)?.branches.get_mut(&branch)
    }

    pub fn index_in_parent(&self, id: AtomId) -> Option<usize> {
        self.siblings(id).iter().position(|&s| s == id)
    }

    /// Number of ancestors; the root has depth 0, top-level atoms depth 1.
    pub fn depth(&self, id: AtomId) -> usize {
        self.ancestors(id).count()
    }

    /// Walk from the parent of `id` up to and including the root.
    pub fn ancestors(&self, id: AtomId) -> impl Iterator<Item = AtomId> + '_ {
        std::iter::successors(self.parent(id), move |&a| self.parent(a))
    }

    pub fn is_ancestor(&self, ancestor: AtomId, id: AtomId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Ensure `branch` exists on `id`, seeding it with a sentinel.
    pub fn add_branch(&mut self, id: AtomId, branch: Branch) {
        if !self.contains(id) || self.atoms[id].has_branch(branch) {
            return;
        }
        let mut first = Atom::first();
        first.parent = Some((id, branch));
        let first = self.atoms.insert(first);
        self.atoms[id].branches.insert(branch, vec![first]);
        self.invalidate_chain(id);
    }

    /// Add a detached atom to the arena. It is not part of the document
    /// until [`AtomTree::attach`] is called.
    pub fn create(&mut self, atom: Atom) -> AtomId {
        debug_assert!(atom.parent.is_none() && atom.branches.is_empty());
        self.atoms.insert(atom)
    }

    /// Move a detached atom into `parent`'s `branch` at `index`.
    ///
    /// `index` is clamped so that nothing is ever placed before the
    /// sentinel or past the end of the list.
    pub fn attach(&mut self, parent: AtomId, branch: Branch, index: usize, id: AtomId) {
        if !self.contains(id) || !self.contains(parent) {
            return;
        }
        debug_assert!(self.atoms[id].parent.is_none(), "atom is already attached");
        self.add_branch(parent, branch);
        let list = self.atoms[parent]
            .branches
            .entry(branch)
            .or_default();
        let index = index.clamp(1, list.len());
        list.insert(index, id);
        self.atoms[id].parent = Some((parent, branch));
        self.invalidate_chain(parent);
    }

    /// Create `atom` and attach it at `index`.
    pub fn insert_child(&mut self, parent: AtomId, branch: Branch, index: usize, atom: Atom) -> AtomId {
        let id = self.create(atom);
        self.attach(parent, branch, index, id);
        id
    }

    /// Create `atom` and attach it at the end of `branch`.
    pub fn append_child(&mut self, parent: AtomId, branch: Branch, atom: Atom) -> AtomId {
        let index = self.children(parent, branch).len().max(1);
        self.insert_child(parent, branch, index, atom)
    }

    /// Splice `id` out of its parent list, keeping it (and its subtree) in
    /// the arena. Sentinels and the root cannot be detached.
    pub fn detach(&mut self, id: AtomId) -> bool {
        if !self.is_removable(id) {
            return false;
        }
        let Some((parent, _)) = self.atoms[id].parent else {
            return false;
        };
        if let Some(list) = self.siblings_mut(id) {
            list.retain(|&s| s != id);
        }
        self.atoms[id].parent = None;
        self.invalidate_chain(parent);
        true
    }

    /// Splice `id` out of its parent list and drop its whole subtree.
    ///
    /// Returns `false` (and leaves the tree untouched) for sentinels and
    /// the root.
    pub fn remove(&mut self, id: AtomId) -> bool {
        if !self.contains(id) || self.atoms[id].kind == AtomKind::Root || self.atoms[id].is_first() {
            return false;
        }
        if self.atoms[id].parent.is_some() && !self.detach(id) {
            return false;
        }
        for descendant in self.descendants(id) {
            self.atoms.remove(descendant);
        }
        self.atoms.remove(id);
        true
    }

    fn is_removable(&self, id: AtomId) -> bool {
        self.get(id)
            .is_some_and(|a| a.kind != AtomKind::Root && !a.is_first())
    }

    /// All atoms below `id` in post-order: within each branch (in branch
    /// order) every atom's descendants come before the atom itself.
    pub fn descendants(&self, id: AtomId) -> Vec<AtomId> {
        let mut out = Vec::new();
        // Each frame: an atom, its children in branch order, the next to visit
        let mut stack = vec![(id, self.all_children(id), 0usize)];
        while let Some((_, children, next)) = stack.last_mut() {
            match children.get(*next).copied() {
                Some(child) => {
                    *next += 1;
                    stack.push((child, self.all_children(child), 0));
                }
                None => {
                    let Some((atom, ..)) = stack.pop() else {
                        break;
                    };
                    if atom != id {
                        out.push(atom);
                    }
                }
            }
        }
        out
    }

    fn all_children(&self, id: AtomId) -> Vec<AtomId> {
        self.get(id)
            .map(|atom| atom.branches.values().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Clear the cached LaTeX of a single atom.
    pub fn invalidate_latex(&mut self, id: AtomId) {
        if let Some(atom) = self.atoms.get_mut(id) {
            atom.latex.take();
        }
    }

    /// Clear the cached LaTeX of `id` and every ancestor up to the root.
    /// This is the one invalidation procedure used by every mutation.
    pub fn invalidate_chain(&mut self, id: AtomId) {
        let mut current = Some(id);
        while let Some(atom_id) = current {
            let Some(atom) = self.atoms.get_mut(atom_id) else {
                break;
            };
            atom.latex.take();
            current = atom.parent.map(|(p, _)| p);
        }
    }

    /// True if the list is empty or holds only the sentinel.
    pub fn is_empty_mathlist(&self, ids: &[AtomId]) -> bool {
        match ids {
            [] => true,
            [only] => self.kind(*only) == Some(AtomKind::First),
            _ => false,
        }
    }
}
