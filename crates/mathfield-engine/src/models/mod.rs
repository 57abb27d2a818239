pub mod atom;
pub mod latex;
pub mod tree;

pub use atom::{Atom, AtomId, AtomKind, Branch, ParseMode};
pub use tree::AtomTree;
