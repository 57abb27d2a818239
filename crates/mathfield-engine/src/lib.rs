pub mod editing;
pub mod export;
pub mod models;
pub mod parsing;

// Re-export key types for easier usage
pub use editing::{Mathfield, MathfieldOptions, Model, Range, RawRange, Selection};
pub use export::{ClipboardData, ExportOptions, OutputFormat};
pub use models::{Atom, AtomId, AtomKind, AtomTree, Branch, ParseMode};
