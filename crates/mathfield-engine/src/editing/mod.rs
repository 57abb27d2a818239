/*!
 * # Editing Core Module
 *
 * Everything that turns an [`AtomTree`](crate::models::AtomTree) into an
 * editable document.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: the Atom Tree
 * - The document is one arena-backed tree owned by a [`Model`]
 * - The model never stores positions; they are derived on demand
 *
 * ### 2. Linear Caret Positions
 * - [`PositionIterator`] flattens the tree into caret slots in post-order
 * - The table is rebuilt after each edit and borrows the tree, so a stale
 *   table cannot be used across an edit
 *
 * ### 3. Canonical Ranges
 * - Callers submit [`RawRange`]s, which may be inverted, out of bounds or use
 *   the `-1` "through the end" sentinel
 * - [`normalize_range`] is the only producer of [`Range`]s
 *
 * ### 4. Mode-Specific Editing
 * - [`mode_editor`] dispatches insertion, copy and paste on the parse mode
 *
 * ### 5. Widget Facade
 * - [`Mathfield`] holds a pending value and selection until a model is
 *   attached, then forwards to it
 *
 * ## Module Structure
 *
 * - **`iterator`**: position table over the tree
 * - **`range`**: raw and canonical ranges, normalization, selections
 * - **`options`**: insertion options
 * - **`model`**: the document, its selection and change notifications
 * - **`mode_editor`**: per-mode insert, copy and paste
 * - **`field`**: attach/detach facade
 *
 * ## Usage Pattern
 *
 * ```rust
 * use mathfield_engine::editing::*;
 *
 * let mut model = Model::from_latex("x+1");
 * model.set_selection(&[RawRange::new(3, 1)]);
 *
 * let range = *model.selection().first();
 * assert_eq!((range.start, range.end), (1, 3));
 * assert_eq!(range.direction, Direction::Backward);
 *
 * model.insert("y", InsertOptions::default());
 * assert_eq!(model.value(), "xy");
 * ```
 */

pub mod field;
pub mod iterator;
pub mod mode_editor;
pub mod model;
pub mod options;
pub mod range;

pub use field::{Mathfield, MathfieldOptions, PendingState};
pub use iterator::{PositionEntry, PositionIterator};
pub use model::{ChangeListener, ContentChange, Model};
pub use options::{InsertOptions, InsertionMode, SelectionMode};
pub use range::{Direction, NormalizeOptions, Range, RangeEnd, RawRange, Selection, normalize_range};
