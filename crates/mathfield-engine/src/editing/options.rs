use serde::{Deserialize, Serialize};

use crate::models::ParseMode;

/// Where inserted content goes relative to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertionMode {
    /// Replace the selected atoms, or insert at the caret if collapsed
    #[default]
    ReplaceSelection,
    /// Replace the whole document
    ReplaceAll,
    /// Insert at the start of the selection
    InsertBefore,
    /// Insert at the end of the selection
    InsertAfter,
}

/// What the selection becomes after an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    /// Select the first inserted placeholder, or behave like `After`
    #[default]
    Placeholder,
    /// Caret after the inserted content
    After,
    /// Caret before the inserted content
    Before,
    /// Select the inserted content
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsertOptions {
    pub insertion_mode: InsertionMode,
    pub selection_mode: SelectionMode,
    /// Perform the edit without notifying the change listener
    pub suppress_change_notifications: bool,
    /// Interpret the input in this mode instead of the model's current one
    pub mode: Option<ParseMode>,
}

impl InsertOptions {
    pub fn replace_all() -> Self {
        Self {
            insertion_mode: InsertionMode::ReplaceAll,
            ..Self::default()
        }
    }
}
