use serde::{Deserialize, Serialize};

use crate::editing::{
    mode_editor,
    model::Model,
    options::InsertOptions,
    range::{RangeEnd, RawRange},
};
use crate::export::{ClipboardData, ExportOptions, OutputFormat};
use crate::models::ParseMode;

/// Settings of a [`Mathfield`] that outlive its model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MathfieldOptions {
    /// Mode the model starts in
    pub default_mode: ParseMode,
    /// Wrapper used when copying math as plain text
    pub export: ExportOptions,
}

/// Value and selection held while no model is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingState {
    pub value: String,
    pub selection: Vec<RawRange>,
}

impl Default for PendingState {
    fn default() -> Self {
        Self {
            value: String::new(),
            selection: vec![RawRange::caret(0)],
        }
    }
}

/// The editor facade consumed by a widget.
///
/// A widget can be configured before it is mounted. Until [`Mathfield::attach`]
/// creates the model, reads and writes go to an explicit [`PendingState`],
/// which the model is then built from. [`Mathfield::detach`] goes the other
/// way, so a widget can be unmounted and mounted again without losing its
/// content.
///
/// ```rust
/// # use mathfield_engine::editing::{Mathfield, MathfieldOptions, InsertOptions};
/// let mut field = Mathfield::new(MathfieldOptions::default());
/// field.set_value("x^2", InsertOptions::default());
/// assert_eq!(field.last_position(), -1);
///
/// field.attach();
/// assert_eq!(field.value(), "x^2");
/// assert_eq!(field.last_position(), 3);
/// ```
#[derive(Debug)]
pub struct Mathfield {
    model: Option<Model>,
    pending: Option<PendingState>,
    options: MathfieldOptions,
}

impl Mathfield {
    pub fn new(options: MathfieldOptions) -> Self {
        Self {
            model: None,
            pending: Some(PendingState::default()),
            options,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.model.is_some()
    }

    /// Build the model from the pending state. Does nothing if a model is
    /// already attached.
    pub fn attach(&mut self) {
        if self.model.is_some() {
            return;
        }
        let pending = self.pending.take().unwrap_or_default();
        let mut model = Model::new();
        model.set_mode(self.options.default_mode);
        model.with_notifications_suppressed(|model| {
            model.set_value(&pending.value, InsertOptions::default());
            model.set_selection(&pending.selection);
        });
        log::debug!("attached model with {} positions", model.last_position() + 1);
        self.model = Some(model);
    }

    /// Drop the model, keeping its value and selection as pending state.
    pub fn detach(&mut self) {
        if let Some(model) = self.model.take() {
            self.pending = Some(PendingState {
                value: model.value(),
                selection: model.selection().ranges().iter().map(|&r| r.into()).collect(),
            });
        }
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut Model> {
        self.model.as_mut()
    }

    pub fn pending(&self) -> Option<&PendingState> {
        self.pending.as_ref()
    }

    pub fn value(&self) -> String {
        self.get_value(OutputFormat::Latex)
    }

    /// The whole document in `format`. While detached only the pending
    /// markup is known, whatever the format.
    pub fn get_value(&self, format: OutputFormat) -> String {
        match (&self.model, &self.pending) {
            (Some(model), _) => model.get_value(&model.whole_range(), format),
            (None, Some(pending)) => pending.value.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn set_value(&mut self, value: &str, options: InsertOptions) {
        if let Some(model) = self.model.as_mut() {
            model.set_value(value, options);
            return;
        }
        self.pending = Some(PendingState {
            value: value.to_string(),
            selection: vec![RawRange::to_end(0)],
        });
    }

    pub fn selection(&self) -> Vec<RawRange> {
        match (&self.model, &self.pending) {
            (Some(model), _) => model.selection().ranges().iter().map(|&r| r.into()).collect(),
            (None, Some(pending)) => pending.selection.clone(),
            (None, None) => vec![RawRange::caret(0)],
        }
    }

    pub fn set_selection(&mut self, ranges: Vec<RawRange>) {
        if let Some(model) = self.model.as_mut() {
            model.set_selection(&ranges);
            return;
        }
        let pending = self.pending.get_or_insert_with(PendingState::default);
        pending.selection = ranges;
    }

    /// The caret: the lower end of the last range if it extends backward,
    /// otherwise the end of the first range (its start if it has no end).
    pub fn position(&self) -> i64 {
        let selection = self.selection();
        let (Some(first), Some(last)) = (selection.first(), selection.last()) else {
            return 0;
        };
        if last.is_backward() {
            return match last.end {
                RangeEnd::Offset(end) => end.min(last.start),
                RangeEnd::ToEnd | RangeEnd::Unset => last.start,
            };
        }
        match first.end {
            RangeEnd::Offset(end) => end,
            RangeEnd::ToEnd => -1,
            RangeEnd::Unset => first.start,
        }
    }

    pub fn set_position(&mut self, position: i64) {
        self.set_selection(vec![RawRange::caret(position)]);
    }

    /// The last valid caret position, or -1 while detached.
    pub fn last_position(&self) -> i64 {
        self.model.as_ref().map_or(-1, |model| model.last_position() as i64)
    }

    /// Insert markup at the caret. Always `false` while detached.
    pub fn insert(&mut self, text: &str, options: InsertOptions) -> bool {
        self.model
            .as_mut()
            .is_some_and(|model| model.insert(text, options))
    }

    pub fn options(&self) -> &MathfieldOptions {
        &self.options
    }

    /// Replace the options. While detached this also resets the pending
    /// selection to cover the whole value.
    pub fn set_options(&mut self, options: MathfieldOptions) {
        match (self.model.as_mut(), self.pending.as_mut()) {
            (Some(model), _) => model.set_mode(options.default_mode),
            (None, Some(pending)) => pending.selection = vec![RawRange::new(0, -1)],
            (None, None) => self.pending = Some(PendingState::default()),
        }
        self.options = options;
    }

    /// Clipboard content for a copy. Empty while detached.
    pub fn copy(&self) -> ClipboardData {
        match &self.model {
            Some(model) => mode_editor::on_copy(model, &self.options.export),
            None => ClipboardData::default(),
        }
    }

    pub fn paste(&mut self, data: &ClipboardData) -> bool {
        self.model
            .as_mut()
            .is_some_and(|model| mode_editor::on_paste(model, data))
    }
}
