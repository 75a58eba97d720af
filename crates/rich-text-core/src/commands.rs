//! Command Interface Layer
//!
//! [`RichTextEditor`] owns an [`AnnotatedBuffer`], the current [`Selection`], the styles the
//! user has selected for the next typed text, an [`InlineFormatter`] and a
//! [`MarkupSerializer`]. A UI host can call its methods directly or dispatch [`Command`]s
//! through [`RichTextEditor::execute`].
//!
//! - **Text Editing**: insert, delete and replace text; typed text picks up selected styles
//! - **Selection**: caret and range selection; a caret toggle only flips the selected styles
//! - **Formatting**: toggle, apply and remove character formats, comments
//! - **Serialization**: render the buffer as markup
//!
//! # Example
//!
//! ```rust
//! use rich_text_core::{AnnotationKind, Command, EditCommand, FormatCommand, RichTextEditor};
//!
//! let mut editor = RichTextEditor::new("");
//!
//! // Typing with bold selected at the caret
//! editor.execute(Command::Format(FormatCommand::Toggle(AnnotationKind::Bold))).unwrap();
//! editor.execute(Command::Edit(EditCommand::InsertText { text: "hi".to_string() })).unwrap();
//!
//! assert_eq!(editor.to_markup(), "<b>hi</b>");
//! ```

use crate::annotation::{AnnotationKind, Attributes, KindSet};
use crate::buffer::AnnotatedBuffer;
use crate::delta::TextChange;
use crate::error::EditResult;
use crate::formatting::InlineFormatter;
use crate::serializer::{MarkupSerializer, SerializeOptions};

/// Selection in UTF-16 offsets. `start <= end`; equal offsets are a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Selection start
    pub start: usize,
    /// Selection end (exclusive)
    pub end: usize,
}

impl Selection {
    /// Selection over `[start, end)`; reversed bounds are swapped.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Caret at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Check if this is a caret.
    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }
}

/// Text editing commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    /// Insert text at the specified offset
    Insert {
        /// UTF-16 offset to insert at.
        offset: usize,
        /// Text to insert.
        text: String,
    },
    /// Delete text in the specified range
    Delete {
        /// UTF-16 offset of the deletion start.
        start: usize,
        /// Length of the deletion in code units.
        length: usize,
    },
    /// Replace text in the specified range
    Replace {
        /// UTF-16 offset of the replacement start.
        start: usize,
        /// Length of the replaced range in code units.
        length: usize,
        /// Replacement text.
        text: String,
    },
    /// Typing/paste: replace the selection (or insert at the caret)
    InsertText {
        /// Typed text.
        text: String,
    },
    /// Delete the selection, or one code unit before the caret
    Backspace,
    /// Replace the selection with a comment
    InsertComment {
        /// Comment body.
        body: String,
    },
}

/// Selection commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    /// Select `[start, end)`
    Set {
        /// Selection start.
        start: usize,
        /// Selection end (exclusive).
        end: usize,
    },
    /// Collapse to a caret
    Caret(usize),
    /// Select the whole buffer
    SelectAll,
}

/// Character formatting commands, applied to the current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    /// Toggle one format
    Toggle(AnnotationKind),
    /// Toggle a group of alternatives (e.g. heading-like variants)
    ToggleAny(Vec<AnnotationKind>),
    /// Apply a format with attributes
    Apply {
        /// Format kind.
        kind: AnnotationKind,
        /// Attributes for the new annotation.
        attributes: Attributes,
    },
    /// Remove a format
    Remove(AnnotationKind),
    /// Query whether the selection carries a format
    Query(AnnotationKind),
    /// Drop empty formats left at the buffer start
    CleanupLeadingEmpty,
}

/// Unified command enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Text editing commands
    Edit(EditCommand),
    /// Selection commands
    Selection(SelectionCommand),
    /// Formatting commands
    Format(FormatCommand),
    /// Serialize the buffer to markup
    Serialize,
}

/// Command execution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Success, no return value
    Success,
    /// Success, returns an offset
    Offset(usize),
    /// Success, returns a count
    Count(usize),
    /// Success, returns whether a format is present
    Active(bool),
    /// Success, returns markup
    Markup(String),
}

/// Editor facade over an annotated buffer.
pub struct RichTextEditor {
    buffer: AnnotatedBuffer,
    selection: Selection,
    selected_styles: Vec<AnnotationKind>,
    formatter: InlineFormatter,
    serializer: MarkupSerializer,
    command_history: Vec<Command>,
}

impl RichTextEditor {
    /// Create an editor over plain `text` with the caret at the end.
    pub fn new(text: &str) -> Self {
        Self::from_buffer(AnnotatedBuffer::new(text))
    }

    /// Create an editor over an existing buffer (e.g. produced by a markup parser).
    pub fn from_buffer(buffer: AnnotatedBuffer) -> Self {
        let caret = buffer.len();
        Self {
            buffer,
            selection: Selection::caret(caret),
            selected_styles: Vec::new(),
            formatter: InlineFormatter::default(),
            serializer: MarkupSerializer::default(),
            command_history: Vec::new(),
        }
    }

    /// Builder: replace the formatter.
    pub fn with_formatter(mut self, formatter: InlineFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Builder: serializer options.
    pub fn with_serialize_options(mut self, options: SerializeOptions) -> Self {
        self.serializer = MarkupSerializer::new(options);
        self
    }

    /// Underlying buffer.
    pub fn buffer(&self) -> &AnnotatedBuffer {
        &self.buffer
    }

    /// Mutable access to the underlying buffer.
    pub fn buffer_mut(&mut self) -> &mut AnnotatedBuffer {
        &mut self.buffer
    }

    /// Formatter in use.
    pub fn formatter(&self) -> &InlineFormatter {
        &self.formatter
    }

    /// Mutable access to the formatter.
    pub fn formatter_mut(&mut self) -> &mut InlineFormatter {
        &mut self.formatter
    }

    /// Buffer text.
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Current selection.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Move the selection and refresh the selected styles from the text under it.
    pub fn set_selection(&mut self, start: usize, end: usize) -> EditResult<()> {
        let selection = Selection::new(start, end);
        self.buffer.validate_range(selection.start, selection.end)?;
        self.selection = selection;
        self.selected_styles = self.styles_at_selection();
        Ok(())
    }

    /// Styles that the next typed text will carry.
    pub fn selected_styles(&self) -> &[AnnotationKind] {
        &self.selected_styles
    }

    /// Overwrite the selected styles.
    pub fn set_selected_styles(&mut self, styles: Vec<AnnotationKind>) {
        self.selected_styles = styles;
    }

    /// Formats present over the selection. A caret reports the formats of the character
    /// before it, which is what typing continues.
    fn styles_at_selection(&self) -> Vec<AnnotationKind> {
        let Selection { start, end } = self.selection;
        if start < end {
            return AnnotationKind::ALL
                .into_iter()
                .filter(|kind| kind.is_formatting())
                .filter(|kind| self.formatter.contains(&self.buffer, *kind, start, end))
                .collect();
        }
        if start == 0 {
            return Vec::new();
        }

        let mut styles: Vec<AnnotationKind> = self
            .buffer
            .query(start - 1, start, KindSet::FORMATTING)
            .into_iter()
            .filter(|(_, a)| a.contains(start - 1))
            .map(|(_, a)| a.kind)
            .collect();
        styles.dedup();
        styles
    }

    /// Toggle `kind` on the selection. At a caret only the selected styles flip.
    pub fn toggle(&mut self, kind: AnnotationKind) -> EditResult<()> {
        let Selection { start, end } = self.selection;
        if start == end {
            self.flip_selected_style(kind);
            return Ok(());
        }
        self.formatter.toggle(&mut self.buffer, kind, start, end)?;
        self.selected_styles = self.styles_at_selection();
        Ok(())
    }

    fn flip_selected_style(&mut self, kind: AnnotationKind) {
        if let Some(pos) = self.selected_styles.iter().position(|k| *k == kind) {
            self.selected_styles.remove(pos);
            return;
        }
        if kind.is_exclusive() {
            self.selected_styles.retain(|k| !k.is_exclusive());
        }
        self.selected_styles.push(kind);
    }

    /// Toggle a group of alternative formats on the selection.
    pub fn toggle_any(&mut self, kinds: &[AnnotationKind]) -> EditResult<()> {
        let Selection { start, end } = self.selection;
        if start == end {
            let present = kinds.iter().any(|k| self.selected_styles.contains(k));
            if present {
                self.selected_styles.retain(|k| !kinds.contains(k));
            } else if let Some(first) = kinds.first() {
                self.flip_selected_style(*first);
            }
            return Ok(());
        }
        self.formatter.toggle_any(&mut self.buffer, kinds, start, end)?;
        self.selected_styles = self.styles_at_selection();
        Ok(())
    }

    /// Apply `kind` with `attributes` over `[start, end)`.
    pub fn apply(
        &mut self,
        kind: AnnotationKind,
        start: usize,
        end: usize,
        attributes: Attributes,
    ) -> EditResult<()> {
        self.formatter
            .apply(&mut self.buffer, kind, start, end, attributes)
    }

    /// Remove `kind` from `[start, end)`.
    pub fn remove(&mut self, kind: AnnotationKind, start: usize, end: usize) -> EditResult<()> {
        self.formatter.remove(&mut self.buffer, kind, start, end)
    }

    /// Check whether `[start, end)` carries `kind`.
    pub fn contains(&self, kind: AnnotationKind, start: usize, end: usize) -> bool {
        self.formatter.contains(&self.buffer, kind, start, end)
    }

    /// Drop empty formats left at the buffer start. Returns how many were removed.
    pub fn cleanup_leading_empty_annotation(&mut self) -> usize {
        self.formatter
            .cleanup_leading_empty_annotation(&mut self.buffer)
    }

    /// Insert `text` at `offset`, style it with the selected styles and put the caret after it.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> EditResult<()> {
        self.buffer.insert_text(offset, text)?;
        let change = TextChange::insertion(offset, text);
        self.formatter
            .handle_text_input(&mut self.buffer, &change, &self.selected_styles)?;
        self.selection = Selection::caret(change.input_end());
        Ok(())
    }

    /// Delete `[start, end)` and put the caret at `start`.
    pub fn delete_text(&mut self, start: usize, end: usize) -> EditResult<()> {
        self.buffer.delete_text(start, end)?;
        let change = TextChange::deletion(start, end - start);
        self.formatter
            .handle_text_input(&mut self.buffer, &change, &self.selected_styles)?;
        self.selection = Selection::caret(start);
        Ok(())
    }

    /// Replace `[start, end)` with `text`.
    pub fn replace_text(&mut self, start: usize, end: usize, text: &str) -> EditResult<()> {
        self.buffer.validate_range(start, end)?;
        if start < end {
            self.buffer.delete_text(start, end)?;
        }
        self.insert_text(start, text)
    }

    /// Replace `[start, end)` with a comment and put the caret after it.
    pub fn insert_comment(&mut self, start: usize, end: usize, body: &str) -> EditResult<usize> {
        let caret = self
            .formatter
            .insert_comment(&mut self.buffer, start, end, body)?;
        self.selection = Selection::caret(caret);
        Ok(caret)
    }

    /// Serialize the buffer.
    pub fn to_markup(&self) -> String {
        self.serializer.serialize(&self.buffer)
    }

    /// Execute command
    pub fn execute(&mut self, command: Command) -> EditResult<CommandResult> {
        self.command_history.push(command.clone());

        match command {
            Command::Edit(edit_cmd) => self.execute_edit(edit_cmd),
            Command::Selection(selection_cmd) => self.execute_selection(selection_cmd),
            Command::Format(format_cmd) => self.execute_format(format_cmd),
            Command::Serialize => Ok(CommandResult::Markup(self.to_markup())),
        }
    }

    /// Execute commands in order, stopping at the first error
    pub fn execute_batch(&mut self, commands: Vec<Command>) -> EditResult<Vec<CommandResult>> {
        commands
            .into_iter()
            .map(|command| self.execute(command))
            .collect()
    }

    /// Get command history
    pub fn command_history(&self) -> &[Command] {
        &self.command_history
    }

    fn execute_edit(&mut self, command: EditCommand) -> EditResult<CommandResult> {
        match command {
            EditCommand::Insert { offset, text } => self.insert_text(offset, &text)?,
            EditCommand::Delete { start, length } => self.delete_text(start, start + length)?,
            EditCommand::Replace {
                start,
                length,
                text,
            } => self.replace_text(start, start + length, &text)?,
            EditCommand::InsertText { text } => {
                let Selection { start, end } = self.selection;
                self.replace_text(start, end, &text)?;
            }
            EditCommand::Backspace => {
                let Selection { start, end } = self.selection;
                if start < end {
                    self.delete_text(start, end)?;
                } else if start > 0 {
                    self.delete_text(start - 1, start)?;
                }
            }
            EditCommand::InsertComment { body } => {
                let Selection { start, end } = self.selection;
                return self.insert_comment(start, end, &body).map(CommandResult::Offset);
            }
        }
        Ok(CommandResult::Offset(self.selection.end))
    }

    fn execute_selection(&mut self, command: SelectionCommand) -> EditResult<CommandResult> {
        match command {
            SelectionCommand::Set { start, end } => self.set_selection(start, end)?,
            SelectionCommand::Caret(offset) => self.set_selection(offset, offset)?,
            SelectionCommand::SelectAll => self.set_selection(0, self.buffer.len())?,
        }
        Ok(CommandResult::Success)
    }

    fn execute_format(&mut self, command: FormatCommand) -> EditResult<CommandResult> {
        let Selection { start, end } = self.selection;
        match command {
            FormatCommand::Toggle(kind) => self.toggle(kind)?,
            FormatCommand::ToggleAny(kinds) => self.toggle_any(&kinds)?,
            FormatCommand::Apply { kind, attributes } => self.apply(kind, start, end, attributes)?,
            FormatCommand::Remove(kind) => self.remove(kind, start, end)?,
            FormatCommand::Query(kind) => {
                return Ok(CommandResult::Active(self.contains(kind, start, end)));
            }
            FormatCommand::CleanupLeadingEmpty => {
                return Ok(CommandResult::Count(self.cleanup_leading_empty_annotation()));
            }
        }
        Ok(CommandResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;

    #[test]
    fn test_caret_toggle_styles_typed_text() {
        let mut editor = RichTextEditor::new("ab");
        editor.toggle(AnnotationKind::Bold).unwrap();
        assert_eq!(editor.selected_styles(), &[AnnotationKind::Bold]);
        assert_eq!(editor.buffer().annotation_count(), 0);

        editor.insert_text(2, "cd").unwrap();
        assert_eq!(editor.to_markup(), "ab<b>cd</b>");
        assert_eq!(editor.selection(), Selection::caret(4));

        editor.toggle(AnnotationKind::Bold).unwrap();
        editor.insert_text(4, "e").unwrap();
        assert_eq!(editor.to_markup(), "ab<b>cd</b>e");
    }

    #[test]
    fn test_caret_after_format_continues_it() {
        let mut editor = RichTextEditor::new("bold");
        editor
            .apply(AnnotationKind::Bold, 0, 4, Attributes::new())
            .unwrap();
        editor.set_selection(4, 4).unwrap();
        assert_eq!(editor.selected_styles(), &[AnnotationKind::Bold]);

        editor.insert_text(4, "er").unwrap();
        assert_eq!(editor.to_markup(), "<b>bolder</b>");
    }

    #[test]
    fn test_exclusive_caret_toggle_replaces_exclusive_style() {
        let mut editor = RichTextEditor::new("");
        editor.toggle(AnnotationKind::Mark).unwrap();
        editor.toggle(AnnotationKind::Italic).unwrap();
        editor.toggle(AnnotationKind::Highlight).unwrap();
        assert_eq!(
            editor.selected_styles(),
            &[AnnotationKind::Italic, AnnotationKind::Highlight]
        );
    }

    #[test]
    fn test_range_toggle_round_trip() {
        let mut editor = RichTextEditor::new("hello");
        editor.set_selection(0, 5).unwrap();
        editor.toggle(AnnotationKind::Italic).unwrap();
        assert!(editor.contains(AnnotationKind::Italic, 0, 5));
        assert_eq!(editor.selected_styles(), &[AnnotationKind::Italic]);

        editor.toggle(AnnotationKind::Italic).unwrap();
        assert!(!editor.contains(AnnotationKind::Italic, 0, 5));
        assert_eq!(editor.to_markup(), "hello");
    }

    #[test]
    fn test_execute_batch() {
        let mut editor = RichTextEditor::new("");
        let results = editor
            .execute_batch(vec![
                Command::Edit(EditCommand::InsertText {
                    text: "hello world".to_string(),
                }),
                Command::Selection(SelectionCommand::Set { start: 6, end: 11 }),
                Command::Format(FormatCommand::Toggle(AnnotationKind::Underline)),
                Command::Format(FormatCommand::Query(AnnotationKind::Underline)),
                Command::Serialize,
            ])
            .unwrap();

        assert_eq!(results[0], CommandResult::Offset(11));
        assert_eq!(results[3], CommandResult::Active(true));
        assert_eq!(
            results[4],
            CommandResult::Markup("hello <u>world</u>".to_string())
        );
        assert_eq!(editor.command_history().len(), 5);
    }

    #[test]
    fn test_insert_comment_command() {
        let mut editor = RichTextEditor::new("a  b");
        editor.set_selection(1, 3).unwrap();
        let result = editor
            .execute(Command::Edit(EditCommand::InsertComment {
                body: "note".to_string(),
            }))
            .unwrap();
        assert_eq!(result, CommandResult::Offset(5));
        assert_eq!(editor.to_markup(), "a<!--note-->b");
    }

    #[test]
    fn test_backspace_deletes_before_caret() {
        let mut editor = RichTextEditor::new("abc");
        editor.execute(Command::Edit(EditCommand::Backspace)).unwrap();
        assert_eq!(editor.text(), "ab");
        assert_eq!(editor.selection(), Selection::caret(2));

        editor.set_selection(0, 0).unwrap();
        editor.execute(Command::Edit(EditCommand::Backspace)).unwrap();
        assert_eq!(editor.text(), "ab");
    }

    #[test]
    fn test_invalid_selection_is_rejected() {
        let mut editor = RichTextEditor::new("abc");
        let err = editor
            .execute(Command::Selection(SelectionCommand::Set { start: 1, end: 9 }))
            .unwrap_err();
        assert_eq!(
            err,
            EditError::InvalidRange {
                start: 1,
                end: 9,
                len: 3
            }
        );
        assert_eq!(editor.selection(), Selection::caret(3));
    }

    #[test]
    fn test_cleanup_command_counts_removed() {
        let mut buffer = AnnotatedBuffer::new("x");
        buffer
            .set_annotation(crate::annotation::Annotation::new(AnnotationKind::Bold, 0, 0))
            .unwrap();
        let mut editor = RichTextEditor::from_buffer(buffer);
        let result = editor
            .execute(Command::Format(FormatCommand::CleanupLeadingEmpty))
            .unwrap();
        assert_eq!(result, CommandResult::Count(1));
    }
}
