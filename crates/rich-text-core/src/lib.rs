#![warn(missing_docs)]
//! Rich Text Core - Headless Annotated-Text Editing Kernel
//!
//! # Overview
//!
//! `rich-text-core` keeps a UTF-16 character buffer together with typed, attributed range
//! annotations (bold, links, quotes, lists, foreign markup, ...), edits those annotations the
//! way a rich-text toolbar does, and serializes the result to an HTML-like markup fragment.
//! It does not parse markup or render anything; a host hands it a buffer and reads back markup.
//!
//! # Core Features
//!
//! - **Annotation Arena**: generation-checked handles, sorted interval index with a
//!   deterministic tie-break (start ascending, end descending, creation order)
//! - **Inline Editing**: toggle/apply/remove with merge-and-split and exclusive formats
//! - **Typed Input Styling**: typed text inherits the selected styles
//! - **Markup Serialization**: block nesting, tag-stack repair, escaping, foreign markup
//!   replayed in its recorded order, `<br>` cleanup
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Command Interface (RichTextEditor)         │  ← Public API
//! ├──────────────────────┬──────────────────────┤
//! │  Inline Formatter    │  Markup Serializer   │  ← Edit / Output
//! ├──────────────────────┴──────────────────────┤
//! │  Annotated Buffer (arena + interval index)  │  ← Annotations
//! ├─────────────────────────────────────────────┤
//! │  UTF-16 Storage                             │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Using Command Interface
//!
//! ```rust
//! use rich_text_core::{AnnotationKind, Command, FormatCommand, RichTextEditor, SelectionCommand};
//!
//! let mut editor = RichTextEditor::new("hello world");
//!
//! editor.execute(Command::Selection(SelectionCommand::Set { start: 0, end: 5 })).unwrap();
//! editor.execute(Command::Format(FormatCommand::Toggle(AnnotationKind::Bold))).unwrap();
//!
//! assert_eq!(editor.to_markup(), "<b>hello</b> world");
//! ```
//!
//! ## Building a Buffer Directly
//!
//! ```rust
//! use rich_text_core::{AnnotatedBuffer, Annotation, AnnotationKind, MarkupSerializer};
//!
//! let mut buffer = AnnotatedBuffer::new("a\nb\n");
//! buffer.set_annotation(Annotation::new(AnnotationKind::BulletList, 0, 4)).unwrap();
//!
//! let markup = MarkupSerializer::default().serialize(&buffer);
//! assert_eq!(markup, "<ul><li>a</li><li>b</li></ul>");
//! ```
//!
//! # Module Description
//!
//! - [`storage`] - UTF-16 text storage layer
//! - [`intervals`] - Sorted interval index and range shifting
//! - [`annotation`] - Annotation kinds, attributes and payloads
//! - [`buffer`] - Annotated buffer
//! - [`formatting`] - Inline annotation editor
//! - [`serializer`] - Markup serializer
//! - [`commands`] - Unified command interface
//!
//! # Offsets
//!
//! - Every offset is a UTF-16 code unit offset
//! - U+200B marks the end of the buffer and is never serialized
//! - U+FFFC sits under images

pub mod annotation;
pub mod buffer;
pub mod commands;
pub mod delta;
pub mod error;
pub mod escape;
pub mod formatting;
pub mod intervals;
pub mod serializer;
pub mod storage;
pub mod style;
pub mod text;

pub use annotation::{
    Annotation, AnnotationKind, Attributes, Exclusivity, HiddenMarkup, KindRole, KindSet,
    KindSpec, Markup,
};
pub use buffer::{AnnotatedBuffer, AnnotationId, RenderHint};
pub use commands::{
    Command, CommandResult, EditCommand, FormatCommand, RichTextEditor, Selection,
    SelectionCommand,
};
pub use delta::TextChange;
pub use error::{EditError, EditResult};
pub use formatting::{CodeStyle, ExternalLogger, FormatterConfig, InlineFormatter};
pub use intervals::{Interval, IntervalIndex};
pub use serializer::{MarkupSerializer, SerializeOptions};
pub use storage::Utf16Storage;
pub use style::{AttributeFormatter, Color, CssStyleFormatter, parse_color};
pub use text::{END_OF_BUFFER_MARKER, NEWLINE, OBJECT_PLACEHOLDER};
