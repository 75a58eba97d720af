//! Inline annotation editor.
//!
//! [`InlineFormatter`] applies, removes and toggles character formats over a range while
//! keeping the annotation set minimal:
//!
//! - mergeable annotations that overlap or touch are joined until nothing more can merge
//! - at most one exclusive format (mark, highlight) covers any character
//! - removing a format from the middle of a run splits the run around the hole
//!
//! Rejected ranges are reported through the `log` facade and the optional
//! [`ExternalLogger`], and nothing is mutated.

use crate::annotation::{Annotation, AnnotationKind, Attributes, KindSet, Markup};
use crate::buffer::{AnnotatedBuffer, AnnotationId, RenderHint};
use crate::delta::TextChange;
use crate::error::{EditError, EditResult};
use crate::style::{
    AttributeFormatter, CSS_BACKGROUND_COLOR, CSS_COLOR, Color, CssStyleFormatter, parse_color,
};
use crate::text::{END_OF_BUFFER_MARKER, NEWLINE};

/// Host-side sink for editor errors.
pub trait ExternalLogger {
    /// Record one message.
    fn log(&self, message: &str);
}

/// Colors used to render inline code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeStyle {
    /// Background color.
    pub background: Color,
    /// Background opacity, `0.0..=1.0`.
    pub background_alpha: f32,
    /// Text color.
    pub foreground: Color,
}

impl Default for CodeStyle {
    fn default() -> Self {
        Self {
            background: Color::rgb(0xEE, 0xEE, 0xEE),
            background_alpha: 0.75,
            foreground: Color::rgb(0xC7, 0x25, 0x4E),
        }
    }
}

/// Formatter defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatterConfig {
    /// Color written into new background runs.
    pub background_color: Color,
    /// Text color written into new mark runs (none leaves the text color alone).
    pub mark_color: Option<Color>,
    /// Default highlight background.
    pub highlight_color: Color,
    /// Inline code colors.
    pub code_style: CodeStyle,
    /// Tag emitted for strikethrough (`s`, `strike` or `del`).
    pub strikethrough_tag: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            background_color: Color::rgb(0xFF, 0xF1, 0x76),
            mark_color: None,
            highlight_color: Color::rgb(0xFF, 0xEB, 0x3B),
            code_style: CodeStyle::default(),
            strikethrough_tag: DEFAULT_STRIKETHROUGH_TAG.to_string(),
        }
    }
}

impl FormatterConfig {
    /// Set the background run color.
    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the mark text color.
    pub fn with_mark_color(mut self, color: Option<Color>) -> Self {
        self.mark_color = color;
        self
    }

    /// Set the highlight color.
    pub fn with_highlight_color(mut self, color: Color) -> Self {
        self.highlight_color = color;
        self
    }

    /// Set the inline code colors.
    pub fn with_code_style(mut self, code_style: CodeStyle) -> Self {
        self.code_style = code_style;
        self
    }

    /// Set the strikethrough tag.
    pub fn with_strikethrough_tag(mut self, tag: impl Into<String>) -> Self {
        self.strikethrough_tag = tag.into();
        self
    }
}

const DEFAULT_STRIKETHROUGH_TAG: &str = "s";

/// Character-format editor over an [`AnnotatedBuffer`].
pub struct InlineFormatter {
    config: FormatterConfig,
    attribute_formatter: Box<dyn AttributeFormatter>,
    external_logger: Option<Box<dyn ExternalLogger>>,
}

impl Default for InlineFormatter {
    fn default() -> Self {
        Self::new(FormatterConfig::default())
    }
}

impl InlineFormatter {
    /// Create a formatter with the default CSS attribute formatter and no external logger.
    pub fn new(config: FormatterConfig) -> Self {
        Self {
            config,
            attribute_formatter: Box::new(CssStyleFormatter),
            external_logger: None,
        }
    }

    /// Route rejected edits to `logger` as well as the `log` facade.
    pub fn with_external_logger(mut self, logger: Box<dyn ExternalLogger>) -> Self {
        self.external_logger = Some(logger);
        self
    }

    /// Replace the attribute formatter.
    pub fn with_attribute_formatter(mut self, formatter: Box<dyn AttributeFormatter>) -> Self {
        self.attribute_formatter = formatter;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Mutable configuration (e.g. to change the mark color from a color picker).
    pub fn config_mut(&mut self) -> &mut FormatterConfig {
        &mut self.config
    }

    fn check_range(
        &self,
        buffer: &AnnotatedBuffer,
        start: usize,
        end: usize,
        operation: &str,
    ) -> EditResult<()> {
        buffer
            .validate_range(start, end)
            .inspect_err(|err| self.report(buffer, operation, err))
    }

    fn report(&self, buffer: &AnnotatedBuffer, operation: &str, err: &EditError) {
        log::warn!("InlineFormatter::{operation}: {err}");
        if let Some(logger) = &self.external_logger {
            logger.log(&format!("InlineFormatter::{operation}: {err}"));
            logger.log(&format!("Logging the whole content: {:?}", buffer.text()));
        }
    }

    /// Annotation that `apply` would create for `kind`, before its range is set.
    pub fn make_template(&self, kind: AnnotationKind, attributes: Attributes) -> Annotation {
        let mut template = Annotation::new(kind, 0, 0);
        match kind {
            AnnotationKind::Background => self.attribute_formatter.set_style_value(
                &mut template.attributes,
                CSS_BACKGROUND_COLOR,
                &self.config.background_color.to_string(),
            ),
            AnnotationKind::Mark => {
                if let Some(color) = self.config.mark_color {
                    self.attribute_formatter.set_style_value(
                        &mut template.attributes,
                        CSS_COLOR,
                        &color.to_string(),
                    );
                }
            }
            AnnotationKind::Strikethrough
                if self.config.strikethrough_tag != DEFAULT_STRIKETHROUGH_TAG =>
            {
                template.markup = Some(Markup::Tag(self.config.strikethrough_tag.clone()));
            }
            _ => {}
        }
        for (key, value) in attributes.iter() {
            template.attributes.set(key, value);
        }
        template
    }

    /// Visual run for `annotation` over `[start, end)`, if it has anything to paint.
    ///
    /// Unparseable style colors fall back to the kind default.
    pub fn render_hint_for(
        &self,
        annotation: &Annotation,
        start: usize,
        end: usize,
    ) -> Option<RenderHint> {
        let style_color = |property: &str| {
            self.attribute_formatter
                .style_value(&annotation.attributes, property)
                .and_then(|value| parse_color(&value))
        };
        let foreground = style_color(CSS_COLOR);
        let background = style_color(CSS_BACKGROUND_COLOR);

        let code = self.config.code_style;
        let (foreground, background) = match annotation.kind {
            AnnotationKind::Background => {
                (foreground, background.or(Some(self.config.background_color)))
            }
            AnnotationKind::Highlight => {
                (foreground, background.or(Some(self.config.highlight_color)))
            }
            AnnotationKind::Code => (
                foreground.or(Some(code.foreground)),
                background.or(Some(code.background.with_alpha(code.background_alpha))),
            ),
            _ => (foreground, background),
        };

        if foreground.is_none() && background.is_none() {
            return None;
        }
        Some(RenderHint {
            start,
            end,
            foreground,
            background,
        })
    }

    fn paint(&self, buffer: &mut AnnotatedBuffer, annotation: &Annotation, start: usize, end: usize) {
        if let Some(hint) = self.render_hint_for(annotation, start, end) {
            buffer.add_render_hint(hint);
        }
    }

    /// Apply `kind` over `[start, end)`, merging with equal neighbours.
    pub fn apply(
        &self,
        buffer: &mut AnnotatedBuffer,
        kind: AnnotationKind,
        start: usize,
        end: usize,
        attributes: Attributes,
    ) -> EditResult<()> {
        self.check_range(buffer, start, end, "apply")?;
        if start >= end {
            return Ok(());
        }

        let template = self.make_template(kind, attributes);

        if kind == AnnotationKind::Background {
            // Stacked background colors would fight; the new one replaces the old.
            self.strip(buffer, start, end, |a| a.kind == AnnotationKind::Background)?;
        }
        if kind.is_exclusive() {
            self.strip(buffer, start, end, |a| {
                a.kind.is_exclusive() && !a.is_mergeable_with(&template)
            })?;
        }

        let mut extended = false;

        if start >= 1 {
            let preceding = Self::find_mergeable(buffer, start - 1, start, &template);
            if let Some((id, left_start, left_end)) = preceding {
                if left_end >= end {
                    // Already covered by the run: only the paint needs refreshing.
                    buffer.clear_render_hints(start, end);
                    if let Some(left) = buffer.get(id).cloned() {
                        self.paint(buffer, &left, start, end);
                    }
                    return Ok(());
                }
                buffer.set_range(id, left_start, end)?;
                extended = true;
            }
        }

        if !extended && buffer.len() > end {
            if let Some((id, right_start, right_end)) =
                Self::find_mergeable(buffer, end, end + 1, &template)
            {
                buffer.set_range(id, start.min(right_start), right_end)?;
                extended = true;
            }
        }

        if !extended {
            let inside: Vec<AnnotationId> = buffer
                .query(start, end, kind)
                .into_iter()
                .filter(|(_, a)| a.is_mergeable_with(&template))
                .map(|(id, _)| id)
                .collect();
            for id in inside {
                buffer.remove_annotation(id);
            }

            let fresh = Annotation {
                start,
                end,
                ..template.clone()
            };
            buffer.set_annotation(fresh)?;
        }

        self.paint(buffer, &template, start, end);
        self.join(buffer, start, end)
    }

    fn find_mergeable(
        buffer: &AnnotatedBuffer,
        start: usize,
        end: usize,
        template: &Annotation,
    ) -> Option<(AnnotationId, usize, usize)> {
        buffer
            .query(start, end, template.kind)
            .into_iter()
            .find(|(_, a)| !a.is_empty() && a.is_mergeable_with(template))
            .map(|(id, a)| (id, a.start, a.end))
    }

    /// Remove `kind` from `[start, end)`, splitting runs that extend past the range.
    pub fn remove(
        &self,
        buffer: &mut AnnotatedBuffer,
        kind: AnnotationKind,
        start: usize,
        end: usize,
    ) -> EditResult<()> {
        self.check_range(buffer, start, end, "remove")?;
        self.strip(buffer, start, end, |a| a.kind == kind)?;
        buffer.clear_render_hints(start, end);
        self.join(buffer, start, end)
    }

    /// Delete annotations matching `predicate` that intersect `[start, end]` and re-create the
    /// parts outside the range with their original attributes.
    fn strip(
        &self,
        buffer: &mut AnnotatedBuffer,
        start: usize,
        end: usize,
        predicate: impl Fn(&Annotation) -> bool,
    ) -> EditResult<()> {
        let victims: Vec<(AnnotationId, Annotation)> = buffer
            .query(start, end, KindSet::ALL)
            .into_iter()
            .filter(|(_, a)| predicate(a))
            .map(|(id, a)| (id, a.clone()))
            .collect();

        for (id, original) in victims {
            buffer.remove_annotation(id);
            if original.start < start {
                buffer.set_annotation(Annotation {
                    end: start,
                    ..original.clone()
                })?;
            }
            if original.end > end {
                buffer.set_annotation(Annotation {
                    start: end,
                    ..original
                })?;
            }
        }
        Ok(())
    }

    /// Merge overlapping or touching mergeable annotations around `[start, end)` until no
    /// pair can merge.
    pub fn join(&self, buffer: &mut AnnotatedBuffer, start: usize, end: usize) -> EditResult<()> {
        let mut window_start = start.saturating_sub(1);
        let mut window_end = (end + 1).min(buffer.len());

        loop {
            let candidates: Vec<(AnnotationId, Annotation)> = buffer
                .query(window_start, window_end, KindSet::ALL)
                .into_iter()
                .filter(|(_, a)| a.kind.spec().mergeable)
                .map(|(id, a)| (id, a.clone()))
                .collect();

            let pair = candidates.iter().enumerate().find_map(|(i, (keep, a))| {
                candidates[i + 1..].iter().find_map(|(drop, b)| {
                    (a.is_mergeable_with(b) && a.start <= b.end && b.start <= a.end)
                        .then(|| (*keep, *drop, a.start.min(b.start), a.end.max(b.end)))
                })
            });

            let Some((keep, drop, merged_start, merged_end)) = pair else {
                return Ok(());
            };

            log::trace!("join {keep} + {drop} -> {merged_start}..{merged_end}");
            buffer.remove_annotation(drop);
            buffer.set_range(keep, merged_start, merged_end)?;
            window_start = window_start.min(merged_start.saturating_sub(1));
            window_end = window_end.max((merged_end + 1).min(buffer.len()));
        }
    }

    /// Check if `[start, end)` carries `kind`.
    ///
    /// For a range, every character other than line breaks (and the end-of-buffer marker)
    /// must be covered, and there must be at least one such character. At a caret, the
    /// characters on both sides must carry mergeable annotations of `kind`; a caret at the
    /// buffer start or end never does.
    pub fn contains(
        &self,
        buffer: &AnnotatedBuffer,
        kind: AnnotationKind,
        start: usize,
        end: usize,
    ) -> bool {
        if start > end || end > buffer.len() {
            return false;
        }

        if start == end {
            if start == 0 || start + 1 > buffer.len() {
                return false;
            }
            let covering = |offset: usize| {
                buffer
                    .query(offset, offset + 1, kind)
                    .into_iter()
                    .map(|(_, a)| a)
                    .find(|a| a.contains(offset))
            };
            return match (covering(start - 1), covering(start)) {
                (Some(before), Some(after)) => before.is_mergeable_with(after),
                _ => false,
            };
        }

        let runs: Vec<(usize, usize)> = buffer
            .query(start, end, kind)
            .into_iter()
            .map(|(_, a)| (a.start, a.end))
            .collect();
        let units = buffer.units();

        let mut any_text = false;
        for offset in start..end {
            if matches!(units[offset], NEWLINE | END_OF_BUFFER_MARKER) {
                continue;
            }
            any_text = true;
            if !runs.iter().any(|&(s, e)| s <= offset && offset < e) {
                return false;
            }
        }
        any_text
    }

    fn remove_formats_where(
        &self,
        buffer: &mut AnnotatedBuffer,
        start: usize,
        end: usize,
        predicate: impl Fn(AnnotationKind) -> bool,
    ) -> EditResult<()> {
        let mut kinds: Vec<AnnotationKind> = buffer
            .query(start, end, KindSet::FORMATTING)
            .into_iter()
            .map(|(_, a)| a.kind)
            .filter(|kind| predicate(*kind))
            .collect();
        kinds.sort();
        kinds.dedup();
        for kind in kinds {
            self.remove(buffer, kind, start, end)?;
        }
        Ok(())
    }

    /// Remove `kind` if the range already carries it, otherwise apply it.
    ///
    /// Applying an exclusive format first clears inclusive formats and other exclusive
    /// formats; applying an inclusive one clears exclusive formats.
    pub fn toggle(
        &self,
        buffer: &mut AnnotatedBuffer,
        kind: AnnotationKind,
        start: usize,
        end: usize,
    ) -> EditResult<()> {
        self.check_range(buffer, start, end, "toggle")?;
        if self.contains(buffer, kind, start, end) {
            return self.remove(buffer, kind, start, end);
        }

        if kind.is_exclusive() {
            self.remove_formats_where(buffer, start, end, |k| !k.is_exclusive() || k != kind)?;
        } else {
            self.remove_formats_where(buffer, start, end, AnnotationKind::is_exclusive)?;
        }
        self.apply(buffer, kind, start, end, Attributes::new())
    }

    /// Remove every kind of `kinds` the range carries; if it carries none, clear exclusive
    /// formats and apply the first kind.
    pub fn toggle_any(
        &self,
        buffer: &mut AnnotatedBuffer,
        kinds: &[AnnotationKind],
        start: usize,
        end: usize,
    ) -> EditResult<()> {
        self.check_range(buffer, start, end, "toggle_any")?;
        let present: Vec<AnnotationKind> = kinds
            .iter()
            .copied()
            .filter(|kind| self.contains(buffer, *kind, start, end))
            .collect();

        if !present.is_empty() {
            for kind in present {
                self.remove(buffer, kind, start, end)?;
            }
            return Ok(());
        }

        self.remove_formats_where(buffer, start, end, AnnotationKind::is_exclusive)?;
        match kinds.first() {
            Some(first) => self.apply(buffer, *first, start, end, Attributes::new()),
            None => Ok(()),
        }
    }

    /// Drop empty formatting annotations left at the start of the buffer by a style that was
    /// selected but never typed with.
    pub fn cleanup_leading_empty_annotation(&self, buffer: &mut AnnotatedBuffer) -> usize {
        let only_marker = buffer.len() == 1 && buffer.unit_at(0) == Some(END_OF_BUFFER_MARKER);
        let leading: Vec<AnnotationId> = buffer
            .query(0, if only_marker { 1 } else { 0 }, KindSet::FORMATTING)
            .into_iter()
            .filter(|(_, a)| a.is_empty() && (a.start == 0 || (only_marker && a.start == 1)))
            .map(|(id, _)| id)
            .collect();

        let removed = leading.len();
        for id in leading {
            buffer.remove_annotation(id);
        }
        removed
    }

    /// Restyle text the user just typed.
    ///
    /// Formats over the inserted span that are not in `selected` are removed (all of them
    /// after a typed line break), then every selected format is applied to the span. A
    /// deletion drops empty formats left at the deletion point and joins the runs it brought
    /// together.
    ///
    /// Text typed with the mark selected takes the configured mark color, so a neighbouring
    /// mark of another color ends where the typing starts. Inside an existing mark run the
    /// run's color wins.
    pub fn handle_text_input(
        &self,
        buffer: &mut AnnotatedBuffer,
        change: &TextChange,
        selected: &[AnnotationKind],
    ) -> EditResult<()> {
        if change.is_end_of_buffer_marker() {
            return Ok(());
        }

        let start = change.input_start();
        let end = change.input_end();
        self.check_range(buffer, start, end, "handle_text_input")?;

        if change.is_deletion() {
            let lingering: Vec<AnnotationId> = buffer
                .query(start, start, KindSet::FORMATTING)
                .into_iter()
                .filter(|(_, a)| a.is_empty())
                .map(|(id, _)| id)
                .collect();
            for id in lingering {
                buffer.remove_annotation(id);
            }
            return self.join(buffer, start, start);
        }
        if start == end {
            return Ok(());
        }

        let newline = change.is_newline();
        self.remove_formats_where(buffer, start, end, |kind| {
            newline || !selected.contains(&kind)
        })?;

        for kind in selected.iter().copied().filter(|kind| kind.is_formatting()) {
            if kind == AnnotationKind::Mark {
                self.apply_typed_mark(buffer, start, end)?;
            } else {
                self.apply(buffer, kind, start, end, Attributes::new())?;
            }
        }
        Ok(())
    }

    fn apply_typed_mark(
        &self,
        buffer: &mut AnnotatedBuffer,
        start: usize,
        end: usize,
    ) -> EditResult<()> {
        let inside_run = buffer
            .query(start, end, AnnotationKind::Mark)
            .into_iter()
            .any(|(_, mark)| mark.start < start && end < mark.end);
        if inside_run {
            log::trace!("typed text at {start}..{end} stays in the enclosing mark run");
            return Ok(());
        }
        self.apply(buffer, AnnotationKind::Mark, start, end, Attributes::new())
    }

    /// Replace `[start, end)` with a comment holding `body` and return the caret offset after
    /// it. Formats are cleared from the range first so the comment never inherits them.
    pub fn insert_comment(
        &self,
        buffer: &mut AnnotatedBuffer,
        start: usize,
        end: usize,
        body: &str,
    ) -> EditResult<usize> {
        self.check_range(buffer, start, end, "insert_comment")?;
        self.remove_formats_where(buffer, start, end, |_| true)?;

        buffer.replace_text(start, end, body)?;
        let comment_end = start + body.encode_utf16().count();
        self.remove_formats_where(buffer, start, comment_end, |_| true)?;
        buffer.set_annotation(Annotation::new(AnnotationKind::Comment, start, comment_end))?;
        Ok(comment_end)
    }
}
