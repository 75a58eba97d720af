//! Markup serializer.
//!
//! Walks an [`AnnotatedBuffer`] block structure first, inline structure innermost, and emits
//! a markup fragment:
//!
//! ```text
//! segments at block transitions ──► list / quote / paragraph / raw / content
//!                                        │
//!                              physical lines + <br>
//!                                        │
//!                   inline chunks at inline transitions (tag stack)
//!                                        │
//!                                  escaped text
//! ```
//!
//! Foreign markup ([`AnnotationKind::HiddenMarkup`]) is replayed by a tracker that follows the
//! recorded open/close order. All walk state lives in a per-call [`RenderContext`], so
//! serializing an unchanged buffer twice yields identical output.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::annotation::{Annotation, AnnotationKind, KindSet};
use crate::buffer::{AnnotatedBuffer, AnnotationId};
use crate::escape::{escape_attribute, escape_text};
use crate::text::{
    END_OF_BUFFER_MARKER, NEWLINE, OBJECT_PLACEHOLDER, find_newline, split_lines,
    splits_surrogate_pair,
};

/// Serializer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Run the `<br>` cleanup pass over the assembled output.
    pub tidy: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { tidy: true }
    }
}

impl SerializeOptions {
    /// Enable or disable the cleanup pass.
    pub fn with_tidy(mut self, tidy: bool) -> Self {
        self.tidy = tidy;
        self
    }
}

/// Converts an annotated buffer to markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupSerializer {
    options: SerializeOptions,
}

impl MarkupSerializer {
    /// Create a serializer.
    pub fn new(options: SerializeOptions) -> Self {
        Self { options }
    }

    /// Serializer options.
    pub fn options(&self) -> SerializeOptions {
        self.options
    }

    /// Serialize `buffer`.
    pub fn serialize(&self, buffer: &AnnotatedBuffer) -> String {
        let mut units = buffer.units().to_vec();
        units.push(END_OF_BUFFER_MARKER);

        let mut context = RenderContext {
            buffer,
            units,
            tracker: HiddenMarkupTracker::new(buffer),
            out: String::new(),
        };
        context.within_blocks();

        if self.options.tidy {
            tidy(&context.out)
        } else {
            context.out
        }
    }
}

/// Which foreign-markup owners a visit may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Owners lying inside `[start, end]`, except those wrapping the whole container.
    Inside {
        start: usize,
        end: usize,
        container: Option<(usize, usize)>,
    },
    /// Owners wrapping the whole container `[start, end]`.
    Wrapping { start: usize, end: usize },
}

impl Scope {
    fn accepts(self, owner_start: usize, owner_end: usize) -> bool {
        match self {
            Scope::Inside {
                start,
                end,
                container,
            } => {
                owner_start >= start
                    && owner_end <= end
                    && !container.is_some_and(|(cs, ce)| owner_start <= cs && owner_end >= ce)
            }
            Scope::Wrapping { start, end } => owner_start <= start && owner_end >= end,
        }
    }

    /// Closes of already opened owners are bound to their offset rather than to the scope
    /// bounds. Only a container the owner wraps defers the close to the container boundary.
    fn accepts_close(self, owner_start: usize, owner_end: usize) -> bool {
        match self {
            Scope::Inside { container, .. } => {
                !container.is_some_and(|(cs, ce)| owner_start <= cs && owner_end >= ce)
            }
            Scope::Wrapping { .. } => self.accepts(owner_start, owner_end),
        }
    }
}

#[derive(Debug, Clone)]
struct HiddenEvent {
    owner: AnnotationId,
    owner_range: (usize, usize),
    position: usize,
    tag: String,
    is_close: bool,
}

/// Replays foreign markup in its recorded global order.
#[derive(Debug)]
struct HiddenMarkupTracker {
    /// Events sorted by order index; gaps in the indices are already squeezed out.
    events: Vec<HiddenEvent>,
    cursor: usize,
    skipped: HashSet<AnnotationId>,
    opened: HashSet<AnnotationId>,
}

impl HiddenMarkupTracker {
    fn new(buffer: &AnnotatedBuffer) -> Self {
        let mut events = BTreeMap::new();
        for (id, annotation) in buffer.iter() {
            let Some(hidden) = annotation.hidden_markup() else {
                continue;
            };
            let owner_range = (annotation.start, annotation.end);
            let open = HiddenEvent {
                owner: id,
                owner_range,
                position: annotation.start,
                tag: hidden.open_tag.clone(),
                is_close: false,
            };
            let close = HiddenEvent {
                owner: id,
                owner_range,
                position: annotation.end,
                tag: hidden.close_tag.clone(),
                is_close: true,
            };
            for (order, event) in [(hidden.open_order, open), (hidden.close_order, close)] {
                if events.insert(order, event).is_some() {
                    log::debug!("duplicate hidden markup order index {order}");
                }
            }
        }

        Self {
            events: events.into_values().collect(),
            cursor: 0,
            skipped: HashSet::new(),
            opened: HashSet::new(),
        }
    }

    /// Emit every foreign tag due at `position` in order, stopping at the first one that is
    /// not due yet.
    fn visit(&mut self, out: &mut String, position: usize, scope: Scope) {
        while let Some(event) = self.events.get(self.cursor) {
            if event.is_close && self.skipped.contains(&event.owner) {
                self.cursor += 1;
                continue;
            }

            let (owner_start, owner_end) = event.owner_range;
            let pending_close = event.is_close && self.opened.contains(&event.owner);
            let accepted = if pending_close {
                scope.accepts_close(owner_start, owner_end)
            } else {
                scope.accepts(owner_start, owner_end)
            };
            let due = event.position == position && accepted;
            let late_close = event.position < position && pending_close;

            if due || late_close {
                out.push_str(&event.tag);
                if event.is_close {
                    self.opened.remove(&event.owner);
                } else {
                    self.opened.insert(event.owner);
                }
                self.cursor += 1;
                continue;
            }

            if event.position < position {
                log::debug!(
                    "skipping orphan hidden markup {:?} at {} (now at {position})",
                    event.tag,
                    event.position
                );
                if !event.is_close {
                    self.skipped.insert(event.owner);
                }
                self.cursor += 1;
                continue;
            }

            break;
        }
    }

    /// Close every foreign tag still open.
    fn finish(&mut self, out: &mut String) {
        for event in &self.events[self.cursor..] {
            if event.is_close && self.opened.remove(&event.owner) {
                out.push_str(&event.tag);
            }
        }
        self.cursor = self.events.len();
    }
}

#[derive(Debug, Clone)]
struct OpenTag {
    id: AnnotationId,
    open: String,
    close: String,
}

/// Per-call walk state.
struct RenderContext<'a> {
    buffer: &'a AnnotatedBuffer,
    units: Vec<u16>,
    tracker: HiddenMarkupTracker,
    out: String,
}

impl<'a> RenderContext<'a> {
    fn within_blocks(&mut self) {
        let buffer = self.buffer;
        let total = self.units.len();
        let mut i = 0;

        while i < total {
            let mut next = buffer.next_transition(i, total, KindSet::BLOCK);
            if splits_surrogate_pair(&self.units, next) {
                next += 1;
            }
            let blocks: Vec<&Annotation> = buffer
                .query(i, next, KindSet::BLOCK)
                .into_iter()
                .map(|(_, annotation)| annotation)
                .filter(|annotation| annotation.overlaps(i, next))
                .collect();

            if blocks.is_empty() {
                self.within_content(
                    i,
                    next,
                    Scope::Inside {
                        start: i,
                        end: next,
                        container: None,
                    },
                );
                i = next;
                continue;
            }

            let wrapping = Scope::Wrapping {
                start: i,
                end: next,
            };
            let inner = Scope::Inside {
                start: i,
                end: next,
                container: Some((i, next)),
            };
            self.tracker.visit(&mut self.out, i, wrapping);

            let kinds: Vec<AnnotationKind> = blocks.iter().map(|a| a.kind).collect();
            match kinds.as_slice() {
                [AnnotationKind::Quote, AnnotationKind::BulletList] => {
                    self.out.push_str("<blockquote>");
                    self.within_list(i, next);
                    self.out.push_str("</blockquote>");
                }
                [AnnotationKind::BulletList, AnnotationKind::Quote] => {
                    self.out.push_str("<ul><li>");
                    self.within_quote(i, next, inner);
                    self.out.push_str("</li></ul>");
                }
                quotes if quotes.iter().all(|kind| *kind == AnnotationKind::Quote) => {
                    self.within_quote(i, next, inner);
                }
                [AnnotationKind::BulletList] => self.within_list(i, next),
                [AnnotationKind::UnknownMarkup] => {
                    if blocks[0].start == i {
                        self.out.push_str(blocks[0].raw_markup().unwrap_or_default());
                    }
                }
                [AnnotationKind::Paragraph] => {
                    self.out.push_str("<p>");
                    self.within_content(i, next, inner);
                    self.out.push_str("</p>");
                }
                _ => self.within_content(i, next, inner),
            }

            self.tracker.visit(&mut self.out, next, wrapping);
            i = next;
        }

        self.tracker.finish(&mut self.out);
    }

    fn within_list(&mut self, start: usize, end: usize) {
        let total = self.units.len();
        let mut first = start;
        if first < end && self.units[first] == NEWLINE {
            first += 1;
        }

        self.out.push_str("<ul>");
        let lines = split_lines(&self.units, first, end);
        let last = lines.len() - 1;
        for (k, &(line_start, line_end)) in lines.iter().enumerate() {
            let is_empty_last = line_start == line_end && k == last;
            let is_trailing_marker = line_start < line_end
                && line_end + 1 >= total
                && self.units[line_start..line_end]
                    .iter()
                    .all(|&unit| unit == END_OF_BUFFER_MARKER);
            if is_empty_last || is_trailing_marker {
                continue;
            }

            self.out.push_str("<li>");
            self.within_content(
                line_start,
                line_end,
                Scope::Inside {
                    start: line_start,
                    end: line_end,
                    container: Some((start, end)),
                },
            );
            self.out.push_str("</li>");
        }
        self.out.push_str("</ul>");
    }

    fn within_quote(&mut self, start: usize, end: usize, scope: Scope) {
        let buffer = self.buffer;
        let mut i = start;
        while i < end {
            let mut next = buffer.next_transition(i, end, AnnotationKind::Quote);
            if next < end && splits_surrogate_pair(&self.units, next) {
                next += 1;
            }
            let depth = buffer
                .query(i, next, AnnotationKind::Quote)
                .into_iter()
                .filter(|(_, quote)| quote.overlaps(i, next))
                .count();

            for _ in 0..depth {
                self.out.push_str("<blockquote>");
            }
            self.within_content(i, next, scope);
            for _ in 0..depth {
                self.out.push_str("</blockquote>");
            }
            i = next;
        }
    }

    fn within_content(&mut self, start: usize, end: usize, scope: Scope) {
        let mut i = start;
        while i < end {
            let mut next = find_newline(&self.units, i, end).unwrap_or(end);

            let mut nl = 0;
            while next < end && self.units[next] == NEWLINE {
                next += 1;
                nl += 1;
            }

            let marker = usize::from(self.units[next - 1] == END_OF_BUFFER_MARKER);
            self.within_paragraph(i, next - nl - marker, nl, scope);
            i = next;
        }
    }

    fn within_paragraph(&mut self, start: usize, end: usize, nl: usize, scope: Scope) {
        let buffer = self.buffer;
        let mut stack: Vec<OpenTag> = Vec::new();
        let mut i = start;

        loop {
            let mut next = if start == end {
                end
            } else {
                buffer.next_transition(i, end, KindSet::INLINE_BOUNDARIES)
            };
            if next < end && splits_surrogate_pair(&self.units, next) {
                next += 1;
            }

            let active: Vec<(AnnotationId, &Annotation)> = if i < next {
                buffer
                    .query(i, next, KindSet::INLINE)
                    .into_iter()
                    .filter(|(_, annotation)| annotation.overlaps(i, next))
                    .collect()
            } else {
                Vec::new()
            };

            self.close_inactive(&mut stack, &active);

            let mut foreign = String::new();
            self.tracker.visit(&mut foreign, i, scope);
            if !foreign.is_empty() {
                self.close_all(&mut stack);
                self.out.push_str(&foreign);
            }

            let mut inside_image = false;
            for (id, annotation) in &active {
                if annotation.kind == AnnotationKind::Image {
                    inside_image = true;
                    if annotation.start == i {
                        self.out.push_str(&open_tag(annotation));
                    }
                    continue;
                }
                if stack.iter().any(|tag| tag.id == *id) {
                    continue;
                }
                let tag = OpenTag {
                    id: *id,
                    open: open_tag(annotation),
                    close: close_tag(annotation),
                };
                self.out.push_str(&tag.open);
                stack.push(tag);
            }

            if inside_image {
                // The placeholder under an image is consumed by its tag.
                let visible: Vec<u16> = self.units[i..next]
                    .iter()
                    .copied()
                    .filter(|&unit| unit != OBJECT_PLACEHOLDER)
                    .collect();
                escape_text(&mut self.out, &visible);
            } else {
                escape_text(&mut self.out, &self.units[i..next]);
            }

            if next >= end {
                break;
            }
            i = next;
        }

        self.close_all(&mut stack);
        self.tracker.visit(&mut self.out, end, scope);

        for k in 0..nl {
            self.out.push_str("<br>");
            self.tracker.visit(&mut self.out, end + k + 1, scope);
        }
    }

    /// Close entries that are no longer active, keeping the stack well nested: everything
    /// above the first inactive entry is closed and the survivors reopened.
    fn close_inactive(&mut self, stack: &mut Vec<OpenTag>, active: &[(AnnotationId, &Annotation)]) {
        let is_active = |tag: &OpenTag| active.iter().any(|(id, _)| *id == tag.id);
        let Some(first_inactive) = stack.iter().position(|tag| !is_active(tag)) else {
            return;
        };

        let popped = stack.split_off(first_inactive);
        for tag in popped.iter().rev() {
            self.out.push_str(&tag.close);
        }
        for tag in popped.into_iter().filter(|tag| is_active(tag)) {
            self.out.push_str(&tag.open);
            stack.push(tag);
        }
    }

    fn close_all(&mut self, stack: &mut Vec<OpenTag>) {
        while let Some(tag) = stack.pop() {
            self.out.push_str(&tag.close);
        }
    }
}

fn write_attributes(out: &mut String, annotation: &Annotation) {
    for (key, value) in annotation.attributes.iter() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attribute(out, value);
        out.push('"');
    }
}

fn open_tag(annotation: &Annotation) -> String {
    if annotation.kind == AnnotationKind::Comment {
        return "<!--".to_string();
    }
    let mut out = String::from("<");
    out.push_str(annotation.tag_name().unwrap_or("span"));
    write_attributes(&mut out, annotation);
    out.push('>');
    out
}

fn close_tag(annotation: &Annotation) -> String {
    if annotation.kind == AnnotationKind::Comment {
        return "-->".to_string();
    }
    format!("</{}>", annotation.tag_name().unwrap_or("span"))
}

static TIDY_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("</ul>(<br>)?", "</ul>"),
        ("(<br>)*<ul>", "<ul>"),
        ("<ul>(<br>)+", "<ul>"),
        ("</blockquote>(<br>)?", "</blockquote>"),
        ("&#8203;", ""),
        ("(<br>)*</blockquote>", "</blockquote>"),
        ("(<br>)*</li>", "</li>"),
        ("(<br>)*</ul>", "</ul>"),
        ("(<br>)+</p>", "</p>"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid tidy pattern"),
            replacement,
        )
    })
    .collect()
});

/// Drop redundant line breaks around block tags and stray zero-width-space references.
pub fn tidy(markup: &str) -> String {
    TIDY_RULES
        .iter()
        .fold(markup.to_string(), |markup, (pattern, replacement)| {
            pattern.replace_all(&markup, *replacement).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Attributes;

    fn serialize(buffer: &AnnotatedBuffer) -> String {
        MarkupSerializer::default().serialize(buffer)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(serialize(&AnnotatedBuffer::new("hello")), "hello");
        assert_eq!(serialize(&AnnotatedBuffer::empty()), "");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(serialize(&AnnotatedBuffer::new("a\nb\n\nc")), "a<br>b<br><br>c");
    }

    #[test]
    fn test_nested_inline_tags_share_boundary() {
        let mut buffer = AnnotatedBuffer::new("hello");
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Italic, 0, 5))
            .unwrap();
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Bold, 0, 5))
            .unwrap();
        assert_eq!(serialize(&buffer), "<i><b>hello</b></i>");
    }

    #[test]
    fn test_overlapping_tags_are_repaired() {
        let mut buffer = AnnotatedBuffer::new("abcdef");
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Bold, 0, 4))
            .unwrap();
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Italic, 2, 6))
            .unwrap();
        assert_eq!(serialize(&buffer), "<b>ab<i>cd</i></b><i>ef</i>");
    }

    #[test]
    fn test_link_image_and_comment() {
        let mut buffer = AnnotatedBuffer::new("go \u{FFFC} note");
        buffer.set_annotation(Annotation::link(0, 2, "a&b")).unwrap();
        buffer.set_annotation(Annotation::image(3, "x.png")).unwrap();
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Comment, 5, 9))
            .unwrap();
        assert_eq!(
            serialize(&buffer),
            "<a href=\"a&amp;b\">go</a> <img src=\"x.png\"> <!--note-->"
        );
    }

    #[test]
    fn test_tidy_patterns_compile() {
        assert_eq!(TIDY_RULES.len(), 9);
    }

    #[test]
    fn test_image_keeps_text_other_than_placeholder() {
        let mut buffer = AnnotatedBuffer::new("a\u{FFFC}b");
        buffer.set_annotation(Annotation::image(0, "y.png")).unwrap();
        assert_eq!(serialize(&buffer), "<img src=\"y.png\">a&#65532;b");
    }

    #[test]
    fn test_surrogate_pair_split_by_boundary_survives() {
        let mut buffer = AnnotatedBuffer::new("a\u{1F600}b");
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Bold, 0, 2))
            .unwrap();
        assert_eq!(serialize(&buffer), "<b>a&#128512;</b>b");
    }

    #[test]
    fn test_paragraph_and_raw_block() {
        let mut buffer = AnnotatedBuffer::new("one\nX\n");
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Paragraph, 0, 4))
            .unwrap();
        buffer
            .set_annotation(Annotation::unknown(4, 6, "<figure>raw</figure>"))
            .unwrap();
        assert_eq!(serialize(&buffer), "<p>one</p><figure>raw</figure>");
    }

    #[test]
    fn test_quote_drops_trailing_break() {
        let mut buffer = AnnotatedBuffer::new("quoted\nafter");
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Quote, 0, 7))
            .unwrap();
        assert_eq!(serialize(&buffer), "<blockquote>quoted</blockquote>after");
    }

    #[test]
    fn test_list_inside_quote() {
        let mut buffer = AnnotatedBuffer::new("a\nb");
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Quote, 0, 3))
            .unwrap();
        buffer
            .set_annotation(Annotation::new(AnnotationKind::BulletList, 0, 3))
            .unwrap();
        assert_eq!(
            serialize(&buffer),
            "<blockquote><ul><li>a</li><li>b</li></ul></blockquote>"
        );
    }

    #[test]
    fn test_untidy_output_keeps_breaks() {
        let mut buffer = AnnotatedBuffer::new("a\n");
        buffer
            .set_annotation(Annotation::new(AnnotationKind::Quote, 0, 2))
            .unwrap();
        let raw = MarkupSerializer::new(SerializeOptions::default().with_tidy(false)).serialize(&buffer);
        assert_eq!(raw, "<blockquote>a<br></blockquote>");
        assert_eq!(tidy(&raw), "<blockquote>a</blockquote>");
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut buffer = AnnotatedBuffer::new("x");
        buffer
            .set_annotation(
                Annotation::new(AnnotationKind::Mark, 0, 1).with_attributes(
                    Attributes::new()
                        .with("style", "color: #FF0000")
                        .with("class", "m"),
                ),
            )
            .unwrap();
        assert_eq!(
            serialize(&buffer),
            "<mark style=\"color: #FF0000\" class=\"m\">x</mark>"
        );
    }

    #[test]
    fn test_tidy_rules() {
        assert_eq!(tidy("<br><ul><br><li>a<br></li><br></ul><br>b"), "<ul><li>a</li></ul>b");
        assert_eq!(tidy("<p>a<br><br></p>&#8203;"), "<p>a</p>");
        assert_eq!(tidy("</blockquote><br><br>"), "</blockquote><br>");
    }
}
