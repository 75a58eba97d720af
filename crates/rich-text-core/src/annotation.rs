//! Annotation data model.
//!
//! An annotation is a typed, attributed half-open range over the character buffer. The kind
//! enumeration is closed; everything the editor and serializer need to know about a kind is
//! read from a single descriptor table ([`AnnotationKind::spec`]) instead of being scattered
//! across kind-specific branches.

use std::fmt;

/// Annotation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnnotationKind {
    /// `<b>`
    Bold,
    /// `<i>`
    Italic,
    /// `<u>`
    Underline,
    /// Strikethrough; the tag name comes from the annotation payload (default `s`).
    Strikethrough,
    /// `<code>`
    Code,
    /// Background color run, `<span>`.
    Background,
    /// `<mark>`, exclusive.
    Mark,
    /// Highlight, exclusive.
    Highlight,
    /// `<a href="…">`
    Link,
    /// `<img src="…">` over a placeholder character.
    Image,
    /// `<!-- … -->`
    Comment,
    /// Block-level markup the model does not understand, kept as raw text.
    UnknownMarkup,
    /// `<p>`
    Paragraph,
    /// `<blockquote>`
    Quote,
    /// `<ul>`
    BulletList,
    /// Explicit list item marker. Items are derived from line breaks when serializing.
    ListItem,
    /// Inline foreign markup reproduced from its recorded open/close order.
    HiddenMarkup,
}

/// Exclusivity class of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exclusivity {
    /// May stack with any other kind.
    Inclusive,
    /// At most one exclusive style covers any character.
    Exclusive,
}

/// How the serializer treats a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindRole {
    /// Character-level style rendered in the inline walk.
    Inline,
    /// Foreign inline markup emitted through the order tracker.
    Hidden,
    /// Block structure that drives the paragraph-level walk.
    Block,
    /// Informational block marker that takes no part in nesting.
    Item,
}

/// Per-kind descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    /// Tag name, if the kind renders as a plain element.
    pub tag: Option<&'static str>,
    /// Serializer role.
    pub role: KindRole,
    /// Exclusivity class.
    pub exclusivity: Exclusivity,
    /// Whether adjacent/overlapping equal annotations are joined.
    pub mergeable: bool,
    /// Whether the kind is a user-toggleable character format.
    pub formatting: bool,
}

const fn inline(tag: &'static str, exclusivity: Exclusivity) -> KindSpec {
    KindSpec {
        tag: Some(tag),
        role: KindRole::Inline,
        exclusivity,
        mergeable: true,
        formatting: true,
    }
}

const fn structural(tag: Option<&'static str>, role: KindRole, mergeable: bool) -> KindSpec {
    KindSpec {
        tag,
        role,
        exclusivity: Exclusivity::Inclusive,
        mergeable,
        formatting: false,
    }
}

impl AnnotationKind {
    /// Every kind, in declaration order.
    pub const ALL: [AnnotationKind; 17] = [
        AnnotationKind::Bold,
        AnnotationKind::Italic,
        AnnotationKind::Underline,
        AnnotationKind::Strikethrough,
        AnnotationKind::Code,
        AnnotationKind::Background,
        AnnotationKind::Mark,
        AnnotationKind::Highlight,
        AnnotationKind::Link,
        AnnotationKind::Image,
        AnnotationKind::Comment,
        AnnotationKind::UnknownMarkup,
        AnnotationKind::Paragraph,
        AnnotationKind::Quote,
        AnnotationKind::BulletList,
        AnnotationKind::ListItem,
        AnnotationKind::HiddenMarkup,
    ];

    /// Descriptor for this kind.
    pub const fn spec(self) -> KindSpec {
        use Exclusivity::{Exclusive, Inclusive};
        match self {
            AnnotationKind::Bold => inline("b", Inclusive),
            AnnotationKind::Italic => inline("i", Inclusive),
            AnnotationKind::Underline => inline("u", Inclusive),
            AnnotationKind::Strikethrough => inline("s", Inclusive),
            AnnotationKind::Code => inline("code", Inclusive),
            AnnotationKind::Background => inline("span", Inclusive),
            AnnotationKind::Mark => inline("mark", Exclusive),
            AnnotationKind::Highlight => inline("highlight", Exclusive),
            AnnotationKind::Link => KindSpec {
                formatting: false,
                ..inline("a", Inclusive)
            },
            AnnotationKind::Image => structural(Some("img"), KindRole::Inline, false),
            AnnotationKind::Comment => structural(None, KindRole::Inline, false),
            AnnotationKind::UnknownMarkup => structural(None, KindRole::Block, false),
            AnnotationKind::Paragraph => structural(Some("p"), KindRole::Block, false),
            AnnotationKind::Quote => structural(Some("blockquote"), KindRole::Block, false),
            AnnotationKind::BulletList => structural(Some("ul"), KindRole::Block, false),
            AnnotationKind::ListItem => structural(Some("li"), KindRole::Item, false),
            AnnotationKind::HiddenMarkup => structural(None, KindRole::Hidden, false),
        }
    }

    /// Exclusivity class.
    pub const fn exclusivity(self) -> Exclusivity {
        self.spec().exclusivity
    }

    /// Shorthand for `exclusivity() == Exclusive`.
    pub const fn is_exclusive(self) -> bool {
        matches!(self.spec().exclusivity, Exclusivity::Exclusive)
    }

    /// Shorthand for `spec().formatting`.
    pub const fn is_formatting(self) -> bool {
        self.spec().formatting
    }

    const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// A set of kinds, used to filter queries and transition scans.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u32);

impl KindSet {
    /// No kinds.
    pub const EMPTY: Self = Self(0);

    /// Every kind.
    pub const ALL: Self = Self::from_kinds(&AnnotationKind::ALL);

    /// User-toggleable character formats.
    pub const FORMATTING: Self = Self::from_kinds(&[
        AnnotationKind::Bold,
        AnnotationKind::Italic,
        AnnotationKind::Underline,
        AnnotationKind::Strikethrough,
        AnnotationKind::Code,
        AnnotationKind::Background,
        AnnotationKind::Mark,
        AnnotationKind::Highlight,
    ]);

    /// Kinds rendered natively in the inline walk.
    pub const INLINE: Self = Self::FORMATTING.with(AnnotationKind::Link).with(AnnotationKind::Image).with(AnnotationKind::Comment);

    /// Inline kinds plus foreign inline markup: the set that chunks the inline walk.
    pub const INLINE_BOUNDARIES: Self = Self::INLINE.with(AnnotationKind::HiddenMarkup);

    /// Block kinds that drive the paragraph-level walk.
    pub const BLOCK: Self = Self::from_kinds(&[
        AnnotationKind::UnknownMarkup,
        AnnotationKind::Paragraph,
        AnnotationKind::Quote,
        AnnotationKind::BulletList,
    ]);

    /// Build a set from a slice of kinds.
    pub const fn from_kinds(kinds: &[AnnotationKind]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Set with a single kind.
    pub const fn only(kind: AnnotationKind) -> Self {
        Self(kind.bit())
    }

    /// Copy of `self` with `kind` added.
    pub const fn with(self, kind: AnnotationKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Check membership.
    pub const fn contains(self, kind: AnnotationKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Check if empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(AnnotationKind::ALL.iter().filter(|kind| self.contains(**kind)))
            .finish()
    }
}

impl From<AnnotationKind> for KindSet {
    fn from(kind: AnnotationKind) -> Self {
        Self::only(kind)
    }
}

impl FromIterator<AnnotationKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = AnnotationKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, kind| set.with(kind))
    }
}

/// Free-form attributes.
///
/// Iteration follows insertion order (so serialization is stable), while equality ignores
/// order: two attribute sets are equal when they hold the same key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Create an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, keeping its original position if it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Builder-style [`Attributes::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k) == Some(v.as_str()))
    }
}

impl Eq for Attributes {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.set(k, v);
        }
        attributes
    }
}

/// Foreign inline markup with its parse-time order indices.
///
/// `open_order` and `close_order` are positions in a single total order shared by every
/// hidden-markup annotation in the buffer. They never change after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenMarkup {
    /// Verbatim opening tag, e.g. `<span class="x">`.
    pub open_tag: String,
    /// Verbatim closing tag, e.g. `</span>`.
    pub close_tag: String,
    /// Order index of the opening tag.
    pub open_order: usize,
    /// Order index of the closing tag.
    pub close_order: usize,
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Custom tag name (strikethrough variants: `s`, `strike`, `del`).
    Tag(String),
    /// Foreign inline markup.
    Hidden(HiddenMarkup),
    /// Raw block markup emitted verbatim.
    Raw(String),
}

/// A typed, attributed half-open range `[start, end)` over the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Kind.
    pub kind: AnnotationKind,
    /// Start offset (inclusive), UTF-16 code units.
    pub start: usize,
    /// End offset (exclusive), UTF-16 code units.
    pub end: usize,
    /// Attributes, rendered on the opening tag.
    pub attributes: Attributes,
    /// Kind-specific payload.
    pub markup: Option<Markup>,
}

impl Annotation {
    /// Create an annotation without attributes or payload.
    pub fn new(kind: AnnotationKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            start,
            end,
            attributes: Attributes::new(),
            markup: None,
        }
    }

    /// Builder: replace attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder: set the payload.
    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }

    /// Link with an `href` attribute.
    pub fn link(start: usize, end: usize, href: &str) -> Self {
        Self::new(AnnotationKind::Link, start, end)
            .with_attributes(Attributes::new().with("href", href))
    }

    /// Image over its placeholder character.
    pub fn image(start: usize, src: &str) -> Self {
        Self::new(AnnotationKind::Image, start, start + 1)
            .with_attributes(Attributes::new().with("src", src))
    }

    /// Foreign inline markup.
    pub fn hidden(
        start: usize,
        end: usize,
        open_tag: &str,
        close_tag: &str,
        open_order: usize,
        close_order: usize,
    ) -> Self {
        Self::new(AnnotationKind::HiddenMarkup, start, end).with_markup(Markup::Hidden(
            HiddenMarkup {
                open_tag: open_tag.to_string(),
                close_tag: close_tag.to_string(),
                open_order,
                close_order,
            },
        ))
    }

    /// Unknown block markup emitted verbatim.
    pub fn unknown(start: usize, end: usize, raw: &str) -> Self {
        Self::new(AnnotationKind::UnknownMarkup, start, end).with_markup(Markup::Raw(raw.to_string()))
    }

    /// Check if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Range length.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if `pos` is covered.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Intersection test used by every range query.
    ///
    /// `[start, end)` intersects the query `[query_start, query_end]` when the closed
    /// ranges meet, except that two non-empty ranges touching at a single boundary do not.
    pub fn intersects(&self, query_start: usize, query_end: usize) -> bool {
        intersects(self.start, self.end, query_start, query_end)
    }

    /// Strict overlap of non-empty ranges.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }

    /// Same kind, attributes and payload, and the kind is mergeable.
    pub fn is_mergeable_with(&self, other: &Annotation) -> bool {
        self.kind == other.kind
            && self.kind.spec().mergeable
            && self.attributes == other.attributes
            && self.markup == other.markup
    }

    /// Tag name used for rendering, honoring a [`Markup::Tag`] override.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.markup {
            Some(Markup::Tag(tag)) => Some(tag.as_str()),
            _ => self.kind.spec().tag,
        }
    }

    /// Foreign markup payload, if any.
    pub fn hidden_markup(&self) -> Option<&HiddenMarkup> {
        match &self.markup {
            Some(Markup::Hidden(hidden)) => Some(hidden),
            _ => None,
        }
    }

    /// Raw markup payload, if any.
    pub fn raw_markup(&self) -> Option<&str> {
        match &self.markup {
            Some(Markup::Raw(raw)) => Some(raw.as_str()),
            _ => None,
        }
    }
}

pub(crate) fn intersects(start: usize, end: usize, query_start: usize, query_end: usize) -> bool {
    if start > query_end || end < query_start {
        return false;
    }
    if start != end && query_start != query_end && (start == query_end || end == query_start) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table() {
        assert!(AnnotationKind::Mark.is_exclusive());
        assert!(AnnotationKind::Highlight.is_exclusive());
        assert!(!AnnotationKind::Background.is_exclusive());
        assert_eq!(AnnotationKind::Bold.spec().tag, Some("b"));
        assert!(!AnnotationKind::Image.spec().mergeable);
        assert!(!AnnotationKind::Link.is_formatting());
        assert_eq!(AnnotationKind::Quote.spec().role, KindRole::Block);
    }

    #[test]
    fn test_kind_sets() {
        assert!(KindSet::INLINE.contains(AnnotationKind::Link));
        assert!(!KindSet::INLINE.contains(AnnotationKind::HiddenMarkup));
        assert!(KindSet::INLINE_BOUNDARIES.contains(AnnotationKind::HiddenMarkup));
        assert!(!KindSet::BLOCK.contains(AnnotationKind::ListItem));
        for kind in AnnotationKind::ALL {
            assert!(KindSet::ALL.contains(kind));
        }
        let set: KindSet = [AnnotationKind::Bold, AnnotationKind::Quote].into_iter().collect();
        assert!(set.contains(AnnotationKind::Quote));
        assert!(!set.contains(AnnotationKind::Italic));
    }

    #[test]
    fn test_attribute_equality_ignores_order() {
        let a = Attributes::new().with("class", "x").with("style", "color:red");
        let b = Attributes::new().with("style", "color:red").with("class", "x");
        assert_eq!(a, b);
        assert_eq!(a.iter().next(), Some(("class", "x")));
        assert_ne!(a, Attributes::new().with("class", "x"));
    }

    #[test]
    fn test_intersects_boundaries() {
        let bold = Annotation::new(AnnotationKind::Bold, 2, 5);
        assert!(bold.intersects(4, 6));
        assert!(!bold.intersects(5, 6));
        assert!(!bold.intersects(0, 2));
        // An empty query touching either boundary intersects.
        assert!(bold.intersects(5, 5));
        assert!(bold.intersects(2, 2));

        let caret = Annotation::new(AnnotationKind::Bold, 3, 3);
        assert!(caret.intersects(3, 4));
        assert!(caret.intersects(2, 3));
        assert!(!caret.intersects(4, 5));
    }

    #[test]
    fn test_mergeable_requires_equal_attributes() {
        let plain = Annotation::new(AnnotationKind::Bold, 0, 2);
        let classed = Annotation::new(AnnotationKind::Bold, 2, 4)
            .with_attributes(Attributes::new().with("class", "x"));
        assert!(plain.is_mergeable_with(&Annotation::new(AnnotationKind::Bold, 5, 6)));
        assert!(!plain.is_mergeable_with(&classed));
        assert!(!Annotation::image(0, "a.png").is_mergeable_with(&Annotation::image(1, "a.png")));
    }

    #[test]
    fn test_tag_override() {
        let strike = Annotation::new(AnnotationKind::Strikethrough, 0, 1)
            .with_markup(Markup::Tag("del".to_string()));
        assert_eq!(strike.tag_name(), Some("del"));
        assert_eq!(Annotation::new(AnnotationKind::Strikethrough, 0, 1).tag_name(), Some("s"));
    }
}
