//! Markup serialization tests
//!
//! Block nesting, line handling, escaping and the cleanup pass.

use pretty_assertions::assert_eq;
use rich_text_core::{
    AnnotatedBuffer, Annotation, AnnotationKind, Attributes, InlineFormatter, MarkupSerializer,
    SerializeOptions,
};

fn serialize(buffer: &AnnotatedBuffer) -> String {
    MarkupSerializer::default().serialize(buffer)
}

fn annotate(buffer: &mut AnnotatedBuffer, kind: AnnotationKind, start: usize, end: usize) {
    buffer
        .set_annotation(Annotation::new(kind, start, end))
        .unwrap();
}

#[test]
fn test_serialize_is_idempotent() {
    let mut buffer = AnnotatedBuffer::new("one\ntwo\nthree <tag>");
    annotate(&mut buffer, AnnotationKind::BulletList, 0, 8);
    annotate(&mut buffer, AnnotationKind::Bold, 0, 6);
    buffer
        .set_annotation(Annotation::hidden(8, 13, "<span class=\"x\">", "</span>", 0, 1))
        .unwrap();

    let first = serialize(&buffer);
    let second = serialize(&buffer);
    assert_eq!(first, second);
    assert_eq!(
        first,
        "<ul><li><b>one</b></li><li><b>tw</b>o</li></ul><span class=\"x\">three</span> &lt;tag&gt;"
    );
}

#[test]
fn test_adjoining_bold_runs_serialize_as_one() {
    let formatter = InlineFormatter::default();
    let mut buffer = AnnotatedBuffer::new("hello world");
    formatter
        .apply(&mut buffer, AnnotationKind::Bold, 0, 5, Attributes::new())
        .unwrap();
    formatter
        .apply(&mut buffer, AnnotationKind::Bold, 5, 11, Attributes::new())
        .unwrap();

    assert_eq!(buffer.annotation_count(), 1);
    assert_eq!(serialize(&buffer), "<b>hello world</b>");
}

#[test]
fn test_list_omits_trailing_empty_item() {
    let mut buffer = AnnotatedBuffer::new("one\ntwo\n");
    annotate(&mut buffer, AnnotationKind::BulletList, 0, 8);
    assert_eq!(serialize(&buffer), "<ul><li>one</li><li>two</li></ul>");
}

#[test]
fn test_list_keeps_inner_empty_item() {
    let mut buffer = AnnotatedBuffer::new("a\n\nb");
    annotate(&mut buffer, AnnotationKind::BulletList, 0, 4);
    assert_eq!(serialize(&buffer), "<ul><li>a</li><li></li><li>b</li></ul>");
}

#[test]
fn test_list_followed_by_text() {
    let mut buffer = AnnotatedBuffer::new("a\nb\nafter");
    annotate(&mut buffer, AnnotationKind::BulletList, 0, 4);
    assert_eq!(serialize(&buffer), "<ul><li>a</li><li>b</li></ul>after");
}

#[test]
fn test_escaping() {
    assert_eq!(
        serialize(&AnnotatedBuffer::new("1 < 2 & \u{1F600}")),
        "1 &lt; 2 &amp; &#128512;"
    );
    assert_eq!(serialize(&AnnotatedBuffer::new("a  b")), "a&nbsp; b");
}

#[test]
fn test_trailing_marker_is_not_serialized() {
    assert_eq!(serialize(&AnnotatedBuffer::new("text\u{200B}")), "text");
}

#[test]
fn test_nested_quotes() {
    let mut buffer = AnnotatedBuffer::new("abc");
    annotate(&mut buffer, AnnotationKind::Quote, 0, 3);
    annotate(&mut buffer, AnnotationKind::Quote, 0, 3);
    assert_eq!(
        serialize(&buffer),
        "<blockquote><blockquote>abc</blockquote></blockquote>"
    );
}

#[test]
fn test_inner_quote_over_part_of_outer() {
    let mut buffer = AnnotatedBuffer::new("abcdef");
    annotate(&mut buffer, AnnotationKind::Quote, 0, 6);
    annotate(&mut buffer, AnnotationKind::Quote, 2, 4);
    assert_eq!(
        serialize(&buffer),
        "<blockquote>ab</blockquote><blockquote><blockquote>cd</blockquote></blockquote><blockquote>ef</blockquote>"
    );
}

#[test]
fn test_quote_inside_list_item() {
    let mut buffer = AnnotatedBuffer::new("q");
    annotate(&mut buffer, AnnotationKind::BulletList, 0, 1);
    annotate(&mut buffer, AnnotationKind::Quote, 0, 1);
    assert_eq!(
        serialize(&buffer),
        "<ul><li><blockquote>q</blockquote></li></ul>"
    );
}

#[test]
fn test_unknown_block_is_emitted_verbatim_once() {
    let mut buffer = AnnotatedBuffer::new("xx\nend");
    buffer
        .set_annotation(Annotation::unknown(0, 3, "<video src=\"v.mp4\"></video>"))
        .unwrap();
    assert_eq!(serialize(&buffer), "<video src=\"v.mp4\"></video>end");
}

#[test]
fn test_paragraphs() {
    let mut buffer = AnnotatedBuffer::new("first\nsecond");
    annotate(&mut buffer, AnnotationKind::Paragraph, 0, 6);
    annotate(&mut buffer, AnnotationKind::Paragraph, 6, 12);
    assert_eq!(serialize(&buffer), "<p>first</p><p>second</p>");
}

#[test]
fn test_untidy_serialization_keeps_breaks() {
    let mut buffer = AnnotatedBuffer::new("a\nb\n");
    annotate(&mut buffer, AnnotationKind::Quote, 0, 4);
    let markup = MarkupSerializer::new(SerializeOptions::default().with_tidy(false))
        .serialize(&buffer);
    assert_eq!(markup, "<blockquote>a<br>b<br></blockquote>");
}

#[test]
fn test_empty_annotations_are_not_rendered() {
    let mut buffer = AnnotatedBuffer::new("abc");
    annotate(&mut buffer, AnnotationKind::Bold, 1, 1);
    annotate(&mut buffer, AnnotationKind::Quote, 3, 3);
    assert_eq!(serialize(&buffer), "abc");
}

#[test]
fn test_strikethrough_tag_override() {
    let mut buffer = AnnotatedBuffer::new("old");
    buffer
        .set_annotation(
            Annotation::new(AnnotationKind::Strikethrough, 0, 3)
                .with_markup(rich_text_core::Markup::Tag("del".to_string())),
        )
        .unwrap();
    assert_eq!(serialize(&buffer), "<del>old</del>");
}

#[test]
fn test_lone_surrogate_from_host_units_is_dropped() {
    let mut buffer = AnnotatedBuffer::from_units(vec![0x61, 0xD83D, 0x62, 0xD83D, 0xDE00]);
    buffer
        .set_annotation(Annotation::new(AnnotationKind::Italic, 0, 4))
        .unwrap();
    assert_eq!(serialize(&buffer), "<i>ab&#128512;</i>");
}
