//! Text escaping for serialized markup.

use std::fmt::Write as _;

use crate::text::{END_OF_BUFFER_MARKER, SPACE};

/// Append `units` to `out` as markup-safe text.
///
/// - `<`, `>` and `&` become entities
/// - a surrogate pair becomes one decimal reference; lone surrogates are dropped
/// - anything else outside printable ASCII becomes a decimal reference
/// - in a run of spaces every space but the last becomes `&nbsp;`
/// - the zero-width marker is never emitted
pub fn escape_text(out: &mut String, units: &[u16]) {
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];
        match unit {
            END_OF_BUFFER_MARKER => {}
            0x3C => out.push_str("&lt;"),
            0x3E => out.push_str("&gt;"),
            0x26 => out.push_str("&amp;"),
            0xD800..=0xDBFF => {
                let low = units
                    .get(i + 1)
                    .copied()
                    .filter(|low| (0xDC00..=0xDFFF).contains(low));
                if let Some(low) = low {
                    let scalar =
                        0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                    let _ = write!(out, "&#{scalar};");
                    i += 1;
                }
            }
            0xDC00..=0xDFFF => {}
            SPACE => {
                while units.get(i + 1) == Some(&SPACE) {
                    out.push_str("&nbsp;");
                    i += 1;
                }
                out.push(' ');
            }
            0x20..=0x7E => out.push(char::from(unit as u8)),
            _ => {
                let _ = write!(out, "&#{unit};");
            }
        }
        i += 1;
    }
}

/// Escape an attribute value for a double-quoted attribute.
pub fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::to_utf16;

    fn escape(text: &str) -> String {
        let mut out = String::new();
        escape_text(&mut out, &to_utf16(text));
        out
    }

    #[test]
    fn test_entities() {
        assert_eq!(escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn test_surrogate_pair_is_one_reference() {
        assert_eq!(escape("\u{1F600}"), "&#128512;");
    }

    #[test]
    fn test_lone_surrogates_are_dropped() {
        let mut out = String::new();
        escape_text(&mut out, &[0x61, 0xD83D, 0x62, 0xDE00]);
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_non_ascii_and_control() {
        assert_eq!(escape("é\t"), "&#233;&#9;");
    }

    #[test]
    fn test_space_runs() {
        assert_eq!(escape("a  b"), "a&nbsp; b");
        assert_eq!(escape("a b"), "a b");
        assert_eq!(escape("   "), "&nbsp;&nbsp; ");
    }

    #[test]
    fn test_marker_is_skipped() {
        assert_eq!(escape("a\u{200B}b"), "ab");
    }

    #[test]
    fn test_attribute_escaping() {
        let mut out = String::new();
        escape_attribute(&mut out, "a\"b<c&d");
        assert_eq!(out, "a&quot;b&lt;c&amp;d");
    }
}
