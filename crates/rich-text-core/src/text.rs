//! Special code units and UTF-16 helpers shared by the buffer, editor and serializer.

/// Line break code unit.
pub const NEWLINE: u16 = 0x000A;

/// Space code unit.
pub const SPACE: u16 = 0x0020;

/// Zero-width space appended at the end of the buffer by hosts (and by the serializer's
/// working copy) so trailing empty lines stay observable.
///
/// It doubles as the zero-width layout marker; it is never emitted as text.
pub const END_OF_BUFFER_MARKER: u16 = 0x200B;

/// Object replacement character that sits under images and other embedded objects.
pub const OBJECT_PLACEHOLDER: u16 = 0xFFFC;

/// Encode a `&str` as UTF-16 code units.
pub fn to_utf16(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Decode UTF-16 code units, replacing lone surrogates with U+FFFD.
pub fn from_utf16_lossy(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

/// True when `pos` falls between the two halves of a surrogate pair.
pub(crate) fn splits_surrogate_pair(units: &[u16], pos: usize) -> bool {
    pos > 0
        && pos < units.len()
        && (0xD800..=0xDBFF).contains(&units[pos - 1])
        && (0xDC00..=0xDFFF).contains(&units[pos])
}

/// Split `[start, end)` of `units` on line breaks.
///
/// Returns absolute `(line_start, line_end)` pairs. Trailing empty segments are kept
/// (N newlines => N+1 lines), matching `str::split('\n')`.
pub(crate) fn split_lines(units: &[u16], start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut lines = Vec::new();
    let mut line_start = start;
    for (idx, &unit) in units[start..end].iter().enumerate() {
        if unit == NEWLINE {
            lines.push((line_start, start + idx));
            line_start = start + idx + 1;
        }
    }
    lines.push((line_start, end));
    lines
}

/// Position of the first line break in `[start, end)`.
pub(crate) fn find_newline(units: &[u16], start: usize, end: usize) -> Option<usize> {
    units[start..end]
        .iter()
        .position(|&unit| unit == NEWLINE)
        .map(|idx| start + idx)
}
