//! CSS-like style attribute access and color parsing.
//!
//! Annotations keep their visual attributes inside a single `style` attribute
//! (`color: #ff0000; background-color: yellow`). The [`AttributeFormatter`] trait is the seam
//! through which the editor reads and writes individual properties of that attribute.

use std::fmt;

use crate::annotation::Attributes;

/// Attribute holding CSS-like declarations.
pub const STYLE_ATTRIBUTE: &str = "style";

/// Foreground color property.
pub const CSS_COLOR: &str = "color";

/// Background color property.
pub const CSS_BACKGROUND_COLOR: &str = "background-color";

/// Reads and writes single properties of an annotation's style attribute.
pub trait AttributeFormatter {
    /// Value of `property`, or `None` when missing.
    fn style_value(&self, attributes: &Attributes, property: &str) -> Option<String>;

    /// Set `property`, replacing any previous value.
    fn set_style_value(&self, attributes: &mut Attributes, property: &str, value: &str);

    /// Remove `property`. Drops the style attribute once it has no declarations left.
    fn remove_style_value(&self, attributes: &mut Attributes, property: &str);
}

/// Default formatter for `key: value; key: value` declarations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssStyleFormatter;

impl CssStyleFormatter {
    fn declarations(style: &str) -> Vec<(String, String)> {
        style
            .split(';')
            .filter_map(|declaration| {
                let (key, value) = declaration.split_once(':')?;
                let key = key.trim();
                let value = value.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_ascii_lowercase(), value.to_string()))
            })
            .collect()
    }

    fn render(declarations: &[(String, String)]) -> String {
        declarations
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl AttributeFormatter for CssStyleFormatter {
    fn style_value(&self, attributes: &Attributes, property: &str) -> Option<String> {
        let style = attributes.get(STYLE_ATTRIBUTE)?;
        Self::declarations(style)
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }

    fn set_style_value(&self, attributes: &mut Attributes, property: &str, value: &str) {
        let mut declarations = attributes
            .get(STYLE_ATTRIBUTE)
            .map(Self::declarations)
            .unwrap_or_default();

        let property = property.to_ascii_lowercase();
        match declarations.iter_mut().find(|(key, _)| *key == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => declarations.push((property, value.to_string())),
        }
        attributes.set(STYLE_ATTRIBUTE, Self::render(&declarations));
    }

    fn remove_style_value(&self, attributes: &mut Attributes, property: &str) {
        let Some(style) = attributes.get(STYLE_ATTRIBUTE) else {
            return;
        };
        let mut declarations = Self::declarations(style);
        declarations.retain(|(key, _)| !key.eq_ignore_ascii_case(property));
        if declarations.is_empty() {
            attributes.remove(STYLE_ATTRIBUTE);
        } else {
            attributes.set(STYLE_ATTRIBUTE, Self::render(&declarations));
        }
    }
}

/// 32-bit ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Opaque color from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Alpha component.
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Color with the given alpha (0.0..=1.0) applied.
    pub fn with_alpha(self, alpha: f32) -> Self {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u32;
        Self((self.0 & 0x00FF_FFFF) | a << 24)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alpha() == 0xFF {
            write!(f, "#{:06X}", self.0 & 0x00FF_FFFF)
        } else {
            write!(f, "#{:08X}", self.0)
        }
    }
}

const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0xFF00_0000),
    ("darkgray", 0xFF44_4444),
    ("darkgrey", 0xFF44_4444),
    ("gray", 0xFF88_8888),
    ("grey", 0xFF88_8888),
    ("lightgray", 0xFFCC_CCCC),
    ("lightgrey", 0xFFCC_CCCC),
    ("white", 0xFFFF_FFFF),
    ("red", 0xFFFF_0000),
    ("green", 0xFF00_FF00),
    ("blue", 0xFF00_00FF),
    ("yellow", 0xFFFF_FF00),
    ("cyan", 0xFF00_FFFF),
    ("magenta", 0xFFFF_00FF),
    ("aqua", 0xFF00_FFFF),
    ("fuchsia", 0xFFFF_00FF),
    ("lime", 0xFF00_FF00),
    ("maroon", 0xFF80_0000),
    ("navy", 0xFF00_0080),
    ("olive", 0xFF80_8000),
    ("purple", 0xFF80_0080),
    ("silver", 0xFFC0_C0C0),
    ("teal", 0xFF00_8080),
];

/// Parse `#RGB`, `#RRGGBB`, `#AARRGGBB` or a basic color name.
///
/// Returns `None` for anything else so callers fall back to their default rendering.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    let parsed = match value.strip_prefix('#') {
        Some(hex) => parse_hex(hex),
        None => NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
            .map(|(_, argb)| Color(*argb)),
    };
    if parsed.is_none() {
        log::debug!("unparseable color value {value:?}");
    }
    parsed
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let raw = u32::from_str_radix(hex, 16).ok();
    match hex.len() {
        3 => raw.map(|v| {
            let r = ((v >> 8) & 0xF) as u8 * 0x11;
            let g = ((v >> 4) & 0xF) as u8 * 0x11;
            let b = (v & 0xF) as u8 * 0x11;
            Color::rgb(r, g, b)
        }),
        6 => raw.map(|v| Color(0xFF00_0000 | v)),
        8 => raw.map(Color),
        _ => None,
    }
}
