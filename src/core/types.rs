//! Property types and the values that flow along connections.
//!
//! A [`PropertyType`] is a bit-set over a fixed set of content kinds. An
//! input that accepts several kinds can be fed by any output whose kinds it
//! covers. A [`Value`] always has exactly one kind, so checking whether a
//! value fits a property is a single `contains` test.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Set of content kinds a property can carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PropertyType: u32 {
        /// RGBA color
        const COLOR        = 1 << 0;
        /// Scalar number
        const NUMBER       = 1 << 1;
        /// Numeric vector
        const VECTOR       = 1 << 2;
        /// Resolution-independent image
        const VECTOR_IMAGE = 1 << 3;
        /// Raster image
        const IMAGE        = 1 << 4;
        /// Text
        const STRING       = 1 << 5;
        /// Resource location
        const URL          = 1 << 6;
        /// Video stream
        const VIDEO        = 1 << 7;
        /// Compositing layer
        const LAYER        = 1 << 8;
        /// GPU texture
        const TEXTURE      = 1 << 9;
        /// 3D scene
        const SCENE        = 1 << 10;
        /// Environment cube map
        const CUBE_MAP     = 1 << 11;
        /// One option out of a fixed list
        const PICKER       = 1 << 12;

        /// Anything that can be decoded into pixels.
        const IMAGE_CONTENT = Self::IMAGE.bits() | Self::URL.bits();

        /// Everything a material slot accepts.
        const MATERIAL_CONTENT = Self::COLOR.bits()
            | Self::NUMBER.bits()
            | Self::IMAGE.bits()
            | Self::STRING.bits()
            | Self::URL.bits()
            | Self::VIDEO.bits()
            | Self::LAYER.bits()
            | Self::TEXTURE.bits()
            | Self::SCENE.bits()
            | Self::CUBE_MAP.bits();
    }
}

impl PropertyType {
    /// Whether an output of type `output` may feed an input of this type.
    ///
    /// The input's set must be a superset of the output's set. An empty
    /// output type never connects.
    pub fn accepts(&self, output: PropertyType) -> bool {
        !output.is_empty() && self.contains(output)
    }

    /// Whether a concrete value fits this type.
    ///
    /// The value must carry exactly one kind, and that kind must be in the
    /// set. Assets tagged with no kind or with several never fit.
    pub fn admits(&self, value: &Value) -> bool {
        let kind = value.kind();
        kind.bits().count_ones() == 1 && self.contains(kind)
    }

    /// Iterate over the single kinds contained in this set, lowest bit first.
    pub fn kinds(&self) -> impl Iterator<Item = PropertyType> {
        self.iter()
    }

    /// Human-readable name of a single kind.
    fn kind_name(kind: PropertyType) -> &'static str {
        KIND_NAMES
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }
}

const KIND_NAMES: [(PropertyType, &str); 13] = [
    (PropertyType::COLOR, "color"),
    (PropertyType::NUMBER, "number"),
    (PropertyType::VECTOR, "vector"),
    (PropertyType::VECTOR_IMAGE, "vectorImage"),
    (PropertyType::IMAGE, "image"),
    (PropertyType::STRING, "string"),
    (PropertyType::URL, "url"),
    (PropertyType::VIDEO, "video"),
    (PropertyType::LAYER, "layer"),
    (PropertyType::TEXTURE, "texture"),
    (PropertyType::SCENE, "scene"),
    (PropertyType::CUBE_MAP, "cubeMap"),
    (PropertyType::PICKER, "picker"),
];

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.kinds().map(Self::kind_name).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Values that flow through the graph.
///
/// Every variant has exactly one [`PropertyType`] kind. "Unset" is modelled
/// as `Option<Value>::None` at the property level, never as a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Value {
    /// Scalar number
    Number(f64),
    /// RGBA color
    Color(Color),
    /// Numeric vector of any dimension
    Vector(Vec<f64>),
    /// UTF-8 string
    String(String),
    /// Location of a resource
    Url(String),
    /// Selected option of a picker
    Choice(String),
    /// Handle to a heavyweight resource owned outside the engine
    Asset(AssetRef),
}

/// Reference to a resource such as an image, video or texture.
///
/// The engine only moves the handle around; loading and rendering are the
/// host's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    /// Content kind of the asset; anything but a single kind is refused
    /// wherever value types are enforced
    pub kind: PropertyType,
    /// Host-defined handle
    pub handle: String,
}

impl AssetRef {
    /// Create a new asset reference.
    pub fn new(kind: PropertyType, handle: impl Into<String>) -> Self {
        Self {
            kind,
            handle: handle.into(),
        }
    }
}

impl Value {
    /// Get the content kind of this value.
    pub fn kind(&self) -> PropertyType {
        match self {
            Value::Number(_) => PropertyType::NUMBER,
            Value::Color(_) => PropertyType::COLOR,
            Value::Vector(_) => PropertyType::VECTOR,
            Value::String(_) => PropertyType::STRING,
            Value::Url(_) => PropertyType::URL,
            Value::Choice(_) => PropertyType::PICKER,
            Value::Asset(asset) => asset.kind,
        }
    }

    /// Try to get this value as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get this value as a color.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Try to get this value as a vector slice.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get the textual payload of a string, url or choice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Url(s) | Value::Choice(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an asset reference.
    pub fn as_asset(&self) -> Option<&AssetRef> {
        match self {
            Value::Asset(a) => Some(a),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Color(c) => write!(f, "{}", c),
            Value::Vector(v) => write!(f, "Vec{:?}", v),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Url(u) => write!(f, "<{}>", u),
            Value::Choice(c) => write!(f, "[{}]", c),
            Value::Asset(a) => write!(f, "{}({})", PropertyType::kind_name(a.kind), a.handle),
        }
    }
}

/// RGBA color value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Create a new color from RGBA components.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from RGB components (alpha = 255).
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a hex color string.
    ///
    /// Supports formats: "#RGB", "#RGBA", "#RRGGBB", "#RRGGBBAA"
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim_start_matches('#');
        let digit = |range: std::ops::Range<usize>| {
            hex.get(range)
                .ok_or_else(|| format!("Invalid hex color: {}", hex))
                .and_then(|s| u8::from_str_radix(s, 16).map_err(|e| e.to_string()))
        };

        match hex.len() {
            3 | 4 => {
                let channel = |i: usize| digit(i..i + 1).map(|v| v * 17);
                let a = if hex.len() == 4 { channel(3)? } else { 255 };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?, a))
            }
            6 | 8 => {
                let channel = |i: usize| digit(i * 2..i * 2 + 2);
                let a = if hex.len() == 8 { channel(3)? } else { 255 };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?, a))
            }
            _ => Err(format!(
                "Invalid hex color format: expected 3, 4, 6, or 8 characters, got {}",
                hex.len()
            )),
        }
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Opaque white.
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Opaque red.
    pub const RED: Color = Color::rgb(255, 0, 0);
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superset_compatibility() {
        let any_image = PropertyType::IMAGE_CONTENT;
        assert!(any_image.accepts(PropertyType::IMAGE));
        assert!(any_image.accepts(PropertyType::URL));
        assert!(any_image.accepts(PropertyType::IMAGE_CONTENT));
        // A wider output cannot feed a narrower input.
        assert!(!PropertyType::IMAGE.accepts(PropertyType::IMAGE_CONTENT));
        assert!(!PropertyType::NUMBER.accepts(PropertyType::COLOR));
        assert!(!PropertyType::NUMBER.accepts(PropertyType::empty()));
    }

    #[test]
    fn test_material_content_covers_texture_but_not_vector() {
        assert!(PropertyType::MATERIAL_CONTENT.accepts(PropertyType::TEXTURE));
        assert!(!PropertyType::MATERIAL_CONTENT.accepts(PropertyType::VECTOR));
    }

    #[test]
    fn test_kinds_iteration_and_display() {
        let ty = PropertyType::NUMBER | PropertyType::COLOR;
        let kinds: Vec<_> = ty.kinds().collect();
        assert_eq!(kinds, vec![PropertyType::COLOR, PropertyType::NUMBER]);
        assert_eq!(ty.to_string(), "color|number");
        assert_eq!(PropertyType::empty().to_string(), "none");
    }

    #[test]
    fn test_value_kind_and_admission() {
        assert_eq!(Value::Number(1.0).kind(), PropertyType::NUMBER);
        assert_eq!(Value::Choice("add".into()).kind(), PropertyType::PICKER);
        let texture = Value::Asset(AssetRef::new(PropertyType::TEXTURE, "tex://0"));
        assert_eq!(texture.kind(), PropertyType::TEXTURE);
        assert!(PropertyType::MATERIAL_CONTENT.admits(&texture));
        assert!(!PropertyType::NUMBER.admits(&Value::from("five")));
    }

    #[test]
    fn test_assets_without_a_single_kind_are_never_admitted() {
        let untagged = Value::Asset(AssetRef::new(PropertyType::empty(), "h"));
        assert!(!PropertyType::NUMBER.admits(&untagged));
        assert!(!PropertyType::all().admits(&untagged));

        let ambiguous = Value::Asset(AssetRef::new(PropertyType::IMAGE_CONTENT, "h"));
        assert!(!PropertyType::IMAGE_CONTENT.admits(&ambiguous));
        assert!(!PropertyType::MATERIAL_CONTENT.admits(&ambiguous));
    }

    #[test]
    fn test_value_serde_shape() {
        let json = serde_json::to_string(&Value::Number(2.5)).unwrap();
        assert_eq!(json, r#"{"type":"number","data":2.5}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Number(2.5));
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#FF0000").unwrap(), Color::RED);
        assert_eq!(Color::from_hex("F00").unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(Color::from_hex("#00FF0080").unwrap(), Color::new(0, 255, 0, 128));
        assert!(Color::from_hex("#12345").is_err());
        assert_eq!(Color::new(0, 255, 0, 128).to_hex(), "#00FF0080");
    }
}
